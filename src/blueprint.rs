//! Provider descriptors
//!
//! A [`Blueprint`] is the normalized record of one provider: a diagnostic
//! name, the ordered keys it requires, the ordered slots it supplies, and
//! the closure that produces those slots. The typed surface in
//! [`providers`](crate::providers) compiles down to blueprints; the builder
//! here is the explicit-schema path for callers that need full control over
//! keys (arbitrary names, mixed types) without going through the typed
//! constructors.

use crate::bundle::DynValue;
use crate::error::ProviderFault;
use crate::key::DependencyKey;
use std::sync::Arc;

/// Invocation closure of a provider: consumes resolved inputs in
/// `requires` order, yields outputs in `provides` order.
pub type ProviderCall =
	Box<dyn FnOnce(Vec<DynValue>) -> Result<Vec<DynValue>, ProviderFault> + Send + 'static>;

/// One supplied slot of a blueprint: its key, and the value itself when
/// the slot is preset rather than produced by the invocation closure.
pub(crate) struct Provision {
	pub(crate) key: DependencyKey,
	pub(crate) preset: Option<DynValue>,
}

/// Normalized description of a provider: what it requires, what it
/// supplies, and how to invoke it.
///
/// # Examples
///
/// A provider declared through the explicit schema, requiring two named
/// `u64` values and supplying their sum:
///
/// ```
/// use quintette::{Blueprint, DependencyKey, DynValue};
/// use std::sync::Arc;
///
/// let sum = Blueprint::function("sum", |inputs: Vec<DynValue>| {
/// 	let total: u64 = inputs
/// 		.iter()
/// 		.filter_map(|value| value.clone().downcast::<u64>().ok())
/// 		.map(|value| *value)
/// 		.sum();
/// 	Ok(vec![Arc::new(total) as DynValue])
/// })
/// .require(DependencyKey::named::<u64>("lhs"))
/// .require(DependencyKey::named::<u64>("rhs"))
/// .provide(DependencyKey::of::<u64>());
///
/// assert_eq!(sum.name(), "sum");
/// ```
pub struct Blueprint {
	pub(crate) name: String,
	pub(crate) requires: Vec<DependencyKey>,
	pub(crate) provides: Vec<Provision>,
	pub(crate) call: Option<ProviderCall>,
}

impl Blueprint {
	/// A runnable provider with an explicit invocation closure.
	///
	/// The closure receives one resolved value per required key, in
	/// [`require`](Self::require) order, and must return one value per
	/// supplied key, in [`provide`](Self::provide) order. Returning an
	/// error takes the failure slot and aborts the run.
	pub fn function<F>(name: impl Into<String>, call: F) -> Self
	where
		F: FnOnce(Vec<DynValue>) -> Result<Vec<DynValue>, ProviderFault> + Send + 'static,
	{
		Self {
			name: name.into(),
			requires: Vec::new(),
			provides: Vec::new(),
			call: Some(Box::new(call)),
		}
	}

	/// A value-only provider; every slot is preset via
	/// [`provide_value`](Self::provide_value). It has nothing to run and is
	/// done as soon as it is registered.
	pub fn constant(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			requires: Vec::new(),
			provides: Vec::new(),
			call: None,
		}
	}

	/// Append a required key. Meaningful only for
	/// [`function`](Self::function) blueprints.
	pub fn require(mut self, key: DependencyKey) -> Self {
		self.requires.push(key);
		self
	}

	/// Append a supplied key, filled by the invocation closure.
	pub fn provide(mut self, key: DependencyKey) -> Self {
		self.provides.push(Provision { key, preset: None });
		self
	}

	/// Append a supplied key with a preset value, for
	/// [`constant`](Self::constant) blueprints.
	pub fn provide_value<T: Send + Sync + 'static>(self, key: DependencyKey, value: T) -> Self {
		self.provide_preset(key, Arc::new(value))
	}

	pub(crate) fn provide_preset(mut self, key: DependencyKey, value: DynValue) -> Self {
		self.provides.push(Provision {
			key,
			preset: Some(value),
		});
		self
	}

	/// Diagnostic name used in error messages and logs.
	pub fn name(&self) -> &str {
		&self.name
	}
}

/// Anything that contributes providers to an
/// [`Injector`](crate::Injector).
///
/// Implemented by the typed registration surface
/// ([`Value`](crate::Value), [`Func`](crate::Func),
/// [`Fields`](crate::Fields)), by [`Blueprint`] itself, and by tuples for
/// batch registration. Implement it on your own types to register a group
/// of related providers in one call.
pub trait Register {
	/// The blueprints this registration contributes, in registration order.
	fn blueprints(self) -> Vec<Blueprint>;
}

impl Register for Blueprint {
	fn blueprints(self) -> Vec<Blueprint> {
		vec![self]
	}
}

macro_rules! tuple_register {
	($($member:ident),+) => {
		impl<$($member: Register),+> Register for ($($member,)+) {
			fn blueprints(self) -> Vec<Blueprint> {
				#[allow(non_snake_case)]
				let ($($member,)+) = self;
				let mut all = Vec::new();
				$(all.extend($member.blueprints());)+
				all
			}
		}
	};
}

tuple_register!(A);
tuple_register!(A, B);
tuple_register!(A, B, C);
tuple_register!(A, B, C, D);
tuple_register!(A, B, C, D, E);
tuple_register!(A, B, C, D, E, F);
tuple_register!(A, B, C, D, E, F, G);
tuple_register!(A, B, C, D, E, F, G, H);
