//! Typed registration surface
//!
//! These types compile down to [`Blueprint`]s: [`Value`] registers a static
//! dependency value, [`Fields`] registers an aggregate as its decomposed
//! fields, and [`Func`] registers a constructor function whose parameters
//! are dependencies and whose return value is supplied back into the
//! registry.

use crate::blueprint::{Blueprint, Register};
use crate::bundle::{Bundle, DynValue};
use crate::error::ProviderFault;
use crate::key::DependencyKey;
use std::any::TypeId;
use std::sync::Arc;

/// A static dependency value, optionally discriminated by name.
///
/// Any `Send + Sync` value qualifies, including function objects that
/// should be stored as values rather than run as providers.
///
/// # Examples
///
/// ```
/// use quintette::{Injector, Value};
///
/// # fn demo() -> quintette::InjectResult<()> {
/// let injector = Injector::new();
/// injector.provide(Value::new(String::from("postgres://localhost")))?;
/// injector.provide(Value::named("port", 5432u16))?;
/// # Ok(())
/// # }
/// ```
pub struct Value<T> {
	value: T,
	name: String,
}

impl<T: Send + Sync + 'static> Value<T> {
	/// The default (unnamed) value of its type.
	pub fn new(value: T) -> Self {
		Self {
			value,
			name: String::new(),
		}
	}

	/// A value discriminated by `name`, so several values of one type can
	/// coexist.
	pub fn named(name: impl Into<String>, value: T) -> Self {
		Self {
			value,
			name: name.into(),
		}
	}
}

impl<T: Send + Sync + 'static> Register for Value<T> {
	fn blueprints(self) -> Vec<Blueprint> {
		let key = if self.name.is_empty() {
			DependencyKey::of::<T>()
		} else {
			DependencyKey::named::<T>(self.name)
		};
		let label = format!("value<{key}>");
		vec![Blueprint::constant(label).provide_value(key, self.value)]
	}
}

/// A static aggregate registered as its decomposed fields.
///
/// Each field becomes an independent dependency under its own key; the
/// aggregate itself is not registered. The counterpart on the retrieval
/// side is [`Injector::assemble`](crate::Injector::assemble).
pub struct Fields<B>(pub B);

impl<B: Bundle> Register for Fields<B> {
	fn blueprints(self) -> Vec<Blueprint> {
		let label = format!("fields<{}>", std::any::type_name::<B>());
		let mut blueprint = Blueprint::constant(label);
		for (key, value) in B::keys().into_iter().zip(self.0.split()) {
			blueprint = blueprint.provide_preset(key, value);
		}
		vec![blueprint]
	}
}

/// A constructor-function provider.
///
/// Parameters are resolved from the registry by type (each must be
/// `Clone + Send + Sync`); the return value is supplied back under its
/// type's default key. Constructors differ in the shape of the return
/// value:
///
/// - [`new`](Self::new) - infallible, one supplied value. A provider
///   returning `()` supplies nothing and only consumes its inputs.
/// - [`try_new`](Self::try_new) - `Result<T, E>`; the `Err` arm is the
///   provider's failure slot and aborts the run.
/// - [`decomposed`](Self::decomposed) - returns a [`Bundle`] supplied as
///   its decomposed fields.
/// - [`try_decomposed`](Self::try_decomposed) - fallible variant of the
///   above.
///
/// # Examples
///
/// ```
/// use quintette::Func;
///
/// #[derive(Clone)]
/// struct Pool {
/// 	url: String,
/// }
///
/// let open = Func::new("open_pool", |url: String| Pool { url });
/// let checked = Func::try_new("parse_port", |raw: String| raw.parse::<u16>());
/// ```
pub struct Func {
	blueprint: Blueprint,
}

impl Func {
	/// An infallible provider; the return value becomes a single
	/// dependency.
	pub fn new<F, A>(name: impl Into<String>, func: F) -> Self
	where
		F: ProviderFn<A>,
		A: ProviderArgs,
		F::Output: Send + Sync + 'static,
	{
		let name = name.into();
		let diagnostic = name.clone();
		let mut blueprint = Blueprint::function(name, move |values: Vec<DynValue>| {
			let args = A::from_values(values).ok_or_else(|| argument_mismatch(&diagnostic))?;
			Ok(single_output(func.invoke(args)))
		});
		for key in A::keys() {
			blueprint = blueprint.require(key);
		}
		if let Some(key) = single_output_key::<F::Output>() {
			blueprint = blueprint.provide(key);
		}
		Self { blueprint }
	}

	/// A fallible provider; `Err` takes the failure slot and aborts the
	/// run.
	pub fn try_new<F, A, T, E>(name: impl Into<String>, func: F) -> Self
	where
		F: ProviderFn<A, Output = Result<T, E>>,
		A: ProviderArgs,
		T: Send + Sync + 'static,
		E: std::error::Error + Send + Sync + 'static,
	{
		let name = name.into();
		let diagnostic = name.clone();
		let mut blueprint = Blueprint::function(name, move |values: Vec<DynValue>| {
			let args = A::from_values(values).ok_or_else(|| argument_mismatch(&diagnostic))?;
			match func.invoke(args) {
				Ok(value) => Ok(single_output(value)),
				Err(cause) => Err(Box::new(cause) as ProviderFault),
			}
		});
		for key in A::keys() {
			blueprint = blueprint.require(key);
		}
		if let Some(key) = single_output_key::<T>() {
			blueprint = blueprint.provide(key);
		}
		Self { blueprint }
	}

	/// A provider returning an aggregate supplied as its decomposed
	/// fields.
	pub fn decomposed<F, A, B>(name: impl Into<String>, func: F) -> Self
	where
		F: ProviderFn<A, Output = B>,
		A: ProviderArgs,
		B: Bundle,
	{
		let name = name.into();
		let diagnostic = name.clone();
		let mut blueprint = Blueprint::function(name, move |values: Vec<DynValue>| {
			let args = A::from_values(values).ok_or_else(|| argument_mismatch(&diagnostic))?;
			Ok(func.invoke(args).split())
		});
		for key in A::keys() {
			blueprint = blueprint.require(key);
		}
		for key in B::keys() {
			blueprint = blueprint.provide(key);
		}
		Self { blueprint }
	}

	/// Fallible variant of [`decomposed`](Self::decomposed).
	pub fn try_decomposed<F, A, B, E>(name: impl Into<String>, func: F) -> Self
	where
		F: ProviderFn<A, Output = Result<B, E>>,
		A: ProviderArgs,
		B: Bundle,
		E: std::error::Error + Send + Sync + 'static,
	{
		let name = name.into();
		let diagnostic = name.clone();
		let mut blueprint = Blueprint::function(name, move |values: Vec<DynValue>| {
			let args = A::from_values(values).ok_or_else(|| argument_mismatch(&diagnostic))?;
			match func.invoke(args) {
				Ok(bundle) => Ok(bundle.split()),
				Err(cause) => Err(Box::new(cause) as ProviderFault),
			}
		});
		for key in A::keys() {
			blueprint = blueprint.require(key);
		}
		for key in B::keys() {
			blueprint = blueprint.provide(key);
		}
		Self { blueprint }
	}
}

impl Register for Func {
	fn blueprints(self) -> Vec<Blueprint> {
		vec![self.blueprint]
	}
}

fn argument_mismatch(provider: &str) -> ProviderFault {
	format!("argument type mismatch invoking '{provider}'").into()
}

fn single_output<T: Send + Sync + 'static>(value: T) -> Vec<DynValue> {
	if TypeId::of::<T>() == TypeId::of::<()>() {
		Vec::new()
	} else {
		vec![Arc::new(value) as DynValue]
	}
}

fn single_output_key<T: 'static>() -> Option<DependencyKey> {
	(TypeId::of::<T>() != TypeId::of::<()>()).then(DependencyKey::of::<T>)
}

/// A callable usable as a provider body. Implemented for functions and
/// closures of up to eight parameters.
pub trait ProviderFn<A>: Send + 'static {
	/// The callable's return value.
	type Output;

	/// Consume the callable with its resolved arguments.
	fn invoke(self, args: A) -> Self::Output;
}

/// A parameter tuple resolvable from the registry. Implemented for tuples
/// of up to eight `Clone + Send + Sync` dependencies.
pub trait ProviderArgs: Sized + 'static {
	/// Keys of the parameters, in declaration order.
	fn keys() -> Vec<DependencyKey>;

	/// Downcast one resolved value per key back into the tuple.
	fn from_values(values: Vec<DynValue>) -> Option<Self>;
}

macro_rules! provider_fn {
	($($arg:ident),*) => {
		impl<Fun, Out, $($arg,)*> ProviderFn<($($arg,)*)> for Fun
		where
			Fun: FnOnce($($arg),*) -> Out + Send + 'static,
		{
			type Output = Out;

			#[allow(non_snake_case)]
			fn invoke(self, ($($arg,)*): ($($arg,)*)) -> Out {
				self($($arg),*)
			}
		}

		impl<$($arg: Clone + Send + Sync + 'static,)*> ProviderArgs for ($($arg,)*) {
			fn keys() -> Vec<DependencyKey> {
				vec![$(DependencyKey::of::<$arg>(),)*]
			}

			#[allow(non_snake_case, unused_mut, unused_variables)]
			fn from_values(values: Vec<DynValue>) -> Option<Self> {
				let mut values = values.into_iter();
				$(let $arg = values.next()?.downcast::<$arg>().ok()?;)*
				Some(($((*$arg).clone(),)*))
			}
		}
	};
}

provider_fn!();
provider_fn!(A1);
provider_fn!(A1, A2);
provider_fn!(A1, A2, A3);
provider_fn!(A1, A2, A3, A4);
provider_fn!(A1, A2, A3, A4, A5);
provider_fn!(A1, A2, A3, A4, A5, A6);
provider_fn!(A1, A2, A3, A4, A5, A6, A7);
provider_fn!(A1, A2, A3, A4, A5, A6, A7, A8);
