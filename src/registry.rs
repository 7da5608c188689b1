//! Type-bucketed dependency bindings

use crate::blueprint::ProviderCall;
use crate::bundle::DynValue;
use crate::error::{InjectError, InjectResult};
use crate::key::DependencyKey;
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// One registered (type, name) slot and its eventual value.
///
/// The value cell is write-once, so the concurrent strategy can settle
/// each provider's distinct output slots without cross-provider
/// contention.
pub(crate) struct Binding {
	pub(crate) key: DependencyKey,
	/// Index of the owning provider.
	pub(crate) owner: usize,
	pub(crate) owner_name: String,
	cell: OnceLock<DynValue>,
}

impl Binding {
	pub(crate) fn new(key: DependencyKey, owner: usize, owner_name: String) -> Self {
		Self {
			key,
			owner,
			owner_name,
			cell: OnceLock::new(),
		}
	}

	pub(crate) fn value(&self) -> Option<&DynValue> {
		self.cell.get()
	}

	/// Store the resolved value. Providers run exactly once, so a second
	/// settle can only happen through a malformed blueprint and is
	/// ignored.
	pub(crate) fn settle(&self, value: DynValue) {
		let _ = self.cell.set(value);
	}
}

/// A registered provider: requirements plus its single-shot invocation.
pub(crate) struct Provider {
	pub(crate) name: String,
	pub(crate) requires: Vec<DependencyKey>,
	/// Bindings this provider owns, in declared output order.
	pub(crate) outputs: Vec<Arc<Binding>>,
	call: Mutex<Option<ProviderCall>>,
	done: AtomicBool,
}

impl Provider {
	pub(crate) fn new(
		name: String,
		requires: Vec<DependencyKey>,
		outputs: Vec<Arc<Binding>>,
		call: Option<ProviderCall>,
	) -> Self {
		// Value-only providers have nothing to run and are born done.
		let done = call.is_none();
		Self {
			name,
			requires,
			outputs,
			call: Mutex::new(call),
			done: AtomicBool::new(done),
		}
	}

	pub(crate) fn is_done(&self) -> bool {
		self.done.load(Ordering::Acquire)
	}

	pub(crate) fn mark_done(&self) {
		self.done.store(true, Ordering::Release);
	}

	pub(crate) fn take_call(&self) -> Option<ProviderCall> {
		self.call.lock().take()
	}
}

/// Type → insertion-ordered candidate bindings.
#[derive(Default)]
pub(crate) struct Registry {
	buckets: HashMap<TypeId, Vec<Arc<Binding>>>,
}

impl Registry {
	/// Match a key against the registered candidates of its type.
	///
	/// A single candidate wins unconditionally, bypassing name checks.
	/// With several candidates, an exact name match wins and the unnamed
	/// entry serves as fallback.
	pub(crate) fn lookup(&self, key: &DependencyKey) -> Option<&Arc<Binding>> {
		let bucket = self.buckets.get(&key.type_id())?;
		match bucket.as_slice() {
			[] => None,
			[only] => Some(only),
			candidates => {
				let mut fallback = None;
				for binding in candidates {
					if binding.key.name() == key.name() {
						return Some(binding);
					}
					if binding.key.is_unnamed() {
						fallback = Some(binding);
					}
				}
				fallback
			}
		}
	}

	/// Append a binding to its type bucket, rejecting a second entry with
	/// the same name.
	pub(crate) fn insert(&mut self, binding: Arc<Binding>) -> InjectResult<()> {
		let bucket = self.buckets.entry(binding.key.type_id()).or_default();
		if let Some(existing) = bucket
			.iter()
			.find(|candidate| candidate.key.name() == binding.key.name())
		{
			return Err(InjectError::Conflict {
				type_name: binding.key.type_name().to_string(),
				existing: existing.owner_name.clone(),
				incoming: binding.owner_name.clone(),
			});
		}
		bucket.push(binding);
		Ok(())
	}
}
