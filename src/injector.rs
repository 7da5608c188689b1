//! The engine: registration, validation, the run loop, and retrieval.

use crate::blueprint::{Blueprint, Provision, Register};
use crate::bundle::Bundle;
use crate::error::{InjectError, InjectResult};
use crate::key::DependencyKey;
use crate::queue;
use crate::registry::{Binding, Provider, Registry};
use crate::runner::{self, ExecutionStrategy, TaskSpec};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

#[derive(Default)]
struct Inner {
	providers: Vec<Arc<Provider>>,
	registry: Registry,
}

struct Shared {
	/// Compare-and-swap run guard, deliberately outside the registry lock
	/// so a second `run` is rejected without blocking.
	running: AtomicBool,
	inner: RwLock<Inner>,
	/// Registrations arriving while a run is active. Guarded by its own
	/// lock so a provider body registering through a cloned handle cannot
	/// deadlock against the registry lock held by the run loop.
	pending: Mutex<Vec<Blueprint>>,
	strategy: Mutex<ExecutionStrategy>,
}

/// The dependency engine.
///
/// Register providers with [`provide`](Self::provide), execute them in
/// dependency order with [`run`](Self::run), then pull resolved values
/// out with [`get`](Self::get) and friends. `Injector` is a cheap handle
/// over shared state: clones address the same engine, so a provider body
/// may capture one and register further providers mid-run (they execute
/// in the next cycle).
///
/// # Examples
///
/// ```
/// use quintette::{Func, Injector, Value};
///
/// # async fn demo() -> quintette::InjectResult<()> {
/// let injector = Injector::new();
/// injector.provide((
/// 	Value::new(2u32),
/// 	Func::new("double", |n: u32| u64::from(n) * 2),
/// ))?;
/// injector.run().await?;
///
/// assert_eq!(injector.get::<u64>()?, 4);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Injector {
	shared: Arc<Shared>,
}

impl Injector {
	/// Create an empty engine. Engines are independent; several may
	/// coexist.
	pub fn new() -> Self {
		Self {
			shared: Arc::new(Shared {
				running: AtomicBool::new(false),
				inner: RwLock::new(Inner::default()),
				pending: Mutex::new(Vec::new()),
				strategy: Mutex::new(ExecutionStrategy::default()),
			}),
		}
	}

	/// Register providers.
	///
	/// Accepts a single registration or a tuple batch. A conflict aborts
	/// the call immediately; items registered earlier in the same batch
	/// remain registered, so a failed batch should be treated as abandoned
	/// rather than retried.
	///
	/// While a run is active, registrations are buffered and applied at
	/// the next cycle boundary; they never interleave with the cycle in
	/// progress.
	pub fn provide(&self, registration: impl Register) -> InjectResult<()> {
		let blueprints = registration.blueprints();
		if self.shared.running.load(Ordering::Acquire) {
			self.shared.pending.lock().extend(blueprints);
			return Ok(());
		}

		let mut inner = self.shared.inner.write();
		let buffered = std::mem::take(&mut *self.shared.pending.lock());
		for blueprint in buffered.into_iter().chain(blueprints) {
			register_blueprint(&mut inner, blueprint)?;
		}
		Ok(())
	}

	/// Choose how [`run`](Self::run) executes each cycle. Call before the
	/// first run; the strategy applies from the next cycle onward.
	pub fn use_strategy(&self, strategy: ExecutionStrategy) {
		*self.shared.strategy.lock() = strategy;
	}

	/// Execute every registered provider in dependency order.
	///
	/// Each cycle first validates that every requirement of every
	/// not-yet-done provider resolves (aggregating all failures into one
	/// report), then builds the execution queue (failing on cycles), then
	/// executes it with the active [`ExecutionStrategy`]. Registrations
	/// buffered during the cycle trigger a follow-up cycle; `run` returns
	/// once a cycle ends with nothing pending.
	///
	/// At most one run may be active per engine; a second call fails
	/// immediately with [`InjectError::AlreadyRunning`].
	pub async fn run(&self) -> InjectResult<()> {
		if self
			.shared
			.running
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			return Err(InjectError::AlreadyRunning);
		}
		let result = self.run_cycles().await;
		self.shared.running.store(false, Ordering::Release);
		result
	}

	async fn run_cycles(&self) -> InjectResult<()> {
		loop {
			self.adopt_pending()?;
			let strategy = *self.shared.strategy.lock();
			debug!(?strategy, "starting execution cycle");
			match strategy {
				ExecutionStrategy::Sequential => self.run_cycle_sequential()?,
				ExecutionStrategy::Concurrent => {
					let plan = self.plan_cycle()?;
					runner::run_concurrent(plan).await?;
				}
			}
			if self.shared.pending.lock().is_empty() {
				return Ok(());
			}
		}
	}

	fn adopt_pending(&self) -> InjectResult<()> {
		let buffered = std::mem::take(&mut *self.shared.pending.lock());
		if buffered.is_empty() {
			return Ok(());
		}
		let mut inner = self.shared.inner.write();
		for blueprint in buffered {
			register_blueprint(&mut inner, blueprint)?;
		}
		Ok(())
	}

	/// One sequential cycle. The writer lock is held for the whole cycle,
	/// so retrieval through other handles cannot observe half-settled
	/// outputs.
	fn run_cycle_sequential(&self) -> InjectResult<()> {
		let inner = self.shared.inner.write();
		validate(&inner)?;
		let order = queue::build_queue(&inner.providers, &inner.registry)?;
		runner::run_sequential(&inner.providers, &inner.registry, &order)
	}

	/// Resolve one concurrent cycle into task specs under the read lock,
	/// so no lock is held while tasks execute. Each task settles only its
	/// own provider's output cells, which no other provider may legally
	/// own.
	fn plan_cycle(&self) -> InjectResult<Vec<TaskSpec>> {
		let inner = self.shared.inner.read();
		validate(&inner)?;
		let order = queue::build_queue(&inner.providers, &inner.registry)?;
		let positions: HashMap<usize, usize> = order
			.iter()
			.enumerate()
			.map(|(position, &provider_idx)| (provider_idx, position))
			.collect();

		let mut tasks = Vec::with_capacity(order.len());
		for &provider_idx in &order {
			let provider = Arc::clone(&inner.providers[provider_idx]);
			let mut inputs = Vec::with_capacity(provider.requires.len());
			let mut wait_on = Vec::new();
			for key in &provider.requires {
				let binding = inner.registry.lookup(key).ok_or_else(|| {
					InjectError::MissingDependency {
						provider: provider.name.clone(),
						dependency: key.to_string(),
					}
				})?;
				inputs.push(Arc::clone(binding));
				let owner = binding.owner;
				if !inner.providers[owner].is_done()
					&& let Some(&position) = positions.get(&owner)
					&& !wait_on.contains(&position)
				{
					wait_on.push(position);
				}
			}
			tasks.push(TaskSpec {
				provider,
				inputs,
				wait_on,
			});
		}
		Ok(tasks)
	}

	/// Retrieve the resolved value registered under `T`'s default key.
	///
	/// Fails with [`InjectError::NotFound`] when nothing is registered for
	/// the key, and [`InjectError::NotInitialized`] when the owning
	/// provider has not produced the value yet.
	///
	/// # Examples
	///
	/// ```
	/// use quintette::{Injector, Value};
	///
	/// # fn demo() -> quintette::InjectResult<()> {
	/// let injector = Injector::new();
	/// injector.provide(Value::new(5u32))?;
	/// assert_eq!(injector.get::<u32>()?, 5);
	/// # Ok(())
	/// # }
	/// ```
	pub fn get<T: Clone + Send + Sync + 'static>(&self) -> InjectResult<T> {
		self.lookup_value(&DependencyKey::of::<T>())
	}

	/// Retrieve the resolved value registered under `(T, name)`, falling
	/// back to the unnamed entry when no exact name matches.
	pub fn get_named<T: Clone + Send + Sync + 'static>(&self, name: &str) -> InjectResult<T> {
		self.lookup_value(&DependencyKey::named::<T>(name))
	}

	/// Copy the resolved value for `T` into `destination`.
	pub fn inject<T: Clone + Send + Sync + 'static>(&self, destination: &mut T) -> InjectResult<()> {
		*destination = self.get()?;
		Ok(())
	}

	/// Copy the resolved value for `(T, name)` into `destination`.
	pub fn inject_named<T: Clone + Send + Sync + 'static>(
		&self,
		name: &str,
		destination: &mut T,
	) -> InjectResult<()> {
		*destination = self.get_named(name)?;
		Ok(())
	}

	/// Rebuild an aggregate from its decomposed fields, resolving each
	/// field key independently and failing on the first missing or
	/// uninitialized one.
	pub fn assemble<B: Bundle>(&self) -> InjectResult<B> {
		let inner = self.shared.inner.read();
		let keys = B::keys();
		let mut values = Vec::with_capacity(keys.len());
		for key in &keys {
			let binding = inner
				.registry
				.lookup(key)
				.ok_or_else(|| InjectError::NotFound {
					dependency: key.to_string(),
				})?;
			values.push(
				binding
					.value()
					.cloned()
					.ok_or_else(|| InjectError::NotInitialized {
						dependency: key.to_string(),
					})?,
			);
		}
		B::assemble(values).ok_or_else(|| InjectError::TypeMismatch {
			dependency: std::any::type_name::<B>().to_string(),
		})
	}

	/// Rebuild an aggregate from its decomposed fields into `destination`.
	pub fn inject_fields<B: Bundle>(&self, destination: &mut B) -> InjectResult<()> {
		*destination = self.assemble()?;
		Ok(())
	}

	fn lookup_value<T: Clone + Send + Sync + 'static>(
		&self,
		key: &DependencyKey,
	) -> InjectResult<T> {
		let inner = self.shared.inner.read();
		let binding = inner
			.registry
			.lookup(key)
			.ok_or_else(|| InjectError::NotFound {
				dependency: key.to_string(),
			})?;
		let value = binding
			.value()
			.ok_or_else(|| InjectError::NotInitialized {
				dependency: key.to_string(),
			})?;
		let value = value
			.clone()
			.downcast::<T>()
			.map_err(|_| InjectError::TypeMismatch {
				dependency: key.to_string(),
			})?;
		Ok((*value).clone())
	}
}

impl Default for Injector {
	fn default() -> Self {
		Self::new()
	}
}

fn register_blueprint(inner: &mut Inner, blueprint: Blueprint) -> InjectResult<()> {
	let Blueprint {
		name,
		requires,
		provides,
		call,
	} = blueprint;
	let provider_idx = inner.providers.len();

	// A conflict aborts the loop, leaving this provider's earlier slots
	// registered; the provider record is still pushed so binding owner
	// indices stay valid.
	let mut outputs = Vec::with_capacity(provides.len());
	let mut conflict = None;
	for Provision { key, preset } in provides {
		let binding = Arc::new(Binding::new(key, provider_idx, name.clone()));
		if let Some(value) = preset {
			binding.settle(value);
		}
		match inner.registry.insert(Arc::clone(&binding)) {
			Ok(()) => outputs.push(binding),
			Err(error) => {
				conflict = Some(error);
				break;
			}
		}
	}

	debug!(provider = %name, outputs = outputs.len(), "registered provider");
	inner
		.providers
		.push(Arc::new(Provider::new(name, requires, outputs, call)));
	match conflict {
		Some(error) => Err(error),
		None => Ok(()),
	}
}

/// Check every requirement of every not-yet-done provider, aggregating
/// all missing dependencies into one report before anything executes.
fn validate(inner: &Inner) -> InjectResult<()> {
	let mut report = String::new();
	for provider in &inner.providers {
		if provider.is_done() {
			continue;
		}
		for key in &provider.requires {
			if inner.registry.lookup(key).is_none() {
				if !report.is_empty() {
					report.push('\n');
				}
				let line = InjectError::MissingDependency {
					provider: provider.name.clone(),
					dependency: key.to_string(),
				};
				report.push_str(&line.to_string());
			}
		}
	}
	if report.is_empty() {
		Ok(())
	} else {
		Err(InjectError::Unresolved { report })
	}
}
