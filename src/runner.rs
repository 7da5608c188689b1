//! Execution strategies
//!
//! Two ways to drive an ordered queue of providers:
//!
//! - **Sequential** - in-order invocation on the caller's thread, aborting
//!   at the first failure.
//! - **Concurrent** - one tokio task per provider. A task waits on a
//!   completion signal from every provider owning one of its inputs, so it
//!   starts as soon as its own dependencies finish, independent of
//!   unrelated branches. The first failure broadcasts a one-shot
//!   cancellation signal: tasks still waiting abort without running (but
//!   still fire their completion signal so dependents never block), while
//!   already-running bodies finish on their own and have their outcomes
//!   collected.

use crate::bundle::DynValue;
use crate::error::{InjectError, InjectResult};
use crate::registry::{Binding, Provider, Registry};
use parking_lot::Mutex;
use std::backtrace::Backtrace;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// How [`Injector::run`](crate::Injector::run) executes a cycle's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
	/// Providers run one at a time, in queue order. Deterministic; a
	/// failure aborts the remainder of the cycle.
	#[default]
	Sequential,
	/// One task per provider, started as soon as its dependencies have
	/// finished. A failure aborts only the causally dependent subgraph;
	/// independent branches complete and their outcomes are collected.
	Concurrent,
}

/// Everything one concurrent task needs, resolved ahead of spawning.
pub(crate) struct TaskSpec {
	pub(crate) provider: Arc<Provider>,
	/// Bindings backing the provider's inputs, in requires order.
	pub(crate) inputs: Vec<Arc<Binding>>,
	/// Queue positions of the not-yet-done providers owning those inputs.
	pub(crate) wait_on: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
	Pending,
	Succeeded,
	Failed,
}

pub(crate) fn run_sequential(
	providers: &[Arc<Provider>],
	registry: &Registry,
	order: &[usize],
) -> InjectResult<()> {
	for &provider_idx in order {
		let provider = &providers[provider_idx];
		if provider.is_done() {
			continue;
		}
		let inputs = gather_inputs(provider, registry)?;
		let Some(call) = provider.take_call() else {
			continue;
		};
		debug!(provider = %provider.name, "running provider");
		let outputs = call(inputs).map_err(|source| InjectError::ProviderFailed {
			provider: provider.name.clone(),
			source,
		})?;
		settle_outputs(provider, outputs)?;
		provider.mark_done();
	}
	Ok(())
}

fn gather_inputs(provider: &Provider, registry: &Registry) -> InjectResult<Vec<DynValue>> {
	provider
		.requires
		.iter()
		.map(|key| {
			let binding =
				registry
					.lookup(key)
					.ok_or_else(|| InjectError::MissingDependency {
						provider: provider.name.clone(),
						dependency: key.to_string(),
					})?;
			binding
				.value()
				.cloned()
				.ok_or_else(|| InjectError::UninitializedDependency {
					provider: provider.name.clone(),
					dependency: key.to_string(),
				})
		})
		.collect()
}

fn settle_outputs(provider: &Provider, outputs: Vec<DynValue>) -> InjectResult<()> {
	if outputs.len() != provider.outputs.len() {
		return Err(InjectError::ProviderFailed {
			provider: provider.name.clone(),
			source: format!(
				"produced {} outputs, expected {}",
				outputs.len(),
				provider.outputs.len()
			)
			.into(),
		});
	}
	for (binding, value) in provider.outputs.iter().zip(outputs) {
		binding.settle(value);
	}
	Ok(())
}

pub(crate) async fn run_concurrent(tasks: Vec<TaskSpec>) -> InjectResult<()> {
	let channels: Vec<_> = (0..tasks.len())
		.map(|_| watch::channel(Completion::Pending))
		.collect();
	let receivers: Vec<_> = channels.iter().map(|(_, rx)| rx.clone()).collect();
	let senders: Vec<_> = channels.into_iter().map(|(tx, _)| tx).collect();

	let (cancel_tx, cancel_rx) = watch::channel(false);
	let cancel_tx = Arc::new(cancel_tx);
	let errors: Arc<Mutex<Vec<InjectError>>> = Arc::default();

	let mut handles = Vec::with_capacity(tasks.len());
	for (task, own_signal) in tasks.into_iter().zip(senders) {
		let waits: Vec<_> = task
			.wait_on
			.iter()
			.map(|&position| receivers[position].clone())
			.collect();
		handles.push(tokio::spawn(run_task(
			task,
			waits,
			own_signal,
			cancel_rx.clone(),
			Arc::clone(&cancel_tx),
			Arc::clone(&errors),
		)));
	}

	// Block until every task has exited, then report what was collected.
	for handle in handles {
		let _ = handle.await;
	}

	let mut collected = std::mem::take(&mut *errors.lock());
	match collected.len() {
		0 => Ok(()),
		1 => Err(collected.remove(0)),
		_ => {
			let report = collected
				.iter()
				.map(ToString::to_string)
				.collect::<Vec<_>>()
				.join("\n");
			Err(InjectError::Failures { report })
		}
	}
}

async fn run_task(
	task: TaskSpec,
	waits: Vec<watch::Receiver<Completion>>,
	own_signal: watch::Sender<Completion>,
	mut cancel_rx: watch::Receiver<bool>,
	cancel_tx: Arc<watch::Sender<bool>>,
	errors: Arc<Mutex<Vec<InjectError>>>,
) {
	for mut dependency_signal in waits {
		let outcome = tokio::select! {
			changed = dependency_signal.wait_for(|state| *state != Completion::Pending) => {
				match changed {
					Ok(state) => *state,
					Err(_) => Completion::Failed,
				}
			}
			_ = cancel_rx.wait_for(|cancelled| *cancelled) => Completion::Failed,
		};
		if outcome != Completion::Succeeded {
			// Aborted before running; fire the completion signal anyway so
			// dependents waiting on this provider do not block forever.
			let _ = own_signal.send(Completion::Failed);
			return;
		}
	}

	let provider = &task.provider;
	let fail = |error: InjectError| {
		errors.lock().push(error);
		let _ = cancel_tx.send(true);
		let _ = own_signal.send(Completion::Failed);
	};

	let mut inputs = Vec::with_capacity(task.inputs.len());
	for binding in &task.inputs {
		match binding.value() {
			Some(value) => inputs.push(value.clone()),
			None => {
				fail(InjectError::UninitializedDependency {
					provider: provider.name.clone(),
					dependency: binding.key.to_string(),
				});
				return;
			}
		}
	}

	let Some(call) = provider.take_call() else {
		let _ = own_signal.send(Completion::Succeeded);
		return;
	};

	debug!(provider = %provider.name, "running provider");
	let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| call(inputs)));
	match outcome {
		Ok(Ok(outputs)) => match settle_outputs(provider, outputs) {
			Ok(()) => {
				provider.mark_done();
				let _ = own_signal.send(Completion::Succeeded);
			}
			Err(error) => fail(error),
		},
		Ok(Err(source)) => fail(InjectError::ProviderFailed {
			provider: provider.name.clone(),
			source,
		}),
		Err(payload) => fail(InjectError::ProviderPanicked {
			provider: provider.name.clone(),
			message: panic_message(payload.as_ref()),
			backtrace: Backtrace::force_capture().to_string(),
		}),
	}
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"non-string panic payload".to_string()
	}
}
