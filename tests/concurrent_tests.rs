//! Concurrent execution strategy tests.

use parking_lot::Mutex;
use quintette::{ExecutionStrategy, Func, InjectError, Injector, Value};
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn concurrent_injector() -> Injector {
	let injector = Injector::new();
	injector.use_strategy(ExecutionStrategy::Concurrent);
	injector
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn chain_resolves_under_concurrent_strategy() {
	// Arrange
	let injector = concurrent_injector();
	injector
		.provide((
			Func::new("a", || 1u32),
			Func::new("b", |n: u32| i64::from(n) + 1),
			Func::new("c", |n: i64| n as f64),
		))
		.unwrap();

	// Act
	injector.run().await.unwrap();

	// Assert
	assert_eq!(injector.get::<f64>().unwrap(), 2.0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn diamond_never_starts_a_consumer_before_its_dependencies() {
	// Arrange: d -> (b, c) -> a, with every start logged
	let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();
	let (log_a, log_b, log_c, log_d) = (
		Arc::clone(&log),
		Arc::clone(&log),
		Arc::clone(&log),
		Arc::clone(&log),
	);
	let injector = concurrent_injector();
	injector
		.provide((
			Func::new("a", move || {
				log_a.lock().push("a");
				1u8
			}),
			Func::new("b", move |n: u8| {
				log_b.lock().push("b");
				u16::from(n)
			}),
			Func::new("c", move |n: u8| {
				log_c.lock().push("c");
				u32::from(n)
			}),
			Func::new("d", move |b: u16, c: u32| {
				log_d.lock().push("d");
				u64::from(b) + u64::from(c)
			}),
		))
		.unwrap();

	// Act
	injector.run().await.unwrap();

	// Assert: a first, d last, b and c in between in either order
	let order = log.lock().clone();
	assert_eq!(order.len(), 4);
	assert_eq!(order[0], "a");
	assert_eq!(order[3], "d");
	assert_eq!(injector.get::<u64>().unwrap(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unrelated_branch_completes_when_another_fails() {
	// Arrange: a deliberately slow healthy branch and a fast failing one
	let injector = concurrent_injector();
	injector
		.provide((
			Func::new("slow_healthy", || {
				std::thread::sleep(Duration::from_millis(100));
				"survived".to_string()
			}),
			Func::try_new("fast_failing", || -> Result<u32, std::io::Error> {
				Err(std::io::Error::other("broken pipe"))
			}),
		))
		.unwrap();

	// Act
	let err = injector.run().await.unwrap_err();

	// Assert: the failure is reported and the healthy branch's outcome is
	// still observable, not silently dropped
	let message = err.to_string();
	assert!(message.contains("fast_failing"));
	assert!(message.contains("broken pipe"));
	assert_eq!(injector.get::<String>().unwrap(), "survived");
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dependents_of_a_failure_never_run() {
	// Arrange
	let started = Arc::new(AtomicBool::new(false));
	let dependent_started = Arc::clone(&started);
	let injector = concurrent_injector();
	injector
		.provide((
			Func::try_new("failing", || -> Result<u32, std::io::Error> {
				Err(std::io::Error::other("no value"))
			}),
			Func::new("dependent", move |n: u32| {
				dependent_started.store(true, Ordering::SeqCst);
				u64::from(n)
			}),
		))
		.unwrap();

	// Act
	let err = injector.run().await.unwrap_err();

	// Assert: only the root failure is reported; the dependent aborted
	// without running
	assert!(matches!(err, InjectError::ProviderFailed { .. }));
	assert!(!started.load(Ordering::SeqCst));
	assert!(matches!(
		injector.get::<u64>().unwrap_err(),
		InjectError::NotInitialized { .. }
	));
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicking_provider_is_recovered_and_reported() {
	// Arrange
	let injector = concurrent_injector();
	injector
		.provide((
			Func::new("panicky", || -> u32 { panic!("sliced wire") }),
			Func::new("calm", || "still here".to_string()),
		))
		.unwrap();

	// Act
	let err = injector.run().await.unwrap_err();

	// Assert: the panic became a typed failure and the unrelated branch
	// still completed
	match err {
		InjectError::ProviderPanicked { provider, message, .. } => {
			assert_eq!(provider, "panicky");
			assert!(message.contains("sliced wire"));
		}
		other => panic!("expected panic recovery, got {other:?}"),
	}
	assert_eq!(injector.get::<String>().unwrap(), "still here");
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_failures_are_aggregated_by_provider() {
	// Arrange: two failing providers with no dependency relation; both
	// start before either can cancel the other
	let injector = concurrent_injector();
	injector
		.provide((
			Func::try_new("first_failing", || -> Result<u32, std::io::Error> {
				Err(std::io::Error::other("first cause"))
			}),
			Func::try_new("second_failing", || -> Result<u64, std::io::Error> {
				Err(std::io::Error::other("second cause"))
			}),
		))
		.unwrap();

	// Act
	let err = injector.run().await.unwrap_err();

	// Assert
	let report = err.to_string();
	assert!(report.contains("first_failing"));
	assert!(report.contains("second_failing"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn second_run_while_active_is_rejected() {
	// Arrange: keep the first run busy long enough to observe the guard
	let injector = concurrent_injector();
	injector
		.provide(Func::new("slow", || {
			std::thread::sleep(Duration::from_millis(200));
			1u32
		}))
		.unwrap();
	let active = injector.clone();
	let first = tokio::spawn(async move { active.run().await });
	tokio::time::sleep(Duration::from_millis(50)).await;

	// Act
	let err = injector.run().await.unwrap_err();

	// Assert
	assert!(matches!(err, InjectError::AlreadyRunning));
	first.await.unwrap().unwrap();
	assert_eq!(injector.get::<u32>().unwrap(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reentrant_registration_executes_next_cycle_concurrently() {
	// Arrange
	let injector = concurrent_injector();
	let handle = injector.clone();
	injector
		.provide((
			Value::new(3u32),
			Func::new("spawner", move |n: u32| {
				let late = n + 1;
				handle
					.provide(Func::new("late", move || late as f64))
					.expect("pending registration is buffered");
				i64::from(n)
			}),
		))
		.unwrap();

	// Act
	injector.run().await.unwrap();

	// Assert
	assert_eq!(injector.get::<i64>().unwrap(), 3);
	assert_eq!(injector.get::<f64>().unwrap(), 4.0);
}
