//! # Quintette
//!
//! Typed provider-graph resolution and execution engine.
//!
//! Register *providers* (static values, constructor functions, or
//! decomposed aggregates), each supplying and/or requiring named, typed
//! dependencies. The [`Injector`] builds the dependency graph, rejects
//! conflicts and cycles, orders providers so every dependency resolves
//! before its consumers run, executes them, and hands resolved values back
//! out by type and name.
//!
//! ## Features
//!
//! - **Typed**: dependencies are matched by type token plus an optional
//!   discriminator name; retrieval is fully typed.
//! - **Two execution strategies**: deterministic sequential execution, or
//!   one tokio task per provider where each starts as soon as its own
//!   dependencies finish ([`ExecutionStrategy`]).
//! - **Fault isolation**: under the concurrent strategy a failing or
//!   panicking provider aborts only its dependents; independent branches
//!   complete and every outcome is collected.
//! - **Re-entrant**: providers may register further providers mid-run;
//!   they execute in the next cycle.
//! - **Decomposition**: aggregates can be provided and retrieved as their
//!   constituent fields ([`Bundle`]).
//!
//! ## Example
//!
//! ```
//! use quintette::{Func, Injector, Value};
//!
//! #[derive(Clone)]
//! struct Pool {
//! 	url: String,
//! 	size: u32,
//! }
//!
//! # async fn demo() -> quintette::InjectResult<()> {
//! let injector = Injector::new();
//! injector.provide((
//! 	Value::new(String::from("postgres://localhost")),
//! 	Value::new(8u32),
//! 	Func::new("open_pool", |url: String, size: u32| Pool { url, size }),
//! ))?;
//! injector.run().await?;
//!
//! let pool: Pool = injector.get()?;
//! assert_eq!(pool.size, 8);
//! # Ok(())
//! # }
//! ```

mod blueprint;
mod bundle;
mod error;
mod injector;
mod key;
mod providers;
mod queue;
mod registry;
mod runner;

pub use blueprint::{Blueprint, ProviderCall, Register};
pub use bundle::{Bundle, DynValue};
pub use error::{InjectError, InjectResult, ProviderFault};
pub use injector::Injector;
pub use key::DependencyKey;
pub use providers::{Fields, Func, ProviderArgs, ProviderFn, Value};
pub use runner::ExecutionStrategy;
