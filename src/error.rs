//! Engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type InjectResult<T> = Result<T, InjectError>;

/// Boxed cause returned by a fallible provider.
pub type ProviderFault = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Engine errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InjectError {
	/// A requested dependency has no registered provider.
	#[error("dependency {dependency} not found")]
	NotFound {
		/// Display form of the missing key.
		dependency: String,
	},

	/// A provider requires a dependency no one supplies.
	#[error("provider '{provider}' requires missing dependency: {dependency}")]
	MissingDependency {
		/// Provider with the requirement.
		provider: String,
		/// Display form of the missing key.
		dependency: String,
	},

	/// The dependency is registered but its provider has not produced a
	/// value yet.
	#[error("dependency {dependency} not initialized")]
	NotInitialized {
		/// Display form of the uninitialized key.
		dependency: String,
	},

	/// A provider was invoked before one of its inputs was produced.
	#[error("provider '{provider}' requires uninitialized dependency: {dependency}")]
	UninitializedDependency {
		/// Provider with the requirement.
		provider: String,
		/// Display form of the uninitialized key.
		dependency: String,
	},

	/// Two providers supply the same (type, name) pair.
	#[error("conflicting providers for {type_name}: {existing}, {incoming}")]
	Conflict {
		/// The contested type.
		type_name: String,
		/// Provider already owning the slot.
		existing: String,
		/// Provider whose registration was rejected.
		incoming: String,
	},

	/// The dependency graph contains a cycle.
	#[error("circular dependency detected: {}", .path.join(" -> "))]
	Cycle {
		/// Provider names along the recursion path that closed the cycle.
		path: Vec<String>,
	},

	/// A provider's failure slot was taken.
	#[error("provider '{provider}' failed: {source}")]
	ProviderFailed {
		/// The failing provider.
		provider: String,
		/// Underlying cause.
		#[source]
		source: ProviderFault,
	},

	/// A provider panicked under the concurrent strategy.
	#[error("provider '{provider}' panicked: {message}")]
	ProviderPanicked {
		/// The panicking provider.
		provider: String,
		/// Panic payload, when it carried one.
		message: String,
		/// Stack captured at the recovery point.
		backtrace: String,
	},

	/// A second run was started while one is active.
	#[error("injector is already running")]
	AlreadyRunning,

	/// A stored value did not downcast to the type its key declares.
	#[error("dependency {dependency} resolved to a value of an unexpected type")]
	TypeMismatch {
		/// Display form of the offending key.
		dependency: String,
	},

	/// One or more requirements could not be resolved during validation.
	#[error("{report}")]
	Unresolved {
		/// One missing-dependency message per line.
		report: String,
	},

	/// One or more providers failed during a concurrent cycle.
	#[error("{report}")]
	Failures {
		/// One provider failure per line.
		report: String,
	},
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_not_found_display() {
		let err = InjectError::NotFound {
			dependency: "u32#port".to_string(),
		};
		assert_eq!(err.to_string(), "dependency u32#port not found");
	}

	#[test]
	fn test_missing_dependency_display() {
		let err = InjectError::MissingDependency {
			provider: "open_pool".to_string(),
			dependency: "String".to_string(),
		};
		assert_eq!(
			err.to_string(),
			"provider 'open_pool' requires missing dependency: String"
		);
	}

	#[test]
	fn test_not_initialized_display() {
		let err = InjectError::NotInitialized {
			dependency: "f64".to_string(),
		};
		assert_eq!(err.to_string(), "dependency f64 not initialized");
	}

	#[test]
	fn test_conflict_display() {
		let err = InjectError::Conflict {
			type_name: "u32".to_string(),
			existing: "first".to_string(),
			incoming: "second".to_string(),
		};
		assert_eq!(
			err.to_string(),
			"conflicting providers for u32: first, second"
		);
	}

	#[test]
	fn test_cycle_display_joins_path() {
		let err = InjectError::Cycle {
			path: vec!["a".to_string(), "b".to_string(), "a".to_string()],
		};
		assert_eq!(err.to_string(), "circular dependency detected: a -> b -> a");
	}

	#[test]
	fn test_provider_failed_display_wraps_cause() {
		let cause: ProviderFault = "connection refused".into();
		let err = InjectError::ProviderFailed {
			provider: "open_pool".to_string(),
			source: cause,
		};
		assert_eq!(
			err.to_string(),
			"provider 'open_pool' failed: connection refused"
		);
	}

	#[test]
	fn test_already_running_display() {
		assert_eq!(
			InjectError::AlreadyRunning.to_string(),
			"injector is already running"
		);
	}
}
