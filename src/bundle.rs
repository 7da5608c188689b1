//! Aggregate decomposition

use crate::key::DependencyKey;
use std::any::Any;
use std::sync::Arc;

/// Type-erased shared dependency value.
pub type DynValue = Arc<dyn Any + Send + Sync>;

/// An aggregate whose fields are independent dependencies.
///
/// Implementations give each field its own [`DependencyKey`]: by
/// convention the field name, or any explicit label when the aggregate
/// carries several values of the same type. A field deliberately excluded
/// from decomposition is simply left out of `keys` and restored with a
/// default in `assemble`.
///
/// `keys`, `split`, and `assemble` must agree on one fixed field order.
///
/// # Examples
///
/// ```
/// use quintette::{Bundle, DependencyKey, DynValue};
/// use std::sync::Arc;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Endpoint {
/// 	host: String,
/// 	port: u16,
/// }
///
/// impl Bundle for Endpoint {
/// 	fn keys() -> Vec<DependencyKey> {
/// 		vec![
/// 			DependencyKey::named::<String>("host"),
/// 			DependencyKey::named::<u16>("port"),
/// 		]
/// 	}
///
/// 	fn split(self) -> Vec<DynValue> {
/// 		vec![Arc::new(self.host), Arc::new(self.port)]
/// 	}
///
/// 	fn assemble(mut values: Vec<DynValue>) -> Option<Self> {
/// 		let port = values.pop()?.downcast::<u16>().ok()?;
/// 		let host = values.pop()?.downcast::<String>().ok()?;
/// 		Some(Endpoint {
/// 			host: (*host).clone(),
/// 			port: *port,
/// 		})
/// 	}
/// }
///
/// let endpoint = Endpoint {
/// 	host: "localhost".to_string(),
/// 	port: 5432,
/// };
/// let values = endpoint.clone().split();
/// assert_eq!(Endpoint::assemble(values), Some(endpoint));
/// ```
pub trait Bundle: Sized + Send + Sync + 'static {
	/// Field keys, in the fixed order shared by `split` and `assemble`.
	fn keys() -> Vec<DependencyKey>;

	/// Break the aggregate into one value per key, in `keys` order.
	fn split(self) -> Vec<DynValue>;

	/// Rebuild the aggregate from one value per key, in `keys` order.
	///
	/// Returns `None` when a value does not downcast to its declared field
	/// type.
	fn assemble(values: Vec<DynValue>) -> Option<Self>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Clone, Debug, PartialEq)]
	struct Credentials {
		user: String,
		attempts: u32,
	}

	impl Bundle for Credentials {
		fn keys() -> Vec<DependencyKey> {
			vec![
				DependencyKey::named::<String>("user"),
				DependencyKey::named::<u32>("attempts"),
			]
		}

		fn split(self) -> Vec<DynValue> {
			vec![Arc::new(self.user), Arc::new(self.attempts)]
		}

		fn assemble(mut values: Vec<DynValue>) -> Option<Self> {
			let attempts = values.pop()?.downcast::<u32>().ok()?;
			let user = values.pop()?.downcast::<String>().ok()?;
			Some(Self {
				user: (*user).clone(),
				attempts: *attempts,
			})
		}
	}

	#[test]
	fn test_split_assemble_round_trip() {
		let original = Credentials {
			user: "admin".to_string(),
			attempts: 3,
		};

		let values = original.clone().split();
		let rebuilt = Credentials::assemble(values);

		assert_eq!(rebuilt, Some(original));
	}

	#[test]
	fn test_assemble_rejects_wrong_types() {
		let values: Vec<DynValue> = vec![Arc::new(1u8), Arc::new(2u8)];
		assert_eq!(Credentials::assemble(values), None);
	}

	#[test]
	fn test_keys_are_named_per_field() {
		let keys = Credentials::keys();
		assert_eq!(keys.len(), 2);
		assert_eq!(keys[0].name(), "user");
		assert_eq!(keys[1].name(), "attempts");
	}
}
