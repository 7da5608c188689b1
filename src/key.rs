//! Dependency keys

use std::any::TypeId;
use std::fmt;

/// Identity of a required or supplied value: a type token plus an optional
/// discriminator name.
///
/// An empty name means "default/unnamed". An unnamed entry also serves as
/// the fallback candidate when no exact-name match exists, so a consumer
/// asking for a named dependency can still be satisfied by the default one.
///
/// # Examples
///
/// ```
/// use quintette::DependencyKey;
///
/// let unnamed = DependencyKey::of::<u16>();
/// let named = DependencyKey::named::<u16>("port");
///
/// assert!(unnamed.is_unnamed());
/// assert_eq!(named.name(), "port");
/// assert_ne!(unnamed, named);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyKey {
	type_id: TypeId,
	type_name: &'static str,
	name: String,
}

impl DependencyKey {
	/// Key for the default (unnamed) dependency of type `T`.
	pub fn of<T: 'static>() -> Self {
		Self {
			type_id: TypeId::of::<T>(),
			type_name: std::any::type_name::<T>(),
			name: String::new(),
		}
	}

	/// Key for the dependency of type `T` discriminated by `name`.
	pub fn named<T: 'static>(name: impl Into<String>) -> Self {
		Self {
			type_id: TypeId::of::<T>(),
			type_name: std::any::type_name::<T>(),
			name: name.into(),
		}
	}

	/// The type token this key identifies.
	pub fn type_id(&self) -> TypeId {
		self.type_id
	}

	/// Human-readable name of the keyed type.
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// The discriminator name; empty for the default dependency.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Whether this is the default (unnamed) key of its type.
	pub fn is_unnamed(&self) -> bool {
		self.name.is_empty()
	}
}

impl fmt::Display for DependencyKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.name.is_empty() {
			write!(f, "{}", self.type_name)
		} else {
			write!(f, "{}#{}", self.type_name, self.name)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unnamed_display() {
		let key = DependencyKey::of::<u32>();
		assert_eq!(key.to_string(), "u32");
	}

	#[test]
	fn test_named_display() {
		let key = DependencyKey::named::<u32>("port");
		assert_eq!(key.to_string(), "u32#port");
	}

	#[test]
	fn test_equality_is_structural() {
		assert_eq!(DependencyKey::of::<String>(), DependencyKey::of::<String>());
		assert_eq!(
			DependencyKey::named::<String>("a"),
			DependencyKey::named::<String>("a")
		);
		assert_ne!(
			DependencyKey::named::<String>("a"),
			DependencyKey::named::<String>("b")
		);
		assert_ne!(DependencyKey::of::<String>(), DependencyKey::of::<u32>());
	}

	#[test]
	fn test_named_with_empty_string_is_unnamed() {
		let key = DependencyKey::named::<u32>("");
		assert!(key.is_unnamed());
		assert_eq!(key, DependencyKey::of::<u32>());
	}
}
