//! Constructible target types and the namespace names are resolved against.

use std::any::{Any, TypeId, type_name};
use std::collections::hash_map::Entry;
use std::fmt;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::error::DslError;
use crate::naming::{constant_to_name, demodulize, name_to_constant};

/// A type a definition can construct from positional arguments.
pub trait Constructible: Any + Send + Sized {
	fn construct(args: &[Value]) -> anyhow::Result<Self>;
}

/// A constructed, type-erased instance.
pub struct Instance {
	value: Box<dyn Any + Send>,
	type_name: &'static str,
}

impl Instance {
	pub fn new<T: Any + Send>(value: T) -> Self {
		Self {
			value: Box::new(value),
			type_name: type_name::<T>(),
		}
	}

	/// Full type path of the wrapped value.
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	pub fn type_id(&self) -> TypeId {
		(*self.value).type_id()
	}

	pub fn is<T: Any>(&self) -> bool {
		self.value.is::<T>()
	}

	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		self.value.downcast_ref()
	}

	pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
		self.value.downcast_mut()
	}

	/// Unwraps the instance as a `T`, handing it back unchanged on mismatch.
	pub fn downcast<T: Any>(self) -> Result<T, Self> {
		let type_name = self.type_name;
		self.value
			.downcast::<T>()
			.map(|boxed| *boxed)
			.map_err(|value| Self { value, type_name })
	}

	/// Like [`Instance::downcast`] but reports a mismatch as a [`DslError`].
	pub fn into_inner<T: Any>(self) -> Result<T, DslError> {
		self.downcast().map_err(|instance| DslError::TypeMismatch {
			expected: type_name::<T>(),
			found: instance.type_name,
		})
	}
}

impl fmt::Debug for Instance {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Instance")
			.field("type", &self.type_name)
			.finish_non_exhaustive()
	}
}

/// Erased constructor shared by every definition of a target.
pub type ConstructorFn = fn(&[Value]) -> anyhow::Result<Instance>;

fn construct_erased<T: Constructible>(args: &[Value]) -> anyhow::Result<Instance> {
	T::construct(args).map(Instance::new)
}

/// Handle to a [`Constructible`] type.
#[derive(Clone, Copy)]
pub struct TargetType {
	type_id: TypeId,
	type_name: &'static str,
	constructor: ConstructorFn,
}

impl TargetType {
	pub fn of<T: Constructible>() -> Self {
		Self {
			type_id: TypeId::of::<T>(),
			type_name: type_name::<T>(),
			constructor: construct_erased::<T>,
		}
	}

	pub fn type_id(&self) -> TypeId {
		self.type_id
	}

	/// Full type path, e.g. `app::media::Photo`.
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// Type name without its module path, e.g. `Photo`.
	pub fn short_name(&self) -> &'static str {
		demodulize(self.type_name)
	}

	/// Canonical DSL name, e.g. `photo`.
	pub fn dsl_name(&self) -> String {
		constant_to_name(self.type_name)
	}

	pub fn constructor(&self) -> ConstructorFn {
		self.constructor
	}

	pub fn is<T: Any>(&self) -> bool {
		self.type_id == TypeId::of::<T>()
	}
}

impl PartialEq for TargetType {
	fn eq(&self, other: &Self) -> bool {
		self.type_id == other.type_id
	}
}

impl Eq for TargetType {}

impl fmt::Debug for TargetType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("TargetType").field(&self.type_name).finish()
	}
}

/// What a definition is declared for: a type, or a name to resolve to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef {
	Type(TargetType),
	Name(String),
}

impl TargetRef {
	pub fn of<T: Constructible>() -> Self {
		Self::Type(TargetType::of::<T>())
	}

	/// Name a definition gets when none is given explicitly.
	///
	/// Types map to their snake_cased short name; names are kept verbatim.
	pub fn canonical_name(&self) -> String {
		match self {
			Self::Type(target) => target.dsl_name(),
			Self::Name(name) => name.clone(),
		}
	}
}

impl fmt::Display for TargetRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Type(target) => f.write_str(target.type_name()),
			Self::Name(name) => write!(f, ":{name}"),
		}
	}
}

impl From<TargetType> for TargetRef {
	fn from(target: TargetType) -> Self {
		Self::Type(target)
	}
}

impl From<&str> for TargetRef {
	fn from(name: &str) -> Self {
		Self::Name(name.to_string())
	}
}

impl From<String> for TargetRef {
	fn from(name: String) -> Self {
		Self::Name(name)
	}
}

/// Types that names can be resolved to, keyed by short type name.
#[derive(Default)]
pub struct TypeNamespace {
	types: RwLock<FxHashMap<String, TargetType>>,
}

impl TypeNamespace {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes `T` resolvable under its short type name unless that name is
	/// taken by another type.
	pub fn insert<T: Constructible>(&self) -> TargetType {
		let target = TargetType::of::<T>();
		self.insert_as(target.short_name(), target);
		target
	}

	/// Makes `target` resolvable under `constant`.
	///
	/// Returns `false`, leaving the binding unchanged, if `constant` is already
	/// bound to a different type.
	pub fn insert_as(&self, constant: impl Into<String>, target: TargetType) -> bool {
		let constant = constant.into();
		let mut types = self.types.write();
		match types.entry(constant) {
			Entry::Occupied(bound) if *bound.get() != target => {
				tracing::warn!(
					constant = %bound.key(),
					bound = bound.get().type_name(),
					rejected = target.type_name(),
					"type name already bound"
				);
				false
			}
			Entry::Occupied(_) => true,
			Entry::Vacant(slot) => {
				tracing::trace!(constant = %slot.key(), target = target.type_name(), "type bound");
				slot.insert(target);
				true
			}
		}
	}

	pub fn get(&self, constant: &str) -> Option<TargetType> {
		self.types.read().get(constant).copied()
	}

	/// Resolves a DSL name or type name: exact match first, then the
	/// UpperCamelCase form of the name.
	pub fn resolve(&self, name: &str) -> Option<TargetType> {
		self.get(name).or_else(|| self.get(&name_to_constant(name)))
	}

	/// Resolves a [`TargetRef`]; types resolve to themselves.
	pub fn resolve_ref(&self, target: &TargetRef) -> Option<TargetType> {
		match target {
			TargetRef::Type(target) => Some(*target),
			TargetRef::Name(name) => self.resolve(name),
		}
	}

	pub fn contains(&self, constant: &str) -> bool {
		self.types.read().contains_key(constant)
	}

	pub fn len(&self) -> usize {
		self.types.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl fmt::Debug for TypeNamespace {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let types = self.types.read();
		let mut names: Vec<&str> = types.keys().map(String::as_str).collect();
		names.sort_unstable();
		f.debug_struct("TypeNamespace").field("types", &names).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Debug, PartialEq)]
	struct Widget {
		label: String,
	}

	impl Constructible for Widget {
		fn construct(args: &[Value]) -> anyhow::Result<Self> {
			let label = match args.first() {
				None => String::new(),
				Some(Value::String(label)) => label.clone(),
				Some(other) => anyhow::bail!("label must be a string, got {other}"),
			};
			Ok(Self { label })
		}
	}

	struct Gadget;

	impl Constructible for Gadget {
		fn construct(_: &[Value]) -> anyhow::Result<Self> {
			Ok(Self)
		}
	}

	#[test]
	fn test_target_type_constructs_erased_instance() {
		let target = TargetType::of::<Widget>();
		assert_eq!(target.short_name(), "Widget");
		assert_eq!(target.dsl_name(), "widget");

		let instance = (target.constructor())(&[Value::from("hello")]).unwrap();
		assert!(instance.is::<Widget>());
		assert_eq!(instance.type_id(), TypeId::of::<Widget>());
		assert_eq!(instance.downcast_ref::<Widget>().unwrap().label, "hello");
	}

	#[test]
	fn test_constructor_errors_propagate() {
		let target = TargetType::of::<Widget>();
		let err = (target.constructor())(&[Value::from(3)]).unwrap_err();
		assert!(err.to_string().contains("label must be a string"));
	}

	#[test]
	fn test_instance_downcast_mismatch_returns_instance() {
		let instance = Instance::new(Gadget);
		let back = instance.downcast::<Widget>().unwrap_err();
		assert!(back.is::<Gadget>());

		match back.into_inner::<Widget>() {
			Err(DslError::TypeMismatch { expected, found }) => {
				assert!(expected.ends_with("Widget"));
				assert!(found.ends_with("Gadget"));
			}
			other => panic!("expected TypeMismatch, got {other:?}"),
		}
	}

	#[test]
	fn test_namespace_resolves_snake_case_names() {
		let types = TypeNamespace::new();
		assert!(types.is_empty());
		types.insert::<Widget>();

		assert_eq!(types.resolve("widget"), Some(TargetType::of::<Widget>()));
		assert_eq!(types.resolve("Widget"), Some(TargetType::of::<Widget>()));
		assert_eq!(types.resolve("gadget"), None);
		assert!(types.resolve_ref(&TargetRef::of::<Gadget>()).is_some());
	}

	#[test]
	fn test_namespace_keeps_first_binding_per_name() {
		let types = TypeNamespace::new();
		assert!(types.insert_as("Widget", TargetType::of::<Widget>()));
		assert!(types.insert_as("Widget", TargetType::of::<Widget>()));
		assert!(!types.insert_as("Widget", TargetType::of::<Gadget>()));

		assert!(types.resolve("widget").unwrap().is::<Widget>());
		assert_eq!(types.len(), 1);
	}

	#[test]
	fn test_namespace_alias_binding() {
		let types = TypeNamespace::new();
		assert!(types.insert_as("File", TargetType::of::<Gadget>()));
		assert!(types.contains("File"));
		assert!(types.resolve("file").unwrap().is::<Gadget>());
		assert_eq!(types.len(), 1);
	}

	#[test]
	fn test_target_ref_canonical_name() {
		assert_eq!(TargetRef::of::<Widget>().canonical_name(), "widget");
		assert_eq!(TargetRef::from("custom").canonical_name(), "custom");
		assert_eq!(TargetRef::from("custom").to_string(), ":custom");
	}
}
