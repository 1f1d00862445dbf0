//! Entry-point capabilities generated from definitions.
//!
//! A [`Mixin`] exposes one operation, named after its definition. It keeps
//! only the definition's identity and resolves the definition from the
//! registry on every call, so it never outlives a registry reset silently and
//! never switches to a different definition registered later under the same
//! name.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::definition::{Definition, DefinitionId};
use crate::error::DslError;
use crate::registry::Registry;
use crate::runner::Block;
use crate::target::Instance;

/// One named entry point bound to a definition identity.
#[derive(Clone)]
pub struct Mixin {
	operation: String,
	identity: DefinitionId,
	registry: Arc<Registry>,
}

impl Mixin {
	/// Wraps `definition` into a fresh capability. Not cached: every call
	/// returns a new, equivalent mixin.
	pub fn for_definition(registry: &Arc<Registry>, definition: &Definition) -> Self {
		Self {
			operation: definition.name().to_string(),
			identity: definition.identity(),
			registry: Arc::clone(registry),
		}
	}

	/// Name of the single operation this mixin exposes.
	pub fn operation(&self) -> &str {
		&self.operation
	}

	pub fn identity(&self) -> DefinitionId {
		self.identity
	}

	pub fn responds_to(&self, operation: &str) -> bool {
		self.operation == operation
	}

	/// Current backing definition.
	///
	/// # Errors
	///
	/// [`DslError::DefinitionGone`] if the definition left the registry.
	pub fn resolve(&self) -> Result<Arc<Definition>, DslError> {
		self.registry
			.find_by_identity(self.identity)
			.ok_or_else(|| DslError::DefinitionGone {
				name: self.operation.clone(),
				identity: self.identity,
			})
	}

	/// Invokes `operation`, which must be the one this mixin exposes.
	pub fn invoke(
		&self,
		operation: &str,
		args: &[Value],
		block: Option<Block<'_>>,
	) -> Result<Instance, DslError> {
		if !self.responds_to(operation) {
			return Err(DslError::UndefinedOperation {
				operation: operation.to_string(),
				available: vec![self.operation.clone()],
			});
		}
		self.call(args, block)
	}

	/// Constructs a new instance and, given a block, configures it.
	///
	/// The result is always the constructed instance.
	pub fn call(&self, args: &[Value], block: Option<Block<'_>>) -> Result<Instance, DslError> {
		let definition = self.resolve()?;
		tracing::trace!(
			dsl = %self.operation,
			identity = %self.identity,
			version = %definition.version(),
			args = args.len(),
			with_block = block.is_some(),
			"mixin invoked"
		);

		let instance = definition.construct(args)?;
		match block {
			Some(block) => definition.runner().run(instance, block),
			None => Ok(instance),
		}
	}

	/// Constructs and unwraps a `T`.
	pub fn build<T: Any>(&self, args: &[Value]) -> Result<T, DslError> {
		self.call(args, None)?.into_inner()
	}

	/// Constructs a `T`, configures it with `body`, and unwraps it.
	pub fn build_with<T: Any>(
		&self,
		args: &[Value],
		body: impl FnOnce(&mut T) -> anyhow::Result<()>,
	) -> Result<T, DslError> {
		self.call(args, Some(Block::typed(body)))?.into_inner()
	}
}

impl fmt::Debug for Mixin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Mixin")
			.field("operation", &self.operation)
			.field("identity", &self.identity)
			.finish_non_exhaustive()
	}
}

/// Host-side set of attached mixins.
///
/// Operations dispatch to the most recently included mixin that exposes them,
/// so a later inclusion shadows an earlier one with the same operation.
#[derive(Debug, Clone, Default)]
pub struct MixinSet {
	mixins: Vec<Mixin>,
}

impl MixinSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn include(&mut self, mixin: Mixin) -> &mut Self {
		self.mixins.push(mixin);
		self
	}

	pub fn get(&self, operation: &str) -> Option<&Mixin> {
		self.mixins.iter().rev().find(|mixin| mixin.responds_to(operation))
	}

	pub fn responds_to(&self, operation: &str) -> bool {
		self.get(operation).is_some()
	}

	/// Exposed operations in order of first inclusion.
	pub fn operations(&self) -> Vec<&str> {
		let mut operations: Vec<&str> = Vec::with_capacity(self.mixins.len());
		for mixin in &self.mixins {
			if !operations.contains(&mixin.operation()) {
				operations.push(mixin.operation());
			}
		}
		operations
	}

	pub fn invoke(
		&self,
		operation: &str,
		args: &[Value],
		block: Option<Block<'_>>,
	) -> Result<Instance, DslError> {
		let mixin = self
			.get(operation)
			.ok_or_else(|| DslError::UndefinedOperation {
				operation: operation.to_string(),
				available: self.operations().into_iter().map(str::to_string).collect(),
			})?;
		mixin.call(args, block)
	}

	pub fn len(&self) -> usize {
		self.mixins.len()
	}

	pub fn is_empty(&self) -> bool {
		self.mixins.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use super::*;
	use crate::target::{Constructible, TargetType};
	use crate::version::Version;

	#[derive(Debug, Default)]
	struct Note {
		text: String,
	}

	impl Constructible for Note {
		fn construct(args: &[Value]) -> anyhow::Result<Self> {
			Ok(Self {
				text: args.first().and_then(Value::as_str).unwrap_or_default().to_string(),
			})
		}
	}

	#[derive(Debug)]
	struct Stamp;

	impl Constructible for Stamp {
		fn construct(_: &[Value]) -> anyhow::Result<Self> {
			Ok(Self)
		}
	}

	fn register<T: Constructible>(registry: &Arc<Registry>, name: &str, version: &str) -> Arc<Definition> {
		registry.register(Arc::new(Definition::new(
			name,
			TargetType::of::<T>(),
			Version::parse(version).unwrap(),
			BTreeMap::new(),
		)))
	}

	#[test]
	fn test_call_constructs_and_configures() {
		let registry = Arc::new(Registry::default());
		let def = register::<Note>(&registry, "note", "1.0");
		let mixin = Mixin::for_definition(&registry, &def);

		let note: Note = mixin
			.build_with(&[Value::from("draft")], |note: &mut Note| {
				note.text.push_str(" (edited)");
				Ok(())
			})
			.unwrap();
		assert_eq!(note.text, "draft (edited)");
		assert!(def.runner().is_idle());
	}

	#[test]
	fn test_invoke_checks_operation_name() {
		let registry = Arc::new(Registry::default());
		let def = register::<Note>(&registry, "note", "1.0");
		let mixin = Mixin::for_definition(&registry, &def);

		assert!(mixin.invoke("note", &[], None).is_ok());
		let err = mixin.invoke("photo", &[], None).unwrap_err();
		assert!(matches!(err, DslError::UndefinedOperation { ref operation, .. } if operation == "photo"));
	}

	#[test]
	fn test_mixin_rebinds_lazily_by_identity() {
		let registry = Arc::new(Registry::default());
		let def = register::<Note>(&registry, "note", "1.0");
		let mixin = Mixin::for_definition(&registry, &def);

		register::<Stamp>(&registry, "note", "2.0");
		assert!(mixin.call(&[], None).unwrap().is::<Note>());

		registry.clear();
		let err = mixin.call(&[], None).unwrap_err();
		assert!(matches!(err, DslError::DefinitionGone { identity, .. } if identity == def.identity()));
	}

	#[test]
	fn test_repeated_generation_is_equivalent_not_cached() {
		let registry = Arc::new(Registry::default());
		let def = register::<Note>(&registry, "note", "1.0");
		let a = Mixin::for_definition(&registry, &def);
		let b = Mixin::for_definition(&registry, &def);

		assert!(!std::ptr::eq(&a, &b));
		assert_eq!(a.identity(), b.identity());
		assert_eq!(a.operation(), b.operation());
	}

	#[test]
	fn test_build_reports_type_mismatch() {
		let registry = Arc::new(Registry::default());
		let def = register::<Stamp>(&registry, "stamp", "1.0");
		let mixin = Mixin::for_definition(&registry, &def);

		let err = mixin.build::<Note>(&[]).unwrap_err();
		assert!(matches!(err, DslError::TypeMismatch { .. }));
	}

	#[test]
	fn test_mixin_set_dispatch_and_shadowing() {
		let registry = Arc::new(Registry::default());
		let note = register::<Note>(&registry, "note", "1.0");
		let stamp = register::<Stamp>(&registry, "stamp", "1.0");
		let note_v2 = register::<Stamp>(&registry, "note", "2.0");

		let mut host = MixinSet::new();
		host.include(Mixin::for_definition(&registry, &note))
			.include(Mixin::for_definition(&registry, &stamp));

		assert_eq!(host.operations(), ["note", "stamp"]);
		assert!(host.invoke("note", &[], None).unwrap().is::<Note>());
		assert!(host.invoke("stamp", &[], None).unwrap().is::<Stamp>());

		host.include(Mixin::for_definition(&registry, &note_v2));
		assert_eq!(host.len(), 3);
		assert!(host.invoke("note", &[], None).unwrap().is::<Stamp>());

		let err = host.invoke("album", &[], None).unwrap_err();
		match err {
			DslError::UndefinedOperation { operation, available } => {
				assert_eq!(operation, "album");
				assert_eq!(available, ["note", "stamp"]);
			}
			other => panic!("expected UndefinedOperation, got {other:?}"),
		}
	}
}
