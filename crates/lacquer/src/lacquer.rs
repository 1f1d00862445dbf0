//! Embedding facade: definition, resolution, and the process-wide instance.
//!
//! # Mental Model
//!
//! A [`Lacquer`] pairs a [`Registry`] with a [`TypeNamespace`]. Types register
//! definitions with [`Lacquer::define_dsl`] (or [`Dsl::declare_dsl`] from the
//! type itself); consumers turn a name and optional requirement into a
//! [`Mixin`] with [`Lacquer::resolve_mixin`].
//!
//! Names given as targets resolve through the namespace: an exact key first,
//! then the UpperCamelCase form of the name. A target that resolves to nothing
//! is rejected and the registry is left unchanged.

use std::sync::{Arc, OnceLock};

use crate::config::{DslManifest, DslOptions};
use crate::definition::Definition;
use crate::error::{ConfigError, DslError};
use crate::mixin::Mixin;
use crate::registry::Registry;
use crate::target::{Constructible, TargetRef, TypeNamespace};
use crate::version::{Version, VersionRequirement};

static GLOBAL: OnceLock<Lacquer> = OnceLock::new();

/// Registry of DSL definitions plus the types their targets resolve against.
#[derive(Debug)]
pub struct Lacquer {
	registry: Arc<Registry>,
	types: TypeNamespace,
}

impl Lacquer {
	pub fn new() -> Self {
		Self::with_registry(Arc::new(Registry::default()))
	}

	pub fn with_registry(registry: Arc<Registry>) -> Self {
		Self {
			registry,
			types: TypeNamespace::new(),
		}
	}

	/// Process-wide instance, created on first use.
	pub fn global() -> &'static Lacquer {
		GLOBAL.get_or_init(|| Lacquer::with_registry(Arc::new(Registry::new("global"))))
	}

	pub fn registry(&self) -> &Arc<Registry> {
		&self.registry
	}

	pub fn types(&self) -> &TypeNamespace {
		&self.types
	}

	/// Builds and registers a definition for `target`.
	///
	/// The name defaults to the target's canonical name; `options.target`
	/// overrides what gets constructed while keeping that name.
	///
	/// # Errors
	///
	/// - [`DslError::InvalidTarget`] if the target does not resolve to a type.
	/// - [`DslError::Version`] if `options.version` is malformed.
	pub fn define_dsl(
		&self,
		target: impl Into<TargetRef>,
		options: DslOptions,
	) -> Result<Arc<Definition>, DslError> {
		let reference = target.into();
		let DslOptions {
			name,
			target: explicit,
			version,
			rules,
		} = options;

		let name = name.unwrap_or_else(|| reference.canonical_name());
		let wanted = explicit.unwrap_or(reference);
		let Some(target) = self.types.resolve_ref(&wanted) else {
			tracing::warn!(dsl = %name, target = %wanted, "rejected DSL target");
			return Err(DslError::InvalidTarget {
				target: wanted.to_string(),
			});
		};

		let version = match version.as_deref() {
			Some(input) => Version::parse(input)?,
			None => Version::BASELINE,
		};

		Ok(self
			.registry
			.register(Arc::new(Definition::new(name, target, version, rules))))
	}

	/// Defines a DSL for `T` and, once registered, makes `T` resolvable by
	/// name. A short name already bound to another type keeps its binding.
	pub fn declare_dsl<T: Constructible>(&self, options: DslOptions) -> Result<Arc<Definition>, DslError> {
		let definition = self.define_dsl(TargetRef::of::<T>(), options)?;
		self.types.insert::<T>();
		Ok(definition)
	}

	/// Highest-versioned definition named `name` within `requirement`.
	///
	/// # Errors
	///
	/// Only a malformed requirement is an error; no match is `Ok(None)`.
	pub fn lookup(&self, name: &str, requirement: Option<&str>) -> Result<Option<Arc<Definition>>, DslError> {
		let requirement = requirement.map(VersionRequirement::parse).transpose()?;
		Ok(self
			.registry
			.find_by_name_and_constraint(name, requirement.as_ref()))
	}

	/// Resolves `name` to a mixin for the winning definition.
	///
	/// # Errors
	///
	/// - [`DslError::NotFound`] if nothing matches.
	/// - [`DslError::Version`] if `requirement` is malformed.
	pub fn resolve_mixin(&self, name: &str, requirement: Option<&str>) -> Result<Mixin, DslError> {
		let definition = self.lookup(name, requirement)?.ok_or_else(|| DslError::NotFound {
			name: name.to_string(),
			requirement: requirement.map(str::to_string),
		})?;
		Ok(self.to_module(&definition))
	}

	/// Fresh mixin for `definition`; repeated calls are equivalent, not cached.
	pub fn to_module(&self, definition: &Definition) -> Mixin {
		Mixin::for_definition(&self.registry, definition)
	}

	/// Defines every manifest entry in order, stopping at the first failure.
	pub fn load_manifest(&self, manifest: &DslManifest) -> Result<Vec<Arc<Definition>>, ConfigError> {
		manifest.apply(self)
	}

	/// Drops every registered definition. Resolvable types are kept.
	///
	/// Mixins generated before the reset fail with
	/// [`DslError::DefinitionGone`].
	pub fn reset(&self) {
		self.registry.clear();
	}
}

impl Default for Lacquer {
	fn default() -> Self {
		Self::new()
	}
}

/// Shortcut for a type declaring its own DSL.
pub trait Dsl: Constructible {
	/// Declares a DSL for `Self` on the process-wide instance.
	fn declare_dsl(options: DslOptions) -> Result<Arc<Definition>, DslError> {
		Self::declare_dsl_in(Lacquer::global(), options)
	}

	fn declare_dsl_in(lacquer: &Lacquer, options: DslOptions) -> Result<Arc<Definition>, DslError> {
		lacquer.declare_dsl::<Self>(options)
	}
}
