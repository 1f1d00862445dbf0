//! Versioned DSL definitions with lazily resolved entry points.
//!
//! Types register a named, versioned [`Definition`] that associates a symbol
//! with a constructor and configuration rules. Consumers resolve a name
//! (optionally within a [`VersionRequirement`]) into a [`Mixin`] whose single
//! operation constructs a fresh instance and runs a configuration [`Block`]
//! against it.
//!
//! # Modules
//!
//! - [`registry`] - Snapshot-published collection and winner selection
//! - [`definition`] - Immutable name/version/target associations
//! - [`mixin`] - Entry points bound to a definition identity
//! - [`runner`] - Receiver binding for configuration blocks
//! - [`version`] - Versions and comparison requirements
//! - [`target`] - Constructible types and name resolution
//! - [`config`] - Definition options and TOML manifests
//! - [`naming`] - Type name / DSL name conversions
//!
//! # Example
//!
//! ```
//! use lacquer::{Constructible, DslOptions, Lacquer};
//! use serde_json::Value;
//!
//! #[derive(Default)]
//! struct Photo {
//! 	caption: String,
//! }
//!
//! impl Constructible for Photo {
//! 	fn construct(_: &[Value]) -> anyhow::Result<Self> {
//! 		Ok(Self::default())
//! 	}
//! }
//!
//! let lacquer = Lacquer::new();
//! lacquer.declare_dsl::<Photo>(DslOptions::new().with_version("1.1"))?;
//!
//! let photo: Photo = lacquer
//! 	.resolve_mixin("photo", Some(">= 1.0"))?
//! 	.build_with(&[], |photo: &mut Photo| {
//! 		photo.caption = "harbour at dusk".into();
//! 		Ok(())
//! 	})?;
//! assert_eq!(photo.caption, "harbour at dusk");
//! # Ok::<(), lacquer::DslError>(())
//! ```

pub mod config;
pub mod definition;
pub mod error;
mod lacquer;
pub mod mixin;
pub mod naming;
pub mod registry;
pub mod runner;
pub mod target;
pub mod version;

pub use config::{DslManifest, DslOptions, ManifestEntry};
pub use definition::{Definition, DefinitionId, RuleFn};
pub use error::{BoxError, ConfigError, DslError, VersionError};
pub use lacquer::{Dsl, Lacquer};
pub use mixin::{Mixin, MixinSet};
pub use registry::{Registry, Snapshot};
pub use runner::{Block, RunnerState, ScopedRunner};
pub use target::{Constructible, Instance, TargetRef, TargetType, TypeNamespace};
pub use version::{Clause, Op, Version, VersionRequirement};
