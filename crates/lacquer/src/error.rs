use std::path::PathBuf;

use crate::definition::DefinitionId;

/// Boxed error carried as the `source` of constructor and block failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while parsing versions and version requirements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
	/// The input was empty after trimming.
	#[error("empty version string")]
	Empty,
	/// A version string could not be parsed.
	#[error("invalid version {input:?}: {reason}")]
	InvalidVersion { input: String, reason: &'static str },
	/// A requirement clause could not be parsed.
	#[error("invalid requirement clause {clause:?}: {reason}")]
	InvalidClause { clause: String, reason: &'static str },
}

/// Errors surfaced by registration, resolution and invocation.
#[derive(Debug, thiserror::Error)]
pub enum DslError {
	/// The target could not be resolved to a constructible type.
	#[error("invalid DSL target: {target}")]
	InvalidTarget { target: String },

	/// No registered definition matched a name and requirement.
	#[error("no DSL named `{name}`{}", describe_requirement(.requirement))]
	NotFound {
		name: String,
		requirement: Option<String>,
	},

	/// A mixin was invoked after its definition left the registry.
	#[error("definition `{name}` ({identity}) is no longer registered")]
	DefinitionGone { name: String, identity: DefinitionId },

	/// The requested operation is not exposed by the mixin (or mixin set).
	#[error("undefined operation `{operation}` (available: {})", .available.join(", "))]
	UndefinedOperation {
		operation: String,
		available: Vec<String>,
	},

	/// The target constructor rejected its arguments.
	#[error("failed to construct `{name}`: {source}")]
	Construct {
		name: String,
		#[source]
		source: BoxError,
	},

	/// A configuration block returned an error.
	#[error("configuration block for `{name}` failed: {source}")]
	Block {
		name: String,
		#[source]
		source: BoxError,
	},

	/// A configuration rule returned an error.
	#[error("rule `{rule}` on `{name}` failed: {source}")]
	Rule {
		name: String,
		rule: String,
		#[source]
		source: BoxError,
	},

	/// The definition has no rule with this name.
	#[error("`{name}` has no configuration rule `{rule}`")]
	UnknownRule { name: String, rule: String },

	/// A constructed instance was not of the requested type.
	#[error("expected an instance of `{expected}`, found `{found}`")]
	TypeMismatch {
		expected: &'static str,
		found: &'static str,
	},

	#[error(transparent)]
	Version(#[from] VersionError),
}

fn describe_requirement(requirement: &Option<String>) -> String {
	match requirement {
		Some(req) => format!(" matching `{req}`"),
		None => String::new(),
	}
}

/// Errors raised while loading and applying a DSL manifest.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read manifest {}: {source}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid manifest: {0}")]
	Parse(#[from] toml::de::Error),

	/// A manifest entry failed to register; earlier entries stay registered.
	#[error("manifest entry {index} (`{name}`): {source}")]
	Entry {
		index: usize,
		name: String,
		#[source]
		source: DslError,
	},
}
