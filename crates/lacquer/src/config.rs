//! Definition options and the TOML manifest of declared DSLs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::definition::{Definition, RuleFn};
use crate::error::ConfigError;
use crate::lacquer::Lacquer;
use crate::target::{Instance, TargetRef};

/// Options accepted by [`Lacquer::define_dsl`].
#[derive(Default, Clone)]
pub struct DslOptions {
	/// Registered name; defaults to the target reference's canonical name.
	pub name: Option<String>,
	/// What to construct, when it differs from the target reference.
	pub target: Option<TargetRef>,
	/// Version string; defaults to `1.0.0`.
	pub version: Option<String>,
	pub rules: BTreeMap<String, RuleFn>,
}

impl DslOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_target(mut self, target: impl Into<TargetRef>) -> Self {
		self.target = Some(target.into());
		self
	}

	pub fn with_version(mut self, version: impl Into<String>) -> Self {
		self.version = Some(version.into());
		self
	}

	/// Adds a named configuration rule, replacing one of the same name.
	pub fn with_rule(
		mut self,
		rule: impl Into<String>,
		behavior: impl Fn(&mut Instance, &[Value]) -> anyhow::Result<()> + Send + Sync + 'static,
	) -> Self {
		self.rules.insert(rule.into(), Arc::new(behavior));
		self
	}
}

impl fmt::Debug for DslOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DslOptions")
			.field("name", &self.name)
			.field("target", &self.target)
			.field("version", &self.version)
			.field("rules", &self.rules.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// A list of DSLs to define, read from TOML:
///
/// ```toml
/// [[dsl]]
/// name = "photo"
/// version = "1.1"
///
/// [[dsl]]
/// name = "snapshot"
/// for = "Photo"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DslManifest {
	#[serde(rename = "dsl", default)]
	pub entries: Vec<ManifestEntry>,
}

/// One `[[dsl]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
	pub name: String,
	/// Type name to construct; defaults to `name`.
	#[serde(rename = "for", default)]
	pub target: Option<String>,
	#[serde(default)]
	pub version: Option<String>,
}

impl ManifestEntry {
	fn options(&self) -> DslOptions {
		DslOptions {
			name: None,
			target: self.target.as_deref().map(TargetRef::from),
			version: self.version.clone(),
			rules: BTreeMap::new(),
		}
	}
}

impl DslManifest {
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(input)?)
	}

	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&input)
	}

	/// Defines every entry in order.
	///
	/// # Errors
	///
	/// Stops at the first entry that fails with [`ConfigError::Entry`];
	/// entries before it stay registered.
	pub fn apply(&self, lacquer: &Lacquer) -> Result<Vec<Arc<Definition>>, ConfigError> {
		let mut defined = Vec::with_capacity(self.entries.len());
		for (index, entry) in self.entries.iter().enumerate() {
			let definition = lacquer
				.define_dsl(entry.name.as_str(), entry.options())
				.map_err(|source| ConfigError::Entry {
					index,
					name: entry.name.clone(),
					source,
				})?;
			defined.push(definition);
		}
		tracing::debug!(entries = defined.len(), "manifest applied");
		Ok(defined)
	}
}
