//! Registered DSL definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::error::DslError;
use crate::runner::ScopedRunner;
use crate::target::{ConstructorFn, Instance, TargetType};
use crate::version::Version;

/// Behavior of a named configuration rule.
pub type RuleFn = Arc<dyn Fn(&mut Instance, &[Value]) -> anyhow::Result<()> + Send + Sync>;

/// Opaque identity of one registration.
///
/// Unique for the life of the process, including across registries and
/// across [`crate::Registry::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefinitionId(u64);

static NEXT_DEFINITION_ID: AtomicU64 = AtomicU64::new(1);

impl DefinitionId {
	fn next() -> Self {
		Self(NEXT_DEFINITION_ID.fetch_add(1, Ordering::Relaxed))
	}

	pub fn as_u64(self) -> u64 {
		self.0
	}
}

impl fmt::Display for DefinitionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "def#{}", self.0)
	}
}

/// A named, versioned association between a symbol and a target type.
///
/// Immutable once built. Several definitions may share a name; the registry
/// picks between them by version.
pub struct Definition {
	name: String,
	target: TargetType,
	version: Version,
	constructor: ConstructorFn,
	config_rules: BTreeMap<String, RuleFn>,
	identity: DefinitionId,
	runner: ScopedRunner,
}

impl Definition {
	pub fn new(
		name: impl Into<String>,
		target: TargetType,
		version: Version,
		config_rules: BTreeMap<String, RuleFn>,
	) -> Self {
		let name = name.into();
		Self {
			runner: ScopedRunner::new(name.clone()),
			name,
			constructor: target.constructor(),
			target,
			version,
			config_rules,
			identity: DefinitionId::next(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn target(&self) -> TargetType {
		self.target
	}

	pub fn version(&self) -> &Version {
		&self.version
	}

	pub fn identity(&self) -> DefinitionId {
		self.identity
	}

	/// Runner that binds block receivers for this definition.
	pub fn runner(&self) -> &ScopedRunner {
		&self.runner
	}

	/// Builds a new instance of the target from positional arguments.
	pub fn construct(&self, args: &[Value]) -> Result<Instance, DslError> {
		(self.constructor)(args).map_err(|source| DslError::Construct {
			name: self.name.clone(),
			source: source.into(),
		})
	}

	pub fn rule_names(&self) -> impl Iterator<Item = &str> {
		self.config_rules.keys().map(String::as_str)
	}

	pub fn rule(&self, rule: &str) -> Option<&RuleFn> {
		self.config_rules.get(rule)
	}

	/// Applies a configuration rule to an instance.
	pub fn apply_rule(&self, rule: &str, instance: &mut Instance, args: &[Value]) -> Result<(), DslError> {
		let behavior = self.rule(rule).ok_or_else(|| DslError::UnknownRule {
			name: self.name.clone(),
			rule: rule.to_string(),
		})?;
		behavior(instance, args).map_err(|source| DslError::Rule {
			name: self.name.clone(),
			rule: rule.to_string(),
			source: source.into(),
		})
	}
}

impl fmt::Debug for Definition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Definition")
			.field("name", &self.name)
			.field("version", &format_args!("{}", self.version))
			.field("target", &self.target.type_name())
			.field("identity", &self.identity)
			.field("rules", &self.config_rules.keys().collect::<Vec<_>>())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::target::Constructible;

	#[derive(Debug, Default)]
	struct Counter {
		value: i64,
	}

	impl Constructible for Counter {
		fn construct(args: &[Value]) -> anyhow::Result<Self> {
			let value = args.first().and_then(Value::as_i64).unwrap_or_default();
			Ok(Self { value })
		}
	}

	fn counter_definition() -> Definition {
		let mut rules: BTreeMap<String, RuleFn> = BTreeMap::new();
		rules.insert(
			"add".to_string(),
			Arc::new(|instance: &mut Instance, args: &[Value]| -> anyhow::Result<()> {
				let counter = instance
					.downcast_mut::<Counter>()
					.ok_or_else(|| anyhow::anyhow!("not a counter"))?;
				let amount = args
					.first()
					.and_then(Value::as_i64)
					.ok_or_else(|| anyhow::anyhow!("add expects an integer"))?;
				counter.value += amount;
				Ok(())
			}),
		);
		Definition::new("counter", TargetType::of::<Counter>(), Version::BASELINE, rules)
	}

	#[test]
	fn test_identities_are_unique() {
		let a = counter_definition();
		let b = counter_definition();
		assert_ne!(a.identity(), b.identity());
		assert_eq!(a.name(), b.name());
		assert_eq!(a.version(), b.version());
	}

	#[test]
	fn test_construct_uses_target_constructor() {
		let def = counter_definition();
		let instance = def.construct(&[Value::from(41)]).unwrap();
		assert_eq!(instance.downcast_ref::<Counter>().unwrap().value, 41);
		assert!(def.target().is::<Counter>());
	}

	#[test]
	fn test_apply_rule() {
		let def = counter_definition();
		let mut instance = def.construct(&[]).unwrap();
		def.apply_rule("add", &mut instance, &[Value::from(2)]).unwrap();
		def.apply_rule("add", &mut instance, &[Value::from(3)]).unwrap();
		assert_eq!(instance.downcast_ref::<Counter>().unwrap().value, 5);
		assert_eq!(def.rule_names().collect::<Vec<_>>(), ["add"]);
	}

	#[test]
	fn test_apply_rule_errors() {
		let def = counter_definition();
		let mut instance = def.construct(&[]).unwrap();

		let err = def.apply_rule("missing", &mut instance, &[]).unwrap_err();
		assert!(matches!(err, DslError::UnknownRule { ref rule, .. } if rule == "missing"));

		let err = def.apply_rule("add", &mut instance, &[Value::from("x")]).unwrap_err();
		assert!(matches!(err, DslError::Rule { .. }));
		assert!(err.to_string().contains("add expects an integer"));
	}
}
