//! Insertion-ordered registry of DSL definitions.
//!
//! # Mental Model
//!
//! The registry is an append-only list of [`Definition`]s published as
//! immutable [`Snapshot`]s. Readers load the current snapshot without locking;
//! writers build an extended snapshot and install it with a compare-and-swap,
//! retrying if another writer won the race.
//!
//! # Precedence Contract
//!
//! Name lookups filter by exact name, then by the optional
//! [`VersionRequirement`]. Among the survivors:
//! 1. **Version:** higher wins.
//! 2. **Registration order:** on equal versions the later registration wins.
//!
//! - Enforced in: [`precedence::cmp_candidate`]
//!
//! # Invariants
//!
//! - Registration never removes or replaces an entry; only [`Registry::clear`]
//!   empties the registry.
//! - Lookups never publish a snapshot.
//! - Concurrent registrations are linearizable: none is lost.

mod precedence;


use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::definition::{Definition, DefinitionId};
use crate::version::VersionRequirement;
use precedence::Candidate;

/// Immutable view of the registry at one point in time.
#[derive(Default)]
pub struct Snapshot {
	entries: Vec<Arc<Definition>>,
}

impl Snapshot {
	/// Entries in registration order.
	pub fn entries(&self) -> &[Arc<Definition>] {
		&self.entries
	}

	fn candidates<'s>(
		&'s self,
		name: &str,
		requirement: Option<&VersionRequirement>,
	) -> impl Iterator<Item = Candidate<'s>> {
		self.entries
			.iter()
			.enumerate()
			.filter(move |(_, def)| def.name() == name)
			.filter(move |(_, def)| requirement.is_none_or(|req| req.matches(def.version())))
			.map(|(ordinal, definition)| Candidate {
				definition,
				ordinal,
			})
	}

	pub fn find_by_name_and_constraint(
		&self,
		name: &str,
		requirement: Option<&VersionRequirement>,
	) -> Option<&Arc<Definition>> {
		precedence::select(self.candidates(name, requirement)).map(|winner| winner.definition)
	}

	pub fn find_by_identity(&self, identity: DefinitionId) -> Option<&Arc<Definition>> {
		self.entries.iter().find(|def| def.identity() == identity)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Process-lifetime collection of every registered definition.
pub struct Registry {
	label: &'static str,
	snap: ArcSwap<Snapshot>,
}

impl Registry {
	pub fn new(label: &'static str) -> Self {
		Self {
			label,
			snap: ArcSwap::from_pointee(Snapshot::default()),
		}
	}

	pub fn label(&self) -> &'static str {
		self.label
	}

	/// Appends a definition; it is visible to every later lookup.
	pub fn register(&self, definition: Arc<Definition>) -> Arc<Definition> {
		loop {
			let old = self.snap.load_full();

			let mut entries = Vec::with_capacity(old.entries.len() + 1);
			entries.extend(old.entries.iter().cloned());
			entries.push(Arc::clone(&definition));
			let new_arc = Arc::new(Snapshot { entries });

			let prev = self.snap.compare_and_swap(&old, new_arc);
			if Arc::ptr_eq(&prev, &old) {
				tracing::debug!(
					registry = self.label,
					dsl = definition.name(),
					version = %definition.version(),
					identity = %definition.identity(),
					target = definition.target().type_name(),
					"definition registered"
				);
				return definition;
			}
			// Lost the race; retry against the newer snapshot.
		}
	}

	/// Highest-versioned definition named `name` that satisfies `requirement`.
	///
	/// Absence is a normal outcome, not an error.
	pub fn find_by_name_and_constraint(
		&self,
		name: &str,
		requirement: Option<&VersionRequirement>,
	) -> Option<Arc<Definition>> {
		let snap = self.snap.load();
		let found = snap.find_by_name_and_constraint(name, requirement).cloned();
		tracing::trace!(
			registry = self.label,
			dsl = name,
			requirement = requirement.map(tracing::field::display),
			found = found.as_ref().map(|def| tracing::field::display(def.version())),
			"name lookup"
		);
		found
	}

	pub fn find_by_identity(&self, identity: DefinitionId) -> Option<Arc<Definition>> {
		self.snap.load().find_by_identity(identity).cloned()
	}

	pub fn contains(&self, identity: DefinitionId) -> bool {
		self.snap.load().find_by_identity(identity).is_some()
	}

	/// Every definition named `name`, ascending by precedence.
	pub fn find_all_by_name(&self, name: &str) -> Vec<Arc<Definition>> {
		let snap = self.snap.load();
		let mut candidates: Vec<Candidate<'_>> = snap.candidates(name, None).collect();
		candidates.sort_by(precedence::cmp_candidate);
		candidates
			.into_iter()
			.map(|candidate| Arc::clone(candidate.definition))
			.collect()
	}

	/// Distinct names in order of first registration.
	pub fn names(&self) -> Vec<String> {
		let snap = self.snap.load();
		let mut names: Vec<String> = Vec::new();
		for def in snap.entries() {
			if !names.iter().any(|name| name == def.name()) {
				names.push(def.name().to_string());
			}
		}
		names
	}

	/// Every definition in registration order.
	pub fn all(&self) -> Vec<Arc<Definition>> {
		self.snap.load().entries.clone()
	}

	/// Current snapshot; stays valid while held even if the registry changes.
	pub fn snapshot(&self) -> Arc<Snapshot> {
		self.snap.load_full()
	}

	pub fn len(&self) -> usize {
		self.snap.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Drops every registered definition. Meant for test isolation.
	pub fn clear(&self) {
		let previous = self.snap.swap(Arc::new(Snapshot::default()));
		tracing::debug!(registry = self.label, dropped = previous.len(), "registry cleared");
	}
}

impl Default for Registry {
	fn default() -> Self {
		Self::new("dsl")
	}
}

impl fmt::Debug for Registry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Registry")
			.field("label", &self.label)
			.field("len", &self.len())
			.finish()
	}
}
