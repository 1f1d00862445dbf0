//! Precedence between definitions competing for one name.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::definition::Definition;

/// A definition that survived name and requirement filtering.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate<'a> {
	pub definition: &'a Arc<Definition>,
	/// Registration ordinal within the snapshot.
	pub ordinal: usize,
}

/// Compares two candidates for the same name.
///
/// Precedence hierarchy:
/// 1. Version (higher wins)
/// 2. Registration ordinal (later wins)
pub(crate) fn cmp_candidate(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
	a.definition
		.version()
		.cmp(b.definition.version())
		.then_with(|| a.ordinal.cmp(&b.ordinal))
}

/// Picks the winning candidate, if any.
pub(crate) fn select<'a>(candidates: impl Iterator<Item = Candidate<'a>>) -> Option<Candidate<'a>> {
	candidates.max_by(cmp_candidate)
}
