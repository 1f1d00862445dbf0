//! Version values and version requirements.
//!
//! Versions are `major.minor.patch` triples. Shorter forms are accepted and
//! padded with zeros, so `1.1` and `1.1.0` are the same version. A requirement
//! is a comma separated conjunction of clauses:
//!
//! | Clause      | Matches                                   |
//! |-------------|-------------------------------------------|
//! | `1.2` / `=1.2` | exactly `1.2.0`                        |
//! | `!= 1.2`    | anything but `1.2.0`                      |
//! | `> 1.2`, `>= 1.2`, `< 2`, `<= 2` | ordered comparisons  |
//! | `~> 1.2`    | `>= 1.2.0, < 2.0.0`                       |
//! | `~> 1.2.3`  | `>= 1.2.3, < 1.3.0`                       |
//!
//! An empty requirement (or `*`) has no clauses and matches every version.

use std::fmt;
use std::str::FromStr;

use crate::error::VersionError;

/// A totally ordered `major.minor.patch` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
	pub major: u64,
	pub minor: u64,
	pub patch: u64,
}

impl Version {
	/// Version assigned to definitions registered without one.
	pub const BASELINE: Version = Version::new(1, 0, 0);

	pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
		Self {
			major,
			minor,
			patch,
		}
	}

	/// Parses `1`, `1.2` or `1.2.3`, with an optional leading `v`.
	pub fn parse(input: &str) -> Result<Self, VersionError> {
		parse_components(input).map(|(version, _)| version)
	}

	/// Smallest version excluded by a pessimistic clause written with
	/// `precision` components.
	fn pessimistic_bound(self, precision: usize) -> Self {
		match precision {
			0..=2 => Version::new(self.major.saturating_add(1), 0, 0),
			_ => Version::new(self.major, self.minor.saturating_add(1), 0),
		}
	}
}

impl Default for Version {
	fn default() -> Self {
		Self::BASELINE
	}
}

impl fmt::Display for Version {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
	}
}

impl FromStr for Version {
	type Err = VersionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

/// Parses a version, also returning how many components were written.
fn parse_components(input: &str) -> Result<(Version, usize), VersionError> {
	let trimmed = input.trim();
	let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
	if trimmed.is_empty() {
		return Err(VersionError::Empty);
	}

	let invalid = |reason| VersionError::InvalidVersion {
		input: input.to_string(),
		reason,
	};

	let mut parts = [0u64; 3];
	let mut count = 0;
	for segment in trimmed.split('.') {
		if count == parts.len() {
			return Err(invalid("more than three components"));
		}
		if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
			return Err(invalid("components must be unsigned integers"));
		}
		parts[count] = segment
			.parse()
			.map_err(|_| invalid("component out of range"))?;
		count += 1;
	}

	Ok((Version::new(parts[0], parts[1], parts[2]), count))
}

/// Comparison operator of a requirement clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
	Eq,
	Ne,
	Gt,
	Ge,
	Lt,
	Le,
	/// `~>`: at least the version, below the next release at one coarser level.
	Pessimistic,
}

impl Op {
	/// Operator spellings, longest first so prefixes do not shadow.
	const SPELLINGS: &'static [(&'static str, Op)] = &[
		("~>", Op::Pessimistic),
		(">=", Op::Ge),
		("<=", Op::Le),
		("!=", Op::Ne),
		("==", Op::Eq),
		("=", Op::Eq),
		(">", Op::Gt),
		("<", Op::Lt),
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Op::Eq => "=",
			Op::Ne => "!=",
			Op::Gt => ">",
			Op::Ge => ">=",
			Op::Lt => "<",
			Op::Le => "<=",
			Op::Pessimistic => "~>",
		}
	}
}

/// A single `op version` comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Clause {
	op: Op,
	version: Version,
	/// Components written in the source text; only `~>` depends on it.
	precision: usize,
}

impl Clause {
	pub fn new(op: Op, version: Version) -> Self {
		Self {
			op,
			version,
			precision: 3,
		}
	}

	pub fn parse(input: &str) -> Result<Self, VersionError> {
		let trimmed = input.trim();
		let (op, rest) = Op::SPELLINGS
			.iter()
			.find_map(|&(spelling, op)| trimmed.strip_prefix(spelling).map(|rest| (op, rest)))
			.unwrap_or((Op::Eq, trimmed));

		let (version, precision) = parse_components(rest).map_err(|err| {
			let reason = match err {
				VersionError::Empty => "missing version",
				_ => "malformed version",
			};
			VersionError::InvalidClause {
				clause: input.to_string(),
				reason,
			}
		})?;

		Ok(Self {
			op,
			version,
			precision,
		})
	}

	pub fn op(&self) -> Op {
		self.op
	}

	pub fn version(&self) -> Version {
		self.version
	}

	pub fn matches(&self, candidate: &Version) -> bool {
		let v = &self.version;
		match self.op {
			Op::Eq => candidate == v,
			Op::Ne => candidate != v,
			Op::Gt => candidate > v,
			Op::Ge => candidate >= v,
			Op::Lt => candidate < v,
			Op::Le => candidate <= v,
			Op::Pessimistic => candidate >= v && *candidate < v.pessimistic_bound(self.precision),
		}
	}
}

impl fmt::Display for Clause {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let v = &self.version;
		write!(f, "{} ", self.op.as_str())?;
		match self.precision {
			0 | 1 => write!(f, "{}", v.major),
			2 => write!(f, "{}.{}", v.major, v.minor),
			_ => write!(f, "{v}"),
		}
	}
}

/// Conjunction of [`Clause`]s; empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VersionRequirement {
	clauses: Vec<Clause>,
}

impl VersionRequirement {
	/// The requirement every version satisfies.
	pub const fn any() -> Self {
		Self {
			clauses: Vec::new(),
		}
	}

	/// Requirement matching exactly `version`.
	pub fn exact(version: Version) -> Self {
		Self {
			clauses: vec![Clause::new(Op::Eq, version)],
		}
	}

	pub fn from_clauses(clauses: Vec<Clause>) -> Self {
		Self { clauses }
	}

	/// Parses a comma separated clause list such as `>= 1.0, < 2.0`.
	pub fn parse(input: &str) -> Result<Self, VersionError> {
		let trimmed = input.trim();
		if trimmed.is_empty() || trimmed == "*" {
			return Ok(Self::any());
		}
		trimmed
			.split(',')
			.map(Clause::parse)
			.collect::<Result<Vec<_>, _>>()
			.map(Self::from_clauses)
	}

	pub fn matches(&self, version: &Version) -> bool {
		self.clauses.iter().all(|clause| clause.matches(version))
	}

	pub fn is_any(&self) -> bool {
		self.clauses.is_empty()
	}

	pub fn clauses(&self) -> &[Clause] {
		&self.clauses
	}
}

impl fmt::Display for VersionRequirement {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.clauses.is_empty() {
			return f.write_str("*");
		}
		for (i, clause) in self.clauses.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{clause}")?;
		}
		Ok(())
	}
}

impl FromStr for VersionRequirement {
	type Err = VersionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
