//! Conversions between Rust type paths and DSL symbols.

use heck::{ToSnakeCase, ToUpperCamelCase};

/// Strips the module path and any generic arguments from a type path.
///
/// `app::media::Photo` and `app::Album<Photo>` become `Photo` and `Album`.
pub fn demodulize(path: &str) -> &str {
	let base = path.split('<').next().unwrap_or(path);
	base.rsplit("::").next().unwrap_or(base)
}

/// Canonical DSL name for a type path: demodulized and snake_cased.
pub fn constant_to_name(type_path: &str) -> String {
	demodulize(type_path).to_snake_case()
}

/// Type name a DSL symbol refers to: `does_not_exist` -> `DoesNotExist`.
pub fn name_to_constant(name: &str) -> String {
	demodulize(name).to_upper_camel_case()
}
