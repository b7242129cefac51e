//! Checks for names given to classes and members.

use thiserror::Error;
use quill::MappingConflict;

/// A name that can't be used for an entry, either because it's not a valid identifier, or because it would
/// collide with another entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal name {name:?}: {reason}")]
pub struct IllegalNameError {
	pub name: String,
	pub reason: String,
}

impl IllegalNameError {
	pub fn new(name: impl Into<String>, reason: impl Into<String>) -> IllegalNameError {
		IllegalNameError { name: name.into(), reason: reason.into() }
	}
}

impl From<MappingConflict> for IllegalNameError {
	fn from(conflict: MappingConflict) -> Self {
		let reason = format!("there is already a {} mapping {:?}", conflict.kind, conflict.existing_name);
		IllegalNameError { name: conflict.new_name, reason }
	}
}

const RESERVED_WORDS: [&str; 54] = [
	"abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
	"continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
	"for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long", "native",
	"new", "package", "private", "protected", "public", "return", "short", "static", "strictfp", "super",
	"switch", "synchronized", "this", "throw", "throws", "transient", "try", "void", "volatile", "while",
	"true", "false", "null", "_",
];

fn is_identifier_start(c: char) -> bool {
	c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
	c.is_alphanumeric() || c == '_' || c == '$'
}

/// Checks that `name` is a single identifier, that is not a reserved word.
///
/// ```
/// use decipher::validate::validate_identifier;
///
/// assert!(validate_identifier("count").is_ok());
/// assert!(validate_identifier("$1").is_ok());
/// assert!(validate_identifier("1st").is_err());
/// assert!(validate_identifier("class").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<(), IllegalNameError> {
	let mut chars = name.chars();
	let legal = chars.next().is_some_and(is_identifier_start) && chars.all(is_identifier_part);
	if !legal {
		return Err(IllegalNameError::new(name, "not a legal identifier"));
	}
	if RESERVED_WORDS.contains(&name) {
		return Err(IllegalNameError::new(name, "is a reserved word"));
	}
	Ok(())
}

/// Checks a new name for a class, with `/` separating the package parts.
///
/// Inner classes are named with just their simple name, so for them no package may be given.
pub fn validate_class_name(name: &str, is_inner: bool) -> Result<(), IllegalNameError> {
	if is_inner && name.contains('/') {
		return Err(IllegalNameError::new(name, "inner classes can't have a package"));
	}
	if name.contains('$') {
		return Err(IllegalNameError::new(name, "class names must not contain '$'"));
	}

	for part in name.split('/') {
		validate_identifier(part)
			.map_err(|e| IllegalNameError::new(name, format!("part {:?}: {}", e.name, e.reason)))?;
	}
	Ok(())
}
