use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use thiserror::Error;
use duke::{DescriptorParseError, EntryError};

/// The kind of mapping a [`MappingConflict`] is about.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MappingKind {
	Class,
	Field,
	Method,
	Argument,
}

impl Display for MappingKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			MappingKind::Class => "class",
			MappingKind::Field => "field",
			MappingKind::Method => "method",
			MappingKind::Argument => "argument",
		})
	}
}

/// An insert or rename would give two mappings in the same container the same key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} mapping {new_name:?} conflicts with existing {kind} mapping {existing_name:?}")]
pub struct MappingConflict {
	pub kind: MappingKind,
	pub new_name: String,
	pub existing_name: String,
}

#[derive(Debug, Error)]
pub enum ParseErrorKind {
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error("expected an indentation of at most {expected}, got {got}")]
	Indentation { expected: usize, got: usize },
	#[error("unexpected {record} entry here, allowed are: {allowed}")]
	UnexpectedRecord { record: String, allowed: &'static str },
	#[error("illegal number of fields ({got}) for {record}, expected {expected}")]
	FieldCount { record: &'static str, expected: &'static str, got: usize },
	#[error("illegal argument index {0:?}")]
	ArgumentIndex(String),
	#[error("illegal access modifier {0:?}")]
	Modifier(String),
	#[error("unknown header {0:?}")]
	Header(String),
	#[error("{0}")]
	Syntax(String),
	#[error(transparent)]
	Descriptor(#[from] DescriptorParseError),
	#[error(transparent)]
	Entry(#[from] EntryError),
	#[error(transparent)]
	Conflict(#[from] MappingConflict),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

/// A file couldn't be read as mappings.
///
/// The `line` and `column` are 1-based, `0` is used for errors not belonging to a single line or column.
#[derive(Debug, Error)]
pub struct MappingParseError {
	pub file: Option<PathBuf>,
	pub line: usize,
	pub column: usize,
	#[source]
	pub kind: ParseErrorKind,
}

impl MappingParseError {
	pub fn new(line: usize, kind: impl Into<ParseErrorKind>) -> MappingParseError {
		MappingParseError { file: None, line, column: 0, kind: kind.into() }
	}

	pub(crate) fn at_column(mut self, column: usize) -> MappingParseError {
		self.column = column;
		self
	}

	pub(crate) fn in_file(mut self, file: impl Into<PathBuf>) -> MappingParseError {
		self.file = Some(file.into());
		self
	}
}

impl Display for MappingParseError {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if let Some(file) = &self.file {
			write!(f, "{}: ", file.display())?;
		}
		write!(f, "line {}", self.line)?;
		if self.column != 0 {
			write!(f, ", column {}", self.column)?;
		}
		write!(f, ": {}", self.kind)
	}
}

/// Attaches a line number to errors of a single line.
pub(crate) trait AtLine<T> {
	fn at_line(self, line: usize) -> Result<T, MappingParseError>;
}

impl<T, E: Into<ParseErrorKind>> AtLine<T> for Result<T, E> {
	fn at_line(self, line: usize) -> Result<T, MappingParseError> {
		self.map_err(|e| MappingParseError::new(line, e))
	}
}
