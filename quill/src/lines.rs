//! Splitting text into records of whitespace separated fields, nested by their leading tabs.
//!
//! Everything from a `#` to the end of the line is a comment. Lines left empty by that are skipped,
//! they don't end a level of nesting.

use std::cmp::Ordering;
use std::io::{BufRead, BufReader, Read};
use std::iter::Peekable;
use crate::error::{MappingParseError, ParseErrorKind};

/// A field of a line, with the 1-based column it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Field {
	pub(crate) column: usize,
	pub(crate) text: String,
}

impl Field {
	/// Attaches the position of this field to an error about it.
	pub(crate) fn error(&self, line_number: usize, kind: impl Into<ParseErrorKind>) -> MappingParseError {
		MappingParseError::new(line_number, kind).at_column(self.column)
	}
}

#[derive(Debug)]
pub(crate) struct RecordLine {
	pub(crate) line_number: usize,
	/// The number of leading tabs.
	pub(crate) depth: usize,
	/// The first field, in upper case.
	pub(crate) record: Field,
	/// The fields after the record.
	pub(crate) fields: Vec<Field>,
}

impl RecordLine {
	/// Splits a line, giving `None` if nothing but whitespace and comments is on it.
	pub(crate) fn new(line_number: usize, line: &str) -> Option<RecordLine> {
		let depth = line.bytes().take_while(|x| *x == b'\t').count();
		let content = line.split_once('#').map_or(line, |(content, _)| content);

		let mut fields = split_fields(content).into_iter();
		let record = fields.next()?;

		Some(RecordLine {
			line_number,
			depth,
			record: Field { column: record.column, text: record.text.to_ascii_uppercase() },
			fields: fields.collect(),
		})
	}

	pub(crate) fn unexpected(&self, allowed: &'static str) -> MappingParseError {
		self.record.error(self.line_number, ParseErrorKind::UnexpectedRecord { record: self.record.text.clone(), allowed })
	}

	pub(crate) fn field_count(&self, record: &'static str, expected: &'static str, got: usize) -> MappingParseError {
		self.record.error(self.line_number, ParseErrorKind::FieldCount { record, expected, got })
	}
}

fn split_fields(content: &str) -> Vec<Field> {
	let mut fields = Vec::new();
	let mut start: Option<(usize, usize)> = None;

	// a trailing space closes the last field
	for (column, (index, c)) in content.char_indices().chain(std::iter::once((content.len(), ' '))).enumerate() {
		match (start, c.is_whitespace()) {
			(None, false) => start = Some((column + 1, index)),
			(Some((column, start_index)), true) => {
				fields.push(Field { column, text: content[start_index..index].to_owned() });
				start = None;
			},
			_ => {},
		}
	}

	fields
}

/// Reads all records of `reader`, numbering the lines from 1.
pub(crate) fn read_lines(reader: impl Read) -> impl Iterator<Item=Result<RecordLine, MappingParseError>> {
	BufReader::new(reader)
		.lines()
		.enumerate()
		.filter_map(|(index, line)| match line {
			Ok(line) => RecordLine::new(index + 1, &line).map(Ok),
			Err(e) => Some(Err(MappingParseError::new(index + 1, e))),
		})
}

/// Iterates over the lines of exactly one level of nesting.
///
/// Stops at the first line nested less deep, so that the level above can continue with it,
/// and errors on a line nested deeper than this level.
pub(crate) struct Level<'a, I: Iterator> {
	depth: usize,
	iter: &'a mut Peekable<I>,
}

impl<'a, I> Level<'a, I>
where
	I: Iterator<Item=Result<RecordLine, MappingParseError>>,
{
	pub(crate) fn new(iter: &'a mut Peekable<I>) -> Level<'a, I> {
		Level { depth: 0, iter }
	}

	pub(crate) fn next_level(&mut self) -> Level<'_, I> {
		Level {
			depth: self.depth + 1,
			iter: self.iter,
		}
	}

	pub(crate) fn on_every_line(mut self, mut f: impl FnMut(&mut Self, RecordLine) -> Result<(), MappingParseError>) -> Result<(), MappingParseError> {
		while let Some(line) = self.next() {
			f(&mut self, line?)?;
		}
		Ok(())
	}
}

impl<I> Iterator for Level<'_, I>
where
	I: Iterator<Item=Result<RecordLine, MappingParseError>>,
{
	type Item = Result<RecordLine, MappingParseError>;

	fn next(&mut self) -> Option<Self::Item> {
		match self.iter.peek()? {
			Ok(line) => match line.depth.cmp(&self.depth) {
				Ordering::Less => None,
				Ordering::Equal => self.iter.next(),
				Ordering::Greater => Some(Err(line.record.error(line.line_number, ParseErrorKind::Indentation {
					expected: self.depth,
					got: line.depth,
				}))),
			},
			Err(_) => self.iter.next(),
		}
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::error::ParseErrorKind;
	use crate::lines::{read_lines, Field, Level, RecordLine};

	fn texts(line: &RecordLine) -> Vec<&str> {
		line.fields.iter().map(|field| field.text.as_str()).collect()
	}

	#[test]
	fn fields_and_comments() {
		let line = RecordLine::new(4, "\t\tmethod  a run\t(I)V # the main loop").unwrap();
		assert_eq!(line.line_number, 4);
		assert_eq!(line.depth, 2);
		assert_eq!(line.record, Field { column: 3, text: "METHOD".to_owned() });
		assert_eq!(texts(&line), vec!["a", "run", "(I)V"]);
		assert_eq!(line.fields.iter().map(|field| field.column).collect::<Vec<_>>(), vec![11, 13, 17]);

		// a comment may follow a field without a space
		let line = RecordLine::new(1, "ARG 1 count#comment").unwrap();
		assert_eq!(texts(&line), vec!["1", "count"]);

		assert!(RecordLine::new(1, "").is_none());
		assert!(RecordLine::new(1, "\t\t").is_none());
		assert!(RecordLine::new(1, "\t# only a comment").is_none());
	}

	#[test]
	fn nesting() {
		let input = "A 1\n\tB 2\n\n\t\tC 3\n# between\n\tD 4\nE 5\n";
		let mut iter = read_lines(input.as_bytes()).peekable();

		let mut seen = Vec::new();
		Level::new(&mut iter).on_every_line(|iter, line| {
			seen.push((0, line.record.text, line.line_number));
			iter.next_level().on_every_line(|iter, line| {
				seen.push((1, line.record.text, line.line_number));
				iter.next_level().on_every_line(|_, line| {
					seen.push((2, line.record.text, line.line_number));
					Ok(())
				})
			})
		}).unwrap();

		assert_eq!(seen, vec![
			(0, "A".to_owned(), 1),
			(1, "B".to_owned(), 2),
			(2, "C".to_owned(), 4),
			(1, "D".to_owned(), 6),
			(0, "E".to_owned(), 7),
		]);
	}

	#[test]
	fn too_deep() {
		let mut iter = read_lines("A\n\t\tB\n".as_bytes()).peekable();

		let error = Level::new(&mut iter).on_every_line(|iter, _| {
			iter.next_level().on_every_line(|_, _| Ok(()))
		}).unwrap_err();

		assert_eq!((error.line, error.column), (2, 3));
		assert!(matches!(error.kind, ParseErrorKind::Indentation { expected: 1, got: 2 }));
		assert_eq!(error.to_string(), "line 2, column 3: expected an indentation of at most 1, got 2");
	}
}
