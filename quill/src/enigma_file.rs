//! Functions to read and write mappings in the "enigma" format.
//!
//! Each line is one record, the nesting is given by the number of leading tabs:
//! ```txt
//! CLASS a org/example/Foo
//! 	CLASS a$b Bar ACC:PUBLIC
//! 	FIELD c counter I
//! 	METHOD d run (Ljava/lang/String;)V
//! 		ARG 1 name
//! ```
//! The deobfuscated name is optional for `CLASS`, `FIELD` and `METHOD`. Inner classes may be given with their
//! full or their simple obfuscated name, their deobfuscated name is always the simple one.
//! Everything after a `#` is a comment, empty lines are ignored.
#![allow(clippy::tabs_in_doc_comments)]

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use anyhow::{anyhow, Context, Result};
use duke::descriptor::{parse_field_type, parse_method_descriptor};
use duke::ClassEntry;
use crate::error::{AtLine, MappingParseError, ParseErrorKind};
use crate::lines::{read_lines, Field, Level, RecordLine};
use crate::tree::{AccessModifier, ArgumentMapping, ClassMapping, FieldMapping, Mappings, MethodMapping};
use crate::walk::{walk, walk_class, ClassContext, ClassNames, MappingsEmitter};

const CLASS: &str = "CLASS";
const FIELD: &str = "FIELD";
const METHOD: &str = "METHOD";
const ARGUMENT: &str = "ARG";

pub fn read(reader: impl Read) -> Result<Mappings, MappingParseError> {
	let mut mappings = Mappings::new();
	read_into(reader, &mut mappings)?;
	Ok(mappings)
}

pub fn read_file(path: impl AsRef<Path>) -> Result<Mappings, MappingParseError> {
	let mut mappings = Mappings::new();
	read_file_into(&path, &mut mappings)?;
	Ok(mappings)
}

pub(crate) fn read_file_into(path: impl AsRef<Path>, mappings: &mut Mappings) -> Result<(), MappingParseError> {
	let path = path.as_ref();
	File::open(path)
		.map_err(|e| MappingParseError::new(0, e))
		.and_then(|file| read_into(file, mappings))
		.map_err(|e| e.in_file(path))
}

/// Reads the mappings into `mappings`.
///
/// If this fails, the classes read before the failing line stay in `mappings`.
pub fn read_into(reader: impl Read, mappings: &mut Mappings) -> Result<(), MappingParseError> {
	let mut lines = read_lines(reader).peekable();

	Level::new(&mut lines).on_every_line(|iter, line| {
		match line.record.text.as_str() {
			CLASS => {
				let (obf, deobf, modifier) = class_fields(&line)?;
				let obf = ClassEntry::new(obf.text.clone()).map_err(|e| obf.error(line.line_number, e))?;

				let class = mappings.add_class(ClassMapping::new(obf, deobf).with_modifier(modifier))
					.at_line(line.line_number)?;

				read_class(iter.next_level(), class)
			},
			_ => Err(line.unexpected("`CLASS`")),
		}
	})
}

/// Gets the entry of a direct inner class of `outer`, given either by its full or by its simple name.
pub(crate) fn inner_class_entry(outer: &ClassEntry, name: &str) -> Result<ClassEntry, ParseErrorKind> {
	let simple_name = name.strip_prefix(outer.name())
		.and_then(|rest| rest.strip_prefix('$'))
		.unwrap_or(name);
	if simple_name.contains('$') {
		return Err(ParseErrorKind::Syntax(format!("{name:?} is not a direct inner class of {outer}")));
	}
	Ok(outer.inner(simple_name)?)
}

/// Splits off a trailing `ACC:` field.
fn modifier(line: &RecordLine) -> Result<(&[Field], AccessModifier), MappingParseError> {
	match line.fields.split_last() {
		Some((last, rest)) if AccessModifier::is_token(&last.text) => {
			let modifier = AccessModifier::from_token(&last.text)
				.ok_or_else(|| last.error(line.line_number, ParseErrorKind::Modifier(last.text.clone())))?;
			Ok((rest, modifier))
		},
		_ => Ok((&line.fields, AccessModifier::Unchanged)),
	}
}

/// Returns the obfuscated name, the deobfuscated name and the modifier of a `CLASS` line.
fn class_fields(line: &RecordLine) -> Result<(&Field, Option<String>, AccessModifier), MappingParseError> {
	let (fields, modifier) = modifier(line)?;
	match fields {
		[obf] => Ok((obf, None, modifier)),
		[obf, deobf] => Ok((obf, Some(deobf.text.clone()), modifier)),
		slice => Err(line.field_count(CLASS, "1-2", slice.len())),
	}
}

/// Returns the obfuscated name, the deobfuscated name, the descriptor and the modifier of a `FIELD` or `METHOD` line.
fn member_fields<'l>(line: &'l RecordLine, record: &'static str) -> Result<(String, Option<String>, &'l Field, AccessModifier), MappingParseError> {
	let (fields, modifier) = modifier(line)?;
	match fields {
		[obf, desc] => Ok((obf.text.clone(), None, desc, modifier)),
		[obf, deobf, desc] => Ok((obf.text.clone(), Some(deobf.text.clone()), desc, modifier)),
		slice => Err(line.field_count(record, "2-3", slice.len())),
	}
}

// We use recursion here to parse classes contained in classes...
fn read_class<I>(iter: Level<I>, class: &mut ClassMapping) -> Result<(), MappingParseError>
where
	I: Iterator<Item=Result<RecordLine, MappingParseError>>,
{
	iter.on_every_line(|iter, line| {
		let line_number = line.line_number;
		match line.record.text.as_str() {
			CLASS => {
				let (obf, deobf, modifier) = class_fields(&line)?;
				let obf = inner_class_entry(class.obf_entry(), &obf.text)
					.map_err(|e| obf.error(line_number, e))?;

				let inner = class.insert_inner_class(ClassMapping::new(obf, deobf).with_modifier(modifier))
					.at_line(line_number)?;

				read_class(iter.next_level(), inner)
			},
			FIELD => {
				let (obf, deobf, desc, modifier) = member_fields(&line, FIELD)?;
				let desc = parse_field_type(&desc.text).map_err(|e| desc.error(line_number, e))?;

				class.add_field(FieldMapping::new(obf, desc, deobf).with_modifier(modifier))
					.at_line(line_number)?;
				Ok(())
			},
			METHOD => {
				let (obf, deobf, desc, modifier) = member_fields(&line, METHOD)?;
				let desc = parse_method_descriptor(&desc.text).map_err(|e| desc.error(line_number, e))?;

				let method = class.add_method(MethodMapping::new(obf, desc, deobf).with_modifier(modifier))
					.at_line(line_number)?;

				iter.next_level().on_every_line(|_, line| {
					let line_number = line.line_number;
					match line.record.text.as_str() {
						ARGUMENT => {
							let [raw_index, name] = line.fields.as_slice() else {
								return Err(line.field_count(ARGUMENT, "2", line.fields.len()));
							};
							let index: u32 = raw_index.text.parse()
								.map_err(|_| raw_index.error(line_number, ParseErrorKind::ArgumentIndex(raw_index.text.clone())))?;

							method.add_argument(ArgumentMapping::new(index, name.text.clone()))
								.at_line(line_number)?;
							Ok(())
						},
						_ => Err(line.unexpected("`ARG`")),
					}
				})
			},
			_ => Err(line.unexpected("`CLASS`, `FIELD`, `METHOD`")),
		}
	})
}

struct EnigmaEmitter<W> {
	w: W,
}

impl<W: Write> EnigmaEmitter<W> {
	fn indent(&mut self, depth: usize) -> Result<()> {
		for _ in 0..depth {
			write!(self.w, "\t")?;
		}
		Ok(())
	}

	fn line_end(&mut self, modifier: AccessModifier) -> Result<()> {
		if let Some(token) = modifier.token() {
			write!(self.w, " {token}")?;
		}
		writeln!(self.w)?;
		Ok(())
	}
}

impl<W: Write> MappingsEmitter for EnigmaEmitter<W> {
	type Error = anyhow::Error;

	fn emit_class(&mut self, class: &ClassContext) -> Result<()> {
		self.indent(class.depth)?;
		write!(self.w, "{CLASS} {}", class.obf_full_name())?;
		if let Some(deobf) = class.mapping.deobf_name() {
			write!(self.w, " {deobf}")?;
		}
		self.line_end(class.mapping.modifier())
	}

	fn emit_field(&mut self, class: &ClassContext, field: &FieldMapping) -> Result<()> {
		self.indent(class.depth + 1)?;
		write!(self.w, "{FIELD} {}", field.obf_name())?;
		if let Some(deobf) = field.deobf_name() {
			write!(self.w, " {deobf}")?;
		}
		write!(self.w, " {}", field.obf_desc())?;
		self.line_end(field.modifier())
	}

	fn emit_method(&mut self, class: &ClassContext, method: &MethodMapping) -> Result<()> {
		self.indent(class.depth + 1)?;
		write!(self.w, "{METHOD} {}", method.obf_name())?;
		if let Some(deobf) = method.deobf_name() {
			write!(self.w, " {deobf}")?;
		}
		write!(self.w, " {}", method.obf_desc())?;
		self.line_end(method.modifier())
	}

	fn emit_argument(&mut self, class: &ClassContext, _method: &MethodMapping, argument: &ArgumentMapping) -> Result<()> {
		self.indent(class.depth + 2)?;
		writeln!(self.w, "{ARGUMENT} {} {}", argument.index(), argument.name())?;
		Ok(())
	}
}

pub fn write(mappings: &Mappings, w: &mut impl Write) -> Result<()> {
	// the buffering makes it much faster
	let mut emitter = EnigmaEmitter { w: BufWriter::new(w) };
	walk(mappings, &mut emitter)?;
	emitter.w.flush()?;
	Ok(())
}

/// Writes one top level class, `names` should be the [`ClassNames`] of all the mappings.
pub fn write_class(class: &ClassMapping, names: &ClassNames, w: &mut impl Write) -> Result<()> {
	let mut emitter = EnigmaEmitter { w: BufWriter::new(w) };
	walk_class(class, names, &mut emitter)?;
	emitter.w.flush()?;
	Ok(())
}

/// Writes the mappings into a string.
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use duke::ClassEntry;
/// use quill::tree::Mappings;
///
/// let mut mappings = Mappings::new();
/// mappings.set_class_deobf_name(&ClassEntry::new("a$b").unwrap(), Some("Inner".to_owned())).unwrap();
/// mappings.set_class_deobf_name(&ClassEntry::new("a").unwrap(), Some("org/example/Outer".to_owned())).unwrap();
///
/// assert_eq!(
/// 	quill::enigma_file::write_string(&mappings).unwrap(),
/// 	"CLASS a org/example/Outer\n\tCLASS a$b Inner\n"
/// );
/// ```
pub fn write_string(mappings: &Mappings) -> Result<String> {
	let mut vec = Vec::new();
	write(mappings, &mut vec)?;
	String::from_utf8(vec)
		.with_context(|| anyhow!("failed to convert written mappings to utf8"))
}

pub fn write_file(mappings: &Mappings, path: impl AsRef<Path>) -> Result<()> {
	let path = path.as_ref();
	let mut file = File::create(path)
		.with_context(|| anyhow!("failed to create mappings file {path:?}"))?;
	write(mappings, &mut file)
		.with_context(|| anyhow!("failed to write mappings to {path:?}"))
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use duke::{ClassEntry, TypeDescriptor};
	use crate::error::ParseErrorKind;
	use crate::tree::AccessModifier;

	#[test]
	fn read_nested() {
		let input = "\
# a comment
CLASS a org/example/Outer
	CLASS b Inner # simple obfuscated name

	CLASS a$c
		FIELD d value I ACC:PRIVATE
	FIELD e [La;
	METHOD f run (I)V
		ARG 1 count
CLASS g
";
		let mappings = super::read(input.as_bytes()).unwrap();

		assert_eq!(mappings.len(), 2);
		let outer = mappings.class("a").unwrap();
		assert_eq!(outer.deobf_name(), Some("org/example/Outer"));
		assert_eq!(outer.inner_class("b").unwrap().deobf_name(), Some("Inner"));

		let c = mappings.find_class(&ClassEntry::new("a$c").unwrap()).unwrap();
		let d = c.field("d", &TypeDescriptor::Primitive(duke::Primitive::Int)).unwrap();
		assert_eq!(d.deobf_name(), Some("value"));
		assert_eq!(d.modifier(), AccessModifier::Private);

		assert_eq!(outer.field("e", &"[La;".parse().unwrap()).unwrap().deobf_name(), None);
		let f = outer.method("f", &"(I)V".parse().unwrap()).unwrap();
		assert_eq!(f.argument(1).unwrap().name(), "count");

		assert!(mappings.class("g").unwrap().is_empty());
		assert!(mappings.is_consistent());
	}

	#[test]
	fn errors_carry_line_numbers() {
		let cases = [
			("FIELD a b I\n", 1),
			("CLASS a\n\t\tFIELD b c I\n", 2),
			("CLASS a\n\tFIELD b c I\n\t\tARG 1 x\n", 3),
			("CLASS a\n\tMETHOD b ()V\n\t\tARG x y\n", 3),
			("CLASS a\n\tMETHOD b (V)V\n", 2),
			("CLASS a\n\tFIELD b\n", 2),
			("CLASS a b c d\n", 1),
			("CLASS a x\nCLASS b x\n", 2),
			("CLASS a\n\tARG 1 x\n", 2),
			("CLASS a\n\tCLASS a$b$c\n", 2),
		];

		for (input, line) in cases {
			let error = super::read(input.as_bytes()).unwrap_err();
			assert_eq!(error.line, line, "wrong line for {input:?}: {error}");
		}
	}

	#[test]
	fn errors_carry_columns() {
		let cases = [
			("CLASS a\n\tFIELD b c (I\n", (2, 12)),
			("CLASS a\n\tMETHOD b ()V\n\t\tARG x y\n", (3, 7)),
			("CLASS a ACC:NOTHING\n", (1, 9)),
			("  CLASS a\n\tRECORD b\n", (2, 2)),
			("CLASS a x\nCLASS b x\n", (2, 0)),
		];

		for (input, position) in cases {
			let error = super::read(input.as_bytes()).unwrap_err();
			assert_eq!((error.line, error.column), position, "wrong position for {input:?}: {error}");
		}
	}

	#[test]
	fn error_kinds() {
		let error = super::read("CLASS a\n\t\tFIELD b c I\n".as_bytes()).unwrap_err();
		assert!(matches!(error.kind, ParseErrorKind::Indentation { expected: 1, got: 2 }));

		let error = super::read("CLASS a x\nCLASS b x\n".as_bytes()).unwrap_err();
		assert!(matches!(error.kind, ParseErrorKind::Conflict(_)));

		let error = super::read("CLASS a ACC:NOTHING\n".as_bytes()).unwrap_err();
		assert!(matches!(error.kind, ParseErrorKind::Modifier(_)));
	}

	#[test]
	fn write_sorted() {
		let input = "\
CLASS bb
	METHOD b (I)V
	METHOD a (I)V
		ARG 2 second
		ARG 1 first
	FIELD z Z
CLASS a Alpha ACC:PUBLIC
	CLASS a$c Inner
";
		let mappings = super::read(input.as_bytes()).unwrap();

		let expected = "\
CLASS a Alpha ACC:PUBLIC
	CLASS a$c Inner
CLASS bb
	FIELD z Z
	METHOD a (I)V
		ARG 1 first
		ARG 2 second
	METHOD b (I)V
";
		assert_eq!(super::write_string(&mappings).unwrap(), expected);
	}
}
