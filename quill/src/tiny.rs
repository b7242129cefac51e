//! Functions to read and write mappings in the Tiny v1 format.
//!
//! The fields of a line are separated by tabs, the first line is the header naming the two namespaces:
//! ```txt
//! v1	official	named
//! CLASS	a	org/example/Foo
//! CLASS	a$b	org/example/Foo$Bar
//! FIELD	a	I	c	count
//! METHOD	a	(La$b;)V	d	run
//! MTH-ARG	a	(La$b;)V	d	1	bar
//! ```
//! Classes are given with their full names, members with the obfuscated name of their class and their obfuscated
//! descriptor. Only entries with a deobfuscated name are written, access modifiers can't be stored in this format.
#![allow(clippy::tabs_in_doc_comments)]

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use anyhow::{anyhow, Context, Result};
use duke::ClassEntry;
use duke::descriptor::{parse_field_type, parse_method_descriptor};
use crate::error::{AtLine, MappingParseError, ParseErrorKind};
use crate::flat::FlatMappings;
use crate::tree::{ArgumentMapping, FieldMapping, Mappings, MethodMapping};
use crate::walk::{walk, ClassContext, MappingsEmitter};

const VERSION: &str = "v1";
const CLASS: &str = "CLASS";
const FIELD: &str = "FIELD";
const METHOD: &str = "METHOD";
const ARGUMENT: &str = "MTH-ARG";

/// The namespaces of the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
	pub obf_namespace: String,
	pub deobf_namespace: String,
}

impl Default for Header {
	fn default() -> Self {
		Header {
			obf_namespace: "official".to_owned(),
			deobf_namespace: "named".to_owned(),
		}
	}
}

fn parse_header(line: &str) -> Result<Header, MappingParseError> {
	match line.split('\t').collect::<Vec<_>>()[..] {
		[VERSION, obf, deobf] => Ok(Header { obf_namespace: obf.to_owned(), deobf_namespace: deobf.to_owned() }),
		_ => Err(MappingParseError::new(1, ParseErrorKind::Header(line.to_owned()))),
	}
}

fn field_count(line_number: usize, record: &'static str, expected: &'static str, got: usize) -> MappingParseError {
	MappingParseError::new(line_number, ParseErrorKind::FieldCount { record, expected, got })
}

pub fn read(reader: impl Read) -> Result<Mappings, MappingParseError> {
	read_with_header(reader).map(|(_, mappings)| mappings)
}

pub fn read_with_header(reader: impl Read) -> Result<(Header, Mappings), MappingParseError> {
	let mut lines = BufReader::new(reader).lines();

	let header = lines.next()
		.ok_or_else(|| MappingParseError::new(1, ParseErrorKind::Header(String::new())))?
		.at_line(1)?;
	let header = parse_header(&header)?;

	let mut flat = FlatMappings::default();

	for (line_number, line) in lines.enumerate() {
		// the header is line 1
		let line_number = line_number + 2;
		let line = line.at_line(line_number)?;
		if line.trim().is_empty() {
			continue;
		}

		let parts: Vec<&str> = line.split('\t').collect();
		match parts[0] {
			CLASS => {
				let [_, obf, deobf] = parts[..] else {
					return Err(field_count(line_number, CLASS, "3", parts.len()));
				};
				let obf = ClassEntry::new(obf).at_line(line_number)?;
				flat.add_class(line_number, obf, deobf.to_owned())?;
			},
			FIELD => {
				let [_, owner, desc, obf, deobf] = parts[..] else {
					return Err(field_count(line_number, FIELD, "5", parts.len()));
				};
				let owner = ClassEntry::new(owner).at_line(line_number)?;
				let desc = parse_field_type(desc).at_line(line_number)?;
				flat.add_field(line_number, owner, obf.to_owned(), Some(desc), deobf.to_owned())?;
			},
			METHOD => {
				let [_, owner, desc, obf, deobf] = parts[..] else {
					return Err(field_count(line_number, METHOD, "5", parts.len()));
				};
				let owner = ClassEntry::new(owner).at_line(line_number)?;
				let desc = parse_method_descriptor(desc).at_line(line_number)?;
				flat.add_method(line_number, owner, obf.to_owned(), desc, deobf.to_owned())?;
			},
			ARGUMENT => {
				let [_, owner, desc, method, index, name] = parts[..] else {
					return Err(field_count(line_number, ARGUMENT, "6", parts.len()));
				};
				let owner = ClassEntry::new(owner).at_line(line_number)?;
				let desc = parse_method_descriptor(desc).at_line(line_number)?;
				let index: u32 = index.parse()
					.map_err(|_| ParseErrorKind::ArgumentIndex(index.to_owned()))
					.at_line(line_number)?;
				flat.add_argument(line_number, owner, method.to_owned(), desc, index, name.to_owned());
			},
			record => {
				return Err(MappingParseError::new(line_number, ParseErrorKind::UnexpectedRecord {
					record: record.to_owned(),
					allowed: "`CLASS`, `FIELD`, `METHOD`, `MTH-ARG`",
				}));
			},
		}
	}

	Ok((header, flat.build()?))
}

pub fn read_file(path: impl AsRef<Path>) -> Result<Mappings, MappingParseError> {
	let path = path.as_ref();
	File::open(path)
		.map_err(|e| MappingParseError::new(0, e))
		.and_then(read)
		.map_err(|e| e.in_file(path))
}

struct TinyEmitter<W> {
	w: W,
}

impl<W: Write> MappingsEmitter for TinyEmitter<W> {
	type Error = anyhow::Error;

	fn emit_class(&mut self, class: &ClassContext) -> Result<()> {
		if class.mapping.deobf_name().is_some() {
			writeln!(self.w, "{CLASS}\t{}\t{}", class.obf_full_name(), class.deobf_full_name())?;
		}
		Ok(())
	}

	fn emit_field(&mut self, class: &ClassContext, field: &FieldMapping) -> Result<()> {
		if let Some(deobf) = field.deobf_name() {
			writeln!(self.w, "{FIELD}\t{}\t{}\t{}\t{deobf}", class.obf_full_name(), field.obf_desc(), field.obf_name())?;
		}
		Ok(())
	}

	fn emit_method(&mut self, class: &ClassContext, method: &MethodMapping) -> Result<()> {
		if let Some(deobf) = method.deobf_name() {
			writeln!(self.w, "{METHOD}\t{}\t{}\t{}\t{deobf}", class.obf_full_name(), method.obf_desc(), method.obf_name())?;
		}
		Ok(())
	}

	fn emit_argument(&mut self, class: &ClassContext, method: &MethodMapping, argument: &ArgumentMapping) -> Result<()> {
		writeln!(self.w, "{ARGUMENT}\t{}\t{}\t{}\t{}\t{}",
			class.obf_full_name(), method.obf_desc(), method.obf_name(), argument.index(), argument.name(),
		)?;
		Ok(())
	}
}

pub fn write(mappings: &Mappings, header: &Header, w: &mut impl Write) -> Result<()> {
	let mut emitter = TinyEmitter { w: BufWriter::new(w) };
	writeln!(emitter.w, "{VERSION}\t{}\t{}", header.obf_namespace, header.deobf_namespace)?;
	walk(mappings, &mut emitter)?;
	emitter.w.flush()?;
	Ok(())
}

/// Writes the mappings into a string, with the default [`Header`].
pub fn write_string(mappings: &Mappings) -> Result<String> {
	let mut vec = Vec::new();
	write(mappings, &Header::default(), &mut vec)?;
	String::from_utf8(vec)
		.with_context(|| anyhow!("failed to convert written mappings to utf8"))
}

pub fn write_file(mappings: &Mappings, header: &Header, path: impl AsRef<Path>) -> Result<()> {
	let path = path.as_ref();
	let mut file = File::create(path)
		.with_context(|| anyhow!("failed to create mappings file {path:?}"))?;
	write(mappings, header, &mut file)
		.with_context(|| anyhow!("failed to write tiny mappings to {path:?}"))
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use duke::ClassEntry;
	use crate::error::ParseErrorKind;
	use crate::tiny::Header;

	#[test]
	fn read_and_write() {
		let input = "v1\tobf\tdeobf
MTH-ARG\ta\t(La$b;)V\td\t1\tbar
FIELD\ta\tI\tc\tcount
CLASS\ta$b\torg/example/Foo$Bar
CLASS\ta\torg/example/Foo
METHOD\ta\t(La$b;)V\td\trun

MTH-ARG\ta\t(I)V\t<init>\t1\tsize
";
		let (header, mappings) = super::read_with_header(input.as_bytes()).unwrap();
		assert_eq!(header, Header { obf_namespace: "obf".to_owned(), deobf_namespace: "deobf".to_owned() });

		let a = mappings.class("a").unwrap();
		assert_eq!(a.inner_class("b").unwrap().deobf_name(), Some("Bar"));
		let d = a.method("d", &"(La$b;)V".parse().unwrap()).unwrap();
		assert_eq!(d.deobf_name(), Some("run"));
		assert_eq!(d.argument(1).unwrap().name(), "bar");

		let expected = "v1\tofficial\tnamed
CLASS\ta\torg/example/Foo
CLASS\ta$b\torg/example/Foo$Bar
FIELD\ta\tI\tc\tcount
MTH-ARG\ta\t(I)V\t<init>\t1\tsize
METHOD\ta\t(La$b;)V\td\trun
MTH-ARG\ta\t(La$b;)V\td\t1\tbar
";
		assert_eq!(super::write_string(&mappings).unwrap(), expected);
		assert!(mappings.find_class(&ClassEntry::new("a$b").unwrap()).is_some());
	}

	#[test]
	fn errors() {
		let error = super::read("v2\ta\tb\n".as_bytes()).unwrap_err();
		assert!(matches!(error.kind, ParseErrorKind::Header(_)));

		let error = super::read("v1\ta\tb\nCLASS\ta\n".as_bytes()).unwrap_err();
		assert_eq!(error.line, 2);

		let error = super::read("v1\ta\tb\nCLASS\ta\tFoo\nMTH-ARG\ta\t()V\tb\tx\tname\n".as_bytes()).unwrap_err();
		assert_eq!(error.line, 3);
		assert!(matches!(error.kind, ParseErrorKind::ArgumentIndex(_)));
	}
}
