//! Functions to read and write mappings in the SRG format.
//!
//! ```txt
//! CL: a org/example/Foo
//! FD: a/b I org/example/Foo/count I
//! MD: a/c (La;)V org/example/Foo/run (Lorg/example/Foo;)V
//! ```
//! Fields may also be given without descriptors, as `FD: a/b org/example/Foo/count`. Such a field names the only
//! field with its obfuscated name in its class, which is known from another line, or from the mappings read into.
//! Fields are always written with their descriptors. `PK:` lines are ignored. Only entries with a deobfuscated
//! name are written, arguments and access modifiers can't be stored in this format.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use anyhow::{anyhow, Context, Result};
use duke::ClassEntry;
use duke::descriptor::{parse_field_type, parse_method_descriptor};
use crate::error::{AtLine, MappingParseError, ParseErrorKind};
use crate::flat::{split_member, FlatMappings};
use crate::tree::{ArgumentMapping, FieldMapping, Mappings, MethodMapping};
use crate::walk::{walk, ClassContext, MappingsEmitter};

const CLASS: &str = "CL:";
const FIELD: &str = "FD:";
const METHOD: &str = "MD:";
const PACKAGE: &str = "PK:";

pub fn read(reader: impl Read) -> Result<Mappings, MappingParseError> {
	let mut mappings = Mappings::new();
	read_into(reader, &mut mappings)?;
	Ok(mappings)
}

/// Reads the mappings into `mappings`, renaming the entries already there.
///
/// Nothing is added if a line can't be parsed. If a line conflicts with `mappings`, the lines before it stay added.
pub fn read_into(reader: impl Read, mappings: &mut Mappings) -> Result<(), MappingParseError> {
	let mut flat = FlatMappings::default();

	for (line_number, line) in BufReader::new(reader).lines().enumerate() {
		let line_number = line_number + 1;
		let line = line.at_line(line_number)?;

		let mut parts = line.split_whitespace();
		let Some(record) = parts.next() else {
			continue;
		};
		if record.starts_with('#') {
			continue;
		}
		let parts: Vec<&str> = parts.collect();

		match record {
			CLASS => {
				let [obf, deobf] = parts[..] else {
					return Err(MappingParseError::new(line_number, ParseErrorKind::FieldCount { record: CLASS, expected: "2", got: parts.len() }));
				};
				let obf = ClassEntry::new(obf).at_line(line_number)?;
				flat.add_class(line_number, obf, deobf.to_owned())?;
			},
			FIELD => {
				let (obf, obf_desc, deobf) = match parts[..] {
					[obf, deobf] => (obf, None, deobf),
					[obf, obf_desc, deobf, _deobf_desc] => (obf, Some(obf_desc), deobf),
					_ => return Err(MappingParseError::new(line_number, ParseErrorKind::FieldCount { record: FIELD, expected: "2 or 4", got: parts.len() })),
				};
				let (owner, obf_name) = split_member(line_number, obf)?;
				let (_, deobf_name) = split_member(line_number, deobf)?;
				let desc = obf_desc.map(parse_field_type).transpose().at_line(line_number)?;
				flat.add_field(line_number, owner, obf_name, desc, deobf_name)?;
			},
			METHOD => {
				let [obf, obf_desc, deobf, _deobf_desc] = parts[..] else {
					return Err(MappingParseError::new(line_number, ParseErrorKind::FieldCount { record: METHOD, expected: "4", got: parts.len() }));
				};
				let (owner, obf_name) = split_member(line_number, obf)?;
				let (_, deobf_name) = split_member(line_number, deobf)?;
				let desc = parse_method_descriptor(obf_desc).at_line(line_number)?;
				flat.add_method(line_number, owner, obf_name, desc, deobf_name)?;
			},
			PACKAGE => {},
			record => {
				return Err(MappingParseError::new(line_number, ParseErrorKind::UnexpectedRecord {
					record: record.to_owned(),
					allowed: "`CL:`, `FD:`, `MD:`, `PK:`",
				}));
			},
		}
	}

	flat.build_into(mappings)
}

pub fn read_file(path: impl AsRef<Path>) -> Result<Mappings, MappingParseError> {
	let path = path.as_ref();
	File::open(path)
		.map_err(|e| MappingParseError::new(0, e))
		.and_then(read)
		.map_err(|e| e.in_file(path))
}

/// Collects the lines, as all classes come before all fields, which come before all methods.
#[derive(Default)]
struct SrgEmitter {
	classes: Vec<String>,
	fields: Vec<String>,
	methods: Vec<String>,
}

impl MappingsEmitter for SrgEmitter {
	type Error = anyhow::Error;

	fn emit_class(&mut self, class: &ClassContext) -> Result<()> {
		if class.mapping.deobf_name().is_some() {
			self.classes.push(format!("{CLASS} {} {}", class.obf_full_name(), class.deobf_full_name()));
		}
		Ok(())
	}

	fn emit_field(&mut self, class: &ClassContext, field: &FieldMapping) -> Result<()> {
		if let Some(deobf) = field.deobf_name() {
			self.fields.push(format!("{FIELD} {}/{} {} {}/{deobf} {}",
				class.obf_full_name(), field.obf_name(), field.obf_desc(),
				class.deobf_full_name(), class.names.map_type(field.obf_desc()),
			));
		}
		Ok(())
	}

	fn emit_method(&mut self, class: &ClassContext, method: &MethodMapping) -> Result<()> {
		if let Some(deobf) = method.deobf_name() {
			self.methods.push(format!("{METHOD} {}/{} {} {}/{deobf} {}",
				class.obf_full_name(), method.obf_name(), method.obf_desc(),
				class.deobf_full_name(), class.names.map_method_desc(method.obf_desc()),
			));
		}
		Ok(())
	}

	fn emit_argument(&mut self, _class: &ClassContext, _method: &MethodMapping, _argument: &ArgumentMapping) -> Result<()> {
		Ok(())
	}
}

pub fn write(mappings: &Mappings, w: &mut impl Write) -> Result<()> {
	let mut emitter = SrgEmitter::default();
	walk(mappings, &mut emitter)?;

	let mut w = BufWriter::new(w);
	for line in emitter.classes.iter().chain(&emitter.fields).chain(&emitter.methods) {
		writeln!(w, "{line}")?;
	}
	w.flush()?;
	Ok(())
}

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
		.with_context(|| anyhow!("failed to write srg mappings to {path:?}"))
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use duke::ClassEntry;
	use crate::error::ParseErrorKind;

	#[test]
	fn read_and_write() {
		let input = "\
MD: a/c (La$b;)V org/Foo/run (Lorg/Foo$Bar;)V
PK: . net/minecraft
CL: a org/Foo
FD: a$b/d J org/Foo$Bar/time J

CL: a$b org/Foo$Bar
";
		let mappings = super::read(input.as_bytes()).unwrap();

		let b = mappings.find_class(&ClassEntry::new("a$b").unwrap()).unwrap();
		assert_eq!(b.deobf_name(), Some("Bar"));
		assert_eq!(b.field("d", &"J".parse().unwrap()).unwrap().deobf_name(), Some("time"));

		let expected = "\
CL: a org/Foo
CL: a$b org/Foo$Bar
FD: a$b/d J org/Foo$Bar/time J
MD: a/c (La$b;)V org/Foo/run (Lorg/Foo$Bar;)V
";
		assert_eq!(super::write_string(&mappings).unwrap(), expected);
	}

	#[test]
	fn fields_without_descriptors() {
		let input = "\
CL: a org/Foo
FD: a/b org/Foo/count
FD: a/b I org/Foo/count I
FD: a/c org/Foo/time
";
		// `a/c` has no descriptor in this file
		let error = super::read(input.as_bytes()).unwrap_err();
		assert_eq!(error.line, 4);
		assert_eq!(error.to_string(), "line 4: no descriptor known for field a.c");

		let mut mappings = crate::enigma_file::read("CLASS a\n\tFIELD c J\n\tMETHOD d ()V\n".as_bytes()).unwrap();
		super::read_into(input.as_bytes(), &mut mappings).unwrap();

		let a = mappings.class("a").unwrap();
		assert_eq!(a.deobf_name(), Some("org/Foo"));
		assert_eq!(a.fields().count(), 2);
		assert_eq!(a.field("b", &"I".parse().unwrap()).unwrap().deobf_name(), Some("count"));
		assert_eq!(a.field("c", &"J".parse().unwrap()).unwrap().deobf_name(), Some("time"));
		assert!(mappings.is_consistent());

		let expected = "\
CL: a org/Foo
FD: a/b I org/Foo/count I
FD: a/c J org/Foo/time J
";
		assert_eq!(super::write_string(&mappings).unwrap(), expected);
	}

	#[test]
	fn errors() {
		let error = super::read("CL: a Foo\nFD: a/b I Foo/c\n".as_bytes()).unwrap_err();
		assert_eq!(error.line, 2);
		assert!(matches!(error.kind, ParseErrorKind::FieldCount { expected: "2 or 4", got: 3, .. }));

		let error = super::read("FD: a/b I Foo/c I\nFD: a/b I Foo/d I\n".as_bytes()).unwrap_err();
		assert_eq!(error.line, 2);
		assert!(matches!(error.kind, ParseErrorKind::Conflict(_)));

		let error = super::read("XX: a b\n".as_bytes()).unwrap_err();
		assert!(matches!(error.kind, ParseErrorKind::UnexpectedRecord { .. }));

		let error = super::read("MD: a/b (V)V Foo/c ()V\n".as_bytes()).unwrap_err();
		assert!(matches!(error.kind, ParseErrorKind::Descriptor(_)));

		let error = super::read("MD: ab (I)V Foo/c (I)V\n".as_bytes()).unwrap_err();
		assert!(matches!(error.kind, ParseErrorKind::Syntax(_)));
	}
}
