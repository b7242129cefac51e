//! Functions to read and write mappings in the JSON directory format.
//!
//! Like the [enigma directory format][crate::enigma_dir], every top level class is stored in its own file,
//! named after the class and ending in `.json`. A file holds one JSON document:
//! ```json
//! {
//!   "obf": "a",
//!   "name": "org/example/Foo",
//!   "field": [ { "obf": "b", "name": "count", "type": "I" } ],
//!   "constructors": [ { "signature": "(I)V", "args": [ { "index": 1, "name": "count" } ], "statics": false } ],
//!   "method": [ { "obf": "c", "name": "run", "signature": "()V", "args": [] } ],
//!   "innerClass": [ { "obf": "d", "name": "Bar", "field": [], "constructors": [], "method": [], "innerClass": [] } ]
//! }
//! ```
//! The `obf` of an inner class is its simple name. A constructor with `"statics": true` is the static initializer.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use duke::{ClassEntry, MethodDescriptor};
use duke::descriptor::{parse_field_type, parse_method_descriptor};
use duke::entry::{CONSTRUCTOR_NAME, STATIC_INITIALIZER_NAME};
use crate::enigma_dir::{files_with_extension, read_each, write_each, DirectoryLoad};
use crate::enigma_file::inner_class_entry;
use crate::error::{AtLine, MappingParseError, ParseErrorKind};
use crate::tree::{AccessModifier, ArgumentMapping, ClassMapping, FieldMapping, Mappings, MethodMapping};
use crate::walk::{walk_class, ClassContext, ClassNames, MappingsEmitter};

const JSON_EXTENSION: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum JsonAccess {
	Public,
	Protected,
	Private,
}

impl JsonAccess {
	fn from_modifier(modifier: AccessModifier) -> Option<JsonAccess> {
		match modifier {
			AccessModifier::Unchanged => None,
			AccessModifier::Public => Some(JsonAccess::Public),
			AccessModifier::Protected => Some(JsonAccess::Protected),
			AccessModifier::Private => Some(JsonAccess::Private),
		}
	}

	fn into_modifier(access: Option<JsonAccess>) -> AccessModifier {
		match access {
			None => AccessModifier::Unchanged,
			Some(JsonAccess::Public) => AccessModifier::Public,
			Some(JsonAccess::Protected) => AccessModifier::Protected,
			Some(JsonAccess::Private) => AccessModifier::Private,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct JsonClass {
	obf: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	access: Option<JsonAccess>,
	#[serde(default)]
	field: Vec<JsonField>,
	#[serde(default)]
	constructors: Vec<JsonConstructor>,
	#[serde(default)]
	method: Vec<JsonMethod>,
	#[serde(default, rename = "innerClass")]
	inner_class: Vec<JsonClass>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct JsonField {
	obf: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	name: Option<String>,
	#[serde(rename = "type")]
	desc: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	access: Option<JsonAccess>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct JsonConstructor {
	signature: String,
	#[serde(default)]
	args: Vec<JsonArgument>,
	#[serde(default)]
	statics: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	access: Option<JsonAccess>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct JsonMethod {
	obf: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	name: Option<String>,
	signature: String,
	#[serde(default)]
	args: Vec<JsonArgument>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	access: Option<JsonAccess>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct JsonArgument {
	index: u32,
	name: String,
}

fn add_arguments(method: &mut MethodMapping, args: Vec<JsonArgument>) -> Result<(), MappingParseError> {
	for arg in args {
		method.add_argument(ArgumentMapping::new(arg.index, arg.name)).at_line(0)?;
	}
	Ok(())
}

/// Converts a parsed document into a class mapping. There are no line numbers left at this point.
fn convert_class(json: JsonClass, obf: ClassEntry) -> Result<ClassMapping, MappingParseError> {
	let mut class = ClassMapping::new(obf, json.name)
		.with_modifier(JsonAccess::into_modifier(json.access));

	for field in json.field {
		let desc = parse_field_type(&field.desc).at_line(0)?;
		let mapping = FieldMapping::new(field.obf, desc, field.name)
			.with_modifier(JsonAccess::into_modifier(field.access));
		class.add_field(mapping).at_line(0)?;
	}

	for constructor in json.constructors {
		let (name, desc) = if constructor.statics {
			(STATIC_INITIALIZER_NAME, MethodDescriptor::void())
		} else {
			(CONSTRUCTOR_NAME, parse_method_descriptor(&constructor.signature).at_line(0)?)
		};
		let mapping = MethodMapping::new(name, desc, None)
			.with_modifier(JsonAccess::into_modifier(constructor.access));
		let method = class.add_method(mapping).at_line(0)?;
		add_arguments(method, constructor.args)?;
	}

	for method in json.method {
		let desc = parse_method_descriptor(&method.signature).at_line(0)?;
		let mapping = MethodMapping::new(method.obf, desc, method.name)
			.with_modifier(JsonAccess::into_modifier(method.access));
		let added = class.add_method(mapping).at_line(0)?;
		add_arguments(added, method.args)?;
	}

	for inner in json.inner_class {
		let obf = inner_class_entry(class.obf_entry(), &inner.obf).at_line(0)?;

		let inner = convert_class(inner, obf)?;
		class.insert_inner_class(inner).at_line(0)?;
	}

	Ok(class)
}

/// Reads a single JSON document holding one top level class.
pub fn read_class_json(reader: impl Read) -> Result<Mappings, MappingParseError> {
	let json: JsonClass = serde_json::from_reader(BufReader::new(reader))
		.map_err(|e| {
			let column = e.column();
			MappingParseError::new(e.line(), ParseErrorKind::Json(e)).at_column(column)
		})?;

	let obf = ClassEntry::new(json.obf.clone()).at_line(0)?;
	if obf.is_inner_class() {
		return Err(MappingParseError::new(0, ParseErrorKind::Syntax(format!("top level class {obf} is an inner class"))));
	}
	let class = convert_class(json, obf)?;

	let mut mappings = Mappings::new();
	mappings.add_class(class).at_line(0)?;
	Ok(mappings)
}

fn read_class_file(path: &Path) -> Result<Mappings, MappingParseError> {
	File::open(path)
		.map_err(|e| MappingParseError::new(0, e))
		.and_then(read_class_json)
		.map_err(|e| e.in_file(path))
}

pub fn read(path: impl AsRef<Path>) -> Result<DirectoryLoad> {
	let path = path.as_ref();
	if !path.is_dir() {
		bail!("mappings directory {path:?} doesn't exist");
	}

	let files = files_with_extension(path, JSON_EXTENSION)?;
	Ok(read_each(files, read_class_file))
}

/// Builds the nested documents while walking the tree.
#[derive(Default)]
struct JsonEmitter {
	stack: Vec<JsonClass>,
	done: Option<JsonClass>,
}

impl JsonEmitter {
	fn current(&mut self) -> Result<&mut JsonClass> {
		self.stack.last_mut()
			.with_context(|| anyhow!("member emitted outside of a class"))
	}
}

impl MappingsEmitter for JsonEmitter {
	type Error = anyhow::Error;

	fn emit_class(&mut self, class: &ClassContext) -> Result<()> {
		let obf = if class.depth == 0 {
			class.obf_full_name()
		} else {
			class.mapping.obf_simple_name()
		};
		self.stack.push(JsonClass {
			obf: obf.to_owned(),
			name: class.mapping.deobf_name().map(str::to_owned),
			access: JsonAccess::from_modifier(class.mapping.modifier()),
			field: Vec::new(),
			constructors: Vec::new(),
			method: Vec::new(),
			inner_class: Vec::new(),
		});
		Ok(())
	}

	fn leave_class(&mut self, _class: &ClassContext) -> Result<()> {
		let finished = self.stack.pop()
			.with_context(|| anyhow!("left a class that was never entered"))?;
		match self.stack.last_mut() {
			Some(outer) => outer.inner_class.push(finished),
			None => self.done = Some(finished),
		}
		Ok(())
	}

	fn emit_field(&mut self, _class: &ClassContext, field: &FieldMapping) -> Result<()> {
		self.current()?.field.push(JsonField {
			obf: field.obf_name().to_owned(),
			name: field.deobf_name().map(str::to_owned),
			desc: field.obf_desc().to_string(),
			access: JsonAccess::from_modifier(field.modifier()),
		});
		Ok(())
	}

	fn emit_method(&mut self, _class: &ClassContext, method: &MethodMapping) -> Result<()> {
		let current = self.current()?;
		if method.is_constructor() {
			current.constructors.push(JsonConstructor {
				signature: method.obf_desc().to_string(),
				args: Vec::new(),
				statics: method.obf_name() == STATIC_INITIALIZER_NAME,
				access: JsonAccess::from_modifier(method.modifier()),
			});
		} else {
			current.method.push(JsonMethod {
				obf: method.obf_name().to_owned(),
				name: method.deobf_name().map(str::to_owned),
				signature: method.obf_desc().to_string(),
				args: Vec::new(),
				access: JsonAccess::from_modifier(method.modifier()),
			});
		}
		Ok(())
	}

	fn emit_argument(&mut self, _class: &ClassContext, method: &MethodMapping, argument: &ArgumentMapping) -> Result<()> {
		let current = self.current()?;
		let args = if method.is_constructor() {
			current.constructors.last_mut().map(|constructor| &mut constructor.args)
		} else {
			current.method.last_mut().map(|method| &mut method.args)
		};
		args.with_context(|| anyhow!("argument emitted outside of a method"))?
			.push(JsonArgument { index: argument.index(), name: argument.name().to_owned() });
		Ok(())
	}
}

/// Writes one top level class as a JSON document.
pub fn write_class(class: &ClassMapping, names: &ClassNames, w: &mut impl Write) -> Result<()> {
	let mut emitter = JsonEmitter::default();
	walk_class(class, names, &mut emitter)?;
	let json = emitter.done
		.with_context(|| anyhow!("no class was written for {:?}", class.obf_full_name()))?;

	let mut w = BufWriter::new(w);
	serde_json::to_writer_pretty(&mut w, &json)
		.with_context(|| anyhow!("failed to serialize class {:?}", class.obf_full_name()))?;
	writeln!(w)?;
	w.flush()?;
	Ok(())
}

/// Writes all classes.
pub fn write(mappings: &Mappings, path: impl AsRef<Path>, progress: impl FnMut(usize, usize, &str)) -> Result<()> {
	let path = path.as_ref();
	write_each(mappings, path, JSON_EXTENSION, false, progress, |class, names, file| write_class(class, names, file))
		.with_context(|| anyhow!("failed to write json mappings to directory {path:?}"))
}

/// Writes only the classes that changed since they were read, see [`Mappings::mark_clean`].
pub fn write_changes(mappings: &Mappings, path: impl AsRef<Path>, progress: impl FnMut(usize, usize, &str)) -> Result<()> {
	let path = path.as_ref();
	write_each(mappings, path, JSON_EXTENSION, true, progress, |class, names, file| write_class(class, names, file))
		.with_context(|| anyhow!("failed to write changed json mappings to directory {path:?}"))
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use duke::{ClassEntry, MethodDescriptor};
	use crate::error::ParseErrorKind;
	use crate::tree::AccessModifier;
	use crate::walk::ClassNames;

	const DOCUMENT: &str = r#"{
		"obf": "a",
		"name": "org/example/Foo",
		"field": [ { "obf": "b", "name": "count", "type": "I", "access": "private" } ],
		"constructors": [
			{ "signature": "(I)V", "args": [ { "index": 1, "name": "count" } ], "statics": false },
			{ "signature": "()V", "args": [], "statics": true }
		],
		"method": [ { "obf": "c", "name": "run", "signature": "(La$d;)V", "args": [ { "index": 1, "name": "bar" } ] } ],
		"innerClass": [ { "obf": "d", "name": "Bar" } ]
	}"#;

	#[test]
	fn read_document() {
		let mappings = super::read_class_json(DOCUMENT.as_bytes()).unwrap();

		let a = mappings.class("a").unwrap();
		assert_eq!(a.deobf_name(), Some("org/example/Foo"));
		let b = a.field("b", &"I".parse().unwrap()).unwrap();
		assert_eq!(b.deobf_name(), Some("count"));
		assert_eq!(b.modifier(), AccessModifier::Private);

		let init = a.method("<init>", &"(I)V".parse().unwrap()).unwrap();
		assert_eq!(init.argument(1).unwrap().name(), "count");
		assert!(a.method("<clinit>", &MethodDescriptor::void()).is_some());

		assert_eq!(a.method("c", &"(La$d;)V".parse().unwrap()).unwrap().deobf_name(), Some("run"));
		assert_eq!(mappings.find_class(&ClassEntry::new("a$d").unwrap()).unwrap().deobf_name(), Some("Bar"));
		assert!(mappings.is_consistent());
	}

	#[test]
	fn write_document() {
		let mappings = super::read_class_json(DOCUMENT.as_bytes()).unwrap();
		let names = ClassNames::new(&mappings);

		let mut written = Vec::new();
		super::write_class(mappings.class("a").unwrap(), &names, &mut written).unwrap();

		let value: serde_json::Value = serde_json::from_slice(&written).unwrap();
		assert_eq!(value["obf"], "a");
		assert_eq!(value["innerClass"][0]["obf"], "d");
		assert_eq!(value["innerClass"][0]["name"], "Bar");
		assert_eq!(value["constructors"][0]["signature"], "()V");
		assert_eq!(value["constructors"][0]["statics"], true);
		assert_eq!(value["constructors"][1]["args"][0]["name"], "count");
		assert_eq!(value["field"][0]["access"], "private");

		let again = super::read_class_json(written.as_slice()).unwrap();
		assert_eq!(crate::enigma_file::write_string(&again).unwrap(), crate::enigma_file::write_string(&mappings).unwrap());
	}

	#[test]
	fn errors() {
		let error = super::read_class_json("{\n\"obf\": 1\n}".as_bytes()).unwrap_err();
		assert!(matches!(error.kind, ParseErrorKind::Json(_)));
		assert_eq!(error.line, 2);

		let error = super::read_class_json(r#"{ "obf": "a", "field": [ { "obf": "b", "type": "V" } ] }"#.as_bytes()).unwrap_err();
		assert!(matches!(error.kind, ParseErrorKind::Descriptor(_)));

		let error = super::read_class_json(r#"{ "obf": "a$b" }"#.as_bytes()).unwrap_err();
		assert!(matches!(error.kind, ParseErrorKind::Syntax(_)));
	}
}
