//! Building a mapping tree out of flat, line based formats.
//!
//! Flat formats give every entry on its own line, with full class names, in any order. A member may come before
//! the line of its class, and inner classes may come before their outer classes. So all lines are collected first,
//! and the tree is built in [`FlatMappings::build`].

use std::hash::Hash;
use indexmap::IndexMap;
use duke::{ClassEntry, MethodDescriptor, TypeDescriptor};
use crate::error::{AtLine, MappingConflict, MappingKind, MappingParseError, ParseErrorKind};
use crate::tree::{ArgumentMapping, ClassMapping, Mappings};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemberKey<D> {
	owner: ClassEntry,
	obf_name: String,
	desc: D,
}

#[derive(Debug)]
struct FlatArgument {
	line: usize,
	owner: ClassEntry,
	method_name: String,
	desc: MethodDescriptor,
	index: u32,
	name: String,
}

/// The values are the line something was given on, and its deobfuscated name.
#[derive(Debug, Default)]
pub(crate) struct FlatMappings {
	/// Keyed by the obfuscated full name, the names are full names as well.
	classes: IndexMap<ClassEntry, (usize, String)>,
	/// Fields may come without a descriptor.
	fields: IndexMap<MemberKey<Option<TypeDescriptor>>, (usize, String)>,
	methods: IndexMap<MemberKey<MethodDescriptor>, (usize, String)>,
	arguments: Vec<FlatArgument>,
}

/// Remembers the line something is given on, failing if it was given before.
fn insert_once<K: Hash + Eq>(map: &mut IndexMap<K, (usize, String)>, kind: MappingKind, key: K, line: usize, deobf_name: String) -> Result<(), MappingParseError> {
	if let Some((first_line, existing)) = map.get(&key) {
		return Err(MappingParseError::new(line, MappingConflict {
			kind,
			new_name: deobf_name,
			existing_name: format!("{existing} (line {first_line})"),
		}));
	}
	map.insert(key, (line, deobf_name));
	Ok(())
}

impl FlatMappings {
	pub(crate) fn add_class(&mut self, line: usize, obf: ClassEntry, deobf_full_name: String) -> Result<(), MappingParseError> {
		insert_once(&mut self.classes, MappingKind::Class, obf, line, deobf_full_name)
	}

	pub(crate) fn add_field(&mut self, line: usize, owner: ClassEntry, obf_name: String, desc: Option<TypeDescriptor>, deobf_name: String) -> Result<(), MappingParseError> {
		insert_once(&mut self.fields, MappingKind::Field, MemberKey { owner, obf_name, desc }, line, deobf_name)
	}

	/// Adds a method. The names of constructors and static initializers are dropped when building.
	pub(crate) fn add_method(&mut self, line: usize, owner: ClassEntry, obf_name: String, desc: MethodDescriptor, deobf_name: String) -> Result<(), MappingParseError> {
		insert_once(&mut self.methods, MappingKind::Method, MemberKey { owner, obf_name, desc }, line, deobf_name)
	}

	pub(crate) fn add_argument(&mut self, line: usize, owner: ClassEntry, method_name: String, desc: MethodDescriptor, index: u32, name: String) {
		self.arguments.push(FlatArgument { line, owner, method_name, desc, index, name });
	}

	pub(crate) fn build(self) -> Result<Mappings, MappingParseError> {
		let mut mappings = Mappings::new();
		self.build_into(&mut mappings)?;
		Ok(mappings)
	}

	/// Adds everything to `mappings`, creating placeholder mappings for all classes that only appear as owners or
	/// outer classes. Entries already in `mappings` are renamed.
	///
	/// Inner classes get the last `$` segment of their deobfuscated name as their name. A field without a descriptor
	/// names the only field of its class with its obfuscated name, after all other lines are added.
	///
	/// If this fails, the lines before the failing one stay in `mappings`.
	pub(crate) fn build_into(self, mappings: &mut Mappings) -> Result<(), MappingParseError> {
		let mut classes: Vec<_> = self.classes.into_iter().collect();
		// outer classes first, so that their names are set before the placeholders of inner classes exist
		classes.sort_by_key(|(obf, _)| obf.chain_names().len());

		for (obf, (line, deobf_full_name)) in classes {
			let deobf_name = if obf.is_inner_class() {
				match deobf_full_name.rsplit_once('$') {
					Some((_, simple)) => simple.to_owned(),
					None => deobf_full_name,
				}
			} else {
				deobf_full_name
			};
			if deobf_name.is_empty() {
				return Err(MappingParseError::new(line, ParseErrorKind::Syntax(format!("empty deobfuscated name for class {obf}"))));
			}

			mappings.set_class_deobf_name(&obf, Some(deobf_name)).at_line(line)?;
		}

		let mut without_desc = Vec::new();
		for (key, (line, deobf_name)) in self.fields {
			let Some(desc) = key.desc.clone() else {
				without_desc.push((key, line, deobf_name));
				continue;
			};
			mappings.get_or_create_class_mapping(&key.owner)
				.set_field_deobf_name(&key.obf_name, &desc, Some(deobf_name))
				.at_line(line)?;
		}

		for (key, (line, deobf_name)) in self.methods {
			let deobf_name = if key.obf_name.starts_with('<') { None } else { Some(deobf_name) };
			mappings.get_or_create_class_mapping(&key.owner)
				.set_method_deobf_name(&key.obf_name, &key.desc, deobf_name)
				.at_line(line)?;
		}

		for argument in self.arguments {
			mappings.get_or_create_class_mapping(&argument.owner)
				.get_or_create_method(&argument.method_name, &argument.desc)
				.add_argument(ArgumentMapping::new(argument.index, argument.name))
				.at_line(argument.line)?;
		}

		for (key, line, deobf_name) in without_desc {
			let desc = mappings.find_class(&key.owner)
				.map_or(Ok(None), |class| field_desc_by_name(class, &key.obf_name))
				.at_line(line)?
				.ok_or_else(|| MappingParseError::new(line, ParseErrorKind::Syntax(format!(
					"no descriptor known for field {}.{}", key.owner, key.obf_name
				))))?;

			mappings.get_or_create_class_mapping(&key.owner)
				.set_field_deobf_name(&key.obf_name, &desc, Some(deobf_name))
				.at_line(line)?;
		}

		Ok(())
	}
}

/// The descriptor of the field of `class` with the obfuscated name `obf_name`, if there's exactly one.
fn field_desc_by_name(class: &ClassMapping, obf_name: &str) -> Result<Option<TypeDescriptor>, ParseErrorKind> {
	let mut found = class.fields().filter(|field| field.obf_name() == obf_name);
	match (found.next(), found.next()) {
		(Some(field), None) => Ok(Some(field.obf_desc().clone())),
		(None, _) => Ok(None),
		(Some(_), Some(_)) => Err(ParseErrorKind::Syntax(format!(
			"field {}.{obf_name} needs a descriptor, there are several fields with that name", class.obf_full_name()
		))),
	}
}

/// Splits `owner/name` at the last `/`.
pub(crate) fn split_member(line: usize, s: &str) -> Result<(ClassEntry, String), MappingParseError> {
	let (owner, name) = s.rsplit_once('/')
		.filter(|(owner, name)| !owner.is_empty() && !name.is_empty())
		.ok_or_else(|| MappingParseError::new(line, ParseErrorKind::Syntax(format!("expected `owner/name`, got {s:?}"))))?;
	let owner = ClassEntry::new(owner).at_line(line)?;
	Ok((owner, name.to_owned()))
}
