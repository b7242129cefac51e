//! The mapping tree.
//!
//! A [`Mappings`] holds the top level [`ClassMapping`]s, which hold their inner classes, [`FieldMapping`]s
//! and [`MethodMapping`]s, which in turn hold the [`ArgumentMapping`]s.
//!
//! Every container keeps two indices, one by the obfuscated key and one by the deobfuscated key. These are
//! only changed through methods that keep both in sync: a rename that would give two siblings the same key
//! fails with a [`MappingConflict`] and leaves the tree as it was.
//!
//! The keys are:
//! - top level classes: the full name,
//! - inner classes: the simple name (the part after the last `$`),
//! - fields and methods: the name and the obfuscated descriptor,
//! - arguments: the local variable index, and the name.

use std::fmt::{Display, Formatter};
use indexmap::IndexSet;
use duke::{ArgumentEntry, BehaviorEntry, ClassEntry, FieldEntry, MethodDescriptor, MethodEntry, TypeDescriptor};
use crate::error::{MappingConflict, MappingKind};
use crate::tree::bimap::{BiMap, Collision};

pub(crate) mod bimap;

/// An override of the access flags of an entry.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum AccessModifier {
	#[default]
	Unchanged,
	Public,
	Protected,
	Private,
}

impl AccessModifier {
	const PREFIX: &'static str = "ACC:";

	/// The token used in the enigma formats, `None` for [`AccessModifier::Unchanged`].
	pub fn token(self) -> Option<&'static str> {
		match self {
			AccessModifier::Unchanged => None,
			AccessModifier::Public => Some("ACC:PUBLIC"),
			AccessModifier::Protected => Some("ACC:PROTECTED"),
			AccessModifier::Private => Some("ACC:PRIVATE"),
		}
	}

	pub fn is_token(s: &str) -> bool {
		s.starts_with(AccessModifier::PREFIX)
	}

	pub fn from_token(s: &str) -> Option<AccessModifier> {
		let name = s.strip_prefix(AccessModifier::PREFIX)?;
		match name.to_ascii_uppercase().as_str() {
			"UNCHANGED" => Some(AccessModifier::Unchanged),
			"PUBLIC" => Some(AccessModifier::Public),
			"PROTECTED" => Some(AccessModifier::Protected),
			"PRIVATE" => Some(AccessModifier::Private),
			_ => None,
		}
	}
}

/// The key of a field or method: a name and a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct MemberKey<D> {
	name: String,
	desc: D,
}

impl<D: Clone> MemberKey<D> {
	fn new(name: &str, desc: &D) -> MemberKey<D> {
		MemberKey { name: name.to_owned(), desc: desc.clone() }
	}
}

impl<D: Display> Display for MemberKey<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}", self.name, self.desc)
	}
}

fn conflict<K: Display>(kind: MappingKind, new_name: impl Display, collision: Collision<K>) -> MappingConflict {
	let existing_name = match collision {
		Collision::Obf(key) | Collision::Deobf(key) | Collision::Missing(key) => key.to_string(),
	};
	MappingConflict { kind, new_name: new_name.to_string(), existing_name }
}

#[derive(Debug, Clone)]
pub struct FieldMapping {
	obf_name: String,
	obf_desc: TypeDescriptor,
	deobf_name: Option<String>,
	modifier: AccessModifier,
}

impl FieldMapping {
	pub fn new(obf_name: impl Into<String>, obf_desc: TypeDescriptor, deobf_name: Option<String>) -> FieldMapping {
		FieldMapping {
			obf_name: obf_name.into(),
			obf_desc,
			deobf_name,
			modifier: AccessModifier::Unchanged,
		}
	}

	pub fn with_modifier(mut self, modifier: AccessModifier) -> FieldMapping {
		self.modifier = modifier;
		self
	}

	pub fn obf_name(&self) -> &str {
		&self.obf_name
	}

	pub fn obf_desc(&self) -> &TypeDescriptor {
		&self.obf_desc
	}

	pub fn deobf_name(&self) -> Option<&str> {
		self.deobf_name.as_deref()
	}

	pub fn modifier(&self) -> AccessModifier {
		self.modifier
	}

	fn obf_key(&self) -> MemberKey<TypeDescriptor> {
		MemberKey::new(&self.obf_name, &self.obf_desc)
	}

	fn deobf_key(&self) -> Option<MemberKey<TypeDescriptor>> {
		self.deobf_name.as_ref().map(|name| MemberKey::new(name, &self.obf_desc))
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentMapping {
	index: u32,
	name: String,
}

impl ArgumentMapping {
	pub fn new(index: u32, name: impl Into<String>) -> ArgumentMapping {
		ArgumentMapping { index, name: name.into() }
	}

	pub fn index(&self) -> u32 {
		self.index
	}

	pub fn name(&self) -> &str {
		&self.name
	}
}

/// A mapping of a method, constructor (`<init>`) or static initializer (`<clinit>`).
#[derive(Debug, Clone)]
pub struct MethodMapping {
	obf_name: String,
	obf_desc: MethodDescriptor,
	deobf_name: Option<String>,
	modifier: AccessModifier,
	arguments: BiMap<u32, String, ArgumentMapping>,
}

impl MethodMapping {
	pub fn new(obf_name: impl Into<String>, obf_desc: MethodDescriptor, deobf_name: Option<String>) -> MethodMapping {
		MethodMapping {
			obf_name: obf_name.into(),
			obf_desc,
			deobf_name,
			modifier: AccessModifier::Unchanged,
			arguments: BiMap::default(),
		}
	}

	pub fn with_modifier(mut self, modifier: AccessModifier) -> MethodMapping {
		self.modifier = modifier;
		self
	}

	pub fn obf_name(&self) -> &str {
		&self.obf_name
	}

	pub fn obf_desc(&self) -> &MethodDescriptor {
		&self.obf_desc
	}

	pub fn deobf_name(&self) -> Option<&str> {
		self.deobf_name.as_deref()
	}

	pub fn modifier(&self) -> AccessModifier {
		self.modifier
	}

	pub fn is_constructor(&self) -> bool {
		self.obf_name.starts_with('<')
	}

	/// The arguments, ordered by their index.
	pub fn arguments(&self) -> impl Iterator<Item=&ArgumentMapping> {
		let mut arguments: Vec<_> = self.arguments.values().collect();
		arguments.sort_by_key(|argument| argument.index);
		arguments.into_iter()
	}

	pub fn argument(&self, index: u32) -> Option<&ArgumentMapping> {
		self.arguments.get(&index)
	}

	pub fn argument_by_name(&self, name: &str) -> Option<&ArgumentMapping> {
		self.arguments.get_by_deobf(&name.to_owned())
	}

	pub fn add_argument(&mut self, argument: ArgumentMapping) -> Result<&mut ArgumentMapping, MappingConflict> {
		let new_name = format!("{} {}", argument.index, argument.name);
		self.arguments.insert(argument.index, Some(argument.name.clone()), argument)
			.map_err(|collision| conflict(MappingKind::Argument, new_name, collision))
	}

	/// Sets the name of the argument at `index`, or removes the argument mapping if `name` is `None`.
	pub fn set_argument_name(&mut self, index: u32, name: Option<String>) -> Result<(), MappingConflict> {
		match name {
			None => {
				self.arguments.remove(&index);
				Ok(())
			},
			Some(name) if self.arguments.contains_obf(&index) => {
				let new_name = name.clone();
				self.arguments.set_deobf(&index, Some(name.clone()), |argument| argument.name = name)
					.map_err(|collision| conflict(MappingKind::Argument, new_name, collision))
			},
			Some(name) => self.add_argument(ArgumentMapping::new(index, name)).map(|_| ()),
		}
	}

	/// Checks if the argument at `index` could be called `name`.
	pub fn check_argument_name(&self, index: u32, name: Option<&str>) -> Result<(), MappingConflict> {
		let Some(name) = name else {
			return Ok(());
		};
		self.arguments.check_deobf(&index, Some(&name.to_owned()))
			.map_err(|collision| conflict(MappingKind::Argument, name, collision))
	}

	pub fn remove_argument(&mut self, index: u32) -> Option<ArgumentMapping> {
		self.arguments.remove(&index)
	}

	fn obf_key(&self) -> MemberKey<MethodDescriptor> {
		MemberKey::new(&self.obf_name, &self.obf_desc)
	}

	fn deobf_key(&self) -> Option<MemberKey<MethodDescriptor>> {
		self.deobf_name.as_ref().map(|name| MemberKey::new(name, &self.obf_desc))
	}

	fn is_consistent(&self) -> bool {
		self.arguments.is_consistent()
	}
}

#[derive(Debug, Clone)]
pub struct ClassMapping {
	obf: ClassEntry,
	deobf_name: Option<String>,
	modifier: AccessModifier,
	dirty: bool,
	inner_classes: BiMap<String, String, ClassMapping>,
	fields: BiMap<MemberKey<TypeDescriptor>, MemberKey<TypeDescriptor>, FieldMapping>,
	methods: BiMap<MemberKey<MethodDescriptor>, MemberKey<MethodDescriptor>, MethodMapping>,
}

impl ClassMapping {
	/// Creates a new mapping. The `deobf_name` of an inner class is just its simple name.
	pub fn new(obf: ClassEntry, deobf_name: Option<String>) -> ClassMapping {
		ClassMapping {
			obf,
			deobf_name,
			modifier: AccessModifier::Unchanged,
			dirty: true,
			inner_classes: BiMap::default(),
			fields: BiMap::default(),
			methods: BiMap::default(),
		}
	}

	pub fn with_modifier(mut self, modifier: AccessModifier) -> ClassMapping {
		self.modifier = modifier;
		self
	}

	pub fn obf_entry(&self) -> &ClassEntry {
		&self.obf
	}

	pub fn obf_full_name(&self) -> &str {
		self.obf.name()
	}

	/// The part of the obfuscated name after the last `$`. For a top level class this is the full name.
	pub fn obf_simple_name(&self) -> &str {
		self.obf.innermost_name()
	}

	pub fn deobf_name(&self) -> Option<&str> {
		self.deobf_name.as_deref()
	}

	pub fn modifier(&self) -> AccessModifier {
		self.modifier
	}

	pub fn set_modifier(&mut self, modifier: AccessModifier) {
		self.modifier = modifier;
		self.dirty = true;
	}

	/// If this class or any member was changed since the last [`Mappings::mark_clean`].
	pub fn is_dirty(&self) -> bool {
		self.dirty
	}

	fn mark_clean(&mut self) {
		self.dirty = false;
		for inner in self.inner_classes.values_mut() {
			inner.mark_clean();
		}
	}

	/// The name a file holding this class is saved under: the deobfuscated name, or the obfuscated one.
	pub fn save_name(&self) -> &str {
		self.deobf_name().unwrap_or(self.obf_full_name())
	}

	pub fn inner_classes(&self) -> impl Iterator<Item=&ClassMapping> {
		self.inner_classes.values()
	}

	pub fn inner_class(&self, obf_simple_name: &str) -> Option<&ClassMapping> {
		self.inner_classes.get(&obf_simple_name.to_owned())
	}

	pub fn inner_class_by_deobf(&self, deobf_name: &str) -> Option<&ClassMapping> {
		self.inner_classes.get_by_deobf(&deobf_name.to_owned())
	}

	/// Looks up an inner class by its name in the deobfuscated namespace, which is the obfuscated simple name
	/// for an inner class without a deobfuscated name.
	pub fn inner_class_by_deobf_then_obf_simple(&self, name: &str) -> Option<&ClassMapping> {
		self.inner_class_by_deobf(name)
			.or_else(|| self.inner_class(name).filter(|inner| inner.deobf_name().is_none()))
	}

	/// Inserts an inner class mapping, the obfuscated name of `mapping` must be directly inside this class.
	pub(crate) fn insert_inner_class(&mut self, mapping: ClassMapping) -> Result<&mut ClassMapping, MappingConflict> {
		debug_assert_eq!(mapping.obf.outer_class().as_ref(), Some(&self.obf), "inner class inserted into wrong outer class");

		let new_name = mapping.deobf_name.clone().unwrap_or_else(|| mapping.obf_simple_name().to_owned());
		let inner = self.inner_classes.insert(mapping.obf_simple_name().to_owned(), mapping.deobf_name.clone(), mapping)
			.map_err(|collision| conflict(MappingKind::Class, new_name, collision))?;
		self.dirty = true;
		Ok(inner)
	}

	fn check_insert_inner_class(&self, mapping: &ClassMapping) -> Result<(), MappingConflict> {
		let new_name = mapping.deobf_name().unwrap_or(mapping.obf_simple_name());
		self.inner_classes.check_insert(&mapping.obf_simple_name().to_owned(), mapping.deobf_name.as_ref())
			.map_err(|collision| conflict(MappingKind::Class, new_name, collision))
	}

	fn get_or_create_inner_class(&mut self, obf: &ClassEntry) -> &mut ClassMapping {
		self.dirty = true;
		self.inner_classes.get_or_insert_with(obf.innermost_name().to_owned(), || ClassMapping::new(obf.clone(), None))
	}

	pub(crate) fn inner_class_mut(&mut self, obf_simple_name: &str) -> Option<&mut ClassMapping> {
		self.inner_classes.get_mut(&obf_simple_name.to_owned())
	}

	fn remove_inner_class(&mut self, obf_simple_name: &str) -> Option<ClassMapping> {
		self.dirty = true;
		self.inner_classes.remove(&obf_simple_name.to_owned())
	}

	fn check_inner_class_deobf_name(&self, obf_simple_name: &str, deobf_name: Option<&String>) -> Result<(), MappingConflict> {
		let new_name = deobf_name.map_or(obf_simple_name, String::as_str);
		self.inner_classes.check_deobf(&obf_simple_name.to_owned(), deobf_name)
			.map_err(|collision| conflict(MappingKind::Class, new_name, collision))
	}

	fn set_inner_class_deobf_name(&mut self, obf_simple_name: &str, deobf_name: Option<String>) -> Result<(), MappingConflict> {
		let key = obf_simple_name.to_owned();
		let new_name = deobf_name.clone().unwrap_or_else(|| key.clone());
		self.inner_classes.set_deobf(&key, deobf_name.clone(), |inner| {
			inner.deobf_name = deobf_name;
			inner.dirty = true;
		})
			.map_err(|collision| conflict(MappingKind::Class, new_name, collision))?;
		self.dirty = true;
		Ok(())
	}

	pub fn fields(&self) -> impl Iterator<Item=&FieldMapping> {
		self.fields.values()
	}

	pub fn field(&self, obf_name: &str, obf_desc: &TypeDescriptor) -> Option<&FieldMapping> {
		self.fields.get(&MemberKey::new(obf_name, obf_desc))
	}

	/// Looks up a field by its deobfuscated name and its obfuscated descriptor.
	pub fn field_by_deobf(&self, deobf_name: &str, obf_desc: &TypeDescriptor) -> Option<&FieldMapping> {
		self.fields.get_by_deobf(&MemberKey::new(deobf_name, obf_desc))
	}

	pub fn add_field(&mut self, field: FieldMapping) -> Result<&mut FieldMapping, MappingConflict> {
		let new_name = field.deobf_key().unwrap_or_else(|| field.obf_key());
		let field = self.fields.insert(field.obf_key(), field.deobf_key(), field)
			.map_err(|collision| conflict(MappingKind::Field, new_name, collision))?;
		self.dirty = true;
		Ok(field)
	}

	pub fn remove_field(&mut self, obf_name: &str, obf_desc: &TypeDescriptor) -> Option<FieldMapping> {
		self.dirty = true;
		self.fields.remove(&MemberKey::new(obf_name, obf_desc))
	}

	/// Sets the deobfuscated name of a field, creating the field mapping if there's none.
	pub fn set_field_deobf_name(&mut self, obf_name: &str, obf_desc: &TypeDescriptor, deobf_name: Option<String>) -> Result<(), MappingConflict> {
		let key = MemberKey::new(obf_name, obf_desc);
		if !self.fields.contains_obf(&key) {
			return self.add_field(FieldMapping::new(obf_name, obf_desc.clone(), deobf_name)).map(|_| ());
		}

		let deobf_key = deobf_name.as_ref().map(|name| MemberKey::new(name, obf_desc));
		let new_name = deobf_name.clone().unwrap_or_else(|| obf_name.to_owned());
		self.fields.set_deobf(&key, deobf_key, |field| field.deobf_name = deobf_name)
			.map_err(|collision| conflict(MappingKind::Field, new_name, collision))?;
		self.dirty = true;
		Ok(())
	}

	/// Checks if the field could get the deobfuscated name, whether it has a mapping yet or not.
	pub fn check_field_deobf_name(&self, obf_name: &str, obf_desc: &TypeDescriptor, deobf_name: Option<&str>) -> Result<(), MappingConflict> {
		let deobf_key = deobf_name.map(|name| MemberKey::new(name, obf_desc));
		self.fields.check_deobf(&MemberKey::new(obf_name, obf_desc), deobf_key.as_ref())
			.map_err(|collision| conflict(MappingKind::Field, deobf_name.unwrap_or(obf_name), collision))
	}

	pub fn set_field_modifier(&mut self, obf_name: &str, obf_desc: &TypeDescriptor, modifier: AccessModifier) {
		self.dirty = true;
		let key = MemberKey::new(obf_name, obf_desc);
		self.fields.get_or_insert_with(key, || FieldMapping::new(obf_name, obf_desc.clone(), None))
			.modifier = modifier;
	}

	pub fn methods(&self) -> impl Iterator<Item=&MethodMapping> {
		self.methods.values()
	}

	pub fn method(&self, obf_name: &str, obf_desc: &MethodDescriptor) -> Option<&MethodMapping> {
		self.methods.get(&MemberKey::new(obf_name, obf_desc))
	}

	/// Looks up a method by its deobfuscated name and its obfuscated descriptor.
	pub fn method_by_deobf(&self, deobf_name: &str, obf_desc: &MethodDescriptor) -> Option<&MethodMapping> {
		self.methods.get_by_deobf(&MemberKey::new(deobf_name, obf_desc))
	}

	pub fn add_method(&mut self, method: MethodMapping) -> Result<&mut MethodMapping, MappingConflict> {
		let new_name = method.deobf_key().unwrap_or_else(|| method.obf_key());
		let method = self.methods.insert(method.obf_key(), method.deobf_key(), method)
			.map_err(|collision| conflict(MappingKind::Method, new_name, collision))?;
		self.dirty = true;
		Ok(method)
	}

	pub fn remove_method(&mut self, obf_name: &str, obf_desc: &MethodDescriptor) -> Option<MethodMapping> {
		self.dirty = true;
		self.methods.remove(&MemberKey::new(obf_name, obf_desc))
	}

	/// Gets the method mapping, creating one without a deobfuscated name if there's none.
	///
	/// The returned mapping allows changing arguments and the modifier, but not the name.
	pub fn get_or_create_method(&mut self, obf_name: &str, obf_desc: &MethodDescriptor) -> &mut MethodMapping {
		self.dirty = true;
		let key = MemberKey::new(obf_name, obf_desc);
		self.methods.get_or_insert_with(key, || MethodMapping::new(obf_name, obf_desc.clone(), None))
	}

	/// Sets the deobfuscated name of a method, creating the method mapping if there's none.
	pub fn set_method_deobf_name(&mut self, obf_name: &str, obf_desc: &MethodDescriptor, deobf_name: Option<String>) -> Result<(), MappingConflict> {
		let key = MemberKey::new(obf_name, obf_desc);
		if !self.methods.contains_obf(&key) {
			return self.add_method(MethodMapping::new(obf_name, obf_desc.clone(), deobf_name)).map(|_| ());
		}

		let deobf_key = deobf_name.as_ref().map(|name| MemberKey::new(name, obf_desc));
		let new_name = deobf_name.clone().unwrap_or_else(|| obf_name.to_owned());
		self.methods.set_deobf(&key, deobf_key, |method| method.deobf_name = deobf_name)
			.map_err(|collision| conflict(MappingKind::Method, new_name, collision))?;
		self.dirty = true;
		Ok(())
	}

	/// Checks if the method could get the deobfuscated name, whether it has a mapping yet or not.
	pub fn check_method_deobf_name(&self, obf_name: &str, obf_desc: &MethodDescriptor, deobf_name: Option<&str>) -> Result<(), MappingConflict> {
		let deobf_key = deobf_name.map(|name| MemberKey::new(name, obf_desc));
		self.methods.check_deobf(&MemberKey::new(obf_name, obf_desc), deobf_key.as_ref())
			.map_err(|collision| conflict(MappingKind::Method, deobf_name.unwrap_or(obf_name), collision))
	}

	pub fn set_method_modifier(&mut self, obf_name: &str, obf_desc: &MethodDescriptor, modifier: AccessModifier) {
		self.get_or_create_method(obf_name, obf_desc).modifier = modifier;
	}

	/// If this mapping has neither a name, nor a modifier, nor any children.
	pub fn is_empty(&self) -> bool {
		self.deobf_name.is_none() && self.modifier == AccessModifier::Unchanged &&
			self.inner_classes.is_empty() && self.fields.is_empty() && self.methods.is_empty()
	}

	pub fn is_consistent(&self) -> bool {
		self.inner_classes.is_consistent() && self.fields.is_consistent() && self.methods.is_consistent() &&
			self.inner_classes.values().all(ClassMapping::is_consistent) &&
			self.methods.values().all(MethodMapping::is_consistent)
	}
}

/// All the mappings, the root of the mapping tree.
#[derive(Debug, Clone, Default)]
pub struct Mappings {
	classes: BiMap<String, String, ClassMapping>,
}

impl Mappings {
	pub fn new() -> Mappings {
		Mappings::default()
	}

	/// The top level classes.
	pub fn classes(&self) -> impl Iterator<Item=&ClassMapping> {
		self.classes.values()
	}

	pub fn len(&self) -> usize {
		self.classes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.classes.is_empty()
	}

	/// Gets a top level class by its full obfuscated name.
	pub fn class(&self, obf_name: &str) -> Option<&ClassMapping> {
		self.classes.get(&obf_name.to_owned())
	}

	/// Gets a top level class by its full deobfuscated name.
	pub fn class_by_deobf(&self, deobf_name: &str) -> Option<&ClassMapping> {
		self.classes.get_by_deobf(&deobf_name.to_owned())
	}

	pub fn contains_deobf_class(&self, deobf_name: &str) -> bool {
		self.classes.contains_deobf(&deobf_name.to_owned())
	}

	/// Adds a class mapping.
	///
	/// For inner classes, the mapping is put into its outer class, creating mappings for any missing outer class.
	pub fn add_class(&mut self, mapping: ClassMapping) -> Result<&mut ClassMapping, MappingConflict> {
		match mapping.obf.outer_class() {
			Some(outer) => {
				self.check_in_class(&outer, |outer| outer.check_insert_inner_class(&mapping))?;
				self.get_or_create_class_mapping(&outer).insert_inner_class(mapping)
			},
			None => {
				let new_name = mapping.deobf_name.clone().unwrap_or_else(|| mapping.obf_full_name().to_owned());
				self.classes.insert(mapping.obf_full_name().to_owned(), mapping.deobf_name.clone(), mapping)
					.map_err(|collision| conflict(MappingKind::Class, new_name, collision))
			},
		}
	}

	/// Removes the mapping of a class, together with all its members and inner classes.
	pub fn remove_class(&mut self, class: &ClassEntry) -> Option<ClassMapping> {
		match class.outer_class() {
			Some(outer) => self.find_class_mut(&outer)?.remove_inner_class(class.innermost_name()),
			None => self.classes.remove(&class.name().to_owned()),
		}
	}

	/// Walks the `$` separated chain of `class`, returning the mapping of each level.
	///
	/// Once a level has no mapping, all the deeper ones don't either.
	pub fn class_mapping_chain(&self, class: &ClassEntry) -> Vec<Option<&ClassMapping>> {
		let mut chain = Vec::new();
		let mut current: Option<&ClassMapping> = None;
		for (i, part) in class.chain_names().into_iter().enumerate() {
			current = if i == 0 {
				self.class(part)
			} else {
				current.and_then(|outer| outer.inner_class(part))
			};
			chain.push(current);
		}
		chain
	}

	pub fn find_class(&self, class: &ClassEntry) -> Option<&ClassMapping> {
		self.class_mapping_chain(class).pop().flatten()
	}

	/// Runs `check` on the mapping of `class`, if there is one. Changes are checked like this before
	/// [`Mappings::get_or_create_class_mapping`] adds any placeholder for them.
	fn check_in_class(&self, class: &ClassEntry, check: impl FnOnce(&ClassMapping) -> Result<(), MappingConflict>) -> Result<(), MappingConflict> {
		self.find_class(class).map_or(Ok(()), check)
	}

	fn find_class_mut(&mut self, class: &ClassEntry) -> Option<&mut ClassMapping> {
		let names = class.chain_names();
		let (first, rest) = names.split_first()?;
		let mut current = self.classes.get_mut(&(*first).to_owned())?;
		for part in rest {
			current = current.inner_class_mut(part)?;
		}
		Some(current)
	}

	/// Gets the mapping of `class`, creating placeholder mappings without a name for every missing level.
	///
	/// All the levels are marked dirty.
	pub fn get_or_create_class_mapping(&mut self, class: &ClassEntry) -> &mut ClassMapping {
		let mut chain = class.class_chain().into_iter();
		let outermost = chain.next().unwrap_or_else(|| class.outermost_class());

		let mut current = self.classes.get_or_insert_with(outermost.name().to_owned(), || ClassMapping::new(outermost.clone(), None));
		current.dirty = true;
		for entry in chain {
			current = current.get_or_create_inner_class(&entry);
		}
		current.dirty = true;
		current
	}

	/// Sets the deobfuscated name of a class, creating the mapping if needed.
	///
	/// For inner classes, the name is the simple name.
	pub fn set_class_deobf_name(&mut self, class: &ClassEntry, deobf_name: Option<String>) -> Result<(), MappingConflict> {
		match class.outer_class() {
			Some(outer) => {
				self.check_in_class(&outer, |outer| outer.check_inner_class_deobf_name(class.innermost_name(), deobf_name.as_ref()))?;
				let outer = self.get_or_create_class_mapping(&outer);
				outer.get_or_create_inner_class(class);
				outer.set_inner_class_deobf_name(class.innermost_name(), deobf_name)
			},
			None => {
				let key = class.name().to_owned();
				if !self.classes.contains_obf(&key) {
					return self.add_class(ClassMapping::new(class.clone(), deobf_name)).map(|_| ());
				}

				let new_name = deobf_name.clone().unwrap_or_else(|| key.clone());
				self.classes.set_deobf(&key, deobf_name.clone(), |mapping| {
					mapping.deobf_name = deobf_name;
					mapping.dirty = true;
				})
					.map_err(|collision| conflict(MappingKind::Class, new_name, collision))
			},
		}
	}

	pub fn set_class_modifier(&mut self, class: &ClassEntry, modifier: AccessModifier) {
		self.get_or_create_class_mapping(class).set_modifier(modifier);
	}

	pub fn field_mapping(&self, field: &FieldEntry) -> Option<&FieldMapping> {
		self.find_class(&field.owner)?.field(&field.name, &field.desc)
	}

	pub fn method_mapping(&self, method: &MethodEntry) -> Option<&MethodMapping> {
		self.find_class(method.owner())?.method(method.name(), method.desc())
	}

	/// The mapping of a method or constructor, constructors are stored as `<init>` and `<clinit>` methods.
	pub fn behavior_mapping(&self, behavior: &BehaviorEntry) -> Option<&MethodMapping> {
		self.find_class(behavior.owner())?.method(behavior.name(), &behavior.desc())
	}

	pub fn argument_mapping(&self, argument: &ArgumentEntry) -> Option<&ArgumentMapping> {
		self.behavior_mapping(&argument.owner)?.argument(argument.index)
	}

	pub fn set_field_deobf_name(&mut self, field: &FieldEntry, deobf_name: Option<String>) -> Result<(), MappingConflict> {
		self.check_in_class(&field.owner, |class| class.check_field_deobf_name(&field.name, &field.desc, deobf_name.as_deref()))?;
		self.get_or_create_class_mapping(&field.owner)
			.set_field_deobf_name(&field.name, &field.desc, deobf_name)
	}

	pub fn set_method_deobf_name(&mut self, method: &MethodEntry, deobf_name: Option<String>) -> Result<(), MappingConflict> {
		self.check_in_class(method.owner(), |class| class.check_method_deobf_name(method.name(), method.desc(), deobf_name.as_deref()))?;
		self.get_or_create_class_mapping(method.owner())
			.set_method_deobf_name(method.name(), method.desc(), deobf_name)
	}

	/// Sets the name of an argument, removes the argument mapping if `name` is `None`.
	pub fn set_argument_name(&mut self, argument: &ArgumentEntry, name: Option<String>) -> Result<(), MappingConflict> {
		let owner = &argument.owner;
		if let Some(method) = self.behavior_mapping(owner) {
			method.check_argument_name(argument.index, name.as_deref())?;
		}
		self.get_or_create_class_mapping(owner.owner())
			.get_or_create_method(owner.name(), &owner.desc())
			.set_argument_name(argument.index, name)
	}

	pub fn set_field_modifier(&mut self, field: &FieldEntry, modifier: AccessModifier) {
		self.get_or_create_class_mapping(&field.owner)
			.set_field_modifier(&field.name, &field.desc, modifier);
	}

	pub fn set_behavior_modifier(&mut self, behavior: &BehaviorEntry, modifier: AccessModifier) {
		self.get_or_create_class_mapping(behavior.owner())
			.set_method_modifier(behavior.name(), &behavior.desc(), modifier);
	}

	/// Adds all top level classes of `other`.
	///
	/// If any of them conflicts with a class already here, nothing is added.
	pub fn merge_classes(&mut self, other: Mappings) -> Result<(), MappingConflict> {
		for class in other.classes() {
			let key = class.obf_full_name().to_owned();
			let new_name = class.deobf_name.clone().unwrap_or_else(|| key.clone());
			self.classes.check_insert(&key, class.deobf_name.as_ref())
				.map_err(|collision| conflict(MappingKind::Class, new_name, collision))?;
		}

		for class in other.classes.into_values() {
			self.add_class(class)?;
		}
		Ok(())
	}

	/// All obfuscated class names: the ones of the class mappings and the ones used in member descriptors.
	pub fn all_obf_class_names(&self) -> IndexSet<String> {
		fn collect(class: &ClassMapping, names: &mut IndexSet<String>) {
			names.insert(class.obf_full_name().to_owned());
			for field in class.fields() {
				if let Some(name) = field.obf_desc().class_name() {
					names.insert(name.to_owned());
				}
			}
			for method in class.methods() {
				let desc = method.obf_desc();
				for t in desc.arguments.iter().chain(std::iter::once(&desc.return_type)) {
					if let Some(name) = t.class_name() {
						names.insert(name.to_owned());
					}
				}
			}
			for inner in class.inner_classes() {
				collect(inner, names);
			}
		}

		let mut names = IndexSet::new();
		for class in self.classes() {
			collect(class, &mut names);
		}
		names
	}

	/// Marks all classes as not changed.
	pub fn mark_clean(&mut self) {
		for class in self.classes.values_mut() {
			class.mark_clean();
		}
	}

	/// Checks that at every level both indices agree with each other.
	pub fn is_consistent(&self) -> bool {
		self.classes.is_consistent() && self.classes.values().all(ClassMapping::is_consistent)
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use duke::{ArgumentEntry, ClassEntry, FieldEntry, MethodEntry, TypeDescriptor};
	use crate::error::MappingKind;
	use crate::tree::{AccessModifier, ClassMapping, FieldMapping, Mappings, MethodMapping};

	fn class(name: &str) -> ClassEntry {
		ClassEntry::new(name).unwrap()
	}

	#[test]
	fn class_chain_creation() {
		let mut mappings = Mappings::new();
		mappings.get_or_create_class_mapping(&class("a$b$c"));

		let chain = mappings.class_mapping_chain(&class("a$b$c"));
		assert_eq!(chain.len(), 3);
		assert!(chain.iter().all(Option::is_some));
		assert_eq!(chain[2].unwrap().obf_full_name(), "a$b$c");
		assert_eq!(chain[2].unwrap().obf_simple_name(), "c");
		assert_eq!(chain[1].unwrap().deobf_name(), None);

		let missing = mappings.class_mapping_chain(&class("a$x$c"));
		assert!(missing[0].is_some());
		assert!(missing[1].is_none());
		assert!(missing[2].is_none());
		assert!(mappings.is_consistent());
	}

	#[test]
	fn class_rename() {
		let mut mappings = Mappings::new();
		mappings.add_class(ClassMapping::new(class("a"), Some("Alpha".to_owned()))).unwrap();
		mappings.add_class(ClassMapping::new(class("b"), None)).unwrap();

		let error = mappings.set_class_deobf_name(&class("b"), Some("Alpha".to_owned())).unwrap_err();
		assert_eq!(error.kind, MappingKind::Class);
		assert_eq!(error.new_name, "Alpha");
		assert_eq!(error.existing_name, "a");
		assert_eq!(mappings.class("b").unwrap().deobf_name(), None);

		mappings.set_class_deobf_name(&class("a"), Some("Beta".to_owned())).unwrap();
		mappings.set_class_deobf_name(&class("b"), Some("Alpha".to_owned())).unwrap();
		assert_eq!(mappings.class_by_deobf("Alpha").unwrap().obf_full_name(), "b");
		assert_eq!(mappings.class_by_deobf("Beta").unwrap().obf_full_name(), "a");

		mappings.set_class_deobf_name(&class("a"), None).unwrap();
		assert!(!mappings.contains_deobf_class("Beta"));
		assert!(mappings.is_consistent());
	}

	#[test]
	fn inner_class_rename_stays_in_outer() {
		let mut mappings = Mappings::new();
		mappings.set_class_deobf_name(&class("a$b"), Some("Inner".to_owned())).unwrap();
		mappings.set_class_deobf_name(&class("a$c"), Some("Other".to_owned())).unwrap();

		assert!(!mappings.contains_deobf_class("Inner"));
		let outer = mappings.class("a").unwrap();
		assert_eq!(outer.inner_class_by_deobf("Inner").unwrap().obf_full_name(), "a$b");

		assert!(mappings.set_class_deobf_name(&class("a$c"), Some("Inner".to_owned())).is_err());
		assert_eq!(mappings.find_class(&class("a$c")).unwrap().deobf_name(), Some("Other"));

		// the same simple name in another outer class is fine
		mappings.set_class_deobf_name(&class("d$b"), Some("Inner".to_owned())).unwrap();
		assert!(mappings.is_consistent());
	}

	#[test]
	fn field_keys_include_descriptor() {
		let mut mappings = Mappings::new();
		let int = TypeDescriptor::Primitive(duke::Primitive::Int);
		let object = TypeDescriptor::object("java/lang/Object");

		mappings.set_field_deobf_name(&FieldEntry::new(class("a"), "b", int.clone()), Some("value".to_owned())).unwrap();
		// same name, different type
		mappings.set_field_deobf_name(&FieldEntry::new(class("a"), "c", object.clone()), Some("value".to_owned())).unwrap();

		let error = mappings.set_field_deobf_name(&FieldEntry::new(class("a"), "d", int.clone()), Some("value".to_owned()))
			.unwrap_err();
		assert_eq!(error.kind, MappingKind::Field);

		let a = mappings.class("a").unwrap();
		assert_eq!(a.field_by_deobf("value", &int).unwrap().obf_name(), "b");
		assert_eq!(a.field_by_deobf("value", &object).unwrap().obf_name(), "c");
		assert!(a.field("d", &int).is_none());
		assert!(mappings.is_consistent());
	}

	#[test]
	fn duplicate_members() {
		let mut class_mapping = ClassMapping::new(class("a"), None);
		class_mapping.add_field(FieldMapping::new("b", TypeDescriptor::object("a"), None)).unwrap();
		assert!(class_mapping.add_field(FieldMapping::new("b", TypeDescriptor::object("a"), Some("x".to_owned()))).is_err());

		let desc = "(I)V".parse().unwrap();
		class_mapping.add_method(MethodMapping::new("c", desc, Some("run".to_owned()))).unwrap();
		let error = class_mapping.add_method(MethodMapping::new("d", "(I)V".parse().unwrap(), Some("run".to_owned()))).unwrap_err();
		assert_eq!(error.kind, MappingKind::Method);
		assert_eq!(error.existing_name, "c (I)V");
		assert!(class_mapping.is_consistent());
	}

	#[test]
	fn arguments() {
		let mut mappings = Mappings::new();
		let method = MethodEntry::new(class("a"), "b", "(IJI)V".parse().unwrap()).unwrap();

		mappings.set_argument_name(&ArgumentEntry::new(method.clone(), 4, "x"), Some("third".to_owned())).unwrap();
		mappings.set_argument_name(&ArgumentEntry::new(method.clone(), 1, "x"), Some("first".to_owned())).unwrap();
		assert!(mappings.set_argument_name(&ArgumentEntry::new(method.clone(), 2, "x"), Some("first".to_owned())).is_err());

		let mapping = mappings.method_mapping(&method).unwrap();
		let names: Vec<_> = mapping.arguments().map(|a| (a.index(), a.name())).collect();
		assert_eq!(names, vec![(1, "first"), (4, "third")]);
		assert_eq!(mapping.deobf_name(), None);

		mappings.set_argument_name(&ArgumentEntry::new(method.clone(), 1, "x"), Some("second".to_owned())).unwrap();
		mappings.set_argument_name(&ArgumentEntry::new(method.clone(), 4, "x"), None).unwrap();
		let mapping = mappings.method_mapping(&method).unwrap();
		assert_eq!(mapping.argument(1).unwrap().name(), "second");
		assert!(mapping.argument(4).is_none());
		assert!(mapping.argument_by_name("first").is_none());
		assert!(mappings.is_consistent());
	}

	#[test]
	fn merge_is_all_or_nothing() {
		let mut target = Mappings::new();
		target.add_class(ClassMapping::new(class("a"), Some("Alpha".to_owned()))).unwrap();

		let mut other = Mappings::new();
		other.add_class(ClassMapping::new(class("b"), Some("Beta".to_owned()))).unwrap();
		other.add_class(ClassMapping::new(class("c"), Some("Alpha".to_owned()))).unwrap();

		assert!(target.merge_classes(other).is_err());
		assert_eq!(target.len(), 1);

		let mut other = Mappings::new();
		other.add_class(ClassMapping::new(class("b"), Some("Beta".to_owned()))).unwrap();
		target.merge_classes(other).unwrap();
		assert_eq!(target.len(), 2);
		assert!(target.is_consistent());
	}

	#[test]
	fn dirty_tracking() {
		let mut mappings = Mappings::new();
		mappings.set_class_deobf_name(&class("a"), Some("Alpha".to_owned())).unwrap();
		mappings.set_class_deobf_name(&class("b"), Some("Beta".to_owned())).unwrap();
		mappings.mark_clean();
		assert!(mappings.classes().all(|c| !c.is_dirty()));

		mappings.set_class_modifier(&class("a$c"), AccessModifier::Public);
		assert!(mappings.class("a").unwrap().is_dirty());
		assert!(!mappings.class("b").unwrap().is_dirty());
	}

	#[test]
	fn failed_changes_leave_the_tree_alone() {
		let int: TypeDescriptor = "I".parse().unwrap();
		let run = MethodEntry::new(class("a"), "m", "(II)V".parse().unwrap()).unwrap();

		let mut mappings = Mappings::new();
		mappings.set_class_deobf_name(&class("a$c"), Some("b".to_owned())).unwrap();
		mappings.set_field_deobf_name(&FieldEntry::new(class("a"), "f", int.clone()), Some("count".to_owned())).unwrap();
		mappings.set_method_deobf_name(&run, Some("run".to_owned())).unwrap();
		mappings.set_argument_name(&ArgumentEntry::new(run.clone(), 1, "p1"), Some("width".to_owned())).unwrap();
		mappings.mark_clean();

		let error = mappings.set_class_deobf_name(&class("a$b"), Some("b".to_owned())).unwrap_err();
		assert_eq!(error.kind, MappingKind::Class);
		assert!(mappings.find_class(&class("a$b")).is_none());

		let g = FieldEntry::new(class("a"), "g", int);
		assert_eq!(mappings.set_field_deobf_name(&g, Some("count".to_owned())).unwrap_err().kind, MappingKind::Field);
		assert!(mappings.field_mapping(&g).is_none());

		let n = MethodEntry::new(class("a"), "n", "(II)V".parse().unwrap()).unwrap();
		assert_eq!(mappings.set_method_deobf_name(&n, Some("run".to_owned())).unwrap_err().kind, MappingKind::Method);
		assert!(mappings.method_mapping(&n).is_none());

		let second = ArgumentEntry::new(run, 2, "p2");
		assert_eq!(mappings.set_argument_name(&second, Some("width".to_owned())).unwrap_err().kind, MappingKind::Argument);
		assert!(mappings.argument_mapping(&second).is_none());

		let inner = ClassMapping::new(class("a$d"), Some("b".to_owned()));
		assert!(mappings.add_class(inner).is_err());
		assert!(mappings.find_class(&class("a$d")).is_none());

		assert!(!mappings.class("a").unwrap().is_dirty());
		assert!(mappings.is_consistent());
	}

	#[test]
	fn modifier_tokens() {
		assert_eq!(AccessModifier::from_token("ACC:PUBLIC"), Some(AccessModifier::Public));
		assert_eq!(AccessModifier::from_token("ACC:private"), Some(AccessModifier::Private));
		assert_eq!(AccessModifier::from_token("PUBLIC"), None);
		assert_eq!(AccessModifier::Protected.token(), Some("ACC:PROTECTED"));
		assert_eq!(AccessModifier::Unchanged.token(), None);
	}
}
