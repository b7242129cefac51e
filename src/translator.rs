//! Translating entries between the obfuscated and the deobfuscated namespace.
//!
//! A [`Translator`] is a read only view of some [`Mappings`], together with a [`HierarchyIndex`] for finding the
//! class a member is declared in. It translates in one [`Direction`]: the entries given to it are in the source
//! namespace of that direction, the returned ones are in the target namespace.
//!
//! Parts that have no mapping are kept as they are, so for the inner class `a$b$c` with mappings for `a` and
//! `a$b$c` only, deobfuscating gives `Foo$b$Bar`.

use log::warn;
use duke::{ArgumentEntry, BehaviorEntry, ClassEntry, ConstructorEntry, Entry, FieldEntry, MethodDescriptor, MethodEntry, TypeDescriptor};
use quill::tree::{AccessModifier, ClassMapping, FieldMapping, Mappings, MethodMapping};
use crate::index::HierarchyIndex;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
	/// From obfuscated to deobfuscated names.
	Deobfuscating,
	/// From deobfuscated to obfuscated names.
	Obfuscating,
}

impl Direction {
	/// Picks the value belonging to the target namespace of this direction.
	pub fn choose<T>(self, deobf: T, obf: T) -> T {
		match self {
			Direction::Deobfuscating => deobf,
			Direction::Obfuscating => obf,
		}
	}

	pub fn inverse(self) -> Direction {
		match self {
			Direction::Deobfuscating => Direction::Obfuscating,
			Direction::Obfuscating => Direction::Deobfuscating,
		}
	}
}

pub struct Translator<'a, I: ?Sized> {
	direction: Direction,
	mappings: &'a Mappings,
	index: &'a I,
}

impl<'a, I: HierarchyIndex + ?Sized> Translator<'a, I> {
	pub fn new(direction: Direction, mappings: &'a Mappings, index: &'a I) -> Translator<'a, I> {
		Translator { direction, mappings, index }
	}

	pub fn direction(&self) -> Direction {
		self.direction
	}

	/// Walks the `$` separated parts of a class name in the source namespace, looking up the mapping of each.
	fn class_mapping_chain(&self, name: &str) -> Vec<Option<&'a ClassMapping>> {
		let mut chain = Vec::new();
		let mut current: Option<&'a ClassMapping> = None;
		for (i, part) in name.split('$').enumerate() {
			current = match (i, self.direction) {
				(0, Direction::Deobfuscating) => self.mappings.class(part),
				// a class without a name is called by its obfuscated name in both namespaces
				(0, Direction::Obfuscating) => self.mappings.class_by_deobf(part)
					.or_else(|| self.mappings.class(part).filter(|class| class.deobf_name().is_none())),
				(_, Direction::Deobfuscating) => current.and_then(|outer| outer.inner_class(part)),
				(_, Direction::Obfuscating) => current.and_then(|outer| outer.inner_class_by_deobf_then_obf_simple(part)),
			};
			chain.push(current);
		}
		chain
	}

	fn class_mapping(&self, class: &ClassEntry) -> Option<&'a ClassMapping> {
		self.class_mapping_chain(class.name()).pop().flatten()
	}

	/// The name of a class mapping in the target namespace, `None` if it isn't named there.
	fn chosen_class_name(&self, mapping: &'a ClassMapping, is_outermost: bool) -> Option<&'a str> {
		let obf = if is_outermost { mapping.obf_full_name() } else { mapping.obf_simple_name() };
		self.direction.choose(mapping.deobf_name(), Some(obf))
	}

	/// Translates a full class name, keeping every part without a mapping.
	fn translate_class_name(&self, name: &str) -> String {
		let chain = self.class_mapping_chain(name);
		let mut translated = String::with_capacity(name.len());
		for (i, (part, mapping)) in name.split('$').zip(chain).enumerate() {
			if i != 0 {
				translated.push('$');
			}
			let part = mapping.and_then(|mapping| self.chosen_class_name(mapping, i == 0)).unwrap_or(part);
			translated.push_str(part);
		}
		translated
	}

	pub fn translate_class(&self, class: &ClassEntry) -> ClassEntry {
		let name = self.translate_class_name(class.name());
		ClassEntry::new(name).unwrap_or_else(|e| {
			warn!("mappings give an illegal name for class {class}: {e}");
			class.clone()
		})
	}

	pub fn translate_type(&self, desc: &TypeDescriptor) -> TypeDescriptor {
		desc.remap(|name| self.translate_class_name(name))
	}

	pub fn translate_method_descriptor(&self, desc: &MethodDescriptor) -> MethodDescriptor {
		desc.remap(|name| self.translate_class_name(name))
	}

	/// The owner class followed by its superclasses, all in the obfuscated namespace.
	fn obf_owner_and_ancestry(&self, owner: &ClassEntry) -> Vec<ClassEntry> {
		let owner = match self.direction {
			Direction::Deobfuscating => owner.clone(),
			Direction::Obfuscating => self.translate_class(owner),
		};
		let ancestry = self.index.ancestry(&owner);
		std::iter::once(owner).chain(ancestry).collect()
	}

	fn field_mapping(&self, field: &FieldEntry) -> Option<&'a FieldMapping> {
		match self.direction {
			Direction::Deobfuscating => {
				let owner = self.index.resolve_owner(&Entry::Field(field.clone()), true)
					.unwrap_or_else(|| field.owner.clone());
				self.mappings.find_class(&owner)?.field(&field.name, &field.desc)
			},
			Direction::Obfuscating => {
				let obf_desc = self.translate_type(&field.desc);
				self.obf_owner_and_ancestry(&field.owner).iter()
					.find_map(|class| self.mappings.find_class(class)?.field_by_deobf(&field.name, &obf_desc))
			},
		}
	}

	fn method_mapping(&self, method: &MethodEntry) -> Option<&'a MethodMapping> {
		match self.direction {
			Direction::Deobfuscating => {
				let owner = self.index.resolve_owner(&Entry::Method(method.clone()), true)
					.unwrap_or_else(|| method.owner().clone());
				self.mappings.find_class(&owner)?.method(method.name(), method.desc())
			},
			Direction::Obfuscating => {
				let obf_desc = self.translate_method_descriptor(method.desc());
				self.obf_owner_and_ancestry(method.owner()).iter()
					.find_map(|class| self.mappings.find_class(class)?.method_by_deobf(method.name(), &obf_desc))
			},
		}
	}

	/// The mapping of a method or constructor in exactly the class `owner`, which is in the source namespace.
	fn declared_behavior_mapping(&self, owner: &ClassEntry, name: &str, desc: &MethodDescriptor, is_constructor: bool) -> Option<&'a MethodMapping> {
		let class = self.class_mapping(owner)?;
		match self.direction {
			Direction::Deobfuscating => class.method(name, desc),
			// constructors are named the same in both namespaces
			Direction::Obfuscating if is_constructor => class.method(name, &self.translate_method_descriptor(desc)),
			Direction::Obfuscating => class.method_by_deobf(name, &self.translate_method_descriptor(desc)),
		}
	}

	fn behavior_mapping(&self, behavior: &BehaviorEntry) -> Option<&'a MethodMapping> {
		let is_constructor = matches!(behavior, BehaviorEntry::Constructor(_));
		self.declared_behavior_mapping(behavior.owner(), behavior.name(), &behavior.desc(), is_constructor)
	}

	/// Arguments are only named in the deobfuscated namespace.
	///
	/// An argument of a method that has no name for it takes the name of the same argument of an overridden
	/// method, if any.
	fn argument_name(&self, argument: &ArgumentEntry) -> Option<&'a str> {
		if self.direction == Direction::Obfuscating {
			return None;
		}

		let declared = self.behavior_mapping(&argument.owner)
			.and_then(|method| method.argument(argument.index));
		if let Some(declared) = declared {
			return Some(declared.name());
		}

		let BehaviorEntry::Method(method) = &argument.owner else {
			return None;
		};
		self.index.ancestry(method.owner()).into_iter()
			.map(|ancestor| method.with_owner(ancestor))
			.filter(|inherited| self.index.contains_method(inherited))
			.find_map(|inherited| {
				self.declared_behavior_mapping(inherited.owner(), inherited.name(), inherited.desc(), false)?
					.argument(argument.index)
					.map(|argument| argument.name())
			})
	}

	/// The translated name of an entry, or `None` if the mappings don't have one.
	///
	/// For classes this is the full name. Constructors don't have a name of their own.
	pub fn translate(&self, entry: &Entry) -> Option<String> {
		match entry {
			Entry::Class(class) => {
				let mapping = self.class_mapping(class)?;
				self.chosen_class_name(mapping, !class.is_inner_class())?;
				Some(self.translate_class_name(class.name()))
			},
			Entry::Field(field) => {
				let mapping = self.field_mapping(field)?;
				self.direction.choose(mapping.deobf_name(), Some(mapping.obf_name())).map(str::to_owned)
			},
			Entry::Method(method) => {
				let mapping = self.method_mapping(method)?;
				self.direction.choose(mapping.deobf_name(), Some(mapping.obf_name())).map(str::to_owned)
			},
			Entry::Constructor(_) => None,
			Entry::Argument(argument) => self.argument_name(argument).map(str::to_owned),
		}
	}

	pub fn has_mapping(&self, entry: &Entry) -> bool {
		self.translate(entry).is_some()
	}

	pub fn translate_field(&self, field: &FieldEntry) -> FieldEntry {
		let name = self.translate(&Entry::Field(field.clone())).unwrap_or_else(|| field.name.clone());
		FieldEntry::new(self.translate_class(&field.owner), name, self.translate_type(&field.desc))
	}

	pub fn translate_method(&self, method: &MethodEntry) -> MethodEntry {
		let owner = self.translate_class(method.owner());
		let desc = self.translate_method_descriptor(method.desc());
		let translated = self.translate(&Entry::Method(method.clone()))
			.and_then(|name| MethodEntry::new(owner.clone(), name, desc.clone()).ok());

		translated.unwrap_or_else(|| {
			// a method entry with the old name always works, since that name was valid before
			MethodEntry::new(owner, method.name(), desc)
				.unwrap_or_else(|_| method.clone())
		})
	}

	pub fn translate_constructor(&self, constructor: &ConstructorEntry) -> ConstructorEntry {
		ConstructorEntry::new(
			self.translate_class(&constructor.owner),
			constructor.desc.as_ref().map(|desc| self.translate_method_descriptor(desc)),
		)
	}

	fn translate_behavior(&self, behavior: &BehaviorEntry) -> BehaviorEntry {
		match behavior {
			BehaviorEntry::Method(method) => BehaviorEntry::Method(self.translate_method(method)),
			BehaviorEntry::Constructor(constructor) => BehaviorEntry::Constructor(self.translate_constructor(constructor)),
		}
	}

	pub fn translate_argument(&self, argument: &ArgumentEntry) -> ArgumentEntry {
		let name = self.argument_name(argument).unwrap_or(&argument.name);
		ArgumentEntry::new(self.translate_behavior(&argument.owner), argument.index, name)
	}

	/// Translates any entry, keeping the names of everything without a mapping.
	///
	/// Owners and descriptors are translated as well.
	pub fn translate_entry(&self, entry: &Entry) -> Entry {
		match entry {
			Entry::Class(class) => Entry::Class(self.translate_class(class)),
			Entry::Field(field) => Entry::Field(self.translate_field(field)),
			Entry::Method(method) => Entry::Method(self.translate_method(method)),
			Entry::Constructor(constructor) => Entry::Constructor(self.translate_constructor(constructor)),
			Entry::Argument(argument) => Entry::Argument(self.translate_argument(argument)),
		}
	}

	/// The access modifier the mappings give the entry.
	pub fn modifier(&self, entry: &Entry) -> AccessModifier {
		let modifier = match entry {
			Entry::Class(class) => self.class_mapping(class).map(ClassMapping::modifier),
			Entry::Field(field) => self.field_mapping(field).map(FieldMapping::modifier),
			Entry::Method(method) => self.method_mapping(method).map(MethodMapping::modifier),
			Entry::Constructor(constructor) => self.behavior_mapping(&BehaviorEntry::Constructor(constructor.clone())).map(MethodMapping::modifier),
			Entry::Argument(_) => None,
		};
		modifier.unwrap_or_default()
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use duke::{ClassEntry, Entry};
	use quill::tree::Mappings;
	use crate::index::NoHierarchy;
	use crate::translator::{Direction, Translator};

	fn class(name: &str) -> ClassEntry {
		ClassEntry::new(name).unwrap()
	}

	#[test]
	fn direction() {
		assert_eq!(Direction::Deobfuscating.choose("deobf", "obf"), "deobf");
		assert_eq!(Direction::Obfuscating.choose("deobf", "obf"), "obf");
		assert_eq!(Direction::Deobfuscating.inverse(), Direction::Obfuscating);
		assert_eq!(Direction::Obfuscating.inverse().inverse(), Direction::Obfuscating);
	}

	#[test]
	fn unmapped_parts_are_kept() {
		let mut mappings = Mappings::new();
		mappings.set_class_deobf_name(&class("a"), Some("org/example/Foo".to_owned())).unwrap();
		mappings.set_class_deobf_name(&class("a$b$c"), Some("Deep".to_owned())).unwrap();

		let deobf = Translator::new(Direction::Deobfuscating, &mappings, NoHierarchy::new());
		assert_eq!(deobf.translate_class(&class("a$b$c")), class("org/example/Foo$b$Deep"));
		assert_eq!(deobf.translate_class(&class("a$x")), class("org/example/Foo$x"));
		assert_eq!(deobf.translate_class(&class("z")), class("z"));
		assert_eq!(deobf.translate(&Entry::Class(class("a$b"))), None);
		assert_eq!(deobf.translate(&Entry::Class(class("z"))), None);

		let obf = Translator::new(Direction::Obfuscating, &mappings, NoHierarchy::new());
		assert_eq!(obf.translate_class(&class("org/example/Foo$b$Deep")), class("a$b$c"));
		assert_eq!(obf.translate(&Entry::Class(class("org/example/Foo$b$Deep"))), Some("a$b$c".to_owned()));
	}

	#[test]
	fn named_inner_classes_lose_their_obf_name() {
		let mut mappings = Mappings::new();
		mappings.set_class_deobf_name(&class("a"), Some("org/example/Foo".to_owned())).unwrap();
		mappings.set_class_deobf_name(&class("a$b"), Some("Inner".to_owned())).unwrap();
		mappings.set_class_deobf_name(&class("a$c"), Some("b".to_owned())).unwrap();
		mappings.get_or_create_class_mapping(&class("a$d"));

		let obf = Translator::new(Direction::Obfuscating, &mappings, NoHierarchy::new());
		assert_eq!(obf.translate(&Entry::Class(class("org/example/Foo$Inner"))), Some("a$b".to_owned()));
		// `b` is the deobfuscated name of `a$c`, not the one of `a$b`
		assert_eq!(obf.translate(&Entry::Class(class("org/example/Foo$b"))), Some("a$c".to_owned()));
		assert_eq!(obf.translate(&Entry::Class(class("org/example/Foo$d"))), Some("a$d".to_owned()));

		mappings.set_class_deobf_name(&class("a$c"), Some("Other".to_owned())).unwrap();
		let obf = Translator::new(Direction::Obfuscating, &mappings, NoHierarchy::new());
		assert_eq!(obf.translate(&Entry::Class(class("org/example/Foo$b"))), None);
	}

	#[test]
	fn descriptors() {
		let mut mappings = Mappings::new();
		mappings.set_class_deobf_name(&class("a"), Some("org/example/Foo".to_owned())).unwrap();

		let deobf = Translator::new(Direction::Deobfuscating, &mappings, NoHierarchy::new());
		let desc = deobf.translate_method_descriptor(&"([La;ILb;)La;".parse().unwrap());
		assert_eq!(desc.to_string(), "([Lorg/example/Foo;ILb;)Lorg/example/Foo;");

		let obf = Translator::new(Direction::Obfuscating, &mappings, NoHierarchy::new());
		assert_eq!(obf.translate_method_descriptor(&desc).to_string(), "([La;ILb;)La;");
	}
}
