//! Questions about the class hierarchy of the obfuscated program.
//!
//! Answering them needs the class files, which aren't read here. A caller that has them implements
//! [`HierarchyIndex`], for everything else there's [`ClassHierarchy`], built from declarations given one by one,
//! and [`NoHierarchy`], which knows nothing.
//!
//! All entries given to and returned from an index are in the obfuscated namespace.

use std::collections::VecDeque;
use indexmap::{IndexMap, IndexSet};
use duke::{ClassEntry, Entry, FieldEntry, MethodEntry};

pub trait HierarchyIndex {
	/// The superclasses of `class`, starting with the direct one.
	fn ancestry(&self, class: &ClassEntry) -> Vec<ClassEntry>;

	/// The classes directly extending `class`.
	fn subclasses(&self, class: &ClassEntry) -> Vec<ClassEntry>;

	/// The override group of `method`: all the methods that are the same virtual method, `method` included.
	fn related_implementations(&self, method: &MethodEntry) -> IndexSet<MethodEntry>;

	/// The class that declares `entry`.
	///
	/// Fields and methods may be declared in a superclass of the class they're referenced in. If no class
	/// declaring the member is known, `exact` decides whether `None` or the owner of `entry` is returned.
	fn resolve_owner(&self, entry: &Entry, exact: bool) -> Option<ClassEntry>;

	fn contains_class(&self, _class: &ClassEntry) -> bool {
		false
	}

	fn contains_field(&self, _field: &FieldEntry) -> bool {
		false
	}

	fn contains_method(&self, _method: &MethodEntry) -> bool {
		false
	}
}

/// An index that doesn't know any class.
///
/// Every member is declared where it's referenced, and every method is its own override group.
#[derive(Debug, Copy, Clone, Default)]
pub struct NoHierarchy;

impl NoHierarchy {
	pub fn new() -> &'static NoHierarchy {
		static INSTANCE: NoHierarchy = NoHierarchy;
		&INSTANCE
	}
}

impl HierarchyIndex for NoHierarchy {
	fn ancestry(&self, _class: &ClassEntry) -> Vec<ClassEntry> {
		Vec::new()
	}

	fn subclasses(&self, _class: &ClassEntry) -> Vec<ClassEntry> {
		Vec::new()
	}

	fn related_implementations(&self, method: &MethodEntry) -> IndexSet<MethodEntry> {
		IndexSet::from([method.clone()])
	}

	fn resolve_owner(&self, entry: &Entry, exact: bool) -> Option<ClassEntry> {
		match entry {
			Entry::Class(class) => Some(class.clone()),
			_ if exact => None,
			entry => Some(entry.owner_class().clone()),
		}
	}
}

#[derive(Debug, Clone, Default)]
struct ClassInfo {
	super_class: Option<ClassEntry>,
	interfaces: IndexSet<ClassEntry>,
	fields: IndexSet<FieldEntry>,
	methods: IndexSet<MethodEntry>,
}

/// A class hierarchy held in memory.
///
/// ```
/// use duke::{ClassEntry, MethodEntry};
/// use decipher::index::{ClassHierarchy, HierarchyIndex};
///
/// let base = ClassEntry::new("a").unwrap();
/// let sub = ClassEntry::new("b").unwrap();
///
/// let mut hierarchy = ClassHierarchy::new();
/// hierarchy.add_class(base.clone(), None, []);
/// hierarchy.add_class(sub.clone(), Some(base.clone()), []);
/// hierarchy.add_method(MethodEntry::new(base.clone(), "c", "()V".parse().unwrap()).unwrap());
/// hierarchy.add_method(MethodEntry::new(sub.clone(), "c", "()V".parse().unwrap()).unwrap());
///
/// assert_eq!(hierarchy.ancestry(&sub), vec![base.clone()]);
/// let group = hierarchy.related_implementations(&MethodEntry::new(sub, "c", "()V".parse().unwrap()).unwrap());
/// assert_eq!(group.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
	classes: IndexMap<ClassEntry, ClassInfo>,
}

impl ClassHierarchy {
	pub fn new() -> ClassHierarchy {
		ClassHierarchy::default()
	}

	/// Declares a class with its direct superclass and the interfaces it directly implements.
	///
	/// Declaring a class again replaces its supertypes, but keeps its members.
	pub fn add_class(&mut self, class: ClassEntry, super_class: Option<ClassEntry>, interfaces: impl IntoIterator<Item=ClassEntry>) {
		let info = self.classes.entry(class).or_default();
		info.super_class = super_class;
		info.interfaces = interfaces.into_iter().collect();
	}

	/// Declares a field, in the class that is its owner.
	pub fn add_field(&mut self, field: FieldEntry) {
		self.classes.entry(field.owner.clone()).or_default()
			.fields.insert(field);
	}

	/// Declares a method, in the class that is its owner.
	pub fn add_method(&mut self, method: MethodEntry) {
		self.classes.entry(method.owner().clone()).or_default()
			.methods.insert(method);
	}

	pub fn super_class(&self, class: &ClassEntry) -> Option<&ClassEntry> {
		self.classes.get(class)?.super_class.as_ref()
	}

	pub fn interfaces(&self, class: &ClassEntry) -> impl Iterator<Item=&ClassEntry> {
		self.classes.get(class)
			.into_iter()
			.flat_map(|info| info.interfaces.iter())
	}

	/// The direct supertypes: the superclass and the interfaces.
	fn super_types(&self, class: &ClassEntry) -> Vec<ClassEntry> {
		self.super_class(class).into_iter()
			.chain(self.interfaces(class))
			.cloned()
			.collect()
	}

	/// The classes directly extending or implementing `class`.
	fn sub_types(&self, class: &ClassEntry) -> Vec<ClassEntry> {
		self.classes.iter()
			.filter(|(_, info)| info.super_class.as_ref() == Some(class) || info.interfaces.contains(class))
			.map(|(sub, _)| sub.clone())
			.collect()
	}

	/// All supertypes, the direct ones first.
	fn all_super_types(&self, class: &ClassEntry) -> IndexSet<ClassEntry> {
		let mut found = IndexSet::new();
		let mut queue: VecDeque<_> = self.super_types(class).into();
		while let Some(super_type) = queue.pop_front() {
			if super_type != *class && found.insert(super_type.clone()) {
				queue.extend(self.super_types(&super_type));
			}
		}
		found
	}

	/// Searches `class` and then its supertypes for the first one that `declares` the member.
	fn find_declaring(&self, class: &ClassEntry, with_interfaces: bool, declares: impl Fn(&ClassEntry) -> bool) -> Option<ClassEntry> {
		let mut visited = IndexSet::new();
		let mut queue = VecDeque::from([class.clone()]);
		while let Some(current) = queue.pop_front() {
			if !visited.insert(current.clone()) {
				continue;
			}
			if declares(&current) {
				return Some(current);
			}
			if with_interfaces {
				queue.extend(self.super_types(&current));
			} else {
				queue.extend(self.super_class(&current).cloned());
			}
		}
		None
	}
}

impl HierarchyIndex for ClassHierarchy {
	fn ancestry(&self, class: &ClassEntry) -> Vec<ClassEntry> {
		let mut ancestry = Vec::new();
		let mut current = self.super_class(class);
		while let Some(super_class) = current {
			// a cyclic hierarchy is broken input, but must not hang
			if super_class == class || ancestry.contains(super_class) {
				break;
			}
			ancestry.push(super_class.clone());
			current = self.super_class(super_class);
		}
		ancestry
	}

	fn subclasses(&self, class: &ClassEntry) -> Vec<ClassEntry> {
		self.classes.iter()
			.filter(|(_, info)| info.super_class.as_ref() == Some(class))
			.map(|(sub, _)| sub.clone())
			.collect()
	}

	fn related_implementations(&self, method: &MethodEntry) -> IndexSet<MethodEntry> {
		let mut group = IndexSet::from([method.clone()]);

		let mut visited = IndexSet::new();
		let mut queue = VecDeque::from([method.owner().clone()]);
		while let Some(class) = queue.pop_front() {
			if !visited.insert(class.clone()) {
				continue;
			}

			let implementation = method.with_owner(class.clone());
			if self.contains_method(&implementation) {
				group.insert(implementation);
			}

			// only supertypes declaring the method link the subtypes below them
			for super_type in self.all_super_types(&class) {
				if self.contains_method(&method.with_owner(super_type.clone())) {
					queue.push_back(super_type);
				}
			}
			queue.extend(self.sub_types(&class));
		}

		group
	}

	fn resolve_owner(&self, entry: &Entry, exact: bool) -> Option<ClassEntry> {
		let declaring = match entry {
			Entry::Class(class) => return Some(class.clone()),
			Entry::Field(field) => self.find_declaring(&field.owner, false, |class| {
				self.contains_field(&field.with_owner(class.clone()))
			}),
			Entry::Method(method) => self.find_declaring(method.owner(), true, |class| {
				self.contains_method(&method.with_owner(class.clone()))
			}),
			// constructors and their arguments are never inherited
			Entry::Constructor(_) | Entry::Argument(_) => Some(entry.owner_class().clone()),
		};

		match declaring {
			None if !exact => Some(entry.owner_class().clone()),
			declaring => declaring,
		}
	}

	fn contains_class(&self, class: &ClassEntry) -> bool {
		self.classes.contains_key(class)
	}

	fn contains_field(&self, field: &FieldEntry) -> bool {
		self.classes.get(&field.owner)
			.is_some_and(|info| info.fields.contains(field))
	}

	fn contains_method(&self, method: &MethodEntry) -> bool {
		self.classes.get(method.owner())
			.is_some_and(|info| info.methods.contains(method))
	}
}
