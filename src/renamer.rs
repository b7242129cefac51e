//! Changing the deobfuscated names in the mappings.
//!
//! Every change goes through validation first: the new name must be a legal identifier, and it must not collide
//! with the name of another entry that would be visible in the same place. Only if that succeeds the mappings are
//! changed, so a rejected rename leaves them as they were.
//!
//! Methods are renamed together with their whole override group, and so are the arguments of methods.

use std::fmt::Display;
use indexmap::IndexSet;
use log::{debug, trace};
use duke::{ArgumentEntry, BehaviorEntry, ClassEntry, Entry, FieldEntry, MethodEntry};
use quill::tree::{AccessModifier, ClassMapping, FieldMapping, Mappings, MethodMapping};
use crate::index::HierarchyIndex;
use crate::validate::{validate_class_name, validate_identifier, IllegalNameError};

/// Gets told about every entry whose name was changed.
///
/// The `new_name` is `None` if the mapping was removed. `class_moved` is set when a top level class got a new
/// name, since then its full name, and with it its package, changed.
pub trait RenameObserver {
	fn on_rename(&mut self, old: &Entry, new_name: Option<&str>, class_moved: bool);
}

impl<F: FnMut(&Entry, Option<&str>, bool)> RenameObserver for F {
	fn on_rename(&mut self, old: &Entry, new_name: Option<&str>, class_moved: bool) {
		self(old, new_name, class_moved)
	}
}

fn rejected(entry: impl Display, name: &str, error: &IllegalNameError) {
	trace!("not renaming {entry} to {name:?}: {}", error.reason);
}

pub struct Renamer<'a, I: ?Sized> {
	mappings: &'a mut Mappings,
	index: &'a I,
	observer: Option<Box<dyn RenameObserver + 'a>>,
}

impl<'a, I: HierarchyIndex + ?Sized> Renamer<'a, I> {
	pub fn new(mappings: &'a mut Mappings, index: &'a I) -> Renamer<'a, I> {
		Renamer { mappings, index, observer: None }
	}

	pub fn with_observer(mut self, observer: impl RenameObserver + 'a) -> Renamer<'a, I> {
		self.observer = Some(Box::new(observer));
		self
	}

	pub fn mappings(&self) -> &Mappings {
		&*self.mappings
	}

	fn notify(&mut self, old: Entry, new_name: Option<&str>, class_moved: bool) {
		if let Some(observer) = &mut self.observer {
			observer.on_rename(&old, new_name, class_moved);
		}
	}

	/// Gives an entry a new deobfuscated name.
	///
	/// Class names may use `.` to separate the packages, for inner classes only the simple name is given.
	pub fn rename(&mut self, entry: &Entry, new_name: &str) -> Result<(), IllegalNameError> {
		match entry {
			Entry::Class(class) => self.rename_class(class, new_name),
			Entry::Field(field) => self.rename_field(field, new_name),
			Entry::Method(method) => self.rename_method(method, new_name),
			Entry::Constructor(_) => {
				let error = IllegalNameError::new(new_name, "constructors can't be renamed");
				rejected(entry, new_name, &error);
				Err(error)
			},
			Entry::Argument(argument) => self.rename_argument(argument, new_name),
		}
	}

	pub fn rename_class(&mut self, class: &ClassEntry, new_name: &str) -> Result<(), IllegalNameError> {
		let name = new_name.replace('.', "/");
		self.check_class_name(class, &name)
			.inspect_err(|e| rejected(class, &name, e))?;
		self.set_class_name(class, Some(name))
	}

	pub fn rename_field(&mut self, field: &FieldEntry, new_name: &str) -> Result<(), IllegalNameError> {
		self.check_field_name(field, new_name)
			.inspect_err(|e| rejected(Entry::Field(field.clone()), new_name, e))?;
		self.set_field_name(field, Some(new_name.to_owned()))
	}

	/// Renames a method and all the methods in its override group.
	pub fn rename_method(&mut self, method: &MethodEntry, new_name: &str) -> Result<(), IllegalNameError> {
		let group = self.override_group(method);
		validate_identifier(new_name)
			.and_then(|()| self.check_method_collisions(&group, new_name))
			.inspect_err(|e| rejected(Entry::Method(method.clone()), new_name, e))?;

		for member in group {
			self.set_method_name(&member, Some(new_name.to_owned()))?;
		}
		Ok(())
	}

	/// Renames an argument, together with the same argument of all the methods in the override group.
	pub fn rename_argument(&mut self, argument: &ArgumentEntry, new_name: &str) -> Result<(), IllegalNameError> {
		let group = self.argument_group(argument);
		validate_identifier(new_name)
			.and_then(|()| self.check_argument_collisions(&group, new_name))
			.inspect_err(|e| rejected(Entry::Argument(argument.clone()), new_name, e))?;

		for member in group {
			self.set_argument_name(&member, Some(new_name.to_owned()))?;
		}
		Ok(())
	}

	/// Sets the deobfuscated name to the obfuscated one.
	///
	/// For an inner class this is its simple name. Arguments don't have an obfuscated name, they keep the name
	/// given in the entry.
	pub fn mark_as_deobfuscated(&mut self, entry: &Entry) -> Result<(), IllegalNameError> {
		match entry {
			Entry::Class(class) => {
				let name = class.innermost_name();
				self.check_class_name(class, name)
					.inspect_err(|e| rejected(entry, name, e))?;
				self.set_class_name(class, Some(name.to_owned()))
			},
			Entry::Field(field) => {
				self.check_field_name(field, &field.name)
					.inspect_err(|e| rejected(entry, &field.name, e))?;
				self.set_field_name(field, Some(field.name.clone()))
			},
			Entry::Method(method) => {
				let group = self.override_group(method);
				self.check_method_collisions(&group, method.name())
					.inspect_err(|e| rejected(entry, method.name(), e))?;
				for member in group {
					self.set_method_name(&member, Some(member.name().to_owned()))?;
				}
				Ok(())
			},
			Entry::Constructor(_) => Err(IllegalNameError::new(entry.name(), "constructors can't be renamed")),
			Entry::Argument(argument) => {
				let group = self.argument_group(argument);
				self.check_argument_collisions(&group, &argument.name)
					.inspect_err(|e| rejected(entry, &argument.name, e))?;
				for member in group {
					self.set_argument_name(&member, Some(argument.name.clone()))?;
				}
				Ok(())
			},
		}
	}

	/// Removes the deobfuscated name of an entry, making it unmapped again.
	///
	/// Inner classes, members and modifiers of a class stay.
	pub fn remove_mapping(&mut self, entry: &Entry) -> Result<(), IllegalNameError> {
		match entry {
			Entry::Class(class) => {
				if self.mappings.find_class(class).and_then(ClassMapping::deobf_name).is_some() {
					self.set_class_name(class, None)?;
				}
			},
			Entry::Field(field) => {
				if let Some(mapping) = self.mappings.field_mapping(field) {
					let keep = mapping.modifier() != AccessModifier::Unchanged;
					self.set_field_name(field, None)?;
					if !keep {
						self.mappings.get_or_create_class_mapping(&field.owner)
							.remove_field(&field.name, &field.desc);
					}
				}
			},
			Entry::Method(method) => {
				for member in self.override_group(method) {
					if self.mappings.method_mapping(&member).and_then(MethodMapping::deobf_name).is_some() {
						self.set_method_name(&member, None)?;
					}
				}
			},
			Entry::Constructor(_) => return Err(IllegalNameError::new(entry.name(), "constructors can't be renamed")),
			Entry::Argument(argument) => {
				for member in self.argument_group(argument) {
					if self.mappings.argument_mapping(&member).is_some() {
						self.set_argument_name(&member, None)?;
					}
				}
			},
		}
		Ok(())
	}

	/// Sets the access modifier of a single entry. Arguments don't have one, for them this does nothing.
	pub fn set_modifier(&mut self, entry: &Entry, modifier: AccessModifier) {
		match entry {
			Entry::Class(class) => self.mappings.set_class_modifier(class, modifier),
			Entry::Field(field) => self.mappings.set_field_modifier(field, modifier),
			Entry::Method(method) => self.mappings.set_behavior_modifier(&BehaviorEntry::Method(method.clone()), modifier),
			Entry::Constructor(constructor) => self.mappings.set_behavior_modifier(&BehaviorEntry::Constructor(constructor.clone()), modifier),
			Entry::Argument(_) => return,
		}
		debug!("set modifier of {entry} to {modifier:?}");
	}

	pub fn modifier(&self, entry: &Entry) -> AccessModifier {
		let modifier = match entry {
			Entry::Class(class) => self.mappings.find_class(class).map(ClassMapping::modifier),
			Entry::Field(field) => self.mappings.field_mapping(field).map(FieldMapping::modifier),
			Entry::Method(method) => self.mappings.method_mapping(method).map(MethodMapping::modifier),
			Entry::Constructor(constructor) => {
				self.mappings.behavior_mapping(&BehaviorEntry::Constructor(constructor.clone())).map(MethodMapping::modifier)
			},
			Entry::Argument(_) => None,
		};
		modifier.unwrap_or_default()
	}

	fn override_group(&self, method: &MethodEntry) -> IndexSet<MethodEntry> {
		let mut group = self.index.related_implementations(method);
		group.insert(method.clone());
		group
	}

	fn argument_group(&self, argument: &ArgumentEntry) -> Vec<ArgumentEntry> {
		match &argument.owner {
			BehaviorEntry::Method(method) => self.override_group(method).into_iter()
				.map(|member| argument.with_owner(BehaviorEntry::Method(member)))
				.collect(),
			BehaviorEntry::Constructor(_) => vec![argument.clone()],
		}
	}

	fn check_class_name(&self, class: &ClassEntry, name: &str) -> Result<(), IllegalNameError> {
		validate_class_name(name, class.is_inner_class())?;

		// an unnamed class is known by its obfuscated name
		let is_other = |other: &ClassMapping| other.obf_entry() != class;
		let is_other_unnamed = |other: &ClassMapping| is_other(other) && other.deobf_name().is_none();

		let taken = match class.outer_class() {
			None => {
				self.mappings.class_by_deobf(name).is_some_and(is_other) ||
					self.mappings.class(name).is_some_and(is_other_unnamed) ||
					(name != class.name() && ClassEntry::new(name).is_ok_and(|other| self.index.contains_class(&other)))
			},
			Some(outer) => {
				let outer_mapping = self.mappings.find_class(&outer);
				outer_mapping.and_then(|outer| outer.inner_class_by_deobf(name)).is_some_and(is_other) ||
					outer_mapping.and_then(|outer| outer.inner_class(name)).is_some_and(is_other_unnamed) ||
					(name != class.innermost_name() && outer.inner(name).is_ok_and(|other| self.index.contains_class(&other)))
			},
		};

		if taken {
			return Err(IllegalNameError::new(name, "there is already a class with that name"));
		}
		Ok(())
	}

	fn check_field_name(&self, field: &FieldEntry, name: &str) -> Result<(), IllegalNameError> {
		validate_identifier(name)?;

		let classes = std::iter::once(field.owner.clone()).chain(self.index.ancestry(&field.owner));
		for class in classes {
			let is_other = |obf_name: &str| class != field.owner || obf_name != field.name;

			let mapping = self.mappings.find_class(&class);
			let taken = mapping.and_then(|c| c.field_by_deobf(name, &field.desc))
				.is_some_and(|other| is_other(other.obf_name())) ||
				mapping.and_then(|c| c.field(name, &field.desc))
					.is_some_and(|other| other.deobf_name().is_none() && is_other(other.obf_name())) ||
				(is_other(name) && self.index.contains_field(&FieldEntry::new(class.clone(), name, field.desc.clone())));

			if taken {
				return Err(IllegalNameError::new(name, format!("there is already a field with that name in {class}")));
			}
		}
		Ok(())
	}

	/// Checks every member of the group against its class, its superclasses and all its subclasses.
	fn check_method_collisions(&self, group: &IndexSet<MethodEntry>, name: &str) -> Result<(), IllegalNameError> {
		let in_group = |class: &ClassEntry, obf_name: &str| {
			group.iter().any(|member| member.owner() == class && member.name() == obf_name)
		};

		for member in group {
			let mut classes: IndexSet<ClassEntry> = std::iter::once(member.owner().clone())
				.chain(self.index.ancestry(member.owner()))
				.collect();
			self.collect_subclasses(member.owner(), &mut classes);

			for class in classes {
				let mapping = self.mappings.find_class(&class);
				let target = member.with_owner(class.clone());
				let desc = target.desc();

				let taken = mapping.and_then(|c| c.method_by_deobf(name, desc))
					.is_some_and(|other| !in_group(&class, other.obf_name())) ||
					mapping.and_then(|c| c.method(name, desc))
						.is_some_and(|other| other.deobf_name().is_none() && !in_group(&class, other.obf_name())) ||
					(!in_group(&class, name) && target.with_name(name).is_ok_and(|other| self.index.contains_method(&other)));

				if taken {
					return Err(IllegalNameError::new(name, format!("there is already a method with that name and signature in class {class}")));
				}
			}
		}
		Ok(())
	}

	fn collect_subclasses(&self, class: &ClassEntry, classes: &mut IndexSet<ClassEntry>) {
		for subclass in self.index.subclasses(class) {
			if classes.insert(subclass.clone()) {
				self.collect_subclasses(&subclass, classes);
			}
		}
	}

	fn check_argument_collisions(&self, group: &[ArgumentEntry], name: &str) -> Result<(), IllegalNameError> {
		for member in group {
			let taken = self.mappings.behavior_mapping(&member.owner)
				.and_then(|method| method.argument_by_name(name))
				.is_some_and(|other| other.index() != member.index);
			if taken {
				return Err(IllegalNameError::new(name, "there is already an argument with that name"));
			}
		}
		Ok(())
	}

	fn set_class_name(&mut self, class: &ClassEntry, name: Option<String>) -> Result<(), IllegalNameError> {
		self.mappings.set_class_deobf_name(class, name.clone())?;
		debug!("set name of class {class} to {name:?}");
		self.notify(Entry::Class(class.clone()), name.as_deref(), !class.is_inner_class());
		Ok(())
	}

	fn set_field_name(&mut self, field: &FieldEntry, name: Option<String>) -> Result<(), IllegalNameError> {
		self.mappings.set_field_deobf_name(field, name.clone())?;
		let entry = Entry::Field(field.clone());
		debug!("set name of field {entry} to {name:?}");
		self.notify(entry, name.as_deref(), false);
		Ok(())
	}

	fn set_method_name(&mut self, method: &MethodEntry, name: Option<String>) -> Result<(), IllegalNameError> {
		self.mappings.set_method_deobf_name(method, name.clone())?;
		let entry = Entry::Method(method.clone());
		debug!("set name of method {entry} to {name:?}");
		self.notify(entry, name.as_deref(), false);
		Ok(())
	}

	fn set_argument_name(&mut self, argument: &ArgumentEntry, name: Option<String>) -> Result<(), IllegalNameError> {
		self.mappings.set_argument_name(argument, name.clone())?;
		let entry = Entry::Argument(argument.clone());
		debug!("set name of argument {entry} to {name:?}");
		self.notify(entry, name.as_deref(), false);
		Ok(())
	}
}
