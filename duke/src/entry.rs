//! Entries identify one element of an obfuscated program.
//!
//! All entries are immutable values, compared by their contents.

use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use thiserror::Error;
use crate::descriptor::{MethodDescriptor, TypeDescriptor};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
	#[error("illegal class name {name:?}: {reason}")]
	IllegalClassName { name: String, reason: &'static str },
	#[error("illegal method name {0:?}: method names must not be empty or start with '<'")]
	IllegalMethodName(String),
}

/// A class, named like `path/to/Outer$Inner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassEntry {
	name: String,
}

impl ClassEntry {
	/// Creates a class entry, checking that the name is in internal form.
	///
	/// ```
	/// use duke::entry::ClassEntry;
	///
	/// assert!(ClassEntry::new("org/example/Foo$Bar").is_ok());
	/// assert!(ClassEntry::new("org.example.Foo").is_err());
	/// assert!(ClassEntry::new("org/example/Foo$bar/Baz").is_err());
	/// ```
	pub fn new(name: impl Into<String>) -> Result<ClassEntry, EntryError> {
		let name = name.into();

		let reason = if name.is_empty() {
			Some("class names must not be empty")
		} else if name.contains('.') {
			Some("class names must not contain '.'")
		} else if name.split('$').any(str::is_empty) {
			Some("class names must not contain empty '$' segments")
		} else if name.split('$').skip(1).any(|segment| segment.contains('/')) {
			Some("inner class names must not contain '/'")
		} else if name.split('/').any(str::is_empty) {
			Some("class names must not contain empty package segments")
		} else {
			None
		};

		match reason {
			Some(reason) => Err(EntryError::IllegalClassName { name, reason }),
			None => Ok(ClassEntry { name }),
		}
	}

	/// Creates the entry of the inner class `simple_name` of this class.
	pub fn inner(&self, simple_name: &str) -> Result<ClassEntry, EntryError> {
		ClassEntry::new(format!("{}${simple_name}", self.name))
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn is_inner_class(&self) -> bool {
		self.name.contains('$')
	}

	/// The `$` separated parts of the name, the first one including the package.
	pub fn chain_names(&self) -> Vec<&str> {
		self.name.split('$').collect()
	}

	/// All classes from the outermost one to this one.
	///
	/// For `a/B$C$D` this is `a/B`, `a/B$C` and `a/B$C$D`.
	pub fn class_chain(&self) -> Vec<ClassEntry> {
		self.name.match_indices('$')
			.map(|(i, _)| ClassEntry { name: self.name[..i].to_owned() })
			.chain(std::iter::once(self.clone()))
			.collect()
	}

	pub fn outermost_class(&self) -> ClassEntry {
		match self.name.split_once('$') {
			Some((outermost, _)) => ClassEntry { name: outermost.to_owned() },
			None => self.clone(),
		}
	}

	/// The directly enclosing class of an inner class.
	pub fn outer_class(&self) -> Option<ClassEntry> {
		self.name.rsplit_once('$')
			.map(|(outer, _)| ClassEntry { name: outer.to_owned() })
	}

	/// The last `$` separated part of the name, for a top level class its full name.
	pub fn innermost_name(&self) -> &str {
		match self.name.rsplit_once('$') {
			Some((_, innermost)) => innermost,
			None => &self.name,
		}
	}

	/// The name without the package, and for inner classes without the outer classes.
	pub fn simple_name(&self) -> &str {
		let innermost = self.innermost_name();
		match innermost.rsplit_once('/') {
			Some((_, simple)) => simple,
			None => innermost,
		}
	}

	/// The package of the outermost class, `None` for the default package.
	pub fn package_name(&self) -> Option<&str> {
		let outermost = self.name.split('$').next().unwrap_or(&self.name);
		outermost.rsplit_once('/').map(|(package, _)| package)
	}

	pub fn is_in_default_package(&self) -> bool {
		self.package_name().is_none()
	}
}

impl Display for ClassEntry {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.name)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldEntry {
	pub owner: ClassEntry,
	pub name: String,
	pub desc: TypeDescriptor,
}

impl FieldEntry {
	pub fn new(owner: ClassEntry, name: impl Into<String>, desc: TypeDescriptor) -> FieldEntry {
		FieldEntry { owner, name: name.into(), desc }
	}

	pub fn with_owner(&self, owner: ClassEntry) -> FieldEntry {
		FieldEntry { owner, name: self.name.clone(), desc: self.desc.clone() }
	}
}

/// A method that is not a constructor or static initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodEntry {
	owner: ClassEntry,
	name: String,
	desc: MethodDescriptor,
}

impl MethodEntry {
	pub fn new(owner: ClassEntry, name: impl Into<String>, desc: MethodDescriptor) -> Result<MethodEntry, EntryError> {
		let name = name.into();
		if name.is_empty() || name.starts_with('<') {
			return Err(EntryError::IllegalMethodName(name));
		}
		Ok(MethodEntry { owner, name, desc })
	}

	pub fn owner(&self) -> &ClassEntry {
		&self.owner
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn desc(&self) -> &MethodDescriptor {
		&self.desc
	}

	pub fn with_owner(&self, owner: ClassEntry) -> MethodEntry {
		MethodEntry { owner, name: self.name.clone(), desc: self.desc.clone() }
	}

	pub fn with_name(&self, name: impl Into<String>) -> Result<MethodEntry, EntryError> {
		MethodEntry::new(self.owner.clone(), name, self.desc.clone())
	}
}

pub const CONSTRUCTOR_NAME: &str = "<init>";
pub const STATIC_INITIALIZER_NAME: &str = "<clinit>";

/// A constructor (`<init>`) or, if `desc` is `None`, the static initializer (`<clinit>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstructorEntry {
	pub owner: ClassEntry,
	pub desc: Option<MethodDescriptor>,
}

impl ConstructorEntry {
	pub fn new(owner: ClassEntry, desc: Option<MethodDescriptor>) -> ConstructorEntry {
		ConstructorEntry { owner, desc }
	}

	pub fn is_static_initializer(&self) -> bool {
		self.desc.is_none()
	}

	pub fn name(&self) -> &'static str {
		if self.is_static_initializer() { STATIC_INITIALIZER_NAME } else { CONSTRUCTOR_NAME }
	}

	/// The descriptor, `()V` for the static initializer.
	pub fn desc(&self) -> MethodDescriptor {
		self.desc.clone().unwrap_or_else(MethodDescriptor::void)
	}

	pub fn with_owner(&self, owner: ClassEntry) -> ConstructorEntry {
		ConstructorEntry { owner, desc: self.desc.clone() }
	}
}

/// Either a method or a constructor, the things that have arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BehaviorEntry {
	Method(MethodEntry),
	Constructor(ConstructorEntry),
}

impl BehaviorEntry {
	pub fn owner(&self) -> &ClassEntry {
		match self {
			BehaviorEntry::Method(method) => method.owner(),
			BehaviorEntry::Constructor(constructor) => &constructor.owner,
		}
	}

	pub fn name(&self) -> &str {
		match self {
			BehaviorEntry::Method(method) => method.name(),
			BehaviorEntry::Constructor(constructor) => constructor.name(),
		}
	}

	pub fn desc(&self) -> MethodDescriptor {
		match self {
			BehaviorEntry::Method(method) => method.desc().clone(),
			BehaviorEntry::Constructor(constructor) => constructor.desc(),
		}
	}

	pub fn with_owner(&self, owner: ClassEntry) -> BehaviorEntry {
		match self {
			BehaviorEntry::Method(method) => BehaviorEntry::Method(method.with_owner(owner)),
			BehaviorEntry::Constructor(constructor) => BehaviorEntry::Constructor(constructor.with_owner(owner)),
		}
	}
}

impl From<MethodEntry> for BehaviorEntry {
	fn from(value: MethodEntry) -> Self {
		BehaviorEntry::Method(value)
	}
}

impl From<ConstructorEntry> for BehaviorEntry {
	fn from(value: ConstructorEntry) -> Self {
		BehaviorEntry::Constructor(value)
	}
}

/// An argument of a method or constructor, identified by its local variable index.
///
/// The `name` is carried along for display, but two argument entries with the same owner and index are equal.
#[derive(Debug, Clone)]
pub struct ArgumentEntry {
	pub owner: BehaviorEntry,
	pub index: u32,
	pub name: String,
}

impl ArgumentEntry {
	pub fn new(owner: impl Into<BehaviorEntry>, index: u32, name: impl Into<String>) -> ArgumentEntry {
		ArgumentEntry { owner: owner.into(), index, name: name.into() }
	}

	pub fn with_owner(&self, owner: BehaviorEntry) -> ArgumentEntry {
		ArgumentEntry { owner, index: self.index, name: self.name.clone() }
	}
}

impl PartialEq for ArgumentEntry {
	fn eq(&self, other: &Self) -> bool {
		self.owner == other.owner && self.index == other.index
	}
}

impl Eq for ArgumentEntry {}

impl Hash for ArgumentEntry {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.owner.hash(state);
		self.index.hash(state);
	}
}

/// Any entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entry {
	Class(ClassEntry),
	Field(FieldEntry),
	Method(MethodEntry),
	Constructor(ConstructorEntry),
	Argument(ArgumentEntry),
}

impl Entry {
	/// The name of the entry. For classes this is the full name.
	pub fn name(&self) -> &str {
		match self {
			Entry::Class(class) => class.name(),
			Entry::Field(field) => &field.name,
			Entry::Method(method) => method.name(),
			Entry::Constructor(constructor) => constructor.name(),
			Entry::Argument(argument) => &argument.name,
		}
	}

	/// The class this entry is in, for classes the class itself.
	pub fn owner_class(&self) -> &ClassEntry {
		match self {
			Entry::Class(class) => class,
			Entry::Field(field) => &field.owner,
			Entry::Method(method) => method.owner(),
			Entry::Constructor(constructor) => &constructor.owner,
			Entry::Argument(argument) => argument.owner.owner(),
		}
	}

	/// Moves this entry into another class, for classes the new class is returned.
	pub fn with_owner(&self, owner: ClassEntry) -> Entry {
		match self {
			Entry::Class(_) => Entry::Class(owner),
			Entry::Field(field) => Entry::Field(field.with_owner(owner)),
			Entry::Method(method) => Entry::Method(method.with_owner(owner)),
			Entry::Constructor(constructor) => Entry::Constructor(constructor.with_owner(owner)),
			Entry::Argument(argument) => Entry::Argument(argument.with_owner(argument.owner.with_owner(owner))),
		}
	}
}

macro_rules! entry_from {
	($($variant:ident($ty:ty)),* $(,)?) => {
		$(
			impl From<$ty> for Entry {
				fn from(value: $ty) -> Self {
					Entry::$variant(value)
				}
			}
		)*
	};
}

entry_from!(
	Class(ClassEntry),
	Field(FieldEntry),
	Method(MethodEntry),
	Constructor(ConstructorEntry),
	Argument(ArgumentEntry),
);

impl From<BehaviorEntry> for Entry {
	fn from(value: BehaviorEntry) -> Self {
		match value {
			BehaviorEntry::Method(method) => Entry::Method(method),
			BehaviorEntry::Constructor(constructor) => Entry::Constructor(constructor),
		}
	}
}

impl Display for Entry {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Entry::Class(class) => write!(f, "{class}"),
			Entry::Field(field) => write!(f, "{}.{} {}", field.owner, field.name, field.desc),
			Entry::Method(method) => write!(f, "{}.{}{}", method.owner, method.name, method.desc),
			Entry::Constructor(constructor) => write!(f, "{}.{}{}", constructor.owner, constructor.name(), constructor.desc()),
			Entry::Argument(argument) => write!(
				f, "{}.{}{} arg {} ({})",
				argument.owner.owner(), argument.owner.name(), argument.owner.desc(), argument.index, argument.name
			),
		}
	}
}
