//! Type and method descriptors.
//!
//! The grammar for descriptors is:
//! ```txt
//! MethodDescriptor:
//!     "(" FieldType* ")" ReturnType
//!
//! ReturnType:
//!     FieldType | "V"
//!
//! FieldType:
//!     "B" | "C" | "D" | "F" | "I" | "J" | "S" | "Z" |
//!     "L" ClassName GenericSuffix? ";" |
//!     "T" TypeVariableName ";" |
//!     "[" FieldType
//! ```
//! where a `GenericSuffix` starts at the first `<` of the class name and must have balanced `<` and `>`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// The error returned when parsing a descriptor fails.
///
/// Carries the whole input and the position (in bytes) at which parsing failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid descriptor {input:?} at position {position}: {reason}")]
pub struct DescriptorParseError {
	pub input: String,
	pub position: usize,
	pub reason: String,
}

impl DescriptorParseError {
	fn new(input: &str, position: usize, reason: impl Into<String>) -> DescriptorParseError {
		DescriptorParseError {
			input: input.to_owned(),
			position,
			reason: reason.into(),
		}
	}

	/// The part of the input starting at the position parsing failed.
	pub fn offending(&self) -> &str {
		self.input.get(self.position..).unwrap_or("")
	}
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
	/// A `byte`. In rust, this is a `i8`.
	Byte,
	/// A `char`.
	Char,
	/// A `double`. In rust, this is a `f64`.
	Double,
	/// A `float`. In rust, this is a `f32`.
	Float,
	/// An `int`. In rust, this is a `i32`.
	Int,
	/// A `long`. In rust, this is a `i64`.
	Long,
	/// A `short`. In rust, this is a `i16`.
	Short,
	/// A `boolean`. In rust, this is a `bool`.
	Boolean,
}

impl Primitive {
	pub fn from_char(c: char) -> Option<Primitive> {
		Some(match c {
			'B' => Primitive::Byte,
			'C' => Primitive::Char,
			'D' => Primitive::Double,
			'F' => Primitive::Float,
			'I' => Primitive::Int,
			'J' => Primitive::Long,
			'S' => Primitive::Short,
			'Z' => Primitive::Boolean,
			_ => return None,
		})
	}

	pub fn as_char(self) -> char {
		match self {
			Primitive::Byte => 'B',
			Primitive::Char => 'C',
			Primitive::Double => 'D',
			Primitive::Float => 'F',
			Primitive::Int => 'I',
			Primitive::Long => 'J',
			Primitive::Short => 'S',
			Primitive::Boolean => 'Z',
		}
	}
}

/// A class type, possibly with a generic suffix.
///
/// For `Ljava/util/List<Ljava/lang/String;>;` the `name` is `java/util/List` and the `generic` is
/// `<Ljava/lang/String;>`. The generic suffix is kept as written, it's not considered a part of the raw type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectType {
	pub name: String,
	pub generic: Option<String>,
}

impl ObjectType {
	pub fn new(name: impl Into<String>) -> ObjectType {
		ObjectType { name: name.into(), generic: None }
	}
}

/// Represents a type.
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use duke::descriptor::{Primitive, TypeDescriptor};
///
/// let int_array: TypeDescriptor = "[[I".parse().unwrap();
/// assert_eq!(int_array, TypeDescriptor::Array(2, Box::new(TypeDescriptor::Primitive(Primitive::Int))));
/// assert_eq!(int_array.to_string(), "[[I");
/// ```
///
/// Note that the component of an [`TypeDescriptor::Array`] is never an array itself and never
/// [`TypeDescriptor::Void`] when obtained from parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeDescriptor {
	Void,
	Primitive(Primitive),
	Object(ObjectType),
	TypeVariable(String),
	/// An array type, represented by the dimension and the component type.
	Array(usize, Box<TypeDescriptor>),
}

/// Parses exactly one type from the front of `s`, returning the type and the rest of the input.
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use duke::descriptor::{parse_type, Primitive, TypeDescriptor};
///
/// let (first, rest) = parse_type("JLjava/lang/Object;").unwrap();
/// assert_eq!(first, TypeDescriptor::Primitive(Primitive::Long));
/// assert_eq!(rest, "Ljava/lang/Object;");
/// ```
pub fn parse_type(s: &str) -> Result<(TypeDescriptor, &str), DescriptorParseError> {
	let (descriptor, end) = read_type(s, 0)?;
	Ok((descriptor, &s[end..]))
}

/// Parses a type that is valid for a field, so anything but `V`, and requires that there's no input left.
pub fn parse_field_type(s: &str) -> Result<TypeDescriptor, DescriptorParseError> {
	let (descriptor, end) = read_type(s, 0)?;
	if descriptor.is_void() {
		return Err(DescriptorParseError::new(s, 0, "void is not a valid field type"));
	}
	if end != s.len() {
		return Err(DescriptorParseError::new(s, end, "expected end of descriptor"));
	}
	Ok(descriptor)
}

/// Parses a full method descriptor like `(ILjava/lang/String;)V`.
pub fn parse_method_descriptor(s: &str) -> Result<MethodDescriptor, DescriptorParseError> {
	let bytes = s.as_bytes();
	if bytes.first() != Some(&b'(') {
		return Err(DescriptorParseError::new(s, 0, "method descriptor doesn't start with '('"));
	}

	let mut position = 1;
	let mut arguments = Vec::new();
	loop {
		match bytes.get(position) {
			Some(b')') => {
				position += 1;
				break;
			},
			Some(_) => {
				let (argument, end) = read_type(s, position)?;
				if argument.is_void() {
					return Err(DescriptorParseError::new(s, position, "void is not a valid argument type"));
				}
				arguments.push(argument);
				position = end;
			},
			None => return Err(DescriptorParseError::new(s, position, "unexpected abrupt ending of descriptor, missing ')'")),
		}
	}

	let (return_type, end) = read_type(s, position)?;
	if end != s.len() {
		return Err(DescriptorParseError::new(s, end, "expected end of method descriptor"));
	}

	Ok(MethodDescriptor { arguments, return_type })
}

fn read_type(input: &str, start: usize) -> Result<(TypeDescriptor, usize), DescriptorParseError> {
	let bytes = input.as_bytes();

	let mut position = start;
	while bytes.get(position) == Some(&b'[') {
		position += 1;
	}
	let array_dimension = position - start;

	let Some(c) = input[position..].chars().next() else {
		return Err(DescriptorParseError::new(input, position, "unexpected abrupt ending of descriptor"));
	};

	let (component, end) = match c {
		'V' => (TypeDescriptor::Void, position + 1),
		'L' => {
			let (object, end) = read_object_type(input, position + 1)?;
			(TypeDescriptor::Object(object), end)
		},
		'T' => {
			let name_start = position + 1;
			let name_end = input[name_start..].find(';')
				.map(|i| name_start + i)
				.ok_or_else(|| DescriptorParseError::new(input, position, "unterminated type variable"))?;
			if name_start == name_end {
				return Err(DescriptorParseError::new(input, position, "empty type variable name"));
			}
			(TypeDescriptor::TypeVariable(input[name_start..name_end].to_owned()), name_end + 1)
		},
		c => match Primitive::from_char(c) {
			Some(primitive) => (TypeDescriptor::Primitive(primitive), position + 1),
			None => return Err(DescriptorParseError::new(input, position, format!("unexpected char {c:?} in descriptor"))),
		},
	};

	if array_dimension == 0 {
		Ok((component, end))
	} else if component.is_void() {
		Err(DescriptorParseError::new(input, position, "array of void"))
	} else {
		Ok((TypeDescriptor::Array(array_dimension, Box::new(component)), end))
	}
}

/// Reads the part after the `L` up to and including the `;`, the generic suffix must be balanced.
fn read_object_type(input: &str, start: usize) -> Result<(ObjectType, usize), DescriptorParseError> {
	let bytes = input.as_bytes();

	let mut depth = 0usize;
	let mut generic_start = None;
	let mut position = start;
	loop {
		match bytes.get(position) {
			None => return Err(DescriptorParseError::new(input, start - 1, "unterminated class name")),
			Some(b'<') => {
				if depth == 0 && generic_start.is_none() {
					generic_start = Some(position);
				}
				depth += 1;
			},
			Some(b'>') => {
				depth = depth.checked_sub(1)
					.ok_or_else(|| DescriptorParseError::new(input, position, "unbalanced '>' in class name"))?;
			},
			Some(b';') if depth == 0 => break,
			Some(_) => {},
		}
		position += 1;
	}

	let name_end = generic_start.unwrap_or(position);
	if name_end == start {
		return Err(DescriptorParseError::new(input, start - 1, "empty class name"));
	}

	let object = ObjectType {
		name: input[start..name_end].to_owned(),
		generic: generic_start.map(|generic_start| input[generic_start..position].to_owned()),
	};
	Ok((object, position + 1))
}

impl TypeDescriptor {
	pub fn object(name: impl Into<String>) -> TypeDescriptor {
		TypeDescriptor::Object(ObjectType::new(name))
	}

	pub fn is_void(&self) -> bool {
		matches!(self, TypeDescriptor::Void)
	}

	pub fn is_primitive(&self) -> bool {
		matches!(self, TypeDescriptor::Primitive(_))
	}

	pub fn is_array(&self) -> bool {
		matches!(self, TypeDescriptor::Array(..))
	}

	pub fn array_dimension(&self) -> usize {
		match self {
			TypeDescriptor::Array(dimension, _) => *dimension,
			_ => 0,
		}
	}

	/// The raw class name of this type, also for arrays of classes. Type variables don't have one.
	pub fn class_name(&self) -> Option<&str> {
		match self {
			TypeDescriptor::Object(object) => Some(&object.name),
			TypeDescriptor::Array(_, component) => component.class_name(),
			_ => None,
		}
	}

	/// The number of local variable slots a value of this type takes.
	pub fn size(&self) -> u32 {
		match self {
			TypeDescriptor::Void => 0,
			TypeDescriptor::Primitive(Primitive::Long | Primitive::Double) => 2,
			_ => 1,
		}
	}

	/// Rewrites every class name in this type with `f`.
	///
	/// Keeps array dimensions and generic suffixes as they are.
	///
	/// ```
	/// # use pretty_assertions::assert_eq;
	/// use duke::descriptor::TypeDescriptor;
	///
	/// let desc: TypeDescriptor = "[La;".parse().unwrap();
	/// let remapped = desc.remap(|name| if name == "a" { "org/example/Foo".to_owned() } else { name.to_owned() });
	/// assert_eq!(remapped.to_string(), "[Lorg/example/Foo;");
	/// ```
	pub fn remap(&self, mut f: impl FnMut(&str) -> String) -> TypeDescriptor {
		self.remap_with(&mut f)
	}

	fn remap_with(&self, f: &mut dyn FnMut(&str) -> String) -> TypeDescriptor {
		match self {
			TypeDescriptor::Object(object) => TypeDescriptor::Object(ObjectType {
				name: f(&object.name),
				generic: object.generic.clone(),
			}),
			TypeDescriptor::Array(dimension, component) => TypeDescriptor::Array(*dimension, Box::new(component.remap_with(f))),
			other => other.clone(),
		}
	}

	fn write(&self, s: &mut String) {
		match self {
			TypeDescriptor::Void => s.push('V'),
			TypeDescriptor::Primitive(primitive) => s.push(primitive.as_char()),
			TypeDescriptor::Object(object) => {
				s.push('L');
				s.push_str(&object.name);
				if let Some(generic) = &object.generic {
					s.push_str(generic);
				}
				s.push(';');
			},
			TypeDescriptor::TypeVariable(name) => {
				s.push('T');
				s.push_str(name);
				s.push(';');
			},
			TypeDescriptor::Array(dimension, component) => {
				for _ in 0..*dimension {
					s.push('[');
				}
				component.write(s);
			},
		}
	}
}

impl Display for TypeDescriptor {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let mut s = String::new();
		self.write(&mut s);
		f.write_str(&s)
	}
}

impl FromStr for TypeDescriptor {
	type Err = DescriptorParseError;

	/// Parses exactly one type, `V` included, and requires the whole input to be consumed.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (descriptor, end) = read_type(s, 0)?;
		if end != s.len() {
			return Err(DescriptorParseError::new(s, end, "expected end of descriptor"));
		}
		Ok(descriptor)
	}
}

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodDescriptor {
	pub arguments: Vec<TypeDescriptor>,
	pub return_type: TypeDescriptor,
}

impl MethodDescriptor {
	/// The descriptor `()V`.
	pub fn void() -> MethodDescriptor {
		MethodDescriptor { arguments: Vec::new(), return_type: TypeDescriptor::Void }
	}

	/// Rewrites every class name in the arguments and the return type with `f`.
	pub fn remap(&self, mut f: impl FnMut(&str) -> String) -> MethodDescriptor {
		MethodDescriptor {
			arguments: self.arguments.iter().map(|argument| argument.remap_with(&mut f)).collect(),
			return_type: self.return_type.remap_with(&mut f),
		}
	}

	/// Returns the number of local variable slots the arguments take, with the implicit `this` if not static.
	/// Doubles and longs count 2 instead of 1.
	pub fn arguments_size(&self, is_static: bool) -> u32 {
		let this = if is_static { 0 } else { 1 };
		this + self.arguments.iter().map(TypeDescriptor::size).sum::<u32>()
	}

	/// Returns the local variable index of the argument at `position`, or `None` if there's no such argument.
	pub fn argument_index(&self, position: usize, is_static: bool) -> Option<u32> {
		if position >= self.arguments.len() {
			return None;
		}
		let this = if is_static { 0 } else { 1 };
		Some(this + self.arguments[..position].iter().map(TypeDescriptor::size).sum::<u32>())
	}
}

impl Display for MethodDescriptor {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let mut s = String::from("(");
		for argument in &self.arguments {
			argument.write(&mut s);
		}
		s.push(')');
		self.return_type.write(&mut s);
		f.write_str(&s)
	}
}

impl FromStr for MethodDescriptor {
	type Err = DescriptorParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		parse_method_descriptor(s)
	}
}
