//! Names, descriptors and entries of obfuscated JVM programs.
//!
//! The [`descriptor`] module parses and writes type and method descriptors, the [`entry`] module
//! contains the immutable values identifying a class, field, method, constructor or argument.

pub mod descriptor;
pub mod entry;

pub use descriptor::{DescriptorParseError, MethodDescriptor, Primitive, TypeDescriptor};
pub use entry::{ArgumentEntry, BehaviorEntry, ClassEntry, ConstructorEntry, Entry, EntryError, FieldEntry, MethodEntry};
