//! Translating and renaming entries with the mappings of [`quill`].
//!
//! - [`translator`] looks up the names of entries in either direction,
//! - [`renamer`] changes the names, checking them first with [`validate`],
//! - [`index`] is how both learn about the class hierarchy of the obfuscated program.

pub mod index;
pub mod translator;
pub mod renamer;
pub mod validate;

pub use index::{ClassHierarchy, HierarchyIndex, NoHierarchy};
pub use renamer::{RenameObserver, Renamer};
pub use translator::{Direction, Translator};
pub use validate::IllegalNameError;
