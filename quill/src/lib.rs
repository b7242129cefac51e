//! Crate for reading and writing mapping files, and holding the mappings in memory.
//!
//! The mappings are kept in a [`tree::Mappings`], indexed by both the obfuscated and the deobfuscated names.
//!
//! Currently this crate supports reading and writing
//! - enigma files (`.mapping`), see [`enigma_file`], and directories of them, see [`enigma_dir`],
//! - directories of JSON files, one per class, see [`json_dir`],
//! - SRG files, see [`srg`],
//! - Tiny v1 files, see [`tiny`].
//!
//! [`MappingFormat`] allows choosing one of these at runtime.

mod lines;
mod flat;

pub mod error;
pub mod tree;
pub mod walk;

pub mod enigma_file;
pub mod enigma_dir;
pub mod json_dir;
pub mod srg;
pub mod tiny;

mod format;

pub use error::{MappingConflict, MappingKind, MappingParseError, ParseErrorKind};
pub use format::MappingFormat;
