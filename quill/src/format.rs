use std::fmt::{Display, Formatter};
use std::path::Path;
use anyhow::{anyhow, bail, Context, Result};
use log::info;
use crate::tree::Mappings;

/// All the supported formats.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MappingFormat {
	/// A single file, see [`crate::enigma_file`].
	EnigmaFile,
	/// See [`crate::enigma_dir`].
	EnigmaDirectory,
	/// See [`crate::json_dir`].
	JsonDirectory,
	/// See [`crate::srg`].
	Srg,
	/// See [`crate::tiny`].
	Tiny,
}

impl MappingFormat {
	pub const ALL: [MappingFormat; 5] = [
		MappingFormat::EnigmaFile,
		MappingFormat::EnigmaDirectory,
		MappingFormat::JsonDirectory,
		MappingFormat::Srg,
		MappingFormat::Tiny,
	];

	pub fn is_directory(self) -> bool {
		matches!(self, MappingFormat::EnigmaDirectory | MappingFormat::JsonDirectory)
	}

	/// Guesses the format from the file extension, directories are taken to be in the enigma directory format.
	pub fn detect(path: &Path) -> Option<MappingFormat> {
		if path.is_dir() {
			return Some(MappingFormat::EnigmaDirectory);
		}
		match path.extension()?.to_str()? {
			"mapping" | "mappings" => Some(MappingFormat::EnigmaFile),
			"srg" => Some(MappingFormat::Srg),
			"tiny" => Some(MappingFormat::Tiny),
			_ => None,
		}
	}

	/// Reads the mappings. For the directory formats, any file that can't be read makes this fail.
	pub fn read(self, path: impl AsRef<Path>) -> Result<Mappings> {
		let path = path.as_ref();
		info!("reading {self} mappings from {path:?}");

		let mappings = match self {
			MappingFormat::EnigmaFile => crate::enigma_file::read_file(path)?,
			MappingFormat::EnigmaDirectory => crate::enigma_dir::read(path)?.into_result()?,
			MappingFormat::JsonDirectory => crate::json_dir::read(path)?.into_result()?,
			MappingFormat::Srg => crate::srg::read_file(path)?,
			MappingFormat::Tiny => crate::tiny::read_file(path)?,
		};
		Ok(mappings)
	}

	pub fn write(self, mappings: &Mappings, path: impl AsRef<Path>) -> Result<()> {
		let path = path.as_ref();
		info!("writing {self} mappings to {path:?}");

		if !self.is_directory() && path.is_dir() {
			bail!("can't write {self} mappings to {path:?}, as it is a directory");
		}

		match self {
			MappingFormat::EnigmaFile => crate::enigma_file::write_file(mappings, path),
			MappingFormat::EnigmaDirectory => crate::enigma_dir::write(mappings, path, |_, _, _| {}),
			MappingFormat::JsonDirectory => crate::json_dir::write(mappings, path, |_, _, _| {}),
			MappingFormat::Srg => crate::srg::write_file(mappings, path),
			MappingFormat::Tiny => crate::tiny::write_file(mappings, &crate::tiny::Header::default(), path),
		}
			.with_context(|| anyhow!("failed to write {self} mappings"))
	}
}

impl Display for MappingFormat {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			MappingFormat::EnigmaFile => "enigma",
			MappingFormat::EnigmaDirectory => "enigma directory",
			MappingFormat::JsonDirectory => "json directory",
			MappingFormat::Srg => "srg",
			MappingFormat::Tiny => "tiny",
		})
	}
}
