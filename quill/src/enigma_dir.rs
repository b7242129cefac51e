//! Functions to read and write mappings in the "enigma directory" format.
//!
//! # Reading
//! All files ending in `.mapping` below the given directory are read as [enigma files][crate::enigma_file], in
//! file name order. Every file is parsed on its own and then merged into the result. A file that fails to parse,
//! or whose classes conflict with the ones already read, is skipped and reported in [`DirectoryLoad::errors`].
//!
//! # Writing
//! Every top level class is written to `<name>.mapping`, where `<name>` is the deobfuscated name of the class,
//! or the obfuscated one if it has none. Packages become directories. Any other `.mapping` file in the directory
//! is deleted, so that renamed and removed classes don't leave their old files behind.

use std::fs::File;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, bail, Context, Result};
use indexmap::IndexSet;
use log::{debug, warn};
use walkdir::WalkDir;
use crate::error::{MappingParseError, ParseErrorKind};
use crate::tree::{ClassMapping, Mappings};
use crate::walk::ClassNames;

pub(crate) const MAPPING_EXTENSION: &str = "mapping";

/// The result of reading a directory: the mappings of all files that could be read, and the errors of the others.
#[derive(Debug)]
pub struct DirectoryLoad {
	pub mappings: Mappings,
	pub errors: Vec<MappingParseError>,
}

impl DirectoryLoad {
	/// Returns the mappings, or the first error if any file failed.
	pub fn into_result(mut self) -> Result<Mappings, MappingParseError> {
		if self.errors.is_empty() {
			Ok(self.mappings)
		} else {
			Err(self.errors.swap_remove(0))
		}
	}
}

/// Lists all files with the given extension below `path`, sorted by their file name.
pub(crate) fn files_with_extension(path: &Path, extension: &str) -> Result<Vec<PathBuf>> {
	WalkDir::new(path)
		.sort_by_file_name() // make it deterministic
		.into_iter()
		.filter(|entry| {
			entry.as_ref().map_or(true, |entry| {
				entry.file_type().is_file() && entry.path().extension().is_some_and(|ex| ex == extension)
			})
		})
		.map(|entry| {
			entry.map(|entry| entry.into_path())
				.with_context(|| anyhow!("failed to walk directory {path:?}"))
		})
		.collect()
}

/// Parses every file with `read_one`, merging the results.
pub(crate) fn read_each(files: Vec<PathBuf>, read_one: impl Fn(&Path) -> Result<Mappings, MappingParseError>) -> DirectoryLoad {
	let mut mappings = Mappings::new();
	let mut errors = Vec::new();

	for file in files {
		debug!("reading mappings file {file:?}");

		let result = read_one(&file).and_then(|read| {
			mappings.merge_classes(read)
				.map_err(|e| MappingParseError::new(0, ParseErrorKind::Conflict(e)).in_file(&file))
		});

		if let Err(e) = result {
			warn!("skipping mappings file {file:?}: {e}");
			errors.push(e);
		}
	}

	mappings.mark_clean();
	DirectoryLoad { mappings, errors }
}

pub fn read(path: impl AsRef<Path>) -> Result<DirectoryLoad> {
	let path = path.as_ref();
	if !path.is_dir() {
		bail!("mappings directory {path:?} doesn't exist");
	}

	let files = files_with_extension(path, MAPPING_EXTENSION)?;
	Ok(read_each(files, |file| crate::enigma_file::read_file(file)))
}

/// Gives the path of the file a top level class is saved in.
pub(crate) fn class_file(path: &Path, class: &ClassMapping, extension: &str) -> Result<PathBuf> {
	let file_name = class.save_name();
	if file_name.contains('.') {
		bail!("class name {file_name:?} contains '.'");
	}
	let file_name = Path::new(file_name);
	if file_name.is_absolute() {
		bail!("path relative to target write path {path:?} is absolute: {file_name:?}");
	}

	let mut target = path.join(file_name);
	target.set_extension(extension);
	Ok(target)
}

/// Writes all selected classes with `write_one`, and removes all the files of classes that don't exist anymore.
///
/// The `progress` gets the number of classes written so far, the number of classes to write and the name of the
/// current class.
pub(crate) fn write_each(
	mappings: &Mappings,
	path: &Path,
	extension: &str,
	only_dirty: bool,
	mut progress: impl FnMut(usize, usize, &str),
	write_one: impl Fn(&ClassMapping, &ClassNames, &mut File) -> Result<()>,
) -> Result<()> {
	std::fs::create_dir_all(path)
		.with_context(|| anyhow!("failed to create mappings directory {path:?}"))?;

	let names = ClassNames::new(mappings);

	let mut expected = IndexSet::new();
	let mut to_write = Vec::new();
	for class in mappings.classes() {
		let target = class_file(path, class, extension)?;
		if !only_dirty || class.is_dirty() || !target.exists() {
			to_write.push((class, target.clone()));
		}
		expected.insert(target);
	}

	let total = to_write.len();
	for (done, (class, target)) in to_write.into_iter().enumerate() {
		progress(done, total, class.save_name());

		if let Some(parent) = target.parent() {
			std::fs::create_dir_all(parent)
				.with_context(|| anyhow!("failed to create parent directories for mapping file {target:?}"))?;
		}

		let mut file = File::create(&target)
			.with_context(|| anyhow!("failed to create mappings file {target:?}"))?;
		write_one(class, &names, &mut file)
			.with_context(|| anyhow!("failed to write mappings for class {:?} to {target:?}", class.obf_full_name()))?;
	}

	for file in files_with_extension(path, extension)? {
		if !expected.contains(&file) {
			debug!("deleting stale mappings file {file:?}");
			std::fs::remove_file(&file)
				.with_context(|| anyhow!("failed to delete stale mappings file {file:?}"))?;
		}
	}

	Ok(())
}

/// Writes all classes.
pub fn write(mappings: &Mappings, path: impl AsRef<Path>, progress: impl FnMut(usize, usize, &str)) -> Result<()> {
	let path = path.as_ref();
	write_each(mappings, path, MAPPING_EXTENSION, false, progress, |class, names, file| {
		crate::enigma_file::write_class(class, names, file)
	})
		.with_context(|| anyhow!("failed to write mappings to directory {path:?}"))
}

/// Writes only the classes that changed since they were read, see [`Mappings::mark_clean`].
///
/// Classes whose file is missing are written too.
pub fn write_changes(mappings: &Mappings, path: impl AsRef<Path>, progress: impl FnMut(usize, usize, &str)) -> Result<()> {
	let path = path.as_ref();
	write_each(mappings, path, MAPPING_EXTENSION, true, progress, |class, names, file| {
		crate::enigma_file::write_class(class, names, file)
	})
		.with_context(|| anyhow!("failed to write changed mappings to directory {path:?}"))
}
