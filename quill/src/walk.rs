//! A deterministic walk over the mapping tree, shared by all the writers.
//!
//! A writer implements [`MappingsEmitter`] for its own syntax, [`walk`] does the traversal:
//! classes sorted by the length of their obfuscated name, then by the name itself, and members sorted by
//! obfuscated name and descriptor. Inside a class, the inner classes come first, then the fields, then the
//! methods, each method followed by its arguments.

use indexmap::IndexMap;
use duke::{MethodDescriptor, TypeDescriptor};
use crate::tree::{ArgumentMapping, ClassMapping, FieldMapping, Mappings, MethodMapping};

/// The syntax of one format.
pub trait MappingsEmitter {
	type Error;

	fn emit_class(&mut self, class: &ClassContext) -> Result<(), Self::Error>;

	/// Called after all the inner classes and members of `class` were emitted.
	fn leave_class(&mut self, _class: &ClassContext) -> Result<(), Self::Error> {
		Ok(())
	}

	fn emit_field(&mut self, class: &ClassContext, field: &FieldMapping) -> Result<(), Self::Error>;

	fn emit_method(&mut self, class: &ClassContext, method: &MethodMapping) -> Result<(), Self::Error>;

	fn emit_argument(&mut self, class: &ClassContext, method: &MethodMapping, argument: &ArgumentMapping) -> Result<(), Self::Error>;
}

/// The full deobfuscated names of all classes of some mappings.
///
/// Unmapped parts of a name are kept obfuscated.
#[derive(Debug, Clone, Default)]
pub struct ClassNames {
	names: IndexMap<String, String>,
}

impl ClassNames {
	pub fn new(mappings: &Mappings) -> ClassNames {
		fn collect(class: &ClassMapping, deobf_full_name: String, names: &mut IndexMap<String, String>) {
			for inner in class.inner_classes() {
				let inner_name = format!("{deobf_full_name}${}", inner.deobf_name().unwrap_or(inner.obf_simple_name()));
				collect(inner, inner_name, names);
			}
			names.insert(class.obf_full_name().to_owned(), deobf_full_name);
		}

		let mut names = IndexMap::new();
		for class in mappings.classes() {
			collect(class, class.save_name().to_owned(), &mut names);
		}
		ClassNames { names }
	}

	/// The deobfuscated name of a class, or `None` if there's no mapping for it.
	pub fn get(&self, obf_name: &str) -> Option<&str> {
		self.names.get(obf_name).map(String::as_str)
	}

	/// The deobfuscated name of a class, or the obfuscated one.
	pub fn map(&self, obf_name: &str) -> String {
		self.get(obf_name).unwrap_or(obf_name).to_owned()
	}

	pub fn map_type(&self, desc: &TypeDescriptor) -> TypeDescriptor {
		desc.remap(|name| self.map(name))
	}

	pub fn map_method_desc(&self, desc: &MethodDescriptor) -> MethodDescriptor {
		desc.remap(|name| self.map(name))
	}
}

/// A class being emitted, with its position in the tree.
pub struct ClassContext<'a> {
	pub mapping: &'a ClassMapping,
	/// The number of outer classes.
	pub depth: usize,
	pub names: &'a ClassNames,
}

impl ClassContext<'_> {
	pub fn obf_full_name(&self) -> &str {
		self.mapping.obf_full_name()
	}

	/// The full deobfuscated name, using the obfuscated names for the unmapped parts.
	pub fn deobf_full_name(&self) -> String {
		self.names.map(self.mapping.obf_full_name())
	}
}

fn sorted_classes<'a>(classes: impl Iterator<Item=&'a ClassMapping>) -> Vec<&'a ClassMapping> {
	let mut classes: Vec<_> = classes.collect();
	classes.sort_by(|a, b| {
		a.obf_full_name().len().cmp(&b.obf_full_name().len())
			.then_with(|| a.obf_full_name().cmp(b.obf_full_name()))
	});
	classes
}

/// Walks all classes of `mappings`.
pub fn walk<E: MappingsEmitter>(mappings: &Mappings, emitter: &mut E) -> Result<(), E::Error> {
	let names = ClassNames::new(mappings);
	for class in sorted_classes(mappings.classes()) {
		walk_class(class, &names, emitter)?;
	}
	Ok(())
}

/// Walks a single top level class, with the class names of all the mappings.
pub fn walk_class<E: MappingsEmitter>(class: &ClassMapping, names: &ClassNames, emitter: &mut E) -> Result<(), E::Error> {
	walk_class_at(class, 0, names, emitter)
}

fn walk_class_at<E: MappingsEmitter>(class: &ClassMapping, depth: usize, names: &ClassNames, emitter: &mut E) -> Result<(), E::Error> {
	let context = ClassContext { mapping: class, depth, names };
	emitter.emit_class(&context)?;

	for inner in sorted_classes(class.inner_classes()) {
		walk_class_at(inner, depth + 1, names, emitter)?;
	}

	let mut fields: Vec<_> = class.fields()
		.map(|field| (format!("{}{}", field.obf_name(), field.obf_desc()), field))
		.collect();
	fields.sort_by(|(a, _), (b, _)| a.cmp(b));
	for (_, field) in fields {
		emitter.emit_field(&context, field)?;
	}

	let mut methods: Vec<_> = class.methods()
		.map(|method| (format!("{}{}", method.obf_name(), method.obf_desc()), method))
		.collect();
	methods.sort_by(|(a, _), (b, _)| a.cmp(b));
	for (_, method) in methods {
		emitter.emit_method(&context, method)?;
		for argument in method.arguments() {
			emitter.emit_argument(&context, method, argument)?;
		}
	}

	emitter.leave_class(&context)
}
