use anyhow::Result;
use pretty_assertions::assert_eq;
use duke::{ArgumentEntry, ClassEntry, ConstructorEntry, Entry, FieldEntry, MethodEntry};
use quill::tree::{AccessModifier, Mappings};
use decipher::{ClassHierarchy, Direction, NoHierarchy, Translator};

fn mappings() -> Result<Mappings> {
	let a = ClassEntry::new("a")?;
	let mut mappings = Mappings::new();
	mappings.set_class_deobf_name(&a, Some("org/example/Foo".to_owned()))?;
	mappings.set_class_deobf_name(&ClassEntry::new("a$b$c")?, Some("Deep".to_owned()))?;
	mappings.set_field_deobf_name(&FieldEntry::new(a.clone(), "b", "I".parse()?), Some("count".to_owned()))?;
	mappings.set_method_deobf_name(&MethodEntry::new(a.clone(), "c", "()V".parse()?)?, Some("run".to_owned()))?;
	mappings.set_method_deobf_name(&MethodEntry::new(a.clone(), "d", "(La;)La$b$c;".parse()?)?, Some("copy".to_owned()))?;
	mappings.set_field_modifier(&FieldEntry::new(a, "e", "J".parse()?), AccessModifier::Public);
	Ok(mappings)
}

#[test]
fn translating_there_and_back() -> Result<()> {
	let mappings = mappings()?;
	let deobf = Translator::new(Direction::Deobfuscating, &mappings, NoHierarchy::new());
	let obf = Translator::new(Direction::Obfuscating, &mappings, NoHierarchy::new());

	let a = ClassEntry::new("a")?;
	let entries = [
		Entry::Class(a.clone()),
		Entry::Class(ClassEntry::new("a$b$c")?),
		Entry::Field(FieldEntry::new(a.clone(), "b", "I".parse()?)),
		Entry::Method(MethodEntry::new(a.clone(), "c", "()V".parse()?)?),
		Entry::Method(MethodEntry::new(a.clone(), "d", "(La;)La$b$c;".parse()?)?),
		Entry::Constructor(ConstructorEntry::new(a.clone(), Some("(La;)V".parse()?))),
		// not in the mappings at all
		Entry::Field(FieldEntry::new(a, "z", "La$b;".parse()?)),
	];

	for entry in entries {
		let translated = deobf.translate_entry(&entry);
		assert_eq!(obf.translate_entry(&translated), entry, "{entry} -> {translated}");
	}

	let copy = deobf.translate_entry(&Entry::Method(MethodEntry::new(ClassEntry::new("a")?, "d", "(La;)La$b$c;".parse()?)?));
	assert_eq!(copy.to_string(), "org/example/Foo.copy(Lorg/example/Foo;)Lorg/example/Foo$b$Deep;");
	Ok(())
}

#[test]
fn names_and_modifiers() -> Result<()> {
	let mappings = mappings()?;
	let deobf = Translator::new(Direction::Deobfuscating, &mappings, NoHierarchy::new());
	let obf = Translator::new(Direction::Obfuscating, &mappings, NoHierarchy::new());

	let a = ClassEntry::new("a")?;
	assert_eq!(deobf.translate(&Entry::Class(a.clone())), Some("org/example/Foo".to_owned()));
	assert_eq!(deobf.translate(&Entry::Field(FieldEntry::new(a.clone(), "b", "I".parse()?))), Some("count".to_owned()));
	assert_eq!(obf.translate(&Entry::Field(FieldEntry::new(ClassEntry::new("org/example/Foo")?, "count", "I".parse()?))), Some("b".to_owned()));

	// a mapping that only carries a modifier gives no name
	let e = Entry::Field(FieldEntry::new(a.clone(), "e", "J".parse()?));
	assert!(!deobf.has_mapping(&e));
	assert_eq!(deobf.modifier(&e), AccessModifier::Public);
	assert_eq!(deobf.modifier(&Entry::Class(a)), AccessModifier::Unchanged);
	Ok(())
}

fn hierarchy() -> Result<ClassHierarchy> {
	let a = ClassEntry::new("a")?;
	let b = ClassEntry::new("b")?;
	let mut hierarchy = ClassHierarchy::new();
	hierarchy.add_class(a.clone(), None, []);
	hierarchy.add_class(b.clone(), Some(a.clone()), []);
	hierarchy.add_field(FieldEntry::new(a.clone(), "f", "I".parse()?));
	hierarchy.add_method(MethodEntry::new(a.clone(), "m", "()V".parse()?)?);
	hierarchy.add_method(MethodEntry::new(a, "n", "(I)V".parse()?)?);
	hierarchy.add_method(MethodEntry::new(b, "n", "(I)V".parse()?)?);
	Ok(hierarchy)
}

#[test]
fn inherited_members() -> Result<()> {
	let a = ClassEntry::new("a")?;
	let b = ClassEntry::new("b")?;
	let hierarchy = hierarchy()?;

	let mut mappings = Mappings::new();
	mappings.set_field_deobf_name(&FieldEntry::new(a.clone(), "f", "I".parse()?), Some("value".to_owned()))?;
	mappings.set_method_deobf_name(&MethodEntry::new(a, "m", "()V".parse()?)?, Some("run".to_owned()))?;

	let deobf = Translator::new(Direction::Deobfuscating, &mappings, &hierarchy);
	let field = FieldEntry::new(b.clone(), "f", "I".parse()?);
	let method = MethodEntry::new(b.clone(), "m", "()V".parse()?)?;
	assert_eq!(deobf.translate(&Entry::Field(field.clone())), Some("value".to_owned()));
	assert_eq!(deobf.translate_method(&method), MethodEntry::new(b.clone(), "run", "()V".parse()?)?);

	let obf = Translator::new(Direction::Obfuscating, &mappings, &hierarchy);
	assert_eq!(obf.translate_field(&FieldEntry::new(b.clone(), "value", "I".parse()?)), field);
	assert_eq!(obf.translate_method(&MethodEntry::new(b.clone(), "run", "()V".parse()?)?), method);

	// without knowing the hierarchy, nothing is inherited
	let flat = Translator::new(Direction::Deobfuscating, &mappings, NoHierarchy::new());
	assert_eq!(flat.translate(&Entry::Method(MethodEntry::new(b, "m", "()V".parse()?)?)), None);
	Ok(())
}

#[test]
fn inherited_argument_names() -> Result<()> {
	let a = ClassEntry::new("a")?;
	let b = ClassEntry::new("b")?;
	let hierarchy = hierarchy()?;

	let mut mappings = Mappings::new();
	let base = MethodEntry::new(a, "n", "(I)V".parse()?)?;
	mappings.set_argument_name(&ArgumentEntry::new(base, 1, "p1"), Some("amount".to_owned()))?;

	let overriding = ArgumentEntry::new(MethodEntry::new(b, "n", "(I)V".parse()?)?, 1, "p1");
	let deobf = Translator::new(Direction::Deobfuscating, &mappings, &hierarchy);
	assert_eq!(deobf.translate(&Entry::Argument(overriding.clone())), Some("amount".to_owned()));
	assert_eq!(deobf.translate_argument(&overriding).name, "amount");

	// arguments only have names in the deobfuscated namespace
	let obf = Translator::new(Direction::Obfuscating, &mappings, &hierarchy);
	assert_eq!(obf.translate(&Entry::Argument(overriding.clone())), None);
	assert_eq!(obf.translate_argument(&overriding).name, "p1");
	Ok(())
}
