use anyhow::Result;
use pretty_assertions::assert_eq;
use duke::{ArgumentEntry, ClassEntry, Entry, FieldEntry, MethodEntry};
use quill::tree::{MethodMapping, Mappings};
use decipher::{ClassHierarchy, Direction, NoHierarchy, Renamer, Translator};

/// `a` with the subclasses `b` and `c`, all three declaring `m(II)V`. `c` also declares `n(II)V`, and `a` has a field `x`.
fn hierarchy() -> Result<ClassHierarchy> {
	let a = ClassEntry::new("a")?;
	let b = ClassEntry::new("b")?;
	let c = ClassEntry::new("c")?;
	let mut hierarchy = ClassHierarchy::new();
	hierarchy.add_class(a.clone(), None, []);
	hierarchy.add_class(b.clone(), Some(a.clone()), []);
	hierarchy.add_class(c.clone(), Some(a.clone()), []);
	for class in [&a, &b, &c] {
		hierarchy.add_method(MethodEntry::new(class.clone(), "m", "(II)V".parse()?)?);
	}
	hierarchy.add_method(MethodEntry::new(c, "n", "(II)V".parse()?)?);
	hierarchy.add_field(FieldEntry::new(a, "x", "I".parse()?));
	Ok(hierarchy)
}

fn method_name<'m>(mappings: &'m Mappings, class: &str, name: &str) -> Result<Option<&'m str>> {
	let method = MethodEntry::new(ClassEntry::new(class)?, name, "(II)V".parse()?)?;
	Ok(mappings.method_mapping(&method).and_then(MethodMapping::deobf_name))
}

#[test]
fn field_collisions() -> Result<()> {
	let hierarchy = hierarchy()?;
	let a = ClassEntry::new("a")?;
	let b = ClassEntry::new("b")?;

	let mut mappings = Mappings::new();
	let mut renamer = Renamer::new(&mut mappings, &hierarchy);

	let x = FieldEntry::new(a.clone(), "x", "I".parse()?);
	let y = FieldEntry::new(a, "y", "I".parse()?);
	renamer.rename(&Entry::Field(x.clone()), "value")?;

	let error = renamer.rename(&Entry::Field(y.clone()), "value").unwrap_err();
	assert_eq!(error.to_string(), "illegal name \"value\": there is already a field with that name in a");
	assert!(renamer.mappings().field_mapping(&y).is_none());

	// the field of the superclass is visible in the subclass as well
	let z = FieldEntry::new(b, "z", "I".parse()?);
	assert!(renamer.rename(&Entry::Field(z.clone()), "value").is_err());
	// and its obfuscated name is still taken while it's in the index
	assert!(renamer.rename(&Entry::Field(z.clone()), "x").is_err());
	renamer.rename(&Entry::Field(z), "other")?;

	// giving a field its own name back is fine
	renamer.rename(&Entry::Field(x.clone()), "x")?;
	assert_eq!(renamer.mappings().field_mapping(&x).and_then(|x| x.deobf_name()), Some("x"));
	assert!(renamer.mappings().is_consistent());
	Ok(())
}

#[test]
fn override_groups_are_renamed_together() -> Result<()> {
	let hierarchy = hierarchy()?;

	let mut mappings = Mappings::new();
	let mut renamer = Renamer::new(&mut mappings, &hierarchy);

	// `c` already has an `n`, so none of the group may be called that
	let a_m = MethodEntry::new(ClassEntry::new("a")?, "m", "(II)V".parse()?)?;
	let error = renamer.rename(&Entry::Method(a_m), "n").unwrap_err();
	assert_eq!(error.reason, "there is already a method with that name and signature in class c");
	assert!(renamer.mappings().is_empty());

	let b_m = MethodEntry::new(ClassEntry::new("b")?, "m", "(II)V".parse()?)?;
	renamer.rename(&Entry::Method(b_m.clone()), "run")?;
	for class in ["a", "b", "c"] {
		assert_eq!(method_name(renamer.mappings(), class, "m")?, Some("run"), "in class {class}");
	}

	renamer.remove_mapping(&Entry::Method(b_m))?;
	for class in ["a", "b", "c"] {
		assert_eq!(method_name(renamer.mappings(), class, "m")?, None, "in class {class}");
	}
	assert!(renamer.mappings().is_consistent());
	Ok(())
}

#[test]
fn arguments_are_renamed_with_their_group() -> Result<()> {
	let hierarchy = hierarchy()?;

	let mut mappings = Mappings::new();
	let mut renamer = Renamer::new(&mut mappings, &hierarchy);

	let c_m = MethodEntry::new(ClassEntry::new("c")?, "m", "(II)V".parse()?)?;
	renamer.rename(&Entry::Argument(ArgumentEntry::new(c_m.clone(), 1, "p1")), "width")?;

	let a_m = MethodEntry::new(ClassEntry::new("a")?, "m", "(II)V".parse()?)?;
	let first = ArgumentEntry::new(a_m.clone(), 1, "p1");
	assert_eq!(renamer.mappings().argument_mapping(&first).map(|argument| argument.name()), Some("width"));

	let second = ArgumentEntry::new(a_m, 2, "p2");
	let error = renamer.rename(&Entry::Argument(second.clone()), "width").unwrap_err();
	assert_eq!(error.reason, "there is already an argument with that name");
	renamer.rename(&Entry::Argument(second), "height")?;

	let translator = Translator::new(Direction::Deobfuscating, renamer.mappings(), &hierarchy);
	let b_m = MethodEntry::new(ClassEntry::new("b")?, "m", "(II)V".parse()?)?;
	assert_eq!(translator.translate(&Entry::Argument(ArgumentEntry::new(b_m, 2, "p2"))), Some("height".to_owned()));
	Ok(())
}

#[test]
fn marking_as_deobfuscated_is_checked() -> Result<()> {
	let hierarchy = hierarchy()?;

	let mut mappings = Mappings::new();
	let mut renamer = Renamer::new(&mut mappings, &hierarchy);

	// `a$c` is already called `b`, so `a$b` can't keep its name
	renamer.rename(&Entry::Class(ClassEntry::new("a$c")?), "b")?;
	let inner = ClassEntry::new("a$b")?;
	let error = renamer.mark_as_deobfuscated(&Entry::Class(inner.clone())).unwrap_err();
	assert_eq!(error.reason, "there is already a class with that name");
	assert!(renamer.mappings().find_class(&inner).is_none());

	// `b` inherits the field `x` from `a`
	let shadowing = FieldEntry::new(ClassEntry::new("b")?, "x", "I".parse()?);
	let error = renamer.mark_as_deobfuscated(&Entry::Field(shadowing.clone())).unwrap_err();
	assert_eq!(error.reason, "there is already a field with that name in a");
	assert!(renamer.mappings().find_class(&shadowing.owner).is_none());

	let declared = FieldEntry::new(ClassEntry::new("a")?, "x", "I".parse()?);
	renamer.mark_as_deobfuscated(&Entry::Field(declared.clone()))?;
	assert_eq!(renamer.mappings().field_mapping(&declared).and_then(|x| x.deobf_name()), Some("x"));
	assert!(renamer.mappings().is_consistent());
	Ok(())
}

#[test]
fn observer_sees_every_change() -> Result<()> {
	let a = ClassEntry::new("a")?;
	let inner = ClassEntry::new("a$b")?;
	let method = MethodEntry::new(a.clone(), "m", "()V".parse()?)?;

	let mut events: Vec<(Entry, Option<String>, bool)> = Vec::new();
	let mut mappings = Mappings::new();
	{
		let mut renamer = Renamer::new(&mut mappings, NoHierarchy::new())
			.with_observer(|old: &Entry, new_name: Option<&str>, class_moved: bool| {
				events.push((old.clone(), new_name.map(str::to_owned), class_moved));
			});

		renamer.rename(&Entry::Class(a.clone()), "org.example.Foo")?;
		renamer.rename(&Entry::Class(inner.clone()), "Inner")?;
		renamer.rename(&Entry::Method(method.clone()), "run")?;
		// rejected, so no event
		assert!(renamer.rename(&Entry::Method(method.clone()), "class").is_err());
		renamer.remove_mapping(&Entry::Class(a.clone()))?;
	}

	assert_eq!(events, vec![
		(Entry::Class(a.clone()), Some("org/example/Foo".to_owned()), true),
		(Entry::Class(inner.clone()), Some("Inner".to_owned()), false),
		(Entry::Method(method), Some("run".to_owned()), false),
		(Entry::Class(a), None, true),
	]);

	let translator = Translator::new(Direction::Deobfuscating, &mappings, NoHierarchy::new());
	assert_eq!(translator.translate_class(&inner), ClassEntry::new("a$Inner")?);
	Ok(())
}
