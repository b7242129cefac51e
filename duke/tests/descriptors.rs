use anyhow::Result;
use pretty_assertions::assert_eq;
use duke::descriptor::{parse_field_type, parse_method_descriptor, parse_type, TypeDescriptor};
use duke::MethodDescriptor;

#[test]
fn valid_field_descriptors() -> Result<()> {
	let valid_field_descriptors = [
		"B",
		"C",
		"D",
		"F",
		"I",
		"J",
		"Ljava/lang/Object;",
		"Lorg/example/MyClassName;",
		"Lorg/example/Outer$Inner;",
		"S",
		"Z",
		"[[[D",
		"TT;",
		"Ljava/util/List<+Ljava/lang/Number;>;",
	];

	for i in valid_field_descriptors {
		let desc = parse_field_type(i)?;
		assert_eq!(desc.to_string(), i, "{i:?} must be written back unchanged");
	}

	Ok(())
}

#[test]
fn invalid_field_descriptors() -> Result<()> {
	let invalid_field_descriptors = [
		"",
		"V",
		"(",
		")",
		"()",
		"[V",
		"L;",
		"()V",
		"foo",
		"(D)I",
		"L;DV",
		"Ljava/lang/Object",
		"T;",
		"II",
	];

	for i in invalid_field_descriptors {
		assert!(parse_field_type(i).is_err(), "{:?} is an invalid field desc", i);
	}

	Ok(())
}

#[test]
fn valid_method_descriptors() -> Result<()> {
	let valid_method_descriptors = [
		"()V",
		"(D)I",
		"(Ljava/lang/Object;)Ljava/lang/Object;",
		"([[IJLa;)[La;",
		"(TT;Ljava/util/Map<TK;TV;>;)TT;",
	];

	for i in valid_method_descriptors {
		let desc: MethodDescriptor = i.parse()?;
		assert_eq!(desc.to_string(), i, "{i:?} must be written back unchanged");
	}

	Ok(())
}

#[test]
fn invalid_method_descriptors() -> Result<()> {
	let invalid_method_descriptors = [
		"B",
		"Ljava/lang/Object;",
		"[[[D",
		"",
		"V",
		"(",
		")",
		"()",
		"[V",
		"L;",
		"foo",
		"L;DV",
		"(L;)V",
		"(V)V",
		"(I)V;",
	];

	for i in invalid_method_descriptors {
		assert!(parse_method_descriptor(i).is_err(), "{:?} is an invalid method desc", i);
	}

	Ok(())
}

#[test]
fn return_types() -> Result<()> {
	for i in ["B", "V", "Z", "[[[D", "Ljava/lang/Object;"] {
		let (desc, rest) = parse_type(i)?;
		assert_eq!(rest, "");
		assert_eq!(desc.to_string(), i);
	}

	assert!("V".parse::<TypeDescriptor>()?.is_void());

	Ok(())
}

#[test]
fn remap_keeps_structure() -> Result<()> {
	let desc: MethodDescriptor = "([[La;ILb<TT;>;)[Lc;".parse()?;

	let remapped = desc.remap(|name| match name {
		"a" => "org/example/Alpha".to_owned(),
		"c" => "org/example/Gamma".to_owned(),
		other => other.to_owned(),
	});

	assert_eq!(remapped.to_string(), "([[Lorg/example/Alpha;ILb<TT;>;)[Lorg/example/Gamma;");
	assert_eq!(remapped.arguments[0].array_dimension(), 2);
	assert_eq!(remapped.arguments[0].class_name(), Some("org/example/Alpha"));

	Ok(())
}
