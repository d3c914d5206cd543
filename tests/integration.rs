use coil::{FsIncludeResolver, Value};
use indoc::indoc;

#[test]
fn test_concrete_scalars() {
    let root = coil::parse(r#"this: "that" int: 1 float: 2.0"#).unwrap();
    assert_eq!(root.len(), 3);
    assert_eq!(root.get("int").unwrap(), Value::Integer(1));
    assert_eq!(root.get("float").unwrap(), Value::Float(2.0));
}

#[test]
fn test_concrete_extends_and_delete() {
    let root = coil::parse(r#"a: { x: "x" } b: a { ~x y: 1 }"#).unwrap();
    assert_eq!(root.get("b.y").unwrap(), Value::Integer(1));
    assert!(root.get("b.x").is_err());
    assert_eq!(root.get_value("b").unwrap().as_struct().unwrap().len(), 1);
}

#[test]
fn test_concrete_references_and_links() {
    let root = coil::parse(r#"a:"a" b:a x:{ c:..a d:=..a }"#).unwrap();
    assert_eq!(root.get("b").unwrap(), Value::String("a".to_string()));
    assert_eq!(root.get("x.c").unwrap(), Value::String("a".to_string()));
    assert_eq!(root.get("x.d").unwrap(), Value::String("a".to_string()));
}

#[test]
fn test_concrete_extends_composition() {
    let root = coil::parse(r#"A:{a:1 b:2 c:3} B: A { ~c e:["one" 2 "three"] } D: B {}"#).unwrap();
    assert_eq!(root.get("D.a").unwrap(), Value::Integer(1));
    assert_eq!(root.get("D.b").unwrap(), Value::Integer(2));
    assert!(root.get("D.c").is_err());
    assert_eq!(
        root.get("D.e").unwrap(),
        Value::List(vec![
            Value::String("one".to_string()),
            Value::Integer(2),
            Value::String("three".to_string())
        ])
    );
    assert_eq!(root.get_value("D").unwrap().as_struct().unwrap().len(), 3);
}

#[test]
fn test_insertion_order_preserved() {
    let root = coil::parse("a: 1 b: 2 c: 3").unwrap();
    assert_eq!(root.keys(), vec!["a", "b", "c"]);
}

#[test]
fn test_equality_independent_of_source_form() {
    let a = coil::parse("a:{x:1} b:a{}").unwrap();
    let b = coil::parse("a.x:1 b:a{}").unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_extends_list_multi_donor_forms_agree() {
    let source = indoc! {r#"
        a: { x: 1 y: 2 z: 3 }
        z: { a: 3 b: 2 c: 1 }

        m: { @extends: [..a ..z] a: 1 x: 3 }
        n: { @extends: ..a, ..z a: 1 x: 3 }
        o: a, z { a: 1 x: 3 }
    "#};
    let root = coil::parse(source).unwrap();

    for (path, want) in [
        ("a.x", 1), ("a.y", 2), ("a.z", 3),
        ("z.a", 3), ("z.b", 2), ("z.c", 1),
        ("m.x", 3), ("m.a", 1), ("m.y", 2), ("m.b", 2), ("m.z", 3), ("m.c", 1),
    ] {
        assert_eq!(root.get(path).unwrap(), Value::Integer(want), "{}", path);
    }

    assert_eq!(root.get_value("m").unwrap(), root.get_value("n").unwrap());
    assert_eq!(root.get_value("n").unwrap(), root.get_value("o").unwrap());
    assert_eq!(root.get_value("a").unwrap().as_struct().unwrap().len(), 3);
    assert_eq!(root.get_value("z").unwrap().as_struct().unwrap().len(), 3);
    for k in ["m", "n", "o"] {
        assert_eq!(root.get_value(k).unwrap().as_struct().unwrap().len(), 6);
    }
}

#[test]
fn test_extends_trailing_comma_before_empty_body() {
    let source = indoc! {r#"
        base: {
            b: { x: 1 y: 2 z: 3 }
            c: ..test.d {}
        }
        test: base {
            a: b, {}
            d.a: 1
        }
    "#};
    let root = coil::parse(source).unwrap();
    assert_eq!(root.get("test.a.x").unwrap(), Value::Integer(1));
    assert_eq!(root.get("test.a.y").unwrap(), Value::Integer(2));
    assert_eq!(root.get("test.a.z").unwrap(), Value::Integer(3));
    assert_eq!(root.get_value("test.a").unwrap(), root.get_value("base.b").unwrap());
}

#[test]
fn test_reparenting_consistency() {
    let root = coil::parse("a: { v: 1 }").unwrap();
    let a = root.get_value("a").unwrap();
    root.set("new.a", a).unwrap();
    assert!(root.get("a").is_err());
    let new_a = root.get_value("new.a").unwrap().as_struct().unwrap().path();
    assert_eq!(new_a, "@root.new.a");
    assert_eq!(
        root.get_value("new.a").unwrap().as_struct().unwrap().root(),
        root
    );
}

#[test]
fn test_copy_independence_including_nested_lists() {
    let root = coil::parse("a: { items: [1 2 3] }").unwrap();
    let copy = root.copy();
    copy.with_list_mut("a.items", |list| list.push(Value::Integer(4))).unwrap();
    assert_eq!(copy.list_len("a.items"), Some(4));
    assert_eq!(root.list_len("a.items"), Some(3));
}

#[test]
fn test_cycle_detection_extends_and_interpolation() {
    assert!(coil::parse("a: { @extends: ..a }").is_err());
    let root = coil::parse(r#"a: "${b}" b: "${a}""#).unwrap();
    assert!(root.get("a").is_err());
}

#[test]
fn test_eager_get_is_not_memoized() {
    let root = coil::parse(r#"x: "${y}" y: 123"#).unwrap();
    assert_eq!(root.get("x").unwrap(), Value::String("123".to_string()));
    root.set("y", Value::Integer(456)).unwrap();
    assert_eq!(root.get("x").unwrap(), Value::String("456".to_string()));
}

#[test]
fn test_parse_errors() {
    for s in [
        "struct: {",
        "a: b:",
        ":",
        "[]",
        "a: ~b",
        "@x: 2",
        "x: 12c",
        "z: [{x:2}]",
        "a: [1 2 3]]",
    ] {
        assert!(coil::parse(s).is_err(), "expected parse error for {:?}", s);
    }
}

#[test]
fn test_file_include_merges_and_deletes_afterward() {
    let dir = std::env::temp_dir().join(format!("coil-integration-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("base.coil"), "a: 1 b: 2 c: 3").unwrap();
    std::fs::write(dir.join("main.coil"), "x: { @file: \"base.coil\" ~b }").unwrap();

    let resolver = FsIncludeResolver::new(&dir);
    let root = coil::parse_with_resolver(
        &std::fs::read_to_string(dir.join("main.coil")).unwrap(),
        &resolver,
    )
    .unwrap();
    assert_eq!(root.get("x.a").unwrap(), Value::Integer(1));
    assert!(root.get("x.b").is_err());
    assert_eq!(root.get("x.c").unwrap(), Value::Integer(3));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_package_include_requires_registered_directory() {
    let dir = std::env::temp_dir().join(format!("coil-pkg-{}", std::process::id()));
    let pkg_dir = dir.join("pkg");
    std::fs::create_dir_all(&pkg_dir).unwrap();
    std::fs::write(pkg_dir.join("resource.coil"), "v: 1").unwrap();

    let unregistered = FsIncludeResolver::new(&dir);
    let err = coil::parse_with_resolver("@package: \"demo:resource.coil\"", &unregistered);
    assert!(err.is_err());

    let registered = FsIncludeResolver::new(&dir).with_package_dir("demo", &pkg_dir);
    let root = coil::parse_with_resolver("@package: \"demo:resource.coil\"", &registered).unwrap();
    assert_eq!(root.get("v").unwrap(), Value::Integer(1));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_from_pairs_autovivifies() {
    let root = coil::Struct::from_pairs(vec![
        ("a.b.c.d".to_string(), Value::Integer(123)),
    ])
    .unwrap();
    assert_eq!(root.get("a.b.c.d").unwrap(), Value::Integer(123));
}

#[test]
#[cfg(feature = "serde")]
fn test_struct_dict_matches_serde_json() {
    let root = coil::parse(r#"a: 1 b: "two" c: [1 2 3]"#).unwrap();
    let dict = root.dict().unwrap();
    assert_eq!(
        dict,
        serde_json::json!({"a": 1, "b": "two", "c": [1, 2, 3]})
    );
}

#[test]
#[cfg(feature = "serde")]
fn test_struct_compares_equal_to_plain_mapping() {
    let root = coil::parse(r#"a.b.c: 1 d: "two""#).unwrap();
    assert_eq!(root, serde_json::json!({"a": {"b": {"c": 1}}, "d": "two"}));
    assert_ne!(root, serde_json::json!({"a": {"b": {"c": 2}}, "d": "two"}));
}

#[test]
fn test_clone_round_trip() {
    let root = coil::parse(r#"a: { b: [1 "two" 3] } c: "${a.b}""#).unwrap();
    let cloned = root.clone();
    assert_eq!(root, cloned);
}

#[test]
fn test_display_reparses_to_equal_struct() {
    for source in [
        r#"this: "that" int: 1 float: 2.0"#,
        r#"a: { x: "x" } b: a { ~x y: 1 }"#,
        r#"a: { v: True w: False n: None } list: [1 2.5 "three"]"#,
        "nested: { deep: { deeper: { x: 1 } } }",
    ] {
        let parsed = coil::parse(source).unwrap();
        let printed = parsed.to_string();
        let reparsed = coil::parse(&printed)
            .unwrap_or_else(|e| panic!("printed form {:?} failed to reparse: {}", printed, e));
        assert_eq!(parsed, reparsed, "source: {:?}, printed: {:?}", source, printed);
    }
}
