//! Property tests for definition documents

mod common;

use datavis_math::document::{definitions_from_xml, definitions_to_xml, DefinitionMap};
use datavis_math::{Definition, Series, SeriesMap, TransformSet};
use proptest::prelude::*;

/// XML-safe text without surrounding whitespace (trimmed on parse) or
/// carriage returns (normalized by the parser)
fn trimmed_text() -> impl Strategy<Value = String> {
    "[ -~\n\tµ°αβ]{0,40}".prop_map(|s| s.trim().to_string())
}

fn definition() -> impl Strategy<Value = Definition> {
    (
        "[A-Za-z_][A-Za-z0-9_./ ]{0,15}",
        "[A-Za-z0-9_]{1,12}",
        prop_oneof![Just(String::new()), trimmed_text()],
        trimmed_text(),
    )
        .prop_map(|(name, linked, globals, expression)| {
            Definition::new(name.trim(), linked, globals, expression)
        })
}

proptest! {
    #[test]
    fn prop_definitions_roundtrip(definitions in prop::collection::vec(definition(), 0..8)) {
        let map: DefinitionMap = definitions
            .into_iter()
            .map(|d| (d.name().to_string(), d))
            .collect();

        let xml = definitions_to_xml(&map).unwrap();
        let parsed = definitions_from_xml(&xml).unwrap();

        prop_assert_eq!(parsed, map);
    }
}

#[test]
fn test_document_with_markup_characters() {
    let mut map = DefinitionMap::new();
    let def = Definition::new(
        "a<b> & \"c\"",
        "x",
        "let s = \"<tag>\";",
        "if value < 0.0 && $$y$$ > 1.0 { 0.0 } else { value }",
    );
    map.insert(def.name().to_string(), def);

    let xml = definitions_to_xml(&map).unwrap();
    assert_eq!(definitions_from_xml(&xml).unwrap(), map);
}

#[test]
fn test_file_roundtrip_through_set() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("equations.xml");

    let mut registry = SeriesMap::new();
    registry.insert(Series::from_points("x", [(0.0, 1.0)]));

    let mut set = TransformSet::default();
    set.add(Definition::new("a", "x", "", "value + 1.0"), &mut registry)
        .unwrap();
    set.add(Definition::new("b", "x", "let k = 3.0;", "[value, k]"), &mut registry)
        .unwrap();
    set.save_file(&path).unwrap();

    let mut other_registry = SeriesMap::new();
    other_registry.insert(Series::from_points("x", [(0.0, 1.0)]));
    let mut other = TransformSet::default();
    assert!(other.load_file(&path, &mut other_registry).unwrap().is_empty());

    assert_eq!(other.names(), vec!["a", "b"]);
    assert_eq!(other.definitions(), set.definitions());
    assert_eq!(common::values(&other_registry, "b.1"), vec![3.0]);
}
