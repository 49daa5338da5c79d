//! Test to verify test infrastructure works correctly

mod common;

use common::builders::{DefinitionBuilder, SeriesBuilder};
use datavis_math::SeriesMap;

#[test]
fn test_infrastructure_setup() {
    // Test that builders work
    let mut registry = SeriesMap::new();
    registry.insert(SeriesBuilder::new("x").values(&[1.0, 2.0, 3.0]).build());

    assert_eq!(common::values(&registry, "x"), vec![1.0, 2.0, 3.0]);
    assert_eq!(common::timestamps(&registry, "x"), vec![0.0, 1.0, 2.0]);
    assert!(common::values(&registry, "missing").is_empty());

    let def = DefinitionBuilder::new("double")
        .expression("value * 2.0")
        .build();
    assert_eq!(def.name(), "double");
    assert_eq!(def.linked_series(), "x");
}

#[test]
fn test_float_comparison() {
    common::assert_float_eq(1.0, 1.0000001, 0.001);
}

#[test]
#[should_panic]
fn test_float_comparison_fails() {
    common::assert_float_eq(1.0, 2.0, 0.001);
}
