//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use datavis_math::SeriesMap;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Values of a series, in x order (empty if the series is absent)
pub fn values(registry: &SeriesMap, name: &str) -> Vec<f64> {
    registry
        .find(name)
        .map(|s| s.iter().map(|p| p.y).collect())
        .unwrap_or_default()
}

/// Timestamps of a series, in order (empty if the series is absent)
pub fn timestamps(registry: &SeriesMap, name: &str) -> Vec<f64> {
    registry
        .find(name)
        .map(|s| s.iter().map(|p| p.x).collect())
        .unwrap_or_default()
}
