//! Core data types for DataVis-Math
//!
//! This module contains the time-series container and the shared registry
//! that derived signals read from and write to.
//!
//! # Main Types
//!
//! - [`Point`] - A single `(x, y)` sample, `x` being the timestamp in seconds
//! - [`Series`] - An x-sorted sequence of points with an optional retention window
//! - [`SeriesMap`] - The shared registry mapping series names to series
//!
//! # Ordering
//!
//! Points within a [`Series`] are kept monotonically non-decreasing in `x`.
//! Lookups such as [`Series::nearest_at_or_before`] rely on this and use a
//! binary search.
//!
//! # Memory Management
//!
//! A series may carry a value-domain bound (the maximum x-range it retains).
//! When set, pushing a point evicts points older than `back.x - bound` from
//! the front, like a ring buffer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// A single sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Timestamp in seconds
    pub x: f64,
    /// Sample value
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// A named, x-sorted time series
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    name: String,
    points: VecDeque<Point>,
    /// Maximum x-range retained (None = unbounded)
    domain_bound: Option<f64>,
}

impl Series {
    /// Create a new empty series
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: VecDeque::new(),
            domain_bound: None,
        }
    }

    /// Create a series from existing points (sorted on insertion)
    pub fn from_points(
        name: impl Into<String>,
        points: impl IntoIterator<Item = impl Into<Point>>,
    ) -> Self {
        let mut series = Self::new(name);
        for point in points {
            series.push_back(point.into());
        }
        series
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point at `index`, if any
    pub fn at(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }

    /// First point
    pub fn front(&self) -> Option<Point> {
        self.points.front().copied()
    }

    /// Last point
    pub fn back(&self) -> Option<Point> {
        self.points.back().copied()
    }

    /// Iterate over the points in ascending x order
    pub fn iter(&self) -> impl Iterator<Item = &Point> + '_ {
        self.points.iter()
    }

    /// Append a point, keeping the series sorted by x.
    ///
    /// Points arriving out of order are inserted after any existing point
    /// with the same x.
    pub fn push_back(&mut self, point: Point) {
        match self.points.back() {
            Some(back) if point.x < back.x => {
                let index = self.points.partition_point(|p| p.x <= point.x);
                self.points.insert(index, point);
            }
            _ => self.points.push_back(point),
        }
        self.enforce_domain_bound();
    }

    /// Remove all points (the domain bound is kept)
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Index of the point with the greatest `x <= x`, if any
    pub fn nearest_at_or_before(&self, x: f64) -> Option<usize> {
        match self.points.partition_point(|p| p.x <= x) {
            0 => None,
            index => Some(index - 1),
        }
    }

    /// Index of the first point with `x > x` (== len when there is none)
    pub fn first_index_after(&self, x: f64) -> usize {
        self.points.partition_point(|p| p.x <= x)
    }

    /// Value of the point with the greatest `x <= x`, or NaN if there is none
    pub fn value_at_or_before(&self, x: f64) -> f64 {
        self.nearest_at_or_before(x)
            .and_then(|index| self.at(index))
            .map_or(f64::NAN, |p| p.y)
    }

    /// Set the maximum x-range this series retains
    pub fn set_value_domain_bound(&mut self, bound: Option<f64>) {
        self.domain_bound = bound;
        self.enforce_domain_bound();
    }

    pub fn value_domain_bound(&self) -> Option<f64> {
        self.domain_bound
    }

    /// Get the time range of the data
    pub fn x_range(&self) -> Option<(f64, f64)> {
        Some((self.front()?.x, self.back()?.x))
    }

    /// Get points as plot points `[x, y]`
    pub fn as_plot_points(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| [p.x, p.y]).collect()
    }

    fn enforce_domain_bound(&mut self) {
        let (Some(bound), Some(back)) = (self.domain_bound, self.points.back().copied()) else {
            return;
        };
        let oldest = back.x - bound;
        while self.points.front().is_some_and(|p| p.x < oldest) {
            self.points.pop_front();
        }
    }
}

/// Shared registry of series, addressed by name
#[derive(Debug, Clone, Default)]
pub struct SeriesMap {
    series: HashMap<String, Series>,
}

impl SeriesMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a series by name
    pub fn find(&self, name: &str) -> Option<&Series> {
        self.series.get(name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Series> {
        self.series.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    /// Create a fresh, empty series, replacing any existing one with that name
    pub fn create(&mut self, name: &str) -> &mut Series {
        let series = self
            .series
            .entry(name.to_string())
            .or_insert_with(|| Series::new(name));
        *series = Series::new(name);
        series
    }

    /// Get an existing series or create an empty one.
    ///
    /// Returns the series and whether it was created by this call.
    pub fn get_or_create(&mut self, name: &str) -> (&mut Series, bool) {
        let created = !self.series.contains_key(name);
        let series = self
            .series
            .entry(name.to_string())
            .or_insert_with(|| Series::new(name));
        (series, created)
    }

    /// Insert a series under its own name, returning the one it replaced
    pub fn insert(&mut self, series: Series) -> Option<Series> {
        self.series.insert(series.name().to_string(), series)
    }

    /// Remove a series, returning it if it existed
    pub fn remove(&mut self, name: &str) -> Option<Series> {
        self.series.remove(name)
    }

    /// Series names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.series.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Series)> + '_ {
        self.series.iter().map(|(name, series)| (name.as_str(), series))
    }

    /// Build a registry from a `name -> [[x, y], ...]` snapshot
    pub fn from_snapshot(snapshot: SeriesSnapshot) -> Self {
        let mut map = Self::new();
        for (name, points) in snapshot {
            map.insert(Series::from_points(name, points));
        }
        map
    }

    /// Snapshot of the selected series (all series when `names` is None)
    pub fn snapshot(&self, names: Option<&[String]>) -> SeriesSnapshot {
        self.series
            .iter()
            .filter(|(name, _)| names.map_or(true, |wanted| wanted.contains(name)))
            .map(|(name, series)| (name.clone(), series.as_plot_points()))
            .collect()
    }
}

/// Serializable `name -> [[x, y], ...]` view of a registry
pub type SeriesSnapshot = BTreeMap<String, Vec<[f64; 2]>>;
