//! Test data builders for creating test objects

use datavis_math::{Definition, Point, Series};

/// Builder for creating test Series
pub struct SeriesBuilder {
    name: String,
    points: Vec<Point>,
    domain_bound: Option<f64>,
}

impl SeriesBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            points: Vec::new(),
            domain_bound: None,
        }
    }

    pub fn point(mut self, x: f64, y: f64) -> Self {
        self.points.push(Point::new(x, y));
        self
    }

    /// Samples at `x = 0, 1, 2, ...` with the given values
    pub fn values(mut self, values: &[f64]) -> Self {
        let start = self.points.len();
        for (i, y) in values.iter().enumerate() {
            self.points.push(Point::new((start + i) as f64, *y));
        }
        self
    }

    pub fn domain_bound(mut self, bound: f64) -> Self {
        self.domain_bound = Some(bound);
        self
    }

    pub fn build(self) -> Series {
        let mut series = Series::new(self.name);
        series.set_value_domain_bound(self.domain_bound);
        for point in self.points {
            series.push_back(point);
        }
        series
    }
}

/// Builder for creating test Definitions
pub struct DefinitionBuilder {
    name: String,
    linked_series: String,
    global_vars: String,
    expression: String,
}

impl DefinitionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            linked_series: "x".to_string(),
            global_vars: String::new(),
            expression: "value".to_string(),
        }
    }

    pub fn linked(mut self, linked_series: &str) -> Self {
        self.linked_series = linked_series.to_string();
        self
    }

    pub fn globals(mut self, global_vars: &str) -> Self {
        self.global_vars = global_vars.to_string();
        self
    }

    pub fn expression(mut self, expression: &str) -> Self {
        self.expression = expression.to_string();
        self
    }

    pub fn build(self) -> Definition {
        Definition::new(
            self.name,
            self.linked_series,
            self.global_vars,
            self.expression,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_builder() {
        let series = SeriesBuilder::new("test")
            .values(&[1.0, 2.0])
            .point(5.0, 3.0)
            .build();

        assert_eq!(series.name(), "test");
        assert_eq!(series.len(), 3);
        assert_eq!(series.back(), Some(Point::new(5.0, 3.0)));
    }

    #[test]
    fn test_definition_builder() {
        let def = DefinitionBuilder::new("f").linked("speed").build();
        assert_eq!(def.linked_series(), "speed");
        assert_eq!(def.expression(), "value");
    }
}
