//! Name-keyed collection of compiled transforms.

use crate::config::ScriptLimits;
use crate::document::{self, DefinitionMap};
use crate::error::{Result, ResultExt, TransformError};
use crate::transform::compiled::CompiledTransform;
use crate::transform::definition::Definition;
use crate::types::SeriesMap;
use std::collections::BTreeMap;
use std::path::Path;

/// Every derived signal of a session, evaluated against one registry
#[derive(Debug, Default)]
pub struct TransformSet {
    transforms: BTreeMap<String, CompiledTransform>,
    limits: ScriptLimits,
}

impl TransformSet {
    pub fn new(limits: ScriptLimits) -> Self {
        Self {
            transforms: BTreeMap::new(),
            limits,
        }
    }

    /// Compile `definition`, register its outputs and run the first pass.
    ///
    /// A transform with the same name is removed first. If compilation or
    /// the first pass fails nothing is added and the new outputs are gone.
    pub fn add(
        &mut self,
        definition: Definition,
        registry: &mut SeriesMap,
    ) -> Result<&CompiledTransform> {
        let name = definition.name().to_string();
        let mut transform = CompiledTransform::compile_with_limits(definition, &self.limits)
            .with_context(|| format!("Failed to compile '{}'", name))?;

        if let Some(previous) = self.transforms.remove(&name) {
            tracing::debug!("Replacing '{}'", name);
            previous.remove(registry);
        }

        transform.register(registry);
        transform
            .update(registry)
            .with_context(|| format!("Failed to evaluate '{}'", name))?;

        tracing::info!(
            "Added '{}' with outputs {:?}",
            name,
            transform.output_names()
        );
        Ok(self.transforms.entry(name).or_insert(transform))
    }

    /// Remove a transform and its outputs
    pub fn remove(&mut self, name: &str, registry: &mut SeriesMap) -> bool {
        match self.transforms.remove(name) {
            Some(transform) => {
                transform.remove(registry);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&CompiledTransform> {
        self.transforms.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Transform names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.transforms.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledTransform> + '_ {
        self.transforms.values()
    }

    /// Incrementally update every transform.
    ///
    /// Failing transforms are reported and stay in the set.
    pub fn update_all(&mut self, registry: &mut SeriesMap) -> Vec<(String, TransformError)> {
        self.transforms
            .iter_mut()
            .filter_map(|(name, transform)| {
                transform
                    .update(registry)
                    .err()
                    .map(|e| (name.clone(), e))
            })
            .collect()
    }

    /// Rebuild every transform from scratch
    pub fn rebuild_all(&mut self, registry: &mut SeriesMap) -> Vec<(String, TransformError)> {
        self.transforms
            .iter_mut()
            .filter_map(|(name, transform)| {
                transform
                    .rebuild(registry)
                    .err()
                    .map(|e| (name.clone(), e))
            })
            .collect()
    }

    /// Definitions of every transform
    pub fn definitions(&self) -> DefinitionMap {
        self.transforms
            .iter()
            .map(|(name, transform)| (name.clone(), transform.definition().clone()))
            .collect()
    }

    /// Add every definition in an XML document.
    ///
    /// A malformed document adds nothing. Otherwise each definition is added
    /// on its own and the ones that failed are returned.
    pub fn load_document(
        &mut self,
        text: &str,
        registry: &mut SeriesMap,
    ) -> Result<Vec<(String, TransformError)>> {
        let definitions = document::definitions_from_xml(text)?;
        Ok(self.add_all(definitions, registry))
    }

    /// Add every definition in an XML file
    pub fn load_file(
        &mut self,
        path: impl AsRef<Path>,
        registry: &mut SeriesMap,
    ) -> Result<Vec<(String, TransformError)>> {
        let definitions = document::load_definitions(path)?;
        Ok(self.add_all(definitions, registry))
    }

    /// Serialize every definition to XML
    pub fn to_document(&self) -> Result<String> {
        document::definitions_to_xml(&self.definitions())
    }

    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<()> {
        document::save_definitions(path, &self.definitions())
    }

    fn add_all(
        &mut self,
        definitions: DefinitionMap,
        registry: &mut SeriesMap,
    ) -> Vec<(String, TransformError)> {
        definitions
            .into_values()
            .filter_map(|definition| {
                let name = definition.name().to_string();
                self.add(definition, registry).err().map(|e| (name, e))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Point, Series};

    fn registry() -> SeriesMap {
        let mut registry = SeriesMap::new();
        registry.insert(Series::from_points("x", [(0.0, 1.0), (1.0, 2.0)]));
        registry.insert(Series::from_points("y", [(0.0, 10.0)]));
        registry
    }

    #[test]
    fn test_add_runs_first_pass() {
        let mut registry = registry();
        let mut set = TransformSet::default();

        let transform = set
            .add(Definition::new("sum", "x", "", "value + $$y$$"), &mut registry)
            .unwrap();
        assert_eq!(transform.high_water_mark(), 1.0);
        assert_eq!(registry.find("sum").map(Series::len), Some(2));
    }

    #[test]
    fn test_failed_add_leaves_nothing() {
        let mut registry = registry();
        let mut set = TransformSet::default();

        let err = set
            .add(Definition::new("bad", "x", "", "$$ghost$$"), &mut registry)
            .unwrap_err();
        assert!(matches!(err.root(), TransformError::MissingChannel(_)));
        assert!(!set.contains("bad"));
        assert!(!registry.contains("bad"));

        assert!(set
            .add(Definition::new("bad", "x", "", "value +"), &mut registry)
            .is_err());
        assert!(set.is_empty());
    }

    #[test]
    fn test_replace_same_name() {
        let mut registry = registry();
        let mut set = TransformSet::default();
        set.add(Definition::new("f", "x", "", "[value, value]"), &mut registry)
            .unwrap();
        set.add(Definition::new("f", "x", "", "value"), &mut registry)
            .unwrap();

        assert_eq!(set.len(), 1);
        assert!(!registry.contains("f.0"));
        assert!(registry.contains("f"));
    }

    #[test]
    fn test_update_all_reports_failures() {
        let mut registry = registry();
        let mut set = TransformSet::default();
        set.add(Definition::new("a", "x", "", "value"), &mut registry)
            .unwrap();
        set.add(Definition::new("b", "x", "", "$$y$$"), &mut registry)
            .unwrap();

        registry.remove("y");
        registry.find_mut("x").unwrap().push_back(Point::new(2.0, 3.0));

        let failures = set.update_all(&mut registry);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "b");
        assert_eq!(registry.find("a").map(Series::len), Some(3));
        assert!(set.contains("b"));
    }

    #[test]
    fn test_document_roundtrip_through_set() {
        let mut registry = registry();
        let mut set = TransformSet::default();
        set.add(Definition::new("a", "x", "let k = 2.0;", "value * k"), &mut registry)
            .unwrap();
        let xml = set.to_document().unwrap();

        let mut other_registry = self::registry();
        let mut other = TransformSet::default();
        let failures = other.load_document(&xml, &mut other_registry).unwrap();
        assert!(failures.is_empty());
        assert_eq!(other.definitions(), set.definitions());

        let values: Vec<f64> = other_registry.find("a").unwrap().iter().map(|p| p.y).collect();
        assert_eq!(values, vec![2.0, 4.0]);
    }

    #[test]
    fn test_remove() {
        let mut registry = registry();
        let mut set = TransformSet::default();
        set.add(Definition::new("a", "x", "", "value"), &mut registry)
            .unwrap();

        assert!(set.remove("a", &mut registry));
        assert!(!set.remove("a", &mut registry));
        assert!(!registry.contains("a"));
    }
}
