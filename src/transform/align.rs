//! Nearest-at-or-before alignment of auxiliary channels.

use crate::error::{Result, TransformError};
use crate::types::{Series, SeriesMap};

/// Auxiliary series resolved for one evaluation pass.
///
/// Series are looked up by name when the aligner is built and never cached
/// beyond the pass.
#[derive(Debug)]
pub struct SampleAligner<'a> {
    channels: Vec<&'a Series>,
    values: Vec<f64>,
}

impl<'a> SampleAligner<'a> {
    /// Resolve every channel in `names`, failing on the first absent one
    pub fn resolve(registry: &'a SeriesMap, names: &[String]) -> Result<Self> {
        let channels = names
            .iter()
            .map(|name| {
                registry
                    .find(name)
                    .ok_or_else(|| TransformError::MissingChannel(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            values: vec![f64::NAN; channels.len()],
            channels,
        })
    }

    /// Values of every channel at or before `x` (NaN where a channel has no
    /// sample that early)
    pub fn align(&mut self, x: f64) -> &[f64] {
        for (slot, series) in self.values.iter_mut().zip(&self.channels) {
            *slot = series.value_at_or_before(x);
        }
        &self.values
    }
}
