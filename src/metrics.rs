//! Per-slice metrics evaluated over the observations a slicer returns.

use ndarray::Array1;

use crate::error::Result;
use crate::slicer::{SliceResult, SpatialSlicer};
use crate::table::ObservationTable;

/// A reduction over the observations of one slice.
///
/// `slice.indices` is never empty when `evaluate` is called.
pub trait Metric {
    fn name(&self) -> &str;

    /// Numeric columns this metric reads.
    fn columns(&self) -> Vec<&str> {
        Vec::new()
    }

    fn evaluate(&self, obs: &ObservationTable, slice: &SliceResult) -> Result<f64>;
}

/// Number of observations in the slice.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountMetric;

impl Metric for CountMetric {
    fn name(&self) -> &str {
        "Count"
    }

    fn evaluate(&self, _obs: &ObservationTable, slice: &SliceResult) -> Result<f64> {
        Ok(slice.indices.len() as f64)
    }
}

/// Mean of a numeric column over the slice.
#[derive(Debug, Clone)]
pub struct MeanMetric {
    column: String,
    name: String,
}

impl MeanMetric {
    pub fn new(column: impl Into<String>) -> Self {
        let column = column.into();
        let name = format!("Mean {column}");
        Self { column, name }
    }
}

impl Metric for MeanMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> Vec<&str> {
        vec![self.column.as_str()]
    }

    fn evaluate(&self, obs: &ObservationTable, slice: &SliceResult) -> Result<f64> {
        let values = obs.float(&self.column)?;
        let total: f64 = slice.indices.iter().map(|&i| values[i]).sum();
        Ok(total / slice.indices.len() as f64)
    }
}

/// Evaluate `metric` on every slice of a set-up slicer.
///
/// Slices with no observations get the slicer's `badval`.
pub fn run_metric(slicer: &SpatialSlicer, obs: &ObservationTable, metric: &dyn Metric) -> Result<Array1<f64>> {
    obs.require_float_columns(&metric.columns())?;
    let badval = slicer.config().badval;
    let mut out = Array1::from_elem(slicer.nslice(), badval);
    for (value, slice) in out.iter_mut().zip(slicer.iter()?) {
        if !slice.indices.is_empty() {
            *value = metric.evaluate(obs, &slice)?;
        }
    }
    log::debug!("metric {} evaluated on {} slices", metric.name(), slicer.nslice());
    Ok(out)
}
