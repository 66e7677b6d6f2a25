//! The fixed set of sky positions a slicer partitions the survey onto, plus
//! the per-point (or shared) metadata that metrics receive alongside the
//! matching observations.

use std::collections::BTreeMap;

use ndarray::{Array1, ArrayD, Axis, IxDyn};

use crate::error::{Result, SlicerError};
use crate::healpix::HealpixGrid;

/// Keys populated at construction and not writable by map generators.
pub const RESERVED_KEYS: [&str; 3] = ["sid", "ra", "dec"];

/// A metadata entry attached to the slice-point collection.
///
/// Arrays (and text lists) whose leading dimension equals the number of slice
/// points are treated as "one entry per point" when bound to a single slice;
/// anything else is shared by every slice.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Scalar(f64),
    Text(String),
    Array(ArrayD<f64>),
    TextList(Vec<String>),
}

impl MetadataValue {
    /// Length of the leading dimension, if the value has one.
    pub fn leading_len(&self) -> Option<usize> {
        match self {
            MetadataValue::Array(a) if a.ndim() > 0 => Some(a.len_of(Axis(0))),
            MetadataValue::TextList(v) => Some(v.len()),
            _ => None,
        }
    }

    /// Entry `i` along the leading dimension. 0-d results collapse to scalars.
    ///
    /// Callers must check [`leading_len`](Self::leading_len) first.
    fn select(&self, i: usize) -> MetadataValue {
        match self {
            MetadataValue::Array(a) => {
                let row = a.index_axis(Axis(0), i);
                if row.ndim() == 0 {
                    MetadataValue::Scalar(row[IxDyn(&[])])
                } else {
                    MetadataValue::Array(row.to_owned())
                }
            }
            MetadataValue::TextList(v) => MetadataValue::Text(v[i].clone()),
            other => other.clone(),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            MetadataValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayD<f64>> {
        match self {
            MetadataValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Scalar(v)
    }
}

impl From<Vec<f64>> for MetadataValue {
    fn from(v: Vec<f64>) -> Self {
        MetadataValue::Array(Array1::from(v).into_dyn())
    }
}

impl From<ArrayD<f64>> for MetadataValue {
    fn from(a: ArrayD<f64>) -> Self {
        MetadataValue::Array(a)
    }
}

/// Slice points: ids `0..n`, positions in radians, and a metadata store.
#[derive(Debug, Clone, PartialEq)]
pub struct SlicePoints {
    ra: Vec<f64>,
    dec: Vec<f64>,
    metadata: BTreeMap<String, MetadataValue>,
}

impl SlicePoints {
    /// Slice points at user-supplied positions.
    ///
    /// `degrees` selects the unit of `ra`/`dec`; they are stored in radians.
    pub fn from_lon_lat(ra: &[f64], dec: &[f64], degrees: bool) -> Result<Self> {
        if ra.len() != dec.len() {
            return Err(SlicerError::InvalidInput(format!(
                "slice point ra/dec lengths differ ({} vs {})",
                ra.len(),
                dec.len()
            )));
        }
        if ra.is_empty() {
            return Err(SlicerError::InvalidInput("at least one slice point is required".into()));
        }
        let convert = |v: &[f64]| -> Vec<f64> {
            if degrees {
                v.iter().map(|d| d.to_radians()).collect()
            } else {
                v.to_vec()
            }
        };
        Ok(Self::from_radians(convert(ra), convert(dec)))
    }

    /// One slice point at the center of every pixel of `grid`, in pixel order.
    pub fn healpix(grid: HealpixGrid) -> Self {
        let (ra, dec) = grid.centers();
        let mut points = Self::from_radians(ra, dec);
        points
            .metadata
            .insert("nside".into(), MetadataValue::Scalar(grid.nside() as f64));
        points
    }

    fn from_radians(ra: Vec<f64>, dec: Vec<f64>) -> Self {
        let sid: Vec<f64> = (0..ra.len()).map(|i| i as f64).collect();
        let mut metadata = BTreeMap::new();
        metadata.insert("sid".to_string(), MetadataValue::from(sid));
        metadata.insert("ra".to_string(), MetadataValue::from(ra.clone()));
        metadata.insert("dec".to_string(), MetadataValue::from(dec.clone()));
        Self { ra, dec, metadata }
    }

    /// Number of slice points.
    pub fn len(&self) -> usize {
        self.ra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ra.is_empty()
    }

    /// Longitudes in radians.
    pub fn ra(&self) -> &[f64] {
        &self.ra
    }

    /// Latitudes in radians.
    pub fn dec(&self) -> &[f64] {
        &self.dec
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.metadata.keys().map(String::as_str)
    }

    /// Attach metadata. Per-point values must have leading length [`len`](Self::len).
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Result<()> {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            return Err(SlicerError::InvalidInput(format!(
                "slice point key '{key}' is reserved"
            )));
        }
        self.metadata.insert(key, value.into());
        Ok(())
    }

    /// Metadata as seen by slice `islice`: per-point values indexed, shared values whole.
    pub fn bind(&self, islice: usize) -> BTreeMap<String, MetadataValue> {
        let n = self.len();
        self.metadata
            .iter()
            .map(|(key, value)| {
                let bound = match value.leading_len() {
                    Some(len) if len == n => value.select(islice),
                    _ => value.clone(),
                };
                (key.clone(), bound)
            })
            .collect()
    }
}
