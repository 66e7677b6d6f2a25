//! The spatial slicer: maps every slice point to the observations that cover it.
//!
//! Lifecycle:
//!
//! 1. [`SpatialSlicer::new`] fixes the configuration and the slice points.
//! 2. [`SpatialSlicer::setup_slicer`] validates the observation table, runs
//!    map generators and builds either a KD-tree over the observations
//!    (radius mode) or a per-slice lookup table from detector footprints.
//! 3. [`SpatialSlicer::query`] / [`SpatialSlicer::iter`] return, per slice
//!    point, the matching observation indices and the bound slice metadata.

use std::collections::BTreeMap;

use log::{Level, debug, log, warn};

use crate::camera::CameraModel;
use crate::error::{Result, SlicerError};
use crate::footprint::{ChipSelection, Pointings, SliceLookup, preslice_footprint};
use crate::geom::sphere::angular_to_chord_radius;
use crate::index::SkyIndex;
use crate::maps::SkyMap;
use crate::slice_points::{MetadataValue, SlicePoints};
use crate::table::ObservationTable;

/// Configuration for a [`SpatialSlicer`].
#[derive(Debug, Clone, PartialEq)]
pub struct SlicerConfig {
    /// Longitude column of the observation table.
    pub lon_col: String,
    /// Latitude column of the observation table.
    pub lat_col: String,
    /// Report progress at `info` level instead of `debug`.
    pub verbose: bool,
    /// Value metrics report for slice points without observations.
    pub badval: f64,
    /// Maximum points per KD-tree leaf.
    pub leaf_size: usize,
    /// Field-of-view radius in degrees.
    pub radius: f64,
    /// Observation lon/lat (and rotation) columns are in degrees.
    pub lat_lon_deg: bool,
    /// Refine matches with a camera model instead of the plain radius.
    pub use_camera: bool,
    /// Camera rotation column, used in footprint mode.
    pub rot_sky_pos_col: String,
    /// Observation time column (MJD), used in footprint mode.
    pub mjd_col: String,
    /// Detectors that count in footprint mode.
    pub chip_names: ChipSelection,
    /// Size of a downstream result cache; only used to warn about maps.
    pub cache_size: usize,
    /// Julian epoch of the observation coordinates.
    pub epoch: f64,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            lon_col: "fieldRA".into(),
            lat_col: "fieldDec".into(),
            verbose: true,
            badval: -666.0,
            leaf_size: 100,
            radius: 1.75,
            lat_lon_deg: true,
            use_camera: false,
            rot_sky_pos_col: "rotSkyPos".into(),
            mjd_col: "observationStartMJD".into(),
            chip_names: ChipSelection::All,
            cache_size: 0,
            epoch: 2000.0,
        }
    }
}

impl SlicerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..180.0).contains(&self.radius) {
            return Err(SlicerError::Configuration(format!(
                "radius must be in [0, 180) degrees, got {}",
                self.radius
            )));
        }
        if self.leaf_size == 0 {
            return Err(SlicerError::Configuration("leaf_size must be positive".into()));
        }
        Ok(())
    }

    /// Numeric columns the observation table must provide.
    pub fn columns_needed(&self) -> Vec<&str> {
        let mut cols = vec![self.lon_col.as_str(), self.lat_col.as_str()];
        if self.use_camera {
            cols.push(self.rot_sky_pos_col.as_str());
            cols.push(self.mjd_col.as_str());
        }
        cols
    }
}

/// Observations matched to one slice point.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceResult {
    /// Row indices into the observation table.
    pub indices: Vec<usize>,
    /// Chip of each matched observation (footprint mode only).
    pub chip_names: Option<Vec<String>>,
    /// Slice-point metadata bound to this slice.
    pub slice_point: BTreeMap<String, MetadataValue>,
}

#[derive(Debug, Clone)]
enum Prepared {
    Radius(SkyIndex),
    Footprint(SliceLookup),
}

impl Prepared {
    fn matches(&self, points: &SlicePoints, islice: usize, chord_radius: f64) -> (Vec<usize>, Option<Vec<String>>) {
        match self {
            Prepared::Radius(index) => {
                let mut indices = index.query_lon_lat(points.ra()[islice], points.dec()[islice], chord_radius);
                indices.sort_unstable();
                (indices, None)
            }
            Prepared::Footprint(lookup) => match lookup.get(islice) {
                Some(entry) => (entry.indices.clone(), Some(entry.chip_names.clone())),
                None => (Vec::new(), Some(Vec::new())),
            },
        }
    }
}

/// Partitions observations spatially over a fixed set of slice points.
#[derive(Debug, Clone)]
pub struct SpatialSlicer {
    config: SlicerConfig,
    slice_points: SlicePoints,
    chord_radius: f64,
    prepared: Option<Prepared>,
}

impl SpatialSlicer {
    pub fn new(config: SlicerConfig, slice_points: SlicePoints) -> Result<Self> {
        config.validate()?;
        let chord_radius = angular_to_chord_radius(config.radius);
        Ok(Self {
            config,
            slice_points,
            chord_radius,
            prepared: None,
        })
    }

    pub fn config(&self) -> &SlicerConfig {
        &self.config
    }

    /// Number of slice points.
    pub fn nslice(&self) -> usize {
        self.slice_points.len()
    }

    /// Shape of the metric output grid (one value per slice point).
    pub fn shape(&self) -> usize {
        self.nslice()
    }

    pub fn slice_points(&self) -> &SlicePoints {
        &self.slice_points
    }

    /// Search radius as a chord length on the unit sphere.
    pub fn chord_radius(&self) -> f64 {
        self.chord_radius
    }

    pub fn is_ready(&self) -> bool {
        self.prepared.is_some()
    }

    fn progress_level(&self) -> Level {
        if self.config.verbose { Level::Info } else { Level::Debug }
    }

    /// Prepare the slicer for `obs`.
    ///
    /// Maps run in order and may add slice-point metadata. `camera` is required
    /// when `use_camera` is set and ignored otherwise. On error the slicer is
    /// left unchanged and can be set up again.
    pub fn setup_slicer(
        &mut self,
        obs: &ObservationTable,
        maps: &[&dyn SkyMap],
        camera: Option<&dyn CameraModel>,
    ) -> Result<()> {
        if self.prepared.is_some() {
            return Err(SlicerError::Configuration("slicer is already set up".into()));
        }
        if obs.is_empty() {
            return Err(SlicerError::InvalidInput("observation table is empty".into()));
        }
        obs.require_float_columns(&self.config.columns_needed())?;
        let camera = match (self.config.use_camera, camera) {
            (true, None) => {
                return Err(SlicerError::Configuration(
                    "use_camera is set but no camera model was supplied".into(),
                ));
            }
            (true, Some(camera)) => Some(camera),
            (false, _) => None,
        };

        let level = self.progress_level();
        if let Some(message) = self.map_cache_advisory(maps.len()) {
            warn!("{message}");
        }

        let mut points = self.slice_points.clone();
        for map in maps {
            map.run(&mut points, obs)?;
            log!(level, "ran map {} on {} slice points", map.name(), points.len());
        }

        let degrees = self.config.lat_lon_deg;
        let angles = |col: &str| -> Result<Vec<f64>> {
            let values = obs.float(col)?;
            Ok(if degrees {
                values.mapv(f64::to_radians).to_vec()
            } else {
                values.to_vec()
            })
        };
        let lon = angles(&self.config.lon_col)?;
        let lat = angles(&self.config.lat_col)?;

        let prepared = match camera {
            Some(camera) => {
                self.warn_unknown_chips(camera);
                let rot = angles(&self.config.rot_sky_pos_col)?;
                let mjd = obs.float(&self.config.mjd_col)?.to_vec();
                let pointings = Pointings {
                    ra: &lon,
                    dec: &lat,
                    rot_sky_pos: &rot,
                    mjd: &mjd,
                };
                let lookup = preslice_footprint(
                    &points,
                    pointings,
                    camera,
                    &self.config.chip_names,
                    self.chord_radius,
                    self.config.leaf_size,
                    self.config.epoch,
                )?;
                log!(
                    level,
                    "created slice lookup table for {} slice points ({} matches)",
                    lookup.len(),
                    lookup.total_matches()
                );
                Prepared::Footprint(lookup)
            }
            None => {
                let index = SkyIndex::build(&lon, &lat, self.config.leaf_size)?;
                log!(
                    level,
                    "built KD-tree over {} observations (leaf size {})",
                    index.len(),
                    index.leaf_size()
                );
                Prepared::Radius(index)
            }
        };

        self.slice_points = points;
        self.prepared = Some(prepared);
        debug!("slicer ready: {} slice points, radius {} deg", self.nslice(), self.config.radius);
        Ok(())
    }

    /// Warning text when maps are combined with a result cache, if any.
    fn map_cache_advisory(&self, nmaps: usize) -> Option<String> {
        (nmaps > 0 && self.config.cache_size > 0).then(|| {
            format!(
                "maps are attached but cache_size is {}; cached metric values will not reflect per-point map data",
                self.config.cache_size
            )
        })
    }

    fn warn_unknown_chips(&self, camera: &dyn CameraModel) {
        let ChipSelection::Only(names) = &self.config.chip_names else {
            return;
        };
        let known = camera.detector_names();
        for name in names.iter().filter(|n| !known.contains(&n.as_str())) {
            warn!("chip '{name}' is not a detector of the camera model and will never match");
        }
    }

    /// Observations and bound metadata for slice point `islice`.
    pub fn query(&self, islice: usize) -> Result<SliceResult> {
        let prepared = self.prepared.as_ref().ok_or(SlicerError::NotReady)?;
        if islice >= self.nslice() {
            return Err(SlicerError::IndexOutOfRange {
                index: islice,
                nslice: self.nslice(),
            });
        }
        Ok(self.result(prepared, islice))
    }

    fn result(&self, prepared: &Prepared, islice: usize) -> SliceResult {
        let (indices, chip_names) = prepared.matches(&self.slice_points, islice, self.chord_radius);
        SliceResult {
            indices,
            chip_names,
            slice_point: self.slice_points.bind(islice),
        }
    }

    /// Lazily query every slice point in id order.
    ///
    /// Each call starts a fresh pass.
    pub fn iter(&self) -> Result<SliceIter<'_>> {
        let prepared = self.prepared.as_ref().ok_or(SlicerError::NotReady)?;
        Ok(SliceIter {
            slicer: self,
            prepared,
            next: 0,
        })
    }
}

/// Iterator returned by [`SpatialSlicer::iter`].
pub struct SliceIter<'a> {
    slicer: &'a SpatialSlicer,
    prepared: &'a Prepared,
    next: usize,
}

impl Iterator for SliceIter<'_> {
    type Item = SliceResult;

    fn next(&mut self) -> Option<SliceResult> {
        if self.next >= self.slicer.nslice() {
            return None;
        }
        let result = self.slicer.result(self.prepared, self.next);
        self.next += 1;
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.slicer.nslice().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SliceIter<'_> {}
