//! Footprint refinement: per-pointing detector membership of slice points.
//!
//! A coarse radius query against an index over the *slice points* finds the
//! candidates near each pointing; the camera model then keeps only those that
//! land on an active detector. The result is a lookup table from slice point
//! to the observations (and chips) that actually imaged it.

use std::collections::BTreeSet;

use log::debug;

use crate::camera::{CameraModel, ObservationMetadata};
use crate::error::{Result, SlicerError};
use crate::index::{SkyIndex, check_radians};
use crate::slice_points::SlicePoints;

/// Which detectors count as "on" when refining footprints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChipSelection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl ChipSelection {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ChipSelection::Only(names.into_iter().map(Into::into).collect())
    }

    pub fn accepts(&self, chip: &str) -> bool {
        match self {
            ChipSelection::All => true,
            ChipSelection::Only(names) => names.contains(chip),
        }
    }
}

/// Observations (and the chip each landed on) for one slice point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupEntry {
    pub indices: Vec<usize>,
    pub chip_names: Vec<String>,
}

/// Slice point id -> matching observations, built once by [`preslice_footprint`].
#[derive(Debug, Clone, PartialEq)]
pub struct SliceLookup {
    entries: Vec<LookupEntry>,
}

impl SliceLookup {
    fn new(nslice: usize) -> Self {
        Self {
            entries: vec![LookupEntry::default(); nslice],
        }
    }

    pub fn get(&self, islice: usize) -> Option<&LookupEntry> {
        self.entries.get(islice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of (slice point, observation) matches.
    pub fn total_matches(&self) -> usize {
        self.entries.iter().map(|e| e.indices.len()).sum()
    }
}

/// Pointing columns for footprint refinement, all in radians and of equal length.
#[derive(Debug, Clone, Copy)]
pub struct Pointings<'a> {
    pub ra: &'a [f64],
    pub dec: &'a [f64],
    pub rot_sky_pos: &'a [f64],
    pub mjd: &'a [f64],
}

impl Pointings<'_> {
    fn len(&self) -> usize {
        self.ra.len()
    }

    fn check_lengths(&self) -> Result<()> {
        let n = self.ra.len();
        if [self.dec.len(), self.rot_sky_pos.len(), self.mjd.len()]
            .iter()
            .any(|&len| len != n)
        {
            return Err(SlicerError::InvalidInput(
                "pointing columns must all have the same length".into(),
            ));
        }
        Ok(())
    }
}

/// Build the slice lookup table for `pointings` using detector geometry.
///
/// Entries list observation indices in input order.
pub fn preslice_footprint(
    slice_points: &SlicePoints,
    pointings: Pointings<'_>,
    camera: &dyn CameraModel,
    chips: &ChipSelection,
    chord_radius: f64,
    leaf_size: usize,
    epoch: f64,
) -> Result<SliceLookup> {
    pointings.check_lengths()?;
    check_radians(pointings.ra, pointings.dec)?;

    let tree = SkyIndex::build(slice_points.ra(), slice_points.dec(), leaf_size)?;
    let mut lookup = SliceLookup::new(slice_points.len());

    let mut cand_ra = Vec::new();
    let mut cand_dec = Vec::new();
    for iobs in 0..pointings.len() {
        let mut candidates = tree.query_lon_lat(pointings.ra[iobs], pointings.dec[iobs], chord_radius);
        if candidates.is_empty() {
            continue;
        }
        candidates.sort_unstable();

        cand_ra.clear();
        cand_dec.clear();
        cand_ra.extend(candidates.iter().map(|&i| slice_points.ra()[i]));
        cand_dec.extend(candidates.iter().map(|&i| slice_points.dec()[i]));

        let obs = ObservationMetadata {
            pointing_ra: pointings.ra[iobs],
            pointing_dec: pointings.dec[iobs],
            rot_sky_pos: pointings.rot_sky_pos[iobs],
            mjd: pointings.mjd[iobs],
        };
        let chip_names = camera.chip_names(&cand_ra, &cand_dec, epoch, &obs);
        if chip_names.len() != candidates.len() {
            return Err(SlicerError::Configuration(format!(
                "camera model returned {} chip names for {} positions",
                chip_names.len(),
                candidates.len()
            )));
        }

        for (islice, chip) in candidates.into_iter().zip(chip_names) {
            let Some(chip) = chip else {
                continue;
            };
            if !chips.accepts(&chip) {
                continue;
            }
            let entry = &mut lookup.entries[islice];
            entry.indices.push(iobs);
            entry.chip_names.push(chip);
        }
    }

    debug!(
        "footprint lookup: {} pointings, {} slice points, {} matches",
        pointings.len(),
        lookup.len(),
        lookup.total_matches()
    );
    Ok(lookup)
}
