//! Map generators: per-slice-point metadata computed before the index is built.

use crate::error::Result;
use crate::geom::galactic::equatorial_to_galactic;
use crate::slice_points::SlicePoints;
use crate::table::ObservationTable;

/// Adds metadata to slice points during slicer setup.
///
/// Maps run in the order given, so a later map may read keys written by an
/// earlier one.
pub trait SkyMap {
    fn name(&self) -> &str;

    fn run(&self, points: &mut SlicePoints, obs: &ObservationTable) -> Result<()>;
}

/// Galactic longitude and latitude (`gall`, `galb`, radians) of every slice point.
#[derive(Debug, Clone, Copy, Default)]
pub struct GalacticCoordsMap;

impl SkyMap for GalacticCoordsMap {
    fn name(&self) -> &str {
        "GalacticCoords"
    }

    fn run(&self, points: &mut SlicePoints, _obs: &ObservationTable) -> Result<()> {
        let (gall, galb): (Vec<f64>, Vec<f64>) = points
            .ra()
            .iter()
            .zip(points.dec())
            .map(|(&ra, &dec)| equatorial_to_galactic(ra, dec))
            .unzip();
        points.insert("gall", gall)?;
        points.insert("galb", galb)?;
        Ok(())
    }
}
