//! Spatial slicing of survey pointings onto sky tessellations.
//!
//! Skyslicer partitions a table of telescope observations by sky position:
//! every slice point (typically a HEALPix pixel center) is matched to the
//! observations whose field of view covers it, either by a plain angular
//! radius or by projecting each pointing's detector footprint. Metrics then
//! reduce each slice to a single value.

pub mod camera;
pub mod error;
pub mod footprint;
pub mod geom;
pub mod healpix;
pub mod index;
pub mod kdtree;
pub mod maps;
pub mod metrics;
pub mod slice_points;
pub mod slicer;
pub mod table;

pub use error::{Result, SlicerError};
pub use slicer::{SliceResult, SlicerConfig, SpatialSlicer};
