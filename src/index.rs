//! Sky-position index: a 3D KD-tree over unit vectors built from (lon, lat).

use std::f64::consts::TAU;

use crate::error::{Result, SlicerError};
use crate::geom::sphere::{to_cartesian, to_cartesian_many};
use crate::kdtree::KdTree;

/// Radius-searchable index over sky positions.
///
/// Positions are projected onto the unit sphere so that an angular radius
/// becomes a Euclidean chord radius (see
/// [`angular_to_chord_radius`](crate::geom::sphere::angular_to_chord_radius)).
#[derive(Debug, Clone)]
pub struct SkyIndex {
    tree: KdTree<3>,
}

/// Reject NaN and any |value| > 2*pi, which indicates degrees were passed
/// where radians are expected.
pub fn check_radians(lon: &[f64], lat: &[f64]) -> Result<()> {
    match lon.iter().chain(lat).find(|v| v.is_nan() || v.abs() > TAU) {
        Some(bad) => Err(SlicerError::InvalidInput(format!(
            "expecting longitude and latitude in radians, found {bad}"
        ))),
        None => Ok(()),
    }
}

impl SkyIndex {
    /// Build the index from longitude/latitude arrays in radians.
    ///
    /// Point `i` is reported as index `i` by queries. Values whose magnitude
    /// exceeds 2*pi are rejected as a guard against degrees being passed in.
    pub fn build(lon: &[f64], lat: &[f64], leaf_size: usize) -> Result<Self> {
        if lon.len() != lat.len() {
            return Err(SlicerError::InvalidInput(format!(
                "longitude and latitude lengths differ ({} vs {})",
                lon.len(),
                lat.len()
            )));
        }
        if lon.is_empty() {
            return Err(SlicerError::InvalidInput(
                "cannot build a sky index over zero positions".into(),
            ));
        }
        if leaf_size == 0 {
            return Err(SlicerError::InvalidInput("leaf size must be positive".into()));
        }
        check_radians(lon, lat)?;

        let points = to_cartesian_many(lon, lat);
        let indices = (0..points.len()).collect();
        Ok(Self {
            tree: KdTree::build(points, indices, leaf_size),
        })
    }

    /// Indices of all indexed positions within `chord_radius` of `center`.
    ///
    /// `center` is a unit vector. Result order is unspecified.
    pub fn query_radius(&self, center: [f64; 3], chord_radius: f64) -> Vec<usize> {
        self.tree.within_radius(&center, chord_radius)
    }

    /// Like [`query_radius`](Self::query_radius) with the center given as (lon, lat) radians.
    pub fn query_lon_lat(&self, lon: f64, lat: f64, chord_radius: f64) -> Vec<usize> {
        self.query_radius(to_cartesian(lon, lat), chord_radius)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn leaf_size(&self) -> usize {
        self.tree.leaf_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::sphere::{angular_to_chord_radius, haversine};

    #[test]
    fn empty_input_is_rejected() {
        let err = SkyIndex::build(&[], &[], 100).unwrap_err();
        assert!(matches!(err, SlicerError::InvalidInput(_)));
    }

    #[test]
    fn degree_input_is_rejected() {
        let err = SkyIndex::build(&[0.0, 45.0], &[0.0, 0.0], 100).unwrap_err();
        assert!(matches!(err, SlicerError::InvalidInput(_)));

        let err = SkyIndex::build(&[0.0], &[-7.0], 100).unwrap_err();
        assert!(matches!(err, SlicerError::InvalidInput(_)));
    }

    #[test]
    fn nan_input_is_rejected() {
        assert!(SkyIndex::build(&[f64::NAN], &[0.0], 10).is_err());
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(SkyIndex::build(&[0.0, 0.1], &[0.0], 10).is_err());
    }

    #[test]
    fn zero_leaf_size_is_rejected() {
        assert!(SkyIndex::build(&[0.0], &[0.0], 0).is_err());
    }

    #[test]
    fn boundary_values_are_accepted() {
        let index = SkyIndex::build(&[TAU, -TAU], &[0.0, 0.0], 1).unwrap();
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn matches_great_circle_distance() {
        let mut state: u64 = 42;
        let mut rng = || -> f64 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state as f64) / (u64::MAX as f64)
        };

        let n = 2000;
        let lon: Vec<f64> = (0..n).map(|_| rng() * TAU).collect();
        let lat: Vec<f64> = (0..n).map(|_| (rng() * 2.0 - 1.0).asin()).collect();
        let index = SkyIndex::build(&lon, &lat, 25).unwrap();

        let radius_deg = 5.0_f64;
        let chord = angular_to_chord_radius(radius_deg);
        for _ in 0..30 {
            let clon = rng() * TAU;
            let clat = (rng() * 2.0 - 1.0).asin();

            let mut found = index.query_lon_lat(clon, clat, chord);
            found.sort();

            let expected: Vec<usize> = (0..n)
                .filter(|&i| haversine(clon, clat, lon[i], lat[i]) <= radius_deg.to_radians() - 1e-9)
                .collect();
            for i in &expected {
                assert!(found.binary_search(i).is_ok(), "missing {i}");
            }
            for &i in &found {
                let d = haversine(clon, clat, lon[i], lat[i]);
                assert!(d <= radius_deg.to_radians() + 1e-9, "{i} is {} deg away", d.to_degrees());
            }
        }
    }
}
