//! Detector geometry used to refine field-of-view membership.
//!
//! A [`CameraModel`] answers one question: for a given pointing, which
//! detector (if any) does each sky position land on? [`FocalPlane`] is a
//! concrete model made of rectangular detectors laid out on the tangent plane
//! of the pointing.

use crate::geom::sphere::{gnomonic, to_cartesian};

/// Pointing-level metadata for one observation. Angles are in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationMetadata {
    pub pointing_ra: f64,
    pub pointing_dec: f64,
    /// Orientation of the camera +y axis, measured from north through east.
    pub rot_sky_pos: f64,
    pub mjd: f64,
}

/// Maps sky positions to detector names for a single pointing.
pub trait CameraModel {
    /// Names of every detector in the camera.
    fn detector_names(&self) -> Vec<&str>;

    /// Detector under each `(ra[i], dec[i])` (radians), or `None` for positions
    /// that fall in a gap or off the focal plane.
    ///
    /// `epoch` is the Julian epoch of the coordinates (2000.0 for ICRS/J2000).
    fn chip_names(
        &self,
        ra: &[f64],
        dec: &[f64],
        epoch: f64,
        obs: &ObservationMetadata,
    ) -> Vec<Option<String>>;
}

/// A rectangular detector in focal-plane coordinates (degrees on the tangent
/// plane, camera frame). Bounds are half-open: `[x_min, x_max) x [y_min, y_max)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Detector {
    pub name: String,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Detector {
    /// Square detector of side `size` centered on `(cx, cy)`.
    pub fn square(name: impl Into<String>, cx: f64, cy: f64, size: f64) -> Self {
        let half = size / 2.0;
        Self {
            name: name.into(),
            x_min: cx - half,
            x_max: cx + half,
            y_min: cy - half,
            y_max: cy + half,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.x_min..self.x_max).contains(&x) && (self.y_min..self.y_max).contains(&y)
    }
}

/// A mosaic of rectangular detectors.
///
/// Positions are gnomonically projected about the pointing, rotated into the
/// camera frame by `rot_sky_pos`, and matched against the detectors in order;
/// the first detector containing the position wins. The model is purely
/// geometric, so `epoch` and `mjd` do not change the result.
#[derive(Debug, Clone, PartialEq)]
pub struct FocalPlane {
    detectors: Vec<Detector>,
}

/// LSST-like science sensor side in degrees (4k pixels at 0.2 arcsec).
const LSST_SENSOR_DEG: f64 = 0.2263;
/// Gap between sensors inside a raft, degrees.
const LSST_SENSOR_GAP_DEG: f64 = 0.0070;
/// Extra gap between neighbouring rafts, degrees.
const LSST_RAFT_GAP_DEG: f64 = 0.0150;

impl FocalPlane {
    pub fn new(detectors: Vec<Detector>) -> Self {
        Self { detectors }
    }

    /// `nx` by `ny` square chips of side `chip_deg` separated by `gap_deg`,
    /// centered on the boresight. Chips are named `C{ix},{iy}`.
    pub fn grid(nx: usize, ny: usize, chip_deg: f64, gap_deg: f64) -> Self {
        let pitch = chip_deg + gap_deg;
        let x0 = -(nx as f64 - 1.0) / 2.0 * pitch;
        let y0 = -(ny as f64 - 1.0) / 2.0 * pitch;
        let detectors = (0..nx)
            .flat_map(|ix| (0..ny).map(move |iy| (ix, iy)))
            .map(|(ix, iy)| {
                Detector::square(
                    format!("C{ix},{iy}"),
                    x0 + ix as f64 * pitch,
                    y0 + iy as f64 * pitch,
                    chip_deg,
                )
            })
            .collect();
        Self { detectors }
    }

    /// A 5x5 raft mosaic with the corner rafts removed, each raft holding
    /// 3x3 science sensors, named `R:{rx},{ry} S:{sx},{sy}`.
    pub fn lsst_like() -> Self {
        let sensor_pitch = LSST_SENSOR_DEG + LSST_SENSOR_GAP_DEG;
        let raft_pitch = 3.0 * LSST_SENSOR_DEG + 2.0 * LSST_SENSOR_GAP_DEG + LSST_RAFT_GAP_DEG;

        let mut detectors = Vec::with_capacity(21 * 9);
        for rx in 0..5 {
            for ry in 0..5 {
                let corner = (rx == 0 || rx == 4) && (ry == 0 || ry == 4);
                if corner {
                    continue;
                }
                let raft_cx = (rx as f64 - 2.0) * raft_pitch;
                let raft_cy = (ry as f64 - 2.0) * raft_pitch;
                for sx in 0..3 {
                    for sy in 0..3 {
                        detectors.push(Detector::square(
                            format!("R:{rx},{ry} S:{sx},{sy}"),
                            raft_cx + (sx as f64 - 1.0) * sensor_pitch,
                            raft_cy + (sy as f64 - 1.0) * sensor_pitch,
                            LSST_SENSOR_DEG,
                        ));
                    }
                }
            }
        }
        Self { detectors }
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Angular radius (degrees) of the smallest boresight-centered circle
    /// enclosing every detector corner.
    pub fn radius_deg(&self) -> f64 {
        self.detectors
            .iter()
            .flat_map(|d| {
                [
                    d.x_min.hypot(d.y_min),
                    d.x_min.hypot(d.y_max),
                    d.x_max.hypot(d.y_min),
                    d.x_max.hypot(d.y_max),
                ]
            })
            .fold(0.0, f64::max)
    }

    /// Detector containing camera-frame position `(x, y)` in degrees.
    pub fn detector_at(&self, x: f64, y: f64) -> Option<&Detector> {
        self.detectors.iter().find(|d| d.contains(x, y))
    }

    /// Camera-frame position (degrees) of `(ra, dec)` for `obs`, or `None`
    /// if it lies more than 90 degrees from the boresight.
    pub fn focal_plane_position(&self, ra: f64, dec: f64, obs: &ObservationMetadata) -> Option<(f64, f64)> {
        let boresight = to_cartesian(obs.pointing_ra, obs.pointing_dec);
        let (east, north) = gnomonic(to_cartesian(ra, dec), boresight)?;
        let (sin_r, cos_r) = obs.rot_sky_pos.sin_cos();
        let x = east * cos_r - north * sin_r;
        let y = east * sin_r + north * cos_r;
        Some((x.to_degrees(), y.to_degrees()))
    }
}

impl CameraModel for FocalPlane {
    fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name.as_str()).collect()
    }

    fn chip_names(
        &self,
        ra: &[f64],
        dec: &[f64],
        _epoch: f64,
        obs: &ObservationMetadata,
    ) -> Vec<Option<String>> {
        ra.iter()
            .zip(dec)
            .map(|(&ra, &dec)| {
                let (x, y) = self.focal_plane_position(ra, dec, obs)?;
                self.detector_at(x, y).map(|d| d.name.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn pointing(ra_deg: f64, dec_deg: f64, rot_deg: f64) -> ObservationMetadata {
        ObservationMetadata {
            pointing_ra: ra_deg.to_radians(),
            pointing_dec: dec_deg.to_radians(),
            rot_sky_pos: rot_deg.to_radians(),
            mjd: 60000.0,
        }
    }

    #[test]
    fn lsst_like_layout() {
        let fp = FocalPlane::lsst_like();
        assert_eq!(fp.detectors().len(), 189);
        assert!(fp.detector_names().contains(&"R:2,2 S:1,1"));
        assert!(!fp.detector_names().iter().any(|n| n.starts_with("R:0,0")));

        let r = fp.radius_deg();
        assert!(r > 1.5 && r < 2.2, "radius {r}");
    }

    #[test]
    fn boresight_hits_center_sensor() {
        let fp = FocalPlane::lsst_like();
        let obs = pointing(30.0, -20.0, 0.0);
        let names = fp.chip_names(&[obs.pointing_ra], &[obs.pointing_dec], 2000.0, &obs);
        assert_eq!(names, vec![Some("R:2,2 S:1,1".to_string())]);
    }

    #[test]
    fn sensor_gap_is_empty() {
        let fp = FocalPlane::lsst_like();
        let half_gap_offset = LSST_SENSOR_DEG / 2.0 + LSST_SENSOR_GAP_DEG / 2.0;
        assert!(fp.detector_at(half_gap_offset, 0.0).is_none());
        assert!(fp.detector_at(0.0, half_gap_offset).is_none());
        assert!(fp.detector_at(0.0, 0.0).is_some());
    }

    #[test]
    fn far_positions_have_no_chip() {
        let fp = FocalPlane::lsst_like();
        let obs = pointing(0.0, 0.0, 0.0);
        let names = fp.chip_names(&[10f64.to_radians(), 180f64.to_radians()], &[0.0, 0.0], 2000.0, &obs);
        assert_eq!(names, vec![None, None]);
    }

    #[test]
    fn rotation_moves_east_onto_camera_y() {
        let fp = FocalPlane::grid(3, 3, 1.0, 0.0);
        let east = 1.0f64.to_radians();

        let unrotated = pointing(0.0, 0.0, 0.0);
        let names = fp.chip_names(&[east], &[0.0], 2000.0, &unrotated);
        assert_eq!(names, vec![Some("C2,1".to_string())]);

        let rotated = pointing(0.0, 0.0, 90.0);
        let (x, y) = fp.focal_plane_position(east, 0.0, &rotated).unwrap();
        let expected_y = east.tan().to_degrees();
        assert!(x.abs() < 1e-9 && (y - expected_y).abs() < 1e-9, "({x}, {y})");
        let names = fp.chip_names(&[east], &[0.0], 2000.0, &rotated);
        assert_eq!(names, vec![Some("C1,2".to_string())]);
    }

    #[test]
    fn detector_bounds_are_half_open() {
        let d = Detector::square("A", 0.0, 0.0, 2.0);
        assert!(d.contains(-1.0, -1.0));
        assert!(!d.contains(1.0, 0.0));
        assert!(!d.contains(0.0, 1.0));
    }

    #[test]
    fn pole_pointing_projects() {
        let fp = FocalPlane::lsst_like();
        let obs = ObservationMetadata {
            pointing_ra: 0.0,
            pointing_dec: FRAC_PI_2,
            rot_sky_pos: 0.0,
            mjd: 0.0,
        };
        let near = fp.chip_names(&[1.0], &[FRAC_PI_2 - 0.001], 2000.0, &obs);
        assert!(near[0].is_some());
    }
}
