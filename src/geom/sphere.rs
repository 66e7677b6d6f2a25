use std::f64::consts::TAU;

/// Convert (lon, lat) in radians to a unit vector `[x, y, z]`.
pub fn to_cartesian(lon: f64, lat: f64) -> [f64; 3] {
    let cos_lat = lat.cos();
    [cos_lat * lon.cos(), cos_lat * lon.sin(), lat.sin()]
}

/// Element-wise [`to_cartesian`] over matching longitude and latitude slices.
///
/// Extra trailing elements of the longer slice are ignored.
pub fn to_cartesian_many(lon: &[f64], lat: &[f64]) -> Vec<[f64; 3]> {
    lon.iter()
        .zip(lat)
        .map(|(&lon, &lat)| to_cartesian(lon, lat))
        .collect()
}

/// Convert a unit vector back to (lon, lat) in radians.
/// Longitude is in `[0, 2*pi)`, latitude in `[-pi/2, pi/2]`.
pub fn to_lon_lat(xyz: [f64; 3]) -> (f64, f64) {
    let mut lon = f64::atan2(xyz[1], xyz[0]);
    if lon < 0.0 {
        lon += TAU;
    }
    (lon, xyz[2].clamp(-1.0, 1.0).asin())
}

/// Euclidean chord length on the unit sphere subtended by an angular radius.
///
/// Measured between `(1, 0, 0)` and the point offset from it by `radius_deg`
/// along the equator. Only meaningful for radii below 180 degrees, where the
/// chord grows monotonically with the angle.
pub fn angular_to_chord_radius(radius_deg: f64) -> f64 {
    let [x0, y0, z0] = [1.0, 0.0, 0.0];
    let [x1, y1, z1] = to_cartesian(radius_deg.to_radians(), 0.0);
    ((x1 - x0).powi(2) + (y1 - y0).powi(2) + (z1 - z0).powi(2)).sqrt()
}

/// Great-circle angular distance between two unit vectors, in radians.
pub fn angular_distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
    dot.clamp(-1.0, 1.0).acos()
}

/// Great-circle distance between two (lon, lat) positions in radians.
///
/// Haversine form, numerically stable for small separations.
pub fn haversine(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let dlat = (lat2 - lat1) / 2.0;
    let dlon = (lon2 - lon1) / 2.0;
    let h = dlat.sin().powi(2) + lat1.cos() * lat2.cos() * dlon.sin().powi(2);
    2.0 * h.sqrt().clamp(0.0, 1.0).asin()
}

/// Gnomonic projection of `point` onto the plane tangent at `reference`.
///
/// Returns `(x, y)` in radians on the tangent plane: x grows toward
/// increasing longitude (east), y toward the north pole. `None` when the
/// point lies in the hemisphere opposite the reference.
pub fn gnomonic(point: [f64; 3], reference: [f64; 3]) -> Option<(f64, f64)> {
    let [sx, sy, sz] = point;
    let [rx, ry, rz] = reference;

    let cos_sep = sx * rx + sy * ry + sz * rz;
    if cos_sep <= 0.0 {
        return None;
    }

    // At a pole the east direction is undefined; pick +y as "east".
    let (ex, ey) = if rx == 0.0 && ry == 0.0 {
        (0.0, rz.signum())
    } else {
        let norm = rx.hypot(ry);
        (-ry / norm, rx / norm)
    };

    // north = reference x east
    let nx = -rz * ey;
    let ny = rz * ex;
    let nz = rx * ey - ry * ex;

    let x = (sx * ex + sy * ey) / cos_sep;
    let y = (sx * nx + sy * ny + sz * nz) / cos_sep;
    Some((x, y))
}
