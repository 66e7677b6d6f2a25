use super::sphere::{to_cartesian, to_lon_lat};

/// Rotation taking ICRS unit vectors to IAU 1958 galactic unit vectors.
///
/// Rows are the galactic x (toward the Galactic centre), y and z (North
/// Galactic Pole, RA 192.85948 deg, Dec 27.12825 deg) axes in ICRS.
#[allow(clippy::excessive_precision)]
const ICRS_TO_GALACTIC: [[f64; 3]; 3] = [
    [
        -0.054875560416215368492398900454,
        -0.873437090234885048760383168409,
        -0.483835015548713226831774175116,
    ],
    [
        0.494109427875583673525222371358,
        -0.444829629960011178146614061616,
        0.746982244497218890527388004556,
    ],
    [
        -0.867666149019004701181616534570,
        -0.198076373431201528180486091412,
        0.455983776175066922272100478348,
    ],
];

/// Convert equatorial (RA, Dec) in radians to galactic (l, b) in radians.
///
/// `l` is in `[0, 2*pi)`.
pub fn equatorial_to_galactic(ra: f64, dec: f64) -> (f64, f64) {
    let v = to_cartesian(ra, dec);
    let m = &ICRS_TO_GALACTIC;
    let g = [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ];
    to_lon_lat(g)
}
