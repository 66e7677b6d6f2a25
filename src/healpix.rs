//! Nested-scheme HEALPix grid used to tessellate the sky into slice points.
//!
//! The 12 base pixels are laid out as:
//! - 0–3: north polar cap
//! - 4–7: equatorial belt
//! - 8–11: south polar cap
//!
//! Within each base pixel, `x` increases northeast and `y` increases northwest.
//! Sub-pixel indices interleave the bits of `x` (even) and `y` (odd).

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

use crate::error::{Result, SlicerError};

/// Deepest supported level; `nside = 2^29` still fits `npix` in a u64.
pub const MAX_DEPTH: u8 = 29;

/// A HEALPix tessellation at a fixed depth (`nside = 2^depth`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealpixGrid {
    depth: u8,
}

impl HealpixGrid {
    pub fn new(depth: u8) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(SlicerError::InvalidInput(format!(
                "HEALPix depth {depth} exceeds maximum {MAX_DEPTH}"
            )));
        }
        Ok(Self { depth })
    }

    /// Grid from an `nside`, which must be a power of two.
    pub fn from_nside(nside: u64) -> Result<Self> {
        if !nside.is_power_of_two() {
            return Err(SlicerError::InvalidInput(format!(
                "nside must be a power of two, got {nside}"
            )));
        }
        Self::new(nside.trailing_zeros() as u8)
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn nside(&self) -> u64 {
        1u64 << self.depth
    }

    /// Total number of pixels: `12 * nside^2`.
    pub fn npix(&self) -> u64 {
        12 * self.nside() * self.nside()
    }

    /// Solid angle of one pixel in steradians.
    pub fn pixel_area(&self) -> f64 {
        4.0 * PI / self.npix() as f64
    }

    /// Approximate pixel side length in degrees (square root of the area).
    pub fn resolution_deg(&self) -> f64 {
        self.pixel_area().sqrt().to_degrees()
    }

    /// (lon, lat) in radians of the center of pixel `pixel`.
    pub fn center(&self, pixel: u64) -> (f64, f64) {
        let ns2 = self.nside() * self.nside();
        let (x, y) = deinterleave(pixel % ns2);
        base_xy_to_lon_lat(
            pixel / ns2,
            x as f64 + 0.5,
            y as f64 + 0.5,
            self.nside() as f64,
        )
    }

    /// Pixel containing (lon, lat) in radians.
    pub fn pixel_of(&self, lon: f64, lat: f64) -> u64 {
        let (base, x, y) = lon_lat_to_base_xy(lon, lat, self.nside() as f64);
        base * self.nside() * self.nside() + interleave(x, y)
    }

    /// Centers of every pixel, in pixel order, as (lon, lat) arrays.
    pub fn centers(&self) -> (Vec<f64>, Vec<f64>) {
        (0..self.npix()).map(|p| self.center(p)).unzip()
    }
}

fn wrap_lon(lon: f64) -> f64 {
    let wrapped = lon.rem_euclid(TAU);
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Locate (lon, lat) within the base pixel grid: `(base, x, y)`.
fn lon_lat_to_base_xy(lon: f64, lat: f64, ns: f64) -> (u64, u64, u64) {
    let z = lat.sin();
    let phi = wrap_lon(lon);
    let phi_t = phi % FRAC_PI_2;
    let column = ((phi / FRAC_PI_2).floor() as i64).rem_euclid(4) as u64;
    let last = ns as u64 - 1;

    if z.abs() >= 2.0 / 3.0 {
        let north = z >= 0.0;
        let sigma = 3.0 * (1.0 - z.abs());
        // Distances from the pole corner along the two pixel axes.
        let kx = (sigma * (ns * (2.0 * phi_t - PI) / PI).powi(2)).max(0.0).sqrt();
        let ky = (sigma * (ns * 2.0 * phi_t / PI).powi(2)).max(0.0).sqrt();

        let (xx, yy) = if north { (ns - kx, ns - ky) } else { (ky, kx) };
        let base = if north { column } else { 8 + column };
        return (
            base,
            (xx.floor() as u64).min(last),
            (yy.floor() as u64).min(last),
        );
    }

    let zunits = (z + 2.0 / 3.0) * 0.75;
    let phiunits = phi_t / FRAC_PI_2;
    let mut xx = (zunits + phiunits) * ns;
    let mut yy = (zunits - phiunits + 1.0) * ns;

    let base = match (xx >= ns, yy >= ns) {
        (true, true) => {
            xx -= ns;
            yy -= ns;
            column
        }
        (true, false) => {
            xx -= ns;
            (column + 1) % 4 + 4
        }
        (false, true) => {
            yy -= ns;
            column + 4
        }
        (false, false) => 8 + column,
    };
    (
        base,
        (xx.floor() as u64).min(last),
        (yy.floor() as u64).min(last),
    )
}

/// Inverse of [`lon_lat_to_base_xy`] for continuous in-pixel coordinates.
fn base_xy_to_lon_lat(base: u64, x: f64, y: f64, ns: f64) -> (f64, f64) {
    let (xn, yn) = (x / ns, y / ns);
    let row = base / 4;
    let col = base % 4;

    let polar = match row {
        0 => xn + yn > 1.0,
        2 => xn + yn < 1.0,
        _ => false,
    };

    if !polar {
        let (phi_off, z_off) = match row {
            0 => (1.0, 0.0),
            1 => (0.0, -1.0),
            _ => (1.0, -2.0),
        };
        let z = (2.0 / 3.0) * (xn + yn + z_off);
        let phi = FRAC_PI_4 * (xn - yn + phi_off + 2.0 * col as f64);
        return (wrap_lon(phi), z.clamp(-1.0, 1.0).asin());
    }

    let north = row == 0;
    let sign = if north { 1.0 } else { -1.0 };
    // Work in north-cap convention; the south cap is its mirror.
    let (px, py) = if north { (x, y) } else { (ns - y, ns - x) };
    let kx = ns - px;
    let ky = ns - py;

    let phi_t = if kx + ky == 0.0 {
        0.0
    } else {
        PI * ky / (2.0 * (kx + ky))
    };

    let (k, denom) = if phi_t < FRAC_PI_4 {
        (kx, (2.0 * phi_t - PI) * ns)
    } else {
        (ky, 2.0 * phi_t * ns)
    };
    let z = if denom.abs() < 1e-15 {
        sign
    } else {
        let v = PI * k / denom;
        (1.0 - v * v / 3.0) * sign
    };

    let phi = FRAC_PI_2 * col as f64 + phi_t;
    (wrap_lon(phi), z.clamp(-1.0, 1.0).asin())
}

/// Bit-interleave (x, y): x provides even bits, y provides odd bits.
fn interleave(x: u64, y: u64) -> u64 {
    let mut out = 0u64;
    for bit in 0..32 {
        out |= ((x >> bit) & 1) << (2 * bit);
        out |= ((y >> bit) & 1) << (2 * bit + 1);
    }
    out
}

fn deinterleave(sub: u64) -> (u64, u64) {
    let mut x = 0u64;
    let mut y = 0u64;
    for bit in 0..32 {
        x |= ((sub >> (2 * bit)) & 1) << bit;
        y |= ((sub >> (2 * bit + 1)) & 1) << bit;
    }
    (x, y)
}
