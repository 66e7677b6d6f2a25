//! Spherical geometry helpers shared by the index, footprint and map code.

pub mod galactic;
pub mod sphere;
