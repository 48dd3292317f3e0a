//! Spherical coordinates on the celestial sphere.
//!
//! Coordinates are stored in degrees, the way the position service delivers
//! them. Equatorial `(ra, dec)` and horizontal `(az, alt)` pairs share the same
//! representation: the projection only sees a longitude-like and a
//! latitude-like angle.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A point on the celestial sphere, in degrees.
///
/// `ra` plays the role of longitude and `dec` of latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphericalCoord {
    /// Right ascension (or azimuth) in degrees
    pub ra: f64,
    /// Declination (or altitude) in degrees
    pub dec: f64,
}

impl SphericalCoord {
    /// Create a coordinate from right ascension and declination in degrees
    pub fn new(ra: f64, dec: f64) -> Self {
        Self { ra, dec }
    }

    /// Create a coordinate from horizontal altitude and azimuth in degrees
    pub fn from_alt_az(alt: f64, az: f64) -> Self {
        Self { ra: az, dec: alt }
    }

    /// True when both angles are finite and the declination lies within ±90°
    pub fn is_valid(&self) -> bool {
        self.ra.is_finite() && self.dec.is_finite() && self.dec.abs() <= 90.0
    }

    /// Unit vector with x toward (0, 0), y toward (90, 0) and z toward the pole
    pub fn to_unit_vector(&self) -> Vector3<f64> {
        let (sin_ra, cos_ra) = self.ra.to_radians().sin_cos();
        let (sin_dec, cos_dec) = self.dec.to_radians().sin_cos();
        Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
    }

    /// Inverse of [`SphericalCoord::to_unit_vector`]; the input need not be normalized
    pub fn from_vector(v: &Vector3<f64>) -> Self {
        let norm = v.norm();
        let dec = (v.z / norm).clamp(-1.0, 1.0).asin().to_degrees();
        let ra = v.y.atan2(v.x).to_degrees();
        Self { ra, dec }
    }
}

impl From<[f64; 2]> for SphericalCoord {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

/// Anything with a position on the sky.
pub trait SkyPosition {
    /// Right ascension in degrees
    fn ra(&self) -> f64;

    /// Declination in degrees
    fn dec(&self) -> f64;

    /// Position as a [`SphericalCoord`]
    fn coord(&self) -> SphericalCoord {
        SphericalCoord::new(self.ra(), self.dec())
    }
}

impl SkyPosition for SphericalCoord {
    fn ra(&self) -> f64 {
        self.ra
    }

    fn dec(&self) -> f64 {
        self.dec
    }
}

/// Angular distance between two coordinates in degrees (haversine formula).
pub fn angular_separation(a: &SphericalCoord, b: &SphericalCoord) -> f64 {
    let a_dec = a.dec.to_radians();
    let b_dec = b.dec.to_radians();
    let d_ra = (b.ra - a.ra).to_radians();
    let d_dec = b_dec - a_dec;

    let h = (d_dec / 2.0).sin().powi(2) + a_dec.cos() * b_dec.cos() * (d_ra / 2.0).sin().powi(2);
    (2.0 * h.sqrt().min(1.0).asin()).to_degrees()
}
