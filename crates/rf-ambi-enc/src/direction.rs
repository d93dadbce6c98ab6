//! Source direction type

use serde::{Deserialize, Serialize};

use crate::error::{EncoderError, EncoderResult};

/// Direction of a point source on the unit sphere
///
/// Azimuth is measured anticlockwise from the front (`+90` = left), elevation
/// upwards from the horizontal plane. Both in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceDirection {
    /// Horizontal angle in degrees (-180 to 180)
    pub azimuth: f32,
    /// Vertical angle in degrees (-90 to 90)
    pub elevation: f32,
}

impl SourceDirection {
    /// Create new direction, stored as given
    pub const fn new(azimuth: f32, elevation: f32) -> Self {
        Self { azimuth, elevation }
    }

    /// Front, on the horizontal plane
    pub const fn front() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Validate and bring into range: azimuth wrapped to `[-180, 180]`,
    /// elevation clamped to `[-90, 90]`
    pub fn sanitized(azimuth: f32, elevation: f32) -> EncoderResult<Self> {
        if !azimuth.is_finite() || !elevation.is_finite() {
            return Err(EncoderError::InvalidDirection { azimuth, elevation });
        }
        Ok(Self::new(wrap_azimuth(azimuth), elevation.clamp(-90.0, 90.0)))
    }

    /// Build from a unit vector (x = front, y = left, z = up)
    pub fn from_unit_vector(x: f64, y: f64, z: f64) -> Self {
        let r = (x * x + y * y + z * z).sqrt();
        if r < 1e-12 {
            return Self::front();
        }
        let azimuth = y.atan2(x).to_degrees();
        let elevation = (z / r).clamp(-1.0, 1.0).asin().to_degrees();
        Self::new(azimuth as f32, elevation as f32)
    }

    /// Unit vector (x = front, y = left, z = up)
    pub fn to_unit_vector(&self) -> [f64; 3] {
        let az = (self.azimuth as f64).to_radians();
        let el = (self.elevation as f64).to_radians();
        [el.cos() * az.cos(), el.cos() * az.sin(), el.sin()]
    }
}

/// Wrap an azimuth into `[-180, 180]`
fn wrap_azimuth(azimuth: f32) -> f32 {
    if (-180.0..=180.0).contains(&azimuth) {
        return azimuth;
    }
    let wrapped = (azimuth + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can land exactly on 360 for tiny negative inputs
    wrapped.clamp(-180.0, 180.0)
}
