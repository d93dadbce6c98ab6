//! Higher-Order Ambisonics (HOA) basis functions
//!
//! Real spherical harmonics up to 10th order (121 channels):
//! - Evaluation: direction to N3D/ACN weight vector
//! - Format conversion: SN3D/N3D/FuMa normalization, ACN/FuMa ordering
//!
//! ## Usage
//!
//! ```rust
//! use rf_ambi_enc::hoa::{encoding_weights, AmbisonicFormat, AmbisonicOrder};
//! use rf_ambi_enc::SourceDirection;
//!
//! let weights = encoding_weights(
//!     SourceDirection::new(90.0, 0.0),
//!     AmbisonicOrder::First,
//!     AmbisonicFormat::ambix(),
//! );
//! assert!((weights.get(1) - 1.0).abs() < 1e-6); // Y points left
//! ```

mod format;

pub use format::{AmbisonicFormat, ChannelOrdering, Normalization};

use serde::{Deserialize, Serialize};

use crate::direction::SourceDirection;
use crate::error::{EncoderError, EncoderResult};
use crate::{MAX_NUM_SH_SIGNALS, MAX_ORDER};

/// Ambisonic order (determines spatial resolution)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum AmbisonicOrder {
    /// First order (4 channels) - basic 3D
    First = 1,
    /// Second order (9 channels)
    Second = 2,
    /// Third order (16 channels)
    Third = 3,
    /// Fourth order (25 channels)
    Fourth = 4,
    /// Fifth order (36 channels)
    Fifth = 5,
    /// Sixth order (49 channels)
    Sixth = 6,
    /// Seventh order (64 channels)
    Seventh = 7,
    /// Eighth order (81 channels)
    Eighth = 8,
    /// Ninth order (100 channels)
    Ninth = 9,
    /// Tenth order (121 channels) - maximum
    Tenth = 10,
}

impl AmbisonicOrder {
    /// Get channel count for this order
    pub fn channel_count(&self) -> usize {
        let n = *self as usize;
        (n + 1) * (n + 1)
    }

    /// Create from order number
    pub fn from_order(order: usize) -> EncoderResult<Self> {
        match order {
            1 => Ok(AmbisonicOrder::First),
            2 => Ok(AmbisonicOrder::Second),
            3 => Ok(AmbisonicOrder::Third),
            4 => Ok(AmbisonicOrder::Fourth),
            5 => Ok(AmbisonicOrder::Fifth),
            6 => Ok(AmbisonicOrder::Sixth),
            7 => Ok(AmbisonicOrder::Seventh),
            8 => Ok(AmbisonicOrder::Eighth),
            9 => Ok(AmbisonicOrder::Ninth),
            10 => Ok(AmbisonicOrder::Tenth),
            _ => Err(EncoderError::InvalidAmbisonicOrder {
                got: order,
                max: MAX_ORDER,
            }),
        }
    }

    /// Get order number
    pub fn as_usize(&self) -> usize {
        *self as usize
    }

    /// Every supported order, ascending
    pub fn all() -> impl Iterator<Item = AmbisonicOrder> {
        (1..=MAX_ORDER).filter_map(|n| Self::from_order(n).ok())
    }
}

impl Default for AmbisonicOrder {
    fn default() -> Self {
        AmbisonicOrder::First
    }
}

impl TryFrom<usize> for AmbisonicOrder {
    type Error = EncoderError;

    fn try_from(order: usize) -> EncoderResult<Self> {
        Self::from_order(order)
    }
}

impl From<AmbisonicOrder> for usize {
    fn from(order: AmbisonicOrder) -> usize {
        order.as_usize()
    }
}

/// Spherical harmonic coefficients in fixed-capacity storage
#[derive(Debug, Clone, Copy)]
pub struct SphericalHarmonics {
    coeffs: [f32; MAX_NUM_SH_SIGNALS],
    order: AmbisonicOrder,
}

impl SphericalHarmonics {
    /// Create from order, all coefficients zero
    pub fn new(order: AmbisonicOrder) -> Self {
        Self {
            coeffs: [0.0; MAX_NUM_SH_SIGNALS],
            order,
        }
    }

    /// N3D / ACN spherical harmonics for a direction
    pub fn from_direction(direction: SourceDirection, order: AmbisonicOrder) -> Self {
        let mut sh = Self::new(order);
        sh.compute_for_direction(direction);
        sh
    }

    /// Order these coefficients were computed for
    pub fn order(&self) -> AmbisonicOrder {
        self.order
    }

    /// Compute N3D / ACN coefficients for direction
    ///
    /// Real harmonics without the Condon-Shortley phase, so that channel 3 (X)
    /// is positive towards the front and channel 1 (Y) positive to the left.
    pub fn compute_for_direction(&mut self, direction: SourceDirection) {
        let n = self.order.as_usize();
        let az = (direction.azimuth as f64).to_radians();
        let el = (direction.elevation as f64).to_radians();

        // Legendre argument is cos(inclination) = sin(elevation)
        let x = el.sin();
        let s = el.cos().max(0.0);

        let mut p_mm = 1.0f64;
        for m in 0..=n {
            if m > 0 {
                p_mm *= (2 * m - 1) as f64 * s;
            }
            let (sin_m, cos_m) = (m as f64 * az).sin_cos();

            // P_l^m by upward recursion in l
            let mut p_l2 = 0.0f64;
            let mut p_l1 = 0.0f64;
            for l in m..=n {
                let p = if l == m {
                    p_mm
                } else {
                    ((2 * l - 1) as f64 * x * p_l1 - (l + m - 1) as f64 * p_l2) / (l - m) as f64
                };
                p_l2 = p_l1;
                p_l1 = p;

                let norm = n3d_factor(l, m);
                if m == 0 {
                    self.coeffs[acn_index(l as i32, 0)] = (norm * p) as f32;
                } else {
                    self.coeffs[acn_index(l as i32, m as i32)] = (norm * p * cos_m) as f32;
                    self.coeffs[acn_index(l as i32, -(m as i32))] = (norm * p * sin_m) as f32;
                }
            }
        }

        for c in &mut self.coeffs[self.order.channel_count()..] {
            *c = 0.0;
        }
    }

    /// Get channel by index
    pub fn get(&self, index: usize) -> f32 {
        self.as_slice().get(index).copied().unwrap_or(0.0)
    }

    /// Active coefficients, `(order + 1)^2` of them
    pub fn as_slice(&self) -> &[f32] {
        &self.coeffs[..self.order.channel_count()]
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        let n = self.order.channel_count();
        &mut self.coeffs[..n]
    }

    /// Scale all coefficients
    pub fn scale(&mut self, gain: f32) {
        for c in self.as_mut_slice() {
            *c *= gain;
        }
    }
}

/// Encoding weights for one source: N3D/ACN harmonics converted to `format`
///
/// Pure function of its arguments. The caller is responsible for `format`
/// being valid at `order` (see [`AmbisonicFormat::validate`]).
pub fn encoding_weights(
    direction: SourceDirection,
    order: AmbisonicOrder,
    format: AmbisonicFormat,
) -> SphericalHarmonics {
    let mut sh = SphericalHarmonics::from_direction(direction, order);
    format.apply_in_place(sh.as_mut_slice());
    sh
}

/// N3D factor `sqrt((2l+1)(2-δm)(l-m)!/(l+m)!)`
fn n3d_factor(l: usize, m: usize) -> f64 {
    let delta = if m == 0 { 1.0 } else { 2.0 };
    // (l-m)!/(l+m)! as a product over the non-cancelling terms
    let ratio: f64 = ((l - m + 1)..=(l + m)).map(|k| 1.0 / k as f64).product();
    ((2 * l + 1) as f64 * delta * ratio).sqrt()
}

/// ACN channel index from (order, degree)
pub fn acn_index(order: i32, degree: i32) -> usize {
    (order * order + order + degree) as usize
}

/// Get (order, degree) from ACN index
pub fn acn_to_order_degree(acn: usize) -> (i32, i32) {
    let order = (acn as f64).sqrt().floor() as i32;
    let degree = acn as i32 - order * order - order;
    (order, degree)
}
