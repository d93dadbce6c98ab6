//! Ambisonic format conversion - normalization and channel ordering

use serde::{Deserialize, Serialize};

use super::{acn_to_order_degree, AmbisonicOrder};
use crate::error::{EncoderError, EncoderResult};

/// Normalization scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Normalization {
    /// N3D (fully normalized)
    N3D,
    /// SN3D (Schmidt semi-normalized) - AmbiX standard
    #[default]
    SN3D,
    /// FuMa (Furse-Malham) - legacy, first order only
    FuMa,
}

/// Channel ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChannelOrdering {
    /// ACN (Ambisonic Channel Number) - AmbiX standard
    #[default]
    ACN,
    /// FuMa ordering (W, X, Y, Z) - legacy, first order only
    FuMa,
}

/// FuMa channel slot -> ACN index, first order
const FUMA_TO_ACN: [usize; 4] = [0, 3, 1, 2];

impl Normalization {
    /// Whether this scheme is defined at `order`
    pub fn supports(&self, order: AmbisonicOrder) -> bool {
        !matches!(self, Normalization::FuMa) || order == AmbisonicOrder::First
    }

    /// Gain converting an N3D coefficient of ACN index `acn` to this scheme
    pub fn gain_from_n3d(&self, acn: usize) -> f32 {
        let (l, _m) = acn_to_order_degree(acn);
        match self {
            Normalization::N3D => 1.0,
            Normalization::SN3D => 1.0 / ((2 * l + 1) as f32).sqrt(),
            Normalization::FuMa => {
                let sn3d = 1.0 / ((2 * l + 1) as f32).sqrt();
                if acn == 0 {
                    sn3d * std::f32::consts::FRAC_1_SQRT_2
                } else {
                    sn3d
                }
            }
        }
    }
}

impl ChannelOrdering {
    /// Whether this ordering is defined at `order`
    pub fn supports(&self, order: AmbisonicOrder) -> bool {
        !matches!(self, ChannelOrdering::FuMa) || order == AmbisonicOrder::First
    }

    /// ACN index carried by output channel `channel`
    pub fn acn_for_channel(&self, channel: usize) -> usize {
        match self {
            ChannelOrdering::ACN => channel,
            ChannelOrdering::FuMa => FUMA_TO_ACN.get(channel).copied().unwrap_or(channel),
        }
    }
}

/// Complete Ambisonic format specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AmbisonicFormat {
    /// Normalization scheme
    pub normalization: Normalization,
    /// Channel ordering
    pub ordering: ChannelOrdering,
}

impl AmbisonicFormat {
    /// AmbiX format (ACN + SN3D) - modern standard
    pub fn ambix() -> Self {
        Self {
            normalization: Normalization::SN3D,
            ordering: ChannelOrdering::ACN,
        }
    }

    /// FuMa format (legacy)
    pub fn fuma() -> Self {
        Self {
            normalization: Normalization::FuMa,
            ordering: ChannelOrdering::FuMa,
        }
    }

    /// N3D + ACN (common in research)
    pub fn n3d_acn() -> Self {
        Self {
            normalization: Normalization::N3D,
            ordering: ChannelOrdering::ACN,
        }
    }

    /// Reject combinations not defined at `order`
    pub fn validate(&self, order: AmbisonicOrder) -> EncoderResult<()> {
        if !self.normalization.supports(order) {
            return Err(EncoderError::UnsupportedFormat(format!(
                "{:?} normalization requires first order, got order {}",
                self.normalization,
                order.as_usize()
            )));
        }
        if !self.ordering.supports(order) {
            return Err(EncoderError::UnsupportedFormat(format!(
                "{:?} ordering requires first order, got order {}",
                self.ordering,
                order.as_usize()
            )));
        }
        Ok(())
    }

    /// Convert N3D/ACN coefficients to this format in place
    pub fn apply_in_place(&self, coeffs: &mut [f32]) {
        if self.normalization != Normalization::N3D {
            for (acn, c) in coeffs.iter_mut().enumerate() {
                *c *= self.normalization.gain_from_n3d(acn);
            }
        }

        if self.ordering == ChannelOrdering::FuMa && coeffs.len() >= FUMA_TO_ACN.len() {
            let acn = [coeffs[0], coeffs[1], coeffs[2], coeffs[3]];
            for (channel, c) in coeffs[..FUMA_TO_ACN.len()].iter_mut().enumerate() {
                *c = acn[self.ordering.acn_for_channel(channel)];
            }
        }
    }
}

impl Default for AmbisonicFormat {
    fn default() -> Self {
        Self::ambix()
    }
}
