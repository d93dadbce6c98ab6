//! Persistent encoder configuration
//!
//! JSON snapshot of every control parameter. Missing fields fall back to the
//! encoder defaults, so hand-written files only need the values they change.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::direction::SourceDirection;
use crate::error::{EncoderError, EncoderResult};
use crate::hoa::{AmbisonicFormat, AmbisonicOrder, ChannelOrdering, Normalization};
use crate::params::ParamState;
use crate::presets::SourcePreset;
use crate::MAX_NUM_INPUTS;

/// Settings of one source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Azimuth in degrees, `+90` = left
    pub azimuth: f32,
    /// Elevation in degrees
    pub elevation: f32,
    /// Linear gain
    pub gain: f32,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            azimuth: 0.0,
            elevation: 0.0,
            gain: 1.0,
        }
    }
}

/// Encoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Preset applied first; `num_sources` and `sources` override it
    pub preset: Option<SourcePreset>,
    /// Active source count; defaults to the larger of the preset's count and
    /// the list length, or the current count when neither is given
    pub num_sources: Option<usize>,
    /// Per-source settings, slot order; slots not listed keep their values
    pub sources: Vec<SourceSettings>,
    /// Output order
    pub order: AmbisonicOrder,
    /// Output normalization
    pub normalization: Normalization,
    /// Output channel ordering
    pub ordering: ChannelOrdering,
    /// Scale weights by `1/sqrt(num_sources)`
    pub post_scaling: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            preset: None,
            num_sources: None,
            sources: Vec::new(),
            order: AmbisonicOrder::First,
            normalization: Normalization::SN3D,
            ordering: ChannelOrdering::ACN,
            post_scaling: true,
        }
    }
}

impl EncoderConfig {
    /// Parse from JSON
    pub fn from_json(json: &str) -> EncoderResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> EncoderResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a JSON file
    pub fn load_from<P: AsRef<Path>>(path: P) -> EncoderResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&content)?;
        log::debug!("[AmbiEnc] Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Save to a JSON file, creating parent directories
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> EncoderResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Capture the active part of a parameter state
    pub(crate) fn from_state(state: &ParamState) -> Self {
        Self {
            preset: None,
            num_sources: Some(state.num_sources),
            sources: state.sources[..state.num_sources]
                .iter()
                .map(|slot| SourceSettings {
                    azimuth: slot.direction.azimuth,
                    elevation: slot.direction.elevation,
                    gain: slot.gain,
                })
                .collect(),
            order: state.order,
            normalization: state.format.normalization,
            ordering: state.format.ordering,
            post_scaling: state.post_scaling,
        }
    }

    /// Write into `state`, validating everything first
    pub(crate) fn apply_to(&self, state: &mut ParamState) -> EncoderResult<()> {
        let format = AmbisonicFormat {
            normalization: self.normalization,
            ordering: self.ordering,
        };
        format.validate(self.order)?;

        if self.sources.len() > MAX_NUM_INPUTS {
            return Err(EncoderError::InvalidSourceCount {
                got: self.sources.len(),
                max: MAX_NUM_INPUTS,
            });
        }

        let mut next = *state;
        let mut num_sources = if self.sources.is_empty() {
            state.num_sources
        } else {
            self.sources.len()
        };
        if let Some(preset) = self.preset {
            let loaded = preset.load();
            for (slot, direction) in next.sources.iter_mut().zip(loaded.directions) {
                slot.direction = direction;
            }
            num_sources = self.sources.len().max(loaded.num_sources);
        }

        for (slot, settings) in next.sources.iter_mut().zip(&self.sources) {
            if !settings.gain.is_finite() || settings.gain < 0.0 {
                return Err(EncoderError::InvalidGain(settings.gain));
            }
            slot.direction = SourceDirection::sanitized(settings.azimuth, settings.elevation)?;
            slot.gain = settings.gain;
        }

        let num_sources = self.num_sources.unwrap_or(num_sources);
        if num_sources > MAX_NUM_INPUTS {
            return Err(EncoderError::InvalidSourceCount {
                got: num_sources,
                max: MAX_NUM_INPUTS,
            });
        }

        next.num_sources = num_sources;
        next.order = self.order;
        next.format = format;
        next.post_scaling = self.post_scaling;
        *state = next;
        Ok(())
    }
}
