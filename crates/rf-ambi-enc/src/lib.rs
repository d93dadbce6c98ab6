//! ReelForge Ambisonic Encoder
//!
//! Real-time encoding of mono point sources into Higher-Order Ambisonics:
//!
//! ## Engine
//! - Up to 64 sources, up to 10th order (121 channels)
//! - Fixed 64-sample processing frame behind FIFO staging
//! - Allocation-free, non-blocking audio path
//!
//! ## Parameter changes
//! - Direction, gain, source count, order, normalization, ordering
//! - Per-source dirty tracking, only changed columns are recomputed
//! - One-frame crossfade between old and new weights, no clicks
//!
//! ## Formats
//! - N3D / SN3D / FuMa normalization
//! - ACN / FuMa channel ordering
//!
//! ## Usage
//!
//! ```rust
//! use rf_ambi_enc::{AmbiEncoder, AmbisonicOrder, SourcePreset};
//!
//! let mut encoder = AmbiEncoder::new(48000).unwrap();
//! let control = encoder.control();
//! control.load_preset(SourcePreset::Stereo).unwrap();
//! control.set_order(AmbisonicOrder::Third).unwrap();
//!
//! let left = vec![0.0f32; 256];
//! let right = vec![0.0f32; 256];
//! let mut sh = vec![vec![0.0f32; 256]; control.num_sh_channels()];
//! let mut outputs: Vec<&mut [f32]> = sh.iter_mut().map(|ch| ch.as_mut_slice()).collect();
//!
//! encoder.process(&[&left[..], &right[..]], &mut outputs, 256).unwrap();
//! ```

pub mod config;
pub mod crossfade;
pub mod fifo;
pub mod hoa;
pub mod matrix;
pub mod params;
pub mod presets;

mod direction;
mod encoder;
mod error;

pub use config::{EncoderConfig, SourceSettings};
pub use direction::SourceDirection;
pub use encoder::AmbiEncoder;
pub use error::{EncoderError, EncoderResult};
pub use hoa::{AmbisonicFormat, AmbisonicOrder, ChannelOrdering, Normalization};
pub use params::{EncoderControl, ParamState, SlotState};
pub use presets::SourcePreset;

/// Processing frame length in samples
pub const FRAME_SIZE: usize = 64;

/// Highest supported Ambisonic order
pub const MAX_ORDER: usize = 10;

/// Source slot capacity
pub const MAX_NUM_INPUTS: usize = 64;

/// SH channel capacity, `(MAX_ORDER + 1)^2`
pub const MAX_NUM_SH_SIGNALS: usize = (MAX_ORDER + 1) * (MAX_ORDER + 1);
