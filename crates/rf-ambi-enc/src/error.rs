//! Error types for Ambisonic encoding

use thiserror::Error;

/// Encoder error types
#[derive(Error, Debug)]
pub enum EncoderError {
    /// Source count outside `[0, max]`
    #[error("Invalid source count: {got} (max supported: {max})")]
    InvalidSourceCount { got: usize, max: usize },

    /// Source slot outside the fixed capacity
    #[error("Source index out of range: {index} (capacity: {capacity})")]
    SourceIndexOutOfRange { index: usize, capacity: usize },

    /// Invalid Ambisonic order
    #[error("Invalid Ambisonic order: {got} (supported: 1..={max})")]
    InvalidAmbisonicOrder { got: usize, max: usize },

    /// Non-finite direction
    #[error("Invalid direction: azimuth {azimuth}, elevation {elevation}")]
    InvalidDirection { azimuth: f32, elevation: f32 },

    /// Negative or non-finite source gain
    #[error("Invalid gain: {0}")]
    InvalidGain(f32),

    /// Ordering/normalization not defined at the requested order
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Sample rate must be positive
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// Buffer size mismatch
    #[error("Buffer size mismatch: expected {expected}, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },

    /// Configuration (de)serialization error
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for encoder operations
pub type EncoderResult<T> = Result<T, EncoderError>;
