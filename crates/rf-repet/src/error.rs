//! Error types for repeating-pattern separation

use thiserror::Error;

/// Separation error types
#[derive(Error, Debug)]
pub enum RepetError {
    /// Sample rate must be positive
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    /// Signal has no channels or no samples
    #[error("Signal is empty")]
    EmptySignal,

    /// Channels of different lengths
    #[error("Channel length mismatch: expected {expected}, got {got}")]
    ChannelMismatch { expected: usize, got: usize },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Period range in seconds is malformed
    #[error("Invalid period range: {min}s to {max}s")]
    InvalidPeriodRange { min: f64, max: f64 },

    /// Lag search range is empty after clamping to the signal length
    #[error("Empty period search range: lags {min}..={max} (signal too short)")]
    EmptyPeriodRange { min: usize, max: usize },

    /// Repeating period unusable for the given spectrogram
    #[error("Invalid repeating period: {period} frames for a {frames}-frame spectrogram")]
    InvalidPeriod { period: usize, frames: usize },

    /// Spectrogram does not carry the full mirrored spectrum
    #[error("Spectrogram shape mismatch: expected {expected} bins, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// FFT backend failure
    #[error("FFT error: {0}")]
    Fft(String),
}

/// Result type for separation operations
pub type RepetResult<T> = Result<T, RepetError>;
