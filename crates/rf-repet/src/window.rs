//! Analysis window for the short-time transform

use std::f64::consts::PI;

use crate::error::{RepetError, RepetResult};

/// Periodic Hamming window with half-length hop.
///
/// The window length is always even and the hop is exactly half of it, so
/// overlapping windows sum to a constant (see [`AnalysisWindow::overlap_gain`]).
#[derive(Debug, Clone)]
pub struct AnalysisWindow {
    /// Window coefficients
    coefficients: Vec<f64>,
    /// Hop between frames (samples)
    hop: usize,
}

impl AnalysisWindow {
    /// Create periodic Hamming window of `length` samples
    pub fn hamming(length: usize) -> RepetResult<Self> {
        if length < 2 || length % 2 != 0 {
            return Err(RepetError::InvalidConfig(format!(
                "window length must be even and at least 2, got {}",
                length
            )));
        }

        let coefficients = (0..length)
            .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / length as f64).cos())
            .collect();

        Ok(Self {
            coefficients,
            hop: length / 2,
        })
    }

    /// Window covering at least `duration` seconds, rounded up to a power of two
    pub fn for_duration(duration: f64, sample_rate: u32) -> RepetResult<Self> {
        if sample_rate == 0 {
            return Err(RepetError::InvalidSampleRate(sample_rate));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(RepetError::InvalidConfig(format!(
                "window duration must be positive, got {}",
                duration
            )));
        }

        let samples = (duration * sample_rate as f64).ceil() as usize;
        Self::hamming(samples.max(2).next_power_of_two())
    }

    /// Window length (samples)
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// Always false, windows hold at least two samples
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Hop length (samples)
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Window coefficients
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Sum of coefficients taken at hop stride; constant overlap-add gain
    pub fn overlap_gain(&self) -> f64 {
        self.coefficients.iter().step_by(self.hop).sum()
    }

    /// Frequency bin count of the non-mirrored half, DC and Nyquist included
    pub fn num_bins(&self) -> usize {
        self.len() / 2 + 1
    }
}
