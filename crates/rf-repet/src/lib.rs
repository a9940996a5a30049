//! FluxForge REPET - REpeating Pattern Extraction Technique
//!
//! Separates the repeating background of a mixture (loops, accompaniment)
//! from its non-repeating foreground (typically vocals), using nothing but
//! the signal's own self-similarity.
//!
//! ## Pipeline
//! - Short-time transform with a periodic Hamming window, 50% overlap
//! - Beat spectrum from per-bin autocorrelation of the power spectrogram
//! - Repeating period picked from the beat spectrum
//! - Median repeating segment turned into a soft time-frequency mask
//! - Low-frequency pass-through, mirrored mask, overlap-add resynthesis
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rf_repet::{AudioSignal, BackgroundSeparator, Repet, RepetConfig};
//!
//! let signal = AudioSignal::from_interleaved_f32(&samples, 2, 44100)?;
//! let repet = Repet::new(RepetConfig::default())?;
//! let separation = repet.separate(&signal)?;
//!
//! let accompaniment = separation.background.to_interleaved_f32();
//! let vocals = separation.foreground.to_interleaved_f32();
//! ```

#![warn(missing_docs)]

pub mod beat;
pub mod config;
pub mod mask;
pub mod repet;
pub mod signal;
pub mod stft;
pub mod window;

mod error;

pub use beat::PeriodEstimate;
pub use config::{PeriodRangeSeconds, RepetConfig};
pub use error::{RepetError, RepetResult};
pub use repet::Repet;
pub use signal::{AudioSignal, Separation};
pub use stft::Stft;
pub use window::AnalysisWindow;

/// Two-way background / foreground separator
pub trait BackgroundSeparator: Send + Sync {
    /// Repeating background, same length and channel count as `signal`
    fn separate_background(&self, signal: &AudioSignal) -> RepetResult<AudioSignal>;

    /// Background plus the foreground left over (`signal - background`)
    fn separate(&self, signal: &AudioSignal) -> RepetResult<Separation> {
        let background = self.separate_background(signal)?;
        let foreground = signal.subtract(&background)?;
        Ok(Separation {
            background,
            foreground,
        })
    }

    /// Separator name
    fn name(&self) -> &str;
}

/// Separate the repeating background with default settings.
///
/// `period_range` overrides the default search range of
/// `[1, min(10, duration / 3)]` seconds.
pub fn separate_background(
    signal: &AudioSignal,
    period_range: Option<PeriodRangeSeconds>,
) -> RepetResult<AudioSignal> {
    let config = RepetConfig {
        period_range,
        ..Default::default()
    };
    Repet::new(config)?.separate_background(signal)
}
