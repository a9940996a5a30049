//! Original REPET: a single repeating period for the whole signal
//!
//! Per call:
//! 1. Window of ~40 ms (power of two), hop = half window
//! 2. Complex spectrogram per channel, magnitudes of the non-mirrored half
//! 3. Beat spectrum of the channel-averaged, squared magnitudes
//! 4. Repeating period within the configured range (clamped to a third of the signal)
//! 5. Per channel: median-based soft mask, low-frequency pass-through,
//!    mirror, apply, resynthesize, truncate

use ndarray::{Array2, Zip, s};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::beat::{self, PeriodEstimate};
use crate::config::RepetConfig;
use crate::error::{RepetError, RepetResult};
use crate::mask;
use crate::signal::AudioSignal;
use crate::stft::Stft;
use crate::window::AnalysisWindow;
use crate::BackgroundSeparator;

/// Spectrograms and period shared by every channel
struct SpectralAnalysis {
    /// Transform used for analysis and resynthesis
    stft: Stft,
    /// Full complex spectrogram per channel
    spectrograms: Vec<Array2<Complex64>>,
    /// Non-mirrored magnitude spectrogram per channel
    magnitudes: Vec<Array2<f64>>,
    /// Selected repeating period
    estimate: PeriodEstimate,
}

/// REPET background separator
#[derive(Debug, Clone)]
pub struct Repet {
    /// Configuration
    config: RepetConfig,
}

impl Repet {
    /// Create separator, validating `config`
    pub fn new(config: RepetConfig) -> RepetResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &RepetConfig {
        &self.config
    }

    /// Estimate the repeating period of `signal` without separating it
    pub fn estimate_period(&self, signal: &AudioSignal) -> RepetResult<PeriodEstimate> {
        Ok(self.analyze(signal)?.estimate)
    }

    fn validate_signal(&self, signal: &AudioSignal) -> RepetResult<()> {
        if signal.sample_rate() == 0 {
            return Err(RepetError::InvalidSampleRate(signal.sample_rate()));
        }
        if signal.num_channels() == 0 || signal.is_empty() {
            return Err(RepetError::EmptySignal);
        }
        Ok(())
    }

    fn analyze(&self, signal: &AudioSignal) -> RepetResult<SpectralAnalysis> {
        self.validate_signal(signal)?;

        let sample_rate = signal.sample_rate();
        let period_range = self.config.period_range_for(signal.duration());
        period_range.validate()?;

        let window = AnalysisWindow::for_duration(self.config.window_duration, sample_rate)?;
        let stft = Stft::new(window);
        let n_bins = stft.window().num_bins();
        let n_frames = stft.num_frames(signal.len());
        let lags = beat::lag_range(&period_range, sample_rate, stft.window(), n_frames)?;

        log::debug!(
            "REPET: {} ch, {} samples @ {} Hz, window {} / hop {}, {} frames",
            signal.num_channels(),
            signal.len(),
            sample_rate,
            stft.window().len(),
            stft.window().hop(),
            n_frames
        );
        log::debug!(
            "REPET: period range {:.3}..{:.3} s -> lags {}..={}",
            period_range.min,
            period_range.max,
            lags.start(),
            lags.end()
        );

        let spectrograms: Vec<Array2<Complex64>> = if self.config.parallel {
            signal.channels().par_iter().map(|ch| stft.analyze(ch)).collect()
        } else {
            signal.channels().iter().map(|ch| stft.analyze(ch)).collect()
        };

        let magnitudes: Vec<Array2<f64>> = spectrograms
            .iter()
            .map(|spec| spec.slice(s![..n_bins, ..]).mapv(|c| c.norm()))
            .collect();

        // Channel mean, squared
        let mut mean = Array2::<f64>::zeros((n_bins, n_frames));
        for magnitude in &magnitudes {
            mean += magnitude;
        }
        let scale = 1.0 / magnitudes.len() as f64;
        mean.mapv_inplace(|v| (v * scale).powi(2));

        let beat_spectrum = beat::beat_spectrum(mean.view())?;

        let period_frames = beat::select_period(&beat_spectrum, lags.clone())?;
        let period_seconds = beat::frames_to_seconds(period_frames, sample_rate, stft.window());

        log::debug!(
            "REPET: repeating period {} frames ({:.3} s)",
            period_frames,
            period_seconds
        );

        Ok(SpectralAnalysis {
            stft,
            spectrograms,
            magnitudes,
            estimate: PeriodEstimate {
                period_frames,
                period_seconds,
                search_range: lags,
                beat_spectrum,
            },
        })
    }

    /// Mask, resynthesize and truncate one channel
    fn background_channel(
        stft: &Stft,
        mut spectrogram: Array2<Complex64>,
        magnitude: &Array2<f64>,
        period: usize,
        cutoff_bins: usize,
        num_samples: usize,
    ) -> RepetResult<Vec<f64>> {
        let mut half_mask = mask::repeating_mask(magnitude.view(), period)?;
        mask::apply_low_frequency_passthrough(&mut half_mask, cutoff_bins);
        let full_mask = mask::mirror_mask(half_mask.view(), stft.window().len())?;

        Zip::from(&mut spectrogram)
            .and(&full_mask)
            .for_each(|bin, &gain| *bin *= gain);

        let mut background = stft.synthesize(spectrogram.view())?;
        background.truncate(num_samples);
        Ok(background)
    }
}

impl BackgroundSeparator for Repet {
    fn separate_background(&self, signal: &AudioSignal) -> RepetResult<AudioSignal> {
        let SpectralAnalysis {
            stft,
            spectrograms,
            magnitudes,
            estimate,
        } = self.analyze(signal)?;

        let period = estimate.period_frames;
        let cutoff_bins = mask::cutoff_bins(
            self.config.cutoff_frequency,
            stft.window().len(),
            signal.sample_rate(),
        );
        let num_samples = signal.len();

        let jobs: Vec<(Array2<Complex64>, Array2<f64>)> =
            spectrograms.into_iter().zip(magnitudes).collect();

        let channels: Vec<Vec<f64>> = if self.config.parallel {
            jobs.into_par_iter()
                .map(|(spectrogram, magnitude)| {
                    Self::background_channel(
                        &stft,
                        spectrogram,
                        &magnitude,
                        period,
                        cutoff_bins,
                        num_samples,
                    )
                })
                .collect::<RepetResult<_>>()?
        } else {
            jobs.into_iter()
                .map(|(spectrogram, magnitude)| {
                    Self::background_channel(
                        &stft,
                        spectrogram,
                        &magnitude,
                        period,
                        cutoff_bins,
                        num_samples,
                    )
                })
                .collect::<RepetResult<_>>()?
        };

        AudioSignal::new(channels, signal.sample_rate())
    }

    fn name(&self) -> &str {
        "REPET"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PeriodRangeSeconds;

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                (state >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
            })
            .collect()
    }

    /// 8 kHz signal repeating a 0.5 s noise pattern
    fn repeating_noise(seconds: f64) -> AudioSignal {
        let sample_rate = 8000;
        let pattern = noise(4000, 3);
        let extra = noise((seconds * sample_rate as f64) as usize, 99);
        let samples = extra
            .iter()
            .enumerate()
            .map(|(i, n)| pattern[i % pattern.len()] + 0.05 * n)
            .collect();
        AudioSignal::mono(samples, sample_rate)
    }

    fn config() -> RepetConfig {
        RepetConfig::default().with_period_range(0.25, 0.75)
    }

    #[test]
    fn test_separator_name() {
        let repet = Repet::new(RepetConfig::default()).unwrap();
        assert_eq!(repet.name(), "REPET");
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = RepetConfig::default().with_window_duration(-1.0);
        assert!(matches!(Repet::new(config), Err(RepetError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_sample_rate() {
        let repet = Repet::new(config()).unwrap();
        let signal = AudioSignal::mono(vec![0.0; 1000], 0);
        assert!(matches!(
            repet.separate_background(&signal),
            Err(RepetError::InvalidSampleRate(0))
        ));
    }

    #[test]
    fn test_rejects_empty_signal() {
        let repet = Repet::new(config()).unwrap();
        let signal = AudioSignal::mono(Vec::new(), 8000);
        assert!(matches!(
            repet.separate_background(&signal),
            Err(RepetError::EmptySignal)
        ));
    }

    #[test]
    fn test_short_signal_empty_range() {
        let repet = Repet::new(config()).unwrap();
        // 0.3 s = 11 frames at hop 256, cannot hold three 0.25 s periods
        let signal = AudioSignal::mono(noise(2400, 1), 8000);
        assert!(matches!(
            repet.separate_background(&signal),
            Err(RepetError::EmptyPeriodRange { min: 9, max: 3 })
        ));
        assert!(matches!(
            repet.estimate_period(&signal),
            Err(RepetError::EmptyPeriodRange { min: 9, max: 3 })
        ));
    }

    #[test]
    fn test_estimate_period() {
        let repet = Repet::new(config()).unwrap();
        let signal = repeating_noise(3.0);
        let estimate = repet.estimate_period(&signal).unwrap();

        // 0.5 s at 8 kHz with hop 256 = 15.6 frames
        assert!(
            (15..=16).contains(&estimate.period_frames),
            "period {} frames",
            estimate.period_frames
        );
        assert!((estimate.period_seconds - 0.5).abs() < 0.04);
        assert!(estimate.search_range.contains(&estimate.period_frames));
    }

    #[test]
    fn test_upper_bound_clamped_to_third() {
        let repet = Repet::new(RepetConfig::default().with_period_range(0.25, 100.0)).unwrap();
        let signal = repeating_noise(3.0);
        let estimate = repet.estimate_period(&signal).unwrap();

        let frames = estimate.beat_spectrum.len();
        assert_eq!(*estimate.search_range.end(), frames / 3);
    }

    #[test]
    fn test_output_shape() {
        let repet = Repet::new(config()).unwrap();
        let signal = repeating_noise(2.0);
        let background = repet.separate_background(&signal).unwrap();

        assert_eq!(background.len(), signal.len());
        assert_eq!(background.num_channels(), 1);
        assert_eq!(background.sample_rate(), 8000);
        assert!(background.channel(0).unwrap().iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let left = repeating_noise(2.0).into_channels().remove(0);
        let right: Vec<f64> = left.iter().map(|s| s * 0.5).collect();
        let signal = AudioSignal::new(vec![left, right], 8000).unwrap();

        let parallel = Repet::new(config().with_parallel(true)).unwrap();
        let sequential = Repet::new(config().with_parallel(false)).unwrap();

        let a = parallel.separate_background(&signal).unwrap();
        let b = sequential.separate_background(&signal).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_separate_sums_to_input() {
        let repet = Repet::new(config()).unwrap();
        let signal = repeating_noise(2.0);
        let separation = repet.separate(&signal).unwrap();

        let input = signal.channel(0).unwrap();
        let background = separation.background.channel(0).unwrap();
        let foreground = separation.foreground.channel(0).unwrap();
        for i in 0..input.len() {
            assert!((background[i] + foreground[i] - input[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_explicit_range_respected() {
        let config = RepetConfig {
            period_range: Some(PeriodRangeSeconds::new(0.25, 0.4)),
            ..Default::default()
        };
        let repet = Repet::new(config).unwrap();
        let estimate = repet.estimate_period(&repeating_noise(3.0)).unwrap();
        // True period is outside the range; result stays inside it
        assert!(estimate.search_range.contains(&estimate.period_frames));
        assert!(estimate.period_frames < 15);
    }
}
