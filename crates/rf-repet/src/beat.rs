//! Beat spectrum and repeating period estimation
//!
//! The beat spectrum is the mean, across frequency bins, of each bin's
//! unbiased autocorrelation over time. Autocorrelation goes through the
//! power-spectrum identity: zero-pad to twice the length, take |FFT|²,
//! inverse-transform and keep the first half.

use std::ops::RangeInclusive;

use ndarray::{ArrayView1, ArrayView2, Axis};
use num_complex::Complex64;
use realfft::RealFftPlanner;

use crate::config::PeriodRangeSeconds;
use crate::error::{RepetError, RepetResult};
use crate::window::AnalysisWindow;

/// Result of the period search
#[derive(Debug, Clone)]
pub struct PeriodEstimate {
    /// Repeating period (analysis frames)
    pub period_frames: usize,
    /// Repeating period (seconds)
    pub period_seconds: f64,
    /// Lags that were searched, after clamping
    pub search_range: RangeInclusive<usize>,
    /// Beat spectrum indexed by lag (lag 0 = total energy)
    pub beat_spectrum: Vec<f64>,
}

/// Unbiased autocorrelation of each row of `data`, returned row by row.
///
/// Lag `k` of a series of length `n` is divided by `n - k`.
fn autocorrelate_rows(data: ArrayView2<'_, f64>) -> RepetResult<Vec<Vec<f64>>> {
    let (n_rows, n) = data.dim();
    if n == 0 {
        return Ok(vec![Vec::new(); n_rows]);
    }

    let fft_len = 2 * n;
    let mut planner = RealFftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let mut input = forward.make_input_vec();
    let mut spectrum = forward.make_output_vec();
    let mut output = inverse.make_output_vec();
    let norm = 1.0 / fft_len as f64;

    let mut rows = Vec::with_capacity(n_rows);
    for row in data.rows() {
        input[..n].iter_mut().zip(row).for_each(|(dst, &src)| *dst = src);
        input[n..].fill(0.0);

        forward
            .process(&mut input, &mut spectrum)
            .map_err(|e| RepetError::Fft(e.to_string()))?;

        // Power spectral density
        for bin in spectrum.iter_mut() {
            *bin = Complex64::new(bin.norm_sqr(), 0.0);
        }

        inverse
            .process(&mut spectrum, &mut output)
            .map_err(|e| RepetError::Fft(e.to_string()))?;

        rows.push(
            output[..n]
                .iter()
                .enumerate()
                .map(|(lag, &value)| value * norm / (n - lag) as f64)
                .collect(),
        );
    }

    Ok(rows)
}

/// Unbiased autocorrelation of a single series
pub fn autocorrelation(series: &[f64]) -> RepetResult<Vec<f64>> {
    let view = ArrayView1::from(series).insert_axis(Axis(0));
    Ok(autocorrelate_rows(view)?.pop().unwrap_or_default())
}

/// Beat spectrum of a `[bin, frame]` spectrogram, one value per lag
pub fn beat_spectrum(spectrogram: ArrayView2<'_, f64>) -> RepetResult<Vec<f64>> {
    let (n_bins, n_frames) = spectrogram.dim();
    let mut beat = vec![0.0f64; n_frames];
    if n_bins == 0 {
        return Ok(beat);
    }

    for row in autocorrelate_rows(spectrogram)? {
        for (acc, value) in beat.iter_mut().zip(row) {
            *acc += value;
        }
    }

    // Round-off can push near-zero lags slightly negative
    let scale = 1.0 / n_bins as f64;
    for value in &mut beat {
        *value = (*value * scale).max(0.0);
    }

    Ok(beat)
}

/// Lags searched for a period in `range`, for a signal of `n_frames` frames.
///
/// Needs only the frame count, so an impossible range is rejected before any
/// spectrogram is computed. Lag 0 is excluded and the upper bound is clamped
/// to `n_frames / 3`.
pub fn lag_range(
    range: &PeriodRangeSeconds,
    sample_rate: u32,
    window: &AnalysisWindow,
    n_frames: usize,
) -> RepetResult<RangeInclusive<usize>> {
    let min = seconds_to_frames(range.min, sample_rate, window).max(1);
    let max = seconds_to_frames(range.max, sample_rate, window).min(n_frames / 3);
    if min > max {
        return Err(RepetError::EmptyPeriodRange { min, max });
    }
    Ok(min..=max)
}

/// Lag with the highest beat spectrum value within `lags`.
///
/// Lag 0 is never considered and the upper bound is clamped to a third of
/// the beat spectrum length so at least three repetitions fit in the signal.
pub fn select_period(beat: &[f64], lags: RangeInclusive<usize>) -> RepetResult<usize> {
    let min = (*lags.start()).max(1);
    let max = (*lags.end()).min(beat.len() / 3);
    if min > max {
        return Err(RepetError::EmptyPeriodRange { min, max });
    }

    let mut best = min;
    for lag in min + 1..=max {
        if beat[lag] > beat[best] {
            best = lag;
        }
    }

    Ok(best)
}

/// Convert a duration in seconds to analysis frames.
///
/// Compensates for the `window - hop` samples of front padding added by the
/// transform, rounding half up.
pub fn seconds_to_frames(seconds: f64, sample_rate: u32, window: &AnalysisWindow) -> usize {
    let hop = window.hop() as f64;
    let padding = (window.len() - window.hop()) as f64;
    let frames = ((seconds * sample_rate as f64 + padding) / hop - 0.5).ceil();
    frames.max(0.0) as usize
}

/// Convert analysis frames to seconds
pub fn frames_to_seconds(frames: usize, sample_rate: u32, window: &AnalysisWindow) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 * window.hop() as f64 / sample_rate as f64
}
