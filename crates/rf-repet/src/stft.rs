//! Short-time Fourier transform with constant-overlap-add synthesis
//!
//! Frames are laid out as `[bin, frame]` with the full, mirrored spectrum
//! (`window length` bins). The signal is zero-padded by `len - hop` samples
//! at the front so the first window is centered on the first sample, and at
//! the back so every frame is complete.

use std::sync::Arc;

use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::error::{RepetError, RepetResult};
use crate::window::AnalysisWindow;

/// Forward / inverse short-time transform
pub struct Stft {
    /// Analysis window
    window: AnalysisWindow,
    /// Forward FFT
    fft_forward: Arc<dyn Fft<f64>>,
    /// Inverse FFT
    fft_inverse: Arc<dyn Fft<f64>>,
}

impl Stft {
    /// Create transform for `window`
    pub fn new(window: AnalysisWindow) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let fft_forward = planner.plan_fft_forward(window.len());
        let fft_inverse = planner.plan_fft_inverse(window.len());

        Self {
            window,
            fft_forward,
            fft_inverse,
        }
    }

    /// Analysis window
    pub fn window(&self) -> &AnalysisWindow {
        &self.window
    }

    /// Front padding added before the first sample
    fn padding(&self) -> usize {
        self.window.len() - self.window.hop()
    }

    /// Frame count for a signal of `num_samples`
    pub fn num_frames(&self, num_samples: usize) -> usize {
        (self.padding() + num_samples).div_ceil(self.window.hop())
    }

    /// Complex spectrogram `[window length, frames]` of `samples`
    pub fn analyze(&self, samples: &[f64]) -> Array2<Complex64> {
        let n_fft = self.window.len();
        let hop = self.window.hop();
        let padding = self.padding();
        let n_frames = self.num_frames(samples.len());

        let mut padded = vec![0.0f64; (n_frames - 1) * hop + n_fft];
        padded[padding..padding + samples.len()].copy_from_slice(samples);

        let mut spectrogram = Array2::<Complex64>::zeros((n_fft, n_frames));
        let mut buffer = vec![Complex64::new(0.0, 0.0); n_fft];
        let mut scratch =
            vec![Complex64::new(0.0, 0.0); self.fft_forward.get_inplace_scratch_len()];

        for frame_idx in 0..n_frames {
            let start = frame_idx * hop;

            // Apply window
            for ((bin, &sample), &w) in buffer
                .iter_mut()
                .zip(&padded[start..start + n_fft])
                .zip(self.window.coefficients())
            {
                *bin = Complex64::new(sample * w, 0.0);
            }

            self.fft_forward.process_with_scratch(&mut buffer, &mut scratch);

            for (bin, &val) in buffer.iter().enumerate() {
                spectrogram[[bin, frame_idx]] = val;
            }
        }

        spectrogram
    }

    /// Overlap-add resynthesis of a full-spectrum spectrogram.
    ///
    /// Only the real part of each inverse frame is kept. The result still
    /// carries any tail padding; callers truncate to their sample count.
    pub fn synthesize(&self, spectrogram: ArrayView2<'_, Complex64>) -> RepetResult<Vec<f64>> {
        let n_fft = self.window.len();
        let hop = self.window.hop();
        let padding = self.padding();

        let (n_bins, n_frames) = spectrogram.dim();
        if n_bins != n_fft {
            return Err(RepetError::ShapeMismatch {
                expected: n_fft,
                got: n_bins,
            });
        }
        if n_frames == 0 {
            return Ok(Vec::new());
        }

        let mut output = vec![0.0f64; (n_frames - 1) * hop + n_fft];
        let mut buffer = vec![Complex64::new(0.0, 0.0); n_fft];
        let mut scratch =
            vec![Complex64::new(0.0, 0.0); self.fft_inverse.get_inplace_scratch_len()];
        let norm = 1.0 / n_fft as f64;

        for frame_idx in 0..n_frames {
            for (bin, value) in buffer.iter_mut().enumerate() {
                *value = spectrogram[[bin, frame_idx]];
            }

            self.fft_inverse.process_with_scratch(&mut buffer, &mut scratch);

            // Overlap-add
            let start = frame_idx * hop;
            for (out, value) in output[start..start + n_fft].iter_mut().zip(&buffer) {
                *out += value.re * norm;
            }
        }

        // Strip front and back padding, undo overlap gain
        let gain = self.window.overlap_gain();
        let end = output.len() - padding;
        Ok(output[padding..end].iter().map(|s| s / gain).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_frame_count() {
        let stft = Stft::new(AnalysisWindow::hamming(64).unwrap());
        // ceil((64 - 32 + n) / 32)
        assert_eq!(stft.num_frames(0), 1);
        assert_eq!(stft.num_frames(1), 2);
        assert_eq!(stft.num_frames(32), 2);
        assert_eq!(stft.num_frames(33), 3);
        assert_eq!(stft.num_frames(1000), 33);

        let spectrogram = stft.analyze(&noise(1000, 1));
        assert_eq!(spectrogram.dim(), (64, 33));
    }

    #[test]
    fn test_perfect_reconstruction() {
        let stft = Stft::new(AnalysisWindow::hamming(64).unwrap());

        for &len in &[1usize, 31, 32, 1000, 1024] {
            let input = noise(len, len as u64 + 7);
            let spectrogram = stft.analyze(&input);
            let output = stft.synthesize(spectrogram.view()).unwrap();

            assert!(output.len() >= input.len());
            for (a, b) in input.iter().zip(&output) {
                assert!((a - b).abs() < 1e-10, "len {}: {} vs {}", len, a, b);
            }
        }
    }

    #[test]
    fn test_conjugate_symmetry() {
        let stft = Stft::new(AnalysisWindow::hamming(32).unwrap());
        let spectrogram = stft.analyze(&noise(200, 3));

        for frame in 0..spectrogram.ncols() {
            for bin in 1..32 {
                let a = spectrogram[[bin, frame]];
                let b = spectrogram[[32 - bin, frame]].conj();
                assert!((a - b).norm() < 1e-10);
            }
        }
    }

    #[test]
    fn test_sine_peak_bin() {
        let sample_rate = 8000.0;
        let stft = Stft::new(AnalysisWindow::hamming(256).unwrap());
        let input: Vec<f64> = (0..4000)
            .map(|i| (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / sample_rate).sin())
            .collect();

        let spectrogram = stft.analyze(&input);
        let frame = spectrogram.ncols() / 2;
        let peak_bin = (0..=128)
            .max_by(|&a, &b| {
                spectrogram[[a, frame]]
                    .norm()
                    .total_cmp(&spectrogram[[b, frame]].norm())
            })
            .unwrap();

        // 1 kHz at 8 kHz / 256 = 31.25 Hz per bin
        assert_eq!(peak_bin, 32);
    }

    #[test]
    fn test_synthesize_rejects_half_spectrum() {
        let stft = Stft::new(AnalysisWindow::hamming(64).unwrap());
        let half = Array2::<Complex64>::zeros((33, 10));
        assert!(matches!(
            stft.synthesize(half.view()),
            Err(RepetError::ShapeMismatch { expected: 64, got: 33 })
        ));
    }
}
