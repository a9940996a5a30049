//! Repeating spectrogram model and soft mask
//!
//! The magnitude spectrogram is cut into period-length segments. The last
//! segment may be short; its missing frames are simply not counted, so each
//! intra-segment position takes the median over the segments that reach it.

use ndarray::{Array2, ArrayView2, Axis, s};

use crate::error::{RepetError, RepetResult};

/// Stabilizer added to numerator and denominator of the mask ratio
pub const MASK_EPSILON: f64 = f64::EPSILON;

/// Median of a non-empty slice, averaging the two middle values for even counts
fn median(values: &mut [f64]) -> f64 {
    let n = values.len();
    let (lower, upper, _) = values.select_nth_unstable_by(n / 2, f64::total_cmp);
    let upper = *upper;

    if n % 2 == 1 {
        upper
    } else {
        let lower = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (lower + upper) / 2.0
    }
}

fn check_period(period: usize, frames: usize) -> RepetResult<()> {
    if period == 0 || period > frames {
        return Err(RepetError::InvalidPeriod { period, frames });
    }
    Ok(())
}

/// Per-bin median across period-length segments, shape `[bins, period]`
pub fn repeating_segment(
    spectrogram: ArrayView2<'_, f64>,
    period: usize,
) -> RepetResult<Array2<f64>> {
    let (n_bins, n_frames) = spectrogram.dim();
    check_period(period, n_frames)?;

    let mut segment = Array2::<f64>::zeros((n_bins, period));
    let mut values = Vec::with_capacity(n_frames.div_ceil(period));

    for (bin, row) in spectrogram.axis_iter(Axis(0)).enumerate() {
        for position in 0..period {
            values.clear();
            values.extend(row.iter().skip(position).step_by(period).copied());
            segment[[bin, position]] = median(&mut values);
        }
    }

    Ok(segment)
}

/// Soft mask of the repeating background, same shape as `spectrogram`.
///
/// Each cell is `(min(V, S) + eps) / (V + eps)` where `S` is the repeating
/// segment tiled over time, so values lie in `(0, 1]`.
pub fn repeating_mask(spectrogram: ArrayView2<'_, f64>, period: usize) -> RepetResult<Array2<f64>> {
    let segment = repeating_segment(spectrogram, period)?;

    Ok(Array2::from_shape_fn(spectrogram.dim(), |(bin, frame)| {
        let value = spectrogram[[bin, frame]];
        let repeating = value.min(segment[[bin, frame % period]]);
        (repeating + MASK_EPSILON) / (value + MASK_EPSILON)
    }))
}

/// Frequency bin count below `cutoff` Hz: `ceil(cutoff * (window - 1) / sample_rate)`
pub fn cutoff_bins(cutoff: f64, window_len: usize, sample_rate: u32) -> usize {
    if sample_rate == 0 || cutoff <= 0.0 {
        return 0;
    }
    (cutoff * (window_len - 1) as f64 / sample_rate as f64).ceil() as usize
}

/// Force bins `1..=cutoff_bins` to full background; DC is left as computed
pub fn apply_low_frequency_passthrough(mask: &mut Array2<f64>, cutoff_bins: usize) {
    let last = cutoff_bins.min(mask.nrows().saturating_sub(1));
    if last >= 1 {
        mask.slice_mut(s![1..=last, ..]).fill(1.0);
    }
}

/// Extend a `[window/2 + 1, frames]` mask to the full `window` bins.
///
/// Bins above Nyquist mirror the ones below it: `full[k] = half[window - k]`.
pub fn mirror_mask(half: ArrayView2<'_, f64>, window_len: usize) -> RepetResult<Array2<f64>> {
    let (n_bins, n_frames) = half.dim();
    if n_bins != window_len / 2 + 1 {
        return Err(RepetError::ShapeMismatch {
            expected: window_len / 2 + 1,
            got: n_bins,
        });
    }

    let mut full = Array2::<f64>::zeros((window_len, n_frames));
    full.slice_mut(s![..n_bins, ..]).assign(&half);
    for bin in n_bins..window_len {
        full.row_mut(bin).assign(&half.row(window_len - bin));
    }

    Ok(full)
}
