//! Planar multichannel sample buffers

use crate::error::{RepetError, RepetResult};

/// Multichannel audio signal, one sample vector per channel
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    /// Per-channel samples, all of equal length
    channels: Vec<Vec<f64>>,
    /// Sample rate (Hz)
    sample_rate: u32,
}

impl AudioSignal {
    /// Create from per-channel sample vectors
    pub fn new(channels: Vec<Vec<f64>>, sample_rate: u32) -> RepetResult<Self> {
        let expected = channels.first().map(|c| c.len()).unwrap_or(0);
        if let Some(bad) = channels.iter().find(|c| c.len() != expected) {
            return Err(RepetError::ChannelMismatch {
                expected,
                got: bad.len(),
            });
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create single-channel signal
    pub fn mono(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            channels: vec![samples],
            sample_rate,
        }
    }

    /// Deinterleave `[l0, r0, l1, r1, ..]` style buffers
    pub fn from_interleaved(
        data: &[f64],
        num_channels: usize,
        sample_rate: u32,
    ) -> RepetResult<Self> {
        if num_channels == 0 {
            return Err(RepetError::EmptySignal);
        }
        if data.len() % num_channels != 0 {
            return Err(RepetError::ChannelMismatch {
                expected: data.len() / num_channels * num_channels,
                got: data.len(),
            });
        }

        let samples = data.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(samples); num_channels];

        for frame in data.chunks_exact(num_channels) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Deinterleave 32-bit float buffers
    pub fn from_interleaved_f32(
        data: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> RepetResult<Self> {
        let widened: Vec<f64> = data.iter().map(|&s| s as f64).collect();
        Self::from_interleaved(&widened, num_channels, sample_rate)
    }

    /// Interleave channels into a single buffer
    pub fn to_interleaved(&self) -> Vec<f64> {
        let mut data = Vec::with_capacity(self.len() * self.num_channels());
        for i in 0..self.len() {
            for channel in &self.channels {
                data.push(channel[i]);
            }
        }
        data
    }

    /// Interleave channels into a 32-bit float buffer
    pub fn to_interleaved_f32(&self) -> Vec<f32> {
        self.to_interleaved().into_iter().map(|s| s as f32).collect()
    }

    /// Sample rate (Hz)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    /// No channels or no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Samples of one channel
    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.channels.get(index).map(|c| c.as_slice())
    }

    /// All channels
    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    /// Take ownership of channel data
    pub fn into_channels(self) -> Vec<Vec<f64>> {
        self.channels
    }

    /// Sample-wise difference `self - other`
    pub fn subtract(&self, other: &AudioSignal) -> RepetResult<AudioSignal> {
        if other.num_channels() != self.num_channels() {
            return Err(RepetError::ChannelMismatch {
                expected: self.num_channels(),
                got: other.num_channels(),
            });
        }
        if other.len() != self.len() {
            return Err(RepetError::ChannelMismatch {
                expected: self.len(),
                got: other.len(),
            });
        }

        let channels = self
            .channels
            .iter()
            .zip(&other.channels)
            .map(|(a, b)| a.iter().zip(b).map(|(x, y)| x - y).collect())
            .collect();

        Ok(AudioSignal {
            channels,
            sample_rate: self.sample_rate,
        })
    }
}

/// Two-way split of a mixture
#[derive(Debug, Clone)]
pub struct Separation {
    /// Repeating component
    pub background: AudioSignal,
    /// Non-repeating remainder (`input - background`)
    pub foreground: AudioSignal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_roundtrip() {
        let data = vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0];
        let signal = AudioSignal::from_interleaved(&data, 2, 44100).unwrap();

        assert_eq!(signal.num_channels(), 2);
        assert_eq!(signal.len(), 3);
        assert_eq!(signal.channel(0).unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(signal.channel(1).unwrap(), &[-1.0, -2.0, -3.0]);
        assert_eq!(signal.to_interleaved(), data);
    }

    #[test]
    fn test_interleaved_length_not_multiple() {
        let data = vec![0.0f32; 5];
        assert!(matches!(
            AudioSignal::from_interleaved_f32(&data, 2, 44100),
            Err(RepetError::ChannelMismatch { .. })
        ));
    }

    #[test]
    fn test_channel_length_mismatch() {
        let result = AudioSignal::new(vec![vec![0.0; 10], vec![0.0; 9]], 44100);
        assert!(matches!(
            result,
            Err(RepetError::ChannelMismatch { expected: 10, got: 9 })
        ));
    }

    #[test]
    fn test_duration() {
        let signal = AudioSignal::mono(vec![0.0; 22050], 44100);
        assert!((signal.duration() - 0.5).abs() < 1e-12);
        assert!(!signal.is_empty());
    }

    #[test]
    fn test_subtract() {
        let a = AudioSignal::mono(vec![1.0, 2.0, 3.0], 8000);
        let b = AudioSignal::mono(vec![0.5, 0.5, 0.5], 8000);
        let diff = a.subtract(&b).unwrap();
        assert_eq!(diff.channel(0).unwrap(), &[0.5, 1.5, 2.5]);

        let short = AudioSignal::mono(vec![0.0; 2], 8000);
        assert!(a.subtract(&short).is_err());
    }
}
