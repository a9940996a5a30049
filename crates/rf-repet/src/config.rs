//! Separation configuration

use serde::{Deserialize, Serialize};

use crate::error::{RepetError, RepetResult};

/// Repeating period search range, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodRangeSeconds {
    /// Shortest period considered
    pub min: f64,
    /// Longest period considered
    pub max: f64,
}

impl PeriodRangeSeconds {
    /// Create new range
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check bounds are finite, non-negative and ordered
    pub fn validate(&self) -> RepetResult<()> {
        let ordered = self.min.is_finite()
            && self.max.is_finite()
            && self.min >= 0.0
            && self.min <= self.max;
        if ordered {
            Ok(())
        } else {
            Err(RepetError::InvalidPeriodRange {
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// REPET configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepetConfig {
    /// Analysis window duration (seconds), rounded up to a power-of-two length
    pub window_duration: f64,

    /// Below this frequency (Hz) everything is treated as background
    pub cutoff_frequency: f64,

    /// Explicit period search range; derived from signal duration when `None`
    pub period_range: Option<PeriodRangeSeconds>,

    /// Lower bound of the derived period range (seconds)
    pub default_min_period: f64,

    /// Upper bound of the derived period range (seconds), further limited to a third of the signal
    pub default_max_period: f64,

    /// Mask and resynthesize channels on the rayon pool
    pub parallel: bool,
}

impl Default for RepetConfig {
    fn default() -> Self {
        Self {
            window_duration: 0.040,
            cutoff_frequency: 100.0,
            period_range: None,
            default_min_period: 1.0,
            default_max_period: 10.0,
            parallel: true,
        }
    }
}

impl RepetConfig {
    /// Set explicit period range (seconds)
    pub fn with_period_range(mut self, min: f64, max: f64) -> Self {
        self.period_range = Some(PeriodRangeSeconds::new(min, max));
        self
    }

    /// Set low-frequency cutoff (Hz)
    pub fn with_cutoff_frequency(mut self, hz: f64) -> Self {
        self.cutoff_frequency = hz;
        self
    }

    /// Set analysis window duration (seconds)
    pub fn with_window_duration(mut self, seconds: f64) -> Self {
        self.window_duration = seconds;
        self
    }

    /// Enable or disable per-channel parallelism
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check configuration values
    pub fn validate(&self) -> RepetResult<()> {
        if !self.window_duration.is_finite() || self.window_duration <= 0.0 {
            return Err(RepetError::InvalidConfig(format!(
                "window duration must be positive, got {}",
                self.window_duration
            )));
        }

        if !self.cutoff_frequency.is_finite() || self.cutoff_frequency < 0.0 {
            return Err(RepetError::InvalidConfig(format!(
                "cutoff frequency must be non-negative, got {}",
                self.cutoff_frequency
            )));
        }

        PeriodRangeSeconds::new(self.default_min_period, self.default_max_period).validate()?;

        if let Some(range) = &self.period_range {
            range.validate()?;
        }

        Ok(())
    }

    /// Period range to search for a signal of `duration` seconds
    pub fn period_range_for(&self, duration: f64) -> PeriodRangeSeconds {
        self.period_range.unwrap_or_else(|| {
            PeriodRangeSeconds::new(
                self.default_min_period,
                self.default_max_period.min(duration / 3.0),
            )
        })
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> RepetResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| RepetError::InvalidConfig(e.to_string()))
    }

    /// Parse from JSON and validate
    pub fn from_json(json: &str) -> RepetResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RepetError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
