//! Tolerance classification of unit weights.
//!
//! With `t = ratio * nominal` the real line is partitioned into three bands
//! with inclusive edges:
//!
//! - within: `[nominal - t, nominal + t]`
//! - alert:  `[nominal - 2t, nominal - t)` and `(nominal + t, nominal + 2t]`
//! - out:    everything else
//!
//! A non-positive or non-finite nominal weight classifies every sample as out.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Within,
    Alert,
    Out,
}

/// Tolerance band expressed as a fraction of the nominal weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceBand {
    ratio: f64,
}

impl Default for ToleranceBand {
    fn default() -> Self {
        Self {
            ratio: Self::DEFAULT_RATIO,
        }
    }
}

impl ToleranceBand {
    /// 2% of nominal.
    pub const DEFAULT_RATIO: f64 = 0.02;

    /// Non-finite or negative ratios fall back to the default.
    pub fn new(ratio: f64) -> Self {
        if ratio.is_finite() && ratio >= 0.0 {
            Self { ratio }
        } else {
            Self::default()
        }
    }

    #[inline]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Limits of the `within` band, or `None` for an unusable nominal weight.
    pub fn bounds(&self, nominal: f64) -> Option<(f64, f64)> {
        if !(nominal.is_finite() && nominal > 0.0) {
            return None;
        }
        let t = nominal * self.ratio;
        Some((nominal - t, nominal + t))
    }

    pub fn classify(&self, sample: f64, nominal: f64) -> Classification {
        if !(nominal.is_finite() && nominal > 0.0) || !sample.is_finite() {
            return Classification::Out;
        }
        let t = nominal * self.ratio;
        if nominal - t <= sample && sample <= nominal + t {
            Classification::Within
        } else if nominal - 2.0 * t <= sample && sample <= nominal + 2.0 * t {
            Classification::Alert
        } else {
            Classification::Out
        }
    }
}

/// Classify against the default 2% band.
#[inline]
pub fn classify(sample: f64, nominal: f64) -> Classification {
    ToleranceBand::default().classify(sample, nominal)
}
