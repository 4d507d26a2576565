//! Running per-session tallies. Never evicts, unlike the sample buffer.

use serde::Serialize;

use crate::classifier::Classification;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassCounts {
    pub within: u64,
    pub alert: u64,
    pub out: u64,
}

impl ClassCounts {
    #[inline]
    pub fn total(&self) -> u64 {
        self.within + self.alert + self.out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsResult {
    pub counts: ClassCounts,
    /// `None` when nothing was recorded.
    pub weights: Option<WeightStats>,
}

#[derive(Debug, Clone)]
pub struct MetricsAccumulator {
    counts: ClassCounts,
    sum_kg: f64,
    min_kg: f64,
    max_kg: f64,
}

impl Default for MetricsAccumulator {
    fn default() -> Self {
        Self {
            counts: ClassCounts::default(),
            sum_kg: 0.0,
            min_kg: f64::INFINITY,
            max_kg: f64::NEG_INFINITY,
        }
    }
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one unit. `weight_kg` is expected finite; callers filter telemetry first.
    pub fn record(&mut self, classification: Classification, weight_kg: f64) {
        match classification {
            Classification::Within => self.counts.within += 1,
            Classification::Alert => self.counts.alert += 1,
            Classification::Out => self.counts.out += 1,
        }
        self.sum_kg += weight_kg;
        self.min_kg = self.min_kg.min(weight_kg);
        self.max_kg = self.max_kg.max(weight_kg);
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.counts.total()
    }

    #[inline]
    pub fn counts(&self) -> ClassCounts {
        self.counts
    }

    pub fn result(&self) -> MetricsResult {
        let n = self.counts.total();
        let weights = (n > 0).then(|| WeightStats {
            average: self.sum_kg / n as f64,
            min: self.min_kg,
            max: self.max_kg,
        });
        MetricsResult {
            counts: self.counts,
            weights,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use proptest::prelude::*;

    #[test]
    fn empty_accumulator_has_no_weight_stats() {
        let acc = MetricsAccumulator::new();
        let r = acc.result();
        assert_eq!(r.counts.total(), 0);
        assert!(r.weights.is_none());
    }

    #[test]
    fn tracks_counts_and_extremes() {
        let mut acc = MetricsAccumulator::new();
        for w in [25.0, 25.6, 24.2, 30.0] {
            acc.record(classify(w, 25.0), w);
        }
        let r = acc.result();
        assert_eq!(
            r.counts,
            ClassCounts {
                within: 1,
                alert: 2,
                out: 1
            }
        );
        let w = r.weights.unwrap();
        assert!((w.average - 26.2).abs() < 1e-9);
        assert_eq!(w.min, 24.2);
        assert_eq!(w.max, 30.0);
    }

    #[test]
    fn reset_zeroes_everything() {
        let mut acc = MetricsAccumulator::new();
        acc.record(Classification::Out, 3.0);
        acc.reset();
        assert_eq!(acc.total(), 0);
        assert!(acc.result().weights.is_none());
    }

    proptest! {
        #[test]
        fn counts_are_conserved(weights in proptest::collection::vec(0.0f64..60.0, 1..300)) {
            let mut acc = MetricsAccumulator::new();
            for w in &weights {
                acc.record(classify(*w, 25.0), *w);
            }
            let r = acc.result();
            prop_assert_eq!(r.counts.within + r.counts.alert + r.counts.out, weights.len() as u64);
            let stats = r.weights.unwrap();
            prop_assert!(stats.min <= stats.average + 1e-9 && stats.average <= stats.max + 1e-9);
        }
    }
}
