//! Bounded FIFO of the most recent unit samples of a session, for live charts.

use std::collections::VecDeque;

use serde::Serialize;

use crate::classifier::Classification;

/// Samples retained per session unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 100;

/// A classified unit weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightSample {
    /// 1-based, session-local.
    pub sequence: u64,
    pub value_kg: f64,
    pub classification: Classification,
}

#[derive(Debug, Clone)]
pub struct RollingSampleBuffer {
    samples: VecDeque<WeightSample>,
    capacity: usize,
    produced: u64,
}

impl Default for RollingSampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RollingSampleBuffer {
    /// Capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            produced: 0,
        }
    }

    /// Append with the next sequence number, evicting the oldest sample when full.
    pub fn append(&mut self, value_kg: f64, classification: Classification) -> WeightSample {
        self.produced += 1;
        let sample = WeightSample {
            sequence: self.produced,
            value_kg,
            classification,
        };
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        sample
    }

    /// Retained samples in ascending sequence order.
    pub fn snapshot(&self) -> Vec<WeightSample> {
        self.samples.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<&WeightSample> {
        self.samples.back()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.produced = 0;
    }

    /// Samples appended since the last reset, including evicted ones.
    #[inline]
    pub fn produced(&self) -> u64 {
        self.produced
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sequences_start_at_one() {
        let mut buf = RollingSampleBuffer::default();
        let a = buf.append(25.0, Classification::Within);
        let b = buf.append(25.7, Classification::Alert);
        assert_eq!((a.sequence, b.sequence), (1, 2));
        assert_eq!(buf.latest().map(|s| s.value_kg), Some(25.7));
    }

    #[test]
    fn reset_clears_and_restarts_numbering() {
        let mut buf = RollingSampleBuffer::new(3);
        for _ in 0..5 {
            buf.append(1.0, Classification::Within);
        }
        assert_eq!(buf.len(), 3);
        buf.reset();
        assert!(buf.is_empty());
        assert_eq!(buf.produced(), 0);
        assert_eq!(buf.append(1.0, Classification::Out).sequence, 1);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buf = RollingSampleBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.append(1.0, Classification::Within);
        buf.append(2.0, Classification::Within);
        assert_eq!(buf.snapshot().len(), 1);
        assert_eq!(buf.snapshot()[0].sequence, 2);
    }

    proptest! {
        #[test]
        fn keeps_exactly_the_last_capacity_sequences(k in 101u64..600) {
            let mut buf = RollingSampleBuffer::new(DEFAULT_CAPACITY);
            for i in 0..k {
                buf.append(i as f64, Classification::Within);
            }
            let snap = buf.snapshot();
            prop_assert_eq!(snap.len(), DEFAULT_CAPACITY);
            let seqs: Vec<u64> = snap.iter().map(|s| s.sequence).collect();
            let expected: Vec<u64> = (k - 99..=k).collect();
            prop_assert_eq!(seqs, expected);
            prop_assert_eq!(buf.produced(), k);
        }
    }
}
