//! Runtime configuration for the engine.
//!
//! These are separate from the TOML-deserialized config in `fillmon_config`;
//! see `conversions` for the mapping.

use std::collections::BTreeSet;

use crate::autonomy::AlertThresholds;
use crate::buffer::DEFAULT_CAPACITY;
use crate::classifier::ToleranceBand;
use crate::error::BuildError;
use crate::summary::SummaryBuilder;
use crate::types::TankId;

/// Per-session tuning shared by every tank on the line.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCfg {
    /// Tolerance as a fraction of nominal. Default: 0.02.
    pub tolerance_ratio: f64,
    /// Samples kept for live charts. Default: 100.
    pub buffer_capacity: usize,
    /// Ideal seconds per unit used for the performance score. Default: 2.0.
    pub ideal_cycle_seconds: f64,
    pub thresholds: AlertThresholds,
    /// Publish `command` events after a successful start/stop.
    pub emit_commands: bool,
    /// Publish the summary on the `report` topic after a stop.
    pub emit_reports: bool,
    /// First topic segment, e.g. `tank` in `tank/3/unit`.
    pub topic_prefix: String,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            tolerance_ratio: ToleranceBand::DEFAULT_RATIO,
            buffer_capacity: DEFAULT_CAPACITY,
            ideal_cycle_seconds: SummaryBuilder::DEFAULT_IDEAL_CYCLE_SECONDS,
            thresholds: AlertThresholds::default(),
            emit_commands: true,
            emit_reports: true,
            topic_prefix: "tank".to_string(),
        }
    }
}

impl EngineCfg {
    pub fn validate(&self) -> Result<(), BuildError> {
        if !(self.tolerance_ratio.is_finite()
            && self.tolerance_ratio > 0.0
            && self.tolerance_ratio <= 0.5)
        {
            return Err(BuildError::InvalidConfig("tolerance ratio must be in (0, 0.5]"));
        }
        if self.buffer_capacity == 0 {
            return Err(BuildError::InvalidConfig("buffer capacity must be >= 1"));
        }
        if !(self.ideal_cycle_seconds.is_finite() && self.ideal_cycle_seconds > 0.0) {
            return Err(BuildError::InvalidConfig("ideal cycle seconds must be > 0"));
        }
        let t = &self.thresholds;
        if t.yellow_below_min < t.red_below_min || t.yellow_efficiency_pct < t.red_efficiency_pct
        {
            return Err(BuildError::InvalidConfig(
                "yellow thresholds must not be below red thresholds",
            ));
        }
        let p = self.topic_prefix.as_str();
        if p.is_empty() || p.starts_with('/') || p.ends_with('/') || p.contains(['+', '#']) {
            return Err(BuildError::InvalidConfig(
                "topic prefix must be non-empty, without wildcards or edge slashes",
            ));
        }
        Ok(())
    }
}

/// Tanks on the line and the pairs that share a filler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineLayout {
    pub tanks: Vec<TankId>,
    pub exclusive_pairs: Vec<(TankId, TankId)>,
}

impl Default for LineLayout {
    /// TK3..TK6 with TK3/TK4 sharing a line.
    fn default() -> Self {
        Self {
            tanks: [3, 4, 5, 6].into_iter().map(TankId).collect(),
            exclusive_pairs: vec![(TankId(3), TankId(4))],
        }
    }
}

impl LineLayout {
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.tanks.is_empty() {
            return Err(BuildError::InvalidLayout("no tanks configured".into()));
        }
        let mut seen = BTreeSet::new();
        for t in &self.tanks {
            if !seen.insert(*t) {
                return Err(BuildError::InvalidLayout(format!("{t} listed twice")));
            }
        }
        let mut paired = BTreeSet::new();
        for &(a, b) in &self.exclusive_pairs {
            if a == b {
                return Err(BuildError::InvalidLayout(format!("{a} paired with itself")));
            }
            for t in [a, b] {
                if !seen.contains(&t) {
                    return Err(BuildError::InvalidLayout(format!(
                        "pair ({a}, {b}) references unknown tank {t}"
                    )));
                }
                if !paired.insert(t) {
                    return Err(BuildError::InvalidLayout(format!(
                        "{t} belongs to more than one pair"
                    )));
                }
            }
        }
        Ok(())
    }
}
