//! Autonomy projection: how long until the order (or the tank) runs out.
//!
//! Both modes are pure functions of session state and elapsed time; nothing is
//! cached between calls. Degenerate inputs (non-positive rate or target,
//! non-finite values) produce `AutonomyProjection::Indeterminate` instead of
//! dividing by zero.

use serde::Serialize;

use crate::types::AutonomyMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Green,
    Yellow,
    Red,
}

/// Limits for the alert level. Defaults: red under 30 min or 80 %, yellow under
/// 60 min or 90 %.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub red_below_min: f64,
    pub yellow_below_min: f64,
    pub red_efficiency_pct: f64,
    pub yellow_efficiency_pct: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            red_below_min: 30.0,
            yellow_below_min: 60.0,
            red_efficiency_pct: 80.0,
            yellow_efficiency_pct: 90.0,
        }
    }
}

impl AlertThresholds {
    /// Each level is an OR of the time clause and the efficiency clause. A
    /// missing efficiency never triggers its clause.
    pub fn level(&self, remaining_min: f64, efficiency_pct: Option<f64>) -> AlertLevel {
        let eff_below = |limit: f64| efficiency_pct.is_some_and(|e| e < limit);
        if remaining_min < self.red_below_min || eff_below(self.red_efficiency_pct) {
            AlertLevel::Red
        } else if remaining_min < self.yellow_below_min || eff_below(self.yellow_efficiency_pct) {
            AlertLevel::Yellow
        } else {
            AlertLevel::Green
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountProjection {
    pub ideal_remaining_min: f64,
    pub real_throughput_per_min: f64,
    pub real_remaining_min: f64,
    /// Ideal total over real total, in percent. Not capped at 100.
    pub efficiency_pct: Option<f64>,
    pub progress_pct: f64,
    pub level: AlertLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MassProjection {
    pub autonomy_min: f64,
    pub progress_pct: Option<f64>,
    pub level: AlertLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AutonomyProjection {
    Count(CountProjection),
    Mass(MassProjection),
    /// No active order, or its target/rate cannot be projected.
    Indeterminate,
}

impl AutonomyProjection {
    pub fn level(&self) -> Option<AlertLevel> {
        match self {
            AutonomyProjection::Count(c) => Some(c.level),
            AutonomyProjection::Mass(m) => Some(m.level),
            AutonomyProjection::Indeterminate => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AutonomyProjector {
    thresholds: AlertThresholds,
}

#[inline]
fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl AutonomyProjector {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Dispatch on the order's mode. `available_kg` is the current tank inventory.
    pub fn project(
        &self,
        mode: &AutonomyMode,
        produced: u64,
        elapsed_min: f64,
        available_kg: f64,
    ) -> AutonomyProjection {
        match *mode {
            AutonomyMode::CountBased {
                target_units,
                rate_units_per_min,
            } => self.project_count(target_units, rate_units_per_min, produced, elapsed_min),
            AutonomyMode::MassBased {
                target_kg,
                rate_kg_per_min,
            } => self.project_mass(available_kg, rate_kg_per_min, Some(target_kg)),
        }
    }

    pub fn project_count(
        &self,
        target_units: u64,
        rate_per_min: f64,
        produced: u64,
        elapsed_min: f64,
    ) -> AutonomyProjection {
        if target_units == 0 || !positive(rate_per_min) || !elapsed_min.is_finite() {
            return AutonomyProjection::Indeterminate;
        }
        let target = target_units as f64;
        let produced_f = produced as f64;
        let elapsed = elapsed_min.max(0.0);

        let ideal_total = target / rate_per_min;
        let ideal_remaining = (ideal_total - elapsed).max(0.0);
        let throughput = if elapsed > 0.0 {
            produced_f / elapsed
        } else {
            rate_per_min
        };
        let real_remaining = if throughput > 0.0 {
            ((target - produced_f) / throughput).max(0.0)
        } else {
            ideal_remaining
        };
        let real_total = elapsed + real_remaining;
        let efficiency = (real_total > 0.0).then(|| ideal_total / real_total * 100.0);
        let progress = (produced_f / target * 100.0).clamp(0.0, 100.0);

        AutonomyProjection::Count(CountProjection {
            ideal_remaining_min: ideal_remaining,
            real_throughput_per_min: throughput,
            real_remaining_min: real_remaining,
            efficiency_pct: efficiency,
            progress_pct: progress,
            level: self.thresholds.level(ideal_remaining, efficiency),
        })
    }

    pub fn project_mass(
        &self,
        available_kg: f64,
        rate_kg_per_min: f64,
        target_kg: Option<f64>,
    ) -> AutonomyProjection {
        if !positive(rate_kg_per_min) || !available_kg.is_finite() {
            return AutonomyProjection::Indeterminate;
        }
        let available = available_kg.max(0.0);
        let autonomy = available / rate_kg_per_min;
        let progress = target_kg
            .filter(|t| positive(*t))
            .map(|t| (available / t * 100.0).clamp(0.0, 100.0));

        AutonomyProjection::Mass(MassProjection {
            autonomy_min: autonomy,
            progress_pct: progress,
            level: self.thresholds.level(autonomy, None),
        })
    }
}
