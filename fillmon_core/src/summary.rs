//! End-of-session report with an OEE-style score.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classifier::ToleranceBand;
use crate::metrics::MetricsResult;
use crate::types::{ProcessOrder, TankId};
use crate::util::{round2, whole_seconds_between};

/// Availability is not measured on the line; reported as a constant.
pub const AVAILABILITY_PCT: f64 = 100.0;

/// The final report of a completed session. Percentages and weights are
/// rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingSummary {
    pub tank_id: TankId,
    pub order: ProcessOrder,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: u64,
    pub total_units: u64,
    pub within_tolerance: u64,
    pub in_alert: u64,
    pub out_of_tolerance: u64,
    pub average_weight: f64,
    pub min_weight: f64,
    pub max_weight: f64,
    pub tolerance_min_kg: f64,
    pub tolerance_max_kg: f64,
    pub availability: f64,
    /// `None` when the session lasted less than a second.
    pub performance: Option<f64>,
    pub quality: f64,
    pub oee: Option<f64>,
}

/// Unrounded OEE components, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OeeScore {
    pub availability: f64,
    pub performance: Option<f64>,
    pub quality: f64,
}

impl OeeScore {
    pub fn compute(
        total_units: u64,
        within: u64,
        duration_seconds: u64,
        ideal_cycle_seconds: f64,
    ) -> Self {
        let performance = (duration_seconds > 0
            && ideal_cycle_seconds.is_finite()
            && ideal_cycle_seconds > 0.0)
            .then(|| {
                let ideal_units = duration_seconds as f64 / ideal_cycle_seconds;
                total_units as f64 / ideal_units * 100.0
            });
        let quality = if total_units == 0 {
            0.0
        } else {
            within as f64 / total_units as f64 * 100.0
        };
        Self {
            availability: AVAILABILITY_PCT,
            performance,
            quality,
        }
    }

    pub fn oee(&self) -> Option<f64> {
        self.performance
            .map(|p| self.availability * p * self.quality / 10_000.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SummaryBuilder {
    ideal_cycle_seconds: f64,
    band: ToleranceBand,
}

impl Default for SummaryBuilder {
    fn default() -> Self {
        Self {
            ideal_cycle_seconds: Self::DEFAULT_IDEAL_CYCLE_SECONDS,
            band: ToleranceBand::default(),
        }
    }
}

impl SummaryBuilder {
    /// One unit every two seconds.
    pub const DEFAULT_IDEAL_CYCLE_SECONDS: f64 = 2.0;

    pub fn new(ideal_cycle_seconds: f64, band: ToleranceBand) -> Self {
        Self {
            ideal_cycle_seconds,
            band,
        }
    }

    pub fn ideal_cycle_seconds(&self) -> f64 {
        self.ideal_cycle_seconds
    }

    /// Returns `None` when no unit was recorded.
    pub fn build(
        &self,
        tank_id: TankId,
        order: &ProcessOrder,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        metrics: &MetricsResult,
    ) -> Option<PackagingSummary> {
        let counts = metrics.counts;
        let weights = metrics.weights?;
        let total_units = counts.total();
        if total_units == 0 {
            return None;
        }

        let duration_seconds = whole_seconds_between(start_time, end_time);
        let score = OeeScore::compute(
            total_units,
            counts.within,
            duration_seconds,
            self.ideal_cycle_seconds,
        );
        let nominal = order.nominal_kg();
        let (lo, hi) = self.band.bounds(nominal).unwrap_or((nominal, nominal));

        Some(PackagingSummary {
            tank_id,
            order: order.clone(),
            start_time,
            end_time,
            duration_seconds,
            total_units,
            within_tolerance: counts.within,
            in_alert: counts.alert,
            out_of_tolerance: counts.out,
            average_weight: round2(weights.average),
            min_weight: round2(weights.min),
            max_weight: round2(weights.max),
            tolerance_min_kg: round2(lo),
            tolerance_max_kg: round2(hi),
            availability: round2(score.availability),
            performance: score.performance.map(round2),
            quality: round2(score.quality),
            oee: score.oee().map(round2),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::metrics::MetricsAccumulator;
    use crate::types::{AutonomyMode, Format};
    use chrono::{Duration, TimeZone};

    fn order(format: Format) -> ProcessOrder {
        ProcessOrder {
            of: "OF-2025-118".into(),
            legajo: "1043".into(),
            orden_envasado: "OE-77".into(),
            material: "3295".into(),
            description: "Latex interior".into(),
            format,
            autonomy: AutonomyMode::CountBased {
                target_units: 200,
                rate_units_per_min: 4.0,
            },
        }
    }

    fn metrics_for(weights: &[f64], nominal: f64) -> MetricsResult {
        let mut acc = MetricsAccumulator::new();
        for w in weights {
            acc.record(classify(*w, nominal), *w);
        }
        acc.result()
    }

    #[test]
    fn reference_session() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 2, 6, 0, 0).unwrap();
        let t1 = t0 + Duration::milliseconds(8_900);
        let m = metrics_for(&[25.0, 25.6, 24.2, 30.0], 25.0);
        let s = SummaryBuilder::default()
            .build(TankId(3), &order(Format::TwentyFiveKg), t0, t1, &m)
            .unwrap();

        assert_eq!(s.duration_seconds, 8);
        assert_eq!(s.total_units, 4);
        assert_eq!(
            (s.within_tolerance, s.in_alert, s.out_of_tolerance),
            (1, 2, 1)
        );
        assert_eq!(s.quality, 25.0);
        assert_eq!(s.availability, 100.0);
        // 4 units in 8 s at 2 s/unit => 100 %
        assert_eq!(s.performance, Some(100.0));
        assert_eq!(s.oee, Some(25.0));
        assert_eq!(s.average_weight, 26.2);
        assert_eq!((s.min_weight, s.max_weight), (24.2, 30.0));
        assert_eq!((s.tolerance_min_kg, s.tolerance_max_kg), (24.5, 25.5));
    }

    #[test]
    fn zero_units_yield_no_summary() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 2, 6, 0, 0).unwrap();
        let m = MetricsAccumulator::new().result();
        assert!(
            SummaryBuilder::default()
                .build(TankId(5), &order(Format::FiveKg), t0, t0, &m)
                .is_none()
        );
    }

    #[test]
    fn sub_second_session_has_no_performance() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 2, 6, 0, 0).unwrap();
        let m = metrics_for(&[5.0], 5.0);
        let s = SummaryBuilder::default()
            .build(TankId(5), &order(Format::FiveKg), t0, t0 + Duration::milliseconds(400), &m)
            .unwrap();
        assert_eq!(s.duration_seconds, 0);
        assert_eq!(s.performance, None);
        assert_eq!(s.oee, None);
        assert_eq!(s.quality, 100.0);
    }

    #[test]
    fn percentages_are_rounded() {
        let score = OeeScore::compute(3, 1, 7, 2.0);
        // 3 / 3.5 * 100
        assert!((score.performance.unwrap() - 85.714_285).abs() < 1e-4);
        assert_eq!(round2(score.quality), 33.33);
        assert_eq!(score.oee().map(round2), Some(28.57));
    }

    #[test]
    fn summary_serializes_camel_case() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 2, 6, 0, 0).unwrap();
        let m = metrics_for(&[10.1, 9.9], 10.0);
        let s = SummaryBuilder::default()
            .build(TankId(6), &order(Format::TenKg), t0, t0 + Duration::seconds(4), &m)
            .unwrap();
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["tankId"], 6);
        assert_eq!(v["withinTolerance"], 2);
        assert_eq!(v["order"]["format"], "10kg");
        assert_eq!(v["order"]["ordenEnvasado"], "OE-77");
        assert!(v.get("toleranceMinKg").is_some());
    }
}
