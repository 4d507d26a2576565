//! Per-tank session state and the controller that owns its transitions.
//!
//! ```text
//! idle --start(order)--> filling --stop()--> idle
//! ```
//!
//! Cross-tank rules (paired tanks) are enforced by the registry before it
//! delegates here; the controller only knows its own tank.

use chrono::{DateTime, Utc};

use crate::autonomy::{AutonomyProjection, AutonomyProjector};
use crate::buffer::{RollingSampleBuffer, WeightSample};
use crate::classifier::ToleranceBand;
use crate::config::EngineCfg;
use crate::error::{BusyReason, SessionError};
use crate::metrics::MetricsAccumulator;
use crate::status::SessionStatus;
use crate::summary::{PackagingSummary, SummaryBuilder};
use crate::types::{Format, ProcessOrder, TankId};
use crate::util::minutes_between;

/// State of one tank. Created idle and never destroyed; stop returns it to idle.
#[derive(Debug, Clone)]
pub struct TankSession {
    tank_id: TankId,
    status: SessionStatus,
    order: Option<ProcessOrder>,
    started_at: Option<DateTime<Utc>>,
    buffer: RollingSampleBuffer,
    metrics: MetricsAccumulator,
    current_tank_weight_kg: f64,
    last_format: Option<Format>,
    last_unit_index: Option<u64>,
}

impl TankSession {
    pub fn new(tank_id: TankId, buffer_capacity: usize) -> Self {
        Self {
            tank_id,
            status: SessionStatus::Idle,
            order: None,
            started_at: None,
            buffer: RollingSampleBuffer::new(buffer_capacity),
            metrics: MetricsAccumulator::new(),
            current_tank_weight_kg: 0.0,
            last_format: None,
            last_unit_index: None,
        }
    }

    pub fn tank_id(&self) -> TankId {
        self.tank_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_filling(&self) -> bool {
        self.status == SessionStatus::Filling
    }

    pub fn order(&self) -> Option<&ProcessOrder> {
        self.order.as_ref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Recent samples. After a stop this still holds the finished session's
    /// tail until the next start.
    pub fn buffer(&self) -> &RollingSampleBuffer {
        &self.buffer
    }

    pub fn metrics(&self) -> &MetricsAccumulator {
        &self.metrics
    }

    /// Latest tank inventory reading, in kg.
    pub fn current_tank_weight_kg(&self) -> f64 {
        self.current_tank_weight_kg
    }

    /// Format of the current session, or of the last one once stopped.
    pub fn last_format(&self) -> Option<Format> {
        self.last_format
    }
}

/// Owns one `TankSession` and applies lifecycle transitions to it.
#[derive(Debug, Clone)]
pub struct SessionController {
    session: TankSession,
    band: ToleranceBand,
    summary: SummaryBuilder,
    projector: AutonomyProjector,
}

impl SessionController {
    pub fn new(tank_id: TankId, cfg: &EngineCfg) -> Self {
        let band = ToleranceBand::new(cfg.tolerance_ratio);
        Self {
            session: TankSession::new(tank_id, cfg.buffer_capacity),
            band,
            summary: SummaryBuilder::new(cfg.ideal_cycle_seconds, band),
            projector: AutonomyProjector::new(cfg.thresholds),
        }
    }

    pub fn session(&self) -> &TankSession {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn band(&self) -> &ToleranceBand {
        &self.band
    }

    /// Begin a session. Rejected without side effects when already filling or
    /// when the order does not validate.
    pub fn start(&mut self, order: ProcessOrder, now: DateTime<Utc>) -> Result<(), SessionError> {
        let s = &mut self.session;
        if s.is_filling() {
            return Err(SessionError::Busy {
                tank: s.tank_id,
                reason: BusyReason::AlreadyFilling,
            });
        }
        order.validate()?;

        s.buffer.reset();
        s.metrics.reset();
        s.last_unit_index = None;
        s.last_format = Some(order.format);
        tracing::info!(
            tank = %s.tank_id,
            of = %order.of,
            format = %order.format,
            "session started"
        );
        s.order = Some(order);
        s.started_at = Some(now);
        s.status = SessionStatus::Filling;
        Ok(())
    }

    /// Tank inventory update; accepted in any status.
    pub fn on_telemetry(&mut self, weight_kg: f64) {
        if !weight_kg.is_finite() {
            tracing::warn!(tank = %self.session.tank_id, weight_kg, "discarding non-finite tank weight");
            return;
        }
        self.session.current_tank_weight_kg = weight_kg;
    }

    /// Classify and record one unit weight. Returns `None` when the sample was
    /// ignored (idle tank or non-finite weight).
    pub fn on_unit_sample(&mut self, weight_kg: f64, unit_index: Option<u64>) -> Option<WeightSample> {
        let s = &mut self.session;
        let nominal = match s.order.as_ref() {
            Some(order) if s.status == SessionStatus::Filling => order.nominal_kg(),
            _ => {
                tracing::debug!(tank = %s.tank_id, weight_kg, "unit sample while idle, ignored");
                return None;
            }
        };
        if !weight_kg.is_finite() {
            tracing::warn!(tank = %s.tank_id, weight_kg, "discarding non-finite unit weight");
            return None;
        }
        if let Some(idx) = unit_index {
            if let Some(prev) = s.last_unit_index.filter(|prev| idx <= *prev) {
                tracing::debug!(tank = %s.tank_id, idx, prev, "non-increasing unit index");
            }
            s.last_unit_index = Some(idx);
        }

        let classification = self.band.classify(weight_kg, nominal);
        s.metrics.record(classification, weight_kg);
        let sample = s.buffer.append(weight_kg, classification);
        tracing::trace!(
            tank = %s.tank_id,
            seq = sample.sequence,
            weight_kg,
            ?classification,
            "unit sample"
        );
        Some(sample)
    }

    /// End the session. Yields a summary when at least one unit was recorded.
    /// The sample buffer is kept for post-mortem display.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Result<Option<PackagingSummary>, SessionError> {
        let s = &mut self.session;
        if !s.is_filling() {
            return Err(SessionError::NotFilling(s.tank_id));
        }
        let order = s.order.take();
        let started_at = s.started_at.take();
        s.status = SessionStatus::Idle;

        let summary = match (order, started_at) {
            (Some(order), Some(start)) => {
                self.summary
                    .build(s.tank_id, &order, start, now, &s.metrics.result())
            }
            _ => None,
        };
        tracing::info!(
            tank = %s.tank_id,
            units = s.metrics.total(),
            reported = summary.is_some(),
            "session stopped"
        );
        Ok(summary)
    }

    /// Pull-based projection; idle sessions are indeterminate.
    pub fn project_autonomy(&self, now: DateTime<Utc>) -> AutonomyProjection {
        let s = &self.session;
        match (&s.order, s.started_at) {
            (Some(order), Some(start)) if s.is_filling() => self.projector.project(
                &order.autonomy,
                s.metrics.total(),
                minutes_between(start, now),
                s.current_tank_weight_kg,
            ),
            _ => AutonomyProjection::Indeterminate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classification;
    use crate::types::AutonomyMode;
    use chrono::{Duration, TimeZone};

    fn order() -> ProcessOrder {
        ProcessOrder {
            of: "OF-9".into(),
            legajo: "12".into(),
            orden_envasado: "OE-3".into(),
            material: "M-1".into(),
            description: String::new(),
            format: Format::TwentyFiveKg,
            autonomy: AutonomyMode::CountBased {
                target_units: 1000,
                rate_units_per_min: 50.0,
            },
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 7, 14, 0, 0).unwrap()
    }

    #[test]
    fn start_sets_filling_and_order() {
        let mut c = SessionController::new(TankId(5), &EngineCfg::default());
        c.start(order(), t0()).unwrap();
        let s = c.session();
        assert!(s.is_filling());
        assert_eq!(s.started_at(), Some(t0()));
        assert_eq!(s.order().map(|o| o.of.as_str()), Some("OF-9"));
        assert_eq!(s.last_format(), Some(Format::TwentyFiveKg));
    }

    #[test]
    fn double_start_is_busy_and_keeps_state() {
        let mut c = SessionController::new(TankId(5), &EngineCfg::default());
        c.start(order(), t0()).unwrap();
        c.on_unit_sample(25.0, None);
        let err = c.start(order(), t0() + Duration::seconds(5)).unwrap_err();
        assert_eq!(
            err,
            SessionError::Busy {
                tank: TankId(5),
                reason: BusyReason::AlreadyFilling
            }
        );
        assert_eq!(c.session().started_at(), Some(t0()));
        assert_eq!(c.session().metrics().total(), 1);
    }

    #[test]
    fn invalid_order_is_rejected_while_idle() {
        let mut c = SessionController::new(TankId(5), &EngineCfg::default());
        let mut o = order();
        o.of.clear();
        assert!(matches!(c.start(o, t0()), Err(SessionError::InvalidOrder(_))));
        assert_eq!(c.status(), SessionStatus::Idle);
        assert!(c.session().order().is_none());
    }

    #[test]
    fn idle_samples_are_ignored() {
        let mut c = SessionController::new(TankId(6), &EngineCfg::default());
        assert!(c.on_unit_sample(25.0, Some(1)).is_none());
        assert!(c.session().buffer().is_empty());
        assert_eq!(c.session().metrics().total(), 0);
    }

    #[test]
    fn telemetry_updates_in_any_status_and_drops_nan() {
        let mut c = SessionController::new(TankId(6), &EngineCfg::default());
        c.on_telemetry(1800.0);
        assert_eq!(c.session().current_tank_weight_kg(), 1800.0);
        c.on_telemetry(f64::NAN);
        assert_eq!(c.session().current_tank_weight_kg(), 1800.0);
    }

    #[test]
    fn duplicate_unit_index_is_still_counted() {
        let mut c = SessionController::new(TankId(3), &EngineCfg::default());
        c.start(order(), t0()).unwrap();
        c.on_unit_sample(25.0, Some(7));
        c.on_unit_sample(25.1, Some(7));
        assert_eq!(c.session().metrics().total(), 2);
    }

    #[test]
    fn non_finite_unit_weight_is_dropped() {
        let mut c = SessionController::new(TankId(3), &EngineCfg::default());
        c.start(order(), t0()).unwrap();
        assert!(c.on_unit_sample(f64::INFINITY, None).is_none());
        assert_eq!(c.session().metrics().total(), 0);
    }

    #[test]
    fn stop_keeps_buffer_and_returns_to_idle() {
        let mut c = SessionController::new(TankId(3), &EngineCfg::default());
        c.start(order(), t0()).unwrap();
        let classes: Vec<_> = [25.0, 25.6, 24.2, 30.0]
            .into_iter()
            .filter_map(|w| c.on_unit_sample(w, None))
            .map(|s| s.classification)
            .collect();
        assert_eq!(
            classes,
            [
                Classification::Within,
                Classification::Alert,
                Classification::Alert,
                Classification::Out
            ]
        );
        let summary = c.stop(t0() + Duration::seconds(8)).unwrap().unwrap();
        assert_eq!(summary.quality, 25.0);
        assert_eq!(summary.out_of_tolerance, 1);

        let s = c.session();
        assert_eq!(s.status(), SessionStatus::Idle);
        assert!(s.order().is_none() && s.started_at().is_none());
        assert_eq!(s.buffer().len(), 4);
        assert_eq!(s.last_format(), Some(Format::TwentyFiveKg));
    }

    #[test]
    fn stop_when_idle_is_not_filling() {
        let mut c = SessionController::new(TankId(4), &EngineCfg::default());
        assert_eq!(c.stop(t0()), Err(SessionError::NotFilling(TankId(4))));
    }

    #[test]
    fn restart_clears_previous_session() {
        let mut c = SessionController::new(TankId(4), &EngineCfg::default());
        c.start(order(), t0()).unwrap();
        c.on_unit_sample(25.0, Some(1));
        c.stop(t0() + Duration::seconds(2)).unwrap();
        c.start(order(), t0() + Duration::seconds(60)).unwrap();
        assert!(c.session().buffer().is_empty());
        assert_eq!(c.session().metrics().total(), 0);
        assert_eq!(c.on_unit_sample(25.0, Some(1)).map(|s| s.sequence), Some(1));
    }

    #[test]
    fn projection_follows_session_state() {
        let mut c = SessionController::new(TankId(3), &EngineCfg::default());
        assert_eq!(c.project_autonomy(t0()), AutonomyProjection::Indeterminate);
        c.start(order(), t0()).unwrap();
        for _ in 0..500 {
            c.on_unit_sample(25.0, None);
        }
        match c.project_autonomy(t0() + Duration::minutes(8)) {
            AutonomyProjection::Count(p) => {
                assert!((p.real_remaining_min - 8.0).abs() < 1e-9);
                assert!((p.efficiency_pct.unwrap() - 125.0).abs() < 1e-9);
            }
            other => panic!("expected count projection, got {other:?}"),
        }
    }
}
