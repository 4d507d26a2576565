//! Keyed store of every tank's session controller.
//!
//! The registry is the only mutable engine state. Handlers look sessions up
//! here at call time instead of holding copies.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fillmon_traits::{Clock, SystemClock};

use crate::arbiter::TankPairArbiter;
use crate::autonomy::AutonomyProjection;
use crate::buffer::WeightSample;
use crate::config::{EngineCfg, LineLayout};
use crate::error::{BuildError, BusyReason, SessionError};
use crate::session::{SessionController, TankSession};
use crate::status::SessionStatus;
use crate::summary::PackagingSummary;
use crate::types::{ProcessOrder, TankId};

pub struct SessionRegistry {
    sessions: BTreeMap<TankId, SessionController>,
    arbiter: TankPairArbiter,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("tanks", &self.sessions.keys().collect::<Vec<_>>())
            .field("pairs", &self.arbiter.pairs())
            .finish()
    }
}

impl SessionRegistry {
    /// Every configured tank starts idle.
    pub fn new(
        layout: &LineLayout,
        cfg: &EngineCfg,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self, BuildError> {
        layout.validate()?;
        cfg.validate()?;
        let sessions = layout
            .tanks
            .iter()
            .map(|&t| (t, SessionController::new(t, cfg)))
            .collect();
        Ok(Self {
            sessions,
            arbiter: TankPairArbiter::new(layout.exclusive_pairs.iter().copied()),
            clock,
        })
    }

    /// Default layout and config on the system clock.
    pub fn with_defaults() -> Result<Self, BuildError> {
        Self::new(
            &LineLayout::default(),
            &EngineCfg::default(),
            Arc::new(SystemClock),
        )
    }

    /// Tank ids in ascending order.
    pub fn tanks(&self) -> impl Iterator<Item = TankId> + '_ {
        self.sessions.keys().copied()
    }

    pub fn arbiter(&self) -> &TankPairArbiter {
        &self.arbiter
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn controller(&self, tank: TankId) -> Result<&SessionController, SessionError> {
        self.sessions
            .get(&tank)
            .ok_or(SessionError::UnknownTank(tank))
    }

    fn controller_mut(&mut self, tank: TankId) -> Result<&mut SessionController, SessionError> {
        self.sessions
            .get_mut(&tank)
            .ok_or(SessionError::UnknownTank(tank))
    }

    pub fn session(&self, tank: TankId) -> Result<&TankSession, SessionError> {
        self.controller(tank).map(SessionController::session)
    }

    pub fn status(&self, tank: TankId) -> Result<SessionStatus, SessionError> {
        self.controller(tank).map(SessionController::status)
    }

    /// Idle and not blocked by a filling partner.
    pub fn can_start(&self, tank: TankId) -> Result<bool, SessionError> {
        let idle = self.status(tank)? == SessionStatus::Idle;
        Ok(idle && self.arbiter.can_start(tank, self))
    }

    pub fn start(&mut self, tank: TankId, order: ProcessOrder) -> Result<(), SessionError> {
        let now = self.clock.now();
        self.start_at(tank, order, now)
    }

    /// `start` with an explicit timestamp.
    pub fn start_at(
        &mut self,
        tank: TankId,
        order: ProcessOrder,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.controller(tank)?;
        if let Some(partner) = self.arbiter.blocking_partner(tank, self) {
            tracing::info!(tank = %tank, partner = %partner, "start refused: paired tank filling");
            return Err(SessionError::Busy {
                tank,
                reason: BusyReason::PartnerFilling(partner),
            });
        }
        self.controller_mut(tank)?.start(order, now)
    }

    pub fn stop(&mut self, tank: TankId) -> Result<Option<PackagingSummary>, SessionError> {
        let now = self.clock.now();
        self.stop_at(tank, now)
    }

    pub fn stop_at(
        &mut self,
        tank: TankId,
        now: DateTime<Utc>,
    ) -> Result<Option<PackagingSummary>, SessionError> {
        self.controller_mut(tank)?.stop(now)
    }

    pub fn on_telemetry(&mut self, tank: TankId, weight_kg: f64) -> Result<(), SessionError> {
        self.controller_mut(tank)?.on_telemetry(weight_kg);
        Ok(())
    }

    pub fn on_unit_sample(
        &mut self,
        tank: TankId,
        weight_kg: f64,
        unit_index: Option<u64>,
    ) -> Result<Option<WeightSample>, SessionError> {
        Ok(self.controller_mut(tank)?.on_unit_sample(weight_kg, unit_index))
    }

    pub fn project_autonomy(
        &self,
        tank: TankId,
        now: DateTime<Utc>,
    ) -> Result<AutonomyProjection, SessionError> {
        Ok(self.controller(tank)?.project_autonomy(now))
    }
}
