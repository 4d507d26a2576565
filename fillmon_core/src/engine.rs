//! Event-driven front of the registry.
//!
//! `Engine` turns inbound events into registry calls and publishes the
//! resulting `command`/`report` events through an `EventSink`. Handling is
//! synchronous: each event is applied to completion before `handle` returns.

use chrono::{DateTime, Utc};
use fillmon_traits::EventSink;

use crate::autonomy::AutonomyProjection;
use crate::buffer::WeightSample;
use crate::builder::{EngineBuilder, Missing};
use crate::config::EngineCfg;
use crate::error::{DecodeError, SessionError};
use crate::events::{CommandAction, InboundEvent, OutboundEvent};
use crate::registry::SessionRegistry;
use crate::summary::PackagingSummary;
use crate::types::{ProcessOrder, TankId};

/// What handling one inbound event did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Accepted with no effect (unit sample on an idle tank).
    Ignored,
    /// Tank weight stored.
    Updated,
    Sample(WeightSample),
    Started,
    Stopped(Option<Box<PackagingSummary>>),
    Rejected(SessionError),
    Malformed(DecodeError),
}

pub struct Engine<K> {
    registry: SessionRegistry,
    sink: K,
    cfg: EngineCfg,
}

impl<K: EventSink> std::fmt::Debug for Engine<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("topic_prefix", &self.cfg.topic_prefix)
            .finish_non_exhaustive()
    }
}

impl Engine<Missing> {
    pub fn builder() -> EngineBuilder<Missing> {
        EngineBuilder::default()
    }
}

impl<K: EventSink> Engine<K> {
    pub(crate) fn from_parts(registry: SessionRegistry, sink: K, cfg: EngineCfg) -> Self {
        Self {
            registry,
            sink,
            cfg,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn cfg(&self) -> &EngineCfg {
        &self.cfg
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Decode and handle a raw topic/payload pair. Malformed input changes nothing.
    pub fn handle_raw(&mut self, topic: &str, payload: &[u8]) -> Outcome {
        match InboundEvent::decode(&self.cfg.topic_prefix, topic, payload) {
            Ok(ev) => self.handle(ev),
            Err(e) => {
                tracing::warn!(error = %e, "discarding malformed message");
                Outcome::Malformed(e)
            }
        }
    }

    pub fn handle(&mut self, event: InboundEvent) -> Outcome {
        let tank = event.tank();
        let res = match event {
            InboundEvent::TankWeight { weight_kg, .. } => self
                .registry
                .on_telemetry(tank, weight_kg)
                .map(|()| Outcome::Updated),
            InboundEvent::UnitSample {
                weight_kg,
                unit_index,
                ..
            } => self
                .registry
                .on_unit_sample(tank, weight_kg, unit_index)
                .map(|s| s.map_or(Outcome::Ignored, Outcome::Sample)),
            InboundEvent::Start { order, .. } => self.start(tank, order).map(|()| Outcome::Started),
            InboundEvent::Stop { .. } => self
                .stop(tank)
                .map(|s| Outcome::Stopped(s.map(Box::new))),
        };
        res.unwrap_or_else(|e| {
            tracing::warn!(tank = %tank, error = %e, "event rejected");
            Outcome::Rejected(e)
        })
    }

    /// Start a session on `tank` at the registry clock's current time.
    pub fn start(&mut self, tank: TankId, order: ProcessOrder) -> Result<(), SessionError> {
        let now = self.registry.now();
        let echo = self.cfg.emit_commands.then(|| order.clone());
        self.registry.start_at(tank, order, now)?;
        if let Some(order) = echo {
            self.emit(&OutboundEvent::Command {
                tank,
                action: CommandAction::Start,
                timestamp: now,
                order: Some(order),
            });
        }
        Ok(())
    }

    /// Stop the session on `tank`; publishes the report when one was produced.
    pub fn stop(&mut self, tank: TankId) -> Result<Option<PackagingSummary>, SessionError> {
        let now = self.registry.now();
        let summary = self.registry.stop_at(tank, now)?;
        if self.cfg.emit_commands {
            self.emit(&OutboundEvent::Command {
                tank,
                action: CommandAction::Stop,
                timestamp: now,
                order: None,
            });
        }
        if let Some(s) = summary.as_ref().filter(|_| self.cfg.emit_reports) {
            self.emit(&OutboundEvent::Report(Box::new(s.clone())));
        }
        Ok(summary)
    }

    /// Projection for `tank` at the registry clock's current time.
    pub fn project_autonomy(&self, tank: TankId) -> Result<AutonomyProjection, SessionError> {
        self.registry.project_autonomy(tank, self.registry.now())
    }

    pub fn project_autonomy_at(
        &self,
        tank: TankId,
        now: DateTime<Utc>,
    ) -> Result<AutonomyProjection, SessionError> {
        self.registry.project_autonomy(tank, now)
    }

    fn emit(&mut self, ev: &OutboundEvent) {
        let topic = ev.topic(&self.cfg.topic_prefix);
        let payload = match ev.payload() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "failed to encode outbound event");
                return;
            }
        };
        if let Err(e) = self.sink.publish(&topic, &payload) {
            tracing::warn!(topic = %topic, error = %e, "publish failed");
        }
    }
}
