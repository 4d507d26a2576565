//! Wire codec: topics and JSON payloads in and out of the engine.
//!
//! Topic layout is `<prefix>/<tank>/<kind>`. The tank segment accepts `3` or
//! `tk3`; outbound topics always use the bare number.
//!
//! | kind      | direction | payload                                  |
//! |-----------|-----------|------------------------------------------|
//! | `weight`  | in        | `{"weight": kg}`                         |
//! | `unit`    | in        | `{"weight": kg, "unitIndex": n?}`        |
//! | `start`   | in        | `{"order": {...}}`                       |
//! | `stop`    | in        | empty or `{}`                            |
//! | `command` | out       | `{"action", "timestamp", "order"?}`      |
//! | `report`  | out       | `PackagingSummary`                       |

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use fillmon_traits::Telemetry;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::summary::PackagingSummary;
use crate::types::{ProcessOrder, TankId};
use crate::util::epoch_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Weight,
    Unit,
    Start,
    Stop,
    Command,
    Report,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Weight => "weight",
            EventKind::Unit => "unit",
            EventKind::Start => "start",
            EventKind::Stop => "stop",
            EventKind::Command => "command",
            EventKind::Report => "report",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "weight" => EventKind::Weight,
            "unit" => EventKind::Unit,
            "start" => EventKind::Start,
            "stop" => EventKind::Stop,
            "command" => EventKind::Command,
            "report" => EventKind::Report,
            _ => return Err(()),
        })
    }
}

/// A parsed topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic {
    pub tank: TankId,
    pub kind: EventKind,
}

impl Topic {
    pub fn new(tank: TankId, kind: EventKind) -> Self {
        Self { tank, kind }
    }

    pub fn parse(prefix: &str, topic: &str) -> Result<Self, DecodeError> {
        let rest = topic
            .strip_prefix(prefix)
            .and_then(|r| r.strip_prefix('/'))
            .ok_or_else(|| DecodeError::Topic(topic.to_string()))?;
        let (tank_seg, kind_seg) = rest
            .split_once('/')
            .filter(|(t, k)| !t.is_empty() && !k.contains('/'))
            .ok_or_else(|| DecodeError::Topic(topic.to_string()))?;
        let tank = tank_seg.parse::<TankId>().map_err(|_| DecodeError::TankId {
            topic: topic.to_string(),
            segment: tank_seg.to_string(),
        })?;
        let kind = kind_seg.parse::<EventKind>().map_err(|()| DecodeError::Kind {
            topic: topic.to_string(),
            kind: kind_seg.to_string(),
        })?;
        Ok(Self { tank, kind })
    }

    pub fn format(&self, prefix: &str) -> String {
        format!("{prefix}/{}/{}", self.tank.0, self.kind)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeightPayload {
    weight: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitPayload {
    weight: f64,
    /// Informational only; anything that is not a whole non-negative number
    /// is dropped so the weight still counts.
    #[serde(default)]
    unit_index: Option<serde_json::Value>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_index(v: Option<&serde_json::Value>) -> Option<u64> {
    let v = v?;
    v.as_u64().or_else(|| {
        let f = v.as_f64()?;
        let whole = f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f < u64::MAX as f64;
        whole.then(|| f as u64)
    })
}

#[derive(Deserialize)]
struct StartPayload {
    order: ProcessOrder,
}

/// Event delivered to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    TankWeight {
        tank: TankId,
        weight_kg: f64,
    },
    UnitSample {
        tank: TankId,
        weight_kg: f64,
        unit_index: Option<u64>,
    },
    Start {
        tank: TankId,
        order: ProcessOrder,
    },
    Stop {
        tank: TankId,
    },
}

impl InboundEvent {
    pub fn tank(&self) -> TankId {
        match self {
            InboundEvent::TankWeight { tank, .. }
            | InboundEvent::UnitSample { tank, .. }
            | InboundEvent::Start { tank, .. }
            | InboundEvent::Stop { tank } => *tank,
        }
    }

    /// Decode a raw topic/payload pair.
    pub fn decode(prefix: &str, topic: &str, payload: &[u8]) -> Result<Self, DecodeError> {
        let Topic { tank, kind } = Topic::parse(prefix, topic)?;
        let bad_payload = |e: serde_json::Error| DecodeError::Payload {
            topic: topic.to_string(),
            reason: e.to_string(),
        };
        match kind {
            EventKind::Weight => {
                let p: WeightPayload = serde_json::from_slice(payload).map_err(bad_payload)?;
                Ok(InboundEvent::TankWeight {
                    tank,
                    weight_kg: p.weight,
                })
            }
            EventKind::Unit => {
                let p: UnitPayload = serde_json::from_slice(payload).map_err(bad_payload)?;
                Ok(InboundEvent::UnitSample {
                    tank,
                    weight_kg: p.weight,
                    unit_index: lenient_index(p.unit_index.as_ref()),
                })
            }
            EventKind::Start => {
                let p: StartPayload = serde_json::from_slice(payload).map_err(bad_payload)?;
                Ok(InboundEvent::Start {
                    tank,
                    order: p.order,
                })
            }
            EventKind::Stop => {
                if !payload.iter().all(u8::is_ascii_whitespace) {
                    serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(payload)
                        .map_err(bad_payload)?;
                }
                Ok(InboundEvent::Stop { tank })
            }
            EventKind::Command | EventKind::Report => Err(DecodeError::Kind {
                topic: topic.to_string(),
                kind: kind.to_string(),
            }),
        }
    }

    /// Map a device reading for `tank` onto an event.
    pub fn from_telemetry(tank: TankId, t: Telemetry) -> Self {
        match t {
            Telemetry::TankWeight { weight_kg } => InboundEvent::TankWeight { tank, weight_kg },
            Telemetry::Unit {
                weight_kg,
                unit_index,
            } => InboundEvent::UnitSample {
                tank,
                weight_kg,
                unit_index: Some(unit_index),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandAction {
    Start,
    Stop,
}

#[derive(Serialize)]
struct CommandPayload<'a> {
    action: CommandAction,
    timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<&'a ProcessOrder>,
}

/// Event published by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    Command {
        tank: TankId,
        action: CommandAction,
        timestamp: DateTime<Utc>,
        order: Option<ProcessOrder>,
    },
    Report(Box<PackagingSummary>),
}

impl OutboundEvent {
    pub fn tank(&self) -> TankId {
        match self {
            OutboundEvent::Command { tank, .. } => *tank,
            OutboundEvent::Report(s) => s.tank_id,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            OutboundEvent::Command { .. } => EventKind::Command,
            OutboundEvent::Report(_) => EventKind::Report,
        }
    }

    pub fn topic(&self, prefix: &str) -> String {
        Topic::new(self.tank(), self.kind()).format(prefix)
    }

    pub fn payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            OutboundEvent::Command {
                action,
                timestamp,
                order,
                ..
            } => serde_json::to_vec(&CommandPayload {
                action: *action,
                timestamp: epoch_ms(*timestamp),
                order: order.as_ref(),
            }),
            OutboundEvent::Report(summary) => serde_json::to_vec(summary),
        }
    }
}
