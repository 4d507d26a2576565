use std::fmt;

use thiserror::Error;

use crate::types::TankId;

/// Rejected session transition. Returned synchronously; state is left untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("tank {tank} is busy: {reason}")]
    Busy { tank: TankId, reason: BusyReason },
    #[error("tank {0} has no session in progress")]
    NotFilling(TankId),
    #[error("unknown tank {0}")]
    UnknownTank(TankId),
    #[error("invalid order: {0}")]
    InvalidOrder(String),
}

/// Why a start was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyReason {
    AlreadyFilling,
    /// The tank sharing this line is filling.
    PartnerFilling(TankId),
}

impl fmt::Display for BusyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusyReason::AlreadyFilling => f.write_str("a session is already in progress"),
            BusyReason::PartnerFilling(p) => write!(f, "paired tank {p} is filling"),
        }
    }
}

/// Inbound message that could not be turned into an event.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    #[error("topic {0:?} does not match <prefix>/<tank>/<kind>")]
    Topic(String),
    #[error("topic {topic:?}: invalid tank id {segment:?}")]
    TankId { topic: String, segment: String },
    #[error("topic {topic:?}: unknown event kind {kind:?}")]
    Kind { topic: String, kind: String },
    #[error("topic {topic:?}: invalid payload: {reason}")]
    Payload { topic: String, reason: String },
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
