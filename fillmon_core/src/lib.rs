#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Fill-line session monitoring engine (transport-agnostic).
//!
//! Tanks run packaging sessions; while a session is filling, unit weights
//! arrive as telemetry and are classified against a tolerance band, kept in a
//! short rolling window for charts and tallied into an end-of-session report.
//! Nothing here talks to a broker: inbound messages are handed to `Engine`
//! and outbound ones leave through `fillmon_traits::EventSink`.
//!
//! ## Architecture
//!
//! - **Classification**: inclusive within/alert/out bands (`classifier`)
//! - **Session state**: rolling buffer + running metrics per tank (`session`)
//! - **Line rules**: paired tanks that share a filler (`arbiter`, `registry`)
//! - **Reporting**: OEE-style summary on stop (`summary`)
//! - **Projection**: pull-based autonomy / alert level (`autonomy`)
//! - **Wiring**: topic codec, engine, event loop (`events`, `engine`, `runner`)

pub mod arbiter;
pub mod autonomy;
pub mod buffer;
pub mod builder;
pub mod classifier;
pub mod config;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod events;
pub mod metrics;
pub mod mocks;
pub mod registry;
pub mod runner;
pub mod sampler;
pub mod session;
pub mod status;
pub mod summary;
pub mod types;
pub mod util;

pub use arbiter::TankPairArbiter;
pub use autonomy::{
    AlertLevel, AlertThresholds, AutonomyProjection, AutonomyProjector, CountProjection,
    MassProjection,
};
pub use buffer::{RollingSampleBuffer, WeightSample};
pub use builder::{EngineBuilder, Missing};
pub use classifier::{Classification, ToleranceBand, classify};
pub use config::{EngineCfg, LineLayout};
pub use engine::{Engine, Outcome};
pub use error::{BuildError, BusyReason, DecodeError, Result, SessionError};
pub use events::{CommandAction, EventKind, InboundEvent, OutboundEvent, Topic};
pub use metrics::{ClassCounts, MetricsAccumulator, MetricsResult, WeightStats};
pub use registry::SessionRegistry;
pub use runner::{Inbound, RunStats};
pub use sampler::TelemetryPump;
pub use session::{SessionController, TankSession};
pub use status::SessionStatus;
pub use summary::{OeeScore, PackagingSummary, SummaryBuilder};
pub use types::{AutonomyMode, Format, ProcessOrder, TankId};
