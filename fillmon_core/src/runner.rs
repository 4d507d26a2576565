//! Single-threaded event loop.
//!
//! Producers (stdin readers, telemetry pumps) only send into a channel; `run`
//! drains it on the calling thread and hands each message to the engine in
//! arrival order. Stopping the loop never stops a filling session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use fillmon_traits::EventSink;

use crate::engine::{Engine, Outcome};
use crate::events::InboundEvent;

/// How often an idle loop re-checks the shutdown flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One message for the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Undecoded topic/payload, as received from a broker or a log.
    Raw { topic: String, payload: Vec<u8> },
    /// Already-typed event (telemetry pumps, in-process callers).
    Event(InboundEvent),
}

impl Inbound {
    pub fn raw(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Inbound::Raw {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Tallies of one `run`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub handled: u64,
    pub samples: u64,
    pub ignored: u64,
    pub rejected: u64,
    pub malformed: u64,
    pub reports: u64,
}

impl RunStats {
    fn record(&mut self, outcome: &Outcome) {
        self.handled += 1;
        match outcome {
            Outcome::Sample(_) => self.samples += 1,
            Outcome::Ignored => self.ignored += 1,
            Outcome::Rejected(_) => self.rejected += 1,
            Outcome::Malformed(_) => self.malformed += 1,
            Outcome::Stopped(Some(_)) => self.reports += 1,
            Outcome::Updated | Outcome::Started | Outcome::Stopped(None) => {}
        }
    }
}

/// Drain `rx` until every sender is gone or `shutdown` is set.
pub fn run<K: EventSink>(
    engine: &mut Engine<K>,
    rx: &xch::Receiver<Inbound>,
    shutdown: &AtomicBool,
) -> RunStats {
    run_with(engine, rx, shutdown, |_| {})
}

/// `run`, calling `on_outcome` after every handled message.
pub fn run_with<K: EventSink, F: FnMut(&Outcome)>(
    engine: &mut Engine<K>,
    rx: &xch::Receiver<Inbound>,
    shutdown: &AtomicBool,
    mut on_outcome: F,
) -> RunStats {
    let mut stats = RunStats::default();
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!(handled = stats.handled, "event loop shutting down");
            break;
        }
        let msg = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(m) => m,
            Err(xch::RecvTimeoutError::Timeout) => continue,
            Err(xch::RecvTimeoutError::Disconnected) => {
                tracing::debug!(handled = stats.handled, "all producers gone");
                break;
            }
        };
        let outcome = match msg {
            Inbound::Raw { topic, payload } => engine.handle_raw(&topic, &payload),
            Inbound::Event(ev) => engine.handle(ev),
        };
        stats.record(&outcome);
        on_outcome(&outcome);
    }
    stats
}
