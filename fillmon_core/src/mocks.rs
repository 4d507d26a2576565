//! Test and helper sinks/sources for fillmon_core.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use fillmon_traits::{EventSink, Telemetry, TelemetrySource};

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(
        &mut self,
        _topic: &str,
        _payload: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// Keeps every published message. Clones share the same log, so a test can
/// hand one clone to the engine and inspect the other.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    log: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of `(topic, payload)` pairs in publish order.
    pub fn messages(&self) -> Vec<(String, Vec<u8>)> {
        self.log.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn topics(&self) -> Vec<String> {
        self.messages().into_iter().map(|(t, _)| t).collect()
    }

    /// Payloads parsed as JSON; unparsable payloads are skipped.
    pub fn json(&self) -> Vec<(String, serde_json::Value)> {
        self.messages()
            .into_iter()
            .filter_map(|(t, p)| serde_json::from_slice(&p).ok().map(|v| (t, v)))
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut g) = self.log.lock() {
            g.clear();
        }
    }
}

impl EventSink for RecordingSink {
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.log
            .lock()
            .map_err(|_| std::io::Error::other("recording sink poisoned"))?
            .push((topic.to_string(), payload.to_vec()));
        Ok(())
    }
}

/// A sink whose broker is always down.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSink;

impl EventSink for FailingSink {
    fn publish(
        &mut self,
        _topic: &str,
        _payload: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("broker unavailable")))
    }
}

/// Replays a fixed list of readings, then reports exhaustion.
#[derive(Debug, Default, Clone)]
pub struct ScriptedSource {
    readings: VecDeque<Telemetry>,
}

impl ScriptedSource {
    pub fn new(readings: impl IntoIterator<Item = Telemetry>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
        }
    }
}

impl TelemetrySource for ScriptedSource {
    fn poll(&mut self) -> Result<Option<Telemetry>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.readings.pop_front())
    }
}
