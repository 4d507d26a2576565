//! Stdout transport: every message is one `{"topic","payload"}` JSON line.
//!
//! The same envelope is accepted by `listen`, so the output of one run can be
//! piped into another.

use std::io::Write;

use fillmon_traits::EventSink;
use serde_json::{Value, json};

/// Publishes outbound events to stdout as JSON lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl EventSink for StdoutSink {
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let line = encode_envelope(topic, payload);
        let mut out = std::io::stdout().lock();
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

/// JSON payloads are embedded as values, anything else as a string.
pub fn encode_envelope(topic: &str, payload: &[u8]) -> Value {
    let payload = serde_json::from_slice::<Value>(payload)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(payload).into_owned()));
    json!({ "topic": topic, "payload": payload })
}

/// Split an envelope line into topic and raw payload bytes. A string payload
/// is taken verbatim; a missing or null payload is empty.
pub fn decode_envelope(line: &str) -> eyre::Result<(String, Vec<u8>)> {
    let v: Value = serde_json::from_str(line)?;
    let Some(topic) = v.get("topic").and_then(Value::as_str) else {
        eyre::bail!("message has no \"topic\" string");
    };
    let payload = match v.get("payload") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => s.clone().into_bytes(),
        Some(other) => serde_json::to_vec(other)?,
    };
    Ok((topic.to_string(), payload))
}
