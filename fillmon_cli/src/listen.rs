//! `listen`: envelope lines in, event loop, outbound envelopes out.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::AtomicBool;

use crossbeam_channel as xch;
use eyre::WrapErr;
use fillmon_config::Config;
use fillmon_core::runner::{self, Inbound, RunStats};
use fillmon_core::{Engine, Outcome, PackagingSummary, SessionStatus};
use serde_json::json;

use crate::sink::{StdoutSink, decode_envelope};

/// Messages buffered between the reader thread and the loop.
const QUEUE_DEPTH: usize = 1024;

/// What a `listen` run leaves behind: loop tallies and every session it
/// closed, in closing order. Kept in memory only.
#[derive(Debug, Default)]
pub struct ListenRun {
    pub stats: RunStats,
    pub summaries: Vec<PackagingSummary>,
}

impl ListenRun {
    /// One line per closed session for the finish log.
    pub fn closed_labels(&self) -> Vec<String> {
        self.summaries
            .iter()
            .map(|s| format!("{} {} ({} units)", s.tank_id, s.order.of, s.total_units))
            .collect()
    }

    /// Trailer printed after the outbound envelopes in `--json` mode.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "summaries": self.summaries,
            "handled": self.stats.handled,
            "rejected": self.stats.rejected,
            "malformed": self.stats.malformed,
        })
    }
}

pub fn listen(cfg: &Config, input: Option<&Path>, shutdown: &AtomicBool) -> eyre::Result<ListenRun> {
    let mut engine = Engine::builder()
        .with_sink(StdoutSink)
        .with_config(cfg)
        .build()?;

    let reader: Box<dyn BufRead + Send> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).wrap_err_with(|| format!("open input {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let (tx, rx) = xch::bounded::<Inbound>(QUEUE_DEPTH);
    // Detached: a blocked stdin read must not hold up shutdown.
    std::thread::Builder::new()
        .name("listen-reader".into())
        .spawn(move || read_envelopes(reader, &tx))
        .wrap_err("spawn input reader")?;

    let mut summaries = Vec::new();
    let stats = runner::run_with(&mut engine, &rx, shutdown, |outcome| {
        if let Outcome::Stopped(Some(s)) = outcome {
            tracing::info!(
                tank = %s.tank_id,
                units = s.total_units,
                quality = s.quality,
                "session closed"
            );
            summaries.push((**s).clone());
        }
    });
    let run = ListenRun { stats, summaries };

    let registry = engine.registry();
    let filling: Vec<String> = registry
        .tanks()
        .filter(|t| registry.status(*t) == Ok(SessionStatus::Filling))
        .map(|t| t.to_string())
        .collect();
    if !filling.is_empty() {
        tracing::info!(tanks = ?filling, "sessions left filling at exit");
    }
    tracing::info!(
        handled = stats.handled,
        samples = stats.samples,
        ignored = stats.ignored,
        rejected = stats.rejected,
        malformed = stats.malformed,
        reports = stats.reports,
        sessions = run.summaries.len(),
        closed = ?run.closed_labels(),
        "listen finished"
    );
    Ok(run)
}

fn read_envelopes(reader: impl BufRead, tx: &xch::Sender<Inbound>) {
    for (n, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, "input read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match decode_envelope(&line) {
            Ok((topic, payload)) => {
                if tx.send(Inbound::Raw { topic, payload }).is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!(line = n + 1, error = %e, "skipping unreadable input line"),
        }
    }
    tracing::debug!("input exhausted");
}
