//! Background telemetry pumping.
//!
//! Spawns a thread that owns a `TelemetrySource`, maps each reading to an
//! `InboundEvent` for one tank and pushes it into the event loop's channel.
//! The thread ends when the source is exhausted, the receiver goes away, or
//! the pump is dropped.
//!
//! Each `TelemetryPump` owns exactly one thread and joins it on drop.
use crossbeam_channel as xch;
use fillmon_traits::TelemetrySource;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::events::InboundEvent;
use crate::runner::Inbound;
use crate::types::TankId;

/// How long a blocked send waits before re-checking the shutdown flag.
const SEND_RETRY: Duration = Duration::from_millis(50);

pub struct TelemetryPump {
    forwarded: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl TelemetryPump {
    /// Poll `source` every `period` (zero: as fast as it yields) and forward
    /// readings for `tank` into `tx`.
    pub fn spawn<S: TelemetrySource + Send + 'static>(
        mut source: S,
        tank: TankId,
        period: Duration,
        tx: xch::Sender<Inbound>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let forwarded = Arc::new(AtomicU64::new(0));
        let forwarded_clone = forwarded.clone();

        let join_handle = std::thread::spawn(move || {
            'poll: loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!(tank = %tank, "telemetry pump received shutdown signal");
                    break;
                }

                match source.poll() {
                    Ok(Some(reading)) => {
                        let mut msg = Inbound::Event(InboundEvent::from_telemetry(tank, reading));
                        loop {
                            match tx.send_timeout(msg, SEND_RETRY) {
                                Ok(()) => break,
                                Err(xch::SendTimeoutError::Timeout(m)) => {
                                    if shutdown_clone.load(Ordering::Relaxed) {
                                        break 'poll;
                                    }
                                    msg = m;
                                }
                                Err(xch::SendTimeoutError::Disconnected(_)) => {
                                    tracing::debug!(tank = %tank, "event loop gone, pump exiting");
                                    break 'poll;
                                }
                            }
                        }
                        forwarded_clone.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(None) => {
                        tracing::debug!(tank = %tank, "telemetry source exhausted");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(tank = %tank, error = %e, "telemetry read failed");
                    }
                }

                if !period.is_zero() {
                    std::thread::sleep(period);
                }
            }
            tracing::trace!(tank = %tank, "telemetry pump exiting cleanly");
        });

        Self {
            forwarded,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Readings handed to the channel so far.
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_none_or(std::thread::JoinHandle::is_finished)
    }
}

impl Drop for TelemetryPump {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("telemetry pump joined");
                }
                Err(e) => {
                    tracing::warn!(?e, "telemetry pump panicked during shutdown");
                }
            }
        }
    }
}
