pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

/// A single reading produced by a filling line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Telemetry {
    /// Inventory left in the tank, in kilograms.
    TankWeight { weight_kg: f64 },
    /// A finished unit came off the filling head.
    Unit { weight_kg: f64, unit_index: u64 },
}

/// Source of line telemetry (scales, simulators, recorded captures).
///
/// `Ok(None)` means the source is exhausted.
pub trait TelemetrySource {
    fn poll(&mut self) -> Result<Option<Telemetry>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Outbound publish capability for command and report events.
pub trait EventSink {
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).publish(topic, payload)
    }
}
