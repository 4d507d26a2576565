use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Wall clock abstraction used for session timing and report timestamps.
///
/// - now(): current UTC time
/// - ms_since(): helper to compute elapsed milliseconds from an earlier instant
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds elapsed since `earlier`, saturating at 0 when `earlier` is in the future.
    fn ms_since(&self, earlier: DateTime<Utc>) -> u64 {
        let ms = (self.now() - earlier).num_milliseconds();
        u64::try_from(ms).unwrap_or(0)
    }
}

/// Default clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock whose time only moves when told to.
///
/// now() = origin + offset. Clones share the same offset, so a handle kept by a
/// test or a replay driver advances the clock seen by the engine.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: DateTime<Utc>,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            offset: Arc::new(Mutex::new(Duration::zero())),
        }
    }

    /// Advance the clock by the given duration. An advance that would
    /// overflow leaves the clock where it is.
    pub fn advance(&self, d: std::time::Duration) {
        let step = Duration::from_std(d).unwrap_or(Duration::zero());
        if let Ok(mut off) = self.offset.lock()
            && let Some(next) = off.checked_add(&step)
        {
            *off = next;
        }
    }

    /// Set the absolute offset relative to origin.
    pub fn set_offset(&self, d: std::time::Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = Duration::from_std(d).unwrap_or(Duration::zero());
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::zero());
        self.origin
            .checked_add_signed(off)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let clock = ManualClock::new();
        let t0 = clock.now();
        assert_eq!(clock.now(), t0);
        clock.advance(std::time::Duration::from_millis(1500));
        assert_eq!(clock.ms_since(t0), 1500);
    }

    #[test]
    fn clones_share_offset() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        let t0 = clock.now();
        handle.set_offset(std::time::Duration::from_secs(60));
        assert_eq!(clock.ms_since(t0), 60_000);
    }

    #[test]
    fn huge_offsets_saturate_instead_of_panicking() {
        let clock = ManualClock::new();
        let step = std::time::Duration::from_secs(1 << 50);
        clock.set_offset(step);
        assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);
        // the offset itself overflows after a few more steps
        for _ in 0..10 {
            clock.advance(step);
        }
        assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn ms_since_saturates_for_future_instants() {
        let clock = ManualClock::new();
        let future = clock.now() + Duration::seconds(5);
        assert_eq!(clock.ms_since(future), 0);
    }
}
