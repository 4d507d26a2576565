#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use fillmon_core::mocks::RecordingSink;
use fillmon_core::{AutonomyMode, Engine, EngineCfg, Format, ProcessOrder};
use fillmon_traits::ManualClock;

pub fn count_order(format: Format, target_units: u64, gpm: f64) -> ProcessOrder {
    ProcessOrder {
        of: "OF-2025-0042".into(),
        legajo: "1187".into(),
        orden_envasado: "OE-311".into(),
        material: "3295".into(),
        description: "Latex exterior blanco".into(),
        format,
        autonomy: AutonomyMode::CountBased {
            target_units,
            rate_units_per_min: gpm,
        },
    }
}

pub fn mass_order(format: Format, target_kg: f64, rate_kg_per_min: f64) -> ProcessOrder {
    ProcessOrder {
        autonomy: AutonomyMode::MassBased {
            target_kg,
            rate_kg_per_min,
        },
        ..count_order(format, 1, 1.0)
    }
}

pub fn clock() -> ManualClock {
    ManualClock::starting_at(Utc.with_ymd_and_hms(2025, 5, 12, 6, 0, 0).unwrap())
}

/// Default line (TK3..TK6, TK3/TK4 paired) with a manual clock and a recording sink.
pub fn engine_with(cfg: EngineCfg) -> (Engine<RecordingSink>, ManualClock, RecordingSink) {
    let clock = clock();
    let sink = RecordingSink::new();
    let engine = Engine::builder()
        .with_sink(sink.clone())
        .with_cfg(cfg)
        .with_clock(clock.clone())
        .build()
        .expect("default engine builds");
    (engine, clock, sink)
}

pub fn engine() -> (Engine<RecordingSink>, ManualClock, RecordingSink) {
    engine_with(EngineCfg::default())
}
