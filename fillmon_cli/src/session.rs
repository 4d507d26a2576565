//! One-shot sessions: start, feed a capture or the simulated line, project,
//! stop. Outbound command/report events go to stdout through `StdoutSink`.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::WrapErr;
use fillmon_config::{CaptureRow, Config};
use fillmon_core::autonomy::{AlertLevel, AutonomyProjection};
use fillmon_core::runner::{self, Inbound};
use fillmon_core::{
    Engine, InboundEvent, Outcome, PackagingSummary, ProcessOrder, TankId, TelemetryPump,
};
use fillmon_sim::SimulatedLine;
use fillmon_traits::{ManualClock, Telemetry};
use serde_json::json;

use crate::sink::StdoutSink;

/// What a finished one-shot session produced.
#[derive(Debug)]
pub struct SessionRun {
    pub tank: TankId,
    /// Taken just before the stop.
    pub projection: AutonomyProjection,
    /// `None` when no unit was recorded.
    pub summary: Option<PackagingSummary>,
}

#[derive(Debug, Clone, Copy)]
pub struct SimOpts {
    pub units: u64,
    pub cycle_ms: u64,
    pub seed: u32,
    pub tank_kg: f64,
}

pub fn load_order(path: &Path) -> eyre::Result<ProcessOrder> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read order file {}", path.display()))?;
    let file = fillmon_config::load_order_toml(&text)?;
    ProcessOrder::try_from(&file)
}

fn engine_with_clock(cfg: &Config, clock: ManualClock) -> eyre::Result<Engine<StdoutSink>> {
    Ok(Engine::builder()
        .with_sink(StdoutSink)
        .with_config(cfg)
        .with_clock(clock)
        .build()?)
}

/// Feed one event; a rejected or malformed event aborts the run.
fn feed(engine: &mut Engine<StdoutSink>, ev: InboundEvent) -> eyre::Result<()> {
    match engine.handle(ev) {
        Outcome::Rejected(e) => Err(e.into()),
        Outcome::Malformed(e) => Err(e.into()),
        _ => Ok(()),
    }
}

fn finish(engine: &mut Engine<StdoutSink>, tank: TankId) -> eyre::Result<SessionRun> {
    let projection = engine.project_autonomy(tank)?;
    let summary = engine.stop(tank)?;
    Ok(SessionRun {
        tank,
        projection,
        summary,
    })
}

/// Replay a capture. Session time follows the rows' `t_ms`.
pub fn replay(
    cfg: &Config,
    tank: TankId,
    order: ProcessOrder,
    rows: &[CaptureRow],
) -> eyre::Result<SessionRun> {
    let clock = ManualClock::new();
    let mut engine = engine_with_clock(cfg, clock.clone())?;
    engine.start(tank, order)?;
    tracing::info!(tank = %tank, samples = rows.len(), "replaying capture");
    for row in rows {
        clock.set_offset(Duration::from_millis(row.t_ms));
        feed(
            &mut engine,
            InboundEvent::UnitSample {
                tank,
                weight_kg: row.weight_kg,
                unit_index: None,
            },
        )?;
    }
    finish(&mut engine, tank)
}

fn simulated_line(cfg: &Config, order: &ProcessOrder, opts: SimOpts) -> eyre::Result<SimulatedLine> {
    Ok(SimulatedLine::new(order.nominal_kg(), opts.tank_kg, opts.seed)?
        .with_tolerance_ratio(cfg.tolerance.ratio)?
        .with_unit_limit(opts.units))
}

/// Run the simulated line on a manual clock, one unit every `cycle_ms`.
pub fn simulate(
    cfg: &Config,
    tank: TankId,
    order: ProcessOrder,
    opts: SimOpts,
) -> eyre::Result<SessionRun> {
    let line = simulated_line(cfg, &order, opts)?;
    let clock = ManualClock::new();
    let mut engine = engine_with_clock(cfg, clock.clone())?;
    engine.start(tank, order)?;
    feed(
        &mut engine,
        InboundEvent::TankWeight {
            tank,
            weight_kg: opts.tank_kg,
        },
    )?;
    let cycle = Duration::from_millis(opts.cycle_ms);
    for reading in line {
        if matches!(reading, Telemetry::Unit { .. }) {
            clock.advance(cycle);
        }
        feed(&mut engine, InboundEvent::from_telemetry(tank, reading))?;
    }
    finish(&mut engine, tank)
}

/// Run the simulated line on the wall clock: a pump thread paces readings
/// into the event loop until the line stops or `shutdown` is set.
pub fn simulate_realtime(
    cfg: &Config,
    tank: TankId,
    order: ProcessOrder,
    opts: SimOpts,
    shutdown: &AtomicBool,
) -> eyre::Result<SessionRun> {
    let line = simulated_line(cfg, &order, opts)?;
    let mut engine = Engine::builder()
        .with_sink(StdoutSink)
        .with_config(cfg)
        .build()?;
    engine.start(tank, order)?;

    let (tx, rx) = crossbeam_channel::bounded::<Inbound>(64);
    tx.send(Inbound::Event(InboundEvent::TankWeight {
        tank,
        weight_kg: opts.tank_kg,
    }))?;
    // a unit and its tank reading per cycle
    let pump = TelemetryPump::spawn(line, tank, Duration::from_millis(opts.cycle_ms / 2), tx);
    let stats = runner::run(&mut engine, &rx, shutdown);
    drop(pump);
    tracing::info!(
        tank = %tank,
        samples = stats.samples,
        rejected = stats.rejected,
        "simulated line finished"
    );
    finish(&mut engine, tank)
}

pub fn print_run(run: &SessionRun, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "tank": run.tank,
                "projection": run.projection,
                "summary": run.summary,
            })
        );
        return;
    }
    println!("{}: {}", run.tank, describe_projection(&run.projection));
    match &run.summary {
        Some(s) => println!("{}", describe_summary(s)),
        None => println!("{}: no units recorded, no summary", run.tank),
    }
}

fn level_name(level: AlertLevel) -> &'static str {
    match level {
        AlertLevel::Green => "green",
        AlertLevel::Yellow => "yellow",
        AlertLevel::Red => "red",
    }
}

fn pct(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}%"))
}

pub fn describe_projection(p: &AutonomyProjection) -> String {
    match p {
        AutonomyProjection::Count(c) => format!(
            "count autonomy: ideal remaining {:.2} min, real remaining {:.2} min, throughput {:.2}/min, efficiency {}, progress {:.2}%, alert {}",
            c.ideal_remaining_min,
            c.real_remaining_min,
            c.real_throughput_per_min,
            pct(c.efficiency_pct),
            c.progress_pct,
            level_name(c.level)
        ),
        AutonomyProjection::Mass(m) => format!(
            "mass autonomy: {:.2} min left in tank, progress {}, alert {}",
            m.autonomy_min,
            pct(m.progress_pct),
            level_name(m.level)
        ),
        AutonomyProjection::Indeterminate => "autonomy indeterminate".to_string(),
    }
}

pub fn describe_summary(s: &PackagingSummary) -> String {
    format!(
        "{tank} summary ({of}, {format}, {dur} s)\n  \
         units: {total} (within {within}, alert {alert}, out {out})\n  \
         weight avg/min/max: {avg:.2} / {min:.2} / {max:.2} kg (tolerance {lo:.2}..{hi:.2} kg)\n  \
         availability {avail:.2}%, performance {perf}, quality {quality:.2}%, OEE {oee}",
        tank = s.tank_id,
        of = s.order.of,
        format = s.order.format,
        dur = s.duration_seconds,
        total = s.total_units,
        within = s.within_tolerance,
        alert = s.in_alert,
        out = s.out_of_tolerance,
        avg = s.average_weight,
        min = s.min_weight,
        max = s.max_weight,
        lo = s.tolerance_min_kg,
        hi = s.tolerance_max_kg,
        avail = s.availability,
        perf = pct(s.performance),
        quality = s.quality,
        oee = pct(s.oee),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fillmon_core::autonomy::{CountProjection, MassProjection};

    #[test]
    fn projection_text_names_mode_and_level() {
        let p = AutonomyProjection::Count(CountProjection {
            ideal_remaining_min: 12.0,
            real_throughput_per_min: 62.5,
            real_remaining_min: 8.0,
            efficiency_pct: Some(125.0),
            progress_pct: 50.0,
            level: AlertLevel::Red,
        });
        let text = describe_projection(&p);
        assert!(text.starts_with("count autonomy"));
        assert!(text.contains("efficiency 125.00%"));
        assert!(text.ends_with("alert red"));

        let m = AutonomyProjection::Mass(MassProjection {
            autonomy_min: 90.0,
            progress_pct: None,
            level: AlertLevel::Green,
        });
        assert!(describe_projection(&m).contains("progress n/a"));
        assert_eq!(
            describe_projection(&AutonomyProjection::Indeterminate),
            "autonomy indeterminate"
        );
    }
}
