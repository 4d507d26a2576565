#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! `fillmon`: drive fill-line sessions from captures, the simulator, or a
//! stream of topic/payload messages.

mod cli;
mod error_fmt;
mod listen;
mod logging;
mod session;
mod sink;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use fillmon_config::Config;
use fillmon_core::Engine;
use serde_json::json;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::session::SimOpts;
use crate::sink::StdoutSink;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(err) = run(cli) {
        tracing::error!(error = %err, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        std::process::exit(error_fmt::exit_code_for_error(&err));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;
    let cfg = load_config(&cli.config)?;
    logging::init(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Replay {
            tank,
            order,
            samples,
        } => {
            let order = session::load_order(&order)?;
            let rows = fillmon_config::load_capture_csv(&samples)?;
            let run = session::replay(&cfg, tank, order, &rows)?;
            session::print_run(&run, cli.json);
        }
        Commands::Simulate {
            tank,
            order,
            units,
            cycle_ms,
            seed,
            tank_kg,
            realtime,
        } => {
            let order = session::load_order(&order)?;
            let opts = SimOpts {
                units,
                cycle_ms,
                seed,
                tank_kg,
            };
            let run = if realtime {
                let shutdown = shutdown_on_ctrlc()?;
                session::simulate_realtime(&cfg, tank, order, opts, &shutdown)?
            } else {
                session::simulate(&cfg, tank, order, opts)?
            };
            session::print_run(&run, cli.json);
        }
        Commands::Listen { input } => {
            let shutdown = shutdown_on_ctrlc()?;
            let run = listen::listen(&cfg, input.as_deref(), &shutdown)?;
            if cli.json {
                println!("{}", run.to_json());
            }
        }
        Commands::SelfCheck => self_check(&cfg, &cli.config, cli.json)?,
    }
    Ok(())
}

fn load_config(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = fillmon_config::load_toml(&text)?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// Ctrl-C sets the returned flag; loops stop at their next check.
fn shutdown_on_ctrlc() -> eyre::Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })
    .wrap_err("install Ctrl-C handler")?;
    Ok(shutdown)
}

fn self_check(cfg: &Config, path: &Path, json: bool) -> eyre::Result<()> {
    let engine = Engine::builder()
        .with_sink(StdoutSink)
        .with_config(cfg)
        .build()?;
    let registry = engine.registry();
    let tanks: Vec<_> = registry.tanks().collect();
    let pairs = registry.arbiter().pairs();
    let prefix = &engine.cfg().topic_prefix;

    if json {
        println!(
            "{}",
            json!({
                "status": "ok",
                "config": path.display().to_string(),
                "tanks": tanks,
                "exclusivePairs": pairs,
                "topicPrefix": prefix,
                "toleranceRatio": engine.cfg().tolerance_ratio,
            })
        );
        return Ok(());
    }

    let list = |ids: &mut dyn Iterator<Item = String>| ids.collect::<Vec<_>>().join(", ");
    println!("OK: config {}", path.display());
    println!("tanks: {}", list(&mut tanks.iter().map(ToString::to_string)));
    let pair_text = list(&mut pairs.iter().map(|(a, b)| format!("{a}/{b}")));
    println!(
        "exclusive pairs: {}",
        if pair_text.is_empty() { "none" } else { pair_text.as_str() }
    );
    println!("topics: {prefix}/<tank>/<weight|unit|start|stop|command|report>");
    println!(
        "tolerance: +/-{:.2}% of nominal",
        engine.cfg().tolerance_ratio * 100.0
    );
    Ok(())
}
