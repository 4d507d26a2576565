//! Tracing subscriber setup.
//!
//! Console output goes to stderr so stdout stays machine-readable. The filter
//! comes from `RUST_LOG`, else `--log-level`, else `[logging].level`, else
//! `info`. An optional JSON-lines file layer is added when `[logging].file`
//! is set; its worker guard lives in `FILE_GUARD` for the whole process.

use std::path::Path;

use eyre::WrapErr;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::FILE_GUARD;

pub fn init(json: bool, cli_level: Option<&str>, cfg: &fillmon_config::Logging) -> eyre::Result<()> {
    let level = cli_level.or(cfg.level.as_deref()).unwrap_or("info");
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level)
            .wrap_err_with(|| format!("invalid log level {level:?}"))?,
    };

    let console: Box<dyn Layer<Registry> + Send + Sync> = if json {
        fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file = match cfg.file.as_deref() {
        Some(path) => {
            let appender = file_appender(Path::new(path), cfg.rotation.as_deref())?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(filter)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}

fn file_appender(path: &Path, rotation: Option<&str>) -> eyre::Result<rolling::RollingFileAppender> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let Some(name) = path.file_name() else {
        eyre::bail!("logging.file {path:?} has no file name");
    };
    Ok(match rotation.unwrap_or("never") {
        "daily" => rolling::daily(dir, name),
        "hourly" => rolling::hourly(dir, name),
        _ => rolling::never(dir, name),
    })
}
