#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the fill-line monitor.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - `OrderFile` is the on-disk form of a process order (one autonomy mode).
//! - The capture CSV loader enforces headers and time ordering for replays.
use serde::Deserialize;

/// Recorded unit-weight capture schema.
///
/// Expected headers:
/// t_ms,weight_kg
///
/// Example:
/// t_ms,weight_kg
/// 0,25.02
/// 2000,24.97
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CaptureRow {
    /// Milliseconds since the session started.
    pub t_ms: u64,
    pub weight_kg: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Line {
    /// Tank numbers monitored by this process.
    pub tanks: Vec<u32>,
    /// Tanks sharing one filling head; at most one of each pair may fill.
    pub exclusive_pairs: Vec<[u32; 2]>,
    /// First topic segment, e.g. "tank" in `tank/3/unit`.
    pub topic_prefix: String,
}

impl Default for Line {
    fn default() -> Self {
        Self {
            tanks: vec![3, 4, 5, 6],
            exclusive_pairs: vec![[3, 4]],
            topic_prefix: "tank".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Band half-width as a fraction of nominal weight.
    pub ratio: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self { ratio: 0.02 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionCfg {
    /// Samples kept for live charting.
    pub buffer_capacity: usize,
    /// Assumed ideal seconds per unit for the performance score.
    pub ideal_cycle_seconds: f64,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            buffer_capacity: 100,
            ideal_cycle_seconds: 2.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AutonomyCfg {
    pub red_below_min: f64,
    pub yellow_below_min: f64,
    pub red_efficiency_pct: f64,
    pub yellow_efficiency_pct: f64,
}

impl Default for AutonomyCfg {
    fn default() -> Self {
        Self {
            red_below_min: 30.0,
            yellow_below_min: 60.0,
            red_efficiency_pct: 80.0,
            yellow_efficiency_pct: 90.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Reports {
    /// Publish `<prefix>/<tank>/command` after start/stop.
    pub emit_commands: bool,
    /// Publish `<prefix>/<tank>/report` after a stop with samples.
    pub emit_reports: bool,
}

impl Default for Reports {
    fn default() -> Self {
        Self {
            emit_commands: true,
            emit_reports: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub line: Line,
    pub tolerance: Tolerance,
    pub session: SessionCfg,
    pub autonomy: AutonomyCfg,
    pub reports: Reports,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Process order as written by an operator or a planning export.
///
/// Exactly one autonomy mode must be populated: `target_quantity` + `gpm`, or
/// `target_quantity_kg` + `packaging_standard_kg_min`.
#[derive(Debug, Deserialize, Clone)]
pub struct OrderFile {
    pub of: String,
    pub legajo: String,
    pub orden_envasado: String,
    pub material: String,
    #[serde(default)]
    pub description: String,
    pub format: String,
    pub target_quantity: Option<u64>,
    pub gpm: Option<f64>,
    pub target_quantity_kg: Option<f64>,
    pub packaging_standard_kg_min: Option<f64>,
}

/// Autonomy mode declared by an `OrderFile`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderMode {
    Count { target_quantity: u64, gpm: f64 },
    Mass {
        target_quantity_kg: f64,
        packaging_standard_kg_min: f64,
    },
}

impl OrderFile {
    /// Resolve which autonomy mode the file declares.
    pub fn mode(&self) -> eyre::Result<OrderMode> {
        let count = (self.target_quantity, self.gpm);
        let mass = (self.target_quantity_kg, self.packaging_standard_kg_min);
        let count_any = count.0.is_some() || count.1.is_some();
        let mass_any = mass.0.is_some() || mass.1.is_some();
        match (count, mass) {
            _ if count_any && mass_any => {
                eyre::bail!("order declares both count and mass autonomy fields; pick one mode")
            }
            ((Some(target_quantity), Some(gpm)), _) => Ok(OrderMode::Count {
                target_quantity,
                gpm,
            }),
            (_, (Some(target_quantity_kg), Some(packaging_standard_kg_min))) => {
                Ok(OrderMode::Mass {
                    target_quantity_kg,
                    packaging_standard_kg_min,
                })
            }
            _ if count_any => eyre::bail!("order count mode needs both target_quantity and gpm"),
            _ if mass_any => eyre::bail!(
                "order mass mode needs both target_quantity_kg and packaging_standard_kg_min"
            ),
            _ => eyre::bail!("order has no autonomy mode (target_quantity + gpm, or target_quantity_kg + packaging_standard_kg_min)"),
        }
    }
}

pub fn load_order_toml(s: &str) -> Result<OrderFile, toml::de::Error> {
    toml::from_str::<OrderFile>(s)
}

/// Largest `t_ms` a capture row may carry; later offsets cannot be placed on
/// a calendar.
pub const MAX_CAPTURE_T_MS: u64 = i64::MAX as u64 / 1000;

pub fn load_capture_csv(path: &std::path::Path) -> eyre::Result<Vec<CaptureRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open capture CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["t_ms", "weight_kg"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "capture CSV must have headers 't_ms,weight_kg', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<CaptureRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<CaptureRow>().enumerate() {
        let row = match rec {
            Ok(row) => row,
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        };
        if row.t_ms > MAX_CAPTURE_T_MS {
            eyre::bail!(
                "capture row {} has implausible t_ms {} (max {})",
                idx + 2,
                row.t_ms,
                MAX_CAPTURE_T_MS
            );
        }
        if let Some(prev) = rows.last()
            && row.t_ms < prev.t_ms
        {
            eyre::bail!(
                "capture rows must be time-ordered: row {} has t_ms {} < {}",
                idx + 2,
                row.t_ms,
                prev.t_ms
            );
        }
        rows.push(row);
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Line
        if self.line.tanks.is_empty() {
            eyre::bail!("line.tanks must list at least one tank");
        }
        for (i, t) in self.line.tanks.iter().enumerate() {
            if self.line.tanks[..i].contains(t) {
                eyre::bail!("line.tanks lists tank {t} more than once");
            }
        }
        for (i, [a, b]) in self.line.exclusive_pairs.iter().enumerate() {
            if a == b {
                eyre::bail!("line.exclusive_pairs: tank {a} cannot be paired with itself");
            }
            for t in [a, b] {
                if !self.line.tanks.contains(t) {
                    eyre::bail!("line.exclusive_pairs references unknown tank {t}");
                }
                let seen = self.line.exclusive_pairs[..i]
                    .iter()
                    .any(|p| p.contains(t));
                if seen {
                    eyre::bail!("line.exclusive_pairs: tank {t} belongs to more than one pair");
                }
            }
        }
        let prefix = &self.line.topic_prefix;
        if prefix.is_empty() || prefix.starts_with('/') || prefix.ends_with('/') {
            eyre::bail!("line.topic_prefix must be non-empty without leading/trailing '/'");
        }
        if prefix.contains(['+', '#']) {
            eyre::bail!("line.topic_prefix must not contain wildcards");
        }

        // Tolerance
        if !(self.tolerance.ratio > 0.0 && self.tolerance.ratio <= 0.5) {
            eyre::bail!("tolerance.ratio must be in (0.0, 0.5]");
        }

        // Session
        if self.session.buffer_capacity == 0 {
            eyre::bail!("session.buffer_capacity must be >= 1");
        }
        if self.session.buffer_capacity > 100_000 {
            eyre::bail!("session.buffer_capacity is unreasonably large (>100000)");
        }
        if !(self.session.ideal_cycle_seconds.is_finite() && self.session.ideal_cycle_seconds > 0.0)
        {
            eyre::bail!("session.ideal_cycle_seconds must be > 0");
        }

        // Autonomy
        let a = &self.autonomy;
        for (name, v) in [
            ("red_below_min", a.red_below_min),
            ("yellow_below_min", a.yellow_below_min),
            ("red_efficiency_pct", a.red_efficiency_pct),
            ("yellow_efficiency_pct", a.yellow_efficiency_pct),
        ] {
            if !v.is_finite() || v < 0.0 {
                eyre::bail!("autonomy.{name} must be a finite value >= 0");
            }
        }
        if a.yellow_below_min < a.red_below_min {
            eyre::bail!("autonomy.yellow_below_min must be >= autonomy.red_below_min");
        }
        if a.yellow_efficiency_pct < a.red_efficiency_pct {
            eyre::bail!("autonomy.yellow_efficiency_pct must be >= autonomy.red_efficiency_pct");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        Ok(())
    }
}
