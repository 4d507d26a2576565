//! `From` implementations bridging `fillmon_config` types to `fillmon_core` types.

use crate::autonomy::AlertThresholds;
use crate::config::{EngineCfg, LineLayout};
use crate::types::{AutonomyMode, Format, ProcessOrder, TankId};

// ── AlertThresholds ──────────────────────────────────────────────────────────

impl From<&fillmon_config::AutonomyCfg> for AlertThresholds {
    fn from(c: &fillmon_config::AutonomyCfg) -> Self {
        Self {
            red_below_min: c.red_below_min,
            yellow_below_min: c.yellow_below_min,
            red_efficiency_pct: c.red_efficiency_pct,
            yellow_efficiency_pct: c.yellow_efficiency_pct,
        }
    }
}

// ── EngineCfg ────────────────────────────────────────────────────────────────

impl From<&fillmon_config::Config> for EngineCfg {
    fn from(c: &fillmon_config::Config) -> Self {
        Self {
            tolerance_ratio: c.tolerance.ratio,
            buffer_capacity: c.session.buffer_capacity,
            ideal_cycle_seconds: c.session.ideal_cycle_seconds,
            thresholds: AlertThresholds::from(&c.autonomy),
            emit_commands: c.reports.emit_commands,
            emit_reports: c.reports.emit_reports,
            topic_prefix: c.line.topic_prefix.clone(),
        }
    }
}

// ── LineLayout ───────────────────────────────────────────────────────────────

impl From<&fillmon_config::Line> for LineLayout {
    fn from(c: &fillmon_config::Line) -> Self {
        Self {
            tanks: c.tanks.iter().copied().map(TankId).collect(),
            exclusive_pairs: c
                .exclusive_pairs
                .iter()
                .map(|[a, b]| (TankId(*a), TankId(*b)))
                .collect(),
        }
    }
}

impl From<&fillmon_config::Config> for LineLayout {
    fn from(c: &fillmon_config::Config) -> Self {
        Self::from(&c.line)
    }
}

// ── ProcessOrder ─────────────────────────────────────────────────────────────

impl From<fillmon_config::OrderMode> for AutonomyMode {
    fn from(m: fillmon_config::OrderMode) -> Self {
        match m {
            fillmon_config::OrderMode::Count {
                target_quantity,
                gpm,
            } => AutonomyMode::CountBased {
                target_units: target_quantity,
                rate_units_per_min: gpm,
            },
            fillmon_config::OrderMode::Mass {
                target_quantity_kg,
                packaging_standard_kg_min,
            } => AutonomyMode::MassBased {
                target_kg: target_quantity_kg,
                rate_kg_per_min: packaging_standard_kg_min,
            },
        }
    }
}

impl TryFrom<&fillmon_config::OrderFile> for ProcessOrder {
    type Error = eyre::Report;

    fn try_from(f: &fillmon_config::OrderFile) -> Result<Self, Self::Error> {
        let format: Format = f.format.parse().map_err(|e: String| eyre::eyre!(e))?;
        let order = ProcessOrder {
            of: f.of.clone(),
            legajo: f.legajo.clone(),
            orden_envasado: f.orden_envasado.clone(),
            material: f.material.clone(),
            description: f.description.clone(),
            format,
            autonomy: f.mode()?.into(),
        };
        order.validate()?;
        Ok(order)
    }
}
