#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Simulated filling line.
//!
//! Stands in for the plant scales when no broker or device is available:
//! every unit weight is drawn uniformly from `nominal ± 2t` and the tank
//! inventory drops by what was filled.

pub mod error;
pub mod util;

use fillmon_traits::{Telemetry, TelemetrySource};

use crate::error::{Result, SimError};
use crate::util::XorShift32;

/// 2% of nominal, matching the line default.
pub const DEFAULT_TOLERANCE_RATIO: f64 = 0.02;

/// Deterministic line model. Readings alternate: a unit, then the tank weight
/// left after filling it.
#[derive(Debug, Clone)]
pub struct SimulatedLine {
    nominal_kg: f64,
    tolerance_ratio: f64,
    tank_kg: f64,
    rng: XorShift32,
    units: u64,
    unit_limit: Option<u64>,
    pending_tank_reading: bool,
}

impl SimulatedLine {
    pub fn new(nominal_kg: f64, tank_kg: f64, seed: u32) -> Result<Self> {
        if !(nominal_kg.is_finite() && nominal_kg > 0.0) {
            return Err(SimError::InvalidNominal(nominal_kg));
        }
        if !(tank_kg.is_finite() && tank_kg >= 0.0) {
            return Err(SimError::InvalidInventory(tank_kg));
        }
        Ok(Self {
            nominal_kg,
            tolerance_ratio: DEFAULT_TOLERANCE_RATIO,
            tank_kg,
            rng: XorShift32::new(seed),
            units: 0,
            unit_limit: None,
            pending_tank_reading: false,
        })
    }

    pub fn with_tolerance_ratio(mut self, ratio: f64) -> Result<Self> {
        if !(ratio.is_finite() && ratio > 0.0 && ratio <= 0.5) {
            return Err(SimError::InvalidTolerance(ratio));
        }
        self.tolerance_ratio = ratio;
        Ok(self)
    }

    /// Stop after `n` units (the trailing tank reading is still emitted).
    pub fn with_unit_limit(mut self, n: u64) -> Self {
        self.unit_limit = Some(n);
        self
    }

    pub fn units(&self) -> u64 {
        self.units
    }

    pub fn tank_kg(&self) -> f64 {
        self.tank_kg
    }

    fn next_unit_weight(&mut self) -> f64 {
        let t = self.nominal_kg * self.tolerance_ratio;
        self.rng
            .uniform(self.nominal_kg - 2.0 * t, self.nominal_kg + 2.0 * t)
    }

    fn next_reading(&mut self) -> Option<Telemetry> {
        if self.pending_tank_reading {
            self.pending_tank_reading = false;
            return Some(Telemetry::TankWeight {
                weight_kg: self.tank_kg,
            });
        }
        if self.unit_limit.is_some_and(|n| self.units >= n) {
            return None;
        }
        let weight_kg = self.next_unit_weight();
        if weight_kg > self.tank_kg {
            tracing::debug!(tank_kg = self.tank_kg, units = self.units, "simulated tank ran dry");
            return None;
        }
        self.tank_kg -= weight_kg;
        self.units += 1;
        self.pending_tank_reading = true;
        Some(Telemetry::Unit {
            weight_kg,
            unit_index: self.units,
        })
    }
}

impl TelemetrySource for SimulatedLine {
    fn poll(&mut self) -> std::result::Result<Option<Telemetry>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.next_reading())
    }
}

impl Iterator for SimulatedLine {
    type Item = Telemetry;

    fn next(&mut self) -> Option<Telemetry> {
        self.next_reading()
    }
}
