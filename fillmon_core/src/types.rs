//! Domain types shared by every engine component.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Tank number as used on the plant floor (`TK3`, `TK4`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TankId(pub u32);

impl fmt::Display for TankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TK{}", self.0)
    }
}

impl From<u32> for TankId {
    fn from(n: u32) -> Self {
        Self(n)
    }
}

impl FromStr for TankId {
    type Err = std::num::ParseIntError;

    /// Accepts `3`, `tk3` and `TK3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = match s.get(..2) {
            Some(p) if p.eq_ignore_ascii_case("tk") => &s[2..],
            _ => s,
        };
        digits.parse::<u32>().map(TankId)
    }
}

/// Package format; each one selects a nominal unit weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Format {
    OneLiter,
    FourLiter,
    FiveKg,
    TenKg,
    TwentyKg,
    TwentyFiveKg,
}

impl Format {
    pub const ALL: [Format; 6] = [
        Format::OneLiter,
        Format::FourLiter,
        Format::FiveKg,
        Format::TenKg,
        Format::TwentyKg,
        Format::TwentyFiveKg,
    ];

    /// Target fill weight in kilograms.
    pub fn nominal_kg(self) -> f64 {
        match self {
            Format::OneLiter => 1.0,
            Format::FourLiter => 4.0,
            Format::FiveKg => 5.0,
            Format::TenKg => 10.0,
            Format::TwentyKg => 20.0,
            Format::TwentyFiveKg => 25.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Format::OneLiter => "1lt",
            Format::FourLiter => "4lt",
            Format::FiveKg => "5kg",
            Format::TenKg => "10kg",
            Format::TwentyKg => "20kg",
            Format::TwentyFiveKg => "25kg",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Format::ALL
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown format {s:?} (expected one of 1lt, 4lt, 5kg, 10kg, 20kg, 25kg)"))
    }
}

impl TryFrom<String> for Format {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Serialize for Format {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// How a session's remaining time is projected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutonomyMode {
    /// Produce `target_units` at an ideal `rate_units_per_min` (GPM).
    CountBased {
        target_units: u64,
        rate_units_per_min: f64,
    },
    /// Pack `target_kg` at the packaging standard `rate_kg_per_min`.
    MassBased { target_kg: f64, rate_kg_per_min: f64 },
}

impl AutonomyMode {
    /// True when every target and rate is finite and strictly positive.
    pub fn is_determinate(&self) -> bool {
        let pos = |v: f64| v.is_finite() && v > 0.0;
        match *self {
            AutonomyMode::CountBased {
                target_units,
                rate_units_per_min,
            } => target_units > 0 && pos(rate_units_per_min),
            AutonomyMode::MassBased {
                target_kg,
                rate_kg_per_min,
            } => pos(target_kg) && pos(rate_kg_per_min),
        }
    }
}

/// Operator-declared job parameters. Immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OrderWire", into = "OrderWire")]
pub struct ProcessOrder {
    pub of: String,
    pub legajo: String,
    pub orden_envasado: String,
    pub material: String,
    pub description: String,
    pub format: Format,
    pub autonomy: AutonomyMode,
}

impl ProcessOrder {
    pub fn nominal_kg(&self) -> f64 {
        self.format.nominal_kg()
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        for (name, v) in [
            ("of", &self.of),
            ("legajo", &self.legajo),
            ("ordenEnvasado", &self.orden_envasado),
            ("material", &self.material),
        ] {
            if v.trim().is_empty() {
                return Err(SessionError::InvalidOrder(format!("{name} must not be empty")));
            }
        }
        if !self.autonomy.is_determinate() {
            return Err(SessionError::InvalidOrder(
                "autonomy target and rate must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Flat camelCase form of an order as it travels in start payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderWire {
    of: String,
    legajo: String,
    orden_envasado: String,
    material: String,
    #[serde(default)]
    description: String,
    format: Format,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_quantity: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gpm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target_quantity_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    packaging_standard_kg_min: Option<f64>,
}

impl TryFrom<OrderWire> for ProcessOrder {
    type Error = String;

    fn try_from(w: OrderWire) -> Result<Self, Self::Error> {
        let autonomy = match (
            w.target_quantity,
            w.gpm,
            w.target_quantity_kg,
            w.packaging_standard_kg_min,
        ) {
            (Some(target_units), Some(rate_units_per_min), None, None) => {
                AutonomyMode::CountBased {
                    target_units,
                    rate_units_per_min,
                }
            }
            (None, None, Some(target_kg), Some(rate_kg_per_min)) => AutonomyMode::MassBased {
                target_kg,
                rate_kg_per_min,
            },
            _ => {
                return Err("order needs exactly one autonomy mode: targetQuantity + gpm, or targetQuantityKg + packagingStandardKgMin".to_string());
            }
        };
        Ok(ProcessOrder {
            of: w.of,
            legajo: w.legajo,
            orden_envasado: w.orden_envasado,
            material: w.material,
            description: w.description,
            format: w.format,
            autonomy,
        })
    }
}

impl From<ProcessOrder> for OrderWire {
    fn from(o: ProcessOrder) -> Self {
        let (target_quantity, gpm, target_quantity_kg, packaging_standard_kg_min) =
            match o.autonomy {
                AutonomyMode::CountBased {
                    target_units,
                    rate_units_per_min,
                } => (Some(target_units), Some(rate_units_per_min), None, None),
                AutonomyMode::MassBased {
                    target_kg,
                    rate_kg_per_min,
                } => (None, None, Some(target_kg), Some(rate_kg_per_min)),
            };
        OrderWire {
            of: o.of,
            legajo: o.legajo,
            orden_envasado: o.orden_envasado,
            material: o.material,
            description: o.description,
            format: o.format,
            target_quantity,
            gpm,
            target_quantity_kg,
            packaging_standard_kg_min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tank_id_parses_plain_and_prefixed() {
        assert_eq!("3".parse::<TankId>().unwrap(), TankId(3));
        assert_eq!("tk4".parse::<TankId>().unwrap(), TankId(4));
        assert_eq!("TK12".parse::<TankId>().unwrap(), TankId(12));
        assert!("tank".parse::<TankId>().is_err());
        assert!("".parse::<TankId>().is_err());
        assert_eq!(TankId(5).to_string(), "TK5");
    }

    #[test]
    fn format_labels_are_case_insensitive() {
        assert_eq!("25KG".parse::<Format>().unwrap(), Format::TwentyFiveKg);
        assert_eq!("1lt".parse::<Format>().unwrap().nominal_kg(), 1.0);
        assert!("30kg".parse::<Format>().is_err());
    }

    #[test]
    fn order_wire_requires_exactly_one_mode() {
        let both = r#"{"of":"a","legajo":"b","ordenEnvasado":"c","material":"d","format":"5kg",
            "targetQuantity":10,"gpm":2,"targetQuantityKg":5,"packagingStandardKgMin":1}"#;
        assert!(serde_json::from_str::<ProcessOrder>(both).is_err());

        let none = r#"{"of":"a","legajo":"b","ordenEnvasado":"c","material":"d","format":"5kg"}"#;
        assert!(serde_json::from_str::<ProcessOrder>(none).is_err());

        let mass = r#"{"of":"a","legajo":"b","ordenEnvasado":"c","material":"d","format":"20KG",
            "targetQuantityKg":1950,"packagingStandardKgMin":220}"#;
        let order: ProcessOrder = serde_json::from_str(mass).unwrap();
        assert_eq!(
            order.autonomy,
            AutonomyMode::MassBased {
                target_kg: 1950.0,
                rate_kg_per_min: 220.0
            }
        );
        assert_eq!(order.format, Format::TwentyKg);
    }

    #[test]
    fn validate_rejects_blank_ids_and_non_positive_rates() {
        let mut order = ProcessOrder {
            of: "OF-1".into(),
            legajo: "44".into(),
            orden_envasado: "OE-1".into(),
            material: "3295".into(),
            description: String::new(),
            format: Format::TwentyFiveKg,
            autonomy: AutonomyMode::CountBased {
                target_units: 100,
                rate_units_per_min: 4.0,
            },
        };
        assert!(order.validate().is_ok());

        order.autonomy = AutonomyMode::CountBased {
            target_units: 100,
            rate_units_per_min: 0.0,
        };
        assert!(matches!(order.validate(), Err(SessionError::InvalidOrder(_))));

        order.autonomy = AutonomyMode::MassBased {
            target_kg: f64::NAN,
            rate_kg_per_min: 10.0,
        };
        assert!(order.validate().is_err());

        order.autonomy = AutonomyMode::MassBased {
            target_kg: 100.0,
            rate_kg_per_min: 10.0,
        };
        order.legajo = "  ".into();
        assert!(order.validate().is_err());
    }
}
