//! Mapping from a sensor condition's value to an actuator drive level.

pub mod fuzzy;
pub mod membership;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::site::{Field, Subsystem};

pub use fuzzy::FuzzyInference;

/// A sensed condition that can drive a subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Temperature,
    Humidity,
    Co2,
    Voc,
}

impl Condition {
    /// Reading-batch field that carries this condition.
    pub fn field(self) -> Field {
        match self {
            Condition::Temperature => Field::Temperature,
            Condition::Humidity => Field::Humidity,
            Condition::Co2 => Field::Co2,
            Condition::Voc => Field::Voc,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.field().fmt(f)
    }
}

/// One (condition → subsystem) control relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub condition: Condition,
    pub subsystem: Subsystem,
}

impl Rule {
    pub const fn new(condition: Condition, subsystem: Subsystem) -> Self {
        Self {
            condition,
            subsystem,
        }
    }

    /// The fixed rule catalogue. Ventilation is driven by both VOC and CO₂.
    pub fn catalogue() -> Vec<Rule> {
        vec![
            Rule::new(Condition::Temperature, Subsystem::Heater),
            Rule::new(Condition::Temperature, Subsystem::AirConditioner),
            Rule::new(Condition::Voc, Subsystem::Ventilation),
            Rule::new(Condition::Co2, Subsystem::Ventilation),
            Rule::new(Condition::Humidity, Subsystem::Dehumidifier),
        ]
    }
}

/// Deterministic, stateless condition → drive-level function.
pub trait Inference: Send + Sync {
    /// Drive level in `[0, 100]` for `value` under `rule`.
    ///
    /// Returns `None` when no term of the rule base fires for `value`.
    fn infer(&self, rule: Rule, value: f64) -> Option<f64>;
}

impl<I: Inference + ?Sized> Inference for std::sync::Arc<I> {
    fn infer(&self, rule: Rule, value: f64) -> Option<f64> {
        (**self).infer(rule, value)
    }
}
