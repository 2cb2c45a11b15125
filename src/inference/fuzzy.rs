//! Mamdani fuzzy controller used as the default inference capability.
//!
//! Each rule base maps the terms of one condition to terms of the drive
//! level output. Firing strengths clip their output terms (min), clipped
//! terms combine by max, and the result is the centroid over the integer
//! drive universe `0..=100`.

use std::collections::HashMap;

use super::membership::Membership;
use super::{Condition, Inference, Rule};
use crate::site::Subsystem;

mod temperature {
    use super::Membership::{self, Tri};
    pub const VERY_COLD: Membership = Tri(-20.0, -20.0, -5.0);
    pub const COLD: Membership = Tri(-10.0, 0.0, 10.0);
    pub const COOL: Membership = Tri(5.0, 15.0, 25.0);
    pub const MILD: Membership = Tri(20.0, 25.0, 30.0);
    pub const WARM: Membership = Tri(28.0, 35.0, 42.0);
    pub const HOT: Membership = Tri(40.0, 50.0, 60.0);
}

mod humidity {
    use super::Membership::{self, Trap, Tri};
    pub const VERY_DRY: Membership = Trap(0.0, 0.0, 10.0, 20.0);
    pub const DRY: Membership = Tri(10.0, 25.0, 40.0);
    pub const COMFORTABLE: Membership = Tri(30.0, 50.0, 70.0);
    pub const HUMID: Membership = Tri(60.0, 75.0, 90.0);
    pub const VERY_HUMID: Membership = Trap(85.0, 95.0, 100.0, 100.0);
}

mod voc {
    use super::Membership::{self, Trap, Tri};
    pub const EXCELLENT: Membership = Trap(0.0, 0.0, 100.0, 200.0);
    pub const GOOD: Membership = Tri(150.0, 300.0, 450.0);
    pub const MODERATE: Membership = Tri(400.0, 550.0, 700.0);
    pub const POOR: Membership = Tri(650.0, 800.0, 900.0);
    pub const HAZARDOUS: Membership = Trap(850.0, 950.0, 2000.0, 2000.0);
}

mod co2 {
    use super::Membership::{self, Trap, Tri};
    pub const EXCELLENT: Membership = Trap(0.0, 0.0, 300.0, 500.0);
    pub const GOOD: Membership = Tri(400.0, 600.0, 800.0);
    pub const MODERATE: Membership = Tri(700.0, 1000.0, 1300.0);
    pub const POOR: Membership = Tri(1200.0, 1450.0, 1700.0);
    pub const HAZARDOUS: Membership = Trap(1600.0, 1800.0, 2000.0, 2000.0);
}

mod drive {
    use super::Membership::{self, Tri};
    pub const OFF: Membership = Tri(0.0, 0.0, 5.0);
    pub const VERY_LOW: Membership = Tri(3.0, 10.0, 20.0);
    pub const LOW: Membership = Tri(15.0, 25.0, 35.0);
    pub const MEDIUM: Membership = Tri(30.0, 50.0, 70.0);
    pub const HIGH: Membership = Tri(60.0, 75.0, 90.0);
    pub const VERY_HIGH: Membership = Tri(85.0, 100.0, 100.0);
}

/// Clauses `(input term, output term)` for one condition/subsystem pair.
#[derive(Debug, Clone)]
struct RuleBase {
    clauses: Vec<(Membership, Membership)>,
    span: (f64, f64),
}

impl RuleBase {
    fn new(clauses: &[(Membership, Membership)]) -> Self {
        let span = clauses
            .iter()
            .map(|(input, _)| input.support())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (a, b)| {
                (lo.min(a), hi.max(b))
            });
        Self {
            clauses: clauses.to_vec(),
            span,
        }
    }

    fn evaluate(&self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        let x = value.clamp(self.span.0, self.span.1);
        let strengths: Vec<(f64, Membership)> = self
            .clauses
            .iter()
            .map(|(input, output)| (input.grade(x), *output))
            .filter(|(w, _)| *w > 0.0)
            .collect();
        if strengths.is_empty() {
            return None;
        }

        let mut area = 0.0;
        let mut moment = 0.0;
        for y in 0..=100 {
            let y = f64::from(y);
            let mu = strengths
                .iter()
                .map(|(w, out)| w.min(out.grade(y)))
                .fold(0.0, f64::max);
            area += mu;
            moment += y * mu;
        }
        (area > 0.0).then(|| moment / area)
    }
}

/// Fuzzy controller with the built-in rule bases for [`Rule::catalogue`].
#[derive(Debug, Clone)]
pub struct FuzzyInference {
    bases: HashMap<Rule, RuleBase>,
}

impl Default for FuzzyInference {
    fn default() -> Self {
        use drive::*;

        let heater = RuleBase::new(&[
            (temperature::VERY_COLD, VERY_HIGH),
            (temperature::COLD, HIGH),
            (temperature::COOL, MEDIUM),
            (temperature::MILD, VERY_LOW),
            (temperature::WARM, OFF),
            (temperature::HOT, OFF),
        ]);
        let air_conditioner = RuleBase::new(&[
            (temperature::VERY_COLD, OFF),
            (temperature::COLD, OFF),
            (temperature::COOL, VERY_LOW),
            (temperature::MILD, LOW),
            (temperature::WARM, HIGH),
            (temperature::HOT, VERY_HIGH),
        ]);
        let voc_ventilation = RuleBase::new(&[
            (voc::HAZARDOUS, VERY_HIGH),
            (voc::POOR, HIGH),
            (voc::MODERATE, MEDIUM),
            (voc::GOOD, LOW),
            (voc::EXCELLENT, OFF),
        ]);
        let co2_ventilation = RuleBase::new(&[
            (co2::HAZARDOUS, VERY_HIGH),
            (co2::POOR, HIGH),
            (co2::MODERATE, MEDIUM),
            (co2::GOOD, LOW),
            (co2::EXCELLENT, OFF),
        ]);
        let dehumidifier = RuleBase::new(&[
            (humidity::VERY_DRY, OFF),
            (humidity::DRY, OFF),
            (humidity::COMFORTABLE, LOW),
            (humidity::HUMID, HIGH),
            (humidity::VERY_HUMID, VERY_HIGH),
        ]);

        let bases = HashMap::from([
            (Rule::new(Condition::Temperature, Subsystem::Heater), heater),
            (
                Rule::new(Condition::Temperature, Subsystem::AirConditioner),
                air_conditioner,
            ),
            (Rule::new(Condition::Voc, Subsystem::Ventilation), voc_ventilation),
            (Rule::new(Condition::Co2, Subsystem::Ventilation), co2_ventilation),
            (
                Rule::new(Condition::Humidity, Subsystem::Dehumidifier),
                dehumidifier,
            ),
        ]);
        Self { bases }
    }
}

impl FuzzyInference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a rule base exists for `rule`.
    pub fn supports(&self, rule: Rule) -> bool {
        self.bases.contains_key(&rule)
    }
}

impl Inference for FuzzyInference {
    fn infer(&self, rule: Rule, value: f64) -> Option<f64> {
        self.bases.get(&rule)?.evaluate(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(condition: Condition, subsystem: Subsystem, value: f64) -> Option<f64> {
        FuzzyInference::new().infer(Rule::new(condition, subsystem), value)
    }

    #[test]
    fn every_catalogue_rule_has_a_base() {
        let fuzzy = FuzzyInference::new();
        for rule in Rule::catalogue() {
            assert!(fuzzy.supports(rule), "{rule:?} missing");
        }
    }

    #[test]
    fn hot_room_drives_air_conditioner_high() {
        let level = infer(Condition::Temperature, Subsystem::AirConditioner, 45.0).unwrap();
        assert!(level > 85.0, "got {level}");
        assert!(level <= 100.0);
    }

    #[test]
    fn hot_room_switches_heater_off() {
        let level = infer(Condition::Temperature, Subsystem::Heater, 45.0).unwrap();
        assert!(level < 5.0, "got {level}");
    }

    #[test]
    fn freezing_room_drives_heater_high() {
        let level = infer(Condition::Temperature, Subsystem::Heater, -15.0).unwrap();
        assert!(level > 85.0, "got {level}");
    }

    #[test]
    fn clean_air_keeps_ventilation_off() {
        let level = infer(Condition::Co2, Subsystem::Ventilation, 250.0).unwrap();
        assert!(level < 5.0, "got {level}");
    }

    #[test]
    fn co2_above_table_clamps_to_hazardous() {
        let at_edge = infer(Condition::Co2, Subsystem::Ventilation, 2000.0).unwrap();
        let beyond = infer(Condition::Co2, Subsystem::Ventilation, 5000.0).unwrap();
        assert!(at_edge > 85.0);
        assert_eq!(at_edge, beyond);
    }

    #[test]
    fn humid_air_drives_dehumidifier() {
        let humid = infer(Condition::Humidity, Subsystem::Dehumidifier, 80.0).unwrap();
        let dry = infer(Condition::Humidity, Subsystem::Dehumidifier, 15.0).unwrap();
        assert!(humid > dry);
    }

    #[test]
    fn inference_is_deterministic() {
        let a = infer(Condition::Voc, Subsystem::Ventilation, 612.0);
        let b = infer(Condition::Voc, Subsystem::Ventilation, 612.0);
        assert_eq!(a, b);
    }

    #[test]
    fn no_output_when_nothing_fires() {
        // Upper foot of the hottest term has zero grade.
        assert_eq!(infer(Condition::Temperature, Subsystem::Heater, 60.0), None);
        assert_eq!(infer(Condition::Temperature, Subsystem::Heater, f64::NAN), None);
    }

    #[test]
    fn unknown_rule_yields_none() {
        assert_eq!(infer(Condition::Humidity, Subsystem::Heater, 50.0), None);
    }
}
