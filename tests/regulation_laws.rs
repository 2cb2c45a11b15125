//! Property tests for energy monotonicity and the command laws.

mod common;

use proptest::prelude::*;

use site_regulator::cycle::{Aggregator, CycleBuffer, CycleConfig, Regulator, SiteSnapshot};
use site_regulator::inference::{Condition, FuzzyInference, Inference, Rule};
use site_regulator::site::{
    CommandSet, CommandSnapshot, Field, PendingTable, ReadingBatch, SiteStateStore, Subsystem,
};

fn power() -> impl Strategy<Value = f64> {
    prop_oneof![
        -5_000.0..50_000.0f64,
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(-0.0),
    ]
}

fn prior_with(levels: [f64; 4]) -> CommandSnapshot {
    let mut set = CommandSet::default();
    for (s, l) in Subsystem::ALL.into_iter().zip(levels) {
        set.set(s, l);
    }
    CommandSnapshot::from([(common::roof(), set)])
}

fn buffer_with(reading: ReadingBatch) -> CycleBuffer {
    let missing = reading.missing();
    CycleBuffer::from([(
        common::roof(),
        SiteSnapshot {
            reading,
            cumulative_energy_kwh: 0.0,
            missing,
        },
    )])
}

proptest! {
    #[test]
    fn cumulative_energy_never_decreases(powers in prop::collection::vec(prop::option::of(power()), 1..40)) {
        let aggregator = Aggregator::new(CycleConfig::default());
        let pending = PendingTable::new();
        let store = SiteStateStore::new();
        let mut last = 0.0;

        for p in powers {
            if let Some(p) = p {
                let mut batch = ReadingBatch::default();
                batch.set(Field::InstantaneousPower, Some(p));
                pending.submit(common::roof(), batch);
            }
            aggregator.aggregate(&pending, &store);
            let now = store.energy_kwh(&common::roof());
            prop_assert!(now.is_finite());
            prop_assert!(now >= last, "{now} < {last}");
            last = now;
        }
    }

    #[test]
    fn unrelated_levels_are_sticky(
        temperature in -40.0..80.0f64,
        levels in prop::array::uniform4(0.0..=100.0f64),
    ) {
        let regulator = Regulator::with_catalogue(FuzzyInference::new());
        let prior = prior_with(levels);
        let mut reading = ReadingBatch::default();
        reading.set(Field::Temperature, Some(temperature));

        let next = regulator.regulate(&buffer_with(reading), &prior);
        let before = &prior[&common::roof()];
        let after = &next[&common::roof()];
        prop_assert_eq!(after.level(Subsystem::Ventilation), before.level(Subsystem::Ventilation));
        prop_assert_eq!(after.level(Subsystem::Dehumidifier), before.level(Subsystem::Dehumidifier));
        for (_, level) in after.iter() {
            prop_assert!((0.0..=100.0).contains(&level));
        }
    }

    #[test]
    fn empty_reading_changes_nothing(levels in prop::array::uniform4(0.0..=100.0f64)) {
        let regulator = Regulator::with_catalogue(FuzzyInference::new());
        let prior = prior_with(levels);
        let next = regulator.regulate(&buffer_with(ReadingBatch::default()), &prior);
        prop_assert_eq!(&next, &prior);
    }

    #[test]
    fn ventilation_takes_the_stronger_demand(voc in 0.0..2000.0f64, co2 in 0.0..2000.0f64) {
        let fuzzy = FuzzyInference::new();
        let regulator = Regulator::with_catalogue(fuzzy.clone());
        let mut reading = ReadingBatch::default();
        reading.set(Field::Voc, Some(voc));
        reading.set(Field::Co2, Some(co2));

        let next = regulator.regulate(&buffer_with(reading), &CommandSnapshot::new());
        let by_voc = fuzzy.infer(Rule::new(Condition::Voc, Subsystem::Ventilation), voc);
        let by_co2 = fuzzy.infer(Rule::new(Condition::Co2, Subsystem::Ventilation), co2);
        let level = next[&common::roof()].level(Subsystem::Ventilation);
        match (by_voc, by_co2) {
            (Some(a), Some(b)) => prop_assert!((level - a.max(b)).abs() < 1e-9),
            (Some(a), None) | (None, Some(a)) => prop_assert!((level - a).abs() < 1e-9),
            (None, None) => prop_assert_eq!(level, 0.0),
        }
    }
}
