//! Regulation: per-cycle buffer → updated command sets.

use std::collections::BTreeMap;

use tracing::debug;

use super::types::CycleBuffer;
use crate::inference::{Inference, Rule};
use crate::site::{CommandSet, CommandSnapshot, Subsystem};

/// Applies the rule catalogue to a finalized buffer.
///
/// When several conditions drive the same subsystem the highest drive level
/// wins. Subsystems with no contribution this cycle keep their prior level.
pub struct Regulator<I> {
    inference: I,
    rules: Vec<Rule>,
}

impl<I: Inference> Regulator<I> {
    pub fn new(inference: I, rules: Vec<Rule>) -> Self {
        Self { inference, rules }
    }

    /// Regulator over [`Rule::catalogue`].
    pub fn with_catalogue(inference: I) -> Self {
        Self::new(inference, Rule::catalogue())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the next command snapshot, leaving `prior` untouched.
    ///
    /// Sites absent from `buffer` carry over unchanged; sites seen for the
    /// first time start from the all-zero set.
    pub fn regulate(&self, buffer: &CycleBuffer, prior: &CommandSnapshot) -> CommandSnapshot {
        let mut next = prior.clone();

        for (tl, snapshot) in buffer {
            let mut contributions: BTreeMap<Subsystem, f64> = BTreeMap::new();
            for rule in &self.rules {
                let Some(value) = snapshot.reading.get(rule.condition.field()) else {
                    continue;
                };
                let Some(level) = self.inference.infer(*rule, value) else {
                    continue;
                };
                contributions
                    .entry(rule.subsystem)
                    .and_modify(|best| *best = best.max(level))
                    .or_insert(level);
            }

            let set = next.entry(tl.clone()).or_insert_with(CommandSet::default);
            for (subsystem, level) in contributions {
                debug!(site = %tl, %subsystem, level, "command updated");
                set.set(subsystem, level);
            }
        }

        next
    }
}
