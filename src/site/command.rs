//! Actuator subsystems and the sticky drive-level command sets.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::TenantLocation;

/// Lowest drive level (percent duty).
pub const MIN_DRIVE: f64 = 0.0;
/// Highest drive level (percent duty).
pub const MAX_DRIVE: f64 = 100.0;

/// Actuator subsystem type a controller can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    Heater,
    #[serde(alias = "air_cond", alias = "ac")]
    AirConditioner,
    Ventilation,
    Dehumidifier,
}

impl Subsystem {
    pub const ALL: [Subsystem; 4] = [
        Subsystem::Heater,
        Subsystem::AirConditioner,
        Subsystem::Ventilation,
        Subsystem::Dehumidifier,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Subsystem::Heater => "heater",
            Subsystem::AirConditioner => "air_conditioner",
            Subsystem::Ventilation => "ventilation",
            Subsystem::Dehumidifier => "dehumidifier",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Drive level per subsystem for one site.
///
/// Starts all-zero; a level only changes when regulation writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandSet {
    levels: BTreeMap<Subsystem, f64>,
}

impl Default for CommandSet {
    fn default() -> Self {
        Self {
            levels: Subsystem::ALL.iter().map(|s| (*s, MIN_DRIVE)).collect(),
        }
    }
}

impl CommandSet {
    /// Current level for `subsystem`.
    pub fn level(&self, subsystem: Subsystem) -> f64 {
        self.levels.get(&subsystem).copied().unwrap_or(MIN_DRIVE)
    }

    /// Overwrites `subsystem`, clamping into `[MIN_DRIVE, MAX_DRIVE]`.
    pub fn set(&mut self, subsystem: Subsystem, level: f64) {
        self.levels
            .insert(subsystem, level.clamp(MIN_DRIVE, MAX_DRIVE));
    }

    pub fn iter(&self) -> impl Iterator<Item = (Subsystem, f64)> + '_ {
        self.levels.iter().map(|(s, l)| (*s, *l))
    }
}

/// Committed command sets for every site seen so far.
pub type CommandSnapshot = HashMap<TenantLocation, CommandSet>;

/// Level for a site/subsystem, falling back to the all-zero default for
/// sites regulation has not reached yet.
pub fn level_for(snapshot: &CommandSnapshot, tl: &TenantLocation, subsystem: Subsystem) -> f64 {
    snapshot
        .get(tl)
        .map_or(MIN_DRIVE, |set| set.level(subsystem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_is_all_zero() {
        let set = CommandSet::default();
        for s in Subsystem::ALL {
            assert_eq!(set.level(s), 0.0);
        }
        assert_eq!(set.iter().count(), 4);
    }

    #[test]
    fn set_clamps_into_drive_range() {
        let mut set = CommandSet::default();
        set.set(Subsystem::Heater, 140.0);
        set.set(Subsystem::Ventilation, -3.0);
        assert_eq!(set.level(Subsystem::Heater), 100.0);
        assert_eq!(set.level(Subsystem::Ventilation), 0.0);
    }

    #[test]
    fn subsystem_accepts_short_aliases() {
        let s: Subsystem = serde_json::from_str("\"air_cond\"").unwrap();
        assert_eq!(s, Subsystem::AirConditioner);
        let s: Subsystem = serde_json::from_str("\"dehumidifier\"").unwrap();
        assert_eq!(s, Subsystem::Dehumidifier);
        assert!(serde_json::from_str::<Subsystem>("\"sprinkler\"").is_err());
    }

    #[test]
    fn unknown_site_reads_zero() {
        let snapshot = CommandSnapshot::new();
        let tl = TenantLocation::new("Acme", "Roof").unwrap();
        assert_eq!(level_for(&snapshot, &tl, Subsystem::Heater), 0.0);
    }

    #[test]
    fn serializes_as_name_map() {
        let json = serde_json::to_value(CommandSet::default()).unwrap();
        assert_eq!(json["air_conditioner"], 0.0);
        assert_eq!(json["heater"], 0.0);
    }
}
