//! Sensor report wire type and the per-cycle reading batch derived from it.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A measured (or derived) quantity carried in a reading batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// Air temperature (°C).
    Temperature,
    /// Relative humidity (%).
    Humidity,
    /// Carbon dioxide concentration (ppm).
    Co2,
    /// Oxygen concentration (%).
    O2,
    /// Volatile organic compounds index.
    Voc,
    /// Renewable generation reported by the site.
    RenewableEnergy,
    /// Average real power drawn over the sampling window (W).
    InstantaneousPower,
    /// Soil moisture (%).
    SoilMoisture,
    /// Ratio of real to apparent power.
    PowerFactor,
}

impl Field {
    /// Every field a reading batch can carry, in record column order.
    pub const REPORTED: [Field; 9] = [
        Field::Temperature,
        Field::Humidity,
        Field::Co2,
        Field::O2,
        Field::Voc,
        Field::RenewableEnergy,
        Field::InstantaneousPower,
        Field::SoilMoisture,
        Field::PowerFactor,
    ];

    /// Column / JSON name of the field.
    pub fn name(self) -> &'static str {
        match self {
            Field::Temperature => "temperature",
            Field::Humidity => "humidity",
            Field::Co2 => "co2",
            Field::O2 => "o2",
            Field::Voc => "voc",
            Field::RenewableEnergy => "renewable_energy",
            Field::InstantaneousPower => "avg_power",
            Field::SoilMoisture => "soil_moisture",
            Field::PowerFactor => "power_factor",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One sensor response as it arrives on the wire.
///
/// Every field is optional; sites report whatever their hardware has.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorReport {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub co2: Option<f64>,
    pub o2: Option<f64>,
    pub voc: Option<f64>,
    pub renewable_energy: Option<f64>,
    pub voltage_rms: Option<f64>,
    pub current_rms: Option<f64>,
    pub avg_power: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub power_factor: Option<f64>,
}

/// Power factor from average real power and RMS voltage/current.
///
/// Returns `None` unless all three inputs are present and the apparent
/// power is a non-zero finite number.
///
/// # Examples
///
/// ```
/// use site_regulator::site::power_factor;
///
/// let pf = power_factor(Some(400.0), Some(230.0), Some(2.0)).unwrap();
/// assert!((pf - 0.8696).abs() < 1e-4);
/// assert_eq!(power_factor(Some(400.0), Some(230.0), Some(0.0)), None);
/// ```
pub fn power_factor(
    avg_power: Option<f64>,
    voltage_rms: Option<f64>,
    current_rms: Option<f64>,
) -> Option<f64> {
    let apparent = voltage_rms? * current_rms?;
    if apparent == 0.0 || !apparent.is_finite() {
        return None;
    }
    let pf = avg_power? / apparent;
    pf.is_finite().then_some(pf)
}

/// Reading batch for one site in one cycle.
///
/// An absent field is an explicit "missing" and never defaults to zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingBatch {
    values: [Option<f64>; Field::REPORTED.len()],
}

impl ReadingBatch {
    /// Converts a wire report, dropping non-finite values and deriving the
    /// power factor when the site did not send one.
    pub fn from_report(report: &SensorReport) -> Self {
        let mut batch = Self::default();
        let raw = [
            (Field::Temperature, report.temperature),
            (Field::Humidity, report.humidity),
            (Field::Co2, report.co2),
            (Field::O2, report.o2),
            (Field::Voc, report.voc),
            (Field::RenewableEnergy, report.renewable_energy),
            (Field::InstantaneousPower, report.avg_power),
            (Field::SoilMoisture, report.soil_moisture),
            (Field::PowerFactor, report.power_factor),
        ];
        for (field, value) in raw {
            batch.set(field, value);
        }
        if batch.get(Field::PowerFactor).is_none() {
            let derived = power_factor(
                batch.get(Field::InstantaneousPower),
                finite(report.voltage_rms),
                finite(report.current_rms),
            );
            batch.set(Field::PowerFactor, derived);
        }
        batch
    }

    /// Value of `field`, or `None` when missing.
    pub fn get(&self, field: Field) -> Option<f64> {
        self.values[field.index()]
    }

    /// Sets `field`; a non-finite value is stored as missing.
    pub fn set(&mut self, field: Field, value: Option<f64>) {
        let value = match value {
            Some(v) if !v.is_finite() => {
                warn!(field = %field, value = v, "dropping non-finite reading");
                None
            }
            other => other,
        };
        self.values[field.index()] = value;
    }

    /// Fields with no value, in column order.
    pub fn missing(&self) -> Vec<Field> {
        Field::REPORTED
            .into_iter()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }

    /// Present fields and their values, in column order.
    pub fn present(&self) -> impl Iterator<Item = (Field, f64)> + '_ {
        Field::REPORTED
            .into_iter()
            .filter_map(|f| self.get(f).map(|v| (f, v)))
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
