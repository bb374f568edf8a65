//! System configuration parameters
//!
//! All tunable parameters for the Cosmos sensor and actuator firmware.
//! Values can be overridden via NVS (non-volatile storage) or an
//! `UpdateConfig` command.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::sensors::SensorKind;

/// Threshold band for one sensor kind.
///
/// `safe_min` / `safe_max` are the cutoff bounds, `nominal_low` /
/// `nominal_high` the band a reading must sit in before an engage request
/// is honoured.  Which safe bound is enforced depends on the kind's guard
/// direction (see [`SensorKind::guard`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindLimits {
    pub safe_min: f32,
    pub safe_max: f32,
    pub nominal_low: f32,
    pub nominal_high: f32,
}

impl KindLimits {
    pub const fn new(safe_min: f32, nominal_low: f32, nominal_high: f32, safe_max: f32) -> Self {
        Self {
            safe_min,
            safe_max,
            nominal_low,
            nominal_high,
        }
    }

    /// `true` if `value` lies inside the nominal band (inclusive).
    pub fn is_nominal(&self, value: f32) -> bool {
        value >= self.nominal_low && value <= self.nominal_high
    }

    fn validate(&self, what: &'static str) -> Result<(), ConfigError> {
        let all = [self.safe_min, self.nominal_low, self.nominal_high, self.safe_max];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::ValidationFailed(what));
        }
        if !(self.safe_min < self.nominal_low
            && self.nominal_low <= self.nominal_high
            && self.nominal_high < self.safe_max)
        {
            return Err(ConfigError::ValidationFailed(what));
        }
        Ok(())
    }
}

/// Per-kind threshold limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Water level in percent of tank height. Too low is unsafe.
    pub water_level: KindLimits,
    /// Soil moisture in percent (100 = wet). Too high is unsafe.
    pub soil_moisture: KindLimits,
    /// Temperature in Celsius. Too high is unsafe.
    pub temperature: KindLimits,
    /// Air pollution in ppm (MQ-135). Too high is unsafe.
    pub air_pollution: KindLimits,
    /// Flow in percent of full scale. Too low is unsafe.
    pub flow: KindLimits,
}

impl ThresholdConfig {
    pub fn for_kind(&self, kind: SensorKind) -> KindLimits {
        match kind {
            SensorKind::WaterLevel => self.water_level,
            SensorKind::SoilMoisture => self.soil_moisture,
            SensorKind::Temperature => self.temperature,
            SensorKind::AirPollution => self.air_pollution,
            SensorKind::Flow => self.flow,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            water_level: KindLimits::new(10.0, 20.0, 100.0, 200.0),
            // The soil map is not clamped: dry soil past 3.0 V reads below 0 %.
            soil_moisture: KindLimits::new(-200.0, -100.0, 60.0, 80.0),
            temperature: KindLimits::new(-40.0, -5.0, 40.0, 45.0),
            air_pollution: KindLimits::new(-1.0, 0.0, 1000.0, 2000.0),
            flow: KindLimits::new(5.0, 10.0, 100.0, 200.0),
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Sampling ---
    /// Raw reads per discard-averaged sample (1-64)
    pub samples_per_read: u8,
    /// Consecutive failed cycles before a reading is invalidated
    pub max_sample_failures: u8,

    // --- Timing ---
    /// Poll cycle interval (milliseconds)
    pub poll_interval_ms: u32,
    /// Button debounce window (milliseconds)
    pub button_debounce_ms: u32,
    /// Telemetry report interval (seconds)
    pub telemetry_interval_secs: u32,

    // --- Thresholds ---
    pub thresholds: ThresholdConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            samples_per_read: 16,
            max_sample_failures: 3,

            poll_interval_ms: 5000, // one cycle every 5 s
            button_debounce_ms: 50,
            telemetry_interval_secs: 60, // 1/min

            thresholds: ThresholdConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=64).contains(&self.samples_per_read) {
            return Err(ConfigError::ValidationFailed("samples_per_read must be 1-64"));
        }
        if !(1..=20).contains(&self.max_sample_failures) {
            return Err(ConfigError::ValidationFailed(
                "max_sample_failures must be 1-20",
            ));
        }
        if !(100..=60_000).contains(&self.poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "poll_interval_ms must be 100-60000",
            ));
        }
        if !(10..=1000).contains(&self.button_debounce_ms) {
            return Err(ConfigError::ValidationFailed(
                "button_debounce_ms must be 10-1000",
            ));
        }
        if !(5..=3600).contains(&self.telemetry_interval_secs) {
            return Err(ConfigError::ValidationFailed(
                "telemetry_interval_secs must be 5-3600",
            ));
        }

        let t = &self.thresholds;
        t.water_level.validate("water_level limits out of order")?;
        t.soil_moisture.validate("soil_moisture limits out of order")?;
        t.temperature.validate("temperature limits out of order")?;
        t.air_pollution.validate("air_pollution limits out of order")?;
        t.flow.validate("flow limits out of order")?;
        Ok(())
    }
}
