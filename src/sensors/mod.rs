//! Sensor subsystem: the acquisition pipeline and the [`SensorRegistry`].
//!
//! ```text
//!  read_raw ×N ─▶ discard average ─▶ moving average ─▶ calibrate ─▶ to_physical
//!   (sampler)       (sampler)           (filter)      (calibration)  (convert)
//! ```
//!
//! The registry owns one [`Sensor`] per entry of the static board table
//! and runs the pipeline for all of them in [`SensorRegistry::poll_all`].
//! Sensor state is only ever mutated from the polling task.

pub mod calibration;
pub mod convert;
pub mod filter;
pub mod sampler;

use core::fmt;

use log::{info, warn};
use serde::Serialize;

use crate::app::ports::{AdcPort, Attenuation, BitWidth, CalibrationPort};
use crate::config::SystemConfig;
use crate::control::policy::Guard;
use crate::error::{InitError, SensorError, Violation};
use calibration::{CalibrationStatus, Calibrator};
use filter::{FILTER_WINDOW, MovingAverage};

/// Capacity of the sensor table.
pub const MAX_SENSORS: usize = 8;

/// Stable sensor identity (serial-number style, e.g. `"SNRSM-aaa0001"`).
pub type SensorId = &'static str;

// ───────────────────────────────────────────────────────────────
// Kinds and channels
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    WaterLevel,
    SoilMoisture,
    Temperature,
    AirPollution,
    Flow,
}

impl SensorKind {
    /// Order in which the policy engine checks bindings.
    pub const PRIORITY: [SensorKind; 5] = [
        Self::WaterLevel,
        Self::SoilMoisture,
        Self::Temperature,
        Self::AirPollution,
        Self::Flow,
    ];

    /// Which side of the safe range trips a cutoff.
    pub const fn guard(self) -> Guard {
        match self {
            Self::WaterLevel | Self::Flow => Guard::Low,
            Self::SoilMoisture | Self::Temperature | Self::AirPollution => Guard::High,
        }
    }

    /// Fault bit raised when this kind leaves its safe range.
    pub const fn violation(self) -> Violation {
        match self {
            Self::WaterLevel => Violation::WaterLevelLow,
            Self::SoilMoisture => Violation::SoilMoistureHigh,
            Self::Temperature => Violation::OverTemperature,
            Self::AirPollution => Violation::AirPollutionHigh,
            Self::Flow => Violation::FlowLow,
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::WaterLevel | Self::SoilMoisture | Self::Flow => "%",
            Self::Temperature => "C",
            Self::AirPollution => "ppm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcUnit {
    Adc1,
    Adc2,
}

/// Physical ADC channel.  The unit is explicit, never derived from the pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdcChannel {
    pub unit: AdcUnit,
    pub channel: u8,
    pub gpio: i32,
}

impl AdcChannel {
    pub const fn new(unit: AdcUnit, channel: u8, gpio: i32) -> Self {
        Self {
            unit,
            channel,
            gpio,
        }
    }
}

impl fmt::Display for AdcChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            AdcUnit::Adc1 => 1,
            AdcUnit::Adc2 => 2,
        };
        write!(f, "ADC{}_CH{}(GPIO{})", unit, self.channel, self.gpio)
    }
}

// ───────────────────────────────────────────────────────────────
// Readings
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Nothing sampled yet.
    NoData,
    /// Converted with a hardware calibration scheme.
    Calibrated,
    /// Linear fallback; calibration is unsupported on this chip.
    Degraded,
    /// Too many consecutive failed cycles; value invalidated.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Filtered raw counts.
    pub raw: Option<i32>,
    pub millivolts: Option<i32>,
    /// Physical value in the kind's unit; NaN when invalid.
    pub value: f32,
    pub quality: Quality,
}

impl Reading {
    pub const NONE: Self = Self {
        raw: None,
        millivolts: None,
        value: f32::NAN,
        quality: Quality::NoData,
    };

    pub fn is_valid(&self) -> bool {
        !self.value.is_nan() && matches!(self.quality, Quality::Calibrated | Quality::Degraded)
    }
}

// ───────────────────────────────────────────────────────────────
// Sensor
// ───────────────────────────────────────────────────────────────

/// Static description of one sensor (board table entry).
#[derive(Debug, Clone, Copy)]
pub struct SensorSpec {
    pub id: SensorId,
    pub kind: SensorKind,
    pub channel: AdcChannel,
}

pub struct Sensor {
    spec: SensorSpec,
    calibrator: Calibrator,
    filter: MovingAverage<FILTER_WINDOW>,
    reading: Reading,
    consecutive_failures: u8,
}

impl Sensor {
    fn new(spec: SensorSpec) -> Self {
        Self {
            spec,
            calibrator: Calibrator::new(spec.channel),
            filter: MovingAverage::new(),
            reading: Reading::NONE,
            consecutive_failures: 0,
        }
    }

    pub fn id(&self) -> SensorId {
        self.spec.id
    }

    pub fn kind(&self) -> SensorKind {
        self.spec.kind
    }

    pub fn channel(&self) -> AdcChannel {
        self.spec.channel
    }

    pub fn reading(&self) -> Reading {
        self.reading
    }

    pub fn calibration(&self) -> CalibrationStatus {
        self.calibrator.state().status()
    }

    fn sample(
        &mut self,
        hw: &mut (impl AdcPort + CalibrationPort),
        samples: u8,
    ) -> Result<(), SensorError> {
        let raw = sampler::read_discard_average(hw, self.spec.channel, samples)?;
        // The window only advances once the whole pipeline has succeeded.
        let mut filter = self.filter.clone();
        let filtered = filter.update(raw);
        let (mv, quality) = self.calibrator.to_millivolts(&*hw, filtered)?;
        self.filter = filter;
        self.reading = Reading {
            raw: Some(filtered),
            millivolts: Some(mv),
            value: convert::to_physical(self.spec.kind, mv),
            quality,
        };
        self.consecutive_failures = 0;
        Ok(())
    }

    fn record_failure(&mut self, err: SensorError, limit: u8) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        warn!(
            "{}: sample skipped: {} ({}/{})",
            self.spec.id, err, self.consecutive_failures, limit
        );
        if self.consecutive_failures >= limit && self.reading.quality != Quality::Stale {
            warn!("{}: reading invalidated after {} failures", self.spec.id, limit);
            self.reading = Reading {
                value: f32::NAN,
                quality: Quality::Stale,
                ..self.reading
            };
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Registry
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegistryState {
    Uninitialized,
    Ready,
}

/// What one [`SensorRegistry::poll_all`] cycle did.
#[derive(Debug, Default)]
pub struct PollReport {
    /// Sensors whose calibration attempt ran this cycle, with the outcome.
    pub calibrations: heapless::Vec<(SensorId, CalibrationStatus), MAX_SENSORS>,
    pub sampled: u8,
    pub failed: u8,
}

pub struct SensorRegistry {
    sensors: heapless::Vec<Sensor, MAX_SENSORS>,
    state: RegistryState,
    samples_per_read: u8,
    max_sample_failures: u8,
}

impl SensorRegistry {
    /// Build from the static sensor table.  Hardware is untouched until
    /// [`begin`](Self::begin).
    pub fn new(specs: &[SensorSpec], config: &SystemConfig) -> Result<Self, InitError> {
        if specs.is_empty() {
            return Err(InitError::EmptyTable);
        }
        let mut sensors = heapless::Vec::new();
        for (i, spec) in specs.iter().enumerate() {
            if specs[..i].iter().any(|s| s.id == spec.id) {
                return Err(InitError::DuplicateId);
            }
            sensors
                .push(Sensor::new(*spec))
                .map_err(|_| InitError::CapacityExceeded)?;
        }
        Ok(Self {
            sensors,
            state: RegistryState::Uninitialized,
            samples_per_read: config.samples_per_read.max(1),
            max_sample_failures: config.max_sample_failures.max(1),
        })
    }

    /// Configure every channel (12 dB, 12 bit).  Runs once.
    pub fn begin(&mut self, adc: &mut impl AdcPort) -> Result<(), InitError> {
        if self.state == RegistryState::Ready {
            return Err(InitError::AlreadyInitialized);
        }
        for sensor in &self.sensors {
            adc.configure_channel(sensor.channel(), Attenuation::Db12, BitWidth::Bits12)?;
        }
        self.state = RegistryState::Ready;
        info!("SensorRegistry: {} sensors configured", self.sensors.len());
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.state == RegistryState::Ready
    }

    /// Pick up new sampling parameters.  Filter and calibration state survive.
    pub fn apply_config(&mut self, config: &SystemConfig) {
        self.samples_per_read = config.samples_per_read.max(1);
        self.max_sample_failures = config.max_sample_failures.max(1);
    }

    /// One poll cycle over every sensor in registration order.
    ///
    /// A sensor still uncalibrated spends this cycle on its calibration
    /// attempt and is sampled from the next cycle on.  A failed batch keeps
    /// the previous reading and never touches the filter.
    pub fn poll_all(
        &mut self,
        hw: &mut (impl AdcPort + CalibrationPort),
    ) -> Result<PollReport, InitError> {
        if self.state != RegistryState::Ready {
            return Err(InitError::NotInitialized);
        }

        let mut report = PollReport::default();
        for sensor in &mut self.sensors {
            if !sensor.calibrator.state().is_terminal() {
                let status = sensor.calibrator.attempt(hw).status();
                // Capacity matches the sensor table, so this cannot overflow.
                let _ = report.calibrations.push((sensor.id(), status));
                continue;
            }

            match sensor.sample(hw, self.samples_per_read) {
                Ok(()) => report.sampled += 1,
                Err(e) => {
                    sensor.record_failure(e, self.max_sample_failures);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    pub fn get(&self, id: SensorId) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.id() == id)
    }

    pub fn reading(&self, id: SensorId) -> Option<Reading> {
        self.get(id).map(Sensor::reading)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.iter()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}
