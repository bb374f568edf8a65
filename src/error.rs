//! Unified error types for the Cosmos firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! poll loop's error handling uniform.  All variants are `Copy` so they can
//! be passed through the registry, policy engine, and controller without
//! allocation.

use core::fmt;

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be sampled this cycle.
    Sensor(SensorError),
    /// A calibration scheme could not be created.
    Calibration(CalibrationError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// Subsystem initialisation failed; the subsystem stays inactive.
    Init(InitError),
    /// A configuration update was rejected.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Calibration(e) => write!(f, "calibration: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Init(e) => write!(f, "init: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

/// Transient sampling failures.  Never fatal: the sample is skipped and
/// retried on the next poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The conversion unit reported an error (bus busy, NACK).
    AdcReadFailed,
    /// The bus transaction timed out.
    Timeout,
    /// The calibration table lookup failed for this raw value.
    ConversionFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::Timeout => write!(f, "ADC read timed out"),
            Self::ConversionFailed => write!(f, "raw-to-voltage conversion failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Calibration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// The eFuse calibration data for this scheme is not burnt.
    NotSupported,
    /// The driver rejected the arguments or ran out of memory.
    InvalidArg,
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSupported => write!(f, "eFuse not burnt, scheme unsupported"),
            Self::InvalidArg => write!(f, "invalid argument or no memory"),
        }
    }
}

impl From<CalibrationError> for Error {
    fn from(e: CalibrationError) -> Self {
        Self::Calibration(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed,
    /// No device with the requested identity exists.
    UnknownDevice,
    /// `begin()` has not run yet.
    NotInitialized,
    /// The device only changes state through the threshold policy.
    PolicyControlled,
    /// Brightness and colour only apply to lights.
    NotDimmable,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::UnknownDevice => write!(f, "unknown device"),
            Self::NotInitialized => write!(f, "controller not initialised"),
            Self::PolicyControlled => write!(f, "device is policy-controlled"),
            Self::NotDimmable => write!(f, "device is not a light"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Initialisation errors
// ---------------------------------------------------------------------------

/// Setup errors.  Fatal to the subsystem that reports them, never to
/// the whole process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// `begin()` was called on a subsystem that is already running.
    AlreadyInitialized,
    /// An operation ran before `begin()`.
    NotInitialized,
    /// The static sensor or device table is empty.
    EmptyTable,
    /// Two entries share the same identity.
    DuplicateId,
    /// A table entry references a sensor or device that does not exist.
    UnknownReference,
    /// The fixed-capacity table is full.
    CapacityExceeded,
    /// ADC channel configuration failed (driver return code).
    AdcConfigFailed(i32),
    /// GPIO configuration failed (driver return code).
    GpioConfigFailed(i32),
    /// LEDC timer or channel configuration failed (driver return code).
    PwmConfigFailed(i32),
    /// Timer creation or start failed (driver return code).
    TimerFailed(i32),
    /// GPIO ISR service install failed (driver return code).
    IsrInstallFailed(i32),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialized => write!(f, "already initialised"),
            Self::NotInitialized => write!(f, "not initialised"),
            Self::EmptyTable => write!(f, "empty table"),
            Self::DuplicateId => write!(f, "duplicate identity"),
            Self::UnknownReference => write!(f, "unknown sensor or device reference"),
            Self::CapacityExceeded => write!(f, "table capacity exceeded"),
            Self::AdcConfigFailed(rc) => write!(f, "ADC config failed (rc={rc})"),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={rc})"),
            Self::PwmConfigFailed(rc) => write!(f, "LEDC config failed (rc={rc})"),
            Self::TimerFailed(rc) => write!(f, "timer setup failed (rc={rc})"),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={rc})"),
        }
    }
}

impl From<InitError> for Error {
    fn from(e: InitError) -> Self {
        Self::Init(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Threshold violations
// ---------------------------------------------------------------------------

/// Safety violations found by the policy engine.  Accumulated in a bitfield
/// so every simultaneous trip is visible, while the first one in priority
/// order is reported as the disengage reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Violation {
    /// A monitored reading is NaN, missing, or stale.
    InvalidReading = 0b0000_0001,
    /// Water level at or below its safe minimum.
    WaterLevelLow = 0b0000_0010,
    /// Soil moisture at or above its safe maximum.
    SoilMoistureHigh = 0b0000_0100,
    /// Temperature at or above its safe maximum.
    OverTemperature = 0b0000_1000,
    /// Air pollution at or above its safe maximum.
    AirPollutionHigh = 0b0001_0000,
    /// Flow at or below its safe minimum.
    FlowLow = 0b0010_0000,
}

impl Violation {
    /// Return the bitmask for this violation.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidReading => write!(f, "invalid reading"),
            Self::WaterLevelLow => write!(f, "water level low"),
            Self::SoilMoistureHigh => write!(f, "soil moisture high"),
            Self::OverTemperature => write!(f, "over temperature"),
            Self::AirPollutionHigh => write!(f, "air pollution high"),
            Self::FlowLow => write!(f, "flow low"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
