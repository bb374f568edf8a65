//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (ADC, calibration tables, GPIO, event sinks, storage)
//! implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed: callers must handle every variant explicitly.

use embedded_hal::digital::PinState;

use crate::config::SystemConfig;
use crate::control::actuator::DeviceId;
use crate::error::{ActuatorError, CalibrationError, InitError, SensorError};
use crate::sensors::AdcChannel;

// ───────────────────────────────────────────────────────────────
// ADC port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Input attenuation applied to an ADC channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attenuation {
    Db0,
    Db2_5,
    Db6,
    /// Full 0-3.3 V range; what every Cosmos channel uses.
    Db12,
}

/// Conversion width in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitWidth {
    Bits9,
    Bits10,
    Bits11,
    Bits12,
}

impl BitWidth {
    /// Largest raw count this width can produce.
    pub const fn max_raw(self) -> i32 {
        match self {
            Self::Bits9 => 511,
            Self::Bits10 => 1023,
            Self::Bits11 => 2047,
            Self::Bits12 => 4095,
        }
    }
}

/// Raw analog sampling.
pub trait AdcPort {
    /// Fix attenuation and width for a channel.  Called once per channel.
    fn configure_channel(
        &mut self,
        channel: AdcChannel,
        attenuation: Attenuation,
        width: BitWidth,
    ) -> Result<(), InitError>;

    /// One instantaneous reading in raw counts.
    fn read_raw(&mut self, channel: AdcChannel) -> Result<i32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Calibration port
// ───────────────────────────────────────────────────────────────

/// Hardware calibration scheme, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum CalibrationScheme {
    /// Curve fitting from eFuse data.
    CurveFitting,
    /// Line fitting; falls back to `default_vref_mv` if the eFuse Vref is absent.
    LineFitting { default_vref_mv: u32 },
}

/// Opaque handle to a created calibration scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationHandle(pub u32);

/// Raw-count to millivolt calibration backed by eFuse data.
pub trait CalibrationPort {
    /// Create a scheme for `channel`.  `CalibrationError::NotSupported` when
    /// the eFuse data for that scheme was never burnt.
    fn create_scheme(
        &mut self,
        channel: AdcChannel,
        scheme: CalibrationScheme,
    ) -> Result<CalibrationHandle, CalibrationError>;

    /// Table lookup only, no bus transaction.
    fn raw_to_millivolts(&self, handle: CalibrationHandle, raw: i32) -> Result<i32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// GPIO port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Digital outputs driving relays and status LEDs, plus PWM outputs
/// dimming lights.
pub trait GpioPort {
    fn configure_output(&mut self, pin: i32) -> Result<(), InitError>;

    fn set_output(&mut self, pin: i32, level: PinState) -> Result<(), ActuatorError>;

    /// Attach `pin` to a PWM channel, duty 0.
    fn configure_pwm(&mut self, pin: i32) -> Result<(), InitError>;

    /// Duty cycle in percent (0-100) on a pin set up by
    /// [`configure_pwm`](Self::configure_pwm).
    fn set_duty(&mut self, pin: i32, duty_pct: u8) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Notification port
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget device state reports (attribute reporting, MQTT, ...).
pub trait NotificationSink {
    fn notify_state_change(&mut self, device: &DeviceId, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges should be rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped, so a bad command can never disable a safety
/// cutoff (e.g. `temperature.safe_max = f32::MAX`).
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
