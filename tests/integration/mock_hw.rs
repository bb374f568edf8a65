//! Mock hardware adapter for integration tests.
//!
//! Scripted ADC values per channel, switchable eFuse calibration and a
//! log of every GPIO write, so tests can assert on the full command
//! history without touching real registers.

use std::cell::RefCell;
use std::collections::HashMap;

use cosmos::app::events::AppEvent;
use cosmos::app::ports::{
    AdcPort, Attenuation, BitWidth, CalibrationHandle, CalibrationPort, CalibrationScheme,
    ConfigError, ConfigPort, EventSink, GpioPort, NotificationSink,
};
use cosmos::config::SystemConfig;
use cosmos::control::actuator::DeviceId;
use cosmos::error::{ActuatorError, CalibrationError, InitError, SensorError};
use cosmos::sensors::AdcChannel;
use embedded_hal::digital::PinState;

// ── MockHardware ──────────────────────────────────────────────

/// Which calibration schemes the mock "eFuse" supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Efuse {
    /// Curve fitting works; millivolts equal raw counts.
    Curve,
    /// Only line fitting works; millivolts equal raw counts.
    LineOnly,
    /// Nothing burnt.
    Blank,
}

pub struct MockHardware {
    /// Raw value per ADC channel number.
    pub raw: HashMap<u8, i32>,
    /// Channels whose reads fail.
    pub failing: Vec<u8>,
    pub efuse: Efuse,
    pub configured: Vec<(AdcChannel, Attenuation, BitWidth)>,
    pub writes: Vec<(i32, PinState)>,
    /// Pins set up as PWM outputs.
    pub pwm: Vec<i32>,
    /// Duty writes in percent.
    pub duties: Vec<(i32, u8)>,
    pub fail_pin: Option<i32>,
    pub reads: usize,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self {
            raw: HashMap::new(),
            failing: Vec::new(),
            efuse: Efuse::Curve,
            configured: Vec::new(),
            writes: Vec::new(),
            pwm: Vec::new(),
            duties: Vec::new(),
            fail_pin: None,
            reads: 0,
        }
    }

    pub fn with_efuse(efuse: Efuse) -> Self {
        Self {
            efuse,
            ..Self::new()
        }
    }

    pub fn set_raw(&mut self, channel: AdcChannel, raw: i32) {
        self.raw.insert(channel.channel, raw);
    }

    pub fn fail(&mut self, channel: AdcChannel) {
        self.failing.push(channel.channel);
    }

    pub fn heal(&mut self, channel: AdcChannel) {
        self.failing.retain(|&c| c != channel.channel);
    }

    /// Last level written to `pin`.
    pub fn level(&self, pin: i32) -> Option<PinState> {
        self.writes
            .iter()
            .rev()
            .find(|(p, _)| *p == pin)
            .map(|&(_, l)| l)
    }

    pub fn writes_to(&self, pin: i32) -> usize {
        self.writes.iter().filter(|(p, _)| *p == pin).count()
    }

    /// Last duty written to `pin`.
    pub fn duty(&self, pin: i32) -> Option<u8> {
        self.duties
            .iter()
            .rev()
            .find(|(p, _)| *p == pin)
            .map(|&(_, d)| d)
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl AdcPort for MockHardware {
    fn configure_channel(
        &mut self,
        channel: AdcChannel,
        attenuation: Attenuation,
        width: BitWidth,
    ) -> Result<(), InitError> {
        self.configured.push((channel, attenuation, width));
        Ok(())
    }

    fn read_raw(&mut self, channel: AdcChannel) -> Result<i32, SensorError> {
        self.reads += 1;
        if self.failing.contains(&channel.channel) {
            return Err(SensorError::AdcReadFailed);
        }
        Ok(self.raw.get(&channel.channel).copied().unwrap_or(0))
    }
}

impl CalibrationPort for MockHardware {
    fn create_scheme(
        &mut self,
        channel: AdcChannel,
        scheme: CalibrationScheme,
    ) -> Result<CalibrationHandle, CalibrationError> {
        match (self.efuse, scheme) {
            (Efuse::Curve, _) | (Efuse::LineOnly, CalibrationScheme::LineFitting { .. }) => {
                Ok(CalibrationHandle(u32::from(channel.channel)))
            }
            _ => Err(CalibrationError::NotSupported),
        }
    }

    fn raw_to_millivolts(&self, _handle: CalibrationHandle, raw: i32) -> Result<i32, SensorError> {
        Ok(raw)
    }
}

impl GpioPort for MockHardware {
    fn configure_output(&mut self, _pin: i32) -> Result<(), InitError> {
        Ok(())
    }

    fn set_output(&mut self, pin: i32, level: PinState) -> Result<(), ActuatorError> {
        if self.fail_pin == Some(pin) {
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.writes.push((pin, level));
        Ok(())
    }

    fn configure_pwm(&mut self, pin: i32) -> Result<(), InitError> {
        self.pwm.push(pin);
        Ok(())
    }

    fn set_duty(&mut self, pin: i32, duty_pct: u8) -> Result<(), ActuatorError> {
        if self.fail_pin == Some(pin) {
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.duties.push((pin, duty_pct));
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
    pub notifications: Vec<(String, bool)>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.notifications.clear();
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

impl NotificationSink for RecordingSink {
    fn notify_state_change(&mut self, device: &DeviceId, on: bool) {
        self.notifications.push((device.to_string(), on));
    }
}

// ── MockConfigStore ───────────────────────────────────────────

/// In-memory [`ConfigPort`] that validates like the NVS adapter.
#[derive(Default)]
pub struct MockConfigStore {
    pub saved: RefCell<Option<SystemConfig>>,
    pub fail_writes: bool,
}

impl ConfigPort for MockConfigStore {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        Ok(self.saved.borrow().clone().unwrap_or_default())
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if self.fail_writes {
            return Err(ConfigError::IoError);
        }
        *self.saved.borrow_mut() = Some(config.clone());
        Ok(())
    }
}
