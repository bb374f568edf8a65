//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Implements [`AdcPort`], [`CalibrationPort`] and [`GpioPort`] (relay
//! outputs and LEDC dimming) on top of
//! [`hw_init`](crate::drivers::hw_init).  This is the only module in the
//! system that touches actual hardware.  On non-espidf targets the
//! underlying driver functions are simulation stubs.

use embedded_hal::digital::PinState;
use log::debug;

use crate::app::ports::{
    AdcPort, Attenuation, BitWidth, CalibrationHandle, CalibrationPort, CalibrationScheme,
    GpioPort,
};
use crate::drivers::hw_init::{self, LEDC_CHANNELS};
use crate::error::{ActuatorError, CalibrationError, InitError, SensorError};
use crate::sensors::{AdcChannel, AdcUnit, MAX_SENSORS};

/// Concrete adapter over the ESP32 ADC1 unit, eFuse calibration and GPIO.
pub struct HardwareAdapter {
    /// Attenuation and width per configured channel; calibration schemes
    /// must be created with the same settings.
    channels: heapless::Vec<(AdcChannel, Attenuation, BitWidth), MAX_SENSORS>,
    /// GPIO per LEDC channel, in allocation order.
    pwm_pins: heapless::Vec<i32, LEDC_CHANNELS>,
}

impl Default for HardwareAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareAdapter {
    pub fn new() -> Self {
        Self {
            channels: heapless::Vec::new(),
            pwm_pins: heapless::Vec::new(),
        }
    }

    /// Create the ADC unit and the LEDC timer.  Call once, before the
    /// service starts.  Both are attempted; the first failure is returned.
    pub fn init(&mut self) -> Result<(), InitError> {
        let adc = hw_init::init_adc();
        let ledc = hw_init::init_ledc();
        adc.and(ledc)
    }

    fn settings(&self, channel: AdcChannel) -> Option<(Attenuation, BitWidth)> {
        self.channels
            .iter()
            .find(|(c, _, _)| *c == channel)
            .map(|&(_, a, w)| (a, w))
    }

    fn pwm_channel(&self, pin: i32) -> Option<usize> {
        self.pwm_pins.iter().position(|&p| p == pin)
    }
}

// ── AdcPort implementation ────────────────────────────────────

impl AdcPort for HardwareAdapter {
    fn configure_channel(
        &mut self,
        channel: AdcChannel,
        attenuation: Attenuation,
        width: BitWidth,
    ) -> Result<(), InitError> {
        // ADC2 is shared with the WiFi radio.
        if channel.unit != AdcUnit::Adc1 {
            return Err(InitError::AdcConfigFailed(-1));
        }
        hw_init::adc_config_channel(channel, attenuation, width)?;
        if self.settings(channel).is_none() {
            self.channels
                .push((channel, attenuation, width))
                .map_err(|_| InitError::CapacityExceeded)?;
        }
        debug!("{channel}: {:?}, {:?}", attenuation, width);
        Ok(())
    }

    fn read_raw(&mut self, channel: AdcChannel) -> Result<i32, SensorError> {
        if self.settings(channel).is_none() {
            return Err(SensorError::AdcReadFailed);
        }
        hw_init::adc_read(channel)
    }
}

// ── CalibrationPort implementation ────────────────────────────

impl CalibrationPort for HardwareAdapter {
    fn create_scheme(
        &mut self,
        channel: AdcChannel,
        scheme: CalibrationScheme,
    ) -> Result<CalibrationHandle, CalibrationError> {
        let (attenuation, width) = self.settings(channel).ok_or(CalibrationError::InvalidArg)?;
        hw_init::cali_create(channel, scheme, attenuation, width)
    }

    fn raw_to_millivolts(&self, handle: CalibrationHandle, raw: i32) -> Result<i32, SensorError> {
        hw_init::cali_raw_to_mv(handle, raw)
    }
}

// ── GpioPort implementation ───────────────────────────────────

impl GpioPort for HardwareAdapter {
    fn configure_output(&mut self, pin: i32) -> Result<(), InitError> {
        hw_init::gpio_config_output(pin)
    }

    fn set_output(&mut self, pin: i32, level: PinState) -> Result<(), ActuatorError> {
        hw_init::gpio_write(pin, level)
    }

    fn configure_pwm(&mut self, pin: i32) -> Result<(), InitError> {
        let channel = match self.pwm_channel(pin) {
            Some(channel) => channel,
            None => {
                self.pwm_pins
                    .push(pin)
                    .map_err(|_| InitError::CapacityExceeded)?;
                self.pwm_pins.len() - 1
            }
        };
        hw_init::ledc_config_channel(channel as u32, pin)?;
        debug!("GPIO{pin}: LEDC channel {channel}");
        Ok(())
    }

    fn set_duty(&mut self, pin: i32, duty_pct: u8) -> Result<(), ActuatorError> {
        let channel = self.pwm_channel(pin).ok_or(ActuatorError::GpioWriteFailed)?;
        hw_init::ledc_set(channel as u32, hw_init::duty_8bit(duty_pct))
    }
}
