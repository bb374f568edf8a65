//! Actuator controller: pumps, power relays, sockets and lights.
//!
//! The controller is the only owner of device on/off state.  State is
//! software-only: there is no read-back from the output pins, so a relay
//! that fails to energise goes unnoticed.
//!
//! Relays are plain digital outputs.  Lights sit on PWM channels: each pin
//! gets a duty derived from the light's [`LightLevel`], and switching a
//! light on restores the last level it was given.

use core::fmt;

use embedded_hal::digital::PinState;
use log::{info, warn};
use serde::Serialize;

use crate::app::ports::{GpioPort, NotificationSink};
use crate::control::policy::Decision;
use crate::error::{ActuatorError, InitError};

/// Capacity of the device table.
pub const MAX_DEVICES: usize = 8;
/// Output pins per device (an RGB light uses three).
pub const MAX_PINS: usize = 3;
/// Longest serial-number string.
pub const DEVICE_ID_LEN: usize = 16;

/// Stable device identity, e.g. `"PMP-aaa0001"`.  Never parsed for meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeviceId(heapless::String<DEVICE_ID_LEN>);

impl DeviceId {
    /// `None` if `id` is empty or longer than [`DEVICE_ID_LEN`].
    pub fn new(id: &str) -> Option<Self> {
        if id.is_empty() {
            return None;
        }
        let mut s = heapless::String::new();
        s.push_str(id).ok()?;
        Some(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Water pump relay; only the threshold policy (or a stop) moves it.
    Pump,
    Power,
    Socket,
    /// Up to three channels driven together.
    Light,
}

/// Brightness and colour mix of a light, every field 0-100 %.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightLevel {
    brightness: u8,
    red: u8,
    green: u8,
    blue: u8,
}

impl LightLevel {
    /// Full-brightness white; what a light starts with.
    pub const FULL: Self = Self {
        brightness: 100,
        red: 100,
        green: 100,
        blue: 100,
    };

    /// `None` if any field is above 100.
    pub const fn new(brightness: u8, red: u8, green: u8, blue: u8) -> Option<Self> {
        if brightness > 100 || red > 100 || green > 100 || blue > 100 {
            return None;
        }
        Some(Self {
            brightness,
            red,
            green,
            blue,
        })
    }

    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    /// All four fields zero: the light is switched off.
    pub const fn is_off(&self) -> bool {
        self.brightness == 0 && self.red == 0 && self.green == 0 && self.blue == 0
    }

    /// R, G and B duty in percent, each colour scaled onto `0..=brightness`.
    pub const fn channel_duties(&self) -> [u8; 3] {
        [
            scale(self.red, self.brightness),
            scale(self.green, self.brightness),
            scale(self.blue, self.brightness),
        ]
    }
}

const fn scale(colour: u8, brightness: u8) -> u8 {
    (colour as u16 * brightness as u16 / 100) as u8
}

/// Static description of one device (board table entry).
#[derive(Debug, Clone, Copy)]
pub struct DeviceSpec {
    pub id: &'static str,
    pub kind: DeviceKind,
    pub pins: &'static [i32],
    pub initial_on: bool,
}

#[derive(Debug, Clone)]
pub struct ActuatorDevice {
    id: DeviceId,
    kind: DeviceKind,
    pins: heapless::Vec<i32, MAX_PINS>,
    on: bool,
    /// Only meaningful for lights.
    level: LightLevel,
}

impl ActuatorDevice {
    fn from_spec(spec: &DeviceSpec) -> Result<Self, InitError> {
        let id = DeviceId::new(spec.id).ok_or(InitError::CapacityExceeded)?;
        if spec.pins.is_empty() {
            return Err(InitError::EmptyTable);
        }
        let pins =
            heapless::Vec::from_slice(spec.pins).map_err(|_| InitError::CapacityExceeded)?;
        Ok(Self {
            id,
            kind: spec.kind,
            pins,
            on: spec.initial_on,
            level: LightLevel::FULL,
        })
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn pins(&self) -> &[i32] {
        &self.pins
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Stored brightness and colour; `None` for anything but a light.
    pub fn light_level(&self) -> Option<LightLevel> {
        (self.kind == DeviceKind::Light).then_some(self.level)
    }

    fn configure(&self, gpio: &mut impl GpioPort) -> Result<(), InitError> {
        for &pin in &self.pins {
            if self.kind == DeviceKind::Light {
                gpio.configure_pwm(pin)?;
            } else {
                gpio.configure_output(pin)?;
            }
        }
        Ok(())
    }

    fn drive(&self, gpio: &mut impl GpioPort, on: bool) -> Result<(), ActuatorError> {
        self.drive_level(gpio, on, self.level)
    }

    fn drive_level(
        &self,
        gpio: &mut impl GpioPort,
        on: bool,
        level: LightLevel,
    ) -> Result<(), ActuatorError> {
        if self.kind != DeviceKind::Light {
            for &pin in &self.pins {
                gpio.set_output(pin, PinState::from(on))?;
            }
            return Ok(());
        }

        // A single-channel light only follows brightness.
        let duties = match (on, self.pins.len()) {
            (false, _) => [0; 3],
            (true, 1) => [level.brightness; 3],
            (true, _) => level.channel_duties(),
        };
        for (&pin, duty) in self.pins.iter().zip(duties) {
            gpio.set_duty(pin, duty)?;
        }
        Ok(())
    }

    /// Record a successful write.  Returns `true` if the state flipped.
    fn settle(&mut self, on: bool, notify: &mut impl NotificationSink) -> bool {
        if self.on == on {
            return false;
        }
        self.on = on;
        info!("{}: {}", self.id, if on { "ON" } else { "OFF" });
        notify.notify_state_change(&self.id, on);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControllerState {
    Uninitialized,
    Ready,
}

pub struct ActuatorController {
    devices: heapless::Vec<ActuatorDevice, MAX_DEVICES>,
    state: ControllerState,
}

impl ActuatorController {
    /// Build from the static device table.  No hardware access.
    pub fn new(specs: &[DeviceSpec]) -> Result<Self, InitError> {
        if specs.is_empty() {
            return Err(InitError::EmptyTable);
        }
        let mut devices = heapless::Vec::new();
        for (i, spec) in specs.iter().enumerate() {
            if specs[..i].iter().any(|d| d.id == spec.id) {
                return Err(InitError::DuplicateId);
            }
            devices
                .push(ActuatorDevice::from_spec(spec)?)
                .map_err(|_| InitError::CapacityExceeded)?;
        }
        Ok(Self {
            devices,
            state: ControllerState::Uninitialized,
        })
    }

    /// Configure every output pin and drive each device's initial state.
    pub fn begin(&mut self, gpio: &mut impl GpioPort) -> Result<(), InitError> {
        if self.state == ControllerState::Ready {
            return Err(InitError::AlreadyInitialized);
        }
        for device in &self.devices {
            device.configure(gpio)?;
            // -1 is ESP_FAIL; the port reports write failures without a code.
            device
                .drive(gpio, device.on)
                .map_err(|_| InitError::GpioConfigFailed(-1))?;
        }
        self.state = ControllerState::Ready;
        info!("ActuatorController: {} devices ready", self.devices.len());
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.state == ControllerState::Ready
    }

    /// Apply a policy decision.  `Engage`/`Disengage` always write the
    /// level; `Hold` writes nothing.  Returns `true` if the state flipped.
    pub fn apply(
        &mut self,
        id: &DeviceId,
        decision: Decision,
        gpio: &mut impl GpioPort,
        notify: &mut impl NotificationSink,
    ) -> Result<bool, ActuatorError> {
        match decision {
            Decision::Engage => self.set(id, true, gpio, notify),
            Decision::Disengage => self.set(id, false, gpio, notify),
            Decision::Hold => {
                self.ready()?;
                self.find(id).map(|_| false)
            }
        }
    }

    /// Drive `id` to `on`.  Allowed for every kind.  Returns `true` if the
    /// state flipped; a failed write leaves the stored state untouched.
    pub fn set(
        &mut self,
        id: &DeviceId,
        on: bool,
        gpio: &mut impl GpioPort,
        notify: &mut impl NotificationSink,
    ) -> Result<bool, ActuatorError> {
        self.ready()?;
        let device = self.find_mut(id)?;
        if let Err(e) = device.drive(gpio, on) {
            warn!("{}: write failed: {}", device.id, e);
            return Err(e);
        }
        Ok(device.settle(on, notify))
    }

    /// Set a light's brightness and colour.  An all-zero level switches it
    /// off and keeps the previous mix for the next switch-on; anything else
    /// switches it on.  Returns `true` if the on/off state flipped.
    pub fn set_light(
        &mut self,
        id: &DeviceId,
        level: LightLevel,
        gpio: &mut impl GpioPort,
        notify: &mut impl NotificationSink,
    ) -> Result<bool, ActuatorError> {
        self.ready()?;
        let device = self.find_mut(id)?;
        if device.kind != DeviceKind::Light {
            return Err(ActuatorError::NotDimmable);
        }
        let on = !level.is_off();
        let level = if on { level } else { device.level };
        if let Err(e) = device.drive_level(gpio, on, level) {
            warn!("{}: write failed: {}", device.id, e);
            return Err(e);
        }
        device.level = level;
        Ok(device.settle(on, notify))
    }

    /// Flip a manually controlled device.  Pumps refuse.
    /// Returns the new state.
    pub fn toggle(
        &mut self,
        id: &DeviceId,
        gpio: &mut impl GpioPort,
        notify: &mut impl NotificationSink,
    ) -> Result<bool, ActuatorError> {
        self.ready()?;
        let device = self.find(id)?;
        if device.kind == DeviceKind::Pump {
            return Err(ActuatorError::PolicyControlled);
        }
        let target = !device.on;
        self.set(id, target, gpio, notify)?;
        Ok(target)
    }

    pub fn is_on(&self, id: &DeviceId) -> Option<bool> {
        self.find(id).ok().map(ActuatorDevice::is_on)
    }

    pub fn device(&self, id: &DeviceId) -> Option<&ActuatorDevice> {
        self.find(id).ok()
    }

    pub fn devices(&self) -> &[ActuatorDevice] {
        &self.devices
    }

    fn ready(&self) -> Result<(), ActuatorError> {
        if self.state == ControllerState::Ready {
            Ok(())
        } else {
            Err(ActuatorError::NotInitialized)
        }
    }

    fn find(&self, id: &DeviceId) -> Result<&ActuatorDevice, ActuatorError> {
        self.devices
            .iter()
            .find(|d| &d.id == id)
            .ok_or(ActuatorError::UnknownDevice)
    }

    fn find_mut(&mut self, id: &DeviceId) -> Result<&mut ActuatorDevice, ActuatorError> {
        self.devices
            .iter_mut()
            .find(|d| &d.id == id)
            .ok_or(ActuatorError::UnknownDevice)
    }
}
