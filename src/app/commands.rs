//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (a control
//! topic, the serial console, local inputs) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.

use crate::config::SystemConfig;
use crate::control::actuator::{DeviceId, LightLevel};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone)]
pub enum AppCommand {
    /// Ask the policy to engage a policy-controlled device.  Honoured on
    /// the next poll cycle only if every bound reading is nominal.
    RequestEngage(DeviceId),

    /// Drop a pending engage request; a running device keeps running.
    Standby(DeviceId),

    /// Switch a device off now.  Always allowed.
    Stop(DeviceId),

    /// Flip a manually controlled device (socket, power, light).
    Toggle(DeviceId),

    /// Set a light's brightness and colour.  An all-zero level switches
    /// it off.
    SetLight(DeviceId, LightLevel),

    /// Hot-reload configuration.  Rejected if it fails validation.
    UpdateConfig(SystemConfig),
}

/// Debounced local inputs, produced by the input drivers in task context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Button `index` pressed (after debounce).
    ButtonPressed { index: u8 },
    /// PIR sensor `index` saw motion start.
    MotionStarted { index: u8 },
    /// PIR sensor `index` went quiet.
    MotionStopped { index: u8 },
}
