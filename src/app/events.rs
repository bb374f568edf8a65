//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, publish, etc.

use serde::Serialize;

use crate::control::actuator::{DeviceId, DeviceKind, LightLevel, MAX_DEVICES};
use crate::control::policy::{Intent, Trip};
use crate::sensors::calibration::CalibrationStatus;
use crate::sensors::{MAX_SENSORS, Quality, SensorId, SensorKind};

/// What caused a device to change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    Policy,
    Command,
    Button,
    Motion,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service finished bringing up sensors and devices.
    Started { sensors: u8, devices: u8 },

    /// A device flipped on or off.
    DeviceStateChanged {
        device: DeviceId,
        on: bool,
        cause: ChangeCause,
    },

    /// A safety cutoff fired or its fault set changed.
    SafetyCutoff {
        device: DeviceId,
        reason: Trip,
        faults: u8,
    },

    /// Every fault on a device has cleared.
    FaultsCleared { device: DeviceId },

    /// A sensor's one-time calibration attempt finished.
    CalibrationResolved {
        sensor: SensorId,
        status: CalibrationStatus,
    },

    /// A PIR input changed level.
    MotionDetected { index: u8, active: bool },

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryData {
    pub tick: u64,
    pub sensors: heapless::Vec<SensorTelemetry, MAX_SENSORS>,
    pub devices: heapless::Vec<DeviceTelemetry, MAX_DEVICES>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorTelemetry {
    pub id: SensorId,
    pub kind: SensorKind,
    /// `None` while the reading is invalid.
    pub value: Option<f32>,
    pub millivolts: Option<i32>,
    pub quality: Quality,
    pub calibration: CalibrationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceTelemetry {
    pub id: DeviceId,
    pub kind: DeviceKind,
    pub on: bool,
    /// Only policy-controlled devices carry an intent.
    pub intent: Option<Intent>,
    pub faults: u8,
    /// Brightness and colour, lights only.
    pub light: Option<LightLevel>,
}
