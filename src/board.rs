//! Board layout for the Cosmos plant-watering controller (ESP32-WROOM).
//!
//! Single source of truth: sensor channels, output pins, threshold
//! bindings and local inputs all come from here.  Change a pin here and it
//! propagates everywhere.
//!
//! Analog inputs sit on ADC1 only: ADC2 is unusable while WiFi is up.

use crate::control::actuator::{DeviceKind, DeviceSpec};
use crate::control::policy::ProfileSpec;
use crate::sensors::{AdcChannel, AdcUnit, SensorKind, SensorSpec};

// ---------------------------------------------------------------------------
// Sensors: Analog (ADC1, 12 dB, 12 bit)
// ---------------------------------------------------------------------------

pub const WATER_LEVEL_ID: &str = "SNRWL-aaa0001";
pub const SOIL_MOISTURE_ID: &str = "SNRSM-aaa0001";
pub const TEMPERATURE_ID: &str = "SNRTH-aaa0001";
pub const AIR_POLLUTION_ID: &str = "SNRPO-aaa0001";
pub const FLOW_ID: &str = "SNRFL-aaa0001";

/// Float-resistor water level sensor.  GPIO 35.
pub const WATER_LEVEL_ADC: AdcChannel = AdcChannel::new(AdcUnit::Adc1, 7, 35);
/// Capacitive soil sensor (1.5 V wet, 3.0 V dry).  GPIO 34.
pub const SOIL_MOISTURE_ADC: AdcChannel = AdcChannel::new(AdcUnit::Adc1, 6, 34);
/// NTC thermistor, 10 kOhm divider.  GPIO 36 (SENSOR_VP).
pub const TEMPERATURE_ADC: AdcChannel = AdcChannel::new(AdcUnit::Adc1, 0, 36);
/// MQ-135 air quality module.  GPIO 39 (SENSOR_VN).
pub const AIR_POLLUTION_ADC: AdcChannel = AdcChannel::new(AdcUnit::Adc1, 3, 39);
/// Analog flow transducer.  GPIO 32.
pub const FLOW_ADC: AdcChannel = AdcChannel::new(AdcUnit::Adc1, 4, 32);

pub const SENSORS: &[SensorSpec] = &[
    SensorSpec {
        id: WATER_LEVEL_ID,
        kind: SensorKind::WaterLevel,
        channel: WATER_LEVEL_ADC,
    },
    SensorSpec {
        id: SOIL_MOISTURE_ID,
        kind: SensorKind::SoilMoisture,
        channel: SOIL_MOISTURE_ADC,
    },
    SensorSpec {
        id: TEMPERATURE_ID,
        kind: SensorKind::Temperature,
        channel: TEMPERATURE_ADC,
    },
    SensorSpec {
        id: AIR_POLLUTION_ID,
        kind: SensorKind::AirPollution,
        channel: AIR_POLLUTION_ADC,
    },
    SensorSpec {
        id: FLOW_ID,
        kind: SensorKind::Flow,
        channel: FLOW_ADC,
    },
];

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

pub const PUMP_ID: &str = "PMP-aaa0001";
pub const SOCKET_ID: &str = "SKT-aaa0001";
pub const POWER_ID: &str = "PWR-aaa0001";
pub const LIGHT_ID: &str = "LGT-aaa0001";

/// Pump relay (active HIGH).
pub const PUMP_GPIO: i32 = 25;
/// Mains socket relay.
pub const SOCKET_GPIO: i32 = 26;
/// Auxiliary power rail switch.
pub const POWER_GPIO: i32 = 27;
/// RGB grow light on LEDC channels, dimmed per colour.
pub const LIGHT_GPIOS: [i32; 3] = [16, 17, 18];
/// Pump status LED, R/G/B as plain digital outputs.
pub const PUMP_STATUS_LED: [i32; 3] = [19, 21, 22];

pub const DEVICES: &[DeviceSpec] = &[
    DeviceSpec {
        id: PUMP_ID,
        kind: DeviceKind::Pump,
        pins: &[PUMP_GPIO],
        initial_on: false,
    },
    DeviceSpec {
        id: SOCKET_ID,
        kind: DeviceKind::Socket,
        pins: &[SOCKET_GPIO],
        initial_on: false,
    },
    DeviceSpec {
        id: POWER_ID,
        kind: DeviceKind::Power,
        pins: &[POWER_GPIO],
        initial_on: true,
    },
    DeviceSpec {
        id: LIGHT_ID,
        kind: DeviceKind::Light,
        pins: &LIGHT_GPIOS,
        initial_on: false,
    },
];

// ---------------------------------------------------------------------------
// Threshold bindings
// ---------------------------------------------------------------------------

/// The pump is watched by water level, soil moisture and temperature.
/// Flow is reported only: it reads zero whenever the pump is idle.
pub const PROFILES: &[ProfileSpec] = &[ProfileSpec {
    device: PUMP_ID,
    sensors: &[WATER_LEVEL_ID, SOIL_MOISTURE_ID, TEMPERATURE_ID],
}];

/// A policy-controlled device's three-colour status LED.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorBinding {
    pub device: &'static str,
    /// Red, green, blue.
    pub pins: [i32; 3],
}

pub const INDICATORS: &[IndicatorBinding] = &[IndicatorBinding {
    device: PUMP_ID,
    pins: PUMP_STATUS_LED,
}];

// ---------------------------------------------------------------------------
// Local inputs (edge interrupts)
// ---------------------------------------------------------------------------

/// A GPIO input and the device it drives.  The input's index in its table
/// is what the ISR reports.
#[derive(Debug, Clone, Copy)]
pub struct InputBinding {
    pub gpio: i32,
    pub device: &'static str,
}

/// Active-low push buttons with internal pull-up; a press toggles the device.
pub const BUTTONS: &[InputBinding] = &[
    InputBinding {
        gpio: 4,
        device: SOCKET_ID,
    },
    InputBinding {
        gpio: 5,
        device: POWER_ID,
    },
];

/// HC-SR501 PIR sensors; motion turns the light on, quiet turns it off.
pub const MOTION: &[InputBinding] = &[InputBinding {
    gpio: 14,
    device: LIGHT_ID,
}];

/// Everything the application service needs to know about a board.
#[derive(Debug, Clone, Copy)]
pub struct BoardLayout {
    pub sensors: &'static [SensorSpec],
    pub devices: &'static [DeviceSpec],
    pub profiles: &'static [ProfileSpec],
    pub indicators: &'static [IndicatorBinding],
    pub buttons: &'static [InputBinding],
    pub motion: &'static [InputBinding],
}

pub const PLANT_WATERING: BoardLayout = BoardLayout {
    sensors: SENSORS,
    devices: DEVICES,
    profiles: PROFILES,
    indicators: INDICATORS,
    buttons: BUTTONS,
    motion: MOTION,
};
