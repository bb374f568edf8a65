//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements         | Connects to                |
//! |------------|--------------------|----------------------------|
//! | `hardware` | AdcPort            | ESP32 ADC1 oneshot         |
//! |            | CalibrationPort    | eFuse ADC calibration      |
//! |            | GpioPort           | ESP32 GPIO outputs, LEDC   |
//! | `log_sink` | EventSink          | Serial log output          |
//! |            | NotificationSink   | Serial log output          |
//! | `nvs`      | ConfigPort         | NVS / in-memory store      |
//! | `time`     |:                  | ESP32 system timer         |

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
