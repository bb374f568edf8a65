//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] and [`NotificationSink`] by writing structured
//! application events to the ESP-IDF logger (UART / USB-CDC in
//! production).  Telemetry goes out as one JSON line so a serial
//! collector can parse it.  An MQTT adapter would implement the same
//! traits.

use log::{error, info, warn};

use crate::adapters::time::MonotonicClock;
use crate::app::events::{AppEvent, TelemetryData};
use crate::app::ports::{EventSink, NotificationSink};
use crate::control::actuator::DeviceId;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink {
    clock: MonotonicClock,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Telemetry as a single JSON object.
pub fn telemetry_json(t: &TelemetryData) -> Result<String, serde_json::Error> {
    serde_json::to_string(t)
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => match telemetry_json(t) {
                Ok(json) => info!("TELEM | up={}s | {}", self.clock.uptime_secs(), json),
                Err(e) => warn!("TELEM | encode failed: {}", e),
            },
            AppEvent::DeviceStateChanged { device, on, cause } => {
                info!(
                    "DEVICE | {} -> {} ({:?})",
                    device,
                    if *on { "ON" } else { "OFF" },
                    cause
                );
            }
            AppEvent::SafetyCutoff {
                device,
                reason,
                faults,
            } => {
                error!(
                    "CUTOFF | {} | {} on {} (value={:.2}) | faults=0b{:08b}",
                    device, reason.violation, reason.sensor, reason.value, faults
                );
            }
            AppEvent::FaultsCleared { device } => {
                info!("CUTOFF | {} cleared", device);
            }
            AppEvent::CalibrationResolved { sensor, status } => {
                info!("CALIB | {} -> {:?}", sensor, status);
            }
            AppEvent::MotionDetected { index, active } => {
                info!("MOTION | pir{} {}", index, if *active { "active" } else { "quiet" });
            }
            AppEvent::Started { sensors, devices } => {
                info!("START | sensors={} devices={}", sensors, devices);
            }
        }
    }
}

impl NotificationSink for LogEventSink {
    fn notify_state_change(&mut self, device: &DeviceId, on: bool) {
        info!("REPORT | {} on_off={}", device, on);
    }
}
