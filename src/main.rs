//! Cosmos Firmware: Main Entry Point
//!
//! Hexagonal architecture with event-driven execution.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter         LogEventSink          NvsAdapter      │
//! │  (Adc+Calibration+Gpio)  (Event+Notification)  (Config)        │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  SensorRegistry · ThresholdPolicyEngine · Actuators    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  ISRs + esp_timer ──▶ EventQueue ──▶ main loop                 │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use cosmos::adapters::hardware::HardwareAdapter;
use cosmos::adapters::log_sink::LogEventSink;
use cosmos::adapters::nvs::NvsAdapter;
use cosmos::adapters::time::MonotonicClock;
use cosmos::app::commands::AppCommand;
use cosmos::app::ports::ConfigPort;
use cosmos::app::service::AppService;
use cosmos::board;
use cosmos::config::SystemConfig;
use cosmos::control::actuator::DeviceId;
use cosmos::control::policy::Intent;
use cosmos::drivers::input::InputConditioner;
use cosmos::drivers::{hw_init, hw_timer, watchdog::Watchdog};
use cosmos::events::{self, Event};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Cosmos v{}                          ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let nvs = NvsAdapter::new().unwrap_or_else(|e| {
        warn!("NVS init failed ({}), running with defaults and no persistence", e);
        NvsAdapter::default()
    });
    let config = nvs.load().unwrap_or_else(|e| {
        warn!("NVS config load failed ({}), using defaults", e);
        SystemConfig::default()
    });

    // ── 3. Hardware ───────────────────────────────────────────
    let mut hw = HardwareAdapter::new();
    if let Err(e) = hw.init() {
        // Without the ADC the registry refuses to start and every
        // policy-controlled device is held off; without LEDC lights stay dark.
        error!("Peripheral init failed: {}", e);
    }
    let mut sink = LogEventSink::new();

    // ── 4. Application service ────────────────────────────────
    let layout = board::PLANT_WATERING;
    let mut app = AppService::new(config.clone(), &layout)
        .map_err(|e| anyhow::anyhow!("board layout rejected: {e}"))?;
    if let Err(e) = app.start(&mut hw, &mut sink) {
        error!("Startup incomplete: {} (continuing with what came up)", e);
    }

    // Auto-watering: policy-controlled devices run whenever every bound
    // reading is nominal.  Re-armed after each cutoff.
    let auto: Vec<DeviceId> = app
        .policy()
        .profiles()
        .iter()
        .map(|p| p.device.clone())
        .collect();

    // ── 5. Interrupts, timers, watchdog ───────────────────────
    if let Err(e) = hw_init::init_inputs(layout.buttons, layout.motion) {
        error!("ISR service init failed: {}: continuing without local inputs", e);
    }
    hw_timer::start_timers(&config);
    let mut inputs = InputConditioner::new(config.button_debounce_ms);
    let mut watchdog = Watchdog::new(config.poll_interval_ms);
    let clock = MonotonicClock::new();
    let mut last_frame_ms = clock.uptime_ms();

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        events::drain_events(|event| match event {
            Event::PollTick => {
                for device in &auto {
                    if app.intent(device) == Some(Intent::Standby) {
                        let cmd = AppCommand::RequestEngage(device.clone());
                        if let Err(e) = app.handle_command(cmd, &mut hw, &mut sink) {
                            warn!("{}: re-arm failed: {}", device, e);
                        }
                    }
                }
                app.tick(&mut hw, &mut sink);
                app.save_if_dirty(&nvs);
            }

            Event::TelemetryTick => app.report_telemetry(&mut sink),

            Event::Button { .. } | Event::Motion { .. } => {
                if let Some(input) = inputs.condition(event) {
                    if let Err(e) = app.handle_input(input, &mut hw, &mut sink) {
                        warn!("Input {:?} rejected: {}", input, e);
                    }
                }
            }
        });

        // Timer periods, debounce and watchdog follow config updates.
        if let Some(config) = app.take_timing_change() {
            hw_timer::restart_timers(config);
            inputs.buttons.set_debounce_ms(config.button_debounce_ms);
            watchdog.set_poll_interval(config.poll_interval_ms);
        }

        let now_ms = clock.uptime_ms();
        app.animate(&mut hw, (now_ms - last_frame_ms) as u32);
        last_frame_ms = now_ms;

        watchdog.feed();

        // Yield to the IDLE task; events arrive at most every few ms.
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
}
