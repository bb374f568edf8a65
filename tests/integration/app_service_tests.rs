//! AppService integration tests against mock hardware.
//!
//! Every test drives the service the way the firmware main loop does:
//! `start`, then one `tick` per poll cycle, with commands and inputs in
//! between.  The mock "eFuse" maps raw counts 1:1 to millivolts unless a
//! test says otherwise.

use cosmos::app::commands::{AppCommand, InputEvent};
use cosmos::app::events::{AppEvent, ChangeCause};
use cosmos::app::ports::{Attenuation, BitWidth, ConfigError};
use cosmos::app::service::AppService;
use cosmos::board::{self, PLANT_WATERING};
use cosmos::config::{KindLimits, SystemConfig};
use cosmos::control::actuator::{DeviceId, LightLevel};
use cosmos::control::policy::Intent;
use cosmos::drivers::led_patterns::{self, BLINK_HALF_PERIOD_MS};
use cosmos::error::{ActuatorError, Error, Violation};
use cosmos::sensors::Quality;
use cosmos::sensors::calibration::CalibrationStatus;
use embedded_hal::digital::PinState;

use crate::mock_hw::{Efuse, MockConfigStore, MockHardware, RecordingSink};

// ── Helpers ───────────────────────────────────────────────────

fn pump() -> DeviceId {
    DeviceId::new(board::PUMP_ID).unwrap()
}

fn socket() -> DeviceId {
    DeviceId::new(board::SOCKET_ID).unwrap()
}

fn light() -> DeviceId {
    DeviceId::new(board::LIGHT_ID).unwrap()
}

fn light_duties(hw: &MockHardware) -> [Option<u8>; 3] {
    board::LIGHT_GPIOS.map(|pin| hw.duty(pin))
}

/// Levels currently on the pump's status LED pins.
fn status_led(hw: &MockHardware) -> [Option<PinState>; 3] {
    board::PUMP_STATUS_LED.map(|pin| hw.level(pin))
}

/// Raw counts that read nominal with a 1:1 calibration.
fn nominal(hw: &mut MockHardware) {
    hw.set_raw(board::WATER_LEVEL_ADC, 2000); // ~61 %
    hw.set_raw(board::SOIL_MOISTURE_ADC, 2500); // ~33 %
    hw.set_raw(board::TEMPERATURE_ADC, 1650); // 25 C
    hw.set_raw(board::AIR_POLLUTION_ADC, 400);
    hw.set_raw(board::FLOW_ADC, 0);
}

fn started(config: SystemConfig, mut hw: MockHardware) -> (AppService, MockHardware, RecordingSink) {
    let mut app = AppService::new(config, &PLANT_WATERING).unwrap();
    let mut sink = RecordingSink::new();
    app.start(&mut hw, &mut sink).unwrap();
    (app, hw, sink)
}

/// Started, calibrated and sampled once with nominal readings.
fn running_idle() -> (AppService, MockHardware, RecordingSink) {
    let mut hw = MockHardware::new();
    nominal(&mut hw);
    let (mut app, mut hw, mut sink) = started(SystemConfig::default(), hw);
    app.tick(&mut hw, &mut sink); // calibration cycle
    app.tick(&mut hw, &mut sink); // first sample
    sink.clear();
    hw.writes.clear();
    (app, hw, sink)
}

/// Pump engaged by the policy.
fn pumping() -> (AppService, MockHardware, RecordingSink) {
    let (mut app, mut hw, mut sink) = running_idle();
    app.handle_command(AppCommand::RequestEngage(pump()), &mut hw, &mut sink)
        .unwrap();
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.controller().is_on(&pump()), Some(true));
    sink.clear();
    hw.writes.clear();
    (app, hw, sink)
}

fn soil_value(app: &AppService) -> f32 {
    app.registry().reading(board::SOIL_MOISTURE_ID).unwrap().value
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_configures_channels_and_initial_outputs() {
    let (_app, hw, sink) = started(SystemConfig::default(), MockHardware::new());

    assert_eq!(hw.configured.len(), board::SENSORS.len());
    assert!(
        hw.configured
            .iter()
            .all(|&(_, a, w)| a == Attenuation::Db12 && w == BitWidth::Bits12)
    );
    assert_eq!(hw.level(board::POWER_GPIO), Some(PinState::High));
    assert_eq!(hw.level(board::PUMP_GPIO), Some(PinState::Low));
    assert_eq!(
        sink.events[0],
        AppEvent::Started {
            sensors: 5,
            devices: 4
        }
    );
}

#[test]
fn second_start_is_rejected() {
    let (mut app, mut hw, mut sink) = started(SystemConfig::default(), MockHardware::new());
    assert!(app.start(&mut hw, &mut sink).is_err());
}

#[test]
fn tick_before_start_writes_nothing_and_cuts_off() {
    let mut app = AppService::new(SystemConfig::default(), &PLANT_WATERING).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    app.tick(&mut hw, &mut sink);
    assert!(hw.writes.is_empty());
    assert_eq!(hw.reads, 0);
    assert_eq!(app.fault_flags(&pump()), Violation::InvalidReading.mask());
}

// ── Calibration ───────────────────────────────────────────────

#[test]
fn first_cycle_is_spent_on_calibration() {
    let mut hw = MockHardware::new();
    nominal(&mut hw);
    let (mut app, mut hw, mut sink) = started(SystemConfig::default(), hw);

    app.tick(&mut hw, &mut sink);
    assert_eq!(hw.reads, 0);
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::CalibrationResolved {
                status: CalibrationStatus::CurveFitting,
                ..
            }
        )),
        board::SENSORS.len()
    );
    assert!(soil_value(&app).is_nan());

    sink.clear();
    app.tick(&mut hw, &mut sink);
    assert!(hw.reads > 0);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::CalibrationResolved { .. })),
        0
    );
    let r = app.registry().reading(board::SOIL_MOISTURE_ID).unwrap();
    assert_eq!(r.quality, Quality::Calibrated);
}

#[test]
fn line_fitting_used_when_curve_missing() {
    let (mut app, mut hw, mut sink) =
        started(SystemConfig::default(), MockHardware::with_efuse(Efuse::LineOnly));
    app.tick(&mut hw, &mut sink);
    assert!(
        app.registry()
            .iter()
            .all(|s| s.calibration() == CalibrationStatus::LineFitting)
    );
}

#[test]
fn blank_efuse_runs_degraded_and_policy_still_engages() {
    let mut hw = MockHardware::with_efuse(Efuse::Blank);
    // Fallback is raw * 3300 / 4095.
    hw.set_raw(board::WATER_LEVEL_ADC, 2000);
    hw.set_raw(board::SOIL_MOISTURE_ADC, 3102); // ~2499 mV, ~33 %
    hw.set_raw(board::TEMPERATURE_ADC, 2048); // ~1650 mV, ~25 C
    let (mut app, mut hw, mut sink) = started(SystemConfig::default(), hw);

    app.tick(&mut hw, &mut sink);
    app.tick(&mut hw, &mut sink);
    let r = app.registry().reading(board::SOIL_MOISTURE_ID).unwrap();
    assert_eq!(r.quality, Quality::Degraded);
    assert_eq!(r.millivolts, Some(2499));
    assert!(
        app.registry()
            .iter()
            .all(|s| s.calibration() == CalibrationStatus::Unsupported)
    );

    app.handle_command(AppCommand::RequestEngage(pump()), &mut hw, &mut sink)
        .unwrap();
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.controller().is_on(&pump()), Some(true));
}

// ── End-to-end soil mapping ───────────────────────────────────

fn soil_after_one_sample(raw: i32) -> f32 {
    let mut hw = MockHardware::new();
    nominal(&mut hw);
    hw.set_raw(board::SOIL_MOISTURE_ADC, raw);
    let (mut app, mut hw, mut sink) = started(SystemConfig::default(), hw);
    app.tick(&mut hw, &mut sink);
    app.tick(&mut hw, &mut sink);
    soil_value(&app)
}

#[test]
fn soil_wettest_reads_full_scale() {
    assert_eq!(soil_after_one_sample(1500), 100.0);
}

#[test]
fn soil_driest_reads_zero() {
    assert_eq!(soil_after_one_sample(3000), 0.0);
}

#[test]
fn soil_midpoint_reads_half() {
    assert_eq!(soil_after_one_sample(2250), 50.0);
}

// ── Policy flow ───────────────────────────────────────────────

#[test]
fn startup_cutoff_then_clear() {
    let mut hw = MockHardware::new();
    nominal(&mut hw);
    let (mut app, mut hw, mut sink) = started(SystemConfig::default(), hw);

    // No samples yet: every bound reading is invalid.
    app.tick(&mut hw, &mut sink);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::SafetyCutoff { reason, .. }
            if reason.sensor == board::WATER_LEVEL_ID
                && reason.violation == Violation::InvalidReading
    )));
    assert!(sink.notifications.is_empty(), "pump was already off");

    sink.clear();
    app.tick(&mut hw, &mut sink);
    assert!(
        sink.events
            .iter()
            .any(|e| matches!(e, AppEvent::FaultsCleared { .. }))
    );
    assert_eq!(app.fault_flags(&pump()), 0);
}

#[test]
fn standby_intent_holds_pump_off() {
    let (mut app, mut hw, mut sink) = running_idle();
    for _ in 0..3 {
        app.tick(&mut hw, &mut sink);
    }
    assert_eq!(app.controller().is_on(&pump()), Some(false));
    assert_eq!(hw.writes_to(board::PUMP_GPIO), 0);
}

#[test]
fn engage_request_runs_pump_and_notifies_once() {
    let (mut app, mut hw, mut sink) = running_idle();
    app.handle_command(AppCommand::RequestEngage(pump()), &mut hw, &mut sink)
        .unwrap();
    assert_eq!(app.intent(&pump()), Some(Intent::EngageRequested));

    app.tick(&mut hw, &mut sink);
    assert_eq!(hw.level(board::PUMP_GPIO), Some(PinState::High));
    assert_eq!(app.intent(&pump()), Some(Intent::AlreadyRunning));
    assert_eq!(sink.notifications, vec![(board::PUMP_ID.to_string(), true)]);
    assert!(sink.events.contains(&AppEvent::DeviceStateChanged {
        device: pump(),
        on: true,
        cause: ChangeCause::Policy,
    }));
}

#[test]
fn hold_is_idempotent() {
    let (mut app, mut hw, mut sink) = pumping();
    for _ in 0..10 {
        app.tick(&mut hw, &mut sink);
    }
    assert!(sink.notifications.is_empty());
    assert_eq!(hw.writes_to(board::PUMP_GPIO), 0);
    assert_eq!(app.controller().is_on(&pump()), Some(true));
}

#[test]
fn engage_while_running_is_already_running() {
    let (mut app, mut hw, mut sink) = pumping();
    app.handle_command(AppCommand::RequestEngage(pump()), &mut hw, &mut sink)
        .unwrap();
    assert_eq!(app.intent(&pump()), Some(Intent::AlreadyRunning));
}

#[test]
fn wet_soil_cuts_pump_off() {
    let (mut app, mut hw, mut sink) = pumping();
    hw.set_raw(board::SOIL_MOISTURE_ADC, 1500);

    let mut ticks = 0;
    while app.controller().is_on(&pump()) == Some(true) {
        app.tick(&mut hw, &mut sink);
        ticks += 1;
        assert!(ticks <= 10, "filter window should settle within 10 cycles");
    }

    assert!(soil_value(&app) >= 80.0);
    assert_eq!(hw.level(board::PUMP_GPIO), Some(PinState::Low));
    assert_eq!(app.intent(&pump()), Some(Intent::Standby));
    assert_eq!(
        app.fault_flags(&pump()),
        Violation::SoilMoistureHigh.mask()
    );
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::SafetyCutoff { .. })),
        1
    );
}

#[test]
fn repeated_read_failures_invalidate_and_cut_off() {
    let (mut app, mut hw, mut sink) = pumping();
    hw.fail(board::TEMPERATURE_ADC);

    // The last good reading is kept until the failure limit.
    app.tick(&mut hw, &mut sink);
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.controller().is_on(&pump()), Some(true));

    app.tick(&mut hw, &mut sink);
    assert_eq!(app.controller().is_on(&pump()), Some(false));
    let r = app.registry().reading(board::TEMPERATURE_ID).unwrap();
    assert_eq!(r.quality, Quality::Stale);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::SafetyCutoff { reason, .. }
            if reason.sensor == board::TEMPERATURE_ID
                && reason.violation == Violation::InvalidReading
    )));

    // Reads recover: faults clear, but the pump waits for a new request.
    hw.heal(board::TEMPERATURE_ADC);
    sink.clear();
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.fault_flags(&pump()), 0);
    assert!(
        sink.events
            .iter()
            .any(|e| matches!(e, AppEvent::FaultsCleared { .. }))
    );
    assert_eq!(app.controller().is_on(&pump()), Some(false));
}

#[test]
fn failed_pump_write_keeps_state() {
    let (mut app, mut hw, mut sink) = running_idle();
    hw.fail_pin = Some(board::PUMP_GPIO);
    app.handle_command(AppCommand::RequestEngage(pump()), &mut hw, &mut sink)
        .unwrap();
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.controller().is_on(&pump()), Some(false));
    assert_eq!(app.intent(&pump()), Some(Intent::EngageRequested));
    assert!(sink.notifications.is_empty());
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn stop_switches_pump_off_immediately() {
    let (mut app, mut hw, mut sink) = pumping();
    app.handle_command(AppCommand::Stop(pump()), &mut hw, &mut sink)
        .unwrap();
    assert_eq!(hw.level(board::PUMP_GPIO), Some(PinState::Low));
    assert_eq!(app.intent(&pump()), Some(Intent::Standby));
    assert!(sink.events.contains(&AppEvent::DeviceStateChanged {
        device: pump(),
        on: false,
        cause: ChangeCause::Command,
    }));

    // Standby keeps it off on the next cycle.
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.controller().is_on(&pump()), Some(false));
}

#[test]
fn standby_drops_pending_request() {
    let (mut app, mut hw, mut sink) = running_idle();
    app.handle_command(AppCommand::RequestEngage(pump()), &mut hw, &mut sink)
        .unwrap();
    app.handle_command(AppCommand::Standby(pump()), &mut hw, &mut sink)
        .unwrap();
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.controller().is_on(&pump()), Some(false));
}

#[test]
fn toggle_refused_for_pump_allowed_for_socket() {
    let (mut app, mut hw, mut sink) = running_idle();
    assert_eq!(
        app.handle_command(AppCommand::Toggle(pump()), &mut hw, &mut sink),
        Err(Error::Actuator(ActuatorError::PolicyControlled))
    );
    app.handle_command(AppCommand::Toggle(socket()), &mut hw, &mut sink)
        .unwrap();
    assert_eq!(hw.level(board::SOCKET_GPIO), Some(PinState::High));
    assert!(sink.events.contains(&AppEvent::DeviceStateChanged {
        device: socket(),
        on: true,
        cause: ChangeCause::Command,
    }));
}

#[test]
fn engage_request_for_unmanaged_device_rejected() {
    let (mut app, mut hw, mut sink) = running_idle();
    assert_eq!(
        app.handle_command(AppCommand::RequestEngage(socket()), &mut hw, &mut sink),
        Err(Error::Actuator(ActuatorError::UnknownDevice))
    );
}

#[test]
fn invalid_config_update_rejected() {
    let (mut app, mut hw, mut sink) = running_idle();
    let bad = SystemConfig {
        poll_interval_ms: 10,
        ..SystemConfig::default()
    };
    assert!(matches!(
        app.handle_command(AppCommand::UpdateConfig(bad), &mut hw, &mut sink),
        Err(Error::Config(ConfigError::ValidationFailed(_)))
    ));
    assert!(!app.is_config_dirty());
    assert_eq!(app.config(), &SystemConfig::default());
    assert!(app.take_timing_change().is_none());
}

#[test]
fn timing_change_reported_once() {
    let (mut app, mut hw, mut sink) = running_idle();
    assert!(app.take_timing_change().is_none());

    let cfg = SystemConfig {
        poll_interval_ms: 2_000,
        button_debounce_ms: 80,
        ..SystemConfig::default()
    };
    app.handle_command(AppCommand::UpdateConfig(cfg), &mut hw, &mut sink)
        .unwrap();
    let applied = app.take_timing_change().unwrap();
    assert_eq!(applied.poll_interval_ms, 2_000);
    assert_eq!(applied.button_debounce_ms, 80);
    assert!(app.take_timing_change().is_none());
}

#[test]
fn threshold_only_update_keeps_timers() {
    let (mut app, mut hw, mut sink) = running_idle();
    let mut cfg = SystemConfig::default();
    cfg.thresholds.soil_moisture = KindLimits::new(-200.0, -100.0, 20.0, 30.0);
    app.handle_command(AppCommand::UpdateConfig(cfg), &mut hw, &mut sink)
        .unwrap();
    assert!(app.is_config_dirty());
    assert!(app.take_timing_change().is_none());
}

#[test]
fn tightened_threshold_applies_next_cycle() {
    let (mut app, mut hw, mut sink) = pumping();
    let mut cfg = SystemConfig::default();
    // Current soil reading (~33 %) is now above the safe maximum.
    cfg.thresholds.soil_moisture = KindLimits::new(-200.0, -100.0, 20.0, 30.0);
    app.handle_command(AppCommand::UpdateConfig(cfg), &mut hw, &mut sink)
        .unwrap();
    assert!(app.is_config_dirty());

    app.tick(&mut hw, &mut sink);
    assert_eq!(app.controller().is_on(&pump()), Some(false));
    assert_eq!(
        app.fault_flags(&pump()),
        Violation::SoilMoistureHigh.mask()
    );
}

#[test]
fn dirty_config_saved_once() {
    let (mut app, mut hw, mut sink) = running_idle();
    let store = MockConfigStore::default();
    assert!(!app.save_if_dirty(&store));

    let cfg = SystemConfig {
        samples_per_read: 8,
        ..SystemConfig::default()
    };
    app.handle_command(AppCommand::UpdateConfig(cfg.clone()), &mut hw, &mut sink)
        .unwrap();
    assert!(app.save_if_dirty(&store));
    assert_eq!(store.saved.borrow().as_ref(), Some(&cfg));
    assert!(!app.save_if_dirty(&store));
}

#[test]
fn failed_save_stays_dirty() {
    let (mut app, mut hw, mut sink) = running_idle();
    let store = MockConfigStore {
        fail_writes: true,
        ..MockConfigStore::default()
    };
    app.handle_command(
        AppCommand::UpdateConfig(SystemConfig::default()),
        &mut hw,
        &mut sink,
    )
    .unwrap();
    assert!(!app.save_if_dirty(&store));
    assert!(app.is_config_dirty());
}

// ── Local inputs ──────────────────────────────────────────────

#[test]
fn buttons_toggle_bound_devices() {
    let (mut app, mut hw, mut sink) = running_idle();

    app.handle_input(InputEvent::ButtonPressed { index: 0 }, &mut hw, &mut sink)
        .unwrap();
    assert_eq!(app.controller().is_on(&socket()), Some(true));

    // Power starts on; a press turns it off.
    app.handle_input(InputEvent::ButtonPressed { index: 1 }, &mut hw, &mut sink)
        .unwrap();
    assert_eq!(hw.level(board::POWER_GPIO), Some(PinState::Low));

    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::DeviceStateChanged {
                cause: ChangeCause::Button,
                ..
            }
        )),
        2
    );
    assert_eq!(
        app.handle_input(InputEvent::ButtonPressed { index: 7 }, &mut hw, &mut sink),
        Err(Error::Actuator(ActuatorError::UnknownDevice))
    );
}

#[test]
fn motion_drives_light() {
    let (mut app, mut hw, mut sink) = running_idle();

    assert_eq!(hw.pwm, board::LIGHT_GPIOS);
    app.handle_input(InputEvent::MotionStarted { index: 0 }, &mut hw, &mut sink)
        .unwrap();
    assert_eq!(light_duties(&hw), [Some(100); 3]);
    assert!(sink.events.contains(&AppEvent::MotionDetected {
        index: 0,
        active: true
    }));

    app.handle_input(InputEvent::MotionStopped { index: 0 }, &mut hw, &mut sink)
        .unwrap();
    assert_eq!(light_duties(&hw), [Some(0); 3]);
    assert_eq!(
        sink.count(|e| matches!(
            e,
            AppEvent::DeviceStateChanged {
                cause: ChangeCause::Motion,
                ..
            }
        )),
        2
    );
}

// ── Lights ────────────────────────────────────────────────────

#[test]
fn set_light_dims_and_colours() {
    let (mut app, mut hw, mut sink) = running_idle();
    let warm = LightLevel::new(50, 100, 60, 20).unwrap();
    app.handle_command(AppCommand::SetLight(light(), warm), &mut hw, &mut sink)
        .unwrap();
    assert_eq!(light_duties(&hw), [Some(50), Some(30), Some(10)]);
    assert!(sink.events.contains(&AppEvent::DeviceStateChanged {
        device: light(),
        on: true,
        cause: ChangeCause::Command,
    }));

    let t = app.build_telemetry();
    let l = t.devices.iter().find(|d| d.id == light()).unwrap();
    assert_eq!(l.light, Some(warm));

    // Motion switches off and back on with the same mix.
    app.handle_input(InputEvent::MotionStopped { index: 0 }, &mut hw, &mut sink)
        .unwrap();
    assert_eq!(light_duties(&hw), [Some(0); 3]);
    app.handle_input(InputEvent::MotionStarted { index: 0 }, &mut hw, &mut sink)
        .unwrap();
    assert_eq!(light_duties(&hw), [Some(50), Some(30), Some(10)]);
}

#[test]
fn all_zero_light_level_is_off() {
    let (mut app, mut hw, mut sink) = running_idle();
    app.handle_command(AppCommand::Toggle(light()), &mut hw, &mut sink)
        .unwrap();
    assert_eq!(app.controller().is_on(&light()), Some(true));

    let off = LightLevel::new(0, 0, 0, 0).unwrap();
    app.handle_command(AppCommand::SetLight(light(), off), &mut hw, &mut sink)
        .unwrap();
    assert_eq!(app.controller().is_on(&light()), Some(false));
    assert_eq!(light_duties(&hw), [Some(0); 3]);
}

#[test]
fn set_light_refused_for_socket() {
    let (mut app, mut hw, mut sink) = running_idle();
    assert_eq!(
        app.handle_command(
            AppCommand::SetLight(socket(), LightLevel::FULL),
            &mut hw,
            &mut sink
        ),
        Err(Error::Actuator(ActuatorError::NotDimmable))
    );
}

// ── Status LED ────────────────────────────────────────────────

#[test]
fn status_led_shows_standby_then_running() {
    let (mut app, mut hw, mut sink) = running_idle();
    assert_eq!(app.indicator(&pump()), Some(led_patterns::COLOUR_STANDBY));

    app.handle_command(AppCommand::RequestEngage(pump()), &mut hw, &mut sink)
        .unwrap();
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.indicator(&pump()), Some(led_patterns::COLOUR_RUNNING));
    assert_eq!(
        status_led(&hw),
        [Some(PinState::Low), Some(PinState::High), Some(PinState::Low)]
    );
}

#[test]
fn status_led_dark_before_start() {
    let mut app = AppService::new(SystemConfig::default(), &PLANT_WATERING).unwrap();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    app.tick(&mut hw, &mut sink);
    app.animate(&mut hw, 500);
    assert_eq!(app.indicator(&pump()), None);
    assert!(hw.writes.is_empty());
}

#[test]
fn soil_cutoff_blinks_red_and_blue() {
    let (mut app, mut hw, mut sink) = pumping();
    hw.set_raw(board::SOIL_MOISTURE_ADC, 1500);
    while app.controller().is_on(&pump()) == Some(true) {
        app.tick(&mut hw, &mut sink);
    }

    assert_eq!(app.indicator(&pump()), Some(led_patterns::MAGENTA));
    assert_eq!(
        status_led(&hw),
        [Some(PinState::High), Some(PinState::Low), Some(PinState::High)]
    );

    app.animate(&mut hw, BLINK_HALF_PERIOD_MS);
    assert_eq!(app.indicator(&pump()), Some(led_patterns::OFF));
    assert_eq!(status_led(&hw), [Some(PinState::Low); 3]);

    app.animate(&mut hw, BLINK_HALF_PERIOD_MS);
    assert_eq!(app.indicator(&pump()), Some(led_patterns::MAGENTA));
}

#[test]
fn low_water_blinks_red_until_refilled() {
    let (mut app, mut hw, mut sink) = running_idle();
    hw.set_raw(board::WATER_LEVEL_ADC, 0);
    let mut ticks = 0;
    while app.fault_flags(&pump()) & Violation::WaterLevelLow.mask() == 0 {
        app.tick(&mut hw, &mut sink);
        ticks += 1;
        assert!(ticks <= 10, "filter window should settle within 10 cycles");
    }
    assert_eq!(app.indicator(&pump()), Some(led_patterns::RED));

    hw.set_raw(board::WATER_LEVEL_ADC, 2000);
    while app.fault_flags(&pump()) != 0 {
        app.tick(&mut hw, &mut sink);
    }
    assert_eq!(app.indicator(&pump()), Some(led_patterns::COLOUR_STANDBY));
}

// ── Telemetry ─────────────────────────────────────────────────

#[test]
fn telemetry_reports_readings_and_devices() {
    let (mut app, _hw, mut sink) = pumping();
    let t = app.build_telemetry();
    assert_eq!(t.tick, app.tick_count());
    assert_eq!(t.sensors.len(), board::SENSORS.len());

    let soil = t
        .sensors
        .iter()
        .find(|s| s.id == board::SOIL_MOISTURE_ID)
        .unwrap();
    assert!(soil.value.is_some());
    assert_eq!(soil.calibration, CalibrationStatus::CurveFitting);

    let p = t.devices.iter().find(|d| d.id == pump()).unwrap();
    assert!(p.on);
    assert_eq!(p.intent, Some(Intent::AlreadyRunning));
    let s = t.devices.iter().find(|d| d.id == socket()).unwrap();
    assert_eq!(s.intent, None);

    app.report_telemetry(&mut sink);
    assert!(matches!(sink.events.last(), Some(AppEvent::Telemetry(_))));
}
