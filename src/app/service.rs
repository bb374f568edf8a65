//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the sensor registry, the threshold policy engine,
//! the actuator controller and the per-device engagement intents.  All
//! I/O flows through port traits injected at call sites, making the
//! entire service testable with mock adapters.
//!
//! ```text
//!      AdcPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//! CalibrationPort ▶│          AppService           │
//!     GpioPort ◀── │ Registry · Policy · Actuators │ ──▶ NotificationSink
//!                  └──────────────────────────────┘
//! ```
//!
//! One [`tick`](AppService::tick) is one poll cycle: every sensor is
//! sampled first, then every policy decision is taken against that
//! finished snapshot.  [`animate`](AppService::animate) runs far more
//! often and only advances the status LED patterns.

use log::{error, info, warn};

use crate::board::{BoardLayout, IndicatorBinding, InputBinding};
use crate::config::SystemConfig;
use crate::control::actuator::{ActuatorController, DeviceId};
use crate::drivers::led_patterns::{
    COLOUR_RUNNING, COLOUR_STANDBY, LedPatternEngine, PatternId, Rgb, StatusLed,
};
use crate::control::policy::{Decision, Intent, MAX_PROFILES, ThresholdPolicyEngine};
use crate::error::{ActuatorError, Error, InitError};
use crate::sensors::SensorRegistry;

use super::commands::{AppCommand, InputEvent};
use super::events::{AppEvent, ChangeCause, DeviceTelemetry, SensorTelemetry, TelemetryData};
use super::ports::{AdcPort, CalibrationPort, ConfigPort, EventSink, GpioPort, NotificationSink};

/// Local inputs per kind.
pub const MAX_INPUTS: usize = 4;

/// Engagement bookkeeping for one policy-controlled device.
#[derive(Debug, Clone)]
struct PolicyControl {
    device: DeviceId,
    intent: Intent,
    /// Fault mask from the last evaluation.
    faults: u8,
    indicator: Option<Indicator>,
}

#[derive(Debug, Clone)]
struct Indicator {
    led: StatusLed,
    patterns: LedPatternEngine,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    config: SystemConfig,
    registry: SensorRegistry,
    policy: ThresholdPolicyEngine,
    controller: ActuatorController,
    controls: heapless::Vec<PolicyControl, MAX_PROFILES>,
    buttons: heapless::Vec<DeviceId, MAX_INPUTS>,
    motion: heapless::Vec<DeviceId, MAX_INPUTS>,
    tick_count: u64,
    config_dirty: bool,
    /// A config update changed a timer period or the debounce window.
    timing_changed: bool,
}

impl AppService {
    /// Construct the service from configuration and a board layout.
    ///
    /// Resolves every cross-reference in the layout but does **not** touch
    /// hardware: call [`start`](Self::start) next.
    pub fn new(config: SystemConfig, layout: &BoardLayout) -> Result<Self, InitError> {
        let registry = SensorRegistry::new(layout.sensors, &config)?;
        let controller = ActuatorController::new(layout.devices)?;
        let policy =
            ThresholdPolicyEngine::new(layout.profiles, layout.sensors, &config.thresholds)?;

        let mut controls = heapless::Vec::new();
        for profile in policy.profiles() {
            if controller.device(&profile.device).is_none() {
                return Err(InitError::UnknownReference);
            }
            controls
                .push(PolicyControl {
                    device: profile.device.clone(),
                    intent: Intent::Standby,
                    faults: 0,
                    indicator: None,
                })
                .map_err(|_| InitError::CapacityExceeded)?;
        }
        attach_indicators(layout.indicators, &mut controls)?;

        let buttons = resolve_inputs(layout.buttons, &controller)?;
        let motion = resolve_inputs(layout.motion, &controller)?;

        Ok(Self {
            config,
            registry,
            policy,
            controller,
            controls,
            buttons,
            motion,
            tick_count: 0,
            config_dirty: false,
            timing_changed: false,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring up the ADC channels, output pins and status LEDs.
    ///
    /// Sensors and actuators start independently: a failure in one is
    /// reported but leaves the other running.  A status LED that fails to
    /// start stays dark.
    pub fn start(
        &mut self,
        hw: &mut (impl AdcPort + GpioPort),
        sink: &mut impl EventSink,
    ) -> Result<(), InitError> {
        let sensors = self.registry.begin(hw);
        if let Err(e) = sensors {
            error!("sensor registry not started: {e}");
        }
        let devices = self.controller.begin(hw);
        if let Err(e) = devices {
            error!("actuator controller not started: {e}");
        }
        for control in &mut self.controls {
            if let Some(indicator) = &mut control.indicator {
                if let Err(e) = indicator.led.begin(hw) {
                    error!("{}: status LED not started: {e}", control.device);
                }
            }
        }

        let count = |ok: bool, n: usize| if ok { n as u8 } else { 0 };
        sink.emit(&AppEvent::Started {
            sensors: count(self.registry.is_ready(), self.registry.len()),
            devices: count(self.controller.is_ready(), self.controller.devices().len()),
        });
        info!("AppService started");
        sensors.and(devices)
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one poll cycle: sample → evaluate → apply.
    ///
    /// The `hw` parameter satisfies **all** hardware ports: this avoids a
    /// double mutable borrow while keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        hw: &mut (impl AdcPort + CalibrationPort + GpioPort),
        sink: &mut (impl EventSink + NotificationSink),
    ) {
        self.tick_count += 1;

        // 1. Sample every sensor.  If the registry never started, every
        //    reading stays NaN and step 2 cuts everything off.
        match self.registry.poll_all(hw) {
            Ok(report) => {
                for &(sensor, status) in &report.calibrations {
                    sink.emit(&AppEvent::CalibrationResolved { sensor, status });
                }
            }
            Err(e) => warn!("poll skipped: {e}"),
        }

        // 2. Evaluate and apply against the finished snapshot.
        for control in &mut self.controls {
            let eval = self
                .policy
                .evaluate(&control.device, control.intent, &self.registry);

            if eval.faults != control.faults {
                match eval.reason {
                    Some(reason) => {
                        error!(
                            "SAFETY CUTOFF: {} by {} ({}), faults=0b{:08b}",
                            control.device, reason.sensor, reason.violation, eval.faults
                        );
                        sink.emit(&AppEvent::SafetyCutoff {
                            device: control.device.clone(),
                            reason,
                            faults: eval.faults,
                        });
                    }
                    None => {
                        info!("{}: all faults cleared", control.device);
                        sink.emit(&AppEvent::FaultsCleared {
                            device: control.device.clone(),
                        });
                    }
                }
                control.faults = eval.faults;
            }

            match self
                .controller
                .apply(&control.device, eval.decision, hw, &mut *sink)
            {
                Ok(flipped) => {
                    if flipped {
                        sink.emit(&AppEvent::DeviceStateChanged {
                            device: control.device.clone(),
                            on: eval.decision == Decision::Engage,
                            cause: ChangeCause::Policy,
                        });
                    }
                    match eval.decision {
                        Decision::Engage => control.intent = Intent::AlreadyRunning,
                        Decision::Disengage => control.intent = Intent::Standby,
                        Decision::Hold => {}
                    }
                }
                Err(e) => warn!("{}: {:?} not applied: {}", control.device, eval.decision, e),
            }

            if let Some(indicator) = &mut control.indicator {
                let status = if self.controller.is_on(&control.device) == Some(true) {
                    COLOUR_RUNNING
                } else {
                    COLOUR_STANDBY
                };
                indicator.patterns.set_status_pattern(status, PatternId::Solid);
                indicator.patterns.set_alert(eval.reason.map(|t| t.violation));
            }
        }

        // 3. Show the new state right away.
        self.animate(hw, 0);
    }

    /// Advance every status LED by `delta_ms` and write what changed.
    /// Call from the main loop between poll cycles so alerts blink.
    pub fn animate(&mut self, gpio: &mut impl GpioPort, delta_ms: u32) {
        for control in &mut self.controls {
            if let Some(indicator) = &mut control.indicator {
                let colour = indicator.patterns.tick(delta_ms);
                if let Err(e) = indicator.led.show(gpio, colour) {
                    warn!("{}: status LED write failed: {}", control.device, e);
                }
            }
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        hw: &mut impl GpioPort,
        sink: &mut (impl EventSink + NotificationSink),
    ) -> Result<(), Error> {
        match cmd {
            AppCommand::RequestEngage(device) => {
                let running = self.controller.is_on(&device) == Some(true);
                let control = self.control_mut(&device)?;
                control.intent = if running {
                    Intent::AlreadyRunning
                } else {
                    Intent::EngageRequested
                };
                info!("{}: engage requested", device);
            }
            AppCommand::Standby(device) => {
                self.control_mut(&device)?.intent = Intent::Standby;
                info!("{}: standby", device);
            }
            AppCommand::Stop(device) => {
                if let Ok(control) = self.control_mut(&device) {
                    control.intent = Intent::Standby;
                }
                self.switch(&device, false, ChangeCause::Command, hw, sink)?;
            }
            AppCommand::Toggle(device) => {
                let on = self.controller.toggle(&device, hw, &mut *sink)?;
                sink.emit(&AppEvent::DeviceStateChanged {
                    device,
                    on,
                    cause: ChangeCause::Command,
                });
            }
            AppCommand::SetLight(device, level) => {
                if self.controller.set_light(&device, level, hw, &mut *sink)? {
                    sink.emit(&AppEvent::DeviceStateChanged {
                        device,
                        on: !level.is_off(),
                        cause: ChangeCause::Command,
                    });
                }
            }
            AppCommand::UpdateConfig(new_config) => {
                new_config.validate()?;
                if new_config.poll_interval_ms != self.config.poll_interval_ms
                    || new_config.button_debounce_ms != self.config.button_debounce_ms
                    || new_config.telemetry_interval_secs != self.config.telemetry_interval_secs
                {
                    self.timing_changed = true;
                }
                self.registry.apply_config(&new_config);
                self.policy.apply_limits(&new_config.thresholds);
                self.config = new_config;
                self.config_dirty = true;
                info!("Configuration updated at runtime");
            }
        }
        Ok(())
    }

    /// Process a debounced local input.
    pub fn handle_input(
        &mut self,
        input: InputEvent,
        hw: &mut impl GpioPort,
        sink: &mut (impl EventSink + NotificationSink),
    ) -> Result<(), Error> {
        match input {
            InputEvent::ButtonPressed { index } => {
                let device = lookup(&self.buttons, index)?;
                let on = self.controller.toggle(&device, hw, &mut *sink)?;
                sink.emit(&AppEvent::DeviceStateChanged {
                    device,
                    on,
                    cause: ChangeCause::Button,
                });
            }
            InputEvent::MotionStarted { index } | InputEvent::MotionStopped { index } => {
                let active = matches!(input, InputEvent::MotionStarted { .. });
                sink.emit(&AppEvent::MotionDetected { index, active });
                let device = lookup(&self.motion, index)?;
                self.switch(&device, active, ChangeCause::Motion, hw, sink)?;
            }
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot of every reading and device.
    pub fn build_telemetry(&self) -> TelemetryData {
        let mut sensors = heapless::Vec::new();
        for s in self.registry.iter() {
            let r = s.reading();
            // Same capacity as the registry.
            let _ = sensors.push(SensorTelemetry {
                id: s.id(),
                kind: s.kind(),
                value: r.is_valid().then_some(r.value),
                millivolts: r.millivolts,
                quality: r.quality,
                calibration: s.calibration(),
            });
        }

        let mut devices = heapless::Vec::new();
        for d in self.controller.devices() {
            let control = self.controls.iter().find(|c| &c.device == d.id());
            let _ = devices.push(DeviceTelemetry {
                id: d.id().clone(),
                kind: d.kind(),
                on: d.is_on(),
                intent: control.map(|c| c.intent),
                faults: control.map_or(0, |c| c.faults),
                light: d.light_level(),
            });
        }

        TelemetryData {
            tick: self.tick_count,
            sensors,
            devices,
        }
    }

    /// Emit a [`AppEvent::Telemetry`] snapshot.
    pub fn report_telemetry(&self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Telemetry(self.build_telemetry()));
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    pub fn controller(&self) -> &ActuatorController {
        &self.controller
    }

    pub fn policy(&self) -> &ThresholdPolicyEngine {
        &self.policy
    }

    /// Current intent of a policy-controlled device.
    pub fn intent(&self, device: &DeviceId) -> Option<Intent> {
        self.controls
            .iter()
            .find(|c| &c.device == device)
            .map(|c| c.intent)
    }

    /// Fault mask from the device's last evaluation (0 = no faults).
    pub fn fault_flags(&self, device: &DeviceId) -> u8 {
        self.controls
            .iter()
            .find(|c| &c.device == device)
            .map_or(0, |c| c.faults)
    }

    /// Total poll cycles executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// The config, once, after an update changed a timer period or the
    /// debounce window.  The caller re-arms timers, debouncer and watchdog.
    pub fn take_timing_change(&mut self) -> Option<&SystemConfig> {
        if !self.timing_changed {
            return None;
        }
        self.timing_changed = false;
        Some(&self.config)
    }

    /// Colour currently shown on `device`'s status LED.
    pub fn indicator(&self, device: &DeviceId) -> Option<Rgb> {
        self.controls
            .iter()
            .find(|c| &c.device == device)
            .and_then(|c| c.indicator.as_ref())
            .and_then(|i| i.led.shown())
    }

    // ── Config persistence ────────────────────────────────────

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }

    /// Persist the config if it changed.  Returns `true` if it was saved.
    pub fn save_if_dirty(&mut self, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("Config saved to NVS");
                true
            }
            Err(e) => {
                warn!("Config save failed: {}", e);
                false
            }
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn control_mut(&mut self, device: &DeviceId) -> Result<&mut PolicyControl, ActuatorError> {
        self.controls
            .iter_mut()
            .find(|c| &c.device == device)
            .ok_or(ActuatorError::UnknownDevice)
    }

    fn switch(
        &mut self,
        device: &DeviceId,
        on: bool,
        cause: ChangeCause,
        hw: &mut impl GpioPort,
        sink: &mut (impl EventSink + NotificationSink),
    ) -> Result<(), ActuatorError> {
        if self.controller.set(device, on, hw, &mut *sink)? {
            sink.emit(&AppEvent::DeviceStateChanged {
                device: device.clone(),
                on,
                cause,
            });
        }
        Ok(())
    }
}

fn resolve_inputs(
    bindings: &[InputBinding],
    controller: &ActuatorController,
) -> Result<heapless::Vec<DeviceId, MAX_INPUTS>, InitError> {
    let mut out = heapless::Vec::new();
    for b in bindings {
        let id = DeviceId::new(b.device).ok_or(InitError::UnknownReference)?;
        if controller.device(&id).is_none() {
            return Err(InitError::UnknownReference);
        }
        out.push(id).map_err(|_| InitError::CapacityExceeded)?;
    }
    Ok(out)
}

fn attach_indicators(
    bindings: &[IndicatorBinding],
    controls: &mut [PolicyControl],
) -> Result<(), InitError> {
    for binding in bindings {
        let control = controls
            .iter_mut()
            .find(|c| c.device.as_str() == binding.device)
            .ok_or(InitError::UnknownReference)?;
        if control.indicator.is_some() {
            return Err(InitError::DuplicateId);
        }
        control.indicator = Some(Indicator {
            led: StatusLed::new(binding.pins),
            patterns: LedPatternEngine::new(),
        });
    }
    Ok(())
}

fn lookup(table: &[DeviceId], index: u8) -> Result<DeviceId, ActuatorError> {
    table
        .get(usize::from(index))
        .cloned()
        .ok_or(ActuatorError::UnknownDevice)
}
