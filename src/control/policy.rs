//! Threshold policy engine.
//!
//! Decides, per actuator, whether to engage, disengage or hold, from the
//! latest sensor readings and the requested engagement intent.
//!
//! ## Decision rules
//!
//! 1. Any bound reading that is NaN, missing, or on the unsafe side of its
//!    safe bound → **Disengage**, whatever the intent.
//! 2. Else, every reading inside its nominal band and intent
//!    `EngageRequested` → **Engage**.
//! 3. Else → **Hold**.
//!
//! Bindings are checked in kind priority (water level, soil moisture,
//! temperature, air pollution, flow).  The first trip becomes the reported
//! reason; every trip is accumulated into the fault bitmask.
//!
//! Evaluation is pure: it reads a snapshot and returns a value.

use log::debug;
use serde::Serialize;

use crate::config::{KindLimits, ThresholdConfig};
use crate::control::actuator::DeviceId;
use crate::error::{InitError, Violation};
use crate::sensors::{SensorId, SensorKind, SensorRegistry, SensorSpec};

/// Bindings per profile.
pub const MAX_BINDINGS: usize = 5;
/// Policy-controlled devices.
pub const MAX_PROFILES: usize = 4;

/// Which side of the safe range is dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// `reading <= safe_min` trips.
    Low,
    /// `reading >= safe_max` trips.
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    EngageRequested,
    AlreadyRunning,
    Standby,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Engage,
    Disengage,
    Hold,
}

/// One tripped binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trip {
    pub sensor: SensorId,
    pub violation: Violation,
    /// The offending value (NaN for invalid or missing readings).
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub decision: Decision,
    /// First trip in priority order.
    pub reason: Option<Trip>,
    /// `Violation` bitmask of every trip.
    pub faults: u8,
}

impl Evaluation {
    const HOLD: Self = Self {
        decision: Decision::Hold,
        reason: None,
        faults: 0,
    };
}

/// Anything that can answer "what is sensor X reading right now".
pub trait ReadingSource {
    /// `None` if the sensor does not exist.
    fn value(&self, sensor: SensorId) -> Option<f32>;
}

impl ReadingSource for SensorRegistry {
    fn value(&self, sensor: SensorId) -> Option<f32> {
        self.reading(sensor).map(|r| r.value)
    }
}

impl ReadingSource for [(SensorId, f32)] {
    fn value(&self, sensor: SensorId) -> Option<f32> {
        self.iter().find(|(id, _)| *id == sensor).map(|(_, v)| *v)
    }
}

/// A sensor watched by a profile, with the limits for its kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdBinding {
    pub sensor: SensorId,
    pub kind: SensorKind,
    pub limits: KindLimits,
}

impl ThresholdBinding {
    /// `Some(violation)` if `value` must force a cutoff.
    pub fn check(&self, value: Option<f32>) -> Option<Violation> {
        let Some(v) = value.filter(|v| !v.is_nan()) else {
            return Some(Violation::InvalidReading);
        };
        let unsafe_side = match self.kind.guard() {
            Guard::Low => v <= self.limits.safe_min,
            Guard::High => v >= self.limits.safe_max,
        };
        unsafe_side.then(|| self.kind.violation())
    }
}

/// Engagement policy for one actuator.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdProfile {
    pub device: DeviceId,
    pub bindings: heapless::Vec<ThresholdBinding, MAX_BINDINGS>,
}

impl ThresholdProfile {
    /// Apply the rules to one snapshot.
    pub fn evaluate(&self, intent: Intent, readings: &(impl ReadingSource + ?Sized)) -> Evaluation {
        let mut reason = None;
        let mut faults = 0u8;
        let mut all_nominal = true;

        for kind in SensorKind::PRIORITY {
            for binding in self.bindings.iter().filter(|b| b.kind == kind) {
                let value = readings.value(binding.sensor);
                match binding.check(value) {
                    Some(violation) => {
                        faults |= violation.mask();
                        if reason.is_none() {
                            reason = Some(Trip {
                                sensor: binding.sensor,
                                violation,
                                value: value.unwrap_or(f32::NAN),
                            });
                        } else {
                            debug!("{}: also tripped {} ({})", self.device, binding.sensor, violation);
                        }
                    }
                    None => {
                        if !value.is_some_and(|v| binding.limits.is_nominal(v)) {
                            all_nominal = false;
                        }
                    }
                }
            }
        }

        let decision = if faults != 0 {
            Decision::Disengage
        } else if all_nominal && intent == Intent::EngageRequested {
            Decision::Engage
        } else {
            Decision::Hold
        };

        Evaluation {
            decision,
            reason,
            faults,
        }
    }

    /// Refresh every binding's limits from `thresholds`.
    pub fn apply_limits(&mut self, thresholds: &ThresholdConfig) {
        for binding in &mut self.bindings {
            binding.limits = thresholds.for_kind(binding.kind);
        }
    }
}

/// Static description of a profile (board table entry).
#[derive(Debug, Clone, Copy)]
pub struct ProfileSpec {
    pub device: &'static str,
    pub sensors: &'static [SensorId],
}

/// Holds every profile; evaluation is delegated to [`ThresholdProfile`].
#[derive(Debug, Default)]
pub struct ThresholdPolicyEngine {
    profiles: heapless::Vec<ThresholdProfile, MAX_PROFILES>,
}

impl ThresholdPolicyEngine {
    /// Resolve profile specs against the sensor table.
    pub fn new(
        specs: &[ProfileSpec],
        sensors: &[SensorSpec],
        thresholds: &ThresholdConfig,
    ) -> Result<Self, InitError> {
        let mut profiles = heapless::Vec::new();
        for (i, spec) in specs.iter().enumerate() {
            if specs[..i].iter().any(|p| p.device == spec.device) {
                return Err(InitError::DuplicateId);
            }
            // A profile with no readings would engage unconditionally.
            if spec.sensors.is_empty() {
                return Err(InitError::EmptyTable);
            }
            let mut bindings = heapless::Vec::new();
            for &sensor_id in spec.sensors {
                let sensor = sensors
                    .iter()
                    .find(|s| s.id == sensor_id)
                    .ok_or(InitError::UnknownReference)?;
                bindings
                    .push(ThresholdBinding {
                        sensor: sensor.id,
                        kind: sensor.kind,
                        limits: thresholds.for_kind(sensor.kind),
                    })
                    .map_err(|_| InitError::CapacityExceeded)?;
            }
            let device = DeviceId::new(spec.device).ok_or(InitError::CapacityExceeded)?;
            profiles
                .push(ThresholdProfile { device, bindings })
                .map_err(|_| InitError::CapacityExceeded)?;
        }
        Ok(Self { profiles })
    }

    /// Decide for `device`.  Devices without a profile always hold.
    pub fn evaluate(
        &self,
        device: &DeviceId,
        intent: Intent,
        readings: &(impl ReadingSource + ?Sized),
    ) -> Evaluation {
        self.profile(device)
            .map_or(Evaluation::HOLD, |p| p.evaluate(intent, readings))
    }

    pub fn profile(&self, device: &DeviceId) -> Option<&ThresholdProfile> {
        self.profiles.iter().find(|p| &p.device == device)
    }

    pub fn profiles(&self) -> &[ThresholdProfile] {
        &self.profiles
    }

    pub fn apply_limits(&mut self, thresholds: &ThresholdConfig) {
        for profile in &mut self.profiles {
            profile.apply_limits(thresholds);
        }
    }
}
