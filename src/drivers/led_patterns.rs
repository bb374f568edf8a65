//! Status LED patterns for policy-controlled devices.
//!
//! Each pump carries a three-colour status LED (separate red, green and
//! blue GPIOs, no dimming).  The main loop calls
//! [`AppService::animate`](crate::app::service::AppService::animate) every
//! iteration; the engine here turns the latest policy outcome into the
//! colour to show right now.
//!
//! ## Priority (highest first)
//!
//! 1. **Alert**: the colour of the tripped reading, blinking 1 s on / 1 s off.
//! 2. **Status**: solid green while running, solid blue in standby.
//!
//! | Trip                | Colour         |
//! |---------------------|----------------|
//! | Water level low     | red            |
//! | Soil moisture high  | red + blue     |
//! | Over temperature    | red + green    |
//! | Invalid reading     | all three      |
//! | Air pollution, flow | red            |

use embedded_hal::digital::PinState;

use crate::app::ports::GpioPort;
use crate::error::{ActuatorError, InitError, Violation};

/// Colour as (R, G, B) channel on/off.
pub type Rgb = (bool, bool, bool);

/// Blink half-period: on for this long, then off for this long.
pub const BLINK_HALF_PERIOD_MS: u32 = 1_000;

/// Pattern identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternId {
    Solid,
    Blink,
    Off,
}

/// A pattern request with colour and type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternRequest {
    pub colour: Rgb,
    pub pattern: PatternId,
}

/// LED pattern engine.  Stack-allocated, no heap.
#[derive(Debug, Clone, Default)]
pub struct LedPatternEngine {
    phase_ms: u32,
    active: Option<PatternRequest>,
    status_request: Option<PatternRequest>,
    alert_request: Option<PatternRequest>,
}

impl LedPatternEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device-status pattern (lowest priority).
    pub fn set_status_pattern(&mut self, colour: Rgb, pattern: PatternId) {
        self.status_request = Some(PatternRequest { colour, pattern });
    }

    /// Blink the colour of `trip`, or clear the alert with `None`.
    pub fn set_alert(&mut self, trip: Option<Violation>) {
        self.alert_request = trip.map(|v| PatternRequest {
            colour: alert_colour(v),
            pattern: PatternId::Blink,
        });
    }

    /// Advance the pattern phase and return the colour to show now.
    /// A change of pattern restarts it from its "on" phase.
    pub fn tick(&mut self, delta_ms: u32) -> Rgb {
        self.phase_ms = self.phase_ms.wrapping_add(delta_ms);

        let selected = self.alert_request.or(self.status_request);
        if selected != self.active {
            self.phase_ms = 0;
        }
        self.active = selected;

        match &self.active {
            Some(req) => self.generate(req.colour, req.pattern),
            None => OFF,
        }
    }

    fn generate(&self, colour: Rgb, pattern: PatternId) -> Rgb {
        match pattern {
            PatternId::Solid => colour,
            PatternId::Off => OFF,
            PatternId::Blink => {
                let on = self.phase_ms % (2 * BLINK_HALF_PERIOD_MS) < BLINK_HALF_PERIOD_MS;
                if on { colour } else { OFF }
            }
        }
    }
}

pub const fn alert_colour(violation: Violation) -> Rgb {
    match violation {
        Violation::WaterLevelLow | Violation::AirPollutionHigh | Violation::FlowLow => RED,
        Violation::SoilMoistureHigh => MAGENTA,
        Violation::OverTemperature => YELLOW,
        Violation::InvalidReading => WHITE,
    }
}

// ── Colours ───────────────────────────────────────────────────

pub const OFF: Rgb = (false, false, false);
pub const RED: Rgb = (true, false, false);
pub const GREEN: Rgb = (false, true, false);
pub const BLUE: Rgb = (false, false, true);
pub const MAGENTA: Rgb = (true, false, true);
pub const YELLOW: Rgb = (true, true, false);
pub const WHITE: Rgb = (true, true, true);

pub const COLOUR_RUNNING: Rgb = GREEN;
pub const COLOUR_STANDBY: Rgb = BLUE;

/// Three digital outputs showing an [`Rgb`].  Pins are only written when
/// the colour changes.
#[derive(Debug, Clone)]
pub struct StatusLed {
    pins: [i32; 3],
    ready: bool,
    shown: Option<Rgb>,
}

impl StatusLed {
    pub const fn new(pins: [i32; 3]) -> Self {
        Self {
            pins,
            ready: false,
            shown: None,
        }
    }

    pub fn pins(&self) -> [i32; 3] {
        self.pins
    }

    /// Configure the outputs and switch them off.
    pub fn begin(&mut self, gpio: &mut impl GpioPort) -> Result<(), InitError> {
        for pin in self.pins {
            gpio.configure_output(pin)?;
        }
        self.ready = true;
        self.show(gpio, OFF)
            .map_err(|_| InitError::GpioConfigFailed(-1))
    }

    /// Show `colour`.  A no-op before [`begin`](Self::begin) or when the
    /// colour is already showing.
    pub fn show(&mut self, gpio: &mut impl GpioPort, colour: Rgb) -> Result<(), ActuatorError> {
        if !self.ready || self.shown == Some(colour) {
            return Ok(());
        }
        let (r, g, b) = colour;
        for (pin, on) in self.pins.into_iter().zip([r, g, b]) {
            gpio.set_output(pin, PinState::from(on))?;
        }
        self.shown = Some(colour);
        Ok(())
    }

    pub fn shown(&self) -> Option<Rgb> {
        self.shown
    }
}
