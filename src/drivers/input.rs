//! Local input conditioning: button debounce and PIR edge tracking.
//!
//! ## Hardware
//!
//! Buttons are active-low momentary switches with pull-ups.  The GPIO
//! fires on the falling edge and the ISR pushes [`Event::Button`] with a
//! 16-bit millisecond timestamp.  Contact bounce produces a burst of
//! edges; [`ButtonDebouncer`] keeps the first and drops the rest until
//! the debounce window has passed.
//!
//! PIR modules drive a clean push-pull level, but the ISR can still
//! report the same level twice (edge lost while the queue was full).
//! [`MotionTracker`] only forwards real changes.
//!
//! Both run in task context while draining the event queue.

use crate::app::commands::InputEvent;
use crate::app::service::MAX_INPUTS;
use crate::events::Event;

/// Per-button debounce using wrapping 16-bit timestamps.
#[derive(Debug, Clone)]
pub struct ButtonDebouncer {
    debounce_ms: u16,
    last_accepted: [Option<u16>; MAX_INPUTS],
}

impl ButtonDebouncer {
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms: debounce_ms.min(u32::from(u16::MAX / 2)) as u16,
            last_accepted: [None; MAX_INPUTS],
        }
    }

    /// Apply a new window.  Presses already accepted keep their timestamps.
    pub fn set_debounce_ms(&mut self, debounce_ms: u32) {
        self.debounce_ms = debounce_ms.min(u32::from(u16::MAX / 2)) as u16;
    }

    /// `true` if an edge at `at_ms` on `index` counts as a press.
    pub fn accept(&mut self, index: u8, at_ms: u16) -> bool {
        let Some(last) = self.last_accepted.get_mut(usize::from(index)) else {
            return false;
        };
        if let Some(prev) = *last {
            if at_ms.wrapping_sub(prev) < self.debounce_ms {
                return false;
            }
        }
        *last = Some(at_ms);
        true
    }
}

/// Last reported level per PIR input.
#[derive(Debug, Clone, Default)]
pub struct MotionTracker {
    active: [bool; MAX_INPUTS],
}

impl MotionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate a level report into a start/stop event, if it changed.
    pub fn update(&mut self, index: u8, active: bool) -> Option<InputEvent> {
        let slot = self.active.get_mut(usize::from(index))?;
        if *slot == active {
            return None;
        }
        *slot = active;
        Some(if active {
            InputEvent::MotionStarted { index }
        } else {
            InputEvent::MotionStopped { index }
        })
    }

    pub fn is_active(&self, index: u8) -> bool {
        self.active.get(usize::from(index)).copied().unwrap_or(false)
    }
}

/// Both conditioners together, fed straight from the event queue.
#[derive(Debug, Clone)]
pub struct InputConditioner {
    pub buttons: ButtonDebouncer,
    pub motion: MotionTracker,
}

impl InputConditioner {
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            buttons: ButtonDebouncer::new(debounce_ms),
            motion: MotionTracker::new(),
        }
    }

    /// `None` for timer events and for filtered edges.
    pub fn condition(&mut self, event: Event) -> Option<InputEvent> {
        match event {
            Event::Button { index, at_ms } => self
                .buttons
                .accept(index, at_ms)
                .then_some(InputEvent::ButtonPressed { index }),
            Event::Motion { index, active } => self.motion.update(index, active),
            Event::PollTick | Event::TelemetryTick => None,
        }
    }
}
