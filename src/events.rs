//! Interrupt-driven event system.
//!
//! Events are produced by:
//! - GPIO ISRs (button presses, PIR motion edges)
//! - Timer callbacks (periodic poll tick, telemetry tick)
//!
//! Events are consumed by the main task, which handles them one at a time
//! in FIFO order.  Interrupt handlers never touch sensor or actuator state;
//! they only [`EventQueue::push`].
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GPIO ISR    │────▶│  Event Queue │────▶│  Main Task   │
//! │ Timer cb    │────▶│  (lock-free) │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Each slot stores one event packed into a `u32` next to a sequence
//! counter, so the ring is an array of atomics and needs no `unsafe`.

use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Maximum number of pending events.
/// Must be a power of 2: slot indices are masked, not divided.
pub const EVENT_QUEUE_CAP: usize = 32;

/// Typed events handed from interrupt context to the main task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Periodic poll timer fired.
    PollTick,
    /// Raw button edge on input `index` at `at_ms` (debounced in the task).
    Button { index: u8, at_ms: u16 },
    /// PIR sensor `index` changed level.
    Motion { index: u8, active: bool },
    /// Telemetry report timer fired.
    TelemetryTick,
}

// ── Wire packing ──────────────────────────────────────────────
//
//   bits 31..24  tag
//   bits 23..16  index
//   bits 15..0   payload (button timestamp low 16 bits, motion level)

const TAG_POLL: u32 = 1;
const TAG_BUTTON: u32 = 2;
const TAG_MOTION: u32 = 3;
const TAG_TELEMETRY: u32 = 4;

impl Event {
    /// Pack into a single word.  `0` is never produced.
    pub const fn encode(self) -> u32 {
        match self {
            Self::PollTick => TAG_POLL << 24,
            Self::Button { index, at_ms } => {
                (TAG_BUTTON << 24) | ((index as u32) << 16) | at_ms as u32
            }
            Self::Motion { index, active } => {
                (TAG_MOTION << 24) | ((index as u32) << 16) | active as u32
            }
            Self::TelemetryTick => TAG_TELEMETRY << 24,
        }
    }

    /// Unpack a word produced by [`encode`](Self::encode).
    pub const fn decode(raw: u32) -> Option<Self> {
        let index = ((raw >> 16) & 0xFF) as u8;
        let payload = (raw & 0xFFFF) as u16;
        match raw >> 24 {
            TAG_POLL if raw == TAG_POLL << 24 => Some(Self::PollTick),
            TAG_BUTTON => Some(Self::Button {
                index,
                at_ms: payload,
            }),
            TAG_MOTION if payload <= 1 => Some(Self::Motion {
                index,
                active: payload == 1,
            }),
            TAG_TELEMETRY if raw == TAG_TELEMETRY << 24 => Some(Self::TelemetryTick),
            _ => None,
        }
    }
}

// ── Lock-free bounded ring ────────────────────────────────────
//
// Several producers (GPIO ISRs, the esp_timer task) push concurrently,
// so a slot is claimed by CAS on `enqueue_pos` and published through its
// own sequence number.  A slot is free for position `p` when its sequence
// equals `p`, and holds an event for position `p` when it equals `p + 1`.

const INDEX_MASK: usize = EVENT_QUEUE_CAP - 1;

struct Slot {
    seq: AtomicUsize,
    word: AtomicU32,
}

impl Slot {
    const fn new(seq: usize) -> Self {
        Self {
            seq: AtomicUsize::new(seq),
            word: AtomicU32::new(0),
        }
    }
}

/// Multi-producer event ring.  Any number of ISRs and callbacks may push;
/// the main task pops.
pub struct EventQueue {
    enqueue_pos: AtomicUsize,
    dequeue_pos: AtomicUsize,
    slots: [Slot; EVENT_QUEUE_CAP],
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        let mut slots = [const { Slot::new(0) }; EVENT_QUEUE_CAP];
        let mut i = 0;
        while i < EVENT_QUEUE_CAP {
            slots[i] = Slot::new(i);
            i += 1;
        }
        Self {
            enqueue_pos: AtomicUsize::new(0),
            dequeue_pos: AtomicUsize::new(0),
            slots,
        }
    }

    /// Push an event into the queue.
    /// Safe to call from several ISRs at once (lock-free).
    /// Returns `false` if the queue is full (event dropped).
    pub fn push(&self, event: Event) -> bool {
        let mut pos = self.enqueue_pos.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[pos & INDEX_MASK];
            let seq = slot.seq.load(Ordering::Acquire);
            let lag = seq.wrapping_sub(pos) as isize;

            if lag == 0 {
                match self.enqueue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        slot.word.store(event.encode(), Ordering::Relaxed);
                        slot.seq.store(pos.wrapping_add(1), Ordering::Release);
                        return true;
                    }
                    Err(current) => pos = current,
                }
            } else if lag < 0 {
                return false; // Queue full: drop event.
            } else {
                // Another producer claimed this slot first.
                pos = self.enqueue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// Pop the next event from the queue.
    ///
    /// Returns `None` while the oldest claimed slot is still being written,
    /// even if later slots are ready; the next drain picks them up.
    pub fn pop(&self) -> Option<Event> {
        let mut pos = self.dequeue_pos.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[pos & INDEX_MASK];
            let seq = slot.seq.load(Ordering::Acquire);
            let lag = seq.wrapping_sub(pos.wrapping_add(1)) as isize;

            if lag == 0 {
                match self.dequeue_pos.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let raw = slot.word.load(Ordering::Relaxed);
                        slot.seq
                            .store(pos.wrapping_add(EVENT_QUEUE_CAP), Ordering::Release);
                        // Undecodable words are skipped rather than ending the drain.
                        if let Some(event) = Event::decode(raw) {
                            return Some(event);
                        }
                        pos = self.dequeue_pos.load(Ordering::Relaxed);
                    }
                    Err(current) => pos = current,
                }
            } else if lag < 0 {
                return None;
            } else {
                pos = self.dequeue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// Drain all pending events into a callback, in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(Event)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of claimed slots not yet popped.  Exact when no push is in
    /// flight.
    pub fn len(&self) -> usize {
        let head = self.enqueue_pos.load(Ordering::Acquire);
        let tail = self.dequeue_pos.load(Ordering::Acquire);
        head.wrapping_sub(tail).min(EVENT_QUEUE_CAP)
    }
}

/// The firmware-wide queue shared by ISR handlers, timer callbacks and
/// the main task.
pub static EVENTS: EventQueue = EventQueue::new();

/// Push onto [`EVENTS`].  ISR-safe.
pub fn push_event(event: Event) -> bool {
    EVENTS.push(event)
}

/// Drain [`EVENTS`] into `handler`.
pub fn drain_events(handler: impl FnMut(Event)) {
    EVENTS.drain(handler);
}
