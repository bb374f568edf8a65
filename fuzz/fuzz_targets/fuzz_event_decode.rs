//! Fuzz target: ISR event packing and the event queue.
//!
//! Every decodable word must re-encode to itself, and a queue fed an
//! arbitrary mix of pushes and pops must never hand back more than it
//! accepted or reorder it.
//!
//! cargo fuzz run fuzz_event_decode

#![no_main]

use cosmos::events::{Event, EventQueue};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let q = EventQueue::new();
    let mut pending = std::collections::VecDeque::new();

    for chunk in data.chunks_exact(4) {
        let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        match Event::decode(raw) {
            Some(event) => {
                assert_eq!(event.encode(), raw, "non-canonical word decoded");
                if q.push(event) {
                    pending.push_back(event);
                }
            }
            // Undecodable words drive the consumer side.
            None => assert_eq!(q.pop(), pending.pop_front()),
        }
        assert_eq!(q.len(), pending.len());
    }

    q.drain(|e| assert_eq!(Some(e), pending.pop_front()));
    assert!(pending.is_empty());
});
