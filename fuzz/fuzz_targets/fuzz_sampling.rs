//! Fuzz target: discard multisampling and the moving-average filter.
//!
//! Outputs must stay within the range of their inputs for any sample
//! stream, including extreme i32 values.
//!
//! cargo fuzz run fuzz_sampling

#![no_main]

use cosmos::sensors::filter::{FILTER_WINDOW, MovingAverage};
use cosmos::sensors::sampler::discard_average;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let samples: Vec<i32> = data
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    match discard_average(&samples) {
        None => assert!(samples.is_empty()),
        Some(avg) => {
            let min = *samples.iter().min().unwrap();
            let max = *samples.iter().max().unwrap();
            assert!((min..=max).contains(&avg));
        }
    }

    let mut f = MovingAverage::<FILTER_WINDOW>::new();
    for (i, &s) in samples.iter().enumerate() {
        let out = f.update(s);
        let window = &samples[(i + 1).saturating_sub(FILTER_WINDOW)..=i];
        assert!(out >= *window.iter().min().unwrap());
        assert!(out <= *window.iter().max().unwrap());
    }
});
