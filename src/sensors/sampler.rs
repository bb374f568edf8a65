//! Raw sampling and discard (outlier-rejecting) multisampling.
//!
//! A batch of `N` back-to-back reads is reduced to one value: the single
//! minimum and maximum are dropped and the rest averaged.  With `N <= 2`
//! nothing can be discarded and the plain mean is returned.

use crate::app::ports::AdcPort;
use crate::error::SensorError;
use crate::sensors::AdcChannel;

/// Running min / max / sum over one batch.  No sample storage.
#[derive(Debug, Clone, Copy)]
pub struct DiscardAccumulator {
    sum: i64,
    min: i32,
    max: i32,
    count: u32,
}

impl Default for DiscardAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscardAccumulator {
    pub const fn new() -> Self {
        Self {
            sum: 0,
            min: i32::MAX,
            max: i32::MIN,
            count: 0,
        }
    }

    pub fn push(&mut self, sample: i32) {
        self.sum += i64::from(sample);
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Reduce the batch.  `None` if nothing was pushed.
    pub fn finish(&self) -> Option<i32> {
        match self.count {
            0 => None,
            n @ 1..=2 => Some((self.sum / i64::from(n)) as i32),
            n => {
                let kept = self.sum - i64::from(self.min) - i64::from(self.max);
                Some((kept / i64::from(n - 2)) as i32)
            }
        }
    }
}

/// Discard-average a slice of samples.
pub fn discard_average(samples: &[i32]) -> Option<i32> {
    let mut acc = DiscardAccumulator::new();
    for &s in samples {
        acc.push(s);
    }
    acc.finish()
}

/// Take `n` reads from `channel` and discard-average them.
///
/// A failed read abandons the whole batch: a partial batch would bias the
/// discard step.
pub fn read_discard_average(
    adc: &mut impl AdcPort,
    channel: AdcChannel,
    n: u8,
) -> Result<i32, SensorError> {
    let mut acc = DiscardAccumulator::new();
    for _ in 0..n.max(1) {
        acc.push(adc.read_raw(channel)?);
    }
    acc.finish().ok_or(SensorError::AdcReadFailed)
}
