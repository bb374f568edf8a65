//! Fixed-window moving average.
//!
//! Before the window fills, the output is the mean of the samples seen so
//! far (ramp-up).  Integer mean, truncating toward zero.

/// Window size used for every sensor channel.
pub const FILTER_WINDOW: usize = 10;

#[derive(Debug, Clone)]
pub struct MovingAverage<const K: usize> {
    buf: [i32; K],
    index: usize,
    count: usize,
    sum: i64,
}

impl<const K: usize> Default for MovingAverage<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const K: usize> MovingAverage<K> {
    pub const fn new() -> Self {
        Self {
            buf: [0; K],
            index: 0,
            count: 0,
            sum: 0,
        }
    }

    /// Push `value` and return the new mean.
    pub fn update(&mut self, value: i32) -> i32 {
        // The evicted slot is still zero during ramp-up.
        self.sum -= i64::from(self.buf[self.index]);
        self.buf[self.index] = value;
        self.sum += i64::from(value);
        self.index = (self.index + 1) % K;
        if self.count < K {
            self.count += 1;
        }
        (self.sum / self.count as i64) as i32
    }

    /// Current mean, `None` before the first sample.
    pub fn value(&self) -> Option<i32> {
        if self.count == 0 {
            None
        } else {
            Some((self.sum / self.count as i64) as i32)
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == K
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
