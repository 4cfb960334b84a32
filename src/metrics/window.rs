use std::collections::VecDeque;

/// How many latency samples each window keeps
pub const WINDOW_CAPACITY: usize = 100;

/// A bounded FIFO of millisecond latencies.
/// Once full, every push drops the oldest sample.
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: VecDeque<u64>,
}

impl LatencyWindow {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW_CAPACITY + 1),
        }
    }

    pub fn push(&mut self, millis: u64) {
        self.samples.push_back(millis);
        while self.samples.len() > WINDOW_CAPACITY {
            self.samples.pop_front();
        }
    }

    /// Arithmetic mean rounded to the nearest millisecond; 0 when empty.
    pub fn average(&self) -> u64 {
        if self.samples.is_empty() {
            return 0;
        }
        let sum: u64 = self.samples.iter().sum();
        (sum as f64 / self.samples.len() as f64).round() as u64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Oldest first.
    pub fn to_vec(&self) -> Vec<u64> {
        self.samples.iter().copied().collect()
    }
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self::new()
    }
}
