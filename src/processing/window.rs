//! Bounded per-beacon distance history

use crate::core::SAMPLE_WINDOW_CAPACITY;

/// Raw distance samples for one beacon, in insertion order.
///
/// The window does not slide. When a push arrives while the window is full,
/// everything except the last slot is discarded first, so a full window of
/// six collapses to two entries on the seventh push.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleWindow {
    samples: Vec<f64>,
    capacity: usize,
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleWindow {
    pub fn new() -> Self {
        Self::with_capacity(SAMPLE_WINDOW_CAPACITY)
    }

    /// Capacities below 2 are raised to 2
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, distance: f64) {
        if self.samples.len() >= self.capacity {
            let retained = self.samples[self.capacity - 1];
            self.samples.clear();
            self.samples.push(retained);
        }
        self.samples.push(distance);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.samples.iter()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.samples
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.last().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<'a> IntoIterator for &'a SampleWindow {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
