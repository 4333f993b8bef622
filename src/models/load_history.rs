use super::allocation::{mean, sample_variance};
use std::collections::VecDeque;

/// Number of recent traffic magnitudes a server remembers.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Bounded FIFO of the most recent traffic magnitudes injected into a server.
///
/// Only the owning [`ServerModel`](super::ServerModel) appends to it; everyone
/// else gets copies.
#[derive(Debug, Clone)]
pub struct LoadHistory {
    capacity: usize,
    entries: VecDeque<f64>,
}

impl Default for LoadHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl LoadHistory {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Appends a magnitude, evicting the oldest entry once over capacity.
    pub(crate) fn push(&mut self, load: f64) {
        self.entries.push_back(load);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Arithmetic mean of the remembered loads, 0 when empty.
    pub fn average(&self) -> f64 {
        mean(&self.snapshot())
    }

    /// Sample variance of the remembered loads, 0 with fewer than two entries.
    pub fn variance(&self) -> f64 {
        sample_variance(&self.snapshot())
    }

    /// Copy of the entries in call order, oldest first.
    pub fn snapshot(&self) -> Vec<f64> {
        self.entries.iter().copied().collect()
    }

    /// The last `n` entries in call order.
    pub fn recent(&self, n: usize) -> Vec<f64> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_keeps_only_the_most_recent_entries() {
        let mut history = LoadHistory::default();

        for load in 0..25 {
            history.push(load as f64);
            assert!(history.len() <= DEFAULT_HISTORY_CAPACITY);
        }

        let expected: Vec<f64> = (15..25).map(|load| load as f64).collect();
        assert_eq!(history.snapshot(), expected);
    }

    #[test]
    fn it_computes_rolling_statistics() {
        let mut history = LoadHistory::new(3);
        assert_eq!(history.average(), 0.0);
        assert_eq!(history.variance(), 0.0);

        history.push(10.0);
        assert_eq!(history.average(), 10.0);
        assert_eq!(history.variance(), 0.0); // Single entry

        history.push(20.0);
        history.push(30.0);
        history.push(40.0); // Evicts 10.0

        assert_eq!(history.average(), 30.0);
        assert_eq!(history.variance(), 100.0);
    }

    #[test]
    fn it_returns_recent_tail() {
        let mut history = LoadHistory::new(4);
        for load in [1.0, 2.0, 3.0] {
            history.push(load);
        }

        assert_eq!(history.recent(2), vec![2.0, 3.0]);
        assert_eq!(history.recent(10), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn it_raises_zero_capacity() {
        let mut history = LoadHistory::new(0);
        history.push(1.0);
        history.push(2.0);

        assert_eq!(history.capacity(), 1);
        assert_eq!(history.snapshot(), vec![2.0]);
    }
}
