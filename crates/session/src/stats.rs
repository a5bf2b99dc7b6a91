use std::collections::VecDeque;

/// Step times of the current world, as reported by the background.
///
/// Only results that advanced the simulation are recorded. The window keeps
/// the most recent samples; a world build starts over.
#[derive(Debug, Clone)]
pub struct StepTimings {
    window: VecDeque<f64>,
    capacity: usize,
    steps: u64,
}

impl StepTimings {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            steps: 0,
        }
    }

    /// Record one advance. Negative or non-finite times count as zero.
    pub fn record(&mut self, step_time_ms: f64) {
        let ms = if step_time_ms.is_finite() {
            step_time_ms.max(0.0)
        } else {
            0.0
        };
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(ms);
        self.steps += 1;
    }

    /// Forget the previous world's steps.
    pub fn reset(&mut self) {
        self.window.clear();
        self.steps = 0;
    }

    /// Samples currently in the window.
    pub fn count(&self) -> usize {
        self.window.len()
    }

    /// Advances recorded since the last reset, including those that have
    /// left the window.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn last_ms(&self) -> Option<f64> {
        self.window.back().copied()
    }

    pub fn average_ms(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.window.iter().sum::<f64>() / self.window.len() as f64
    }

    pub fn min_ms(&self) -> f64 {
        self.window.iter().copied().reduce(f64::min).unwrap_or(0.0)
    }

    pub fn max_ms(&self) -> f64 {
        self.window.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarizes_window() {
        let mut timings = StepTimings::new(3);
        timings.record(1.0);
        timings.record(2.0);
        timings.record(3.0);

        assert_eq!(timings.count(), 3);
        assert_eq!(timings.average_ms(), 2.0);
        assert_eq!(timings.min_ms(), 1.0);
        assert_eq!(timings.max_ms(), 3.0);
        assert_eq!(timings.last_ms(), Some(3.0));
    }

    #[test]
    fn oldest_sample_leaves_window() {
        let mut timings = StepTimings::new(2);
        timings.record(1.0);
        timings.record(2.0);
        timings.record(4.0);

        assert_eq!(timings.count(), 2);
        assert_eq!(timings.steps(), 3);
        assert_eq!(timings.average_ms(), 3.0);
        assert_eq!(timings.min_ms(), 2.0);
    }

    #[test]
    fn reset_starts_a_new_world() {
        let mut timings = StepTimings::new(4);
        timings.record(2.0);
        timings.reset();
        assert_eq!(timings.count(), 0);
        assert_eq!(timings.steps(), 0);
        assert_eq!(timings.average_ms(), 0.0);
        assert_eq!(timings.max_ms(), 0.0);
        assert_eq!(timings.last_ms(), None);
    }

    #[test]
    fn bad_times_count_as_zero() {
        let mut timings = StepTimings::new(0);
        timings.record(-1.0);
        assert_eq!(timings.last_ms(), Some(0.0));
        timings.record(f64::NAN);
        assert_eq!(timings.count(), 1);
        assert_eq!(timings.max_ms(), 0.0);
    }
}
