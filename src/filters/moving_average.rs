use super::YawFilter;
use std::collections::VecDeque;

/// Moving average filter
pub struct MovingAverageFilter {
    window_size: usize,
    buffer: VecDeque<f64>,
}

impl MovingAverageFilter {
    /// Average over the last `window_size` values (at least one)
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            buffer: VecDeque::with_capacity(window_size),
        }
    }
}

impl YawFilter for MovingAverageFilter {
    #[allow(clippy::cast_precision_loss)]
    fn apply(&mut self, value: f64) -> f64 {
        if self.buffer.len() >= self.window_size {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);

        self.buffer.iter().sum::<f64>() / self.buffer.len() as f64
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }

    fn name(&self) -> &str {
        "MovingAverageFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average() {
        let mut filter = MovingAverageFilter::new(3);

        assert!((filter.apply(0.2) - 0.2).abs() < 1e-12);
        assert!((filter.apply(0.4) - 0.3).abs() < 1e-12);
        assert!((filter.apply(0.6) - 0.4).abs() < 1e-12);

        // Window is full, oldest value should be dropped
        assert!((filter.apply(0.8) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut filter = MovingAverageFilter::new(3);
        filter.apply(0.9);
        filter.reset();
        assert!((filter.apply(0.1) - 0.1).abs() < 1e-12);
    }
}
