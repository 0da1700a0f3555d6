// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the stall detection of a finger.
use std::collections::VecDeque;

/// Keeps the last `samples` velocities of a finger in a ring buffer.
///
/// The buffer is allocated once, pushing a sample into a full window drops the oldest one.
#[derive(Debug, Clone)]
pub(crate) struct SpeedEstimator {
    velocities: VecDeque<f64>,
    samples: usize,
}

impl SpeedEstimator {
    pub fn new(samples: usize) -> Self {
        let samples = usize::max(samples, 1);
        SpeedEstimator {
            velocities: VecDeque::with_capacity(samples),
            samples,
        }
    }

    pub fn push(&mut self, velocity: f64) {
        if self.velocities.len() == self.samples {
            self.velocities.pop_front();
        }
        self.velocities.push_back(velocity);
    }

    pub fn clear(&mut self) {
        self.velocities.clear();
    }

    pub fn is_full(&self) -> bool {
        self.velocities.len() == self.samples
    }

    /// Mean absolute velocity over the samples currently in the window.
    pub fn mean_speed(&self) -> f64 {
        if self.velocities.is_empty() {
            return 0.;
        }
        self.velocities.iter().map(|v| v.abs()).sum::<f64>() / self.velocities.len() as f64
    }

    /// True if the window is full and the mean absolute velocity is below `threshold`.
    pub fn is_stalled(&self, threshold: f64) -> bool {
        self.is_full() && self.mean_speed() < threshold
    }
}

#[cfg(test)]
mod tests {
    use crate::gripper::speed_estimator::SpeedEstimator;

    #[test]
    fn not_stalled_until_window_is_full() {
        let mut estimator = SpeedEstimator::new(3);
        estimator.push(0.);
        estimator.push(0.);
        assert!(!estimator.is_stalled(0.001));
        estimator.push(0.);
        assert!(estimator.is_stalled(0.001));
    }

    #[test]
    fn uses_absolute_velocities() {
        let mut estimator = SpeedEstimator::new(2);
        estimator.push(0.01);
        estimator.push(-0.01);
        assert!(f64::abs(estimator.mean_speed() - 0.01) < 1e-12);
        assert!(!estimator.is_stalled(0.005));
    }

    #[test]
    fn old_samples_leave_the_window() {
        let mut estimator = SpeedEstimator::new(4);
        for _ in 0..4 {
            estimator.push(0.05);
        }
        assert!(!estimator.is_stalled(0.001));
        for _ in 0..4 {
            estimator.push(0.0001);
        }
        assert!(estimator.is_stalled(0.001));
        assert_eq!(estimator.velocities.len(), 4);
        assert!(estimator.velocities.capacity() >= 4);
    }

    #[test]
    fn clear_empties_the_window() {
        let mut estimator = SpeedEstimator::new(1);
        estimator.push(0.);
        assert!(estimator.is_stalled(0.1));
        estimator.clear();
        assert!(!estimator.is_full());
        assert_eq!(estimator.mean_speed(), 0.);
    }
}
