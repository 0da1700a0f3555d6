// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the position controller of a single finger.

use std::time::Duration;

use crate::config::PidGains;

/// PID controller with a clamped integral term.
#[derive(Debug, Clone)]
pub(crate) struct Pid {
    gains: PidGains,
    i_term: f64,
}

impl Pid {
    pub fn new(gains: PidGains) -> Self {
        Pid {
            gains,
            i_term: 0.,
        }
    }

    /// Clears the integral term.
    pub fn reset(&mut self) {
        self.i_term = 0.;
    }

    /// Computes the control effort for one cycle.
    ///
    /// # Arguments
    /// * `error` - Position error (desired - measured). \[m\]
    /// * `error_dot` - Velocity error (desired - measured). \[m/s\]
    /// * `period` - Time since the last call.
    /// # Return
    /// Effort without any feed-forward term. \[N\]
    pub fn compute(&mut self, error: f64, error_dot: f64, period: &Duration) -> f64 {
        let dt = period.as_secs_f64();
        if !error.is_finite() || !error_dot.is_finite() {
            return 0.;
        }
        if dt > 0. {
            self.i_term += self.gains.i * error * dt;
            self.i_term = self.i_term.clamp(-self.gains.i_clamp, self.gains.i_clamp);
        }
        self.gains.p * error + self.i_term + self.gains.d * error_dot
    }

    #[cfg(test)]
    pub fn integral(&self) -> f64 {
        self.i_term
    }
}
