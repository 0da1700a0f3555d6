// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! contains timing helpers used by the control cycle.
use std::path::Path;
use std::time::Duration;

use crate::exception::{GripperException, GripperResult};

/// Determines whether the current OS kernel is a realtime kernel.
///
/// On Linux, this checks for the existence of `/sys/kernel/realtime`.
pub fn has_realtime_kernel() -> bool {
    Path::new("/sys/kernel/realtime").exists()
}

/// Sets the current thread to the highest possible scheduler priority.
///
/// # Errors
/// * RealtimeException if realtime priority cannot be set for the current thread.
///
/// If the method returns an Error please check your /etc/security/limits.conf file
/// There should be a line like this:
/// ```text
///marco            -       rtprio          99
/// ```
pub fn set_current_thread_to_highest_scheduler_priority() -> GripperResult<()> {
    unsafe {
        let max_priority = libc::sched_get_priority_max(libc::SCHED_FIFO);
        if max_priority == -1 {
            return Err(GripperException::RealTimeException {
                message: "franka-gripper-sim: unable to get maximum possible thread priority"
                    .to_string(),
            });
        }
        let thread_param = libc::sched_param {
            // one below the maximum, as recommended for RT applications
            sched_priority: max_priority - 1,
        };
        if libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &thread_param) != 0 {
            return Err(GripperException::RealTimeException {
                message: "franka-gripper-sim: unable to set realtime scheduling".to_string(),
            });
        }
    }
    Ok(())
}

/// Fires at most once per period of the given rate.
///
/// The trigger runs on the controller clock: it is advanced with the elapsed time of each control
/// cycle instead of reading the wall clock.
#[derive(Debug, Clone)]
pub struct TriggerRate {
    period: f64,
    elapsed: f64,
}

impl TriggerRate {
    /// # Arguments
    /// * `rate` - Maximum trigger frequency. \[Hz\]
    pub fn new(rate: f64) -> Self {
        TriggerRate {
            period: 1. / rate,
            elapsed: 0.,
        }
    }

    /// Advances the trigger by `period` and returns true if it fired.
    pub fn tick(&mut self, period: &Duration) -> bool {
        self.elapsed += period.as_secs_f64();
        if self.elapsed >= self.period {
            self.elapsed = 0.;
            return true;
        }
        false
    }
}
