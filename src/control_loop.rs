// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains a fixed-rate driver for the control cycle.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::exception::{GripperException, GripperResult};
use crate::utils::{has_realtime_kernel, set_current_thread_to_highest_scheduler_priority};

/// Used to decide whether to enforce realtime mode for the control thread.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RealtimeConfig {
    Enforce,
    Ignore,
}

/// Calls a callback on a dedicated thread at a fixed period.
///
/// The callback receives the time which actually passed since its previous invocation, so a late
/// cycle is compensated instead of being dropped. The thread is stopped when the loop is dropped.
/// ```no_run
/// use franka_gripper_sim::{ControlLoop, GripperSim, GripperSimConfig, RealtimeConfig, SimulatedGripper};
/// use std::time::Duration;
/// # fn main() -> franka_gripper_sim::GripperResult<()> {
/// let sim = SimulatedGripper::new(0.08, 0.08);
/// let (finger1, finger2) = sim.fingers();
/// let gripper = GripperSim::new(finger1, finger2, GripperSimConfig::default())?;
/// let controller = gripper.clone();
/// let control_loop = ControlLoop::spawn(Duration::from_millis(1), RealtimeConfig::Ignore, move |period| {
///     controller.update(period);
///     sim.step(period);
/// })?;
/// gripper.move_gripper(0.04, 0.1)?;
/// control_loop.stop();
/// # Ok(())
/// # }
/// ```
pub struct ControlLoop {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ControlLoop {
    /// Starts the control thread.
    /// # Errors
    /// * [`RealTimeException`](`crate::exception::GripperException::RealTimeException`) if
    /// `realtime` is [`Enforce`](`RealtimeConfig::Enforce`) and the thread priority cannot be set.
    pub fn spawn<F>(period: Duration, realtime: RealtimeConfig, mut callback: F) -> GripperResult<Self>
    where
        F: FnMut(&Duration) + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let (started_sender, started_receiver) = channel::<GripperResult<()>>();
        let thread = {
            let running = running.clone();
            std::thread::Builder::new()
                .name("gripper-control".to_string())
                .spawn(move || {
                    let started = if realtime == RealtimeConfig::Enforce {
                        if has_realtime_kernel() {
                            set_current_thread_to_highest_scheduler_priority()
                        } else {
                            Err(GripperException::RealTimeException {
                                message: "franka-gripper-sim: Running kernel does not have realtime capabilities."
                                    .to_string(),
                            })
                        }
                    } else {
                        Ok(())
                    };
                    let failed = started.is_err();
                    let _ = started_sender.send(started);
                    if failed {
                        return;
                    }
                    run(period, &running, &mut callback);
                })
                .map_err(|e| GripperException::RealTimeException {
                    message: format!("franka-gripper-sim: unable to spawn control thread: {}", e),
                })?
        };
        let started = started_receiver
            .recv()
            .unwrap_or_else(|_| {
                Err(GripperException::RealTimeException {
                    message: "franka-gripper-sim: control thread exited during start".to_string(),
                })
            });
        if let Err(error) = started {
            let _ = thread.join();
            return Err(error);
        }
        debug!("gripper: control loop started with period {:?}", period);
        Ok(ControlLoop {
            running,
            thread: Some(thread),
        })
    }

    /// Stops the control thread and waits for it to finish its current cycle.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("gripper: control thread panicked");
            }
        }
    }
}

impl Drop for ControlLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<F: FnMut(&Duration)>(period: Duration, running: &AtomicBool, callback: &mut F) {
    let mut last = Instant::now();
    let mut deadline = last + period;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        let elapsed = now - last;
        last = now;
        if elapsed > period * 2 {
            debug!("gripper: control cycle late by {:?}", elapsed - period);
        }
        callback(&elapsed);

        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
            deadline += period;
        } else {
            deadline = now + period;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::control_loop::{ControlLoop, RealtimeConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn calls_back_periodically_until_stopped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let elapsed = Arc::new(Mutex::new(Duration::from_secs(0)));
        let control_loop = {
            let calls = calls.clone();
            let elapsed = elapsed.clone();
            ControlLoop::spawn(Duration::from_millis(2), RealtimeConfig::Ignore, move |period| {
                calls.fetch_add(1, Ordering::SeqCst);
                *elapsed.lock().unwrap() += *period;
            })
            .unwrap()
        };
        std::thread::sleep(Duration::from_millis(100));
        control_loop.stop();
        let count = calls.load(Ordering::SeqCst);
        assert!(count > 5, "only {} cycles", count);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(calls.load(Ordering::SeqCst), count);
        assert!(*elapsed.lock().unwrap() <= Duration::from_millis(150));
    }

    #[test]
    fn enforced_realtime_without_kernel_support_fails() {
        if crate::utils::has_realtime_kernel() {
            return;
        }
        let result = ControlLoop::spawn(Duration::from_millis(1), RealtimeConfig::Enforce, |_| {});
        assert!(result.is_err());
    }
}
