// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the command and mode types shared by the command handlers and the control cycle.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde::Serialize;

/// Discrete control mode of the gripper.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GripperMode {
    /// The gripper is not actively controlled. The second finger tracks the first one to simulate
    /// a mimicked joint.
    Idle,
    /// The fingers hold their position with zero velocity while exerting the desired force.
    Holding,
    /// The fingers track a desired width and speed.
    Moving,
    /// Like [`Moving`](`GripperMode::Moving`), but on contact the gripper switches to
    /// [`Holding`](`GripperMode::Holding`) if the width is inside the grasp epsilon and back to
    /// [`Idle`](`GripperMode::Idle`) otherwise.
    Grasping,
    /// The fingers open fully and close again.
    Homing,
}

impl Default for GripperMode {
    fn default() -> Self {
        GripperMode::Idle
    }
}

/// Tolerated deviation of the grasped width from the commanded grasp width.
///
/// An object is considered grasped if the width `d` between the fingers satisfies
/// `width - inner <= d <= width + outer`.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct GraspEpsilon {
    /// Maximum tolerated deviation when the grasped width is smaller than the commanded one. \[m\]
    pub inner: f64,
    /// Maximum tolerated deviation when the grasped width is larger than the commanded one. \[m\]
    pub outer: f64,
}

impl GraspEpsilon {
    pub fn new(inner: f64, outer: f64) -> Self {
        GraspEpsilon { inner, outer }
    }

    pub fn symmetric(epsilon: f64) -> Self {
        GraspEpsilon::new(epsilon, epsilon)
    }

    /// Checks whether `width` lies inside the band around `width_desired`.
    pub fn contains(&self, width: f64, width_desired: f64) -> bool {
        if width < width_desired {
            width_desired - width <= self.inner
        } else {
            width - width_desired <= self.outer
        }
    }
}

impl Default for GraspEpsilon {
    fn default() -> Self {
        GraspEpsilon::symmetric(0.005)
    }
}

/// Kind of a command.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Stop,
    Homing,
    Move,
    Grasp,
    GripperCommand,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandKind::Stop => "stop",
            CommandKind::Homing => "homing",
            CommandKind::Move => "move",
            CommandKind::Grasp => "grasp",
            CommandKind::GripperCommand => "gripper command",
        };
        f.write_str(name)
    }
}

/// Why a command failed.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub enum FailureReason {
    /// The fingers stopped at a width outside of the grasp epsilon.
    GraspMissed { width: f64, width_desired: f64 },
    /// The fingers were blocked before they reached the commanded width.
    WidthUnreachable { width: f64, width_desired: f64 },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::GraspMissed {
                width,
                width_desired,
            } => write!(
                f,
                "object not graspable within tolerance: stopped at {:.4} m, desired {:.4} m",
                width, width_desired
            ),
            FailureReason::WidthUnreachable {
                width,
                width_desired,
            } => write!(
                f,
                "width unreachable: blocked at {:.4} m, desired {:.4} m",
                width, width_desired
            ),
        }
    }
}

/// Why a command was aborted.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// Another command was started, or a stop was requested.
    Preempted { by: CommandKind },
    /// The caller cancelled the command.
    Canceled,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Preempted { by } => write!(f, "preempted by {}", by),
            AbortReason::Canceled => f.write_str("canceled"),
        }
    }
}

/// Final result of a command.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub enum CommandOutcome {
    Succeeded,
    Failed(FailureReason),
    Aborted(AbortReason),
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandOutcome::Succeeded)
    }
    pub fn is_aborted(&self) -> bool {
        matches!(self, CommandOutcome::Aborted(_))
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Succeeded => f.write_str("succeeded"),
            CommandOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            CommandOutcome::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

/// One-shot slot through which the control cycle hands the outcome to a waiting command.
#[derive(Debug, Default)]
pub(crate) struct CompletionToken {
    outcome: Mutex<Option<CommandOutcome>>,
    finished: Condvar,
}

impl CompletionToken {
    /// Stores the outcome and wakes all waiters. Only the first outcome is kept.
    pub fn resolve(&self, outcome: CommandOutcome) -> bool {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        self.finished.notify_all();
        true
    }

    pub fn peek(&self) -> Option<CommandOutcome> {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn wait(&self) -> CommandOutcome {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = *slot {
                return outcome;
            }
            slot = self
                .finished
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<CommandOutcome> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if slot.is_some() {
                return *slot;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            slot = self
                .finished
                .wait_timeout(slot, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// The command which currently owns the control state.
#[derive(Debug, Clone)]
pub(crate) enum ActiveCommand {
    None,
    Running {
        id: u64,
        kind: CommandKind,
        token: Arc<CompletionToken>,
    },
}

impl ActiveCommand {
    pub fn id(&self) -> Option<u64> {
        match self {
            ActiveCommand::None => None,
            ActiveCommand::Running { id, .. } => Some(*id),
        }
    }
}
