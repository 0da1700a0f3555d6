// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//!  Contains the franka_gripper_sim::GripperSim type.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::info;

use crate::config::GripperSimConfig;
use crate::exception::{create_invalid_parameter, GripperResult};
use crate::gripper::control_state::{ControlState, Goal};
use crate::gripper::gripper_state::{GripperState, JointStatePublisher};
use crate::gripper::types::{
    CommandKind, CommandOutcome, CompletionToken, GraspEpsilon, GripperMode,
};
use crate::joint::JointHandle;

mod control_state;
pub mod gripper_state;
mod pid;
mod speed_estimator;
pub mod types;

/// Simulates the Franka gripper on top of two effort controlled finger joints.
///
/// The gripper offers the same commands as the real one:
/// * [`homing`](`Self::homing`) - opens and closes the gripper fully. This is only simulated and
/// has no effect on the other commands.
/// * [`move_gripper`](`Self::move_gripper`) - moves the fingers with a desired speed to a width.
/// * [`grasp`](`Self::grasp`) - closes the gripper until it stops because of a contact. If the
/// width is then within the grasp epsilon, the desired force is applied.
/// * [`stop`](`Self::stop`) - stops any motion or the exertion of forces on a grasped object.
/// * [`gripper_command`](`Self::gripper_command`) - a generic position/effort command.
///
/// Commands block until the control cycle reports their outcome, so [`update`](`Self::update`)
/// has to be called periodically from another thread, e.g. with a
/// [`ControlLoop`](`crate::ControlLoop`). Every command interrupts the one which is currently
/// running, the interrupted command is reported as [`Aborted`](`CommandOutcome::Aborted`).
/// The `start_*` variants return a [`CommandHandle`] instead of blocking.
///
/// The type is a cheap handle to shared state and can be cloned into other threads.
#[derive(Clone)]
pub struct GripperSim {
    state: Arc<Mutex<ControlState>>,
    config: GripperSimConfig,
}

fn lock(state: &Mutex<ControlState>) -> MutexGuard<'_, ControlState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl GripperSim {
    /// Creates the controller for the two given finger joints.
    ///
    /// The controller starts in [`Idle`](`GripperMode::Idle`).
    /// # Errors
    /// * [`ConfigException`](`crate::exception::GripperException::ConfigException`) if the
    /// configuration is invalid.
    pub fn new<F1, F2>(finger1: F1, finger2: F2, config: GripperSimConfig) -> GripperResult<Self>
    where
        F1: JointHandle + Send + 'static,
        F2: JointHandle + Send + 'static,
    {
        config.validate()?;
        Ok(GripperSim {
            state: Arc::new(Mutex::new(ControlState::new(
                Box::new(finger1),
                Box::new(finger2),
                config,
            ))),
            config,
        })
    }

    /// Sets the publisher which receives the gripper state at the configured publish rate.
    pub fn set_publisher<P: JointStatePublisher + Send + 'static>(&self, publisher: P) {
        lock(&self.state).set_publisher(Some(Box::new(publisher)));
    }

    /// Executes one control cycle.
    ///
    /// # Arguments
    /// * `period` - Time which passed since the previous call.
    pub fn update(&self, period: &Duration) {
        lock(&self.state).update(period);
    }

    /// Returns the state of the gripper as seen in the last control cycle.
    pub fn read_once(&self) -> GripperState {
        lock(&self.state).snapshot()
    }

    /// Current control mode.
    pub fn mode(&self) -> GripperMode {
        lock(&self.state).mode()
    }

    /// Parameters the gripper was created with.
    pub fn config(&self) -> &GripperSimConfig {
        &self.config
    }

    /// Stops a currently running command and releases a grasped object.
    ///
    /// Calling stop on an idle gripper does nothing.
    /// # Return
    /// Always [`Succeeded`](`CommandOutcome::Succeeded`).
    pub fn stop(&self) -> GripperResult<CommandOutcome> {
        info!("gripper: stop requested");
        lock(&self.state).stop();
        Ok(CommandOutcome::Succeeded)
    }

    /// Performs homing of the gripper, i.e. opens it fully and closes it again.
    pub fn homing(&self) -> GripperResult<CommandOutcome> {
        Ok(self.start_homing()?.wait())
    }

    /// Starts a homing without waiting for it.
    pub fn start_homing(&self) -> GripperResult<CommandHandle> {
        info!("gripper: new homing goal");
        Ok(self.start(CommandKind::Homing, Goal::Homing))
    }

    /// Moves the gripper fingers to a specified width.
    /// # Arguments
    /// * `width` - Intended opening width, clamped to the maximum width. \[m\]
    /// * `speed` - Speed of the fingers. \[m/s\]
    /// # Errors
    /// * [`InvalidParameter`](`crate::exception::GripperException::InvalidParameter`) if a
    /// parameter is not finite or `speed` is not positive.
    /// # Return
    /// [`Succeeded`](`CommandOutcome::Succeeded`) once the width is reached within the move
    /// tolerance.
    pub fn move_gripper(&self, width: f64, speed: f64) -> GripperResult<CommandOutcome> {
        Ok(self.start_move(width, speed)?.wait())
    }

    /// Starts a move without waiting for it.
    pub fn start_move(&self, width: f64, speed: f64) -> GripperResult<CommandHandle> {
        let width = self.check_width(width)?;
        let speed = check_speed(speed)?;
        info!(
            "gripper: new move goal with width {:.4} m and speed {:.4} m/s",
            width, speed
        );
        Ok(self.start(CommandKind::Move, Goal::Move { width, speed }))
    }

    /// Grasps an object.
    ///
    /// The fingers close with `speed` until they stop because of a contact. An object is
    /// considered grasped if the width `d` between the fingers then satisfies
    /// `width - epsilon.inner <= d <= width + epsilon.outer`, in which case `force` is applied
    /// until the next command.
    ///
    /// A grasp with a width larger than the current one makes the fingers open. Such a grasp
    /// never finishes, because the stall at the open joint limits is not detected. It has to be
    /// stopped, cancelled or replaced by another command.
    /// # Arguments
    /// * `width` - Size of the object to grasp. \[m\]
    /// * `speed` - Speed of the fingers. \[m/s\]
    /// * `force` - Grasping force. \[N\]
    /// * `epsilon` - Tolerated deviation from `width`, 0.005 m in both directions by default.
    /// # Errors
    /// * [`InvalidParameter`](`crate::exception::GripperException::InvalidParameter`) if a
    /// parameter is not finite, `speed` is not positive or `force` or an epsilon is negative.
    pub fn grasp(
        &self,
        width: f64,
        speed: f64,
        force: f64,
        epsilon: Option<GraspEpsilon>,
    ) -> GripperResult<CommandOutcome> {
        Ok(self.start_grasp(width, speed, force, epsilon)?.wait())
    }

    /// Starts a grasp without waiting for it.
    pub fn start_grasp(
        &self,
        width: f64,
        speed: f64,
        force: f64,
        epsilon: Option<GraspEpsilon>,
    ) -> GripperResult<CommandHandle> {
        let goal = self.grasp_goal(width, speed, force, epsilon.unwrap_or_default())?;
        info!("gripper: new grasp goal {:?}", goal);
        Ok(self.start(CommandKind::Grasp, goal))
    }

    /// Executes a generic gripper command.
    ///
    /// `position` is the position of a single finger, so the commanded width is twice as large.
    /// Without effort the fingers move to the width with the default speed, otherwise they grasp
    /// with `max_effort` as force and the gripper command tolerance as epsilon.
    pub fn gripper_command(&self, position: f64, max_effort: f64) -> GripperResult<CommandOutcome> {
        Ok(self.start_gripper_command(position, max_effort)?.wait())
    }

    /// Starts a generic gripper command without waiting for it.
    pub fn start_gripper_command(
        &self,
        position: f64,
        max_effort: f64,
    ) -> GripperResult<CommandHandle> {
        if !position.is_finite() || !max_effort.is_finite() {
            return Err(create_invalid_parameter(format!(
                "gripper command needs a finite position and effort, got {} and {}",
                position, max_effort
            )));
        }
        let width = self.check_width(position * 2.)?;
        let speed = self.config.speed_default;
        let goal = if max_effort.abs() < f64::EPSILON {
            Goal::Move { width, speed }
        } else {
            self.grasp_goal(
                width,
                speed,
                max_effort.abs(),
                GraspEpsilon::symmetric(self.config.tolerance_gripper_action),
            )?
        };
        info!("gripper: new gripper command goal {:?}", goal);
        Ok(self.start(CommandKind::GripperCommand, goal))
    }

    fn start(&self, kind: CommandKind, goal: Goal) -> CommandHandle {
        let (id, token) = lock(&self.state).begin(kind, goal);
        CommandHandle {
            id,
            kind,
            token,
            state: self.state.clone(),
        }
    }

    fn check_width(&self, width: f64) -> GripperResult<f64> {
        if !width.is_finite() {
            return Err(create_invalid_parameter(format!(
                "width must be finite, got {}",
                width
            )));
        }
        Ok(width.clamp(0., self.config.max_finger_width))
    }

    fn grasp_goal(
        &self,
        width: f64,
        speed: f64,
        force: f64,
        epsilon: GraspEpsilon,
    ) -> GripperResult<Goal> {
        let width = self.check_width(width)?;
        let speed = check_speed(speed)?;
        if !(force.is_finite() && force >= 0.) {
            return Err(create_invalid_parameter(format!(
                "force must not be negative, got {}",
                force
            )));
        }
        if !(epsilon.inner.is_finite()
            && epsilon.outer.is_finite()
            && epsilon.inner >= 0.
            && epsilon.outer >= 0.)
        {
            return Err(create_invalid_parameter(format!(
                "grasp epsilon must not be negative, got {:?}",
                epsilon
            )));
        }
        Ok(Goal::Grasp {
            width,
            speed,
            force,
            epsilon,
        })
    }
}

fn check_speed(speed: f64) -> GripperResult<f64> {
    if !(speed.is_finite() && speed > 0.) {
        return Err(create_invalid_parameter(format!(
            "speed must be positive, got {}",
            speed
        )));
    }
    Ok(speed)
}

/// A started command.
///
/// Dropping the handle does not cancel the command.
pub struct CommandHandle {
    id: u64,
    kind: CommandKind,
    token: Arc<CompletionToken>,
    state: Arc<Mutex<ControlState>>,
}

impl CommandHandle {
    /// Unique id of the command.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Kind of command this handle tracks.
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Returns the outcome if the command has finished.
    pub fn try_outcome(&self) -> Option<CommandOutcome> {
        self.token.peek()
    }

    /// Blocks until the command has finished.
    pub fn wait(&self) -> CommandOutcome {
        self.token.wait()
    }

    /// Blocks until the command has finished or `timeout` has passed.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<CommandOutcome> {
        self.token.wait_timeout(timeout)
    }

    /// Cancels the command, which stops the gripper if the command is still running.
    /// # Return
    /// The outcome of the command, which is [`Aborted`](`CommandOutcome::Aborted`) unless it
    /// finished before.
    pub fn cancel(&self) -> CommandOutcome {
        if lock(&self.state).cancel(self.id) {
            info!("gripper: {} #{} cancel requested", self.kind, self.id);
        }
        self.token.wait()
    }
}
