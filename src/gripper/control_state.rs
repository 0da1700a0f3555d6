// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the control state of the simulated gripper and its per-cycle update.
//!
//! Everything in here runs under the single lock owned by [`GripperSim`](`crate::GripperSim`).

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::GripperSimConfig;
use crate::gripper::gripper_state::{GripperState, JointStatePublisher};
use crate::gripper::pid::Pid;
use crate::gripper::speed_estimator::SpeedEstimator;
use crate::gripper::types::{
    AbortReason, ActiveCommand, CommandKind, CommandOutcome, CompletionToken, FailureReason,
    GraspEpsilon, GripperMode,
};
use crate::joint::JointHandle;
use crate::utils::TriggerRate;

pub(crate) type BoxedJoint = Box<dyn JointHandle + Send>;
pub(crate) type BoxedPublisher = Box<dyn JointStatePublisher + Send>;

/// Targets of a command, already validated and clamped.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum Goal {
    Homing,
    Move {
        width: f64,
        speed: f64,
    },
    Grasp {
        width: f64,
        speed: f64,
        force: f64,
        epsilon: GraspEpsilon,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum HomingPhase {
    Open,
    Close,
}

/// Bookkeeping of the motion of the current command.
#[derive(Debug, Copy, Clone)]
struct Motion {
    /// Width the fingers are tracking in this cycle. \[m\]
    setpoint: f64,
    /// +1 when opening, -1 when closing.
    direction: f64,
    /// The setpoint reached the end of its ramp.
    saturated: bool,
    /// Stall detection is allowed to finish the command.
    armed: bool,
    phase: HomingPhase,
}

impl Motion {
    fn start(width: f64, width_goal: f64) -> Self {
        Motion {
            setpoint: width,
            direction: if width_goal > width { 1. } else { -1. },
            saturated: false,
            armed: false,
            phase: HomingPhase::Open,
        }
    }
}

/// Control data of one finger.
pub(crate) struct JointControlAxis {
    handle: BoxedJoint,
    pid: Pid,
    speed: SpeedEstimator,
    position: f64,
    velocity: f64,
    position_desired: f64,
    velocity_desired: f64,
    force_desired: f64,
    effort: f64,
}

impl JointControlAxis {
    fn new(handle: BoxedJoint, pid: Pid, speed_samples: usize) -> Self {
        let position = handle.position();
        let velocity = handle.velocity();
        JointControlAxis {
            handle,
            pid,
            speed: SpeedEstimator::new(speed_samples),
            position,
            velocity,
            position_desired: position,
            velocity_desired: 0.,
            force_desired: 0.,
            effort: 0.,
        }
    }

    fn read(&mut self) {
        self.position = self.handle.position();
        self.velocity = self.handle.velocity();
        self.speed.push(self.velocity);
    }

    fn track(&mut self, q_d: f64, dq_d: f64, f_d: f64) {
        self.position_desired = q_d;
        self.velocity_desired = dq_d;
        self.force_desired = f_d;
    }

    fn command(&mut self, period: &Duration) {
        let error = self.position_desired - self.position;
        let error_dot = self.velocity_desired - self.velocity;
        self.effort = self.pid.compute(error, error_dot, period) + self.force_desired;
        self.handle.set_command(self.effort);
    }
}

/// Mode, targets and finger controllers of the gripper.
pub(crate) struct ControlState {
    config: GripperSimConfig,
    mode: GripperMode,
    width_desired: f64,
    speed_desired: f64,
    force_desired: f64,
    tolerance: GraspEpsilon,
    fingers: [JointControlAxis; 2],
    active: ActiveCommand,
    motion: Motion,
    next_command_id: u64,
    time: Duration,
    publish_trigger: TriggerRate,
    publisher: Option<BoxedPublisher>,
}

impl ControlState {
    pub fn new(finger1: BoxedJoint, finger2: BoxedJoint, config: GripperSimConfig) -> Self {
        let fingers = [
            JointControlAxis::new(finger1, Pid::new(config.finger1), config.speed_samples),
            JointControlAxis::new(finger2, Pid::new(config.finger2), config.speed_samples),
        ];
        let width = fingers[0].position + fingers[1].position;
        let mut state = ControlState {
            config,
            mode: GripperMode::Idle,
            width_desired: width.clamp(0., config.max_finger_width),
            speed_desired: config.speed_default,
            force_desired: 0.,
            tolerance: GraspEpsilon::default(),
            fingers,
            active: ActiveCommand::None,
            motion: Motion::start(width, width),
            next_command_id: 1,
            time: Duration::from_secs(0),
            publish_trigger: TriggerRate::new(config.publish_rate),
            publisher: None,
        };
        state.starting();
        state
    }

    /// Brings the controller into its initial state.
    fn starting(&mut self) {
        self.mode = GripperMode::Idle;
        for finger in self.fingers.iter_mut() {
            finger.pid.reset();
            finger.speed.clear();
        }
    }

    pub fn set_publisher(&mut self, publisher: Option<BoxedPublisher>) {
        self.publisher = publisher;
    }

    pub fn mode(&self) -> GripperMode {
        self.mode
    }

    #[cfg(test)]
    pub fn active_id(&self) -> Option<u64> {
        self.active.id()
    }

    /// Width measured in the last control cycle.
    pub fn width(&self) -> f64 {
        self.fingers[0].position + self.fingers[1].position
    }

    pub fn snapshot(&self) -> GripperState {
        let [finger1, finger2] = &self.fingers;
        GripperState {
            width: self.width(),
            max_width: self.config.max_finger_width,
            is_grasped: self.mode == GripperMode::Holding,
            mode: self.mode,
            position: [finger1.position, finger2.position],
            velocity: [finger1.velocity, finger2.velocity],
            effort: [finger1.effort, finger2.effort],
            force_feedforward: [finger1.force_desired, finger2.force_desired],
            time: self.time,
        }
    }

    /// Aborts the command in flight, if any, and starts a new one.
    pub fn begin(&mut self, kind: CommandKind, goal: Goal) -> (u64, Arc<CompletionToken>) {
        self.interrupt(AbortReason::Preempted { by: kind });
        let width = self.width();
        match goal {
            Goal::Homing => {
                self.mode = GripperMode::Homing;
                self.width_desired = self.config.max_finger_width;
                self.speed_desired = self.config.homing_speed;
                self.force_desired = 0.;
                self.motion = Motion::start(width, self.config.max_finger_width);
            }
            Goal::Move { width: w, speed } => {
                self.mode = GripperMode::Moving;
                self.width_desired = w;
                self.speed_desired = speed;
                self.force_desired = 0.;
                self.motion = Motion::start(width, w);
            }
            Goal::Grasp {
                width: w,
                speed,
                force,
                epsilon,
            } => {
                self.mode = GripperMode::Grasping;
                self.width_desired = w;
                self.speed_desired = speed;
                self.force_desired = force;
                self.tolerance = epsilon;
                self.motion = Motion::start(width, w);
            }
        }
        for finger in self.fingers.iter_mut() {
            finger.speed.clear();
        }
        let id = self.next_command_id;
        self.next_command_id += 1;
        let token = Arc::new(CompletionToken::default());
        self.active = ActiveCommand::Running {
            id,
            kind,
            token: token.clone(),
        };
        debug!(
            "gripper: {} #{} started in mode {:?} from width {:.4} m",
            kind, id, self.mode, width
        );
        (id, token)
    }

    /// Aborts the running command and releases the gripper.
    pub fn stop(&mut self) {
        self.interrupt(AbortReason::Preempted {
            by: CommandKind::Stop,
        });
        if self.mode != GripperMode::Idle {
            debug!("gripper: stop in mode {:?}", self.mode);
            self.mode = GripperMode::Idle;
        }
    }

    /// Cancels the command with the given id. Returns false if it is not running anymore.
    pub fn cancel(&mut self, id: u64) -> bool {
        if self.active.id() != Some(id) {
            return false;
        }
        self.interrupt(AbortReason::Canceled);
        self.mode = GripperMode::Idle;
        true
    }

    fn interrupt(&mut self, reason: AbortReason) {
        if let ActiveCommand::Running { id, kind, token } =
            std::mem::replace(&mut self.active, ActiveCommand::None)
        {
            warn!("gripper: {} #{} {}", kind, id, reason);
            token.resolve(CommandOutcome::Aborted(reason));
        }
    }

    fn finish(&mut self, mode: GripperMode, outcome: CommandOutcome) {
        self.mode = mode;
        if let ActiveCommand::Running { id, kind, token } =
            std::mem::replace(&mut self.active, ActiveCommand::None)
        {
            info!("gripper: {} #{} {}", kind, id, outcome);
            token.resolve(outcome);
        }
    }

    /// Executes one control cycle.
    ///
    /// `period` is the time which actually passed since the previous cycle.
    pub fn update(&mut self, period: &Duration) {
        self.time += *period;
        for finger in self.fingers.iter_mut() {
            finger.read();
        }
        let width = self.width();

        match self.mode {
            GripperMode::Idle => {
                let q1 = self.fingers[0].position;
                self.fingers[0].track(q1, 0., 0.);
                self.fingers[1].track(q1, 0., 0.);
            }
            GripperMode::Holding => {
                let f_d = -self.force_desired / 2.;
                for finger in self.fingers.iter_mut() {
                    let q = finger.position;
                    finger.track(q, 0., f_d);
                }
            }
            GripperMode::Moving | GripperMode::Grasping | GripperMode::Homing => {
                let dw_d = self.advance_setpoint(period);
                let q_d = self.motion.setpoint / 2.;
                for finger in self.fingers.iter_mut() {
                    finger.track(q_d, dw_d / 2., 0.);
                }
                self.check_motion(width);
            }
        }

        for finger in self.fingers.iter_mut() {
            finger.command(period);
        }

        if self.publish_trigger.tick(period) {
            let state = self.snapshot();
            if let Some(publisher) = self.publisher.as_mut() {
                publisher.publish(&state);
            }
        }
    }

    /// End point of the width ramp of the current mode.
    fn ramp_goal(&self) -> f64 {
        let max_width = self.config.max_finger_width;
        match self.mode {
            GripperMode::Moving => self.width_desired,
            // Grasping does not stop at the desired width, only contact stops the fingers.
            GripperMode::Grasping if self.motion.direction > 0. => max_width,
            GripperMode::Grasping => 0.,
            GripperMode::Homing => match self.motion.phase {
                HomingPhase::Open => max_width,
                HomingPhase::Close => 0.,
            },
            GripperMode::Idle | GripperMode::Holding => self.motion.setpoint,
        }
    }

    /// Moves the width setpoint towards the ramp goal and returns the desired width velocity.
    fn advance_setpoint(&mut self, period: &Duration) -> f64 {
        let goal = self.ramp_goal();
        let step = self.speed_desired * period.as_secs_f64();
        let delta = goal - self.motion.setpoint;
        if delta.abs() <= step {
            self.motion.setpoint = goal;
            self.motion.saturated = true;
            0.
        } else {
            self.motion.setpoint += step.copysign(delta);
            self.speed_desired.copysign(delta)
        }
    }

    fn check_motion(&mut self, width: f64) {
        let threshold = self.config.speed_threshold;
        if !self.motion.armed
            && (self.motion.saturated
                || self
                    .fingers
                    .iter()
                    .any(|finger| finger.speed.mean_speed() >= threshold))
        {
            self.motion.armed = true;
        }
        let stalled = self.motion.armed
            && self
                .fingers
                .iter()
                .all(|finger| finger.speed.is_stalled(threshold));

        match self.mode {
            GripperMode::Moving => {
                if !self.motion.saturated {
                    return;
                }
                if (width - self.width_desired).abs() <= self.config.tolerance_move {
                    self.finish(GripperMode::Idle, CommandOutcome::Succeeded);
                } else if stalled {
                    self.finish(
                        GripperMode::Idle,
                        CommandOutcome::Failed(FailureReason::WidthUnreachable {
                            width,
                            width_desired: self.width_desired,
                        }),
                    );
                }
            }
            // Opening grasps are never evaluated: detecting the stall at the fully open
            // position would need the joint limits, which are not part of this control path.
            GripperMode::Grasping if self.motion.direction < 0. && stalled => {
                if self.tolerance.contains(width, self.width_desired) {
                    self.finish(GripperMode::Holding, CommandOutcome::Succeeded);
                } else {
                    self.finish(
                        GripperMode::Idle,
                        CommandOutcome::Failed(FailureReason::GraspMissed {
                            width,
                            width_desired: self.width_desired,
                        }),
                    );
                }
            }
            GripperMode::Homing if stalled => match self.motion.phase {
                HomingPhase::Open => {
                    debug!("gripper: homing fully open at {:.4} m", width);
                    self.motion = Motion {
                        setpoint: self.motion.setpoint,
                        direction: -1.,
                        saturated: false,
                        armed: false,
                        phase: HomingPhase::Close,
                    };
                    self.width_desired = 0.;
                    for finger in self.fingers.iter_mut() {
                        finger.speed.clear();
                    }
                }
                HomingPhase::Close => {
                    debug!("gripper: homing fully closed at {:.4} m", width);
                    self.finish(GripperMode::Idle, CommandOutcome::Succeeded);
                }
            },
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::sync_channel;
    use std::time::Duration;

    use mockall::predicate::*;

    use crate::config::{GripperSimConfig, PidGains};
    use crate::gripper::control_state::{ControlState, Goal};
    use crate::gripper::types::{
        AbortReason, CommandKind, CommandOutcome, FailureReason, GraspEpsilon, GripperMode,
    };
    use crate::joint::MockJointHandle;
    use crate::simulation::SimulatedGripper;

    const PERIOD: Duration = Duration::from_millis(1);

    fn still_joint(position: f64) -> MockJointHandle {
        let mut joint = MockJointHandle::new();
        joint.expect_position().return_const(position);
        joint.expect_velocity().return_const(0.);
        joint
    }

    fn simulated_state(width: f64, config: GripperSimConfig) -> (SimulatedGripper, ControlState) {
        let sim = SimulatedGripper::new(config.max_finger_width, width);
        let (finger1, finger2) = sim.fingers();
        let state = ControlState::new(Box::new(finger1), Box::new(finger2), config);
        (sim, state)
    }

    fn run(sim: &SimulatedGripper, state: &mut ControlState, cycles: usize) {
        for _ in 0..cycles {
            state.update(&PERIOD);
            sim.step(&PERIOD);
        }
    }

    fn run_until_idle(sim: &SimulatedGripper, state: &mut ControlState, cycles: usize) -> usize {
        for cycle in 0..cycles {
            state.update(&PERIOD);
            sim.step(&PERIOD);
            if state.active_id().is_none() {
                return cycle + 1;
            }
        }
        cycles
    }

    #[test]
    fn idle_mimics_first_finger() {
        let mut finger1 = still_joint(0.03);
        let mut finger2 = still_joint(0.02);
        finger1
            .expect_set_command()
            .with(eq(0.))
            .times(1)
            .return_const(());
        // finger 2 is pulled towards finger 1 by the proportional gain only
        finger2
            .expect_set_command()
            .withf(|effort| f64::abs(effort - 1.0) < 1e-9)
            .times(1)
            .return_const(());
        let config = GripperSimConfig {
            finger1: PidGains {
                p: 100.,
                i: 0.,
                d: 1.,
                i_clamp: 0.,
            },
            finger2: PidGains {
                p: 100.,
                i: 0.,
                d: 1.,
                i_clamp: 0.,
            },
            ..GripperSimConfig::default()
        };
        let mut state = ControlState::new(Box::new(finger1), Box::new(finger2), config);
        state.update(&PERIOD);
        assert_eq!(state.mode(), GripperMode::Idle);
        assert_eq!(state.snapshot().force_feedforward, [0., 0.]);
    }

    #[test]
    fn holding_commands_half_the_force_per_finger() {
        let mut finger1 = still_joint(0.015);
        let mut finger2 = still_joint(0.015);
        finger1
            .expect_set_command()
            .withf(|effort| f64::abs(effort + 15.) < 1e-9)
            .return_const(());
        finger2
            .expect_set_command()
            .withf(|effort| f64::abs(effort + 15.) < 1e-9)
            .return_const(());
        let mut state =
            ControlState::new(Box::new(finger1), Box::new(finger2), GripperSimConfig::default());
        state.mode = GripperMode::Holding;
        state.force_desired = 30.;
        state.update(&PERIOD);
        let snapshot = state.snapshot();
        assert!(snapshot.is_grasped);
        assert!(f64::abs(snapshot.grasp_force() - 30.) < 1e-9);
    }

    #[test]
    fn move_reaches_width_within_tolerance() {
        let config = GripperSimConfig::default();
        let (sim, mut state) = simulated_state(0.08, config);
        let (_, token) = state.begin(
            CommandKind::Move,
            Goal::Move {
                width: 0.02,
                speed: 0.1,
            },
        );
        assert_eq!(state.mode(), GripperMode::Moving);
        // 0.6 s of ramp plus settling
        let cycles = run_until_idle(&sim, &mut state, 2000);
        assert!(cycles < 2000);
        assert_eq!(token.peek(), Some(CommandOutcome::Succeeded));
        assert_eq!(state.mode(), GripperMode::Idle);
        assert!(f64::abs(state.width() - 0.02) <= config.tolerance_move);
        assert_eq!(state.snapshot().force_feedforward, [0., 0.]);
    }

    #[test]
    fn late_cycle_advances_ramp_by_elapsed_time() {
        let config = GripperSimConfig::default();
        let (sim, mut state) = simulated_state(0.08, config);
        let (_, token) = state.begin(
            CommandKind::Move,
            Goal::Move {
                width: 0.0,
                speed: 0.1,
            },
        );
        let late = Duration::from_millis(10);
        state.update(&late);
        sim.step(&late);
        assert!(f64::abs(state.motion.setpoint - 0.079) < 1e-9);
        assert!(!state.motion.saturated);

        run_until_idle(&sim, &mut state, 3000);
        assert_eq!(token.peek(), Some(CommandOutcome::Succeeded));
        assert!(state.width() <= config.tolerance_move);
    }

    #[test]
    fn opening_move_reaches_width() {
        let config = GripperSimConfig::default();
        let (sim, mut state) = simulated_state(0.01, config);
        let (_, token) = state.begin(
            CommandKind::Move,
            Goal::Move {
                width: 0.07,
                speed: 0.05,
            },
        );
        run_until_idle(&sim, &mut state, 3000);
        assert_eq!(token.peek(), Some(CommandOutcome::Succeeded));
        assert!(f64::abs(state.width() - 0.07) <= config.tolerance_move);
    }

    #[test]
    fn blocked_move_fails() {
        let config = GripperSimConfig::default();
        let (sim, mut state) = simulated_state(0.08, config);
        sim.place_object(Some(0.05));
        let (_, token) = state.begin(
            CommandKind::Move,
            Goal::Move {
                width: 0.02,
                speed: 0.1,
            },
        );
        run_until_idle(&sim, &mut state, 3000);
        match token.peek() {
            Some(CommandOutcome::Failed(FailureReason::WidthUnreachable { width, .. })) => {
                assert!(f64::abs(width - 0.05) < 1e-3)
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(state.mode(), GripperMode::Idle);
    }

    #[test]
    fn grasp_inside_epsilon_holds() {
        let (sim, mut state) = simulated_state(0.08, GripperSimConfig::default());
        sim.place_object(Some(0.032));
        let (_, token) = state.begin(
            CommandKind::Grasp,
            Goal::Grasp {
                width: 0.03,
                speed: 0.1,
                force: 40.,
                epsilon: GraspEpsilon::new(0.005, 0.005),
            },
        );
        run_until_idle(&sim, &mut state, 2000);
        assert_eq!(token.peek(), Some(CommandOutcome::Succeeded));
        assert_eq!(state.mode(), GripperMode::Holding);
        run(&sim, &mut state, 100);
        let snapshot = state.snapshot();
        assert!(snapshot.is_grasped);
        assert!(f64::abs(snapshot.grasp_force() - 40.) < 1e-9);
        assert!(f64::abs(snapshot.force_feedforward[0] + 20.) < 1e-9);
        assert!(f64::abs(sim.width() - 0.032) < 1e-6);
    }

    #[test]
    fn grasp_outside_epsilon_fails() {
        let (sim, mut state) = simulated_state(0.08, GripperSimConfig::default());
        sim.place_object(Some(0.05));
        let (_, token) = state.begin(
            CommandKind::Grasp,
            Goal::Grasp {
                width: 0.03,
                speed: 0.1,
                force: 40.,
                epsilon: GraspEpsilon::new(0.005, 0.005),
            },
        );
        run_until_idle(&sim, &mut state, 2000);
        match token.peek() {
            Some(CommandOutcome::Failed(FailureReason::GraspMissed { width, width_desired })) => {
                assert!(f64::abs(width - 0.05) < 1e-3);
                assert_eq!(width_desired, 0.03);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        run(&sim, &mut state, 10);
        assert_eq!(state.mode(), GripperMode::Idle);
        assert_eq!(state.snapshot().grasp_force(), 0.);
    }

    #[test]
    fn grasp_without_object_closes_and_fails() {
        let (sim, mut state) = simulated_state(0.06, GripperSimConfig::default());
        let (_, token) = state.begin(
            CommandKind::Grasp,
            Goal::Grasp {
                width: 0.03,
                speed: 0.1,
                force: 10.,
                epsilon: GraspEpsilon::default(),
            },
        );
        run_until_idle(&sim, &mut state, 3000);
        assert!(matches!(
            token.peek(),
            Some(CommandOutcome::Failed(FailureReason::GraspMissed { .. }))
        ));
        assert!(state.width() < 1e-3);
    }

    #[test]
    fn opening_grasp_stays_unresolved() {
        let (sim, mut state) = simulated_state(0.02, GripperSimConfig::default());
        let (id, token) = state.begin(
            CommandKind::Grasp,
            Goal::Grasp {
                width: 0.06,
                speed: 0.1,
                force: 10.,
                epsilon: GraspEpsilon::default(),
            },
        );
        run(&sim, &mut state, 3000);
        assert_eq!(token.peek(), None);
        assert_eq!(state.mode(), GripperMode::Grasping);
        assert!(state.cancel(id));
        assert_eq!(
            token.peek(),
            Some(CommandOutcome::Aborted(AbortReason::Canceled))
        );
        assert_eq!(state.mode(), GripperMode::Idle);
        assert!(!state.cancel(id));
    }

    #[test]
    fn homing_sweeps_open_then_closed() {
        for start in [0.0, 0.035, 0.08].iter() {
            let config = GripperSimConfig {
                homing_speed: 0.1,
                ..GripperSimConfig::default()
            };
            let (sim, mut state) = simulated_state(*start, config);
            let (_, token) = state.begin(CommandKind::Homing, Goal::Homing);
            let mut max_width: f64 = 0.;
            let mut closed_after_open = false;
            for _ in 0..5000 {
                state.update(&PERIOD);
                sim.step(&PERIOD);
                max_width = max_width.max(sim.width());
                if max_width > 0.079 && sim.width() < 0.001 {
                    closed_after_open = true;
                }
                if token.peek().is_some() {
                    break;
                }
            }
            assert_eq!(token.peek(), Some(CommandOutcome::Succeeded));
            assert_eq!(state.mode(), GripperMode::Idle);
            assert!(closed_after_open, "start width {}", start);
        }
    }

    #[test]
    fn new_command_aborts_running_one_first() {
        let (sim, mut state) = simulated_state(0.08, GripperSimConfig::default());
        let (first, token1) = state.begin(
            CommandKind::Move,
            Goal::Move {
                width: 0.0,
                speed: 0.02,
            },
        );
        run(&sim, &mut state, 100);
        let (second, token2) = state.begin(CommandKind::Homing, Goal::Homing);
        assert_ne!(first, second);
        assert_eq!(
            token1.peek(),
            Some(CommandOutcome::Aborted(AbortReason::Preempted {
                by: CommandKind::Homing
            }))
        );
        assert_eq!(token2.peek(), None);
        assert_eq!(state.mode(), GripperMode::Homing);
        assert_eq!(state.active_id(), Some(second));
    }

    #[test]
    fn stop_releases_holding_and_aborts_running() {
        let (sim, mut state) = simulated_state(0.08, GripperSimConfig::default());
        let (_, token) = state.begin(
            CommandKind::Move,
            Goal::Move {
                width: 0.0,
                speed: 0.05,
            },
        );
        run(&sim, &mut state, 10);
        state.stop();
        assert_eq!(state.mode(), GripperMode::Idle);
        assert_eq!(
            token.peek(),
            Some(CommandOutcome::Aborted(AbortReason::Preempted {
                by: CommandKind::Stop
            }))
        );

        state.mode = GripperMode::Holding;
        state.force_desired = 10.;
        state.stop();
        state.update(&PERIOD);
        assert_eq!(state.mode(), GripperMode::Idle);
        assert_eq!(state.snapshot().grasp_force(), 0.);
    }

    #[test]
    fn publishes_at_publish_rate() {
        let (sim, mut state) = simulated_state(0.04, GripperSimConfig::default());
        let (sender, receiver) = sync_channel(100);
        state.set_publisher(Some(Box::new(sender)));
        run(&sim, &mut state, 1000);
        let published: Vec<_> = receiver.try_iter().collect();
        assert!(published.len() >= 28 && published.len() <= 31);
        assert!(published.windows(2).all(|w| w[0].time < w[1].time));
        assert!(f64::abs(published[0].width - 0.04) < 1e-6);
    }
}
