// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! # franka-gripper-sim
//! franka-gripper-sim simulates the controller of the [Franka Emika](https://franka.de) gripper on
//! top of two effort controlled finger joints. It offers the same commands as the real gripper
//! (homing, move, grasp and stop) plus a generic position/effort command, and turns them into
//! finger efforts in a fixed-rate control cycle.
//!
//! ## Design
//! The library is divided into these modules:
//! * [gripper](`crate::gripper`) - the [`GripperSim`] type, its commands and the control cycle.
//! * [joint](`crate::joint`) - the [`JointHandle`] trait through which fingers are actuated.
//! * [config](`crate::config`) - parameters which are read once at start.
//! * [simulation](`crate::simulation`) - a minimal finger plant for running without a physics engine.
//! * [control_loop](`crate::control_loop`) - a thread which drives the control cycle.
//!
//! All state of the controller lives behind a single lock. The control cycle takes the lock once
//! per period, while every command takes it only to replace the targets and then waits for its
//! outcome without holding it. Starting a command aborts the one which is currently running.
//!
//! # Example:
//!```no_run
//! use std::time::Duration;
//! use franka_gripper_sim::{
//!     CommandOutcome, ControlLoop, GripperResult, GripperSim, GripperSimConfig, RealtimeConfig,
//!     SimulatedGripper,
//! };
//! fn main() -> GripperResult<()> {
//!     let sim = SimulatedGripper::new(0.08, 0.08);
//!     sim.place_object(Some(0.03));
//!     let (finger1, finger2) = sim.fingers();
//!     let gripper = GripperSim::new(finger1, finger2, GripperSimConfig::default())?;
//!     let controller = gripper.clone();
//!     let _control_loop = ControlLoop::spawn(
//!         Duration::from_millis(1),
//!         RealtimeConfig::Ignore,
//!         move |period| {
//!             controller.update(period);
//!             sim.step(period);
//!         },
//!     )?;
//!     if gripper.grasp(0.03, 0.1, 20., None)? == CommandOutcome::Succeeded {
//!         println!("grasped with {} N", gripper.read_once().grasp_force());
//!     }
//!     gripper.stop()?;
//!     Ok(())
//! }
//! ```
//! The control cycle is driven by [`GripperSim::update`], here from a [`ControlLoop`] which also
//! steps the simulated fingers. Every command call blocks until the control cycle reports its
//! outcome.
pub mod config;
pub mod control_loop;
pub mod exception;
pub mod gripper;
pub mod joint;
pub mod simulation;
pub mod utils;

pub use config::GripperSimConfig;
pub use config::PidGains;
pub use config::{MAX_FINGER_WIDTH, MAX_SPEED_SAMPLES};
pub use control_loop::ControlLoop;
pub use control_loop::RealtimeConfig;
pub use exception::GripperException;
pub use exception::GripperResult;
pub use gripper::gripper_state::GripperState;
pub use gripper::gripper_state::JointStatePublisher;
pub use gripper::types::*;
pub use gripper::CommandHandle;
pub use gripper::GripperSim;
pub use joint::JointHandle;
pub use simulation::SimulatedFinger;
pub use simulation::SimulatedGripper;
