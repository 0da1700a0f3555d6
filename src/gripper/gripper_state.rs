// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the franka_gripper_sim::GripperState type and its publisher.

use std::sync::mpsc::SyncSender;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::gripper::types::GripperMode;

/// Describes the gripper state.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct GripperState {
    /// Current gripper opening width. Unit: \[m\].
    pub width: f64,

    /// Maximum gripper opening width. Unit: \[m\].
    pub max_width: f64,

    /// Indicates whether an object is currently grasped.
    pub is_grasped: bool,

    /// Current control mode.
    pub mode: GripperMode,

    /// Finger joint positions. Unit: \[m\].
    pub position: [f64; 2],

    /// Finger joint velocities. Unit: \[m/s\].
    pub velocity: [f64; 2],

    /// Efforts commanded in the last control cycle. Unit: \[N\].
    pub effort: [f64; 2],

    /// Feed-forward forces commanded in the last control cycle. Negative values close the
    /// gripper. Unit: \[N\].
    pub force_feedforward: [f64; 2],

    /// Controller time, i.e. the sum of all control periods since start.
    pub time: Duration,
}

impl GripperState {
    /// Total force with which the fingers are pressed together. Unit: \[N\].
    pub fn grasp_force(&self) -> f64 {
        -(self.force_feedforward[0] + self.force_feedforward[1])
    }
}

/// Receives the gripper state at the publish rate.
///
/// Publishing happens from within the control cycle and must not block.
pub trait JointStatePublisher {
    fn publish(&mut self, state: &GripperState);
}

/// Drops the state if the channel is full or disconnected.
impl JointStatePublisher for SyncSender<GripperState> {
    fn publish(&mut self, state: &GripperState) {
        let _ = self.try_send(*state);
    }
}
