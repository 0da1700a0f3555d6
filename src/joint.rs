// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the [`JointHandle`] trait through which the controller talks to a finger joint.

#[cfg(test)]
use mockall::automock;

/// Effort controlled finger joint.
///
/// Positions are measured from the center of the gripper, so the opening width of the gripper
/// is the sum of both finger positions. Implementations are provided by whatever owns the
/// physics, e.g. [`SimulatedFinger`](`crate::simulation::SimulatedFinger`).
#[cfg_attr(test, automock)]
pub trait JointHandle {
    /// Current joint position. \[m\]
    fn position(&self) -> f64;
    /// Current joint velocity. \[m/s\]
    fn velocity(&self) -> f64;
    /// Sets the effort command for the next simulation step. \[N\]
    fn set_command(&mut self, effort: f64);
}

impl<T: JointHandle + ?Sized> JointHandle for Box<T> {
    fn position(&self) -> f64 {
        (**self).position()
    }
    fn velocity(&self) -> f64 {
        (**self).velocity()
    }
    fn set_command(&mut self, effort: f64) {
        (**self).set_command(effort)
    }
}
