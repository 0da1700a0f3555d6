// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains a minimal finger plant for running the controller without a physics engine.
//!
//! Each finger is a point mass with viscous damping moving between zero and half of the maximum
//! width. An object can be placed between the fingers, it blocks them rigidly at half of its
//! width. This is not meant to model the real gripper, it only produces plausible joint feedback.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::joint::JointHandle;

/// Mass of a finger. \[kg\]
const FINGER_MASS: f64 = 0.015;
/// Viscous damping of a finger joint. \[N s/m\]
const FINGER_DAMPING: f64 = 0.01;
/// Largest integration step, longer periods are split.
const MAX_STEP: Duration = Duration::from_millis(1);

#[derive(Debug)]
struct FingerBody {
    position: f64,
    velocity: f64,
    effort: f64,
}

#[derive(Debug)]
struct World {
    fingers: [FingerBody; 2],
    max_position: f64,
    object_width: Option<f64>,
}

impl World {
    fn min_position(&self) -> f64 {
        self.object_width.map_or(0., |width| width / 2.)
    }

    fn integrate(&mut self, dt: f64) {
        let min_position = self.min_position();
        let max_position = self.max_position;
        for finger in self.fingers.iter_mut() {
            let acceleration = (finger.effort - FINGER_DAMPING * finger.velocity) / FINGER_MASS;
            finger.velocity += acceleration * dt;
            finger.position += finger.velocity * dt;
            if finger.position <= min_position {
                finger.position = min_position;
                finger.velocity = finger.velocity.max(0.);
            }
            if finger.position >= max_position {
                finger.position = max_position;
                finger.velocity = finger.velocity.min(0.);
            }
        }
    }
}

fn lock(world: &Mutex<World>) -> MutexGuard<'_, World> {
    world.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Two fingers sharing one simulated world.
#[derive(Debug, Clone)]
pub struct SimulatedGripper {
    world: Arc<Mutex<World>>,
}

impl SimulatedGripper {
    /// Creates a gripper at rest with both fingers at half of `width`.
    pub fn new(max_finger_width: f64, width: f64) -> Self {
        let position = width.clamp(0., max_finger_width) / 2.;
        let finger = || FingerBody {
            position,
            velocity: 0.,
            effort: 0.,
        };
        SimulatedGripper {
            world: Arc::new(Mutex::new(World {
                fingers: [finger(), finger()],
                max_position: max_finger_width / 2.,
                object_width: None,
            })),
        }
    }

    /// Joint handles of the first and the second finger.
    pub fn fingers(&self) -> (SimulatedFinger, SimulatedFinger) {
        (
            SimulatedFinger {
                world: self.world.clone(),
                index: 0,
            },
            SimulatedFinger {
                world: self.world.clone(),
                index: 1,
            },
        )
    }

    /// Places an object of the given width between the fingers, or removes it with `None`.
    ///
    /// Fingers which are already closer than the object are pushed out to its surface.
    pub fn place_object(&self, width: Option<f64>) {
        let mut world = lock(&self.world);
        world.object_width = width;
        let min_position = world.min_position();
        for finger in world.fingers.iter_mut() {
            if finger.position < min_position {
                finger.position = min_position;
                finger.velocity = 0.;
            }
        }
    }

    /// Integrates the finger dynamics over `period` with the last commanded efforts.
    pub fn step(&self, period: &Duration) {
        let mut world = lock(&self.world);
        let mut remaining = *period;
        while remaining > Duration::from_secs(0) {
            let dt = remaining.min(MAX_STEP);
            world.integrate(dt.as_secs_f64());
            remaining -= dt;
        }
    }

    /// Current opening width. \[m\]
    pub fn width(&self) -> f64 {
        let world = lock(&self.world);
        world.fingers[0].position + world.fingers[1].position
    }
}

/// Joint handle of one finger of a [`SimulatedGripper`].
#[derive(Debug, Clone)]
pub struct SimulatedFinger {
    world: Arc<Mutex<World>>,
    index: usize,
}

impl JointHandle for SimulatedFinger {
    fn position(&self) -> f64 {
        lock(&self.world).fingers[self.index].position
    }
    fn velocity(&self) -> f64 {
        lock(&self.world).fingers[self.index].velocity
    }
    fn set_command(&mut self, effort: f64) {
        lock(&self.world).fingers[self.index].effort = effort;
    }
}

#[cfg(test)]
mod tests {
    use crate::joint::JointHandle;
    use crate::simulation::SimulatedGripper;
    use std::time::Duration;

    #[test]
    fn constant_effort_accelerates_finger() {
        let sim = SimulatedGripper::new(0.08, 0.04);
        let (mut finger1, finger2) = sim.fingers();
        finger1.set_command(0.01);
        sim.step(&Duration::from_millis(10));
        assert!(finger1.velocity() > 0.);
        assert!(finger1.position() > 0.02);
        assert_eq!(finger2.position(), 0.02);
    }

    #[test]
    fn joint_limits_stop_fingers() {
        let sim = SimulatedGripper::new(0.08, 0.04);
        let (mut finger1, mut finger2) = sim.fingers();
        finger1.set_command(10.);
        finger2.set_command(-10.);
        sim.step(&Duration::from_millis(500));
        assert_eq!(finger1.position(), 0.04);
        assert_eq!(finger1.velocity(), 0.);
        assert_eq!(finger2.position(), 0.);
        assert_eq!(finger2.velocity(), 0.);
    }

    #[test]
    fn object_blocks_closing_fingers() {
        let sim = SimulatedGripper::new(0.08, 0.08);
        sim.place_object(Some(0.03));
        let (mut finger1, mut finger2) = sim.fingers();
        finger1.set_command(-5.);
        finger2.set_command(-5.);
        sim.step(&Duration::from_millis(500));
        assert!(f64::abs(sim.width() - 0.03) < 1e-12);
        assert_eq!(finger1.velocity(), 0.);

        sim.place_object(Some(0.05));
        assert!(f64::abs(sim.width() - 0.05) < 1e-12);
    }
}
