// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later
use clap::Parser;
use franka_gripper_sim::{
    ControlLoop, GripperResult, GripperSim, GripperSimConfig, RealtimeConfig, SimulatedGripper,
};
use std::time::Duration;

/// An example showing how to grasp an object with the simulated gripper.
#[derive(Parser, Debug)]
#[clap(author, version, name = "grasp_object")]
struct CommandLineArguments {
    /// Width of the object in meter
    pub object_width: f64,
    /// Perform homing before grasping
    #[clap(long)]
    pub homing: bool,
    /// Run the control thread with realtime priority
    #[clap(long)]
    pub realtime: bool,
}

fn main() -> GripperResult<()> {
    env_logger::init();
    let args: CommandLineArguments = CommandLineArguments::parse();
    let config = GripperSimConfig::default();
    let sim = SimulatedGripper::new(config.max_finger_width, config.max_finger_width);
    let (finger1, finger2) = sim.fingers();
    let gripper = GripperSim::new(finger1, finger2, config)?;
    let realtime = if args.realtime {
        RealtimeConfig::Enforce
    } else {
        RealtimeConfig::Ignore
    };
    let control_loop = {
        let gripper = gripper.clone();
        let sim = sim.clone();
        ControlLoop::spawn(Duration::from_millis(1), realtime, move |period| {
            gripper.update(period);
            sim.step(period);
        })?
    };

    if args.homing {
        println!("homing: {}", gripper.homing()?);
    }
    let state = gripper.read_once();
    if state.max_width < args.object_width {
        eprintln!("Object is too large for the current fingers on the gripper.");
        std::process::exit(-1);
    }
    sim.place_object(Some(args.object_width));
    let outcome = gripper.grasp(args.object_width, 0.1, 60., None)?;
    println!("grasp: {}", outcome);
    std::thread::sleep(Duration::from_secs(3));
    let state = gripper.read_once();
    if !state.is_grasped {
        eprintln!("Object lost");
        std::process::exit(-1);
    }
    println!(
        "Grasped object at {:.4} m with {:.1} N, will release it now.",
        state.width,
        state.grasp_force()
    );
    gripper.stop()?;
    control_loop.stop();
    Ok(())
}
