// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later
use clap::Parser;
use franka_gripper_sim::{
    ControlLoop, GripperResult, GripperSim, GripperSimConfig, GripperState, RealtimeConfig,
    SimulatedGripper,
};
use std::path::PathBuf;
use std::sync::mpsc::sync_channel;
use std::time::Duration;

/// An example which homes the simulated gripper, moves it through a list of widths and prints
/// the published joint states.
#[derive(Parser, Debug)]
#[clap(author, version, name = "gripper_sweep")]
struct CommandLineArguments {
    /// TOML file with the gripper parameters
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Speed of the moves in meter per second
    #[clap(long, default_value_t = 0.05)]
    pub speed: f64,
    /// Widths to move to in meter
    #[clap(default_values_t = vec![0.06, 0.02, 0.08])]
    pub widths: Vec<f64>,
}

fn main() -> GripperResult<()> {
    env_logger::init();
    let args: CommandLineArguments = CommandLineArguments::parse();
    let config = match &args.config {
        Some(path) => GripperSimConfig::from_file(path)?,
        None => GripperSimConfig::default(),
    };
    let sim = SimulatedGripper::new(config.max_finger_width, 0.);
    let (finger1, finger2) = sim.fingers();
    let gripper = GripperSim::new(finger1, finger2, config)?;
    let (sender, receiver) = sync_channel::<GripperState>(64);
    gripper.set_publisher(sender);
    let printer = std::thread::spawn(move || {
        for state in receiver.iter() {
            println!(
                "{:>8.3} s  {:?}  width {:.4} m  effort [{:.3}, {:.3}] N",
                state.time.as_secs_f64(),
                state.mode,
                state.width,
                state.effort[0],
                state.effort[1]
            );
        }
    });

    let control_loop = {
        let gripper = gripper.clone();
        ControlLoop::spawn(Duration::from_millis(1), RealtimeConfig::Ignore, move |period| {
            gripper.update(period);
            sim.step(period);
        })?
    };
    println!("homing: {}", gripper.homing()?);
    for width in args.widths.iter() {
        println!("move to {:.4} m: {}", width, gripper.move_gripper(*width, args.speed)?);
    }
    control_loop.stop();
    // the publisher is dropped with the last gripper handle, which ends the printer
    drop(gripper);
    let _ = printer.join();
    Ok(())
}
