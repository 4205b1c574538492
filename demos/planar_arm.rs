// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use nalgebra::{Isometry3, Vector3};

use hiqp::{
    prepare_control_thread, HiqpResult, JointType, KinematicTree, RealtimeConfig, RobotState,
    TaskAttributes, TaskManager, TaskManagerConfig,
};

/// A simulated two link planar arm which reaches for a target point while its end effector
/// stays above a floor plane and its first joint stays inside its limits.
#[derive(Parser, Debug)]
#[clap(author, version, name = "planar_arm")]
struct CommandLineArguments {
    /// x coordinate of the target in the base frame
    #[clap(long, default_value_t = 0.5)]
    pub target_x: f64,
    /// y coordinate of the target in the base frame
    #[clap(long, default_value_t = 1.0)]
    pub target_y: f64,
    /// gain of the reaching task
    #[clap(long, default_value_t = 2.0)]
    pub lambda: f64,
    /// number of simulated control cycles of 1 ms
    #[clap(long, default_value_t = 3000)]
    pub cycles: usize,
    /// switch the control thread to realtime scheduling
    #[clap(long, action)]
    pub realtime: bool,
}

fn planar_arm() -> HiqpResult<KinematicTree> {
    let mut tree = KinematicTree::new("base");
    tree.add_link(
        "link1",
        "base",
        JointType::Revolute,
        Isometry3::identity(),
        Vector3::z(),
    )?;
    tree.add_link(
        "link2",
        "link1",
        JointType::Revolute,
        Isometry3::translation(1., 0., 0.),
        Vector3::z(),
    )?;
    tree.add_link(
        "ee",
        "link2",
        JointType::Fixed,
        Isometry3::translation(0.5, 0., 0.),
        Vector3::zeros(),
    )?;
    Ok(tree)
}

fn main() -> HiqpResult<()> {
    let args = CommandLineArguments::parse();
    prepare_control_thread(match args.realtime {
        true => RealtimeConfig::Enforce,
        false => RealtimeConfig::Ignore,
    })?;

    let mut robot_state = RobotState::new(Arc::new(planar_arm()?));
    robot_state.sampling_time = Duration::from_millis(1);
    robot_state.set_positions(&[0.5, -0.3])?;
    let manager = TaskManager::new(TaskManagerConfig::new(robot_state.num_joints()));

    manager.set_primitive("ee_point", "point", "ee", true, &[1., 0., 0., 1.], &[0., 0., 0.])?;
    manager.set_primitive(
        "target",
        "point",
        "base",
        true,
        &[0., 1., 0., 1.],
        &[args.target_x, args.target_y, 0.],
    )?;
    manager.set_primitive("floor", "plane", "base", true, &[0.5, 0.5, 0.5, 1.], &[0., 1., 0., -0.2])?;

    manager.set_task(
        "joint_limits",
        TaskAttributes {
            priority: 0,
            ..TaskAttributes::default()
        },
        &["TDefJntLimits", "link1", "-1.5", "1.5"],
        &["TDynJntLimits", "10.0", "1.0"],
        &robot_state,
    )?;
    manager.set_task(
        "above_floor",
        TaskAttributes {
            priority: 1,
            ..TaskAttributes::default()
        },
        &["TDefGeomProj", "point", "plane", "ee_point > floor"],
        &["TDynFirstOrder", "5.0"],
        &robot_state,
    )?;
    manager.set_task(
        "reach",
        TaskAttributes {
            priority: 2,
            ..TaskAttributes::default()
        },
        &["TDefGeomProj", "point", "point", "ee_point = target"],
        &["TDynFirstOrder", args.lambda.to_string().as_str()],
        &robot_state,
    )?;

    let mut controls = Vec::new();
    let dt = robot_state.sampling_time.as_secs_f64();
    for cycle in 0..args.cycles {
        if !manager.get_velocity_controls(&robot_state, &mut controls) {
            println!("no controls in cycle {}, stopping", cycle);
            break;
        }
        robot_state.set_velocities(&controls)?;
        let q: Vec<f64> = robot_state
            .q
            .iter()
            .zip(controls.iter())
            .map(|(q, dq)| q + dq * dt)
            .collect();
        robot_state.set_positions(&q)?;
        if cycle % 500 == 0 {
            for measure in manager.get_task_measures(&robot_state) {
                println!("{:>5} {:<12} e = {:?}", cycle, measure.task_name, measure.e);
            }
        }
    }
    println!("final joint positions: {:?}", robot_state.q.as_slice());
    Ok(())
}
