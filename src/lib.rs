// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! # hiqp
//! hiqp is a library for hierarchical task-priority velocity control of articulated robots.
//! Every control cycle it turns a stack of prioritized tasks into joint velocity controls by
//! solving one small quadratic program per priority level.
//!
//! **ALWAYS HAVE THE USER STOP BUTTON AT
//! HAND WHILE CONTROLLING A ROBOT!**
//!
//!
//! ## Design
//! The library is divided into these main modules:
//! * [geometric_primitives](`crate::geometric_primitives`) - named points, lines, planes, boxes,
//!   cylinders, spheres and frames attached to links of the robot.
//! * [tasks](`crate::tasks`) - task definitions (what is measured) and task dynamics (how fast it
//!   should converge).
//! * [solver](`crate::solver`) - the hierarchical least-squares solver.
//! * [task_manager](`crate::task_manager`) - owns tasks and primitives and runs the control cycle.
//!
//! Forward kinematics, distance fields and visualization are provided by the caller through the
//! [`KinematicModel`], [`DistanceFieldProvider`] and [`Visualizer`] traits.
//!
//! # Example:
//!```no_run
//! use std::sync::Arc;
//! use nalgebra::{Isometry3, Vector3};
//! use hiqp::{
//!     HiqpResult, JointType, KinematicTree, RobotState, TaskAttributes, TaskManager,
//!     TaskManagerConfig,
//! };
//! fn main() -> HiqpResult<()> {
//!     let mut tree = KinematicTree::new("base");
//!     tree.add_link("link1", "base", JointType::Revolute, Isometry3::identity(), Vector3::z())?;
//!     tree.add_link("link2", "link1", JointType::Revolute, Isometry3::translation(1., 0., 0.), Vector3::z())?;
//!     tree.add_link("ee", "link2", JointType::Fixed, Isometry3::translation(0.5, 0., 0.), Vector3::zeros())?;
//!     let mut robot_state = RobotState::new(Arc::new(tree));
//!     robot_state.set_positions(&[0.5, -0.3])?;
//!
//!     let manager = TaskManager::new(TaskManagerConfig::new(robot_state.num_joints()));
//!     manager.set_primitive("ee_point", "point", "ee", true, &[1., 0., 0., 1.], &[0., 0., 0.])?;
//!     manager.set_primitive("target", "point", "base", true, &[0., 1., 0., 1.], &[0.5, 1., 0.])?;
//!     manager.set_task(
//!         "reach",
//!         TaskAttributes { priority: 1, ..TaskAttributes::default() },
//!         &["TDefGeomProj", "point", "point", "ee_point = target"],
//!         &["TDynFirstOrder", "2.0"],
//!         &robot_state,
//!     )?;
//!     for _ in 0..1000 {
//!         let dq = manager.velocity_controls(&robot_state)?;
//!         let dt = robot_state.sampling_time.as_secs_f64();
//!         robot_state.q += &dq * dt;
//!         robot_state.dq = dq;
//!     }
//!     Ok(())
//! }
//!   ```
//!
//! All configuration calls return a [`HiqpResult`]. Callers which need the integer status
//! codes of a service interface can convert any result with [`status_code`]:
//!
//!```no_run
//! # use std::sync::Arc;
//! # use hiqp::{status_code, KinematicTree, RobotState, TaskManager, TaskManagerConfig};
//! # let robot_state = RobotState::new(Arc::new(KinematicTree::new("base")));
//! # let manager = TaskManager::new(TaskManagerConfig::new(0));
//! let code = status_code(&manager.remove_task("reach"));
//! assert_eq!(code, -3);
//! ```
//!
//! Tasks are defined by two string lists. The first token of each list selects the definition
//! or dynamics type, the remaining tokens are type specific, see [`tasks`].
//! Within one priority level all rows are solved together in the least-squares sense. A level
//! can only use the freedom the levels with lower priority numbers leave over.
pub mod control_tools;
pub mod distance_field;
pub mod exception;
pub mod geometric_primitives;
pub mod kinematics;
pub mod robot_state;
pub mod solver;
pub mod task_manager;
pub mod tasks;
pub mod utils;
pub mod visualizer;

pub use control_tools::{prepare_control_thread, RealtimeConfig};
pub use distance_field::{DistanceField, DistanceFieldProvider, ScopedDistanceField};
pub use exception::{status_code, HiqpException, HiqpResult, StatusCode};
pub use geometric_primitives::{GeometricPrimitive, GeometricPrimitiveMap, PrimitiveKind};
pub use kinematics::{JointType, KinematicModel, KinematicTree};
pub use robot_state::RobotState;
pub use solver::{HierarchicalSolver, PriorityLevel, SolverConfig};
pub use task_manager::{TaskInfo, TaskManager, TaskManagerConfig};
pub use tasks::{Task, TaskAttributes, TaskMeasure, TaskType};
pub use visualizer::Visualizer;
