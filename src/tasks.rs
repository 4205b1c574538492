// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains everything needed to describe a single task.
//!
//! A [`Task`] owns one [`TaskDefinition`] (what is measured: task function `e`, Jacobian `J`
//! and one [`TaskType`] per row) and one [`TaskDynamics`] (how fast `e` should change:
//! `e_dot_star`). Both are built from flat string parameter lists whose first token selects
//! the variant:
//!
//! | definition               | dynamics         |
//! |--------------------------|------------------|
//! | `TDefFullPose`           | `TDynFirstOrder` |
//! | `TDefJntConfig`          | `TDynJntLimits`  |
//! | `TDefJntLimits`          | `TDynMinJerk`    |
//! | `TDefGeomProj`           |                  |
//! | `TDefGeomAlign`          |                  |
//! | `TDefAvoidCollisionsSDF` |                  |
use nalgebra::{DMatrix, DVector};
use num_derive::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::distance_field::DistanceFieldProvider;
use crate::exception::{HiqpException, HiqpResult};
use crate::geometric_primitives::GeometricPrimitiveMap;
use crate::robot_state::RobotState;

mod avoid_collisions_sdf;
mod definition;
mod dynamics;
mod dynamics_jnt_limits;
mod first_order;
mod full_pose;
mod geometric_alignment;
mod geometric_projection;
mod geometry;
mod jnt_config;
mod jnt_limits;
mod minimal_jerk;
mod task;

pub use avoid_collisions_sdf::{TDefAvoidCollisionsSdf, SAFETY_DISTANCE};
pub use definition::{DefinitionVariant, TaskDefinition};
pub use dynamics::{DynamicsVariant, TaskDynamics};
pub use dynamics_jnt_limits::TDynJntLimits;
pub use first_order::TDynFirstOrder;
pub use full_pose::TDefFullPose;
pub use geometric_alignment::TDefGeomAlign;
pub use geometric_projection::TDefGeomProj;
pub use jnt_config::TDefJntConfig;
pub use jnt_limits::TDefJntLimits;
pub use minimal_jerk::TDynMinJerk;
pub use task::{Task, TaskAttributes, TaskMeasure};

/// How the solver treats one row of a task.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive, Serialize, Deserialize,
)]
pub enum TaskType {
    /// The task function must not grow faster than `e_dot_star`.
    LessOrEqual = -1,
    /// The task function should change exactly with `e_dot_star`.
    Equality = 0,
    /// The task function must not shrink faster than `e_dot_star`.
    GreaterOrEqual = 1,
}

/// Everything a task needs to look at while it is built or updated.
#[derive(Copy, Clone)]
pub struct TaskContext<'a> {
    pub robot_state: &'a RobotState,
    pub primitives: &'a GeometricPrimitiveMap,
    /// Source of collision checkers for obstacle avoidance tasks.
    pub distance_fields: Option<&'a dyn DistanceFieldProvider>,
}

impl<'a> TaskContext<'a> {
    pub fn new(robot_state: &'a RobotState, primitives: &'a GeometricPrimitiveMap) -> Self {
        TaskContext {
            robot_state,
            primitives,
            distance_fields: None,
        }
    }

    pub fn with_distance_fields(mut self, provider: &'a dyn DistanceFieldProvider) -> Self {
        self.distance_fields = Some(provider);
        self
    }
}

/// Output of a task definition for one robot state.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFunction {
    /// Task function value, one entry per row.
    pub e: DVector<f64>,
    /// Derivative of `e` with respect to the joint positions.
    pub jacobian: DMatrix<f64>,
    pub task_types: Vec<TaskType>,
    /// Additional values reported while the task is monitored.
    pub performance_measures: DVector<f64>,
}

impl TaskFunction {
    /// A function with `rows` equality rows for a robot with `n_joints` joints.
    pub fn zeros(rows: usize, n_joints: usize) -> Self {
        TaskFunction {
            e: DVector::zeros(rows),
            jacobian: DMatrix::zeros(rows, n_joints),
            task_types: vec![TaskType::Equality; rows],
            performance_measures: DVector::zeros(0),
        }
    }

    pub fn rows(&self) -> usize {
        self.e.len()
    }
}

/// Fails with InvalidParameterCount unless the parameter list (type token included) has one of
/// the allowed lengths.
pub(crate) fn check_task_parameter_count<S: AsRef<str>>(
    parameters: &[S],
    allowed: &[usize],
) -> HiqpResult<()> {
    if allowed.contains(&parameters.len()) {
        return Ok(());
    }
    Err(HiqpException::InvalidParameterCount {
        kind: type_token(parameters).to_string(),
        expected: allowed
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<String>>()
            .join(" or "),
        got: parameters.len(),
    })
}

/// Fails with InvalidParameterCount if the parameter list (type token included) is shorter than
/// `minimum`.
pub(crate) fn check_min_parameter_count<S: AsRef<str>>(
    parameters: &[S],
    minimum: usize,
) -> HiqpResult<()> {
    if parameters.len() >= minimum {
        return Ok(());
    }
    Err(HiqpException::InvalidParameterCount {
        kind: type_token(parameters).to_string(),
        expected: format!("at least {}", minimum),
        got: parameters.len(),
    })
}

fn type_token<S: AsRef<str>>(parameters: &[S]) -> &str {
    parameters.first().map(|p| p.as_ref()).unwrap_or("")
}
