// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the Task type.
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::exception::{invalid_parameter, HiqpException, HiqpResult};
use crate::robot_state::RobotState;
use crate::tasks::{TaskContext, TaskDefinition, TaskDynamics, TaskFunction, TaskType};
use crate::visualizer::Visualizer;

/// Attributes of a task which do not depend on its definition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAttributes {
    /// Lower numbers are solved first and cannot be disturbed by higher numbers.
    pub priority: u32,
    /// Inactive tasks are not updated and do not contribute to the controls.
    pub active: bool,
    /// Visible tasks push debug artifacts to a visualizer.
    pub visible: bool,
    /// Monitored tasks report [`TaskMeasure`]s.
    pub monitored: bool,
}

impl Default for TaskAttributes {
    fn default() -> Self {
        TaskAttributes {
            priority: 1,
            active: true,
            visible: true,
            monitored: true,
        }
    }
}

/// Monitoring data of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMeasure {
    pub task_name: String,
    /// Task function value.
    pub e: Vec<f64>,
    /// Rate of change of the task function, `J * dq`.
    pub de: Vec<f64>,
    /// Desired rate of change of the task function.
    pub e_dot_star: Vec<f64>,
    /// Performance measures of the definition.
    pub pm: Vec<f64>,
}

/// One prioritized control objective: a definition (what is measured) and dynamics (how fast it
/// should converge).
#[derive(Debug)]
pub struct Task {
    name: String,
    attributes: TaskAttributes,
    def_params: Vec<String>,
    dyn_params: Vec<String>,
    definition: TaskDefinition,
    dynamics: TaskDynamics,
}

impl Task {
    /// Builds a task. Definition and dynamics are created from scratch; nothing is created if
    /// any step fails.
    ///
    /// # Arguments
    /// * `name` - Unique name of the task.
    /// * `attributes` - Priority and flags.
    /// * `def_params` - Definition parameters, e.g. `["TDefFullPose"]`.
    /// * `dyn_params` - Dynamics parameters, e.g. `["TDynFirstOrder", "1.0"]`.
    /// * `context` - Robot state and primitives used for the initial evaluation.
    /// # Errors
    /// * EmptyDefParams or EmptyDynParams if a parameter list is empty.
    /// * UnknownTaskType if a type token is unknown.
    /// * DimensionMismatch if definition and dynamics disagree about the number of rows.
    /// * Any error of the selected definition or dynamics.
    pub fn new<S: AsRef<str>, D: AsRef<str>>(
        name: &str,
        attributes: TaskAttributes,
        def_params: &[S],
        dyn_params: &[D],
        context: &TaskContext,
    ) -> HiqpResult<Self> {
        if def_params.is_empty() {
            return Err(HiqpException::EmptyDefParams);
        }
        if dyn_params.is_empty() {
            return Err(HiqpException::EmptyDynParams);
        }
        if name.is_empty() {
            return Err(invalid_parameter("task name must not be empty"));
        }
        let definition = TaskDefinition::initialize(def_params, context)?;
        let dynamics =
            TaskDynamics::initialize(dyn_params, definition.e_initial(), definition.e_final())?;
        let task = Task {
            name: name.to_string(),
            attributes,
            def_params: def_params.iter().map(|p| p.as_ref().to_string()).collect(),
            dyn_params: dyn_params.iter().map(|p| p.as_ref().to_string()).collect(),
            definition,
            dynamics,
        };
        task.check_consistency(context.robot_state.num_joints())?;
        Ok(task)
    }

    /// Updates definition and dynamics for the current robot state. Inactive tasks are left
    /// untouched.
    ///
    /// # Errors
    /// * Any error of the definition or dynamics update.
    /// * DimensionMismatch if the updated quantities disagree in size.
    pub fn update(&mut self, context: &TaskContext) -> HiqpResult<()> {
        if !self.attributes.active {
            return Ok(());
        }
        self.definition.update(context)?;
        self.dynamics.update(
            context.robot_state,
            self.definition.e(),
            self.definition.jacobian(),
        )?;
        self.check_consistency(context.robot_state.num_joints())
    }

    /// Checks that `e`, `J`, the task types and `e_dot_star` have one row each per task
    /// function row and that `J` has one column per joint.
    ///
    /// # Errors
    /// * DimensionMismatch naming the two quantities which disagree.
    pub fn check_consistency(&self, n_joints: usize) -> HiqpResult<()> {
        check_dimensions(
            self.definition.function(),
            self.dynamics.e_dot_star(),
            n_joints,
        )
        .map_err(|error| match error {
            HiqpException::DimensionMismatch { message } => HiqpException::DimensionMismatch {
                message: format!("task '{}': {}", self.name, message),
            },
            other => other,
        })
    }

    /// Monitoring data for the current robot state.
    pub fn measure(&self, robot_state: &RobotState) -> TaskMeasure {
        let jacobian = self.definition.jacobian();
        let de = if jacobian.ncols() == robot_state.dq.len() {
            jacobian * &robot_state.dq
        } else {
            DVector::zeros(jacobian.nrows())
        };
        TaskMeasure {
            task_name: self.name.clone(),
            e: self.definition.e().as_slice().to_vec(),
            de: de.as_slice().to_vec(),
            e_dot_star: self.dynamics.e_dot_star().as_slice().to_vec(),
            pm: self.definition.performance_measures().as_slice().to_vec(),
        }
    }

    /// Pushes debug artifacts of visible tasks to a visualizer.
    pub fn render(&self, visualizer: &mut dyn Visualizer) {
        if self.attributes.visible {
            self.definition.render(&self.name, visualizer);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &TaskAttributes {
        &self.attributes
    }

    pub fn priority(&self) -> u32 {
        self.attributes.priority
    }

    pub fn is_active(&self) -> bool {
        self.attributes.active
    }

    pub fn is_visible(&self) -> bool {
        self.attributes.visible
    }

    pub fn is_monitored(&self) -> bool {
        self.attributes.monitored
    }

    pub fn set_active(&mut self, active: bool) {
        self.attributes.active = active;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.attributes.visible = visible;
    }

    pub fn set_monitored(&mut self, monitored: bool) {
        self.attributes.monitored = monitored;
    }

    pub fn def_params(&self) -> &[String] {
        &self.def_params
    }

    pub fn dyn_params(&self) -> &[String] {
        &self.dyn_params
    }

    pub fn definition(&self) -> &TaskDefinition {
        &self.definition
    }

    pub fn dynamics(&self) -> &TaskDynamics {
        &self.dynamics
    }

    pub fn e(&self) -> &DVector<f64> {
        self.definition.e()
    }

    pub fn jacobian(&self) -> &DMatrix<f64> {
        self.definition.jacobian()
    }

    pub fn task_types(&self) -> &[TaskType] {
        self.definition.task_types()
    }

    pub fn e_dot_star(&self) -> &DVector<f64> {
        self.dynamics.e_dot_star()
    }

    /// Names of the geometric primitives the task refers to.
    pub fn primitive_names(&self) -> Vec<String> {
        self.definition.primitive_names()
    }
}

fn check_dimensions(
    function: &TaskFunction,
    e_dot_star: &DVector<f64>,
    n_joints: usize,
) -> HiqpResult<()> {
    let mismatch = |first: &str, first_len: usize, second: &str, second_len: usize| {
        Err(HiqpException::DimensionMismatch {
            message: format!(
                "{} has size {} but {} has size {}",
                first, first_len, second, second_len
            ),
        })
    };
    let rows = function.e.len();
    if function.jacobian.nrows() != rows {
        return mismatch("e", rows, "rows of J", function.jacobian.nrows());
    }
    if function.task_types.len() != rows {
        return mismatch("e", rows, "task_types", function.task_types.len());
    }
    if e_dot_star.len() != rows {
        return mismatch("e", rows, "e_dot_star", e_dot_star.len());
    }
    if function.jacobian.ncols() != n_joints {
        return mismatch(
            "columns of J",
            function.jacobian.ncols(),
            "joints of the robot",
            n_joints,
        );
    }
    Ok(())
}
