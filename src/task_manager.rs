// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the TaskManager type.
//!
//! The [`TaskManager`] owns every task and geometric primitive and turns them into joint
//! velocity controls once per control cycle. Configuration calls and the control cycle may
//! come from different threads; both take the same lock, so a cycle never sees a task or
//! primitive which is only half built.
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::distance_field::DistanceFieldProvider;
use crate::exception::{HiqpException, HiqpResult};
use crate::geometric_primitives::{GeometricPrimitive, GeometricPrimitiveMap};
use crate::robot_state::RobotState;
use crate::solver::{HierarchicalSolver, PriorityLevel, SolverConfig};
use crate::tasks::{Task, TaskAttributes, TaskContext, TaskMeasure};
use crate::visualizer::Visualizer;

/// Configuration of a [`TaskManager`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskManagerConfig {
    /// Number of joint velocity controls, must match the number of joints of the robot.
    pub n_controls: usize,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl TaskManagerConfig {
    pub fn new(n_controls: usize) -> Self {
        TaskManagerConfig {
            n_controls,
            solver: SolverConfig::default(),
        }
    }
}

/// Summary of a registered task as returned by [`TaskManager::list_all_tasks`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub name: String,
    pub attributes: TaskAttributes,
    pub def_params: Vec<String>,
    pub dyn_params: Vec<String>,
}

struct Registry {
    tasks: BTreeMap<String, Task>,
    primitives: GeometricPrimitiveMap,
    solver: HierarchicalSolver,
}

/// Maintains tasks and primitives and computes velocity controls.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use hiqp::{KinematicTree, RobotState, TaskAttributes, TaskManager, TaskManagerConfig};
/// # fn main() -> hiqp::HiqpResult<()> {
/// # let tree = KinematicTree::new("base");
/// let robot_state = RobotState::new(Arc::new(tree));
/// let manager = TaskManager::new(TaskManagerConfig::new(robot_state.num_joints()));
/// manager.set_task(
///     "home",
///     TaskAttributes::default(),
///     &["TDefFullPose"],
///     &["TDynFirstOrder", "1.0"],
///     &robot_state,
/// )?;
/// let controls = manager.velocity_controls(&robot_state)?;
/// # Ok(())
/// # }
/// ```
pub struct TaskManager {
    n_controls: usize,
    registry: Mutex<Registry>,
    distance_fields: Option<Box<dyn DistanceFieldProvider>>,
}

impl TaskManager {
    /// Creates a manager without a distance field. Obstacle avoidance tasks cannot be created.
    pub fn new(config: TaskManagerConfig) -> Self {
        TaskManager {
            n_controls: config.n_controls,
            registry: Mutex::new(Registry {
                tasks: BTreeMap::new(),
                primitives: GeometricPrimitiveMap::new(),
                solver: HierarchicalSolver::new(config.solver),
            }),
            distance_fields: None,
        }
    }

    /// Creates a manager whose obstacle avoidance tasks take their distance fields from
    /// `provider`.
    pub fn with_distance_fields(
        config: TaskManagerConfig,
        provider: Box<dyn DistanceFieldProvider>,
    ) -> Self {
        let mut manager = TaskManager::new(config);
        manager.distance_fields = Some(provider);
        manager
    }

    /// Number of joint velocity controls computed per cycle.
    pub fn n_controls(&self) -> usize {
        self.n_controls
    }

    fn lock(&self) -> MutexGuard<Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn context<'a>(
        &'a self,
        robot_state: &'a RobotState,
        primitives: &'a GeometricPrimitiveMap,
    ) -> TaskContext<'a> {
        let context = TaskContext::new(robot_state, primitives);
        match &self.distance_fields {
            Some(provider) => context.with_distance_fields(provider.as_ref()),
            None => context,
        }
    }

    fn check_robot_state(&self, robot_state: &RobotState) -> HiqpResult<()> {
        if robot_state.num_joints() != self.n_controls {
            return Err(HiqpException::DimensionMismatch {
                message: format!(
                    "the robot has {} joints but the task manager computes {} controls",
                    robot_state.num_joints(),
                    self.n_controls
                ),
            });
        }
        robot_state.check_dimensions()
    }

    /// Creates a task or rebuilds the task with the same name from scratch. The old task is
    /// only replaced if the new one could be built.
    ///
    /// # Arguments
    /// * `name` - Unique name of the task.
    /// * `attributes` - Priority and flags.
    /// * `def_params` - Definition parameters, first token is the definition type.
    /// * `dyn_params` - Dynamics parameters, first token is the dynamics type.
    /// * `robot_state` - State used to initialize the task.
    /// # Errors
    /// * DimensionMismatch if the robot does not have one joint per control.
    /// * Any error of [`Task::new`].
    pub fn set_task<S: AsRef<str>, D: AsRef<str>>(
        &self,
        name: &str,
        attributes: TaskAttributes,
        def_params: &[S],
        dyn_params: &[D],
        robot_state: &RobotState,
    ) -> HiqpResult<()> {
        self.check_robot_state(robot_state)?;
        let mut guard = self.lock();
        let Registry {
            tasks, primitives, ..
        } = &mut *guard;
        let task = Task::new(
            name,
            attributes,
            def_params,
            dyn_params,
            &self.context(robot_state, primitives),
        )
        .map_err(|error| {
            warn!(task = name, %error, "could not set task");
            error
        })?;
        primitives.remove_references(name);
        primitives.add_references(name, &task.primitive_names());
        match tasks.insert(name.to_string(), task) {
            Some(_) => info!(task = name, "replaced task"),
            None => info!(task = name, priority = attributes.priority, "added task"),
        }
        Ok(())
    }

    /// # Errors
    /// * UnknownTask if no task has this name.
    pub fn remove_task(&self, name: &str) -> HiqpResult<()> {
        let mut guard = self.lock();
        let Registry {
            tasks, primitives, ..
        } = &mut *guard;
        if tasks.remove(name).is_none() {
            return Err(unknown_task(name));
        }
        primitives.remove_references(name);
        info!(task = name, "removed task");
        Ok(())
    }

    pub fn remove_all_tasks(&self) {
        let mut guard = self.lock();
        let Registry {
            tasks, primitives, ..
        } = &mut *guard;
        for name in tasks.keys() {
            primitives.remove_references(name);
        }
        tasks.clear();
        info!("removed all tasks");
    }

    /// All tasks ordered by priority, then by name.
    pub fn list_all_tasks(&self) -> Vec<TaskInfo> {
        let guard = self.lock();
        let mut tasks: Vec<&Task> = guard.tasks.values().collect();
        tasks.sort_by_key(|task| task.priority());
        tasks
            .into_iter()
            .map(|task| TaskInfo {
                name: task.name().to_string(),
                attributes: *task.attributes(),
                def_params: task.def_params().to_vec(),
                dyn_params: task.dyn_params().to_vec(),
            })
            .collect()
    }

    fn modify_task<F: FnOnce(&mut Task)>(&self, name: &str, modify: F) -> HiqpResult<()> {
        let mut guard = self.lock();
        let task = guard.tasks.get_mut(name).ok_or_else(|| unknown_task(name))?;
        modify(task);
        debug!(task = name, attributes = ?task.attributes(), "changed task attributes");
        Ok(())
    }

    /// # Errors
    /// * UnknownTask if no task has this name.
    pub fn activate_task(&self, name: &str) -> HiqpResult<()> {
        self.modify_task(name, |task| task.set_active(true))
    }

    /// # Errors
    /// * UnknownTask if no task has this name.
    pub fn deactivate_task(&self, name: &str) -> HiqpResult<()> {
        self.modify_task(name, |task| task.set_active(false))
    }

    /// # Errors
    /// * UnknownTask if no task has this name.
    pub fn monitor_task(&self, name: &str) -> HiqpResult<()> {
        self.modify_task(name, |task| task.set_monitored(true))
    }

    /// # Errors
    /// * UnknownTask if no task has this name.
    pub fn demonitor_task(&self, name: &str) -> HiqpResult<()> {
        self.modify_task(name, |task| task.set_monitored(false))
    }

    /// Applies `modify` to every task of one priority and returns how many tasks were touched.
    fn modify_priority_level<F: FnMut(&mut Task)>(&self, priority: u32, mut modify: F) -> usize {
        let mut guard = self.lock();
        let mut count = 0;
        for task in guard.tasks.values_mut() {
            if task.priority() == priority {
                modify(task);
                count += 1;
            }
        }
        debug!(priority, count, "changed priority level");
        count
    }

    /// Removes every task of one priority.
    ///
    /// # Return
    /// Number of removed tasks.
    pub fn remove_priority_level(&self, priority: u32) -> usize {
        let mut guard = self.lock();
        let Registry {
            tasks, primitives, ..
        } = &mut *guard;
        let names: Vec<String> = tasks
            .values()
            .filter(|task| task.priority() == priority)
            .map(|task| task.name().to_string())
            .collect();
        for name in &names {
            tasks.remove(name);
            primitives.remove_references(name);
        }
        info!(priority, tasks = ?names, "removed priority level");
        names.len()
    }

    /// # Return
    /// Number of tasks of this priority.
    pub fn activate_priority_level(&self, priority: u32) -> usize {
        self.modify_priority_level(priority, |task| task.set_active(true))
    }

    /// # Return
    /// Number of tasks of this priority.
    pub fn deactivate_priority_level(&self, priority: u32) -> usize {
        self.modify_priority_level(priority, |task| task.set_active(false))
    }

    /// # Return
    /// Number of tasks of this priority.
    pub fn monitor_priority_level(&self, priority: u32) -> usize {
        self.modify_priority_level(priority, |task| task.set_monitored(true))
    }

    /// # Return
    /// Number of tasks of this priority.
    pub fn demonitor_priority_level(&self, priority: u32) -> usize {
        self.modify_priority_level(priority, |task| task.set_monitored(false))
    }

    /// Creates a primitive or replaces the primitive with the same name.
    /// See [`GeometricPrimitiveMap::set`].
    pub fn set_primitive(
        &self,
        name: &str,
        kind: &str,
        frame_id: &str,
        visible: bool,
        color: &[f64],
        parameters: &[f64],
    ) -> HiqpResult<()> {
        self.lock()
            .primitives
            .set(name, kind, frame_id, visible, color, parameters)
            .map_err(|error| {
                warn!(primitive = name, %error, "could not set primitive");
                error
            })
    }

    /// Removes a primitive which no task references.
    /// See [`GeometricPrimitiveMap::remove`].
    pub fn remove_primitive(&self, name: &str) -> HiqpResult<()> {
        self.lock().primitives.remove(name)
    }

    /// Removes every primitive no task references and returns the names of the kept ones.
    pub fn remove_all_primitives(&self) -> Vec<String> {
        self.lock().primitives.remove_all()
    }

    /// All primitives ordered by name.
    pub fn list_all_primitives(&self) -> Vec<GeometricPrimitive> {
        self.lock().primitives.list().into_iter().cloned().collect()
    }

    /// Measures of every active and monitored task, ordered by priority then name.
    /// The values are those of the latest update.
    pub fn get_task_measures(&self, robot_state: &RobotState) -> Vec<TaskMeasure> {
        let guard = self.lock();
        let mut tasks: Vec<&Task> = guard
            .tasks
            .values()
            .filter(|task| task.is_active() && task.is_monitored())
            .collect();
        tasks.sort_by_key(|task| task.priority());
        tasks
            .into_iter()
            .map(|task| task.measure(robot_state))
            .collect()
    }

    /// Pushes every visible primitive together with the pose of its link to a visualizer.
    /// Primitives whose link pose cannot be computed are skipped.
    pub fn render_primitives(&self, robot_state: &RobotState, visualizer: &mut dyn Visualizer) {
        let guard = self.lock();
        for primitive in guard.primitives.list() {
            if !primitive.is_visible() {
                continue;
            }
            match robot_state
                .kinematics()
                .pose(&robot_state.q, primitive.frame_id())
            {
                Ok(pose) => visualizer.render_primitive(primitive, &pose),
                Err(error) => {
                    warn!(primitive = primitive.name(), %error, "could not render primitive")
                }
            }
        }
    }

    /// Pushes the debug artifacts of every active and visible task to a visualizer.
    pub fn render_tasks(&self, visualizer: &mut dyn Visualizer) {
        let guard = self.lock();
        for task in guard.tasks.values().filter(|task| task.is_active()) {
            task.render(visualizer);
        }
    }

    /// Runs one control cycle: updates every active task in priority order and solves the
    /// resulting stack. Tasks which fail to update are left out of this cycle.
    ///
    /// # Errors
    /// * DimensionMismatch if the robot does not have one joint per control.
    /// * SolverInfeasible if the highest priority level cannot be solved.
    pub fn velocity_controls(&self, robot_state: &RobotState) -> HiqpResult<DVector<f64>> {
        self.check_robot_state(robot_state)?;
        let mut guard = self.lock();
        let Registry {
            tasks,
            primitives,
            solver,
        } = &mut *guard;
        let context = self.context(robot_state, primitives);
        let mut active: Vec<&mut Task> = tasks.values_mut().filter(|t| t.is_active()).collect();
        active.sort_by_key(|task| task.priority());

        let mut levels: Vec<PriorityLevel> = Vec::new();
        for task in active {
            if let Err(error) = task.update(&context) {
                warn!(task = task.name(), %error, "skipping task in this cycle");
                continue;
            }
            if levels.last().map(|level| level.priority()) != Some(task.priority()) {
                levels.push(PriorityLevel::new(task.priority(), self.n_controls));
            }
            if let Some(level) = levels.last_mut() {
                if let Err(error) =
                    level.append(task.jacobian(), task.e_dot_star(), task.task_types())
                {
                    warn!(task = task.name(), %error, "skipping task in this cycle");
                }
            }
        }
        solver.solve(&levels, self.n_controls)
    }

    /// Integer style variant of [`velocity_controls`](`Self::velocity_controls`).
    ///
    /// # Return
    /// `false` if no controls could be computed. `controls` then holds zeros and must not be
    /// applied.
    pub fn get_velocity_controls(&self, robot_state: &RobotState, controls: &mut Vec<f64>) -> bool {
        controls.clear();
        match self.velocity_controls(robot_state) {
            Ok(solution) => {
                controls.extend(solution.iter());
                true
            }
            Err(error) => {
                warn!(%error, "could not compute velocity controls");
                controls.resize(self.n_controls, 0.);
                false
            }
        }
    }
}

fn unknown_task(name: &str) -> HiqpException {
    HiqpException::UnknownTask {
        name: name.to_string(),
    }
}
