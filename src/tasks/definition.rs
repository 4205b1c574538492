// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the TaskDefinition type.
use nalgebra::{DMatrix, DVector};

use crate::exception::{HiqpException, HiqpResult};
use crate::tasks::{
    TDefAvoidCollisionsSdf, TDefFullPose, TDefGeomAlign, TDefGeomProj, TDefJntConfig,
    TDefJntLimits, TaskContext, TaskFunction, TaskType,
};
use crate::utils::mask_columns;
use crate::visualizer::Visualizer;

/// All task definitions, selected by the first token of the definition parameters.
#[derive(Debug)]
pub enum DefinitionVariant {
    FullPose(TDefFullPose),
    JntConfig(TDefJntConfig),
    JntLimits(TDefJntLimits),
    GeomProj(TDefGeomProj),
    GeomAlign(TDefGeomAlign),
    AvoidCollisionsSdf(TDefAvoidCollisionsSdf),
}

impl DefinitionVariant {
    fn parse<S: AsRef<str>>(parameters: &[S], context: &TaskContext) -> HiqpResult<Self> {
        let name = parameters
            .first()
            .ok_or(HiqpException::EmptyDefParams)?
            .as_ref();
        Ok(match name {
            TDefFullPose::NAME => {
                DefinitionVariant::FullPose(TDefFullPose::init(parameters, context)?)
            }
            TDefJntConfig::NAME => {
                DefinitionVariant::JntConfig(TDefJntConfig::init(parameters, context)?)
            }
            TDefJntLimits::NAME => {
                DefinitionVariant::JntLimits(TDefJntLimits::init(parameters, context)?)
            }
            TDefGeomProj::NAME => {
                DefinitionVariant::GeomProj(TDefGeomProj::init(parameters, context)?)
            }
            TDefGeomAlign::NAME => {
                DefinitionVariant::GeomAlign(TDefGeomAlign::init(parameters, context)?)
            }
            TDefAvoidCollisionsSdf::NAME => DefinitionVariant::AvoidCollisionsSdf(
                TDefAvoidCollisionsSdf::init(parameters, context)?,
            ),
            _ => {
                return Err(HiqpException::UnknownTaskType {
                    name: name.to_string(),
                })
            }
        })
    }

    /// Type name used in parameter lists.
    pub fn name(&self) -> &'static str {
        match self {
            DefinitionVariant::FullPose(_) => TDefFullPose::NAME,
            DefinitionVariant::JntConfig(_) => TDefJntConfig::NAME,
            DefinitionVariant::JntLimits(_) => TDefJntLimits::NAME,
            DefinitionVariant::GeomProj(_) => TDefGeomProj::NAME,
            DefinitionVariant::GeomAlign(_) => TDefGeomAlign::NAME,
            DefinitionVariant::AvoidCollisionsSdf(_) => TDefAvoidCollisionsSdf::NAME,
        }
    }

    fn dimension(&self) -> usize {
        match self {
            DefinitionVariant::FullPose(definition) => definition.dimension(),
            DefinitionVariant::JntConfig(_) => 1,
            DefinitionVariant::JntLimits(definition) => definition.dimension(),
            DefinitionVariant::GeomProj(definition) => definition.dimension(),
            DefinitionVariant::GeomAlign(definition) => definition.dimension(),
            DefinitionVariant::AvoidCollisionsSdf(definition) => definition.dimension(),
        }
    }

    fn update(&mut self, context: &TaskContext, function: &mut TaskFunction) -> HiqpResult<()> {
        match self {
            DefinitionVariant::FullPose(definition) => definition.update(context, function),
            DefinitionVariant::JntConfig(definition) => definition.update(context, function),
            DefinitionVariant::JntLimits(definition) => definition.update(context, function),
            DefinitionVariant::GeomProj(definition) => definition.update(context, function),
            DefinitionVariant::GeomAlign(definition) => definition.update(context, function),
            DefinitionVariant::AvoidCollisionsSdf(definition) => {
                definition.update(context, function)
            }
        }
    }

    fn primitive_names(&self) -> Vec<String> {
        match self {
            DefinitionVariant::GeomProj(definition) => definition.primitive_names(),
            DefinitionVariant::GeomAlign(definition) => definition.primitive_names(),
            DefinitionVariant::AvoidCollisionsSdf(definition) => definition.primitive_names(),
            _ => Vec::new(),
        }
    }
}

/// Computes the task function, its Jacobian and the row types of one task.
#[derive(Debug)]
pub struct TaskDefinition {
    variant: DefinitionVariant,
    function: TaskFunction,
    e_initial: DVector<f64>,
    e_final: DVector<f64>,
}

impl TaskDefinition {
    /// Builds a definition from its parameters and evaluates it once for the current robot
    /// state, which yields the initial task function value.
    ///
    /// # Errors
    /// * EmptyDefParams if `parameters` is empty.
    /// * UnknownTaskType if the first token is not a definition type.
    /// * Any error of the selected definition type.
    pub fn initialize<S: AsRef<str>>(parameters: &[S], context: &TaskContext) -> HiqpResult<Self> {
        let variant = DefinitionVariant::parse(parameters, context)?;
        let rows = variant.dimension();
        let mut definition = TaskDefinition {
            function: TaskFunction::zeros(rows, context.robot_state.num_joints()),
            variant,
            e_initial: DVector::zeros(rows),
            e_final: DVector::zeros(rows),
        };
        definition.update(context)?;
        definition.e_initial = definition.function.e.clone();
        Ok(definition)
    }

    /// Recomputes the task function for the current robot state. Jacobian columns of
    /// non-writable joints are zero afterwards.
    ///
    /// # Errors
    /// * DimensionMismatch if the joint positions of the robot state have the wrong length.
    /// * KinematicsFailure, CollisionCheckFailure or UnresolvedPrimitiveReference if the
    ///   function cannot be evaluated.
    pub fn update(&mut self, context: &TaskContext) -> HiqpResult<()> {
        context.robot_state.check_dimensions()?;
        self.variant.update(context, &mut self.function)?;
        mask_columns(&mut self.function.jacobian, context.robot_state.writable());
        Ok(())
    }

    pub fn variant(&self) -> &DefinitionVariant {
        &self.variant
    }

    pub fn function(&self) -> &TaskFunction {
        &self.function
    }

    pub fn e(&self) -> &DVector<f64> {
        &self.function.e
    }

    pub fn jacobian(&self) -> &DMatrix<f64> {
        &self.function.jacobian
    }

    pub fn task_types(&self) -> &[TaskType] {
        &self.function.task_types
    }

    pub fn performance_measures(&self) -> &DVector<f64> {
        &self.function.performance_measures
    }

    /// Task function value right after initialization.
    pub fn e_initial(&self) -> &DVector<f64> {
        &self.e_initial
    }

    /// Value the task function converges to.
    pub fn e_final(&self) -> &DVector<f64> {
        &self.e_final
    }

    /// Names of the geometric primitives the definition refers to.
    pub fn primitive_names(&self) -> Vec<String> {
        self.variant.primitive_names()
    }

    /// Pushes debug artifacts of the last update to a visualizer.
    pub fn render(&self, task: &str, visualizer: &mut dyn Visualizer) {
        if let DefinitionVariant::AvoidCollisionsSdf(definition) = &self.variant {
            definition.render(task, visualizer);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::exception::HiqpException;
    use crate::geometric_primitives::GeometricPrimitiveMap;
    use crate::distance_field::{DistanceField, MockDistanceField, MockDistanceFieldProvider};
    use crate::tasks::test_utils::{params, planar_arm, state, COLOR};
    use crate::tasks::{TaskContext, TaskDefinition, TaskType};
    use nalgebra::Vector3;

    #[test]
    fn first_token_selects_the_variant() {
        let robot_state = state(planar_arm(), &[0.5, -0.3]);
        let primitives = GeometricPrimitiveMap::new();
        let context = TaskContext::new(&robot_state, &primitives);
        let definition =
            TaskDefinition::initialize(&params(&["TDefFullPose"]), &context).unwrap();
        assert_eq!(definition.variant().name(), "TDefFullPose");
        assert_eq!(definition.e_initial().as_slice(), &[0.5, -0.3]);
        assert_eq!(definition.e_final().as_slice(), &[0., 0.]);
        assert_eq!(definition.task_types(), &[TaskType::Equality; 2]);
        assert!(definition.primitive_names().is_empty());
        assert!(matches!(
            TaskDefinition::initialize(&params(&["TDefTeleport"]), &context),
            Err(HiqpException::UnknownTaskType { name }) if name == "TDefTeleport"
        ));
        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            TaskDefinition::initialize(&empty, &context),
            Err(HiqpException::EmptyDefParams)
        ));
    }

    #[test]
    fn non_writable_columns_are_zero_for_every_joint_variant() {
        let mut robot_state = state(planar_arm(), &[0.5, -0.3]);
        robot_state.set_writable(1, false).unwrap();
        let primitives = GeometricPrimitiveMap::new();
        let context = TaskContext::new(&robot_state, &primitives);
        for parameters in [
            params(&["TDefFullPose", "0.1", "0.2"]),
            params(&["TDefJntConfig", "link2", "0.4"]),
            params(&["TDefJntLimits", "link1", "-1", "1", "link2", "-1", "1"]),
        ] {
            let definition = TaskDefinition::initialize(&parameters, &context).unwrap();
            assert_eq!(definition.jacobian().column(1).norm(), 0.);
            assert_eq!(definition.jacobian().ncols(), 2);
        }
    }

    #[test]
    fn non_writable_columns_are_zero_for_every_geometric_variant() {
        let mut robot_state = state(planar_arm(), &[0.5, -0.3]);
        robot_state.set_writable(1, false).unwrap();
        let mut primitives = GeometricPrimitiveMap::new();
        primitives
            .set("p1", "point", "ee", true, &COLOR, &[0., 0., 0.])
            .unwrap();
        primitives
            .set("target", "point", "base", true, &COLOR, &[1., 1., 0.])
            .unwrap();
        primitives
            .set("l1", "line", "ee", true, &COLOR, &[1., 0., 0., 0., 0., 0.])
            .unwrap();
        primitives
            .set("l2", "line", "base", true, &COLOR, &[0., 1., 0., 0., 0., 0.])
            .unwrap();

        let mut field = MockDistanceField::new();
        field.expect_activate().return_const(());
        field.expect_deactivate().return_const(());
        field
            .expect_obstacle_gradient_bulk()
            .returning(|points, gradients, _| {
                gradients.extend(points.iter().map(|_| Vector3::new(0.2, 0.1, 0.)));
                true
            });
        field.expect_is_valid().return_const(true);
        let mut provider = MockDistanceFieldProvider::new();
        provider
            .expect_create()
            .return_once(move || Ok(Box::new(field) as Box<dyn DistanceField>));
        let context = TaskContext::new(&robot_state, &primitives).with_distance_fields(&provider);

        for parameters in [
            params(&["TDefGeomProj", "point", "point", "p1 = target"]),
            params(&["TDefGeomAlign", "line", "line", "l1 = l2"]),
            params(&["TDefAvoidCollisionsSDF", "p1"]),
        ] {
            let definition = TaskDefinition::initialize(&parameters, &context).unwrap();
            assert_eq!(definition.jacobian().ncols(), 2);
            assert_eq!(definition.jacobian().column(1).norm(), 0.);
            assert!(definition.jacobian().column(0).norm() > 0.);
        }
    }
}
