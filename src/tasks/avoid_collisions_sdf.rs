// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the TDefAvoidCollisionsSdf definition.
use nalgebra::Vector3;

use crate::distance_field::ScopedDistanceField;
use crate::exception::{unresolved_reference, HiqpException, HiqpResult};
use crate::geometric_primitives::{GeometricPrimitive, PrimitiveShape};
use crate::tasks::geometry::PrimitiveKinematics;
use crate::tasks::{check_min_parameter_count, TaskContext, TaskFunction, TaskType};
use crate::utils::Jacobian3;
use crate::visualizer::Visualizer;

/// Distance in \[m\] every avoidance primitive keeps to the obstacles.
pub const SAFETY_DISTANCE: f64 = 0.005;

const GRADIENT_COLOR: [f64; 4] = [1., 0., 1., 1.];

/// Keeps points and spheres on the robot away from the obstacles of a distance field.
///
/// Parameters: `TDefAvoidCollisionsSDF <primitive>+` where every primitive is a point or a
/// sphere attached to a link of the robot. Each primitive adds one
/// [`GreaterOrEqual`](TaskType::GreaterOrEqual) row with the distance to the nearest obstacle
/// minus [`SAFETY_DISTANCE`] (and minus the radius for spheres).
///
/// Where the distance field has no valid gradient the row is zero: the task then behaves as if
/// the constraint were satisfied with `e = 0`, which is only an approximation of "no
/// information".
#[derive(Debug)]
pub struct TDefAvoidCollisionsSdf {
    primitives: Vec<String>,
    root_frame: String,
    field: ScopedDistanceField,
    /// Query points and valid gradients of the last update.
    samples: Vec<(Vector3<f64>, Vector3<f64>)>,
}

impl TDefAvoidCollisionsSdf {
    pub const NAME: &'static str = "TDefAvoidCollisionsSDF";

    pub(crate) fn init<S: AsRef<str>>(parameters: &[S], context: &TaskContext) -> HiqpResult<Self> {
        check_min_parameter_count(parameters, 2)?;
        let model = context.robot_state.kinematics();
        let root_frame = model.root_link();
        let mut primitives = Vec::with_capacity(parameters.len() - 1);
        for name in parameters[1..].iter().map(|p| p.as_ref()) {
            let primitive = context.primitives.resolve(name)?;
            if !matches!(
                primitive.shape(),
                PrimitiveShape::Point(_) | PrimitiveShape::Sphere(_)
            ) {
                return Err(unresolved_reference(format!(
                    "avoidance primitive '{}' is a {}, expected a point or a sphere",
                    name,
                    primitive.kind()
                )));
            }
            let frame_id = primitive.frame_id();
            if frame_id == root_frame || !model.has_link(frame_id) {
                return Err(unresolved_reference(format!(
                    "avoidance primitive '{}' is not attached to the robot",
                    name
                )));
            }
            primitives.push(name.to_string());
        }
        let provider =
            context
                .distance_fields
                .ok_or_else(|| HiqpException::CollisionCheckFailure {
                    message: "no distance field is available for obstacle avoidance".to_string(),
                })?;
        Ok(TDefAvoidCollisionsSdf {
            primitives,
            root_frame,
            field: ScopedDistanceField::new(provider.create()?),
            samples: Vec::new(),
        })
    }

    pub(crate) fn dimension(&self) -> usize {
        self.primitives.len()
    }

    pub(crate) fn primitive_names(&self) -> Vec<String> {
        self.primitives.clone()
    }

    /// World position and Jacobian of the query point and the radius to subtract.
    fn query_point(
        primitive: &GeometricPrimitive,
        context: &TaskContext,
    ) -> HiqpResult<(Vector3<f64>, Jacobian3, f64)> {
        let kinematics = PrimitiveKinematics::of(primitive, context.robot_state)?;
        let (local, radius) = match primitive.shape() {
            PrimitiveShape::Point(point) => (point.point(), 0.),
            PrimitiveShape::Sphere(sphere) => (sphere.center(), sphere.radius()),
            _ => {
                return Err(unresolved_reference(format!(
                    "avoidance primitive '{}' is no longer a point or a sphere",
                    primitive.name()
                )))
            }
        };
        let (p, jacobian) = kinematics.point(local);
        Ok((p, jacobian, radius))
    }

    pub(crate) fn update(
        &mut self,
        context: &TaskContext,
        function: &mut TaskFunction,
    ) -> HiqpResult<()> {
        let mut queries = Vec::with_capacity(self.primitives.len());
        for name in &self.primitives {
            let primitive = context.primitives.resolve(name)?;
            queries.push(Self::query_point(primitive, context)?);
        }
        let points: Vec<Vector3<f64>> = queries.iter().map(|(p, _, _)| *p).collect();
        let gradients = self.field.gradients(&points, &self.root_frame)?;
        self.samples.clear();
        for (row, ((p, jacobian, radius), gradient)) in queries.iter().zip(gradients).enumerate() {
            function.task_types[row] = TaskType::GreaterOrEqual;
            let distance = gradient.norm();
            if !self.field.is_valid(&gradient) || distance <= f64::EPSILON {
                function.e[row] = 0.;
                function.jacobian.row_mut(row).fill(0.);
                continue;
            }
            let normal = gradient / distance;
            function.e[row] = distance - SAFETY_DISTANCE - radius;
            function
                .jacobian
                .row_mut(row)
                .copy_from(&(-normal.transpose() * jacobian));
            self.samples.push((*p, gradient));
        }
        Ok(())
    }

    /// Draws the valid gradients of the last update.
    pub(crate) fn render(&self, task: &str, visualizer: &mut dyn Visualizer) {
        for (point, gradient) in &self.samples {
            visualizer.render_arrow(task, point, &(point + gradient), &GRADIENT_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::distance_field::{DistanceField, MockDistanceField, MockDistanceFieldProvider};
    use crate::exception::{status_code, HiqpException};
    use crate::geometric_primitives::GeometricPrimitiveMap;
    use crate::tasks::test_utils::{params, planar_arm, slice_compare, state, COLOR};
    use crate::tasks::{TaskContext, TaskDefinition, TaskType, SAFETY_DISTANCE};
    use crate::visualizer::MockVisualizer;
    use nalgebra::Vector3;

    fn provider(gradient: Vector3<f64>, valid: bool) -> MockDistanceFieldProvider {
        let mut field = MockDistanceField::new();
        field.expect_activate().times(1).return_const(());
        field.expect_deactivate().times(1).return_const(());
        field
            .expect_obstacle_gradient_bulk()
            .returning(move |points, gradients, frame_id| {
                assert_eq!(frame_id, "base");
                gradients.extend(points.iter().map(|_| gradient));
                true
            });
        field.expect_is_valid().return_const(valid);
        let mut provider = MockDistanceFieldProvider::new();
        provider
            .expect_create()
            .return_once(move || Ok(Box::new(field) as Box<dyn DistanceField>));
        provider
    }

    fn primitives() -> GeometricPrimitiveMap {
        let mut map = GeometricPrimitiveMap::new();
        map.set("p1", "point", "ee", true, &COLOR, &[0., 0., 0.])
            .unwrap();
        map.set("s1", "sphere", "link2", true, &COLOR, &[0., 0., 0., 0.1])
            .unwrap();
        map.set("floor", "plane", "base", true, &COLOR, &[0., 0., 1., 0.])
            .unwrap();
        map.set("anchor", "point", "base", true, &COLOR, &[0., 0., 0.])
            .unwrap();
        map
    }

    #[test]
    fn invalid_gradient_gives_zero_row() {
        let map = primitives();
        let provider = provider(Vector3::new(0.3, 0., 0.), false);
        let robot_state = state(planar_arm(), &[0.2, 0.4]);
        let context = TaskContext::new(&robot_state, &map).with_distance_fields(&provider);
        let definition = TaskDefinition::initialize(
            &params(&["TDefAvoidCollisionsSDF", "p1"]),
            &context,
        )
        .unwrap();
        // known approximation: no gradient is treated as a satisfied constraint at e = 0
        assert_eq!(definition.e().as_slice(), &[0.]);
        assert_eq!(definition.jacobian().row(0).norm(), 0.);
        assert_eq!(definition.task_types(), &[TaskType::GreaterOrEqual]);
    }

    #[test]
    fn valid_gradient_pushes_away_from_obstacle() {
        let map = primitives();
        let provider = provider(Vector3::new(0.3, 0., 0.), true);
        let robot_state = state(planar_arm(), &[std::f64::consts::FRAC_PI_2, 0.]);
        let context = TaskContext::new(&robot_state, &map).with_distance_fields(&provider);
        let definition = TaskDefinition::initialize(
            &params(&["TDefAvoidCollisionsSDF", "p1", "s1"]),
            &context,
        )
        .unwrap();
        slice_compare(
            definition.e().as_slice(),
            &[0.3 - SAFETY_DISTANCE, 0.3 - SAFETY_DISTANCE - 0.1],
            1e-12,
        );
        // ee is at (0, 1.5, 0), both joints move it along -x
        slice_compare(
            definition.jacobian().row(0).clone_owned().as_slice(),
            &[1.5, 0.5],
            1e-12,
        );
        assert_eq!(definition.primitive_names(), vec!["p1", "s1"]);
        let mut visualizer = MockVisualizer::new();
        visualizer
            .expect_render_arrow()
            .times(2)
            .returning(|namespace, _, _, _| assert_eq!(namespace, "avoid"));
        definition.render("avoid", &mut visualizer);
    }

    #[test]
    fn only_robot_points_and_spheres_are_accepted() {
        let map = primitives();
        let robot_state = state(planar_arm(), &[0., 0.]);
        let unused = MockDistanceFieldProvider::new();
        let context = TaskContext::new(&robot_state, &map).with_distance_fields(&unused);
        for name in ["floor", "anchor", "missing"] {
            let result =
                TaskDefinition::initialize(&params(&["TDefAvoidCollisionsSDF", name]), &context);
            assert_eq!(status_code(&result), -3);
        }
        assert!(matches!(
            TaskDefinition::initialize(&params(&["TDefAvoidCollisionsSDF"]), &context),
            Err(HiqpException::InvalidParameterCount { got: 1, .. })
        ));
    }

    #[test]
    fn missing_distance_field_is_a_collision_check_failure() {
        let map = primitives();
        let robot_state = state(planar_arm(), &[0., 0.]);
        let context = TaskContext::new(&robot_state, &map);
        let result =
            TaskDefinition::initialize(&params(&["TDefAvoidCollisionsSDF", "p1"]), &context);
        assert!(matches!(
            result,
            Err(HiqpException::CollisionCheckFailure { .. })
        ));
        assert_eq!(status_code(&result), -4);
    }
}
