// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Forward kinematics of geometric primitives.
use nalgebra::{Isometry3, Point3, Vector3};

use crate::exception::{unresolved_reference, HiqpResult};
use crate::geometric_primitives::{GeometricPrimitive, Shape};
use crate::kinematics::link_kinematics;
use crate::robot_state::RobotState;
use crate::utils::{skew, Jacobian3};

/// Pose and velocity Jacobians of the link a primitive is attached to.
///
/// All quantities are expressed in the root frame. Columns of non-writable joints are zero.
#[derive(Debug, Clone)]
pub(crate) struct PrimitiveKinematics {
    pose: Isometry3<f64>,
    linear: Jacobian3,
    angular: Jacobian3,
}

impl PrimitiveKinematics {
    /// # Errors
    /// * KinematicsFailure if the link of the primitive is not part of the kinematic model.
    pub fn of(primitive: &GeometricPrimitive, robot_state: &RobotState) -> HiqpResult<Self> {
        let kinematics = link_kinematics(robot_state, primitive.frame_id())?;
        Ok(PrimitiveKinematics {
            pose: kinematics.pose,
            linear: kinematics.linear(),
            angular: kinematics.angular(),
        })
    }

    pub fn pose(&self) -> &Isometry3<f64> {
        &self.pose
    }

    /// Angular velocity Jacobian of the link.
    pub fn angular(&self) -> &Jacobian3 {
        &self.angular
    }

    /// Jacobian of the link-fixed point which currently is at `world` (root coordinates).
    pub fn jacobian_at(&self, world: &Vector3<f64>) -> Jacobian3 {
        let lever = world - self.pose.translation.vector;
        &self.linear - skew(&lever) * &self.angular
    }

    /// Position and Jacobian of a point given in link coordinates.
    pub fn point(&self, local: &Vector3<f64>) -> (Vector3<f64>, Jacobian3) {
        let world = (self.pose * Point3::from(*local)).coords;
        let jacobian = self.jacobian_at(&world);
        (world, jacobian)
    }

    /// Direction and its Jacobian for a direction given in link coordinates.
    pub fn direction(&self, local: &Vector3<f64>) -> (Vector3<f64>, Jacobian3) {
        let world = self.pose.rotation * local;
        let jacobian = -skew(&world) * &self.angular;
        (world, jacobian)
    }
}

/// A primitive together with the kinematics of its link.
pub(crate) struct Placed<'a> {
    pub primitive: &'a GeometricPrimitive,
    pub kinematics: PrimitiveKinematics,
}

impl<'a> Placed<'a> {
    pub fn new(primitive: &'a GeometricPrimitive, robot_state: &RobotState) -> HiqpResult<Self> {
        Ok(Placed {
            primitive,
            kinematics: PrimitiveKinematics::of(primitive, robot_state)?,
        })
    }

    /// Typed shape of the primitive.
    ///
    /// # Errors
    /// * UnresolvedPrimitiveReference if the primitive has another type.
    pub fn shape<T: Shape>(&self) -> HiqpResult<&'a T> {
        let primitive: &'a GeometricPrimitive = self.primitive;
        primitive.shape_as::<T>().ok_or_else(|| {
            unresolved_reference(format!(
                "primitive '{}' is a {}, expected a {}",
                primitive.name(),
                primitive.kind(),
                T::KIND
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::geometric_primitives::GeometricPrimitive;
    use crate::tasks::geometry::PrimitiveKinematics;
    use crate::tasks::test_utils::{planar_arm, slice_compare, state, COLOR};
    use nalgebra::Vector3;

    #[test]
    fn point_velocity_includes_rotation_lever() {
        let primitive =
            GeometricPrimitive::new("p", "point", "link2", true, &COLOR, &[0.5, 0., 0.]).unwrap();
        let robot_state = state(planar_arm(), &[0., 0.]);
        let kinematics = PrimitiveKinematics::of(&primitive, &robot_state).unwrap();
        let (p, jacobian) = kinematics.point(&Vector3::new(0.5, 0., 0.));
        slice_compare(p.as_slice(), &[1.5, 0., 0.], 1e-12);
        // both joints rotate about z, the point moves along y
        slice_compare(jacobian.row(1).clone_owned().as_slice(), &[1.5, 0.5], 1e-12);
        assert_eq!(jacobian.row(0).norm(), 0.);
        let (v, direction_jacobian) = kinematics.direction(&Vector3::x());
        slice_compare(v.as_slice(), &[1., 0., 0.], 1e-12);
        slice_compare(
            direction_jacobian.row(1).clone_owned().as_slice(),
            &[1., 1.],
            1e-12,
        );
    }

    #[test]
    fn masked_joints_do_not_move_points() {
        let primitive =
            GeometricPrimitive::new("p", "point", "ee", true, &COLOR, &[0., 0., 0.]).unwrap();
        let mut robot_state = state(planar_arm(), &[0.2, 0.1]);
        robot_state.set_writable(0, false).unwrap();
        let kinematics = PrimitiveKinematics::of(&primitive, &robot_state).unwrap();
        let (_, jacobian) = kinematics.point(&Vector3::zeros());
        assert_eq!(jacobian.column(0).norm(), 0.);
        assert!(jacobian.column(1).norm() > 0.);
    }
}
