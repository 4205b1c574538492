// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the GeometricBox type.
use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::exception::{invalid_parameter, HiqpResult};
use crate::geometric_primitives::{check_parameter_count, PrimitiveKind};
use crate::utils::{euler_xyz_to_quaternion, slice_to_vector3, wxyz_to_quaternion};

/// An oriented box.
///
/// Parameters:
/// * `[c.x, c.y, c.z, dim.x, dim.y, dim.z]` - axis aligned box
/// * `[c.x, c.y, c.z, dim.x, dim.y, dim.z, angle.x, angle.y, angle.z]` - orientation as
///   intrinsic x-y-z euler angles
/// * `[c.x, c.y, c.z, dim.x, dim.y, dim.z, q.w, q.x, q.y, q.z]` - orientation as quaternion
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricBox {
    center: Vector3<f64>,
    dimensions: Vector3<f64>,
    orientation: UnitQuaternion<f64>,
}

impl GeometricBox {
    /// # Errors
    /// * InvalidParameterCount if not 6, 9 or 10 parameters are given.
    /// * InvalidParameter if a dimension is not positive or the quaternion has zero length.
    pub fn init(parameters: &[f64]) -> HiqpResult<Self> {
        check_parameter_count(PrimitiveKind::Box, parameters, &[6, 9, 10])?;
        let dimensions = slice_to_vector3(&parameters[3..6]);
        if dimensions.iter().any(|&d| d <= 0.) {
            return Err(invalid_parameter(format!(
                "box dimensions must be positive, got {:?}",
                dimensions.as_slice()
            )));
        }
        let orientation = match parameters.len() {
            9 => euler_xyz_to_quaternion(&parameters[6..9]),
            10 => wxyz_to_quaternion(&parameters[6..10])?,
            _ => UnitQuaternion::identity(),
        };
        Ok(GeometricBox {
            center: slice_to_vector3(parameters),
            dimensions,
            orientation,
        })
    }

    pub fn center(&self) -> &Vector3<f64> {
        &self.center
    }

    /// Edge lengths along the box axes.
    pub fn dimensions(&self) -> &Vector3<f64> {
        &self.dimensions
    }

    pub fn half_extents(&self) -> Vector3<f64> {
        self.dimensions * 0.5
    }

    /// Rotation from box coordinates to the coordinates of the frame the box is attached to.
    pub fn orientation(&self) -> &UnitQuaternion<f64> {
        &self.orientation
    }

    /// Scales box coordinates so that the faces lie at `+-1`.
    pub fn scaling(&self) -> Matrix3<f64> {
        Matrix3::from_diagonal(&self.half_extents().map(|h| 1. / h))
    }
}
