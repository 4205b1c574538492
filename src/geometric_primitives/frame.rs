// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the GeometricFrame type.
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use crate::exception::HiqpResult;
use crate::geometric_primitives::{check_parameter_count, PrimitiveKind};
use crate::utils::{euler_xyz_to_quaternion, slice_to_vector3, wxyz_to_quaternion};

/// A coordinate frame relative to the link it is attached to.
///
/// Parameters: `[p.x, p.y, p.z]`, `[p.x, p.y, p.z, angle.x, angle.y, angle.z]` or
/// `[p.x, p.y, p.z, q.w, q.x, q.y, q.z]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricFrame {
    origin: Vector3<f64>,
    orientation: UnitQuaternion<f64>,
}

impl GeometricFrame {
    /// # Errors
    /// * InvalidParameterCount if not 3, 6 or 7 parameters are given.
    /// * InvalidParameter if the quaternion has zero length.
    pub fn init(parameters: &[f64]) -> HiqpResult<Self> {
        check_parameter_count(PrimitiveKind::Frame, parameters, &[3, 6, 7])?;
        let orientation = match parameters.len() {
            6 => euler_xyz_to_quaternion(&parameters[3..6]),
            7 => wxyz_to_quaternion(&parameters[3..7])?,
            _ => UnitQuaternion::identity(),
        };
        Ok(GeometricFrame {
            origin: slice_to_vector3(parameters),
            orientation,
        })
    }

    pub fn origin(&self) -> &Vector3<f64> {
        &self.origin
    }

    pub fn orientation(&self) -> &UnitQuaternion<f64> {
        &self.orientation
    }

    /// The frame as transform relative to its link.
    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.origin), self.orientation)
    }
}
