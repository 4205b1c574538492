// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the GeometricCylinder type.
use nalgebra::{Unit, Vector3};

use crate::exception::{invalid_parameter, HiqpResult};
use crate::geometric_primitives::{check_parameter_count, PrimitiveKind};
use crate::utils::{slice_to_vector3, unit_direction};

/// A cylinder around an axis.
///
/// Parameters: `[dir.x, dir.y, dir.z, p.x, p.y, p.z, radius, height]` where `dir` is the axis
/// direction and `p` the center of the bottom face. Projection tasks treat the cylinder as
/// infinitely long; the height is only used for visualization.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricCylinder {
    direction: Unit<Vector3<f64>>,
    point: Vector3<f64>,
    radius: f64,
    height: f64,
}

impl GeometricCylinder {
    /// # Errors
    /// * InvalidParameterCount if not exactly 8 parameters are given.
    /// * InvalidParameter if the axis has zero length or radius/height are negative.
    pub fn init(parameters: &[f64]) -> HiqpResult<Self> {
        check_parameter_count(PrimitiveKind::Cylinder, parameters, &[8])?;
        if parameters[6] < 0. || parameters[7] < 0. {
            return Err(invalid_parameter(format!(
                "cylinder radius and height must not be negative, got {} and {}",
                parameters[6], parameters[7]
            )));
        }
        Ok(GeometricCylinder {
            direction: unit_direction(&parameters[0..3], "cylinder axis")?,
            point: slice_to_vector3(&parameters[3..6]),
            radius: parameters[6],
            height: parameters[7],
        })
    }

    pub fn direction(&self) -> &Unit<Vector3<f64>> {
        &self.direction
    }

    pub fn point(&self) -> &Vector3<f64> {
        &self.point
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}
