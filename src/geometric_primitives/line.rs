// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the GeometricLine type.
use nalgebra::{Unit, Vector3};

use crate::exception::HiqpResult;
use crate::geometric_primitives::{check_parameter_count, PrimitiveKind};
use crate::utils::{slice_to_vector3, unit_direction};

/// An infinite line through a point along a direction.
///
/// Parameters: `[dir.x, dir.y, dir.z, p.x, p.y, p.z]`. The direction is normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricLine {
    direction: Unit<Vector3<f64>>,
    point: Vector3<f64>,
}

impl GeometricLine {
    /// Parses the parameters of a line.
    ///
    /// # Errors
    /// * InvalidParameterCount if not exactly 6 parameters are given.
    /// * InvalidParameter if the direction has zero length.
    pub fn init(parameters: &[f64]) -> HiqpResult<Self> {
        check_parameter_count(PrimitiveKind::Line, parameters, &[6])?;
        Ok(GeometricLine {
            direction: unit_direction(&parameters[0..3], "line direction")?,
            point: slice_to_vector3(&parameters[3..6]),
        })
    }

    /// Unit direction of the line.
    pub fn direction(&self) -> &Unit<Vector3<f64>> {
        &self.direction
    }

    /// A point the line passes through.
    pub fn point(&self) -> &Vector3<f64> {
        &self.point
    }
}
