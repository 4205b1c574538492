// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the GeometricPlane type.
use nalgebra::{Unit, Vector3};

use crate::exception::HiqpResult;
use crate::geometric_primitives::{check_parameter_count, PrimitiveKind};
use crate::utils::unit_direction;

/// The plane `n . x = d`.
///
/// Parameters: `[n.x, n.y, n.z, d]`. The normal is normalized, `d` keeps its value and is the
/// distance of the plane from the frame origin along the normal.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricPlane {
    normal: Unit<Vector3<f64>>,
    offset: f64,
}

impl GeometricPlane {
    /// # Errors
    /// * InvalidParameterCount if not exactly 4 parameters are given.
    /// * InvalidParameter if the normal has zero length.
    pub fn init(parameters: &[f64]) -> HiqpResult<Self> {
        check_parameter_count(PrimitiveKind::Plane, parameters, &[4])?;
        Ok(GeometricPlane {
            normal: unit_direction(&parameters[0..3], "plane normal")?,
            offset: parameters[3],
        })
    }

    pub fn normal(&self) -> &Unit<Vector3<f64>> {
        &self.normal
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// The point of the plane closest to the frame origin.
    pub fn point_on_plane(&self) -> Vector3<f64> {
        self.normal.into_inner() * self.offset
    }
}
