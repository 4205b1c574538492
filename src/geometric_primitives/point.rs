// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the GeometricPoint type.
use nalgebra::Vector3;

use crate::exception::HiqpResult;
use crate::geometric_primitives::{check_parameter_count, PrimitiveKind};
use crate::utils::slice_to_vector3;

/// A point given in the frame of the link it is attached to.
///
/// Parameters: `[x, y, z]`
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricPoint {
    p: Vector3<f64>,
}

impl GeometricPoint {
    /// Parses the parameters of a point.
    ///
    /// # Errors
    /// * InvalidParameterCount if not exactly 3 parameters are given.
    pub fn init(parameters: &[f64]) -> HiqpResult<Self> {
        check_parameter_count(PrimitiveKind::Point, parameters, &[3])?;
        Ok(GeometricPoint {
            p: slice_to_vector3(parameters),
        })
    }

    pub fn point(&self) -> &Vector3<f64> {
        &self.p
    }

    pub fn x(&self) -> f64 {
        self.p.x
    }

    pub fn y(&self) -> f64 {
        self.p.y
    }

    pub fn z(&self) -> f64 {
        self.p.z
    }
}

#[cfg(test)]
mod tests {
    use crate::geometric_primitives::GeometricPoint;

    #[test]
    fn point_requires_three_parameters() {
        let point = GeometricPoint::init(&[1., -2., 0.5]).unwrap();
        assert_eq!(point.point().as_slice(), &[1., -2., 0.5]);
        assert!(GeometricPoint::init(&[1., 2.]).is_err());
        assert!(GeometricPoint::init(&[1., 2., 3., 4.]).is_err());
    }
}
