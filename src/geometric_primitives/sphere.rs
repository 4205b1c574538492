// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the GeometricSphere type.
use nalgebra::Vector3;

use crate::exception::{invalid_parameter, HiqpResult};
use crate::geometric_primitives::{check_parameter_count, PrimitiveKind};
use crate::utils::slice_to_vector3;

/// Parameters: `[c.x, c.y, c.z, radius]`
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricSphere {
    center: Vector3<f64>,
    radius: f64,
}

impl GeometricSphere {
    /// # Errors
    /// * InvalidParameterCount if not exactly 4 parameters are given.
    /// * InvalidParameter if the radius is negative.
    pub fn init(parameters: &[f64]) -> HiqpResult<Self> {
        check_parameter_count(PrimitiveKind::Sphere, parameters, &[4])?;
        if parameters[3] < 0. {
            return Err(invalid_parameter(format!(
                "sphere radius must not be negative, got {}",
                parameters[3]
            )));
        }
        Ok(GeometricSphere {
            center: slice_to_vector3(parameters),
            radius: parameters[3],
        })
    }

    pub fn center(&self) -> &Vector3<f64> {
        &self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }
}

#[cfg(test)]
mod tests {
    use crate::geometric_primitives::GeometricSphere;

    #[test]
    fn sphere_accessors_return_parameters() {
        let sphere = GeometricSphere::init(&[0.1, 0.2, 0.3, 0.05]).unwrap();
        assert_eq!(sphere.center().as_slice(), &[0.1, 0.2, 0.3]);
        assert_eq!(sphere.radius(), 0.05);
        assert!(GeometricSphere::init(&[0., 0., 0., -1.]).is_err());
        assert!(GeometricSphere::init(&[0., 0., 0.]).is_err());
    }
}
