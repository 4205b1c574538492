// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! contains useful type definitions and conversion functions.
use crate::exception::{invalid_parameter, HiqpResult};
use nalgebra::storage::StorageMut;
use nalgebra::{Dim, Matrix, Matrix3, Matrix3xX, Quaternion, Unit, UnitQuaternion, Vector3};

/// A Matrix with 3 rows and one column per joint
pub type Jacobian3 = Matrix3xX<f64>;
/// An RGBA color
pub type Color = [f64; 4];

/// converts a 3 entry slice into a vector
pub fn slice_to_vector3(slice: &[f64]) -> Vector3<f64> {
    Vector3::new(slice[0], slice[1], slice[2])
}

/// Builds a rotation from intrinsic x-y-z euler angles.
pub fn euler_xyz_to_quaternion(angles: &[f64]) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angles[0])
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angles[1])
        * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angles[2])
}

/// Builds a rotation from a (w, x, y, z) quaternion. The quaternion is normalized.
///
/// # Errors
/// * InvalidParameter if the quaternion has zero length.
pub fn wxyz_to_quaternion(wxyz: &[f64]) -> HiqpResult<UnitQuaternion<f64>> {
    let q = Quaternion::new(wxyz[0], wxyz[1], wxyz[2], wxyz[3]);
    if q.norm() < f64::EPSILON {
        return Err(invalid_parameter("quaternion must not have zero length"));
    }
    Ok(UnitQuaternion::from_quaternion(q))
}

/// Normalizes a direction given as three parameters.
///
/// # Errors
/// * InvalidParameter if the direction has zero length.
pub fn unit_direction(slice: &[f64], what: &str) -> HiqpResult<Unit<Vector3<f64>>> {
    let v = slice_to_vector3(slice);
    Unit::try_new(v, f64::EPSILON)
        .ok_or_else(|| invalid_parameter(format!("{} must not have zero length", what)))
}

/// Cross product matrix: `skew(a) * b == a x b`
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0., -v.z, v.y, v.z, 0., -v.x, -v.y, v.x, 0.)
}

/// Parses a floating point token of a string parameter list.
///
/// # Errors
/// * InvalidParameter if the token is not a finite number.
pub fn parse_f64(token: &str, what: &str) -> HiqpResult<f64> {
    match token.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(invalid_parameter(format!(
            "could not parse {} from '{}'",
            what, token
        ))),
    }
}

/// Parses a strictly positive gain.
///
/// # Errors
/// * InvalidParameter if the token is not a number or not larger than zero.
pub fn parse_positive(token: &str, what: &str) -> HiqpResult<f64> {
    let value = parse_f64(token, what)?;
    if value <= 0. {
        return Err(invalid_parameter(format!(
            "{} must be larger than zero, got {}",
            what, value
        )));
    }
    Ok(value)
}

/// Sets all columns of non-writable joints to zero.
pub fn mask_columns<R: Dim, C: Dim, S: StorageMut<f64, R, C>>(
    matrix: &mut Matrix<f64, R, C, S>,
    writable: &[bool],
) {
    for (column, &is_writable) in writable.iter().enumerate() {
        if !is_writable && column < matrix.ncols() {
            matrix.column_mut(column).fill(0.);
        }
    }
}

#[cfg(test)]
mod test {
    use crate::utils::{
        euler_xyz_to_quaternion, mask_columns, parse_f64, parse_positive, skew, unit_direction,
        wxyz_to_quaternion,
    };
    use nalgebra::{DMatrix, Vector3};

    fn slice_compare(a: &[f64], b: &[f64], thresh: f64) {
        for i in 0..a.len() {
            assert!(f64::abs(a[i] - b[i]) < thresh);
        }
    }

    #[test]
    fn skew_is_cross_product() {
        let a = Vector3::new(0.3, -1.2, 2.0);
        let b = Vector3::new(-0.7, 0.1, 0.5);
        slice_compare((skew(&a) * b).as_slice(), a.cross(&b).as_slice(), 1e-12);
    }

    #[test]
    fn euler_and_quaternion_agree() {
        let from_euler = euler_xyz_to_quaternion(&[0., 0., std::f64::consts::FRAC_PI_2]);
        let half = std::f64::consts::FRAC_PI_4;
        let from_wxyz = wxyz_to_quaternion(&[half.cos(), 0., 0., half.sin()]).unwrap();
        assert!(from_euler.angle_to(&from_wxyz) < 1e-9);
        assert!(wxyz_to_quaternion(&[0., 0., 0., 0.]).is_err());
    }

    #[test]
    fn directions_are_normalized() {
        let unit = unit_direction(&[0., 0., 2.], "axis").unwrap();
        slice_compare(unit.as_slice(), &[0., 0., 1.], 1e-12);
        assert!(unit_direction(&[0., 0., 0.], "axis").is_err());
    }

    #[test]
    fn parsing_rejects_garbage() {
        assert_eq!(parse_f64(" 1.5", "lambda").unwrap(), 1.5);
        assert!(parse_f64("one", "lambda").is_err());
        assert!(parse_f64("NaN", "lambda").is_err());
        assert!(parse_positive("0", "lambda").is_err());
        assert!(parse_positive("-2", "lambda").is_err());
    }

    #[test]
    fn masking_zeroes_only_non_writable_columns() {
        let mut matrix = DMatrix::from_element(2, 3, 1.);
        mask_columns(&mut matrix, &[true, false, true]);
        assert_eq!(matrix.column(1).sum(), 0.);
        assert_eq!(matrix.column(0).sum(), 2.);
        assert_eq!(matrix.column(2).sum(), 2.);
    }
}
