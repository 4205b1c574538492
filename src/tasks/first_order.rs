// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the TDynFirstOrder dynamics.
use nalgebra::DVector;

use crate::exception::HiqpResult;
use crate::tasks::check_task_parameter_count;
use crate::utils::parse_positive;

/// Exponential decay of the task function: `e_dot_star = -lambda * e`.
///
/// Parameters: `TDynFirstOrder <lambda>` with `lambda > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct TDynFirstOrder {
    lambda: f64,
}

impl TDynFirstOrder {
    pub const NAME: &'static str = "TDynFirstOrder";

    pub(crate) fn init<S: AsRef<str>>(parameters: &[S]) -> HiqpResult<Self> {
        check_task_parameter_count(parameters, &[2])?;
        Ok(TDynFirstOrder {
            lambda: parse_positive(parameters[1].as_ref(), "lambda")?,
        })
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub(crate) fn update(&self, e: &DVector<f64>, e_dot_star: &mut DVector<f64>) -> HiqpResult<()> {
        e_dot_star.copy_from(&(e * -self.lambda));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::exception::HiqpException;
    use crate::tasks::test_utils::params;
    use crate::tasks::TDynFirstOrder;

    #[test]
    fn lambda_must_be_positive() {
        assert_eq!(
            TDynFirstOrder::init(&params(&["TDynFirstOrder", "1.5"]))
                .unwrap()
                .lambda(),
            1.5
        );
        assert!(matches!(
            TDynFirstOrder::init(&params(&["TDynFirstOrder", "0"])),
            Err(HiqpException::InvalidParameter { .. })
        ));
        assert!(matches!(
            TDynFirstOrder::init(&params(&["TDynFirstOrder"])),
            Err(HiqpException::InvalidParameterCount { got: 1, .. })
        ));
    }
}
