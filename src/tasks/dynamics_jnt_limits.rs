// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the TDynJntLimits dynamics.
use nalgebra::DVector;

use crate::exception::HiqpResult;
use crate::tasks::check_task_parameter_count;
use crate::utils::parse_positive;

/// First order decay which never asks for more than a maximal joint velocity.
///
/// Parameters: `TDynJntLimits <lambda> <dq_max>`, both larger than zero.
/// `e_dot_star_i = -sign(e_i) * min(dq_max, lambda * |e_i|)`. Close to a limit the allowed
/// velocity towards it shrinks with the remaining distance, so the joint does not overshoot.
#[derive(Debug, Clone, PartialEq)]
pub struct TDynJntLimits {
    lambda: f64,
    dq_max: f64,
}

impl TDynJntLimits {
    pub const NAME: &'static str = "TDynJntLimits";

    pub(crate) fn init<S: AsRef<str>>(parameters: &[S]) -> HiqpResult<Self> {
        check_task_parameter_count(parameters, &[3])?;
        Ok(TDynJntLimits {
            lambda: parse_positive(parameters[1].as_ref(), "lambda")?,
            dq_max: parse_positive(parameters[2].as_ref(), "maximal joint velocity")?,
        })
    }

    pub(crate) fn update(&self, e: &DVector<f64>, e_dot_star: &mut DVector<f64>) -> HiqpResult<()> {
        for (target, &value) in e_dot_star.iter_mut().zip(e.iter()) {
            *target = if value == 0. {
                0.
            } else {
                -value.signum() * f64::min(self.dq_max, self.lambda * value.abs())
            };
        }
        Ok(())
    }
}
