// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the TaskDynamics type.
use nalgebra::{DMatrix, DVector};

use crate::exception::{HiqpException, HiqpResult};
use crate::robot_state::RobotState;
use crate::tasks::{TDynFirstOrder, TDynJntLimits, TDynMinJerk};

/// All task dynamics, selected by the first token of the dynamics parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicsVariant {
    FirstOrder(TDynFirstOrder),
    JntLimits(TDynJntLimits),
    MinJerk(TDynMinJerk),
}

impl DynamicsVariant {
    pub fn name(&self) -> &'static str {
        match self {
            DynamicsVariant::FirstOrder(_) => TDynFirstOrder::NAME,
            DynamicsVariant::JntLimits(_) => TDynJntLimits::NAME,
            DynamicsVariant::MinJerk(_) => TDynMinJerk::NAME,
        }
    }
}

/// Computes the desired rate of change `e_dot_star` of a task function.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDynamics {
    variant: DynamicsVariant,
    e_dot_star: DVector<f64>,
}

impl TaskDynamics {
    /// Builds the dynamics from its parameters. `e_dot_star` is zero until the first update.
    ///
    /// # Arguments
    /// * `parameters` - Dynamics parameters, the first token selects the type.
    /// * `e_initial` - Task function value when the task was created.
    /// * `e_final` - Task function value the dynamics converge to.
    /// # Errors
    /// * EmptyDynParams if `parameters` is empty.
    /// * UnknownTaskType if the first token is not a dynamics type.
    /// * InvalidParameterCount or InvalidParameter if the gains cannot be parsed.
    pub fn initialize<S: AsRef<str>>(
        parameters: &[S],
        e_initial: &DVector<f64>,
        e_final: &DVector<f64>,
    ) -> HiqpResult<Self> {
        let name = parameters
            .first()
            .ok_or(HiqpException::EmptyDynParams)?
            .as_ref();
        let variant = match name {
            TDynFirstOrder::NAME => DynamicsVariant::FirstOrder(TDynFirstOrder::init(parameters)?),
            TDynJntLimits::NAME => DynamicsVariant::JntLimits(TDynJntLimits::init(parameters)?),
            TDynMinJerk::NAME => {
                DynamicsVariant::MinJerk(TDynMinJerk::init(parameters, e_initial, e_final)?)
            }
            _ => {
                return Err(HiqpException::UnknownTaskType {
                    name: name.to_string(),
                })
            }
        };
        Ok(TaskDynamics {
            variant,
            e_dot_star: DVector::zeros(e_initial.len()),
        })
    }

    /// Computes `e_dot_star` for the current task function value.
    ///
    /// # Errors
    /// * DimensionMismatch if the task function no longer fits a minimal jerk profile.
    pub fn update(
        &mut self,
        robot_state: &RobotState,
        e: &DVector<f64>,
        _jacobian: &DMatrix<f64>,
    ) -> HiqpResult<()> {
        if self.e_dot_star.len() != e.len() {
            self.e_dot_star = DVector::zeros(e.len());
        }
        match &mut self.variant {
            DynamicsVariant::FirstOrder(dynamics) => dynamics.update(e, &mut self.e_dot_star),
            DynamicsVariant::JntLimits(dynamics) => dynamics.update(e, &mut self.e_dot_star),
            DynamicsVariant::MinJerk(dynamics) => {
                dynamics.update(robot_state, e, &mut self.e_dot_star)
            }
        }
    }

    pub fn variant(&self) -> &DynamicsVariant {
        &self.variant
    }

    pub fn e_dot_star(&self) -> &DVector<f64> {
        &self.e_dot_star
    }
}

#[cfg(test)]
mod tests {
    use crate::exception::{status_code, HiqpException};
    use crate::tasks::test_utils::{params, planar_arm, state};
    use crate::tasks::TaskDynamics;
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn first_token_selects_the_variant() {
        let e = DVector::from_column_slice(&[0.5, -0.3]);
        let zero = DVector::zeros(2);
        for (name, parameters) in [
            ("TDynFirstOrder", params(&["TDynFirstOrder", "1.0"])),
            ("TDynJntLimits", params(&["TDynJntLimits", "1.0", "0.5"])),
            ("TDynMinJerk", params(&["TDynMinJerk", "2.0", "1.0"])),
        ] {
            let dynamics = TaskDynamics::initialize(&parameters, &e, &zero).unwrap();
            assert_eq!(dynamics.variant().name(), name);
            assert_eq!(dynamics.e_dot_star().as_slice(), &[0., 0.]);
        }
        let unknown = TaskDynamics::initialize(&params(&["TDynSecondOrder", "1"]), &e, &zero);
        assert!(matches!(unknown, Err(HiqpException::UnknownTaskType { .. })));
        assert_eq!(status_code(&unknown), -2);
        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            TaskDynamics::initialize(&empty, &e, &zero),
            Err(HiqpException::EmptyDynParams)
        ));
    }

    #[test]
    fn update_produces_one_value_per_row() {
        let robot_state = state(planar_arm(), &[0., 0.]);
        let e = DVector::from_column_slice(&[0.5, -0.3, 0.1]);
        let mut dynamics =
            TaskDynamics::initialize(&params(&["TDynFirstOrder", "2"]), &e, &DVector::zeros(3))
                .unwrap();
        dynamics
            .update(&robot_state, &e, &DMatrix::zeros(3, 2))
            .unwrap();
        assert_eq!(dynamics.e_dot_star().as_slice(), &[-1., 0.6, -0.2]);
    }
}
