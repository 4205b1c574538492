// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the TDefFullPose definition.
use nalgebra::DVector;

use crate::exception::{HiqpException, HiqpResult};
use crate::tasks::{TaskContext, TaskFunction, TaskType};
use crate::utils::parse_f64;

/// Drives all joints to a desired configuration.
///
/// Parameters: `TDefFullPose [q_1 ... q_n]`. Without joint values the desired configuration is
/// zero. The task function is `e = q - q_desired`, the Jacobian is the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct TDefFullPose {
    desired: DVector<f64>,
}

impl TDefFullPose {
    pub const NAME: &'static str = "TDefFullPose";

    pub(crate) fn init<S: AsRef<str>>(parameters: &[S], context: &TaskContext) -> HiqpResult<Self> {
        let n_joints = context.robot_state.num_joints();
        let desired = match parameters.len() {
            1 => DVector::zeros(n_joints),
            len if len == n_joints + 1 => {
                let mut desired = DVector::zeros(n_joints);
                for (i, token) in parameters[1..].iter().enumerate() {
                    desired[i] = parse_f64(token.as_ref(), "desired joint position")?;
                }
                desired
            }
            len => {
                return Err(HiqpException::InvalidParameterCount {
                    kind: Self::NAME.to_string(),
                    expected: format!("1 or {}", n_joints + 1),
                    got: len,
                })
            }
        };
        Ok(TDefFullPose { desired })
    }

    pub fn desired(&self) -> &DVector<f64> {
        &self.desired
    }

    pub(crate) fn dimension(&self) -> usize {
        self.desired.len()
    }

    pub(crate) fn update(
        &mut self,
        context: &TaskContext,
        function: &mut TaskFunction,
    ) -> HiqpResult<()> {
        let q = &context.robot_state.q;
        for (i, desired) in self.desired.iter().enumerate() {
            function.e[i] = q[i] - desired;
        }
        function.jacobian.fill_with_identity();
        function.task_types.fill(TaskType::Equality);
        Ok(())
    }
}
