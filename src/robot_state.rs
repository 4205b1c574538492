// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the RobotState type.
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use nalgebra::DVector;

use crate::exception::{HiqpException, HiqpResult};
use crate::kinematics::KinematicModel;

/// Describes the robot state of one control cycle.
///
/// The state is owned by the caller. It is only read by the task manager during a cycle and
/// updated by the caller between cycles.
#[derive(Clone)]
pub struct RobotState {
    /// Measured joint positions in \[rad\] or \[m\].
    pub q: DVector<f64>,
    /// Measured joint velocities in \[rad/s\] or \[m/s\].
    pub dq: DVector<f64>,
    /// Duration of one control cycle. Stateful task dynamics advance their time by this amount
    /// on every update.
    pub sampling_time: Duration,
    writable: Vec<bool>,
    model: Arc<dyn KinematicModel>,
}

impl RobotState {
    /// Creates a state with all joints at zero, all joints writable and a sampling time of 1 ms.
    pub fn new(model: Arc<dyn KinematicModel>) -> Self {
        let n_joints = model.num_joints();
        RobotState {
            q: DVector::zeros(n_joints),
            dq: DVector::zeros(n_joints),
            sampling_time: Duration::from_millis(1),
            writable: vec![true; n_joints],
            model,
        }
    }

    /// Sets the joint positions.
    ///
    /// # Errors
    /// * DimensionMismatch if `q` does not have one entry per joint.
    pub fn set_positions(&mut self, q: &[f64]) -> HiqpResult<()> {
        self.check_length(q.len(), "joint positions")?;
        self.q = DVector::from_column_slice(q);
        Ok(())
    }

    /// Sets the joint velocities.
    ///
    /// # Errors
    /// * DimensionMismatch if `dq` does not have one entry per joint.
    pub fn set_velocities(&mut self, dq: &[f64]) -> HiqpResult<()> {
        self.check_length(dq.len(), "joint velocities")?;
        self.dq = DVector::from_column_slice(dq);
        Ok(())
    }

    /// Marks a joint as (not) being under velocity control of this system.
    ///
    /// # Errors
    /// * DimensionMismatch if `q_nr` is not a joint of the model.
    pub fn set_writable(&mut self, q_nr: usize, writable: bool) -> HiqpResult<()> {
        match self.writable.get_mut(q_nr) {
            Some(flag) => {
                *flag = writable;
                Ok(())
            }
            None => Err(HiqpException::DimensionMismatch {
                message: format!(
                    "joint {} does not exist, the robot has {} joints",
                    q_nr,
                    self.num_joints()
                ),
            }),
        }
    }

    /// Total number of joints of the kinematic model.
    pub fn num_joints(&self) -> usize {
        self.writable.len()
    }

    /// Whether joint `q_nr` receives velocity commands.
    pub fn is_q_nr_writable(&self, q_nr: usize) -> bool {
        self.writable.get(q_nr).copied().unwrap_or(false)
    }

    /// Writability flag of every joint.
    pub fn writable(&self) -> &[bool] {
        &self.writable
    }

    /// The kinematic model used for forward kinematics.
    pub fn kinematics(&self) -> &dyn KinematicModel {
        self.model.as_ref()
    }

    /// Checks that `q` and `dq` still have one entry per joint. Both fields are public and may
    /// have been replaced by the caller between cycles.
    ///
    /// # Errors
    /// * DimensionMismatch if `q` or `dq` has the wrong length.
    pub fn check_dimensions(&self) -> HiqpResult<()> {
        self.check_length(self.q.len(), "joint positions")?;
        self.check_length(self.dq.len(), "joint velocities")
    }

    fn check_length(&self, len: usize, what: &str) -> HiqpResult<()> {
        if len != self.num_joints() {
            return Err(HiqpException::DimensionMismatch {
                message: format!(
                    "got {} {}, the robot has {} joints",
                    len,
                    what,
                    self.num_joints()
                ),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for RobotState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RobotState")
            .field("q", &self.q.as_slice())
            .field("dq", &self.dq.as_slice())
            .field("sampling_time", &self.sampling_time)
            .field("writable", &self.writable)
            .field("root", &self.model.root_link())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::exception::HiqpException;
    use crate::kinematics::MockKinematicModel;
    use crate::robot_state::RobotState;
    use nalgebra::DVector;
    use std::sync::Arc;

    fn two_joint_model() -> MockKinematicModel {
        let mut model = MockKinematicModel::new();
        model.expect_num_joints().return_const(2usize);
        model.expect_root_link().returning(|| "base".to_string());
        model
    }

    #[test]
    fn new_state_is_zero_and_writable() {
        let state = RobotState::new(Arc::new(two_joint_model()));
        assert_eq!(state.num_joints(), 2);
        assert_eq!(state.q.len(), 2);
        assert!(state.is_q_nr_writable(0) && state.is_q_nr_writable(1));
        assert!(!state.is_q_nr_writable(2));
    }

    #[test]
    fn setters_check_dimensions() {
        let mut state = RobotState::new(Arc::new(two_joint_model()));
        assert!(state.set_positions(&[0.5, -0.3]).is_ok());
        assert!(state.set_positions(&[0.5]).is_err());
        assert!(state.set_velocities(&[1., 2., 3.]).is_err());
        assert!(state.set_writable(1, false).is_ok());
        assert!(!state.is_q_nr_writable(1));
        assert!(state.set_writable(5, false).is_err());
        assert_eq!(state.q[0], 0.5);
        assert!(format!("{:?}", state).contains("base"));
    }

    #[test]
    fn replaced_fields_are_detected() {
        let mut state = RobotState::new(Arc::new(two_joint_model()));
        assert!(state.check_dimensions().is_ok());
        state.q = DVector::zeros(3);
        match state.check_dimensions() {
            Err(HiqpException::DimensionMismatch { message }) => {
                assert!(message.contains("joint positions"))
            }
            other => panic!("unexpected result {:?}", other),
        }
        state.q = DVector::zeros(2);
        state.dq = DVector::zeros(1);
        assert!(matches!(
            state.check_dimensions(),
            Err(HiqpException::DimensionMismatch { .. })
        ));
    }
}
