// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the interface to the forward kinematics provider.
//!
//! Tasks never compute kinematics themselves. They ask the [`KinematicModel`] of the
//! [`RobotState`](`crate::RobotState`) for the pose and Jacobian of the link a primitive is
//! attached to, via [`link_kinematics`], which also removes the contribution of joints that
//! are not under velocity control.
use nalgebra::{DVector, Isometry3, Matrix3xX, Matrix6xX};

use crate::exception::HiqpResult;
use crate::robot_state::RobotState;
use crate::utils::mask_columns;

mod kinematic_tree;

pub use kinematic_tree::{JointType, KinematicTree};

/// Forward kinematics provider.
#[cfg_attr(test, mockall::automock)]
pub trait KinematicModel: Send + Sync {
    /// Number of joint positions the model expects.
    fn num_joints(&self) -> usize;

    /// Name of the root link. All poses and Jacobians are expressed in this frame.
    fn root_link(&self) -> String;

    /// Whether the model contains a link of this name.
    fn has_link(&self, link: &str) -> bool;

    /// Index of the joint whose child is `link`, `None` for the root and for links attached
    /// through fixed joints.
    fn q_nr_of_link(&self, link: &str) -> Option<usize>;

    /// Pose of the link in the root frame.
    ///
    /// # Errors
    /// * KinematicsFailure if the link is unknown or `q` has the wrong size.
    fn pose(&self, q: &DVector<f64>, link: &str) -> HiqpResult<Isometry3<f64>>;

    /// Geometric Jacobian of the link origin expressed in the root frame. The first three
    /// rows map joint velocities to the linear velocity, the last three to the angular velocity.
    ///
    /// # Errors
    /// * KinematicsFailure if the link is unknown or `q` has the wrong size.
    fn jacobian(&self, q: &DVector<f64>, link: &str) -> HiqpResult<Matrix6xX<f64>>;
}

/// Pose and masked Jacobian of one link for the current robot state.
#[derive(Debug, Clone)]
pub struct LinkKinematics {
    /// Pose of the link in the root frame.
    pub pose: Isometry3<f64>,
    /// Jacobian of the link origin. Columns of non-writable joints are zero.
    pub jacobian: Matrix6xX<f64>,
}

impl LinkKinematics {
    /// Linear velocity part of the Jacobian.
    pub fn linear(&self) -> Matrix3xX<f64> {
        self.jacobian.fixed_rows::<3>(0).into_owned()
    }

    /// Angular velocity part of the Jacobian.
    pub fn angular(&self) -> Matrix3xX<f64> {
        self.jacobian.fixed_rows::<3>(3).into_owned()
    }
}

/// Computes forward kinematics of a link and masks the columns of all non-writable joints.
///
/// # Errors
/// * KinematicsFailure if the kinematic model fails for this link.
pub fn link_kinematics(robot_state: &RobotState, link: &str) -> HiqpResult<LinkKinematics> {
    let model = robot_state.kinematics();
    let pose = model.pose(&robot_state.q, link)?;
    let mut jacobian = model.jacobian(&robot_state.q, link)?;
    mask_columns(&mut jacobian, robot_state.writable());
    Ok(LinkKinematics { pose, jacobian })
}
