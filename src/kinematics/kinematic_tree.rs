// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains a forward kinematics implementation for trees of single degree of freedom joints.
use std::collections::HashMap;

use nalgebra::{DVector, Isometry3, Matrix6xX, Translation3, Unit, UnitQuaternion, Vector3};

use crate::exception::{invalid_parameter, HiqpException, HiqpResult};
use crate::kinematics::KinematicModel;

/// Type of the joint connecting a link to its parent.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JointType {
    Revolute,
    Prismatic,
    Fixed,
}

#[derive(Debug, Clone)]
struct Link {
    name: String,
    parent: Option<usize>,
    /// Static transform from the parent link frame to the joint frame.
    origin: Isometry3<f64>,
    /// Joint axis in the joint frame.
    axis: Unit<Vector3<f64>>,
    joint_type: JointType,
    q_nr: Option<usize>,
}

/// A kinematic tree with one root link. Every other link hangs off its parent through a
/// revolute, prismatic or fixed joint. Movable joints are numbered in the order they are added.
#[derive(Debug, Clone)]
pub struct KinematicTree {
    links: Vec<Link>,
    index: HashMap<String, usize>,
    n_joints: usize,
}

impl KinematicTree {
    /// Creates a tree that only contains the root link.
    pub fn new(root: &str) -> Self {
        let mut index = HashMap::new();
        index.insert(root.to_string(), 0);
        KinematicTree {
            links: vec![Link {
                name: root.to_string(),
                parent: None,
                origin: Isometry3::identity(),
                axis: Vector3::z_axis(),
                joint_type: JointType::Fixed,
                q_nr: None,
            }],
            index,
            n_joints: 0,
        }
    }

    /// Adds a link to the tree.
    ///
    /// # Arguments
    /// * `name` - Unique name of the new link.
    /// * `parent` - Name of an existing link.
    /// * `joint_type` - Type of the joint between parent and new link.
    /// * `origin` - Transform from the parent frame to the joint frame.
    /// * `axis` - Joint axis in the joint frame, ignored for fixed joints.
    /// # Return
    /// The joint number of the new joint, `None` for fixed joints.
    /// # Errors
    /// * InvalidParameter if the name is taken, the parent is unknown or the axis has zero length.
    pub fn add_link(
        &mut self,
        name: &str,
        parent: &str,
        joint_type: JointType,
        origin: Isometry3<f64>,
        axis: Vector3<f64>,
    ) -> HiqpResult<Option<usize>> {
        if self.index.contains_key(name) {
            return Err(invalid_parameter(format!("link '{}' already exists", name)));
        }
        let parent = *self
            .index
            .get(parent)
            .ok_or_else(|| invalid_parameter(format!("parent link '{}' is unknown", parent)))?;
        let axis = match joint_type {
            JointType::Fixed => Vector3::z_axis(),
            _ => Unit::try_new(axis, f64::EPSILON).ok_or_else(|| {
                invalid_parameter(format!("axis of joint to '{}' has zero length", name))
            })?,
        };
        let q_nr = match joint_type {
            JointType::Fixed => None,
            _ => {
                self.n_joints += 1;
                Some(self.n_joints - 1)
            }
        };
        self.index.insert(name.to_string(), self.links.len());
        self.links.push(Link {
            name: name.to_string(),
            parent: Some(parent),
            origin,
            axis,
            joint_type,
            q_nr,
        });
        Ok(q_nr)
    }

    /// Link indices from the root to `link`, both included.
    fn chain(&self, link: &str) -> HiqpResult<Vec<usize>> {
        let mut current = *self
            .index
            .get(link)
            .ok_or_else(|| HiqpException::KinematicsFailure {
                message: format!("link '{}' is not part of the kinematic tree", link),
            })?;
        let mut chain = vec![current];
        while let Some(parent) = self.links[current].parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        Ok(chain)
    }

    fn check_q(&self, q: &DVector<f64>) -> HiqpResult<()> {
        if q.len() != self.n_joints {
            return Err(HiqpException::KinematicsFailure {
                message: format!(
                    "got {} joint positions, the tree has {} joints",
                    q.len(),
                    self.n_joints
                ),
            });
        }
        Ok(())
    }

    fn joint_motion(link: &Link, q: &DVector<f64>) -> Isometry3<f64> {
        match (link.joint_type, link.q_nr) {
            (JointType::Revolute, Some(q_nr)) => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&link.axis, q[q_nr]),
            ),
            (JointType::Prismatic, Some(q_nr)) => Isometry3::from_parts(
                Translation3::from(link.axis.into_inner() * q[q_nr]),
                UnitQuaternion::identity(),
            ),
            _ => Isometry3::identity(),
        }
    }
}

impl KinematicModel for KinematicTree {
    fn num_joints(&self) -> usize {
        self.n_joints
    }

    fn root_link(&self) -> String {
        self.links[0].name.clone()
    }

    fn has_link(&self, link: &str) -> bool {
        self.index.contains_key(link)
    }

    fn q_nr_of_link(&self, link: &str) -> Option<usize> {
        self.index.get(link).and_then(|&i| self.links[i].q_nr)
    }

    fn pose(&self, q: &DVector<f64>, link: &str) -> HiqpResult<Isometry3<f64>> {
        self.check_q(q)?;
        let mut transform = Isometry3::identity();
        for i in self.chain(link)? {
            let link = &self.links[i];
            transform *= link.origin * KinematicTree::joint_motion(link, q);
        }
        Ok(transform)
    }

    fn jacobian(&self, q: &DVector<f64>, link: &str) -> HiqpResult<Matrix6xX<f64>> {
        self.check_q(q)?;
        let mut transform = Isometry3::identity();
        let mut joints = Vec::new();
        for i in self.chain(link)? {
            let link = &self.links[i];
            transform *= link.origin;
            if let Some(q_nr) = link.q_nr {
                // joint origin and axis in the root frame before the joint moves
                let axis = transform.rotation * link.axis.into_inner();
                joints.push((q_nr, link.joint_type, transform.translation.vector, axis));
            }
            transform *= KinematicTree::joint_motion(link, q);
        }
        let p = transform.translation.vector;
        let mut jacobian = Matrix6xX::zeros(self.n_joints);
        for (q_nr, joint_type, origin, axis) in joints {
            let (linear, angular) = match joint_type {
                JointType::Revolute => (axis.cross(&(p - origin)), axis),
                _ => (axis, Vector3::zeros()),
            };
            jacobian.fixed_view_mut::<3, 1>(0, q_nr).copy_from(&linear);
            jacobian.fixed_view_mut::<3, 1>(3, q_nr).copy_from(&angular);
        }
        Ok(jacobian)
    }
}
