// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the interface to the collision distance field used by obstacle avoidance tasks.
use std::fmt;

use nalgebra::Vector3;
use tracing::debug;

use crate::exception::{HiqpException, HiqpResult};

/// A distance field around the obstacles in the environment.
#[cfg_attr(test, mockall::automock)]
pub trait DistanceField: Send {
    /// Starts answering queries.
    fn activate(&mut self);

    /// Stops answering queries and releases resources held for the queries.
    fn deactivate(&mut self);

    /// Computes one gradient per point. A gradient points from the query point towards the
    /// nearest obstacle and its norm is the distance to that obstacle.
    ///
    /// # Arguments
    /// * `points` - Query points.
    /// * `gradients` - Receives the gradients, one per point.
    /// * `frame_id` - Frame the points and gradients are expressed in.
    /// # Return
    /// `false` if the field could not be queried.
    fn obstacle_gradient_bulk(
        &mut self,
        points: &[Vector3<f64>],
        gradients: &mut Vec<Vector3<f64>>,
        frame_id: &str,
    ) -> bool;

    /// Whether a gradient carries information, e.g. `false` outside of the mapped region.
    fn is_valid(&self, gradient: &Vector3<f64>) -> bool;
}

/// Creates one distance field per obstacle avoidance task.
#[cfg_attr(test, mockall::automock)]
pub trait DistanceFieldProvider: Send + Sync {
    /// # Errors
    /// * CollisionCheckFailure if no distance field can be created.
    fn create(&self) -> HiqpResult<Box<dyn DistanceField>>;
}

/// A distance field which is active for as long as the handle lives.
pub struct ScopedDistanceField {
    field: Box<dyn DistanceField>,
}

impl ScopedDistanceField {
    /// Activates the field.
    pub fn new(mut field: Box<dyn DistanceField>) -> Self {
        field.activate();
        debug!("activated distance field");
        ScopedDistanceField { field }
    }

    /// Queries the gradients of all points.
    ///
    /// # Errors
    /// * CollisionCheckFailure if the query fails or does not return one gradient per point.
    pub fn gradients(
        &mut self,
        points: &[Vector3<f64>],
        frame_id: &str,
    ) -> HiqpResult<Vec<Vector3<f64>>> {
        let mut gradients = Vec::with_capacity(points.len());
        if !self
            .field
            .obstacle_gradient_bulk(points, &mut gradients, frame_id)
        {
            return Err(HiqpException::CollisionCheckFailure {
                message: "distance field query failed".to_string(),
            });
        }
        if gradients.len() != points.len() {
            return Err(HiqpException::CollisionCheckFailure {
                message: format!(
                    "distance field returned {} gradients for {} points",
                    gradients.len(),
                    points.len()
                ),
            });
        }
        Ok(gradients)
    }

    pub fn is_valid(&self, gradient: &Vector3<f64>) -> bool {
        self.field.is_valid(gradient)
    }
}

impl Drop for ScopedDistanceField {
    fn drop(&mut self) {
        self.field.deactivate();
        debug!("deactivated distance field");
    }
}

impl fmt::Debug for ScopedDistanceField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ScopedDistanceField").finish_non_exhaustive()
    }
}
