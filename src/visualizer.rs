// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the interface to an external visualization.
use nalgebra::{Isometry3, Vector3};

use crate::geometric_primitives::GeometricPrimitive;
use crate::utils::Color;

/// Receives primitives and debug artifacts. Implementations must not block.
#[cfg_attr(test, mockall::automock)]
pub trait Visualizer {
    /// Draws a primitive whose link has the given pose in the root frame.
    fn render_primitive(&mut self, primitive: &GeometricPrimitive, link_pose: &Isometry3<f64>);

    /// Draws an arrow between two points of the root frame.
    fn render_arrow(
        &mut self,
        namespace: &str,
        start: &Vector3<f64>,
        end: &Vector3<f64>,
        color: &Color,
    );
}
