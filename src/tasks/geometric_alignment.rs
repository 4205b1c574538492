// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the TDefGeomAlign definition and the alignment rules for pairs of primitives.
//!
//! Scalar rules compare the cosine of the angle between two directions with the cosine of the
//! desired angle:
//!
//! | first | second   | direction of the second primitive           |
//! |-------|----------|---------------------------------------------|
//! | line  | line     | line direction                              |
//! | line  | plane    | plane normal                                |
//! | line  | cylinder | cylinder axis                               |
//! | line  | sphere   | from the line point towards the center      |
//! | frame | frame    | three rows: `0.5 * sum(a_k x b_k)` over the frame axes, zero when the frames are aligned |
use std::collections::HashMap;
use std::sync::OnceLock;

use nalgebra::{Matrix3, RowDVector, Vector3};

use crate::exception::{invalid_parameter, HiqpResult};
use crate::geometric_primitives::{
    GeometricCylinder, GeometricFrame, GeometricLine, GeometricPlane, GeometricSphere,
    PrimitiveKind,
};
use crate::tasks::geometric_projection::{PairRule, PrimitivePair};
use crate::tasks::geometry::Placed;
use crate::tasks::{check_task_parameter_count, TaskContext, TaskFunction};
use crate::utils::{parse_f64, skew, Jacobian3};

/// Second argument is the cosine of the desired angle.
type AlignmentFn = fn(&Placed, &Placed, f64, &mut TaskFunction) -> HiqpResult<()>;

fn alignment_rules() -> &'static HashMap<(PrimitiveKind, PrimitiveKind), PairRule<AlignmentFn>> {
    static RULES: OnceLock<HashMap<(PrimitiveKind, PrimitiveKind), PairRule<AlignmentFn>>> =
        OnceLock::new();
    RULES.get_or_init(|| {
        use PrimitiveKind::*;
        let scalar = |evaluate: AlignmentFn| PairRule { rows: 1, evaluate };
        let mut rules = HashMap::new();
        rules.insert((Line, Line), scalar(line_line));
        rules.insert((Line, Plane), scalar(line_plane));
        rules.insert((Line, Cylinder), scalar(line_cylinder));
        rules.insert((Line, Sphere), scalar(line_sphere));
        rules.insert(
            (Frame, Frame),
            PairRule {
                rows: 3,
                evaluate: frame_frame as AlignmentFn,
            },
        );
        rules
    })
}

/// Aligns the directions of two primitives.
///
/// Parameters: `TDefGeomAlign <typeA> <typeB> "<nameA> <op> <nameB>" [angle]` with the desired
/// angle in radians (default 0). Frames can only be aligned with an angle of zero.
#[derive(Clone)]
pub struct TDefGeomAlign {
    pair: PrimitivePair,
    rule: PairRule<AlignmentFn>,
    angle: f64,
}

impl std::fmt::Debug for TDefGeomAlign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TDefGeomAlign")
            .field("pair", &self.pair)
            .field("rows", &self.rule.rows)
            .field("angle", &self.angle)
            .finish()
    }
}

impl TDefGeomAlign {
    pub const NAME: &'static str = "TDefGeomAlign";

    pub(crate) fn init<S: AsRef<str>>(parameters: &[S], context: &TaskContext) -> HiqpResult<Self> {
        check_task_parameter_count(parameters, &[4, 5])?;
        let (pair, rule) =
            PrimitivePair::parse(Self::NAME, parameters, alignment_rules(), context.primitives)?;
        let angle = match parameters.get(4) {
            Some(token) => parse_f64(token.as_ref(), "alignment angle")?,
            None => 0.,
        };
        if pair.kinds == (PrimitiveKind::Frame, PrimitiveKind::Frame) && angle != 0. {
            return Err(invalid_parameter(format!(
                "frames can only be aligned with an angle of 0, got {}",
                angle
            )));
        }
        Ok(TDefGeomAlign { pair, rule, angle })
    }

    /// Whether an alignment between the two primitive types exists.
    pub fn supports(first: PrimitiveKind, second: PrimitiveKind) -> bool {
        alignment_rules().contains_key(&(first, second))
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub(crate) fn dimension(&self) -> usize {
        self.rule.rows
    }

    pub(crate) fn primitive_names(&self) -> Vec<String> {
        self.pair.names()
    }

    pub(crate) fn update(
        &mut self,
        context: &TaskContext,
        function: &mut TaskFunction,
    ) -> HiqpResult<()> {
        let (first, second) = self.pair.place(context)?;
        (self.rule.evaluate)(&first, &second, self.angle.cos(), function)?;
        function.task_types = vec![self.pair.task_type; self.rule.rows];
        function.performance_measures = function.e.clone();
        Ok(())
    }
}

/// `v1 . v2 - cos_angle` and its Jacobian.
fn cosine_row(
    function: &mut TaskFunction,
    (v1, jv1): &(Vector3<f64>, Jacobian3),
    (v2, jv2): &(Vector3<f64>, Jacobian3),
    cos_angle: f64,
) {
    let jacobian: RowDVector<f64> = v2.transpose() * jv1 + v1.transpose() * jv2;
    function.e[0] = v1.dot(v2) - cos_angle;
    function.jacobian.row_mut(0).copy_from(&jacobian);
}

fn line_line(a: &Placed, b: &Placed, cos_angle: f64, function: &mut TaskFunction) -> HiqpResult<()> {
    cosine_row(
        function,
        &a.kinematics.direction(a.shape::<GeometricLine>()?.direction()),
        &b.kinematics.direction(b.shape::<GeometricLine>()?.direction()),
        cos_angle,
    );
    Ok(())
}

fn line_plane(a: &Placed, b: &Placed, cos_angle: f64, function: &mut TaskFunction) -> HiqpResult<()> {
    cosine_row(
        function,
        &a.kinematics.direction(a.shape::<GeometricLine>()?.direction()),
        &b.kinematics.direction(b.shape::<GeometricPlane>()?.normal()),
        cos_angle,
    );
    Ok(())
}

fn line_cylinder(
    a: &Placed,
    b: &Placed,
    cos_angle: f64,
    function: &mut TaskFunction,
) -> HiqpResult<()> {
    cosine_row(
        function,
        &a.kinematics.direction(a.shape::<GeometricLine>()?.direction()),
        &b.kinematics.direction(b.shape::<GeometricCylinder>()?.direction()),
        cos_angle,
    );
    Ok(())
}

fn line_sphere(a: &Placed, b: &Placed, cos_angle: f64, function: &mut TaskFunction) -> HiqpResult<()> {
    let line = a.shape::<GeometricLine>()?;
    let (l0, jl0) = a.kinematics.point(line.point());
    let (c, jc) = b.kinematics.point(b.shape::<GeometricSphere>()?.center());
    let d = c - l0;
    let length = d.norm();
    if length < f64::EPSILON {
        // the line starts in the center, every direction points at the sphere
        function.e[0] = 0.;
        function.jacobian.row_mut(0).fill(0.);
        return Ok(());
    }
    let u = d / length;
    let (v, jv) = a.kinematics.direction(line.direction());
    let projector = (Matrix3::identity() - u * u.transpose()) / length;
    let ju = projector * (jc - jl0);
    cosine_row(function, &(v, jv), &(u, ju), cos_angle);
    Ok(())
}

fn frame_frame(a: &Placed, b: &Placed, _: f64, function: &mut TaskFunction) -> HiqpResult<()> {
    let frame_a = a.shape::<GeometricFrame>()?;
    let frame_b = b.shape::<GeometricFrame>()?;
    let mut e = Vector3::zeros();
    let mut jacobian = Jacobian3::zeros(function.jacobian.ncols());
    for axis in [Vector3::x(), Vector3::y(), Vector3::z()] {
        let (u, ju) = a.kinematics.direction(&(frame_a.orientation() * axis));
        let (w, jw) = b.kinematics.direction(&(frame_b.orientation() * axis));
        e += u.cross(&w) * 0.5;
        jacobian += (skew(&u) * jw - skew(&w) * ju) * 0.5;
    }
    function.e.fixed_rows_mut::<3>(0).copy_from(&e);
    function.jacobian.fixed_rows_mut::<3>(0).copy_from(&jacobian);
    Ok(())
}
