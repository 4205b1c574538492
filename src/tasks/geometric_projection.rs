// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the TDefGeomProj definition and the projection rules for pairs of primitives.
//!
//! | first    | second   | task function                                        | rows |
//! |----------|----------|------------------------------------------------------|------|
//! | point    | point    | distance between the points                          | 1    |
//! | point    | line     | distance of the point to the line                    | 1    |
//! | point    | plane    | signed distance along the plane normal               | 1    |
//! | point    | box      | signed distance to the box surface                   | 1    |
//! | point    | cylinder | distance to the axis minus the radius                | 1    |
//! | point    | sphere   | distance to the center minus the radius              | 1    |
//! | line     | line     | signed distance between the lines                    | 1    |
//! | sphere   | plane    | signed distance of the center minus the radius       | 1    |
//! | sphere   | sphere   | distance of the centers minus both radii             | 1    |
//! | frame    | frame    | difference of the origins                            | 3    |
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

use nalgebra::{RowDVector, Vector3};

use crate::exception::{invalid_parameter, unresolved_reference, HiqpException, HiqpResult};
use crate::geometric_primitives::{
    GeometricBox, GeometricCylinder, GeometricFrame, GeometricLine, GeometricPlane,
    GeometricPoint, GeometricPrimitive, GeometricPrimitiveMap, GeometricSphere, PrimitiveKind,
};
use crate::tasks::geometry::Placed;
use crate::tasks::{check_task_parameter_count, TaskContext, TaskFunction, TaskType};
use crate::utils::{skew, Jacobian3};

/// Distances below this are treated as zero; the gradient is undefined there.
const EPSILON: f64 = 1e-9;

/// One entry of a double-dispatch table.
#[derive(Copy, Clone)]
pub(crate) struct PairRule<F> {
    pub rows: usize,
    pub evaluate: F,
}

type ProjectionFn = fn(&Placed, &Placed, &mut TaskFunction) -> HiqpResult<()>;

fn projection_rules() -> &'static HashMap<(PrimitiveKind, PrimitiveKind), PairRule<ProjectionFn>>
{
    static RULES: OnceLock<HashMap<(PrimitiveKind, PrimitiveKind), PairRule<ProjectionFn>>> =
        OnceLock::new();
    RULES.get_or_init(|| {
        use PrimitiveKind::*;
        let scalar = |evaluate: ProjectionFn| PairRule { rows: 1, evaluate };
        let mut rules = HashMap::new();
        rules.insert((Point, Point), scalar(point_point));
        rules.insert((Point, Line), scalar(point_line));
        rules.insert((Point, Plane), scalar(point_plane));
        rules.insert((Point, Box), scalar(point_box));
        rules.insert((Point, Cylinder), scalar(point_cylinder));
        rules.insert((Point, Sphere), scalar(point_sphere));
        rules.insert((Line, Line), scalar(line_line));
        rules.insert((Sphere, Plane), scalar(sphere_plane));
        rules.insert((Sphere, Sphere), scalar(sphere_sphere));
        rules.insert(
            (Frame, Frame),
            PairRule {
                rows: 3,
                evaluate: frame_frame as ProjectionFn,
            },
        );
        rules
    })
}

/// The part shared by projection and alignment tasks: two primitives related by an operator.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PrimitivePair {
    pub first: String,
    pub second: String,
    pub kinds: (PrimitiveKind, PrimitiveKind),
    pub task_type: TaskType,
}

impl PrimitivePair {
    /// Parses `<typeA> <typeB> "<nameA> <op> <nameB>"` and checks the table for the pair.
    pub fn parse<S: AsRef<str>, F: Copy>(
        task: &str,
        parameters: &[S],
        rules: &HashMap<(PrimitiveKind, PrimitiveKind), PairRule<F>>,
        primitives: &GeometricPrimitiveMap,
    ) -> HiqpResult<(Self, PairRule<F>)> {
        let kinds = (
            PrimitiveKind::from_str(parameters[1].as_ref())?,
            PrimitiveKind::from_str(parameters[2].as_ref())?,
        );
        let rule = *rules
            .get(&kinds)
            .ok_or_else(|| HiqpException::UnsupportedPrimitivePair {
                task: task.to_string(),
                first: kinds.0.to_string(),
                second: kinds.1.to_string(),
            })?;
        let expression = parameters[3].as_ref();
        let tokens: Vec<&str> = expression.split_whitespace().collect();
        if tokens.len() != 3 {
            return Err(invalid_parameter(format!(
                "expected '<first> <operator> <second>', got '{}'",
                expression
            )));
        }
        let task_type = match tokens[1] {
            "=" => TaskType::Equality,
            "<" => TaskType::LessOrEqual,
            ">" => TaskType::GreaterOrEqual,
            op => {
                return Err(invalid_parameter(format!(
                    "unknown operator '{}', expected '=', '<' or '>'",
                    op
                )))
            }
        };
        let pair = PrimitivePair {
            first: tokens[0].to_string(),
            second: tokens[2].to_string(),
            kinds,
            task_type,
        };
        pair.resolve(primitives)?;
        Ok((pair, rule))
    }

    /// Looks both primitives up and checks their types.
    ///
    /// # Errors
    /// * UnresolvedPrimitiveReference if a primitive is missing or has another type.
    pub fn resolve<'a>(
        &self,
        primitives: &'a GeometricPrimitiveMap,
    ) -> HiqpResult<(&'a GeometricPrimitive, &'a GeometricPrimitive)> {
        let check = |name: &str, kind: PrimitiveKind| -> HiqpResult<&'a GeometricPrimitive> {
            let primitive = primitives.resolve(name)?;
            if primitive.kind() != kind {
                return Err(unresolved_reference(format!(
                    "primitive '{}' is a {}, expected a {}",
                    name,
                    primitive.kind(),
                    kind
                )));
            }
            Ok(primitive)
        };
        Ok((
            check(&self.first, self.kinds.0)?,
            check(&self.second, self.kinds.1)?,
        ))
    }

    /// Evaluates the kinematics of both primitives for the current robot state.
    pub fn place<'a>(&self, context: &TaskContext<'a>) -> HiqpResult<(Placed<'a>, Placed<'a>)> {
        let (first, second) = self.resolve(context.primitives)?;
        Ok((
            Placed::new(first, context.robot_state)?,
            Placed::new(second, context.robot_state)?,
        ))
    }

    pub fn names(&self) -> Vec<String> {
        vec![self.first.clone(), self.second.clone()]
    }
}

/// Projects one primitive onto another.
///
/// Parameters: `TDefGeomProj <typeA> <typeB> "<nameA> <op> <nameB>"` where `op` is `=`, `<` or
/// `>` and selects the task type of all rows. See the [module documentation](self) for the
/// supported pairs.
#[derive(Clone)]
pub struct TDefGeomProj {
    pair: PrimitivePair,
    rule: PairRule<ProjectionFn>,
}

impl std::fmt::Debug for TDefGeomProj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TDefGeomProj")
            .field("pair", &self.pair)
            .field("rows", &self.rule.rows)
            .finish()
    }
}

impl TDefGeomProj {
    pub const NAME: &'static str = "TDefGeomProj";

    pub(crate) fn init<S: AsRef<str>>(parameters: &[S], context: &TaskContext) -> HiqpResult<Self> {
        check_task_parameter_count(parameters, &[4])?;
        let (pair, rule) =
            PrimitivePair::parse(Self::NAME, parameters, projection_rules(), context.primitives)?;
        Ok(TDefGeomProj { pair, rule })
    }

    /// Whether a projection between the two primitive types exists.
    pub fn supports(first: PrimitiveKind, second: PrimitiveKind) -> bool {
        projection_rules().contains_key(&(first, second))
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
        (self.rule.evaluate)(&first, &second, function)?;
        function.task_types = vec![self.pair.task_type; self.rule.rows];
        function.performance_measures = function.e.clone();
        Ok(())
    }
}

fn set_row(function: &mut TaskFunction, row: usize, e: f64, jacobian: &RowDVector<f64>) {
    function.e[row] = e;
    function.jacobian.row_mut(row).copy_from(jacobian);
}

/// Norm of `d` and its Jacobian; zero row where the direction is undefined.
fn distance(d: &Vector3<f64>, jacobian: &Jacobian3) -> (f64, RowDVector<f64>) {
    let norm = d.norm();
    if norm < EPSILON {
        return (norm, RowDVector::zeros(jacobian.ncols()));
    }
    (norm, (d / norm).transpose() * jacobian)
}

/// Distance of point `p` to the line through `l0` along the unit direction `v`.
pub(crate) fn point_line_distance(
    (p, jp): &(Vector3<f64>, Jacobian3),
    (l0, jl0): &(Vector3<f64>, Jacobian3),
    (v, jv): &(Vector3<f64>, Jacobian3),
) -> (f64, RowDVector<f64>) {
    let w = p - l0;
    let along = v.dot(&w);
    let d = w - v * along;
    let norm = d.norm();
    if norm < EPSILON {
        return (norm, RowDVector::zeros(jp.ncols()));
    }
    let n = d / norm;
    (norm, n.transpose() * (jp - jl0) - n.transpose() * jv * along)
}

/// Signed distance of point `p` to the plane through `c` with unit normal `n`.
fn point_plane_distance(
    (p, jp): &(Vector3<f64>, Jacobian3),
    (c, jc): &(Vector3<f64>, Jacobian3),
    (n, jn): &(Vector3<f64>, Jacobian3),
) -> (f64, RowDVector<f64>) {
    let w = p - c;
    (n.dot(&w), n.transpose() * (jp - jc) + w.transpose() * jn)
}

fn point_point(a: &Placed, b: &Placed, function: &mut TaskFunction) -> HiqpResult<()> {
    let (p, jp) = a.kinematics.point(a.shape::<GeometricPoint>()?.point());
    let (q, jq) = b.kinematics.point(b.shape::<GeometricPoint>()?.point());
    let (e, jacobian) = distance(&(p - q), &(jp - jq));
    set_row(function, 0, e, &jacobian);
    Ok(())
}

fn point_line(a: &Placed, b: &Placed, function: &mut TaskFunction) -> HiqpResult<()> {
    let line = b.shape::<GeometricLine>()?;
    let (e, jacobian) = point_line_distance(
        &a.kinematics.point(a.shape::<GeometricPoint>()?.point()),
        &b.kinematics.point(line.point()),
        &b.kinematics.direction(line.direction()),
    );
    set_row(function, 0, e, &jacobian);
    Ok(())
}

fn point_plane(a: &Placed, b: &Placed, function: &mut TaskFunction) -> HiqpResult<()> {
    let plane = b.shape::<GeometricPlane>()?;
    let (e, jacobian) = point_plane_distance(
        &a.kinematics.point(a.shape::<GeometricPoint>()?.point()),
        &b.kinematics.point(&plane.point_on_plane()),
        &b.kinematics.direction(plane.normal()),
    );
    set_row(function, 0, e, &jacobian);
    Ok(())
}

/// Signed distance of a point given in box coordinates to the box surface and the outward
/// gradient in box coordinates.
fn box_distance(r: &Vector3<f64>, half_extents: &Vector3<f64>) -> (f64, Vector3<f64>) {
    let q = r.abs() - half_extents;
    let outside = q.map(|x| x.max(0.));
    let norm = outside.norm();
    if norm > 0. {
        return (norm, outside.component_mul(&r.map(f64::signum)) / norm);
    }
    let mut axis = 0;
    for i in 1..3 {
        if q[i] > q[axis] {
            axis = i;
        }
    }
    let mut gradient = Vector3::zeros();
    gradient[axis] = r[axis].signum();
    (q[axis], gradient)
}

fn point_box(a: &Placed, b: &Placed, function: &mut TaskFunction) -> HiqpResult<()> {
    let cuboid = b.shape::<GeometricBox>()?;
    let (p, jp) = a.kinematics.point(a.shape::<GeometricPoint>()?.point());
    let (c, _) = b.kinematics.point(cuboid.center());
    let rotation = b.kinematics.pose().rotation * cuboid.orientation();
    let r = rotation.inverse() * (p - c);
    let (e, gradient) = box_distance(&r, &cuboid.half_extents());
    let gradient = rotation * gradient;
    let jacobian = gradient.transpose() * (jp - b.kinematics.jacobian_at(&p));
    set_row(function, 0, e, &jacobian);
    Ok(())
}

fn point_cylinder(a: &Placed, b: &Placed, function: &mut TaskFunction) -> HiqpResult<()> {
    let cylinder = b.shape::<GeometricCylinder>()?;
    let (d, jacobian) = point_line_distance(
        &a.kinematics.point(a.shape::<GeometricPoint>()?.point()),
        &b.kinematics.point(cylinder.point()),
        &b.kinematics.direction(cylinder.direction()),
    );
    set_row(function, 0, d - cylinder.radius(), &jacobian);
    Ok(())
}

fn point_sphere(a: &Placed, b: &Placed, function: &mut TaskFunction) -> HiqpResult<()> {
    let sphere = b.shape::<GeometricSphere>()?;
    let (p, jp) = a.kinematics.point(a.shape::<GeometricPoint>()?.point());
    let (c, jc) = b.kinematics.point(sphere.center());
    let (d, jacobian) = distance(&(p - c), &(jp - jc));
    set_row(function, 0, d - sphere.radius(), &jacobian);
    Ok(())
}

/// Signed distance between two lines along their common normal. Parallel lines fall back to
/// the distance of the second line's point to the first line.
fn line_line(a: &Placed, b: &Placed, function: &mut TaskFunction) -> HiqpResult<()> {
    let (first, second) = (a.shape::<GeometricLine>()?, b.shape::<GeometricLine>()?);
    let (p1, jp1) = a.kinematics.point(first.point());
    let (v1, jv1) = a.kinematics.direction(first.direction());
    let (p2, jp2) = b.kinematics.point(second.point());
    let (v2, jv2) = b.kinematics.direction(second.direction());
    let cross = v1.cross(&v2);
    let cross_norm = cross.norm();
    if cross_norm < EPSILON {
        let (e, jacobian) = point_line_distance(&(p2, jp2), &(p1, jp1), &(v1, jv1));
        set_row(function, 0, e, &jacobian);
        return Ok(());
    }
    let m = cross / cross_norm;
    let w = p2 - p1;
    let e = w.dot(&m);
    let u = (w - m * e) / cross_norm;
    let jacobian = m.transpose() * (jp2 - jp1)
        + u.transpose() * (skew(&v1) * jv2 - skew(&v2) * jv1);
    set_row(function, 0, e, &jacobian);
    Ok(())
}

fn sphere_plane(a: &Placed, b: &Placed, function: &mut TaskFunction) -> HiqpResult<()> {
    let sphere = a.shape::<GeometricSphere>()?;
    let plane = b.shape::<GeometricPlane>()?;
    let (d, jacobian) = point_plane_distance(
        &a.kinematics.point(sphere.center()),
        &b.kinematics.point(&plane.point_on_plane()),
        &b.kinematics.direction(plane.normal()),
    );
    set_row(function, 0, d - sphere.radius(), &jacobian);
    Ok(())
}

fn sphere_sphere(a: &Placed, b: &Placed, function: &mut TaskFunction) -> HiqpResult<()> {
    let (first, second) = (a.shape::<GeometricSphere>()?, b.shape::<GeometricSphere>()?);
    let (c1, jc1) = a.kinematics.point(first.center());
    let (c2, jc2) = b.kinematics.point(second.center());
    let (d, jacobian) = distance(&(c1 - c2), &(jc1 - jc2));
    set_row(function, 0, d - first.radius() - second.radius(), &jacobian);
    Ok(())
}

fn frame_frame(a: &Placed, b: &Placed, function: &mut TaskFunction) -> HiqpResult<()> {
    let (pa, ja) = a.kinematics.point(a.shape::<GeometricFrame>()?.origin());
    let (pb, jb) = b.kinematics.point(b.shape::<GeometricFrame>()?.origin());
    function.e.fixed_rows_mut::<3>(0).copy_from(&(pa - pb));
    function.jacobian.fixed_rows_mut::<3>(0).copy_from(&(ja - jb));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::exception::{status_code, HiqpException};
    use crate::geometric_primitives::{GeometricPrimitiveMap, PrimitiveKind};
    use crate::tasks::test_utils::{
        assert_jacobian_matches, params, planar_arm, slice_compare, spatial_arm, state, COLOR,
    };
    use crate::tasks::{TDefGeomProj, TaskContext, TaskDefinition, TaskType};

    fn primitives() -> GeometricPrimitiveMap {
        let mut map = GeometricPrimitiveMap::new();
        let mut set = |name: &str, kind: &str, frame: &str, parameters: &[f64]| {
            map.set(name, kind, frame, true, &COLOR, parameters).unwrap()
        };
        set("tip", "point", "wrist", &[0.1, 0.05, -0.02]);
        set("elbow_point", "point", "elbow", &[0.05, 0.1, 0.2]);
        set("target", "point", "world", &[0.6, 0.2, 0.7]);
        set("tool_axis", "line", "wrist", &[0.2, 1., 0.3, 0.05, 0., 0.1]);
        set("rail", "line", "world", &[1., 0.2, -0.1, 0.2, 0.9, 0.1]);
        set("table", "plane", "world", &[0.1, 0.2, 1., 0.05]);
        set("tilted", "plane", "elbow", &[0.3, -0.4, 1., 0.2]);
        set("crate", "box", "world", &[0.9, -0.3, 0.2, 0.2, 0.3, 0.4, 0.1, -0.2, 0.3]);
        set("pillar", "cylinder", "world", &[0.1, 0.2, 1., 1.2, 0.5, 0., 0.1, 1.]);
        set("ball", "sphere", "world", &[0.8, 0.4, 0.6, 0.1]);
        set("hand", "sphere", "wrist", &[0.05, 0.02, 0.03, 0.04]);
        set("tcp", "frame", "wrist", &[0.1, 0., 0.05, 0.1, 0.2, 0.3]);
        set("goal", "frame", "world", &[0.5, 0.3, 0.4]);
        map
    }

    fn project(kinds: (&str, &str), expression: &str) -> Vec<String> {
        params(&["TDefGeomProj", kinds.0, kinds.1, expression])
    }

    #[test]
    fn jacobians_match_finite_differences() {
        let map = primitives();
        let cases = [
            project(("point", "point"), "tip = target"),
            project(("point", "point"), "tip = elbow_point"),
            project(("point", "line"), "tip = rail"),
            project(("point", "line"), "target = tool_axis"),
            project(("point", "plane"), "tip > table"),
            project(("point", "plane"), "tip > tilted"),
            project(("point", "box"), "tip > crate"),
            project(("point", "cylinder"), "tip > pillar"),
            project(("point", "sphere"), "tip > ball"),
            project(("line", "line"), "tool_axis = rail"),
            project(("sphere", "plane"), "hand > table"),
            project(("sphere", "sphere"), "hand > ball"),
            project(("frame", "frame"), "tcp = goal"),
        ];
        for parameters in cases.iter() {
            assert_jacobian_matches(&[0.3, -0.4, 0.7], &map, spatial_arm, |context| {
                TaskDefinition::initialize(parameters, context)
                    .unwrap()
                    .function()
                    .clone()
            });
        }
    }

    #[test]
    fn point_inside_box_has_negative_distance() {
        let mut map = GeometricPrimitiveMap::new();
        map.set("p", "point", "ee", true, &COLOR, &[0., 0., 0.])
            .unwrap();
        map.set("b", "box", "base", true, &COLOR, &[1.4, 0., 0., 0.4, 1., 1.])
            .unwrap();
        let robot_state = state(planar_arm(), &[0., 0.]);
        let context = TaskContext::new(&robot_state, &map);
        let definition =
            TaskDefinition::initialize(&project(("point", "box"), "p > b"), &context).unwrap();
        assert!((definition.e()[0] + 0.1).abs() < 1e-12);
        // the nearest face is at x = 1.6, moving along y does not change the distance
        slice_compare(
            definition.jacobian().row(0).clone_owned().as_slice(),
            &[0., 0.],
            1e-12,
        );
        assert_eq!(definition.task_types(), &[TaskType::GreaterOrEqual]);
    }

    #[test]
    fn operators_select_task_types() {
        let map = primitives();
        let robot_state = state(spatial_arm(), &[0., 0., 0.]);
        let context = TaskContext::new(&robot_state, &map);
        for (op, task_type) in [
            ("=", TaskType::Equality),
            ("<", TaskType::LessOrEqual),
            (">", TaskType::GreaterOrEqual),
        ] {
            let expression = format!("tcp {} goal", op);
            let definition =
                TaskDefinition::initialize(&project(("frame", "frame"), &expression), &context)
                    .unwrap();
            assert_eq!(definition.task_types(), &[task_type; 3]);
            assert_eq!(definition.primitive_names(), vec!["tcp", "goal"]);
        }
        assert!(matches!(
            TaskDefinition::initialize(&project(("frame", "frame"), "tcp <= goal"), &context),
            Err(HiqpException::InvalidParameter { .. })
        ));
        assert!(matches!(
            TaskDefinition::initialize(&project(("frame", "frame"), "tcp goal"), &context),
            Err(HiqpException::InvalidParameter { .. })
        ));
    }

    #[test]
    fn unsupported_pairs_and_references_are_rejected() {
        let map = primitives();
        let robot_state = state(spatial_arm(), &[0., 0., 0.]);
        let context = TaskContext::new(&robot_state, &map);
        let result = TaskDefinition::initialize(&project(("box", "box"), "crate = crate"), &context);
        assert!(matches!(
            result,
            Err(HiqpException::UnsupportedPrimitivePair { .. })
        ));
        assert_eq!(status_code(&result), -2);
        let result = TaskDefinition::initialize(&project(("point", "point"), "tip = nowhere"), &context);
        assert_eq!(status_code(&result), -3);
        let result = TaskDefinition::initialize(&project(("point", "point"), "tip = ball"), &context);
        assert!(matches!(
            result,
            Err(HiqpException::UnresolvedPrimitiveReference { .. })
        ));
        assert!(matches!(
            TaskDefinition::initialize(&project(("point", "torus"), "tip = ball"), &context),
            Err(HiqpException::UnknownPrimitiveType { .. })
        ));
        assert!(!TDefGeomProj::supports(PrimitiveKind::Plane, PrimitiveKind::Point));
        assert!(TDefGeomProj::supports(PrimitiveKind::Point, PrimitiveKind::Plane));
    }
}
