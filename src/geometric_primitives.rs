// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the geometric primitives tasks are defined on.
//!
//! A primitive is a named shape attached to a link of the robot (or to the root frame).
//! Its geometric parameters are given as a flat list of numbers whose layout depends on the type:
//!
//! | type       | parameters                                             |
//! |------------|--------------------------------------------------------|
//! | `point`    | `[x, y, z]`                                            |
//! | `line`     | `[dir.x, dir.y, dir.z, p.x, p.y, p.z]`                 |
//! | `plane`    | `[n.x, n.y, n.z, d]`                                   |
//! | `box`      | `[c(3), dim(3)]`, `[c(3), dim(3), euler xyz(3)]` or `[c(3), dim(3), w, x, y, z]` |
//! | `cylinder` | `[dir.x, dir.y, dir.z, p.x, p.y, p.z, radius, height]` |
//! | `sphere`   | `[c.x, c.y, c.z, radius]`                              |
//! | `frame`    | `[p(3)]`, `[p(3), euler xyz(3)]` or `[p(3), w, x, y, z]` |
use std::fmt;
use std::str::FromStr;

use crate::exception::{invalid_parameter, HiqpException, HiqpResult};
use crate::utils::Color;

mod cuboid;
mod cylinder;
mod frame;
mod line;
mod plane;
mod point;
mod primitive_map;
mod sphere;

pub use cuboid::GeometricBox;
pub use cylinder::GeometricCylinder;
pub use frame::GeometricFrame;
pub use line::GeometricLine;
pub use plane::GeometricPlane;
pub use point::GeometricPoint;
pub use primitive_map::GeometricPrimitiveMap;
pub use sphere::GeometricSphere;

/// Type tag of a geometric primitive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Point,
    Line,
    Plane,
    Box,
    Cylinder,
    Sphere,
    Frame,
}

impl PrimitiveKind {
    /// Name used in parameter lists.
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveKind::Point => "point",
            PrimitiveKind::Line => "line",
            PrimitiveKind::Plane => "plane",
            PrimitiveKind::Box => "box",
            PrimitiveKind::Cylinder => "cylinder",
            PrimitiveKind::Sphere => "sphere",
            PrimitiveKind::Frame => "frame",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PrimitiveKind {
    type Err = HiqpException;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "point" => Ok(PrimitiveKind::Point),
            "line" => Ok(PrimitiveKind::Line),
            "plane" => Ok(PrimitiveKind::Plane),
            "box" => Ok(PrimitiveKind::Box),
            "cylinder" => Ok(PrimitiveKind::Cylinder),
            "sphere" => Ok(PrimitiveKind::Sphere),
            "frame" => Ok(PrimitiveKind::Frame),
            _ => Err(HiqpException::UnknownPrimitiveType {
                name: s.to_string(),
            }),
        }
    }
}

/// The shape of a primitive, one variant per primitive type.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveShape {
    Point(GeometricPoint),
    Line(GeometricLine),
    Plane(GeometricPlane),
    Box(GeometricBox),
    Cylinder(GeometricCylinder),
    Sphere(GeometricSphere),
    Frame(GeometricFrame),
}

impl PrimitiveShape {
    /// Parses the parameters of a primitive of the given kind.
    ///
    /// # Errors
    /// * InvalidParameterCount if the number of parameters does not fit the kind.
    /// * InvalidParameter if a value cannot be used (e.g. zero-length direction).
    pub fn parse(kind: PrimitiveKind, parameters: &[f64]) -> HiqpResult<Self> {
        Ok(match kind {
            PrimitiveKind::Point => PrimitiveShape::Point(GeometricPoint::init(parameters)?),
            PrimitiveKind::Line => PrimitiveShape::Line(GeometricLine::init(parameters)?),
            PrimitiveKind::Plane => PrimitiveShape::Plane(GeometricPlane::init(parameters)?),
            PrimitiveKind::Box => PrimitiveShape::Box(GeometricBox::init(parameters)?),
            PrimitiveKind::Cylinder => {
                PrimitiveShape::Cylinder(GeometricCylinder::init(parameters)?)
            }
            PrimitiveKind::Sphere => PrimitiveShape::Sphere(GeometricSphere::init(parameters)?),
            PrimitiveKind::Frame => PrimitiveShape::Frame(GeometricFrame::init(parameters)?),
        })
    }

    pub fn kind(&self) -> PrimitiveKind {
        match self {
            PrimitiveShape::Point(_) => PrimitiveKind::Point,
            PrimitiveShape::Line(_) => PrimitiveKind::Line,
            PrimitiveShape::Plane(_) => PrimitiveKind::Plane,
            PrimitiveShape::Box(_) => PrimitiveKind::Box,
            PrimitiveShape::Cylinder(_) => PrimitiveKind::Cylinder,
            PrimitiveShape::Sphere(_) => PrimitiveKind::Sphere,
            PrimitiveShape::Frame(_) => PrimitiveKind::Frame,
        }
    }
}

/// Implemented by every shape type. Allows typed access to a [`PrimitiveShape`].
pub trait Shape: Sized + 'static {
    /// Kind tag of this shape.
    const KIND: PrimitiveKind;

    /// Returns the shape if it has this type.
    fn downcast(shape: &PrimitiveShape) -> Option<&Self>;
}

macro_rules! impl_shape {
    ($shape:ty, $variant:ident) => {
        impl Shape for $shape {
            const KIND: PrimitiveKind = PrimitiveKind::$variant;

            fn downcast(shape: &PrimitiveShape) -> Option<&Self> {
                match shape {
                    PrimitiveShape::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

impl_shape!(GeometricPoint, Point);
impl_shape!(GeometricLine, Line);
impl_shape!(GeometricPlane, Plane);
impl_shape!(GeometricBox, Box);
impl_shape!(GeometricCylinder, Cylinder);
impl_shape!(GeometricSphere, Sphere);
impl_shape!(GeometricFrame, Frame);

/// A named shape attached to a link.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricPrimitive {
    name: String,
    frame_id: String,
    visible: bool,
    color: Color,
    shape: PrimitiveShape,
}

impl GeometricPrimitive {
    /// Creates a new primitive.
    ///
    /// # Arguments
    /// * `name` - Unique name of the primitive.
    /// * `kind` - Type name, e.g. `"point"`.
    /// * `frame_id` - Name of the link the primitive is attached to.
    /// * `visible` - Whether the primitive is pushed to a visualizer.
    /// * `color` - RGBA color.
    /// * `parameters` - Type specific parameters, see the [module documentation](`self`).
    /// # Errors
    /// * UnknownPrimitiveType if `kind` is not a primitive type name.
    /// * InvalidParameterCount if the number of parameters does not fit the kind.
    /// * InvalidParameter if the name is empty, the color does not have 4 entries or a value
    ///   cannot be used.
    pub fn new(
        name: &str,
        kind: &str,
        frame_id: &str,
        visible: bool,
        color: &[f64],
        parameters: &[f64],
    ) -> HiqpResult<Self> {
        if name.is_empty() {
            return Err(invalid_parameter("primitive name must not be empty"));
        }
        if color.len() != 4 {
            return Err(invalid_parameter(format!(
                "primitive color must be RGBA (4 values), got {} values",
                color.len()
            )));
        }
        let kind = PrimitiveKind::from_str(kind)?;
        Ok(GeometricPrimitive {
            name: name.to_string(),
            frame_id: frame_id.to_string(),
            visible,
            color: [color[0], color[1], color[2], color[3]],
            shape: PrimitiveShape::parse(kind, parameters)?,
        })
    }

    /// Re-initializes the shape from new parameters of the same type. The primitive stays
    /// unchanged if the parameters are rejected.
    ///
    /// # Errors
    /// * InvalidParameterCount if the number of parameters does not fit the kind.
    /// * InvalidParameter if a value cannot be used.
    pub fn init(&mut self, parameters: &[f64]) -> HiqpResult<()> {
        self.shape = PrimitiveShape::parse(self.kind(), parameters)?;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Link the primitive is attached to.
    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn color(&self) -> &Color {
        &self.color
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.shape.kind()
    }

    pub fn shape(&self) -> &PrimitiveShape {
        &self.shape
    }

    /// Typed access to the shape, `None` if the primitive has another type.
    pub fn shape_as<T: Shape>(&self) -> Option<&T> {
        T::downcast(&self.shape)
    }
}

/// Checks the length of a parameter list against the allowed lengths of a primitive type.
pub(crate) fn check_parameter_count(
    kind: PrimitiveKind,
    parameters: &[f64],
    allowed: &[usize],
) -> HiqpResult<()> {
    if allowed.contains(&parameters.len()) {
        return Ok(());
    }
    let expected = allowed
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<String>>()
        .join(" or ");
    Err(HiqpException::InvalidParameterCount {
        kind: kind.name().to_string(),
        expected,
        got: parameters.len(),
    })
}

#[cfg(test)]
mod tests {
    use crate::exception::HiqpException;
    use crate::geometric_primitives::{
        GeometricBox, GeometricPoint, GeometricPrimitive, GeometricSphere, PrimitiveKind,
    };
    use std::str::FromStr;

    const RED: [f64; 4] = [1., 0., 0., 1.];

    #[test]
    fn kinds_parse_from_their_names() {
        for kind in [
            PrimitiveKind::Point,
            PrimitiveKind::Line,
            PrimitiveKind::Plane,
            PrimitiveKind::Box,
            PrimitiveKind::Cylinder,
            PrimitiveKind::Sphere,
            PrimitiveKind::Frame,
        ] {
            assert_eq!(PrimitiveKind::from_str(kind.name()).unwrap(), kind);
        }
        assert!(matches!(
            PrimitiveKind::from_str("capsule"),
            Err(HiqpException::UnknownPrimitiveType { .. })
        ));
    }

    #[test]
    fn typed_access_discriminates_types() {
        let primitive =
            GeometricPrimitive::new("p1", "point", "ee", true, &RED, &[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(primitive.kind(), PrimitiveKind::Point);
        let point = primitive.shape_as::<GeometricPoint>().unwrap();
        assert_eq!((point.x(), point.y(), point.z()), (0.1, 0.2, 0.3));
        assert!(primitive.shape_as::<GeometricSphere>().is_none());
        assert!(primitive.shape_as::<GeometricBox>().is_none());
        assert_eq!(primitive.frame_id(), "ee");
        assert_eq!(primitive.color(), &RED);
    }

    #[test]
    fn failed_init_keeps_previous_shape() {
        let mut primitive =
            GeometricPrimitive::new("s", "sphere", "ee", false, &RED, &[0., 0., 0., 0.1]).unwrap();
        assert!(matches!(
            primitive.init(&[1., 2., 3.]),
            Err(HiqpException::InvalidParameterCount { got: 3, .. })
        ));
        let sphere = primitive.shape_as::<GeometricSphere>().unwrap();
        assert_eq!(sphere.radius(), 0.1);
        primitive.init(&[1., 2., 3., 0.5]).unwrap();
        assert_eq!(primitive.shape_as::<GeometricSphere>().unwrap().radius(), 0.5);
    }

    #[test]
    fn construction_validates_metadata() {
        assert!(GeometricPrimitive::new("", "point", "ee", true, &RED, &[0.; 3]).is_err());
        assert!(GeometricPrimitive::new("p", "point", "ee", true, &[1., 0., 0.], &[0.; 3]).is_err());
        assert!(matches!(
            GeometricPrimitive::new("p", "torus", "ee", true, &RED, &[0.; 3]),
            Err(HiqpException::UnknownPrimitiveType { .. })
        ));
    }
}
