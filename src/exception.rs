// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains exception, status code and Result definitions
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::ToPrimitive;
use thiserror::Error;

/// Represents all kind of errors which can occur while configuring tasks and primitives or
/// while computing velocity controls.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HiqpException {
    /// A parameter list has a length which is not allowed for the requested type.
    #[error("{kind} expects {expected} parameters, got {got}")]
    InvalidParameterCount {
        /// Name of the primitive, task definition or task dynamics type.
        kind: String,
        /// Human readable description of the allowed lengths.
        expected: String,
        /// Number of parameters received.
        got: usize,
    },

    /// A parameter has the right position but a value which cannot be used.
    #[error("{message}")]
    InvalidParameter { message: String },

    /// No task definition parameters were given.
    #[error("no (zero) task definition parameters found")]
    EmptyDefParams,

    /// No task dynamics parameters were given.
    #[error("no (zero) task dynamics parameters found")]
    EmptyDynParams,

    /// The first token of a definition or dynamics parameter list is unknown.
    #[error("the task type name '{name}' was not understood")]
    UnknownTaskType { name: String },

    /// The type name of a geometric primitive is unknown.
    #[error("the primitive type name '{name}' was not understood")]
    UnknownPrimitiveType { name: String },

    /// A projection or alignment task was requested for a pair of primitive types which has no
    /// rule.
    #[error("{task} does not support the primitive combination '{first}' and '{second}'")]
    UnsupportedPrimitivePair {
        task: String,
        first: String,
        second: String,
    },

    /// A referenced primitive does not exist or has a different type than expected.
    #[error("{message}")]
    UnresolvedPrimitiveReference { message: String },

    /// No task with this name is registered.
    #[error("no task named '{name}' is registered")]
    UnknownTask { name: String },

    /// A primitive cannot be removed because tasks still reference it.
    #[error("primitive '{primitive}' is still referenced by the tasks {tasks:?}")]
    PrimitiveInUse {
        primitive: String,
        tasks: Vec<String>,
    },

    /// Sizes of task function, Jacobian, task types and desired dynamics disagree.
    #[error("{message}")]
    DimensionMismatch { message: String },

    /// The kinematic model could not compute a pose or Jacobian.
    #[error("{message}")]
    KinematicsFailure { message: String },

    /// The distance field could not be queried.
    #[error("{message}")]
    CollisionCheckFailure { message: String },

    /// The hierarchical solver did not find a solution.
    #[error("solver failed at priority level {level}: {message}")]
    SolverInfeasible { level: usize, message: String },

    /// RealTimeException is thrown if the real-time priority cannot be set
    #[error("{message}")]
    RealTimeException { message: String },
}

/// Integer status codes of the configuration surface. `0` is success, every error maps to one
/// negative value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum StatusCode {
    Success = 0,
    MalformedParameters = -1,
    UnrecognizedType = -2,
    UnrecognizedName = -3,
    RuntimeFailure = -4,
    SolverFailure = -5,
}

impl HiqpException {
    /// Status code reported for this error on the integer surface.
    pub fn status(&self) -> StatusCode {
        match self {
            HiqpException::InvalidParameterCount { .. }
            | HiqpException::InvalidParameter { .. }
            | HiqpException::EmptyDefParams
            | HiqpException::EmptyDynParams
            | HiqpException::DimensionMismatch { .. } => StatusCode::MalformedParameters,
            HiqpException::UnknownTaskType { .. }
            | HiqpException::UnknownPrimitiveType { .. }
            | HiqpException::UnsupportedPrimitivePair { .. } => StatusCode::UnrecognizedType,
            HiqpException::UnresolvedPrimitiveReference { .. }
            | HiqpException::UnknownTask { .. }
            | HiqpException::PrimitiveInUse { .. } => StatusCode::UnrecognizedName,
            HiqpException::KinematicsFailure { .. }
            | HiqpException::CollisionCheckFailure { .. }
            | HiqpException::RealTimeException { .. } => StatusCode::RuntimeFailure,
            HiqpException::SolverInfeasible { .. } => StatusCode::SolverFailure,
        }
    }
}

/// converts any result into the integer code of the configuration surface
pub fn status_code<T>(result: &HiqpResult<T>) -> i32 {
    let status = match result {
        Ok(_) => StatusCode::Success,
        Err(error) => error.status(),
    };
    status.to_i32().unwrap_or(i32::MIN)
}

/// creates an InvalidParameter exception from anything printable
pub(crate) fn invalid_parameter<S: Into<String>>(message: S) -> HiqpException {
    HiqpException::InvalidParameter {
        message: message.into(),
    }
}

/// creates an UnresolvedPrimitiveReference exception from anything printable
pub(crate) fn unresolved_reference<S: Into<String>>(message: S) -> HiqpException {
    HiqpException::UnresolvedPrimitiveReference {
        message: message.into(),
    }
}

/// Result type which can have HiqpException as Error
pub type HiqpResult<T> = Result<T, HiqpException>;
