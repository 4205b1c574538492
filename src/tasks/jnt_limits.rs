// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the TDefJntLimits definition.
use crate::exception::{invalid_parameter, unresolved_reference, HiqpException, HiqpResult};
use crate::tasks::{TaskContext, TaskFunction, TaskType};
use crate::utils::parse_f64;

#[derive(Debug, Clone, PartialEq)]
struct JointLimit {
    link: String,
    q_nr: usize,
    lower: f64,
    upper: f64,
}

/// Keeps joints inside their position limits.
///
/// Parameters: `TDefJntLimits (<link> <q_low> <q_up>)+`. Every limited joint adds one row. The
/// nearer bound is active: close to the lower bound the row is `e = q - q_low` with
/// [`GreaterOrEqual`](TaskType::GreaterOrEqual), close to the upper bound it is `e = q - q_up`
/// with [`LessOrEqual`](TaskType::LessOrEqual).
#[derive(Debug, Clone, PartialEq)]
pub struct TDefJntLimits {
    limits: Vec<JointLimit>,
}

impl TDefJntLimits {
    pub const NAME: &'static str = "TDefJntLimits";

    pub(crate) fn init<S: AsRef<str>>(parameters: &[S], context: &TaskContext) -> HiqpResult<Self> {
        if parameters.len() < 4 || (parameters.len() - 1) % 3 != 0 {
            return Err(HiqpException::InvalidParameterCount {
                kind: Self::NAME.to_string(),
                expected: "1 + 3k (k > 0)".to_string(),
                got: parameters.len(),
            });
        }
        let model = context.robot_state.kinematics();
        let mut limits = Vec::with_capacity((parameters.len() - 1) / 3);
        for chunk in parameters[1..].chunks(3) {
            let link = chunk[0].as_ref();
            let q_nr = model.q_nr_of_link(link).ok_or_else(|| {
                unresolved_reference(format!("link '{}' is not moved by a joint", link))
            })?;
            let lower = parse_f64(chunk[1].as_ref(), "lower joint limit")?;
            let upper = parse_f64(chunk[2].as_ref(), "upper joint limit")?;
            if lower >= upper {
                return Err(invalid_parameter(format!(
                    "lower limit {} of link '{}' is not below upper limit {}",
                    lower, link, upper
                )));
            }
            limits.push(JointLimit {
                link: link.to_string(),
                q_nr,
                lower,
                upper,
            });
        }
        Ok(TDefJntLimits { limits })
    }

    pub(crate) fn dimension(&self) -> usize {
        self.limits.len()
    }

    /// Links whose joints are limited, in row order.
    pub fn links(&self) -> Vec<&str> {
        self.limits.iter().map(|l| l.link.as_str()).collect()
    }

    pub(crate) fn update(
        &mut self,
        context: &TaskContext,
        function: &mut TaskFunction,
    ) -> HiqpResult<()> {
        function.jacobian.fill(0.);
        for (row, limit) in self.limits.iter().enumerate() {
            let q = context.robot_state.q[limit.q_nr];
            if q - limit.lower <= limit.upper - q {
                function.e[row] = q - limit.lower;
                function.task_types[row] = TaskType::GreaterOrEqual;
            } else {
                function.e[row] = q - limit.upper;
                function.task_types[row] = TaskType::LessOrEqual;
            }
            function.jacobian[(row, limit.q_nr)] = 1.;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::exception::HiqpException;
    use crate::geometric_primitives::GeometricPrimitiveMap;
    use crate::tasks::test_utils::{params, planar_arm, slice_compare, state};
    use crate::tasks::{TaskContext, TaskDefinition, TaskType};

    #[test]
    fn nearer_bound_is_active() {
        let robot_state = state(planar_arm(), &[-0.8, 0.7]);
        let primitives = GeometricPrimitiveMap::new();
        let context = TaskContext::new(&robot_state, &primitives);
        let definition = TaskDefinition::initialize(
            &params(&["TDefJntLimits", "link1", "-1", "1", "link2", "-1", "1"]),
            &context,
        )
        .unwrap();
        slice_compare(definition.e().as_slice(), &[0.2, -0.3], 1e-12);
        assert_eq!(
            definition.task_types(),
            &[TaskType::GreaterOrEqual, TaskType::LessOrEqual]
        );
        assert_eq!(definition.jacobian()[(0, 0)], 1.);
        assert_eq!(definition.jacobian()[(1, 1)], 1.);
        assert_eq!(definition.jacobian()[(0, 1)], 0.);
    }

    #[test]
    fn malformed_limits_are_rejected() {
        let robot_state = state(planar_arm(), &[0., 0.]);
        let primitives = GeometricPrimitiveMap::new();
        let context = TaskContext::new(&robot_state, &primitives);
        assert!(matches!(
            TaskDefinition::initialize(&params(&["TDefJntLimits", "link1", "-1"]), &context),
            Err(HiqpException::InvalidParameterCount { .. })
        ));
        assert!(matches!(
            TaskDefinition::initialize(&params(&["TDefJntLimits", "link1", "1", "-1"]), &context),
            Err(HiqpException::InvalidParameter { .. })
        ));
        assert!(matches!(
            TaskDefinition::initialize(&params(&["TDefJntLimits", "hand", "-1", "1"]), &context),
            Err(HiqpException::UnresolvedPrimitiveReference { .. })
        ));
    }
}
