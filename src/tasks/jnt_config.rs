// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the TDefJntConfig definition.
use crate::exception::{unresolved_reference, HiqpResult};
use crate::tasks::{check_task_parameter_count, TaskContext, TaskFunction, TaskType};
use crate::utils::parse_f64;

/// Drives the joint of one link to a desired position.
///
/// Parameters: `TDefJntConfig <link> <desired>`.
#[derive(Debug, Clone, PartialEq)]
pub struct TDefJntConfig {
    link: String,
    q_nr: usize,
    desired: f64,
}

impl TDefJntConfig {
    pub const NAME: &'static str = "TDefJntConfig";

    pub(crate) fn init<S: AsRef<str>>(parameters: &[S], context: &TaskContext) -> HiqpResult<Self> {
        check_task_parameter_count(parameters, &[3])?;
        let link = parameters[1].as_ref();
        let q_nr = context
            .robot_state
            .kinematics()
            .q_nr_of_link(link)
            .ok_or_else(|| unresolved_reference(format!("link '{}' is not moved by a joint", link)))?;
        Ok(TDefJntConfig {
            link: link.to_string(),
            q_nr,
            desired: parse_f64(parameters[2].as_ref(), "desired joint position")?,
        })
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn desired(&self) -> f64 {
        self.desired
    }

    pub(crate) fn update(
        &mut self,
        context: &TaskContext,
        function: &mut TaskFunction,
    ) -> HiqpResult<()> {
        function.e[0] = context.robot_state.q[self.q_nr] - self.desired;
        function.jacobian.fill(0.);
        function.jacobian[(0, self.q_nr)] = 1.;
        function.task_types[0] = TaskType::Equality;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::exception::{status_code, HiqpException};
    use crate::geometric_primitives::GeometricPrimitiveMap;
    use crate::tasks::test_utils::{params, planar_arm, state};
    use crate::tasks::{TaskContext, TaskDefinition};

    #[test]
    fn selects_the_joint_of_the_link() {
        let robot_state = state(planar_arm(), &[0.5, -0.3]);
        let primitives = GeometricPrimitiveMap::new();
        let context = TaskContext::new(&robot_state, &primitives);
        let definition =
            TaskDefinition::initialize(&params(&["TDefJntConfig", "link2", "0.2"]), &context)
                .unwrap();
        assert!((definition.e()[0] + 0.5).abs() < 1e-12);
        assert_eq!(definition.jacobian().row(0).clone_owned().as_slice(), &[0., 1.]);
    }

    #[test]
    fn links_without_joint_are_rejected() {
        let robot_state = state(planar_arm(), &[0., 0.]);
        let primitives = GeometricPrimitiveMap::new();
        let context = TaskContext::new(&robot_state, &primitives);
        let result = TaskDefinition::initialize(&params(&["TDefJntConfig", "ee", "0.2"]), &context);
        assert_eq!(status_code(&result), -3);
        assert!(matches!(
            TaskDefinition::initialize(&params(&["TDefJntConfig", "link1"]), &context),
            Err(HiqpException::InvalidParameterCount { got: 2, .. })
        ));
    }
}
