// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the TDynMinJerk dynamics.
use nalgebra::DVector;

use crate::exception::{HiqpException, HiqpResult};
use crate::robot_state::RobotState;
use crate::tasks::check_task_parameter_count;
use crate::utils::parse_positive;

/// Minimal jerk transition from the initial to the final task function value.
///
/// Parameters: `TDynMinJerk <duration> <lambda>` with the duration in seconds.
///
/// The reference follows `e_ref(t) = e_initial + (e_final - e_initial) * s(t / duration)` with
/// `s(tau) = 10 tau^3 - 15 tau^4 + 6 tau^5`, which has zero velocity and acceleration at both
/// ends. The desired rate is the reference rate plus a first order correction towards the
/// reference. Once the duration has passed, the dynamics decay towards `e_final`.
/// The elapsed time advances by the sampling time of the robot state on every update.
#[derive(Debug, Clone, PartialEq)]
pub struct TDynMinJerk {
    duration: f64,
    lambda: f64,
    elapsed: f64,
    e_initial: DVector<f64>,
    e_final: DVector<f64>,
}

impl TDynMinJerk {
    pub const NAME: &'static str = "TDynMinJerk";

    pub(crate) fn init<S: AsRef<str>>(
        parameters: &[S],
        e_initial: &DVector<f64>,
        e_final: &DVector<f64>,
    ) -> HiqpResult<Self> {
        check_task_parameter_count(parameters, &[3])?;
        if e_initial.len() != e_final.len() {
            return Err(HiqpException::DimensionMismatch {
                message: format!(
                    "initial task value has {} rows, final task value has {} rows",
                    e_initial.len(),
                    e_final.len()
                ),
            });
        }
        Ok(TDynMinJerk {
            duration: parse_positive(parameters[1].as_ref(), "duration")?,
            lambda: parse_positive(parameters[2].as_ref(), "lambda")?,
            elapsed: 0.,
            e_initial: e_initial.clone(),
            e_final: e_final.clone(),
        })
    }

    /// Normalized position and velocity of the profile at phase `tau`.
    pub fn profile(tau: f64) -> (f64, f64) {
        let tau = tau.clamp(0., 1.);
        let s = tau.powi(3) * (10. - 15. * tau + 6. * tau.powi(2));
        let ds = 30. * tau.powi(2) * (1. - tau).powi(2);
        (s, ds)
    }

    /// Reference value and rate at time `t` after initialization.
    pub fn reference(&self, t: f64) -> (DVector<f64>, DVector<f64>) {
        let (s, ds) = Self::profile(t / self.duration);
        let delta = &self.e_final - &self.e_initial;
        (&self.e_initial + &delta * s, delta * (ds / self.duration))
    }

    /// Time since initialization in seconds.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub(crate) fn update(
        &mut self,
        robot_state: &RobotState,
        e: &DVector<f64>,
        e_dot_star: &mut DVector<f64>,
    ) -> HiqpResult<()> {
        if e.len() != self.e_initial.len() {
            return Err(HiqpException::DimensionMismatch {
                message: format!(
                    "task function has {} rows, minimal jerk profile has {} rows",
                    e.len(),
                    self.e_initial.len()
                ),
            });
        }
        self.elapsed += robot_state.sampling_time.as_secs_f64();
        if self.elapsed >= self.duration {
            e_dot_star.copy_from(&((e - &self.e_final) * -self.lambda));
        } else {
            let (e_ref, de_ref) = self.reference(self.elapsed);
            e_dot_star.copy_from(&(de_ref - (e - e_ref) * self.lambda));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::tasks::test_utils::{params, planar_arm, slice_compare, state};
    use crate::tasks::TDynMinJerk;
    use nalgebra::DVector;
    use std::time::Duration;

    #[test]
    fn profile_starts_and_ends_at_rest() {
        assert_eq!(TDynMinJerk::profile(0.), (0., 0.));
        assert_eq!(TDynMinJerk::profile(1.), (1., 0.));
        assert_eq!(TDynMinJerk::profile(0.5).0, 0.5);
        let mut last = 0.;
        for i in 1..=100 {
            let (s, ds) = TDynMinJerk::profile(i as f64 / 100.);
            assert!(s >= last && ds >= 0.);
            last = s;
        }
    }

    #[test]
    fn tracks_the_reference_and_decays_afterwards() {
        let e_initial = DVector::from_column_slice(&[1., -2.]);
        let e_final = DVector::zeros(2);
        let mut dynamics = TDynMinJerk::init(
            &params(&["TDynMinJerk", "1.0", "2.0"]),
            &e_initial,
            &e_final,
        )
        .unwrap();
        let mut robot_state = state(planar_arm(), &[0., 0.]);
        robot_state.sampling_time = Duration::from_millis(500);
        let mut e_dot_star = DVector::zeros(2);
        // halfway, on the reference: only the feed forward rate remains
        let (e_ref, de_ref) = dynamics.reference(0.5);
        dynamics
            .update(&robot_state, &e_ref, &mut e_dot_star)
            .unwrap();
        slice_compare(e_dot_star.as_slice(), de_ref.as_slice(), 1e-12);
        slice_compare(de_ref.as_slice(), &[-1.875, 3.75], 1e-12);
        // after the duration, plain decay towards e_final
        let e = DVector::from_column_slice(&[0.1, 0.]);
        dynamics.update(&robot_state, &e, &mut e_dot_star).unwrap();
        assert_eq!(dynamics.elapsed(), 1.);
        slice_compare(e_dot_star.as_slice(), &[-0.2, 0.], 1e-12);
        assert!(dynamics
            .update(&robot_state, &DVector::zeros(3), &mut e_dot_star)
            .is_err());
    }
}
