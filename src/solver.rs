// Copyright (c) 2021 Marco Boneberger
// Licensed under the EUPL-1.2-or-later

//! Contains the hierarchical (lexicographic) least-squares solver.
//!
//! Priority levels are solved one after another. Each level is a small convex quadratic program
//! over the stacked decision vector `[dq; w]` where `w` holds one slack per row of the level:
//!
//! ```text
//! minimize    1/2 |w|^2 + 1/2 rho |dq|^2
//! subject to  J dq - w  =  e_dot_star    (equality rows)
//!             J dq - w <=  e_dot_star    (less-or-equal rows)
//!             J dq - w >=  e_dot_star    (greater-or-equal rows)
//!             rows of all earlier levels held at what they achieved
//! ```
//!
//! Rows of earlier levels are held inside a small band around the task velocity `a = J dq*`
//! they achieved, so a later level can never degrade an earlier one beyond
//! [`SolverConfig::hold_tolerance`].
use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus,
    SupportedConeT::{self, NonnegativeConeT, ZeroConeT},
};
use nalgebra::{DMatrix, DVector, RowDVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::exception::{HiqpException, HiqpResult};
use crate::tasks::TaskType;

/// Numerical settings of the [`HierarchicalSolver`].
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Weight of the joint velocity norm in every level. Keeps the problems strictly convex
    /// and picks the smallest velocity among equally good solutions.
    pub regularization: f64,
    /// Band in which rows of earlier levels are held.
    pub hold_tolerance: f64,
    /// Maximum number of interior point iterations per level.
    pub max_iter: u32,
    /// Feasibility and duality gap tolerance of the interior point method.
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            regularization: 1e-4,
            hold_tolerance: 1e-6,
            max_iter: 100,
            tolerance: 1e-8,
        }
    }
}

/// All rows of the active tasks which share one priority.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityLevel {
    priority: u32,
    n_controls: usize,
    jacobian_rows: Vec<f64>,
    e_dot_star: Vec<f64>,
    task_types: Vec<TaskType>,
}

impl PriorityLevel {
    pub fn new(priority: u32, n_controls: usize) -> Self {
        PriorityLevel {
            priority,
            n_controls,
            jacobian_rows: Vec::new(),
            e_dot_star: Vec::new(),
            task_types: Vec::new(),
        }
    }

    /// Appends the rows of one task.
    ///
    /// # Errors
    /// * DimensionMismatch if the Jacobian has the wrong number of columns or the row counts
    /// of the arguments disagree.
    pub fn append(
        &mut self,
        jacobian: &DMatrix<f64>,
        e_dot_star: &DVector<f64>,
        task_types: &[TaskType],
    ) -> HiqpResult<()> {
        if jacobian.ncols() != self.n_controls {
            return Err(HiqpException::DimensionMismatch {
                message: format!(
                    "jacobian has {} columns, priority level {} expects {}",
                    jacobian.ncols(),
                    self.priority,
                    self.n_controls
                ),
            });
        }
        if jacobian.nrows() != e_dot_star.len() || jacobian.nrows() != task_types.len() {
            return Err(HiqpException::DimensionMismatch {
                message: format!(
                    "jacobian has {} rows but got {} desired velocities and {} task types",
                    jacobian.nrows(),
                    e_dot_star.len(),
                    task_types.len()
                ),
            });
        }
        for row in jacobian.row_iter() {
            self.jacobian_rows.extend(row.iter());
        }
        self.e_dot_star.extend(e_dot_star.iter());
        self.task_types.extend_from_slice(task_types);
        Ok(())
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn n_rows(&self) -> usize {
        self.e_dot_star.len()
    }

    pub fn is_empty(&self) -> bool {
        self.e_dot_star.is_empty()
    }

    /// Stacked Jacobian of all rows of this level.
    pub fn jacobian(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.n_rows(), self.n_controls, &self.jacobian_rows)
    }

    pub fn e_dot_star(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.e_dot_star)
    }

    pub fn task_types(&self) -> &[TaskType] {
        &self.task_types
    }
}

/// A row of an earlier level together with what it achieved.
struct HeldRow {
    row: RowDVector<f64>,
    task_type: TaskType,
    achieved: f64,
    desired: f64,
}

/// Solves a stack of [`PriorityLevel`]s in order of increasing priority number.
#[derive(Debug, Clone)]
pub struct HierarchicalSolver {
    config: SolverConfig,
}

impl HierarchicalSolver {
    pub fn new(config: SolverConfig) -> Self {
        HierarchicalSolver { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Computes joint velocities for the given levels, which must be sorted by priority.
    /// Levels without rows are skipped. Without any rows the result is zero.
    ///
    /// # Errors
    /// * DimensionMismatch if a level was built for a different number of controls.
    /// * SolverInfeasible if the first non-empty level cannot be solved. If a later level
    /// fails, the solution of the levels before it is returned instead.
    pub fn solve(&self, levels: &[PriorityLevel], n_controls: usize) -> HiqpResult<DVector<f64>> {
        let mut solution = DVector::zeros(n_controls);
        if n_controls == 0 {
            return Ok(solution);
        }
        if let Some(level) = levels.iter().find(|l| l.n_controls != n_controls) {
            return Err(HiqpException::DimensionMismatch {
                message: format!(
                    "priority level {} was built for {} controls, expected {}",
                    level.priority, level.n_controls, n_controls
                ),
            });
        }
        let mut held: Vec<HeldRow> = Vec::new();
        for (index, level) in levels.iter().filter(|l| !l.is_empty()).enumerate() {
            match self.solve_level(level, &held, n_controls) {
                Ok(dq) => {
                    let jacobian = level.jacobian();
                    let achieved = &jacobian * &dq;
                    for (i, &task_type) in level.task_types.iter().enumerate() {
                        held.push(HeldRow {
                            row: jacobian.row(i).into_owned(),
                            task_type,
                            achieved: achieved[i],
                            desired: level.e_dot_star[i],
                        });
                    }
                    solution = dq;
                }
                Err(message) if index == 0 => {
                    return Err(HiqpException::SolverInfeasible {
                        level: level.priority as usize,
                        message,
                    });
                }
                Err(message) => {
                    warn!(
                        "priority level {} could not be solved ({}), keeping the solution of the levels above",
                        level.priority, message
                    );
                    break;
                }
            }
        }
        Ok(solution)
    }

    fn solve_level(
        &self,
        level: &PriorityLevel,
        held: &[HeldRow],
        n_controls: usize,
    ) -> Result<DVector<f64>, String> {
        let m = level.n_rows();
        let n_z = n_controls + m;
        let jacobian = level.jacobian();

        let mut p_mat = DMatrix::zeros(n_z, n_z);
        for i in 0..n_controls {
            p_mat[(i, i)] = self.config.regularization;
        }
        for i in n_controls..n_z {
            p_mat[(i, i)] = 1.;
        }
        let q_vec = vec![0.; n_z];

        // rows of the zero cone first, then rows of the nonnegative cone (A z <= b)
        let mut equalities: Vec<(RowDVector<f64>, f64)> = Vec::new();
        let mut inequalities: Vec<(RowDVector<f64>, f64)> = Vec::new();
        let tol = self.config.hold_tolerance;
        for h in held {
            let row = extend_row(&h.row, n_z);
            match h.task_type {
                TaskType::Equality => {
                    inequalities.push((row.clone(), h.achieved + tol));
                    inequalities.push((-row, -(h.achieved - tol)));
                }
                TaskType::LessOrEqual => {
                    inequalities.push((row, h.achieved.max(h.desired) + tol));
                }
                TaskType::GreaterOrEqual => {
                    inequalities.push((-row, -(h.achieved.min(h.desired) - tol)));
                }
            }
        }
        for (i, &task_type) in level.task_types.iter().enumerate() {
            let mut row = extend_row(&jacobian.row(i).into_owned(), n_z);
            row[n_controls + i] = -1.;
            let desired = level.e_dot_star[i];
            match task_type {
                TaskType::Equality => equalities.push((row, desired)),
                TaskType::LessOrEqual => inequalities.push((row, desired)),
                TaskType::GreaterOrEqual => inequalities.push((-row, -desired)),
            }
        }

        let n_eq = equalities.len();
        let n_ineq = inequalities.len();
        let mut a_all = DMatrix::zeros(n_eq + n_ineq, n_z);
        let mut b_all = Vec::with_capacity(n_eq + n_ineq);
        for (i, (row, bound)) in equalities.iter().chain(inequalities.iter()).enumerate() {
            a_all.row_mut(i).copy_from(row);
            b_all.push(*bound);
        }
        let mut cones: Vec<SupportedConeT<f64>> = Vec::new();
        if n_eq > 0 {
            cones.push(ZeroConeT(n_eq));
        }
        if n_ineq > 0 {
            cones.push(NonnegativeConeT(n_ineq));
        }

        let p_csc = dmatrix_to_csc_upper_tri(&p_mat);
        let a_csc = dmatrix_to_csc(&a_all);
        let settings = DefaultSettingsBuilder::default()
            .max_iter(self.config.max_iter)
            .verbose(false)
            .tol_gap_abs(self.config.tolerance)
            .tol_gap_rel(self.config.tolerance)
            .tol_feas(self.config.tolerance)
            .build()
            .map_err(|e| format!("invalid solver settings: {:?}", e))?;
        let mut solver = DefaultSolver::new(&p_csc, &q_vec, &a_csc, &b_all, &cones, settings)
            .map_err(|e| format!("could not set up the problem: {:?}", e))?;
        solver.solve();
        debug!(
            "priority level {}: {} rows, {} held rows, status {:?}",
            level.priority,
            m,
            held.len(),
            solver.solution.status
        );
        match &solver.solution.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => Ok(DVector::from_iterator(
                n_controls,
                solver.solution.x.iter().take(n_controls).copied(),
            )),
            other => Err(format!("solver finished with status {:?}", other)),
        }
    }
}

/// Pads a row of a Jacobian with zeros for the slack variables.
fn extend_row(row: &RowDVector<f64>, n_z: usize) -> RowDVector<f64> {
    let mut extended = RowDVector::zeros(n_z);
    extended.columns_mut(0, row.len()).copy_from(row);
    extended
}

/// Convert a nalgebra `DMatrix<f64>` to Clarabel's `CscMatrix<f64>`.
fn dmatrix_to_csc(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..nrows {
            let v = m[(i, j)];
            if v.abs() > 1e-15 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

/// Convert a symmetric nalgebra `DMatrix<f64>` to upper-triangular `CscMatrix<f64>`.
fn dmatrix_to_csc_upper_tri(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..=j.min(nrows.saturating_sub(1)) {
            let v = m[(i, j)];
            if v.abs() > 1e-15 {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

#[cfg(test)]
mod tests {
    use crate::exception::HiqpException;
    use crate::solver::{HierarchicalSolver, PriorityLevel, SolverConfig};
    use crate::tasks::TaskType;
    use nalgebra::{DMatrix, DVector};

    fn slice_compare(a: &[f64], b: &[f64], thresh: f64) {
        assert_eq!(a.len(), b.len());
        for i in 0..a.len() {
            assert!(
                f64::abs(a[i] - b[i]) < thresh,
                "{:?} != {:?} at index {}",
                a,
                b,
                i
            );
        }
    }

    fn level(priority: u32, rows: &[(&[f64], f64, TaskType)]) -> PriorityLevel {
        let mut level = PriorityLevel::new(priority, 2);
        for (row, desired, task_type) in rows {
            level
                .append(
                    &DMatrix::from_row_slice(1, 2, row),
                    &DVector::from_element(1, *desired),
                    &[*task_type],
                )
                .unwrap();
        }
        level
    }

    fn solver() -> HierarchicalSolver {
        HierarchicalSolver::new(SolverConfig::default())
    }

    #[test]
    fn single_equality_level_tracks_desired_velocity() {
        let mut single = PriorityLevel::new(1, 2);
        single
            .append(
                &DMatrix::identity(2, 2),
                &DVector::from_column_slice(&[-0.5, 0.3]),
                &[TaskType::Equality, TaskType::Equality],
            )
            .unwrap();
        assert_eq!(single.n_rows(), 2);
        let dq = solver().solve(&[single], 2).unwrap();
        slice_compare(dq.as_slice(), &[-0.5, 0.3], 1e-3);
    }

    #[test]
    fn lower_priority_yields_to_higher_priority() {
        let levels = [
            level(1, &[(&[1., 1.], 1., TaskType::Equality)]),
            level(
                2,
                &[
                    (&[1., 0.], 1., TaskType::Equality),
                    (&[0., 1.], 1., TaskType::Equality),
                ],
            ),
        ];
        let dq = solver().solve(&levels, 2).unwrap();
        slice_compare(dq.as_slice(), &[0.5, 0.5], 1e-3);
    }

    #[test]
    fn inequalities_bound_later_levels() {
        let levels = [
            level(
                1,
                &[
                    (&[1., 0.], 0.2, TaskType::LessOrEqual),
                    (&[0., 1.], 0.4, TaskType::GreaterOrEqual),
                ],
            ),
            level(
                2,
                &[
                    (&[1., 0.], 1., TaskType::Equality),
                    (&[0., 1.], 0., TaskType::Equality),
                ],
            ),
        ];
        let dq = solver().solve(&levels, 2).unwrap();
        slice_compare(dq.as_slice(), &[0.2, 0.4], 1e-3);
    }

    #[test]
    fn satisfied_inequalities_leave_room() {
        let levels = [
            level(1, &[(&[1., 0.], 0.8, TaskType::LessOrEqual)]),
            level(2, &[(&[1., 0.], 0.5, TaskType::Equality)]),
        ];
        let dq = solver().solve(&levels, 2).unwrap();
        slice_compare(dq.as_slice(), &[0.5, 0.], 1e-3);
    }

    #[test]
    fn empty_problems_give_zero_controls() {
        assert_eq!(solver().solve(&[], 3).unwrap(), DVector::zeros(3));
        let empty = PriorityLevel::new(1, 2);
        assert_eq!(solver().solve(&[empty], 2).unwrap(), DVector::zeros(2));
        assert_eq!(solver().solve(&[], 0).unwrap().len(), 0);
    }

    #[test]
    fn mismatching_levels_are_rejected() {
        let mut level = PriorityLevel::new(1, 2);
        assert!(matches!(
            level.append(
                &DMatrix::zeros(1, 3),
                &DVector::zeros(1),
                &[TaskType::Equality]
            ),
            Err(HiqpException::DimensionMismatch { .. })
        ));
        assert!(level
            .append(&DMatrix::zeros(2, 2), &DVector::zeros(1), &[TaskType::Equality])
            .is_err());
        assert!(level.is_empty());
        assert!(matches!(
            solver().solve(&[level], 3),
            Err(HiqpException::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn failure_of_the_first_level_is_reported() {
        let config = SolverConfig {
            max_iter: 0,
            ..SolverConfig::default()
        };
        let levels = [level(3, &[(&[1., 0.], 1., TaskType::GreaterOrEqual)])];
        match HierarchicalSolver::new(config).solve(&levels, 2) {
            Err(HiqpException::SolverInfeasible { level, .. }) => assert_eq!(level, 3),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
