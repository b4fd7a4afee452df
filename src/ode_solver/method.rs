use nalgebra::DVector;
use serde::Serialize;

use crate::error::{OdeSolverError, StiffsolError};
use crate::ode_equations::OdeEquations;
use crate::ode_solver::config::SdirkConfig;
use crate::ode_solver::problem::OdeSolverProblem;
use crate::ode_solver::state::RkState;
use crate::ode_solver_error;
use crate::scalar::Scalar;

#[derive(Debug, PartialEq)]
pub enum OdeSolverStopReason {
    InternalTimestep,
    TstopReached,
}

/// How an integration run ended.
///
/// Any status other than [SolveStatus::Success] comes with the partial
/// trajectory computed up to the failure, so callers can distinguish a run
/// that exhausted its budget from one that broke down numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    Success,
    StepSizeUnderflow,
    MaxStepsExceeded,
    NonlinearSolveExhausted,
}

/// Counters aggregated over an integration run.
///
/// `number_of_steps` counts accepted steps; rejected attempts are split into
/// error test failures and nonlinear solver failures. All counters are
/// monotonically non-decreasing.
#[derive(Clone, Debug, Serialize, Default, PartialEq, Eq)]
pub struct Statistics {
    pub number_of_steps: usize,
    pub number_of_error_test_failures: usize,
    pub number_of_nonlinear_solver_iterations: usize,
    pub number_of_nonlinear_solver_fails: usize,
    pub number_of_linear_solver_setups: usize,
}

impl Statistics {
    /// Total step attempts, accepted and rejected.
    pub fn total_attempts(&self) -> usize {
        self.number_of_steps + self.number_of_error_test_failures + self.number_of_nonlinear_solver_fails
    }
}

/// An ordered trajectory of `(t, y)` samples together with the run statistics
/// and the terminal status.
#[derive(Debug, Clone)]
pub struct OdeSolution<T: Scalar> {
    pub t: Vec<T>,
    pub y: Vec<DVector<T>>,
    pub stats: Statistics,
    pub status: SolveStatus,
}

impl<T: Scalar> OdeSolution<T> {
    fn new() -> Self {
        Self {
            t: Vec::new(),
            y: Vec::new(),
            stats: Statistics::default(),
            status: SolveStatus::Success,
        }
    }

    fn push(&mut self, t: T, y: DVector<T>) {
        self.t.push(t);
        self.y.push(y);
    }
}

fn status_from_error(err: &StiffsolError) -> Option<SolveStatus> {
    match err {
        StiffsolError::OdeSolverError(OdeSolverError::StepSizeTooSmall { .. }) => {
            Some(SolveStatus::StepSizeUnderflow)
        }
        StiffsolError::OdeSolverError(OdeSolverError::TooManyErrorTestFailures { .. }) => {
            Some(SolveStatus::NonlinearSolveExhausted)
        }
        StiffsolError::OdeSolverError(OdeSolverError::TooManyNonlinearSolverFails { .. }) => {
            Some(SolveStatus::NonlinearSolveExhausted)
        }
        _ => None,
    }
}

/// Trait for ODE solver methods. This is the main user interface for the ODE solvers.
///
/// The solver is responsible for stepping the solution forward in time and
/// interpolating the solution within the last step. The provided drivers
/// [Self::solve] and [Self::solve_dense] run the step loop to a final time,
/// returning the trajectory together with statistics and a terminal status.
pub trait OdeSolverMethod<'a, Eqn: OdeEquations + 'a>: Sized {
    /// Get the current problem
    fn problem(&self) -> &'a OdeSolverProblem<Eqn>;

    /// Get the current state of the solver
    fn state(&self) -> &RkState<Eqn::T>;

    /// Get a mutable reference to the current state of the solver.
    /// Note that calling this will cause the next call to `step` to perform
    /// some reinitialisation.
    fn state_mut(&mut self) -> &mut RkState<Eqn::T>;

    /// Get a reference to the current configuration of the solver
    fn config(&self) -> &SdirkConfig<Eqn::T>;

    /// Get a mutable reference to the current configuration of the solver
    fn config_mut(&mut self) -> &mut SdirkConfig<Eqn::T>;

    /// Get the current order of accuracy of the solver
    fn order(&self) -> usize;

    /// Get the statistics aggregated so far
    fn statistics(&self) -> &Statistics;

    /// Step the solution forward by one step, altering the internal state of
    /// the solver. The step size is chosen by the solver's error control.
    fn step(&mut self) -> Result<OdeSolverStopReason, StiffsolError>;

    /// Set a stop time for the solver. The last step is clamped so that the
    /// solver lands on the stop time exactly. Once it stops, the stop time is
    /// unset. If `tstop` is at or before the current internal time, an error
    /// is returned.
    fn set_stop_time(&mut self, tstop: Eqn::T) -> Result<(), StiffsolError>;

    /// Interpolate the solution at a given time within the last step and
    /// place the result in `y`.
    fn interpolate_inplace(&self, t: Eqn::T, y: &mut DVector<Eqn::T>) -> Result<(), StiffsolError>;

    /// Interpolate the solution at a given time within the last step.
    fn interpolate(&self, t: Eqn::T) -> Result<DVector<Eqn::T>, StiffsolError> {
        let mut y = DVector::zeros(self.problem().eqn.nstates());
        self.interpolate_inplace(t, &mut y)?;
        Ok(y)
    }

    /// Solve the ODE from the current time to `final_time`, sampling the
    /// trajectory at the solver's own accepted steps.
    ///
    /// Setup errors are returned as `Err`; runtime breakdowns terminate the
    /// run early and are reported in the returned solution's status together
    /// with the partial trajectory.
    fn solve(&mut self, final_time: Eqn::T) -> Result<OdeSolution<Eqn::T>, StiffsolError> {
        let mut solution = OdeSolution::new();
        solution.push(self.state().t, self.state().y.clone());
        self.set_stop_time(final_time)?;
        loop {
            if self.statistics().total_attempts() >= self.config().maximum_steps {
                solution.status = SolveStatus::MaxStepsExceeded;
                break;
            }
            match self.step() {
                Ok(OdeSolverStopReason::InternalTimestep) => {
                    solution.push(self.state().t, self.state().y.clone());
                }
                Ok(OdeSolverStopReason::TstopReached) => {
                    solution.push(self.state().t, self.state().y.clone());
                    break;
                }
                Err(err) => match status_from_error(&err) {
                    Some(status) => {
                        solution.status = status;
                        break;
                    }
                    None => return Err(err),
                },
            }
        }
        solution.stats = self.statistics().clone();
        Ok(solution)
    }

    /// Solve the ODE from the current time to the last entry of `t_eval`,
    /// sampling the trajectory at the requested times.
    ///
    /// `t_eval` must be strictly increasing and start at or after the current
    /// time; violations are rejected before any stepping begins. Setup errors
    /// are returned as `Err`; runtime breakdowns terminate the run early and
    /// are reported in the returned solution's status together with the save
    /// points completed so far.
    fn solve_dense(&mut self, t_eval: &[Eqn::T]) -> Result<OdeSolution<Eqn::T>, StiffsolError> {
        if t_eval.is_empty() {
            return Err(ode_solver_error!(InvalidTEval));
        }
        if t_eval[0] < self.state().t {
            return Err(ode_solver_error!(InvalidTEval));
        }
        for window in t_eval.windows(2) {
            if window[1] <= window[0] {
                return Err(ode_solver_error!(InvalidTEval));
            }
        }

        let mut solution = OdeSolution::new();
        let t1 = t_eval[t_eval.len() - 1];
        if t1 > self.state().t {
            self.set_stop_time(t1)?;
        }

        let mut y = DVector::zeros(self.problem().eqn.nstates());
        'outer: for &t in t_eval {
            while self.state().t < t {
                if self.statistics().total_attempts() >= self.config().maximum_steps {
                    solution.status = SolveStatus::MaxStepsExceeded;
                    break 'outer;
                }
                match self.step() {
                    Ok(OdeSolverStopReason::InternalTimestep) => {}
                    Ok(OdeSolverStopReason::TstopReached) => break,
                    Err(err) => match status_from_error(&err) {
                        Some(status) => {
                            solution.status = status;
                            break 'outer;
                        }
                        None => return Err(err),
                    },
                }
            }
            self.interpolate_inplace(t, &mut y)?;
            solution.push(t, y.clone());
        }
        solution.stats = self.statistics().clone();
        Ok(solution)
    }
}
