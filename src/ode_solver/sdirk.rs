use nalgebra::{ComplexField, DMatrix, DVector};
use num_traits::{FromPrimitive, One, ToPrimitive, Zero};

use crate::error::{OdeSolverError, StiffsolError};
use crate::linear_solver::{LinearSolver, LU};
use crate::nonlinear_solver::{Convergence, NewtonNonlinearSolver, NonLinearSolver};
use crate::ode_equations::{OdeEquations, OdeEquationsImplicit};
use crate::ode_solver::config::SdirkConfig;
use crate::ode_solver::controller::{PidController, StepSizeLaw};
use crate::ode_solver::jacobian_update::{JacobianUpdate, SolverState};
use crate::ode_solver::method::{OdeSolverMethod, OdeSolverStopReason, Statistics};
use crate::ode_solver::problem::OdeSolverProblem;
use crate::ode_solver::state::RkState;
use crate::ode_solver::tableau::Tableau;
use crate::ode_solver_error;
use crate::op::sdirk::SdirkCallable;
use crate::scalar::Scalar;
use crate::vector::VectorNorm;

/// Outcome of a single step attempt at a fixed step size.
enum StepAttempt<T> {
    Converged { error_norm: T },
    SolveFailed,
}

/// A singly diagonally implicit Runge-Kutta method. Can optionally have an
/// explicit first stage for ESDIRK methods.
///
/// The particular method is defined by the [Tableau] used to create the
/// solver. If the `beta` matrix of the [Tableau] is present this is used for
/// interpolation, otherwise hermite interpolation is used.
///
/// Restrictions:
/// - The upper triangular part of the `a` matrix must be zero (i.e. not fully implicit).
/// - The diagonal of the `a` matrix must be the same non-zero value for all rows (i.e. an SDIRK method), except for the first row which can be zero for ESDIRK methods.
/// - The last row of the `a` matrix must be the same as the `b` vector, and the last element of the `c` vector must be 1 (i.e. a stiffly accurate method)
pub struct Sdirk<'a, Eqn, LS = LU<<Eqn as OdeEquations>::T>>
where
    Eqn: OdeEquationsImplicit,
    LS: LinearSolver<Eqn::T>,
{
    problem: &'a OdeSolverProblem<Eqn>,
    tableau: Tableau<Eqn::T>,
    state: RkState<Eqn::T>,
    old_state: RkState<Eqn::T>,
    a_rows: Vec<DVector<Eqn::T>>,
    diff: DMatrix<Eqn::T>,
    error: DVector<Eqn::T>,
    op: SdirkCallable<'a, Eqn>,
    nonlinear_solver: NewtonNonlinearSolver<Eqn::T, LS>,
    convergence: Convergence<'a, Eqn::T>,
    controller: PidController<Eqn::T>,
    controller_law: StepSizeLaw,
    jacobian_update: JacobianUpdate<Eqn::T>,
    config: SdirkConfig<Eqn::T>,
    statistics: Statistics,
    tstop: Option<Eqn::T>,
    is_state_mutated: bool,
}

impl<'a, Eqn, LS> Sdirk<'a, Eqn, LS>
where
    Eqn: OdeEquationsImplicit,
    LS: LinearSolver<Eqn::T>,
{
    pub fn new(
        problem: &'a OdeSolverProblem<Eqn>,
        state: RkState<Eqn::T>,
        tableau: Tableau<Eqn::T>,
        linear_solver: LS,
    ) -> Result<Self, StiffsolError> {
        Self::check_sdirk_tableau(&tableau)?;
        state.check_consistent_with_problem(problem)?;
        if state.h <= Eqn::T::zero() {
            return Err(ode_solver_error!(Other, "initial step size must be positive"));
        }

        let nstates = state.y.len();
        let s = tableau.s();
        let mut a_rows = Vec::with_capacity(s);
        for i in 0..s {
            let mut row = Vec::with_capacity(i);
            for j in 0..i {
                row.push(tableau.a()[(i, j)]);
            }
            a_rows.push(DVector::from_vec(row));
        }

        let gamma = tableau.a()[(1, 1)];
        let op = SdirkCallable::new(&problem.eqn, gamma);
        op.set_h(state.h);
        let mut nonlinear_solver = NewtonNonlinearSolver::new(linear_solver);
        nonlinear_solver.set_problem(&op);

        let config = SdirkConfig::default();
        let mut convergence = Convergence::new(problem.rtol, &problem.atol);
        convergence.set_max_iter(config.maximum_newton_iterations);

        let controller_law = config.step_size_law;
        let controller = PidController::new(controller_law, tableau.error_order());

        let mut jacobian_update = JacobianUpdate::default();
        jacobian_update.update_jacobian(state.h);
        jacobian_update.update_rhs_jacobian();

        let diff = DMatrix::zeros(nstates, s);
        let error = DVector::zeros(nstates);
        let old_state = state.clone();

        Ok(Self {
            problem,
            tableau,
            state,
            old_state,
            a_rows,
            diff,
            error,
            op,
            nonlinear_solver,
            convergence,
            controller,
            controller_law,
            jacobian_update,
            config,
            statistics: Statistics::default(),
            tstop: None,
            is_state_mutated: false,
        })
    }

    fn check_sdirk_tableau(tableau: &Tableau<Eqn::T>) -> Result<(), StiffsolError> {
        let s = tableau.s();
        if s < 2 {
            return Err(ode_solver_error!(
                InvalidTableau,
                "expected at least two stages"
            ));
        }
        // check that the upper triangular part of a is zero
        for i in 0..s {
            for j in (i + 1)..s {
                if tableau.a()[(i, j)] != Eqn::T::zero() {
                    return Err(ode_solver_error!(
                        InvalidTableau,
                        "expected a(i, j) = 0 for j > i"
                    ));
                }
            }
        }
        let gamma = tableau.a()[(1, 1)];
        // check that for i = 1..s, a(i, i) = gamma
        for i in 1..s {
            if tableau.a()[(i, i)] != gamma {
                return Err(ode_solver_error!(
                    InvalidTableau,
                    format!("expected a(i, i) = gamma = {gamma} for i = 1..s-1")
                ));
            }
        }
        // if a(0, 0) = gamma, then we're a SDIRK method
        // if a(0, 0) = 0, then we're an ESDIRK method
        // otherwise, error
        let zero = Eqn::T::zero();
        if tableau.a()[(0, 0)] != zero && tableau.a()[(0, 0)] != gamma {
            return Err(ode_solver_error!(
                InvalidTableau,
                "expected a(0, 0) = 0 or a(0, 0) = gamma"
            ));
        }
        let is_sdirk = tableau.a()[(0, 0)] == gamma;

        // check last row of a is the same as b
        for i in 0..s {
            if tableau.a()[(s - 1, i)] != tableau.b()[i] {
                return Err(ode_solver_error!(
                    InvalidTableau,
                    "expected a(s-1, i) = b(i)"
                ));
            }
        }

        // check that last c is 1
        if tableau.c()[s - 1] != Eqn::T::one() {
            return Err(ode_solver_error!(InvalidTableau, "expected c(s-1) = 1"));
        }

        // check that the first c is 0 for esdirk methods
        if !is_sdirk && tableau.c()[0] != Eqn::T::zero() {
            return Err(ode_solver_error!(
                InvalidTableau,
                "expected c(0) = 0 for esdirk methods"
            ));
        }
        Ok(())
    }

    pub fn tableau(&self) -> &Tableau<Eqn::T> {
        &self.tableau
    }

    pub fn into_state(self) -> RkState<Eqn::T> {
        self.state
    }

    fn skip_first_stage(&self) -> bool {
        self.tableau.a()[(0, 0)] == Eqn::T::zero()
    }

    fn start_step(&mut self) -> Result<Eqn::T, StiffsolError> {
        if self.is_state_mutated {
            // the state was changed under us: the stored derivative and the
            // stop time may no longer match it
            self.state.dy = self.problem.eqn.rhs(&self.state.y, self.state.t);
            self.nonlinear_solver.clear_jacobian();
            if let Some(tstop) = self.tstop {
                self.set_stop_time(tstop)?;
            }
            self.is_state_mutated = false;
        }
        if self.controller_law != self.config.step_size_law {
            self.controller_law = self.config.step_size_law;
            self.controller = PidController::new(self.controller_law, self.tableau.error_order());
        }
        self.convergence
            .set_max_iter(self.config.maximum_newton_iterations);
        Ok(self.state.h)
    }

    fn predict_stage(
        i: usize,
        h: Eqn::T,
        dy0: &DVector<Eqn::T>,
        diff: &DMatrix<Eqn::T>,
        dy: &mut DVector<Eqn::T>,
        tableau: &Tableau<Eqn::T>,
    ) {
        if i == 0 {
            dy.axpy(h, dy0, Eqn::T::zero());
        } else if i == 1 {
            dy.copy_from(&diff.column(i - 1));
        } else {
            // extrapolate along the stage times
            let c = (tableau.c()[i] - tableau.c()[i - 2])
                / (tableau.c()[i - 1] - tableau.c()[i - 2]);
            // dy = c1 + c * (c1 - c2)
            dy.copy_from(&diff.column(i - 1));
            dy.axpy(-c, &diff.column(i - 2), Eqn::T::one() + c);
        }
    }

    fn attempt_step(&mut self, h: Eqn::T) -> StepAttempt<Eqn::T> {
        let start = if self.skip_first_stage() { 1 } else { 0 };
        if start == 1 {
            // the first stage is explicit and reuses the derivative from the
            // last accepted step
            self.diff
                .column_mut(0)
                .axpy(h, &self.state.dy, Eqn::T::zero());
        }
        for i in start..self.tableau.s() {
            let t = self.state.t + self.tableau.c()[i] * h;
            self.op
                .set_phi(&self.diff.columns(0, i), &self.state.y, &self.a_rows[i]);
            Self::predict_stage(
                i,
                h,
                &self.state.dy,
                &self.diff,
                &mut self.old_state.dy,
                &self.tableau,
            );
            if !self.nonlinear_solver.is_jacobian_set() {
                self.nonlinear_solver
                    .reset_jacobian(&self.op, &self.old_state.dy, t);
            }
            let solve_result = self.nonlinear_solver.solve_in_place(
                &self.op,
                &mut self.old_state.dy,
                t,
                &self.state.y,
                &mut self.convergence,
            );
            self.statistics.number_of_nonlinear_solver_iterations += self.convergence.niter();
            if solve_result.is_err() {
                self.statistics.number_of_linear_solver_setups = self.op.number_of_jac_evals();
                return StepAttempt::SolveFailed;
            }

            {
                let stage_y = self.op.get_last_stage_state();
                self.old_state.y.copy_from(&*stage_y);
            }
            self.diff.column_mut(i).copy_from(&self.old_state.dy);
        }
        self.statistics.number_of_linear_solver_setups = self.op.number_of_jac_evals();

        // the last stage is the step solution, so the embedded estimate is a
        // weighted sum of the stage increments
        self.error
            .gemv(Eqn::T::one(), &self.diff, self.tableau.d(), Eqn::T::zero());
        let error_norm = self
            .error
            .squared_error_norm(
                &self.state.y,
                &self.old_state.y,
                &self.problem.atol,
                self.problem.rtol,
            )
            .sqrt();
        // a non-finite state or estimate rejects the attempt
        let error_norm = if Scalar::is_finite(error_norm) && self.old_state.y.all_finite() {
            error_norm
        } else {
            Eqn::T::INFINITY
        };
        StepAttempt::Converged { error_norm }
    }

    fn jacobian_updates(&mut self, h: Eqn::T, solver_state: SolverState) {
        if self
            .jacobian_update
            .check_rhs_jacobian_update(h, &solver_state)
        {
            self.op.set_jacobian_is_stale();
            self.nonlinear_solver
                .reset_jacobian(&self.op, &self.old_state.dy, self.state.t);
            self.jacobian_update.update_rhs_jacobian();
            self.jacobian_update.update_jacobian(h);
        } else if self.jacobian_update.check_jacobian_update(h, &solver_state) {
            self.nonlinear_solver
                .reset_jacobian(&self.op, &self.old_state.dy, self.state.t);
            self.jacobian_update.update_jacobian(h);
        }
    }

    fn step_accepted(
        &mut self,
        h: Eqn::T,
        new_h: Eqn::T,
    ) -> Result<OdeSolverStopReason, StiffsolError> {
        // take the step
        self.old_state.t = self.state.t + h;
        self.old_state.h = new_h;
        // the stage increments are h * k, rescale the last one back to a
        // time derivative
        self.old_state.dy *= Eqn::T::one() / h;
        std::mem::swap(&mut self.old_state, &mut self.state);

        self.statistics.number_of_steps += 1;

        if let Some(tstop) = self.tstop {
            if let Some(reason) = self.handle_tstop(tstop)? {
                self.tstop = None;
                return Ok(reason);
            }
        }

        Ok(OdeSolverStopReason::InternalTimestep)
    }

    fn handle_tstop(
        &mut self,
        tstop: Eqn::T,
    ) -> Result<Option<OdeSolverStopReason>, StiffsolError> {
        let troundoff = Eqn::T::from_f64(100.0).unwrap()
            * Eqn::T::EPSILON
            * (num_traits::abs(self.state.t) + num_traits::abs(self.state.h));
        if num_traits::abs(self.state.t - tstop) <= troundoff {
            self.state.t = tstop;
            return Ok(Some(OdeSolverStopReason::TstopReached));
        } else if tstop < self.state.t - troundoff {
            return Err(StiffsolError::from(
                OdeSolverError::StopTimeBeforeCurrentTime {
                    stop_time: tstop.to_f64().unwrap(),
                    state_time: self.state.t.to_f64().unwrap(),
                },
            ));
        }

        // clamp the next step so it lands on tstop
        if self.state.t + self.state.h > tstop + troundoff {
            self.state.h = tstop - self.state.t;
        }
        Ok(None)
    }

    fn interpolate_beta_function(theta: Eqn::T, beta: &DMatrix<Eqn::T>) -> DVector<Eqn::T> {
        let poly_order = beta.ncols();
        let s_star = beta.nrows();
        let mut thetav = Vec::with_capacity(poly_order);
        thetav.push(theta);
        for i in 1..poly_order {
            thetav.push(theta * thetav[i - 1]);
        }
        // beta_poly = beta * thetav
        let thetav = DVector::from_vec(thetav);
        let mut beta_f = DVector::zeros(s_star);
        beta_f.gemv(Eqn::T::one(), beta, &thetav, Eqn::T::zero());
        beta_f
    }

    fn interpolate_from_diff(
        y0: &DVector<Eqn::T>,
        beta_f: &DVector<Eqn::T>,
        diff: &DMatrix<Eqn::T>,
        ret: &mut DVector<Eqn::T>,
    ) {
        // ret = y0 + diff * beta_f
        ret.copy_from(y0);
        ret.gemv(Eqn::T::one(), diff, beta_f, Eqn::T::one());
    }

    fn interpolate_hermite(
        theta: Eqn::T,
        u0: &DVector<Eqn::T>,
        u1: &DVector<Eqn::T>,
        diff: &DMatrix<Eqn::T>,
        y: &mut DVector<Eqn::T>,
    ) {
        let f0 = diff.column(0);
        let f1 = diff.column(diff.ncols() - 1);
        let one = Eqn::T::one();
        let two = Eqn::T::from_f64(2.0).unwrap();

        y.copy_from(u1);
        *y -= u0;
        y.axpy(theta - one, &f0, one - two * theta);
        y.axpy(theta, &f1, one);
        y.axpy(one - theta, u0, theta * (theta - one));
        y.axpy(theta, u1, one);
    }
}

impl<'a, Eqn, LS> OdeSolverMethod<'a, Eqn> for Sdirk<'a, Eqn, LS>
where
    Eqn: OdeEquationsImplicit,
    LS: LinearSolver<Eqn::T>,
{
    fn problem(&self) -> &'a OdeSolverProblem<Eqn> {
        self.problem
    }

    fn state(&self) -> &RkState<Eqn::T> {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RkState<Eqn::T> {
        self.is_state_mutated = true;
        &mut self.state
    }

    fn config(&self) -> &SdirkConfig<Eqn::T> {
        &self.config
    }

    fn config_mut(&mut self) -> &mut SdirkConfig<Eqn::T> {
        &mut self.config
    }

    fn order(&self) -> usize {
        self.tableau.order()
    }

    fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    fn step(&mut self) -> Result<OdeSolverStopReason, StiffsolError> {
        let mut h = self.start_step()?;
        self.op.set_h(h);

        // loop until the step is accepted
        let mut nattempts = 0;
        let mut nsolve_fails = 0;
        let mut updated_jacobian = false;
        let (factor, error_norm) = loop {
            match self.attempt_step(h) {
                StepAttempt::Converged { error_norm } => {
                    let (accept, factor) = self.controller.propose(
                        error_norm,
                        self.convergence.niter(),
                        self.convergence.max_iter(),
                        self.config.minimum_timestep_shrink,
                        self.config.maximum_timestep_growth,
                    );
                    if accept {
                        break (factor, error_norm);
                    }
                    self.statistics.number_of_error_test_failures += 1;
                    nattempts += 1;
                    if nattempts >= self.config.maximum_error_test_failures {
                        return Err(StiffsolError::from(
                            OdeSolverError::TooManyErrorTestFailures {
                                time: self.state.t.to_f64().unwrap(),
                            },
                        ));
                    }
                    h *= factor;
                    self.op.set_h(h);
                    self.jacobian_updates(h, SolverState::ErrorTestFail);
                }
                StepAttempt::SolveFailed => {
                    self.statistics.number_of_nonlinear_solver_fails += 1;
                    nsolve_fails += 1;
                    if nsolve_fails >= self.config.maximum_nonlinear_solver_fails {
                        return Err(StiffsolError::from(
                            OdeSolverError::TooManyNonlinearSolverFails {
                                time: self.state.t.to_f64().unwrap(),
                            },
                        ));
                    }
                    if !updated_jacobian {
                        // newton iteration did not converge, so update the
                        // jacobian and try again at the same step size
                        updated_jacobian = true;
                        self.jacobian_updates(h, SolverState::FirstConvergenceFail);
                    } else {
                        h *= Eqn::T::from_f64(0.3).unwrap();
                        self.op.set_h(h);
                        self.jacobian_updates(h, SolverState::SecondConvergenceFail);
                    }
                }
            }
            if num_traits::abs(h) < self.config.minimum_timestep {
                return Err(StiffsolError::from(OdeSolverError::StepSizeTooSmall {
                    time: self.state.t.to_f64().unwrap(),
                }));
            }
        };

        // accept the step
        let new_h = h * factor;
        self.controller.step_accepted(error_norm);
        self.jacobian_updates(h, SolverState::StepSuccess);
        self.jacobian_update.step();
        self.step_accepted(h, new_h)
    }

    fn set_stop_time(&mut self, tstop: Eqn::T) -> Result<(), StiffsolError> {
        self.tstop = Some(tstop);
        if let Some(OdeSolverStopReason::TstopReached) = self.handle_tstop(tstop)? {
            self.tstop = None;
            return Err(ode_solver_error!(StopTimeAtCurrentTime));
        }
        Ok(())
    }

    fn interpolate_inplace(
        &self,
        t: Eqn::T,
        ret: &mut DVector<Eqn::T>,
    ) -> Result<(), StiffsolError> {
        if ret.len() != self.state.y.len() {
            return Err(StiffsolError::from(
                OdeSolverError::InterpolationVectorWrongSize {
                    expected: self.state.y.len(),
                    found: ret.len(),
                },
            ));
        }
        if self.is_state_mutated {
            if t == self.state.t {
                ret.copy_from(&self.state.y);
                return Ok(());
            }
            return Err(ode_solver_error!(InterpolationTimeOutsideCurrentStep));
        }

        if t > self.state.t || t < self.old_state.t {
            return Err(ode_solver_error!(InterpolationTimeOutsideCurrentStep));
        }

        let dt = self.state.t - self.old_state.t;
        let theta = if dt == Eqn::T::zero() {
            Eqn::T::one()
        } else {
            (t - self.old_state.t) / dt
        };
        if let Some(beta) = self.tableau.beta() {
            let beta_f = Self::interpolate_beta_function(theta, beta);
            Self::interpolate_from_diff(&self.old_state.y, &beta_f, &self.diff, ret);
        } else {
            Self::interpolate_hermite(theta, &self.old_state.y, &self.state.y, &self.diff, ret);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{DMatrix, DVector};

    use crate::ode_equations::test_models::exponential_decay::exponential_decay_problem;
    use crate::ode_equations::test_models::robertson::robertson;
    use crate::ode_solver::method::{OdeSolverMethod, SolveStatus};
    use crate::ode_solver::tests::{assert_strictly_increasing, test_ode_solver};
    use crate::{LU, OdeBuilder, StepSizeLaw, Tableau};

    use super::Sdirk;

    type LS = LU<f64>;

    #[test]
    fn test_tr_bdf2_nalgebra_exponential_decay() {
        let (problem, soln) = exponential_decay_problem::<f64>();
        let mut s = problem.tr_bdf2::<LS>().unwrap();
        test_ode_solver(&mut s, &soln);
    }

    #[test]
    fn test_esdirk34_nalgebra_exponential_decay() {
        let (problem, soln) = exponential_decay_problem::<f64>();
        let mut s = problem.esdirk34::<LS>().unwrap();
        test_ode_solver(&mut s, &soln);
    }

    #[test]
    fn test_kvaerno5_nalgebra_exponential_decay() {
        let (problem, soln) = exponential_decay_problem::<f64>();
        let mut s = problem.kvaerno5::<LS>().unwrap();
        test_ode_solver(&mut s, &soln);
    }

    #[test]
    fn test_tr_bdf2_nalgebra_robertson() {
        let (problem, soln) = robertson::<f64>();
        let mut s = problem.tr_bdf2::<LS>().unwrap();
        test_ode_solver(&mut s, &soln);
    }

    #[test]
    fn test_esdirk34_nalgebra_robertson() {
        let (problem, soln) = robertson::<f64>();
        let mut s = problem.esdirk34::<LS>().unwrap();
        test_ode_solver(&mut s, &soln);
    }

    #[test]
    fn test_kvaerno5_nalgebra_robertson() {
        let (problem, soln) = robertson::<f64>();
        let mut s = problem.kvaerno5::<LS>().unwrap();
        test_ode_solver(&mut s, &soln);
    }

    #[test]
    fn test_kvaerno5_robertson_interval() {
        let (mut problem, _soln) = robertson::<f64>();
        problem.rtol = 1e-8;
        problem.atol = DVector::from_element(3, 1e-8);
        problem.h0 = 2e-4;
        let mut s = problem.kvaerno5::<LS>().unwrap();
        let t_eval = [0.0, 1e-4, 1e-3, 1e-2, 1e-1, 1.0, 10.0, 100.0];
        let out = s.solve_dense(&t_eval).unwrap();
        assert_eq!(out.status, SolveStatus::Success);
        assert_strictly_increasing(&out.t);
        assert_eq!(*out.t.last().unwrap(), 100.0);

        // the system conserves y0 + y1 + y2
        for y in &out.y {
            let total: f64 = y.iter().sum();
            assert!((total - 1.0).abs() < 1e-6, "mass not conserved: {total}");
        }

        let y_final = out.y.last().unwrap();
        assert!((y_final[0] - 0.6172).abs() < 5e-3, "y0 = {}", y_final[0]);
        assert!((y_final[1] - 6.15e-6).abs() < 5e-7, "y1 = {}", y_final[1]);
        assert!((y_final[2] - 0.3828).abs() < 5e-3, "y2 = {}", y_final[2]);

        assert!(out.stats.number_of_steps > 5);
        assert!(out.stats.number_of_steps < 500);
        assert!(out.stats.total_attempts() >= out.stats.number_of_steps);
    }

    #[test]
    fn test_solve_lands_on_final_time() {
        let (problem, _soln) = exponential_decay_problem::<f64>();
        let mut s = problem.kvaerno5::<LS>().unwrap();
        let out = s.solve(10.0).unwrap();
        assert_eq!(out.status, SolveStatus::Success);
        assert_strictly_increasing(&out.t);
        assert_eq!(*out.t.last().unwrap(), 10.0);
        let expect = (-0.1f64 * 10.0).exp();
        let y_final = out.y.last().unwrap();
        assert!((y_final[0] - expect).abs() < 1e-5);
        // one trajectory entry per accepted step, plus the initial state
        assert_eq!(out.t.len(), out.stats.number_of_steps + 1);
    }

    #[test]
    fn test_idempotent_solves() {
        let t_eval = [0.0, 1e-2, 1.0, 100.0];
        let (problem, _soln) = robertson::<f64>();
        let mut s1 = problem.kvaerno5::<LS>().unwrap();
        let out1 = s1.solve_dense(&t_eval).unwrap();
        let mut s2 = problem.kvaerno5::<LS>().unwrap();
        let out2 = s2.solve_dense(&t_eval).unwrap();
        assert_eq!(out1.t, out2.t);
        assert_eq!(out1.y, out2.y);
        assert_eq!(out1.stats, out2.stats);
    }

    #[test]
    fn test_loose_tolerance_takes_fewer_steps() {
        let (problem, _soln) = exponential_decay_problem::<f64>();
        let mut tight = problem.kvaerno5::<LS>().unwrap();
        let tight_out = tight.solve(100.0).unwrap();
        assert_eq!(tight_out.status, SolveStatus::Success);

        let (mut problem, _soln) = exponential_decay_problem::<f64>();
        problem.rtol = 1.0;
        problem.atol = DVector::from_element(2, 1.0);
        let mut loose = problem.kvaerno5::<LS>().unwrap();
        let loose_out = loose.solve(100.0).unwrap();
        assert_eq!(loose_out.status, SolveStatus::Success);
        assert!(loose_out.stats.number_of_steps < tight_out.stats.number_of_steps);
    }

    #[test]
    fn test_step_size_underflow() {
        let (mut problem, _soln) = robertson::<f64>();
        problem.rtol = 1e-10;
        problem.atol = DVector::from_element(3, 1e-10);
        problem.h0 = 20.0;
        let mut s = problem.kvaerno5::<LS>().unwrap();
        s.config_mut().minimum_timestep = 10.0;
        let out = s.solve(100.0).unwrap();
        assert_eq!(out.status, SolveStatus::StepSizeUnderflow);
        // the initial state is still reported
        assert!(!out.t.is_empty());
    }

    #[test]
    fn test_max_steps_exceeded() {
        let (problem, soln) = robertson::<f64>();
        let t_eval: Vec<f64> = soln.solution_points.iter().map(|p| p.t).collect();
        let mut s = problem.kvaerno5::<LS>().unwrap();
        s.config_mut().maximum_steps = 5;
        let out = s.solve_dense(&t_eval).unwrap();
        assert_eq!(out.status, SolveStatus::MaxStepsExceeded);
        assert!(out.t.len() < t_eval.len());
        assert!(out.stats.total_attempts() >= 5);
    }

    #[test]
    fn test_nonlinear_solve_exhausted() {
        let (mut problem, _soln) = robertson::<f64>();
        problem.rtol = 1e-12;
        problem.atol = DVector::from_element(3, 1e-12);
        problem.h0 = 10.0;
        let mut s = problem.kvaerno5::<LS>().unwrap();
        s.config_mut().maximum_error_test_failures = 1;
        s.config_mut().maximum_nonlinear_solver_fails = 1;
        let out = s.solve(100.0).unwrap();
        assert_eq!(out.status, SolveStatus::NonlinearSolveExhausted);
    }

    #[test]
    fn test_interpolate_within_step() {
        let (problem, _soln) = exponential_decay_problem::<f64>();
        for tableau_has_beta in [false, true] {
            let mut s = if tableau_has_beta {
                problem.tr_bdf2::<LS>().unwrap()
            } else {
                problem.kvaerno5::<LS>().unwrap()
            };
            s.step().unwrap();
            let t1 = s.state().t;
            let tm = 0.5 * t1;
            let y = s.interpolate(tm).unwrap();
            let expect = (-0.1 * tm).exp();
            assert!(
                (y[0] - expect).abs() < 1e-6,
                "interpolation error at t = {tm}: {} vs {expect}",
                y[0]
            );
            // outside the last step is an error
            assert!(s.interpolate(2.0 * t1).is_err());
            assert!(s.interpolate(-1.0).is_err());
        }
    }

    #[test]
    fn test_invalid_t_eval() {
        let (problem, _soln) = exponential_decay_problem::<f64>();
        let mut s = problem.kvaerno5::<LS>().unwrap();
        assert!(s.solve_dense(&[]).is_err());
        assert!(s.solve_dense(&[1.0, 0.5]).is_err());
        assert!(s.solve_dense(&[-1.0, 1.0]).is_err());
    }

    #[test]
    fn test_no_jacobian_closure() {
        let problem = OdeBuilder::<f64>::new()
            .p([0.1])
            .rhs(|x: &DVector<f64>, p, _t, y: &mut DVector<f64>| y[0] = -p[0] * x[0])
            .init(|_p, _t, y: &mut DVector<f64>| y[0] = 1.0, 1)
            .build()
            .unwrap();
        let mut s = problem.kvaerno5::<LS>().unwrap();
        let out = s.solve(1.0).unwrap();
        assert_eq!(out.status, SolveStatus::Success);
        let expect = (-0.1f64).exp();
        assert!((out.y.last().unwrap()[0] - expect).abs() < 1e-5);
    }

    #[test]
    fn test_pi_law() {
        let (problem, soln) = robertson::<f64>();
        let mut s = problem.kvaerno5::<LS>().unwrap();
        s.config_mut().step_size_law = StepSizeLaw::Pi;
        test_ode_solver(&mut s, &soln);
    }

    #[test]
    fn test_non_sdirk_tableau_rejected() {
        let (problem, _soln) = exponential_decay_problem::<f64>();
        // consistent tableau, but the diagonal is not constant
        let a = DMatrix::from_row_slice(3, 3, &[0.0, 0.0, 0.0, 0.25, 0.25, 0.0, 0.2, 0.3, 0.5]);
        let b = DVector::from_vec(vec![0.2, 0.3, 0.5]);
        let c = DVector::from_vec(vec![0.0, 0.5, 1.0]);
        let d = DVector::from_vec(vec![0.1, -0.1, 0.0]);
        let tableau = Tableau::new(a, b, c, d, 2, 1, None).unwrap();
        let state = problem.rk_state(&tableau).unwrap();
        assert!(Sdirk::<_, LS>::new(&problem, state, tableau, LS::default()).is_err());
    }
}
