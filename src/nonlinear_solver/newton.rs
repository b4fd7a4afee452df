use nalgebra::DVector;

use crate::error::{NonLinearSolverError, StiffsolError};
use crate::linear_solver::LinearSolver;
use crate::non_linear_solver_error;
use crate::nonlinear_solver::convergence::{Convergence, ConvergenceStatus};
use crate::nonlinear_solver::NonLinearSolver;
use crate::op::{NonLinearOp, NonLinearOpJacobian};
use crate::scalar::Scalar;

pub fn newton_iteration<T: Scalar>(
    xn: &mut DVector<T>,
    tmp: &mut DVector<T>,
    error_y: &DVector<T>,
    fun: impl Fn(&DVector<T>, &mut DVector<T>),
    linear_solver: impl Fn(&mut DVector<T>) -> Result<(), StiffsolError>,
    convergence: &mut Convergence<'_, T>,
) -> Result<(), StiffsolError> {
    convergence.reset();
    loop {
        fun(xn, tmp);
        // tmp = F(x_n)

        linear_solver(tmp)?;
        // tmp = -delta_n

        *xn -= &*tmp;
        // xn = xn + delta_n

        match convergence.check_new_iteration(tmp, error_y) {
            ConvergenceStatus::Continue => continue,
            ConvergenceStatus::Converged => return Ok(()),
            ConvergenceStatus::Diverged => break,
            ConvergenceStatus::MaximumIterations => break,
        }
    }
    Err(non_linear_solver_error!(NewtonDidNotConverge))
}

pub struct NewtonNonlinearSolver<T: Scalar, Ls: LinearSolver<T>> {
    linear_solver: Ls,
    is_jacobian_set: bool,
    tmp: DVector<T>,
}

impl<T: Scalar, Ls: LinearSolver<T>> NewtonNonlinearSolver<T, Ls> {
    pub fn new(linear_solver: Ls) -> Self {
        Self {
            linear_solver,
            is_jacobian_set: false,
            tmp: DVector::zeros(0),
        }
    }

    pub fn linear_solver(&self) -> &Ls {
        &self.linear_solver
    }
}

impl<T: Scalar, Ls: LinearSolver<T>> Default for NewtonNonlinearSolver<T, Ls> {
    fn default() -> Self {
        Self::new(Ls::default())
    }
}

impl<T: Scalar, Ls: LinearSolver<T>> NonLinearSolver<T> for NewtonNonlinearSolver<T, Ls> {
    fn clear_jacobian(&mut self) {
        self.is_jacobian_set = false;
    }

    fn is_jacobian_set(&self) -> bool {
        self.is_jacobian_set
    }

    fn set_problem<C: NonLinearOpJacobian<T = T>>(&mut self, op: &C) {
        self.linear_solver.set_problem(op);
        self.is_jacobian_set = false;
        self.tmp = DVector::zeros(op.nstates());
    }

    fn reset_jacobian<C: NonLinearOpJacobian<T = T>>(&mut self, op: &C, x: &DVector<T>, t: T) {
        self.linear_solver.set_linearisation(op, x, t);
        self.is_jacobian_set = true;
    }

    fn solve_in_place<C: NonLinearOp<T = T>>(
        &mut self,
        op: &C,
        xn: &mut DVector<T>,
        t: T,
        error_y: &DVector<T>,
        convergence: &mut Convergence<'_, T>,
    ) -> Result<(), StiffsolError> {
        if !self.is_jacobian_set {
            return Err(non_linear_solver_error!(JacobianNotReset));
        }
        if xn.len() != op.nstates() {
            let error = NonLinearSolverError::WrongStateLength {
                expected: op.nstates(),
                found: xn.len(),
            };
            return Err(StiffsolError::from(error));
        }
        let linear_solver = &self.linear_solver;
        let tmp = &mut self.tmp;
        let fun = |x: &DVector<T>, y: &mut DVector<T>| op.call_inplace(x, t, y);
        newton_iteration(
            xn,
            tmp,
            error_y,
            fun,
            |x| linear_solver.solve_in_place(x),
            convergence,
        )
    }
}
