use nalgebra::DVector;

use crate::error::StiffsolError;
use crate::op::{NonLinearOp, NonLinearOpJacobian};
use crate::scalar::Scalar;

pub mod convergence;
pub mod newton;

pub use convergence::{Convergence, ConvergenceStatus};
pub use newton::NewtonNonlinearSolver;

/// A solver for the nonlinear problem `F(x) = 0`.
pub trait NonLinearSolver<T: Scalar>: Default {
    /// Set the problem to be solved, any previous problem is discarded.
    fn set_problem<C: NonLinearOpJacobian<T = T>>(&mut self, op: &C);

    fn is_jacobian_set(&self) -> bool;

    /// Reset the approximation of the Jacobian matrix.
    fn reset_jacobian<C: NonLinearOpJacobian<T = T>>(&mut self, op: &C, x: &DVector<T>, t: T);

    /// Clear the approximation of the Jacobian matrix.
    fn clear_jacobian(&mut self);

    /// Solve the problem `F(x, t) = 0` for fixed `t` in place. The norm of
    /// the Newton updates is measured against `error_y`.
    fn solve_in_place<C: NonLinearOp<T = T>>(
        &mut self,
        op: &C,
        xn: &mut DVector<T>,
        t: T,
        error_y: &DVector<T>,
        convergence: &mut Convergence<'_, T>,
    ) -> Result<(), StiffsolError>;

    /// Solve the problem `F(x, t) = 0` and return the solution.
    fn solve<C: NonLinearOp<T = T>>(
        &mut self,
        op: &C,
        x: &DVector<T>,
        t: T,
        error_y: &DVector<T>,
        convergence: &mut Convergence<'_, T>,
    ) -> Result<DVector<T>, StiffsolError> {
        let mut x = x.clone();
        self.solve_in_place(op, &mut x, t, error_y, convergence)?;
        Ok(x)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::linear_solver::LU;
    use crate::op::Op;
    use nalgebra::{DMatrix, DVector};

    // F(x) = 2 * x * x - 8, componentwise, with roots at x = 2
    struct SquareOp;

    impl Op for SquareOp {
        type T = f64;
        fn nstates(&self) -> usize {
            2
        }
    }

    impl NonLinearOp for SquareOp {
        fn call_inplace(&self, x: &DVector<f64>, _t: f64, y: &mut DVector<f64>) {
            for i in 0..2 {
                y[i] = 2.0 * x[i] * x[i] - 8.0;
            }
        }
    }

    impl NonLinearOpJacobian for SquareOp {
        fn jacobian_inplace(&self, x: &DVector<f64>, _t: f64, jac: &mut DMatrix<f64>) {
            jac.fill(0.0);
            for i in 0..2 {
                jac[(i, i)] = 4.0 * x[i];
            }
        }
    }

    #[test]
    fn test_newton_square() {
        let op = SquareOp;
        let atol = DVector::from_vec(vec![1e-6, 1e-6]);
        let mut convergence = Convergence::new(1e-6, &atol);
        let mut solver = NewtonNonlinearSolver::<f64, LU<f64>>::default();
        solver.set_problem(&op);
        let x0 = DVector::from_vec(vec![2.1, 2.1]);
        solver.reset_jacobian(&op, &x0, 0.0);
        let x = solver.solve(&op, &x0, 0.0, &x0, &mut convergence).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-5);
        assert!((x[1] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_newton_requires_jacobian() {
        let op = SquareOp;
        let atol = DVector::from_vec(vec![1e-6, 1e-6]);
        let mut convergence = Convergence::new(1e-6, &atol);
        let mut solver = NewtonNonlinearSolver::<f64, LU<f64>>::default();
        solver.set_problem(&op);
        let mut x = DVector::from_vec(vec![2.1, 2.1]);
        let x0 = x.clone();
        assert!(solver
            .solve_in_place(&op, &mut x, 0.0, &x0, &mut convergence)
            .is_err());
    }
}
