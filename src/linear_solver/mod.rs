use nalgebra::DVector;

use crate::error::StiffsolError;
use crate::op::NonLinearOpJacobian;
use crate::scalar::Scalar;

pub mod lu;

pub use lu::LU;

/// A solver for the linear problem `Ax = b`, where `A` is the linearisation
/// of a nonlinear operator `C` at a given point.
pub trait LinearSolver<T: Scalar>: Default {
    /// Set the problem to be solved, any previous problem is discarded.
    /// Any internal state of the solver is reset.
    fn set_problem<C: NonLinearOpJacobian<T = T>>(&mut self, op: &C);

    /// Set the point at which the linearisation of the operator is evaluated
    /// and factorise it.
    fn set_linearisation<C: NonLinearOpJacobian<T = T>>(&mut self, op: &C, x: &DVector<T>, t: T);

    /// Solve the problem `Ax = b` in place, where `A` was factorised by
    /// [Self::set_linearisation].
    fn solve_in_place(&self, b: &mut DVector<T>) -> Result<(), StiffsolError>;

    fn solve(&self, b: &DVector<T>) -> Result<DVector<T>, StiffsolError> {
        let mut b = b.clone();
        self.solve_in_place(&mut b)?;
        Ok(b)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::op::{NonLinearOp, Op};
    use nalgebra::{DMatrix, DVector};

    pub struct LinearTestOp {
        jac: DMatrix<f64>,
    }

    impl Op for LinearTestOp {
        type T = f64;
        fn nstates(&self) -> usize {
            2
        }
    }

    impl NonLinearOp for LinearTestOp {
        fn call_inplace(&self, x: &DVector<f64>, _t: f64, y: &mut DVector<f64>) {
            y.gemv(1.0, &self.jac, x, 0.0);
        }
    }

    impl NonLinearOpJacobian for LinearTestOp {
        fn jacobian_inplace(&self, _x: &DVector<f64>, _t: f64, jac: &mut DMatrix<f64>) {
            jac.copy_from(&self.jac);
        }
    }

    #[test]
    fn test_lu() {
        let op = LinearTestOp {
            jac: DMatrix::from_diagonal(&DVector::from_vec(vec![2.0, 2.0])),
        };
        let mut solver = LU::default();
        solver.set_problem(&op);
        let x = DVector::zeros(2);
        solver.set_linearisation(&op, &x, 0.0);
        let b = DVector::from_vec(vec![2.0, 4.0]);
        let soln = solver.solve(&b).unwrap();
        assert!((soln[0] - 1.0).abs() < 1e-12);
        assert!((soln[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_lu_not_initialized() {
        let solver = LU::<f64>::default();
        let mut b = DVector::from_vec(vec![1.0]);
        assert!(solver.solve_in_place(&mut b).is_err());
    }
}
