use nalgebra::{DMatrix, DVector, Dyn};

use crate::error::StiffsolError;
use crate::linear_solver::LinearSolver;
use crate::linear_solver_error;
use crate::op::NonLinearOpJacobian;
use crate::scalar::Scalar;

/// A [LinearSolver] that uses the LU decomposition in the
/// [`nalgebra` library](https://nalgebra.org/) to solve the linear system.
#[derive(Clone)]
pub struct LU<T>
where
    T: Scalar,
{
    matrix: Option<DMatrix<T>>,
    lu: Option<nalgebra::LU<T, Dyn, Dyn>>,
}

impl<T> Default for LU<T>
where
    T: Scalar,
{
    fn default() -> Self {
        Self {
            lu: None,
            matrix: None,
        }
    }
}

impl<T: Scalar> LinearSolver<T> for LU<T> {
    fn set_problem<C: NonLinearOpJacobian<T = T>>(&mut self, op: &C) {
        let n = op.nstates();
        self.matrix = Some(DMatrix::zeros(n, n));
        self.lu = None;
    }

    fn set_linearisation<C: NonLinearOpJacobian<T = T>>(&mut self, op: &C, x: &DVector<T>, t: T) {
        let matrix = self.matrix.as_mut().expect("Matrix not set");
        op.jacobian_inplace(x, t, matrix);
        self.lu = Some(matrix.clone().lu());
    }

    fn solve_in_place(&self, b: &mut DVector<T>) -> Result<(), StiffsolError> {
        let lu = match self.lu.as_ref() {
            Some(lu) => lu,
            None => return Err(linear_solver_error!(LuNotInitialized)),
        };
        match lu.solve_mut(b) {
            true => Ok(()),
            false => Err(linear_solver_error!(LuSolveFailed)),
        }
    }
}
