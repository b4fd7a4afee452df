use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::scalar::Scalar;

pub mod sdirk;

/// Call counters for an operator, tracked with interior mutability so that
/// immutable operators can still report how often they were evaluated.
#[derive(Default, Clone, Debug, Serialize)]
pub struct OpStatistics {
    pub number_of_calls: usize,
    pub number_of_jac_muls: usize,
    pub number_of_matrix_evals: usize,
}

impl OpStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_call(&mut self) {
        self.number_of_calls += 1;
    }

    pub fn increment_jac_mul(&mut self) {
        self.number_of_jac_muls += 1;
    }

    pub fn increment_matrix(&mut self) {
        self.number_of_matrix_evals += 1;
    }
}

pub trait Op {
    type T: Scalar;

    /// Number of states in the operator's domain and range.
    fn nstates(&self) -> usize;
}

/// An operator `F(x, t)`.
pub trait NonLinearOp: Op {
    fn call_inplace(&self, x: &DVector<Self::T>, t: Self::T, y: &mut DVector<Self::T>);
}

/// A nonlinear operator that can also produce its Jacobian `dF/dx`.
pub trait NonLinearOpJacobian: NonLinearOp {
    fn jacobian_inplace(&self, x: &DVector<Self::T>, t: Self::T, jac: &mut DMatrix<Self::T>);
}
