use nalgebra::{DMatrix, DVector};

use crate::op::OpStatistics;
use crate::scalar::Scalar;

pub mod closure;
pub mod test_models;

pub use closure::{Closure, ClosureNoJac};

/// The right-hand side of an ODE system, `dy/dt = f(t, y)`.
///
/// Implementations must be pure: the solver evaluates them at trial states
/// well off the solution trajectory during Newton iteration, many times per
/// accepted step.
pub trait OdeEquations {
    type T: Scalar;

    fn nstates(&self) -> usize;

    fn rhs_inplace(&self, x: &DVector<Self::T>, t: Self::T, y: &mut DVector<Self::T>);

    fn init_inplace(&self, t: Self::T, y: &mut DVector<Self::T>);

    fn rhs(&self, x: &DVector<Self::T>, t: Self::T) -> DVector<Self::T> {
        let mut y = DVector::zeros(self.nstates());
        self.rhs_inplace(x, t, &mut y);
        y
    }

    fn init(&self, t: Self::T) -> DVector<Self::T> {
        let mut y = DVector::zeros(self.nstates());
        self.init_inplace(t, &mut y);
        y
    }

    fn statistics(&self) -> OpStatistics {
        OpStatistics::default()
    }
}

/// ODE equations that can also produce the Jacobian `df/dy`, as required by
/// the implicit solvers.
pub trait OdeEquationsImplicit: OdeEquations {
    fn jacobian_inplace(&self, x: &DVector<Self::T>, t: Self::T, jac: &mut DMatrix<Self::T>);
}
