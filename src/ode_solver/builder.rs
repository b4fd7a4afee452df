use std::marker::PhantomData;

use nalgebra::DVector;
use num_traits::FromPrimitive;

use crate::error::StiffsolError;
use crate::ode_equations::{Closure, ClosureNoJac};
use crate::ode_solver::problem::OdeSolverProblem;
use crate::ode_solver_error;
use crate::scalar::Scalar;

/// Builder for an [OdeSolverProblem].
///
/// Configuration options (initial time, initial step size, tolerances,
/// parameters) can be set with the builder methods or left at their default
/// values. The equations are provided as closures via [Self::rhs] or
/// [Self::rhs_implicit] plus [Self::init], then [`build`](OdeBuilder::build)
/// creates the problem.
///
/// An `h0` of zero (the default) selects the initial step size
/// automatically. A scalar `atol` is broadcast to every component.
///
/// # Example
///
/// ```
/// use stiffsol::{OdeBuilder, OdeSolverMethod, LU};
///
/// let problem = OdeBuilder::<f64>::new()
///     .rtol(1e-6)
///     .p([0.1])
///     .rhs(|x, p, _t, y| y[0] = -p[0] * x[0])
///     .init(|_p, _t, y| y[0] = 1.0, 1)
///     .build()
///     .unwrap();
/// let mut solver = problem.kvaerno5::<LU<f64>>().unwrap();
/// let _solution = solver.solve(1.0).unwrap();
/// ```
pub struct OdeBuilder<T: Scalar = f64, Rhs = (), Init = ()> {
    t0: f64,
    h0: f64,
    rtol: f64,
    atol: Vec<f64>,
    p: Vec<f64>,
    rhs: Rhs,
    init: Init,
    nstates: usize,
    _marker: PhantomData<T>,
}

impl<T: Scalar> Default for OdeBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> OdeBuilder<T> {
    pub fn new() -> Self {
        Self {
            t0: 0.0,
            h0: 0.0,
            rtol: 1e-6,
            atol: vec![1e-6],
            p: vec![],
            rhs: (),
            init: (),
            nstates: 0,
            _marker: PhantomData,
        }
    }
}

impl<T: Scalar, Rhs, Init> OdeBuilder<T, Rhs, Init> {
    pub fn t0(mut self, t0: f64) -> Self {
        self.t0 = t0;
        self
    }

    pub fn h0(mut self, h0: f64) -> Self {
        self.h0 = h0;
        self
    }

    pub fn rtol(mut self, rtol: f64) -> Self {
        self.rtol = rtol;
        self
    }

    pub fn atol<V: IntoIterator<Item = f64>>(mut self, atol: V) -> Self {
        self.atol = atol.into_iter().collect();
        self
    }

    pub fn p<V: IntoIterator<Item = f64>>(mut self, p: V) -> Self {
        self.p = p.into_iter().collect();
        self
    }

    /// Set the rhs closure `(x, p, t, y)` computing `y = f(t, x)`. The
    /// Jacobian will be approximated by finite differences.
    pub fn rhs<F>(self, rhs: F) -> OdeBuilder<T, (F,), Init>
    where
        F: Fn(&DVector<T>, &DVector<T>, T, &mut DVector<T>),
    {
        OdeBuilder {
            t0: self.t0,
            h0: self.h0,
            rtol: self.rtol,
            atol: self.atol,
            p: self.p,
            rhs: (rhs,),
            init: self.init,
            nstates: self.nstates,
            _marker: PhantomData,
        }
    }

    /// Set the rhs closure `(x, p, t, y)` and the Jacobian action closure
    /// `(x, p, t, v, y)` computing `y = (df/dx) v`.
    pub fn rhs_implicit<F, G>(self, rhs: F, jacobian_action: G) -> OdeBuilder<T, (F, G), Init>
    where
        F: Fn(&DVector<T>, &DVector<T>, T, &mut DVector<T>),
        G: Fn(&DVector<T>, &DVector<T>, T, &DVector<T>, &mut DVector<T>),
    {
        OdeBuilder {
            t0: self.t0,
            h0: self.h0,
            rtol: self.rtol,
            atol: self.atol,
            p: self.p,
            rhs: (rhs, jacobian_action),
            init: self.init,
            nstates: self.nstates,
            _marker: PhantomData,
        }
    }

    /// Set the initial condition closure `(p, t, y)` and the number of states.
    pub fn init<F>(self, init: F, nstates: usize) -> OdeBuilder<T, Rhs, (F,)>
    where
        F: Fn(&DVector<T>, T, &mut DVector<T>),
    {
        OdeBuilder {
            t0: self.t0,
            h0: self.h0,
            rtol: self.rtol,
            atol: self.atol,
            p: self.p,
            rhs: self.rhs,
            init: (init,),
            nstates,
            _marker: PhantomData,
        }
    }

    fn build_atol(&self) -> Result<DVector<T>, StiffsolError> {
        let nstates = self.nstates;
        if self.atol.len() == 1 {
            Ok(DVector::from_element(
                nstates,
                T::from_f64(self.atol[0]).unwrap(),
            ))
        } else if self.atol.len() == nstates {
            Ok(DVector::from_vec(
                self.atol
                    .iter()
                    .map(|&a| T::from_f64(a).unwrap())
                    .collect(),
            ))
        } else {
            Err(ode_solver_error!(
                BuilderError,
                format!(
                    "atol must have 1 or {} elements, got {}",
                    nstates,
                    self.atol.len()
                )
            ))
        }
    }

    fn build_p(&self) -> DVector<T> {
        DVector::from_vec(self.p.iter().map(|&p| T::from_f64(p).unwrap()).collect())
    }
}

impl<T, F, G, I> OdeBuilder<T, (F, G), (I,)>
where
    T: Scalar,
    F: Fn(&DVector<T>, &DVector<T>, T, &mut DVector<T>),
    G: Fn(&DVector<T>, &DVector<T>, T, &DVector<T>, &mut DVector<T>),
    I: Fn(&DVector<T>, T, &mut DVector<T>),
{
    pub fn build(self) -> Result<OdeSolverProblem<Closure<T, F, G, I>>, StiffsolError> {
        let atol = self.build_atol()?;
        let p = self.build_p();
        let (rhs, jacobian_action) = self.rhs;
        let (init,) = self.init;
        let eqn = Closure::new(rhs, jacobian_action, init, self.nstates, p);
        OdeSolverProblem::new(
            eqn,
            T::from_f64(self.rtol).unwrap(),
            atol,
            T::from_f64(self.t0).unwrap(),
            T::from_f64(self.h0).unwrap(),
        )
    }
}

impl<T, F, I> OdeBuilder<T, (F,), (I,)>
where
    T: Scalar,
    F: Fn(&DVector<T>, &DVector<T>, T, &mut DVector<T>),
    I: Fn(&DVector<T>, T, &mut DVector<T>),
{
    pub fn build(self) -> Result<OdeSolverProblem<ClosureNoJac<T, F, I>>, StiffsolError> {
        let atol = self.build_atol()?;
        let p = self.build_p();
        let (rhs,) = self.rhs;
        let (init,) = self.init;
        let eqn = ClosureNoJac::new(rhs, init, self.nstates, p);
        OdeSolverProblem::new(
            eqn,
            T::from_f64(self.rtol).unwrap(),
            atol,
            T::from_f64(self.t0).unwrap(),
            T::from_f64(self.h0).unwrap(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atol_broadcast() {
        let problem = OdeBuilder::<f64>::new()
            .atol([1e-8])
            .rhs(|x: &DVector<f64>, _p, _t, y: &mut DVector<f64>| y[0] = -x[0])
            .init(|_p, _t, y: &mut DVector<f64>| y[0] = 1.0, 3)
            .build()
            .unwrap();
        assert_eq!(problem.atol.len(), 3);
        assert_eq!(problem.atol[2], 1e-8);
    }

    #[test]
    fn test_bad_atol_len_rejected() {
        let result = OdeBuilder::<f64>::new()
            .atol([1e-8, 1e-8])
            .rhs(|x: &DVector<f64>, _p, _t, y: &mut DVector<f64>| y[0] = -x[0])
            .init(|_p, _t, y: &mut DVector<f64>| y[0] = 1.0, 3)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_rtol_rejected() {
        let result = OdeBuilder::<f64>::new()
            .rtol(0.0)
            .rhs(|x: &DVector<f64>, _p, _t, y: &mut DVector<f64>| y[0] = -x[0])
            .init(|_p, _t, y: &mut DVector<f64>| y[0] = 1.0, 1)
            .build();
        assert!(result.is_err());
    }
}
