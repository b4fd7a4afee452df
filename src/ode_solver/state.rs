use nalgebra::{ComplexField, DVector};
use num_traits::{FromPrimitive, One, Pow, Zero};

use crate::error::StiffsolError;
use crate::ode_equations::OdeEquations;
use crate::ode_solver::problem::OdeSolverProblem;
use crate::ode_solver_error;
use crate::scalar::Scalar;
use crate::vector::VectorNorm;

/// State for the Runge-Kutta solvers, containing:
/// - the current solution `y`
/// - the derivative of the solution wrt time `dy`
/// - the current time `t`
/// - the current step size `h`
#[derive(Clone)]
pub struct RkState<T: Scalar> {
    pub y: DVector<T>,
    pub dy: DVector<T>,
    pub t: T,
    pub h: T,
}

impl<T: Scalar> RkState<T> {
    /// Create a new state from an ODE problem.
    ///
    /// The problem's `h0` is used as the initial step size if it is positive,
    /// otherwise a startup step is chosen automatically via
    /// [Self::set_step_size].
    pub fn new<Eqn>(
        problem: &OdeSolverProblem<Eqn>,
        solver_order: usize,
    ) -> Result<Self, StiffsolError>
    where
        Eqn: OdeEquations<T = T>,
    {
        let mut ret = Self::new_without_initialise(problem)?;
        if problem.h0 <= T::zero() {
            ret.set_step_size(&problem.atol, problem.rtol, &problem.eqn, solver_order);
        }
        Ok(ret)
    }

    /// Create a new state from an ODE problem without choosing a step size,
    /// setting only the initial state vector `y`, its time derivative `dy`
    /// and the initial time.
    pub fn new_without_initialise<Eqn>(
        problem: &OdeSolverProblem<Eqn>,
    ) -> Result<Self, StiffsolError>
    where
        Eqn: OdeEquations<T = T>,
    {
        let t = problem.t0;
        let y = problem.eqn.init(t);
        if y.len() != problem.eqn.nstates() {
            return Err(ode_solver_error!(StateProblemMismatch));
        }
        let dy = problem.eqn.rhs(&y, t);
        Ok(Self {
            y,
            dy,
            t,
            h: problem.h0,
        })
    }

    pub fn check_consistent_with_problem<Eqn>(
        &self,
        problem: &OdeSolverProblem<Eqn>,
    ) -> Result<(), StiffsolError>
    where
        Eqn: OdeEquations<T = T>,
    {
        if self.y.len() != problem.eqn.nstates() || self.dy.len() != problem.eqn.nstates() {
            return Err(ode_solver_error!(StateProblemMismatch));
        }
        Ok(())
    }

    /// Compute the size of the first step based on the alg in Hairer, Norsett, Wanner
    /// Solving Ordinary Differential Equations I, Nonstiff Problems
    /// Section II.4.2
    pub fn set_step_size<Eqn>(
        &mut self,
        atol: &DVector<T>,
        rtol: T,
        eqn: &Eqn,
        solver_order: usize,
    ) where
        Eqn: OdeEquations<T = T>,
    {
        let y0 = &self.y;
        let t0 = self.t;
        let f0 = &self.dy;

        let d0 = y0.squared_norm(y0, atol, rtol).sqrt();
        let d1 = f0.squared_norm(y0, atol, rtol).sqrt();

        let h0 = if d0 < T::from_f64(1e-5).unwrap() || d1 < T::from_f64(1e-5).unwrap() {
            T::from_f64(1e-6).unwrap()
        } else {
            T::from_f64(0.01).unwrap() * (d0 / d1)
        };

        let mut y1 = y0.clone();
        y1.axpy(h0, f0, T::one());
        let t1 = t0 + h0;
        let f1 = eqn.rhs(&y1, t1);

        let df = f1 - f0;
        let d2 = df.squared_norm(y0, atol, rtol).sqrt() / h0;

        let mut max_d = d2;
        if max_d < d1 {
            max_d = d1;
        }
        let h1 = if max_d < T::from_f64(1e-15).unwrap() {
            let h1 = h0 * T::from_f64(1e-3).unwrap();
            if h1 < T::from_f64(1e-6).unwrap() {
                T::from_f64(1e-6).unwrap()
            } else {
                h1
            }
        } else {
            (T::from_f64(0.01).unwrap() / max_d)
                .pow(T::one() / T::from_f64(1.0 + solver_order as f64).unwrap())
        };

        self.h = T::from_f64(100.0).unwrap() * h0;
        if self.h > h1 {
            self.h = h1;
        }
    }
}
