use nalgebra::DVector;
use num_traits::{FromPrimitive, Zero};

use crate::error::StiffsolError;
use crate::linear_solver::LinearSolver;
use crate::ode_equations::{OdeEquations, OdeEquationsImplicit};
use crate::ode_solver::sdirk::Sdirk;
use crate::ode_solver::state::RkState;
use crate::ode_solver::tableau::Tableau;
use crate::ode_solver_error;
use crate::scalar::Scalar;

pub struct OdeSolverProblem<Eqn>
where
    Eqn: OdeEquations,
{
    pub eqn: Eqn,
    pub rtol: Eqn::T,
    pub atol: DVector<Eqn::T>,
    pub t0: Eqn::T,
    pub h0: Eqn::T,
}

macro_rules! sdirk_solver_from_tableau {
    ($method:ident, $method_solver:ident, $tableau:ident) => {
        /// Create a solver for this problem from a caller-provided state.
        pub fn $method_solver<LS: LinearSolver<Eqn::T>>(
            &self,
            state: RkState<Eqn::T>,
        ) -> Result<Sdirk<'_, Eqn, LS>, StiffsolError>
        where
            Eqn: OdeEquationsImplicit,
        {
            let tableau = Tableau::$tableau()?;
            Sdirk::new(self, state, tableau, LS::default())
        }

        /// Create a solver for this problem together with its initial state.
        pub fn $method<LS: LinearSolver<Eqn::T>>(
            &self,
        ) -> Result<Sdirk<'_, Eqn, LS>, StiffsolError>
        where
            Eqn: OdeEquationsImplicit,
        {
            let tableau = Tableau::$tableau()?;
            let state = RkState::new(self, tableau.order())?;
            Sdirk::new(self, state, tableau, LS::default())
        }
    };
}

impl<Eqn> OdeSolverProblem<Eqn>
where
    Eqn: OdeEquations,
{
    pub fn new(
        eqn: Eqn,
        rtol: Eqn::T,
        atol: DVector<Eqn::T>,
        t0: Eqn::T,
        h0: Eqn::T,
    ) -> Result<Self, StiffsolError> {
        if !(rtol > Eqn::T::zero()) {
            return Err(ode_solver_error!(BuilderError, "rtol must be positive"));
        }
        if atol.len() != eqn.nstates() {
            return Err(ode_solver_error!(
                BuilderError,
                format!(
                    "atol has {} elements, expected {}",
                    atol.len(),
                    eqn.nstates()
                )
            ));
        }
        if atol.iter().any(|a| !(*a > Eqn::T::zero())) {
            return Err(ode_solver_error!(BuilderError, "atol must be positive"));
        }
        if h0 < Eqn::T::zero() {
            return Err(ode_solver_error!(BuilderError, "h0 must be non-negative"));
        }
        Ok(Self {
            eqn,
            rtol,
            atol,
            t0,
            h0,
        })
    }

    pub fn eqn(&self) -> &Eqn {
        &self.eqn
    }

    pub fn eqn_mut(&mut self) -> &mut Eqn {
        &mut self.eqn
    }

    /// Create a new state for the Runge-Kutta solvers.
    pub fn rk_state(&self, tableau: &Tableau<Eqn::T>) -> Result<RkState<Eqn::T>, StiffsolError> {
        RkState::new(self, tableau.order())
    }

    sdirk_solver_from_tableau!(tr_bdf2, tr_bdf2_solver, tr_bdf2);
    sdirk_solver_from_tableau!(esdirk34, esdirk34_solver, esdirk34);
    sdirk_solver_from_tableau!(kvaerno5, kvaerno5_solver, kvaerno5);
}

#[derive(Debug, Clone)]
pub struct OdeSolverSolutionPoint<T: Scalar> {
    pub state: DVector<T>,
    pub t: T,
}

/// Reference solution points for a problem, used by the tests and benches to
/// check solver output.
pub struct OdeSolverSolution<T: Scalar> {
    pub solution_points: Vec<OdeSolverSolutionPoint<T>>,
    pub rtol: T,
    pub atol: T,
}

impl<T: Scalar> OdeSolverSolution<T> {
    pub fn push(&mut self, state: DVector<T>, t: T) {
        // find the index to insert the new point keeping the times sorted
        let index = self
            .solution_points
            .iter()
            .position(|x| x.t > t)
            .unwrap_or(self.solution_points.len());
        self.solution_points
            .insert(index, OdeSolverSolutionPoint { state, t });
    }
}

impl<T: Scalar> Default for OdeSolverSolution<T> {
    fn default() -> Self {
        Self {
            solution_points: Vec::new(),
            rtol: T::from_f64(1e-6).unwrap(),
            atol: T::from_f64(1e-6).unwrap(),
        }
    }
}
