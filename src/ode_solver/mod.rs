pub mod builder;
pub mod config;
pub mod controller;
pub mod jacobian_update;
pub mod method;
pub mod problem;
pub mod sdirk;
pub mod state;
pub mod tableau;

#[cfg(test)]
pub mod tests {
    use nalgebra::DVector;

    use crate::ode_equations::OdeEquations;
    use crate::ode_solver::method::{OdeSolverMethod, SolveStatus};
    use crate::ode_solver::problem::OdeSolverSolution;
    use crate::scalar::Scalar;

    /// Solve at the reference times and check the output against the
    /// reference points, within the solution's own tolerances.
    pub fn test_ode_solver<'a, Eqn, Method>(
        method: &mut Method,
        soln: &OdeSolverSolution<Eqn::T>,
    ) -> DVector<Eqn::T>
    where
        Eqn: OdeEquations + 'a,
        Method: OdeSolverMethod<'a, Eqn>,
    {
        let t_eval: Vec<Eqn::T> = soln.solution_points.iter().map(|p| p.t).collect();
        let out = method.solve_dense(&t_eval).unwrap();
        assert_eq!(out.status, SolveStatus::Success);
        assert_eq!(out.t.len(), t_eval.len());
        for (point, y) in soln.solution_points.iter().zip(out.y.iter()) {
            for i in 0..y.len() {
                let tol = soln.atol + soln.rtol * num_traits::abs(point.state[i]);
                let err = num_traits::abs(y[i] - point.state[i]);
                assert!(
                    err < tol,
                    "solution mismatch at t = {}, component {}: got {}, expected {} (err {} > tol {})",
                    point.t,
                    i,
                    y[i],
                    point.state[i],
                    err,
                    tol
                );
            }
        }
        out.y.last().unwrap().clone()
    }

    /// Check that a trajectory's times are strictly increasing.
    pub fn assert_strictly_increasing<T: Scalar>(ts: &[T]) {
        for window in ts.windows(2) {
            assert!(window[0] < window[1], "times are not strictly increasing");
        }
    }
}
