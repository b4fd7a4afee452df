use nalgebra::{ComplexField, DVector};
use num_traits::{FromPrimitive, One};

use crate::ode_equations::OdeEquationsImplicit;
use crate::ode_solver::builder::OdeBuilder;
use crate::ode_solver::problem::{OdeSolverProblem, OdeSolverSolution};
use crate::scalar::Scalar;

/// Exponential decay problem, dy/dt = -a y, y(0) = [1, 1].
#[allow(clippy::type_complexity)]
pub fn exponential_decay_problem<T: Scalar>() -> (
    OdeSolverProblem<impl OdeEquationsImplicit<T = T>>,
    OdeSolverSolution<T>,
) {
    let problem = OdeBuilder::<T>::new()
        .p([0.1])
        .rtol(1e-6)
        .atol([1e-6])
        .rhs_implicit(
            |x: &DVector<T>, p: &DVector<T>, _t: T, y: &mut DVector<T>| {
                y[0] = -p[0] * x[0];
                y[1] = -p[0] * x[1];
            },
            |_x: &DVector<T>, p: &DVector<T>, _t: T, v: &DVector<T>, y: &mut DVector<T>| {
                y[0] = -p[0] * v[0];
                y[1] = -p[0] * v[1];
            },
        )
        .init(
            |_p: &DVector<T>, _t: T, y: &mut DVector<T>| {
                y[0] = T::one();
                y[1] = T::one();
            },
            2,
        )
        .build()
        .unwrap();

    let mut soln = OdeSolverSolution {
        rtol: T::from_f64(1e-4).unwrap(),
        atol: T::from_f64(1e-8).unwrap(),
        ..Default::default()
    };
    let a = T::from_f64(0.1).unwrap();
    for i in 0..10 {
        let t = T::from_f64(i as f64).unwrap();
        let value = (-a * t).exp();
        soln.push(DVector::from_vec(vec![value, value]), t);
    }
    (problem, soln)
}
