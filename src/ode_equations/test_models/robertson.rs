use nalgebra::DVector;
use num_traits::{FromPrimitive, One, Zero};

use crate::ode_equations::OdeEquationsImplicit;
use crate::ode_solver::builder::OdeBuilder;
use crate::ode_solver::problem::{OdeSolverProblem, OdeSolverSolution};
use crate::scalar::Scalar;

// 3-species chemical kinetics problem from Robertson (1966):
//     dy1/dt = -.04*y1 + 1.e4*y2*y3
//     dy2/dt = .04*y1 - 1.e4*y2*y3 - 3.e7*(y2)^2
//     dy3/dt = 3.e7*(y2)^2
// on the interval from t = 0.0 to t = 4.e10, with initial conditions
// y1 = 1.0, y2 = y3 = 0. The problem is stiff. The reference values below are
// from the example problem distributed with CVODE (BDF with a user-supplied
// Jacobian, printed in decades from t = .4 to t = 4.e10).
#[allow(clippy::type_complexity)]
pub fn robertson<T: Scalar>() -> (
    OdeSolverProblem<impl OdeEquationsImplicit<T = T>>,
    OdeSolverSolution<T>,
) {
    let problem = OdeBuilder::<T>::new()
        .p([0.04, 1.0e4, 3.0e7])
        .rtol(1e-4)
        .atol([1.0e-8, 1.0e-14, 1.0e-6])
        .rhs_implicit(
            |x: &DVector<T>, p: &DVector<T>, _t: T, y: &mut DVector<T>| {
                y[0] = -p[0] * x[0] + p[1] * x[1] * x[2];
                y[1] = p[0] * x[0] - p[1] * x[1] * x[2] - p[2] * x[1] * x[1];
                y[2] = p[2] * x[1] * x[1];
            },
            |x: &DVector<T>, p: &DVector<T>, _t: T, v: &DVector<T>, y: &mut DVector<T>| {
                let two = T::from_f64(2.0).unwrap();
                y[0] = -p[0] * v[0] + p[1] * v[1] * x[2] + p[1] * x[1] * v[2];
                y[1] = p[0] * v[0]
                    - p[1] * v[1] * x[2]
                    - p[1] * x[1] * v[2]
                    - two * p[2] * x[1] * v[1];
                y[2] = two * p[2] * x[1] * v[1];
            },
        )
        .init(
            |_p: &DVector<T>, _t: T, y: &mut DVector<T>| {
                y[0] = T::one();
                y[1] = T::zero();
                y[2] = T::zero();
            },
            3,
        )
        .build()
        .unwrap();

    let mut soln = OdeSolverSolution {
        rtol: T::from_f64(1e-2).unwrap(),
        atol: T::from_f64(1e-5).unwrap(),
        ..Default::default()
    };
    let data = vec![
        (vec![1.0, 0.0, 0.0], 0.0),
        (vec![9.851641e-01, 3.386242e-05, 1.480205e-02], 0.4),
        (vec![9.055097e-01, 2.240338e-05, 9.446793e-02], 4.0),
        (vec![7.158017e-01, 9.185037e-06, 2.841892e-01], 40.0),
        (vec![4.505360e-01, 3.223271e-06, 5.494608e-01], 400.0),
        (vec![1.832299e-01, 8.944378e-07, 8.167692e-01], 4000.0),
        (vec![3.898902e-02, 1.622006e-07, 9.610108e-01], 40000.0),
        (vec![4.936383e-03, 1.984224e-08, 9.950636e-01], 400000.0),
        (vec![5.168093e-04, 2.068293e-09, 9.994832e-01], 4000000.0),
        (vec![5.202440e-05, 2.081083e-10, 9.999480e-01], 4.0000e+07),
        (vec![5.201061e-06, 2.080435e-11, 9.999948e-01], 4.0000e+08),
        (vec![5.258603e-07, 2.103442e-12, 9.999995e-01], 4.0000e+09),
        (vec![6.934511e-08, 2.773804e-13, 9.999999e-01], 4.0000e+10),
    ];

    for (values, time) in data {
        soln.push(
            DVector::from_vec(
                values
                    .into_iter()
                    .map(|v| T::from_f64(v).unwrap())
                    .collect(),
            ),
            T::from_f64(time).unwrap(),
        );
    }
    (problem, soln)
}
