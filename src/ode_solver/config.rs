use num_traits::FromPrimitive;

use crate::ode_solver::controller::StepSizeLaw;
use crate::scalar::Scalar;

#[derive(Debug, Clone)]
pub struct SdirkConfig<T> {
    pub minimum_timestep: T,
    pub maximum_error_test_failures: usize,
    pub maximum_nonlinear_solver_fails: usize,
    pub maximum_timestep_growth: T,
    pub minimum_timestep_shrink: T,
    pub maximum_newton_iterations: usize,
    pub maximum_steps: usize,
    pub step_size_law: StepSizeLaw,
}

impl<T: Scalar> Default for SdirkConfig<T> {
    fn default() -> Self {
        Self {
            minimum_timestep: T::from_f64(1e-13).unwrap(),
            maximum_error_test_failures: 40,
            maximum_nonlinear_solver_fails: 40,
            maximum_timestep_growth: T::from_f64(10.0).unwrap(),
            minimum_timestep_shrink: T::from_f64(0.2).unwrap(),
            maximum_newton_iterations: 10,
            maximum_steps: 100_000,
            step_size_law: StepSizeLaw::Pid,
        }
    }
}
