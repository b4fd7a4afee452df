//! # Stiffsol
//!
//! Stiffsol is a library for solving stiff ordinary differential equations
//! (ODEs). It provides singly diagonally implicit Runge-Kutta (SDIRK and
//! ESDIRK) methods with embedded error estimation, an inner Newton solver,
//! and a PID step-size controller.
//!
//! ## Solving ODEs
//!
//! The simplest way to create a new problem is to use the [OdeBuilder]
//! struct. You can set configuration options such as the initial time
//! ([OdeBuilder::t0]), initial step size ([OdeBuilder::h0]), relative
//! tolerance ([OdeBuilder::rtol]), absolute tolerance ([OdeBuilder::atol])
//! and parameters ([OdeBuilder::p]), provide the equations as closures
//! ([OdeBuilder::rhs], [OdeBuilder::rhs_implicit], [OdeBuilder::init]), and
//! call [OdeBuilder::build] to create an [OdeSolverProblem].
//!
//! ## The solver
//!
//! The solver [Sdirk] accepts any stiffly accurate SDIRK or ESDIRK [Tableau];
//! the provided methods are [Tableau::kvaerno5], [Tableau::esdirk34] and
//! [Tableau::tr_bdf2]. The easiest way to create a solver is one of the
//! methods on the problem struct ([OdeSolverProblem::kvaerno5],
//! [OdeSolverProblem::esdirk34], [OdeSolverProblem::tr_bdf2]), which also
//! create the initial solver state (an explicit `h0`, or an automatic
//! startup step when `h0` is zero).
//!
//! Possible workflows:
//! - Use the [OdeSolverMethod::step] method to step the solution forward in
//!   time with an internal step size chosen by the solver to meet the error
//!   tolerances, and [OdeSolverMethod::interpolate] to evaluate the solution
//!   within the last step.
//! - Use the convenience functions [OdeSolverMethod::solve] or
//!   [OdeSolverMethod::solve_dense] that drive the step loop up to a final
//!   time or over a sequence of save times. Both return an [OdeSolution]
//!   holding the trajectory, the run [Statistics] and a terminal
//!   [SolveStatus]; a run that breaks down numerically or exhausts its step
//!   budget reports the partial trajectory together with the status.
//!
//! ## Step-size control
//!
//! Error is measured per-component against `atol + rtol * |y|` and stepping
//! is controlled by a PID controller over the sequence of error norms
//! ([PidController]), with the control law selectable via
//! [SdirkConfig::step_size_law]. Step rejections, Newton convergence
//! failures and limits on step counts are handled via the [SdirkConfig]
//! settings.
//!
//! ## Nonlinear and linear solvers
//!
//! Stiffsol provides generic nonlinear and linear solvers that are used
//! internally by the ODE solver. You can use the solvers provided by
//! Stiffsol, or implement your own following the provided traits:
//! - The linear solver trait is [LinearSolver], with [LU] (using the LU
//!   decomposition in the [nalgebra](https://nalgebra.org) library) provided.
//! - The nonlinear solver trait is [NonLinearSolver], with
//!   [NewtonNonlinearSolver] provided.

pub mod error;
pub mod jacobian;
pub mod linear_solver;
pub mod nonlinear_solver;
pub mod ode_equations;
pub mod ode_solver;
pub mod op;
pub mod scalar;
pub mod vector;

pub use error::{
    LinearSolverError, NonLinearSolverError, OdeSolverError, StiffsolError,
};
pub use linear_solver::{LinearSolver, LU};
pub use nonlinear_solver::{
    convergence::Convergence, convergence::ConvergenceStatus, newton::NewtonNonlinearSolver,
    NonLinearSolver,
};
pub use ode_equations::{
    Closure, ClosureNoJac, OdeEquations, OdeEquationsImplicit,
};
pub use ode_solver::{
    builder::OdeBuilder,
    config::SdirkConfig,
    controller::{PidController, StepSizeLaw},
    method::{OdeSolution, OdeSolverMethod, OdeSolverStopReason, SolveStatus, Statistics},
    problem::{OdeSolverProblem, OdeSolverSolution, OdeSolverSolutionPoint},
    sdirk::Sdirk,
    state::RkState,
    tableau::Tableau,
};
pub use op::{NonLinearOp, NonLinearOpJacobian, Op, OpStatistics};
pub use scalar::{IndexType, Scalar};
pub use vector::VectorNorm;
