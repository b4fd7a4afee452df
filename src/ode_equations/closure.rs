use std::cell::RefCell;

use nalgebra::{DMatrix, DVector};

use crate::jacobian::{finite_difference_jacobian_inplace, jacobian_from_action_inplace};
use crate::ode_equations::{OdeEquations, OdeEquationsImplicit};
use crate::op::OpStatistics;
use crate::scalar::Scalar;

/// ODE equations from a rhs closure and a Jacobian-action closure.
///
/// The rhs has signature `(x, p, t, y)` and the Jacobian action
/// `(x, p, t, v, y)` computing `y = (df/dx) v`; the dense Jacobian is
/// assembled by applying the action to the unit basis vectors.
pub struct Closure<T, F, G, I>
where
    T: Scalar,
    F: Fn(&DVector<T>, &DVector<T>, T, &mut DVector<T>),
    G: Fn(&DVector<T>, &DVector<T>, T, &DVector<T>, &mut DVector<T>),
    I: Fn(&DVector<T>, T, &mut DVector<T>),
{
    rhs: F,
    jacobian_action: G,
    init: I,
    nstates: usize,
    p: DVector<T>,
    statistics: RefCell<OpStatistics>,
}

impl<T, F, G, I> Closure<T, F, G, I>
where
    T: Scalar,
    F: Fn(&DVector<T>, &DVector<T>, T, &mut DVector<T>),
    G: Fn(&DVector<T>, &DVector<T>, T, &DVector<T>, &mut DVector<T>),
    I: Fn(&DVector<T>, T, &mut DVector<T>),
{
    pub fn new(rhs: F, jacobian_action: G, init: I, nstates: usize, p: DVector<T>) -> Self {
        Self {
            rhs,
            jacobian_action,
            init,
            nstates,
            p,
            statistics: RefCell::new(OpStatistics::default()),
        }
    }
}

impl<T, F, G, I> OdeEquations for Closure<T, F, G, I>
where
    T: Scalar,
    F: Fn(&DVector<T>, &DVector<T>, T, &mut DVector<T>),
    G: Fn(&DVector<T>, &DVector<T>, T, &DVector<T>, &mut DVector<T>),
    I: Fn(&DVector<T>, T, &mut DVector<T>),
{
    type T = T;

    fn nstates(&self) -> usize {
        self.nstates
    }

    fn rhs_inplace(&self, x: &DVector<T>, t: T, y: &mut DVector<T>) {
        self.statistics.borrow_mut().increment_call();
        (self.rhs)(x, &self.p, t, y);
    }

    fn init_inplace(&self, t: T, y: &mut DVector<T>) {
        (self.init)(&self.p, t, y);
    }

    fn statistics(&self) -> OpStatistics {
        self.statistics.borrow().clone()
    }
}

impl<T, F, G, I> OdeEquationsImplicit for Closure<T, F, G, I>
where
    T: Scalar,
    F: Fn(&DVector<T>, &DVector<T>, T, &mut DVector<T>),
    G: Fn(&DVector<T>, &DVector<T>, T, &DVector<T>, &mut DVector<T>),
    I: Fn(&DVector<T>, T, &mut DVector<T>),
{
    fn jacobian_inplace(&self, x: &DVector<T>, t: T, jac: &mut DMatrix<T>) {
        let action = |v: &DVector<T>, y: &mut DVector<T>| {
            self.statistics.borrow_mut().increment_jac_mul();
            (self.jacobian_action)(x, &self.p, t, v, y);
        };
        jacobian_from_action_inplace(action, self.nstates, jac);
        self.statistics.borrow_mut().increment_matrix();
    }
}

/// ODE equations from a rhs closure only; the Jacobian is approximated by
/// finite differences.
pub struct ClosureNoJac<T, F, I>
where
    T: Scalar,
    F: Fn(&DVector<T>, &DVector<T>, T, &mut DVector<T>),
    I: Fn(&DVector<T>, T, &mut DVector<T>),
{
    rhs: F,
    init: I,
    nstates: usize,
    p: DVector<T>,
    statistics: RefCell<OpStatistics>,
}

impl<T, F, I> ClosureNoJac<T, F, I>
where
    T: Scalar,
    F: Fn(&DVector<T>, &DVector<T>, T, &mut DVector<T>),
    I: Fn(&DVector<T>, T, &mut DVector<T>),
{
    pub fn new(rhs: F, init: I, nstates: usize, p: DVector<T>) -> Self {
        Self {
            rhs,
            init,
            nstates,
            p,
            statistics: RefCell::new(OpStatistics::default()),
        }
    }
}

impl<T, F, I> OdeEquations for ClosureNoJac<T, F, I>
where
    T: Scalar,
    F: Fn(&DVector<T>, &DVector<T>, T, &mut DVector<T>),
    I: Fn(&DVector<T>, T, &mut DVector<T>),
{
    type T = T;

    fn nstates(&self) -> usize {
        self.nstates
    }

    fn rhs_inplace(&self, x: &DVector<T>, t: T, y: &mut DVector<T>) {
        self.statistics.borrow_mut().increment_call();
        (self.rhs)(x, &self.p, t, y);
    }

    fn init_inplace(&self, t: T, y: &mut DVector<T>) {
        (self.init)(&self.p, t, y);
    }

    fn statistics(&self) -> OpStatistics {
        self.statistics.borrow().clone()
    }
}

impl<T, F, I> OdeEquationsImplicit for ClosureNoJac<T, F, I>
where
    T: Scalar,
    F: Fn(&DVector<T>, &DVector<T>, T, &mut DVector<T>),
    I: Fn(&DVector<T>, T, &mut DVector<T>),
{
    fn jacobian_inplace(&self, x: &DVector<T>, t: T, jac: &mut DMatrix<T>) {
        finite_difference_jacobian_inplace(|x, y| self.rhs_inplace(x, t, y), x, jac);
        self.statistics.borrow_mut().increment_matrix();
    }
}
