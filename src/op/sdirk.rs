use std::cell::{Ref, RefCell};

use nalgebra::storage::Storage;
use nalgebra::{DMatrix, DVector, Dyn, Matrix};
use num_traits::{One, Zero};

use crate::ode_equations::OdeEquationsImplicit;
use crate::op::{NonLinearOp, NonLinearOpJacobian, Op};

// callable to solve for F(x) = x - h * f(t, phi + c * x) = 0, where x is the
// scaled stage increment h * k_i and phi collects the previous stages
pub struct SdirkCallable<'a, Eqn: OdeEquationsImplicit> {
    eqn: &'a Eqn,
    c: Eqn::T,
    h: RefCell<Eqn::T>,
    phi: RefCell<DVector<Eqn::T>>,
    tmp: RefCell<DVector<Eqn::T>>,
    rhs_jac: RefCell<DMatrix<Eqn::T>>,
    jacobian_is_stale: RefCell<bool>,
    number_of_jac_evals: RefCell<usize>,
}

impl<'a, Eqn: OdeEquationsImplicit> SdirkCallable<'a, Eqn> {
    pub fn new(eqn: &'a Eqn, c: Eqn::T) -> Self {
        let n = eqn.nstates();
        Self {
            eqn,
            c,
            h: RefCell::new(Eqn::T::zero()),
            phi: RefCell::new(DVector::zeros(n)),
            tmp: RefCell::new(DVector::zeros(n)),
            rhs_jac: RefCell::new(DMatrix::zeros(n, n)),
            jacobian_is_stale: RefCell::new(true),
            number_of_jac_evals: RefCell::new(0),
        }
    }

    pub fn set_h(&self, h: Eqn::T) {
        self.h.replace(h);
    }

    pub fn number_of_jac_evals(&self) -> usize {
        *self.number_of_jac_evals.borrow()
    }

    /// The last stage state `phi + c * x` evaluated by [Self::call_inplace].
    /// For a stiffly accurate tableau the last stage is the step solution.
    pub fn get_last_stage_state(&self) -> Ref<'_, DVector<Eqn::T>> {
        self.tmp.borrow()
    }

    pub fn set_jacobian_is_stale(&self) {
        self.jacobian_is_stale.replace(true);
    }

    pub fn set_phi<S: Storage<Eqn::T, Dyn, Dyn>>(
        &self,
        diff: &Matrix<Eqn::T, Dyn, Dyn, S>,
        y0: &DVector<Eqn::T>,
        a_row: &DVector<Eqn::T>,
    ) {
        let mut phi = self.phi.borrow_mut();
        phi.copy_from(y0);
        phi.gemv(Eqn::T::one(), diff, a_row, Eqn::T::one());
    }

    pub fn set_phi_direct(&self, phi: &DVector<Eqn::T>) {
        let mut phi_ref = self.phi.borrow_mut();
        phi_ref.copy_from(phi);
    }

    // tmp = phi + c * x
    fn set_tmp(&self, x: &DVector<Eqn::T>) {
        let phi = self.phi.borrow();
        let mut tmp = self.tmp.borrow_mut();
        tmp.copy_from(&phi);
        tmp.axpy(self.c, x, Eqn::T::one());
    }
}

impl<Eqn: OdeEquationsImplicit> Op for SdirkCallable<'_, Eqn> {
    type T = Eqn::T;
    fn nstates(&self) -> usize {
        self.eqn.nstates()
    }
}

impl<Eqn: OdeEquationsImplicit> NonLinearOp for SdirkCallable<'_, Eqn> {
    // F(x) = x - h * f(t, phi + c * x)
    fn call_inplace(&self, x: &DVector<Eqn::T>, t: Eqn::T, y: &mut DVector<Eqn::T>) {
        self.set_tmp(x);
        let tmp = self.tmp.borrow();
        self.eqn.rhs_inplace(&tmp, t, y);

        // y = x - h * y
        let h = *self.h.borrow();
        y.axpy(Eqn::T::one(), x, -h);
    }
}

impl<Eqn: OdeEquationsImplicit> NonLinearOpJacobian for SdirkCallable<'_, Eqn> {
    // I - c * h * f'(phi + c * x)
    fn jacobian_inplace(&self, x: &DVector<Eqn::T>, t: Eqn::T, jac: &mut DMatrix<Eqn::T>) {
        let c = self.c;
        let h = *self.h.borrow();
        if *self.jacobian_is_stale.borrow() {
            let mut rhs_jac = self.rhs_jac.borrow_mut();
            self.set_tmp(x);
            let tmp = self.tmp.borrow();
            self.eqn.jacobian_inplace(&tmp, t, &mut rhs_jac);
            self.jacobian_is_stale.replace(false);
        }
        // only h changes between refreshes, so the scaled sum is redone here
        let rhs_jac = self.rhs_jac.borrow();
        jac.copy_from(&rhs_jac);
        *jac *= -(c * h);
        for i in 0..jac.nrows() {
            jac[(i, i)] += Eqn::T::one();
        }
        let number_of_jac_evals = *self.number_of_jac_evals.borrow() + 1;
        self.number_of_jac_evals.replace(number_of_jac_evals);
    }
}
