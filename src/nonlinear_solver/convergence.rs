use nalgebra::{ComplexField, DVector};
use num_traits::{FromPrimitive, One, Pow};

use crate::scalar::{IndexType, Scalar};
use crate::vector::VectorNorm;

/// Convergence test for the Newton iteration.
///
/// The iteration is converged once the extrapolated remaining error in the
/// update falls below a fixed fraction of the step tolerance, and declared
/// diverged if the contraction rate is too close to one or the iteration
/// cannot reach the tolerance within its budget.
#[derive(Clone)]
pub struct Convergence<'a, T: Scalar> {
    pub rtol: T,
    pub atol: &'a DVector<T>,
    tol: T,
    max_iter: IndexType,
    niter: IndexType,
    old_norm: Option<T>,
}

pub enum ConvergenceStatus {
    Converged,
    Diverged,
    Continue,
    MaximumIterations,
}

impl<'a, T: Scalar> Convergence<'a, T> {
    pub fn new(rtol: T, atol: &'a DVector<T>) -> Self {
        let tol = T::from_f64(0.33).unwrap();
        Self {
            rtol,
            atol,
            tol,
            max_iter: 10,
            niter: 0,
            old_norm: None,
        }
    }

    pub fn max_iter(&self) -> IndexType {
        self.max_iter
    }

    pub fn set_max_iter(&mut self, value: IndexType) {
        self.max_iter = value;
    }

    pub fn niter(&self) -> IndexType {
        self.niter
    }

    pub fn reset(&mut self) {
        self.niter = 0;
        self.old_norm = None;
    }

    pub fn check_new_iteration(&mut self, dy: &DVector<T>, y: &DVector<T>) -> ConvergenceStatus {
        let norm = dy.squared_norm(y, self.atol, self.rtol).sqrt();
        self.niter += 1;
        if Scalar::is_nan(norm) {
            return ConvergenceStatus::Diverged;
        }
        // a norm at round-off level is as converged as it gets
        if norm <= T::EPSILON {
            return ConvergenceStatus::Converged;
        }
        if let Some(old_norm) = self.old_norm {
            // average contraction rate over the iterations so far
            let rate =
                (norm / old_norm).pow(T::one() / T::from_usize(self.niter - 1).unwrap());

            if rate > T::from_f64(0.9).unwrap() {
                return ConvergenceStatus::Diverged;
            }

            // if the iteration is not going to converge in max_iter
            // (assuming the current rate), then abort
            if self.niter < self.max_iter {
                let remaining = i32::try_from(self.max_iter - self.niter).unwrap();
                if rate.pow(remaining) / (T::one() - rate) * norm > self.tol {
                    return ConvergenceStatus::Diverged;
                }
            }

            let eta = rate / (T::one() - rate);
            if eta * norm < self.tol {
                return ConvergenceStatus::Converged;
            }
        } else {
            self.old_norm = Some(norm);
            let eta = T::from_f64(20.0).unwrap();
            if eta * norm < self.tol {
                return ConvergenceStatus::Converged;
            }
        }
        if self.niter >= self.max_iter {
            return ConvergenceStatus::MaximumIterations;
        }
        ConvergenceStatus::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converges_on_shrinking_updates() {
        let atol = DVector::from_vec(vec![1e-6, 1e-6]);
        let mut convergence = Convergence::new(1e-6, &atol);
        let y = DVector::from_vec(vec![1.0, 1.0]);
        let mut dy = DVector::from_vec(vec![1e-2, 1e-2]);
        let mut converged = false;
        for _ in 0..10 {
            match convergence.check_new_iteration(&dy, &y) {
                ConvergenceStatus::Converged => {
                    converged = true;
                    break;
                }
                ConvergenceStatus::Continue => {}
                _ => panic!("unexpected status"),
            }
            dy *= 1e-3;
        }
        assert!(converged);
    }

    #[test]
    fn test_diverges_on_growing_updates() {
        let atol = DVector::from_vec(vec![1e-6, 1e-6]);
        let mut convergence = Convergence::new(1e-6, &atol);
        let y = DVector::from_vec(vec![1.0, 1.0]);
        let mut dy = DVector::from_vec(vec![1e-2, 1e-2]);
        let mut diverged = false;
        for _ in 0..10 {
            match convergence.check_new_iteration(&dy, &y) {
                ConvergenceStatus::Diverged => {
                    diverged = true;
                    break;
                }
                ConvergenceStatus::Continue => {}
                _ => panic!("unexpected status"),
            }
            dy *= 10.0;
        }
        assert!(diverged);
    }

    #[test]
    fn test_nan_update_diverges() {
        let atol = DVector::from_vec(vec![1e-6]);
        let mut convergence = Convergence::new(1e-6, &atol);
        let y = DVector::from_vec(vec![1.0]);
        let dy = DVector::from_vec(vec![f64::NAN]);
        assert!(matches!(
            convergence.check_new_iteration(&dy, &y),
            ConvergenceStatus::Diverged
        ));
    }
}
