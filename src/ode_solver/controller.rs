use num_traits::{FromPrimitive, One, Pow};

use crate::scalar::{IndexType, Scalar};

/// Closed set of step-size control laws.
///
/// The gains are exponents applied to the inverse of the last one, two or
/// three normalized error norms; they only affect efficiency, not which
/// steps are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepSizeLaw {
    /// Pure proportional response to the current error norm.
    I,
    /// Proportional-integral response, Gustafsson-style gains.
    Pi,
    /// Full proportional-integral-derivative response.
    #[default]
    Pid,
}

impl StepSizeLaw {
    fn gains(&self) -> (f64, f64, f64) {
        match self {
            StepSizeLaw::I => (1.0, 0.0, 0.0),
            StepSizeLaw::Pi => (0.7, 0.4, 0.0),
            StepSizeLaw::Pid => (0.49, 0.34, 0.10),
        }
    }
}

/// A PID step-size controller over the sequence of normalized error norms.
///
/// For an accepted step the next step factor is
///
/// ```text
/// factor = safety * e_n^(-beta1) * e_{n-1}^(-beta2) * e_{n-2}^(-beta3)
/// ```
///
/// clipped to `[min_factor, max_factor]`, where the gains are scaled by the
/// order of the embedded error estimate. Terms without history are skipped,
/// so the very first step sees a pure proportional response. A rejected step
/// uses the current error norm only and always shrinks.
#[derive(Clone)]
pub struct PidController<T: Scalar> {
    beta1: T,
    beta2: T,
    beta3: T,
    prev_error_norm: Option<T>,
    prev_prev_error_norm: Option<T>,
}

impl<T: Scalar> PidController<T> {
    /// `error_order` is the order of the embedded error estimate, i.e. the
    /// error norm behaves as `h^error_order`.
    pub fn new(law: StepSizeLaw, error_order: usize) -> Self {
        let (b1, b2, b3) = law.gains();
        let k = error_order as f64;
        Self {
            beta1: T::from_f64(b1 / k).unwrap(),
            beta2: T::from_f64(b2 / k).unwrap(),
            beta3: T::from_f64(b3 / k).unwrap(),
            prev_error_norm: None,
            prev_prev_error_norm: None,
        }
    }

    // safety factor biased by how hard the last nonlinear solve worked
    fn safety(niter: IndexType, max_iter: IndexType) -> T {
        let m = max_iter as f64;
        let n = niter as f64;
        T::from_f64(0.9 * (2.0 * m + 1.0) / (2.0 * m + n)).unwrap()
    }

    /// Decide whether a step with the given error norm is accepted and
    /// propose the factor to apply to the step size.
    ///
    /// On rejection the factor is strictly less than one.
    pub fn propose(
        &self,
        error_norm: T,
        niter: IndexType,
        max_iter: IndexType,
        min_factor: T,
        max_factor: T,
    ) -> (bool, T) {
        let accept = error_norm <= T::one();
        let safety = Self::safety(niter, max_iter);
        let mut factor = safety * error_norm.pow(-self.beta1);
        if accept {
            if let Some(e1) = self.prev_error_norm {
                factor *= e1.pow(-self.beta2);
            }
            if let Some(e2) = self.prev_prev_error_norm {
                factor *= e2.pow(-self.beta3);
            }
        }
        if factor < min_factor {
            factor = min_factor;
        }
        if factor > max_factor {
            factor = max_factor;
        }
        if !accept && factor >= T::one() {
            factor = safety;
        }
        (accept, factor)
    }

    /// Record the error norm of an accepted step; rejected attempts do not
    /// enter the history.
    pub fn step_accepted(&mut self, error_norm: T) {
        self.prev_prev_error_norm = self.prev_error_norm;
        self.prev_error_norm = Some(error_norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_iff_error_norm_at_most_one() {
        let controller = PidController::<f64>::new(StepSizeLaw::Pid, 5);
        let (accept, _) = controller.propose(0.5, 3, 10, 0.2, 10.0);
        assert!(accept);
        let (accept, _) = controller.propose(1.0, 3, 10, 0.2, 10.0);
        assert!(accept);
        let (accept, _) = controller.propose(1.5, 3, 10, 0.2, 10.0);
        assert!(!accept);
    }

    #[test]
    fn test_rejection_always_shrinks() {
        let mut controller = PidController::<f64>::new(StepSizeLaw::Pid, 5);
        // a history of tiny errors pushes the factor up, but a rejected step
        // must still shrink
        controller.step_accepted(1e-8);
        controller.step_accepted(1e-8);
        for error_norm in [1.0 + 1e-10, 2.0, 1e3, f64::INFINITY] {
            let (accept, factor) = controller.propose(error_norm, 3, 10, 0.2, 10.0);
            assert!(!accept);
            assert!(factor < 1.0, "factor = {factor} for error {error_norm}");
            assert!(factor >= 0.2);
        }
    }

    #[test]
    fn test_growth_is_clamped() {
        let controller = PidController::<f64>::new(StepSizeLaw::I, 5);
        let (accept, factor) = controller.propose(1e-16, 1, 10, 0.2, 10.0);
        assert!(accept);
        assert_eq!(factor, 10.0);
        let (accept, factor) = controller.propose(0.0, 1, 10, 0.2, 10.0);
        assert!(accept);
        assert_eq!(factor, 10.0);
    }

    #[test]
    fn test_first_step_is_pure_proportional() {
        let fresh = PidController::<f64>::new(StepSizeLaw::Pid, 5);
        let mut seasoned = PidController::<f64>::new(StepSizeLaw::Pid, 5);
        seasoned.step_accepted(0.5);
        seasoned.step_accepted(0.5);
        let (_, f_fresh) = fresh.propose(0.5, 3, 10, 0.2, 10.0);
        let (_, f_seasoned) = seasoned.propose(0.5, 3, 10, 0.2, 10.0);
        // the history terms contribute extra growth for errors below one
        assert!(f_seasoned > f_fresh);
    }

    #[test]
    fn test_history_only_advances_on_acceptance() {
        let mut controller = PidController::<f64>::new(StepSizeLaw::Pi, 3);
        controller.step_accepted(0.5);
        let (_, f1) = controller.propose(0.5, 3, 10, 0.2, 10.0);
        // a rejected attempt leaves the proposal unchanged
        let (accept, _) = controller.propose(2.0, 3, 10, 0.2, 10.0);
        assert!(!accept);
        let (_, f2) = controller.propose(0.5, 3, 10, 0.2, 10.0);
        assert_eq!(f1, f2);
    }
}
