use nalgebra::DVector;
use num_traits::Zero;

use crate::scalar::Scalar;

/// Weighted norms over state vectors, shared by the Newton convergence test
/// and the embedded error estimate.
pub trait VectorNorm<T: Scalar> {
    /// Mean of `(self[i] / (atol[i] + rtol * |y[i]|))^2`.
    fn squared_norm(&self, y: &Self, atol: &Self, rtol: T) -> T;

    /// As [Self::squared_norm], but scaled against the componentwise
    /// larger of two states, so an error estimate straddling a step is
    /// measured against both endpoints.
    fn squared_error_norm(&self, y0: &Self, y1: &Self, atol: &Self, rtol: T) -> T;

    fn all_finite(&self) -> bool;
}

impl<T: Scalar> VectorNorm<T> for DVector<T> {
    fn squared_norm(&self, y: &Self, atol: &Self, rtol: T) -> T {
        assert!(
            self.len() == y.len() && self.len() == atol.len(),
            "vector lengths do not match"
        );
        let mut acc = T::zero();
        for i in 0..self.len() {
            let scale = atol[i] + rtol * num_traits::abs(y[i]);
            let e = self[i] / scale;
            acc += e * e;
        }
        acc / T::from_usize(self.len()).unwrap()
    }

    fn squared_error_norm(&self, y0: &Self, y1: &Self, atol: &Self, rtol: T) -> T {
        assert!(
            self.len() == y0.len() && self.len() == y1.len() && self.len() == atol.len(),
            "vector lengths do not match"
        );
        let mut acc = T::zero();
        for i in 0..self.len() {
            let y0i = num_traits::abs(y0[i]);
            let y1i = num_traits::abs(y1[i]);
            let ymax = if y0i > y1i { y0i } else { y1i };
            let scale = atol[i] + rtol * ymax;
            let e = self[i] / scale;
            acc += e * e;
        }
        acc / T::from_usize(self.len()).unwrap()
    }

    fn all_finite(&self) -> bool {
        self.iter().all(|&x| Scalar::is_finite(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squared_norm() {
        let v = DVector::from_vec(vec![1.0, -1.0]);
        let y = DVector::from_vec(vec![1.0, 1.0]);
        let atol = DVector::from_vec(vec![0.1, 0.1]);
        // scale = 0.1 + 1.0 * 1.0 = 1.1, norm = (1/1.1)^2
        let expect = (1.0f64 / 1.1).powi(2);
        assert!((v.squared_norm(&y, &atol, 1.0) - expect).abs() < 1e-14);
    }

    #[test]
    fn test_squared_error_norm_uses_larger_state() {
        let e = DVector::from_vec(vec![1.0]);
        let y0 = DVector::from_vec(vec![1.0]);
        let y1 = DVector::from_vec(vec![-3.0]);
        let atol = DVector::from_vec(vec![0.0]);
        // scale = 1.0 * max(1, 3) = 3
        let expect = (1.0f64 / 3.0).powi(2);
        assert!((e.squared_error_norm(&y0, &y1, &atol, 1.0) - expect).abs() < 1e-14);
    }

    #[test]
    fn test_all_finite() {
        let v = DVector::from_vec(vec![1.0, 2.0]);
        assert!(v.all_finite());
        let v = DVector::from_vec(vec![1.0, f64::NAN]);
        assert!(!v.all_finite());
        let v = DVector::from_vec(vec![f64::INFINITY, 2.0]);
        assert!(!v.all_finite());
    }
}
