use nalgebra::{ComplexField, DMatrix, DVector};
use num_traits::{One, Zero};

use crate::scalar::Scalar;

/// Approximate the Jacobian `df/dx` by forward differences, one column per
/// state, with increment `sqrt(eps) * max(|x_j|, 1)`.
pub fn finite_difference_jacobian_inplace<T: Scalar>(
    mut rhs: impl FnMut(&DVector<T>, &mut DVector<T>),
    x: &DVector<T>,
    jac: &mut DMatrix<T>,
) {
    let n = x.len();
    assert_eq!(jac.nrows(), n, "jacobian has wrong number of rows");
    assert_eq!(jac.ncols(), n, "jacobian has wrong number of columns");
    let mut f0 = DVector::zeros(n);
    let mut f1 = DVector::zeros(n);
    let mut xp = x.clone();
    rhs(x, &mut f0);
    let sqrt_eps = T::EPSILON.sqrt();
    for j in 0..n {
        let xj = x[j];
        let absx = num_traits::abs(xj);
        let delta = sqrt_eps * if absx > T::one() { absx } else { T::one() };
        xp[j] = xj + delta;
        rhs(&xp, &mut f1);
        for i in 0..n {
            jac[(i, j)] = (f1[i] - f0[i]) / delta;
        }
        xp[j] = xj;
    }
}

/// Assemble a dense Jacobian from its action on the unit basis vectors.
pub fn jacobian_from_action_inplace<T: Scalar>(
    mut action: impl FnMut(&DVector<T>, &mut DVector<T>),
    n: usize,
    jac: &mut DMatrix<T>,
) {
    assert_eq!(jac.nrows(), n, "jacobian has wrong number of rows");
    assert_eq!(jac.ncols(), n, "jacobian has wrong number of columns");
    let mut v = DVector::zeros(n);
    let mut col = DVector::zeros(n);
    for j in 0..n {
        v[j] = T::one();
        action(&v, &mut col);
        jac.column_mut(j).copy_from(&col);
        v[j] = T::zero();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rhs(x: &DVector<f64>, y: &mut DVector<f64>) {
        y[0] = x[0] * x[0];
        y[1] = x[0] * x[1];
    }

    #[test]
    fn test_finite_difference_jacobian() {
        let x = DVector::from_vec(vec![2.0, 3.0]);
        let mut jac = DMatrix::zeros(2, 2);
        finite_difference_jacobian_inplace(rhs, &x, &mut jac);
        // J = [[2 x0, 0], [x1, x0]]
        assert!((jac[(0, 0)] - 4.0).abs() < 1e-6);
        assert!(jac[(0, 1)].abs() < 1e-6);
        assert!((jac[(1, 0)] - 3.0).abs() < 1e-6);
        assert!((jac[(1, 1)] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_jacobian_from_action() {
        let x = DVector::from_vec(vec![2.0, 3.0]);
        let action = |v: &DVector<f64>, y: &mut DVector<f64>| {
            y[0] = 2.0 * x[0] * v[0];
            y[1] = x[1] * v[0] + x[0] * v[1];
        };
        let mut jac = DMatrix::zeros(2, 2);
        jacobian_from_action_inplace(action, 2, &mut jac);
        assert_eq!(jac[(0, 0)], 4.0);
        assert_eq!(jac[(0, 1)], 0.0);
        assert_eq!(jac[(1, 0)], 3.0);
        assert_eq!(jac[(1, 1)], 2.0);
    }
}
