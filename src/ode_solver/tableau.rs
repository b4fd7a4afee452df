use nalgebra::{ComplexField, DMatrix, DVector};
use num_traits::{FromPrimitive, One, Zero};

use crate::error::StiffsolError;
use crate::ode_solver_error;
use crate::scalar::Scalar;

/// A butcher tableau for an embedded Runge-Kutta method.
///
/// The tableau is defined by the matrix `a`, the vectors `b`, `c` and `d` and
/// the orders of the method. It is often depicted like this example of a
/// 3-stage method:
///
/// ```text
/// c1 | a11 0   0
/// c2 | a21 a22 0
/// c3 | a31 a32 a33
/// -------------------
///    | b1  b2  b3
///    | be1 be2 be3
/// -------------------
///    | d1  d2  d3
/// ```
///
/// where `be` are the weights of the embedded method used for error control
/// and `d = b - be` is the difference between the main and embedded weights.
///
/// For continuous extension methods, the `beta` matrix is also included.
#[derive(Clone)]
pub struct Tableau<T: Scalar> {
    a: DMatrix<T>,
    b: DVector<T>,
    c: DVector<T>,
    d: DVector<T>,
    order: usize,
    embedded_order: usize,
    beta: Option<DMatrix<T>>,
}

impl<T: Scalar> Tableau<T> {
    /// TR-BDF2 method
    /// from R.E. Bank, W.M. Coughran Jr, W. Fichtner, E.H. Grosse, D.J. Rose and R.K. Smith, Transient simulation of silicon devices and circuits, IEEE Trans. Comput.-Aided Design 4 (1985) 436-451.
    /// analysed in M.E. Hosea and L.F. Shampine. Analysis and implementation of TR-BDF2. Applied Numerical Mathematics, 20:21–37, 1996.
    ///
    /// continuous extension from:
    /// Jørgensen, J. B., Kristensen, M. R., & Thomsen, P. G. (2018). A family of ESDIRK integration methods. arXiv preprint arXiv:1803.01613.
    pub fn tr_bdf2() -> Result<Self, StiffsolError> {
        let gamma = T::from_f64(2.0 - 2.0_f64.sqrt()).unwrap();
        let d = gamma / T::from_f64(2.0).unwrap();
        let w = T::from_f64(2.0_f64.sqrt() / 4.0).unwrap();

        let a = DMatrix::from_vec(
            3,
            3,
            vec![
                T::zero(),
                d,
                w,
                T::zero(),
                d,
                w,
                T::zero(),
                T::zero(),
                d,
            ],
        );

        let b = DVector::from_vec(vec![w, w, d]);
        let b_hat = DVector::from_vec(vec![
            (T::one() - w) / T::from_f64(3.0).unwrap(),
            (T::from_f64(3.0).unwrap() * w + T::one()) / T::from_f64(3.0).unwrap(),
            d / T::from_f64(3.0).unwrap(),
        ]);
        let mut dv = DVector::zeros(3);
        for i in 0..3 {
            dv[i] = b[i] - b_hat[i];
        }

        let beta = DMatrix::from_vec(
            3,
            2,
            vec![
                T::from_f64(2.0).unwrap() * w,
                T::from_f64(2.0).unwrap() * w,
                gamma - T::one(),
                -w,
                -w,
                T::from_f64(2.0).unwrap() * w,
            ],
        );

        let c = DVector::from_vec(vec![T::zero(), gamma, T::one()]);

        Self::new(a, b, c, dv, 2, 3, Some(beta))
    }

    /// A third order ESDIRK method with a second order embedded method
    /// from Jørgensen, J. B., Kristensen, M. R., & Thomsen, P. G. (2018). A family of ESDIRK integration methods. arXiv preprint arXiv:1803.01613.
    pub fn esdirk34() -> Result<Self, StiffsolError> {
        let gamma = T::from_f64(0.435_866_521_508_459).unwrap();
        let a = DMatrix::from_vec(
            4,
            4,
            vec![
                T::zero(),
                gamma,
                T::from_f64(0.140_737_774_724_706_2).unwrap(),
                T::from_f64(0.102_399_400_619_911).unwrap(),
                T::zero(),
                gamma,
                T::from_f64(-0.108_365_551_381_320_8).unwrap(),
                T::from_f64(-0.376_878_452_255_556_1).unwrap(),
                T::zero(),
                T::zero(),
                gamma,
                T::from_f64(0.838_612_530_127_186_1).unwrap(),
                T::zero(),
                T::zero(),
                T::zero(),
                gamma,
            ],
        );

        let b = DVector::from_vec(vec![a[(3, 0)], a[(3, 1)], a[(3, 2)], a[(3, 3)]]);

        let c = DVector::from_vec(vec![
            T::zero(),
            T::from_f64(0.871_733_043_016_918).unwrap(),
            T::from_f64(0.468_238_744_851_844_4).unwrap(),
            T::one(),
        ]);

        let d = DVector::from_vec(vec![
            T::from_f64(-0.054_625_497_240_413_94).unwrap(),
            T::from_f64(-0.494_208_893_625_994_96).unwrap(),
            T::from_f64(0.221_934_499_735_064_66).unwrap(),
            T::from_f64(0.326_899_891_131_344_27).unwrap(),
        ]);

        Self::new(a, b, c, d, 3, 2, None)
    }

    /// A fifth order, stiffly accurate, L-stable ESDIRK method with a fourth
    /// order embedded method
    /// from Kvaerno, A. (2004). Singly diagonally implicit Runge-Kutta methods with an explicit first stage. BIT Numerical Mathematics, 44(3), 489-502.
    pub fn kvaerno5() -> Result<Self, StiffsolError> {
        let gamma = T::from_f64(0.26).unwrap();
        let mut a = DMatrix::zeros(7, 7);

        a[(1, 0)] = gamma;
        a[(1, 1)] = gamma;

        a[(2, 0)] = T::from_f64(0.13).unwrap();
        a[(2, 1)] = T::from_f64(0.840_333_209_967_908_09).unwrap();
        a[(2, 2)] = gamma;

        a[(3, 0)] = T::from_f64(0.223_719_614_783_205_05).unwrap();
        a[(3, 1)] = T::from_f64(0.476_755_323_197_996_99).unwrap();
        a[(3, 2)] = T::from_f64(-0.064_708_953_631_126_15).unwrap();
        a[(3, 3)] = gamma;

        a[(4, 0)] = T::from_f64(0.166_485_643_232_483_21).unwrap();
        a[(4, 1)] = T::from_f64(0.104_500_188_415_917_2).unwrap();
        a[(4, 2)] = T::from_f64(0.036_314_822_720_987_15).unwrap();
        a[(4, 3)] = T::from_f64(-0.130_907_044_510_739_98).unwrap();
        a[(4, 4)] = gamma;

        a[(5, 0)] = T::from_f64(0.138_556_402_312_682_24).unwrap();
        a[(5, 2)] = T::from_f64(-0.042_453_372_017_520_43).unwrap();
        a[(5, 3)] = T::from_f64(0.024_466_578_980_031_41).unwrap();
        a[(5, 4)] = T::from_f64(0.619_430_390_724_806_76).unwrap();
        a[(5, 5)] = gamma;

        a[(6, 0)] = T::from_f64(0.136_597_511_776_402_91).unwrap();
        a[(6, 2)] = T::from_f64(-0.054_969_087_965_383_76).unwrap();
        a[(6, 3)] = T::from_f64(-0.041_186_267_283_210_46).unwrap();
        a[(6, 4)] = T::from_f64(0.629_933_048_990_164_03).unwrap();
        a[(6, 5)] = T::from_f64(0.069_624_794_482_027_28).unwrap();
        a[(6, 6)] = gamma;

        let s = 7;
        let mut b = DVector::zeros(s);
        for i in 0..s {
            b[i] = a[(s - 1, i)];
        }

        // the embedded fourth order solution is the sixth stage
        let mut b_hat = DVector::zeros(s);
        for i in 0..s {
            b_hat[i] = a[(s - 2, i)];
        }

        let mut d = DVector::zeros(s);
        for i in 0..s {
            d[i] = b[i] - b_hat[i];
        }

        let c = DVector::from_vec(vec![
            T::zero(),
            T::from_f64(0.52).unwrap(),
            T::from_f64(1.230_333_209_967_908).unwrap(),
            T::from_f64(0.895_765_984_350_075_9).unwrap(),
            T::from_f64(0.436_393_609_858_647_56).unwrap(),
            T::one(),
            T::one(),
        ]);

        Self::new(a, b, c, d, 5, 4, None)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        a: DMatrix<T>,
        b: DVector<T>,
        c: DVector<T>,
        d: DVector<T>,
        order: usize,
        embedded_order: usize,
        beta: Option<DMatrix<T>>,
    ) -> Result<Self, StiffsolError> {
        let s = c.len();
        if a.nrows() != s || a.ncols() != s {
            return Err(ode_solver_error!(
                InvalidTableau,
                format!("expected a to be {s}x{s}")
            ));
        }
        if b.len() != s {
            return Err(ode_solver_error!(
                InvalidTableau,
                format!("expected b to have {s} elements")
            ));
        }
        if d.len() != s {
            return Err(ode_solver_error!(
                InvalidTableau,
                format!("expected d to have {s} elements")
            ));
        }
        if let Some(beta) = &beta {
            if beta.nrows() != s {
                return Err(ode_solver_error!(
                    InvalidTableau,
                    format!("expected beta to have {s} rows")
                ));
            }
        }

        let tol = T::EPSILON.sqrt();

        // consistency: the row sums of a must equal c
        for i in 0..s {
            let mut row_sum = T::zero();
            for j in 0..s {
                row_sum += a[(i, j)];
            }
            if num_traits::abs(row_sum - c[i]) > tol * (T::one() + num_traits::abs(c[i])) {
                return Err(ode_solver_error!(
                    InvalidTableau,
                    format!("row {i} of a sums to {row_sum}, expected c({i}) = {}", c[i])
                ));
            }
        }

        // the weights of the main method must sum to one
        let mut b_sum = T::zero();
        for i in 0..s {
            b_sum += b[i];
        }
        if num_traits::abs(b_sum - T::one()) > tol {
            return Err(ode_solver_error!(
                InvalidTableau,
                format!("b sums to {b_sum}, expected 1")
            ));
        }

        // both sets of weights sum to one, so their difference sums to zero
        let mut d_sum = T::zero();
        for i in 0..s {
            d_sum += d[i];
        }
        if num_traits::abs(d_sum) > tol {
            return Err(ode_solver_error!(
                InvalidTableau,
                format!("d sums to {d_sum}, expected 0")
            ));
        }

        Ok(Self {
            a,
            b,
            c,
            d,
            order,
            embedded_order,
            beta,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn embedded_order(&self) -> usize {
        self.embedded_order
    }

    /// Order of the embedded error estimate, `min(order, embedded_order) + 1`.
    pub fn error_order(&self) -> usize {
        self.order.min(self.embedded_order) + 1
    }

    pub fn s(&self) -> usize {
        self.c.len()
    }

    pub fn a(&self) -> &DMatrix<T> {
        &self.a
    }

    pub fn b(&self) -> &DVector<T> {
        &self.b
    }

    pub fn c(&self) -> &DVector<T> {
        &self.c
    }

    pub fn d(&self) -> &DVector<T> {
        &self.d
    }

    pub fn beta(&self) -> Option<&DMatrix<T>> {
        self.beta.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_consistency(tableau: &Tableau<f64>) {
        let s = tableau.s();
        for i in 0..s {
            let row_sum: f64 = (0..s).map(|j| tableau.a()[(i, j)]).sum();
            assert!(
                (row_sum - tableau.c()[i]).abs() < 1e-10,
                "row {} of a sums to {}, expected {}",
                i,
                row_sum,
                tableau.c()[i]
            );
        }
        let b_sum: f64 = tableau.b().iter().sum();
        assert!((b_sum - 1.0).abs() < 1e-10);
        let d_sum: f64 = tableau.d().iter().sum();
        assert!(d_sum.abs() < 1e-10);
    }

    #[test]
    fn test_tr_bdf2() {
        let tableau = Tableau::<f64>::tr_bdf2().unwrap();
        check_consistency(&tableau);
        assert_eq!(tableau.order(), 2);
        assert_eq!(tableau.s(), 3);
        assert!(tableau.beta().is_some());
    }

    #[test]
    fn test_esdirk34() {
        let tableau = Tableau::<f64>::esdirk34().unwrap();
        check_consistency(&tableau);
        assert_eq!(tableau.order(), 3);
        assert_eq!(tableau.s(), 4);
    }

    #[test]
    fn test_kvaerno5() {
        let tableau = Tableau::<f64>::kvaerno5().unwrap();
        check_consistency(&tableau);
        assert_eq!(tableau.order(), 5);
        assert_eq!(tableau.embedded_order(), 4);
        assert_eq!(tableau.error_order(), 5);
        assert_eq!(tableau.s(), 7);
        // stiffly accurate: the last row of a is b, and the last c is 1
        for i in 0..7 {
            assert_eq!(tableau.a()[(6, i)], tableau.b()[i]);
        }
        assert_eq!(tableau.c()[6], 1.0);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let a = DMatrix::from_vec(1, 1, vec![1.0]);
        let b = DVector::from_vec(vec![0.5]);
        let c = DVector::from_vec(vec![1.0]);
        let d = DVector::from_vec(vec![0.0]);
        assert!(Tableau::<f64>::new(a, b, c, d, 1, 1, None).is_err());
    }

    #[test]
    fn test_inconsistent_rows_rejected() {
        let a = DMatrix::from_vec(1, 1, vec![1.0]);
        let b = DVector::from_vec(vec![1.0]);
        let c = DVector::from_vec(vec![0.5]);
        let d = DVector::from_vec(vec![0.0]);
        assert!(Tableau::<f64>::new(a, b, c, d, 1, 1, None).is_err());
    }
}
