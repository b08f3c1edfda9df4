//! A module for correlation models used to model the error term of the GP model.
//!
//! The following correlation models are implemented:
//! * squared exponential,
//! * absolute exponential,
//! * matern 3/2,
//! * matern 5/2.
//!
//! Each model uses one `theta` hyperparameter per input component,
//! `theta` being the inverse of a length scale in normalized input space.

use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2, Zip};
use std::fmt;

/// A trait for using a correlation model in GP regression
pub trait CorrelationModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync {
    /// Compute correlation function matrix r(x, x') given distances `d` between x and x',
    /// and `theta` parameters, where:
    /// `theta` : hyperparameters (nx,)
    /// `d`     : componentwise distances (n, nx)
    ///
    /// Returns a (n, 1) column of correlation values.
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F>;
}

/// Squared exponential correlation models
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SquaredExponentialCorr();

impl<F: Float> CorrelationModel<F> for SquaredExponentialCorr {
    ///   d
    /// prod exp( - |theta_j * d_j|^2 / 2 )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let theta2 = theta.mapv(|v| v * v);
        let r = d.mapv(|v| v * v).dot(&theta2);
        r.mapv(|v| F::exp(F::cast(-0.5) * v)).insert_axis(Axis(1))
    }
}

impl fmt::Display for SquaredExponentialCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SquaredExponential")
    }
}

/// Absolute exponential correlation models
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AbsoluteExponentialCorr();

impl<F: Float> CorrelationModel<F> for AbsoluteExponentialCorr {
    ///   d
    /// prod exp( - theta_j * |d_j| )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let r = d.mapv(|v| v.abs()).dot(theta);
        r.mapv(|v| F::exp(-v)).insert_axis(Axis(1))
    }
}

impl fmt::Display for AbsoluteExponentialCorr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AbsoluteExponential")
    }
}

/// Matern 3/2 correlation model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Matern32Corr();

impl<F: Float> CorrelationModel<F> for Matern32Corr {
    ///   d
    /// prod (1 + sqrt(3) * theta_j * |d_j|) exp( - sqrt(3) * theta_j * |d_j| )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let sqrt3 = F::cast(3.).sqrt();
        let (a, b) = matern_factors(d, theta, |v| F::one() + sqrt3 * v, sqrt3);
        (a * b).insert_axis(Axis(1))
    }
}

impl fmt::Display for Matern32Corr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Matern32")
    }
}

/// Matern 5/2 correlation model
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Matern52Corr();

impl<F: Float> CorrelationModel<F> for Matern52Corr {
    ///   d
    /// prod (1 + sqrt(5) * theta_j * |d_j| + (5./3.) * theta_j^2 * |d_j|^2) exp( - sqrt(5) * theta_j * |d_j| )
    ///  j=1
    fn value(
        &self,
        d: &ArrayBase<impl Data<Elem = F>, Ix2>,
        theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Array2<F> {
        let sqrt5 = F::cast(5.).sqrt();
        let div5_3 = F::cast(5. / 3.);
        let (a, b) = matern_factors(d, theta, |v| F::one() + sqrt5 * v + div5_3 * v * v, sqrt5);
        (a * b).insert_axis(Axis(1))
    }
}

impl fmt::Display for Matern52Corr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Matern52")
    }
}

/// Polynomial and exponential factors of Matern kernels:
/// a_i = prod_j poly(theta_j * |d_ij|), b_i = exp(-coef * sum_j theta_j * |d_ij|)
fn matern_factors<F: Float>(
    d: &ArrayBase<impl Data<Elem = F>, Ix2>,
    theta: &ArrayBase<impl Data<Elem = F>, Ix1>,
    poly: impl Fn(F) -> F,
    coef: F,
) -> (Array1<F>, Array1<F>) {
    let abs_d = d.mapv(|v| v.abs());
    let mut a = Array1::ones(d.nrows());
    Zip::from(&mut a).and(abs_d.rows()).for_each(|a_i, abs_d_i| {
        Zip::from(&abs_d_i).and(theta).for_each(|abs_d_ij, theta_j| {
            *a_i *= poly(*theta_j * *abs_d_ij);
        });
    });
    let b = abs_d.dot(theta).mapv(|v| F::exp(-coef * v));
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{DiffMatrix, Standardized};
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, array};
    use paste::paste;

    #[test]
    fn test_squared_exponential() {
        let xt = array![[4.5], [1.2], [2.0], [3.0], [4.0]];
        let dm = DiffMatrix::new(&xt);
        let res = SquaredExponentialCorr::default().value(&dm.d, &arr1(&[f64::sqrt(0.2)]));
        let expected = array![
            [0.336552878364737],
            [0.5352614285189903],
            [0.7985162187593771],
            [0.9753099120283326],
            [0.9380049995307295],
            [0.7232502423798424],
            [0.4565760496233148],
            [0.9048374180359595],
            [0.6703200460356393],
            [0.9048374180359595]
        ];
        assert_abs_diff_eq!(res, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_absolute_exponential() {
        let d = array![[0.0], [1.0], [2.0]];
        let res = AbsoluteExponentialCorr::default().value(&d, &arr1(&[0.5]));
        assert_abs_diff_eq!(
            res,
            array![[1.0], [f64::exp(-0.5)], [f64::exp(-1.0)]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_matern32_single_component() {
        let d = array![[2.0]];
        let theta = arr1(&[0.5]);
        let res = Matern32Corr::default().value(&d, &theta);
        let s = f64::sqrt(3.);
        assert_abs_diff_eq!(res[[0, 0]], (1. + s) * f64::exp(-s), epsilon = 1e-12);
    }

    #[test]
    fn test_matern52_single_component() {
        let d = array![[2.0]];
        let theta = arr1(&[0.5]);
        let res = Matern52Corr::default().value(&d, &theta);
        let s = f64::sqrt(5.);
        assert_abs_diff_eq!(
            res[[0, 0]],
            (1. + s + 5. / 3.) * f64::exp(-s),
            epsilon = 1e-12
        );
    }

    macro_rules! test_correlation_bounds {
        ($corr:ident) => {
            paste! {
                #[test]
                fn [<test_bounds_ $corr:snake>]() {
                    let xt = array![[0.2, 3.1], [1.0, 0.5], [2.5, -1.0], [4.0, 2.2]];
                    let xnorm = Standardized::new(&xt);
                    let dm = DiffMatrix::new(&xnorm.data);
                    let r = [<$corr Corr>]::default().value(&dm.d, &arr1(&[0.7, 1.3]));
                    assert_eq!(r.shape(), &[6, 1]);
                    assert!(r.iter().all(|v| *v > 0. && *v <= 1.));
                    let zero = [<$corr Corr>]::default().value(&array![[0., 0.]], &arr1(&[0.7, 1.3]));
                    assert_abs_diff_eq!(zero[[0, 0]], 1.0, epsilon = 1e-12);
                }
            }
        };
    }

    test_correlation_bounds!(SquaredExponential);
    test_correlation_bounds!(AbsoluteExponential);
    test_correlation_bounds!(Matern32);
    test_correlation_bounds!(Matern52);
}
