//! A module for trend models used as the mean term of the GP model.
//! In practice small degree (<= 1) polynomials are used,
//! the gaussian process then models the correlated error term around it.
//!
//! The following models are implemented:
//! * constant,
//! * linear

use linfa::Float;
use ndarray::{concatenate, Array2, ArrayBase, Axis, Data, Ix2};
use paste::paste;
use std::fmt;

/// A trait for mean models used in GP regression
pub trait MeanModel<F: Float>: Clone + Copy + Default + fmt::Display + Sync {
    /// Compute regression coefficients defining the mean behaviour of the GP model
    /// for the given `x` data points specified as (n, nx) matrix.
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F>;
}

/// A constant function as mean of the GP
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ConstantMean();

impl<F: Float> MeanModel<F> for ConstantMean {
    /// Zero order polynomial (constant) regression model.
    /// regr(x) = [1, ..., 1].T
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        Array2::<F>::ones((x.nrows(), 1))
    }
}

/// An affine function as mean of the GP
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LinearMean();

impl<F: Float> MeanModel<F> for LinearMean {
    /// First order polynomial (linear) regression model.
    /// regr(x) = [ 1, x_1, ..., x_n ].T
    fn value(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        concatenate![Axis(1), Array2::ones((x.nrows(), 1)), x.to_owned()]
    }
}

macro_rules! declare_mean_display {
    ($regr:ident) => {
        paste! {
            impl fmt::Display for [<$regr Mean>] {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "{}Mean", stringify!($regr))
                }
            }
        }
    };
}

declare_mean_display!(Constant);
declare_mean_display!(Linear);

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_constant_mean() {
        let x = array![[1., 2.], [3., 4.], [5., 6.]];
        let f = MeanModel::<f64>::value(&ConstantMean(), &x);
        assert_eq!(array![[1.], [1.], [1.]], f);
    }

    #[test]
    fn test_linear_mean() {
        let x = array![[1., 2.], [3., 4.]];
        let f = MeanModel::<f64>::value(&LinearMean(), &x);
        assert_eq!(array![[1., 1., 2.], [1., 3., 4.]], f);
    }

    #[test]
    fn test_display() {
        assert_eq!("ConstantMean", ConstantMean().to_string());
        assert_eq!("LinearMean", LinearMean().to_string());
    }
}
