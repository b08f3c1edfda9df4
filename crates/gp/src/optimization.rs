use ndarray::{Array1, Array2};
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use linfa::prelude::Float;

pub(crate) struct CobylaParams {
    pub rhobeg: f64,
    pub ftol_rel: f64,
    pub maxeval: usize,
}

impl Default for CobylaParams {
    fn default() -> Self {
        CobylaParams {
            rhobeg: 0.5,
            ftol_rel: 1e-4,
            maxeval: 200,
        }
    }
}

/// Build `n_start + 1` starting points in log10 space: the given `params0`
/// first, then points drawn uniformly within `bounds`.
/// Returns the starting points as rows and the log10 bounds.
pub(crate) fn prepare_multistart<F: Float>(
    n_start: usize,
    params0: &Array1<F>,
    bounds: &[(F, F)],
    seed: u64,
) -> (Array2<F>, Vec<(F, F)>) {
    // Use log10 params as optimization variables
    let bounds: Vec<(F, F)> = bounds
        .iter()
        .map(|(lo, up)| (lo.log10(), up.log10()))
        .collect();

    let mut params0s = Array2::zeros((n_start + 1, params0.len()));
    for (j, (p, (lo, up))) in params0.iter().zip(bounds.iter()).enumerate() {
        let v = p.log10();
        params0s[[0, j]] = if v < *lo {
            *lo
        } else if v > *up {
            *up
        } else {
            v
        };
    }

    // Seeded on purpose: starting points only need to spread over the bounds
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    for i in 1..=n_start {
        for (j, (lo, up)) in bounds.iter().enumerate() {
            params0s[[i, j]] = if lo < up {
                F::cast(rng.gen_range(into_f64(lo)..into_f64(up)))
            } else {
                *lo
            };
        }
    }
    (params0s, bounds)
}

/// Minimize `objfn` with cobyla given an initial guess and bounds.
/// Returns the best objective value (infinite on failure) and the argmin.
pub(crate) fn optimize_params<ObjF, F>(
    objfn: ObjF,
    param0: &Array1<F>,
    bounds: &[(F, F)],
    cobyla: CobylaParams,
) -> (f64, Array1<f64>)
where
    ObjF: Fn(&[f64]) -> f64,
    F: Float,
{
    use cobyla::{minimize, Func, StopTols};

    let cons: Vec<&dyn Func<()>> = vec![];
    let param0: Vec<f64> = param0.iter().map(into_f64).collect();

    let bounds: Vec<_> = bounds
        .iter()
        .map(|(lo, up)| (into_f64(lo), into_f64(up)))
        .collect();

    match minimize(
        |x: &[f64], _u: &mut ()| objfn(x),
        &param0,
        &bounds,
        &cons,
        (),
        cobyla.maxeval,
        cobyla::RhoBeg::All(cobyla.rhobeg),
        Some(StopTols {
            ftol_rel: cobyla.ftol_rel,
            ..StopTols::default()
        }),
    ) {
        Ok((_, x_opt, fval)) => {
            let fval = if f64::is_nan(fval) {
                f64::INFINITY
            } else {
                fval
            };
            (fval, Array1::from_vec(x_opt))
        }
        Err((status, x_opt, _)) => {
            log::warn!("ERROR Cobyla optimizer in GP status={status:?}");
            (f64::INFINITY, Array1::from_vec(x_opt))
        }
    }
}

#[inline(always)]
pub(crate) fn into_f64<F: Float>(v: &F) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_prepare_multistart() {
        let (starts, bounds) =
            prepare_multistart(5, &array![0.1, 1e3], &[(1e-2, 1e1), (1e-6, 1e2)], 42);
        assert_eq!(starts.shape(), &[6, 2]);
        assert_abs_diff_eq!(bounds[0].0, -2., epsilon = 1e-12);
        assert_abs_diff_eq!(bounds[1].1, 2., epsilon = 1e-12);
        // initial guess is clipped within bounds
        assert_abs_diff_eq!(starts[[0, 0]], -1., epsilon = 1e-12);
        assert_abs_diff_eq!(starts[[0, 1]], 2., epsilon = 1e-12);
        for row in starts.rows() {
            assert!(row[0] >= -2. && row[0] <= 1.);
            assert!(row[1] >= -6. && row[1] <= 2.);
        }
    }

    #[test]
    fn test_prepare_multistart_is_seeded() {
        let (s1, _) = prepare_multistart(3, &array![1.0], &[(1e-2, 1e1)], 7);
        let (s2, _) = prepare_multistart(3, &array![1.0], &[(1e-2, 1e1)], 7);
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_optimize_quadratic() {
        let objfn = |x: &[f64]| (x[0] - 0.5).powi(2) + (x[1] + 1.).powi(2);
        let (fmin, xmin) = optimize_params(
            objfn,
            &array![0., 0.],
            &[(-2., 2.), (-2., 2.)],
            CobylaParams::default(),
        );
        assert_abs_diff_eq!(fmin, 0., epsilon = 1e-4);
        assert_abs_diff_eq!(xmin, array![0.5, -1.], epsilon = 1e-2);
    }
}
