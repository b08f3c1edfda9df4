use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2, Zip};

/// Column-wise standardized (n, nx) data along with the statistics used to standardize it.
#[derive(Debug, Clone)]
pub(crate) struct Standardized<F: Float> {
    /// standardized data
    pub data: Array2<F>,
    /// column means of the original data
    pub mean: Array1<F>,
    /// column standard deviations of the original data, 1 for constant columns
    pub std: Array1<F>,
}

impl<F: Float> Standardized<F> {
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Standardized<F> {
        let (data, mean, std) = standardize(x);
        Standardized { data, mean, std }
    }

    /// Number of columns
    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    /// Standardize other points with the statistics of the data
    pub fn apply(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        (x - &self.mean) / &self.std
    }
}

/// Center and scale `x` columnwise, returns (standardized x, means, standard deviations)
pub fn standardize<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> (Array2<F>, Array1<F>, Array1<F>) {
    let mean = x
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(x.ncols()));
    let std = x
        .std_axis(Axis(0), F::one())
        .mapv(|v| if v > F::zero() { v } else { F::one() });
    ((x - &mean) / &std, mean, std)
}

/// Componentwise absolute differences between every pair `(i, j)`, `i < j`, of
/// training points, used to assemble the training covariance matrix
#[derive(Debug)]
pub struct DiffMatrix<F: Float> {
    /// Differences as (n_obs * (n_obs - 1) / 2, nx) array, pairs in lexicographic order
    pub d: Array2<F>,
    /// Row and column indices of each pair
    pub pairs: Vec<(usize, usize)>,
    /// Number of observations
    pub n_obs: usize,
}

impl<F: Float> DiffMatrix<F> {
    /// Compute pair differences of points given as an array (n_obs, nx)
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> DiffMatrix<F> {
        let n_obs = x.nrows();
        let pairs: Vec<(usize, usize)> = (0..n_obs)
            .flat_map(|i| ((i + 1)..n_obs).map(move |j| (i, j)))
            .collect();
        let mut d = Array2::zeros((pairs.len(), x.ncols()));
        Zip::from(d.rows_mut())
            .and(&Array1::from(pairs.clone()))
            .for_each(|mut d_ij, (i, j)| {
                Zip::from(&mut d_ij)
                    .and(x.row(*i))
                    .and(x.row(*j))
                    .for_each(|d, a, b| *d = (*a - *b).abs());
            });
        DiffMatrix { d, pairs, n_obs }
    }
}

/// Differences `x_i - y_j` for each row i of x and each row j of y, as a
/// (nrows(x) * nrows(y), ncols) array where row `i * nrows(y) + j` holds `x_i - y_j`.
///
/// *Panics* if x and y have not the same number of columns
pub fn pairwise_differences<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    assert_eq!(x.ncols(), y.ncols());
    let ny = y.nrows();
    let mut diffs = Array2::zeros((x.nrows() * ny, x.ncols()));
    for (i, x_i) in x.rows().into_iter().enumerate() {
        let mut block = diffs.slice_mut(ndarray::s![i * ny..(i + 1) * ny, ..]);
        block.assign(&(&x_i - y));
    }
    diffs
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_pairwise_differences() {
        let x = array![[1.0, 0.0], [-2.0, 3.0]];
        let y = array![[0.5, 1.0], [2.0, -1.0], [0.0, 0.0]];
        let expected = array![
            [0.5, -1.0],
            [-1.0, 1.0],
            [1.0, 0.0],
            [-2.5, 2.0],
            [-4.0, 4.0],
            [-2.0, 3.0]
        ];
        assert_abs_diff_eq!(pairwise_differences(&x, &y), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_standardized() {
        let x = array![[1., 2., 5.], [3., 4., 5.]];
        let xs = Standardized::new(&x);
        assert_eq!(xs.ncols(), 3);
        assert_eq!(array![2., 3., 5.], xs.mean);
        // constant column is only centered
        assert_eq!(array![f64::sqrt(2.), f64::sqrt(2.), 1.], xs.std);
        assert_abs_diff_eq!(xs.apply(&x), xs.data, epsilon = 1e-15);
        assert_abs_diff_eq!(xs.data.column(2), array![0., 0.], epsilon = 1e-15);
    }

    #[test]
    fn test_diff_matrix() {
        let xt = array![[0.5], [1.2], [2.0], [3.0], [4.0]];
        let dm = DiffMatrix::new(&xt);
        let expected = array![
            [0.7],
            [1.5],
            [2.5],
            [3.5],
            [0.8],
            [1.8],
            [2.8],
            [1.],
            [2.],
            [1.]
        ];
        assert_abs_diff_eq!(dm.d, expected, epsilon = 1e-12);
        assert_eq!(dm.pairs[0], (0, 1));
        assert_eq!(dm.pairs[4], (1, 2));
        assert_eq!(dm.pairs[9], (3, 4));
        assert_eq!(dm.n_obs, 5);
    }
}
