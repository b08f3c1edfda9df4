use hetgp::{GpRegressor, HeteroscedasticGp, KrigingRegressor, Uncertainty};
use hetgp_gp::{GpParams, LinearMean, SquaredExponentialCorr};
use linfa::prelude::*;
use ndarray::{concatenate, Array, Array1, Axis};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

fn main() {
    env_logger::init();

    // sin(x) observed with a noise standard deviation growing from 0.01 to 0.5
    let n = 40;
    let xt = Array::linspace(0., 10., n).insert_axis(Axis(1));
    let mut rng = Xoshiro256Plus::seed_from_u64(42);
    let noise_std = Array::linspace(0.01, 0.5, n);
    let eps = Array1::random_using(n, Normal::new(0., 1.).unwrap(), &mut rng);
    let yt = xt.column(0).mapv(f64::sin) + &noise_std * &eps;

    let hgp = HeteroscedasticGp::params(
        KrigingRegressor::default(),
        GpRegressor::new(GpParams::new(LinearMean(), SquaredExponentialCorr())),
    )
    .num_iters(5)
    .sample_size(100)
    .seed(Some(42))
    .report_noise_rmse(true)
    .fit(&Dataset::new(xt, yt))
    .expect("HGP fit");
    println!("{hgp}");

    let xtest = Array::linspace(0., 10., 11).insert_axis(Axis(1));
    let (mean, ep_std) = hgp
        .predict_std(&xtest.view(), Uncertainty::Epistemic)
        .expect("HGP prediction");
    let (_, al_std) = hgp
        .predict_std(&xtest.view(), Uncertainty::Aleatoric)
        .expect("HGP prediction");
    let (_, full_std) = hgp
        .predict_std(&xtest.view(), Uncertainty::Full)
        .expect("HGP prediction");

    println!("Predictions (x, mean, epistemic std, aleatoric std, full std)");
    println!(
        "{}",
        concatenate![
            Axis(1),
            xtest,
            mean.insert_axis(Axis(1)),
            ep_std.insert_axis(Axis(1)),
            al_std.insert_axis(Axis(1)),
            full_std.insert_axis(Axis(1))
        ]
    );
}
