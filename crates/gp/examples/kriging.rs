use env_logger::{Builder, Env};
use linfa::prelude::*;
use ndarray::{arr2, Array, Axis};
use uqbox_gp::{Kriging, UQBOX_LOG};

fn main() {
    let env = Env::new().filter_or(UQBOX_LOG, "info");
    Builder::from_env(env).try_init().ok();

    let xtrain = arr2(&[[0.0], [2.5], [5.0], [7.5], [10.0]]);
    let ytrain = xtrain.column(0).mapv(f64::sin);

    let gp = Kriging::params()
        .n_start(3)
        .seed(Some(42))
        .fit(&Dataset::new(xtrain, ytrain))
        .expect("GP fitting");
    println!("{gp}");

    let xtest = Array::linspace(0., 10., 11).insert_axis(Axis(1));
    let (ytest, ystd) = gp.predict_valstd_flat(&xtest).expect("GP prediction");
    for ((x, y), s) in xtest.iter().zip(ytest.iter()).zip(ystd.iter()) {
        println!("x = {x:5.2}  mean = {y:8.4}  std = {s:8.4}  sin(x) = {:8.4}", x.sin());
    }
}
