use env_logger::{Builder, Env};
use ndarray::{array, Array1, Array2, Axis};
use uqbox_gp::{HyperTuning, Kriging, UQBOX_LOG};
use uqbox_grassmann::{
    distances::GeodesicDistance,
    interpolation::{LinearInterpolation, SurrogateInterpolation, TangentInterpolation},
    karcher::GradientDescent,
    linalg::frobenius,
    svd_projection::{Rank, SvdProjection},
};

/// A family of (4, 3) matrices parameterized by t
fn solution(t: f64) -> Array2<f64> {
    array![
        [1. + t, t.sin(), 0.5],
        [0.2 * t, 2., t.cos()],
        [0.3, (0.5 * t).exp(), 1.],
        [t * t, 0.1, 3. - t]
    ]
}

fn main() {
    let env = Env::new().filter_or(UQBOX_LOG, "info");
    Builder::from_env(env).try_init().ok();

    let nodes = Array1::linspace(0., 1., 5);
    let samples: Vec<_> = nodes.iter().map(|&t| solution(t)).collect();
    let coordinates = nodes.clone().insert_axis(Axis(1));

    let projection = SvdProjection::new(&samples, Rank::Explicit(2)).expect("SVD projection");
    println!(
        "{} matrices projected with rank {}",
        samples.len(),
        projection.rank()
    );

    let gp_interpolation = SurrogateInterpolation::new(
        Kriging::params().hyper_tuning(HyperTuning::Fixed(array![0.5, 1., 1e-6])),
    );
    let methods: [(&str, &dyn TangentInterpolation); 2] = [
        ("linear", &LinearInterpolation),
        ("gp", &gp_interpolation),
    ];

    for (name, method) in methods.iter() {
        let reconstruction = projection
            .reconstructor(
                *method,
                &coordinates,
                &GradientDescent::default(),
                &GeodesicDistance,
            )
            .expect("reconstruction");
        for t in [0.1, 0.35, 0.6, 0.9] {
            let expected = solution(t);
            let reconstructed = reconstruction
                .reconstruct(&array![t].view())
                .expect("reconstruction");
            let error = frobenius(&(&reconstructed - &expected)) / frobenius(&expected);
            println!("t = {t:4.2}  {name:>6} relative error = {error:.2e}");
        }
    }
}
