use evobox_bbo::{
    DistanceToPoint, DistributionGaussian, EvolutionBuilder, GenerationHistory, UpdaterCovarDecay,
};
use linfa::ParamGuard;
use ndarray::array;

fn main() {
    let cost = DistanceToPoint::new(array![0., 0.]);
    let initial = DistributionGaussian::isotropic(array![5., 5.], 4.).expect("valid distribution");
    let updater = UpdaterCovarDecay::params(10., 0.8)
        .check()
        .expect("valid updater");

    let mut history = GenerationHistory::<f64>::new();
    let res = EvolutionBuilder::optimize(cost)
        .configure(|config| {
            config
                .n_updates(40)
                .n_samples_per_update(10)
                .eval_mean(true)
                .seed(42)
        })
        .min_from(initial, updater)
        .expect("optimizer configured")
        .run_with_recorder(&mut history)
        .expect("distance minimized");

    for gen in history.generations().iter().step_by(5) {
        println!(
            "generation {:>2}: cost(mean) = {:.6}",
            gen.index,
            gen.cost_eval.unwrap_or(f64::NAN)
        );
    }
    println!("Final mean = {}", res.distribution.mean());
    println!("Final covariance = {}", res.distribution.covariance());
    if let (Some(x_best), Some(cost_best)) = (res.x_best, res.cost_best) {
        println!("Best sample {x_best} with cost {cost_best}");
    }
}
