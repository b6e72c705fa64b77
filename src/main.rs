//! Evolution strategy demo: minimize the distance to the origin in 2D
//! starting from a distribution centered on (5, 5).
//!
//! ```text
//! evobox [DIRECTORY] [--covar-update none|decay|adaptation] [--seed N]
//! ```
//!
//! When `DIRECTORY` is given, the initial distribution and every generation are saved
//! in it as numpy files.
use clap::{Parser, ValueEnum};
use env_logger::{Builder, Env};
use evobox_bbo::{
    DistanceToPoint, DistributionGaussian, EvolutionBuilder, UpdaterCovarAdaptation,
    UpdaterCovarDecay, UpdaterMean, UpdaterSpec, WeightingMethod, EVOBOX_LOG,
};
use linfa::ParamGuard;
use log::info;
use ndarray::{array, Array1};

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum CovarUpdate {
    /// Mean update only
    None,
    /// Mean update and covariance decay
    Decay,
    /// Mean update and covariance adaptation
    Adaptation,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory where the optimization history is saved
    directory: Option<String>,
    /// Covariance update method
    #[arg(short, long, value_enum, default_value_t = CovarUpdate::Decay)]
    covar_update: CovarUpdate,
    /// Random generator seed
    #[arg(short, long)]
    seed: Option<u64>,
}

const DIM: usize = 2;
const ELITENESS: f64 = 10.;
const N_UPDATES: usize = 40;
const N_SAMPLES_PER_UPDATE: usize = 10;

fn updater(covar_update: CovarUpdate) -> anyhow::Result<UpdaterSpec<f64>> {
    let weighting_method: WeightingMethod = "PI-BB".parse()?;
    let updater: UpdaterSpec<f64> = match covar_update {
        CovarUpdate::None => UpdaterMean::params(ELITENESS)
            .weighting_method(weighting_method)
            .check()?
            .into(),
        CovarUpdate::Decay => UpdaterCovarDecay::params(ELITENESS, 0.8)
            .weighting_method(weighting_method)
            .check()?
            .into(),
        CovarUpdate::Adaptation => {
            UpdaterCovarAdaptation::params(ELITENESS, Array1::from_elem(DIM, 1e-6))
                .weighting_method(weighting_method)
                .diag_only(false)
                .learning_rate(0.75)
                .check()?
                .into()
        }
    };
    Ok(updater)
}

fn main() -> anyhow::Result<()> {
    let env = Env::new().filter_or(EVOBOX_LOG, "info");
    Builder::from_env(env)
        .target(env_logger::Target::Stdout)
        .try_init()
        .ok();

    let args = Args::parse();

    let cost = DistanceToPoint::new(Array1::zeros(DIM));
    let initial = DistributionGaussian::isotropic(array![5., 5.], 4.)?;
    let updater = updater(args.covar_update)?;
    info!("Optimize with {} updater", updater.name());

    let res = EvolutionBuilder::optimize(cost)
        .configure(|config| {
            let config = config
                .n_updates(N_UPDATES)
                .n_samples_per_update(N_SAMPLES_PER_UPDATE)
                .eval_mean(true);
            let config = match args.seed {
                Some(seed) => config.seed(seed),
                None => config,
            };
            match args.directory {
                Some(dir) => config.outdir(dir),
                None => config,
            }
        })
        .min_from(initial, updater)?
        .run()?;

    println!("Final mean = {}", res.distribution.mean());
    println!("Final covariance = {}", res.distribution.covariance());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli() {
        let args = Args::parse_from(["evobox", "out", "--covar-update", "adaptation", "--seed", "3"]);
        assert_eq!(args.directory.as_deref(), Some("out"));
        assert_eq!(args.covar_update, CovarUpdate::Adaptation);
        assert_eq!(args.seed, Some(3));

        let args = Args::parse_from(["evobox"]);
        assert!(args.directory.is_none());
        assert_eq!(args.covar_update, CovarUpdate::Decay);
    }

    #[test]
    fn test_updaters() {
        assert_eq!(updater(CovarUpdate::None).unwrap().name(), "mean");
        assert_eq!(updater(CovarUpdate::Decay).unwrap().name(), "decay");
        assert_eq!(updater(CovarUpdate::Adaptation).unwrap().name(), "adaptation");
    }
}
