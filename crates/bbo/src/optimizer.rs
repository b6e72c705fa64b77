//! Evolution strategy optimizer.
//!
//! The optimizer runs a fixed number of generations, each one drawing samples from the
//! current Gaussian distribution, evaluating them in one batch with the cost function and
//! updating the distribution from the weighted samples.
//!
//! ```no_run
//! # use ndarray::array;
//! use linfa::ParamGuard;
//! use evobox_bbo::{DistanceToPoint, DistributionGaussian, EvolutionBuilder, UpdaterCovarDecay};
//!
//! let cost = DistanceToPoint::new(array![0., 0.]);
//! let initial = DistributionGaussian::isotropic(array![5., 5.], 4.)
//!     .expect("valid distribution");
//! let updater = UpdaterCovarDecay::params(10., 0.8)
//!     .check()
//!     .expect("valid updater");
//!
//! let res = EvolutionBuilder::optimize(cost)
//!     .configure(|config| config.n_updates(40).n_samples_per_update(10).seed(42))
//!     .min_from(initial, updater)
//!     .expect("optimizer configured")
//!     .run()
//!     .expect("evolution strategy minimization");
//! println!("Final mean = {}", res.distribution.mean());
//! ```
use crate::cost_function::CostFunction;
use crate::distribution::DistributionGaussian;
use crate::errors::{BboError, Result};
use crate::recorder::{DirectoryRecorder, Generation, NoRecorder, Recorder};
use crate::updaters::Updater;
use crate::EVOBOX_LOG;

use env_logger::{Builder, Env};
use linfa::Float;
use log::{debug, info};
use ndarray::{Array1, ArrayView1};
use ndarray_npy::WritableElement;
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_stats::QuantileExt;
use rand_xoshiro::Xoshiro256Plus;
use serde::{Deserialize, Serialize};

/// Json filename for configuration
pub const CONFIG_FILE: &str = "evolution_config.json";

/// Evolution strategy run configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Number of generations (aka distribution updates), 0 means nothing is done
    pub(crate) n_updates: usize,
    /// Number of samples drawn and evaluated at each generation
    pub(crate) n_samples_per_update: usize,
    /// A random generator seed used to get reproductible results
    pub(crate) seed: Option<u64>,
    /// Whether the cost of the distribution mean is evaluated at each generation
    pub(crate) eval_mean: bool,
    /// Directory where the initial distribution and every generation are saved
    pub(crate) outdir: Option<String>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        EvolutionConfig {
            n_updates: 40,
            n_samples_per_update: 10,
            seed: None,
            eval_mean: false,
            outdir: None,
        }
    }
}

impl EvolutionConfig {
    /// Sets the number of generations
    pub fn n_updates(mut self, n_updates: usize) -> Self {
        self.n_updates = n_updates;
        self
    }

    /// Sets the number of samples per generation
    pub fn n_samples_per_update(mut self, n_samples_per_update: usize) -> Self {
        self.n_samples_per_update = n_samples_per_update;
        self
    }

    /// Allow to specify a seed for random number generator to allow
    /// reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets whether the cost of the distribution mean is evaluated before sampling
    pub fn eval_mean(mut self, eval_mean: bool) -> Self {
        self.eval_mean = eval_mean;
        self
    }

    /// Sets a directory to write the optimization history
    pub fn outdir(mut self, outdir: impl Into<String>) -> Self {
        self.outdir = Some(outdir.into());
        self
    }

    /// Number of generations
    pub fn get_n_updates(&self) -> usize {
        self.n_updates
    }

    /// Number of samples per generation
    pub fn get_n_samples_per_update(&self) -> usize {
        self.n_samples_per_update
    }

    /// Check the configuration is valid
    pub fn check(&self) -> Result<()> {
        if self.n_samples_per_update == 0 {
            return Err(BboError::InvalidConfigError(
                "number of samples per update should be strictly positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Random generator seeded from the configuration, from entropy otherwise
    pub(crate) fn rng(&self) -> Xoshiro256Plus {
        if let Some(seed) = self.seed {
            Xoshiro256Plus::seed_from_u64(seed)
        } else {
            Xoshiro256Plus::from_entropy()
        }
    }
}

/// Optimization result
#[derive(Clone, Debug)]
pub struct OptimResult<F: Float> {
    /// Distribution after the last generation
    pub distribution: DistributionGaussian<F>,
    /// Number of generations run
    pub n_generations: usize,
    /// Best sample evaluated during the run, if any
    pub x_best: Option<Array1<F>>,
    /// Cost of the best sample
    pub cost_best: Option<F>,
}

/// Evolution strategy optimizer builder allowing to specify the function to be minimized
pub struct EvolutionFactory<C> {
    cost: C,
    config: EvolutionConfig,
}

/// Builder of the [`Evolution`] optimizer
pub type EvolutionBuilder<C> = EvolutionFactory<C>;

impl<C> EvolutionFactory<C> {
    /// Cost function to be minimized, it has to evaluate several points in one go
    /// hence take a `(n, d)` matrix and return `n` costs (see [`CostFunction`])
    pub fn optimize(cost: C) -> Self {
        EvolutionFactory {
            cost,
            config: EvolutionConfig::default(),
        }
    }

    /// Set configuration of the optimizer
    pub fn configure<I: FnOnce(EvolutionConfig) -> EvolutionConfig>(mut self, init: I) -> Self {
        self.config = init(self.config);
        self
    }

    /// Build an optimizer starting from the `initial` distribution and
    /// updating it with the given `updater`.
    ///
    /// Fails with [`BboError::InvalidConfigError`] when the configuration is invalid or
    /// when the updater does not fit the dimension of the distribution.
    pub fn min_from<F, U>(
        self,
        initial: DistributionGaussian<F>,
        updater: U,
    ) -> Result<Evolution<F, C, U>>
    where
        F: Float,
        C: CostFunction<F>,
        U: Updater<F>,
    {
        let env = Env::new().filter_or(EVOBOX_LOG, "info");
        let mut builder = Builder::from_env(env);
        let builder = builder.target(env_logger::Target::Stdout);
        builder.try_init().ok();

        self.config.check()?;
        updater
            .check_dim(initial.dim())
            .map_err(|err| BboError::InvalidConfigError(err.to_string()))?;
        Ok(Evolution {
            cost: self.cost,
            config: self.config,
            initial,
            updater,
        })
    }
}

/// Evolution strategy optimizer
pub struct Evolution<F: Float, C: CostFunction<F>, U: Updater<F>> {
    cost: C,
    config: EvolutionConfig,
    initial: DistributionGaussian<F>,
    updater: U,
}

impl<F: Float, C: CostFunction<F>, U: Updater<F>> Evolution<F, C, U> {
    /// Optimizer configuration
    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Initial distribution
    pub fn initial(&self) -> &DistributionGaussian<F> {
        &self.initial
    }

    /// Distribution updater
    pub fn updater(&self) -> &U {
        &self.updater
    }

    /// Runs the optimization passing every generation to the given `recorder`,
    /// the random generator being seeded from the configuration.
    ///
    /// `outdir` configuration is ignored.
    pub fn run_with_recorder(&self, recorder: &mut dyn Recorder<F>) -> Result<OptimResult<F>> {
        let mut rng = self.config.rng();
        self.run_with_rng(&mut rng, recorder)
    }

    /// Runs the optimization with the given random generator and recorder.
    ///
    /// A recorder failure stops the run with [`BboError::RecorderError`].
    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        recorder: &mut dyn Recorder<F>,
    ) -> Result<OptimResult<F>> {
        let n_samples = self.config.n_samples_per_update;
        let mut distribution = self.initial.clone();
        let mut best: Option<(Array1<F>, F)> = None;

        for index in 0..self.config.n_updates {
            let cost_eval = if self.config.eval_mean {
                Some(self.eval_mean(distribution.mean().view())?)
            } else {
                None
            };

            let samples = distribution.sampler()?.sample(n_samples, rng);
            let costs = self.cost.evaluate(&samples.view());
            if costs.len() != samples.nrows() {
                return Err(BboError::DimensionMismatch(format!(
                    "cost function returned {} costs for {} samples",
                    costs.len(),
                    samples.nrows()
                )));
            }

            let update = self
                .updater
                .update(&distribution, &samples.view(), &costs.view())?;

            // the updater weighting rejects non-finite costs, so they are totally ordered
            let i_best = costs
                .argmin()
                .map_err(|err| BboError::NumericalDegeneracy(err.to_string()))?;
            if best.as_ref().map_or(true, |(_, c)| costs[i_best] < *c) {
                best = Some((samples.row(i_best).to_owned(), costs[i_best]));
            }
            match cost_eval {
                Some(c) => info!(
                    "Generation {}/{}: cost(mean) = {}, best cost = {}",
                    index + 1,
                    self.config.n_updates,
                    c,
                    costs[i_best]
                ),
                None => info!(
                    "Generation {}/{}: best cost = {}",
                    index + 1,
                    self.config.n_updates,
                    costs[i_best]
                ),
            }
            if log::log_enabled!(log::Level::Debug) {
                debug!(
                    "New mean = {}, max eigen value = {}",
                    update.distribution.mean(),
                    update.distribution.max_eigen_value()?
                );
            }

            let generation = Generation {
                index,
                distribution,
                cost_eval,
                samples,
                costs,
                weights: update.weights,
                distribution_new: update.distribution,
            };
            recorder
                .record(&generation)
                .map_err(|err| BboError::RecorderError {
                    generation: index,
                    source: Box::new(err),
                })?;
            distribution = generation.distribution_new;
        }

        let (x_best, cost_best) = best.map_or((None, None), |(x, c)| (Some(x), Some(c)));
        info!(
            "Evolution done after {} generations: mean = {}",
            self.config.n_updates,
            distribution.mean()
        );
        Ok(OptimResult {
            distribution,
            n_generations: self.config.n_updates,
            x_best,
            cost_best,
        })
    }

    fn eval_mean(&self, mean: ArrayView1<F>) -> Result<F> {
        let x = mean.insert_axis(ndarray::Axis(0));
        let cost = self.cost.evaluate(&x);
        if cost.len() != 1 {
            return Err(BboError::DimensionMismatch(format!(
                "cost function returned {} costs for the distribution mean",
                cost.len()
            )));
        }
        Ok(cost[0])
    }
}

impl<F, C, U> Evolution<F, C, U>
where
    F: Float + WritableElement,
    C: CostFunction<F>,
    U: Updater<F>,
{
    /// Runs the minimization of the cost function.
    ///
    /// When `outdir` is configured, the configuration is saved as [`CONFIG_FILE`]
    /// and every generation is saved through a [`DirectoryRecorder`].
    pub fn run(&self) -> Result<OptimResult<F>> {
        info!("{:?}", self.config);
        let mut rng = self.config.rng();
        if let Some(outdir) = self.config.outdir.as_ref() {
            std::fs::create_dir_all(outdir)?;
            let filepath = std::path::Path::new(outdir).join(CONFIG_FILE);
            let json = serde_json::to_string(&self.config)?;
            std::fs::write(filepath, json)?;
            let mut recorder = DirectoryRecorder::new(outdir, &self.initial)?;
            self.run_with_rng(&mut rng, &mut recorder)
        } else {
            self.run_with_rng(&mut rng, &mut NoRecorder)
        }
    }
}
