//! Evolution strategy with an ask-and-tell interface.
//!
//! It allows to keep the control on the generation loop, the cost evaluation being done
//! outside of the optimizer: samples are asked to the service, evaluated by the caller
//! then told back with their costs to update the distribution.
//!
//! ```no_run
//! # use ndarray::{array, Axis};
//! # use rand_xoshiro::Xoshiro256Plus;
//! # use ndarray_rand::rand::SeedableRng;
//! use linfa::ParamGuard;
//! use evobox_bbo::{DistributionGaussian, EvolutionService, UpdaterCovarDecay};
//!
//! let initial = DistributionGaussian::isotropic(array![5., 5.], 4.).unwrap();
//! let updater = UpdaterCovarDecay::params(10., 0.8).check().unwrap();
//! let mut service = EvolutionService::new(initial, updater).unwrap();
//! let mut rng = Xoshiro256Plus::seed_from_u64(42);
//!
//! for _ in 0..10 {
//!     let samples = service.ask(10, &mut rng).unwrap();
//!     // costs may come from anywhere (experiments, simulations...)
//!     let costs = samples.mapv(|v| v * v).sum_axis(Axis(1));
//!     service.tell(samples, costs).unwrap();
//! }
//! println!("Final mean = {}", service.distribution().mean());
//! ```
use crate::distribution::DistributionGaussian;
use crate::errors::{BboError, Result};
use crate::recorder::Generation;
use crate::updaters::Updater;

use linfa::Float;
use log::info;
use ndarray::{Array1, Array2};
use ndarray_rand::rand::Rng;

/// Evolution strategy service holding the current distribution
#[derive(Clone, Debug)]
pub struct EvolutionService<F: Float, U: Updater<F>> {
    distribution: DistributionGaussian<F>,
    updater: U,
    n_generations: usize,
}

impl<F: Float, U: Updater<F>> EvolutionService<F, U> {
    /// Constructor given the `initial` distribution and the `updater` to apply
    /// at each told batch
    pub fn new(initial: DistributionGaussian<F>, updater: U) -> Result<Self> {
        updater
            .check_dim(initial.dim())
            .map_err(|err| BboError::InvalidConfigError(err.to_string()))?;
        Ok(EvolutionService {
            distribution: initial,
            updater,
            n_generations: 0,
        })
    }

    /// Current distribution
    pub fn distribution(&self) -> &DistributionGaussian<F> {
        &self.distribution
    }

    /// Number of updates done so far
    pub fn n_generations(&self) -> usize {
        self.n_generations
    }

    /// Ask for `n_samples` samples drawn from the current distribution
    pub fn ask<R: Rng + ?Sized>(&self, n_samples: usize, rng: &mut R) -> Result<Array2<F>> {
        if n_samples == 0 {
            return Err(BboError::InvalidConfigError(
                "number of samples should be strictly positive".to_string(),
            ));
        }
        self.distribution.sample(n_samples, rng)
    }

    /// Tell the costs of the given samples and update the distribution.
    ///
    /// Returns the record of the generation. On error, the distribution is left unchanged.
    pub fn tell(&mut self, samples: Array2<F>, costs: Array1<F>) -> Result<Generation<F>> {
        let update = self
            .updater
            .update(&self.distribution, &samples.view(), &costs.view())?;
        let generation = Generation {
            index: self.n_generations,
            distribution: std::mem::replace(&mut self.distribution, update.distribution.clone()),
            cost_eval: None,
            samples,
            costs,
            weights: update.weights,
            distribution_new: update.distribution,
        };
        info!(
            "Update {}: mean = {}",
            generation.index + 1,
            self.distribution.mean()
        );
        self.n_generations += 1;
        Ok(generation)
    }
}
