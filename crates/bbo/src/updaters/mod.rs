//! Distribution updaters of the evolution strategy.
//!
//! All updaters first turn costs into weights with a [`Weighting`] function and
//! compute the new mean as the weighted average of the samples. They differ in the
//! way they handle the covariance:
//!
//! * [`UpdaterMean`]: covariance is left unchanged,
//! * [`UpdaterCovarDecay`]: covariance is shrunk by a constant factor,
//! * [`UpdaterCovarAdaptation`]: covariance is estimated from the weighted samples.
//!
//! Updaters are built from parameters validated with [`linfa::ParamGuard`]:
//!
//! ```
//! use linfa::ParamGuard;
//! use evobox_bbo::{UpdaterCovarDecay, WeightingMethod};
//!
//! let updater = UpdaterCovarDecay::params(10., 0.8)
//!     .weighting_method(WeightingMethod::PiBb)
//!     .check()
//!     .expect("valid updater parameters");
//! ```
mod covar_adaptation;
mod covar_decay;
mod mean;

pub use covar_adaptation::*;
pub use covar_decay::*;
pub use mean::*;

use crate::distribution::DistributionGaussian;
use crate::errors::{BboError, Result};
use crate::weighting::{check_weights, Weighting};
use linfa::Float;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Result of a distribution update
#[derive(Clone, Debug, PartialEq)]
pub struct DistributionUpdate<F: Float> {
    /// The updated distribution
    pub distribution: DistributionGaussian<F>,
    /// The weights computed from the costs, index aligned with the samples
    pub weights: Array1<F>,
}

/// A trait for distribution update rules
pub trait Updater<F: Float> {
    /// Weighting function used to turn costs into weights
    fn weighting(&self) -> Result<Weighting<F>>;

    /// Check the updater is compatible with a search space of dimension `dim`
    fn check_dim(&self, _dim: usize) -> Result<()> {
        Ok(())
    }

    /// Compute the next distribution given the current one, the `(n, d)` samples drawn
    /// from it and their `n` costs.
    fn update(
        &self,
        distribution: &DistributionGaussian<F>,
        samples: &ArrayView2<F>,
        costs: &ArrayView1<F>,
    ) -> Result<DistributionUpdate<F>>;
}

/// Common first step of the updaters: weights computation and weighted mean of the samples.
///
/// Returns `(new_mean, weights)`.
pub(crate) fn update_mean<F: Float>(
    weighting: &Weighting<F>,
    distribution: &DistributionGaussian<F>,
    samples: &ArrayView2<F>,
    costs: &ArrayView1<F>,
) -> Result<(Array1<F>, Array1<F>)> {
    if samples.nrows() != costs.len() {
        return Err(BboError::DimensionMismatch(format!(
            "{} samples given with {} costs",
            samples.nrows(),
            costs.len()
        )));
    }
    if samples.ncols() != distribution.dim() {
        return Err(BboError::DimensionMismatch(format!(
            "samples of dimension {} given for a distribution of dimension {}",
            samples.ncols(),
            distribution.dim()
        )));
    }
    let weights = weighting.weights(costs)?;
    check_weights(&weights)?;
    let mean = weights.dot(samples);
    Ok((mean, weights))
}

/// The closed set of available updaters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum UpdaterSpec<F: Float> {
    /// Mean only update
    Mean(UpdaterMean<F>),
    /// Mean update and covariance decay
    CovarDecay(UpdaterCovarDecay<F>),
    /// Mean update and covariance adaptation
    CovarAdaptation(UpdaterCovarAdaptation<F>),
}

impl<F: Float> UpdaterSpec<F> {
    /// Short name of the updater
    pub fn name(&self) -> &'static str {
        match self {
            UpdaterSpec::Mean(_) => "mean",
            UpdaterSpec::CovarDecay(_) => "decay",
            UpdaterSpec::CovarAdaptation(_) => "adaptation",
        }
    }
}

impl<F: Float> From<UpdaterMean<F>> for UpdaterSpec<F> {
    fn from(updater: UpdaterMean<F>) -> Self {
        UpdaterSpec::Mean(updater)
    }
}

impl<F: Float> From<UpdaterCovarDecay<F>> for UpdaterSpec<F> {
    fn from(updater: UpdaterCovarDecay<F>) -> Self {
        UpdaterSpec::CovarDecay(updater)
    }
}

impl<F: Float> From<UpdaterCovarAdaptation<F>> for UpdaterSpec<F> {
    fn from(updater: UpdaterCovarAdaptation<F>) -> Self {
        UpdaterSpec::CovarAdaptation(updater)
    }
}

impl<F: Float> Updater<F> for UpdaterSpec<F> {
    fn weighting(&self) -> Result<Weighting<F>> {
        match self {
            UpdaterSpec::Mean(u) => u.weighting(),
            UpdaterSpec::CovarDecay(u) => u.weighting(),
            UpdaterSpec::CovarAdaptation(u) => u.weighting(),
        }
    }

    fn check_dim(&self, dim: usize) -> Result<()> {
        match self {
            UpdaterSpec::Mean(u) => u.check_dim(dim),
            UpdaterSpec::CovarDecay(u) => u.check_dim(dim),
            UpdaterSpec::CovarAdaptation(u) => u.check_dim(dim),
        }
    }

    fn update(
        &self,
        distribution: &DistributionGaussian<F>,
        samples: &ArrayView2<F>,
        costs: &ArrayView1<F>,
    ) -> Result<DistributionUpdate<F>> {
        match self {
            UpdaterSpec::Mean(u) => u.update(distribution, samples, costs),
            UpdaterSpec::CovarDecay(u) => u.update(distribution, samples, costs),
            UpdaterSpec::CovarAdaptation(u) => u.update(distribution, samples, costs),
        }
    }
}
