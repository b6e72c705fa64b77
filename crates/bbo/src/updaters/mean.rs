use crate::distribution::DistributionGaussian;
use crate::errors::{BboError, Result};
use crate::updaters::{update_mean, DistributionUpdate, Updater};
use crate::weighting::{Weighting, WeightingMethod};
use linfa::{Float, ParamGuard};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Updater moving the mean of the distribution only.
///
/// The new mean is the weighted average of the samples, the covariance is kept unchanged,
/// hence the exploration radius is fixed by the initial distribution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UpdaterMeanRaw<F>")]
pub struct UpdaterMean<F: Float> {
    /// Eliteness of the weighting function
    pub(crate) eliteness: F,
    /// Method used to compute weights from costs
    pub(crate) weighting_method: WeightingMethod,
}

#[derive(Deserialize)]
struct UpdaterMeanRaw<F: Float> {
    eliteness: F,
    weighting_method: WeightingMethod,
}

impl<F: Float> TryFrom<UpdaterMeanRaw<F>> for UpdaterMean<F> {
    type Error = BboError;

    fn try_from(raw: UpdaterMeanRaw<F>) -> Result<Self> {
        UpdaterMean::params(raw.eliteness)
            .weighting_method(raw.weighting_method)
            .check()
    }
}

impl<F: Float> UpdaterMean<F> {
    /// Parameters of the updater given the `eliteness` of the weighting
    pub fn params(eliteness: F) -> UpdaterMeanParams<F> {
        UpdaterMeanParams(UpdaterMean {
            eliteness,
            weighting_method: WeightingMethod::default(),
        })
    }

    /// Eliteness of the weighting function
    pub fn eliteness(&self) -> F {
        self.eliteness
    }

    /// Weighting method
    pub fn weighting_method(&self) -> WeightingMethod {
        self.weighting_method
    }
}

impl<F: Float> Updater<F> for UpdaterMean<F> {
    fn weighting(&self) -> Result<Weighting<F>> {
        Weighting::new(self.weighting_method, self.eliteness)
    }

    fn update(
        &self,
        distribution: &DistributionGaussian<F>,
        samples: &ArrayView2<F>,
        costs: &ArrayView1<F>,
    ) -> Result<DistributionUpdate<F>> {
        let (mean, weights) = update_mean(&self.weighting()?, distribution, samples, costs)?;
        Ok(DistributionUpdate {
            distribution: DistributionGaussian::new(mean, distribution.covariance().to_owned())?,
            weights,
        })
    }
}

/// The set of parameters of [`UpdaterMean`]
#[derive(Clone, Debug)]
pub struct UpdaterMeanParams<F: Float>(UpdaterMean<F>);

impl<F: Float> UpdaterMeanParams<F> {
    /// Set the weighting method
    pub fn weighting_method(mut self, weighting_method: WeightingMethod) -> Self {
        self.0.weighting_method = weighting_method;
        self
    }
}

impl<F: Float> ParamGuard for UpdaterMeanParams<F> {
    type Checked = UpdaterMean<F>;
    type Error = BboError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        Weighting::new(self.0.weighting_method, self.0.eliteness)?;
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
