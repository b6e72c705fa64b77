use crate::distribution::DistributionGaussian;
use crate::errors::{BboError, Result};
use crate::updaters::{update_mean, DistributionUpdate, Updater};
use crate::weighting::{Weighting, WeightingMethod};
use linfa::{Float, ParamGuard};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Updater moving the mean and shrinking the covariance at a constant rate.
///
/// The covariance is multiplied by `decay^2` at each update as it scales with the square
/// of the sampling radius. It is a simple non adaptive cooling schedule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UpdaterCovarDecayRaw<F>")]
pub struct UpdaterCovarDecay<F: Float> {
    /// Eliteness of the weighting function
    pub(crate) eliteness: F,
    /// Decay factor of the sampling radius in (0, 1]
    pub(crate) decay: F,
    /// Method used to compute weights from costs
    pub(crate) weighting_method: WeightingMethod,
}

#[derive(Deserialize)]
struct UpdaterCovarDecayRaw<F: Float> {
    eliteness: F,
    decay: F,
    weighting_method: WeightingMethod,
}

impl<F: Float> TryFrom<UpdaterCovarDecayRaw<F>> for UpdaterCovarDecay<F> {
    type Error = BboError;

    fn try_from(raw: UpdaterCovarDecayRaw<F>) -> Result<Self> {
        UpdaterCovarDecay::params(raw.eliteness, raw.decay)
            .weighting_method(raw.weighting_method)
            .check()
    }
}

impl<F: Float> UpdaterCovarDecay<F> {
    /// Parameters of the updater given the `eliteness` of the weighting and the `decay` factor
    pub fn params(eliteness: F, decay: F) -> UpdaterCovarDecayParams<F> {
        UpdaterCovarDecayParams(UpdaterCovarDecay {
            eliteness,
            decay,
            weighting_method: WeightingMethod::default(),
        })
    }

    /// Eliteness of the weighting function
    pub fn eliteness(&self) -> F {
        self.eliteness
    }

    /// Decay factor
    pub fn decay(&self) -> F {
        self.decay
    }

    /// Weighting method
    pub fn weighting_method(&self) -> WeightingMethod {
        self.weighting_method
    }
}

impl<F: Float> Updater<F> for UpdaterCovarDecay<F> {
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
        let covariance = distribution.covariance() * (self.decay * self.decay);
        Ok(DistributionUpdate {
            distribution: DistributionGaussian::new(mean, covariance)?,
            weights,
        })
    }
}

/// The set of parameters of [`UpdaterCovarDecay`]
#[derive(Clone, Debug)]
pub struct UpdaterCovarDecayParams<F: Float>(UpdaterCovarDecay<F>);

impl<F: Float> UpdaterCovarDecayParams<F> {
    /// Set the weighting method
    pub fn weighting_method(mut self, weighting_method: WeightingMethod) -> Self {
        self.0.weighting_method = weighting_method;
        self
    }

    /// Set the decay factor, should be in (0, 1]
    pub fn decay(mut self, decay: F) -> Self {
        self.0.decay = decay;
        self
    }
}

impl<F: Float> ParamGuard for UpdaterCovarDecayParams<F> {
    type Checked = UpdaterCovarDecay<F>;
    type Error = BboError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        Weighting::new(self.0.weighting_method, self.0.eliteness)?;
        let decay = self.0.decay;
        if !(decay > F::zero() && decay <= F::one()) {
            return Err(BboError::InvalidConfigError(format!(
                "decay should be in (0, 1], got {decay}"
            )));
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UpdaterMean;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2, Axis};
    use ndarray_rand::rand::SeedableRng;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn test_invalid_params() {
        for decay in [0., -0.5, 1.5, f64::NAN] {
            assert!(matches!(
                UpdaterCovarDecay::params(10., decay).check(),
                Err(BboError::InvalidConfigError(_))
            ));
        }
        assert!(UpdaterCovarDecay::params(0., 0.8).check().is_err());
        assert!(UpdaterCovarDecay::params(10., 1.).check().is_ok());
    }

    #[test]
    fn test_deserialize_checks_params() {
        let json = r#"{"eliteness":10.0,"decay":5.0,"weighting_method":"PI-BB"}"#;
        assert!(serde_json::from_str::<UpdaterCovarDecay<f64>>(json).is_err());
        let json = r#"{"eliteness":10.0,"decay":0.8,"weighting_method":"PI-BB"}"#;
        let updater: UpdaterCovarDecay<f64> = serde_json::from_str(json).unwrap();
        assert_eq!(updater, UpdaterCovarDecay::params(10., 0.8).check().unwrap());
    }

    #[test]
    fn test_no_decay_is_mean_update() {
        let decay = UpdaterCovarDecay::params(10., 1.).check().unwrap();
        let mean_only = UpdaterMean::params(10.).check().unwrap();
        let distrib =
            DistributionGaussian::new(array![1., 2.], array![[2., 0.3], [0.3, 0.7]]).unwrap();
        let samples = distrib
            .sample(10, &mut Xoshiro256Plus::seed_from_u64(42))
            .unwrap();
        let costs = samples.sum_axis(Axis(1));
        let res = decay
            .update(&distrib, &samples.view(), &costs.view())
            .unwrap();
        let expected = mean_only
            .update(&distrib, &samples.view(), &costs.view())
            .unwrap();
        assert_eq!(res.distribution.covariance(), distrib.covariance());
        assert_eq!(res, expected);
    }

    #[test]
    fn test_half_decay() {
        let updater = UpdaterCovarDecay::params(10., 0.5).check().unwrap();
        let distrib = DistributionGaussian::isotropic(array![0., 0., 0.], 4.).unwrap();
        let samples = distrib
            .sample(10, &mut Xoshiro256Plus::seed_from_u64(0))
            .unwrap();
        let costs = samples.mapv(|v| v * v).sum_axis(Axis(1));
        let res = updater
            .update(&distrib, &samples.view(), &costs.view())
            .unwrap();
        let trace = res.distribution.covariance().diag().sum();
        assert_abs_diff_eq!(trace, 0.25 * 12., epsilon = 1e-12);
        assert_abs_diff_eq!(
            res.distribution.covariance().clone(),
            Array2::<f64>::eye(3),
            epsilon = 1e-12
        );
    }
}
