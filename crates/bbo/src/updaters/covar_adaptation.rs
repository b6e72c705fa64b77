use crate::distribution::DistributionGaussian;
use crate::errors::{BboError, Result};
use crate::updaters::{update_mean, DistributionUpdate, Updater};
use crate::weighting::{Weighting, WeightingMethod};
use linfa::{Float, ParamGuard};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Updater moving the mean and adapting the covariance from the weighted samples.
///
/// The covariance estimate `sum_i w_i (x_i - mean')(x_i - mean')^t` is blended with the
/// previous covariance using the `learning_rate`, then `base_level` is added to the
/// diagonal to prevent the distribution from collapsing.
/// When `diag_only` is set, only variances are adapted, off-diagonal terms being zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UpdaterCovarAdaptationRaw<F>")]
pub struct UpdaterCovarAdaptation<F: Float> {
    /// Eliteness of the weighting function
    pub(crate) eliteness: F,
    /// Method used to compute weights from costs
    pub(crate) weighting_method: WeightingMethod,
    /// Floor added to the covariance diagonal, one strictly positive value per dimension
    pub(crate) base_level: Array1<F>,
    /// Whether only the diagonal of the covariance is adapted
    pub(crate) diag_only: bool,
    /// Weight of the new covariance estimate in (0, 1]
    pub(crate) learning_rate: F,
}

#[derive(Deserialize)]
struct UpdaterCovarAdaptationRaw<F: Float> {
    eliteness: F,
    weighting_method: WeightingMethod,
    base_level: Array1<F>,
    diag_only: bool,
    learning_rate: F,
}

impl<F: Float> TryFrom<UpdaterCovarAdaptationRaw<F>> for UpdaterCovarAdaptation<F> {
    type Error = BboError;

    fn try_from(raw: UpdaterCovarAdaptationRaw<F>) -> Result<Self> {
        UpdaterCovarAdaptation::params(raw.eliteness, raw.base_level)
            .weighting_method(raw.weighting_method)
            .diag_only(raw.diag_only)
            .learning_rate(raw.learning_rate)
            .check()
    }
}

impl<F: Float> UpdaterCovarAdaptation<F> {
    /// Parameters of the updater given the `eliteness` of the weighting and
    /// the `base_level` of the covariance diagonal.
    ///
    /// Defaults to full covariance adaptation with a learning rate of 1.
    pub fn params(eliteness: F, base_level: Array1<F>) -> UpdaterCovarAdaptationParams<F> {
        UpdaterCovarAdaptationParams(UpdaterCovarAdaptation {
            eliteness,
            weighting_method: WeightingMethod::default(),
            base_level,
            diag_only: false,
            learning_rate: F::one(),
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

    /// Base level of the covariance diagonal
    pub fn base_level(&self) -> &Array1<F> {
        &self.base_level
    }

    /// Whether only the covariance diagonal is adapted
    pub fn diag_only(&self) -> bool {
        self.diag_only
    }

    /// Learning rate
    pub fn learning_rate(&self) -> F {
        self.learning_rate
    }

    fn adapt_covariance(
        &self,
        covariance: &Array2<F>,
        samples: &ArrayView2<F>,
        mean: &Array1<F>,
        weights: &Array1<F>,
    ) -> Array2<F> {
        let eps = samples - mean;
        let weighted_eps = &eps * &weights.view().insert_axis(Axis(1));
        let mut covar_raw = weighted_eps.t().dot(&eps);
        if self.diag_only {
            covar_raw = Array2::from_diag(&covar_raw.diag());
        }

        let lr = self.learning_rate;
        let mut covar = covariance * (F::one() - lr) + covar_raw * lr;
        if self.diag_only {
            covar = Array2::from_diag(&covar.diag());
        } else {
            // products are not evaluated in the same order on both sides of the diagonal
            covar = (&covar + &covar.t()) * F::cast(0.5);
        }
        Zip::from(covar.diag_mut())
            .and(&self.base_level)
            .for_each(|c, &b| *c += b);
        covar
    }
}

impl<F: Float> Updater<F> for UpdaterCovarAdaptation<F> {
    fn weighting(&self) -> Result<Weighting<F>> {
        Weighting::new(self.weighting_method, self.eliteness)
    }

    fn check_dim(&self, dim: usize) -> Result<()> {
        if self.base_level.len() != dim {
            return Err(BboError::DimensionMismatch(format!(
                "base level of size {} given for a distribution of dimension {}",
                self.base_level.len(),
                dim
            )));
        }
        Ok(())
    }

    fn update(
        &self,
        distribution: &DistributionGaussian<F>,
        samples: &ArrayView2<F>,
        costs: &ArrayView1<F>,
    ) -> Result<DistributionUpdate<F>> {
        self.check_dim(distribution.dim())?;
        let (mean, weights) = update_mean(&self.weighting()?, distribution, samples, costs)?;
        let covariance = self.adapt_covariance(distribution.covariance(), samples, &mean, &weights);
        Ok(DistributionUpdate {
            distribution: DistributionGaussian::new(mean, covariance)?,
            weights,
        })
    }
}

/// The set of parameters of [`UpdaterCovarAdaptation`]
#[derive(Clone, Debug)]
pub struct UpdaterCovarAdaptationParams<F: Float>(UpdaterCovarAdaptation<F>);

impl<F: Float> UpdaterCovarAdaptationParams<F> {
    /// Set the weighting method
    pub fn weighting_method(mut self, weighting_method: WeightingMethod) -> Self {
        self.0.weighting_method = weighting_method;
        self
    }

    /// Set the base level of the covariance diagonal
    pub fn base_level(mut self, base_level: Array1<F>) -> Self {
        self.0.base_level = base_level;
        self
    }

    /// Whether only the covariance diagonal is adapted
    pub fn diag_only(mut self, diag_only: bool) -> Self {
        self.0.diag_only = diag_only;
        self
    }

    /// Set the learning rate, should be in (0, 1]
    pub fn learning_rate(mut self, learning_rate: F) -> Self {
        self.0.learning_rate = learning_rate;
        self
    }
}

impl<F: Float> ParamGuard for UpdaterCovarAdaptationParams<F> {
    type Checked = UpdaterCovarAdaptation<F>;
    type Error = BboError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        Weighting::new(self.0.weighting_method, self.0.eliteness)?;
        let lr = self.0.learning_rate;
        if !(lr > F::zero() && lr <= F::one()) {
            return Err(BboError::InvalidConfigError(format!(
                "learning rate should be in (0, 1], got {lr}"
            )));
        }
        if self.0.base_level.is_empty() {
            return Err(BboError::InvalidConfigError(
                "base level should not be empty".to_string(),
            ));
        }
        if self
            .0
            .base_level
            .iter()
            .any(|b| !(*b > F::zero() && b.is_finite()))
        {
            return Err(BboError::InvalidConfigError(format!(
                "base level values should be strictly positive, got {}",
                self.0.base_level
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
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn test_invalid_params() {
        let base_level = array![1e-6, 1e-6];
        for lr in [0., -0.1, 1.1] {
            assert!(matches!(
                UpdaterCovarAdaptation::params(10., base_level.clone())
                    .learning_rate(lr)
                    .check(),
                Err(BboError::InvalidConfigError(_))
            ));
        }
        for base_level in [array![1e-6, 0.], array![1e-6, -1.], Array1::zeros(0)] {
            assert!(matches!(
                UpdaterCovarAdaptation::params(10., base_level).check(),
                Err(BboError::InvalidConfigError(_))
            ));
        }
        assert!(UpdaterCovarAdaptation::params(-10., base_level)
            .check()
            .is_err());
    }

    #[test]
    fn test_deserialize_checks_params() {
        let updater = UpdaterCovarAdaptation::params(10., array![1e-6, 1e-6])
            .learning_rate(0.75)
            .check()
            .unwrap();
        let json = serde_json::to_string(&updater).unwrap();
        let loaded: UpdaterCovarAdaptation<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, updater);

        let invalid = json.replace("0.75", "1.5");
        assert!(serde_json::from_str::<UpdaterCovarAdaptation<f64>>(&invalid).is_err());
    }

    #[test]
    fn test_base_level_dimension_mismatch() {
        let updater = UpdaterCovarAdaptation::params(10., array![1e-6, 1e-6, 1e-6])
            .check()
            .unwrap();
        assert!(updater.check_dim(3).is_ok());
        let distrib = DistributionGaussian::isotropic(array![0., 0.], 1.).unwrap();
        let res = updater.update(
            &distrib,
            &array![[0., 1.], [1., 0.]].view(),
            &array![0., 1.].view(),
        );
        assert!(matches!(res, Err(BboError::DimensionMismatch(_))));
    }

    #[test]
    fn test_weighted_covariance() {
        let updater = UpdaterCovarAdaptation::params(10., array![0.1, 0.1])
            .check()
            .unwrap();
        let distrib = DistributionGaussian::isotropic(array![0., 0.], 1.).unwrap();
        // equal costs: uniform weights, new mean is (1, 1)
        let samples = array![[0., 0.], [2., 2.], [0., 2.], [2., 0.]];
        let costs = array![1., 1., 1., 1.];
        let res = updater
            .update(&distrib, &samples.view(), &costs.view())
            .unwrap();
        assert_abs_diff_eq!(res.distribution.mean().clone(), array![1., 1.], epsilon = 1e-12);
        assert_abs_diff_eq!(
            res.distribution.covariance().clone(),
            array![[1.1, 0.], [0., 1.1]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_learning_rate() {
        let updater = UpdaterCovarAdaptation::params(10., array![1e-6])
            .learning_rate(0.5)
            .check()
            .unwrap();
        let distrib = DistributionGaussian::isotropic(array![0.], 4.).unwrap();
        let samples = array![[-1.], [1.]];
        let costs = array![3., 3.];
        let res = updater
            .update(&distrib, &samples.view(), &costs.view())
            .unwrap();
        // raw estimate is 1, blended with 4
        assert_abs_diff_eq!(
            res.distribution.covariance()[[0, 0]],
            0.5 * 4. + 0.5 * 1. + 1e-6,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_diag_only() {
        let updater = UpdaterCovarAdaptation::params(10., array![1e-6, 1e-6])
            .diag_only(true)
            .learning_rate(0.75)
            .check()
            .unwrap();
        let distrib = DistributionGaussian::isotropic(array![0., 0.], 1.).unwrap();
        // strongly correlated samples
        let samples = array![[-2., -2.1], [-1., -0.9], [0., 0.1], [1., 1.], [2., 1.9]];
        let costs = array![1., 1., 2., 1., 1.];
        let res = updater
            .update(&distrib, &samples.view(), &costs.view())
            .unwrap();
        let covar = res.distribution.covariance();
        assert_eq!(covar[[0, 1]], 0.);
        assert_eq!(covar[[1, 0]], 0.);
        assert!(covar[[0, 0]] > 0.);

        let full = UpdaterCovarAdaptation::params(10., array![1e-6, 1e-6])
            .check()
            .unwrap()
            .update(&distrib, &samples.view(), &costs.view())
            .unwrap();
        assert!(full.distribution.covariance()[[0, 1]] > 1.);
    }

    #[test]
    fn test_positive_diagonal() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let dim = 3;
        for diag_only in [false, true] {
            let updater = UpdaterCovarAdaptation::params(10., Array1::from_elem(dim, 1e-8))
                .diag_only(diag_only)
                .learning_rate(0.75)
                .check()
                .unwrap();
            let distrib = DistributionGaussian::isotropic(Array1::zeros(dim), 1.).unwrap();
            for _ in 0..1000 {
                let samples = Array::random_using((8, dim), Uniform::new(-10., 10.), &mut rng);
                let costs = Array::random_using(8, Uniform::new(0., 1.), &mut rng);
                let res = updater
                    .update(&distrib, &samples.view(), &costs.view())
                    .unwrap();
                let covar = res.distribution.covariance();
                assert!(covar.diag().iter().all(|v| *v > 0.));
                assert_eq!(covar, &covar.t());
            }
        }
    }
}
