//! Gaussian search distribution of the evolution strategy.
//!
//! A [`DistributionGaussian`] is an immutable value: updaters produce a new one
//! at each generation. Sampling goes through a [`GaussianSampler`] which holds the
//! covariance factorization for the duration of one generation.
use crate::errors::{BboError, Result};
use linfa::Float;
use linfa_linalg::eigh::*;
use log::warn;
use ndarray::{Array, Array1, Array2, ArrayView1};
use ndarray_rand::rand::Rng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use serde::{Deserialize, Serialize};

/// Relative tolerance under which negative eigenvalues are considered as round-off
pub const EIGEN_TOLERANCE: f64 = 1e-9;

/// Multivariate normal distribution `N(mean, covariance)` over `R^d`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DistributionGaussianRaw<F>")]
pub struct DistributionGaussian<F: Float> {
    mean: Array1<F>,
    covariance: Array2<F>,
}

/// Unchecked serialized form, deserialization goes through [`DistributionGaussian::new`]
#[derive(Deserialize)]
struct DistributionGaussianRaw<F: Float> {
    mean: Array1<F>,
    covariance: Array2<F>,
}

impl<F: Float> TryFrom<DistributionGaussianRaw<F>> for DistributionGaussian<F> {
    type Error = BboError;

    fn try_from(raw: DistributionGaussianRaw<F>) -> Result<Self> {
        DistributionGaussian::new(raw.mean, raw.covariance)
    }
}

impl<F: Float> DistributionGaussian<F> {
    /// Constructor given a mean vector `(d,)` and a covariance matrix `(d, d)`.
    ///
    /// Fails with [`BboError::DimensionMismatch`] when shapes are inconsistent and with
    /// [`BboError::NumericalDegeneracy`] when values are not finite or when
    /// the covariance is not symmetric.
    pub fn new(mean: Array1<F>, covariance: Array2<F>) -> Result<Self> {
        if covariance.nrows() != covariance.ncols() || mean.len() != covariance.nrows() {
            return Err(BboError::DimensionMismatch(format!(
                "mean of size {} incompatible with covariance of shape {:?}",
                mean.len(),
                covariance.shape()
            )));
        }
        if mean.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
            return Err(BboError::NumericalDegeneracy(
                "distribution holds non finite values".to_string(),
            ));
        }
        let tol = F::cast(EIGEN_TOLERANCE);
        for i in 0..covariance.nrows() {
            for j in 0..i {
                let (a, b) = (covariance[[i, j]], covariance[[j, i]]);
                if (a - b).abs() > tol * (F::one() + a.abs().max(b.abs())) {
                    return Err(BboError::NumericalDegeneracy(format!(
                        "covariance is not symmetric at ({i}, {j}): {a} != {b}"
                    )));
                }
            }
        }
        Ok(DistributionGaussian { mean, covariance })
    }

    /// Isotropic distribution centered on `mean` with covariance `variance * I`
    pub fn isotropic(mean: Array1<F>, variance: F) -> Result<Self> {
        let dim = mean.len();
        Self::new(mean, Array2::eye(dim) * variance)
    }

    /// Dimension `d` of the search space
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Mean of the distribution
    pub fn mean(&self) -> &Array1<F> {
        &self.mean
    }

    /// Covariance of the distribution
    pub fn covariance(&self) -> &Array2<F> {
        &self.covariance
    }

    /// Largest eigenvalue of the covariance, i.e. the squared radius of the
    /// widest principal axis of the distribution
    pub fn max_eigen_value(&self) -> Result<F> {
        let (eigvals, _) = self.covariance.to_owned().eigh_into()?;
        Ok(eigvals.fold(F::neg_infinity(), |acc, &v| acc.max(v)))
    }

    /// Factorize the covariance to get a sampler for the current generation.
    ///
    /// The factorization `L` is such that `L.L^t = covariance`. It is obtained through
    /// an eigendecomposition so that positive semi-definite covariances are supported.
    /// Fails with [`BboError::NumericalDegeneracy`] if the covariance is not positive
    /// semi-definite.
    pub fn sampler(&self) -> Result<GaussianSampler<'_, F>> {
        let (eigvals, eigvecs) = self.covariance.to_owned().eigh_into()?;
        let max_abs = eigvals.fold(F::zero(), |acc, &v| acc.max(v.abs()));
        let tol = F::cast(EIGEN_TOLERANCE) * F::one().max(max_abs);
        let min = eigvals.fold(F::infinity(), |acc, &v| acc.min(v));
        if min < -tol {
            return Err(BboError::NumericalDegeneracy(format!(
                "covariance is not positive semi-definite (min eigenvalue = {min})"
            )));
        }
        if min < F::zero() {
            warn!("Clip covariance eigenvalue {min} to zero");
        }
        let sqrt_vals = eigvals.mapv(|v| if v > F::zero() { v.sqrt() } else { F::zero() });
        // scale each eigenvector column by the square root of its eigenvalue
        let factor = &eigvecs * &sqrt_vals;
        Ok(GaussianSampler {
            mean: self.mean.view(),
            factor,
        })
    }

    /// Draw `n_samples` i.i.d. samples as a `(n_samples, d)` matrix.
    ///
    /// Shortcut for `self.sampler()?.sample(n_samples, rng)`.
    pub fn sample<R: Rng + ?Sized>(&self, n_samples: usize, rng: &mut R) -> Result<Array2<F>> {
        Ok(self.sampler()?.sample(n_samples, rng))
    }
}

/// Sampler holding the covariance factorization of a [`DistributionGaussian`].
///
/// It borrows the distribution it comes from and is meant to be dropped at the
/// end of the generation.
#[derive(Debug)]
pub struct GaussianSampler<'a, F: Float> {
    mean: ArrayView1<'a, F>,
    factor: Array2<F>,
}

impl<F: Float> GaussianSampler<'_, F> {
    /// Draw `n_samples` i.i.d. samples as a `(n_samples, d)` matrix
    pub fn sample<R: Rng + ?Sized>(&self, n_samples: usize, rng: &mut R) -> Array2<F> {
        let z: Array2<f64> = Array::random_using((n_samples, self.mean.len()), StandardNormal, rng);
        let z = z.mapv(|v| F::cast(v));
        z.dot(&self.factor.t()) + &self.mean
    }

    /// Factor `L` of the covariance such that `L.L^t = covariance`
    pub fn factor(&self) -> &Array2<F> {
        &self.factor
    }
}
