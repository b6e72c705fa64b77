//! Cost to weight transform used by the updaters.
use crate::errors::{BboError, Result};
use linfa::Float;
use ndarray::{Array1, ArrayBase, Data, Ix1};
use ndarray_stats::QuantileExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tolerance used to check that weights sum to one
pub const WEIGHTS_SUM_TOLERANCE: f64 = 1e-6;

/// Weighting method used to turn costs into weights
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeightingMethod {
    /// Exponential weighting of the normalized costs (identifier `"PI-BB"`)
    #[default]
    #[serde(rename = "PI-BB")]
    PiBb,
}

impl WeightingMethod {
    /// Identifier of the weighting method
    pub fn name(&self) -> &'static str {
        match self {
            WeightingMethod::PiBb => "PI-BB",
        }
    }
}

impl fmt::Display for WeightingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for WeightingMethod {
    type Err = BboError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PI-BB" => Ok(WeightingMethod::PiBb),
            _ => Err(BboError::InvalidConfigError(format!(
                "Unknown weighting method '{s}' (expected 'PI-BB')"
            ))),
        }
    }
}

/// Weighting function: maps a batch of costs to non-negative weights summing to one.
///
/// `eliteness` controls how sharply low-cost samples are favored.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WeightingRaw<F>")]
pub struct Weighting<F: Float> {
    method: WeightingMethod,
    eliteness: F,
}

#[derive(Deserialize)]
struct WeightingRaw<F: Float> {
    method: WeightingMethod,
    eliteness: F,
}

impl<F: Float> TryFrom<WeightingRaw<F>> for Weighting<F> {
    type Error = BboError;

    fn try_from(raw: WeightingRaw<F>) -> Result<Self> {
        Weighting::new(raw.method, raw.eliteness)
    }
}

impl<F: Float> Weighting<F> {
    /// Constructor, fails when `eliteness` is not strictly positive
    pub fn new(method: WeightingMethod, eliteness: F) -> Result<Self> {
        if !(eliteness > F::zero() && eliteness.is_finite()) {
            return Err(BboError::InvalidConfigError(format!(
                "eliteness should be strictly positive, got {eliteness}"
            )));
        }
        Ok(Weighting { method, eliteness })
    }

    /// Weighting method
    pub fn method(&self) -> WeightingMethod {
        self.method
    }

    /// Eliteness parameter
    pub fn eliteness(&self) -> F {
        self.eliteness
    }

    /// Compute the weights of the given `costs`, index aligned with them.
    ///
    /// For PI-BB, costs are normalized into `[0, 1]` then weighted with
    /// `exp(-eliteness * normalized_cost)`, weights being then normalized to sum to one.
    /// When all costs are equal all weights are equal to `1/n`.
    pub fn weights(&self, costs: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<Array1<F>> {
        if costs.is_empty() {
            return Err(BboError::DimensionMismatch(
                "cannot compute weights of an empty cost batch".to_string(),
            ));
        }
        if costs.iter().any(|c| !c.is_finite()) {
            return Err(BboError::NumericalDegeneracy(format!(
                "costs should be finite, got {costs}"
            )));
        }
        let weights = match self.method {
            WeightingMethod::PiBb => {
                // finite values are totally ordered
                let min = *costs.min().map_err(|e| {
                    BboError::NumericalDegeneracy(format!("min cost not available: {e}"))
                })?;
                let max = *costs.max().map_err(|e| {
                    BboError::NumericalDegeneracy(format!("max cost not available: {e}"))
                })?;
                // halved bounds keep the range finite for any finite costs
                let half = F::cast(0.5);
                let (min, max) = (min * half, max * half);
                let range = max - min;
                if range == F::zero() {
                    Array1::ones(costs.len())
                } else {
                    costs.mapv(|c| (-self.eliteness * (c * half - min) / range).exp())
                }
            }
        };
        let sum = weights.sum();
        Ok(weights / sum)
    }
}

/// Check weights are finite, non-negative and sum to one up to [`WEIGHTS_SUM_TOLERANCE`]
pub(crate) fn check_weights<F: Float>(weights: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Result<()> {
    let sum = weights.sum();
    let sum_ok = (sum - F::one()).abs() <= F::cast(WEIGHTS_SUM_TOLERANCE);
    if !sum_ok || weights.iter().any(|w| !w.is_finite() || *w < F::zero()) {
        return Err(BboError::NumericalDegeneracy(format!(
            "weights should be non-negative and sum to 1, got sum = {sum}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use ndarray_stats::QuantileExt;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn test_weighting_method_from_str() {
        assert_eq!(
            "PI-BB".parse::<WeightingMethod>().unwrap(),
            WeightingMethod::PiBb
        );
        assert_eq!(WeightingMethod::PiBb.to_string(), "PI-BB");
        assert!(matches!(
            "CMA-ES".parse::<WeightingMethod>(),
            Err(BboError::InvalidConfigError(_))
        ));
    }

    #[test]
    fn test_invalid_eliteness() {
        for eliteness in [0., -1., f64::NAN] {
            let res = Weighting::new(WeightingMethod::PiBb, eliteness);
            assert!(matches!(res, Err(BboError::InvalidConfigError(_))));
        }
    }

    #[test]
    fn test_equal_costs() {
        let weighting = Weighting::new(WeightingMethod::PiBb, 10.).unwrap();
        let weights = weighting.weights(&array![3., 3., 3., 3.]).unwrap();
        assert_abs_diff_eq!(weights, Array1::from_elem(4, 0.25), epsilon = 1e-12);
    }

    #[test]
    fn test_pibb_weights() {
        let weighting = Weighting::new(WeightingMethod::PiBb, 10.).unwrap();
        let costs = array![1., 0., 0.5];
        let weights = weighting.weights(&costs).unwrap();
        let expected = array![(-10f64).exp(), 1., (-5f64).exp()];
        let expected = &expected / expected.sum();
        assert_abs_diff_eq!(weights, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_weights_properties() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        for eliteness in [0.1, 1., 10., 100.] {
            let weighting = Weighting::new(WeightingMethod::PiBb, eliteness).unwrap();
            for _ in 0..100 {
                let costs = Array::random_using(12, Uniform::new(-100., 100.), &mut rng);
                let weights = weighting.weights(&costs).unwrap();
                assert_eq!(weights.len(), costs.len());
                assert_abs_diff_eq!(weights.sum(), 1., epsilon = 1e-9);
                assert!(weights.iter().all(|w| *w >= 0.));
                // unique minimum cost gets the largest weight
                assert_eq!(costs.argmin().unwrap(), weights.argmax().unwrap());
                check_weights(&weights).unwrap();
            }
        }
    }

    #[test]
    fn test_eliteness_sharpens_weights() {
        let costs = array![0., 1., 2., 3.];
        let soft = Weighting::new(WeightingMethod::PiBb, 1.)
            .unwrap()
            .weights(&costs)
            .unwrap();
        let sharp = Weighting::new(WeightingMethod::PiBb, 20.)
            .unwrap()
            .weights(&costs)
            .unwrap();
        assert!(sharp[0] > soft[0]);
        assert!(sharp[3] < soft[3]);
    }

    #[test]
    fn test_invalid_costs() {
        let weighting = Weighting::new(WeightingMethod::PiBb, 10.).unwrap();
        let res = weighting.weights(&Array1::<f64>::zeros(0));
        assert!(matches!(res, Err(BboError::DimensionMismatch(_))));
        let res = weighting.weights(&array![1., f64::NAN]);
        assert!(matches!(res, Err(BboError::NumericalDegeneracy(_))));
    }

    #[test]
    fn test_extreme_cost_range() {
        let weighting = Weighting::new(WeightingMethod::PiBb, 10.).unwrap();
        let weights = weighting.weights(&array![-1e308, 0., 1e308]).unwrap();
        assert!(weights.iter().all(|w: &f64| w.is_finite()));
        check_weights(&weights).unwrap();
        let expected = array![1., (-5f64).exp(), (-10f64).exp()];
        let expected = &expected / expected.sum();
        assert_abs_diff_eq!(weights, expected, epsilon = 1e-12);

        let weights = weighting.weights(&array![f64::MAX, -f64::MAX]).unwrap();
        assert!(weights[1] > weights[0]);
        check_weights(&weights).unwrap();
    }

    #[test]
    fn test_deserialize_checks_eliteness() {
        let res = serde_json::from_str::<Weighting<f64>>(r#"{"method":"PI-BB","eliteness":-1.0}"#);
        assert!(res.is_err());
        let weighting: Weighting<f64> =
            serde_json::from_str(r#"{"method":"PI-BB","eliteness":10.0}"#).unwrap();
        assert_eq!(weighting.eliteness(), 10.);
    }

    #[test]
    fn test_check_weights() {
        assert!(check_weights(&array![0.5, 0.5]).is_ok());
        assert!(check_weights(&array![0.5, 0.6]).is_err());
        assert!(check_weights(&array![1.5, -0.5]).is_err());
        assert!(check_weights(&array![f64::NAN, f64::NAN]).is_err());
        assert!(check_weights(&array![f64::INFINITY, 0.]).is_err());
    }
}
