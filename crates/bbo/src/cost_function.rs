//! Cost functions evaluated by the evolution strategy.
//!
//! A cost function evaluates a whole batch of samples in one go, given as a `(n, d)`
//! matrix, and returns the `n` costs in sample order.
use linfa::Float;
use ndarray::{Array1, ArrayView1, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

/// A trait for functions to be minimized by the evolution strategy.
///
/// Evaluation is expected to be deterministic for a given input.
pub trait CostFunction<F: Float> {
    /// Evaluate the `(n, d)` samples, returning `n` costs
    fn evaluate(&self, samples: &ArrayView2<F>) -> Array1<F>;
}

impl<F: Float, T> CostFunction<F> for T
where
    T: Fn(&ArrayView2<F>) -> Array1<F>,
{
    fn evaluate(&self, samples: &ArrayView2<F>) -> Array1<F> {
        self(samples)
    }
}

/// Adaptor turning a per-sample cost `Fn(&ArrayView1<F>) -> F` into a [`CostFunction`].
///
/// Samples are evaluated in parallel, costs being gathered in sample order.
#[derive(Clone, Debug)]
pub struct RowWise<G>(pub G);

impl<F, G> CostFunction<F> for RowWise<G>
where
    F: Float,
    G: Fn(&ArrayView1<F>) -> F + Sync,
{
    fn evaluate(&self, samples: &ArrayView2<F>) -> Array1<F> {
        let mut costs = Array1::zeros(samples.nrows());
        Zip::from(&mut costs)
            .and(samples.rows())
            .par_for_each(|c, x| *c = (self.0)(&x));
        costs
    }
}

/// Cost function computing the euclidean distance to a given point
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistanceToPoint<F: Float> {
    point: Array1<F>,
}

impl<F: Float> DistanceToPoint<F> {
    /// Constructor given the point to which distance is to be minimized
    pub fn new(point: Array1<F>) -> Self {
        DistanceToPoint { point }
    }

    /// Point to which distance is computed
    pub fn point(&self) -> &Array1<F> {
        &self.point
    }
}

impl<F: Float> CostFunction<F> for DistanceToPoint<F> {
    fn evaluate(&self, samples: &ArrayView2<F>) -> Array1<F> {
        let diff = samples - &self.point;
        diff.mapv(|v| v * v).sum_axis(ndarray::Axis(1)).mapv(|v| v.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_distance_to_point() {
        let cost = DistanceToPoint::new(array![1., 1.]);
        let samples = array![[1., 1.], [4., 5.], [1., 0.]];
        assert_abs_diff_eq!(
            cost.evaluate(&samples.view()),
            array![0., 5., 1.],
            epsilon = 1e-12
        );
    }

    fn sum(x: &ArrayView2<f64>) -> Array1<f64> {
        x.sum_axis(ndarray::Axis(1))
    }

    fn sphere(x: &ArrayView1<f64>) -> f64 {
        argmin_testfunctions::sphere(&x.to_vec())
    }

    #[test]
    fn test_function_cost() {
        let samples = array![[1., 2.], [3., 4.]];
        assert_eq!(sum.evaluate(&samples.view()), array![3., 7.]);
    }

    #[test]
    fn test_row_wise_keeps_order() {
        let cost = RowWise(sphere);
        let samples = Array1::linspace(0., 99., 100).insert_axis(ndarray::Axis(1));
        let costs = cost.evaluate(&samples.view());
        let expected = Array1::linspace(0., 99., 100).mapv(|v| v * v);
        assert_abs_diff_eq!(costs, expected, epsilon = 1e-9);
    }
}
