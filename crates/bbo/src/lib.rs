//! This library implements black-box optimization with evolution strategies,
//! a family of derivative-free optimization methods where a Gaussian search distribution
//! is iteratively moved and reshaped toward low cost regions of the search space.
//!
//! At each generation, samples are drawn from the current distribution, evaluated in one
//! batch by the cost function, turned into weights (the lower the cost, the higher the
//! weight) and the distribution is updated from the weighted samples.
//!
//! The library comes with:
//! * a [Gaussian search distribution](DistributionGaussian) with reproducible sampling,
//! * the PI-BB [weighting](Weighting) of the costs,
//! * three distribution [updaters](updaters): mean only, covariance decay and covariance adaptation,
//! * an [optimizer](Evolution) running a fixed number of generations,
//! * an [ask-and-tell service](EvolutionService) leaving the cost evaluation to the caller,
//! * generation [recorders](Recorder) to keep the history in memory or save it as numpy files.
//!
//! # Example
//!
//! ```
//! use ndarray::{array, Array1, ArrayView2, Axis};
//! use linfa::ParamGuard;
//! use evobox_bbo::{DistributionGaussian, EvolutionBuilder, UpdaterCovarAdaptation};
//!
//! // Sphere function evaluated on a batch of points
//! fn sphere(x: &ArrayView2<f64>) -> Array1<f64> {
//!     x.mapv(|v| v * v).sum_axis(Axis(1))
//! }
//!
//! let initial = DistributionGaussian::isotropic(array![5., 5.], 4.)
//!     .expect("valid distribution");
//! let updater = UpdaterCovarAdaptation::params(10., array![1e-6, 1e-6])
//!     .learning_rate(0.75)
//!     .check()
//!     .expect("valid updater");
//! let res = EvolutionBuilder::optimize(sphere)
//!     .configure(|config| config.n_updates(40).n_samples_per_update(10).seed(42))
//!     .min_from(initial, updater)
//!     .expect("optimizer configured")
//!     .run()
//!     .expect("sphere minimized");
//! println!("Final distribution mean = {}", res.distribution.mean());
//! ```
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod cost_function;
mod distribution;
mod errors;
mod optimizer;
mod recorder;
mod service;
pub mod updaters;
mod weighting;

pub use cost_function::*;
pub use distribution::*;
pub use errors::*;
pub use optimizer::*;
pub use recorder::*;
pub use service::*;
pub use updaters::*;
pub use weighting::*;

/// Env variable to set logging level (`error`, `warn`, `info`, `debug`...)
pub const EVOBOX_LOG: &str = "EVOBOX_LOG";
