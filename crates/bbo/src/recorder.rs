//! Recording of the generations of an evolution strategy run.
//!
//! A [`Recorder`] is called once at the end of each generation with a read-only
//! [`Generation`] snapshot. Two recorders are provided: [`GenerationHistory`] which keeps
//! everything in memory and [`DirectoryRecorder`] which writes numpy files on disk.
use crate::distribution::DistributionGaussian;
use crate::errors::Result;
use linfa::Float;
use log::debug;
use ndarray::{arr1, Array1, Array2};
use ndarray_npy::{write_npy, WritableElement};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Numpy filename prefix of the initial distribution
pub const DISTRIBUTION_INITIAL: &str = "distribution_initial";

/// Summary of one generation: sample, evaluate, weight, update
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Generation<F: Float> {
    /// Index of the generation, starting from 0
    pub index: usize,
    /// Distribution the samples were drawn from
    pub distribution: DistributionGaussian<F>,
    /// Cost of the distribution mean if evaluated
    pub cost_eval: Option<F>,
    /// Samples as a `(n_samples, d)` matrix
    pub samples: Array2<F>,
    /// Costs of the samples
    pub costs: Array1<F>,
    /// Weights of the samples
    pub weights: Array1<F>,
    /// Distribution resulting from the update
    pub distribution_new: DistributionGaussian<F>,
}

/// A trait for generation recorders
pub trait Recorder<F: Float> {
    /// Record the given generation
    fn record(&mut self, generation: &Generation<F>) -> Result<()>;
}

/// Recorder doing nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRecorder;

impl<F: Float> Recorder<F> for NoRecorder {
    fn record(&mut self, _generation: &Generation<F>) -> Result<()> {
        Ok(())
    }
}

/// In memory history of the generations
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenerationHistory<F: Float> {
    generations: Vec<Generation<F>>,
}

impl<F: Float> GenerationHistory<F> {
    /// Constructor of an empty history
    pub fn new() -> Self {
        GenerationHistory {
            generations: vec![],
        }
    }

    /// Recorded generations in order
    pub fn generations(&self) -> &[Generation<F>] {
        &self.generations
    }

    /// Number of recorded generations
    pub fn len(&self) -> usize {
        self.generations.len()
    }

    /// Whether no generation has been recorded
    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    /// Distribution means along the run as a `(n_generations + 1, d)` matrix
    /// (initial mean first), `None` if nothing was recorded
    pub fn means(&self) -> Option<Array2<F>> {
        let first = self.generations.first()?;
        let dim = first.distribution.dim();
        let mut means = Array2::zeros((self.generations.len() + 1, dim));
        means.row_mut(0).assign(first.distribution.mean());
        for (i, gen) in self.generations.iter().enumerate() {
            means.row_mut(i + 1).assign(gen.distribution_new.mean());
        }
        Some(means)
    }
}

impl<F: Float> Recorder<F> for GenerationHistory<F> {
    fn record(&mut self, generation: &Generation<F>) -> Result<()> {
        self.generations.push(generation.clone());
        Ok(())
    }
}

/// Recorder writing each generation as numpy files in `update%05d` sub-directories.
///
/// For generation `i`, the directory `update{i+1:05}` contains `distribution_mean.npy`,
/// `distribution_covar.npy`, `samples.npy`, `costs.npy`, `weights.npy`,
/// `distribution_new_mean.npy`, `distribution_new_covar.npy` and `cost_eval.npy`
/// when the cost of the mean was evaluated.
#[derive(Clone, Debug)]
pub struct DirectoryRecorder {
    dir: PathBuf,
}

impl DirectoryRecorder {
    /// Constructor creating `dir` if needed and saving the `initial` distribution in it
    pub fn new<F, P>(dir: P, initial: &DistributionGaussian<F>) -> Result<Self>
    where
        F: Float + WritableElement,
        P: AsRef<Path>,
    {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        save_distribution(&dir, DISTRIBUTION_INITIAL, initial)?;
        Ok(DirectoryRecorder { dir })
    }

    /// Root directory of the recording
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory where the given generation index is saved
    pub fn update_dir(&self, index: usize) -> PathBuf {
        self.dir.join(format!("update{:05}", index + 1))
    }
}

fn save_distribution<F: Float + WritableElement>(
    dir: &Path,
    name: &str,
    distribution: &DistributionGaussian<F>,
) -> Result<()> {
    write_npy(dir.join(format!("{name}_mean.npy")), distribution.mean())?;
    write_npy(
        dir.join(format!("{name}_covar.npy")),
        distribution.covariance(),
    )?;
    Ok(())
}

impl<F: Float + WritableElement> Recorder<F> for DirectoryRecorder {
    fn record(&mut self, generation: &Generation<F>) -> Result<()> {
        let dir = self.update_dir(generation.index);
        std::fs::create_dir_all(&dir)?;
        debug!("Save generation {} in {:?}", generation.index, dir);
        save_distribution(&dir, "distribution", &generation.distribution)?;
        write_npy(dir.join("samples.npy"), &generation.samples)?;
        write_npy(dir.join("costs.npy"), &generation.costs)?;
        write_npy(dir.join("weights.npy"), &generation.weights)?;
        save_distribution(&dir, "distribution_new", &generation.distribution_new)?;
        if let Some(cost_eval) = generation.cost_eval {
            write_npy(dir.join("cost_eval.npy"), &arr1(&[cost_eval]))?;
        }
        Ok(())
    }
}
