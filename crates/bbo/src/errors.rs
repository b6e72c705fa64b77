use thiserror::Error;

/// A result type for evolution strategy optimization
pub type Result<T> = std::result::Result<T, BboError>;

/// An error for black-box optimization with evolution strategies
#[derive(Error, Debug)]
pub enum BboError {
    /// When configuration is invalid (raised before any sampling occurs)
    #[error("Invalid configuration: {0}")]
    InvalidConfigError(String),
    /// When shapes of distribution, samples, costs or weights do not match
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// When the search distribution or the weighting loses its numerical validity
    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),
    /// When the generation recorder fails
    #[error("Recorder failed at generation {generation}: {source}")]
    RecorderError {
        /// Index of the generation being recorded
        generation: usize,
        /// Underlying recorder failure
        #[source]
        source: Box<BboError>,
    },
    /// When linear algebra computation fails
    #[error(transparent)]
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When IO fails
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// When numpy array read fails
    #[error("Npy read error: {0}")]
    ReadNpyError(#[from] ndarray_npy::ReadNpyError),
    /// When numpy array write fails
    #[error("Npy write error: {0}")]
    WriteNpyError(#[from] ndarray_npy::WriteNpyError),
    /// When json (de)serialization fails
    #[error("Json error: {0}")]
    JsonError(#[from] serde_json::Error),
}
