use thiserror::Error;

/// Errors raised while configuring, building, or scoring a ZERO++ ensemble.
#[derive(Debug, Error)]
pub enum ZeroError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Subset enumeration size {size} exceeds the limit of {limit}")]
    CapacityExceeded { size: usize, limit: usize },

    #[error("Model build failed: {0}")]
    ModelBuild(String),

    #[error("Scoring failed for record {record}: {reason}")]
    Scoring { record: usize, reason: String },

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Ensemble member {member} failed to build: {source}")]
    EnsembleBuild {
        member: usize,
        #[source]
        source: Box<ZeroError>,
    },

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ZeroError>;

#[cfg(feature = "python")]
impl From<ZeroError> for pyo3::PyErr {
    fn from(err: ZeroError) -> Self {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
