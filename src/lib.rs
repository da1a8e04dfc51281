//! ZERO++: anomaly detection by counting zero appearances of attribute
//! combinations across an ensemble of small random subsamples.

pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod utils;

#[cfg(feature = "python")]
mod python;

pub use config::{WindowMode, ZeroConfig};
pub use dataset::{Attribute, AttributeKind, Dataset, SchemaKind};
pub use error::{Result, ZeroError};
pub use models::base_model::BaseModel;
pub use models::ensemble::{Ensemble, EnsembleCoordinator, Evaluation, ScoreTable, ScoringFailure};
pub use models::scorer::SupportScorer;
pub use models::subspace::{AttributeOrder, SubspaceModel, SubspaceModelBuilder};
pub use utils::parallel::ParallelSettings;

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// A Python module implemented in Rust.
#[cfg(feature = "python")]
#[pymodule]
fn zeropp_rust(_py: Python, m: &PyModule) -> PyResult<()> {
    // ZERO++:
    m.add_class::<python::ZeroPlusPlus>()?;
    Ok(())
}
