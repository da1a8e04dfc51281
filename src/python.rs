use numpy::{PyArray1, PyArray2};
use pyo3::prelude::*;

use crate::config::ZeroConfig;
use crate::dataset::{infer_attributes, Dataset};
use crate::models::ensemble::EnsembleCoordinator;
use crate::utils::evaluation;

/// Python-exposed wrapper around EnsembleCoordinator
#[pyclass(name = "ZeroPlusPlus")]
pub struct ZeroPlusPlus {
    inner: EnsembleCoordinator,
}

#[pymethods]
impl ZeroPlusPlus {
    #[new]
    #[pyo3(signature = (
        num_trees=50,
        subsample_size=8,
        subspace_dimension=2,
        num_runs=10,
        base_seed=1,
        num_threads=0
    ))]
    fn new(
        num_trees: usize,
        subsample_size: usize,
        subspace_dimension: usize,
        num_runs: usize,
        base_seed: u64,
        num_threads: usize,
    ) -> PyResult<Self> {
        let config = ZeroConfig::default()
            .with_num_trees(num_trees)
            .with_subsample_size(subsample_size)
            .with_subspace_dimension(subspace_dimension)
            .with_num_runs(num_runs)
            .with_base_seed(base_seed)
            .with_num_threads(num_threads);
        Ok(ZeroPlusPlus {
            inner: EnsembleCoordinator::new(config)?,
        })
    }

    /// Averaged support score of every row of `x`; `NaN` for rows that
    /// could not be scored.
    #[pyo3(signature = (x, categorical=None, labels=None))]
    fn fit_score<'py>(
        &self,
        py: Python<'py>,
        x: &PyArray2<f64>,
        categorical: Option<Vec<usize>>,
        labels: Option<Vec<f64>>,
    ) -> PyResult<&'py PyArray1<f64>> {
        let readonly = x.readonly();
        let values = readonly.as_array();
        let attributes = infer_attributes(values, &categorical.unwrap_or_default())?;
        let labels = labels.unwrap_or_else(|| vec![f64::NAN; values.nrows()]);
        let dataset = Dataset::new(attributes, values.to_owned(), labels)?;

        let table = py.allow_threads(|| self.inner.fit_score(&dataset))?;
        Ok(PyArray1::from_vec(py, table.to_vec()))
    }

    /// AUC of `scores` against 0/1 `labels`, lower scores being anomalous.
    #[staticmethod]
    fn auc(labels: Vec<f64>, scores: Vec<f64>) -> Option<f64> {
        evaluation::auc(&labels, &scores)
    }
}
