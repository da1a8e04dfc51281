use ndarray::{ArrayView1, ArrayView2};

use crate::error::Result;

/// A common trait for batch anomaly models that score records against the
/// data they were built from.
pub trait BaseModel {
    /// Score one record; `index` identifies it in errors.
    fn score_record(&self, index: usize, record: ArrayView1<'_, f64>) -> Result<f64>;

    /// Default: score every row of a batch.
    fn score(&self, records: ArrayView2<'_, f64>) -> Vec<Result<f64>> {
        records
            .outer_iter()
            .enumerate()
            .map(|(i, record)| self.score_record(i, record))
            .collect()
    }
}
