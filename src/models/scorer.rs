use ndarray::ArrayView1;

use crate::error::{Result, ZeroError};
use crate::models::base_model::BaseModel;
use crate::models::subspace::SubspaceModel;

/// Scores a record against one subspace model by its zero appearances.
pub struct SupportScorer;

impl SupportScorer {
    /// Number of windows whose observed values do not support `record`.
    pub fn unsupported(model: &SubspaceModel, record: ArrayView1<'_, f64>) -> usize {
        model
            .windows()
            .iter()
            .filter(|w| !w.model.supports(record))
            .count()
    }

    /// `1 - unsupported / windows`, in `[0, 1]`; higher means more typical.
    pub fn score(model: &SubspaceModel, index: usize, record: ArrayView1<'_, f64>) -> Result<f64> {
        model
            .check_record(record)
            .map_err(|reason| ZeroError::Scoring {
                record: index,
                reason,
            })?;
        let total = model.num_windows();
        if total == 0 {
            return Err(ZeroError::Scoring {
                record: index,
                reason: "model has no windows".to_string(),
            });
        }
        let unsupported = Self::unsupported(model, record);
        Ok(1.0 - unsupported as f64 / total as f64)
    }
}

impl BaseModel for SubspaceModel {
    fn score_record(&self, index: usize, record: ArrayView1<'_, f64>) -> Result<f64> {
        SupportScorer::score(self, index, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowMode;
    use crate::dataset::{Attribute, Dataset};
    use crate::models::subspace::{AttributeOrder, SubspaceModelBuilder};
    use crate::utils::sampling::Subsample;
    use ndarray::array;

    fn all_rows(n: usize) -> Subsample {
        Subsample {
            positions: (0..n).collect(),
            seed: 0,
        }
    }

    fn categorical_model(width: usize) -> SubspaceModel {
        let attributes: Vec<Attribute> = (0..3)
            .map(|i| Attribute::categorical(format!("c{}", i), vec!["0", "1"]))
            .collect();
        let rows = vec![vec![0.0; 3]; 4];
        let ds = Dataset::from_rows(attributes.clone(), &rows, vec![0.0; 4]).unwrap();
        SubspaceModelBuilder::new(&attributes, width, WindowMode::Sliding)
            .unwrap()
            .build(&ds, &all_rows(4), AttributeOrder::identity(3))
            .unwrap()
    }

    #[test]
    fn test_categorical_single_attribute_windows() {
        let model = categorical_model(1);
        let typical = SupportScorer::score(&model, 0, array![0.0, 0.0, 0.0].view()).unwrap();
        let one_off = SupportScorer::score(&model, 1, array![0.0, 1.0, 0.0].view()).unwrap();
        let all_off = SupportScorer::score(&model, 2, array![1.0, 1.0, 1.0].view()).unwrap();
        assert_eq!(typical, 1.0);
        assert!((one_off - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(all_off, 0.0);
    }

    #[test]
    fn test_pairs_count_each_deviation_twice() {
        let model = categorical_model(2);
        assert_eq!(SupportScorer::unsupported(&model, array![0.0, 1.0, 0.0].view()), 2);
        let score = SupportScorer::score(&model, 0, array![0.0, 1.0, 0.0].view()).unwrap();
        assert!((score - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_numeric_scores() {
        let attributes = vec![Attribute::numeric("x")];
        let rows = [vec![-1.0], vec![0.0], vec![1.0]];
        let ds = Dataset::from_rows(attributes.clone(), &rows, vec![0.0; 3]).unwrap();
        let model = SubspaceModelBuilder::new(&attributes, 1, WindowMode::Sliding)
            .unwrap()
            .build(&ds, &all_rows(3), AttributeOrder::identity(1))
            .unwrap();
        assert_eq!(model.score_record(0, array![10.0].view()).unwrap(), 0.0);
        assert_eq!(model.score_record(0, array![0.5].view()).unwrap(), 1.0);
    }

    #[test]
    fn test_incompatible_record_is_scoring_failure() {
        let model = categorical_model(1);
        let err = SupportScorer::score(&model, 7, array![0.0, 0.0].view()).unwrap_err();
        assert!(matches!(err, ZeroError::Scoring { record: 7, .. }));
        let err = SupportScorer::score(&model, 3, array![0.0, 5.0, 0.0].view()).unwrap_err();
        assert!(matches!(err, ZeroError::Scoring { record: 3, .. }));
    }

    #[test]
    fn test_batch_scoring_keeps_failures_per_record() {
        let model = categorical_model(1);
        let batch = array![[0.0, 0.0, 0.0], [0.0, 9.0, 0.0], [1.0, 1.0, 1.0]];
        let scores = model.score(batch.view());
        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0].as_ref().ok(), Some(&1.0));
        assert!(matches!(scores[1], Err(ZeroError::Scoring { record: 1, .. })));
        assert_eq!(scores[2].as_ref().ok(), Some(&0.0));
    }
}
