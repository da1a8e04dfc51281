//! One ensemble member: a randomized attribute order and one window model per
//! window, all fitted on a single subsample.

use ndarray::ArrayView1;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::WindowMode;
use crate::dataset::{category_code, Attribute, Dataset, SchemaKind};
use crate::error::{Result, ZeroError};
use crate::models::window::{
    ConditionalNumericSamples, JointFrequencyTable, NumericStats, WindowModel,
};
use crate::utils::combinations::{check_capacity, OrderedSubsets};
use crate::utils::sampling::Subsample;
use crate::utils::stats::ColumnStatistic;

/// Width of the neighbour pairs modelled for mixed data.
pub const MIXED_WINDOW_WIDTH: usize = 2;

/// A permutation of the attribute indices, read cyclically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeOrder(Vec<usize>);

impl AttributeOrder {
    pub fn identity(n: usize) -> Self {
        AttributeOrder((0..n).collect())
    }

    /// Fisher-Yates shuffle of `0..n`.
    pub fn shuffled<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        AttributeOrder(order)
    }

    pub fn from_vec(order: Vec<usize>) -> Result<Self> {
        let mut seen = vec![false; order.len()];
        for &a in &order {
            if a >= order.len() || seen[a] {
                return Err(ZeroError::ModelBuild(format!(
                    "{:?} is not a permutation of the attribute indices",
                    order
                )));
            }
            seen[a] = true;
        }
        Ok(AttributeOrder(order))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Attribute indices of the window starting at `start`, wrapping around.
    pub fn window(&self, start: usize, width: usize) -> Vec<usize> {
        (0..width).map(|o| self.0[(start + o) % self.0.len()]).collect()
    }
}

/// Schema fingerprint kept by a model to reject incompatible records:
/// `None` for numeric attributes, the domain size for categorical ones.
pub type DomainSizes = Vec<Option<usize>>;

/// One window of a subspace model.
#[derive(Debug, Clone)]
pub struct Window {
    pub attributes: Vec<usize>,
    pub model: WindowModel,
}

/// Windows and statistics of one ensemble member.
#[derive(Debug, Clone)]
pub struct SubspaceModel {
    order: AttributeOrder,
    schema: SchemaKind,
    subsample_size: usize,
    domains: DomainSizes,
    windows: Vec<Window>,
}

impl SubspaceModel {
    pub fn order(&self) -> &AttributeOrder {
        &self.order
    }

    pub fn schema(&self) -> SchemaKind {
        self.schema
    }

    pub fn subsample_size(&self) -> usize {
        self.subsample_size
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn num_windows(&self) -> usize {
        self.windows.len()
    }

    /// Checks that `record` matches the schema the model was built from.
    pub fn check_record(&self, record: ArrayView1<'_, f64>) -> std::result::Result<(), String> {
        if record.len() != self.domains.len() {
            return Err(format!(
                "record has {} values, model expects {}",
                record.len(),
                self.domains.len()
            ));
        }
        for (a, size) in self.domains.iter().enumerate() {
            if let Some(size) = size {
                category_code(record[a], *size)
                    .map_err(|reason| format!("attribute {}: {}", a, reason))?;
            }
        }
        Ok(())
    }
}

/// Builds subspace models for one dataset schema.
#[derive(Debug, Clone)]
pub struct SubspaceModelBuilder {
    schema: SchemaKind,
    width: usize,
    mode: WindowMode,
    domains: DomainSizes,
}

impl SubspaceModelBuilder {
    pub fn new(attributes: &[Attribute], width: usize, mode: WindowMode) -> Result<Self> {
        let schema = SchemaKind::of(attributes)?;
        if width == 0 {
            return Err(ZeroError::Configuration(
                "subspace dimension must be positive".to_string(),
            ));
        }
        if mode == WindowMode::Combinatorial && schema == SchemaKind::Mixed {
            return Err(ZeroError::Configuration(
                "combinatorial windows need all-numeric or all-categorical data".to_string(),
            ));
        }
        let width = if width > attributes.len() {
            tracing::warn!(
                "Subspace dimension {} exceeds {} attributes, using {}",
                width,
                attributes.len(),
                attributes.len()
            );
            attributes.len()
        } else {
            width
        };
        if mode == WindowMode::Combinatorial {
            // fail before any member is built
            check_capacity(attributes.len(), width)?;
        }
        Ok(Self {
            schema,
            width,
            mode,
            domains: attributes.iter().map(Attribute::domain_size).collect(),
        })
    }

    pub fn schema(&self) -> SchemaKind {
        self.schema
    }

    /// Effective window width after clamping.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn build(
        &self,
        dataset: &Dataset,
        subsample: &Subsample,
        order: AttributeOrder,
    ) -> Result<SubspaceModel> {
        if subsample.is_empty() {
            return Err(ZeroError::ModelBuild("empty subsample".to_string()));
        }
        if order.len() != self.domains.len() || dataset.num_attributes() != self.domains.len() {
            return Err(ZeroError::ModelBuild(format!(
                "attribute order covers {} attributes, dataset has {}",
                order.len(),
                dataset.num_attributes()
            )));
        }

        let rows: Vec<ArrayView1<'_, f64>> = subsample
            .positions
            .iter()
            .map(|&p| dataset.record(p))
            .collect();
        let columns = self.column_statistics(&rows);

        let windows = match (self.mode, self.schema) {
            (WindowMode::Sliding, SchemaKind::Mixed) => self.mixed_windows(&order, &rows, &columns),
            (WindowMode::Sliding, _) => {
                let spans = (0..order.len()).map(|i| order.window(i, self.width)).collect();
                self.homogeneous_windows(spans, &rows, &columns)
            }
            (WindowMode::Combinatorial, _) => {
                let mut subsets = OrderedSubsets::new(order.as_slice().to_vec())?;
                let spans = subsets.subsets(self.width)?.to_vec();
                self.homogeneous_windows(spans, &rows, &columns)
            }
        };

        Ok(SubspaceModel {
            order,
            schema: self.schema,
            subsample_size: subsample.len(),
            domains: self.domains.clone(),
            windows,
        })
    }

    /// Subsample statistics of every numeric attribute, computed once and
    /// shared by all windows that contain the attribute.
    fn column_statistics(&self, rows: &[ArrayView1<'_, f64>]) -> Vec<Option<ColumnStatistic>> {
        self.domains
            .iter()
            .enumerate()
            .map(|(a, size)| {
                size.is_none().then(|| {
                    let mut stat = ColumnStatistic::new();
                    for row in rows {
                        stat.update(row[a]);
                    }
                    stat
                })
            })
            .collect()
    }

    fn homogeneous_windows(
        &self,
        spans: Vec<Vec<usize>>,
        rows: &[ArrayView1<'_, f64>],
        columns: &[Option<ColumnStatistic>],
    ) -> Vec<Window> {
        spans
            .into_iter()
            .map(|attributes| {
                let model = match self.schema {
                    SchemaKind::Categorical => WindowModel::Joint(JointFrequencyTable::build(
                        attributes.clone(),
                        rows.iter().copied(),
                    )),
                    _ => WindowModel::Numeric(NumericStats::build(attributes.clone(), columns)),
                };
                Window { attributes, model }
            })
            .collect()
    }

    /// Neighbour pairs `(order[i], order[i + 1])`, wrapping around.
    fn mixed_windows(
        &self,
        order: &AttributeOrder,
        rows: &[ArrayView1<'_, f64>],
        columns: &[Option<ColumnStatistic>],
    ) -> Vec<Window> {
        (0..order.len())
            .map(|i| {
                let attributes = order.window(i, MIXED_WINDOW_WIDTH.min(order.len()));
                let first = attributes[0];
                let second = *attributes.last().unwrap_or(&first);
                let numeric_std = |a: usize| columns[a].as_ref().map_or(0.0, ColumnStatistic::std);

                let model = match (columns[first].is_some(), columns[second].is_some()) {
                    (true, true) => {
                        WindowModel::Numeric(NumericStats::build(attributes.clone(), columns))
                    }
                    (true, false) => WindowModel::Conditional(ConditionalNumericSamples::build(
                        vec![second],
                        first,
                        numeric_std(first),
                        rows.iter().copied(),
                    )),
                    (false, true) => WindowModel::Conditional(ConditionalNumericSamples::build(
                        vec![first],
                        second,
                        numeric_std(second),
                        rows.iter().copied(),
                    )),
                    (false, false) => WindowModel::Joint(JointFrequencyTable::build(
                        attributes.clone(),
                        rows.iter().copied(),
                    )),
                };
                Window { attributes, model }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn subsample_of(n: usize) -> Subsample {
        Subsample {
            positions: (0..n).collect(),
            seed: 0,
        }
    }

    fn mixed_dataset() -> Dataset {
        Dataset::from_rows(
            vec![
                Attribute::numeric("x"),
                Attribute::categorical("c", vec!["a", "b"]),
                Attribute::numeric("y"),
                Attribute::categorical("d", vec!["p", "q"]),
            ],
            &[
                vec![1.0, 0.0, 5.0, 1.0],
                vec![1.1, 0.0, 6.0, 1.0],
                vec![0.9, 1.0, 7.0, 0.0],
            ],
            vec![0.0; 3],
        )
        .unwrap()
    }

    #[test]
    fn test_attribute_order_windows_wrap() {
        let order = AttributeOrder::from_vec(vec![2, 0, 1]).unwrap();
        assert_eq!(order.window(0, 2), vec![2, 0]);
        assert_eq!(order.window(2, 2), vec![1, 2]);
        assert_eq!(order.window(1, 3), vec![0, 1, 2]);
        assert!(AttributeOrder::from_vec(vec![0, 0]).is_err());
        assert!(AttributeOrder::from_vec(vec![0, 2]).is_err());
    }

    #[test]
    fn test_shuffled_order_is_permutation() {
        let mut rng = StdRng::seed_from_u64(9);
        let order = AttributeOrder::shuffled(10, &mut rng);
        let mut sorted = order.as_slice().to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_each_attribute_in_k_windows() {
        let attributes: Vec<Attribute> = (0..5)
            .map(|i| Attribute::numeric(format!("x{}", i)))
            .collect();
        let rows: Vec<Vec<f64>> = (0..4).map(|i| vec![i as f64; 5]).collect();
        let ds = Dataset::from_rows(attributes.clone(), &rows, vec![0.0; 4]).unwrap();
        let builder = SubspaceModelBuilder::new(&attributes, 3, WindowMode::Sliding).unwrap();
        let model = builder
            .build(&ds, &subsample_of(4), AttributeOrder::from_vec(vec![3, 1, 4, 0, 2]).unwrap())
            .unwrap();

        assert_eq!(model.num_windows(), 5);
        for a in 0..5 {
            let appearances = model
                .windows()
                .iter()
                .filter(|w| w.attributes.contains(&a))
                .count();
            assert_eq!(appearances, 3);
        }
        assert!(model
            .windows()
            .iter()
            .all(|w| matches!(w.model, WindowModel::Numeric(_))));
    }

    #[test]
    fn test_mixed_pairs_pick_shapes() {
        let ds = mixed_dataset();
        let builder = SubspaceModelBuilder::new(ds.attributes(), 2, WindowMode::Sliding).unwrap();
        // pairs: (x,c) (c,d) (d,y) (y,x)
        let order = AttributeOrder::from_vec(vec![0, 1, 3, 2]).unwrap();
        let model = builder.build(&ds, &subsample_of(3), order).unwrap();

        let shapes: Vec<&str> = model
            .windows()
            .iter()
            .map(|w| match &w.model {
                WindowModel::Joint(_) => "joint",
                WindowModel::Numeric(_) => "numeric",
                WindowModel::Conditional(_) => "conditional",
            })
            .collect();
        assert_eq!(shapes, vec!["conditional", "joint", "conditional", "numeric"]);

        match &model.windows()[0].model {
            WindowModel::Conditional(samples) => {
                assert_eq!(samples.categorical(), &[1]);
                assert_eq!(samples.numeric(), 0);
            }
            other => panic!("unexpected window {:?}", other),
        }
        match &model.windows()[2].model {
            WindowModel::Conditional(samples) => {
                assert_eq!(samples.categorical(), &[3]);
                assert_eq!(samples.numeric(), 2);
            }
            other => panic!("unexpected window {:?}", other),
        }
    }

    #[test]
    fn test_mixed_uses_pairs_regardless_of_k() {
        let ds = mixed_dataset();
        let builder = SubspaceModelBuilder::new(ds.attributes(), 3, WindowMode::Sliding).unwrap();
        let model = builder
            .build(&ds, &subsample_of(3), AttributeOrder::identity(4))
            .unwrap();
        assert!(model.windows().iter().all(|w| w.attributes.len() == 2));
    }

    #[test]
    fn test_statistics_come_from_subsample_only() {
        let attributes = vec![Attribute::numeric("x")];
        let ds = Dataset::from_rows(
            attributes.clone(),
            &[vec![0.0], vec![2.0], vec![1000.0]],
            vec![0.0; 3],
        )
        .unwrap();
        let builder = SubspaceModelBuilder::new(&attributes, 1, WindowMode::Sliding).unwrap();
        let subsample = Subsample {
            positions: vec![0, 1],
            seed: 0,
        };
        let model = builder.build(&ds, &subsample, AttributeOrder::identity(1)).unwrap();
        match &model.windows()[0].model {
            WindowModel::Numeric(stats) => assert_eq!(stats.mean(0), 1.0),
            other => panic!("unexpected window {:?}", other),
        }
        assert_eq!(model.subsample_size(), 2);
    }

    #[test]
    fn test_combinatorial_windows() {
        let attributes: Vec<Attribute> = (0..4)
            .map(|i| Attribute::categorical(format!("c{}", i), vec!["a", "b"]))
            .collect();
        let ds = Dataset::from_rows(attributes.clone(), &[vec![0.0; 4]], vec![0.0]).unwrap();
        let builder = SubspaceModelBuilder::new(&attributes, 2, WindowMode::Combinatorial).unwrap();
        let model = builder
            .build(&ds, &subsample_of(1), AttributeOrder::identity(4))
            .unwrap();
        assert_eq!(model.num_windows(), 6);
    }

    #[test]
    fn test_combinatorial_rejects_mixed_and_wide() {
        let ds = mixed_dataset();
        let err =
            SubspaceModelBuilder::new(ds.attributes(), 2, WindowMode::Combinatorial).unwrap_err();
        assert!(matches!(err, ZeroError::Configuration(_)));

        let wide: Vec<Attribute> = (0..81)
            .map(|i| Attribute::numeric(format!("x{}", i)))
            .collect();
        let err = SubspaceModelBuilder::new(&wide, 2, WindowMode::Combinatorial).unwrap_err();
        assert!(matches!(err, ZeroError::CapacityExceeded { .. }));
        assert!(SubspaceModelBuilder::new(&wide, 2, WindowMode::Sliding).is_ok());
    }

    #[test]
    fn test_combinatorial_rejects_too_many_subsets() {
        let attributes: Vec<Attribute> = (0..26)
            .map(|i| Attribute::numeric(format!("x{}", i)))
            .collect();
        let err =
            SubspaceModelBuilder::new(&attributes, 13, WindowMode::Combinatorial).unwrap_err();
        assert!(matches!(
            err,
            ZeroError::CapacityExceeded {
                size: 10_400_600,
                ..
            }
        ));
        assert!(SubspaceModelBuilder::new(&attributes, 3, WindowMode::Combinatorial).is_ok());
        assert!(SubspaceModelBuilder::new(&attributes, 13, WindowMode::Sliding).is_ok());
    }

    #[test]
    fn test_width_clamped() {
        let attributes = vec![Attribute::numeric("x"), Attribute::numeric("y")];
        let builder = SubspaceModelBuilder::new(&attributes, 5, WindowMode::Sliding).unwrap();
        assert_eq!(builder.width(), 2);
    }

    #[test]
    fn test_empty_subsample_fails() {
        let attributes = vec![Attribute::numeric("x")];
        let ds = Dataset::from_rows(attributes.clone(), &[vec![0.0]], vec![0.0]).unwrap();
        let builder = SubspaceModelBuilder::new(&attributes, 1, WindowMode::Sliding).unwrap();
        let err = builder
            .build(&ds, &subsample_of(0), AttributeOrder::identity(1))
            .unwrap_err();
        assert!(matches!(err, ZeroError::ModelBuild(_)));
    }

    #[test]
    fn test_check_record() {
        let ds = mixed_dataset();
        let builder = SubspaceModelBuilder::new(ds.attributes(), 2, WindowMode::Sliding).unwrap();
        let model = builder
            .build(&ds, &subsample_of(3), AttributeOrder::identity(4))
            .unwrap();
        assert!(model.check_record(ds.record(0)).is_ok());
        assert!(model.check_record(ndarray::array![1.0, 0.0, 5.0].view()).is_err());
        assert!(model.check_record(ndarray::array![1.0, 3.0, 5.0, 0.0].view()).is_err());
    }
}
