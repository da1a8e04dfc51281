//! The three window shapes of a subspace model and their support tests.
//!
//! A window is "supported" by the subsample when its joint values for a test
//! record were observed there (categorical), or lie within three standard
//! deviations of what was observed (numeric). An unsupported window is a
//! zero appearance.

use std::collections::HashMap;

use ndarray::ArrayView1;

use crate::utils::stats::ColumnStatistic;

/// Deviation, in standard deviations, beyond which a numeric value is unsupported.
pub const SIGMA_LIMIT: f64 = 3.0;

/// One categorical component of a joint key: attribute index and domain
/// index (`None` when missing).
pub type KeyPart = (usize, Option<usize>);

/// Joint categorical values of a record on a set of attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JointKey(pub Vec<KeyPart>);

impl JointKey {
    /// Key of `record` on `attributes`; values are assumed to be valid codes.
    pub fn of(record: ArrayView1<'_, f64>, attributes: &[usize]) -> Self {
        JointKey(
            attributes
                .iter()
                .map(|&a| {
                    let v = record[a];
                    (a, if v.is_nan() { None } else { Some(v as usize) })
                })
                .collect(),
        )
    }
}

/// `true` when `value` lies more than [`SIGMA_LIMIT`] deviations from `centre`.
/// A missing value never deviates.
#[inline]
pub fn deviates(value: f64, centre: f64, std: f64) -> bool {
    (centre - value).abs() > SIGMA_LIMIT * std
}

/// Occurrence counts of joint categorical values over the subsample.
#[derive(Debug, Clone)]
pub struct JointFrequencyTable {
    attributes: Vec<usize>,
    counts: HashMap<JointKey, usize>,
}

impl JointFrequencyTable {
    pub fn build<'a, I>(attributes: Vec<usize>, rows: I) -> Self
    where
        I: IntoIterator<Item = ArrayView1<'a, f64>>,
    {
        let mut counts = HashMap::new();
        for row in rows {
            *counts.entry(JointKey::of(row, &attributes)).or_insert(0) += 1;
        }
        Self { attributes, counts }
    }

    pub fn attributes(&self) -> &[usize] {
        &self.attributes
    }

    pub fn count(&self, key: &JointKey) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn supports(&self, record: ArrayView1<'_, f64>) -> bool {
        self.counts
            .contains_key(&JointKey::of(record, &self.attributes))
    }
}

/// Per-attribute mean and standard deviation; attributes are tested independently.
#[derive(Debug, Clone)]
pub struct NumericStats {
    attributes: Vec<usize>,
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl NumericStats {
    /// `columns` holds the subsample statistic of every attribute (numeric ones filled).
    pub fn build(attributes: Vec<usize>, columns: &[Option<ColumnStatistic>]) -> Self {
        let mut means = Vec::with_capacity(attributes.len());
        let mut stds = Vec::with_capacity(attributes.len());
        for &a in &attributes {
            let stat = columns[a].clone().unwrap_or_default();
            means.push(stat.mean());
            stds.push(stat.std());
        }
        Self {
            attributes,
            means,
            stds,
        }
    }

    pub fn attributes(&self) -> &[usize] {
        &self.attributes
    }

    pub fn mean(&self, position: usize) -> f64 {
        self.means[position]
    }

    pub fn std(&self, position: usize) -> f64 {
        self.stds[position]
    }

    /// Supported unless some attribute deviates from its mean.
    pub fn supports(&self, record: ArrayView1<'_, f64>) -> bool {
        self.attributes
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .all(|(&a, (&mean, &std))| !deviates(record[a], mean, std))
    }
}

/// Numeric values of one attribute grouped by the joint value of the
/// window's categorical attribute(s).
#[derive(Debug, Clone)]
pub struct ConditionalNumericSamples {
    categorical: Vec<usize>,
    numeric: usize,
    std: f64,
    buckets: HashMap<JointKey, Vec<f64>>,
}

impl ConditionalNumericSamples {
    /// `std` is the subsample deviation of the numeric attribute.
    pub fn build<'a, I>(categorical: Vec<usize>, numeric: usize, std: f64, rows: I) -> Self
    where
        I: IntoIterator<Item = ArrayView1<'a, f64>>,
    {
        let mut buckets: HashMap<JointKey, Vec<f64>> = HashMap::new();
        for row in rows {
            let bucket = buckets.entry(JointKey::of(row, &categorical)).or_default();
            let value = row[numeric];
            if !value.is_nan() {
                bucket.push(value);
            }
        }
        Self {
            categorical,
            numeric,
            std,
            buckets,
        }
    }

    pub fn categorical(&self) -> &[usize] {
        &self.categorical
    }

    pub fn numeric(&self) -> usize {
        self.numeric
    }

    pub fn bucket(&self, key: &JointKey) -> Option<&[f64]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Supported when the record's category was seen and one of the values
    /// recorded under it lies within three deviations of the record's value.
    pub fn supports(&self, record: ArrayView1<'_, f64>) -> bool {
        let Some(values) = self.bucket(&JointKey::of(record, &self.categorical)) else {
            return false;
        };
        let value = record[self.numeric];
        values.iter().any(|&v| !deviates(value, v, self.std))
    }
}

/// Model of one window, chosen once at build time from its attribute kinds.
#[derive(Debug, Clone)]
pub enum WindowModel {
    Joint(JointFrequencyTable),
    Numeric(NumericStats),
    Conditional(ConditionalNumericSamples),
}

impl WindowModel {
    pub fn supports(&self, record: ArrayView1<'_, f64>) -> bool {
        match self {
            WindowModel::Joint(table) => table.supports(record),
            WindowModel::Numeric(stats) => stats.supports(record),
            WindowModel::Conditional(samples) => samples.supports(record),
        }
    }
}
