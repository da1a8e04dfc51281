//! In-memory tabular data consumed by the ensemble.
//!
//! Cells are stored as `f64`: numeric attributes hold their value, categorical
//! attributes hold the index of the label in their domain, and `NaN` marks a
//! missing cell. The label column is kept apart and never reaches a model.

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::error::{Result, ZeroError};

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    Numeric,
    Categorical { domain: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Numeric,
        }
    }

    pub fn categorical<S: Into<String>>(name: impl Into<String>, domain: Vec<S>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Categorical {
                domain: domain.into_iter().map(Into::into).collect(),
            },
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, AttributeKind::Numeric)
    }

    pub fn is_categorical(&self) -> bool {
        !self.is_numeric()
    }

    /// Number of labels for a categorical attribute.
    pub fn domain_size(&self) -> Option<usize> {
        match &self.kind {
            AttributeKind::Numeric => None,
            AttributeKind::Categorical { domain } => Some(domain.len()),
        }
    }
}

/// Attribute types present in a dataset, which decide the model shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Numeric,
    Categorical,
    Mixed,
}

impl SchemaKind {
    pub fn of(attributes: &[Attribute]) -> Result<Self> {
        let has_numeric = attributes.iter().any(Attribute::is_numeric);
        let has_categorical = attributes.iter().any(Attribute::is_categorical);
        match (has_numeric, has_categorical) {
            (true, false) => Ok(SchemaKind::Numeric),
            (false, true) => Ok(SchemaKind::Categorical),
            (true, true) => Ok(SchemaKind::Mixed),
            (false, false) => Err(ZeroError::ModelBuild(
                "dataset has no attributes besides the label".to_string(),
            )),
        }
    }
}

/// Immutable set of records with their attribute schema and labels.
#[derive(Debug, Clone)]
pub struct Dataset {
    attributes: Vec<Attribute>,
    values: Array2<f64>,
    labels: Vec<f64>,
}

impl Dataset {
    pub fn new(attributes: Vec<Attribute>, values: Array2<f64>, labels: Vec<f64>) -> Result<Self> {
        let (rows, cols) = values.dim();
        if cols != attributes.len() {
            return Err(ZeroError::InvalidDataset(format!(
                "{} value columns for {} attributes",
                cols,
                attributes.len()
            )));
        }
        if labels.len() != rows {
            return Err(ZeroError::InvalidDataset(format!(
                "{} labels for {} records",
                labels.len(),
                rows
            )));
        }
        for (j, attribute) in attributes.iter().enumerate() {
            let Some(size) = attribute.domain_size() else {
                continue;
            };
            for (i, &value) in values.column(j).iter().enumerate() {
                if category_code(value, size).is_err() {
                    return Err(ZeroError::InvalidDataset(format!(
                        "record {} has value {} outside the domain of '{}'",
                        i, value, attribute.name
                    )));
                }
            }
        }
        Ok(Self {
            attributes,
            values,
            labels,
        })
    }

    /// Builds a dataset from row vectors.
    pub fn from_rows(
        attributes: Vec<Attribute>,
        rows: &[Vec<f64>],
        labels: Vec<f64>,
    ) -> Result<Self> {
        let width = attributes.len();
        if let Some(i) = rows.iter().position(|row| row.len() != width) {
            return Err(ZeroError::InvalidDataset(format!(
                "record {} has {} values, expected {}",
                i,
                rows[i].len(),
                width
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let values = Array2::from_shape_vec((rows.len(), width), flat)
            .map_err(|e| ZeroError::InvalidDataset(e.to_string()))?;
        Self::new(attributes, values, labels)
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    pub fn num_records(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.num_records() == 0
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn record(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.row(index)
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn label(&self, index: usize) -> f64 {
        self.labels[index]
    }

    pub fn schema_kind(&self) -> Result<SchemaKind> {
        SchemaKind::of(&self.attributes)
    }
}

/// Largest categorical domain [`infer_attributes`] will create.
pub const MAX_INFERRED_DOMAIN: usize = 65_536;

/// Attributes for a raw matrix: columns listed in `categorical` hold category
/// indices and get a domain covering the largest index seen, the rest are
/// numeric.
pub fn infer_attributes(
    values: ArrayView2<'_, f64>,
    categorical: &[usize],
) -> Result<Vec<Attribute>> {
    let mut attributes: Vec<Attribute> = (0..values.ncols())
        .map(|j| Attribute::numeric(format!("x{}", j)))
        .collect();
    for &j in categorical {
        if j >= values.ncols() {
            return Err(ZeroError::InvalidDataset(format!(
                "categorical column {} out of range for {} columns",
                j,
                values.ncols()
            )));
        }
        let largest = values
            .column(j)
            .iter()
            .filter(|v| !v.is_nan())
            .fold(-1.0f64, |m, &v| m.max(v));
        if largest >= MAX_INFERRED_DOMAIN as f64 {
            return Err(ZeroError::InvalidDataset(format!(
                "categorical column {} has code {}, domains are limited to {} labels",
                j, largest, MAX_INFERRED_DOMAIN
            )));
        }
        let size = (largest + 1.0).max(0.0) as usize;
        let domain: Vec<String> = (0..size).map(|c| c.to_string()).collect();
        attributes[j] = Attribute::categorical(format!("c{}", j), domain);
    }
    Ok(attributes)
}

/// Domain index of a categorical cell; `None` for a missing value.
pub(crate) fn category_code(
    value: f64,
    domain_size: usize,
) -> std::result::Result<Option<usize>, String> {
    if value.is_nan() {
        return Ok(None);
    }
    if value < 0.0 || value.fract() != 0.0 || value >= domain_size as f64 {
        return Err(format!(
            "categorical value {} is not an index into a domain of {} labels",
            value, domain_size
        ));
    }
    Ok(Some(value as usize))
}
