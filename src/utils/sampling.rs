//! Per-member subsampling and seed derivation.
//!
//! The derived seed comes from hashing the text form of one randomly chosen
//! record. The text form and hash are fixed by [`SEED_SCHEME_VERSION`]:
//! categorical cells and the label are printed with 2 decimals, numeric
//! cells with 6, missing cells as `?`, joined by `,`; the hash is the
//! 31-multiplier string hash over UTF-16 code units (wrapping `i32`).
//! Changing either rule changes every seed and must bump the version.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::dataset::{AttributeKind, Dataset};
use crate::error::{Result, ZeroError};

pub const SEED_SCHEME_VERSION: u32 = 1;

const CATEGORICAL_DECIMALS: i32 = 2;
const NUMERIC_DECIMALS: i32 = 6;

/// Record positions drawn for one ensemble member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subsample {
    pub positions: Vec<usize>,
    /// Seed derived for this member
    pub seed: u64,
}

impl Subsample {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Draws permutation-based subsamples of a dataset.
pub struct SubsampleDrawer<'a> {
    dataset: &'a Dataset,
    size: usize,
}

impl<'a> SubsampleDrawer<'a> {
    /// `requested` is clamped to the number of records.
    pub fn new(dataset: &'a Dataset, requested: usize) -> Result<Self> {
        if dataset.is_empty() {
            return Err(ZeroError::ModelBuild(
                "cannot subsample an empty dataset".to_string(),
            ));
        }
        let size = requested.min(dataset.num_records());
        if size < requested {
            tracing::warn!(
                "Subsample size {} exceeds {} records, using {}",
                requested,
                dataset.num_records(),
                size
            );
        }
        Ok(Self { dataset, size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Seed for the member anchored at `base_seed`: the hash of a randomly
    /// chosen record's fingerprint added to the base seed.
    pub fn member_seed(&self, base_seed: u64) -> u64 {
        let mut rng = StdRng::seed_from_u64(base_seed);
        let chosen = rng.gen_range(0..self.dataset.num_records());
        let text = record_fingerprint(self.dataset, chosen);
        (string_hash(&text) as i64).wrapping_add(base_seed as i64) as u64
    }

    /// Draws the subsample for the member anchored at `base_seed`.
    ///
    /// The returned generator has been advanced past the record shuffle; the
    /// caller continues with it to draw the member's attribute order.
    pub fn draw(&self, base_seed: u64) -> (Subsample, StdRng) {
        let seed = self.member_seed(base_seed);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut positions: Vec<usize> = (0..self.dataset.num_records()).collect();
        positions.shuffle(&mut rng);
        positions.truncate(self.size);

        (Subsample { positions, seed }, rng)
    }
}

/// Text form of one record used for seed derivation.
pub fn record_fingerprint(dataset: &Dataset, index: usize) -> String {
    let record = dataset.record(index);
    let mut fields: Vec<String> = dataset
        .attributes()
        .iter()
        .zip(record.iter())
        .map(|(attribute, &value)| {
            let decimals = match attribute.kind {
                AttributeKind::Numeric => NUMERIC_DECIMALS,
                AttributeKind::Categorical { .. } => CATEGORICAL_DECIMALS,
            };
            format_cell(value, decimals)
        })
        .collect();
    fields.push(format_cell(dataset.label(index), CATEGORICAL_DECIMALS));
    fields.join(",")
}

fn format_cell(value: f64, decimals: i32) -> String {
    if value.is_nan() {
        "?".to_string()
    } else {
        double_to_string(value, decimals)
    }
}

/// 31-multiplier hash over UTF-16 code units with `i32` wrap-around.
pub fn string_hash(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |h, c| h.wrapping_mul(31).wrapping_add(c as i32))
}

/// Rounds `value` to `decimals` places (half away from zero) and prints it
/// without trailing zeros or a trailing decimal point.
pub fn double_to_string(value: f64, decimals: i32) -> String {
    let scaled = value * 10f64.powi(decimals);
    if !(scaled.abs() < i64::MAX as f64) {
        return value.to_string();
    }
    let precision_value = if scaled > 0.0 {
        (scaled + 0.5) as i64
    } else {
        -((scaled.abs() + 0.5) as i64)
    };
    if precision_value == 0 {
        return "0".to_string();
    }
    if decimals == 0 {
        return precision_value.to_string();
    }

    let decimals = decimals as usize;
    let digits = precision_value.unsigned_abs().to_string();
    let digits = format!("{:0>width$}", digits, width = decimals + 1);
    let (int_part, frac_part) = digits.split_at(digits.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');

    let sign = if precision_value < 0 { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, int_part)
    } else {
        format!("{}{}.{}", sign, int_part, frac_part)
    }
}
