use ndarray::ArrayView1;

/// Running statistics for one numeric attribute over a subsample: count, mean,
/// sum of squares, sample variance and standard deviation.
///
/// Missing values (`NaN`) are skipped.
#[derive(Debug, Clone, Default)]
pub struct ColumnStatistic {
    num_items: usize,
    mean: f64,
    sum_squares: f64,
}

impl ColumnStatistic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics over every non-missing value of `column`.
    pub fn from_column(column: ArrayView1<'_, f64>) -> Self {
        let mut stat = Self::new();
        for &item in column.iter() {
            stat.update(item);
        }
        stat
    }

    /// Update with a new value
    pub fn update(&mut self, item: f64) {
        if item.is_nan() {
            return;
        }
        self.num_items += 1;

        let old_mean = self.mean;
        self.mean += (item - old_mean) / self.num_items as f64;
        self.sum_squares += (item - old_mean) * (item - self.mean);
    }

    pub fn count(&self) -> usize {
        self.num_items
    }

    /// Mean of the observed values, 0 when nothing was observed.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (n - 1 denominator); 0 with fewer than two values.
    pub fn var(&self) -> f64 {
        if self.num_items <= 1 {
            return 0.0;
        }
        (self.sum_squares / (self.num_items - 1) as f64).max(0.0)
    }

    pub fn std(&self) -> f64 {
        self.var().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sample_variance() {
        let stat = ColumnStatistic::from_column(array![1.0, 1.1, 0.9].view());
        assert_eq!(stat.count(), 3);
        assert!((stat.mean() - 1.0).abs() < 1e-12);
        assert!((stat.std() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_missing_values_skipped() {
        let stat = ColumnStatistic::from_column(array![2.0, f64::NAN, 4.0].view());
        assert_eq!(stat.count(), 2);
        assert_eq!(stat.mean(), 3.0);
        assert!((stat.var() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_value_has_zero_spread() {
        let stat = ColumnStatistic::from_column(array![7.5].view());
        assert_eq!(stat.mean(), 7.5);
        assert_eq!(stat.std(), 0.0);
        assert_eq!(ColumnStatistic::new().mean(), 0.0);
    }
}
