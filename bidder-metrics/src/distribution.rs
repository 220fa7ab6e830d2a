//! Point-in-time statistics over a sampled distribution.

use crate::quantile::Quantile;

/// A point-in-time view of a timer or histogram.
///
/// `count` is the number of values ever recorded, while the statistics are computed over the
/// values currently held by the sampling reservoir. Once more values have been recorded than the
/// reservoir can hold, the statistics describe a representative, recency-weighted subset.
#[derive(Clone, Debug, PartialEq)]
pub struct Distribution {
    count: u64,
    values: Vec<i64>,
}

impl Distribution {
    /// Creates a new `Distribution` from a total count and the sampled values.
    pub fn new(count: u64, mut values: Vec<i64>) -> Distribution {
        values.sort_unstable();
        Distribution { count, values }
    }

    /// Creates an empty `Distribution`.
    pub fn empty() -> Distribution {
        Distribution { count: 0, values: Vec::new() }
    }

    /// Gets the number of values ever recorded.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Gets the number of values held in the sample.
    pub fn sample_len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no values are held in the sample.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Gets the sampled values, in ascending order.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Gets the smallest sampled value, or zero if the sample is empty.
    pub fn min(&self) -> i64 {
        self.values.first().copied().unwrap_or(0)
    }

    /// Gets the largest sampled value, or zero if the sample is empty.
    pub fn max(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }

    /// Gets the sum of the sampled values.
    pub fn sum(&self) -> i128 {
        self.values.iter().map(|v| i128::from(*v)).sum()
    }

    /// Gets the mean of the sampled values, or zero if the sample is empty.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.sum() as f64 / self.values.len() as f64
    }

    /// Gets the population standard deviation of the sampled values.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Gets the population variance of the sampled values.
    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }

        let mean = self.mean();
        let sum = self
            .values
            .iter()
            .map(|v| {
                let d = *v as f64 - mean;
                d * d
            })
            .sum::<f64>();
        sum / self.values.len() as f64
    }

    /// Gets the estimated value at the given quantile.
    ///
    /// Quantiles are interpolated linearly between the two closest ranks, using the `(n + 1) * q`
    /// rank convention. Values outside of `[0.0, 1.0]` are clamped, and NaN is treated as `0.0`.
    /// An empty sample yields zero.
    pub fn quantile(&self, q: f64) -> f64 {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }

        let q = if q.is_nan() { 0.0 } else { q.clamp(0.0, 1.0) };
        let pos = q * (n as f64 + 1.0);
        if pos < 1.0 {
            self.values[0] as f64
        } else if pos >= n as f64 {
            self.values[n - 1] as f64
        } else {
            let idx = pos.floor() as usize;
            let lower = self.values[idx - 1] as f64;
            let upper = self.values[idx] as f64;
            lower + (pos - pos.floor()) * (upper - lower)
        }
    }

    /// Gets the estimated values for each of the given quantiles.
    pub fn quantiles<'a>(&self, quantiles: &'a [Quantile]) -> Vec<(&'a Quantile, f64)> {
        quantiles.iter().map(|q| (q, self.quantile(q.value()))).collect()
    }
}

impl Default for Distribution {
    fn default() -> Self {
        Distribution::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Distribution;
    use crate::quantile::parse_quantiles;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty() {
        let dist = Distribution::empty();
        assert!(dist.is_empty());
        assert_eq!(dist.count(), 0);
        assert_eq!(dist.min(), 0);
        assert_eq!(dist.max(), 0);
        assert_eq!(dist.mean(), 0.0);
        assert_eq!(dist.std_dev(), 0.0);
        assert_eq!(dist.quantile(0.99), 0.0);
    }

    #[test]
    fn test_basic_statistics() {
        let dist = Distribution::new(8, vec![9, 2, 4, 4, 5, 5, 4, 7]);
        assert_eq!(dist.values(), &[2, 4, 4, 4, 5, 5, 7, 9]);
        assert_eq!(dist.count(), 8);
        assert_eq!(dist.sample_len(), 8);
        assert_eq!(dist.min(), 2);
        assert_eq!(dist.max(), 9);
        assert_eq!(dist.sum(), 40);
        assert_relative_eq!(dist.mean(), 5.0);
        assert_relative_eq!(dist.std_dev(), 2.0);
    }

    #[test]
    fn test_quantiles() {
        let values = (1..=100).collect::<Vec<i64>>();
        let dist = Distribution::new(100, values);

        assert_relative_eq!(dist.quantile(0.0), 1.0);
        assert_relative_eq!(dist.quantile(0.5), 50.5);
        assert_relative_eq!(dist.quantile(0.75), 75.75, epsilon = 1e-9);
        assert_relative_eq!(dist.quantile(0.99), 99.99, epsilon = 1e-9);
        assert_relative_eq!(dist.quantile(1.0), 100.0);

        let quantiles = parse_quantiles(&[0.5, 1.0]);
        let results = dist.quantiles(&quantiles);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.label(), "p50");
        assert_relative_eq!(results[1].1, 100.0);
    }

    #[test]
    fn test_nan_quantile() {
        let dist = Distribution::new(3, vec![1, 2, 3]);
        assert_relative_eq!(dist.quantile(f64::NAN), 1.0);

        let quantiles = parse_quantiles(&[f64::NAN]);
        let results = dist.quantiles(&quantiles);
        assert_eq!(results[0].0.label(), "min");
        assert_relative_eq!(results[0].1, 1.0);
    }

    #[test]
    fn test_single_value() {
        let dist = Distribution::new(1, vec![42]);
        assert_relative_eq!(dist.quantile(0.01), 42.0);
        assert_relative_eq!(dist.quantile(0.5), 42.0);
        assert_relative_eq!(dist.quantile(0.99), 42.0);
    }
}
