use std::fmt;

/// A quantile to report for a timer or histogram, along with the label it is published under.
///
/// Labels follow the usual percentile shorthand: `0.5` is published as `p50` and `0.999` as
/// `p999`. The bounds are published as `min` and `max`.
#[derive(Clone, Debug, PartialEq)]
pub struct Quantile {
    value: f64,
    label: String,
}

impl Quantile {
    /// Creates a new `Quantile`.
    ///
    /// Values outside of `[0.0, 1.0]` are clamped, and NaN is treated as `0.0`.
    pub fn new(value: f64) -> Quantile {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        Quantile { value, label: percentile_label(value) }
    }

    /// Gets the label this quantile is published under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Gets the quantile, between `0.0` and `1.0`.
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl fmt::Display for Quantile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

fn percentile_label(value: f64) -> String {
    if value <= 0.0 {
        return "min".to_string();
    }
    if value >= 1.0 {
        return "max".to_string();
    }

    // Rounded, so that `0.95 * 100.0` reads as `95` and not `94.99999999999999`.
    let percent = format!("{:.6}", value * 100.0);
    let digits = percent.trim_end_matches('0').trim_end_matches('.');
    let mut label = String::with_capacity(digits.len() + 1);
    label.push('p');
    label.extend(digits.chars().filter(|c| *c != '.'));
    label
}

/// The quantiles reported for request timers and price histograms by default.
pub fn default_quantiles() -> Vec<Quantile> {
    parse_quantiles(&[0.5, 0.75, 0.95, 0.99, 0.999])
}

/// Builds a [`Quantile`] for each of the given values.
pub fn parse_quantiles(values: &[f64]) -> Vec<Quantile> {
    values.iter().copied().map(Quantile::new).collect()
}

#[cfg(test)]
mod tests {
    use super::{default_quantiles, parse_quantiles, Quantile};

    #[test]
    fn test_labels() {
        let cases = [
            (0.0, "min"),
            (0.001, "p01"),
            (0.5, "p50"),
            (0.95, "p95"),
            (0.99, "p99"),
            (0.999, "p999"),
            (0.9999, "p9999"),
            (1.0, "max"),
        ];
        for (value, label) in cases {
            let quantile = Quantile::new(value);
            assert_eq!(quantile.label(), label, "unexpected label for {value}");
            assert_eq!(quantile.value(), value);
        }
        assert_eq!(Quantile::new(0.75).to_string(), "p75");
    }

    #[test]
    fn test_out_of_range() {
        let under = Quantile::new(-1.0);
        assert_eq!(under.value(), 0.0);
        assert_eq!(under.label(), "min");

        let over = Quantile::new(1.2);
        assert_eq!(over.value(), 1.0);
        assert_eq!(over.label(), "max");

        let nan = Quantile::new(f64::NAN);
        assert_eq!(nan.value(), 0.0);
        assert_eq!(nan.label(), "min");
    }

    #[test]
    fn test_parse_quantiles() {
        assert!(parse_quantiles(&[]).is_empty());

        let result = parse_quantiles(&[0.0, 0.5, 1.0]);
        assert_eq!(result, vec![Quantile::new(0.0), Quantile::new(0.5), Quantile::new(1.0)]);

        let labels = default_quantiles().iter().map(Quantile::to_string).collect::<Vec<_>>();
        assert_eq!(labels, vec!["p50", "p75", "p95", "p99", "p999"]);
    }
}
