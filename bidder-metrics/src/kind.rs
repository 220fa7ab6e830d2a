use std::fmt;

/// Metric kind.
///
/// Defines the kind, or type, of a metric held by the registry:
/// - counters
/// - timers
/// - histograms
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum MetricKind {
    /// Counter type.
    Counter,
    /// Timer type.
    Timer,
    /// Histogram type.
    Histogram,
}

impl MetricKind {
    /// Gets the lowercase name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Timer => "timer",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::MetricKind;

    #[test]
    fn test_ordering() {
        let mut kinds = vec![MetricKind::Histogram, MetricKind::Counter, MetricKind::Timer];
        kinds.sort();
        assert_eq!(kinds, vec![MetricKind::Counter, MetricKind::Timer, MetricKind::Histogram]);
        assert_eq!(MetricKind::Timer.to_string(), "timer");
    }
}
