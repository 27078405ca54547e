/// Cumulative failures within one running period that trigger a fatal stop.
pub const DEFAULT_ERROR_THRESHOLD: u32 = 5;
/// How many error messages are kept for status reporting.
pub const MAX_RECENT_ERRORS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorVerdict {
    /// Below threshold; the loop slows down and carries on.
    Continue { count: u32 },
    /// Threshold reached; the loop must stop.
    Fatal { count: u32 },
}

#[derive(Debug, Clone)]
pub struct ErrorAggregator {
    recent: Vec<String>,
    count: u32,
    threshold: u32,
}

impl Default for ErrorAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_THRESHOLD)
    }
}

impl ErrorAggregator {
    pub fn new(threshold: u32) -> Self {
        Self {
            recent: Vec::with_capacity(MAX_RECENT_ERRORS),
            count: 0,
            threshold: threshold.max(1),
        }
    }

    pub fn record(&mut self, message: impl Into<String>) -> ErrorVerdict {
        self.count = self.count.saturating_add(1);

        self.recent.push(message.into());
        if self.recent.len() > MAX_RECENT_ERRORS {
            self.recent.remove(0);
        }

        if self.count >= self.threshold {
            ErrorVerdict::Fatal { count: self.count }
        } else {
            ErrorVerdict::Continue { count: self.count }
        }
    }

    /// Oldest first.
    pub fn recent(&self) -> &[String] {
        &self.recent
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Starts a new running period.
    pub fn reset(&mut self) {
        self.recent.clear();
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifth_error_is_fatal() {
        let mut aggregator = ErrorAggregator::default();
        for n in 1..5 {
            assert_eq!(
                aggregator.record(format!("error {n}")),
                ErrorVerdict::Continue { count: n }
            );
        }
        assert_eq!(aggregator.record("error 5"), ErrorVerdict::Fatal { count: 5 });
    }

    #[test]
    fn keeps_only_most_recent_errors() {
        let mut aggregator = ErrorAggregator::new(100);
        for n in 0..8 {
            aggregator.record(format!("error {n}"));
        }
        assert_eq!(aggregator.count(), 8);
        assert_eq!(
            aggregator.recent(),
            &["error 3", "error 4", "error 5", "error 6", "error 7"]
        );
    }

    #[test]
    fn reset_starts_a_new_period() {
        let mut aggregator = ErrorAggregator::new(2);
        aggregator.record("a");
        aggregator.reset();
        assert_eq!(aggregator.count(), 0);
        assert!(aggregator.recent().is_empty());
        assert_eq!(aggregator.record("b"), ErrorVerdict::Continue { count: 1 });
    }

    #[test]
    fn zero_threshold_is_clamped() {
        let mut aggregator = ErrorAggregator::new(0);
        assert_eq!(aggregator.threshold(), 1);
        assert_eq!(aggregator.record("a"), ErrorVerdict::Fatal { count: 1 });
    }
}
