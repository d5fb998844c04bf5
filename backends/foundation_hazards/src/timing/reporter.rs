//! Human-readable timing reports.

use super::RepeatedTiming;
use std::fmt;
use std::fmt::Write as _;

/// Titled rendering of a [`RepeatedTiming`].
pub struct TimingReport {
    title: String,
    timing: RepeatedTiming,
}

impl TimingReport {
    #[must_use]
    pub fn new(title: impl Into<String>, timing: RepeatedTiming) -> Self {
        Self {
            title: title.into(),
            timing,
        }
    }

    #[must_use]
    pub const fn timing(&self) -> &RepeatedTiming {
        &self.timing
    }

    /// Generates the report text: one line per lap, then the summary.
    #[must_use]
    pub fn to_string_pretty(&self) -> String {
        let mut report = String::new();

        let _ = writeln!(report, "=== {} ===", self.title);
        for (index, lap) in self.timing.laps.iter().enumerate() {
            let _ = writeln!(report, "  lap {}: {}ms", index, lap.as_millis());
        }

        if let Some(min) = self.timing.min() {
            let _ = writeln!(report, "Min: {}ms", min.as_millis());
        }
        if let Some(avg) = self.timing.avg() {
            let _ = writeln!(report, "Avg: {}ms", avg.as_millis());
        }
        if let Some(median) = self.timing.median() {
            let _ = writeln!(report, "Median: {}ms", median.as_millis());
        }
        if let Some(max) = self.timing.max() {
            let _ = writeln!(report, "Max: {}ms", max.as_millis());
        }
        let _ = write!(report, "Total: {}ms", self.timing.total.as_millis());

        report
    }
}

impl fmt::Display for TimingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_pretty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    #[test]
    fn report_lists_laps_and_summary() {
        let timing = RepeatedTiming::new(
            vec![Duration::from_millis(5), Duration::from_millis(15)],
            Duration::from_millis(21),
        );
        let report = TimingReport::new("sync-list", timing);
        assert_eq!(report.timing().laps.len(), 2);
        assert_eq!(report.timing().total, Duration::from_millis(21));
        let text = report.to_string();

        assert!(text.starts_with("=== sync-list ==="));
        assert!(text.contains("lap 1: 15ms"));
        assert!(text.contains("Avg: 10ms"));
        assert!(text.ends_with("Total: 21ms"));
    }

    #[test]
    fn empty_report_has_only_total() {
        let text = TimingReport::new("empty", RepeatedTiming::new(Vec::new(), Duration::ZERO))
            .to_string_pretty();
        assert!(!text.contains("Min"));
        assert!(text.contains("Total: 0ms"));
    }
}
