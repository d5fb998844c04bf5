//! Wall-clock timing of scenario operations.
//!
//! Nothing here synchronizes or wraps the measured operation beyond reading
//! [`Instant::now`] before and after it runs.

pub mod reporter;

pub use reporter::TimingReport;

use core::time::Duration;
use std::time::Instant;

use crate::errors::HazardResult;

/// Runs `op` once and returns the elapsed wall-clock time.
pub fn measure<F>(op: F) -> Duration
where
    F: FnOnce(),
{
    let start = Instant::now();
    op();
    start.elapsed()
}

/// Runs `op` once, returning its value alongside the elapsed time.
pub fn measure_value<R, F>(op: F) -> (R, Duration)
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let value = op();
    (value, start.elapsed())
}

/// Runs `op` `times` times back to back, timing each lap.
pub fn measure_repeated<F>(mut op: F, times: usize) -> RepeatedTiming
where
    F: FnMut(),
{
    let start = Instant::now();
    let mut laps = Vec::with_capacity(times);
    for lap in 0..times {
        let lap_start = Instant::now();
        op();
        let elapsed = lap_start.elapsed();
        tracing::debug!("lap {} took {}ms", lap, elapsed.as_millis());
        laps.push(elapsed);
    }
    RepeatedTiming::new(laps, start.elapsed())
}

/// Runs a named scenario, printing and logging how long it took.
///
/// The scenario's own result is handed back untouched.
///
/// # Errors
///
/// Returns whatever error the scenario returned.
pub fn test<R, F>(name: &str, scenario: F) -> HazardResult<R>
where
    F: FnOnce() -> HazardResult<R>,
{
    let (result, elapsed) = measure_value(scenario);
    let millis = elapsed.as_millis();

    println!("\n---------------\nTime: {millis}");
    match &result {
        Ok(_) => tracing::info!("scenario {} finished in {}ms", name, millis),
        Err(err) => tracing::error!("scenario {} failed after {}ms: {}", name, millis, err),
    }
    result
}

/// Lap durations from [`measure_repeated`].
#[derive(Debug, Clone)]
pub struct RepeatedTiming {
    /// Duration of each run, in execution order.
    pub laps: Vec<Duration>,
    /// Wall-clock time across all runs.
    pub total: Duration,
}

impl RepeatedTiming {
    #[must_use]
    pub const fn new(laps: Vec<Duration>, total: Duration) -> Self {
        Self { laps, total }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.laps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    #[must_use]
    pub fn min(&self) -> Option<Duration> {
        self.laps.iter().min().copied()
    }

    #[must_use]
    pub fn max(&self) -> Option<Duration> {
        self.laps.iter().max().copied()
    }

    /// Mean lap duration.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn avg(&self) -> Option<Duration> {
        if self.laps.is_empty() {
            None
        } else {
            let sum: Duration = self.laps.iter().sum();
            Some(sum / self.laps.len() as u32)
        }
    }

    #[must_use]
    pub fn median(&self) -> Option<Duration> {
        if self.laps.is_empty() {
            return None;
        }

        let mut sorted = self.laps.clone();
        sorted.sort_unstable();

        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2)
        } else {
            Some(sorted[mid])
        }
    }

    /// Returns the lap duration at the given percentile (0.0 to 1.0).
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn percentile(&self, percentile: f64) -> Option<Duration> {
        if self.laps.is_empty() || !(0.0..=1.0).contains(&percentile) {
            return None;
        }

        let mut sorted = self.laps.clone();
        sorted.sort_unstable();

        let index = ((sorted.len() as f64) * percentile).ceil() as usize;
        Some(sorted[index.saturating_sub(1).min(sorted.len() - 1)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    #[test]
    fn measure_covers_the_operation() {
        let elapsed = measure(|| std::thread::sleep(Duration::from_millis(20)));
        assert!(elapsed >= Duration::from_millis(20));
    }

    #[test]
    fn measure_value_hands_back_the_result() {
        let (value, _) = measure_value(|| 6 * 7);
        assert_eq!(value, 42);
    }

    #[test]
    fn measure_repeated_runs_sequentially_n_times() {
        let calls = AtomicUsize::new(0);
        let timing = measure_repeated(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(2));
            },
            5,
        );

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(timing.len(), 5);
        let lap_sum: Duration = timing.laps.iter().sum();
        assert!(timing.total >= lap_sum);
    }

    #[test]
    fn zero_repetitions_yield_empty_statistics() {
        let timing = measure_repeated(|| {}, 0);
        assert!(timing.is_empty());
        assert_eq!(timing.avg(), None);
        assert_eq!(timing.median(), None);
        assert_eq!(timing.percentile(0.5), None);
    }

    #[test]
    fn statistics_over_known_laps() {
        let timing = RepeatedTiming::new(
            vec![
                Duration::from_millis(40),
                Duration::from_millis(10),
                Duration::from_millis(30),
                Duration::from_millis(20),
            ],
            Duration::from_millis(100),
        );

        assert_eq!(timing.min(), Some(Duration::from_millis(10)));
        assert_eq!(timing.max(), Some(Duration::from_millis(40)));
        assert_eq!(timing.avg(), Some(Duration::from_millis(25)));
        assert_eq!(timing.median(), Some(Duration::from_millis(25)));
        assert_eq!(timing.percentile(1.0), Some(Duration::from_millis(40)));
        assert_eq!(timing.percentile(0.0), Some(Duration::from_millis(10)));
        assert_eq!(timing.percentile(1.5), None);
    }

    #[test]
    #[traced_test]
    fn test_wrapper_propagates_the_scenario_result() {
        let ok = test("succeeds", || Ok(7));
        assert_eq!(ok.ok(), Some(7));

        let failed: HazardResult<()> = test("fails", || Err(crate::HazardError::WaitTimeout));
        assert!(failed.is_err());
        assert!(logs_contain("scenario fails failed"));
    }
}
