//! Repeats a nondeterministic hazard and counts how often it shows up.
//!
//! A single run of a race proves nothing either way. The runner executes a
//! trial closure N times; the closure sets up fresh state, lets its
//! participants contend, and reports whether the defect manifested.

use core::time::Duration;
use std::time::Instant;

pub mod config;

pub use config::TrialConfig;

use crate::errors::HazardResult;

/// Outcome of a trial run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialReport {
    /// Trials executed
    pub trials: usize,
    /// Trials in which the hazard manifested
    pub manifested: usize,
    /// Wall-clock time for the whole run
    pub duration: Duration,
}

impl TrialReport {
    #[must_use]
    pub const fn new(trials: usize, manifested: usize, duration: Duration) -> Self {
        Self {
            trials,
            manifested,
            duration,
        }
    }

    /// Fraction of trials that manifested, between 0.0 and 1.0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn manifest_rate(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.manifested as f64 / self.trials as f64
        }
    }

    #[must_use]
    pub const fn ever_manifested(&self) -> bool {
        self.manifested > 0
    }
}

impl core::fmt::Display for TrialReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "hazard manifested in {}/{} trials ({:.0}%) over {}ms",
            self.manifested,
            self.trials,
            self.manifest_rate() * 100.0,
            self.duration.as_millis()
        )
    }
}

/// Runs trials sequentially; each trial brings its own concurrency.
pub struct TrialRunner {
    config: TrialConfig,
}

impl TrialRunner {
    #[must_use]
    pub const fn new(config: TrialConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> TrialConfig {
        self.config
    }

    /// Runs `trial` once per configured trial.
    ///
    /// The closure receives the trial index and the participant count and
    /// returns `true` when the hazard manifested.
    ///
    /// # Examples
    ///
    /// ```
    /// use foundation_hazards::trials::{TrialConfig, TrialRunner};
    ///
    /// let runner = TrialRunner::new(TrialConfig::new().trials(6));
    /// let report = runner.run(|trial, _participants| trial % 2 == 0);
    ///
    /// assert_eq!(report.trials, 6);
    /// assert_eq!(report.manifested, 3);
    /// ```
    pub fn run<F>(&self, mut trial: F) -> TrialReport
    where
        F: FnMut(usize, usize) -> bool,
    {
        let start = Instant::now();
        let participants = self.config.get_participants();

        let manifested = (0..self.config.get_trials())
            .filter(|&index| trial(index, participants))
            .count();

        let report = TrialReport::new(self.config.get_trials(), manifested, start.elapsed());
        tracing::info!("{}", report);
        report
    }

    /// Like [`TrialRunner::run`] for trials that can fail.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first trial error.
    pub fn try_run<F>(&self, mut trial: F) -> HazardResult<TrialReport>
    where
        F: FnMut(usize, usize) -> HazardResult<bool>,
    {
        let start = Instant::now();
        let participants = self.config.get_participants();

        let mut manifested = 0;
        for index in 0..self.config.get_trials() {
            if trial(index, participants)? {
                manifested += 1;
            }
        }

        let report = TrialReport::new(self.config.get_trials(), manifested, start.elapsed());
        tracing::info!("{}", report);
        Ok(report)
    }
}
