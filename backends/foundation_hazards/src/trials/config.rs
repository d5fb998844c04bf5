//! Trial run configuration.

/// How many times to repeat a hazard and with how many contenders.
#[derive(Debug, Clone, Copy)]
pub struct TrialConfig {
    /// Number of independent trials
    trials: usize,
    /// Concurrent participants per trial
    participants: usize,
}

impl TrialConfig {
    /// Creates a trial configuration with default values.
    ///
    /// Defaults:
    /// - `trials`: 10
    /// - `participants`: 4
    #[must_use]
    pub const fn new() -> Self {
        Self {
            trials: 10,
            participants: 4,
        }
    }

    #[must_use]
    pub const fn trials(mut self, count: usize) -> Self {
        self.trials = count;
        self
    }

    #[must_use]
    pub const fn participants(mut self, count: usize) -> Self {
        self.participants = count;
        self
    }

    #[must_use]
    pub const fn get_trials(&self) -> usize {
        self.trials
    }

    #[must_use]
    pub const fn get_participants(&self) -> usize {
        self.participants
    }
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self::new()
    }
}
