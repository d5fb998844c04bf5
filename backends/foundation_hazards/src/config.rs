//! Harness configuration.
//!
//! Values come from builder-style setters or from the environment via
//! [`HarnessConfig::from_env`]. Nothing here is process-global: the config is
//! built once and handed to whatever needs it.

use core::time::Duration;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_WORKERS: &str = "HAZARDS_WORKERS";
pub const ENV_PARALLELISM: &str = "HAZARDS_PARALLELISM";
pub const ENV_TRIALS: &str = "HAZARDS_TRIALS";
pub const ENV_WAIT_SECS: &str = "HAZARDS_WAIT_SECS";
pub const ENV_PRIME_LIMIT: &str = "HAZARDS_PRIME_LIMIT";
pub const ENV_CONTENT_DIR: &str = "HAZARDS_CONTENT_DIR";
pub const ENV_HASH_ROUNDS: &str = "HAZARDS_HASH_ROUNDS";

const DEFAULT_WORKERS: usize = 4;
const DEFAULT_TRIALS: usize = 10;
const DEFAULT_DRAIN_WAIT: Duration = Duration::from_secs(60);
const DEFAULT_DEADLOCK_WAIT: Duration = Duration::from_secs(2);
const DEFAULT_PRIME_LIMIT: u64 = 10_000_000;
const DEFAULT_HASH_ROUNDS: u32 = 100_000;

/// Degree of parallelism for the data-parallel primitive.
///
/// Fixed when the parallel pool is built and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelismConfig {
    degree: usize,
}

impl ParallelismConfig {
    /// # Panics
    ///
    /// Panics if `degree` is 0.
    #[must_use]
    pub const fn new(degree: usize) -> Self {
        assert!(degree > 0, "parallelism degree must be > 0");
        Self { degree }
    }

    /// One participant per available core.
    #[must_use]
    pub fn available() -> Self {
        Self::new(get_max_threads())
    }

    #[must_use]
    pub const fn degree(&self) -> usize {
        self.degree
    }
}

impl Default for ParallelismConfig {
    fn default() -> Self {
        Self::available()
    }
}

/// Settings shared by every scenario runner.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    workers: usize,
    parallelism: ParallelismConfig,
    trials: usize,
    drain_wait: Duration,
    deadlock_wait: Duration,
    prime_limit: u64,
    hash_rounds: u32,
    content_dir: PathBuf,
}

impl HarnessConfig {
    /// Creates a configuration with default values.
    ///
    /// Defaults:
    /// - `workers`: 4
    /// - `parallelism`: available cores
    /// - `trials`: 10
    /// - `drain_wait`: 60s
    /// - `deadlock_wait`: 2s
    /// - `prime_limit`: 10 000 000
    /// - `hash_rounds`: 100 000
    /// - `content_dir`: `.`
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            parallelism: ParallelismConfig::available(),
            trials: DEFAULT_TRIALS,
            drain_wait: DEFAULT_DRAIN_WAIT,
            deadlock_wait: DEFAULT_DEADLOCK_WAIT,
            prime_limit: DEFAULT_PRIME_LIMIT,
            hash_rounds: DEFAULT_HASH_ROUNDS,
            content_dir: PathBuf::from("."),
        }
    }

    /// Reads overrides from the `HAZARDS_*` environment variables.
    ///
    /// Missing, unparsable or zero values keep the default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Some(workers) = read_positive::<usize>(ENV_WORKERS) {
            config.workers = workers;
        }
        if let Some(degree) = read_positive::<usize>(ENV_PARALLELISM) {
            config.parallelism = ParallelismConfig::new(degree);
        }
        if let Some(trials) = read_positive::<usize>(ENV_TRIALS) {
            config.trials = trials;
        }
        if let Some(secs) = read_positive::<u64>(ENV_WAIT_SECS) {
            config.drain_wait = Duration::from_secs(secs);
            config.deadlock_wait = Duration::from_secs(secs);
        }
        if let Some(limit) = read_positive::<u64>(ENV_PRIME_LIMIT) {
            config.prime_limit = limit;
        }
        if let Some(rounds) = read_positive::<u32>(ENV_HASH_ROUNDS) {
            config.hash_rounds = rounds;
        }
        if let Ok(dir) = env::var(ENV_CONTENT_DIR) {
            if !dir.trim().is_empty() {
                config.content_dir = PathBuf::from(dir);
            }
        }

        tracing::debug!("Loaded harness config: {:?}", config);
        config
    }

    /// # Panics
    ///
    /// Panics if `count` is 0.
    #[must_use]
    pub fn workers(mut self, count: usize) -> Self {
        assert!(count > 0, "worker count must be > 0");
        self.workers = count;
        self
    }

    #[must_use]
    pub fn parallelism(mut self, parallelism: ParallelismConfig) -> Self {
        self.parallelism = parallelism;
        self
    }

    #[must_use]
    pub fn trials(mut self, count: usize) -> Self {
        self.trials = count;
        self
    }

    #[must_use]
    pub fn drain_wait(mut self, wait: Duration) -> Self {
        self.drain_wait = wait;
        self
    }

    #[must_use]
    pub fn deadlock_wait(mut self, wait: Duration) -> Self {
        self.deadlock_wait = wait;
        self
    }

    #[must_use]
    pub fn prime_limit(mut self, limit: u64) -> Self {
        self.prime_limit = limit;
        self
    }

    #[must_use]
    pub fn hash_rounds(mut self, rounds: u32) -> Self {
        self.hash_rounds = rounds;
        self
    }

    #[must_use]
    pub fn content_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.content_dir = dir.into();
        self
    }

    #[must_use]
    pub const fn get_workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub const fn get_parallelism(&self) -> ParallelismConfig {
        self.parallelism
    }

    #[must_use]
    pub const fn get_trials(&self) -> usize {
        self.trials
    }

    #[must_use]
    pub const fn get_drain_wait(&self) -> Duration {
        self.drain_wait
    }

    #[must_use]
    pub const fn get_deadlock_wait(&self) -> Duration {
        self.deadlock_wait
    }

    #[must_use]
    pub const fn get_prime_limit(&self) -> u64 {
        self.prime_limit
    }

    #[must_use]
    pub const fn get_hash_rounds(&self) -> u32 {
        self.hash_rounds
    }

    #[must_use]
    pub fn get_content_dir(&self) -> &std::path::Path {
        &self.content_dir
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// [get_max_threads] returns the threads the platform reports as usable.
pub(crate) fn get_max_threads() -> usize {
    match std::thread::available_parallelism().ok().map(std::num::NonZeroUsize::get) {
        Some(system_value) => {
            tracing::debug!("thread::available_parallelism() reported: {}", system_value);
            system_value
        }
        None => 1,
    }
}

fn read_positive<T>(key: &str) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    match env::var(key).ok().and_then(|s| T::from_str(s.trim()).ok()) {
        Some(value) if value > T::default() => {
            tracing::debug!("Retrieved {} from environment", key);
            Some(value)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing_test::traced_test;

    fn clear_env() {
        for key in [
            ENV_WORKERS,
            ENV_PARALLELISM,
            ENV_TRIALS,
            ENV_WAIT_SECS,
            ENV_PRIME_LIMIT,
            ENV_CONTENT_DIR,
            ENV_HASH_ROUNDS,
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn defaults_without_environment() {
        clear_env();
        let config = HarnessConfig::from_env();
        assert_eq!(config.get_workers(), DEFAULT_WORKERS);
        assert_eq!(config.get_trials(), DEFAULT_TRIALS);
        assert_eq!(config.get_prime_limit(), DEFAULT_PRIME_LIMIT);
        assert_eq!(config.get_deadlock_wait(), DEFAULT_DEADLOCK_WAIT);
        assert!(config.get_parallelism().degree() >= 1);
    }

    #[test]
    #[serial]
    #[traced_test]
    fn environment_overrides_defaults() {
        clear_env();
        env::set_var(ENV_WORKERS, "8");
        env::set_var(ENV_PARALLELISM, "3");
        env::set_var(ENV_WAIT_SECS, "5");
        env::set_var(ENV_CONTENT_DIR, "/tmp/pages");

        let config = HarnessConfig::from_env();
        assert_eq!(config.get_workers(), 8);
        assert_eq!(config.get_parallelism().degree(), 3);
        assert_eq!(config.get_drain_wait(), Duration::from_secs(5));
        assert_eq!(config.get_content_dir(), std::path::Path::new("/tmp/pages"));
        assert!(logs_contain("Retrieved HAZARDS_WORKERS from environment"));

        clear_env();
    }

    #[test]
    #[serial]
    fn zero_and_garbage_fall_back_to_defaults() {
        clear_env();
        env::set_var(ENV_WORKERS, "0");
        env::set_var(ENV_TRIALS, "many");

        let config = HarnessConfig::from_env();
        assert_eq!(config.get_workers(), DEFAULT_WORKERS);
        assert_eq!(config.get_trials(), DEFAULT_TRIALS);

        clear_env();
    }

    /// WHY: Any positive wait from the environment must be usable as a bound
    /// WHAT: HAZARDS_WAIT_SECS=u64::MAX still drains a pool
    #[test]
    #[serial]
    fn largest_wait_from_environment_drains_a_pool() {
        clear_env();
        env::set_var(ENV_WAIT_SECS, u64::MAX.to_string());
        let config = HarnessConfig::from_env();
        clear_env();
        assert_eq!(config.get_drain_wait(), Duration::from_secs(u64::MAX));

        let pool = crate::primitives::TaskPool::new(2).unwrap();
        let answer = pool.submit(|| 6 * 7).unwrap();
        pool.await_termination(config.get_drain_wait()).unwrap();
        assert_eq!(answer.wait_timeout(config.get_drain_wait()).unwrap(), 42);
    }

    #[test]
    #[should_panic(expected = "parallelism degree must be > 0")]
    fn zero_parallelism_is_rejected() {
        let _ = ParallelismConfig::new(0);
    }
}
