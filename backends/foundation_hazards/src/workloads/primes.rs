//! Prime search over an inclusive range, three ways.
//!
//! - sequential: one thread, one `Vec`
//! - parallel locked: every hit goes through one [`SynchronizedContainer`]
//! - parallel collected: each rayon task keeps its own hits, merged at the end
//!
//! All three return the same ascending list for the same range.

use core::ops::RangeInclusive;
use core::time::Duration;

use rayon::prelude::*;

use crate::config::ParallelismConfig;
use crate::errors::HazardResult;
use crate::hazards::SynchronizedContainer;
use crate::timing;

/// Trial division by odd candidates up to `sqrt(n)`. 0 and 1 are not prime.
#[must_use]
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let limit = n.isqrt();
    (3..=limit).step_by(2).all(|divisor| n % divisor != 0)
}

/// Builds the data-parallel pool the parallel strategies run on.
///
/// The degree is fixed for the life of the returned pool.
///
/// # Errors
///
/// [`crate::HazardError::ParallelPool`] if rayon cannot start its threads.
pub fn build_parallel_pool(config: ParallelismConfig) -> HazardResult<rayon::ThreadPool> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.degree())
        .thread_name(|index| format!("hazard-parallel-{index}"))
        .build()?;
    tracing::debug!("parallel pool started with degree {}", config.degree());
    Ok(pool)
}

#[must_use]
pub fn primes_sequential(range: RangeInclusive<u64>) -> Vec<u64> {
    range.filter(|&n| is_prime(n)).collect()
}

/// Parallel scan where every hit contends for the container's lock.
#[must_use]
pub fn primes_parallel_locked(range: RangeInclusive<u64>, pool: &rayon::ThreadPool) -> Vec<u64> {
    let found = SynchronizedContainer::<u64>::new();
    pool.install(|| {
        range
            .into_par_iter()
            .filter(|&n| is_prime(n))
            .for_each(|n| found.append(n));
    });

    // lock-grant order is arbitrary
    let mut primes = found.into_vec();
    primes.sort_unstable();
    primes
}

/// Parallel scan with no shared state; rayon stitches the pieces in order.
#[must_use]
pub fn primes_parallel_collected(range: RangeInclusive<u64>, pool: &rayon::ThreadPool) -> Vec<u64> {
    pool.install(|| range.into_par_iter().filter(|&n| is_prime(n)).collect())
}

/// One strategy's result count and elapsed time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyTiming {
    pub name: &'static str,
    pub count: usize,
    pub duration: Duration,
    /// Whether the primes found are exactly the sequential scan's.
    pub matches_sequential: bool,
}

impl core::fmt::Display for StrategyTiming {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:<20} {:>10} primes in {:>8}ms",
            self.name,
            self.count,
            self.duration.as_millis()
        )?;
        if !self.matches_sequential {
            write!(f, "  MISMATCH with sequential")?;
        }
        Ok(())
    }
}

/// Runs each strategy over `range` and reports count and duration per strategy.
///
/// # Errors
///
/// [`crate::HazardError::ParallelPool`] if the parallel pool cannot be built.
pub fn compare_strategies(
    range: RangeInclusive<u64>,
    config: ParallelismConfig,
) -> HazardResult<Vec<StrategyTiming>> {
    let pool = build_parallel_pool(config)?;

    let (sequential, sequential_time) = timing::measure_value(|| primes_sequential(range.clone()));
    let (locked, locked_time) = timing::measure_value(|| primes_parallel_locked(range.clone(), &pool));
    let (collected, collected_time) =
        timing::measure_value(|| primes_parallel_collected(range.clone(), &pool));

    let locked_agrees = locked == sequential;
    let collected_agrees = collected == sequential;
    if !(locked_agrees && collected_agrees) {
        tracing::error!(
            "prime strategies disagree: sequential={} locked={} collected={}",
            sequential.len(),
            locked.len(),
            collected.len()
        );
    }

    Ok(vec![
        StrategyTiming {
            name: "sequential",
            count: sequential.len(),
            duration: sequential_time,
            matches_sequential: true,
        },
        StrategyTiming {
            name: "parallel-locked",
            count: locked.len(),
            duration: locked_time,
            matches_sequential: locked_agrees,
        },
        StrategyTiming {
            name: "parallel-collected",
            count: collected.len(),
            duration: collected_time,
            matches_sequential: collected_agrees,
        },
    ])
}
