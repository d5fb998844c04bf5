//! The same slow hashing job run five ways: inline, a thread per item, the
//! task pool with and without futures, and a data-parallel loop.

use std::thread;

use rayon::prelude::*;

use super::BASIC_ITEMS;
use crate::config::HarnessConfig;
use crate::errors::{panic_message, HazardError, HazardResult};
use crate::primitives::TaskPool;
use crate::timing::{self, TimingReport};
use crate::workloads::{build_parallel_pool, slow_hash};

fn current_thread_name() -> String {
    thread::current().name().unwrap_or("unnamed").to_string()
}

/// # Errors
///
/// Never fails; the signature matches the other runners.
pub fn no_threads(config: &HarnessConfig) -> HazardResult<()> {
    let rounds = config.get_hash_rounds();
    let mut next = 0usize;
    let laps = timing::measure_repeated(
        || {
            let hash = slow_hash(&next.to_string(), rounds);
            println!("{next}/{BASIC_ITEMS} - {hash}");
            next += 1;
        },
        BASIC_ITEMS,
    );

    let report = TimingReport::new("no-threads", laps);
    tracing::debug!("no-threads timed {} laps", report.timing().laps.len());
    println!("{}", report.to_string_pretty());
    Ok(())
}

/// # Errors
///
/// [`HazardError::Io`] if a thread cannot be spawned,
/// [`HazardError::TaskPanicked`] if one of them panicked.
pub fn with_threads(config: &HarnessConfig) -> HazardResult<()> {
    let rounds = config.get_hash_rounds();
    let mut handles = Vec::with_capacity(BASIC_ITEMS);

    for i in 0..BASIC_ITEMS {
        let handle = thread::Builder::new()
            .name(format!("hazard-thread-{i}"))
            .spawn(move || {
                let hash = slow_hash(&i.to_string(), rounds);
                println!("{i}/{BASIC_ITEMS} >> {} - {hash}", current_thread_name());
            })?;
        handles.push(handle);
    }

    for handle in handles {
        handle
            .join()
            .map_err(|payload| HazardError::TaskPanicked(panic_message(payload.as_ref())))?;
    }
    Ok(())
}

/// # Errors
///
/// [`HazardError::WaitTimeout`] if the pool does not drain in time.
pub fn execute_runnables(config: &HarnessConfig) -> HazardResult<()> {
    let pool = TaskPool::new(config.get_workers())?;
    let rounds = config.get_hash_rounds();

    for i in 0..BASIC_ITEMS {
        pool.execute(move || {
            let hash = slow_hash(&i.to_string(), rounds);
            println!("{i}/{BASIC_ITEMS} >> {} - {hash}", current_thread_name());
        })?;
    }

    pool.await_termination(config.get_drain_wait())
}

/// Results are printed in submission order even though they complete in any
/// order: each `wait` blocks until that particular future is written.
///
/// # Errors
///
/// The first failed future, or [`HazardError::WaitTimeout`] on drain.
pub fn submit_callables(config: &HarnessConfig) -> HazardResult<()> {
    let pool = TaskPool::new(config.get_workers())?;
    let rounds = config.get_hash_rounds();

    let futures = (0..BASIC_ITEMS)
        .map(|i| pool.submit(move || slow_hash(&i.to_string(), rounds)))
        .collect::<HazardResult<Vec<_>>>()?;

    for future in futures {
        let index = future.index();
        let hash = future.wait()?;
        println!("{index}/{BASIC_ITEMS} >> {} - {hash}", current_thread_name());
    }

    pool.await_termination(config.get_drain_wait())
}

/// # Errors
///
/// [`HazardError::ParallelPool`] if the parallel pool cannot be built.
pub fn parallel(config: &HarnessConfig) -> HazardResult<()> {
    let pool = build_parallel_pool(config.get_parallelism())?;
    let rounds = config.get_hash_rounds();

    pool.install(|| {
        (0..BASIC_ITEMS).into_par_iter().for_each(|i| {
            let hash = slow_hash(&i.to_string(), rounds);
            println!("{i}/{BASIC_ITEMS} >> {} - {hash}", current_thread_name());
        });
    });
    Ok(())
}
