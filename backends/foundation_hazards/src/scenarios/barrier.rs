use core::time::Duration;
use std::thread;

use crate::config::HarnessConfig;
use crate::errors::HazardResult;
use crate::primitives::{ArrivalResult, Barrier, TaskPool};

/// Each pool worker naps for a random 100..2000ms, then waits at a barrier
/// sized to the pool. Nobody passes until the slowest one shows up.
///
/// The barrier capacity must equal the worker count: with fewer workers than
/// parties the last party never gets a thread and the others wait forever.
///
/// # Errors
///
/// [`crate::HazardError::BrokenBarrier`] if a participant broke the cycle,
/// [`crate::HazardError::WaitTimeout`] if the pool does not drain in time.
pub fn barrier(config: &HarnessConfig) -> HazardResult<()> {
    let parties = config.get_workers();
    let pool = TaskPool::new(parties)?;
    let barrier = Barrier::with_action(parties, || println!("\n|| Opening barrier. ||\n"));

    let futures = (0..parties)
        .map(|_| {
            let barrier = barrier.clone();
            pool.submit(move || -> HazardResult<ArrivalResult> {
                thread::sleep(Duration::from_millis(fastrand::u64(0..20) * 100 + 100));

                println!("Completed my task, waiting for others.");
                let arrival = barrier.arrive()?;
                println!("I passed the barrier.");
                Ok(arrival)
            })
        })
        .collect::<HazardResult<Vec<_>>>()?;

    let mut leaders = 0;
    for future in futures {
        if future.wait()??.is_leader() {
            leaders += 1;
        }
    }
    tracing::debug!("barrier released with {} leader(s)", leaders);

    pool.await_termination(config.get_drain_wait())
}
