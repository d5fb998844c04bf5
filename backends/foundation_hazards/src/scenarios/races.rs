//! Lost updates, duplicate singletons, items handed out twice, over-popped
//! stacks and the cost of locking reads.

use core::time::Duration;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use rayon::prelude::*;

use crate::config::HarnessConfig;
use crate::errors::HazardResult;
use crate::hazards::{
    InitStrategy, Instance, ReadPolicy, SharedSequence, SingletonRegistry, SynchronizedContainer,
};
use crate::primitives::{Barrier, TaskPool};
use crate::timing;
use crate::trials::{TrialConfig, TrialRunner};
use crate::workloads::{build_parallel_pool, slow_hash};

const RACE_LIST_ITEMS: usize = 10_000;
const ADD_TO_LIST_ITEMS: usize = 1_000;
const STACK_ITEMS: usize = 1_000;
const STACK_FLOOR: usize = 10;
const SYNC_LIST_ITEMS: usize = 100;
const SYNC_LIST_DELAY: Duration = Duration::from_millis(10);
const SINGLETON_CALLERS: usize = 4;
const ITEMS: &[u8] = b"abcdefghij";
const ITEM_WORKERS: usize = 4;

fn trial_runner(config: &HarnessConfig, participants: usize) -> TrialRunner {
    TrialRunner::new(
        TrialConfig::new()
            .trials(config.get_trials())
            .participants(participants),
    )
}

/// Data-parallel `append(i * 2)` for 10 000 values into the unsynchronized
/// sequence, repeated once per trial.
///
/// # Errors
///
/// [`crate::HazardError::ParallelPool`] if the parallel pool cannot be built.
pub fn race_list(config: &HarnessConfig) -> HazardResult<()> {
    let pool = build_parallel_pool(config.get_parallelism())?;

    let report = trial_runner(config, config.get_parallelism().degree()).run(|trial, _| {
        let sequence = SharedSequence::<u64>::new(RACE_LIST_ITEMS);
        pool.install(|| {
            (0..RACE_LIST_ITEMS as u64)
                .into_par_iter()
                .map(|i| i * 2)
                .for_each(|value| sequence.append(value));
        });

        println!("trial {trial}: {} of {RACE_LIST_ITEMS}", sequence.size());
        sequence.size() < RACE_LIST_ITEMS
    });

    println!("{report}");
    Ok(())
}

/// Four callers line up behind a barrier and ask an unguarded registry for
/// its instance at once; then the same with one-time initialization.
///
/// # Errors
///
/// [`crate::HazardError::TaskPanicked`] if a caller panicked,
/// [`crate::HazardError::BrokenBarrier`] if the start line broke.
pub fn race_singleton(config: &HarnessConfig) -> HazardResult<()> {
    for strategy in [InitStrategy::Racy, InitStrategy::Once] {
        let runner = trial_runner(config, SINGLETON_CALLERS);
        println!(
            "\n{strategy:?} ({} trials, {} callers)",
            runner.config().get_trials(),
            runner.config().get_participants()
        );

        let report = runner.try_run(|trial, callers| {
            let registry = Arc::new(
                SingletonRegistry::new(strategy).with_construct_delay(Duration::from_millis(1)),
            );
            let instances = first_access(&registry, callers)?;

            let line: Vec<_> = instances
                .iter()
                .enumerate()
                .map(|(x, instance)| {
                    format!("{}: {} ({})", x + 1, instance.id(), instance.created_on())
                })
                .collect();
            println!("trial {trial} {:?}: {}", registry.strategy(), line.join(", "));

            let distinct: BTreeSet<_> = instances.iter().map(|instance| instance.id()).collect();
            Ok(distinct.len() > 1)
        })?;

        println!("{report}");
    }
    Ok(())
}

fn first_access(
    registry: &Arc<SingletonRegistry>,
    callers: usize,
) -> HazardResult<Vec<Arc<Instance>>> {
    let pool = TaskPool::new(callers)?;
    let start = Barrier::new(callers);

    let futures = (0..callers)
        .map(|_| {
            let registry = Arc::clone(registry);
            let start = start.clone();
            pool.submit(move || -> HazardResult<Arc<Instance>> {
                start.arrive()?;
                Ok(registry.get_instance())
            })
        })
        .collect::<HazardResult<Vec<_>>>()?;

    let mut instances = Vec::with_capacity(callers);
    for future in futures {
        instances.push(future.wait()??);
    }
    Ok(instances)
}

/// Ten lettered items, ten pool tasks. Each task looks at the item on top,
/// does slow work with it, and only then takes it off. Tasks that look
/// before the previous one took its item hand out the same letter again.
///
/// # Errors
///
/// [`crate::HazardError::TaskPanicked`] if a task panicked,
/// [`crate::HazardError::WaitTimeout`] if the pool does not drain in time.
pub fn race_items(config: &HarnessConfig) -> HazardResult<()> {
    let rounds = config.get_hash_rounds();

    let report = trial_runner(config, ITEM_WORKERS).try_run(|trial, workers| {
        let handed = hand_out_items(config, workers, rounds)?;

        let line: Vec<_> = handed
            .iter()
            .enumerate()
            .map(|(x, item)| match item {
                Some(item) => format!("{x}: {}", char::from(*item)),
                None => format!("{x}: -"),
            })
            .collect();
        println!("trial {trial}: {}", line.join(", "));

        let duplicates = duplicate_handouts(&handed);
        if duplicates > 0 {
            println!("trial {trial}: {duplicates} item(s) handed out more than once");
        }
        Ok(duplicates > 0)
    })?;

    println!("{report}");
    Ok(())
}

fn hand_out_items(
    config: &HarnessConfig,
    workers: usize,
    rounds: u32,
) -> HazardResult<Vec<Option<u8>>> {
    let pool = TaskPool::new(workers)?;
    let items = Arc::new(SharedSequence::<u8>::new(ITEMS.len()));
    for item in ITEMS {
        items.append(*item);
    }

    let futures = (0..ITEMS.len())
        .map(|_| {
            let items = Arc::clone(&items);
            pool.submit(move || {
                let item = items.last();
                if let Some(item) = item {
                    let _ = slow_hash(&char::from(item).to_string(), rounds);
                }
                let _ = items.pop();
                item
            })
        })
        .collect::<HazardResult<Vec<_>>>()?;

    let mut handed = Vec::with_capacity(futures.len());
    for future in futures {
        handed.push(future.wait()?);
    }
    pool.await_termination(config.get_drain_wait())?;
    Ok(handed)
}

/// Handouts beyond the first of each item.
fn duplicate_handouts(handed: &[Option<u8>]) -> usize {
    let given: Vec<_> = handed.iter().flatten().collect();
    let distinct: BTreeSet<_> = given.iter().collect();
    given.len() - distinct.len()
}

/// Pushes 1 000 values, then keeps handing `pop` to the pool while the
/// stack still looks bigger than 10. Pops already queued keep running after
/// the loop stops, so the stack overshoots the floor.
///
/// # Errors
///
/// [`crate::HazardError::WaitTimeout`] if the pool does not drain in time.
pub fn race_stack(config: &HarnessConfig) -> HazardResult<()> {
    let pool = TaskPool::new(config.get_workers())?;
    let stack = Arc::new(SharedSequence::<u64>::new(STACK_ITEMS));
    for value in 0..STACK_ITEMS as u64 {
        stack.append(value);
    }

    let mut dispatched = 0usize;
    while stack.size() > STACK_FLOOR {
        let stack = Arc::clone(&stack);
        pool.execute(move || {
            let _ = stack.pop();
        })?;
        dispatched += 1;
        thread::yield_now();
    }

    pool.await_termination(config.get_drain_wait())?;
    tracing::debug!("race-stack dispatched {} pops", dispatched);
    println!("\n{}", stack.size());
    Ok(())
}

/// 1 000 pool submissions each appending its index to the unsynchronized
/// sequence.
///
/// # Errors
///
/// [`crate::HazardError::WaitTimeout`] if the pool does not drain in time.
pub fn add_to_list(config: &HarnessConfig) -> HazardResult<()> {
    let pool = TaskPool::new(config.get_workers().max(8))?;
    let numbers = Arc::new(SharedSequence::<usize>::new(ADD_TO_LIST_ITEMS));

    for i in 0..ADD_TO_LIST_ITEMS {
        let numbers = Arc::clone(&numbers);
        pool.submit(move || numbers.append(i))?;
    }

    pool.await_termination(config.get_drain_wait())?;
    println!("{}", numbers.size());
    Ok(())
}

/// 100 appends then 100 reads on the pool against the synchronized
/// container, once with locked reads and once without.
///
/// # Errors
///
/// [`crate::HazardError::WaitTimeout`] if the pool does not drain in time.
pub fn sync_list(config: &HarnessConfig) -> HazardResult<()> {
    for policy in [ReadPolicy::Locked, ReadPolicy::Unlocked] {
        let (outcome, elapsed) = timing::measure_value(|| sync_list_once(config, policy));
        let (size, used) = outcome?;
        println!("{used:?}: size {size} in {}ms", elapsed.as_millis());
    }
    Ok(())
}

fn sync_list_once(config: &HarnessConfig, policy: ReadPolicy) -> HazardResult<(usize, ReadPolicy)> {
    let pool = TaskPool::new(config.get_workers().max(8))?;
    let list = Arc::new(
        SynchronizedContainer::<usize>::with_policy(policy).with_work_delay(SYNC_LIST_DELAY),
    );

    for i in 0..SYNC_LIST_ITEMS {
        let list = Arc::clone(&list);
        pool.execute(move || list.append(i))?;
    }

    thread::sleep(Duration::from_millis(2));

    for _ in 0..SYNC_LIST_ITEMS {
        let list = Arc::clone(&list);
        pool.execute(move || {
            let _ = list.last();
        })?;
    }

    pool.await_termination(config.get_drain_wait())?;
    Ok((list.size(), list.policy()))
}
