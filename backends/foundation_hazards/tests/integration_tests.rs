//! End-to-end checks that each hazard manifests (or provably does not) when
//! the pieces are wired together the way the scenarios wire them.

use foundation_hazards::hazards::{
    run_conflicting, run_consistent, DeadlockOutcome, DualLockActor, InitStrategy, ReadPolicy,
    SharedSequence, SingletonRegistry, SynchronizedContainer,
};
use foundation_hazards::primitives::{Barrier, TaskPool};
use foundation_hazards::workloads::{
    build_parallel_pool, find_matches, list_files, primes_parallel_collected,
    primes_parallel_locked, primes_sequential, read_file,
};
use foundation_hazards::{HarnessConfig, HazardError, ParallelismConfig, Scenario};
use foundation_hazards::{TrialConfig, TrialRunner};
use ntest::timeout;
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[test]
#[timeout(30000)]
fn test_pool_drains_every_submission() {
    let pool = TaskPool::new(4).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..500 {
        let counter = Arc::clone(&counter);
        pool.execute(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }

    pool.await_termination(Duration::from_secs(10)).unwrap();
    assert_eq!(counter.load(Ordering::Relaxed), 500);
    assert_eq!(pool.stats().completed, 500);
}

#[test]
#[timeout(30000)]
fn test_barrier_on_pool_releases_once_per_cycle() {
    let parties = 4;
    let cycles = 3;
    let pool = TaskPool::new(parties).unwrap();
    let releases = Arc::new(AtomicUsize::new(0));
    let releases_clone = Arc::clone(&releases);
    let barrier = Barrier::with_action(parties, move || {
        releases_clone.fetch_add(1, Ordering::SeqCst);
    });

    let futures: Vec<_> = (0..parties)
        .map(|_| {
            let barrier = barrier.clone();
            pool.submit(move || {
                (0..cycles)
                    .map(|_| barrier.arrive().map(|arrival| arrival.is_leader()))
                    .collect::<Result<Vec<_>, _>>()
            })
            .unwrap()
        })
        .collect();

    let mut leaders = 0;
    for future in futures {
        leaders += future.wait().unwrap().unwrap().into_iter().filter(|l| *l).count();
    }

    assert_eq!(releases.load(Ordering::SeqCst), cycles);
    assert_eq!(leaders, cycles);
    assert!(pool.shutdown_and_wait(Duration::from_secs(5)));
}

#[test]
#[timeout(30000)]
fn test_barrier_timeout_breaks_waiters() {
    let barrier = Barrier::new(3);
    let waiter = {
        let barrier = barrier.clone();
        thread::spawn(move || barrier.arrive())
    };

    // give the waiter time to block before the second party gives up
    thread::sleep(Duration::from_millis(50));
    let mine = barrier.arrive_timeout(Duration::from_millis(50));

    assert!(matches!(mine, Err(HazardError::WaitTimeout)));
    assert!(matches!(waiter.join().unwrap(), Err(HazardError::BrokenBarrier)));
    assert!(barrier.is_broken());

    barrier.reset();
    assert!(!barrier.is_broken());
}

#[test]
#[timeout(60000)]
fn test_unsynchronized_sequence_loses_updates_across_trials() {
    let runner = TrialRunner::new(TrialConfig::new().trials(20).participants(8));
    let report = runner.run(|_, participants| {
        let sequence = Arc::new(SharedSequence::<u64>::new(10_000));
        let pool = TaskPool::new(participants).unwrap();
        for i in 0..10_000u64 {
            let sequence = Arc::clone(&sequence);
            pool.execute(move || sequence.append(i)).unwrap();
        }
        assert!(pool.shutdown_and_wait(Duration::from_secs(30)));
        sequence.size() < 10_000
    });

    assert!(report.ever_manifested(), "{report}");
}

#[test]
#[timeout(60000)]
fn test_synchronized_container_never_loses_updates() {
    let runner = TrialRunner::new(TrialConfig::new().trials(5).participants(8));
    let report = runner.run(|_, participants| {
        let container = Arc::new(SynchronizedContainer::<u64>::new());
        let pool = TaskPool::new(participants).unwrap();
        for i in 0..10_000u64 {
            let container = Arc::clone(&container);
            pool.execute(move || container.append(i)).unwrap();
        }
        assert!(pool.shutdown_and_wait(Duration::from_secs(30)));
        container.size() != 10_000
    });

    assert_eq!(report.manifested, 0);
}

#[test]
#[timeout(30000)]
fn test_unlocked_reads_see_values_that_were_written() {
    let container = Arc::new(SynchronizedContainer::<u32>::with_policy(ReadPolicy::Unlocked));
    let written = Arc::new(Mutex::new(HashSet::new()));
    let pool = TaskPool::new(4).unwrap();

    for i in 0..200u32 {
        let container = Arc::clone(&container);
        let written = Arc::clone(&written);
        pool.execute(move || {
            written.lock().unwrap().insert(i);
            container.append(i);
        })
        .unwrap();
    }
    let reads: Vec<_> = (0..50)
        .map(|_| {
            let container = Arc::clone(&container);
            pool.submit(move || container.last()).unwrap()
        })
        .collect();

    assert!(pool.shutdown_and_wait(Duration::from_secs(10)));
    let written = written.lock().unwrap();
    for read in reads {
        if let Some(value) = read.wait().unwrap() {
            assert!(written.contains(&value));
        }
    }
    assert_eq!(container.size(), 200);
}

#[test]
#[timeout(30000)]
fn test_once_registry_shared_by_pool_workers() {
    let registry = Arc::new(
        SingletonRegistry::new(InitStrategy::Once).with_construct_delay(Duration::from_millis(10)),
    );
    let pool = TaskPool::new(16).unwrap();
    let start = Barrier::new(16);

    let ids: Vec<_> = (0..16)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let start = start.clone();
            pool.submit(move || {
                start.arrive().unwrap();
                registry.get_instance().id()
            })
            .unwrap()
        })
        .collect();

    let distinct: HashSet<_> = ids.into_iter().map(|f| f.wait().unwrap()).collect();
    assert_eq!(distinct.len(), 1);
    assert_eq!(registry.constructed(), 1);
}

#[test]
#[timeout(20000)]
fn test_deadlock_outcomes() {
    let baseline = Arc::new(DualLockActor::new().with_hold_delay(Duration::from_millis(50)));
    assert_eq!(
        run_consistent(&baseline, Duration::from_secs(5)).unwrap(),
        DeadlockOutcome::Completed
    );

    let wedged = Arc::new(DualLockActor::new().with_hold_delay(Duration::from_millis(200)));
    assert_eq!(
        run_conflicting(&wedged, Duration::from_millis(800)).unwrap(),
        DeadlockOutcome::DidNotComplete
    );
}

#[test]
#[timeout(60000)]
fn test_prime_strategies_agree_on_every_degree() {
    let expected = primes_sequential(0..=50_000);
    for degree in [1, 2, 8] {
        let pool = build_parallel_pool(ParallelismConfig::new(degree)).unwrap();
        assert_eq!(primes_parallel_locked(0..=50_000, &pool), expected);
        assert_eq!(primes_parallel_collected(0..=50_000, &pool), expected);
    }
}

#[test]
fn test_collaborators_over_a_content_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(
        dir.path().join("a.html"),
        r#"<title>A</title><a href="x">x</a><a href="y">y</a>"#,
    )
    .unwrap();
    fs::write(dir.path().join("nested/b.html"), r#"<a href="z">z</a>"#).unwrap();
    fs::write(dir.path().join("notes.txt"), r#"href="ignored""#).unwrap();

    let files = list_files(dir.path(), "html").unwrap();
    assert_eq!(files.len(), 2);

    let hrefs: usize = files
        .iter()
        .map(|f| find_matches(&read_file(f).unwrap(), r#"href=".*?""#).unwrap().len())
        .sum();
    assert_eq!(hrefs, 3);

    let config = HarnessConfig::new()
        .content_dir(dir.path())
        .drain_wait(Duration::from_secs(10));
    Scenario::CountHrefs.run(&config).unwrap();
}

#[test]
#[timeout(60000)]
fn test_quick_scenarios_run_to_completion() {
    let config = HarnessConfig::new()
        .workers(4)
        .parallelism(ParallelismConfig::new(2))
        .trials(2)
        .hash_rounds(10)
        .prime_limit(10_000)
        .deadlock_wait(Duration::from_millis(500))
        .drain_wait(Duration::from_secs(20));

    for scenario in [
        Scenario::NoThreads,
        Scenario::WithThreads,
        Scenario::ExecuteRunnables,
        Scenario::SubmitCallables,
        Scenario::Parallel,
        Scenario::Barrier,
        Scenario::RaceItems,
        Scenario::Deadlock,
        Scenario::FindPrimes,
    ] {
        scenario.run(&config).unwrap();
    }
}
