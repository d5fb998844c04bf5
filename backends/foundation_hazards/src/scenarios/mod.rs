//! Named, console-printing scenarios that wire the primitives and hazard
//! objects together.
//!
//! Every runner takes the shared [`HarnessConfig`] and returns
//! [`HazardResult<()>`]; a hazard that manifests is reported on stdout, not
//! as an error.

use core::str::FromStr;

use crate::config::HarnessConfig;
use crate::errors::HazardResult;

pub mod barrier;
pub mod basics;
pub mod deadlock;
pub mod io;
pub mod primes;
pub mod races;

/// Number of work items the basic pool scenarios push through.
pub const BASIC_ITEMS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    NoThreads,
    WithThreads,
    ExecuteRunnables,
    SubmitCallables,
    Parallel,
    Barrier,
    RaceList,
    RaceSingleton,
    RaceItems,
    RaceStack,
    AddToList,
    Deadlock,
    SyncList,
    FindPrimes,
    CountHrefs,
    SqlAndFiles,
}

impl Scenario {
    pub const ALL: [Scenario; 16] = [
        Scenario::NoThreads,
        Scenario::WithThreads,
        Scenario::ExecuteRunnables,
        Scenario::SubmitCallables,
        Scenario::Parallel,
        Scenario::Barrier,
        Scenario::RaceList,
        Scenario::RaceSingleton,
        Scenario::RaceItems,
        Scenario::RaceStack,
        Scenario::AddToList,
        Scenario::Deadlock,
        Scenario::SyncList,
        Scenario::FindPrimes,
        Scenario::CountHrefs,
        Scenario::SqlAndFiles,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Scenario::NoThreads => "no-threads",
            Scenario::WithThreads => "with-threads",
            Scenario::ExecuteRunnables => "execute-runnables",
            Scenario::SubmitCallables => "submit-callables",
            Scenario::Parallel => "parallel",
            Scenario::Barrier => "barrier",
            Scenario::RaceList => "race-list",
            Scenario::RaceSingleton => "race-singleton",
            Scenario::RaceItems => "race-items",
            Scenario::RaceStack => "race-stack",
            Scenario::AddToList => "add-to-list",
            Scenario::Deadlock => "deadlock",
            Scenario::SyncList => "sync-list",
            Scenario::FindPrimes => "find-primes",
            Scenario::CountHrefs => "count-hrefs",
            Scenario::SqlAndFiles => "sql-and-files",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Scenario::NoThreads => "hash 30 strings on the calling thread",
            Scenario::WithThreads => "hash 30 strings, one thread each",
            Scenario::ExecuteRunnables => "hash 30 strings on the task pool, fire-and-forget",
            Scenario::SubmitCallables => "hash 30 strings on the task pool, read futures in order",
            Scenario::Parallel => "hash 30 strings with a data-parallel loop",
            Scenario::Barrier => "workers sleep randomly then meet at a barrier",
            Scenario::RaceList => "parallel appends to an unsynchronized sequence",
            Scenario::RaceSingleton => "concurrent first access to an unguarded singleton",
            Scenario::RaceItems => "hand out 10 items from the pool, removing each after slow work",
            Scenario::RaceStack => "pop an unsynchronized stack down to 10 from the pool",
            Scenario::AddToList => "1000 pool appends to an unsynchronized sequence",
            Scenario::Deadlock => "two operations taking two locks in opposite order",
            Scenario::SyncList => "locked vs unlocked reads on a synchronized container",
            Scenario::FindPrimes => "sequential vs locked-parallel vs collected-parallel primes",
            Scenario::CountHrefs => "count hrefs in every html file of the content dir",
            Scenario::SqlAndFiles => "overlap a slow query with reading page titles",
        }
    }

    /// # Errors
    ///
    /// Whatever the scenario itself fails with.
    pub fn run(self, config: &HarnessConfig) -> HazardResult<()> {
        tracing::info!("running scenario {}", self.name());
        match self {
            Scenario::NoThreads => basics::no_threads(config),
            Scenario::WithThreads => basics::with_threads(config),
            Scenario::ExecuteRunnables => basics::execute_runnables(config),
            Scenario::SubmitCallables => basics::submit_callables(config),
            Scenario::Parallel => basics::parallel(config),
            Scenario::Barrier => barrier::barrier(config),
            Scenario::RaceList => races::race_list(config),
            Scenario::RaceSingleton => races::race_singleton(config),
            Scenario::RaceItems => races::race_items(config),
            Scenario::RaceStack => races::race_stack(config),
            Scenario::AddToList => races::add_to_list(config),
            Scenario::Deadlock => deadlock::deadlock(config),
            Scenario::SyncList => races::sync_list(config),
            Scenario::FindPrimes => primes::find_primes(config),
            Scenario::CountHrefs => io::count_hrefs(config),
            Scenario::SqlAndFiles => io::sql_and_files(config),
        }
    }
}

impl core::fmt::Display for Scenario {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Scenario::ALL
            .into_iter()
            .find(|scenario| scenario.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<_> = Scenario::ALL.iter().map(|s| s.name()).collect();
                format!("unknown scenario {wanted:?}, expected one of: {}", known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_round_trip_and_are_unique() {
        let mut seen = HashSet::new();
        for scenario in Scenario::ALL {
            assert!(seen.insert(scenario.name()));
            assert_eq!(scenario.name().parse::<Scenario>().unwrap(), scenario);
            assert!(!scenario.description().is_empty());
        }
        assert_eq!(seen.len(), 16);
    }

    #[test]
    fn unknown_name_lists_choices() {
        let err = "race-cars".parse::<Scenario>().unwrap_err();
        assert!(err.contains("race-cars"));
        assert!(err.contains("find-primes"));
        assert_eq!(" Deadlock ".parse::<Scenario>().unwrap(), Scenario::Deadlock);
    }
}
