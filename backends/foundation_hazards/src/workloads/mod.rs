//! Work that scenarios run on threads: the prime search and the opaque
//! slow collaborators.

pub mod collaborators;
pub mod primes;

pub use collaborators::{
    extract_title, find_matches, list_files, read_file, slow_hash, InMemorySource, Row,
    TabularSource,
};
pub use primes::{
    build_parallel_pool, compare_strategies, is_prime, primes_parallel_collected,
    primes_parallel_locked, primes_sequential, StrategyTiming,
};
