use crate::config::HarnessConfig;
use crate::errors::HazardResult;
use crate::workloads::compare_strategies;

/// Primes in `[0, prime_limit]` found three ways, with the time each took.
///
/// # Errors
///
/// [`crate::HazardError::ParallelPool`] if the parallel pool cannot be built.
pub fn find_primes(config: &HarnessConfig) -> HazardResult<()> {
    let limit = config.get_prime_limit();
    println!(
        "primes in [0, {limit}] with parallelism {}",
        config.get_parallelism().degree()
    );

    for timing in compare_strategies(0..=limit, config.get_parallelism())? {
        println!("{timing}");
    }
    Ok(())
}
