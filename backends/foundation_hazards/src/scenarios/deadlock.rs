use core::time::Duration;
use std::sync::Arc;

use crate::config::HarnessConfig;
use crate::errors::HazardResult;
use crate::hazards::{run_conflicting, run_consistent, DeadlockOutcome, DualLockActor};
use crate::trials::{TrialConfig, TrialReport, TrialRunner};

const HOLD_DELAY: Duration = Duration::from_millis(100);

/// Runs the same-order baseline once, then the opposite-order pair once per
/// configured trial, each bounded by the configured deadlock wait.
///
/// A wedged trial is the expected result and is counted, not returned as an
/// error. Its two threads stay blocked until the process exits.
///
/// # Errors
///
/// [`crate::HazardError::Io`] if worker threads cannot be spawned.
pub fn deadlock(config: &HarnessConfig) -> HazardResult<()> {
    let bound = config.get_deadlock_wait();

    let baseline = Arc::new(DualLockActor::new().with_hold_delay(HOLD_DELAY));
    let outcome = run_consistent(&baseline, bound)?;
    println!("op_a + op_a (same lock order): {outcome:?}");

    let report = conflicting_trials(config.get_trials(), HOLD_DELAY, bound)?;
    println!("op_a + op_b (opposite lock order): {report}");

    if report.ever_manifested() {
        println!(
            "wedged trials did not return within {}ms; their threads stay blocked holding one lock each",
            bound.as_millis()
        );
    }
    Ok(())
}

/// One fresh actor per trial; a trial manifests when the pair does not
/// complete within `bound`.
fn conflicting_trials(
    trials: usize,
    hold_delay: Duration,
    bound: Duration,
) -> HazardResult<TrialReport> {
    let runner = TrialRunner::new(TrialConfig::new().trials(trials).participants(2));
    runner.try_run(|trial, _| {
        let actor = Arc::new(DualLockActor::new().with_hold_delay(hold_delay));
        let outcome = run_conflicting(&actor, bound)?;
        tracing::debug!("deadlock trial {}: {:?}", trial, outcome);
        Ok(outcome == DeadlockOutcome::DidNotComplete)
    })
}
