use clap::Parser;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use foundation_hazards::{timing, BoxedError, HarnessConfig, Scenario};

/// Runs one concurrency hazard scenario and prints what happened.
///
/// Tuning comes from the `HAZARDS_*` environment variables.
#[derive(Parser, Debug)]
#[command(version, about, long_about=None)]
struct Args {
    /// Scenario to run, e.g. `race-list`, `deadlock`, `find-primes`
    #[arg(value_parser = parse_scenario)]
    scenario: Scenario,
}

fn parse_scenario(value: &str) -> Result<Scenario, String> {
    value.parse()
}

fn main() -> Result<(), BoxedError> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = HarnessConfig::from_env();
    let scenario = args.scenario;
    tracing::info!("{}: {}", scenario, scenario.description());

    timing::test(scenario.name(), || scenario.run(&config))?;
    Ok(())
}
