//! Headless lane-defense runner.
//!
//! This binary runs the simulation without graphics, controlled via JSON on
//! stdin/stdout. Designed for scripted controllers and CI testing.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p lane_headless
//!
//! # Interactive session on a scenario file
//! cargo run -p lane_headless -- run --scenario data/scenarios/skirmish.ron
//!
//! # Play one scenario to the end and print a summary
//! cargo run -p lane_headless -- simulate --scenario skirmish --seed 7
//!
//! # Run batch balance test
//! cargo run -p lane_headless -- batch --scenario skirmish --count 1000 --output results/
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information, filtered by `--verbose` or `RUST_LOG`
//!
//! See the protocol module for command/response format.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lane_headless::{
    batch::{run_batch, run_game, verify_determinism, BatchConfig},
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "lane_headless")]
#[command(about = "Headless lane-defense runner for scripted play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single interactive session
    Run {
        /// Scenario file to load, or `skirmish` / `empty`
        #[arg(short, long)]
        scenario: Option<String>,

        /// Output state after every tick command
        #[arg(long)]
        auto_state: bool,
    },

    /// Play a scenario to the end and print a JSON summary
    Simulate {
        /// Scenario file to load, or `skirmish` / `empty`
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Wave seed (defaults to the scenario's own)
        #[arg(long)]
        seed: Option<u64>,

        /// Tick limit
        #[arg(short, long, default_value = "19200")]
        ticks: u64,
    },

    /// Run batch of games for balance testing
    Batch {
        /// Scenario to run
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting wave seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick limit per game
        #[arg(short, long, default_value = "19200")]
        ticks: u64,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        /// Scenario to test
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Tick limit per run
        #[arg(short, long, default_value = "19200")]
        ticks: u64,
    },

    /// Run N ticks for benchmarking
    Benchmark {
        /// Number of ticks to run
        #[arg(short, long, default_value = "19200")]
        ticks: u64,

        /// Scenario to benchmark
        #[arg(short, long, default_value = "skirmish")]
        scenario: String,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            auto_state,
        }) => cmd_run(scenario, auto_state),
        Some(Commands::Simulate {
            scenario,
            seed,
            ticks,
        }) => cmd_simulate(&scenario, seed, ticks),
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            ticks,
        }) => cmd_batch(&scenario, count, parallel, output, seed, ticks),
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
            ticks,
        }) => cmd_verify(&scenario, seed, runs, ticks),
        Some(Commands::Benchmark { ticks, scenario }) => cmd_benchmark(&scenario, ticks),
        None => cmd_run(None, false),
    }
}

/// Load a scenario or exit.
fn load_scenario(name_or_path: &str) -> Scenario {
    match Scenario::resolve(name_or_path) {
        Ok(scenario) => scenario,
        Err(e) => fatal(&format!("Failed to load scenario '{name_or_path}': {e}")),
    }
}

fn fatal(message: &str) -> ! {
    tracing::error!("{message}");
    eprintln!("FATAL: {message}");
    std::process::exit(1);
}

/// Run a single interactive session
fn cmd_run(scenario: Option<String>, auto_state: bool) {
    tracing::info!("Starting headless runner");

    let config = HeadlessConfig {
        auto_state_output: auto_state,
        scenario_path: scenario,
    };

    if let Err(e) = HeadlessRunner::with_config(config).run() {
        fatal(&format!("Runner failed: {e}"));
    }
}

/// Play one game to the end
fn cmd_simulate(scenario: &str, seed: Option<u64>, ticks: u64) {
    let mut scenario = load_scenario(scenario);
    if let Some(seed) = seed {
        scenario = scenario.with_seed(seed);
    }

    let summary = match run_game(&scenario, ticks) {
        Ok(summary) => summary,
        Err(e) => fatal(&format!("Game failed: {e}")),
    };
    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(e) => fatal(&format!("Failed to serialize summary: {e}")),
    }
}

/// Run batch of games
fn cmd_batch(scenario: &str, count: u32, parallel: u32, output: PathBuf, seed: u64, ticks: u64) {
    let scenario = load_scenario(scenario);

    if parallel > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(parallel as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let config = BatchConfig::new(count)
        .with_seed(seed)
        .with_max_ticks(ticks);
    let results = run_batch(&scenario, config);

    let path = output.join("batch.json");
    if let Err(e) = results.save(&path) {
        fatal(&format!("Failed to save results: {e}"));
    }

    eprintln!("Batch complete:");
    eprintln!("  Games:      {}", results.games.len());
    eprintln!("  Victories:  {}", results.summary.victories);
    eprintln!("  Defeats:    {}", results.summary.defeats);
    eprintln!("  Unfinished: {}", results.summary.unfinished);
    eprintln!("  Win rate:   {:.1}%", results.summary.win_rate * 100.0);
    eprintln!("  Errors:     {}", results.errors.len());
    eprintln!("  Results:    {}", path.display());
}

/// Verify determinism
fn cmd_verify(scenario: &str, seed: u64, runs: u32, ticks: u64) {
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario,
        seed,
        runs
    );
    let scenario = load_scenario(scenario).with_seed(seed);

    match verify_determinism(&scenario, runs, ticks) {
        Ok(Some(hash)) => {
            eprintln!("PASS: All {runs} runs produced identical results");
            eprintln!("  Final hash: {hash:016x}");
        }
        Ok(None) => {
            eprintln!("FAIL: Non-determinism detected!");
            std::process::exit(1);
        }
        Err(e) => fatal(&format!("Verification failed: {e}")),
    }
}

/// Tick a scenario as fast as possible
#[allow(clippy::cast_precision_loss)]
fn cmd_benchmark(scenario: &str, ticks: u64) {
    let scenario = load_scenario(scenario);
    let mut sim = match scenario.build_simulation() {
        Ok(sim) => sim,
        Err(e) => fatal(&format!("Failed to build simulation: {e}")),
    };
    if sim.state() == lane_core::state::GameState::Preparing {
        let _ = sim.request_state_transition(lane_core::state::Signal::Start);
    }

    let start = Instant::now();
    let mut ran = 0u64;
    while ran < ticks && sim.state().is_running() {
        sim.tick();
        ran += 1;
    }
    let elapsed = start.elapsed();

    eprintln!("Benchmark: {ran} ticks in {:.3}s", elapsed.as_secs_f64());
    eprintln!(
        "  {:.0} ticks/sec, final state {:?}, hash {:016x}",
        ran as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        sim.state(),
        sim.state_hash()
    );
}
