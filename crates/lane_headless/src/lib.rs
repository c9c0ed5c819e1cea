//! Headless lane-defense runner for scripted play and CI verification.
//!
//! This crate drives the deterministic simulation in `lane_core` without
//! any presentation layer. It enables:
//!
//! - **Scripted play**: A controller places defenders and advances ticks
//!   over a JSON-lines protocol
//! - **CI verification**: Repeated runs of a scenario must agree on the
//!   final state hash
//! - **Balance testing**: Batches of wave seeds played in parallel
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (tick, place, spawn, etc.)
//! - **stdout**: Responses and simulation events (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command/response specification.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","count":32}' | cargo run -p lane_headless
//!
//! # Run a scenario
//! cargo run -p lane_headless -- run --scenario data/scenarios/skirmish.ron
//!
//! # Verify determinism
//! cargo run -p lane_headless -- verify --scenario skirmish --runs 5
//! ```

pub mod batch;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, run_game, verify_determinism, BatchConfig, BatchResults};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner, Session};
pub use scenario::{Scenario, ScenarioError};
