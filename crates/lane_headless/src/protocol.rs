//! JSON protocol for headless sessions.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controlling script
//! **Output (stdout):** Responses and simulation events
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","tick":0,...}`
//! 2. Controller sends commands as JSON lines
//! 3. Every `tick` command answers with the events it produced
//! 4. On session end, outputs `{"type":"game_over","result":"victory"|"defeat"}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0,"state":"preparing"}
//! -> {"cmd":"place","unit_type":"shooter","row":2,"col":0}
//! <- {"type":"placed","unit_id":1,"unit_type":"shooter","row":2,"col":0}
//! <- {"type":"events","tick":0,"events":[{"event":"energy_changed","energy":0},...]}
//! -> {"cmd":"start"}
//! <- {"type":"ack","cmd":"start"}
//! -> {"cmd":"tick","count":32}
//! <- {"type":"events","tick":32,"events":[...]}
//! -> {"cmd":"hash"}
//! <- {"type":"hash","tick":32,"hash":1234567890}
//! ```

use lane_core::components::{Faction, UnitRecord};
use lane_core::events::SimEvent;
use lane_core::simulation::Simulation;
use lane_core::state::GameState;
use serde::{Deserialize, Serialize};

/// Protocol version reported in the ready message.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance simulation by N ticks (default: 1).
    Tick {
        /// Ticks to run. Stops early when the session ends.
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Place a defender on the grid.
    Place {
        /// Catalog id.
        unit_type: String,
        /// Grid row.
        row: u32,
        /// Grid column.
        col: u32,
    },

    /// Spawn an attacker outside the wave plan.
    Spawn {
        /// Catalog id.
        unit_type: String,
        /// Lane to enter.
        lane: u32,
    },

    /// Heal a live unit.
    Heal {
        /// Unit to heal.
        unit_id: u64,
        /// Health to restore.
        amount: u32,
    },

    /// Preparing -> Playing.
    Start,

    /// Playing -> Paused.
    Pause,

    /// Paused -> Playing.
    Resume,

    /// Reset to Preparing with an empty battlefield.
    Restart,

    /// Declare the session won.
    Win,

    /// Query current session state without advancing time.
    Query,

    /// Current state hash (for determinism verification).
    Hash,

    /// Quit the runner.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

impl Command {
    /// Wire name of this command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Place { .. } => "place",
            Self::Spawn { .. } => "spawn",
            Self::Heal { .. } => "heal",
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Restart => "restart",
            Self::Win => "win",
            Self::Query => "query",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }

    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Current tick.
        tick: u64,
        /// Current game state.
        state: GameState,
    },

    /// Acknowledgment of a command with no other payload.
    Ack {
        /// Acknowledged command.
        cmd: String,
    },

    /// Error processing a command. Session state is unchanged.
    Error {
        /// Human-readable reason.
        message: String,
        /// Offending command, if it parsed.
        cmd: Option<String>,
    },

    /// Full session snapshot.
    State(Box<SessionSnapshot>),

    /// Defender placed.
    Placed {
        /// New unit id.
        unit_id: u64,
        /// Catalog id.
        unit_type: String,
        /// Grid row.
        row: u32,
        /// Grid column.
        col: u32,
    },

    /// Attacker spawned.
    Spawned {
        /// New unit id.
        unit_id: u64,
        /// Catalog id.
        unit_type: String,
        /// Lane.
        lane: u32,
    },

    /// Unit healed.
    Healed {
        /// Healed unit.
        unit_id: u64,
        /// Health actually restored.
        healed: u32,
    },

    /// Simulation events, in emission order.
    Events {
        /// Tick counter after the events.
        tick: u64,
        /// Events.
        events: Vec<SimEvent>,
    },

    /// State hash for determinism verification.
    Hash {
        /// Tick the hash was taken at.
        tick: u64,
        /// Hash value.
        hash: u64,
    },

    /// Session ended.
    GameOver {
        /// Final outcome.
        result: GameResult,
        /// Tick it ended on.
        tick: u64,
    },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// Snapshot of a running session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Tick counter.
    pub tick: u64,
    /// Game state.
    pub state: GameState,
    /// Energy balance.
    pub energy: u32,
    /// Gold balance.
    pub gold: u32,
    /// Wave progress.
    pub wave: WaveStatus,
    /// Live units in id order.
    pub units: Vec<UnitSnapshot>,
    /// Projectiles in flight.
    pub projectiles: usize,
    /// State hash.
    pub hash: u64,
}

impl SessionSnapshot {
    /// Capture the current state of `sim`.
    #[must_use]
    pub fn capture(sim: &Simulation) -> Self {
        let units = sim
            .units()
            .sorted_ids()
            .into_iter()
            .filter_map(|id| sim.unit(id))
            .map(UnitSnapshot::from_record)
            .collect();
        Self {
            tick: sim.get_tick(),
            state: sim.state(),
            energy: sim.ledger().energy(),
            gold: sim.ledger().gold(),
            wave: WaveStatus {
                current: sim.waves().current_wave(),
                total: sim.waves().total_waves(),
            },
            units,
            projectiles: sim.projectiles().len(),
            hash: sim.state_hash(),
        }
    }
}

/// Wave progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveStatus {
    /// Waves started so far.
    pub current: u32,
    /// Waves in the plan.
    pub total: u32,
}

/// State of a single unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Unit id.
    pub id: u64,
    /// Catalog id.
    pub unit_type: String,
    /// Side.
    pub faction: Faction,
    /// Lane.
    pub lane: u32,
    /// World x (lossy, display only).
    pub x: f64,
    /// World y (lossy, display only).
    pub y: f64,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Last acquired target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<u64>,
}

impl UnitSnapshot {
    fn from_record(unit: &UnitRecord) -> Self {
        Self {
            id: unit.id,
            unit_type: unit.unit_type.clone(),
            faction: unit.faction,
            lane: unit.lane,
            x: unit.position.x.to_num(),
            y: unit.position.y.to_num(),
            health: unit.health.current,
            max_health: unit.health.max,
            target: unit.current_target,
        }
    }
}

/// Session result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    /// All waves cleared or victory declared.
    Victory,
    /// Base breached.
    Defeat,
}

impl GameResult {
    /// Result for a terminal state.
    #[must_use]
    pub const fn from_state(state: GameState) -> Option<Self> {
        match state {
            GameState::Victory => Some(Self::Victory),
            GameState::Defeat => Some(Self::Defeat),
            _ => None,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    #[must_use]
    pub fn ready(tick: u64, state: GameState) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
            state,
        }
    }

    /// Create an acknowledgment.
    #[must_use]
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(str::to_string),
        }
    }

    /// Snapshot of `sim`.
    #[must_use]
    pub fn state(sim: &Simulation) -> Self {
        Self::State(Box::new(SessionSnapshot::capture(sim)))
    }

    /// Serialize to a JSON line (with trailing newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => format!("{json}\n"),
            Err(e) => format!(
                "{{\"type\":\"error\",\"message\":\"serialization failed: {e}\",\"cmd\":null}}\n"
            ),
        }
    }
}
