//! Error types for the lane simulation.
//!
//! Validation failures are reported as typed errors and never leave
//! partial mutations behind. Stale references (dead targets, despawned
//! projectiles) are not errors and never surface here.

use thiserror::Error;

use crate::state::{GameState, Signal};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Unit type id not present in the catalog.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    /// Lane index outside the grid.
    #[error("Invalid lane {lane}: grid has {lanes} lanes")]
    InvalidLane {
        /// Requested lane.
        lane: u32,
        /// Number of lanes on the grid.
        lanes: u32,
    },

    /// Unit id does not reference a live unit.
    #[error("Unit not found: {0}")]
    UnitNotFound(u64),

    /// Insufficient resources.
    #[error("Insufficient resources: need {required} {resource}, have {available}")]
    InsufficientResources {
        /// Resource type.
        resource: String,
        /// Amount required.
        required: u32,
        /// Amount available.
        available: u32,
    },

    /// Operation not valid in the current simulation state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A configuration value is out of its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Placement request rejected.
    #[error(transparent)]
    Placement(#[from] PlacementError),

    /// State transition rejected.
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Reasons a defender placement request can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// Target cell already holds a defender.
    #[error("Cell ({row}, {col}) is already occupied")]
    CellOccupied {
        /// Row of the cell.
        row: u32,
        /// Column of the cell.
        col: u32,
    },

    /// Target cell lies outside the grid.
    #[error("Cell ({row}, {col}) is out of bounds")]
    OutOfBounds {
        /// Requested row.
        row: u32,
        /// Requested column.
        col: u32,
    },

    /// Not enough energy to pay the unit's cost.
    #[error("Insufficient energy: need {required}, have {available}")]
    InsufficientEnergy {
        /// Energy cost of the unit.
        required: u32,
        /// Energy currently available.
        available: u32,
    },

    /// Unit type id not present in the catalog.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    /// Unit type exists but is not a placeable defender.
    #[error("Unit type '{0}' cannot be placed on the grid")]
    NotPlaceable(String),

    /// The session is not accepting placements in its current state.
    #[error("Placement not accepted while {0:?}")]
    NotAccepting(GameState),
}

/// Reasons a state transition can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The signal has no transition out of the current state.
    #[error("Signal {signal:?} not allowed from {from:?}")]
    NotAllowed {
        /// State the machine was in.
        from: GameState,
        /// Rejected signal.
        signal: Signal,
    },

    /// Victory or defeat declared while the session is not playing.
    #[error("Cannot end the session from {0:?}")]
    NotPlaying(GameState),

    /// The transition would re-enter the current state.
    #[error("Already in state {0:?}")]
    AlreadyIn(GameState),
}
