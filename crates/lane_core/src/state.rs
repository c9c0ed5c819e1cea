//! Top-level game mode.
//!
//! ```text
//!            Start            Pause
//! Preparing ------> Playing -------> Paused
//!     ^              |  ^   <-------   |
//!     |              |  |    Resume    |
//!     |       win /  |  |              |
//!     |      breach  v  |              |
//!     |       Victory | Defeat         |
//!     +------------ Restart -----------+
//! ```
//!
//! Every accepted transition is reported to the caller. Transitions that
//! would re-enter the current state are rejected with
//! [`TransitionError::AlreadyIn`] rather than silently accepted.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TransitionError;

/// Session mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    /// Before the first wave; placements allowed, nothing ticks.
    #[default]
    Preparing,
    /// Simulation running.
    Playing,
    /// Simulation frozen, resumable.
    Paused,
    /// Session won; frozen.
    Victory,
    /// Base breached; frozen.
    Defeat,
}

impl GameState {
    /// Whether the simulation advances in this state.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Playing)
    }

    /// Whether the session has ended.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Victory | Self::Defeat)
    }

    /// Whether defender placement requests are accepted.
    #[must_use]
    pub const fn accepts_placement(self) -> bool {
        matches!(self, Self::Preparing | Self::Playing)
    }
}

/// Externally requested transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Preparing -> Playing.
    Start,
    /// Playing -> Paused.
    Pause,
    /// Paused -> Playing.
    Resume,
    /// Any state -> Preparing, resetting the battlefield.
    Restart,
}

/// Owner of the current [`GameState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GameStateMachine {
    state: GameState,
}

impl GameStateMachine {
    /// Start in [`GameState::Preparing`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: GameState::Preparing,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> GameState {
        self.state
    }

    /// State `signal` would lead to from the current state.
    ///
    /// # Errors
    ///
    /// [`TransitionError::NotAllowed`] when the signal has no edge out of
    /// the current state, [`TransitionError::AlreadyIn`] when the edge
    /// would re-enter it.
    pub fn target_of(&self, signal: Signal) -> Result<GameState, TransitionError> {
        let from = self.state;
        let to = match (signal, from) {
            (Signal::Start, GameState::Preparing) => GameState::Playing,
            (Signal::Pause, GameState::Playing) => GameState::Paused,
            (Signal::Resume, GameState::Paused) => GameState::Playing,
            (Signal::Restart, _) => GameState::Preparing,
            _ => return Err(TransitionError::NotAllowed { from, signal }),
        };
        if to == from {
            return Err(TransitionError::AlreadyIn(from));
        }
        Ok(to)
    }

    /// Apply an external signal. Returns the state entered.
    ///
    /// # Errors
    ///
    /// See [`GameStateMachine::target_of`]. The state is unchanged on error.
    pub fn apply(&mut self, signal: Signal) -> Result<GameState, TransitionError> {
        let to = self.target_of(signal)?;
        info!(from = ?self.state, to = ?to, ?signal, "Game state transition");
        self.state = to;
        Ok(to)
    }

    /// Enter [`GameState::Victory`]. Only valid while playing.
    ///
    /// # Errors
    ///
    /// [`TransitionError::AlreadyIn`] if already won, otherwise
    /// [`TransitionError::NotPlaying`] when not playing.
    pub fn declare_victory(&mut self) -> Result<GameState, TransitionError> {
        self.finish(GameState::Victory)
    }

    /// Enter [`GameState::Defeat`]. Only valid while playing.
    ///
    /// # Errors
    ///
    /// [`TransitionError::AlreadyIn`] if already lost, otherwise
    /// [`TransitionError::NotPlaying`] when not playing.
    pub fn declare_defeat(&mut self) -> Result<GameState, TransitionError> {
        self.finish(GameState::Defeat)
    }

    fn finish(&mut self, to: GameState) -> Result<GameState, TransitionError> {
        if self.state == to {
            return Err(TransitionError::AlreadyIn(to));
        }
        if self.state != GameState::Playing {
            return Err(TransitionError::NotPlaying(self.state));
        }
        info!(from = ?self.state, to = ?to, "Game over");
        self.state = to;
        Ok(to)
    }
}
