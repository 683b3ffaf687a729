//! Kernel error types.
//!
//! Bad agent actions are never errors: every verb precondition is a
//! predicate whose failure increments the agent's `action_invalid` counter
//! (see `actions`). The types here cover environment construction and the
//! few structural operations that can genuinely fail. Grid/index
//! inconsistencies are bugs and are debug-asserted, not returned.

use thiserror::Error;

use crate::geom::Position;

/// Errors raised while a map generator populates a fresh world.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WorldInitError {
    #[error("map dimensions {width}x{height} are below the playable minimum")]
    MapTooSmall { width: i32, height: i32 },

    #[error("tile {0} is outside the map")]
    OutOfBounds(Position),

    #[error("tile {0} already holds a blocking thing")]
    TileOccupied(Position),

    #[error("agent slot {agent_id} is already populated")]
    AgentSlotTaken { agent_id: usize },

    #[error("agent_id {agent_id} is out of range (max {max})")]
    AgentIdOutOfRange { agent_id: usize, max: usize },

    #[error("team {team} does not exist")]
    UnknownTeam { team: i32 },
}

/// Top-level kernel errors surfaced through the public API.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("world initialization failed: {0}")]
    WorldInit(#[from] WorldInitError),

    #[error("action buffer holds {got} entries, expected {expected}")]
    ActionBufferSize { got: usize, expected: usize },
}
