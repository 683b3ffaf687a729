//! Deterministic tick-driven multi-agent grid-world simulation kernel.
//!
//! `sim-core` defines the authoritative per-tick state machine: grids and
//! spatial indices, the tagged entity model, the action executor, world
//! systems (building combat, mob AI, tumor dynamics, death and respawn),
//! the packed per-agent observation writer, and reward/episode management.
//! All state mutation flows through [`Environment::step`], which is a pure
//! function of `(state, actions)`: fixed seed and action sequence replay
//! to byte-identical trajectories.
//!
//! Map generation, rendering beyond the debug ASCII view, replay
//! serialization, and training-framework adapters live outside this crate;
//! their only contract here is the [`MapGenerator`] trait and the read-only
//! accessors on [`Environment`].
pub mod actions;
pub mod config;
pub mod env;
pub mod error;
pub mod geom;
pub mod grid;
pub mod items;
pub mod obs;
pub mod registry;
pub mod render;
pub mod reward;
pub mod rng;
pub mod terrain;
pub mod things;
pub mod tick;

pub use actions::{ActionVerb, AgentStats, decode_action};
pub use config::{RewardWeights, SimConfig};
pub use env::{EmptyMap, Environment, MapGenerator, TeamState, TeamTech, TempleBirth};
pub use error::{SimError, WorldInitError};
pub use geom::{CARDINALS, DIRECTIONS, Direction, Position, ThingId, chebyshev};
pub use grid::{Grid, SpatialIndex};
pub use items::{Inventory, ItemKind, Resource, Stockpile};
pub use obs::{OBS_LAYERS, ObsLayer};
pub use registry::{BUILD_CHOICES, BuildChoice, BuildingSpec, UnitClass, UseKind, building_spec};
pub use rng::{StreamDomain, TickRng, compute_seed};
pub use terrain::{Biome, DoorState, TerrainKind, Tile};
pub use things::{AgentData, BuildingData, Thing, ThingKind, ThingPayload, ThingStore};
