//! The environment: exclusive owner of all simulation state.
//!
//! Every global of the original design is a field here. All entity
//! creation and destruction flows through [`Environment::add`] /
//! [`Environment::remove`], which keep the thing store, kind buckets,
//! grids, spatial index, and agent slots consistent; the testable
//! invariants in the crate's integration suite all hang off these two
//! choke points.

use crate::actions::AgentStats;
use crate::config::SimConfig;
use crate::error::{SimError, WorldInitError};
use crate::geom::{Position, ThingId};
use crate::grid::Grid;
use crate::items::Stockpile;
use crate::obs;
use crate::registry::building_spec;
use crate::things::{Thing, ThingKind, ThingStore};

bitflags::bitflags! {
    /// Team-wide technology flags applied by building combat and movement.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct TeamTech: u8 {
        /// Towers lose their dead zone.
        const MURDER_HOLES = 1 << 0;
        /// +1 tower damage.
        const FLETCHING = 1 << 1;
        /// +20 HP on placed buildings.
        const MASONRY = 1 << 2;
    }
}

/// Per-team pooled state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TeamState {
    pub stockpile: Stockpile,
    pub tech: TeamTech,
    /// Fog-of-view mask: tiles this team has seen this episode.
    pub seen: Vec<bool>,
}

/// Parent-pair record queued when a temple produces a child villager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TempleBirth {
    pub parents: (ThingId, ThingId),
    pub child: ThingId,
}

/// Transient visual effect; decays at the start of each tick and feeds the
/// tile tint heatmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisualEffect {
    pub pos: Position,
    pub tint: u8,
    pub ttl: u8,
}

/// External map-generation contract. The kernel consumes a pre-generated
/// world; implementations populate terrain and initial things through the
/// environment's public mutation API, drawing randomness from the map
/// stream only.
pub trait MapGenerator: Send {
    /// Map dimensions, fixed for the lifetime of the environment.
    fn dimensions(&self) -> (i32, i32);

    /// Populates a freshly cleared environment.
    fn generate(&mut self, env: &mut Environment) -> Result<(), WorldInitError>;
}

/// A generator that leaves the map empty. Useful as a placeholder and for
/// tests that place every thing by hand.
#[derive(Clone, Copy, Debug)]
pub struct EmptyMap {
    pub width: i32,
    pub height: i32,
}

impl EmptyMap {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

impl MapGenerator for EmptyMap {
    fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn generate(&mut self, _env: &mut Environment) -> Result<(), WorldInitError> {
        Ok(())
    }
}

pub struct Environment {
    pub(crate) config: SimConfig,
    pub(crate) seed: u64,
    pub(crate) current_step: u32,
    pub(crate) grid: Grid,
    pub(crate) things: ThingStore,
    pub(crate) teams: Vec<TeamState>,
    /// `agent_id → thing handle`; a populated slot persists through death
    /// so respawn can reuse it.
    pub(crate) agent_slots: Vec<Option<ThingId>>,
    pub(crate) rewards: Vec<f32>,
    pub(crate) terminated: Vec<u8>,
    pub(crate) truncated: Vec<u8>,
    pub(crate) stats: Vec<AgentStats>,
    pub(crate) observations: Vec<u8>,
    pub(crate) effects: Vec<VisualEffect>,
    pub(crate) temple_births: Vec<TempleBirth>,
    pub(crate) episode_done: bool,
    pub(crate) territory_scored: bool,
    generator: Option<Box<dyn MapGenerator>>,
}

impl Environment {
    /// Builds an environment and runs the map generator once.
    pub fn new(config: SimConfig, generator: Box<dyn MapGenerator>) -> Result<Self, SimError> {
        Self::with_seed(config, 0, generator)
    }

    pub fn with_seed(
        config: SimConfig,
        seed: u64,
        generator: Box<dyn MapGenerator>,
    ) -> Result<Self, SimError> {
        let (width, height) = generator.dimensions();
        if width < 4 || height < 4 {
            return Err(WorldInitError::MapTooSmall { width, height }.into());
        }
        let mut env = Self {
            config,
            seed,
            current_step: 0,
            grid: Grid::new(width, height),
            things: ThingStore::new(),
            teams: Vec::new(),
            agent_slots: vec![None; SimConfig::NUM_AGENTS],
            rewards: vec![0.0; SimConfig::NUM_AGENTS],
            terminated: vec![1; SimConfig::NUM_AGENTS],
            truncated: vec![0; SimConfig::NUM_AGENTS],
            stats: vec![AgentStats::default(); SimConfig::NUM_AGENTS],
            observations: vec![0; obs::buffer_len()],
            effects: Vec::new(),
            temple_births: Vec::new(),
            episode_done: false,
            territory_scored: false,
            generator: Some(generator),
        };
        env.reset()?;
        Ok(env)
    }

    /// Reseeds, clears all state, reruns the map generator, and rebuilds
    /// caches and observations.
    pub fn reset(&mut self) -> Result<(), SimError> {
        let (width, height) = self
            .generator
            .as_ref()
            .map(|generator| generator.dimensions())
            .unwrap_or((self.grid.width(), self.grid.height()));

        self.current_step = 0;
        self.grid = Grid::new(width, height);
        self.things = ThingStore::new();
        self.agent_slots = vec![None; SimConfig::NUM_AGENTS];
        self.rewards = vec![0.0; SimConfig::NUM_AGENTS];
        self.terminated = vec![1; SimConfig::NUM_AGENTS];
        self.truncated = vec![0; SimConfig::NUM_AGENTS];
        self.stats = vec![AgentStats::default(); SimConfig::NUM_AGENTS];
        self.observations = vec![0; obs::buffer_len()];
        self.effects.clear();
        self.temple_births.clear();
        self.episode_done = false;
        self.territory_scored = false;

        let area = (width * height) as usize;
        self.teams = (0..SimConfig::NUM_TEAMS)
            .map(|_| TeamState {
                stockpile: Stockpile::new(),
                tech: TeamTech::empty(),
                seen: vec![false; area],
            })
            .collect();

        // The generator is taken out for the duration of the call so it can
        // mutate the environment it is owned by.
        if let Some(mut generator) = self.generator.take() {
            let result = generator.generate(self);
            self.generator = Some(generator);
            result?;
        }

        obs::rebuild_all(self);
        Ok(())
    }

    /// Replaces the episode seed. Takes effect from the next tick's RNG
    /// stream (and from the next `reset` for map generation).
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    // ========================================================================
    // Accessors (the read-only host surface)
    // ========================================================================

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    pub fn num_agents(&self) -> usize {
        SimConfig::NUM_AGENTS
    }

    /// Packed `[agent][layer][y][x]` u8 tensor. The host must not mutate
    /// the buffer between steps.
    pub fn observations(&self) -> &[u8] {
        &self.observations
    }

    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    pub fn terminated(&self) -> &[u8] {
        &self.terminated
    }

    pub fn truncated(&self) -> &[u8] {
        &self.truncated
    }

    pub fn stats(&self) -> &[AgentStats] {
        &self.stats
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Mutable grid access for map generators. Structural mutators (cell
    /// occupancy) stay crate-private; generators shape terrain, doors, and
    /// elevation through `tile_mut`.
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn things(&self) -> &ThingStore {
        &self.things
    }

    pub fn team(&self, team: i32) -> Option<&TeamState> {
        usize::try_from(team).ok().and_then(|t| self.teams.get(t))
    }

    pub fn temple_births(&self) -> &[TempleBirth] {
        &self.temple_births
    }

    /// True once every agent is terminated or truncated.
    pub fn episode_done(&self) -> bool {
        self.episode_done
    }

    // ========================================================================
    // One tick
    // ========================================================================

    /// Advances the world by one tick. `actions[agent_id]` is the packed
    /// byte `verb * ARGC + arg`. See the crate docs for the phase order.
    pub fn step(&mut self, actions: &[u8]) -> Result<(), SimError> {
        if actions.len() != SimConfig::NUM_AGENTS {
            return Err(SimError::ActionBufferSize {
                got: actions.len(),
                expected: SimConfig::NUM_AGENTS,
            });
        }
        crate::tick::run_tick(self, actions);
        Ok(())
    }

    /// Forces a full observation rebuild from current state.
    ///
    /// `step` already leaves the buffer canonical; this re-derivation is
    /// the reference any incrementally maintained buffer must match byte
    /// for byte.
    pub fn rebuild_observations(&mut self) {
        obs::rebuild_all(self);
    }

    // ========================================================================
    // Thing lifecycle choke points
    // ========================================================================

    /// Adds a thing, registering it in the store, its kind bucket, the
    /// appropriate grid layer, and (for agents) the agent slot table.
    pub fn add(&mut self, thing: Thing) -> Result<ThingId, WorldInitError> {
        let pos = thing.pos;
        let on_grid = !pos.is_off_grid();
        if on_grid {
            if !self.grid.contains(pos) {
                return Err(WorldInitError::OutOfBounds(pos));
            }
            if thing.kind.is_blocking() && self.grid.get_blocking(pos).is_some() {
                return Err(WorldInitError::TileOccupied(pos));
            }
            if thing.kind.is_overlay() && self.grid.get_overlay(pos).is_some() {
                return Err(WorldInitError::TileOccupied(pos));
            }
        }

        let agent_id = thing.agent_data().map(|data| data.agent_id);
        if let Some(agent_id) = agent_id {
            if agent_id >= SimConfig::NUM_AGENTS {
                return Err(WorldInitError::AgentIdOutOfRange {
                    agent_id,
                    max: SimConfig::NUM_AGENTS - 1,
                });
            }
            if self.agent_slots[agent_id].is_some() {
                return Err(WorldInitError::AgentSlotTaken { agent_id });
            }
        }

        let alive = thing.is_alive();
        let blocking = thing.kind.is_blocking();
        let id = self.things.insert(thing);
        if on_grid {
            if blocking {
                self.grid.place_blocking(pos, id);
            } else {
                self.grid.place_overlay(pos, id);
            }
        }
        if let Some(agent_id) = agent_id {
            self.agent_slots[agent_id] = Some(id);
            self.terminated[agent_id] = u8::from(!alive || !on_grid);
        }
        Ok(id)
    }

    /// Removes a non-agent thing, reversing everything `add` did and
    /// clearing its observation footprint. Agents are never removed; see
    /// `kill_agent`.
    pub fn remove(&mut self, id: ThingId) -> Option<Thing> {
        debug_assert!(
            self.things
                .get(id)
                .is_none_or(|thing| thing.kind != ThingKind::Agent),
            "agents are terminated, not removed"
        );
        let thing = self.things.remove(id)?;
        if !thing.pos.is_off_grid() {
            if thing.kind.is_blocking() {
                self.grid.clear_blocking(thing.pos, id);
            } else {
                self.grid.clear_overlay(thing.pos, id);
            }
        }
        Some(thing)
    }

    pub fn thing(&self, id: ThingId) -> Option<&Thing> {
        self.things.get(id)
    }

    pub fn thing_mut(&mut self, id: ThingId) -> Option<&mut Thing> {
        self.things.get_mut(id)
    }

    /// Moves a blocking thing to `to`, keeping grid and index in sync.
    /// The caller guarantees the destination is resolved.
    pub(crate) fn move_thing(&mut self, id: ThingId, to: Position) {
        let Some(thing) = self.things.get_mut(id) else {
            debug_assert!(false, "move of stale handle {id}");
            return;
        };
        let from = thing.pos;
        thing.pos = to;
        if thing.kind.is_blocking() {
            self.grid.move_blocking(id, from, to);
        } else {
            self.grid.move_overlay(id, from, to);
        }
    }

    /// Swaps two blocking things in place.
    pub(crate) fn swap_things(&mut self, a: ThingId, b: ThingId) {
        let (Some(pos_a), Some(pos_b)) = (
            self.things.get(a).map(|t| t.pos),
            self.things.get(b).map(|t| t.pos),
        ) else {
            debug_assert!(false, "swap of stale handles");
            return;
        };
        self.grid.clear_blocking(pos_a, a);
        self.grid.clear_blocking(pos_b, b);
        self.grid.place_blocking(pos_b, a);
        self.grid.place_blocking(pos_a, b);
        if let Some(thing) = self.things.get_mut(a) {
            thing.pos = pos_b;
        }
        if let Some(thing) = self.things.get_mut(b) {
            thing.pos = pos_a;
        }
    }

    // ========================================================================
    // Agent helpers
    // ========================================================================

    pub fn agent_thing_id(&self, agent_id: usize) -> Option<ThingId> {
        self.agent_slots.get(agent_id).copied().flatten()
    }

    pub fn agent(&self, agent_id: usize) -> Option<&Thing> {
        self.agent_thing_id(agent_id).and_then(|id| self.thing(id))
    }

    /// The team an agent slot belongs to by construction.
    pub fn default_team_of(agent_id: usize) -> i32 {
        (agent_id / SimConfig::AGENTS_PER_TEAM) as i32
    }

    /// Marks an agent dead: zero HP, off the grid, terminated flag set,
    /// death penalty applied. Idempotent within a tick.
    pub(crate) fn kill_agent(&mut self, id: ThingId) {
        let Some(thing) = self.things.get_mut(id) else {
            return;
        };
        debug_assert_eq!(thing.kind, ThingKind::Agent);
        let Some(agent_id) = thing.agent_data().map(|data| data.agent_id) else {
            return;
        };
        if self.terminated[agent_id] != 0 && thing.pos.is_off_grid() {
            return;
        }
        thing.hp = 0;
        let pos = thing.pos;
        thing.pos = Position::OFF_GRID;
        if !pos.is_off_grid() {
            self.grid.clear_blocking(pos, id);
        }
        self.terminated[agent_id] = 1;
        self.stats[agent_id].deaths += 1;
        self.rewards[agent_id] += self.config.rewards.death_penalty;
        tracing::debug!(agent_id, step = self.current_step, "agent died");
    }

    /// Accumulates a shaped reward for an agent slot.
    #[inline]
    pub(crate) fn reward(&mut self, agent_id: usize, amount: f32) {
        self.rewards[agent_id] += amount;
    }

    // ========================================================================
    // Team aggregates
    // ========================================================================

    pub fn live_population(&self, team: i32) -> usize {
        self.things
            .bucket(ThingKind::Agent)
            .iter()
            .filter_map(|id| self.things.get(*id))
            .filter(|thing| thing.team == team && thing.is_alive())
            .count()
    }

    /// Sum of building pop-cap contributions, clamped to the number of
    /// agent slots a team owns.
    pub fn population_cap(&self, team: i32) -> usize {
        let mut cap = 0usize;
        for thing in self.things.iter() {
            if thing.team != team || !thing.is_alive() {
                continue;
            }
            if let Some(spec) = building_spec(thing.kind) {
                cap += spec.pop_cap as usize;
            }
        }
        cap.min(SimConfig::AGENTS_PER_TEAM)
    }

    /// Per-resource stockpile cap: base plus the barrel capacity of every
    /// live storage-capable building the team owns.
    pub fn stockpile_cap(&self, team: i32) -> u32 {
        let mut cap = SimConfig::STOCKPILE_BASE_CAP;
        for thing in self.things.iter() {
            if thing.team != team || !thing.is_alive() {
                continue;
            }
            if let Some(spec) = building_spec(thing.kind) {
                if spec.barrel_capacity > 0 {
                    cap += SimConfig::STOCKPILE_CAP_PER_STORAGE;
                }
            }
        }
        cap
    }

    pub fn team_mut(&mut self, team: i32) -> Option<&mut TeamState> {
        usize::try_from(team)
            .ok()
            .and_then(|t| self.teams.get_mut(t))
    }

    // ========================================================================
    // Garrison
    // ========================================================================

    /// Moves `unit` into `building`'s garrison: off-grid, absent from both
    /// grids and the spatial index. False if the cap is reached or either
    /// handle is stale.
    pub fn garrison_unit(&mut self, building: ThingId, unit: ThingId) -> bool {
        let Some(spec) = self
            .things
            .get(building)
            .and_then(|thing| building_spec(thing.kind))
        else {
            return false;
        };
        let cap = spec.garrison_cap;
        let Some(unit_thing) = self.things.get(unit) else {
            return false;
        };
        if unit_thing.kind != ThingKind::Agent || !unit_thing.is_alive() {
            return false;
        }
        let unit_pos = unit_thing.pos;

        {
            let Some(data) = self
                .things
                .get_mut(building)
                .and_then(|thing| thing.building_data_mut())
            else {
                return false;
            };
            if data.garrison.len() >= cap || data.garrison.push(unit).is_err() {
                return false;
            }
        }

        if !unit_pos.is_off_grid() {
            self.grid.clear_blocking(unit_pos, unit);
        }
        let unit_thing = self.things.get_mut(unit).expect("checked above");
        unit_thing.pos = Position::OFF_GRID;
        if let Some(data) = unit_thing.agent_data_mut() {
            data.is_garrisoned = true;
        }
        true
    }

    /// Releases `unit` onto the first empty tile adjacent to the building.
    /// False if no tile is free.
    pub fn ungarrison_unit(&mut self, building: ThingId, unit: ThingId) -> bool {
        let Some(building_pos) = self.things.get(building).map(|thing| thing.pos) else {
            return false;
        };
        let class = self
            .things
            .get(unit)
            .map(|thing| thing.unit_class())
            .unwrap_or_default();
        let Some(out) = crate::geom::DIRECTIONS
            .iter()
            .map(|dir| building_pos.step(*dir))
            .find(|pos| self.grid.is_empty(*pos, class))
        else {
            return false;
        };

        let removed = self
            .things
            .get_mut(building)
            .and_then(|thing| thing.building_data_mut())
            .is_some_and(|data| data.remove_garrisoned(unit));
        if !removed {
            return false;
        }
        let Some(unit_thing) = self.things.get_mut(unit) else {
            return false;
        };
        unit_thing.pos = out;
        if let Some(data) = unit_thing.agent_data_mut() {
            data.is_garrisoned = false;
        }
        self.grid.place_blocking(out, unit);
        true
    }

    /// Materializes a unit of `class` for `team` at `pos`, reusing the
    /// team's first dormant agent slot (never spawned, or dead). `None`
    /// when no slot or the tile is taken.
    pub(crate) fn spawn_unit(
        &mut self,
        team: i32,
        class: crate::registry::UnitClass,
        pos: Position,
    ) -> Option<ThingId> {
        if self.grid.get_blocking(pos).is_some() || !self.grid.in_playable(pos) {
            return None;
        }
        let team_index = usize::try_from(team).ok()?;
        let base = team_index * SimConfig::AGENTS_PER_TEAM;
        let slots = base..base + SimConfig::AGENTS_PER_TEAM;

        // Prefer a never-spawned slot; fall back to reviving a dead one.
        if let Some(agent_id) = slots
            .clone()
            .find(|agent_id| self.agent_slots[*agent_id].is_none())
        {
            let thing = Thing::agent(agent_id, class, pos, team);
            return self.add(thing).ok();
        }

        let agent_id = slots.filter(|agent_id| self.terminated[*agent_id] != 0).find(|agent_id| {
            self.agent_slots[*agent_id]
                .and_then(|id| self.things.get(id))
                .is_some_and(|thing| thing.pos.is_off_grid())
        })?;
        let id = self.agent_slots[agent_id]?;
        let stats = class.stats();
        {
            let thing = self.things.get_mut(id)?;
            thing.pos = pos;
            thing.team = team;
            thing.hp = stats.max_hp;
            thing.max_hp = stats.max_hp;
            thing.cooldown = 0;
            thing.frozen = 0;
            thing.inventory = crate::items::Inventory::new();
            if let Some(data) = thing.agent_data_mut() {
                data.unit_class = class;
                data.attack_damage = stats.attack_damage;
                data.shield_countdown = 0;
                data.is_garrisoned = false;
            }
        }
        self.grid.place_blocking(pos, id);
        self.terminated[agent_id] = 0;
        Some(id)
    }

    // ========================================================================
    // State root
    // ========================================================================

    /// Deterministic SHA-256 digest of the complete simulation state.
    ///
    /// Two runs with the same seed and action sequence produce identical
    /// digests after every tick; the determinism suite and external replay
    /// tooling compare these instead of whole states.
    #[cfg(feature = "serde")]
    pub fn state_root(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(self.current_step.to_le_bytes());
        if let Ok(bytes) = bincode::serialize(&self.grid) {
            hasher.update(&bytes);
        }
        if let Ok(bytes) = bincode::serialize(&self.things) {
            hasher.update(&bytes);
        }
        if let Ok(bytes) = bincode::serialize(&self.teams) {
            hasher.update(&bytes);
        }
        for reward in &self.rewards {
            hasher.update(reward.to_le_bytes());
        }
        hasher.update(&self.terminated);
        hasher.update(&self.truncated);
        hasher.update(&self.observations);
        hasher.finalize().into()
    }
}
