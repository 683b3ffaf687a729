//! Kernel configuration: compile-time capacities and runtime-tunable scalars.

/// Per-event shaped reward weights, accumulated into the per-agent reward
/// buffer during action resolution and the world tick.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RewardWeights {
    /// Granted when an agent funds an altar heart (Use-Altar with a Bar).
    pub heart: f32,
    /// Granted per Gold unit harvested from a node or terrain.
    pub ore: f32,
    /// Granted when Magma smelts a Gold into a Bar.
    pub bar: f32,
    pub wood: f32,
    pub water: f32,
    pub wheat: f32,
    /// Granted when a Spear is crafted at a Blacksmith.
    pub spear: f32,
    /// Granted when Armor is crafted at a Blacksmith.
    pub armor: f32,
    pub food: f32,
    /// Granted when a Lantern is woven at a WeavingLoom.
    pub cloth: f32,
    /// Granted to the attacker when a tumor or spawner is destroyed.
    pub tumor_kill: f32,
    /// Applied to every live agent at the end of each tick (usually ≤ 0).
    pub survival_penalty: f32,
    /// Applied once at the tick a unit dies (usually ≤ 0).
    pub death_penalty: f32,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            heart: 1.0,
            ore: 0.1,
            bar: 0.2,
            wood: 0.05,
            water: 0.02,
            wheat: 0.05,
            spear: 0.2,
            armor: 0.2,
            food: 0.05,
            cloth: 0.1,
            tumor_kill: 0.5,
            survival_penalty: -0.001,
            death_penalty: -1.0,
        }
    }
}

/// Scalar simulation parameters plus the compile-time constants that bound
/// every capped collection in the kernel.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimConfig {
    /// Tick count at which every live agent is truncated. Default 10 000.
    pub max_steps: u32,
    /// Scales spawner cooldowns as `1 / tumor_spawn_rate`. Default 1.0.
    pub tumor_spawn_rate: f32,
    /// Per-tick probability that an eligible tumor branches.
    pub tumor_branch_chance: f32,
    /// Per-neighbour probability that a tumor kills a cardinally adjacent
    /// agent or predator.
    pub tumor_adjacency_death_chance: f32,
    /// When set, observation layers are zeroed for tiles the agent's team
    /// has never seen this episode.
    pub fog_of_view: bool,
    pub rewards: RewardWeights,
}

impl SimConfig {
    // ===== compile-time constants used as type parameters =====
    pub const NUM_TEAMS: usize = 4;
    pub const AGENTS_PER_TEAM: usize = 8;
    /// Total agent slots; `agent_id` is always below this bound.
    pub const NUM_AGENTS: usize = Self::NUM_TEAMS * Self::AGENTS_PER_TEAM;
    /// Garrison list bound; per-kind caps from the registry are tighter.
    pub const MAX_GARRISON: usize = 8;

    // ===== observation geometry =====
    pub const OBS_RADIUS: usize = 5;
    /// Window side length, `2 * OBS_RADIUS + 1`.
    pub const OBS_SIZE: usize = 2 * Self::OBS_RADIUS + 1;

    // ===== fixed rules =====
    /// Action byte decode base: `verb = byte / ARGC`, `arg = byte % ARGC`.
    pub const ARGC: u8 = 10;
    /// Spatial hash cell side length in tiles.
    pub const SPATIAL_CELL: i32 = 8;
    /// Hearts deducted from the home altar per respawn.
    pub const ALTAR_RESPAWN_COST: u32 = 1;
    /// Cooldown set on an altar after a heart purchase.
    pub const ALTAR_COOLDOWN: u16 = 10;
    /// Cooldown set on craft/market/oven stations after a successful use.
    pub const STATION_COOLDOWN: u16 = 5;
    /// Cooldown set on a temple after a reproduction.
    pub const TEMPLE_COOLDOWN: u16 = 40;
    /// Uncommitted tumors a spawner keeps alive nearby.
    pub const SPAWNER_TUMOR_CAP: usize = 3;
    /// Base spawner cooldown before `tumor_spawn_rate` scaling.
    pub const SPAWNER_BASE_COOLDOWN: u16 = 20;
    /// Minimum age (ticks) before a tumor may branch.
    pub const TUMOR_MIN_BRANCH_AGE: u16 = 5;
    /// Minimum Chebyshev spacing maintained between lanterns when pushed.
    pub const LANTERN_SPACING: i32 = 3;
    /// Ticks of shield coverage granted by Armor on taking a hit.
    pub const SHIELD_TICKS: u8 = 2;
    /// Maximum climbable elevation delta for a single step.
    pub const MAX_ELEVATION_STEP: i8 = 1;
    /// Tiles inside the map border that are not playable.
    pub const BORDER: i32 = 1;
    /// Tower dead-zone radius, waived by the Murder Holes tech.
    pub const TOWER_DEAD_ZONE: i32 = 1;

    // ===== inventory bounds =====
    /// Per-item cap for carried items on an agent.
    pub const CARRY_CAP_PER_ITEM: u32 = 5;
    /// Cap on the *sum* of stockpile-resource items an agent carries.
    pub const STOCKPILE_CARRY_CAP: u32 = 10;
    /// Team stockpile cap per resource before storage buildings.
    pub const STOCKPILE_BASE_CAP: u32 = 100;
    /// Additional per-resource cap contributed by each storage building.
    pub const STOCKPILE_CAP_PER_STORAGE: u32 = 50;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MAX_STEPS: u32 = 10_000;
    pub const DEFAULT_TUMOR_SPAWN_RATE: f32 = 1.0;
    pub const DEFAULT_TUMOR_BRANCH_CHANCE: f32 = 0.15;
    pub const DEFAULT_TUMOR_ADJACENCY_DEATH_CHANCE: f32 = 0.25;

    pub fn new() -> Self {
        Self {
            max_steps: Self::DEFAULT_MAX_STEPS,
            tumor_spawn_rate: Self::DEFAULT_TUMOR_SPAWN_RATE,
            tumor_branch_chance: Self::DEFAULT_TUMOR_BRANCH_CHANCE,
            tumor_adjacency_death_chance: Self::DEFAULT_TUMOR_ADJACENCY_DEATH_CHANCE,
            fog_of_view: false,
            rewards: RewardWeights::default(),
        }
    }

    pub fn with_max_steps(max_steps: u32) -> Self {
        Self {
            max_steps,
            ..Self::new()
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}
