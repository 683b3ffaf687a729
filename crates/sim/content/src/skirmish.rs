//! A symmetric four-corner skirmish map.
//!
//! Each team gets a corner base (altar, town center, granary, and a ring
//! of villagers) around a contested center holding gold, magma, and a
//! tumor spawner. Resource fields, a lake, cow herds, and a wolf pack fill
//! the space between.

use sim_core::{
    Biome, Environment, MapGenerator, Position, SimConfig, StreamDomain, TerrainKind, Thing,
    ThingKind, TickRng, UnitClass, WorldInitError, compute_seed,
};

pub struct SkirmishMap {
    pub width: i32,
    pub height: i32,
}

impl SkirmishMap {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// The default 48×48 arena.
    pub fn standard() -> Self {
        Self::new(48, 48)
    }
}

impl MapGenerator for SkirmishMap {
    fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn generate(&mut self, env: &mut Environment) -> Result<(), WorldInitError> {
        let mut rng = TickRng::new(compute_seed(env.seed(), 0, StreamDomain::MapGen));
        paint_terrain(env, &mut rng);
        place_center(env)?;
        for team in 0..SimConfig::NUM_TEAMS as i32 {
            place_base(env, team)?;
        }
        place_wildlife(env, &mut rng);
        tracing::debug!(
            width = self.width,
            height = self.height,
            "skirmish map generated"
        );
        Ok(())
    }
}

fn paint_terrain(env: &mut Environment, rng: &mut TickRng) {
    let (w, h) = (env.grid().width(), env.grid().height());

    // Grass base with biome bands.
    for y in 0..h {
        for x in 0..w {
            let tile = env.grid_mut().tile_mut(Position::new(x, y)).expect("in bounds");
            tile.terrain = TerrainKind::Grass;
            tile.biome = match (x * 4 / w, y * 4 / h) {
                (0, _) => Biome::Forest,
                (3, _) => Biome::Desert,
                (_, 0) => Biome::Tundra,
                _ => Biome::Plains,
            };
        }
    }

    // A small lake west of center.
    let (cx, cy) = (w / 2, h / 2);
    for dy in -2..=2 {
        for dx in -3..=0 {
            let pos = Position::new(cx - 6 + dx, cy + dy);
            if let Some(tile) = env.grid_mut().tile_mut(pos) {
                tile.terrain = if dx == 0 || dy.abs() == 2 {
                    TerrainKind::ShallowWater
                } else {
                    TerrainKind::Water
                };
            }
        }
    }

    // Scattered resource terrain.
    scatter(env, rng, TerrainKind::Tree, 40);
    scatter(env, rng, TerrainKind::Stone, 12);
    scatter(env, rng, TerrainKind::Gold, 8);
    scatter(env, rng, TerrainKind::Bush, 16);
    scatter(env, rng, TerrainKind::Wheat, 12);
}

fn scatter(env: &mut Environment, rng: &mut TickRng, terrain: TerrainKind, count: usize) {
    let (w, h) = (env.grid().width(), env.grid().height());
    let mut placed = 0;
    let mut attempts = 0;
    while placed < count && attempts < count * 10 {
        attempts += 1;
        let pos = Position::new(rng.range(2, w - 3), rng.range(2, h - 3));
        let open = env
            .grid()
            .tile(pos)
            .is_some_and(|tile| tile.terrain == TerrainKind::Grass)
            && env.grid().get_blocking(pos).is_none();
        if !open {
            continue;
        }
        if let Some(tile) = env.grid_mut().tile_mut(pos) {
            tile.terrain = terrain;
            tile.terrain_yield = sim_core::Tile::DEFAULT_TERRAIN_YIELD;
        }
        placed += 1;
    }
}

/// Contested center: magma for smelting, gold nodes, and a spawner.
fn place_center(env: &mut Environment) -> Result<(), WorldInitError> {
    let (w, h) = (env.grid().width(), env.grid().height());
    let center = Position::new(w / 2, h / 2);
    clear_site(env, center);
    env.add(Thing::new(ThingKind::Magma, center))?;
    let lair = Position::new(center.x + 3, center.y + 3);
    clear_site(env, lair);
    env.add(Thing::spawner(lair))?;
    for offset in [(-2, 0), (2, 0), (0, -2)] {
        let pos = Position::new(center.x + offset.0, center.y + offset.1);
        clear_site(env, pos);
        env.add(Thing::resource_node(ThingKind::Gold, pos, 8))?;
    }
    Ok(())
}

/// One corner base per team: altar (stocked with hearts), town center,
/// granary, and villagers homed to the altar.
fn place_base(env: &mut Environment, team: i32) -> Result<(), WorldInitError> {
    let (w, h) = (env.grid().width(), env.grid().height());
    let margin = 6;
    let base = match team {
        0 => Position::new(margin, margin),
        1 => Position::new(w - 1 - margin, margin),
        2 => Position::new(margin, h - 1 - margin),
        _ => Position::new(w - 1 - margin, h - 1 - margin),
    };

    clear_site(env, base);
    let altar = env.add(Thing::altar(base, team, STARTING_HEARTS))?;
    let town = Position::new(base.x + 2, base.y);
    clear_site(env, town);
    env.add(Thing::building(ThingKind::TownCenter, town, team))?;
    let granary = Position::new(base.x, base.y + 2);
    clear_site(env, granary);
    env.add(Thing::building(ThingKind::Granary, granary, team))?;

    let spots = [(1, 1), (-1, 1), (1, -1), (-1, -1)];
    for (index, (dx, dy)) in spots.iter().enumerate() {
        let agent_id = team as usize * SimConfig::AGENTS_PER_TEAM + index;
        let pos = Position::new(base.x + dx, base.y + dy);
        clear_site(env, pos);
        let unit = env.add(Thing::agent(agent_id, UnitClass::Villager, pos, team))?;
        if let Some(thing) = env.thing_mut(unit) {
            if let Some(data) = thing.agent_data_mut() {
                data.home_altar = Some(altar);
            }
        }
    }
    Ok(())
}

fn place_wildlife(env: &mut Environment, rng: &mut TickRng) {
    let (w, h) = (env.grid().width(), env.grid().height());
    // Two cow herds on opposite flanks, one wolf pack roaming mid-map.
    let herds = [
        (ThingKind::Cow, 0u8, Position::new(w / 2, 4), 4),
        (ThingKind::Cow, 1u8, Position::new(w / 2, h - 5), 4),
        (ThingKind::Wolf, 0u8, Position::new(4, h / 2), 2),
    ];
    for (kind, herd_id, around, count) in herds {
        let mut placed = 0;
        let mut attempts = 0;
        while placed < count && attempts < 40 {
            attempts += 1;
            let pos = Position::new(
                around.x + rng.range(-2, 2),
                around.y + rng.range(-2, 2),
            );
            if env.grid().is_empty(pos, UnitClass::Villager) {
                let _ = env.add(Thing::mob(kind, pos, herd_id));
                placed += 1;
            }
        }
    }
}

/// Starting altar capital per team.
const STARTING_HEARTS: u32 = 5;

/// Resets a tile to bare grass so placement never collides with painted
/// resource terrain.
fn clear_site(env: &mut Environment, pos: Position) {
    if let Some(tile) = env.grid_mut().tile_mut(pos) {
        tile.terrain = TerrainKind::Grass;
        tile.terrain_yield = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(seed: u64) -> Environment {
        Environment::with_seed(
            SimConfig::default(),
            seed,
            Box::new(SkirmishMap::standard()),
        )
        .unwrap()
    }

    #[test]
    fn every_team_gets_a_base_and_crew() {
        let env = build(7);
        assert_eq!(
            env.things().bucket(ThingKind::Altar).len(),
            SimConfig::NUM_TEAMS
        );
        assert_eq!(
            env.things().bucket(ThingKind::TownCenter).len(),
            SimConfig::NUM_TEAMS
        );
        for team in 0..SimConfig::NUM_TEAMS as i32 {
            assert_eq!(env.live_population(team), 4);
        }
    }

    #[test]
    fn villagers_are_homed_to_their_altar() {
        let env = build(7);
        for agent_id in 0..4 {
            let agent = env.agent(agent_id).unwrap();
            let home = agent.agent_data().unwrap().home_altar.unwrap();
            assert_eq!(env.thing(home).unwrap().team, agent.team);
        }
    }

    #[test]
    fn same_seed_builds_the_same_world() {
        let a = build(42);
        let b = build(42);
        assert_eq!(a.state_root(), b.state_root());
    }

    #[test]
    fn different_seeds_differ() {
        let a = build(1);
        let b = build(2);
        assert_ne!(a.state_root(), b.state_root());
    }

    #[test]
    fn generated_world_steps_cleanly() {
        let mut env = build(9);
        let actions = vec![0u8; SimConfig::NUM_AGENTS];
        for _ in 0..50 {
            env.step(&actions).unwrap();
        }
    }
}
