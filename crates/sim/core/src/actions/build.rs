//! The Build verb: menu lookup, cost gating, placement scan, fertile
//! marking, and the auto-paved supply road.

use crate::env::Environment;
use crate::geom::{CARDINALS, DIAGONALS, Position, ThingId, chebyshev};
use crate::registry::{BUILD_CHOICES, BuildChoice, ROAD_COST, UnitClass, building_spec};
use crate::terrain::TerrainKind;
use crate::things::{Thing, ThingKind};

pub(crate) fn execute_build(env: &mut Environment, id: ThingId, arg: u8) -> bool {
    let choice = BUILD_CHOICES[arg as usize];
    let Some(agent) = env.thing(id) else {
        return false;
    };
    let pos = agent.pos;
    let team = agent.team;
    let forward = agent.orientation;

    let cost = match choice {
        BuildChoice::Road => ROAD_COST,
        BuildChoice::Thing(kind) => match building_spec(kind) {
            Some(spec) => spec.cost,
            None => return false,
        },
    };
    let affordable = env
        .team(team)
        .is_some_and(|state| state.stockpile.can_afford(cost));
    if !affordable {
        return false;
    }

    // Placement scan: orientation-forward, the four cardinals, then the
    // four diagonals; the first legal tile wins.
    let mut candidates: Vec<Position> = Vec::with_capacity(9);
    candidates.push(pos.step(forward));
    for dir in CARDINALS.into_iter().chain(DIAGONALS) {
        let candidate = pos.step(dir);
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    let legal = |env: &Environment, candidate: Position| match choice {
        BuildChoice::Road => {
            env.grid.in_playable(candidate)
                && env.grid.get_blocking(candidate).is_none()
                && env
                    .grid
                    .terrain(candidate)
                    .is_some_and(|terrain| paveable(terrain))
        }
        BuildChoice::Thing(_) => env.grid.is_empty(candidate, UnitClass::Villager),
    };
    let Some(site) = candidates
        .into_iter()
        .find(|candidate| legal(env, *candidate))
    else {
        return false;
    };

    let paid = env
        .team_mut(team)
        .is_some_and(|state| state.stockpile.spend_all(cost));
    debug_assert!(paid, "affordability was checked before placement");

    match choice {
        BuildChoice::Road => {
            if let Some(tile) = env.grid.tile_mut(site) {
                tile.terrain = TerrainKind::Road;
            }
            true
        }
        BuildChoice::Thing(kind) => place_building(env, kind, site, team),
    }
}

fn place_building(env: &mut Environment, kind: ThingKind, site: Position, team: i32) -> bool {
    let mut building = Thing::building(kind, site, team);
    if env
        .team(team)
        .is_some_and(|state| state.tech.contains(crate::env::TeamTech::MASONRY))
    {
        building.hp += 20;
        building.max_hp += 20;
    }
    if env.add(building).is_err() {
        return false;
    }

    let spec = building_spec(kind).expect("placed kinds are registered");
    if spec.fertile_radius > 0 {
        mark_fertile(env, site, spec.fertile_radius);
    }
    pave_supply_road(env, site, team);
    true
}

/// Converts plain ground around a new building into Fertile soil.
fn mark_fertile(env: &mut Environment, center: Position, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx == 0 && dy == 0 {
                continue;
            }
            let pos = Position::new(center.x + dx, center.y + dy);
            if !env.grid.in_playable(pos) {
                continue;
            }
            if let Some(tile) = env.grid.tile_mut(pos) {
                if tile.terrain.accepts_water() && tile.terrain != TerrainKind::Road {
                    tile.terrain = TerrainKind::Fertile;
                }
            }
        }
    }
}

/// Paves an L-shaped road (x leg, then y leg) from a new building to the
/// nearest friendly TownCenter or Altar. Only plain, unoccupied tiles are
/// paved; obstacles simply interrupt the path.
fn pave_supply_road(env: &mut Environment, from: Position, team: i32) {
    let hub = [ThingKind::TownCenter, ThingKind::Altar]
        .into_iter()
        .flat_map(|kind| env.things.bucket(kind).iter())
        .filter_map(|id| env.thing(*id))
        .filter(|thing| thing.team == team && thing.pos != from)
        .min_by_key(|thing| (chebyshev(from, thing.pos), thing.id.index))
        .map(|thing| thing.pos);
    let Some(hub) = hub else {
        return;
    };

    let mut cursor = from;
    let mut path = Vec::new();
    while cursor.x != hub.x {
        cursor.x += (hub.x - cursor.x).signum();
        path.push(cursor);
    }
    while cursor.y != hub.y {
        cursor.y += (hub.y - cursor.y).signum();
        path.push(cursor);
    }
    // Endpoints stay as they are.
    for pos in path.into_iter().filter(|pos| *pos != hub) {
        if !env.grid.in_playable(pos) || env.grid.get_blocking(pos).is_some() {
            continue;
        }
        if let Some(tile) = env.grid.tile_mut(pos) {
            if paveable(tile.terrain) {
                tile.terrain = TerrainKind::Road;
            }
        }
    }
}

fn paveable(terrain: TerrainKind) -> bool {
    matches!(
        terrain,
        TerrainKind::Empty
            | TerrainKind::Grass
            | TerrainKind::Sand
            | TerrainKind::Snow
            | TerrainKind::Dune
            | TerrainKind::Fertile
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::env::EmptyMap;
    use crate::items::Resource;

    fn env() -> Environment {
        Environment::new(SimConfig::default(), Box::new(EmptyMap::new(20, 20))).unwrap()
    }

    fn step(env: &mut Environment, action_for_zero: u8) {
        let mut actions = vec![0u8; SimConfig::NUM_AGENTS];
        actions[0] = action_for_zero;
        env.step(&actions).unwrap();
    }

    fn fund(env: &mut Environment, team: i32, resource: Resource, amount: u32) {
        let cap = env.stockpile_cap(team);
        env.team_mut(team)
            .unwrap()
            .stockpile
            .add_capped(resource, amount, cap);
    }

    const BUILD_TOWN_CENTER: u8 = 80;
    const BUILD_ROAD: u8 = 89;

    #[test]
    fn build_gated_by_cost() {
        let mut env = env();
        env.add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        step(&mut env, BUILD_TOWN_CENTER);
        assert_eq!(env.stats()[0].action_invalid, 1);
        assert_eq!(env.things().bucket(ThingKind::TownCenter).len(), 0);
        assert_eq!(env.team(0).unwrap().stockpile.get(Resource::Wood), 0);
    }

    #[test]
    fn build_places_forward_first_and_spends() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().orientation = crate::geom::Direction::East;
        fund(&mut env, 0, Resource::Wood, 10);
        fund(&mut env, 0, Resource::Stone, 10);
        step(&mut env, BUILD_TOWN_CENTER);
        let site = Position::new(6, 5);
        let built = env.grid.get_blocking(site).unwrap();
        assert_eq!(env.thing(built).unwrap().kind, ThingKind::TownCenter);
        assert_eq!(env.thing(built).unwrap().team, 0);
        assert_eq!(env.team(0).unwrap().stockpile.get(Resource::Wood), 5);
        assert_eq!(env.team(0).unwrap().stockpile.get(Resource::Stone), 7);
        // Fertile ring around the new center.
        assert_eq!(
            env.grid.terrain(Position::new(7, 5)),
            Some(TerrainKind::Fertile)
        );
        assert_eq!(env.stats()[0].builds, 1);
    }

    #[test]
    fn blocked_forward_falls_back_to_scan_order() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().orientation = crate::geom::Direction::East;
        env.add(Thing::new(ThingKind::Tree, Position::new(6, 5)))
            .unwrap();
        fund(&mut env, 0, Resource::Wood, 10);
        fund(&mut env, 0, Resource::Stone, 10);
        step(&mut env, BUILD_TOWN_CENTER);
        // First cardinal (N) wins once forward is blocked.
        let built = env.grid.get_blocking(Position::new(5, 4)).unwrap();
        assert_eq!(env.thing(built).unwrap().kind, ThingKind::TownCenter);
    }

    #[test]
    fn road_paving_costs_stone() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().orientation = crate::geom::Direction::South;
        fund(&mut env, 0, Resource::Stone, 2);
        step(&mut env, BUILD_ROAD);
        assert_eq!(
            env.grid.terrain(Position::new(5, 6)),
            Some(TerrainKind::Road)
        );
        assert_eq!(env.team(0).unwrap().stockpile.get(Resource::Stone), 1);
    }

    #[test]
    fn supply_road_connects_to_the_altar() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().orientation = crate::geom::Direction::East;
        env.add(Thing::altar(Position::new(10, 5), 0, 3)).unwrap();
        fund(&mut env, 0, Resource::Wood, 10);
        step(&mut env, 81); // House
        // The x-leg between the new house at (6,5) and the altar is paved.
        for x in 7..10 {
            assert_eq!(
                env.grid.terrain(Position::new(x, 5)),
                Some(TerrainKind::Road),
                "tile ({x}, 5) should be road"
            );
        }
    }
}
