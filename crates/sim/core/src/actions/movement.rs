//! The Move verb: single steps, swaps, harvest-in-place, lantern pushing,
//! road/cavalry double steps, and boat embark/disembark.

use crate::config::SimConfig;
use crate::env::Environment;
use crate::geom::{DIRECTIONS, Direction, Position, ThingId, chebyshev};
use crate::registry::UnitClass;
use crate::terrain::TerrainKind;
use crate::things::ThingKind;

pub(crate) fn execute_move(
    env: &mut Environment,
    id: ThingId,
    agent_id: usize,
    dir: Direction,
) -> bool {
    let Some(agent) = env.thing(id) else {
        return false;
    };
    let from = agent.pos;
    let team = agent.team;
    let class = agent.unit_class();
    let target = from.step(dir);

    match step_check(env, from, target, team, class) {
        StepVerdict::Enter(new_class) => {
            apply_step(env, id, target, dir, new_class);
            try_bonus_step(env, id, dir, team);
            true
        }
        StepVerdict::Swap(other) => {
            env.swap_things(id, other);
            set_orientation(env, id, dir);
            true
        }
        StepVerdict::HarvestInPlace(node) => {
            if super::harvest_node(env, node, id, agent_id) {
                set_orientation(env, id, dir);
                true
            } else {
                false
            }
        }
        StepVerdict::PushLantern(lantern) => {
            if !push_lantern(env, lantern, target, dir) {
                return false;
            }
            // The vacated tile is entered with the normal rules.
            match step_check(env, from, target, team, class) {
                StepVerdict::Enter(new_class) => {
                    apply_step(env, id, target, dir, new_class);
                    true
                }
                _ => false,
            }
        }
        StepVerdict::Blocked => false,
    }
}

enum StepVerdict {
    /// The tile can be entered; carries the class after embark/disembark.
    Enter(UnitClass),
    Swap(ThingId),
    HarvestInPlace(ThingId),
    PushLantern(ThingId),
    Blocked,
}

/// Applies the §4.3 Move rejection ladder for a single step and classifies
/// the collision policy when the tile is held.
fn step_check(
    env: &Environment,
    from: Position,
    target: Position,
    team: i32,
    class: UnitClass,
) -> StepVerdict {
    if !env.grid.in_playable(target) {
        return StepVerdict::Blocked;
    }
    let Some(tile) = env.grid.tile(target) else {
        return StepVerdict::Blocked;
    };
    let Some(from_tile) = env.grid.tile(from) else {
        return StepVerdict::Blocked;
    };

    // Elevation delta of more than one step is unclimbable.
    let climb = (tile.elevation as i32 - from_tile.elevation as i32).abs();
    if climb > SimConfig::MAX_ELEVATION_STEP as i32 {
        return StepVerdict::Blocked;
    }

    // Enemy doors block; friendly and neutral doors do not.
    if tile.door.is_some_and(|door| door.team != team) {
        return StepVerdict::Blocked;
    }

    // Terrain passability, with embark/disembark at docks.
    let entered_class = match transit_class(env, target, tile.terrain, class) {
        Some(entered) => entered,
        None => return StepVerdict::Blocked,
    };

    if let Some(occupant_id) = env.grid.get_blocking(target) {
        let Some(occupant) = env.thing(occupant_id) else {
            return StepVerdict::Blocked;
        };
        return match occupant.kind {
            ThingKind::Agent if occupant.team == team && occupant.frozen == 0 => {
                StepVerdict::Swap(occupant_id)
            }
            ThingKind::Tree | ThingKind::Palm => StepVerdict::HarvestInPlace(occupant_id),
            _ => StepVerdict::Blocked,
        };
    }

    if let Some(overlay_id) = env.grid.get_overlay(target) {
        if env
            .thing(overlay_id)
            .is_some_and(|overlay| overlay.kind == ThingKind::Lantern)
        {
            return StepVerdict::PushLantern(overlay_id);
        }
    }

    StepVerdict::Enter(entered_class)
}

/// Resolves terrain passability for `class`, returning the class after the
/// step (boats disembark to villagers on land, agents embark to boats when
/// stepping into dock-adjacent water).
fn transit_class(
    env: &Environment,
    target: Position,
    terrain: TerrainKind,
    class: UnitClass,
) -> Option<UnitClass> {
    if terrain.is_passable(class) {
        return Some(class);
    }
    let dock_adjacent = near_dock(env, target);
    match class {
        // A boat landing beside a dock steps ashore on foot.
        UnitClass::Boat if !matches!(terrain, TerrainKind::Water | TerrainKind::ShallowWater) => {
            (dock_adjacent && terrain.is_passable(UnitClass::Villager))
                .then_some(UnitClass::Villager)
        }
        // Land units embark when stepping into dock-adjacent water.
        _ if matches!(terrain, TerrainKind::Water | TerrainKind::ShallowWater) => {
            dock_adjacent.then_some(UnitClass::Boat)
        }
        _ => None,
    }
}

fn near_dock(env: &Environment, pos: Position) -> bool {
    DIRECTIONS.iter().any(|dir| {
        env.grid
            .get_blocking(pos.step(*dir))
            .and_then(|id| env.thing(id))
            .is_some_and(|thing| thing.kind == ThingKind::Dock)
    })
}

fn apply_step(env: &mut Environment, id: ThingId, target: Position, dir: Direction, class: UnitClass) {
    env.move_thing(id, target);
    if let Some(thing) = env.thing_mut(id) {
        thing.orientation = dir;
        if let Some(data) = thing.agent_data_mut() {
            if data.unit_class != class {
                data.unit_class = class;
            }
        }
    }
}

fn set_orientation(env: &mut Environment, id: ThingId, dir: Direction) {
    if let Some(thing) = env.thing_mut(id) {
        thing.orientation = dir;
    }
}

/// Roads and cavalry classes grant one extra step in the same direction.
/// The bonus step only enters plain empty tiles: no swap, push, or
/// harvest.
fn try_bonus_step(env: &mut Environment, id: ThingId, dir: Direction, team: i32) {
    let Some(thing) = env.thing(id) else {
        return;
    };
    let pos = thing.pos;
    let class = thing.unit_class();
    let on_road = env
        .grid
        .terrain(pos)
        .is_some_and(|terrain| terrain == TerrainKind::Road);
    if !on_road && !class.stats().is_cavalry {
        return;
    }
    let target = pos.step(dir);
    if let StepVerdict::Enter(new_class) = step_check(env, pos, target, team, class) {
        if new_class == class {
            apply_step(env, id, target, dir, class);
        }
    }
}

/// Pushes a lantern out of `target` in `dir`: one tile, then two, then any
/// adjacent legal tile, always keeping lantern spacing.
fn push_lantern(env: &mut Environment, lantern: ThingId, target: Position, dir: Direction) -> bool {
    for distance in 1..=2 {
        let to = target.step_n(dir, distance);
        if lantern_site_legal(env, Some(lantern), to) {
            env.move_thing(lantern, to);
            return true;
        }
    }
    for fallback in DIRECTIONS {
        let to = target.step(fallback);
        if lantern_site_legal(env, Some(lantern), to) {
            env.move_thing(lantern, to);
            return true;
        }
    }
    false
}

/// A lantern may rest on playable, non-water, overlay-free tiles at least
/// `LANTERN_SPACING` from every other lantern (excluding the one being
/// moved, when there is one).
pub(crate) fn lantern_site_legal(
    env: &Environment,
    lantern: Option<ThingId>,
    to: Position,
) -> bool {
    if !env.grid.in_playable(to) {
        return false;
    }
    if env.grid.get_overlay(to).is_some() {
        return false;
    }
    if !env.grid.terrain(to).is_some_and(|terrain| {
        !matches!(
            terrain,
            TerrainKind::Water | TerrainKind::ShallowWater | TerrainKind::Mountain
        )
    }) {
        return false;
    }
    env.things
        .bucket(ThingKind::Lantern)
        .iter()
        .filter(|other| Some(**other) != lantern)
        .filter_map(|other| env.thing(*other))
        .all(|other| chebyshev(other.pos, to) >= SimConfig::LANTERN_SPACING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::env::EmptyMap;
    use crate::things::Thing;

    fn env() -> Environment {
        Environment::new(SimConfig::default(), Box::new(EmptyMap::new(20, 20))).unwrap()
    }

    fn step(env: &mut Environment, actions_for_zero: u8) {
        let mut actions = vec![0u8; SimConfig::NUM_AGENTS];
        actions[0] = actions_for_zero;
        env.step(&actions).unwrap();
    }

    #[test]
    fn simple_step_east() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        // Move E = verb 1, arg 3.
        step(&mut env, 13);
        assert_eq!(env.thing(id).unwrap().pos, Position::new(6, 5));
        assert_eq!(env.thing(id).unwrap().orientation, Direction::East);
        assert_eq!(env.stats()[0].moves, 1);
    }

    #[test]
    fn border_and_water_block() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(1, 5), 0))
            .unwrap();
        step(&mut env, 12); // Move W into the border ring
        assert_eq!(env.thing(id).unwrap().pos, Position::new(1, 5));
        assert_eq!(env.stats()[0].action_invalid, 1);

        env.grid.tile_mut(Position::new(2, 5)).unwrap().terrain = TerrainKind::Water;
        step(&mut env, 13); // Move E into water
        assert_eq!(env.thing(id).unwrap().pos, Position::new(1, 5));
        assert_eq!(env.stats()[0].action_invalid, 2);
    }

    #[test]
    fn friendly_swap_on_collision() {
        let mut env = env();
        let a = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        let b = env
            .add(Thing::agent(1, UnitClass::Villager, Position::new(6, 5), 0))
            .unwrap();
        step(&mut env, 13); // agent 0 moves E into agent 1
        assert_eq!(env.thing(a).unwrap().pos, Position::new(6, 5));
        assert_eq!(env.thing(b).unwrap().pos, Position::new(5, 5));
    }

    #[test]
    fn enemy_collision_blocks() {
        let mut env = env();
        let a = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.add(Thing::agent(
            SimConfig::AGENTS_PER_TEAM,
            UnitClass::Villager,
            Position::new(6, 5),
            1,
        ))
        .unwrap();
        step(&mut env, 13);
        assert_eq!(env.thing(a).unwrap().pos, Position::new(5, 5));
        assert_eq!(env.stats()[0].action_invalid, 1);
    }

    #[test]
    fn tree_collision_harvests_in_place() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        let tree = env
            .add(Thing::resource_node(ThingKind::Tree, Position::new(6, 5), 3))
            .unwrap();
        step(&mut env, 13);
        assert_eq!(env.thing(id).unwrap().pos, Position::new(5, 5));
        assert_eq!(
            env.thing(id).unwrap().inventory.count(crate::items::ItemKind::Wood),
            1
        );
        assert_eq!(
            env.thing(tree)
                .unwrap()
                .inventory
                .count(crate::items::ItemKind::Wood),
            2
        );
        assert_eq!(env.stats()[0].moves, 1);
    }

    #[test]
    fn lantern_push_one_tile() {
        let mut env = env();
        let agent = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(4, 4), 0))
            .unwrap();
        let mut lantern = Thing::new(ThingKind::Lantern, Position::new(5, 4));
        lantern.team = 0;
        let lantern = env.add(lantern).unwrap();
        step(&mut env, 13); // Move E
        assert_eq!(env.thing(agent).unwrap().pos, Position::new(5, 4));
        assert_eq!(env.thing(lantern).unwrap().pos, Position::new(6, 4));
    }

    #[test]
    fn lantern_push_respects_spacing() {
        let mut env = env();
        env.add(Thing::agent(0, UnitClass::Villager, Position::new(4, 4), 0))
            .unwrap();
        let pushed = env
            .add(Thing::new(ThingKind::Lantern, Position::new(5, 4)))
            .unwrap();
        // A second lantern two tiles past the push target keeps every
        // candidate within spacing except the far fallbacks.
        env.add(Thing::new(ThingKind::Lantern, Position::new(8, 4)))
            .unwrap();
        step(&mut env, 13);
        let landed = env.thing(pushed).unwrap().pos;
        assert!(chebyshev(landed, Position::new(8, 4)) >= SimConfig::LANTERN_SPACING);
    }

    #[test]
    fn cavalry_double_step() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Scout, Position::new(5, 5), 0))
            .unwrap();
        step(&mut env, 13);
        assert_eq!(env.thing(id).unwrap().pos, Position::new(7, 5));
    }

    #[test]
    fn road_double_step_for_infantry() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.grid.tile_mut(Position::new(6, 5)).unwrap().terrain = TerrainKind::Road;
        step(&mut env, 13);
        assert_eq!(env.thing(id).unwrap().pos, Position::new(7, 5));
    }

    #[test]
    fn enemy_door_blocks_friendly_door_admits() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.grid.tile_mut(Position::new(6, 5)).unwrap().door =
            Some(crate::terrain::DoorState { team: 1, hp: 10 });
        step(&mut env, 13);
        assert_eq!(env.thing(id).unwrap().pos, Position::new(5, 5));

        env.grid.tile_mut(Position::new(6, 5)).unwrap().door =
            Some(crate::terrain::DoorState { team: 0, hp: 10 });
        step(&mut env, 13);
        assert_eq!(env.thing(id).unwrap().pos, Position::new(6, 5));
    }
}
