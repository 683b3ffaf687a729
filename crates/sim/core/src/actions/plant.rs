//! The Plant verbs: lantern placement and resource seeding.

use crate::env::Environment;
use crate::geom::{CARDINALS, Direction, ThingId};
use crate::items::ItemKind;
use crate::terrain::TerrainKind;
use crate::things::{Thing, ThingKind};

/// Consumes a held Lantern and places a team-coloured lantern overlay.
pub(crate) fn execute_plant_lantern(env: &mut Environment, id: ThingId, dir: Direction) -> bool {
    let Some(agent) = env.thing(id) else {
        return false;
    };
    let team = agent.team;
    let target = agent.pos.step(dir);
    if agent.inventory.count(ItemKind::Lantern) == 0 {
        return false;
    }
    if env.grid.tile(target).is_some_and(|tile| tile.is_frozen) {
        return false;
    }
    if !super::movement::lantern_site_legal(env, None, target) {
        return false;
    }
    if let Some(agent) = env.thing_mut(id) {
        agent.inventory.take_exact(ItemKind::Lantern, 1);
    }
    let mut lantern = Thing::new(ThingKind::Lantern, target);
    lantern.team = team;
    env.add(lantern).is_ok()
}

/// Seeds a Wheat or Tree node on a Fertile tile. Argument layout: bits
/// 0–1 pick a cardinal direction, bit 2 picks Wheat (0) or Tree (1);
/// arguments 8 and 9 are invalid.
pub(crate) fn execute_plant_resource(env: &mut Environment, id: ThingId, arg: u8) -> bool {
    if arg >= 8 {
        return false;
    }
    let dir = CARDINALS[(arg & 0b11) as usize];
    let plant_tree = arg & 0b100 != 0;
    let (seed_item, node_kind) = if plant_tree {
        (ItemKind::Wood, ThingKind::Tree)
    } else {
        (ItemKind::Wheat, ThingKind::Wheat)
    };

    let Some(agent) = env.thing(id) else {
        return false;
    };
    let target = agent.pos.step(dir);
    if agent.inventory.count(seed_item) == 0 {
        return false;
    }
    let plantable = env.grid.tile(target).is_some_and(|tile| {
        tile.terrain == TerrainKind::Fertile && !tile.is_frozen
    }) && env.grid.get_blocking(target).is_none()
        && env.grid.in_playable(target);
    if !plantable {
        return false;
    }

    if let Some(agent) = env.thing_mut(id) {
        agent.inventory.take_exact(seed_item, 1);
    }
    if let Some(tile) = env.grid.tile_mut(target) {
        tile.terrain = TerrainKind::Empty;
    }
    env.add(Thing::resource_node(node_kind, target, SEEDED_YIELD))
        .is_ok()
}

/// Initial yield of a freshly seeded node.
const SEEDED_YIELD: u32 = 3;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::env::EmptyMap;
    use crate::geom::Position;
    use crate::registry::UnitClass;

    fn env() -> Environment {
        Environment::new(SimConfig::default(), Box::new(EmptyMap::new(20, 20))).unwrap()
    }

    fn step(env: &mut Environment, action_for_zero: u8) {
        let mut actions = vec![0u8; SimConfig::NUM_AGENTS];
        actions[0] = action_for_zero;
        env.step(&actions).unwrap();
    }

    #[test]
    fn plant_lantern_consumes_item() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().inventory.add(ItemKind::Lantern, 1);
        step(&mut env, 63); // Plant-Lantern E
        let lantern = env.grid.get_overlay(Position::new(6, 5)).unwrap();
        assert_eq!(env.thing(lantern).unwrap().kind, ThingKind::Lantern);
        assert_eq!(env.thing(lantern).unwrap().team, 0);
        assert_eq!(env.thing(id).unwrap().inventory.count(ItemKind::Lantern), 0);
    }

    #[test]
    fn plant_lantern_respects_spacing() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().inventory.add(ItemKind::Lantern, 1);
        env.add(Thing::new(ThingKind::Lantern, Position::new(7, 5)))
            .unwrap();
        step(&mut env, 63);
        assert_eq!(env.stats()[0].action_invalid, 1);
        assert_eq!(env.thing(id).unwrap().inventory.count(ItemKind::Lantern), 1);
    }

    #[test]
    fn plant_wheat_on_fertile() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().inventory.add(ItemKind::Wheat, 1);
        env.grid.tile_mut(Position::new(6, 5)).unwrap().terrain = TerrainKind::Fertile;
        // arg: dir E (index 3), wheat bit clear → 3.
        step(&mut env, 73);
        let node = env.grid.get_blocking(Position::new(6, 5)).unwrap();
        assert_eq!(env.thing(node).unwrap().kind, ThingKind::Wheat);
        assert_eq!(
            env.grid.terrain(Position::new(6, 5)),
            Some(TerrainKind::Empty)
        );
    }

    #[test]
    fn plant_tree_uses_wood_and_high_bit() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().inventory.add(ItemKind::Wood, 1);
        env.grid.tile_mut(Position::new(6, 5)).unwrap().terrain = TerrainKind::Fertile;
        // arg: dir E (3) | tree bit (4) → 7.
        step(&mut env, 77);
        let node = env.grid.get_blocking(Position::new(6, 5)).unwrap();
        assert_eq!(env.thing(node).unwrap().kind, ThingKind::Tree);
        assert_eq!(env.thing(id).unwrap().inventory.count(ItemKind::Wood), 0);
    }

    #[test]
    fn plant_rejects_non_fertile_and_bad_args() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().inventory.add(ItemKind::Wheat, 1);
        step(&mut env, 73); // Fertile missing
        assert_eq!(env.stats()[0].action_invalid, 1);
        step(&mut env, 78); // arg 8 is out of the encoding
        assert_eq!(env.stats()[0].action_invalid, 2);
    }
}
