//! The Use verb: terrain effects, building semantics, harvesting, and
//! pickups.

use crate::config::{RewardWeights, SimConfig};
use crate::env::Environment;
use crate::geom::{DIRECTIONS, Direction, Position, ThingId};
use crate::items::{ItemKind, Resource};
use crate::registry::{Recipe, UnitClass, UseKind, building_spec};
use crate::terrain::TerrainKind;
use crate::things::{Thing, ThingKind, exhausted_marker, resource_node_item};

pub(crate) fn execute_use(
    env: &mut Environment,
    id: ThingId,
    agent_id: usize,
    dir: Direction,
) -> bool {
    let Some(agent) = env.thing(id) else {
        return false;
    };
    let target = agent.pos.step(dir);
    if !env.grid.contains(target) {
        return false;
    }
    // Frozen tiles reject every Use.
    if env.grid.tile(target).is_some_and(|tile| tile.is_frozen) {
        return false;
    }

    if let Some(target_id) = env.grid.get_blocking(target) {
        return use_thing(env, id, agent_id, target_id);
    }
    if let Some(overlay_id) = env.grid.get_overlay(target) {
        return use_overlay(env, id, agent_id, overlay_id);
    }
    terrain_use(env, id, agent_id, target)
}

// ============================================================================
// Thing dispatch
// ============================================================================

fn use_thing(env: &mut Environment, id: ThingId, agent_id: usize, target_id: ThingId) -> bool {
    let Some(target) = env.thing(target_id) else {
        return false;
    };
    if target.frozen > 0 {
        return false;
    }
    if target.kind.is_resource_node() {
        return harvest_node(env, target_id, id, agent_id);
    }

    let team = env.thing(id).map(|agent| agent.team).unwrap_or(-1);
    let kind = target.kind;
    match kind.use_kind() {
        UseKind::Altar => use_altar(env, id, agent_id, target_id, team),
        UseKind::ClayOven | UseKind::Craft => craft_at(env, id, agent_id, target_id),
        UseKind::WeavingLoom => use_loom(env, id, agent_id, target_id),
        UseKind::Blacksmith => {
            craft_at(env, id, agent_id, target_id) || exchange_storage(env, id, target_id, team)
        }
        UseKind::Market => use_market(env, target_id, team),
        UseKind::Dropoff => deposit_stockpile(env, id, target_id, team),
        UseKind::DropoffAndStorage => {
            // Deposit first, then storage exchange, then unit production
            // (town centers declare a train class as well).
            deposit_stockpile(env, id, target_id, team)
                || exchange_storage(env, id, target_id, team)
                || train_unit(env, target_id, team)
        }
        UseKind::Storage => exchange_storage(env, id, target_id, team),
        UseKind::Train => train_unit(env, target_id, team),
        UseKind::TrainAndCraft => {
            train_unit(env, target_id, team) || craft_at(env, id, agent_id, target_id)
        }
        UseKind::Magma => smelt(env, id, agent_id, target_id),
        UseKind::Temple => touch_temple(env, target_id, team),
        UseKind::None => false,
    }
}

fn use_overlay(env: &mut Environment, id: ThingId, agent_id: usize, overlay_id: ThingId) -> bool {
    let Some(overlay) = env.thing(overlay_id) else {
        return false;
    };
    if overlay.frozen > 0 {
        return false;
    }
    match overlay.kind {
        kind if kind.is_resource_node() => harvest_node(env, overlay_id, id, agent_id),
        // Carriable overlays are picked up whole.
        ThingKind::Lantern => pickup_as_item(env, id, overlay_id, ItemKind::Lantern),
        ThingKind::Relic => pickup_as_item(env, id, overlay_id, ItemKind::Relic),
        _ => false,
    }
}

fn pickup_as_item(env: &mut Environment, id: ThingId, overlay_id: ThingId, item: ItemKind) -> bool {
    let can_carry = env
        .thing(id)
        .is_some_and(|agent| agent.inventory.agent_capacity_for(item) > 0);
    if !can_carry {
        return false;
    }
    let Some(taken) = env.remove(overlay_id) else {
        return false;
    };
    let Some(agent) = env.thing_mut(id) else {
        return false;
    };
    agent.inventory.add(item, 1);
    // Anything the thing itself carried comes along, clamped to the caps.
    let mut leftovers = taken.inventory;
    leftovers.drain_into_agent_bag(&mut agent.inventory);
    true
}

// ============================================================================
// Harvesting
// ============================================================================

/// Takes one unit from a resource node into the agent's bag, rewarding the
/// harvest and collapsing exhausted nodes into their marker stage.
pub(crate) fn harvest_node(
    env: &mut Environment,
    node_id: ThingId,
    id: ThingId,
    agent_id: usize,
) -> bool {
    let Some(node) = env.thing(node_id) else {
        return false;
    };
    let Some(item) = resource_node_item(node.kind) else {
        return false;
    };
    if node.inventory.count(item) == 0 {
        return false;
    }
    let fits = env
        .thing(id)
        .is_some_and(|agent| agent.inventory.agent_capacity_for(item) > 0);
    if !fits {
        return false;
    }

    let node_pos = env.thing(node_id).map(|node| node.pos).unwrap_or_default();
    let node_kind = env.thing(node_id).map(|node| node.kind);
    {
        let node = env.thing_mut(node_id).expect("checked above");
        node.inventory.remove(item, 1);
    }
    let remaining = env
        .thing(node_id)
        .map(|node| node.inventory.count(item))
        .unwrap_or(0);
    if let Some(agent) = env.thing_mut(id) {
        agent.inventory.add(item, 1);
    }
    let amount = reward_for_item(&env.config.rewards, item);
    env.reward(agent_id, amount);

    if remaining == 0 {
        env.remove(node_id);
        if let Some(marker_kind) = node_kind.and_then(exhausted_marker) {
            if env.grid.get_overlay(node_pos).is_none() {
                let marker = Thing::resource_node(marker_kind, node_pos, 2);
                let _ = env.add(marker);
            }
        }
    }
    true
}

/// Shaped-reward weight for acquiring one unit of `item`.
pub(crate) fn reward_for_item(weights: &RewardWeights, item: ItemKind) -> f32 {
    match item {
        ItemKind::Gold => weights.ore,
        ItemKind::Wood => weights.wood,
        ItemKind::Water => weights.water,
        ItemKind::Wheat => weights.wheat,
        ItemKind::Food | ItemKind::Meat | ItemKind::Fish => weights.food,
        ItemKind::Bar => weights.bar,
        ItemKind::Spear => weights.spear,
        ItemKind::Armor => weights.armor,
        ItemKind::Lantern => weights.cloth,
        ItemKind::Bread => weights.food,
        _ => 0.0,
    }
}

// ============================================================================
// Buildings
// ============================================================================

/// One Bar buys one heart, starts the altar cooldown, and pays the heart
/// reward.
fn use_altar(
    env: &mut Environment,
    id: ThingId,
    agent_id: usize,
    altar_id: ThingId,
    team: i32,
) -> bool {
    let ready = env
        .thing(altar_id)
        .is_some_and(|altar| altar.team == team && altar.cooldown == 0);
    if !ready {
        return false;
    }
    let paid = env
        .thing_mut(id)
        .is_some_and(|agent| agent.inventory.take_exact(ItemKind::Bar, 1));
    if !paid {
        return false;
    }
    let Some(altar) = env.thing_mut(altar_id) else {
        return false;
    };
    if let crate::things::ThingPayload::Altar { hearts } = &mut altar.payload {
        *hearts += 1;
    }
    altar.cooldown = SimConfig::ALTAR_COOLDOWN;
    let heart = env.config.rewards.heart;
    env.reward(agent_id, heart);
    true
}

/// Runs the station's first affordable recipe out of the agent's bag.
fn craft_at(env: &mut Environment, id: ThingId, agent_id: usize, station_id: ThingId) -> bool {
    let Some(station) = env.thing(station_id) else {
        return false;
    };
    if station.cooldown != 0 {
        return false;
    }
    let Some(spec) = building_spec(station.kind) else {
        return false;
    };
    let recipes: &[Recipe] = spec.recipes;

    let chosen = {
        let Some(agent) = env.thing(id) else {
            return false;
        };
        recipes.iter().find(|recipe| {
            recipe
                .inputs
                .iter()
                .all(|(item, amount)| agent.inventory.count(*item) >= *amount)
                && agent.inventory.agent_capacity_for(recipe.output.0) >= recipe.output.1
        })
    };
    let Some(recipe) = chosen else {
        return false;
    };

    if let Some(agent) = env.thing_mut(id) {
        for (item, amount) in recipe.inputs {
            agent.inventory.take_exact(*item, *amount);
        }
        agent.inventory.add(recipe.output.0, recipe.output.1);
    }
    if let Some(station) = env.thing_mut(station_id) {
        station.cooldown = SimConfig::STATION_COOLDOWN;
    }
    let amount = reward_for_item(&env.config.rewards, recipe.output.0) * recipe.output.1 as f32;
    env.reward(agent_id, amount);
    true
}

/// One Wheat or one Wood becomes a Lantern, but only if none is held.
fn use_loom(env: &mut Environment, id: ThingId, agent_id: usize, loom_id: ThingId) -> bool {
    let ready = env.thing(loom_id).is_some_and(|loom| loom.cooldown == 0);
    if !ready {
        return false;
    }
    let Some(agent) = env.thing_mut(id) else {
        return false;
    };
    if agent.inventory.count(ItemKind::Lantern) > 0 {
        return false;
    }
    if !agent.inventory.take_exact(ItemKind::Wheat, 1)
        && !agent.inventory.take_exact(ItemKind::Wood, 1)
    {
        return false;
    }
    agent.inventory.add(ItemKind::Lantern, 1);
    if let Some(loom) = env.thing_mut(loom_id) {
        loom.cooldown = SimConfig::STATION_COOLDOWN;
    }
    let cloth = env.config.rewards.cloth;
    env.reward(agent_id, cloth);
    true
}

/// Converts team stockpile along the first affordable trade.
fn use_market(env: &mut Environment, market_id: ThingId, team: i32) -> bool {
    let ready = env
        .thing(market_id)
        .is_some_and(|market| market.cooldown == 0 && market.team == team);
    if !ready {
        return false;
    }
    let cap = env.stockpile_cap(team);
    let Some(team_state) = env.team_mut(team) else {
        return false;
    };
    let mut traded = false;
    for (give, give_n, recv, recv_n) in crate::registry::MARKET_TRADES {
        if team_state.stockpile.get(give) >= give_n {
            team_state.stockpile.spend(give, give_n);
            team_state.stockpile.add_capped(recv, recv_n, cap);
            traded = true;
            break;
        }
    }
    if traded {
        if let Some(market) = env.thing_mut(market_id) {
            market.cooldown = SimConfig::STATION_COOLDOWN;
        }
    }
    traded
}

/// Deposits the agent's carried stockpile resources into the team pool,
/// restricted to the building's accepted subset.
fn deposit_stockpile(env: &mut Environment, id: ThingId, building_id: ThingId, team: i32) -> bool {
    let Some(building) = env.thing(building_id) else {
        return false;
    };
    if building.team != team {
        return false;
    }
    let Some(spec) = building_spec(building.kind) else {
        return false;
    };
    let accepted: Vec<Resource> = spec.dropoff.to_vec();
    let cap = env.stockpile_cap(team);

    let mut moved = false;
    for resource in accepted {
        let item = resource.item();
        let held = env
            .thing(id)
            .map(|agent| agent.inventory.count(item))
            .unwrap_or(0);
        if held == 0 {
            continue;
        }
        let accepted_count = env
            .team_mut(team)
            .map(|state| state.stockpile.add_capped(resource, held, cap))
            .unwrap_or(0);
        if accepted_count > 0 {
            if let Some(agent) = env.thing_mut(id) {
                agent.inventory.remove(item, accepted_count);
            }
            moved = true;
        }
    }
    moved
}

/// Bidirectional storage for the building's whitelisted items: deposit
/// what the agent carries; if nothing moved, withdraw one item instead.
fn exchange_storage(env: &mut Environment, id: ThingId, building_id: ThingId, team: i32) -> bool {
    let Some(building) = env.thing(building_id) else {
        return false;
    };
    if building.team != team {
        return false;
    }
    let Some(spec) = building_spec(building.kind) else {
        return false;
    };
    if spec.barrel_capacity == 0 {
        return false;
    }
    let whitelist: Vec<ItemKind> = spec.storage_items.to_vec();
    let barrel_capacity = spec.barrel_capacity;

    // Deposit pass.
    let mut moved = false;
    for item in &whitelist {
        let held = env
            .thing(id)
            .map(|agent| agent.inventory.count(*item))
            .unwrap_or(0);
        if held == 0 {
            continue;
        }
        let stored: u32 = env
            .thing(building_id)
            .map(|building| building.inventory.iter().map(|(_, count)| count).sum())
            .unwrap_or(0);
        let space = barrel_capacity.saturating_sub(stored);
        let deposit = held.min(space);
        if deposit == 0 {
            continue;
        }
        if let Some(agent) = env.thing_mut(id) {
            agent.inventory.remove(*item, deposit);
        }
        if let Some(building) = env.thing_mut(building_id) {
            building.inventory.add(*item, deposit);
        }
        moved = true;
    }
    if moved {
        return true;
    }

    // Withdraw pass.
    for item in &whitelist {
        let available = env
            .thing(building_id)
            .map(|building| building.inventory.count(*item))
            .unwrap_or(0);
        if available == 0 {
            continue;
        }
        let fits = env
            .thing(id)
            .is_some_and(|agent| agent.inventory.agent_capacity_for(*item) > 0);
        if !fits {
            continue;
        }
        if let Some(building) = env.thing_mut(building_id) {
            building.inventory.remove(*item, 1);
        }
        if let Some(agent) = env.thing_mut(id) {
            agent.inventory.add(*item, 1);
        }
        return true;
    }
    false
}

/// Produces the building's declared unit class at its declared cost.
fn train_unit(env: &mut Environment, building_id: ThingId, team: i32) -> bool {
    let Some(building) = env.thing(building_id) else {
        return false;
    };
    if building.team != team || building.cooldown != 0 {
        return false;
    }
    let Some(spec) = building_spec(building.kind) else {
        return false;
    };
    let Some((class, cost)) = spec.train else {
        return false;
    };
    let building_pos = building.pos;
    let rally = building
        .building_data()
        .and_then(|data| data.rally_point);

    if env.live_population(team) >= env.population_cap(team) {
        return false;
    }
    let Some(out) = DIRECTIONS
        .iter()
        .map(|dir| building_pos.step(*dir))
        .find(|pos| env.grid.is_empty(*pos, class))
    else {
        return false;
    };
    let affordable = env
        .team_mut(team)
        .is_some_and(|state| state.stockpile.can_afford(cost));
    if !affordable {
        return false;
    }
    let Some(new_unit) = env.spawn_unit(team, class, out) else {
        return false;
    };
    if let Some(state) = env.team_mut(team) {
        state.stockpile.spend_all(cost);
    }
    if let Some(unit) = env.thing_mut(new_unit) {
        if let Some(target) = rally {
            let here = unit.pos;
            unit.orientation = Direction::towards(here, target);
        }
    }
    if let Some(building) = env.thing_mut(building_id) {
        building.cooldown = SimConfig::STATION_COOLDOWN;
    }
    true
}

/// Magma smelts one Gold into one Bar.
fn smelt(env: &mut Environment, id: ThingId, agent_id: usize, magma_id: ThingId) -> bool {
    let ready = env.thing(magma_id).is_some_and(|magma| magma.cooldown == 0);
    if !ready {
        return false;
    }
    let Some(agent) = env.thing_mut(id) else {
        return false;
    };
    if agent.inventory.agent_capacity_for(ItemKind::Bar) == 0 {
        return false;
    }
    if !agent.inventory.take_exact(ItemKind::Gold, 1) {
        return false;
    }
    agent.inventory.add(ItemKind::Bar, 1);
    if let Some(magma) = env.thing_mut(magma_id) {
        magma.cooldown = SimConfig::STATION_COOLDOWN;
    }
    let bar = env.config.rewards.bar;
    env.reward(agent_id, bar);
    true
}

/// Touching a ready friendly temple registers interest; the reproduction
/// itself runs in the world tick when two partners stand adjacent.
fn touch_temple(env: &mut Environment, temple_id: ThingId, team: i32) -> bool {
    env.thing(temple_id)
        .is_some_and(|temple| temple.team == team && temple.cooldown == 0)
}

// ============================================================================
// Terrain effects
// ============================================================================

fn terrain_use(env: &mut Environment, id: ThingId, agent_id: usize, target: Position) -> bool {
    let Some(tile) = env.grid.tile(target) else {
        return false;
    };
    let terrain = tile.terrain;
    let terrain_yield = tile.terrain_yield;

    // Drink.
    if matches!(terrain, TerrainKind::Water | TerrainKind::ShallowWater) {
        let fits = env
            .thing(id)
            .is_some_and(|agent| agent.inventory.agent_capacity_for(ItemKind::Water) > 0);
        if !fits {
            return false;
        }
        if let Some(agent) = env.thing_mut(id) {
            agent.inventory.add(ItemKind::Water, 1);
        }
        let water = env.config.rewards.water;
        env.reward(agent_id, water);
        return true;
    }

    // Harvest resource terrain.
    if let Some(item) = terrain.harvest_item() {
        if terrain_yield == 0 {
            return false;
        }
        let fits = env
            .thing(id)
            .is_some_and(|agent| agent.inventory.agent_capacity_for(item) > 0);
        if !fits {
            return false;
        }
        if let Some(agent) = env.thing_mut(id) {
            agent.inventory.add(item, 1);
        }
        let amount = reward_for_item(&env.config.rewards, item);
        env.reward(agent_id, amount);
        let exhausted = {
            let tile = env.grid.tile_mut(target).expect("checked above");
            tile.terrain_yield -= 1;
            if tile.terrain_yield == 0 {
                tile.terrain = terrain.exhausted_form();
                true
            } else {
                false
            }
        };
        if exhausted {
            let marker_kind = match terrain {
                TerrainKind::Tree | TerrainKind::Palm => Some(ThingKind::Stump),
                TerrainKind::Wheat => Some(ThingKind::Stubble),
                _ => None,
            };
            if let Some(marker_kind) = marker_kind {
                if env.grid.get_overlay(target).is_none() {
                    let _ = env.add(Thing::resource_node(marker_kind, target, 2));
                }
            }
        }
        return true;
    }

    // Pour water onto plain ground.
    let holds_water = env
        .thing(id)
        .is_some_and(|agent| agent.inventory.count(ItemKind::Water) > 0);
    if holds_water && terrain.accepts_water() {
        if let Some(agent) = env.thing_mut(id) {
            agent.inventory.take_exact(ItemKind::Water, 1);
        }
        if let Some(tile) = env.grid.tile_mut(target) {
            tile.terrain = TerrainKind::Fertile;
        }
        return true;
    }

    // Eat bread: small AoE heal around the eater.
    let holds_bread = env
        .thing(id)
        .is_some_and(|agent| agent.inventory.count(ItemKind::Bread) > 0);
    if holds_bread {
        let (pos, team) = {
            let agent = env.thing(id).expect("checked above");
            (agent.pos, agent.team)
        };
        if let Some(agent) = env.thing_mut(id) {
            agent.inventory.take_exact(ItemKind::Bread, 1);
            agent.hp = (agent.hp + BREAD_HEAL).min(agent.max_hp);
        }
        for dir in DIRECTIONS {
            let neighbour = pos.step(dir);
            let Some(other_id) = env.grid.get_blocking(neighbour) else {
                continue;
            };
            if let Some(other) = env.thing_mut(other_id) {
                if other.kind == ThingKind::Agent && other.team == team && other.is_alive() {
                    other.hp = (other.hp + BREAD_HEAL).min(other.max_hp);
                }
            }
        }
        return true;
    }

    // Monks lay relics down.
    let monk_with_relic = env.thing(id).is_some_and(|agent| {
        agent.unit_class() == UnitClass::Monk && agent.inventory.count(ItemKind::Relic) > 0
    });
    if monk_with_relic && env.grid.get_overlay(target).is_none() && env.grid.in_playable(target) {
        let team = env.thing(id).map(|agent| agent.team).unwrap_or(-1);
        if let Some(agent) = env.thing_mut(id) {
            agent.inventory.take_exact(ItemKind::Relic, 1);
        }
        let mut relic = Thing::new(ThingKind::Relic, target);
        relic.team = team;
        let _ = env.add(relic);
        return true;
    }

    false
}

/// HP restored to the eater and each adjacent ally by Bread.
const BREAD_HEAL: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::env::EmptyMap;

    fn env() -> Environment {
        Environment::new(SimConfig::default(), Box::new(EmptyMap::new(20, 20))).unwrap()
    }

    fn step(env: &mut Environment, action_for_zero: u8) {
        let mut actions = vec![0u8; SimConfig::NUM_AGENTS];
        actions[0] = action_for_zero;
        env.step(&actions).unwrap();
    }

    const USE_S: u8 = 31;
    const USE_E: u8 = 33;

    #[test]
    fn altar_heart_purchase() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().inventory.add(ItemKind::Bar, 1);
        let altar = env.add(Thing::altar(Position::new(5, 6), 0, 3)).unwrap();
        step(&mut env, USE_S);

        assert_eq!(env.thing(id).unwrap().inventory.count(ItemKind::Bar), 0);
        assert_eq!(env.thing(altar).unwrap().hearts(), Some(4));
        // Building cooldowns tick once within the same step.
        assert_eq!(
            env.thing(altar).unwrap().cooldown,
            SimConfig::ALTAR_COOLDOWN - 1
        );
        assert!((env.rewards()[0] - env.config().rewards.heart).abs() < 1e-3);
    }

    #[test]
    fn altar_rejects_without_bar() {
        let mut env = env();
        env.add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        let altar = env.add(Thing::altar(Position::new(5, 6), 0, 3)).unwrap();
        step(&mut env, USE_S);
        assert_eq!(env.thing(altar).unwrap().hearts(), Some(3));
        assert_eq!(env.stats()[0].action_invalid, 1);
    }

    #[test]
    fn magma_smelts_gold_into_bar() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().inventory.add(ItemKind::Gold, 1);
        env.add(Thing::new(ThingKind::Magma, Position::new(5, 6)))
            .unwrap();
        step(&mut env, USE_S);
        let bag = &env.thing(id).unwrap().inventory;
        assert_eq!(bag.count(ItemKind::Gold), 0);
        assert_eq!(bag.count(ItemKind::Bar), 1);
    }

    #[test]
    fn terrain_gold_harvest() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.grid.tile_mut(Position::new(6, 5)).unwrap().terrain = TerrainKind::Gold;
        env.grid.tile_mut(Position::new(6, 5)).unwrap().terrain_yield = 2;
        step(&mut env, USE_E);
        assert_eq!(env.thing(id).unwrap().inventory.count(ItemKind::Gold), 1);
        assert_eq!(
            env.grid.tile(Position::new(6, 5)).unwrap().terrain_yield,
            1
        );
    }

    #[test]
    fn exhausted_tree_terrain_leaves_a_stump() {
        let mut env = env();
        env.add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        {
            let tile = env.grid.tile_mut(Position::new(6, 5)).unwrap();
            tile.terrain = TerrainKind::Tree;
            tile.terrain_yield = 1;
        }
        step(&mut env, USE_E);
        assert_eq!(
            env.grid.terrain(Position::new(6, 5)),
            Some(TerrainKind::Empty)
        );
        let marker = env.grid.get_overlay(Position::new(6, 5)).unwrap();
        assert_eq!(env.thing(marker).unwrap().kind, ThingKind::Stump);
    }

    #[test]
    fn pour_water_makes_fertile() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().inventory.add(ItemKind::Water, 1);
        step(&mut env, USE_E);
        assert_eq!(
            env.grid.terrain(Position::new(6, 5)),
            Some(TerrainKind::Fertile)
        );
        assert_eq!(env.thing(id).unwrap().inventory.count(ItemKind::Water), 0);
    }

    #[test]
    fn bread_heals_adjacent_allies() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        let ally = env
            .add(Thing::agent(1, UnitClass::Villager, Position::new(6, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().inventory.add(ItemKind::Bread, 1);
        env.thing_mut(id).unwrap().hp = 2;
        env.thing_mut(ally).unwrap().hp = 2;
        // Use N targets an empty tile, triggering the terrain path.
        step(&mut env, 30);
        assert!(env.thing(id).unwrap().hp > 2);
        assert!(env.thing(ally).unwrap().hp > 2);
    }

    #[test]
    fn dropoff_routes_to_stockpile() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().inventory.add(ItemKind::Wood, 3);
        env.thing_mut(id).unwrap().inventory.add(ItemKind::Bread, 1);
        env.add(Thing::building(ThingKind::TownCenter, Position::new(5, 6), 0))
            .unwrap();
        step(&mut env, USE_S);
        assert_eq!(env.team(0).unwrap().stockpile.get(Resource::Wood), 3);
        let bag = &env.thing(id).unwrap().inventory;
        assert_eq!(bag.count(ItemKind::Wood), 0);
        // Carried items stay carried.
        assert_eq!(bag.count(ItemKind::Bread), 1);
    }

    #[test]
    fn granary_only_accepts_its_subset() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().inventory.add(ItemKind::Wood, 2);
        env.thing_mut(id).unwrap().inventory.add(ItemKind::Food, 2);
        env.add(Thing::building(ThingKind::Granary, Position::new(5, 6), 0))
            .unwrap();
        step(&mut env, USE_S);
        assert_eq!(env.team(0).unwrap().stockpile.get(Resource::Food), 2);
        assert_eq!(env.team(0).unwrap().stockpile.get(Resource::Wood), 0);
        assert_eq!(env.thing(id).unwrap().inventory.count(ItemKind::Wood), 2);
    }

    #[test]
    fn market_trades_wood_for_gold() {
        let mut env = env();
        env.add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.add(Thing::building(ThingKind::Market, Position::new(5, 6), 0))
            .unwrap();
        let cap = env.stockpile_cap(0);
        env.team_mut(0)
            .unwrap()
            .stockpile
            .add_capped(Resource::Wood, 3, cap);
        step(&mut env, USE_S);
        let pool = &env.team(0).unwrap().stockpile;
        assert_eq!(pool.get(Resource::Wood), 0);
        assert_eq!(pool.get(Resource::Gold), 1);
    }

    #[test]
    fn train_produces_a_villager() {
        let mut env = env();
        env.add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.add(Thing::building(ThingKind::TownCenter, Position::new(5, 7), 0))
            .unwrap();
        let cap = env.stockpile_cap(0);
        env.team_mut(0)
            .unwrap()
            .stockpile
            .add_capped(Resource::Food, 5, cap);
        let before = env.live_population(0);
        let mut actions = vec![0u8; SimConfig::NUM_AGENTS];
        actions[0] = 11; // Move S → (5,6), adjacent to the town center
        env.step(&actions).unwrap();
        actions[0] = USE_S;
        env.step(&actions).unwrap();
        assert_eq!(env.live_population(0), before + 1);
        assert_eq!(env.team(0).unwrap().stockpile.get(Resource::Food), 3);
    }

    #[test]
    fn loom_weaves_a_single_lantern() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.thing_mut(id).unwrap().inventory.add(ItemKind::Wood, 2);
        env.add(Thing::building(ThingKind::WeavingLoom, Position::new(5, 6), 0))
            .unwrap();
        step(&mut env, USE_S);
        assert_eq!(env.thing(id).unwrap().inventory.count(ItemKind::Lantern), 1);
        // Holding one blocks a second weave even after the cooldown.
        for _ in 0..SimConfig::STATION_COOLDOWN + 1 {
            step(&mut env, 0);
        }
        step(&mut env, USE_S);
        assert_eq!(env.thing(id).unwrap().inventory.count(ItemKind::Lantern), 1);
    }

    #[test]
    fn lantern_pickup_from_overlay() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        env.add(Thing::new(ThingKind::Lantern, Position::new(6, 5)))
            .unwrap();
        step(&mut env, USE_E);
        assert_eq!(env.thing(id).unwrap().inventory.count(ItemKind::Lantern), 1);
        assert!(env.grid.get_overlay(Position::new(6, 5)).is_none());
    }

    #[test]
    fn corpse_harvest_decrements_and_collapses() {
        let mut env = env();
        let id = env
            .add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        let corpse = env
            .add(Thing::resource_node(ThingKind::Corpse, Position::new(6, 5), 1))
            .unwrap();
        step(&mut env, USE_E);
        assert_eq!(env.thing(id).unwrap().inventory.count(ItemKind::Meat), 1);
        assert!(env.thing(corpse).is_none());
        // The corpse collapses into a skeleton marker.
        let marker = env.grid.get_overlay(Position::new(6, 5)).unwrap();
        assert_eq!(env.thing(marker).unwrap().kind, ThingKind::Skeleton);
    }
}
