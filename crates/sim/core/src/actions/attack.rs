//! The Attack verb and the shared damage primitives used by towers,
//! predators, and tumors.

use crate::config::SimConfig;
use crate::env::Environment;
use crate::geom::{Direction, Position, ThingId, chebyshev};
use crate::items::ItemKind;
use crate::registry::UnitClass;
use crate::things::ThingKind;

pub(crate) fn execute_attack(
    env: &mut Environment,
    id: ThingId,
    agent_id: usize,
    dir: Direction,
) -> bool {
    let Some(agent) = env.thing_mut(id) else {
        return false;
    };
    // Orientation updates even when the attack finds no target.
    agent.orientation = dir;
    let pos = agent.pos;
    let team = agent.team;
    let class = agent.unit_class();
    let damage = agent
        .agent_data()
        .map(|data| data.attack_damage)
        .unwrap_or(1);
    let has_spear = agent.inventory.count(ItemKind::Spear) > 0;

    match class {
        UnitClass::Monk => convert_enemy(env, id, agent_id, pos, team, dir),
        UnitClass::Mangonel => {
            let center = pos.step_n(dir, 3);
            let cells = arc_cells(center, dir);
            volley(env, agent_id, team, damage, &cells)
        }
        UnitClass::Boat => {
            let forward = pos.step(dir);
            let cells = arc_cells(forward, dir);
            volley(env, agent_id, team, damage, &cells)
        }
        _ => {
            let natural_range = class.stats().attack_range;
            let range = natural_range.max(if has_spear { 2 } else { 1 });
            ranged_scan(
                env,
                id,
                agent_id,
                pos,
                team,
                dir,
                damage,
                range,
                natural_range,
                has_spear,
            )
        }
    }
}

/// Scans tiles at strictly increasing distance along `dir` and resolves
/// the first valid target. Any other blocking thing stops the ray.
#[allow(clippy::too_many_arguments)]
fn ranged_scan(
    env: &mut Environment,
    id: ThingId,
    agent_id: usize,
    pos: Position,
    team: i32,
    dir: Direction,
    damage: i32,
    range: i32,
    natural_range: i32,
    has_spear: bool,
) -> bool {
    for dist in 1..=range {
        let target = pos.step_n(dir, dist);
        if !env.grid.contains(target) {
            return false;
        }

        // Enemy doors are hit before whatever stands behind them.
        if let Some(door) = env.grid.tile(target).and_then(|tile| tile.door) {
            if door.team != team {
                damage_door(env, target, damage);
                consume_spear_if_used(env, id, dist, natural_range, has_spear);
                return true;
            }
        }

        let Some(target_id) = env.grid.get_blocking(target) else {
            continue;
        };
        return match strike(env, target_id, agent_id, team, damage) {
            StrikeOutcome::Hit => {
                consume_spear_if_used(env, id, dist, natural_range, has_spear);
                true
            }
            StrikeOutcome::Harvest => super::harvest_node(env, target_id, id, agent_id),
            StrikeOutcome::NotATarget => false,
        };
    }
    false
}

/// The spear grants the second tile of reach and is consumed by the hit
/// that needed it.
fn consume_spear_if_used(
    env: &mut Environment,
    id: ThingId,
    dist: i32,
    natural_range: i32,
    has_spear: bool,
) {
    if has_spear && dist > natural_range.max(1) {
        if let Some(agent) = env.thing_mut(id) {
            agent.inventory.take_exact(ItemKind::Spear, 1);
        }
    }
}

/// The three cells of a forward arc / AoE: center plus the two
/// perpendicular offsets.
fn arc_cells(center: Position, dir: Direction) -> [Position; 3] {
    let [left, right] = dir.perpendiculars();
    [
        center,
        Position::new(center.x + left.0, center.y + left.1),
        Position::new(center.x + right.0, center.y + right.1),
    ]
}

/// Applies `damage` to every valid target in `cells`. True if anything was
/// hit.
fn volley(
    env: &mut Environment,
    agent_id: usize,
    team: i32,
    damage: i32,
    cells: &[Position],
) -> bool {
    let mut any = false;
    for cell in cells {
        let Some(target_id) = env.grid.get_blocking(*cell) else {
            continue;
        };
        if matches!(
            strike(env, target_id, agent_id, team, damage),
            StrikeOutcome::Hit
        ) {
            any = true;
        }
    }
    any
}

enum StrikeOutcome {
    Hit,
    /// Trees and palms are harvested rather than damaged.
    Harvest,
    NotATarget,
}

/// Resolves one attack against a blocking thing.
fn strike(
    env: &mut Environment,
    target_id: ThingId,
    agent_id: usize,
    team: i32,
    damage: i32,
) -> StrikeOutcome {
    let Some(target) = env.thing(target_id) else {
        return StrikeOutcome::NotATarget;
    };
    let kind = target.kind;
    let target_team = target.team;

    match kind {
        ThingKind::Agent if target_team != team => {
            if damage_agent(env, target_id, damage) {
                env.stats[agent_id].kills += 1;
            }
            StrikeOutcome::Hit
        }
        ThingKind::Altar if target_team != team => {
            strike_altar(env, target_id, team);
            StrikeOutcome::Hit
        }
        ThingKind::Cow | ThingKind::Wolf | ThingKind::Bear => {
            damage_mob(env, target_id, damage);
            StrikeOutcome::Hit
        }
        ThingKind::Tree | ThingKind::Palm => StrikeOutcome::Harvest,
        ThingKind::Tumor | ThingKind::Spawner => {
            env.remove(target_id);
            let tumor_kill = env.config.rewards.tumor_kill;
            env.reward(agent_id, tumor_kill);
            StrikeOutcome::Hit
        }
        _ if kind.is_attackable_structure() && target_team != team => {
            damage_structure(env, target_id, damage);
            StrikeOutcome::Hit
        }
        _ => StrikeOutcome::NotATarget,
    }
}

/// Damages an enemy agent. Armor in the defender's inventory raises a
/// shield band; it does not reduce the damage. Returns true if the target
/// died.
pub(crate) fn damage_agent(env: &mut Environment, target_id: ThingId, damage: i32) -> bool {
    let Some(target) = env.thing_mut(target_id) else {
        return false;
    };
    if target.inventory.count(ItemKind::Armor) > 0 {
        if let Some(data) = target.agent_data_mut() {
            data.shield_countdown = SimConfig::SHIELD_TICKS;
        }
    }
    target.hp -= damage;
    if target.hp <= 0 {
        env.kill_agent(target_id);
        true
    } else {
        false
    }
}

/// Damages a mob; a kill leaves a Corpse carrying the remaining yield.
pub(crate) fn damage_mob(env: &mut Environment, target_id: ThingId, damage: i32) {
    let Some(target) = env.thing_mut(target_id) else {
        return;
    };
    target.hp -= damage;
    if target.hp > 0 {
        return;
    }
    let Some(mut dead) = env.remove(target_id) else {
        return;
    };
    dead.inventory.add(ItemKind::Meat, 2);
    if env.grid.get_overlay(dead.pos).is_none() {
        let mut corpse = crate::things::Thing::new(ThingKind::Corpse, dead.pos);
        corpse.inventory = dead.inventory;
        let _ = env.add(corpse);
    }
}

/// Damages an attackable structure; at 0 HP it is razed.
pub(crate) fn damage_structure(env: &mut Environment, target_id: ThingId, damage: i32) {
    let Some(target) = env.thing_mut(target_id) else {
        return;
    };
    target.hp -= damage;
    if target.hp <= 0 {
        env.remove(target_id);
    }
}

pub(crate) fn damage_door(env: &mut Environment, pos: Position, damage: i32) {
    let Some(tile) = env.grid.tile_mut(pos) else {
        return;
    };
    if let Some(door) = tile.door.as_mut() {
        door.hp -= damage;
        if door.hp <= 0 {
            tile.door = None;
        }
    }
}

/// One altar hit removes one heart; the altar changes hands when the last
/// heart falls, taking the old team's doors with it. Other buildings keep
/// their previous owner until razed.
fn strike_altar(env: &mut Environment, altar_id: ThingId, attacker_team: i32) {
    let Some(altar) = env.thing_mut(altar_id) else {
        return;
    };
    let old_team = altar.team;
    let conquered = match &mut altar.payload {
        crate::things::ThingPayload::Altar { hearts } => {
            *hearts = hearts.saturating_sub(1);
            *hearts == 0
        }
        _ => false,
    };
    if !conquered {
        return;
    }
    altar.team = attacker_team;
    transfer_doors(env, old_team, attacker_team);
}

fn transfer_doors(env: &mut Environment, from_team: i32, to_team: i32) {
    for y in 0..env.grid.height() {
        for x in 0..env.grid.width() {
            let pos = Position::new(x, y);
            if let Some(tile) = env.grid.tile_mut(pos) {
                if let Some(door) = tile.door.as_mut() {
                    if door.team == from_team {
                        door.team = to_team;
                    }
                }
            }
        }
    }
}

/// Monk "attack": converts an adjacent enemy agent to the monk's team and
/// re-homes it to the nearest friendly altar.
fn convert_enemy(
    env: &mut Environment,
    _id: ThingId,
    agent_id: usize,
    pos: Position,
    team: i32,
    dir: Direction,
) -> bool {
    let target = pos.step(dir);
    let Some(target_id) = env.grid.get_blocking(target) else {
        return false;
    };
    let Some(thing) = env.thing(target_id) else {
        return false;
    };
    if thing.kind != ThingKind::Agent || thing.team == team || !thing.is_alive() {
        return false;
    }

    let new_home = nearest_team_altar(env, target, team);
    let Some(thing) = env.thing_mut(target_id) else {
        return false;
    };
    thing.team = team;
    if let Some(data) = thing.agent_data_mut() {
        data.team_override = Some(team);
        data.home_altar = new_home;
    }
    env.stats[agent_id].conversions += 1;
    env.effects.push(crate::env::VisualEffect {
        pos: target,
        tint: 200,
        ttl: 2,
    });
    true
}

pub(crate) fn nearest_team_altar(
    env: &Environment,
    origin: Position,
    team: i32,
) -> Option<ThingId> {
    env.things
        .bucket(ThingKind::Altar)
        .iter()
        .filter_map(|id| env.thing(*id).map(|thing| (*id, thing)))
        .filter(|(_, thing)| thing.team == team)
        .min_by_key(|(id, thing)| (chebyshev(origin, thing.pos), id.index))
        .map(|(id, _)| id)
}
