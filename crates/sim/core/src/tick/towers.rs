//! Building-driven combat: guard towers, castles, and town centers fire
//! after agent actions each tick.

use crate::actions::attack::{damage_agent, damage_mob};
use crate::config::SimConfig;
use crate::env::{Environment, TeamTech, VisualEffect};
use crate::geom::{ThingId, chebyshev};
use crate::registry::building_spec;
use crate::things::ThingKind;

const TOWER_KINDS: [ThingKind; 3] = [
    ThingKind::GuardTower,
    ThingKind::Castle,
    ThingKind::TownCenter,
];

pub(crate) fn run(env: &mut Environment) {
    for kind in TOWER_KINDS {
        let spec = building_spec(kind)
            .and_then(|spec| spec.tower)
            .expect("tower kinds declare tower specs");
        for tower_id in env.things.bucket_snapshot(kind) {
            fire_tower(env, tower_id, spec.range, spec.damage);
        }
    }
}

fn fire_tower(env: &mut Environment, tower_id: ThingId, range: i32, base_damage: i32) {
    let Some(tower) = env.thing(tower_id) else {
        return;
    };
    if tower.team < 0 || !tower.is_alive() {
        return;
    }
    let pos = tower.pos;
    let team = tower.team;
    let garrison_count = tower
        .building_data()
        .map(|data| data.garrison.len())
        .unwrap_or(0);

    let tech = env
        .team(team)
        .map(|state| state.tech)
        .unwrap_or(TeamTech::empty());
    // Dead zone hugs the wall unless Murder Holes is researched.
    let min_r = if tech.contains(TeamTech::MURDER_HOLES) {
        1
    } else {
        SimConfig::TOWER_DEAD_ZONE + 1
    };
    let damage = base_damage + i32::from(tech.contains(TeamTech::FLETCHING));

    if let Some(target) = env
        .grid
        .nearest_enemy_in_range(&env.things, pos, team, min_r, range)
    {
        strike_unit(env, target, damage);
        if let Some(target_pos) = env.thing(target).map(|thing| thing.pos) {
            env.effects.push(VisualEffect {
                pos: target_pos,
                tint: 160,
                ttl: 1,
            });
        }
    }

    // Garrisoned units each add one bonus arrow, distributed round-robin
    // across everything in range; targets killed mid-volley are skipped.
    if garrison_count > 0 {
        let enemies: Vec<ThingId> = env
            .grid
            .collect_enemies_in_range(&env.things, pos, team, range)
            .into_iter()
            .filter(|id| {
                env.thing(*id)
                    .is_some_and(|thing| chebyshev(pos, thing.pos) >= min_r)
            })
            .collect();
        if !enemies.is_empty() {
            for arrow in 0..garrison_count {
                let target = enemies[arrow % enemies.len()];
                if env.thing(target).is_some_and(|thing| thing.is_alive()) {
                    strike_unit(env, target, 1);
                }
            }
        }
    }

    // Tumors and spawners in range are cleared outright.
    for hostile_kind in [ThingKind::Tumor, ThingKind::Spawner] {
        for hostile in env
            .grid
            .collect_kind_in_range(&env.things, pos, hostile_kind, range)
        {
            env.remove(hostile);
        }
    }
}

fn strike_unit(env: &mut Environment, target: ThingId, damage: i32) {
    let Some(kind) = env.thing(target).map(|thing| thing.kind) else {
        return;
    };
    match kind {
        ThingKind::Agent => {
            damage_agent(env, target, damage);
        }
        ThingKind::Wolf | ThingKind::Bear | ThingKind::Cow => damage_mob(env, target, damage),
        _ => {}
    }
}
