//! Tumor dynamics: spawner emission, branching, and lethal adjacency.

use crate::config::SimConfig;
use crate::env::Environment;
use crate::geom::{CARDINALS, DIRECTIONS, Position, ThingId, chebyshev};
use crate::registry::UnitClass;
use crate::rng::TickRng;
use crate::things::{Thing, ThingKind, ThingPayload};

/// Radius a spawner scans when counting its uncommitted tumors.
const SPAWNER_SCAN_RADIUS: i32 = 6;

/// Spawners with a cold cooldown emit a tumor onto their first free
/// neighbour while fewer than the cap of their tumors remain uncommitted.
pub(crate) fn spawn_from_spawners(env: &mut Environment, _rng: &mut TickRng) {
    for spawner_id in env.things.bucket_snapshot(ThingKind::Spawner) {
        let Some(spawner) = env.thing(spawner_id) else {
            continue;
        };
        if spawner.cooldown > 0 {
            continue;
        }
        let pos = spawner.pos;

        let uncommitted = env
            .grid
            .collect_kind_in_range(&env.things, pos, ThingKind::Tumor, SPAWNER_SCAN_RADIUS)
            .into_iter()
            .filter(|id| {
                env.thing(*id).is_some_and(|tumor| {
                    matches!(
                        tumor.payload,
                        ThingPayload::Tumor {
                            has_claimed_territory: false,
                            ..
                        }
                    )
                })
            })
            .count();
        if uncommitted >= SimConfig::SPAWNER_TUMOR_CAP {
            continue;
        }

        let Some(site) = DIRECTIONS
            .iter()
            .map(|dir| pos.step(*dir))
            .find(|site| env.grid.is_empty(*site, UnitClass::Villager))
        else {
            continue;
        };
        if env.add(Thing::tumor(site, Some(spawner_id))).is_ok() {
            let rate = env.config.tumor_spawn_rate.max(0.01);
            let cooldown = (SimConfig::SPAWNER_BASE_COOLDOWN as f32 / rate) as u16;
            if let Some(spawner) = env.thing_mut(spawner_id) {
                spawner.cooldown = cooldown.max(1);
            }
        }
    }
}

/// Mobile tumors of sufficient age branch with configured probability.
/// Branching plants the parent: it claims its territory and goes inert.
pub(crate) fn branch(env: &mut Environment, rng: &mut TickRng) {
    let branch_chance = env.config.tumor_branch_chance;
    for tumor_id in env.things.bucket_snapshot(ThingKind::Tumor) {
        let Some(tumor) = env.thing_mut(tumor_id) else {
            continue;
        };
        let ThingPayload::Tumor {
            home_spawner,
            has_claimed_territory,
            turns_alive,
        } = &mut tumor.payload
        else {
            continue;
        };
        *turns_alive += 1;
        let planted = *has_claimed_territory;
        let age = *turns_alive;
        let home = *home_spawner;
        let pos = tumor.pos;

        if planted || age < SimConfig::TUMOR_MIN_BRANCH_AGE {
            continue;
        }
        if !rng.chance(branch_chance) {
            continue;
        }

        let candidates: Vec<Position> = DIRECTIONS
            .iter()
            .map(|dir| pos.step(*dir))
            .filter(|site| env.grid.is_empty(*site, UnitClass::Villager))
            .filter(|site| no_other_tumor_touches(env, *site, tumor_id))
            .collect();
        if candidates.is_empty() {
            continue;
        }
        let site = candidates[rng.jitter(candidates.len())];

        let towards = crate::geom::Direction::towards(pos, site);
        let mut child = Thing::tumor(site, home);
        child.orientation = towards;
        if env.add(child).is_ok() {
            if let Some(parent) = env.thing_mut(tumor_id) {
                parent.orientation = towards;
                if let ThingPayload::Tumor {
                    has_claimed_territory,
                    ..
                } = &mut parent.payload
                {
                    *has_claimed_territory = true;
                }
            }
        }
    }
}

fn no_other_tumor_touches(env: &Environment, site: Position, parent: ThingId) -> bool {
    env.things
        .bucket(ThingKind::Tumor)
        .iter()
        .filter(|id| **id != parent)
        .filter_map(|id| env.thing(*id))
        .all(|tumor| chebyshev(tumor.pos, site) > 1)
}

/// Cardinal neighbours of a tumor die with configured probability; each
/// lethal interaction consumes the tumor. A live shield band exempts an
/// agent.
pub(crate) fn lethal_adjacency(env: &mut Environment, rng: &mut TickRng) {
    let chance = env.config.tumor_adjacency_death_chance;
    for tumor_id in env.things.bucket_snapshot(ThingKind::Tumor) {
        let Some(tumor) = env.thing(tumor_id) else {
            continue;
        };
        let pos = tumor.pos;
        for dir in CARDINALS {
            let Some(victim_id) = env.grid.get_blocking(pos.step(dir)) else {
                continue;
            };
            let Some(victim) = env.thing(victim_id) else {
                continue;
            };
            match victim.kind {
                ThingKind::Agent if victim.is_alive() => {
                    let shielded = victim
                        .agent_data()
                        .is_some_and(|data| data.shield_countdown > 0);
                    if shielded || !rng.chance(chance) {
                        continue;
                    }
                    env.kill_agent(victim_id);
                    env.remove(tumor_id);
                }
                ThingKind::Wolf | ThingKind::Bear => {
                    if !rng.chance(chance) {
                        continue;
                    }
                    let mob_pos = victim.pos;
                    if let Some(mut dead) = env.remove(victim_id) {
                        dead.inventory.add(crate::items::ItemKind::Meat, 2);
                        if env.grid.get_overlay(mob_pos).is_none() {
                            let mut corpse = Thing::new(ThingKind::Corpse, mob_pos);
                            corpse.inventory = dead.inventory;
                            let _ = env.add(corpse);
                        }
                    }
                    env.remove(tumor_id);
                }
                _ => continue,
            }
            // Consumed; stop scanning this tumor's neighbours.
            break;
        }
    }
}
