//! Herd and pack AI for cows, wolves, and bears.
//!
//! Once per tick the kernel aggregates per-herd centroids and picks a
//! drift target: a random map corner for cow herds, the nearest prey for
//! predator packs. Individuals step toward the drift target when they have
//! strayed from the centroid, and otherwise wander with small probability.

use std::collections::BTreeMap;

use crate::actions::attack::damage_agent;
use crate::env::Environment;
use crate::geom::{DIRECTIONS, Position, ThingId, chebyshev};
use crate::registry::UnitClass;
use crate::rng::TickRng;
use crate::things::{ThingKind, ThingPayload};

/// Chebyshev distance from the centroid beyond which an individual drifts.
const COHESION_RADIUS: i32 = 2;
/// Wander probability for individuals resting near the centroid.
const WANDER_CHANCE: f32 = 0.25;
/// Predator melee damage per tick.
const PREDATOR_DAMAGE: i32 = 2;

const MOB_KINDS: [ThingKind; 3] = [ThingKind::Cow, ThingKind::Wolf, ThingKind::Bear];

pub(crate) fn run(env: &mut Environment, rng: &mut TickRng) {
    // Centroid pass. BTreeMap keys give a deterministic herd order for the
    // RNG draws that follow.
    let mut herds: BTreeMap<(u8, u8), (i64, i64, i64)> = BTreeMap::new();
    for kind in MOB_KINDS {
        for id in env.things.bucket(kind) {
            let Some(mob) = env.things.get(*id) else {
                continue;
            };
            let ThingPayload::Mob { herd_id } = mob.payload else {
                continue;
            };
            let entry = herds.entry((kind as u8, herd_id)).or_insert((0, 0, 0));
            entry.0 += mob.pos.x as i64;
            entry.1 += mob.pos.y as i64;
            entry.2 += 1;
        }
    }

    let mut centroids: BTreeMap<(u8, u8), Position> = BTreeMap::new();
    let mut drifts: BTreeMap<(u8, u8), Position> = BTreeMap::new();
    for (key, (sx, sy, n)) in &herds {
        let centroid = Position::new((sx / n) as i32, (sy / n) as i32);
        centroids.insert(*key, centroid);
        let drift = if key.0 == ThingKind::Cow as u8 {
            random_corner(env, rng)
        } else {
            nearest_prey(env, centroid).unwrap_or(centroid)
        };
        drifts.insert(*key, drift);
    }

    // Stepping pass.
    for kind in MOB_KINDS {
        for id in env.things.bucket_snapshot(kind) {
            let Some(mob) = env.thing(id) else {
                continue;
            };
            let ThingPayload::Mob { herd_id } = mob.payload else {
                continue;
            };
            let key = (kind as u8, herd_id);
            let pos = mob.pos;
            let (Some(centroid), Some(drift)) = (centroids.get(&key), drifts.get(&key)) else {
                continue;
            };

            if chebyshev(pos, *centroid) > COHESION_RADIUS {
                step_towards(env, id, pos, *drift);
            } else if rng.chance(WANDER_CHANCE) {
                let dir = DIRECTIONS[rng.jitter(DIRECTIONS.len())];
                let to = pos.step(dir);
                if env.grid.is_empty(to, UnitClass::Villager) {
                    env.move_thing(id, to);
                }
            }
        }
    }
}

fn random_corner(env: &Environment, rng: &mut TickRng) -> Position {
    let (w, h) = (env.grid.width(), env.grid.height());
    let corners = [
        Position::new(1, 1),
        Position::new(w - 2, 1),
        Position::new(1, h - 2),
        Position::new(w - 2, h - 2),
    ];
    corners[rng.jitter(corners.len())]
}

/// Nearest live agent or cow to the pack centroid.
fn nearest_prey(env: &Environment, centroid: Position) -> Option<Position> {
    let radius = env.grid.width().max(env.grid.height());
    env.grid
        .collect_in_range(&env.things, centroid, radius, |thing| {
            matches!(thing.kind, ThingKind::Agent | ThingKind::Cow) && thing.is_alive()
        })
        .into_iter()
        .next()
        .and_then(|id| env.thing(id))
        .map(|thing| thing.pos)
}

/// One tile toward `target`, sliding along an axis when the diagonal is
/// blocked.
fn step_towards(env: &mut Environment, id: ThingId, pos: Position, target: Position) {
    let dx = (target.x - pos.x).signum();
    let dy = (target.y - pos.y).signum();
    let options = [
        Position::new(pos.x + dx, pos.y + dy),
        Position::new(pos.x + dx, pos.y),
        Position::new(pos.x, pos.y + dy),
    ];
    for to in options {
        if to != pos && env.grid.is_empty(to, UnitClass::Villager) {
            env.move_thing(id, to);
            return;
        }
    }
}

/// Wolves and bears bite one adjacent agent or tumor per tick.
pub(crate) fn predator_melee(env: &mut Environment, _rng: &mut TickRng) {
    for kind in [ThingKind::Wolf, ThingKind::Bear] {
        for id in env.things.bucket_snapshot(kind) {
            let Some(predator) = env.thing(id) else {
                continue;
            };
            let pos = predator.pos;
            for dir in DIRECTIONS {
                let Some(target_id) = env.grid.get_blocking(pos.step(dir)) else {
                    continue;
                };
                let Some((target_kind, target_alive)) = env
                    .thing(target_id)
                    .map(|target| (target.kind, target.is_alive()))
                else {
                    continue;
                };
                match target_kind {
                    ThingKind::Agent if target_alive => {
                        damage_agent(env, target_id, PREDATOR_DAMAGE);
                        break;
                    }
                    ThingKind::Tumor => {
                        let dead = {
                            let tumor = env.thing_mut(target_id).expect("checked above");
                            tumor.hp -= PREDATOR_DAMAGE;
                            tumor.hp <= 0
                        };
                        if dead {
                            env.remove(target_id);
                        }
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::env::EmptyMap;
    use crate::things::Thing;

    fn env() -> Environment {
        Environment::new(SimConfig::default(), Box::new(EmptyMap::new(24, 24))).unwrap()
    }

    fn idle_step(env: &mut Environment) {
        let actions = vec![0u8; SimConfig::NUM_AGENTS];
        env.step(&actions).unwrap();
    }

    #[test]
    fn stray_cow_moves_back_into_the_world() {
        let mut env = env();
        // Two cows far apart: both are away from the shared centroid and
        // must take a step.
        let a = env
            .add(Thing::mob(ThingKind::Cow, Position::new(2, 2), 0))
            .unwrap();
        let b = env
            .add(Thing::mob(ThingKind::Cow, Position::new(20, 20), 0))
            .unwrap();
        idle_step(&mut env);
        let moved = env.thing(a).unwrap().pos != Position::new(2, 2)
            || env.thing(b).unwrap().pos != Position::new(20, 20);
        assert!(moved);
    }

    /// Rings `center` with trees so a mob there cannot wander off.
    fn trap(env: &mut Environment, center: Position, open: Position) {
        for dir in DIRECTIONS {
            let pos = center.step(dir);
            if pos != open && env.grid.get_blocking(pos).is_none() {
                env.add(Thing::new(ThingKind::Stone, pos)).unwrap();
            }
        }
    }

    #[test]
    fn wolf_bites_adjacent_agent() {
        let mut env = env();
        let den = Position::new(10, 10);
        let prey = Position::new(10, 11);
        env.add(Thing::mob(ThingKind::Wolf, den, 0)).unwrap();
        let victim = env
            .add(Thing::agent(0, UnitClass::Villager, prey, 0))
            .unwrap();
        trap(&mut env, den, prey);
        let hp = env.thing(victim).unwrap().hp;
        idle_step(&mut env);
        assert!(env.thing(victim).unwrap().hp < hp);
    }

    #[test]
    fn predators_gnaw_tumors_down() {
        let mut config = SimConfig::default();
        // Isolate the bite from the tumor's own lethal-adjacency roll.
        config.tumor_adjacency_death_chance = 0.0;
        let mut env = Environment::new(config, Box::new(EmptyMap::new(24, 24))).unwrap();
        let den = Position::new(10, 10);
        let growth = Position::new(10, 11);
        env.add(Thing::mob(ThingKind::Bear, den, 0)).unwrap();
        let tumor = env.add(Thing::tumor(growth, None)).unwrap();
        trap(&mut env, den, growth);
        idle_step(&mut env);
        idle_step(&mut env);
        // Two bites of 2 against 4 HP.
        assert!(env.thing(tumor).is_none());
    }
}
