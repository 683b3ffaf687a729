//! The per-tick pipeline.
//!
//! Phase order is a hard contract; policies and replays depend on it:
//!
//! 1. visual-effect decay → shield countdown → queued deaths
//! 2. agent actions in ascending `agent_id` order
//! 3. tower attacks → building cooldowns → herd centroids → mob step →
//!    predator melee → tumor spawning
//! 4. tumor branching → tumor lethal adjacency → auras → final death
//!    sweep → temple reproduction → respawns
//! 5. survival penalty → tint heatmap → observation rebuild
//! 6. episode termination check

mod lifecycle;
mod mobs;
mod towers;
mod tumors;

use crate::actions;
use crate::config::SimConfig;
use crate::env::Environment;
use crate::geom::DIRECTIONS;
use crate::obs;
use crate::registry::UnitClass;
use crate::reward;
use crate::rng::{StreamDomain, TickRng, compute_seed};
use crate::things::ThingKind;

pub(crate) fn run_tick(env: &mut Environment, actions: &[u8]) {
    if env.episode_done {
        return;
    }
    let mut rng = TickRng::new(compute_seed(
        env.seed,
        env.current_step as u64,
        StreamDomain::Tick,
    ));
    tracing::trace!(step = env.current_step, "tick start");

    // Phase 1: decay and bookkeeping from the previous tick.
    decay_effects(env);
    tick_shields_and_frost(env);
    lifecycle::enforce_zero_hp_deaths(env);

    // Phase 2: the action executor.
    actions::run_agent_actions(env, actions);

    // Phase 3: building combat and the wild world.
    towers::run(env);
    tick_cooldowns(env);
    mobs::run(env, &mut rng);
    mobs::predator_melee(env, &mut rng);
    tumors::spawn_from_spawners(env, &mut rng);

    // Phase 4: growth, auras, and population flow.
    tumors::branch(env, &mut rng);
    tumors::lethal_adjacency(env, &mut rng);
    run_auras(env);
    lifecycle::enforce_zero_hp_deaths(env);
    lifecycle::temple_reproduction(env);
    lifecycle::respawns(env);

    // Phase 5: per-tick rewards and the canonical observation rebuild.
    apply_survival_penalty(env);
    apply_tints(env);
    obs::rebuild_all(env);

    // Phase 6: episode bookkeeping.
    env.current_step += 1;
    check_episode_end(env);
}

fn decay_effects(env: &mut Environment) {
    for effect in &mut env.effects {
        effect.ttl = effect.ttl.saturating_sub(1);
    }
    env.effects.retain(|effect| effect.ttl > 0);
}

/// Shield bands and frozen counters wind down at tick start.
fn tick_shields_and_frost(env: &mut Environment) {
    for id in env.things.bucket_snapshot(ThingKind::Agent) {
        if let Some(thing) = env.thing_mut(id) {
            if let Some(data) = thing.agent_data_mut() {
                data.shield_countdown = data.shield_countdown.saturating_sub(1);
            }
        }
    }
    let ids: Vec<_> = env.things.iter().map(|thing| thing.id).collect();
    for id in ids {
        if let Some(thing) = env.thing_mut(id) {
            thing.frozen = thing.frozen.saturating_sub(1);
        }
    }
}

fn tick_cooldowns(env: &mut Environment) {
    let ids: Vec<_> = env.things.iter().map(|thing| thing.id).collect();
    for id in ids {
        if let Some(thing) = env.thing_mut(id) {
            thing.cooldown = thing.cooldown.saturating_sub(1);
        }
    }
}

/// Tank and monk auras: tanks refresh a one-tick shield band on adjacent
/// allies, monks mend them.
fn run_auras(env: &mut Environment) {
    for id in env.things.bucket_snapshot(ThingKind::Agent) {
        let Some(thing) = env.thing(id) else {
            continue;
        };
        if !thing.is_alive() || thing.pos.is_off_grid() {
            continue;
        }
        let class = thing.unit_class();
        if !matches!(class, UnitClass::Tank | UnitClass::Monk) {
            continue;
        }
        let pos = thing.pos;
        let team = thing.team;
        for dir in DIRECTIONS {
            let Some(other_id) = env.grid.get_blocking(pos.step(dir)) else {
                continue;
            };
            if other_id == id {
                continue;
            }
            let Some(other) = env.thing_mut(other_id) else {
                continue;
            };
            if other.kind != ThingKind::Agent || other.team != team || !other.is_alive() {
                continue;
            }
            match class {
                UnitClass::Tank => {
                    if let Some(data) = other.agent_data_mut() {
                        data.shield_countdown = data.shield_countdown.max(1);
                    }
                }
                UnitClass::Monk => {
                    other.hp = (other.hp + 1).min(other.max_hp);
                }
                _ => unreachable!(),
            }
        }
    }
}

fn apply_survival_penalty(env: &mut Environment) {
    let penalty = env.config.rewards.survival_penalty;
    for agent_id in 0..SimConfig::NUM_AGENTS {
        if env.terminated[agent_id] == 0 && env.truncated[agent_id] == 0 {
            env.rewards[agent_id] += penalty;
        }
    }
}

/// Tile tints decay, then live effects restamp their cells.
fn apply_tints(env: &mut Environment) {
    let (width, height) = (env.grid.width(), env.grid.height());
    for y in 0..height {
        for x in 0..width {
            if let Some(tile) = env.grid.tile_mut(crate::geom::Position::new(x, y)) {
                tile.tint = tile.tint.saturating_sub(TINT_DECAY);
            }
        }
    }
    let effects = env.effects.clone();
    for effect in effects {
        if let Some(tile) = env.grid.tile_mut(effect.pos) {
            tile.tint = tile.tint.max(effect.tint);
        }
    }
}

const TINT_DECAY: u8 = 32;

fn check_episode_end(env: &mut Environment) {
    if env.current_step >= env.config.max_steps && !env.territory_scored {
        for agent_id in 0..SimConfig::NUM_AGENTS {
            if env.terminated[agent_id] == 0 {
                env.truncated[agent_id] = 1;
            }
        }
        reward::score_territory(env);
        env.territory_scored = true;
    }
    env.episode_done = (0..SimConfig::NUM_AGENTS)
        .all(|agent_id| env.terminated[agent_id] != 0 || env.truncated[agent_id] != 0);
}
