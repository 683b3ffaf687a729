//! Death finalization, altar respawn, and temple reproduction.

use crate::config::SimConfig;
use crate::env::{Environment, TempleBirth};
use crate::geom::{DIRECTIONS, Position, ThingId};
use crate::registry::UnitClass;
use crate::things::{ThingKind, ThingPayload};

/// Re-scans HP and finalizes every death the tick produced: agents move to
/// their terminated slot, everything else leaves the world.
pub(crate) fn enforce_zero_hp_deaths(env: &mut Environment) {
    for id in env.things.bucket_snapshot(ThingKind::Agent) {
        let dead_on_grid = env
            .thing(id)
            .is_some_and(|thing| thing.hp <= 0 && !thing.pos.is_off_grid());
        if dead_on_grid {
            env.kill_agent(id);
        }
    }
    let corpses: Vec<ThingId> = env
        .things
        .iter()
        .filter(|thing| thing.kind != ThingKind::Agent && thing.hp <= 0)
        .map(|thing| thing.id)
        .collect();
    for id in corpses {
        env.remove(id);
    }
}

/// Dead agents return beside their home altar when the team is under its
/// pop cap, the altar can pay, and a free adjacent tile exists.
pub(crate) fn respawns(env: &mut Environment) {
    for agent_id in 0..SimConfig::NUM_AGENTS {
        if env.terminated[agent_id] == 0 {
            continue;
        }
        let Some(id) = env.agent_thing_id(agent_id) else {
            continue;
        };
        let Some(thing) = env.thing(id) else {
            continue;
        };
        let Some(data) = thing.agent_data() else {
            continue;
        };
        if data.is_garrisoned {
            continue;
        }
        let team = thing.team;
        let Some(altar_id) = data.home_altar else {
            continue;
        };

        let altar_ready = env.thing(altar_id).is_some_and(|altar| {
            altar.kind == ThingKind::Altar
                && altar.team == team
                && altar.hearts().unwrap_or(0) >= SimConfig::ALTAR_RESPAWN_COST
        });
        if !altar_ready {
            continue;
        }
        if env.live_population(team) >= env.population_cap(team) {
            continue;
        }
        let altar_pos = env.thing(altar_id).map(|altar| altar.pos).unwrap_or_default();
        let Some(site) = DIRECTIONS
            .iter()
            .map(|dir| altar_pos.step(*dir))
            .find(|site| env.grid.is_empty(*site, UnitClass::Villager))
        else {
            continue;
        };

        revive_agent(env, id, agent_id, site);
        if let Some(altar) = env.thing_mut(altar_id) {
            if let ThingPayload::Altar { hearts } = &mut altar.payload {
                *hearts -= SimConfig::ALTAR_RESPAWN_COST;
            }
        }
        tracing::debug!(agent_id, step = env.current_step, "agent respawned");
    }
}

/// Back to life as a fresh villager: full HP, empty bag, cleared flags.
fn revive_agent(env: &mut Environment, id: ThingId, agent_id: usize, site: Position) {
    let stats = UnitClass::Villager.stats();
    {
        let Some(thing) = env.thing_mut(id) else {
            return;
        };
        thing.pos = site;
        thing.hp = stats.max_hp;
        thing.max_hp = stats.max_hp;
        thing.cooldown = 0;
        thing.frozen = 0;
        thing.inventory = crate::items::Inventory::new();
        if let Some(data) = thing.agent_data_mut() {
            data.unit_class = UnitClass::Villager;
            data.attack_damage = stats.attack_damage;
            data.shield_countdown = 0;
            data.is_garrisoned = false;
        }
    }
    env.grid.place_blocking(site, id);
    env.terminated[agent_id] = 0;
    env.stats[agent_id].respawns += 1;
}

/// Two adjacent friendly non-Goblin agents beside a ready temple produce a
/// child villager in a dormant slot, funded by the nearest altar heart.
pub(crate) fn temple_reproduction(env: &mut Environment) {
    for temple_id in env.things.bucket_snapshot(ThingKind::Temple) {
        let Some(temple) = env.thing(temple_id) else {
            continue;
        };
        if temple.cooldown > 0 || temple.team < 0 || !temple.is_alive() {
            continue;
        }
        let team = temple.team;
        let pos = temple.pos;

        let parents: Vec<ThingId> = DIRECTIONS
            .iter()
            .filter_map(|dir| env.grid.get_blocking(pos.step(*dir)))
            .filter(|id| {
                env.thing(*id).is_some_and(|thing| {
                    thing.kind == ThingKind::Agent
                        && thing.team == team
                        && thing.is_alive()
                        && thing.unit_class() != UnitClass::Goblin
                })
            })
            .collect();
        if parents.len() < 2 {
            continue;
        }

        let Some(site) = DIRECTIONS
            .iter()
            .map(|dir| pos.step(*dir))
            .find(|site| env.grid.is_empty(*site, UnitClass::Villager))
        else {
            continue;
        };

        let Some(altar_id) = crate::actions::attack::nearest_team_altar(env, pos, team) else {
            continue;
        };
        let funded = env
            .thing(altar_id)
            .is_some_and(|altar| altar.hearts().unwrap_or(0) >= SimConfig::ALTAR_RESPAWN_COST);
        if !funded {
            continue;
        }

        let Some(child) = env.spawn_unit(team, UnitClass::Villager, site) else {
            continue;
        };
        if let Some(altar) = env.thing_mut(altar_id) {
            if let ThingPayload::Altar { hearts } = &mut altar.payload {
                *hearts -= SimConfig::ALTAR_RESPAWN_COST;
            }
        }
        if let Some(temple) = env.thing_mut(temple_id) {
            temple.cooldown = SimConfig::TEMPLE_COOLDOWN;
        }
        env.temple_births.push(TempleBirth {
            parents: (parents[0], parents[1]),
            child,
        });
    }
}
