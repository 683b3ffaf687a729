//! The observation writer: a packed `[agent][layer][y][x]` u8 tensor per
//! agent, centered on the agent and clipped to the map.
//!
//! The scalar full rebuild below is the canonical semantics. Incremental
//! maintenance is permitted by the design but must reproduce these bytes
//! exactly; the kernel rebuilds at the end of every tick so the buffer the
//! host reads is always canonical.

use strum::EnumCount;

use crate::config::SimConfig;
use crate::env::Environment;
use crate::geom::Position;
use crate::items::ItemKind;
use crate::things::{Thing, ThingKind};

/// Tiles within this Chebyshev radius of a live agent are marked seen for
/// its team. Smaller than the observation radius, so fog actually bites.
pub const VISION_RADIUS: i32 = 3;

/// Categorical observation layers. Discriminant order is the wire layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::EnumIter, strum::EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ObsLayer {
    Terrain = 0,
    Biome,
    Elevation,
    /// Blocking agent presence: `team + 2`, 0 when absent.
    AgentTeam,
    AgentHp,
    AgentOrientation,
    /// Kind code of any blocking thing, `kind + 1`.
    BlockingKind,
    OverlayKind,
    OverlayTeam,
    /// Door presence: `team + 2`, 0 when absent.
    Door,
    InvFood,
    InvWood,
    InvStone,
    InvGold,
    InvWater,
    AltarHearts,
    Tint,
    Frozen,
    /// Broadcast fill: live population of the observing team.
    TeamPopulation,
    /// Broadcast fill: tech flag bits of the observing team.
    TeamTech,
}

/// Fixed layer count.
pub const OBS_LAYERS: usize = ObsLayer::COUNT;

/// Total observation buffer length in bytes.
pub fn buffer_len() -> usize {
    SimConfig::NUM_AGENTS * OBS_LAYERS * SimConfig::OBS_SIZE * SimConfig::OBS_SIZE
}

#[inline]
fn offset(agent_id: usize, layer: ObsLayer, wx: usize, wy: usize) -> usize {
    let window = SimConfig::OBS_SIZE * SimConfig::OBS_SIZE;
    agent_id * OBS_LAYERS * window + layer as usize * window + wy * SimConfig::OBS_SIZE + wx
}

/// Canonical end-of-tick rebuild: zero everything, update fog masks, and
/// rewrite every live agent's window.
pub(crate) fn rebuild_all(env: &mut Environment) {
    let mut buf = std::mem::take(&mut env.observations);
    if buf.len() != buffer_len() {
        buf = vec![0; buffer_len()];
    }
    buf.fill(0);

    if env.config.fog_of_view {
        update_seen_masks(env);
    }

    for agent_id in 0..SimConfig::NUM_AGENTS {
        let Some(thing) = env.agent(agent_id) else {
            continue;
        };
        if !thing.is_alive() || thing.pos.is_off_grid() {
            continue;
        }
        write_window(env, agent_id, thing.pos, thing.team, &mut buf);
    }

    env.observations = buf;
}

/// Marks every tile within vision of a live agent as seen by its team.
fn update_seen_masks(env: &mut Environment) {
    let width = env.grid.width();
    let mut marks: Vec<(usize, usize)> = Vec::new();
    for agent_id in 0..SimConfig::NUM_AGENTS {
        let Some(thing) = env.agent(agent_id) else {
            continue;
        };
        if !thing.is_alive() || thing.pos.is_off_grid() || thing.team < 0 {
            continue;
        }
        let team = thing.team as usize;
        for dy in -VISION_RADIUS..=VISION_RADIUS {
            for dx in -VISION_RADIUS..=VISION_RADIUS {
                let pos = Position::new(thing.pos.x + dx, thing.pos.y + dy);
                if env.grid.contains(pos) {
                    marks.push((team, (pos.y * width + pos.x) as usize));
                }
            }
        }
    }
    for (team, index) in marks {
        env.teams[team].seen[index] = true;
    }
}

fn write_window(env: &Environment, agent_id: usize, center: Position, team: i32, buf: &mut [u8]) {
    let r = SimConfig::OBS_RADIUS as i32;
    let width = env.grid.width();
    let team_state = env.team(team);
    let population = env.live_population(team).min(255) as u8;
    let tech_bits = team_state.map(|state| state.tech.bits()).unwrap_or(0);

    for wy in 0..SimConfig::OBS_SIZE {
        for wx in 0..SimConfig::OBS_SIZE {
            let pos = Position::new(center.x + wx as i32 - r, center.y + wy as i32 - r);
            if !env.grid.contains(pos) {
                continue; // out-of-map cells stay zero
            }
            if env.config.fog_of_view {
                let seen = team_state
                    .map(|state| state.seen[(pos.y * width + pos.x) as usize])
                    .unwrap_or(false);
                if !seen {
                    continue; // fogged cells stay zero
                }
            }

            let tile = env.grid.tile(pos).expect("bounds checked");
            buf[offset(agent_id, ObsLayer::Terrain, wx, wy)] = tile.terrain as u8 + 1;
            buf[offset(agent_id, ObsLayer::Biome, wx, wy)] = tile.biome as u8 + 1;
            buf[offset(agent_id, ObsLayer::Elevation, wx, wy)] =
                (tile.elevation as i32 + 8).clamp(0, 255) as u8;
            buf[offset(agent_id, ObsLayer::Tint, wx, wy)] = tile.tint;
            buf[offset(agent_id, ObsLayer::Frozen, wx, wy)] = u8::from(tile.is_frozen);
            if let Some(door) = tile.door {
                buf[offset(agent_id, ObsLayer::Door, wx, wy)] = (door.team + 2).clamp(0, 255) as u8;
            }

            if let Some(thing) = env.grid.get_blocking(pos).and_then(|id| env.thing(id)) {
                write_blocking(agent_id, thing, wx, wy, buf);
            }
            if let Some(overlay) = env.grid.get_overlay(pos).and_then(|id| env.thing(id)) {
                buf[offset(agent_id, ObsLayer::OverlayKind, wx, wy)] = overlay.kind as u8 + 1;
                buf[offset(agent_id, ObsLayer::OverlayTeam, wx, wy)] =
                    (overlay.team + 2).clamp(0, 255) as u8;
            }

            buf[offset(agent_id, ObsLayer::TeamPopulation, wx, wy)] = population;
            buf[offset(agent_id, ObsLayer::TeamTech, wx, wy)] = tech_bits;
        }
    }
}

fn write_blocking(agent_id: usize, thing: &Thing, wx: usize, wy: usize, buf: &mut [u8]) {
    buf[offset(agent_id, ObsLayer::BlockingKind, wx, wy)] = thing.kind as u8 + 1;
    if thing.kind == ThingKind::Agent {
        buf[offset(agent_id, ObsLayer::AgentTeam, wx, wy)] = (thing.team + 2).clamp(0, 255) as u8;
        buf[offset(agent_id, ObsLayer::AgentHp, wx, wy)] = thing.hp.clamp(0, 255) as u8;
        buf[offset(agent_id, ObsLayer::AgentOrientation, wx, wy)] = thing.orientation.index() + 1;
    }
    if let Some(hearts) = thing.hearts() {
        buf[offset(agent_id, ObsLayer::AltarHearts, wx, wy)] = hearts.min(255) as u8;
    }
    for (layer, item) in [
        (ObsLayer::InvFood, ItemKind::Food),
        (ObsLayer::InvWood, ItemKind::Wood),
        (ObsLayer::InvStone, ItemKind::Stone),
        (ObsLayer::InvGold, ItemKind::Gold),
        (ObsLayer::InvWater, ItemKind::Water),
    ] {
        let count = thing.inventory.count(item).min(255) as u8;
        if count > 0 {
            buf[offset(agent_id, layer, wx, wy)] = count;
        }
    }
}
