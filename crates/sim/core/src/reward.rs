//! End-of-episode territory scoring.
//!
//! At truncation the map is flood-filled simultaneously from every team's
//! altars and buildings; each passable tile goes to the team that reaches
//! it first (ties to the lower team id). The per-team score, tiles owned
//! weighted by live unit count, is paid out to that team's surviving
//! agents.

use std::collections::VecDeque;

use crate::config::SimConfig;
use crate::env::Environment;
use crate::geom::{CARDINALS, Position};
use crate::registry::{UnitClass, building_spec};

/// Reward per (tile × live unit) point, split across the team.
const TERRITORY_REWARD_SCALE: f32 = 0.0005;

pub(crate) fn score_territory(env: &mut Environment) {
    let width = env.grid.width();
    let height = env.grid.height();
    let area = (width * height) as usize;

    // claims[tile] = (distance, team); lower distance wins, team id breaks
    // ties because seeds enqueue in team order.
    let mut claims: Vec<Option<(u32, i32)>> = vec![None; area];
    let mut queue: VecDeque<(Position, u32, i32)> = VecDeque::new();

    for team in 0..SimConfig::NUM_TEAMS as i32 {
        for thing in env.things.iter() {
            if thing.team != team || !thing.is_alive() {
                continue;
            }
            if building_spec(thing.kind).is_none() {
                continue;
            }
            let index = (thing.pos.y * width + thing.pos.x) as usize;
            if claims[index].is_none() {
                claims[index] = Some((0, team));
                queue.push_back((thing.pos, 0, team));
            }
        }
    }

    while let Some((pos, dist, team)) = queue.pop_front() {
        for dir in CARDINALS {
            let next = pos.step(dir);
            if !env.grid.contains(next) {
                continue;
            }
            if !env
                .grid
                .terrain(next)
                .is_some_and(|terrain| terrain.is_passable(UnitClass::Villager))
            {
                continue;
            }
            let index = (next.y * width + next.x) as usize;
            if claims[index].is_some() {
                continue;
            }
            claims[index] = Some((dist + 1, team));
            queue.push_back((next, dist + 1, team));
        }
    }

    let mut tiles = [0u32; SimConfig::NUM_TEAMS];
    for claim in claims.into_iter().flatten() {
        tiles[claim.1 as usize] += 1;
    }

    for team in 0..SimConfig::NUM_TEAMS {
        let live = env.live_population(team as i32) as u32;
        if live == 0 {
            continue;
        }
        let score = tiles[team] * live;
        let payout = score as f32 * TERRITORY_REWARD_SCALE;
        let base = team * SimConfig::AGENTS_PER_TEAM;
        for agent_id in base..base + SimConfig::AGENTS_PER_TEAM {
            if env.terminated[agent_id] == 0 {
                env.rewards[agent_id] += payout;
            }
        }
        tracing::debug!(team, tiles = tiles[team], live, "territory scored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::env::EmptyMap;
    use crate::things::{Thing, ThingKind};

    #[test]
    fn territory_pays_the_surviving_team_at_truncation() {
        let config = SimConfig::with_max_steps(1);
        let mut env = Environment::new(config, Box::new(EmptyMap::new(16, 16))).unwrap();
        env.add(Thing::building(ThingKind::TownCenter, Position::new(8, 8), 0))
            .unwrap();
        env.add(Thing::agent(0, UnitClass::Villager, Position::new(5, 5), 0))
            .unwrap();
        let actions = vec![0u8; SimConfig::NUM_AGENTS];
        env.step(&actions).unwrap();
        assert_eq!(env.truncated()[0], 1);
        // The lone town center claims the whole reachable map.
        let survival = env.config().rewards.survival_penalty;
        assert!(env.rewards()[0] > survival);
    }

    #[test]
    fn contested_map_splits_between_teams() {
        let config = SimConfig::with_max_steps(1);
        let mut env = Environment::new(config, Box::new(EmptyMap::new(16, 16))).unwrap();
        env.add(Thing::altar(Position::new(2, 8), 0, 1)).unwrap();
        env.add(Thing::altar(Position::new(13, 8), 1, 1)).unwrap();
        env.add(Thing::agent(0, UnitClass::Villager, Position::new(3, 8), 0))
            .unwrap();
        env.add(Thing::agent(
            SimConfig::AGENTS_PER_TEAM,
            UnitClass::Villager,
            Position::new(12, 8),
            1,
        ))
        .unwrap();
        let actions = vec![0u8; SimConfig::NUM_AGENTS];
        env.step(&actions).unwrap();
        let a = env.rewards()[0];
        let b = env.rewards()[SimConfig::AGENTS_PER_TEAM];
        assert!(a > 0.0 && b > 0.0);
        // Symmetric seeds claim comparable shares.
        assert!((a - b).abs() / a.max(b) < 0.35);
    }
}
