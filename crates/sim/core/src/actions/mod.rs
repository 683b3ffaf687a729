//! Action executor: decodes one byte per agent and mutates the world
//! through a fixed set of primitives.
//!
//! Agents are processed in ascending `agent_id` order; that order *is* the
//! conflict-resolution rule: later agents see earlier agents' effects.
//! Every precondition inside a verb is a predicate: failure increments the
//! agent's `action_invalid` counter and changes nothing else (except the
//! orientation updates §4.3 states for Attack).

pub(crate) mod attack;
mod build;
mod interact;
mod movement;
mod plant;
mod transfer;

pub(crate) use interact::harvest_node;

use crate::config::SimConfig;
use crate::env::Environment;
use crate::geom::Direction;

/// The ten verbs, in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::EnumIter, strum::EnumCount)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ActionVerb {
    Noop = 0,
    Move = 1,
    Attack = 2,
    Use = 3,
    Swap = 4,
    Put = 5,
    PlantLantern = 6,
    PlantResource = 7,
    Build = 8,
    Orient = 9,
}

impl ActionVerb {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Noop),
            1 => Some(Self::Move),
            2 => Some(Self::Attack),
            3 => Some(Self::Use),
            4 => Some(Self::Swap),
            5 => Some(Self::Put),
            6 => Some(Self::PlantLantern),
            7 => Some(Self::PlantResource),
            8 => Some(Self::Build),
            9 => Some(Self::Orient),
            _ => None,
        }
    }
}

/// Splits an action byte into `(verb, arg)`. Bytes ≥ 100 have no verb and
/// count as invalid.
pub fn decode_action(byte: u8) -> Option<(ActionVerb, u8)> {
    let verb = ActionVerb::from_index(byte / SimConfig::ARGC)?;
    Some((verb, byte % SimConfig::ARGC))
}

/// Per-agent action counters, exposed read-only to the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentStats {
    pub action_invalid: u32,
    pub noop: u32,
    pub moves: u32,
    pub attacks: u32,
    pub uses: u32,
    pub swaps: u32,
    pub puts: u32,
    pub lanterns_planted: u32,
    pub resources_planted: u32,
    pub builds: u32,
    pub orients: u32,
    pub kills: u32,
    pub deaths: u32,
    pub respawns: u32,
    pub conversions: u32,
}

impl AgentStats {
    fn count_success(&mut self, verb: ActionVerb) {
        match verb {
            ActionVerb::Noop => self.noop += 1,
            ActionVerb::Move => self.moves += 1,
            ActionVerb::Attack => self.attacks += 1,
            ActionVerb::Use => self.uses += 1,
            ActionVerb::Swap => self.swaps += 1,
            ActionVerb::Put => self.puts += 1,
            ActionVerb::PlantLantern => self.lanterns_planted += 1,
            ActionVerb::PlantResource => self.resources_planted += 1,
            ActionVerb::Build => self.builds += 1,
            ActionVerb::Orient => self.orients += 1,
        }
    }
}

/// Runs every agent's action for this tick, in ascending `agent_id` order.
pub(crate) fn run_agent_actions(env: &mut Environment, actions: &[u8]) {
    for agent_id in 0..SimConfig::NUM_AGENTS {
        if env.terminated[agent_id] != 0 || env.truncated[agent_id] != 0 {
            continue;
        }
        let Some(id) = env.agent_thing_id(agent_id) else {
            continue;
        };
        let Some(thing) = env.thing(id) else {
            continue;
        };
        if !thing.is_alive() || thing.pos.is_off_grid() {
            continue;
        }
        // Frozen and garrisoned agents sit the tick out without penalty.
        if thing.frozen > 0
            || thing
                .agent_data()
                .is_some_and(|data| data.is_garrisoned)
        {
            continue;
        }

        let Some((verb, arg)) = decode_action(actions[agent_id]) else {
            env.stats[agent_id].action_invalid += 1;
            continue;
        };

        let ok = match verb {
            ActionVerb::Noop => true,
            ActionVerb::Move => dir_arg(arg)
                .is_some_and(|dir| movement::execute_move(env, id, agent_id, dir)),
            ActionVerb::Attack => dir_arg(arg)
                .is_some_and(|dir| attack::execute_attack(env, id, agent_id, dir)),
            ActionVerb::Use => dir_arg(arg)
                .is_some_and(|dir| interact::execute_use(env, id, agent_id, dir)),
            ActionVerb::Swap => {
                dir_arg(arg).is_some_and(|dir| transfer::execute_swap(env, id, dir))
            }
            ActionVerb::Put => dir_arg(arg).is_some_and(|dir| transfer::execute_put(env, id, dir)),
            ActionVerb::PlantLantern => {
                dir_arg(arg).is_some_and(|dir| plant::execute_plant_lantern(env, id, dir))
            }
            ActionVerb::PlantResource => plant::execute_plant_resource(env, id, arg),
            ActionVerb::Build => build::execute_build(env, id, arg),
            ActionVerb::Orient => dir_arg(arg).is_some_and(|dir| {
                if let Some(thing) = env.thing_mut(id) {
                    thing.orientation = dir;
                    true
                } else {
                    false
                }
            }),
        };

        if ok {
            env.stats[agent_id].count_success(verb);
        } else {
            env.stats[agent_id].action_invalid += 1;
        }
    }
}

#[inline]
fn dir_arg(arg: u8) -> Option<Direction> {
    Direction::from_index(arg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_splits_verb_and_arg() {
        assert_eq!(decode_action(0), Some((ActionVerb::Noop, 0)));
        assert_eq!(decode_action(13), Some((ActionVerb::Move, 3)));
        assert_eq!(decode_action(99), Some((ActionVerb::Orient, 9)));
        assert_eq!(decode_action(100), None);
        assert_eq!(decode_action(255), None);
    }

    #[test]
    fn use_east_and_south_encode_as_in_the_wire_docs() {
        // Use = verb 3; E = 3, S = 1.
        assert_eq!(decode_action(33), Some((ActionVerb::Use, 3)));
        assert_eq!(decode_action(31), Some((ActionVerb::Use, 1)));
    }
}
