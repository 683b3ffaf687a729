//! The Swap and Put verbs: cooperative position and item exchange.

use crate::env::Environment;
use crate::geom::{Direction, ThingId};
use crate::items::ItemKind;
use crate::things::ThingKind;

/// Exchanges positions with an adjacent friendly non-frozen agent.
pub(crate) fn execute_swap(env: &mut Environment, id: ThingId, dir: Direction) -> bool {
    let Some(agent) = env.thing(id) else {
        return false;
    };
    let team = agent.team;
    let target = agent.pos.step(dir);
    let Some(other_id) = env.grid.get_blocking(target) else {
        return false;
    };
    let swappable = env.thing(other_id).is_some_and(|other| {
        other.kind == ThingKind::Agent && other.team == team && other.frozen == 0 && other.is_alive()
    });
    if !swappable {
        return false;
    }
    env.swap_things(id, other_id);
    if let Some(agent) = env.thing_mut(id) {
        agent.orientation = dir;
    }
    true
}

/// Hands one item to an adjacent teammate. Priority: Armor, then Bread,
/// then the largest stack that fits the receiver's caps.
pub(crate) fn execute_put(env: &mut Environment, id: ThingId, dir: Direction) -> bool {
    let Some(agent) = env.thing(id) else {
        return false;
    };
    let team = agent.team;
    let target = agent.pos.step(dir);
    let Some(other_id) = env.grid.get_blocking(target) else {
        return false;
    };
    let is_teammate = env.thing(other_id).is_some_and(|other| {
        other.kind == ThingKind::Agent && other.team == team && other.is_alive()
    });
    if !is_teammate {
        return false;
    }

    let Some(item) = choose_gift(env, id, other_id) else {
        return false;
    };
    if let Some(giver) = env.thing_mut(id) {
        giver.inventory.take_exact(item, 1);
    }
    if let Some(receiver) = env.thing_mut(other_id) {
        receiver.inventory.add(item, 1);
    }
    true
}

fn choose_gift(env: &Environment, giver_id: ThingId, receiver_id: ThingId) -> Option<ItemKind> {
    let giver = env.thing(giver_id)?;
    let receiver = env.thing(receiver_id)?;
    let fits = |item: ItemKind| receiver.inventory.agent_capacity_for(item) > 0;

    for preferred in [ItemKind::Armor, ItemKind::Bread] {
        if giver.inventory.count(preferred) > 0 && fits(preferred) {
            return Some(preferred);
        }
    }
    // Largest stack that fits; ties resolve to the lower ItemKind because
    // bag iteration is ordered.
    giver
        .inventory
        .iter()
        .filter(|(item, _)| fits(*item))
        .max_by_key(|(_, count)| *count)
        .map(|(item, _)| item)
}
