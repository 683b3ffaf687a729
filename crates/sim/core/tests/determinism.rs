//! Replay determinism and post-step structural invariants.

use sim_core::{
    EmptyMap, Environment, ItemKind, Position, Resource, SimConfig, StreamDomain, Thing, ThingId,
    ThingKind, TickRng, UnitClass, building_spec, compute_seed,
};

/// Builds a busy hand-authored world: two teams with altars and crews,
/// wildlife, a spawner, resource nodes, and a market economy.
fn busy_world(seed: u64) -> Environment {
    let mut env =
        Environment::with_seed(SimConfig::default(), seed, Box::new(EmptyMap::new(32, 32)))
            .unwrap();

    let altar_a = env.add(Thing::altar(Position::new(6, 6), 0, 4)).unwrap();
    let altar_b = env.add(Thing::altar(Position::new(25, 25), 1, 4)).unwrap();
    env.add(Thing::building(ThingKind::TownCenter, Position::new(8, 6), 0))
        .unwrap();
    env.add(Thing::building(ThingKind::TownCenter, Position::new(23, 25), 1))
        .unwrap();
    env.add(Thing::building(ThingKind::GuardTower, Position::new(12, 12), 0))
        .unwrap();

    for (agent_id, pos, team, altar) in [
        (0usize, Position::new(5, 5), 0, altar_a),
        (1, Position::new(7, 7), 0, altar_a),
        (2, Position::new(9, 8), 0, altar_a),
        (8, Position::new(26, 24), 1, altar_b),
        (9, Position::new(24, 23), 1, altar_b),
        (10, Position::new(20, 20), 1, altar_b),
    ] {
        let id = env
            .add(Thing::agent(agent_id, UnitClass::Villager, pos, team))
            .unwrap();
        let thing = env.thing_mut(id).unwrap();
        thing.agent_data_mut().unwrap().home_altar = Some(altar);
        thing.inventory.add(ItemKind::Bar, 1);
    }

    env.add(Thing::resource_node(ThingKind::Gold, Position::new(15, 15), 8))
        .unwrap();
    env.add(Thing::resource_node(ThingKind::Tree, Position::new(14, 16), 6))
        .unwrap();
    env.add(Thing::new(ThingKind::Magma, Position::new(16, 16)))
        .unwrap();
    env.add(Thing::spawner(Position::new(16, 28))).unwrap();
    env.add(Thing::mob(ThingKind::Cow, Position::new(4, 20), 0))
        .unwrap();
    env.add(Thing::mob(ThingKind::Cow, Position::new(5, 21), 0))
        .unwrap();
    env.add(Thing::mob(ThingKind::Wolf, Position::new(28, 6), 0))
        .unwrap();

    let cap = env.stockpile_cap(0);
    env.team_mut(0)
        .unwrap()
        .stockpile
        .add_capped(Resource::Wood, 20, cap);
    env.team_mut(1)
        .unwrap()
        .stockpile
        .add_capped(Resource::Stone, 20, cap);
    env
}

/// A mixed stream of plausible action bytes, deterministic in `seed`.
fn action_stream(seed: u64, step: u64, actions: &mut [u8]) {
    let mut rng = TickRng::new(compute_seed(seed ^ 0xfeed, step, StreamDomain::Tick));
    for action in actions.iter_mut() {
        *action = match rng.below(4) {
            0 => 10 + rng.below(8) as u8,  // move
            1 => 20 + rng.below(8) as u8,  // attack
            2 => 30 + rng.below(8) as u8,  // use
            _ => rng.below(100) as u8,     // anything
        };
    }
}

#[test]
fn identical_seed_and_actions_replay_byte_identically() {
    let mut a = busy_world(1234);
    let mut b = busy_world(1234);
    assert_eq!(a.state_root(), b.state_root());

    let mut actions = vec![0u8; SimConfig::NUM_AGENTS];
    for step in 0..100 {
        action_stream(1234, step, &mut actions);
        a.step(&actions).unwrap();
        b.step(&actions).unwrap();
        assert_eq!(a.state_root(), b.state_root(), "divergence at step {step}");
    }
    assert_eq!(a.observations(), b.observations());
    assert_eq!(a.terminated(), b.terminated());
    assert_eq!(a.truncated(), b.truncated());
    assert_eq!(a.stats(), b.stats());
    for (ra, rb) in a.rewards().iter().zip(b.rewards()) {
        assert_eq!(ra.to_bits(), rb.to_bits());
    }
}

#[test]
fn different_action_streams_diverge() {
    let mut a = busy_world(1234);
    let mut b = busy_world(1234);
    let mut actions = vec![0u8; SimConfig::NUM_AGENTS];

    action_stream(1234, 0, &mut actions);
    a.step(&actions).unwrap();
    action_stream(4321, 0, &mut actions);
    b.step(&actions).unwrap();
    assert_ne!(a.state_root(), b.state_root());
}

#[test]
fn structural_invariants_hold_across_a_long_run() {
    let mut env = busy_world(777);
    let mut actions = vec![0u8; SimConfig::NUM_AGENTS];
    for step in 0..200 {
        action_stream(777, step, &mut actions);
        env.step(&actions).unwrap();
        assert_invariants(&env, step);
    }
}

fn assert_invariants(env: &Environment, step: u64) {
    // Blocking-grid ↔ thing-position consistency, both directions.
    let mut expected_cells: Vec<(Position, ThingId)> = Vec::new();
    for thing in env.things().iter() {
        if thing.kind.is_blocking() && !thing.pos.is_off_grid() {
            assert_eq!(
                env.grid().get_blocking(thing.pos),
                Some(thing.id),
                "step {step}: {:?} at {} missing from blocking grid",
                thing.kind,
                thing.pos
            );
            expected_cells.push((thing.pos, thing.id));
        }
    }
    for y in 0..env.grid().height() {
        for x in 0..env.grid().width() {
            let pos = Position::new(x, y);
            if let Some(id) = env.grid().get_blocking(pos) {
                let thing = env
                    .thing(id)
                    .unwrap_or_else(|| panic!("step {step}: stale handle in grid at {pos}"));
                assert_eq!(thing.pos, pos);
            }
        }
    }

    // Agent liveness triple: hp > 0 ⟺ not terminated ⟺ on-grid (unless
    // garrisoned).
    for agent_id in 0..SimConfig::NUM_AGENTS {
        let Some(thing) = env.agent(agent_id) else {
            assert_eq!(env.terminated()[agent_id], 1, "empty slot must read dead");
            continue;
        };
        let garrisoned = thing
            .agent_data()
            .is_some_and(|data| data.is_garrisoned);
        if garrisoned {
            continue;
        }
        let alive = thing.hp > 0;
        assert_eq!(
            alive,
            env.terminated()[agent_id] == 0,
            "step {step}: agent {agent_id} hp/terminated mismatch"
        );
        assert_eq!(
            alive,
            !thing.pos.is_off_grid(),
            "step {step}: agent {agent_id} hp/position mismatch"
        );
    }

    // Garrison caps.
    for thing in env.things().iter() {
        if let Some(data) = thing.building_data() {
            let cap = building_spec(thing.kind).map(|spec| spec.garrison_cap).unwrap_or(0);
            assert!(data.garrison.len() <= cap, "step {step}: garrison overflow");
        }
    }

    // Exhausted resource nodes never linger.
    for thing in env.things().iter() {
        if thing.kind.is_resource_node() {
            assert!(
                !thing.inventory.is_empty(),
                "step {step}: empty {:?} node should have been removed",
                thing.kind
            );
        }
    }
}

#[test]
fn observation_rebuild_is_canonical() {
    let mut env = busy_world(55);
    let mut actions = vec![0u8; SimConfig::NUM_AGENTS];
    for step in 0..10 {
        action_stream(55, step, &mut actions);
        env.step(&actions).unwrap();
        // The buffer the host reads after a step must equal a from-scratch
        // rebuild, byte for byte.
        let maintained = env.observations().to_vec();
        env.rebuild_observations();
        assert_eq!(env.observations(), &maintained[..], "step {step}");
    }
}
