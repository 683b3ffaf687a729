//! Demo driver: runs a skirmish episode with a random-legal policy and
//! prints the ASCII view plus a scoreboard.
//!
//! Usage: `sim-cli [seed] [steps] [render-every]`

use anyhow::{Context, Result};
use sim_core::{
    Environment, Resource, SimConfig, StreamDomain, TickRng, compute_seed,
};
use sim_content::SkirmishMap;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = parse_or(args.next(), 0).context("seed must be an integer")?;
    let steps: u32 = parse_or(args.next(), 500).context("steps must be an integer")?;
    let render_every: u32 =
        parse_or(args.next(), 100).context("render interval must be an integer")?;

    let config = SimConfig::with_max_steps(steps);
    let mut env = Environment::with_seed(config, seed, Box::new(SkirmishMap::standard()))
        .context("failed to build the skirmish environment")?;
    tracing::info!(seed, steps, "episode start");

    // Policy stream is separate from the kernel's tick stream, so the same
    // seed still produces the same kernel trajectory for a fixed policy.
    let mut policy = TickRng::new(compute_seed(seed, u64::MAX, StreamDomain::Tick));
    let mut actions = vec![0u8; env.num_agents()];

    for step in 0..steps {
        for action in actions.iter_mut() {
            // Bytes 0..100 decode to a verb; bias toward movement.
            *action = if policy.chance(0.5) {
                10 + policy.below(8) as u8
            } else {
                policy.below(100) as u8
            };
        }
        env.step(&actions)?;
        if render_every > 0 && step % render_every == 0 {
            println!("--- step {step} ---");
            print!("{}", env.render());
        }
        if env.episode_done() {
            tracing::info!(step, "episode finished early");
            break;
        }
    }

    print_scoreboard(&env);
    Ok(())
}

fn parse_or<T: std::str::FromStr>(arg: Option<String>, default: T) -> Result<T, T::Err> {
    match arg {
        Some(text) => text.parse(),
        None => Ok(default),
    }
}

fn print_scoreboard(env: &Environment) {
    println!("=== scoreboard (step {}) ===", env.current_step());
    for team in 0..SimConfig::NUM_TEAMS as i32 {
        let Some(state) = env.team(team) else { continue };
        let pop = env.live_population(team);
        let cap = env.population_cap(team);
        println!(
            "team {team}: pop {pop}/{cap}  food {:>3}  wood {:>3}  stone {:>3}  gold {:>3}  water {:>3}",
            state.stockpile.get(Resource::Food),
            state.stockpile.get(Resource::Wood),
            state.stockpile.get(Resource::Stone),
            state.stockpile.get(Resource::Gold),
            state.stockpile.get(Resource::Water),
        );
    }
    let invalid: u32 = env.stats().iter().map(|stat| stat.action_invalid).sum();
    let moves: u32 = env.stats().iter().map(|stat| stat.moves).sum();
    let deaths: u32 = env.stats().iter().map(|stat| stat.deaths).sum();
    let respawns: u32 = env.stats().iter().map(|stat| stat.respawns).sum();
    println!("actions: {moves} moves, {invalid} invalid; {deaths} deaths, {respawns} respawns");
    let mean_reward: f32 =
        env.rewards().iter().sum::<f32>() / env.num_agents() as f32;
    println!("mean reward: {mean_reward:.4}");
}
