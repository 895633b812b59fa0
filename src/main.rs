//! Robo Field entry point
//!
//! Native episode driver: runs seeded episodes with a random policy and
//! logs the outcomes. Pass a settings JSON path as the first argument to
//! override the defaults.

use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use robo_field::sim::Action;
use robo_field::{EnvSettings, FieldEnv};

const EPISODES: u64 = 3;

fn main() {
    env_logger::init();

    let settings = match std::env::args().nth(1) {
        Some(path) => EnvSettings::load(Path::new(&path)),
        None => EnvSettings::default(),
    };
    let base_seed = settings.seed;
    log::info!(
        "running {EPISODES} episodes of {} steps, layout {:?}, seed {base_seed}",
        settings.episode_steps,
        settings.layout
    );

    let mut env = FieldEnv::new(settings);
    // Separate stream for the policy so layout seeds stay comparable
    // across policy changes
    let mut policy = Pcg32::seed_from_u64(base_seed ^ 0x9e37_79b9_7f4a_7c15);

    for episode in 0..EPISODES {
        env.reset_from_seed(base_seed + episode);
        if let Some(report) = env.last_gen_report() {
            log::debug!("generation counts: {:?}", report.counts);
        }

        let mut shaped_return = 0.0;
        loop {
            let action = Action::from_indices(
                policy.random_range(0..5),
                policy.random_range(0..5),
            )
            .unwrap_or(Action::idle());

            let result = env.step(&action);
            shaped_return += result.reward;
            if result.done {
                log::info!(
                    "episode {episode}: shaped return {shaped_return:.1}, final score red {} / blue {}",
                    result.info.red_score,
                    result.info.blue_score
                );
                break;
            }
        }
    }

    // Dump the last field so external tooling can inspect the episode end
    match serde_json::to_string_pretty(env.field()) {
        Ok(json) => println!("{json}"),
        Err(err) => log::error!("could not serialize final field: {err}"),
    }
}
