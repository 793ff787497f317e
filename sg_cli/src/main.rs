//! Headless runner for a Set game.
//!
//! Plays one game with the configured seats, reads human key presses from
//! stdin, and prints the outcome as JSON when the game ends.

mod config;

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Error;
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use set_game::{Dealer, FeatureValidator, GameConfig, GameRemote, LogUi, PlayerId, Slot};

const HELP: &str = "\
Play a game of Set between computer and human players

USAGE:
  sg_cli [OPTIONS]

OPTIONS:
  --config     FILE        JSON file with the base game configuration
  --players    N           Number of seats                      [default: env SG_PLAYERS or 2]
  --humans     N           Seats typed in on stdin              [default: env SG_HUMAN_PLAYERS or 0]
  --seed       N           Seed for dealing and computer input  [default: env SG_SEED or random]

FLAGS:
  --hints                  Log the sets on the table after every deal
  -h, --help               Print help information

INPUT:
  Human players type one `<player> <slot>` pair per line.

ENVIRONMENT:
  SG_*                     Any game setting, e.g. SG_TURN_TIMEOUT_MS=30000
  RUST_LOG                 Log filter, e.g. RUST_LOG=debug
";

struct Args {
    config: Option<PathBuf>,
    players: Option<usize>,
    humans: Option<usize>,
    seed: Option<u64>,
    hints: bool,
}

impl Args {
    fn apply(&self, config: &mut GameConfig) {
        if let Some(players) = self.players {
            config.players = players;
        }
        if let Some(humans) = self.humans {
            config.human_players = humans;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.hints |= self.hints;
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        config: pargs.opt_value_from_str("--config")?,
        players: pargs.opt_value_from_str("--players")?,
        humans: pargs.opt_value_from_str("--humans")?,
        seed: pargs.opt_value_from_str("--seed")?,
        hints: pargs.contains("--hints"),
    };

    env_logger::builder().format_target(false).init();

    let mut config = config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config::validate(&config)?;

    info!(
        "Starting a game with {} players ({} human), deck of {}",
        config.players, config.human_players, config.deck_size
    );

    let validator = Arc::new(FeatureValidator::new(config.set_size, config.feature_count));
    let handle = Dealer::new(config.clone(), validator, Arc::new(LogUi))?.spawn();

    // Catching signals for exit.
    let remote = handle.remote();
    set_handler(move || remote.terminate())?;

    if config.human_players > 0 {
        let remote = handle.remote();
        // Plain thread: a pending stdin read must not hold up shutdown.
        std::thread::spawn(move || read_key_presses(&remote));
    }

    let outcome = handle.join().await?;
    println!("{}", serde_json::to_string(&outcome)?);

    Ok(())
}

/// Forward `<player> <slot>` lines from stdin until it closes.
fn read_key_presses(remote: &GameRemote) {
    for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else {
            break;
        };
        let Some((player, slot)) = parse_press(&line) else {
            log::warn!("Expected `<player> <slot>`, got {:?}", line);
            continue;
        };
        match remote.key_pressed(player, slot) {
            Ok(true) => {}
            Ok(false) => log::debug!("Press of player {} dropped", player),
            Err(e) => log::warn!("{}", e),
        }
    }
}

fn parse_press(line: &str) -> Option<(PlayerId, Slot)> {
    let mut parts = line.split_whitespace();
    let player = parts.next()?.parse().ok()?;
    let slot = parts.next()?.parse().ok()?;
    parts.next().is_none().then_some((player, slot))
}
