//! # Fury Headless
//!
//! Runs a scenario without a window and prints a JSON summary.
//!
//! ```text
//! fury-headless <scenario.toml> [--record <replay.frpl>] [--hash-interval <ticks>]
//! fury-headless --verify <replay.frpl>
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::{bail, Context, Result};
use fury_tools::{verify, Replay, Runner, Scenario, DEFAULT_HASH_INTERVAL};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "usage: fury-headless <scenario.toml> [--record <replay>] [--hash-interval <ticks>]\n       \
                     fury-headless --verify <replay>";

/// What the command line asked for.
enum Command {
    Run {
        scenario: String,
        record: Option<String>,
        hash_interval: u64,
    },
    Verify {
        replay: String,
    },
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Command> {
    let mut scenario = None;
    let mut record = None;
    let mut hash_interval = DEFAULT_HASH_INTERVAL;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--verify" => {
                let replay = args.next().context("--verify needs a replay path")?;
                return Ok(Command::Verify { replay });
            }
            "--record" => {
                record = Some(args.next().context("--record needs a path")?);
            }
            "--hash-interval" => {
                let value = args.next().context("--hash-interval needs a value")?;
                hash_interval = value
                    .parse()
                    .with_context(|| format!("bad hash interval {value:?}"))?;
            }
            "-h" | "--help" => bail!("{USAGE}"),
            _ if scenario.is_none() => scenario = Some(arg),
            _ => bail!("unexpected argument {arg:?}\n{USAGE}"),
        }
    }

    let scenario = scenario.context(USAGE)?;
    Ok(Command::Run {
        scenario,
        record,
        hash_interval,
    })
}

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("fury=info".parse()?))
        .init();

    info!("Fury headless {}", env!("CARGO_PKG_VERSION"));

    match parse_args(std::env::args().skip(1))? {
        Command::Run {
            scenario,
            record,
            hash_interval,
        } => {
            let scenario = Scenario::load(&scenario)
                .with_context(|| format!("loading scenario {scenario}"))?;
            let mut runner = Runner::new(scenario)?;
            if record.is_some() {
                runner = runner.recording(hash_interval);
            }
            let (summary, replay) = runner.run().map_err(|e| {
                tracing::error!(error = %e, "simulation aborted");
                e
            })?;
            if let (Some(path), Some(replay)) = (record, replay) {
                replay
                    .save_to_file(&path)
                    .with_context(|| format!("writing replay {path}"))?;
                info!(path = %path, frames = replay.frame_count(), "replay saved");
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Verify { replay } => {
            let loaded =
                Replay::load_from_file(&replay).with_context(|| format!("reading replay {replay}"))?;
            let frames = loaded.frame_count();
            let matched = verify(loaded)?;
            println!(
                "{}",
                serde_json::json!({ "replay": replay, "frames": frames, "hashes_matched": matched })
            );
        }
    }
    Ok(())
}
