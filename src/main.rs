//! Replays a recorded tracker stream through the scoring engine.
//!
//! ```text
//! posescore-replay <stream-file> --exercise squat --difficulty medium --time-limit 60
//!                  [--settings settings.json] [--uid athlete-1]
//! ```
//!
//! Each line of the stream is one raw tracker message. A line reading `tick`
//! advances the session clock by one second; blank lines and `#` comments
//! are skipped. The finished result is printed as JSON.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use posescore_lib::{
    classify_message,
    session::{SessionResult, TickOutcome, Transition},
    Difficulty, EngineSettings, RawMessage, SessionMachine, SettingsStore,
};

#[derive(Parser, Debug)]
#[command(name = "posescore-replay")]
#[command(about = "Replay a recorded tracker stream and print the scored session")]
struct ReplayArgs {
    /// File with one raw tracker message per line
    stream: PathBuf,

    /// Exercise key from the approved catalog
    #[arg(long)]
    exercise: String,

    /// easy, medium or hard
    #[arg(long, value_parser = parse_difficulty)]
    difficulty: Difficulty,

    /// Session length in seconds (30, 60 or 120)
    #[arg(long)]
    time_limit: u32,

    /// Settings file holding the catalog and scoring policy
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long, default_value = "replay")]
    uid: String,
}

fn parse_difficulty(raw: &str) -> Result<Difficulty, String> {
    raw.parse::<Difficulty>().map_err(|err| err.to_string())
}

fn replay(args: &ReplayArgs) -> Result<SessionResult> {
    let settings = match &args.settings {
        Some(path) => SettingsStore::new(path.clone())?.settings(),
        None => EngineSettings::default(),
    };

    let mut machine = SessionMachine::new(args.uid.clone(), settings.catalog, settings.scoring);
    machine.select_exercise(&args.exercise)?;
    machine.select_difficulty(args.difficulty)?;
    machine.select_time_limit(args.time_limit)?;

    let stream = fs::read_to_string(&args.stream)
        .with_context(|| format!("failed to read {}", args.stream.display()))?;

    for line in stream.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line == "tick" {
            if let TickOutcome::Expired(result) = machine.tick(machine.session_id()) {
                return Ok(result);
            }
            continue;
        }
        for event in classify_message(&RawMessage::from(line)) {
            if let Some(Transition::Finished(result)) = machine.apply(&event) {
                return Ok(result);
            }
        }
    }

    info!("stream ended before the session finished; ending it now");
    machine.finish_now()
}

fn main() -> Result<()> {
    posescore_lib::init_logging();

    let args = ReplayArgs::parse();
    let result = replay(&args)?;

    let summary = result.summary();
    info!(
        "{} / {} / {}: {} reps, {}",
        summary.exercise, summary.difficulty, summary.time_limit, summary.total_reps, summary.score
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
