mod render;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use core_types::Evaluation;
use serde::Serialize;
use signal_engine::config_loader::{
    engine_config_path, load_engine_config_from, render_engine_config,
};
use signal_engine::session::TableRegistry;
use signal_engine::{observe_decision, EngineConfig, SignalEngine};
use tokio::io::{AsyncBufReadExt, BufReader};

use render::{evaluation_text, history_grid, parse_outcomes};

const WATCH_TABLE: &str = "studio";

#[derive(Parser, Debug)]
#[command(name = "studio", about = "Home/Away/Draw table signal engine", version)]
struct Cli {
    /// Engine config TOML; falls back to configs/engine.toml, then defaults.
    #[arg(long, global = true, env = "STUDIO_ENGINE_CONFIG_PATH")]
    config: Option<PathBuf>,
    /// Dump Prometheus metrics to stderr before exiting.
    #[arg(long, global = true, default_value_t = false)]
    metrics: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record a sequence and print the resulting evaluation.
    Replay(ReplayArgs),
    /// Read one outcome per stdin line; `reset` clears the table.
    Watch(WatchArgs),
    /// Print the effective engine config as TOML.
    Config,
}

#[derive(Args, Debug, Clone)]
struct ReplayArgs {
    /// Outcomes such as "HAHD" or "home,away,draw", most recent first.
    #[arg(long)]
    outcomes: String,
    /// Read `--outcomes` in chronological order instead.
    #[arg(long, default_value_t = false)]
    oldest_first: bool,
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Print an evaluation after every recorded outcome.
    #[arg(long, default_value_t = false)]
    every_tick: bool,
}

#[derive(Args, Debug, Clone)]
struct WatchArgs {
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Skip the history grid in text mode.
    #[arg(long, default_value_t = false)]
    no_grid: bool,
}

#[derive(Debug, Serialize)]
struct TickReport<'a> {
    tick: usize,
    outcome: core_types::Outcome,
    evaluation: &'a Evaluation,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = observability::init_tracing("studio_cli");
    if cli.metrics {
        observability::init_metrics()?;
    }

    let cfg = load_config(cli.config.clone())?;
    match &cli.command {
        Commands::Replay(args) => run_replay(cfg, args)?,
        Commands::Watch(args) => run_watch(cfg, args).await?,
        Commands::Config => print!("{}", render_engine_config(&cfg)?),
    }

    if cli.metrics {
        if let Some(rendered) = observability::render_metrics() {
            eprintln!("{rendered}");
        }
    }
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    let path = path.unwrap_or_else(engine_config_path);
    load_engine_config_from(&path)
}

/// Chronological order, ready to be recorded one by one.
fn replay_sequence(args: &ReplayArgs) -> Result<Vec<core_types::Outcome>> {
    let mut outcomes = parse_outcomes(&args.outcomes).context("parse --outcomes")?;
    if outcomes.is_empty() {
        bail!("--outcomes is empty");
    }
    if !args.oldest_first {
        outcomes.reverse();
    }
    Ok(outcomes)
}

fn run_replay(cfg: EngineConfig, args: &ReplayArgs) -> Result<()> {
    let sequence = replay_sequence(args)?;
    let mut engine = SignalEngine::new(cfg)?;
    tracing::info!(outcomes = sequence.len(), "replay started");

    let last = sequence.len();
    for (idx, outcome) in sequence.into_iter().enumerate() {
        engine.record_outcome(outcome);
        let tick = idx + 1;
        if !args.every_tick && tick != last {
            continue;
        }
        let evaluation = engine.evaluate();
        observe_decision(&evaluation);
        if args.json {
            let report = TickReport {
                tick,
                outcome,
                evaluation: &evaluation,
            };
            println!("{}", serde_json::to_string(&report)?);
        } else {
            if args.every_tick {
                println!("# tick {tick}: {}", outcome.glyph());
            }
            println!("{}", evaluation_text(&evaluation));
            if tick == last {
                println!();
                println!("{}", history_grid(&engine.history()));
            }
        }
    }
    Ok(())
}

async fn run_watch(cfg: EngineConfig, args: &WatchArgs) -> Result<()> {
    let registry = TableRegistry::new(cfg, 256)?;
    registry.open_table_with_id(WATCH_TABLE);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("read stdin")? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let evaluation = if line.eq_ignore_ascii_case("reset") {
            registry.reset(WATCH_TABLE)?
        } else {
            match registry.record_symbol(WATCH_TABLE, line) {
                Ok(evaluation) => evaluation,
                Err(err) => {
                    tracing::warn!(%err, input = line, "skipping input");
                    continue;
                }
            }
        };

        if args.json {
            println!("{}", serde_json::to_string(&evaluation)?);
            continue;
        }
        println!("{}", evaluation_text(&evaluation));
        if !args.no_grid {
            println!("{}", history_grid(&registry.history(WATCH_TABLE)?));
        }
        println!();
    }
    tracing::info!("stdin closed");
    Ok(())
}
