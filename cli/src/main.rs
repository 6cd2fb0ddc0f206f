use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use log::info;

use reconcile_cli::scenario::{self, ScenarioConfig};
use reconcile_cli::trace;

#[derive(Debug, Parser)]
#[command(version, author, about = "Inspect update selection for a reconciliation scenario")]
struct Args {
    /// Scenario file path (TOML), describing the update chain and
    /// reconciliation flags to run.
    #[clap(short = 's', long = "scenario", default_value = "scenario.toml")]
    scenario: PathBuf,

    #[clap(short = 'l', long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    trace::init_logging(&args.log_level)?;

    info!("loading scenario from {}", args.scenario.display());
    let cfg: ScenarioConfig = confy::load_path(&args.scenario)?;

    match scenario::run(&cfg) {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", format!("reconciliation failed: {err}").red());
            std::process::exit(1);
        }
    }
}

fn print_outcome(outcome: &scenario::ScenarioOutcome) {
    let selection = &outcome.selection;

    match &selection.update {
        Some(update) => {
            println!(
                "{} txn={} start_ts={} kind={:?}",
                "selected:".green().bold(),
                update.txn_id,
                update.start_ts,
                update.kind
            );
        }
        None => println!("{}", "selected: <none>".yellow().bold()),
    }

    println!(
        "window:   start=({}, {}) stop=({}, {}) prepare={}",
        selection.window.start.ts, selection.window.start.txn, selection.window.stop.ts, selection.window.stop.txn, selection.prepare
    );
    println!("saved entries: {}", outcome.saved_count);
    println!("cache write restore: {}", outcome.cache_write_restore);
    println!("out-of-order repairs: {}", outcome.repair_count);
    println!("updates seen: {} unstable: {}", outcome.updates_seen, outcome.updates_unstable);
}
