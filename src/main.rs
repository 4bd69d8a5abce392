//! Lunar dataflow runtime - CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lunar::programs::{spawn_add, spawn_init};
use lunar::util::{config, logger};
use lunar::{FutureId, RunReport, Scheduler, NAME, VERSION};

/// Run small dataflow programs on the Lunar runtime
#[derive(Parser, Debug)]
#[command(name = "lunar")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ~/.config/lunar/config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add two integers through a pair of frames
    Add {
        #[arg(value_name = "A", allow_negative_numbers = true)]
        a: i32,
        #[arg(value_name = "B", allow_negative_numbers = true)]
        b: i32,
    },

    /// Store a constant from an initializer frame and read it back
    Init,

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = config::load_config(args.config.as_deref()).context("Failed to load config")?;
    if args.verbose {
        logger::init_debug();
    } else {
        logger::init_with_level(config.log.level);
    }

    let mut scheduler = Scheduler::with_config(config.scheduler_config());

    let result = match args.command {
        Commands::Add { a, b } => spawn_add(&mut scheduler, a, b)
            .context("Failed to set up add program")?
            .sum,
        Commands::Init => spawn_init(&mut scheduler)
            .context("Failed to set up init program")?
            .output,
        Commands::Version => {
            println!("{} {}", NAME, VERSION);
            return Ok(());
        }
    };

    let report = scheduler.run();
    print_result(&scheduler, result, &report, args.json)
}

fn print_result(
    scheduler: &Scheduler,
    result: FutureId,
    report: &RunReport,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    }

    match scheduler.read(result)? {
        Some(value) => {
            println!("{}", value);
            Ok(())
        }
        None => bail!(
            "{} never completed (outcome: {:?}, {} failed)",
            result,
            report.outcome,
            report.failed.len()
        ),
    }
}
