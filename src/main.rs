use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use jobdispatch::{DispatchConfig, Dispatcher, RunClock};

#[derive(Parser, Debug)]
#[command(name = "jobdispatch")]
#[command(version)]
#[command(about = "Run worker jobs from a command file on a fixed thread pool")]
#[command(allow_negative_numbers = true)]
struct Args {
    /// Command file, one directive per line
    cmdfile: PathBuf,

    /// Number of worker threads (1-4096)
    num_threads: i64,

    /// Number of counter files (0-100)
    num_counters: i64,

    /// Write event traces: 1 to enable, 0 to disable
    log_enabled: i64,

    /// Directory for counter files, traces and stats.txt
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// How to print the run report on stdout
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    // Trace offsets are relative to process start.
    let clock = RunClock::start();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args, clock) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args, clock: RunClock) -> Result<()> {
    let mut config =
        DispatchConfig::from_raw(args.num_threads, args.num_counters, args.log_enabled)
            .context("invalid configuration")?;
    config.output_dir = args.output_dir;

    let dispatcher = Dispatcher::new(config)
        .context("invalid configuration")?
        .with_clock(clock);
    let report = dispatcher
        .run_file(&args.cmdfile)
        .with_context(|| format!("run of {} failed", args.cmdfile.display()))?;

    match args.format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(())
}
