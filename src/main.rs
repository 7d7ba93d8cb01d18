use std::path::PathBuf;
use std::process;

use clap::Parser;

use shipwright::config::Config;
use shipwright::core::RunContext;
use shipwright::{log, pipeline, shiplog_error, Result};

#[derive(Parser, Debug)]
#[command(name = "shipwright")]
#[command(about = "Release pipeline runner: fetch, stamp, build, package")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Re-fetch archives even when their destinations exist
    #[arg(short, long)]
    force: bool,

    /// Configuration file (defaults to shipwright.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Task to run; omit to list the available tasks
    task: Option<String>,

    /// Configuration overrides as key=value pairs
    #[arg(value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    log::init_with_debug(cli.debug);

    if let Err(e) = run(cli) {
        shiplog_error!("{}", e);
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    for spec in &cli.overrides {
        config.apply_override(spec)?;
    }

    let registry = pipeline::registry()?;
    match cli.task {
        Some(name) => {
            let ctx = RunContext {
                config: &config,
                force: cli.force,
            };
            registry.run(&name, &ctx)
        }
        None => {
            println!("Available tasks:");
            for task in registry.tasks() {
                println!("  {:<20} {}", task.name, task.description);
            }
            Ok(())
        }
    }
}
