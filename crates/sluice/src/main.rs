//! sluice CLI - declarative file pipelines for static sites.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

/// Environment variable that overrides the log filter.
const LOG_ENV: &str = "SLUICE_LOG";

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Declarative file pipelines and live-reload dev server for static sites")]
#[command(version)]
pub struct Cli {
    /// Tasks to run in order (defaults to "serve")
    tasks: Vec<String>,

    /// Path to sluice.toml project file
    #[arg(short, long, default_value = "sluice.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Port for the dev server (overrides [serve] port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Do not open browser
    #[arg(long)]
    no_open: bool,

    /// List tasks and exit
    #[arg(long, conflicts_with = "init")]
    list: bool,

    /// Write the default project file and source skeleton
    #[arg(long)]
    init: bool,

    /// Overwrite existing files with --init
    #[arg(long, requires = "init")]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.init {
        return commands::init::run(&cli.config, cli.force).await;
    }

    let project = sluice_config::Project::load(&cli.config)?;

    if cli.list {
        commands::list::run(&project);
        return Ok(());
    }

    let options = commands::serve::ServeOptions {
        port: cli.port,
        open: !cli.no_open,
    };
    commands::run::run(project, requested_tasks(cli.tasks), options).await
}

fn requested_tasks(tasks: Vec<String>) -> Vec<String> {
    if tasks.is_empty() {
        vec![sluice_config::RESERVED_TASK.to_string()]
    } else {
        tasks
    }
}
