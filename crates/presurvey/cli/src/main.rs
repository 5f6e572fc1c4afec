//! Presurvey CLI - run a participant through the presurvey pipeline
//!
//! Interstitials become terminal prompts (or scripted `--answer`s), the
//! survey link is printed instead of opened, and a JSON file stands in for
//! the browser's cookies between runs.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod interact;
mod store;

use commands::{guards, run, session};
use config::PresurveyConfig;

/// Presurvey CLI
#[derive(Parser)]
#[command(name = "presurvey")]
#[command(about = "Presurvey - participant gatekeeping pipeline", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PRESURVEY_CONFIG")]
    config: Option<String>,

    /// API base URL
    #[arg(long, env = "PRESURVEY_API_URL")]
    api_url: Option<String>,

    /// Session file path
    #[arg(long)]
    session_file: Option<std::path::PathBuf>,

    /// Log level
    #[arg(long, env = "PRESURVEY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Run a participant through the pipeline up to the survey hand-off
    Run(run::RunArgs),

    /// Show the guard order a program resolves to
    Guards {
        /// Program label
        program: String,
    },

    /// Inspect or reset the session file
    Session {
        #[command(subcommand)]
        command: session::SessionCommands,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration, then let flags override it
    let mut config = PresurveyConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if let Some(path) = cli.session_file {
        config.session.path = path;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match cli.command {
        Commands::Run(args) => run::execute(args, &config).await?,
        Commands::Guards { program } => guards::execute(&program, &config).await?,
        Commands::Session { command } => session::execute(command, &config)?,
        Commands::Config => println!("{}", serde_json::to_string_pretty(&config)?),
    }

    Ok(())
}
