//! AYMARA CLI, the main entry point.
//!
//! Commands:
//! - `serve`   Start the HTTP gateway
//! - `ask`     One-shot consultation
//! - `render`  Print the rendered text for a context JSON file
//! - `check`   Run a question through the admission heuristic
//! - `doctor`  Diagnose configuration
//! - `init`    Write a default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "aymara",
    about = "AYMARA, a medical-administrative assistant for the Colombian health system",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "AYMARA_JSON_LOGS")]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a single question
    Ask {
        /// The question
        question: String,

        /// Context text or JSON sent with the question
        #[arg(short, long)]
        context: Option<String>,
    },

    /// Print the rendered context for a JSON file (`-` reads stdin)
    Render {
        /// Path to the context JSON
        file: PathBuf,
    },

    /// Check whether a question passes the admission heuristic
    Check {
        /// The question
        question: String,
    },

    /// Diagnose configuration
    Doctor {
        /// Also contact the model backend
        #[arg(long)]
        probe: bool,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load `.env` before clap reads env-backed flags; a missing file is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Ask { question, context } => commands::ask::run(question, context).await?,
        Commands::Render { file } => commands::render::run(&file)?,
        Commands::Check { question } => commands::check::run(&question)?,
        Commands::Doctor { probe } => commands::doctor::run(probe).await?,
        Commands::Init { force } => commands::init::run(force)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
