//! JARVIS CLI — the main entry point.
//!
//! Commands:
//! - `run`     — Handle a single request and print the answer
//! - `chat`    — Interactive mode sharing one memory across requests
//! - `memory`  — Inspect or extend the task history
//! - `config`  — Show the effective configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "jarvis",
    about = "JARVIS — multi-agent orchestration for code and shell tasks",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print only the final answer
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one request
    Run {
        /// The request, e.g. "compute the factorial of 10"
        #[arg(required = true)]
        task: Vec<String>,
    },

    /// Interactive mode
    Chat,

    /// Task history commands
    Memory {
        #[command(subcommand)]
        action: MemoryCommands,
    },

    /// Print the effective configuration (secrets redacted)
    Config,
}

#[derive(Subcommand)]
enum MemoryCommands {
    /// Find the records most similar to a query
    Search {
        query: String,
        /// Number of records to return
        #[arg(short, default_value_t = 3)]
        k: usize,
    },

    /// Show the newest records
    Recent {
        #[arg(short, default_value_t = 5)]
        n: usize,
    },

    /// Save a note to memory
    Add {
        text: String,
        #[arg(long, default_value = "user")]
        agent: String,
        #[arg(long, default_value = "note")]
        action: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the answer
    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let show_progress = !cli.quiet;
    match cli.command {
        Commands::Run { task } => commands::run::run(&task.join(" "), show_progress).await?,
        Commands::Chat => commands::chat::run(show_progress).await?,
        Commands::Memory { action } => match action {
            MemoryCommands::Search { query, k } => commands::memory::search(&query, k).await?,
            MemoryCommands::Recent { n } => commands::memory::recent(n).await?,
            MemoryCommands::Add { text, agent, action } => {
                commands::memory::add(&text, &agent, &action).await?
            }
        },
        Commands::Config => commands::config_cmd::show()?,
    }

    Ok(())
}
