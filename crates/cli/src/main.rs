//! Orcas CLI: the main entry point.
//!
//! Commands:
//! - `onboard` - Write a starter config and create the workspace database
//! - `chat`    - Interactive or single-message chat
//! - `plan`    - Break a task into subtasks assigned to agents
//! - `tools`   - Print the workspace tool schemas
//! - `models`  - List models from the configured provider
//! - `doctor`  - Diagnose configuration and connectivity

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "orcas",
    about = "Orcas: delegate work to AI agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and the workspace database
    Onboard,

    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Task the conversation is about (used when tools omit task_id)
        #[arg(long)]
        task: Option<i64>,

        /// Space the conversation is about (used when tools omit space_id)
        #[arg(long)]
        space: Option<i64>,

        /// Model name or snapshot id (defaults to `default_model`)
        #[arg(long)]
        model: Option<String>,
    },

    /// Break a task into subtasks and assign them to agents
    Plan {
        /// Task to plan
        #[arg(long)]
        task: i64,
    },

    /// Print the tool schemas advertised to the model, as JSON
    Tools,

    /// List models available from the configured provider
    Models,

    /// Diagnose configuration and connectivity
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat {
            message,
            task,
            space,
            model,
        } => {
            commands::chat::run(commands::chat::ChatArgs {
                message,
                task,
                space,
                model,
            })
            .await?
        }
        Commands::Plan { task } => commands::plan::run(task).await?,
        Commands::Tools => commands::tools::run()?,
        Commands::Models => commands::models::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
