//! Synapse CLI: the main entry point.
//!
//! Commands:
//! - `onboard`:  Write a default config and create the upload directory
//! - `serve`:    Start the HTTP gateway
//! - `chat`:     Ask one question and stream the answer to stdout
//! - `models`:   List models offered by the configured provider
//! - `history`:  Show or prune saved interactions
//! - `status`:   Show effective configuration
//! - `doctor`:   Diagnose setup problems

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "synapse",
    about = "Synapse-V — an everyday assistant that streams answers about your files",
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
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and upload directory
    Onboard,

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a single question and stream the answer
    Chat {
        /// The question
        text: String,

        /// Use the fast model chain
        #[arg(long)]
        fast: bool,

        /// Persona whose tone the answer should take
        #[arg(long)]
        persona: Option<String>,

        /// Reply language code (e.g. "hi", "ta")
        #[arg(long, default_value = "en")]
        lang: String,

        /// Where the user is, for local context
        #[arg(long)]
        location: Option<String>,

        /// Image to ask about
        #[arg(long)]
        image: Option<PathBuf>,

        /// Document or archive to include as context
        #[arg(long)]
        document: Option<PathBuf>,

        /// Do not save the exchange to history
        #[arg(long)]
        no_save: bool,
    },

    /// List models available from the provider
    Models {
        /// Only show vision-capable models
        #[arg(long)]
        vision: bool,
    },

    /// Show saved interactions
    History {
        /// Delete every saved interaction
        #[arg(long, conflicts_with = "delete")]
        clear: bool,

        /// Delete one interaction by id
        #[arg(long, value_name = "ID")]
        delete: Option<i64>,
    },

    /// Show system status
    Status,

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `chat` output stays clean on stdout.
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat {
            text,
            fast,
            persona,
            lang,
            location,
            image,
            document,
            no_save,
        } => {
            let args = commands::chat::ChatArgs {
                text,
                fast,
                persona,
                lang,
                location,
                image,
                document,
                save: !no_save,
            };
            commands::chat::run(args).await?
        }
        Commands::Models { vision } => commands::models::run(vision).await?,
        Commands::History { clear, delete } => commands::history::run(clear, delete).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
