pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::database::DatabaseManager;

#[derive(Parser)]
#[command(name = "schoolctl")]
#[command(about = "School API admin CLI - keys, school registry and event imports")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Generate the server RSA private key")]
    Keygen(commands::keygen::KeygenArgs),

    #[command(about = "Manage registered schools")]
    School {
        #[command(subcommand)]
        cmd: commands::school::SchoolCommands,
    },

    #[command(about = "Import school calendars")]
    Events {
        #[command(subcommand)]
        cmd: commands::events::EventsCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Connect with the same environment the server reads, and make sure the tables exist
pub async fn connect() -> anyhow::Result<DatabaseManager> {
    let config = AppConfig::from_env()?;
    let db = DatabaseManager::connect(&config.database).await?;
    db.bootstrap_schema().await?;
    Ok(db)
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Keygen(args) => commands::keygen::handle(args, output_format).await,
        Commands::School { cmd } => commands::school::handle(cmd, output_format).await,
        Commands::Events { cmd } => commands::events::handle(cmd, output_format).await,
    }
}
