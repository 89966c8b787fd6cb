pub mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::config;
use crate::database::DatabaseManager;
use crate::scheduler::JobName;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Portal CLI - maintenance tasks for the student portal backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Create an administrator account")]
    CreateAdmin {
        #[arg(long, help = "Display name")]
        name: String,
        #[arg(long, help = "Login email")]
        email: String,
        #[arg(long, env = "PORTAL_ADMIN_PASSWORD", help = "Initial password")]
        password: String,
    },

    #[command(about = "Run one scheduled job immediately")]
    RunJob {
        #[arg(help = "fee_reminders, overdue_sweep or exam_reminders")]
        name: JobName,
    },
}

#[derive(Debug, Clone, Copy)]
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

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    let config = config().clone();
    config.validate().map_err(anyhow::Error::msg).context("invalid configuration")?;

    let db = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    let state = AppState::new(db, config);

    let result = match cli.command {
        Commands::Migrate => commands::db::migrate(&state, output_format).await,
        Commands::CreateAdmin { name, email, password } => {
            commands::admin::create(&state, name, email, password, output_format).await
        }
        Commands::RunJob { name } => commands::job::run(&state, name, output_format).await,
    };

    state.db.close().await;
    result
}
