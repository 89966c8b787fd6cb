use anyhow::Context;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::state::AppState;

pub async fn migrate(state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    state.db.migrate().await.context("migration failed")?;

    match output_format {
        OutputFormat::Json => println!("{}", json!({ "success": true, "message": "Migrations applied" })),
        OutputFormat::Text => println!("Migrations applied"),
    }
    Ok(())
}
