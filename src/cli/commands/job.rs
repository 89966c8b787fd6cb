use anyhow::Context;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::scheduler::{run_job, JobName};
use crate::state::AppState;

pub async fn run(state: &AppState, name: JobName, output_format: OutputFormat) -> anyhow::Result<()> {
    let affected = run_job(state, name)
        .await
        .with_context(|| format!("job {} failed", name))?;

    match output_format {
        OutputFormat::Json => println!("{}", json!({ "success": true, "job": name, "affected": affected })),
        OutputFormat::Text => println!("{}: {} records affected", name, affected),
    }
    Ok(())
}
