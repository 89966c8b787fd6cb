use anyhow::Context;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::database::models::user::Role;
use crate::services::user_service::{NewUser, UserService};
use crate::state::AppState;

pub async fn create(
    state: &AppState,
    name: String,
    email: String,
    password: String,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let input = NewUser {
        name,
        email,
        password,
        role: Some(Role::Admin),
        student_id: None,
        department: None,
        semester: None,
        phone: None,
        cgpa: None,
    };

    let user = UserService::new(state)
        .create(input, Role::Admin)
        .await
        .context("failed to create admin")?;

    match output_format {
        OutputFormat::Json => println!("{}", json!({ "success": true, "data": user })),
        OutputFormat::Text => println!("Created admin {} ({})", user.email, user.id),
    }
    Ok(())
}
