//! Scheduled sweeps run once against a real Postgres
//!
//! Run with `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.

mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::json;
use uuid::Uuid;

use common::{call, notifications_titled, points_of, register, register_as};
use student_portal::scheduler::{run_job, JobName};

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn overdue_sweep_applies_late_fee_once() -> Result<()> {
    let server = common::spawn_server_with_database().await?;
    let client = Client::new();
    let admin = register_as(&server, &client, "Sweep Admin", "admin").await?;
    let student = register(&server, &client, "Late Payer", "CSE").await?;

    let (status, fee) = call(client.post(server.url("/api/fees")).bearer_auth(&admin.token).json(&json!({
        "student_id": student.user_id,
        "fee_type": "exam",
        "description": "Backlog exam fee",
        "amount": 1000.0,
        "due_date": (Utc::now() - Duration::days(2)).date_naive()
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let fee_url = server.url(&format!("/api/fees/{}", fee["data"]["id"].as_str().unwrap_or_default()));

    let state = server.state();
    assert!(run_job(&state, JobName::OverdueSweep).await? >= 1);

    let (_, after) = call(client.get(&fee_url).bearer_auth(&student.token)).await?;
    assert_eq!(after["data"]["status"], "overdue");
    // 5% of 1000
    assert_eq!(after["data"]["late_fee"], 50.0);
    assert_eq!(notifications_titled(&server, &student, "Fee overdue").await?, 1);

    run_job(&state, JobName::OverdueSweep).await?;
    let (_, again) = call(client.get(&fee_url).bearer_auth(&student.token)).await?;
    assert_eq!(again["data"]["late_fee"], 50.0);
    assert_eq!(notifications_titled(&server, &student, "Fee overdue").await?, 1);

    // Outstanding now includes the late fee
    let (status, _) = call(
        client
            .post(format!("{}/pay", fee_url))
            .bearer_auth(&student.token)
            .json(&json!({ "amount": 1050.0 })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (_, paid) = call(client.get(&fee_url).bearer_auth(&student.token)).await?;
    assert_eq!(paid["data"]["status"], "paid");
    Ok(())
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn overdue_sweep_flags_library_loans() -> Result<()> {
    let server = common::spawn_server_with_database().await?;
    let client = Client::new();
    let librarian = register_as(&server, &client, "Sweep Librarian", "librarian").await?;
    let reader = register(&server, &client, "Slow Reader", "ECE").await?;

    let (_, book) = call(client.post(server.url("/api/library/books")).bearer_auth(&librarian.token).json(&json!({
        "title": "The Mythical Man-Month",
        "author": "Fred Brooks",
        "isbn": format!("isbn-{}", Uuid::new_v4().simple()),
        "category": "Software",
        "total_copies": 2
    })))
    .await?;
    let (status, issue) = call(client.post(server.url("/api/library/issues")).bearer_auth(&librarian.token).json(&json!({
        "book_id": book["data"]["id"],
        "user_id": reader.user_id
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let issue_id: Uuid = issue["data"]["id"].as_str().unwrap_or_default().parse()?;

    sqlx::query("UPDATE book_issues SET due_date = now() - INTERVAL '3 days' WHERE id = $1")
        .bind(issue_id)
        .execute(server.db.pool())
        .await?;

    run_job(&server.state(), JobName::OverdueSweep).await?;

    let (_, listing) = call(
        client
            .get(server.url("/api/library/issues?status=overdue"))
            .bearer_auth(&reader.token),
    )
    .await?;
    let items = listing["data"]["items"].as_array().cloned().unwrap_or_default();
    assert!(items.iter().any(|i| i["id"] == issue_id.to_string()));

    // Overdue loans cannot be renewed
    let (status, _) = call(
        client
            .post(server.url(&format!("/api/library/issues/{}/renew", issue_id)))
            .bearer_auth(&reader.token),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, returned) = call(
        client
            .post(server.url(&format!("/api/library/issues/{}/return", issue_id)))
            .bearer_auth(&librarian.token),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(returned["data"]["fine"].as_f64().unwrap_or_default() >= 6.0);
    // Late returns earn nothing
    assert_eq!(points_of(&server, &client, &reader).await?, 0);
    Ok(())
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn fee_reminders_skip_recently_reminded() -> Result<()> {
    let server = common::spawn_server_with_database().await?;
    let client = Client::new();
    let admin = register_as(&server, &client, "Reminder Admin", "admin").await?;
    let student = register(&server, &client, "Forgetful", "MECH").await?;

    let (status, _) = call(client.post(server.url("/api/fees")).bearer_auth(&admin.token).json(&json!({
        "student_id": student.user_id,
        "fee_type": "library",
        "description": "Library membership",
        "amount": 200.0,
        "due_date": (Utc::now() + Duration::days(2)).date_naive()
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let state = server.state();
    run_job(&state, JobName::FeeReminders).await?;
    assert_eq!(notifications_titled(&server, &student, "Fee due soon").await?, 1);

    run_job(&state, JobName::FeeReminders).await?;
    assert_eq!(notifications_titled(&server, &student, "Fee due soon").await?, 1);

    // Once the last reminder is a day old the fee is picked up again
    sqlx::query("UPDATE fees SET last_reminded_at = now() - INTERVAL '25 hours' WHERE student_id = $1")
        .bind(student.uuid())
        .execute(server.db.pool())
        .await?;
    run_job(&state, JobName::FeeReminders).await?;
    assert_eq!(notifications_titled(&server, &student, "Fee due soon").await?, 2);
    Ok(())
}
