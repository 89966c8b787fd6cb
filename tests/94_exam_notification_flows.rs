//! Result publishing and bulk notifications against a real Postgres
//!
//! Run with `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.

mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::json;
use uuid::Uuid;

use common::{call, notifications_titled, register, register_as, Session, TestServer};

async fn unread(server: &TestServer, client: &Client, session: &Session) -> Result<i64> {
    let (_, body) = call(client.get(server.url("/api/notifications/unread-count")).bearer_auth(&session.token)).await?;
    Ok(body["data"]["count"].as_i64().unwrap_or_default())
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn publish_rejects_bad_batches_per_student() -> Result<()> {
    let server = common::spawn_server_with_database().await?;
    let client = Client::new();
    let faculty = register_as(&server, &client, "Examiner", "faculty").await?;
    let first = register(&server, &client, "Topper", "CSE").await?;
    let second = register(&server, &client, "Steady", "CSE").await?;

    let (status, exam) = call(client.post(server.url("/api/exams")).bearer_auth(&faculty.token).json(&json!({
        "title": "Operating Systems Midterm",
        "subject": "Operating Systems",
        "exam_type": "midterm",
        "department": "CSE",
        "semester": 5,
        "exam_date": Utc::now() + Duration::days(3),
        "duration_minutes": 90,
        "venue": "Hall B",
        "max_marks": 100.0
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let results_url = server.url(&format!("/api/exams/{}/results", exam["data"]["id"].as_str().unwrap_or_default()));

    // Students cannot publish
    let (status, _) = call(
        client
            .post(&results_url)
            .bearer_auth(&first.token)
            .json(&json!([{ "student_id": first.user_id, "marks_obtained": 100.0 }])),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(client.post(&results_url).bearer_auth(&faculty.token).json(&json!([
        { "student_id": first.user_id, "marks_obtained": 91.0 },
        { "student_id": first.user_id, "marks_obtained": 40.0 }
    ])))
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["field_errors"][&first.user_id].is_string());

    // Staff ids and unknown ids are not students
    let stranger = Uuid::new_v4().to_string();
    let (status, body) = call(client.post(&results_url).bearer_auth(&faculty.token).json(&json!([
        { "student_id": first.user_id, "marks_obtained": 91.0 },
        { "student_id": stranger, "marks_obtained": 50.0 },
        { "student_id": faculty.user_id, "marks_obtained": 50.0 }
    ])))
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["field_errors"][&stranger], "Not an active student");
    assert_eq!(body["field_errors"][&faculty.user_id], "Not an active student");
    assert!(body["field_errors"][&first.user_id].is_null());

    // Nothing from the rejected batches was stored
    let (_, stored) = call(client.get(&results_url).bearer_auth(&faculty.token)).await?;
    assert_eq!(stored["data"].as_array().map(Vec::len), Some(0));

    let (status, published) = call(client.post(&results_url).bearer_auth(&faculty.token).json(&json!([
        { "student_id": first.user_id, "marks_obtained": 91.0 },
        { "student_id": second.user_id, "marks_obtained": 64.0, "remarks": "Revise scheduling" }
    ])))
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["message"], "Published 2 results");

    let (_, transcript) = call(client.get(server.url("/api/exams/results/me")).bearer_auth(&first.token)).await?;
    assert_eq!(transcript["data"]["results"][0]["grade"], "O");
    assert_eq!(transcript["data"]["gpa"], 10.0);
    assert_eq!(notifications_titled(&server, &second, "Result published").await?, 1);
    Ok(())
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn bulk_notification_reaches_listed_users() -> Result<()> {
    let server = common::spawn_server_with_database().await?;
    let client = Client::new();
    let admin = register_as(&server, &client, "Announcer", "admin").await?;
    let first = register(&server, &client, "Listener One", "ECE").await?;
    let second = register(&server, &client, "Listener Two", "ECE").await?;
    let bystander = register(&server, &client, "Bystander", "ECE").await?;

    let before = unread(&server, &client, &bystander).await?;
    let title = format!("Campus closed {}", Uuid::new_v4().simple());

    // Only admins broadcast
    let (status, _) = call(client.post(server.url("/api/notifications/bulk")).bearer_auth(&first.token).json(&json!({
        "user_ids": [first.user_id],
        "title": title,
        "message": "Heavy rain"
    })))
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(client.post(server.url("/api/notifications/bulk")).bearer_auth(&admin.token).json(&json!({
        "user_ids": [first.user_id, second.user_id],
        "kind": "system",
        "title": title,
        "message": "Heavy rain, classes move online"
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["sent"], 2);

    for listener in [&first, &second] {
        assert_eq!(notifications_titled(&server, listener, &title).await?, 1);
        assert!(unread(&server, &client, listener).await? >= 1);
    }
    assert_eq!(notifications_titled(&server, &bystander, &title).await?, 0);
    assert_eq!(unread(&server, &client, &bystander).await?, before);

    let (status, _) = call(client.post(server.url("/api/notifications/bulk")).bearer_auth(&admin.token).json(&json!({
        "user_ids": [first.user_id],
        "title": "  ",
        "message": "Blank title"
    })))
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
