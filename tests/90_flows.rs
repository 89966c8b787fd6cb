//! End-to-end flows against a real Postgres
//!
//! Run with `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.

mod common;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use common::{register, register_as, unique_email, PASSWORD};

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn register_login_and_profile() -> Result<()> {
    let server = common::spawn_server_with_database().await?;
    let client = Client::new();
    let email = unique_email("ada");

    let res = client
        .post(server.url("/auth/register"))
        .json(&json!({ "name": "Ada Lovelace", "email": email, "password": PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["user"]["role"], "student");
    assert!(body["data"]["user"].get("password_hash").is_none());

    let res = client
        .post(server.url("/auth/register"))
        .json(&json!({ "name": "Ada Again", "email": email, "password": PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": email, "password": "wrong-password-1" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": email.to_uppercase(), "password": PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    let access = body["data"]["access_token"].as_str().unwrap_or_default().to_string();
    let refresh = body["data"]["refresh_token"].as_str().unwrap_or_default().to_string();

    let res = client.get(server.url("/api/auth/me")).bearer_auth(&access).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await?;
    assert_eq!(me["data"]["email"], email);

    let res = client
        .post(server.url("/auth/refresh"))
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // Students are not admins
    let res = client.get(server.url("/api/users")).bearer_auth(&access).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn library_issue_and_return() -> Result<()> {
    let server = common::spawn_server_with_database().await?;
    let client = Client::new();

    let librarian = register_as(&server, &client, "Librarian", "librarian").await?;
    let reader = register(&server, &client, "Reader", "CSE").await?;
    let other = register(&server, &client, "Other", "CSE").await?;

    let res = client
        .post(server.url("/api/library/books"))
        .bearer_auth(&librarian.token)
        .json(&json!({
            "title": "Structure and Interpretation of Computer Programs",
            "author": "Abelson and Sussman",
            "isbn": format!("isbn-{}", uuid::Uuid::new_v4().simple()),
            "category": "Computer Science",
            "total_copies": 1
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let book: Value = res.json().await?;
    let book_id = book["data"]["id"].as_str().unwrap_or_default().to_string();

    // Students cannot issue books
    let res = client
        .post(server.url("/api/library/issues"))
        .bearer_auth(&reader.token)
        .json(&json!({ "book_id": book_id, "user_id": reader.user_id }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(server.url("/api/library/issues"))
        .bearer_auth(&librarian.token)
        .json(&json!({ "book_id": book_id, "user_id": reader.user_id }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let issue: Value = res.json().await?;
    let issue_id = issue["data"]["id"].as_str().unwrap_or_default().to_string();

    // The only copy is out
    let res = client
        .post(server.url("/api/library/issues"))
        .bearer_auth(&librarian.token)
        .json(&json!({ "book_id": book_id, "user_id": other.user_id }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Stock cannot shrink below what is on loan
    let res = client
        .put(server.url(&format!("/api/library/books/{}", book_id)))
        .bearer_auth(&librarian.token)
        .json(&json!({ "total_copies": 0 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(server.url(&format!("/api/library/issues/{}/return", issue_id)))
        .bearer_auth(&librarian.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let returned: Value = res.json().await?;
    assert_eq!(returned["data"]["status"], "returned");
    assert_eq!(returned["data"]["fine"], 0.0);

    let res = client
        .get(server.url("/api/gamification/profile"))
        .bearer_auth(&reader.token)
        .send()
        .await?;
    let profile: Value = res.json().await?;
    assert!(profile["data"]["points"].as_i64().unwrap_or_default() >= 10);
    Ok(())
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn fee_payment_marks_fee_paid() -> Result<()> {
    let server = common::spawn_server_with_database().await?;
    let client = Client::new();

    let admin = register_as(&server, &client, "Bursar", "admin").await?;
    let student = register(&server, &client, "Payer", "CSE").await?;

    let due = (chrono::Utc::now() + chrono::Duration::days(20)).date_naive();
    let res = client
        .post(server.url("/api/fees"))
        .bearer_auth(&admin.token)
        .json(&json!({
            "student_id": student.user_id,
            "fee_type": "tuition",
            "description": "Semester 5 tuition",
            "amount": 1500.0,
            "due_date": due
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let fee: Value = res.json().await?;
    let fee_id = fee["data"]["id"].as_str().unwrap_or_default().to_string();

    // More than outstanding
    let res = client
        .post(server.url(&format!("/api/fees/{}/pay", fee_id)))
        .bearer_auth(&student.token)
        .json(&json!({ "amount": 2000.0 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(server.url(&format!("/api/fees/{}/pay", fee_id)))
        .bearer_auth(&student.token)
        .json(&json!({ "amount": 1500.0, "method": "upi" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let payment: Value = res.json().await?;
    assert_eq!(payment["data"]["status"], "success");
    assert!(payment["data"]["transaction_id"].as_str().is_some_and(|t| t.starts_with("TXN")));

    let res = client
        .post(server.url(&format!("/api/fees/{}/pay", fee_id)))
        .bearer_auth(&student.token)
        .json(&json!({ "amount": 1.0 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client.get(server.url("/api/fees/summary")).bearer_auth(&student.token).send().await?;
    let summary: Value = res.json().await?;
    assert_eq!(summary["data"]["outstanding"], 0.0);

    let res = client.get(server.url("/api/notifications/unread-count")).bearer_auth(&student.token).send().await?;
    let unread: Value = res.json().await?;
    assert!(unread["data"]["count"].as_i64().unwrap_or_default() >= 2);
    Ok(())
}
