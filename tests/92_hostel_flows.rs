//! Hostel rooms, allocations and complaints against a real Postgres
//!
//! Run with `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.

mod common;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use common::{call, register, register_as, Session, TestServer};

async fn room(server: &TestServer, client: &Client, warden: &Session, hostel: &str, capacity: i32) -> Result<Value> {
    let (status, body) = call(client.post(server.url("/api/hostel/rooms")).bearer_auth(&warden.token).json(&json!({
        "hostel_name": hostel,
        "room_number": "101",
        "room_type": "single",
        "capacity": capacity,
        "fee_per_semester": 12000.0
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(body["data"].clone())
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn allocation_keeps_occupancy_consistent() -> Result<()> {
    let server = common::spawn_server_with_database().await?;
    let client = Client::new();
    let warden = register_as(&server, &client, "Warden", "warden").await?;
    let first = register(&server, &client, "First Resident", "CSE").await?;
    let second = register(&server, &client, "Second Resident", "CSE").await?;

    let hostel = format!("Block {}", Uuid::new_v4().simple());
    let single = room(&server, &client, &warden, &hostel, 1).await?;
    let other_hostel = format!("Annex {}", Uuid::new_v4().simple());
    let spare = room(&server, &client, &warden, &other_hostel, 2).await?;

    // Students cannot allocate
    let (status, _) = call(client.post(server.url("/api/hostel/allocations")).bearer_auth(&first.token).json(&json!({
        "student_id": first.user_id,
        "room_id": single["id"]
    })))
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, allocation) = call(client.post(server.url("/api/hostel/allocations")).bearer_auth(&warden.token).json(&json!({
        "student_id": first.user_id,
        "room_id": single["id"],
        "create_fee": true
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(allocation["data"]["room"]["occupied"], 1);

    // Room is full
    let (status, _) = call(client.post(server.url("/api/hostel/allocations")).bearer_auth(&warden.token).json(&json!({
        "student_id": second.user_id,
        "room_id": single["id"]
    })))
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // One active allocation per student
    let (status, _) = call(client.post(server.url("/api/hostel/allocations")).bearer_auth(&warden.token).json(&json!({
        "student_id": first.user_id,
        "room_id": spare["id"]
    })))
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // Capacity cannot drop below the one occupant
    let (status, _) = call(
        client
            .put(server.url(&format!("/api/hostel/rooms/{}", single["id"].as_str().unwrap_or_default())))
            .bearer_auth(&warden.token)
            .json(&json!({ "capacity": 0 })),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, mine) = call(client.get(server.url("/api/hostel/allocations/me")).bearer_auth(&first.token)).await?;
    assert_eq!(mine["data"]["room"]["id"], single["id"]);
    let (_, none) = call(client.get(server.url("/api/hostel/allocations/me")).bearer_auth(&second.token)).await?;
    assert!(none["data"].is_null());

    let (_, fees) = call(client.get(server.url("/api/fees")).bearer_auth(&first.token)).await?;
    let fee_types: Vec<&str> = fees["data"]["items"]
        .as_array()
        .map(|items| items.iter().filter_map(|f| f["fee_type"].as_str()).collect())
        .unwrap_or_default();
    assert!(fee_types.contains(&"hostel"));

    let allocation_id = allocation["data"]["id"].as_str().unwrap_or_default().to_string();
    let (status, _) = call(
        client
            .post(server.url(&format!("/api/hostel/allocations/{}/vacate", allocation_id)))
            .bearer_auth(&warden.token),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        client
            .post(server.url(&format!("/api/hostel/allocations/{}/vacate", allocation_id)))
            .bearer_auth(&warden.token),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, room_after) = call(
        client
            .get(server.url(&format!("/api/hostel/rooms/{}", single["id"].as_str().unwrap_or_default())))
            .bearer_auth(&second.token),
    )
    .await?;
    assert_eq!(room_after["data"]["occupied"], 0);

    // The freed bed goes to the next student
    let (status, _) = call(client.post(server.url("/api/hostel/allocations")).bearer_auth(&warden.token).json(&json!({
        "student_id": second.user_id,
        "room_id": single["id"]
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
#[ignore = "needs TEST_DATABASE_URL"]
async fn complaint_status_moves_forward_only() -> Result<()> {
    let server = common::spawn_server_with_database().await?;
    let client = Client::new();
    let warden = register_as(&server, &client, "Complaint Warden", "warden").await?;
    let resident = register(&server, &client, "Resident", "EEE").await?;
    let outsider = register(&server, &client, "Day Scholar", "EEE").await?;

    let hostel = format!("Block {}", Uuid::new_v4().simple());
    let single = room(&server, &client, &warden, &hostel, 1).await?;
    let (status, _) = call(client.post(server.url("/api/hostel/allocations")).bearer_auth(&warden.token).json(&json!({
        "student_id": resident.user_id,
        "room_id": single["id"]
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let complaint = json!({ "category": "plumbing", "description": "The tap in the washroom leaks" });

    // Needs an active allocation
    let (status, _) = call(client.post(server.url("/api/hostel/complaints")).bearer_auth(&outsider.token).json(&complaint)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, filed) = call(client.post(server.url("/api/hostel/complaints")).bearer_auth(&resident.token).json(&complaint)).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(filed["data"]["room_id"], single["id"]);
    assert_eq!(filed["data"]["status"], "open");
    let status_url = server.url(&format!(
        "/api/hostel/complaints/{}/status",
        filed["data"]["id"].as_str().unwrap_or_default()
    ));

    // Residents cannot move their own complaint
    let (status, _) = call(client.put(&status_url).bearer_auth(&resident.token).json(&json!({ "status": "resolved" }))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, progress) = call(client.put(&status_url).bearer_auth(&warden.token).json(&json!({ "status": "in_progress" }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(progress["data"]["resolved_at"].is_null());

    let (status, resolved) = call(client.put(&status_url).bearer_auth(&warden.token).json(&json!({ "status": "resolved" }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(resolved["data"]["resolved_at"].is_string());

    let (status, _) = call(client.put(&status_url).bearer_auth(&warden.token).json(&json!({ "status": "open" }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Residents see their own complaints only
    let (_, own) = call(client.get(server.url("/api/hostel/complaints")).bearer_auth(&resident.token)).await?;
    assert_eq!(own["data"]["total"], 1);
    let (_, none) = call(client.get(server.url("/api/hostel/complaints")).bearer_auth(&outsider.token)).await?;
    assert_eq!(none["data"]["total"], 0);
    Ok(())
}
