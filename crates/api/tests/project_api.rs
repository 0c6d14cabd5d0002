//! Integration tests for the `/projects` command layer.

mod common;

use axum::http::{Method, StatusCode};
use common::{build_test_app, project_body};
use easyweb_core::roles::Role;
use serde_json::json;

// ---------------------------------------------------------------------------
// Create / read
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_requires_authentication() {
    let app = build_test_app();
    let (status, json) = app
        .request(Method::POST, "/api/v1/projects", None, Some(project_body("Site")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn only_clients_create_projects() {
    let app = build_test_app();
    let dev = app.user("Dana", Role::Developer).await;
    let (status, json) = app
        .request(Method::POST, "/api/v1/projects", Some(&dev), Some(project_body("Site")))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "Only clients can create projects");
}

#[tokio::test]
async fn create_starts_open_and_unassigned() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let (status, json) = app
        .request(Method::POST, "/api/v1/projects", Some(&client), Some(project_body("  Shop  ")))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let project = &json["data"];
    assert_eq!(project["title"], "Shop");
    assert_eq!(project["status"], "open");
    assert_eq!(project["clientId"], client.id.to_string());
    assert!(project["developerId"].is_null());
    assert_eq!(project["timeline"], json!([]));
}

#[tokio::test]
async fn create_rejects_non_positive_budget() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let mut body = project_body("Site");
    body["budget"] = json!(0);
    let (status, json) = app
        .request(Method::POST, "/api/v1/projects", Some(&client), Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn get_is_limited_to_participants_and_admin() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let other = app.user("Otto", Role::Client).await;
    let admin = app.user("Ada", Role::Admin).await;
    let id = app.create_project(&client, "Site").await;
    let uri = format!("/api/v1/projects/{id}");

    let (status, _) = app.request(Method::GET, &uri, Some(&client), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.request(Method::GET, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.request(Method::GET, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_and_unknown_ids() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;

    let (status, json) = app
        .request(Method::GET, "/api/v1/projects/not-a-uuid", Some(&client), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid projectId");

    let missing = uuid::Uuid::new_v4();
    let (status, json) = app
        .request(Method::GET, &format!("/api/v1/projects/{missing}"), Some(&client), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn listing_is_scoped_by_role() {
    let app = build_test_app();
    let cleo = app.user("Cleo", Role::Client).await;
    let otto = app.user("Otto", Role::Client).await;
    let dev = app.user("Dana", Role::Developer).await;

    app.create_project(&cleo, "First").await;
    app.accepted_project(&cleo, &dev).await;
    app.create_project(&otto, "Other").await;

    let (_, json) = app.request(Method::GET, "/api/v1/projects", Some(&cleo), None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
    // Newest first.
    assert_eq!(json["data"][0]["title"], "Storefront");

    let (_, json) = app.request(Method::GET, "/api/v1/projects", Some(&dev), None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let (_, json) = app
        .request(Method::GET, "/api/v1/projects?limit=1", Some(&cleo), None)
        .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let (_, json) = app
        .request(Method::GET, "/api/v1/projects/count", Some(&cleo), None)
        .await;
    assert_eq!(json["data"]["count"], 2);

    let (status, _) = app
        .request(Method::GET, "/api/v1/projects/count", Some(&dev), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn open_feed_is_developer_only_and_hides_assigned() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let dev = app.user("Dana", Role::Developer).await;
    let open = app.create_project(&client, "Open one").await;
    app.accepted_project(&client, &dev).await;

    let (status, json) = app
        .request(Method::GET, "/api/v1/projects/open", Some(&dev), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let feed = json["data"].as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["id"], open.to_string());

    let (status, _) = app
        .request(Method::GET, "/api/v1/projects/open", Some(&client), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn only_owner_edits() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let dev = app.user("Dana", Role::Developer).await;
    let id = app.accepted_project(&client, &dev).await;
    let uri = format!("/api/v1/projects/{id}");
    let body = json!({
        "title": "Renamed",
        "description": "Still a site",
        "budget": 2000.0,
        "deadline": "2031-01-01T00:00:00Z"
    });

    let (status, _) = app.request(Method::PUT, &uri, Some(&dev), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app.request(Method::PUT, &uri, Some(&client), Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["title"], "Renamed");
    assert_eq!(json["data"]["developerId"], dev.id.to_string());
}

// ---------------------------------------------------------------------------
// Accept
// ---------------------------------------------------------------------------

#[tokio::test]
async fn accept_assigns_and_records_timeline() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let dev = app.user("Dana", Role::Developer).await;
    let id = app.create_project(&client, "Site").await;

    let (status, json) = app
        .request(Method::PUT, &format!("/api/v1/projects/{id}/accept"), Some(&dev), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let project = &json["data"];
    assert_eq!(project["status"], "in progress");
    assert_eq!(project["developerId"], dev.id.to_string());
    assert!(project["acceptedAt"].is_string());
    assert_eq!(project["timeline"].as_array().unwrap().len(), 1);
    assert_eq!(project["timeline"][0]["message"], "Project accepted by developer");
}

#[tokio::test]
async fn second_accept_conflicts_and_clients_cannot_accept() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let dev = app.user("Dana", Role::Developer).await;
    let rival = app.user("Rex", Role::Developer).await;
    let id = app.accepted_project(&client, &dev).await;
    let uri = format!("/api/v1/projects/{id}/accept");

    let (status, json) = app.request(Method::PUT, &uri, Some(&rival), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");

    let (status, _) = app.request(Method::PUT, &uri, Some(&client), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accepts_have_exactly_one_winner() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let id = app.create_project(&client, "Contested").await;

    let mut developers = Vec::new();
    for n in 0..8 {
        developers.push(app.user(&format!("Dev{n}"), Role::Developer).await);
    }

    let app = std::sync::Arc::new(app);
    let handles: Vec<_> = developers
        .into_iter()
        .map(|dev| {
            let app = app.clone();
            tokio::spawn(async move {
                let (status, _) = app
                    .request(Method::PUT, &format!("/api/v1/projects/{id}/accept"), Some(&dev), None)
                    .await;
                (dev.id, status)
            })
        })
        .collect();

    let mut winners = Vec::new();
    for handle in handles {
        let (dev_id, status) = handle.await.unwrap();
        match status {
            StatusCode::OK => winners.push(dev_id),
            StatusCode::CONFLICT => {}
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(winners.len(), 1);

    let (_, json) = app
        .request(Method::GET, &format!("/api/v1/projects/{id}"), Some(&client), None)
        .await;
    assert_eq!(json["data"]["developerId"], winners[0].to_string());
    assert_eq!(json["data"]["timeline"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn timeline_update_normalizes_status() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let dev = app.user("Dana", Role::Developer).await;
    let id = app.accepted_project(&client, &dev).await;
    let uri = format!("/api/v1/projects/{id}/timeline");

    let (status, json) = app
        .request(
            Method::PUT,
            &uri,
            Some(&dev),
            Some(json!({ "status": "Testing & QA", "message": "Handing over" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "qa");

    let (status, json) = app
        .request(Method::PUT, &uri, Some(&dev), Some(json!({ "message": "Small fix" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "qa");

    let (status, json) = app.request(Method::GET, &uri, Some(&client), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = json["data"].as_array().unwrap();
    let messages: Vec<_> = entries.iter().map(|e| e["message"].as_str().unwrap()).collect();
    assert_eq!(
        messages,
        vec!["Project accepted by developer", "Handing over", "Small fix"]
    );
}

#[tokio::test]
async fn timeline_rejects_unknown_status_and_strangers() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let dev = app.user("Dana", Role::Developer).await;
    let other = app.user("Rex", Role::Developer).await;
    let id = app.accepted_project(&client, &dev).await;
    let uri = format!("/api/v1/projects/{id}/timeline");

    let (status, json) = app
        .request(Method::PUT, &uri, Some(&dev), Some(json!({ "status": "banana" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .request(Method::PUT, &uri, Some(&dev), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(Method::PUT, &uri, Some(&other), Some(json!({ "status": "completed" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::PUT, &uri, Some(&client), Some(json!({ "status": "completed" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn timeline_cannot_reopen_an_accepted_project() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let dev = app.user("Dana", Role::Developer).await;
    let id = app.accepted_project(&client, &dev).await;

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/projects/{id}/request-delete"),
            Some(&client),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app
        .request(
            Method::PUT,
            &format!("/api/v1/projects/{id}/timeline"),
            Some(&dev),
            Some(json!({ "status": "open" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let (_, json) = app
        .request(Method::GET, &format!("/api/v1/projects/{id}"), Some(&client), None)
        .await;
    assert_eq!(json["data"]["status"], "in progress");
    assert_eq!(json["data"]["developerId"], dev.id.to_string());
    assert_eq!(json["data"]["deletionRequest"]["status"], "requested");
    assert_eq!(json["data"]["timeline"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rest_chat_without_recipient_stays_unaddressed() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let dev = app.user("Dana", Role::Developer).await;
    let id = app.accepted_project(&client, &dev).await;
    let uri = format!("/api/v1/chats/{id}");

    let (status, json) = app
        .request(Method::POST, &uri, Some(&client), Some(json!({ "text": "hi" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(json["data"]["to"].is_null());

    let (status, json) = app.request(Method::GET, &uri, Some(&dev), None).await;
    assert_eq!(status, StatusCode::OK);
    let history = json["data"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["text"], "hi");
    assert!(history[0]["to"].is_null());
    assert_eq!(history[0]["from"]["id"], client.id.to_string());
}

#[tokio::test]
async fn rest_chat_requires_text_or_files() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let dev = app.user("Dana", Role::Developer).await;
    let id = app.accepted_project(&client, &dev).await;

    let (status, json) = app
        .request(
            Method::POST,
            &format!("/api/v1/chats/{id}"),
            Some(&client),
            Some(json!({ "text": "  " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Text or files are required");
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn open_project_is_deleted_directly() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let other = app.user("Otto", Role::Client).await;
    let id = app.create_project(&client, "Site").await;
    let uri = format!("/api/v1/projects/{id}");

    let (status, _) = app.request(Method::DELETE, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.request(Method::DELETE, &uri, Some(&client), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = app.request(Method::GET, &uri, Some(&client), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn accepted_project_needs_the_deletion_workflow() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let dev = app.user("Dana", Role::Developer).await;
    let id = app.accepted_project(&client, &dev).await;

    let (status, json) = app
        .request(Method::DELETE, &format!("/api/v1/projects/{id}"), Some(&client), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("request deletion"));
}

#[tokio::test]
async fn deletion_request_then_approval_removes_project_and_chat() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let dev = app.user("Dana", Role::Developer).await;
    let id = app.accepted_project(&client, &dev).await;

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/chats/{id}"),
            Some(&client),
            Some(json!({ "text": "hello" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let request_uri = format!("/api/v1/projects/{id}/request-delete");
    let (status, json) = app
        .request(
            Method::POST,
            &request_uri,
            Some(&client),
            Some(json!({ "reason": "  Budget cut " })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["deletionRequest"]["status"], "requested");
    assert_eq!(json["data"]["deletionRequest"]["reason"], "Budget cut");

    let (status, _) = app.request(Method::POST, &request_uri, Some(&client), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let approve_uri = format!("/api/v1/projects/{id}/approve-delete");
    let (status, _) = app.request(Method::POST, &approve_uri, Some(&client), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app.request(Method::POST, &approve_uri, Some(&dev), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["deletionRequest"]["status"], "approved");
    assert_eq!(json["data"]["deletionRequest"]["approvedBy"], dev.id.to_string());

    let (status, _) = app
        .request(Method::GET, &format!("/api/v1/projects/{id}"), Some(&client), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let history = app.state.stores.chats.history(id, client.id).await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn deletion_request_rules() {
    let app = build_test_app();
    let client = app.user("Cleo", Role::Client).await;
    let dev = app.user("Dana", Role::Developer).await;

    let open = app.create_project(&client, "Open").await;
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/projects/{open}/request-delete"),
            Some(&client),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let accepted = app.accepted_project(&client, &dev).await;
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/projects/{accepted}/request-delete"),
            Some(&dev),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/v1/projects/{accepted}/approve-delete"),
            Some(&dev),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
