mod common;

use axum::http::{Method, StatusCode};
use common::{send, test_app};
use serde_json::json;

#[tokio::test]
async fn create_then_fetch_item() {
    let app = test_app();

    let created = send(
        &app,
        Method::POST,
        "/api/v1/example",
        Some(json!({"name": "Widget", "description": "A small widget"})),
        None,
    )
    .await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.body["message"], "Data created successfully");
    assert_eq!(created.body["data"]["name"], "Widget");
    assert_eq!(created.body["data"]["description"], "A small widget");
    let id = created.body["data"]["id"].as_i64().unwrap();

    let fetched = send(&app, Method::GET, &format!("/api/v1/example/{id}"), None, None).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body["message"], "Data retrieved successfully");
    assert_eq!(fetched.body["data"]["id"], id);
    assert!(fetched.body["data"]["createdAt"].is_string());
}

#[tokio::test]
async fn create_without_name_reports_required_with_example_code() {
    let app = test_app();

    let resp = send(&app, Method::POST, "/api/v1/example", Some(json!({})), None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.body,
        json!({
            "type": "bad_request",
            "error": {
                "message": "Validation failed",
                "code": 40001,
                "info": [{"field": "name", "message": "name is required", "code": "REQUIRED"}]
            }
        })
    );
}

#[tokio::test]
async fn short_name_is_invalid_string() {
    let app = test_app();

    let resp = send(&app, Method::POST, "/api/v1/example", Some(json!({"name": "Jo"})), None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    let info = resp.body["error"]["info"].as_array().unwrap();
    assert_eq!(info.len(), 1);
    assert_eq!(info[0]["code"], "INVALID_STRING");
    assert_eq!(info[0]["message"], "name must be between 3 and 50 characters");
}

#[tokio::test]
async fn form_encoded_body_is_validated_like_json() {
    let app = test_app();
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/example")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(axum::body::Body::from("name=Gadget"))
        .unwrap();

    let resp = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn list_paginates_with_defaults() {
    let app = test_app();
    for name in ["Alpha", "Bravo", "Charlie"] {
        send(&app, Method::POST, "/api/v1/example", Some(json!({"name": name})), None).await;
    }

    let resp = send(&app, Method::GET, "/api/v1/example", None, None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["data"]["data"].as_array().unwrap().len(), 3);
    assert_eq!(
        resp.body["data"]["pagination"],
        json!({"page": 1, "limit": 10, "total": 3, "totalPages": 1})
    );

    let resp = send(&app, Method::GET, "/api/v1/example?page=2&limit=2", None, None).await;
    assert_eq!(resp.body["data"]["data"].as_array().unwrap().len(), 1);
    assert_eq!(resp.body["data"]["data"][0]["name"], "Charlie");
    assert_eq!(resp.body["data"]["pagination"]["totalPages"], 2);
}

#[tokio::test]
async fn huge_page_returns_empty_list() {
    let app = test_app();
    send(&app, Method::POST, "/api/v1/example", Some(json!({"name": "Alpha"})), None).await;

    let resp = send(
        &app,
        Method::GET,
        "/api/v1/example?page=9223372036854775807&limit=100",
        None,
        None,
    )
    .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body["data"]["data"].as_array().unwrap().is_empty());
    assert_eq!(resp.body["data"]["pagination"]["page"], i64::MAX);
    assert_eq!(resp.body["data"]["pagination"]["total"], 1);
}

#[tokio::test]
async fn non_numeric_id_is_bad_request() {
    let app = test_app();

    let resp = send(&app, Method::GET, "/api/v1/example/abc", None, None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.body,
        json!({"type": "bad_request", "error": {"message": "ID is required"}})
    );
}

#[tokio::test]
async fn missing_item_is_not_found() {
    let app = test_app();

    let resp = send(&app, Method::GET, "/api/v1/example/999", None, None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body, json!({"type": "not_found", "message": "Data not found"}));
}

#[tokio::test]
async fn update_keeps_untouched_fields() {
    let app = test_app();
    let created = send(
        &app,
        Method::POST,
        "/api/v1/example",
        Some(json!({"name": "Widget", "description": "first"})),
        None,
    )
    .await;
    let id = created.body["data"]["id"].as_i64().unwrap();

    let updated = send(
        &app,
        Method::PUT,
        &format!("/api/v1/example/{id}"),
        Some(json!({"description": "second"})),
        None,
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["message"], "Data updated successfully");
    assert_eq!(updated.body["data"]["name"], "Widget");
    assert_eq!(updated.body["data"]["description"], "second");

    let invalid = send(
        &app,
        Method::PUT,
        &format!("/api/v1/example/{id}"),
        Some(json!({"name": 42})),
        None,
    )
    .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.body["error"]["code"], 40001);
}

#[tokio::test]
async fn delete_answers_with_id_then_not_found() {
    let app = test_app();
    let created = send(&app, Method::POST, "/api/v1/example", Some(json!({"name": "Temp"})), None).await;
    let id = created.body["data"]["id"].as_i64().unwrap();

    let deleted = send(&app, Method::DELETE, &format!("/api/v1/example/{id}"), None, None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(
        deleted.body,
        json!({"message": "Data deleted successfully", "data": {"id": id}})
    );

    let again = send(&app, Method::DELETE, &format!("/api/v1/example/{id}"), None, None).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = test_app();
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/example")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"name\":"))
        .unwrap();

    let resp = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
