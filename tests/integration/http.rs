//! Router tests through the full axum stack

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use libris_server::{api, models::user::UserClaims, AppState};

use crate::common::{admin, state, student, token};

fn app(state: &AppState) -> Router {
    api::create_router(state.clone())
}

async fn send(
    state: &AppState,
    method: Method,
    uri: &str,
    claims: Option<&UserClaims>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(claims) = claims {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(claims)));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_book(state: &AppState, title: &str) -> i64 {
    let (status, body) = send(
        state,
        Method::POST,
        "/api/v1/books",
        Some(&admin()),
        Some(json!({
            "title": title,
            "author": "Wole Soyinka",
            "category": "Drama"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_and_readiness() {
    let state = state();

    let (status, body) = send(&state, Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&state, Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let state = state();
    let (status, body) = send(&state, Method::GET, "/api/v1/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let state = state();
    let reader = student(1);

    let (status, _) = send(&state, Method::GET, "/api/v1/admin/borrow-requests", Some(&reader), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &state,
        Method::POST,
        "/api/v1/books",
        Some(&reader),
        Some(json!({ "title": "Kongi's Harvest", "author": "Wole Soyinka", "category": "Drama" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&state, Method::GET, "/api/v1/users/2/borrow-requests", Some(&reader), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_catalogue_lookup() {
    let state = state();
    let reader = student(1);
    let id = create_book(&state, "Death and the King's Horseman").await;

    let (status, body) = send(&state, Method::GET, "/api/v1/books?q=horseman", Some(&reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &state,
        Method::GET,
        "/api/v1/books/search?field=author&value=soyinka",
        Some(&reader),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(&state, Method::GET, &format!("/api/v1/books/{}", id), Some(&reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "available");

    let (status, body) = send(&state, Method::GET, "/api/v1/books/999", Some(&reader), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 20);
}

#[tokio::test]
async fn test_borrow_flow_over_http() {
    let state = state();
    let reader = student(7);
    let book_id = create_book(&state, "The Lion and the Jewel").await;

    let (status, body) = send(
        &state,
        Method::POST,
        "/api/v1/cart/items",
        Some(&reader),
        Some(json!({ "book_id": book_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lines"].as_array().unwrap().len(), 1);
    assert_eq!(body["quota"], 3);

    let (status, body) = send(
        &state,
        Method::POST,
        "/api/v1/cart/checkout",
        Some(&reader),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = body[0]["id"].as_i64().unwrap();
    assert_eq!(body[0]["status"], "pending");

    let (status, body) = send(&state, Method::GET, "/api/v1/users/7/eligibility", Some(&reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_active_borrow"], true);

    let (status, body) = send(
        &state,
        Method::POST,
        &format!("/api/v1/admin/borrow-requests/{}/accept", request_id),
        Some(&admin()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let (_, body) = send(&state, Method::GET, &format!("/api/v1/books/{}", book_id), Some(&reader), None).await;
    assert_eq!(body["status"], "borrowed");

    let (status, body) = send(&state, Method::GET, "/api/v1/users/7/borrow-requests", Some(&reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["days_left"], 5);

    let (status, body) = send(
        &state,
        Method::POST,
        &format!("/api/v1/borrow-requests/{}/return", request_id),
        Some(&reader),
        Some(json!({ "role": "staff" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 22);
}

#[tokio::test]
async fn test_quota_error_code() {
    let state = state();
    let reader = student(3);

    for i in 0..4 {
        let book_id = create_book(&state, &format!("Aké {}", i)).await;
        let (status, body) = send(
            &state,
            Method::POST,
            "/api/v1/cart/items",
            Some(&reader),
            Some(json!({ "book_id": book_id, "flow": "search" })),
        )
        .await;
        if i < 3 {
            assert_eq!(status, StatusCode::OK);
        } else {
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(body["code"], 11);
        }
    }
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let state = state();
    let (status, body) = send(&state, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Libris API");
}
