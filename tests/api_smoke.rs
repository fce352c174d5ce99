use std::collections::HashMap;

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::Query,
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use tour_admin_rust::access::load_permissions;
use tour_admin_rust::envelope::{ListEnvelope, parse_list, parse_records};
use tour_admin_rust::services::{InMemoryService, PanelContext, PanelError, Role};
use tour_admin_rust::{service_items, tours};

fn admin_ctx() -> PanelContext {
    let mut ctx = PanelContext::default();
    ctx.user_info.id = 1;
    ctx.user_info.name = "Platform Ops".into();
    ctx.user_info.is_guest = false;
    ctx.user_info.role = Role::Admin;
    ctx
}

fn agency_ctx(agency_id: i64) -> PanelContext {
    let mut ctx = PanelContext::default();
    ctx.user_info.id = 20;
    ctx.user_info.is_guest = false;
    ctx.user_info.role = Role::Agency;
    ctx.user_info.agency_id = Some(agency_id);
    ctx
}

fn error_status(err: &PanelError) -> StatusCode {
    match err {
        PanelError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        PanelError::SessionTimeout => StatusCode::UNAUTHORIZED,
        PanelError::Validation(_) | PanelError::InvalidPageSize(_) | PanelError::BadEnvelope(_) => {
            StatusCode::BAD_REQUEST
        }
        PanelError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// Trimmed-down copy of the api binary's wiring: one wrapped listing, one
// bare listing, one agency route driven by the suspended sample agency.
fn panel_app(service: InMemoryService) -> Router {
    let tours_service = service.clone();
    let bare_service = service.clone();
    Router::new()
        .route(
            "/admin/tours",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let service = tours_service.clone();
                async move {
                    let mut ctx = admin_ctx();
                    for (key, value) in params {
                        ctx.request.set(&key, value);
                    }
                    if let Err(err) = load_permissions(&service, &mut ctx) {
                        return error_status(&err).into_response();
                    }
                    match tours::list_tours(&service, &mut ctx) {
                        Ok(()) => {
                            let body = json!({
                                "data": ctx.view.get("tour_list").cloned().unwrap_or_else(|| json!([])),
                                "pagination": ctx.view.get("tour_pages").cloned().unwrap_or(Value::Null),
                            });
                            (StatusCode::OK, Json(body)).into_response()
                        }
                        Err(err) => error_status(&err).into_response(),
                    }
                }
            }),
        )
        .route(
            "/admin/services",
            get(move || {
                let service = bare_service.clone();
                async move {
                    let mut ctx = admin_ctx();
                    if let Err(err) = load_permissions(&service, &mut ctx) {
                        return error_status(&err).into_response();
                    }
                    match service_items::list_service_items(&service, &mut ctx) {
                        Ok(()) => {
                            let rows = ctx
                                .view
                                .get("service_list")
                                .cloned()
                                .unwrap_or_else(|| json!([]));
                            (StatusCode::OK, Json(rows)).into_response()
                        }
                        Err(err) => error_status(&err).into_response(),
                    }
                }
            }),
        )
        .route(
            "/agency/tours",
            get(move |headers: HeaderMap| {
                let service = service.clone();
                async move {
                    let mut ctx = agency_ctx(3);
                    if headers.get("x-session-expired").is_some() {
                        ctx.session.set("force_timeout", true);
                    }
                    let result = load_permissions(&service, &mut ctx)
                        .and_then(|_| tours::list_tours(&service, &mut ctx));
                    match result {
                        Ok(()) => StatusCode::OK.into_response(),
                        Err(err) => error_status(&err).into_response(),
                    }
                }
            }),
        )
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn wrapped_listings_round_trip_over_http() {
    let app = panel_app(InMemoryService::default());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/tours")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_text(response).await;
    let envelope: ListEnvelope<Value> = parse_list(&text).unwrap();
    assert!(envelope.server_pagination().is_some());
    assert_eq!(envelope.records().len(), 5);
}

#[tokio::test]
async fn query_filters_reach_the_table() {
    let app = panel_app(InMemoryService::default());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/tours?q=kyoto")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_text(response).await;
    let records: Vec<Value> = parse_records(&text).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["title"], "Kyoto Autumn Leaves");
}

#[tokio::test]
async fn zero_page_size_is_a_bad_request() {
    let app = panel_app(InMemoryService::default());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/tours?per_page=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bare_listings_parse_without_an_envelope() {
    let app = panel_app(InMemoryService::default());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/services")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_text(response).await;
    let envelope: ListEnvelope<Value> = parse_list(&text).unwrap();
    assert!(envelope.server_pagination().is_none());
    assert_eq!(envelope.records().len(), 4);
}

#[tokio::test]
async fn suspended_agencies_are_forbidden() {
    let app = panel_app(InMemoryService::default());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/agency/tours")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn expired_sessions_are_unauthorized() {
    let app = panel_app(InMemoryService::default());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/agency/tours")
                .header("x-session-expired", "1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
