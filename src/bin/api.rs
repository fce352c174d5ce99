use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use dotenvy::dotenv;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::{collections::HashMap, env, net::SocketAddr, time::Duration};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tour_admin_rust::{
    access::load_permissions,
    agencies, audit,
    auth::AuthClaims,
    bookings, commissions, dashboard,
    db::{connect_pool, upsert_panel_user_by_sub, DbConfig},
    endpoints::Resource,
    export,
    navigation::{panel_main, prepare_view_context},
    payments, promotions, refunds,
    scheduled::run_scheduled_tasks,
    service_items,
    services::{
        AgencyStatus, BookingStatus, InMemoryService, PanelContext, PanelError, Role,
    },
    tours,
};

const SWEEP_INTERVAL_SECS: u64 = 3600;

#[derive(Clone)]
struct AppState {
    db: PgPool,
    panel: InMemoryService,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let db_config = DbConfig::from_env();
    let db = connect_pool(&db_config).expect("failed to configure postgres pool");
    info!(db = %db_config.redacted_url(), "postgres pool configured");

    let panel = InMemoryService::new_with_sample();
    let sweeper = panel.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(SWEEP_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            if let Err(err) = run_scheduled_tasks(&sweeper) {
                error!(error = %err, "scheduled sweep failed");
            }
        }
    });

    let state = AppState { db, panel };
    let app = Router::new()
        .route("/health", get(health))
        .route("/ui", get(ui))
        .route("/:role/export/bookings", get(export_bookings))
        .route("/:role/menu", get(panel_menu))
        .route("/:role/:resource", get(list_resource).post(create_resource))
        .route("/:role/:resource/:id", get(resource_detail))
        .route("/:role/:resource/:id/:verb", post(resource_action))
        .with_state(state);

    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".into())
        .parse()
        .expect("invalid BIND_ADDR, expected host:port");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind HTTP listener");
    info!("API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server crashed");
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"status": "error", "message": "not found"})),
    )
        .into_response()
}

fn error_response(err: PanelError) -> Response {
    let status = match err {
        PanelError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        PanelError::SessionTimeout => StatusCode::UNAUTHORIZED,
        PanelError::Validation(_) | PanelError::InvalidPageSize(_) | PanelError::BadEnvelope(_) => {
            StatusCode::BAD_REQUEST
        }
        PanelError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(json!({ "status": "error", "message": err.to_string() })),
    )
        .into_response()
}

// The path prefix must match the role baked into the token.
fn ensure_panel_role(claims: &AuthClaims, segment: &str) -> Result<Role, Response> {
    let Some(role) = Role::from_prefix(segment) else {
        return Err(not_found());
    };
    if claims.panel_role() != role {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({"status": "error", "message": "wrong panel for this token"})),
        )
            .into_response());
    }
    Ok(role)
}

fn panel_context(claims: &AuthClaims, params: &HashMap<String, String>) -> PanelContext {
    let mut ctx = PanelContext::default();
    ctx.user_info = claims.user_info();
    for (key, value) in params {
        ctx.request.set(key, value.clone());
    }
    ctx
}

fn list_body(ctx: &PanelContext, data_key: &str, pages_key: &str, summary_keys: &[&str]) -> Value {
    let mut body = json!({
        "data": ctx.view.get(data_key).cloned().unwrap_or_else(|| json!([])),
        "pagination": ctx.view.get(pages_key).cloned().unwrap_or(Value::Null),
    });
    if !summary_keys.is_empty() {
        let mut summary = serde_json::Map::new();
        for key in summary_keys {
            summary.insert(
                (*key).to_string(),
                ctx.view.get(key).cloned().unwrap_or(Value::Null),
            );
        }
        body["summary"] = Value::Object(summary);
    }
    body
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db_status = match sqlx::query_scalar::<_, i32>("select 1")
        .fetch_one(&state.db)
        .await
    {
        Ok(_) => json!({"status": "ok"}),
        Err(err) => {
            error!(error = %err, "database connectivity check failed");
            json!({"status": "error", "message": err.to_string()})
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "service": "ok",
            "db": db_status,
            "timestamp": Utc::now()
        })),
    )
}

async fn panel_menu(
    State(state): State<AppState>,
    Path(role_seg): Path<String>,
    claims: AuthClaims,
) -> Response {
    if let Err(response) = ensure_panel_role(&claims, &role_seg) {
        return response;
    }
    let mut ctx = panel_context(&claims, &HashMap::new());
    if let Err(err) = load_permissions(&state.panel, &mut ctx) {
        return error_response(err);
    }
    match panel_main(&state.panel, &mut ctx) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "menu": ctx.view.get("panel_menu").cloned().unwrap_or(Value::Null),
                "recent_activity": ctx.view.get("recent_activity").cloned().unwrap_or(Value::Null),
            })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_resource(
    State(state): State<AppState>,
    Path((role_seg, resource_seg)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    claims: AuthClaims,
) -> Response {
    if let Err(response) = ensure_panel_role(&claims, &role_seg) {
        return response;
    }
    let Some(resource) = Resource::from_segment(&resource_seg) else {
        return not_found();
    };
    let mut ctx = panel_context(&claims, &params);
    if let Err(err) = load_permissions(&state.panel, &mut ctx) {
        return error_response(err);
    }
    prepare_view_context(&mut ctx, resource.segment());
    let service = &state.panel;
    let result = match resource {
        Resource::Tours => {
            tours::list_tours(service, &mut ctx).map(|_| list_body(&ctx, "tour_list", "tour_pages", &[]))
        }
        Resource::Bookings => bookings::list_bookings(service, &mut ctx)
            .map(|_| list_body(&ctx, "booking_list", "booking_pages", &["booking_status_counts"])),
        Resource::Payments => payments::list_payments(service, &mut ctx)
            .map(|_| list_body(&ctx, "payment_list", "payment_pages", &["payment_totals"])),
        Resource::Commissions => commissions::list_commissions(service, &mut ctx).map(|_| {
            list_body(
                &ctx,
                "commission_list",
                "commission_pages",
                &["commission_outstanding"],
            )
        }),
        Resource::Refunds => refunds::list_refunds(service, &mut ctx)
            .map(|_| list_body(&ctx, "refund_list", "refund_pages", &["refund_open_count"])),
        Resource::Promotions => promotions::list_promotions(service, &mut ctx)
            .map(|_| list_body(&ctx, "promotion_list", "promotion_pages", &[])),
        // the services table answers as a bare array, clients must cope with both shapes
        Resource::Services => service_items::list_service_items(service, &mut ctx)
            .map(|_| ctx.view.get("service_list").cloned().unwrap_or_else(|| json!([]))),
        Resource::Agencies => agencies::list_agencies(service, &mut ctx)
            .map(|_| list_body(&ctx, "agency_list", "agency_pages", &[])),
        Resource::AuditLog => audit::list_audit_log(service, &mut ctx)
            .map(|_| list_body(&ctx, "audit_log", "audit_pages", &[])),
        Resource::Dashboard => dashboard::panel_dashboard(service, &mut ctx).map(|_| {
            json!({
                "cards": ctx.view.get("dashboard_cards").cloned().unwrap_or(Value::Null),
                "booking_trend": ctx.view.get("booking_trend").cloned().unwrap_or(Value::Null),
                "booking_status_distribution": ctx
                    .view
                    .get("booking_status_distribution")
                    .cloned()
                    .unwrap_or(Value::Null),
                "top_tours": ctx.view.get("top_tours").cloned().unwrap_or(Value::Null),
                "agency_leaderboard": ctx
                    .view
                    .get("agency_leaderboard")
                    .cloned()
                    .unwrap_or(Value::Null),
                "as_of": ctx.view.get("as_of").cloned().unwrap_or(Value::Null),
            })
        }),
    };
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn resource_detail(
    State(state): State<AppState>,
    Path((role_seg, resource_seg, id)): Path<(String, String, i64)>,
    Query(params): Query<HashMap<String, String>>,
    claims: AuthClaims,
) -> Response {
    if let Err(response) = ensure_panel_role(&claims, &role_seg) {
        return response;
    }
    let Some(resource) = Resource::from_segment(&resource_seg) else {
        return not_found();
    };
    let mut ctx = panel_context(&claims, &params);
    if let Err(err) = load_permissions(&state.panel, &mut ctx) {
        return error_response(err);
    }
    let service = &state.panel;
    let result = match resource {
        Resource::Tours => tours::tour_detail(service, &mut ctx, id)
            .map(|_| ctx.view.get("tour").cloned().unwrap_or(Value::Null)),
        Resource::Bookings => bookings::booking_detail(service, &mut ctx, id).map(|_| {
            json!({
                "booking": ctx.view.get("booking").cloned().unwrap_or(Value::Null),
                "payments": ctx.view.get("booking_payments").cloned().unwrap_or(Value::Null),
            })
        }),
        Resource::Payments => payments::payment_detail(service, &mut ctx, id).map(|_| {
            json!({
                "payment": ctx.view.get("payment").cloned().unwrap_or(Value::Null),
                "refunds": ctx.view.get("payment_refunds").cloned().unwrap_or(Value::Null),
            })
        }),
        Resource::Agencies => agencies::agency_detail(service, &mut ctx, id).map(|_| {
            json!({
                "agency": ctx.view.get("agency").cloned().unwrap_or(Value::Null),
                "tour_count": ctx.view.get("agency_tour_count").cloned().unwrap_or(Value::Null),
                "booking_count": ctx.view.get("agency_booking_count").cloned().unwrap_or(Value::Null),
            })
        }),
        _ => return not_found(),
    };
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn create_resource(
    State(state): State<AppState>,
    Path((role_seg, resource_seg)): Path<(String, String)>,
    claims: AuthClaims,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = ensure_panel_role(&claims, &role_seg) {
        return response;
    }
    let Some(resource) = Resource::from_segment(&resource_seg) else {
        return not_found();
    };
    let mut ctx = panel_context(&claims, &HashMap::new());
    if let Some(fields) = body.as_object() {
        for (key, value) in fields {
            ctx.form.set(key, value.clone());
        }
    }
    if let Err(err) = load_permissions(&state.panel, &mut ctx) {
        return error_response(err);
    }
    // Audit entries attribute to the mirrored panel user, not the raw token subject.
    match upsert_panel_user_by_sub(&state.db, &claims.sub, ctx.user_info.role.path_prefix()).await
    {
        Ok(local_id) => ctx.user_info.id = local_id,
        Err(err) => {
            error!(error = %err, "failed to sync panel user");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error", "message": "failed to sync user"})),
            )
                .into_response();
        }
    }
    let service = &state.panel;
    let result = match resource {
        Resource::Tours => {
            tours::save_tour(service, &mut ctx).map(|_| ctx.view.int("saved_tour_id"))
        }
        Resource::Refunds => {
            refunds::request_refund(service, &mut ctx).map(|_| ctx.view.int("saved_refund_id"))
        }
        Resource::Promotions => promotions::save_promotion(service, &mut ctx)
            .map(|_| ctx.view.int("saved_promotion_id")),
        Resource::Services => service_items::save_service_item(service, &mut ctx)
            .map(|_| ctx.view.int("saved_service_item_id")),
        _ => return not_found(),
    };
    match result {
        Ok(id) => (StatusCode::OK, Json(json!({"status": "ok", "id": id}))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn resource_action(
    State(state): State<AppState>,
    Path((role_seg, resource_seg, id, verb)): Path<(String, String, i64, String)>,
    claims: AuthClaims,
) -> Response {
    if let Err(response) = ensure_panel_role(&claims, &role_seg) {
        return response;
    }
    let Some(resource) = Resource::from_segment(&resource_seg) else {
        return not_found();
    };
    let mut ctx = panel_context(&claims, &HashMap::new());
    if let Err(err) = load_permissions(&state.panel, &mut ctx) {
        return error_response(err);
    }
    let service = &state.panel;
    let result = match (resource, verb.as_str()) {
        (Resource::Bookings, "confirm") => {
            bookings::update_booking_status(service, &mut ctx, id, BookingStatus::Confirmed)
        }
        (Resource::Bookings, "complete") => {
            bookings::update_booking_status(service, &mut ctx, id, BookingStatus::Completed)
        }
        (Resource::Bookings, "cancel") => {
            bookings::update_booking_status(service, &mut ctx, id, BookingStatus::Cancelled)
        }
        (Resource::Tours, "archive") => tours::archive_tour(service, &mut ctx, id),
        (Resource::Commissions, "settle") => commissions::settle_commission(service, &mut ctx, id),
        (Resource::Refunds, "approve") => refunds::review_refund(service, &mut ctx, id, true),
        (Resource::Refunds, "reject") => refunds::review_refund(service, &mut ctx, id, false),
        (Resource::Promotions, "activate") => {
            promotions::set_promotion_active(service, &mut ctx, id, true)
        }
        (Resource::Promotions, "deactivate") => {
            promotions::set_promotion_active(service, &mut ctx, id, false)
        }
        (Resource::Services, "activate") => {
            service_items::set_service_item_active(service, &mut ctx, id, true)
        }
        (Resource::Services, "deactivate") => {
            service_items::set_service_item_active(service, &mut ctx, id, false)
        }
        (Resource::Agencies, "suspend") => {
            agencies::set_agency_status(service, &mut ctx, id, AgencyStatus::Suspended)
        }
        (Resource::Agencies, "activate") => {
            agencies::set_agency_status(service, &mut ctx, id, AgencyStatus::Active)
        }
        _ => return not_found(),
    };
    match result {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok", "id": id}))).into_response(),
        Err(err) => error_response(err),
    }
}

async fn export_bookings(
    State(state): State<AppState>,
    Path(role_seg): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    claims: AuthClaims,
) -> Response {
    if let Err(response) = ensure_panel_role(&claims, &role_seg) {
        return response;
    }
    let mut ctx = panel_context(&claims, &params);
    if let Err(err) = load_permissions(&state.panel, &mut ctx) {
        return error_response(err);
    }
    prepare_view_context(&mut ctx, "export");
    match export::export_bookings_csv(&state.panel, &mut ctx) {
        Ok(csv) => (
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            csv,
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn ui() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>Tour Panel Demo</title>
  <style>
    body { font-family: Arial, sans-serif; max-width: 720px; margin: 40px auto; line-height: 1.6; }
    label { display: block; margin-top: 12px; }
    textarea, input { width: 100%; padding: 8px; }
    button { margin-top: 12px; padding: 10px 16px; cursor: pointer; }
    pre { background: #f4f4f4; padding: 12px; border-radius: 6px; }
  </style>
</head>
<body>
  <h1>Tour Panel Demo</h1>
  <p>Paste a JWT from the identity service and load the tour table for your role.</p>
  <label>JWT Bearer Token</label>
  <textarea id="token" rows="3" placeholder="eyJhbGciOi..."></textarea>
  <label>Panel</label>
  <input id="panel" value="admin">
  <button id="send">Load Tours</button>
  <pre id="output">Waiting...</pre>
  <script>
    const btn = document.getElementById('send');
    const out = document.getElementById('output');
    btn.onclick = async () => {
      const token = document.getElementById('token').value.trim();
      const panel = document.getElementById('panel').value.trim() || 'admin';
      if (!token) {
        out.textContent = 'Please provide a JWT token.';
        return;
      }
      out.textContent = 'Loading...';
      try {
        const res = await fetch('/' + panel + '/tours?per_page=5', {
          headers: {
            'Authorization': 'Bearer ' + token
          }
        });
        const text = await res.text();
        out.textContent = text;
      } catch (err) {
        out.textContent = 'Error: ' + err;
      }
    };
  </script>
</body>
</html>"#,
    )
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    }
}
