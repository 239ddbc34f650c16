use crate::{
    config::Config,
    handlers::{datasets, images, settings as settings_api},
    security,
    settings::{store::SettingsStore, SettingsCache},
};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::{sync::Arc, time::Instant};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub settings: Arc<SettingsCache>,
    pub store: Arc<dyn SettingsStore>,
}

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr: std::net::SocketAddr =
        format!("{}:{}", state.cfg.server.bind_addr, state.cfg.server.port).parse()?;
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let request_limit = state.cfg.limits.max_request_kb * 1024;
    let upload_limit = state.cfg.limits.max_upload_mb * 1024 * 1024;

    let json_routes = Router::new()
        .route("/api/datasets/create", post(datasets::create))
        .route("/api/datasets/delete", post(datasets::delete))
        .route("/api/img/caption", post(images::save_caption))
        .route("/api/img/delete", post(images::delete_image))
        .route("/api/caption/get", post(images::get_caption))
        .route("/api/settings", get(settings_api::show).post(settings_api::update))
        .layer(RequestBodyLimitLayer::new(request_limit));

    let upload_routes = Router::new()
        .route("/api/datasets/upload", post(datasets::upload))
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(upload_limit))
                .layer(RequestBodyLimitLayer::new(upload_limit)),
        );

    Router::new()
        .merge(json_routes)
        .merge(upload_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), authorize))
        .route("/healthz", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(audit)),
        )
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

async fn authorize(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Some(expected) = state.cfg.bearer_token() {
        if let Err(e) = security::require_bearer(req.headers(), expected) {
            return e.into_response();
        }
    }
    next.run(req).await
}

async fn audit(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut resp = next.run(req).await;

    let status = resp.status();
    let decision = match status {
        s if s.is_success() => "allow",
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "deny",
        _ => "error",
    };
    audit_end(
        &request_id,
        method.as_str(),
        &path,
        decision,
        status.as_u16(),
        started.elapsed().as_millis() as u64,
    );
    if let Ok(v) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert("x-request-id", v);
    }
    resp
}

fn audit_end(request_id: &str, method: &str, path: &str, decision: &str, status: u16, duration_ms: u64) {
    tracing::info!(
        request_id = request_id,
        method = method,
        path = path,
        decision = decision,
        status = status,
        duration_ms = duration_ms,
        "audit"
    );
}
