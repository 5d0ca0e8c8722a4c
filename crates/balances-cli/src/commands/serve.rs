//! `balances serve` command implementation

use anyhow::Result;
use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::{
    extract::State,
    middleware,
    routing::{get, post, MethodRouter},
    Json, Router,
};
use balances_core::snapshot::iso_millis;
use balances_core::{check_payload_shape, PayloadRejection, RelayConfig, Snapshot, SnapshotStore};
use chrono::Utc;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{debug, error, info, warn};

mod assets;
mod auth;
mod error;
mod http_middleware;
mod trigger;

use self::assets::AssetDir;
use self::auth::AuthGate;
use self::error::ApiError;
use self::trigger::WebhookTrigger;


#[derive(Clone)]
struct AppState {
    store: SnapshotStore,
    gate: AuthGate,
    assets: AssetDir,
    trigger: WebhookTrigger,
    trigger_require_auth: bool,
    body_limit: usize,
}

impl AppState {
    fn from_config(config: &RelayConfig, store: SnapshotStore) -> Result<Self> {
        Ok(Self {
            store,
            gate: AuthGate {
                expected: config.credentials.clone(),
                environment: config.environment,
            },
            assets: AssetDir::new(config.frontend_dir.clone()),
            trigger: WebhookTrigger::new(config.webhook_url.clone())?,
            trigger_require_auth: config.trigger_require_auth,
            body_limit: config.body_limit,
        })
    }
}

#[derive(Serialize)]
struct WriteAccepted<'a> {
    status: &'static str,
    data: &'a Snapshot,
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "timestamp": iso_millis(Utc::now()),
    }))
}

async fn read_balances(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.store.read().ok_or(ApiError::NoData)?;
    Ok(Json(snapshot.as_ref()).into_response())
}

fn parse_body(body: &[u8]) -> Result<serde_json::Value, PayloadRejection> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_slice(body).map_err(|_| PayloadRejection::MalformedJson)
}

async fn write_balances(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    if state.gate.environment.verbose_diagnostics() {
        debug!(body = %String::from_utf8_lossy(&body), "POST /api/balances raw body");
    }

    let payload = parse_body(&body)?;
    let candidate = check_payload_shape(&payload, Utc::now())?;
    let replaced = state.store.is_populated();
    let snapshot = state.store.write(candidate);

    info!(
        replaced,
        vcu = snapshot.balances.vcu,
        diem = snapshot.balances.diem,
        timestamp = %snapshot.timestamp,
        "balances updated"
    );

    let body = WriteAccepted {
        status: "ok",
        data: &snapshot,
    };
    Ok(Json(body).into_response())
}

async fn trigger_update(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    match state.trigger.fire().await {
        Ok(()) => {
            info!(host = state.trigger.url().host_str().unwrap_or(""), "update triggered");
            Ok(Json(serde_json::json!({
                "status": "ok",
                "message": "update triggered",
            })))
        }
        Err(e) => {
            error!(error = %e, "webhook trigger error");
            Err(ApiError::TriggerFailed)
        }
    }
}

/// Static front-end for GET/HEAD, JSON 404 for everything else.
async fn static_or_not_found(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    if method == Method::GET || method == Method::HEAD {
        if let Some(resp) = state.assets.load(uri.path()).await {
            return resp;
        }
    }
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    ApiError::NotFound { path }.into_response()
}

fn build_app(state: AppState) -> Router {
    let require_auth = middleware::from_fn_with_state(state.gate.clone(), auth::require_basic_auth);

    let balances: MethodRouter<AppState> = post(write_balances)
        .route_layer(require_auth.clone())
        .get(read_balances)
        .fallback(static_or_not_found);

    let mut trigger = post(trigger_update);
    if state.trigger_require_auth {
        trigger = trigger.route_layer(require_auth);
    }
    let trigger = trigger.fallback(static_or_not_found);

    let body_limit = state.body_limit;
    let routes = Router::new()
        .route("/api/balances", balances)
        .route("/api/trigger-update", trigger)
        .route("/healthz", get(healthz).fallback(static_or_not_found))
        .fallback(static_or_not_found);
    with_stages(routes, body_limit).with_state(state)
}

/// Wrap `routes` in the shared request stages. Auth is attached per route, not here.
fn with_stages(routes: Router<AppState>, body_limit: usize) -> Router<AppState> {
    // Stages run top to bottom.
    let stages = ServiceBuilder::new()
        .layer(middleware::from_fn(http_middleware::security_headers))
        .layer(CatchPanicLayer::custom(http_middleware::internal_error))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(http_middleware::cors));
    routes.layer(stages)
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received, shutting down gracefully"),
        _ = terminate => info!("SIGTERM received, shutting down gracefully"),
    }
}

async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    if !state.trigger_require_auth {
        warn!("/api/trigger-update is public; set TRIGGER_REQUIRE_AUTH=true to require credentials");
    }

    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "balances relay listening with basic auth enabled");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server closed");
    Ok(())
}

pub fn run(config: RelayConfig) -> Result<()> {
    let addr = SocketAddr::new(config.host, config.port);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let state = AppState::from_config(&config, SnapshotStore::new())?;
        start_server(addr, state).await
    })?;

    Ok(())
}
