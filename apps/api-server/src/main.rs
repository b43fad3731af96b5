//! api-server — HTTP API for the Notes workspace.
//!
//! Exposes CRUD endpoints for notes under `/api/v1/notes` and supports:
//! - Storage: In-memory or SQLite (file) when the `sqlite` feature is enabled.
//! - CORS: Configurable via CORS_ALLOW_ORIGIN (origin string) for browser clients.
//! - Request ids, request tracing, per-request timeouts and panic recovery.
//! - A global rate limit (RATE_LIMIT_RPS, default 200 requests per second).
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//!
//! # in-memory storage, keep logs machine readable
//! STORAGE_PROVIDER=memory LOG_FORMAT=json cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod config;
mod notes;
mod repo;

use std::any::Any;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use notes::{AppState, NOTES_PATH};

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_ephemeral();

    let repo = match repo::build_repo(&cfg) {
        Ok(r) => r,
        Err(e) => {
            error!(err = %e, "failed to initialize storage");
            std::process::exit(1);
        }
    };
    if cfg.seed_sample_notes {
        if let Err(e) = repo::seed(&repo) {
            error!(err = %e, "failed to seed sample notes");
            std::process::exit(1);
        }
    }

    let app = build_app(AppState::new(repo, cfg.rate_limit_rps), &cfg);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(%addr, "api-server listening");
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
    info!("server gracefully stopped");
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

fn routes() -> Router<AppState> {
    Router::new()
        .route(NOTES_PATH, get(notes::list_notes).post(notes::create_note))
        .route(
            &format!("{NOTES_PATH}/:id"),
            get(notes::get_note)
                .put(notes::update_note)
                .delete(notes::delete_note),
        )
}

fn build_app(state: AppState, cfg: &config::Config) -> Router {
    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    routes()
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TimeoutLayer::new(cfg.request_timeout))
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(cors_layer(&cfg.cors_allow_origin))
        .with_state(state)
}

// CORS - origin already validated in Config::from_env()
fn cors_layer(origin: &HeaderValue) -> CorsLayer {
    if *origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    }
}

async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.rate_limiter.check().is_err() {
        warn!(uri = %request.uri(), "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(http_common::json_err("rate_limited")),
        )
            .into_response();
    }
    next.run(request).await
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(http_common::json_err("internal")),
    )
        .into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(err = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(err = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down the server");
}
