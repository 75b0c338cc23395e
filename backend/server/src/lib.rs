//! Documentation of the petition platform backend.
//!
//! Petitioners register, submit petitions and sign open ones. Administrators
//! review every petition and close it with a written response.
//!
//!
//!
//! # General Infrastructure
//! - One stateless axum server, any number of replicas
//! - All state lives in Redis, see [`database`] for the key layout
//! - `STORE=memory` swaps Redis for an in-process store, handy for local runs
//! - Clients authenticate with a bearer token from `/petitioner/login`
//!
//!
//!
//! # Routes
//!
//! | Route | Auth |
//! |---|---|
//! | `POST /petitioner/register` | none |
//! | `POST /petitioner/login` | none |
//! | `GET /petitioner/petitions?status=` | bearer |
//! | `POST /petitioner/petitions` | bearer |
//! | `POST /petitioner/petitions/{id}/sign` | bearer |
//! | `GET /admin/petitions` | bearer, admin role |
//! | `POST /admin/petitions/{id}/respond` | bearer, admin role |
//! | `GET /health` | none |
//!
//! Errors always come back as `{"error": "..."}`.
//!
//!
//!
//! # Notes
//!
//! ## Admin accounts
//! Registration only ever creates petitioners. The first admin comes from the
//! `ADMIN_EMAIL`/`ADMIN_PASSWORD` secrets at startup. Seeding is idempotent so
//! every replica can run it.
//!
//! ## Role checks
//! The client hides admin pages from petitioners, but that is cosmetic. Every
//! admin route checks the role inside the verified token.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run against a local Redis.
//! ```sh
//! docker run -p 6379:6379 redis:7
//! JWT_SECRET=dev RUST_LOG=info cargo run --bin petition-server
//! ```
//!
//! Run without Redis.
//! ```sh
//! STORE=memory JWT_SECRET=dev ADMIN_EMAIL=admin@example.com ADMIN_PASSWORD=admin \
//!     RUST_LOG=info cargo run --bin petition-server
//! ```
//!
//! Secrets (`JWT_SECRET`, `ADMIN_EMAIL`, `ADMIN_PASSWORD`) are read from
//! `/run/secrets/<NAME>` first, then from the environment.
use std::{any::Any, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    http::{
        Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use payloads::ErrorResponse;
use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod memory;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

use auth::{authenticate, require_admin};
use config::Config;
use error::StartupError;
use routes::{
    admin_petitions_handler, create_petition_handler, health_handler, list_petitions_handler,
    login_handler, method_not_allowed_handler, not_found_handler, register_handler,
    respond_handler, sign_petition_handler,
};
use state::AppState;

pub async fn start_server() -> Result<(), StartupError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

/// Full router with middleware, ready to serve.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let petitioner = Router::new()
        .route(
            "/petitions",
            get(list_petitions_handler).post(create_petition_handler),
        )
        .route("/petitions/{id}/sign", post(sign_petition_handler))
        .route_layer(from_fn_with_state(state.clone(), authenticate))
        .route("/register", post(register_handler))
        .route("/login", post(login_handler));

    // Layers run outermost first: authenticate, then the role check
    let admin = Router::new()
        .route("/petitions", get(admin_petitions_handler))
        .route("/petitions/{id}/respond", post(respond_handler))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .nest("/petitioner", petitioner)
        .nest("/admin", admin)
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .method_not_allowed_fallback(method_not_allowed_handler)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic payload"
    };

    error!("Unhandled panic in handler: {detail}");

    let body = ErrorResponse {
        error: "An unexpected error occurred!".to_string(),
    };

    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
