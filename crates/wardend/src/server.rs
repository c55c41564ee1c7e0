//! HTTP server for wardend
//!
//! The connector delivers platform events to `POST /v1/event`; `GET /` is a
//! liveness probe for service managers.

use crate::events::{EventRouter, GatewayEvent};
use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers
pub struct AppState {
    pub router: EventRouter,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(router: EventRouter) -> Self {
        Self {
            router,
            start_time: Instant::now(),
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/v1/event", post(handle_event))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server
pub async fn run(state: AppState, listen_addr: &str) -> Result<()> {
    let app = app(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("  Listening on http://{}", listen_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn liveness(State(state): State<Arc<AppState>>) -> String {
    format!(
        "wardend {} up {}s\n",
        env!("CARGO_PKG_VERSION"),
        state.start_time.elapsed().as_secs()
    )
}

async fn handle_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<GatewayEvent>,
) -> StatusCode {
    match state.router.handle(event).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            error!("event handling failed: {e:#}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
