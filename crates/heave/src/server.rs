use crate::{config::Config, pump::SharedStatus, sink::ChannelSink};
use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tower_http::{services::ServeDir, trace::TraceLayer};
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    sink: ChannelSink,
    status: SharedStatus,
}

impl AppState {
    pub fn new(config: Config, sink: ChannelSink, status: SharedStatus) -> Self {
        Self {
            config: Arc::new(config),
            sink,
            status,
        }
    }
}

/// Response body for `/status`
#[derive(Serialize)]
pub struct StatusResponse {
    pub subscribers: usize,
    #[serde(flatten)]
    pub stream: crate::pump::Status,
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
        .route("/energy/reset", post(reset_energy))
        .route("/ws", get(ws_upgrade));

    let router = match &state.config.server.static_dir {
        // directories resolve to their index.html
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn status(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let stream = state
        .status
        .read()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .clone();
    Ok(axum::Json(StatusResponse {
        subscribers: state.sink.subscriber_count(),
        stream,
    }))
}

/// Empty the battery estimate and return the updated status
async fn reset_energy(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let stream = {
        let mut status = state
            .status
            .write()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        status.request_energy_reset();
        status.clone()
    };
    tracing::info!("energy reset requested");
    Ok(axum::Json(StatusResponse {
        subscribers: state.sink.subscriber_count(),
        stream,
    }))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_rates(socket, state))
}

/// Forward every broadcast to one subscriber until either side goes away.
async fn stream_rates(mut socket: WebSocket, state: AppState) {
    let id = Uuid::new_v4();
    let mut rx = state.sink.subscribe();
    tracing::info!(%id, "subscriber connected");

    loop {
        tokio::select! {
            payload = rx.recv() => match payload {
                Ok(text) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(%id, skipped, "subscriber lagging");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!(%id, "subscriber disconnected");
}
