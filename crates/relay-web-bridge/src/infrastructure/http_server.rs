//! HTTP and Server-Sent-Events endpoints.
//!
//! | Route              | Behaviour                                                   |
//! |--------------------|-------------------------------------------------------------|
//! | `POST /active-tab` | relay `{"command":"setActiveTabUrl","url":..}` one-off      |
//! | `GET /events`      | SSE stream of every daemon message (`data: <json>\n\n`)     |
//! | `POST /focus`      | accepted, no effect                                         |
//! | `POST /command`    | one-off request; the daemon's first reply line is returned  |
//! | `OPTIONS *`        | CORS preflight                                              |
//!
//! Every response carries `Access-Control-Allow-Origin: *`.

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use relay_core::link::{request_one_off, send_one_off};
use relay_core::protocol::message::set_active_tab_url;
use relay_core::protocol::summarize;
use relay_core::Message;

use crate::application::{BroadcastHub, Subscription};
use crate::domain::messages::{NO_COMMAND_PROVIDED, NO_URL_PROVIDED};
use crate::domain::{requested_command, requested_url, BridgeConfig, StatusReply};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub hub: BroadcastHub,
    pub socket_path: Arc<PathBuf>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(hub: BroadcastHub, config: &BridgeConfig) -> Self {
        Self {
            hub,
            socket_path: Arc::new(config.link.socket_path.clone()),
            request_timeout: config.request_timeout,
        }
    }
}

/// Builds the router with all routes and the CORS layer.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/active-tab", post(active_tab))
        .route("/events", get(events))
        .route("/focus", post(focus))
        .route("/command", post(command))
        .with_state(state)
        .layer(cors)
}

/// Serves `state` on `listener` until `shutdown` is cancelled.
///
/// Cancellation also shuts the hub down so open SSE responses finish and the
/// graceful shutdown does not wait on them forever.
pub async fn run_server(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let local_addr = listener.local_addr()?;
    info!(%local_addr, "HTTP bridge listening");

    let hub = state.hub.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            hub.shutdown();
        })
        .await?;

    info!("HTTP bridge stopped");
    Ok(())
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn active_tab(State(state): State<AppState>, body: Bytes) -> Response {
    let request: Message = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("rejecting /active-tab body: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let Some(url) = requested_url(&request) else {
        return Json(StatusReply::error(NO_URL_PROVIDED)).into_response();
    };

    debug!("active tab update received");
    // Best effort: the page gets "ok" once the relay was attempted.
    send_one_off(&state.socket_path, &set_active_tab_url(url)).await;
    Json(StatusReply::Ok).into_response()
}

async fn events(State(state): State<AppState>) -> impl IntoResponse {
    let subscription = state.hub.subscribe();
    info!(subscriber = %subscription.id(), "SSE client connected");

    (
        [(header::CONNECTION, "keep-alive")],
        Sse::new(event_stream(subscription)).keep_alive(KeepAlive::default()),
    )
}

async fn focus() -> StatusCode {
    StatusCode::OK
}

async fn command(State(state): State<AppState>, body: Bytes) -> Response {
    let request: Message = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(StatusReply::error(e.to_string())))
                .into_response();
        }
    };

    if requested_command(&request).is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(StatusReply::error(NO_COMMAND_PROVIDED)),
        )
            .into_response();
    }

    match request_one_off(&state.socket_path, &request, state.request_timeout).await {
        Ok(reply) => {
            debug!("command {} answered", summarize(&request));
            Json(reply).into_response()
        }
        Err(e) => {
            warn!("command {} failed: {e}", summarize(&request));
            (StatusCode::BAD_GATEWAY, Json(StatusReply::error(e.to_string()))).into_response()
        }
    }
}

/// Turns a subscription into SSE events.  The stream ends when the
/// subscription is cancelled; dropping the stream unsubscribes.
fn event_stream(subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(subscription, |mut subscription| async move {
        loop {
            let message = subscription.next().await?;
            match Event::default().json_data(&message) {
                Ok(event) => return Some((Ok(event), subscription)),
                Err(e) => warn!("dropping unserializable SSE message: {e}"),
            }
        }
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
