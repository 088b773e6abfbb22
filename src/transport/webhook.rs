//! Push mode: webhook intake, liveness probe and the queue worker
//!
//! `POST /<bot token>` always answers `200 {"ok": true}` right away. A body
//! that decodes to a message or button press the bot reacts to is put on a
//! bounded queue; anything else is logged and dropped. When the queue is full the update is dropped too, so
//! intake memory stays bounded under bursts. `GET /` is an unauthenticated
//! liveness string.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use subtle::ConstantTimeEq;
use teloxide::types::Update;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, info_span, warn};

use super::{decode_update, EventRelay};
use crate::error::Result;

/// Body of `GET /`.
pub const LIVENESS_TEXT: &str = "Library bot is running";

/// Shared state of the webhook routes.
#[derive(Clone)]
pub struct WebhookState {
    secret: Arc<str>,
    queue: mpsc::Sender<Update>,
}

impl WebhookState {
    pub fn new(secret: &str, queue: mpsc::Sender<Update>) -> Self {
        Self {
            secret: Arc::from(secret),
            queue,
        }
    }
}

/// Routes for push mode.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/{secret}", post(intake))
        .layer(
            // The path is the bot token, so keep the URI out of the span
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| info_span!("http", method = %req.method())),
        )
        .with_state(state)
}

async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

async fn intake(
    State(state): State<WebhookState>,
    Path(secret): Path<String>,
    body: Bytes,
) -> Response {
    if !secret_matches(&secret, &state.secret) {
        return StatusCode::NOT_FOUND.into_response();
    }

    match serde_json::from_slice::<Update>(&body) {
        Ok(update) if decode_update(&update).is_none() => {
            debug!(update_id = ?update.id, "Ignoring webhook update without a usable event");
        }
        Ok(update) => {
            let update_id = update.id;
            match state.queue.try_send(update) {
                Ok(()) => debug!(update_id = ?update_id, "Update queued"),
                Err(TrySendError::Full(_)) => {
                    warn!(update_id = ?update_id, "Intake queue full, dropping update")
                }
                Err(TrySendError::Closed(_)) => {
                    warn!(update_id = ?update_id, "Worker stopped, dropping update")
                }
            }
        }
        Err(e) => warn!(error = %e, bytes = body.len(), "Ignoring malformed webhook payload"),
    }

    Json(json!({"ok": true})).into_response()
}

fn secret_matches(given: &str, expected: &str) -> bool {
    given.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Drain the queue one update at a time until it closes or `cancel` fires.
pub async fn drain(mut queue: mpsc::Receiver<Update>, relay: EventRelay, cancel: CancellationToken) {
    loop {
        let update = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = queue.recv() => match next {
                Some(update) => update,
                None => break,
            },
        };
        relay.process(update).await;
    }
    debug!("Webhook worker stopped");
}

/// Serve the webhook routes on `0.0.0.0:port` until `cancel` fires.
pub async fn run(
    port: u16,
    secret: &str,
    queue_capacity: usize,
    relay: EventRelay,
    cancel: CancellationToken,
) -> Result<()> {
    let (tx, rx) = mpsc::channel(queue_capacity);
    let app = router(WebhookState::new(secret, tx));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, queue_capacity, "Webhook server listening");

    let worker = tokio::spawn(drain(rx, relay, cancel.clone()));

    let shutdown = cancel.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;

    cancel.cancel();
    if let Err(e) = worker.await {
        error!(error = %e, "Webhook worker panicked");
    }
    info!("Webhook server stopped");
    served.map_err(Into::into)
}
