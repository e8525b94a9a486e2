//! HTTP transport.
//!
//! Binds the relay to two routes:
//!
//! - `POST /send` with `{ "message": text }` -> submit
//! - `GET /messages` -> retrieve
//!
//! Every request passes through request logging, a permissive CORS layer and
//! the per-IP rate limiter. Preflight requests are answered by the CORS layer
//! and do not count against the limit.
//! Store operations run on the blocking pool so unsealing never stalls the
//! async workers; a panic there surfaces as a generic 500.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use axum::{
    Json, Router,
    extract::{ConnectInfo, Request, State, rejection::JsonRejection},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use driftbox_core::env::Environment;
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::{
    rate_limit::RateLimiter,
    relay::{Relay, RelayError, RetrieveResponse, SubmitReceipt, SubmitRequest},
};

/// Shared state for all request handlers.
#[derive(Clone)]
pub struct AppState<E: Environment> {
    relay: Relay<E>,
    limiter: Arc<RateLimiter<E>>,
}

impl<E: Environment> AppState<E> {
    /// Bundle the relay with its rate limiter.
    pub fn new(relay: Relay<E>, limiter: RateLimiter<E>) -> Self {
        Self { relay, limiter: Arc::new(limiter) }
    }

    /// The relay adapter.
    pub fn relay(&self) -> &Relay<E> {
        &self.relay
    }
}

/// Build the router for the relay routes.
pub fn router<E: Environment>(state: AppState<E>) -> Router {
    Router::new()
        .route("/send", post(send_message::<E>))
        .route("/messages", get(get_messages::<E>))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), enforce_rate_limit::<E>))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// HTTP status for each relay error.
///
/// - Invalid input: 400 Bad Request
/// - Rate limit: 429 Too Many Requests
/// - Capacity: 503 Service Unavailable (records expire, retry later)
/// - Internal: 500 Internal Server Error
pub fn status_code(err: &RelayError) -> StatusCode {
    match err {
        RelayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RelayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        RelayError::CapacityExceeded { .. } => StatusCode::SERVICE_UNAVAILABLE,
        RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            Self::InvalidInput(reason) => tracing::debug!(%reason, "rejected submission"),
            Self::Internal(detail) => tracing::error!(%detail, "request failed"),
            Self::CapacityExceeded { .. } | Self::RateLimited => {
                tracing::warn!(error = %self, "request refused");
            },
        }

        (status_code(&self), Json(ErrorBody { error: self.public_message() })).into_response()
    }
}

async fn send_message<E: Environment>(
    State(state): State<AppState<E>>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<SubmitReceipt>, RelayError> {
    let Json(request) =
        payload.map_err(|rejection| RelayError::InvalidInput(rejection.body_text()))?;

    let relay = state.relay.clone();
    let receipt = tokio::task::spawn_blocking(move || relay.submit(request))
        .await
        .map_err(|e| RelayError::Internal(format!("submit task failed: {e}")))??;

    Ok(Json(receipt))
}

async fn get_messages<E: Environment>(
    State(state): State<AppState<E>>,
) -> Result<Json<RetrieveResponse>, RelayError> {
    let relay = state.relay.clone();
    let response = tokio::task::spawn_blocking(move || relay.retrieve())
        .await
        .map_err(|e| RelayError::Internal(format!("retrieve task failed: {e}")))?;

    Ok(Json(response))
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorBody { error: "Not found!" })).into_response()
}

async fn enforce_rate_limit<E: Environment>(
    State(state): State<AppState<E>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    // Without connect info (in-process callers) all requests share one bucket
    let ip = connect_info.map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| addr.ip());

    if let Err(err) = state.limiter.check(ip) {
        return err.into_response();
    }

    next.run(request).await
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;

    tracing::info!(%method, %path, status = response.status().as_u16(), "request");
    response
}
