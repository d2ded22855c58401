use crate::allowlist;
use crate::api::api_error::APIError;
use crate::api::middleware::{access_log, client_ip, filter_ips, require_auth};
use crate::api::model::{ChallengeRequest, IncomingMessage};
use crate::api::server::AppState;
use crate::dispatch::{dispatch, Action};
use crate::error::Error;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Method, Request, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::{any, get};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub(super) fn new(state: AppState) -> Router {
    let mut challenge = Router::new()
        .route("/present", any(present))
        .route("/cleanup", any(cleanup));

    // Request order through the chain is authentication, then IP filtering,
    // then the handler; axum runs the last-added layer first. The health
    // route and the fallback sit outside both.
    if !state.config.allowed_ips.is_empty() {
        let allowed = Arc::new(state.config.allowed_ips.clone());
        challenge = challenge.layer(from_fn_with_state(allowed, filter_ips));
    }
    if let Some(credentials) = state.credentials.clone() {
        challenge = challenge.layer(from_fn_with_state(credentials, require_auth));
    }

    let mut router = Router::new()
        .route("/health", get(health))
        .merge(challenge)
        .fallback(home);

    // The access log observes everything, the health route included.
    if let Some(sink) = state.access_log.clone() {
        router = router.layer(from_fn_with_state(sink, access_log));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health() -> impl IntoResponse {
    "OK"
}

#[allow(clippy::unused_async)]
async fn home() -> impl IntoResponse {
    tracing::warn!("trying to access non-acmeproxy URL");
    StatusCode::FORBIDDEN
}

async fn present(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request<Body>,
) -> Result<Json<ChallengeRequest>, APIError> {
    challenge("present", state, peer, req).await
}

async fn cleanup(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request<Body>,
) -> Result<Json<ChallengeRequest>, APIError> {
    challenge("cleanup", state, peer, req).await
}

/// The per-request pipeline shared by both challenge routes: method check,
/// payload normalization, allow-list authorization, backend dispatch. Any
/// failure short-circuits into the response for that stage's error.
async fn challenge(
    action: &str,
    state: AppState,
    peer: SocketAddr,
    req: Request<Body>,
) -> Result<Json<ChallengeRequest>, APIError> {
    let action: Action = action.parse()?;
    let client = client_ip(req.headers(), Some(peer.ip())).unwrap_or(peer.ip());

    if req.method() != Method::POST {
        tracing::warn!(%action, %client, method = %req.method(), "method not allowed");
        return Err(Error::MethodNotAllowed(req.method().clone()).into());
    }

    // Clients are not required to send a JSON content type; decode the body
    // directly.
    let bytes = hyper::body::to_bytes(req.into_body())
        .await
        .map_err(|err| Error::MalformedPayload(err.into()))?;
    let incoming: IncomingMessage =
        serde_json::from_slice(&bytes).map_err(|err| Error::MalformedPayload(err.into()))?;
    let request = incoming.classify()?;

    match &request {
        ChallengeRequest::Default { fqdn, value } => {
            tracing::debug!(%action, %client, %fqdn, %value, "received JSON payload (default mode)");
        }
        ChallengeRequest::Raw {
            domain,
            token,
            key_auth,
        } => {
            tracing::debug!(%action, %client, %domain, %token, %key_auth, "received JSON payload (raw mode)");
        }
    }

    allowlist::authorize(&request.check_domain(), &state.config.allowed_domains)?;

    let mode = request.mode();
    let echo = dispatch(action, request, state.provider.as_ref()).await?;
    tracing::info!(
        %action,
        %client,
        provider = state.provider.name(),
        %mode,
        "successfully updated TXT record"
    );
    Ok(Json(echo))
}
