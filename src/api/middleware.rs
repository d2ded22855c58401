//! Cross-cutting request layers: basic authentication, source-IP filtering
//! and access logging.
//!
//! Each layer is installed only when its collaborator is configured (see
//! [`routes`][super::routes]); a disabled layer doesn't exist in the chain at
//! all. All three resolve the caller's address the same way: proxy-forwarded
//! headers first, transport peer address second.

use crate::access_log::AccessLogSink;
use crate::api::api_error::APIError;
use crate::credentials::{Credentials, DynCredentialStore};
use crate::error::Error;
use axum::body::{boxed, Full};
use axum::extract::{ConnectInfo, State};
use axum::http::header::{AUTHORIZATION, HOST, USER_AGENT, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use time::macros::format_description;
use time::OffsetDateTime;

lazy_static! {
    static ref ACCESS_TS_FORMAT: &'static [time::format_description::FormatItem<'static>] =
        format_description!(version = 2, "[year]/[month]/[day] [hour]:[minute]:[second]");
}

/// Resolve the caller's real address: first `X-Forwarded-For` entry, then
/// `X-Real-IP`, then the transport peer.
pub(super) fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
    let forwarded: Option<IpAddr> = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok());
    let real_ip: Option<IpAddr> = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());
    forwarded.or(real_ip).or(peer)
}

fn peer_addr<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
}

/// Reject callers without valid basic-auth credentials before anything else
/// runs for the challenge routes.
pub(super) async fn require_auth<B: Send + 'static>(
    State(store): State<DynCredentialStore>,
    req: Request<B>,
    next: Next<B>,
) -> Response {
    let Some(credentials) = basic_credentials(req.headers()) else {
        tracing::warn!("unauthorized request");
        return unauthorized();
    };
    match store.validate(&credentials) {
        Some(username) => {
            tracing::info!(%username, "authorized");
            next.run(req).await
        }
        None => {
            tracing::warn!(username = %credentials.username, "unauthorized request");
            unauthorized()
        }
    }
}

fn unauthorized() -> Response {
    let mut response = APIError::from(Error::AuthenticationFailed).into_response();
    response.headers_mut().insert(
        WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"acmeproxy\""),
    );
    response
}

fn basic_credentials(headers: &HeaderMap) -> Option<Credentials> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Reject callers whose resolved address is outside the configured networks.
/// Unresolvable addresses are rejected too; the filter fails closed.
pub(super) async fn filter_ips<B: Send + 'static>(
    State(allowed): State<Arc<Vec<IpNetwork>>>,
    req: Request<B>,
    next: Next<B>,
) -> Response {
    let Some(ip) = client_ip(req.headers(), peer_addr(&req)) else {
        tracing::warn!("access denied: caller address unresolvable");
        return APIError::from(Error::IpNotAllowed(IpAddr::from([0, 0, 0, 0]))).into_response();
    };
    if allowed.iter().any(|network| network.contains(ip)) {
        next.run(req).await
    } else {
        tracing::warn!(%ip, "access denied");
        APIError::from(Error::IpNotAllowed(ip)).into_response()
    }
}

/// Record one line per request to the configured sink.
///
/// The response body is buffered so the logged status and length are the ones
/// actually sent, including those written by inner layers. Sink failures are
/// logged and swallowed; they never fail the request.
pub(super) async fn access_log<B: Send + 'static>(
    State(sink): State<Arc<dyn AccessLogSink>>,
    req: Request<B>,
    next: Next<B>,
) -> Response {
    let method = req.method().clone();
    let target = match req.uri().query() {
        Some(query) => format!("{}?{query}", req.uri().path()),
        None => req.uri().path().to_string(),
    };
    let proto = format!("{:?}", req.version());
    let host = header_str(req.headers(), HOST);
    let user_agent = header_str(req.headers(), USER_AGENT);
    let ip = client_ip(req.headers(), peer_addr(&req))
        .map_or_else(|| "-".to_string(), |ip| ip.to_string());

    let response = next.run(req).await;

    let (parts, body) = response.into_parts();
    let Ok(bytes) = hyper::body::to_bytes(body).await else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let timestamp = OffsetDateTime::now_utc()
        .format(&ACCESS_TS_FORMAT)
        .unwrap_or_default();
    let line = format!(
        "{timestamp} {host} {ip} \"{method} {target} {proto}\" {} {} \"{user_agent}\"",
        parts.status.as_u16(),
        bytes.len(),
    );
    if let Err(err) = sink.write_line(&line).await {
        tracing::warn!(%err, "failed to write access log entry");
    }

    Response::from_parts(parts, boxed(Full::from(bytes)))
}

fn header_str(headers: &HeaderMap, name: axum::http::header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}
