//! Error types.

use crate::api::model::Mode;
use crate::dispatch::Action;
use axum::http::Method;
use std::net::IpAddr;

/// Error enumerates the possible acmeproxy error states.
///
/// Every variant maps to exactly one HTTP status (see the
/// [API error mapping][crate::api]). All of them are terminal for the request
/// being processed; nothing in the pipeline retries.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when clients `POST` a body that can't be read or parsed as
    /// the expected JSON message shape.
    #[error("bad JSON request")]
    MalformedPayload(#[source] anyhow::Error),

    /// Returned when a payload parses as JSON but satisfies neither the
    /// default (`fqdn` + `value`) nor the raw (`domain` + `token`/`keyauth`)
    /// field group.
    #[error("wrong JSON content")]
    AmbiguousPayload,

    /// Returned when the domain to authorize is empty or has fewer than two
    /// DNS labels, which the suffix-based allow-list check can't evaluate.
    #[error("invalid domain format: \"{0}\"")]
    InvalidDomainFormat(String),

    /// Returned when the requested domain doesn't match any entry of
    /// [`Config::allowed_domains`][crate::config::Config::allowed_domains],
    /// or when that list is empty (fail closed).
    #[error("requested domain \"{0}\" not in allowed-domains")]
    NotAuthorizedDomain(String),

    /// Returned when a default-mode request reaches a backend that doesn't
    /// expose the direct record operations. Raw mode is the universal
    /// fallback; default mode is opt-in per backend.
    #[error("provider does not support requested mode {0}")]
    UnsupportedMode(Mode),

    /// Returned when a route hands the dispatcher an action name other than
    /// `present` or `cleanup`. This is a routing defect, not a client error.
    #[error("wrong action specified: \"{0}\"")]
    UnsupportedAction(String),

    /// Returned when the backend operation for an otherwise valid request
    /// fails. The cause is logged but not echoed to the client.
    #[error("failed to update TXT record")]
    BackendFailed {
        action: Action,
        mode: Mode,
        #[source]
        source: anyhow::Error,
    },

    /// Returned when a challenge route is called without valid credentials
    /// while a credential store is configured.
    #[error("unauthorized")]
    AuthenticationFailed,

    /// Returned when a challenge route is called from an address outside
    /// [`Config::allowed_ips`][crate::config::Config::allowed_ips] while that
    /// list is configured.
    #[error("requesting IP {0} not in allowed-ips")]
    IpNotAllowed(IpAddr),

    /// Returned for any method other than `POST` on the challenge routes.
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    /// Returned when [`Config::provider`][crate::config::Config::provider]
    /// names a backend this build doesn't know.
    #[error("unknown provider \"{0}\"")]
    UnknownProvider(String),

    /// Returned when the configuration for the selected backend is
    /// incomplete.
    #[error("invalid provider configuration: {0}")]
    ProviderConfig(String),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk (e.g.
    /// [loading a `Config`][crate::config::Config::try_from_file], or loading
    /// a [`FileProvider`][crate::provider::FileProvider] state file) fails due
    /// to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),
}
