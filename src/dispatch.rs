//! Capability-based dispatch of challenge requests to the configured backend.

use crate::api::model::ChallengeRequest;
use crate::error::Error;
use crate::provider::DnsProvider;
use std::fmt;
use std::str::FromStr;

/// The two challenge lifecycle actions, one per route.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Action {
    Present,
    Cleanup,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Present => f.write_str("present"),
            Action::Cleanup => f.write_str("cleanup"),
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Action::Present),
            "cleanup" => Ok(Action::Cleanup),
            other => Err(Error::UnsupportedAction(other.to_string())),
        }
    }
}

/// Invoke the backend operation selected by the request mode and the action,
/// returning the request itself as the echo message on success.
///
/// Default mode requires the backend to expose record operations; raw mode is
/// supported by every backend. Backend failures are surfaced once and never
/// retried here; the ACME client driving the relay owns retry policy.
///
/// # Errors
///
/// Returns [`Error::UnsupportedMode`] for default-mode requests against a
/// backend without record operations, or [`Error::BackendFailed`] when the
/// chosen backend operation fails.
pub async fn dispatch(
    action: Action,
    request: ChallengeRequest,
    provider: &dyn DnsProvider,
) -> Result<ChallengeRequest, Error> {
    let mode = request.mode();
    match &request {
        ChallengeRequest::Default { fqdn, value } => {
            let Some(records) = provider.record_ops() else {
                tracing::debug!(
                    provider = provider.name(),
                    %mode,
                    "provider does not support requested mode"
                );
                return Err(Error::UnsupportedMode(mode));
            };
            tracing::debug!(provider = provider.name(), %mode, "provider supports requested mode");
            let result = match action {
                Action::Present => records.create_record(fqdn, value).await,
                Action::Cleanup => records.remove_record(fqdn, value).await,
            };
            result.map_err(|source| Error::BackendFailed { action, mode, source })?;
        }
        ChallengeRequest::Raw {
            domain,
            token,
            key_auth,
        } => {
            let result = match action {
                Action::Present => provider.present(domain, token, key_auth).await,
                Action::Cleanup => provider.cleanup(domain, token, key_auth).await,
            };
            result.map_err(|source| Error::BackendFailed { action, mode, source })?;
        }
    }
    Ok(request)
}
