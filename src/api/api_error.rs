use crate::error::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Boundary type converting pipeline errors into plain-text HTTP responses.
///
/// The response body is the error's display text only; backend causes stay in
/// the trace log.
pub(crate) struct APIError(anyhow::Error);

impl IntoResponse for APIError {
    fn into_response(self) -> Response {
        let any_err = self.0;
        let status = match any_err.downcast_ref::<Error>() {
            Some(
                Error::MalformedPayload(_)
                | Error::AmbiguousPayload
                | Error::InvalidDomainFormat(_),
            ) => StatusCode::BAD_REQUEST,
            Some(Error::AuthenticationFailed) => StatusCode::UNAUTHORIZED,
            Some(Error::NotAuthorizedDomain(_) | Error::IpNotAllowed(_)) => StatusCode::FORBIDDEN,
            Some(Error::MethodNotAllowed(_)) => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            // Log the full chain; the wire message stays generic.
            tracing::error!(error = ?any_err, "request failed");
        } else {
            tracing::debug!(error = %any_err, "request rejected");
        }
        (status, format!("{any_err}")).into_response()
    }
}

impl<E> From<E> for APIError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
