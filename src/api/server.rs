use crate::access_log::AccessLogSink;
use crate::api::routes;
use crate::config::Shared;
use crate::credentials::DynCredentialStore;
use crate::provider::DynProvider;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

/// The process-wide collaborators shared by every in-flight request. Cloned
/// per request; everything inside is either immutable or concurrent-safe.
#[derive(Clone)]
pub(super) struct AppState {
    pub config: Shared,
    pub provider: DynProvider,
    pub credentials: Option<DynCredentialStore>,
    pub access_log: Option<Arc<dyn AccessLogSink>>,
}

/// Build the full route/middleware stack without binding a listener. This is
/// what integration tests drive directly.
pub fn router(
    config: Shared,
    provider: DynProvider,
    credentials: Option<DynCredentialStore>,
    access_log: Option<Arc<dyn AccessLogSink>>,
) -> Router {
    routes::new(AppState {
        config,
        provider,
        credentials,
        access_log,
    })
}

/// Bind the configured address and serve the API until the process ends.
pub fn new(
    config: Shared,
    provider: DynProvider,
    credentials: Option<DynCredentialStore>,
    access_log: Option<Arc<dyn AccessLogSink>>,
) -> impl Future<Output = hyper::Result<()>> {
    let bind_addr = config.bind_addr;
    axum::Server::bind(&bind_addr).serve(
        router(config, provider, credentials, access_log)
            .into_make_service_with_connect_info::<SocketAddr>(),
    )
}
