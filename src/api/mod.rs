//! HTTP API relaying ACME DNS-01 challenge requests to the configured
//! DNS-provider backend.
//!
//! # API Endpoints
//!
//! ## `/health` (GET)
//!
//!   Returns HTTP 200 (OK) and the body `OK` when the service is operational.
//!   Never authenticated or IP-filtered.
//!
//! ## `/present` (POST), `/cleanup` (POST)
//!
//!   Expect a JSON request body in one of two shapes, matching lego's
//!   [httpreq] provider:
//!
//!   ```json
//!   { "fqdn": "_acme-challenge.test.example.com.", "value": "XXXX" }
//!   ```
//!
//!   (default mode, relayed to the backend's direct record operations), or
//!
//!   ```json
//!   { "domain": "test.example.com", "token": "XXXX", "keyauth": "XXXX" }
//!   ```
//!
//!   (raw mode, relayed to the backend's generic present/cleanup operations).
//!
//!   The domain being modified must fall under one of the configured
//!   allowed-domains. On success the received field group is echoed back as
//!   JSON; errors are plain text. Any method other than `POST` yields 405,
//!   and any path other than the above yields 403.
//!
//! Both challenge routes sit behind the same optional middleware chain:
//! basic authentication (htpasswd file), source-IP filtering (CIDR
//! allow-list) and access logging, each active only when configured.
//!
//! [httpreq]: https://github.com/go-acme/lego/tree/master/providers/dns/httpreq

mod api_error;
mod middleware;
pub mod model;
mod routes;
pub mod server;

pub use server::{new, router};
