//! acmeproxy
//!
//! A relay for [RFC-8555][RFC-8555] [DNS-01] challenge requests. ACME clients
//! (e.g. lego's [httpreq] provider) `POST` present/cleanup requests to this
//! service, which authorizes the requested domain against a configured
//! allow-list and forwards the operation to a DNS-provider backend. This
//! keeps DNS credentials off the machines requesting certificates and scopes
//! what each of them may touch.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
//! [httpreq]: https://github.com/go-acme/lego/tree/master/providers/dns/httpreq
//!
#![warn(clippy::pedantic)]

pub mod access_log;
pub mod allowlist;
pub mod api;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod provider;

use crate::provider::{file, memory};
pub use api::new as new_http;
pub use config::{Config, Shared};
pub use file::FileProvider;
pub use memory::InMemoryProvider;
