//! Bounded, SSRF-guarded fetching of remote resources on behalf of clients.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - immutable configuration and request/outcome types
//! - [`core`] - pure transformations: classification, decoding, composition
//! - [`effects`] - I/O orchestration with trait abstraction
//!
//! plus a `net` layer holding the transport trait and the address gate.
//!
//! # Key properties
//!
//! - **Address gate**: targets are validated against their resolved
//!   addresses, not the hostname string, fresh on every call
//! - **Bounded**: one deadline covers the whole fetch phase; the byte
//!   ceiling is enforced while the body streams, never from `Content-Length`
//! - **Closed taxonomy**: every failure becomes one [`ProxyError`] carrying
//!   a stable HTTP status; no raw fault escapes to the caller
//!
//! # Example
//!
//! ```ignore
//! use metaproxy::{FetchRequest, Fetcher, ProxyConfig, ReqwestClient, compose, compose_error};
//!
//! let fetcher = Fetcher::new(ReqwestClient::new()?, ProxyConfig::default());
//! let request = FetchRequest::new("https://example.com/data.json");
//!
//! let reply = match fetcher.fetch(request).await {
//!     Ok(resource) => compose(&resource)?,
//!     Err(error) => compose_error(&error),
//! };
//! ```

mod core;
mod data;
mod effects;
mod error;
mod net;

pub use self::core::{JSON_UTF8, MediaKind, classify, compose, compose_error, decode, is_redirect};
pub use data::{
    DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, FetchRequest, Payload, ProxyConfig,
    ProxyResponse, Resource, header,
};
pub use effects::Fetcher;
pub use error::ProxyError;
pub use net::http::{BoxStream, HttpClient, RawResponse};
pub use net::validate::{ValidatedTarget, is_routable, validate_target};

#[cfg(feature = "reqwest")]
pub use net::http::ReqwestClient;
