//! Error types for metaproxy.
//!
//! Every failure the proxy can produce is one variant of [`ProxyError`],
//! created at the point of detection. Callers render a failure by switching
//! on [`ProxyError::status`]; no unclassified fault crosses the crate
//! boundary.

use std::net::IpAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The URI scheme is not `http` or `https`.
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// The URI is absent, malformed, or does not name a resolvable host.
    #[error("absent or malformed URI: {0}")]
    InvalidUri(String),

    /// A composed response header had no usable value.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// The target resolves to a private or otherwise non-routable address.
    #[error("private address: {0}")]
    PrivateAddress(IpAddr),

    /// The proxy is switched off in configuration.
    #[error("proxy disabled")]
    Disabled,

    /// The response body crossed the byte ceiling while streaming.
    #[error("max content size exceeded: {limit}")]
    MaxSizeExceeded { limit: u64 },

    /// The response could not be decoded under its declared content type.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Any transport failure that is not a timeout or size violation.
    #[error("general error: {0}")]
    General(String),

    /// The single deadline over the fetch phase elapsed.
    #[error("gateway timeout")]
    Timeout,
}

impl ProxyError {
    /// The stable HTTP status for this failure category.
    pub fn status(&self) -> u16 {
        match self {
            Self::UnsupportedProtocol(_) | Self::InvalidUri(_) | Self::MissingHeader(_) => 400,
            Self::PrivateAddress(_) => 403,
            Self::Disabled => 404,
            Self::MaxSizeExceeded { .. } => 413,
            Self::UnsupportedMediaType(_) => 415,
            Self::General(_) => 500,
            Self::Timeout => 504,
        }
    }
}
