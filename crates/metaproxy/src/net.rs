pub mod http;
pub mod validate;

pub use http::{BoxStream, HttpClient, RawResponse};
pub use validate::{ValidatedTarget, is_routable, validate_target};

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
