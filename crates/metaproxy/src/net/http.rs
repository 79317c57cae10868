//! Transport abstraction over streaming HTTP responses.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

/// A boxed stream of response body chunks.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// A live response whose body has not been read yet: status, headers, and
/// the as-yet-undecoded body channel.
///
/// Header names are lowercased; order is preserved.
pub struct RawResponse<E> {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: BoxStream<'static, Result<Bytes, E>>,
}

/// Minimal client interface the fetcher needs: one GET, streamed back.
///
/// Implementations must not follow redirects on their own; the fetcher
/// re-validates every redirect target against the address gate itself.
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - Mock implementations for testing
pub trait HttpClient: Send + Sync {
    /// Error type for transport failures.
    type Error: std::error::Error + Send + 'static;

    /// Issue a single request and return the response with its body as a
    /// stream. Headers are sent verbatim, in order.
    fn request(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<RawResponse<Self::Error>, Self::Error>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use futures_util::StreamExt;

    use super::*;
    use crate::error::ProxyError;

    /// Production HTTP client.
    ///
    /// Built with redirects disabled so that every hop passes back through
    /// the fetcher's address gate instead of being followed blindly by the
    /// transport.
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new() -> Result<Self, ProxyError> {
            let client = reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .map_err(|e| ProxyError::General(e.to_string()))?;
            Ok(Self { client })
        }
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn request(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> Result<RawResponse<Self::Error>, Self::Error> {
            let mut request = self.client.get(url);
            for (name, value) in headers {
                request = request.header(name, value);
            }

            let response = request.send().await?;
            let status = response.status().as_u16();

            let mut response_headers = Vec::new();
            for (name, value) in response.headers() {
                if let Ok(value) = value.to_str() {
                    response_headers.push((name.as_str().to_string(), value.to_string()));
                }
            }

            Ok(RawResponse {
                status,
                headers: response_headers,
                body: response.bytes_stream().boxed(),
            })
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
