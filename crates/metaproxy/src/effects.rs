//! Effects layer: the bounded fetch operation.
//!
//! One call runs validation, the outbound request, the size-limited body
//! read, and decoding under a single deadline. Calls are independent; the
//! only shared state is the read-only configuration and the transport
//! client.

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tokio::time::timeout;

use crate::core;
use crate::data::{FetchRequest, ProxyConfig, Resource, header};
use crate::error::ProxyError;
use crate::net::http::{BoxStream, HttpClient, RawResponse};
use crate::net::validate::validate_target;

/// Redirect hops followed before the call is abandoned. Every hop is
/// re-validated against the address gate.
const MAX_REDIRECTS: usize = 10;

/// Fetches remote resources under the configured limits.
pub struct Fetcher<C: HttpClient> {
    client: C,
    config: ProxyConfig,
}

impl<C: HttpClient> Fetcher<C> {
    pub fn new(client: C, config: ProxyConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fetch one resource.
    ///
    /// Validation strictly precedes the request, which strictly precedes
    /// decoding. The deadline covers all three; when it elapses the
    /// in-flight operation is dropped, which aborts the underlying
    /// connection rather than merely ceasing to wait for it.
    pub async fn fetch(&self, request: FetchRequest) -> Result<Resource, ProxyError> {
        if !self.config.enabled {
            return Err(ProxyError::Disabled);
        }

        let deadline = request.timeout.unwrap_or(self.config.timeout);
        let max_bytes = request.max_bytes.unwrap_or(self.config.max_bytes);
        let headers = self.outbound_headers(&request);

        match timeout(deadline, self.fetch_inner(request.uri, headers, max_bytes)).await {
            Ok(result) => result,
            Err(_) => Err(ProxyError::Timeout),
        }
    }

    /// Caller headers travel verbatim; the configured user agent fills in
    /// only when the caller sent none.
    fn outbound_headers(&self, request: &FetchRequest) -> Vec<(String, String)> {
        let mut headers = request.headers.clone();
        if header(&headers, "user-agent").is_none() {
            headers.push(("user-agent".to_string(), self.config.user_agent.clone()));
        }
        headers
    }

    async fn fetch_inner(
        &self,
        uri: String,
        headers: Vec<(String, String)>,
        max_bytes: u64,
    ) -> Result<Resource, ProxyError> {
        let mut uri = uri;

        for hop in 0..=MAX_REDIRECTS {
            let target = validate_target(&uri).await?;

            let response = self
                .client
                .request(target.url().as_str(), &headers)
                .await
                .map_err(|e| ProxyError::General(e.to_string()))?;

            if core::is_redirect(response.status) {
                let location = header(&response.headers, "location").ok_or_else(|| {
                    ProxyError::General(format!("redirect {} without location", response.status))
                })?;
                // Relative targets resolve against the current URL. The next
                // loop iteration runs the full gate on the result.
                uri = target
                    .url()
                    .join(location)
                    .map_err(|e| ProxyError::General(format!("bad redirect target: {e}")))?
                    .to_string();
                tracing::debug!(hop, %uri, "following redirect");
                continue;
            }

            let RawResponse {
                status,
                headers: upstream,
                body,
            } = response;

            let kind = core::classify(header(&upstream, "content-type"))?;
            let bytes = read_bounded(body, max_bytes).await?;
            tracing::debug!(status, ?kind, bytes = bytes.len(), "resource fetched");

            let payload = core::decode(kind, bytes)?;
            return Ok(Resource {
                payload,
                headers: upstream,
            });
        }

        Err(ProxyError::General(format!(
            "too many redirects (limit {MAX_REDIRECTS})"
        )))
    }
}

/// Accumulate a body stream, aborting the instant the running byte count
/// crosses the ceiling. The declared `Content-Length` is never consulted; it
/// can be absent, wrong, or adversarial.
async fn read_bounded<E: std::error::Error>(
    mut body: BoxStream<'static, Result<Bytes, E>>,
    max_bytes: u64,
) -> Result<Bytes, ProxyError> {
    let mut buf = BytesMut::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| ProxyError::General(e.to_string()))?;
        if (buf.len() + chunk.len()) as u64 > max_bytes {
            return Err(ProxyError::MaxSizeExceeded { limit: max_bytes });
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(buf.freeze())
}
