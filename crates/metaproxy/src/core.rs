//! Core layer: pure transformations.
//!
//! Media classification, body decoding, and response composition. Nothing
//! here performs I/O; everything is testable on plain values.

use bytes::Bytes;

use crate::data::{Payload, ProxyResponse, Resource, header};
use crate::error::ProxyError;

/// Content type stamped on JSON replies and error bodies.
pub const JSON_UTF8: &str = "application/json; charset=utf-8";

/// How a response body will be decoded, derived from the declared content
/// type alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// `application/json`, or any `+json` suffix, with or without parameters.
    Json,
    /// `text/*`, decoded as UTF-8.
    Text,
    /// Any other declared type; kept as opaque bytes.
    Binary,
}

/// Classify a declared content type.
///
/// An absent or empty content type is not decodable by any branch and is a
/// media-type violation, not a general fault.
pub fn classify(content_type: Option<&str>) -> Result<MediaKind, ProxyError> {
    let Some(content_type) = content_type else {
        return Err(ProxyError::UnsupportedMediaType(
            "missing content-type".to_string(),
        ));
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if essence.is_empty() {
        Err(ProxyError::UnsupportedMediaType(
            "empty content-type".to_string(),
        ))
    } else if essence == "application/json" || essence.ends_with("+json") {
        Ok(MediaKind::Json)
    } else if essence.starts_with("text/") {
        Ok(MediaKind::Text)
    } else {
        Ok(MediaKind::Binary)
    }
}

/// Decode a fully-read body under its classified kind.
///
/// A body that was declared JSON but does not parse is a contract violation
/// of the target resource, so it maps to [`ProxyError::UnsupportedMediaType`]
/// rather than a general fault.
pub fn decode(kind: MediaKind, body: Bytes) -> Result<Payload, ProxyError> {
    match kind {
        MediaKind::Binary => Ok(Payload::Binary(body)),
        MediaKind::Text => Ok(Payload::Text(String::from_utf8_lossy(&body).into_owned())),
        MediaKind::Json => {
            let text = std::str::from_utf8(&body).map_err(|e| {
                ProxyError::UnsupportedMediaType(format!("declared JSON is not UTF-8: {e}"))
            })?;
            let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
                ProxyError::UnsupportedMediaType(format!("declared JSON does not parse: {e}"))
            })?;
            Ok(Payload::Json(value))
        }
    }
}

/// Whether a status code asks the client to follow a `Location` header.
pub fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

fn required(value: &str, name: &'static str) -> Result<String, ProxyError> {
    if value.is_empty() {
        Err(ProxyError::MissingHeader(name))
    } else {
        Ok(value.to_string())
    }
}

/// Re-serialize a fetched resource into an outbound reply.
///
/// Only a safe subset of upstream headers survives: `cache-control`,
/// `content-type`, and `etag`, each with a default when the upstream omitted
/// it. `content-length` is taken from the upstream for binary payloads and
/// recomputed from the emitted body everywhere else; for text that is the
/// UTF-8 byte length, never the character count.
pub fn compose(resource: &Resource) -> Result<ProxyResponse, ProxyError> {
    let upstream = &resource.headers;

    let cache_control = required(
        header(upstream, "cache-control").unwrap_or("no-cache"),
        "cache-control",
    )?;
    let etag = required(header(upstream, "etag").unwrap_or("no-etag"), "etag")?;
    let upstream_type = required(
        header(upstream, "content-type").unwrap_or(JSON_UTF8),
        "content-type",
    )?;

    let (content_type, body, content_length) = match &resource.payload {
        Payload::Binary(bytes) => {
            let length = header(upstream, "content-length")
                .map(str::to_string)
                .unwrap_or_else(|| bytes.len().to_string());
            (upstream_type, bytes.clone(), length)
        }
        Payload::Json(value) => {
            let bytes = Bytes::from(
                serde_json::to_vec(value)
                    .map_err(|e| ProxyError::General(format!("reserialize failed: {e}")))?,
            );
            let length = bytes.len().to_string();
            (JSON_UTF8.to_string(), bytes, length)
        }
        Payload::Text(text) => {
            let bytes = Bytes::from(text.clone().into_bytes());
            let length = bytes.len().to_string();
            (upstream_type, bytes, length)
        }
    };

    Ok(ProxyResponse {
        status: 200,
        headers: vec![
            ("cache-control".to_string(), cache_control),
            ("content-type".to_string(), content_type),
            ("etag".to_string(), etag),
            ("content-length".to_string(), content_length),
        ],
        body,
    })
}

/// Render a failure as its stable status plus a minimal `{"error": ...}`
/// body.
pub fn compose_error(error: &ProxyError) -> ProxyResponse {
    let body = serde_json::json!({ "error": error.to_string() });
    let bytes = Bytes::from(serde_json::to_vec(&body).unwrap_or_default());
    ProxyResponse {
        status: error.status(),
        headers: vec![
            ("cache-control".to_string(), "no-cache".to_string()),
            ("content-type".to_string(), JSON_UTF8.to_string()),
            ("content-length".to_string(), bytes.len().to_string()),
        ],
        body: bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn classify_json_variants() {
        assert_eq!(classify(Some("application/json")).unwrap(), MediaKind::Json);
        assert_eq!(
            classify(Some("application/json; charset=utf-8")).unwrap(),
            MediaKind::Json
        );
        assert_eq!(
            classify(Some("application/ld+json")).unwrap(),
            MediaKind::Json
        );
        assert_eq!(classify(Some("Application/JSON")).unwrap(), MediaKind::Json);
    }

    #[test]
    fn classify_text_and_binary() {
        assert_eq!(classify(Some("text/plain")).unwrap(), MediaKind::Text);
        assert_eq!(
            classify(Some("text/html; charset=utf-8")).unwrap(),
            MediaKind::Text
        );
        assert_eq!(classify(Some("image/png")).unwrap(), MediaKind::Binary);
        assert_eq!(
            classify(Some("application/octet-stream")).unwrap(),
            MediaKind::Binary
        );
    }

    #[test]
    fn classify_absent_is_media_violation() {
        assert!(matches!(
            classify(None),
            Err(ProxyError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            classify(Some("  ")),
            Err(ProxyError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn decode_json_round_trip() {
        let payload = decode(MediaKind::Json, Bytes::from_static(b"{\"a\":1}")).unwrap();
        assert_eq!(payload, Payload::Json(json!({"a": 1})));
    }

    #[test]
    fn decode_malformed_json_is_media_violation() {
        let result = decode(MediaKind::Json, Bytes::from_static(b"<html>nope</html>"));
        assert!(matches!(result, Err(ProxyError::UnsupportedMediaType(_))));
    }

    #[test]
    fn decode_text_and_binary() {
        let text = decode(MediaKind::Text, Bytes::from_static("héllo".as_bytes())).unwrap();
        assert_eq!(text, Payload::Text("héllo".to_string()));

        let raw = Bytes::from_static(&[0x89, 0x50, 0x4e, 0x47]);
        let binary = decode(MediaKind::Binary, raw.clone()).unwrap();
        assert_eq!(binary, Payload::Binary(raw));
    }

    #[test]
    fn redirect_statuses() {
        for status in [301, 302, 303, 307, 308] {
            assert!(is_redirect(status));
        }
        for status in [200, 204, 400, 500] {
            assert!(!is_redirect(status));
        }
    }

    #[test]
    fn compose_json_normalizes_content_type() {
        let resource = Resource {
            payload: Payload::Json(json!({"a": 1})),
            headers: headers(&[("content-type", "application/json")]),
        };
        let response = compose(&resource).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(header(&response.headers, "content-type"), Some(JSON_UTF8));
        assert_eq!(header(&response.headers, "cache-control"), Some("no-cache"));
        assert_eq!(header(&response.headers, "etag"), Some("no-etag"));
        assert_eq!(response.body, Bytes::from_static(b"{\"a\":1}"));
        assert_eq!(header(&response.headers, "content-length"), Some("7"));
    }

    #[test]
    fn compose_text_uses_byte_length() {
        let resource = Resource {
            payload: Payload::Text("héllo".to_string()),
            headers: headers(&[("content-type", "text/plain"), ("etag", "\"abc\"")]),
        };
        let response = compose(&resource).unwrap();
        // 5 characters, 6 bytes
        assert_eq!(header(&response.headers, "content-length"), Some("6"));
        assert_eq!(header(&response.headers, "content-type"), Some("text/plain"));
        assert_eq!(header(&response.headers, "etag"), Some("\"abc\""));
    }

    #[test]
    fn compose_binary_prefers_upstream_length() {
        let resource = Resource {
            payload: Payload::Binary(Bytes::from_static(&[1, 2, 3])),
            headers: headers(&[
                ("content-type", "image/png"),
                ("content-length", "3"),
                ("cache-control", "max-age=60"),
            ]),
        };
        let response = compose(&resource).unwrap();
        assert_eq!(header(&response.headers, "content-length"), Some("3"));
        assert_eq!(header(&response.headers, "cache-control"), Some("max-age=60"));
        assert_eq!(response.body, Bytes::from_static(&[1, 2, 3]));
    }

    #[test]
    fn compose_rejects_empty_required_header() {
        let resource = Resource {
            payload: Payload::Text("x".to_string()),
            headers: headers(&[("content-type", "")]),
        };
        assert!(matches!(
            compose(&resource),
            Err(ProxyError::MissingHeader("content-type"))
        ));
    }

    #[test]
    fn compose_error_renders_status_and_body() {
        let response = compose_error(&ProxyError::Timeout);
        assert_eq!(response.status, 504);
        assert_eq!(header(&response.headers, "content-type"), Some(JSON_UTF8));
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body, json!({"error": "gateway timeout"}));
    }
}
