//! Transport (C3): a thin HTTP executor shared by every adapter.
//!
//! Bodies are treated as byte strings; adapters choose when to decode as
//! JSON or as GBK text (West.cn). JSON parse failure on an HTTP 2xx
//! response yields `InvalidResponse` carrying the raw text rather than a
//! generic parse error, so the caller can log/inspect the vendor's payload.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::{ErrorKind, GatewayError, Result};
use crate::utils::log_sanitizer::truncate_for_log;

static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

/// Returns the process-wide memoized `reqwest::Client`. A single pooled
/// client is shared by all adapters and credentials; connection pooling
/// is an opaque optimization owned by the transport, not by callers.
pub fn shared_client() -> Client {
    HTTP_CLIENT
        .get_or_init(|| {
            Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(30))
                .build()
                .expect("TLS backend unavailable or invalid client configuration")
        })
        .clone()
}

/// The outcome of a transport call: status code plus raw response body.
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Executes a single HTTP request with no retry logic (retry lives in
/// [`crate::base::BaseProvider::with_retry`], one layer up, since it must
/// wrap the whole sign+transport+decode round trip, not just the socket
/// call).
pub async fn execute(provider: &str, request: RequestBuilder) -> Result<RawResponse> {
    let response = request.send().await.map_err(|e| classify_reqwest_error(provider, &e))?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| classify_reqwest_error(provider, &e))?;
    log::debug!("[{provider}] HTTP {status}: {}", truncate_for_log(&body));
    Ok(RawResponse { status, body })
}

/// Same as [`execute`] but decodes the response body as GBK before
/// transcoding to UTF-8 (West.cn's API returns GBK-encoded text).
pub async fn execute_gbk(provider: &str, request: RequestBuilder) -> Result<RawResponse> {
    let response = request.send().await.map_err(|e| classify_reqwest_error(provider, &e))?;
    let status = response.status().as_u16();
    let bytes = response.bytes().await.map_err(|e| classify_reqwest_error(provider, &e))?;
    let (decoded, _, had_errors) = encoding_rs::GBK.decode(&bytes);
    if had_errors {
        log::warn!("[{provider}] GBK decoding encountered invalid sequences");
    }
    let body = decoded.into_owned();
    log::debug!("[{provider}] HTTP {status}: {}", truncate_for_log(&body));
    Ok(RawResponse { status, body })
}

fn classify_reqwest_error(provider: &str, e: &reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::new(ErrorKind::Network, format!("{provider}: request timed out")).retriable(true)
    } else if e.is_connect() {
        GatewayError::new(ErrorKind::Network, format!("{provider}: connection failed: {e}")).retriable(true)
    } else {
        GatewayError::new(ErrorKind::Network, format!("{provider}: {e}")).retriable(true)
    }
}

/// Parses a response body as JSON. On HTTP 2xx with invalid JSON, returns
/// `InvalidResponse` carrying the raw body so adapters can surface it;
/// a 204 with an empty body is treated as an empty JSON object.
pub fn parse_json<T: DeserializeOwned>(provider: &str, raw: &RawResponse) -> Result<T> {
    let text = if raw.status == 204 && raw.body.trim().is_empty() {
        "{}"
    } else {
        raw.body.as_str()
    };
    serde_json::from_str(text).map_err(|e| {
        GatewayError::new(
            ErrorKind::InvalidResponse,
            format!("{provider}: failed to parse JSON response: {e}"),
        )
        .with_meta("raw_body", truncate_for_log(&raw.body))
    })
}

/// Interprets an HTTP status that is not vendor-structured JSON as a
/// generic `HttpError`.
pub fn http_status_error(provider: &str, status: u16, body: &str) -> GatewayError {
    GatewayError::new(
        ErrorKind::HttpError,
        format!("{provider}: HTTP {status}: {}", truncate_for_log(body)),
    )
    .with_http_status(status)
}

/// Convenience: starts a request builder for `method url` on the shared
/// client.
pub fn request(method: Method, url: &str) -> RequestBuilder {
    shared_client().request(method, url)
}
