//! Gateway error taxonomy.
//!
//! `GatewayError` is the single closed error type returned by every
//! `Provider` operation and by the facade. It mirrors the wire-stable
//! envelope `{kind, vendorCode, message, httpStatus, retriable, meta}` so
//! upper layers can serialize it verbatim for logging or UI translation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of error kinds every adapter and the facade may raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    MissingCredentials,
    AuthFailed,
    ZoneNotFound,
    RecordNotFound,
    InvalidType,
    InvalidValue,
    Unsupported,
    RateLimited,
    Throttled,
    Network,
    InvalidResponse,
    HttpError,
    VendorError,
    RetryExhausted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingCredentials => "missing_credentials",
            Self::AuthFailed => "auth_failed",
            Self::ZoneNotFound => "zone_not_found",
            Self::RecordNotFound => "record_not_found",
            Self::InvalidType => "invalid_type",
            Self::InvalidValue => "invalid_value",
            Self::Unsupported => "unsupported",
            Self::RateLimited => "rate_limited",
            Self::Throttled => "throttled",
            Self::Network => "network",
            Self::InvalidResponse => "invalid_response",
            Self::HttpError => "http_error",
            Self::VendorError => "vendor_error",
            Self::RetryExhausted => "retry_exhausted",
        };
        f.write_str(s)
    }
}

/// A single gateway-level error, serializable to the stable envelope
/// consumed by upper layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub retriable: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub meta: BTreeMap<String, String>,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let retriable = matches!(
            kind,
            ErrorKind::RateLimited | ErrorKind::Throttled | ErrorKind::Network
        );
        Self {
            kind,
            vendor_code: None,
            message: message.into(),
            http_status: None,
            retriable,
            meta: BTreeMap::new(),
        }
    }

    pub fn with_vendor_code(mut self, code: impl Into<String>) -> Self {
        self.vendor_code = Some(code.into());
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        if status == 408 || status == 429 || status >= 500 {
            self.retriable = true;
        }
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn retriable(mut self, retriable: bool) -> Self {
        self.retriable = retriable;
        self
    }

    pub fn missing_credentials(field: &str) -> Self {
        Self::new(ErrorKind::MissingCredentials, format!("missing credential field '{field}'"))
    }

    pub fn unsupported(what: &str) -> Self {
        Self::new(ErrorKind::Unsupported, format!("operation not supported: {what}"))
    }

    pub fn zone_not_found(zone: &str) -> Self {
        Self::new(ErrorKind::ZoneNotFound, format!("zone not found: {zone}"))
    }

    pub fn record_not_found(record: &str) -> Self {
        Self::new(ErrorKind::RecordNotFound, format!("record not found: {record}"))
    }

    pub fn retry_exhausted(last: &GatewayError) -> Self {
        let mut err = Self::new(
            ErrorKind::RetryExhausted,
            format!("retry budget exhausted, last error: {}", last.message),
        )
        .with_meta("cause", last.kind.to_string())
        .retriable(false);
        if let Some(code) = &last.vendor_code {
            err = err.with_vendor_code(code.clone());
        }
        if let Some(status) = last.http_status {
            err.http_status = Some(status);
        }
        err
    }

    /// The network-error keyword set used by `BaseProvider::is_retriable`
    /// when classifying message-only transport failures.
    pub(crate) const NETWORK_KEYWORDS: &'static [&'static str] = &[
        "timeout",
        "timed out",
        "connection reset",
        "dns again",
        "host not found",
        "socket hang up",
        "network",
        "connection refused",
    ];
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(code) = &self.vendor_code {
            write!(f, " (vendor_code={code})")?;
        }
        if let Some(status) = self.http_status {
            write!(f, " (http_status={status})")?;
        }
        Ok(())
    }
}

impl std::error::Error for GatewayError {}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let e = GatewayError::new(ErrorKind::ZoneNotFound, "no such zone");
        assert_eq!(e.to_string(), "[zone_not_found] no such zone");
    }

    #[test]
    fn http_status_promotes_retriable() {
        let e = GatewayError::new(ErrorKind::VendorError, "boom").with_http_status(503);
        assert!(e.retriable);
        let e2 = GatewayError::new(ErrorKind::VendorError, "boom").with_http_status(400);
        assert!(!e2.retriable);
    }

    #[test]
    fn rate_limited_defaults_retriable() {
        let e = GatewayError::new(ErrorKind::RateLimited, "slow down");
        assert!(e.retriable);
    }

    #[test]
    fn retry_exhausted_carries_cause() {
        let last = GatewayError::new(ErrorKind::Network, "conn reset");
        let e = GatewayError::retry_exhausted(&last);
        assert_eq!(e.kind, ErrorKind::RetryExhausted);
        assert_eq!(e.meta.get("cause").map(String::as_str), Some("network"));
        assert!(!e.retriable);
    }

    #[test]
    fn retry_exhausted_carries_vendor_code_and_http_status() {
        let last = GatewayError::new(ErrorKind::VendorError, "rate limited")
            .with_vendor_code("429001")
            .with_http_status(429);
        let e = GatewayError::retry_exhausted(&last);
        assert_eq!(e.vendor_code.as_deref(), Some("429001"));
        assert_eq!(e.http_status, Some(429));
        assert!(!e.retriable, "retry_exhausted must stay non-retriable despite the 429 status");
    }

    #[test]
    fn serde_roundtrip() {
        let e = GatewayError::new(ErrorKind::HttpError, "bad gateway")
            .with_http_status(502)
            .with_vendor_code("UpstreamError");
        let json = serde_json::to_string(&e).unwrap();
        let back: GatewayError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, e.kind);
        assert_eq!(back.vendor_code, e.vendor_code);
        assert_eq!(back.http_status, e.http_status);
    }
}
