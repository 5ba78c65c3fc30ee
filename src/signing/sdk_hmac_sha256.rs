//! Huawei Cloud SDK-HMAC-SHA256 signing: AWS-v4-like but single-step
//! (the final signature is a plain HMAC-SHA256 over the string-to-sign,
//! no chained key derivation as in TC3).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{hmac_sha256, sha256_hex};

/// Canonicalizes a URI so it always ends in `/`.
pub fn canonical_uri(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// Canonicalizes query params: sorted by key ascending, percent-encoded.
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonicalizes headers: sorted by lowercased key, `key:value\n` lines.
pub fn canonical_headers(headers: &BTreeMap<String, String>) -> (String, String) {
    let mut sorted: Vec<(String, String)> = headers
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.trim().to_string()))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    let canonical = sorted
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect::<String>();
    let signed = sorted
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");
    (canonical, signed)
}

#[allow(clippy::too_many_arguments)]
pub fn sign(
    access_key: &str,
    secret_access_key: &str,
    method: &str,
    uri: &str,
    query: &BTreeMap<String, String>,
    headers: &BTreeMap<String, String>,
    payload: &str,
    now: DateTime<Utc>,
) -> String {
    let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
    let (canon_headers, signed_headers) = canonical_headers(headers);
    let hashed_payload = sha256_hex(payload.as_bytes());
    let canonical_request = format!(
        "{method}\n{}\n{}\n{canon_headers}\n{signed_headers}\n{hashed_payload}",
        canonical_uri(uri),
        canonical_query(query),
    );
    let hashed_canonical_request = sha256_hex(canonical_request.as_bytes());
    let string_to_sign = format!("SDK-HMAC-SHA256\n{timestamp}\n{hashed_canonical_request}");
    let signature = hex::encode(hmac_sha256(secret_access_key.as_bytes(), string_to_sign.as_bytes()));

    format!("SDK-HMAC-SHA256 Access={access_key}, SignedHeaders={signed_headers}, Signature={signature}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn headers() -> BTreeMap<String, String> {
        let mut h = BTreeMap::new();
        h.insert("host".to_string(), "dns.myhuaweicloud.com".to_string());
        h.insert("content-type".to_string(), "application/json".to_string());
        h
    }

    #[test]
    fn trailing_slash_invariant() {
        assert_eq!(canonical_uri("/v2/zones"), "/v2/zones/");
        assert_eq!(canonical_uri("/v2/zones/"), "/v2/zones/");
    }

    #[test]
    fn signature_independent_of_header_insertion_order() {
        let q = BTreeMap::new();
        let a = sign("ak", "sk", "GET", "/v2/zones", &q, &headers(), "", ts());
        let mut reordered = BTreeMap::new();
        reordered.insert("content-type".to_string(), "application/json".to_string());
        reordered.insert("host".to_string(), "dns.myhuaweicloud.com".to_string());
        let b = sign("ak", "sk", "GET", "/v2/zones", &q, &reordered, "", ts());
        assert_eq!(a, b);
    }

    #[test]
    fn different_method_changes_signature() {
        let q = BTreeMap::new();
        let a = sign("ak", "sk", "GET", "/v2/zones", &q, &headers(), "", ts());
        let b = sign("ak", "sk", "POST", "/v2/zones", &q, &headers(), "", ts());
        assert_ne!(a, b);
    }

    #[test]
    fn signed_headers_lowercased_and_sorted() {
        let q = BTreeMap::new();
        let auth = sign("ak", "sk", "GET", "/v2/zones", &q, &headers(), "", ts());
        assert!(auth.contains("SignedHeaders=content-type;host"));
    }
}
