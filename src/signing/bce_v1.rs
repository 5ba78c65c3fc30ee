//! Baidu Cloud Engine (BCE) v1 signing.
//!
//! `authorization: bce-auth-v1/<AK>/<timestamp>/<expire>/<signedHeaders>/<sig>`
//! Signing key = HMAC-SHA256(secretKey, authStringPrefix); final signature
//! = HMAC-SHA256(signingKey, canonicalRequest).

use chrono::{DateTime, Utc};

use super::hmac_sha256;

fn canonical_uri(path: &str) -> String {
    urlencoding::encode(path).replace("%2F", "/")
}

fn canonical_query(params: &[(String, String)]) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted
        .into_iter()
        .filter(|(k, _)| k != "authorization")
        .map(|(k, v)| format!("{}={}", urlencoding::encode(&k), urlencoding::encode(&v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn canonical_headers(headers: &[(String, String)]) -> (String, String) {
    let mut sorted: Vec<(String, String)> = headers
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.clone()))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    let canonical = sorted
        .iter()
        .map(|(k, v)| format!("{}:{}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("\n");
    let signed = sorted
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");
    (canonical, signed)
}

pub fn sign(
    access_key: &str,
    secret_key: &str,
    method: &str,
    uri: &str,
    query: &[(String, String)],
    headers: &[(String, String)],
    now: DateTime<Utc>,
    expire_seconds: u32,
) -> String {
    let timestamp = now.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let auth_string_prefix = format!("bce-auth-v1/{access_key}/{timestamp}/{expire_seconds}");
    let signing_key = hex::encode(hmac_sha256(secret_key.as_bytes(), auth_string_prefix.as_bytes()));

    let (canon_headers, signed_headers) = canonical_headers(headers);
    let canonical_request = format!(
        "{method}\n{}\n{}\n{canon_headers}",
        canonical_uri(uri),
        canonical_query(query),
    );
    let signature = hex::encode(hmac_sha256(signing_key.as_bytes(), canonical_request.as_bytes()));

    format!("{auth_string_prefix}/{signed_headers}/{signature}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn format_has_five_slash_separated_parts() {
        let headers = vec![("host".to_string(), "dns.baidubce.com".to_string())];
        let auth = sign("ak", "sk", "GET", "/v1/zones", &[], &headers, ts(), 1800);
        assert_eq!(auth.matches('/').count(), 5);
        assert!(auth.starts_with("bce-auth-v1/ak/"));
    }

    #[test]
    fn different_secret_changes_signature() {
        let headers = vec![("host".to_string(), "dns.baidubce.com".to_string())];
        let a = sign("ak", "sk1", "GET", "/v1/zones", &[], &headers, ts(), 1800);
        let b = sign("ak", "sk2", "GET", "/v1/zones", &[], &headers, ts(), 1800);
        assert_ne!(a, b);
    }
}
