//! Classic Aliyun RPC signing: HMAC-SHA1 over a canonicalized query string.
//!
//! `Signature = Base64(HMAC-SHA1(key = accessKeySecret + '&',
//!   data = "GET&%2F&" + percentEncode(canonicalizedQueryString)))`

use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;

/// Aliyun's RFC3986 percent-encoding rule (space as `%20`, `*` as `%2A`,
/// `~` left unescaped) is exactly what `urlencoding::encode` already
/// produces, so no post-processing is needed here.
pub fn percent_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Builds the canonicalized query string: params sorted by key, each key
/// and value percent-encoded, joined with `&`.
pub fn canonicalize(params: &[(String, String)]) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    sorted
        .into_iter()
        .map(|(k, v)| format!("{}={}", percent_encode(&k), percent_encode(&v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Returns the full set of request params (action + business params +
/// the common Aliyun RPC params) with `Signature` computed and appended,
/// ready to be serialized into the final query string.
pub fn sign(
    access_key_id: &str,
    access_key_secret: &str,
    mut params: Vec<(String, String)>,
    now: DateTime<Utc>,
    nonce: &str,
) -> Vec<(String, String)> {
    params.push(("AccessKeyId".to_string(), access_key_id.to_string()));
    params.push(("Format".to_string(), "JSON".to_string()));
    params.push(("SignatureMethod".to_string(), "HMAC-SHA1".to_string()));
    params.push(("SignatureNonce".to_string(), nonce.to_string()));
    params.push(("SignatureVersion".to_string(), "1.0".to_string()));
    params.push((
        "Timestamp".to_string(),
        now.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    ));

    let canonicalized = canonicalize(&params);
    let string_to_sign = format!("GET&%2F&{}", percent_encode(&canonicalized));

    let key = format!("{access_key_secret}&");
    let mut mac = <Hmac<Sha1>>::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(string_to_sign.as_bytes());
    let signature = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    params.push(("Signature".to_string(), signature));
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
    }

    #[test]
    fn sign_includes_common_params_and_signature() {
        let params = vec![
            ("Action".to_string(), "AddDomainRecord".to_string()),
            ("DomainName".to_string(), "example.com".to_string()),
            ("Version".to_string(), "2015-01-09".to_string()),
        ];
        let signed = sign("AK", "SK", params, ts(), "nonce-1");
        let keys: Vec<_> = signed.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"AccessKeyId"));
        assert!(keys.contains(&"Format"));
        assert!(keys.contains(&"SignatureMethod"));
        assert!(keys.contains(&"Version"));
        assert!(keys.contains(&"Signature"));
    }

    #[test]
    fn sign_is_deterministic() {
        let params = vec![("Action".to_string(), "DescribeDomains".to_string())];
        let a = sign("AK", "SK", params.clone(), ts(), "n1");
        let b = sign("AK", "SK", params, ts(), "n1");
        let sig_a = a.iter().find(|(k, _)| k == "Signature").unwrap();
        let sig_b = b.iter().find(|(k, _)| k == "Signature").unwrap();
        assert_eq!(sig_a, sig_b);
    }

    #[test]
    fn different_secret_changes_signature() {
        let params = vec![("Action".to_string(), "DescribeDomains".to_string())];
        let a = sign("AK", "SK1", params.clone(), ts(), "n1");
        let b = sign("AK", "SK2", params, ts(), "n1");
        let sig_a = a.iter().find(|(k, _)| k == "Signature").unwrap().1.clone();
        let sig_b = b.iter().find(|(k, _)| k == "Signature").unwrap().1.clone();
        assert_ne!(sig_a, sig_b);
    }

    #[test]
    fn percent_encode_matches_aliyun_rfc3986_rule() {
        assert_eq!(percent_encode("a b"), "a%20b");
        assert_eq!(percent_encode("a*b"), "a%2Ab");
        assert_eq!(percent_encode("a~b"), "a~b");
    }

    #[test]
    fn canonicalize_sorts_by_key() {
        let params = vec![
            ("Z".to_string(), "1".to_string()),
            ("A".to_string(), "2".to_string()),
        ];
        assert_eq!(canonicalize(&params), "A=2&Z=1");
    }
}
