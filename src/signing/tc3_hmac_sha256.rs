//! TC3-HMAC-SHA256 signing, shared by DNSPod, Volcengine, and JDCloud.
//!
//! AWS-SigV4-style: canonical request -> string-to-sign -> date/service/
//! region-scoped derived signing key -> final HMAC-SHA256 signature.

use chrono::{DateTime, Utc};

use super::{hmac_sha256, sha256_hex};

/// Parameters identifying the service being signed for. `region` is
/// `None` for services (like DNSPod) whose TC3 scope has no region
/// component.
pub struct Tc3Scope<'a> {
    pub service: &'a str,
    pub region: Option<&'a str>,
}

impl Tc3Scope<'_> {
    fn credential_scope(&self, date: &str) -> String {
        match self.region {
            Some(region) => format!("{date}/{region}/{}/tc3_request", self.service),
            None => format!("{date}/{}/tc3_request", self.service),
        }
    }
}

/// Computes the `Authorization` header value for a TC3-HMAC-SHA256
/// request. `canonical_headers` must already be newline-terminated and
/// sorted by lowercased header name (matching `signed_headers`'s order).
#[allow(clippy::too_many_arguments)]
pub fn sign(
    secret_id: &str,
    secret_key: &str,
    scope: &Tc3Scope<'_>,
    host: &str,
    canonical_uri: &str,
    canonical_query_string: &str,
    canonical_headers: &str,
    signed_headers: &str,
    payload: &str,
    now: DateTime<Utc>,
) -> String {
    let _ = host; // host is embedded by the caller into canonical_headers
    let date = now.format("%Y-%m-%d").to_string();
    let timestamp = now.timestamp();

    let hashed_payload = sha256_hex(payload.as_bytes());
    let canonical_request = format!(
        "POST\n{canonical_uri}\n{canonical_query_string}\n{canonical_headers}\n{signed_headers}\n{hashed_payload}"
    );

    let algorithm = "TC3-HMAC-SHA256";
    let credential_scope = scope.credential_scope(&date);
    let hashed_canonical_request = sha256_hex(canonical_request.as_bytes());
    let string_to_sign =
        format!("{algorithm}\n{timestamp}\n{credential_scope}\n{hashed_canonical_request}");

    let secret_date = hmac_sha256(format!("TC3{secret_key}").as_bytes(), date.as_bytes());
    let secret_service = hmac_sha256(&secret_date, scope.service.as_bytes());
    let secret_signing = match scope.region {
        Some(region) => {
            let secret_region = hmac_sha256(&secret_date, region.as_bytes());
            let secret_service_scoped = hmac_sha256(&secret_region, scope.service.as_bytes());
            hmac_sha256(&secret_service_scoped, b"tc3_request")
        }
        None => hmac_sha256(&secret_service, b"tc3_request"),
    };
    let signature = hex::encode(hmac_sha256(&secret_signing, string_to_sign.as_bytes()));

    format!(
        "{algorithm} Credential={secret_id}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.timestamp_opt(1_705_305_600, 0).unwrap()
    }

    #[test]
    fn dnspod_style_no_region_format() {
        let scope = Tc3Scope {
            service: "dnspod",
            region: None,
        };
        let headers = "content-type:application/json; charset=utf-8\nhost:dnspod.tencentcloudapi.com\nx-tc-action:describerecordlist\n";
        let auth = sign(
            "id",
            "key",
            &scope,
            "dnspod.tencentcloudapi.com",
            "/",
            "",
            headers,
            "content-type;host;x-tc-action",
            "{}",
            ts(),
        );
        assert!(auth.starts_with("TC3-HMAC-SHA256 Credential=id/2024-01-15/dnspod/tc3_request"));
        assert!(auth.contains("SignedHeaders=content-type;host;x-tc-action"));
    }

    #[test]
    fn volcengine_style_with_region_differs_from_no_region() {
        let no_region = Tc3Scope {
            service: "dns",
            region: None,
        };
        let with_region = Tc3Scope {
            service: "dns",
            region: Some("cn-north-1"),
        };
        let headers = "host:open.volcengineapi.com\n";
        let a = sign("id", "key", &no_region, "h", "/", "", headers, "host", "{}", ts());
        let b = sign("id", "key", &with_region, "h", "/", "", headers, "host", "{}", ts());
        assert_ne!(a, b);
        assert!(b.contains("cn-north-1/dns/tc3_request"));
    }

    #[test]
    fn different_payload_changes_signature() {
        let scope = Tc3Scope {
            service: "dnspod",
            region: None,
        };
        let headers = "host:h\n";
        let a = sign("id", "key", &scope, "h", "/", "", headers, "host", "{}", ts());
        let b = sign("id", "key", &scope, "h", "/", "", headers, "host", "{\"a\":1}", ts());
        assert_ne!(a, b);
    }
}
