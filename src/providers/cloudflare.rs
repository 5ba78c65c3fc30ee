//! Cloudflare adapter: bearer-token auth, server paging, numeric-free zone
//! IDs (the zone-ID string itself is the vendor handle — `requiresDomainId`
//! still applies since it isn't the zone name).

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use crate::base::BaseProvider;
use crate::error::{ErrorKind, GatewayError, Result};
use crate::provider::{Page, Provider};
use crate::transport;
use crate::types::{
    AuthField, AuthFieldKind, Capabilities, DnsLine, DnsRecord, PagingMode, ProviderKind,
    RecordParams, RecordQuery, RemarkMode, ServiceContext, Zone, ZoneStatus,
};

const BASE_URL: &str = "https://api.cloudflare.com/client/v4";

pub fn capabilities() -> Capabilities {
    Capabilities {
        supports_weight: false,
        supports_line: false,
        supports_status: false,
        supports_remark: false,
        supports_url_forward: false,
        supports_logs: false,
        requires_domain_id: true,
        remark_mode: RemarkMode::Unsupported,
        paging: PagingMode::Server,
        record_types: vec!["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV", "CAA"]
            .into_iter()
            .map(String::from)
            .collect(),
        auth_fields: vec![AuthField::new("apiToken", "API Token", AuthFieldKind::Password)],
        domain_cache_ttl: 300,
        record_cache_ttl: 60,
        retryable_errors: vec![],
        max_retries: 2,
    }
}

#[derive(Debug)]
pub struct CloudflareProvider {
    base: BaseProvider,
    api_token: String,
}

impl CloudflareProvider {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        let api_token = super::require_secret(ctx, "apiToken")?;
        Ok(Self {
            base: BaseProvider::new("cloudflare", capabilities()),
            api_token,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        transport::request(method, &format!("{BASE_URL}{path}")).bearer_auth(&self.api_token)
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, method: Method, path: &str, body: Option<serde_json::Value>) -> Result<T> {
        self.base
            .with_retry(|| async {
                let mut req = self.request(method.clone(), path);
                if let Some(b) = &body {
                    req = req.json(b);
                }
                let raw = transport::execute("cloudflare", req).await?;
                if raw.status >= 400 {
                    return Err(self.map_error(raw.status, &raw.body));
                }
                let envelope: CfEnvelope<T> = transport::parse_json("cloudflare", &raw)?;
                if !envelope.success {
                    let msg = envelope
                        .errors
                        .first()
                        .map(|e| e.message.clone())
                        .unwrap_or_else(|| "unknown cloudflare error".to_string());
                    let code = envelope.errors.first().map(|e| e.code.to_string());
                    return Err(self.base.new_error(ErrorKind::VendorError, code.as_deref(), msg, Some(raw.status)));
                }
                envelope
                    .result
                    .ok_or_else(|| self.base.new_error(ErrorKind::InvalidResponse, None, "missing result", None))
            })
            .await
    }

    fn map_error(&self, status: u16, body: &str) -> GatewayError {
        if status == 401 || status == 403 {
            return self.base.new_error(ErrorKind::AuthFailed, None, "cloudflare authentication failed", Some(status));
        }
        transport::http_status_error("cloudflare", status, body)
    }

    fn zone_to_canonical(z: CfZone) -> Zone {
        let status = match z.status.as_str() {
            "active" => ZoneStatus::Active,
            "pending" | "initializing" => ZoneStatus::Pending,
            "moved" | "deactivated" => ZoneStatus::Paused,
            _ => ZoneStatus::Unknown,
        };
        Zone {
            id: z.id,
            name: BaseProvider::normalize_name(&z.name),
            status,
            record_count: None,
            updated_at: None,
            meta: Default::default(),
        }
    }

    fn record_to_canonical(rec: CfRecord, zone_id: &str, zone_name: &str) -> DnsRecord {
        let (value, priority) = match rec.record_type.as_str() {
            "MX" => (rec.content.clone(), rec.priority),
            _ => (rec.content.clone(), None),
        };
        DnsRecord {
            id: rec.id,
            zone_id: zone_id.to_string(),
            zone_name: zone_name.to_string(),
            name: BaseProvider::normalize_name(&rec.name),
            record_type: rec.record_type,
            value,
            ttl: rec.ttl,
            line: None,
            weight: None,
            priority,
            status: None,
            remark: None,
            proxied: rec.proxied,
            updated_at: None,
            meta: Default::default(),
        }
    }

    fn build_body(&self, full_name: &str, params: &RecordParams) -> serde_json::Value {
        let mut body = json!({
            "type": params.record_type,
            "name": full_name,
            "content": params.value,
            "ttl": params.ttl,
        });
        if params.record_type.eq_ignore_ascii_case("MX") {
            body["priority"] = json!(params.priority.unwrap_or(10));
        }
        if matches!(params.record_type.as_str(), "A" | "AAAA" | "CNAME") {
            body["proxied"] = json!(params.proxied.unwrap_or(false));
        }
        body
    }
}

#[async_trait]
impl Provider for CloudflareProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Cloudflare
    }

    fn capabilities(&self) -> &Capabilities {
        &self.base.capabilities
    }

    async fn check_auth(&self) -> bool {
        self.call::<CfTokenStatus>(Method::GET, "/user/tokens/verify", None)
            .await
            .map(|r| r.status == "active")
            .unwrap_or(false)
    }

    async fn get_zones(&self, page: u32, page_size: u32, keyword: Option<&str>) -> Result<Page<Zone>> {
        let page_size = page_size.min(50);
        let mut path = format!("/zones?page={page}&per_page={page_size}");
        if let Some(kw) = keyword {
            path.push_str(&format!("&name.contains={}", urlencoding::encode(kw)));
        }
        let (zones, info) = self.call_with_info::<CfZone>(&path).await?;
        let items = zones.into_iter().map(Self::zone_to_canonical).collect();
        Ok(Page::new(items, page, page_size, info.total_count))
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        let zone: CfZone = self.call(Method::GET, &format!("/zones/{zone_id}"), None).await?;
        Ok(Self::zone_to_canonical(zone))
    }

    async fn get_records(&self, zone_id: &str, query: &RecordQuery) -> Result<Page<DnsRecord>> {
        let zone = self.get_zone(zone_id).await?;
        let page = query.page();
        let page_size = query.page_size(100);
        let mut path = format!("/zones/{zone_id}/dns_records?page={page}&per_page={page_size}");
        if let Some(kw) = &query.keyword {
            path.push_str(&format!("&name.contains={}", urlencoding::encode(kw)));
        }
        if let Some(t) = &query.record_type {
            path.push_str(&format!("&type={}", urlencoding::encode(t)));
        }
        let (records, info) = self.call_with_info::<CfRecord>(&path).await?;
        let items = records
            .into_iter()
            .map(|r| Self::record_to_canonical(r, zone_id, &zone.name))
            .collect();
        Ok(Page::new(items, page, page_size, info.total_count))
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        let zone = self.get_zone(zone_id).await?;
        let rec: CfRecord = self.call(Method::GET, &format!("/zones/{zone_id}/dns_records/{record_id}"), None).await?;
        Ok(Self::record_to_canonical(rec, zone_id, &zone.name))
    }

    async fn create_record(&self, zone_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let zone = self.get_zone(zone_id).await?;
        let full_name = BaseProvider::relative_to_full_name(&params.name, &zone.name);
        let body = self.build_body(&full_name, params);
        let rec: CfRecord = self
            .call(Method::POST, &format!("/zones/{zone_id}/dns_records"), Some(body))
            .await?;
        Ok(Self::record_to_canonical(rec, zone_id, &zone.name))
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let zone = self.get_zone(zone_id).await?;
        let full_name = BaseProvider::relative_to_full_name(&params.name, &zone.name);
        let body = self.build_body(&full_name, params);
        let rec: CfRecord = self
            .call(Method::PATCH, &format!("/zones/{zone_id}/dns_records/{record_id}"), Some(body))
            .await?;
        Ok(Self::record_to_canonical(rec, zone_id, &zone.name))
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<bool> {
        let _: serde_json::Value = self
            .call(Method::DELETE, &format!("/zones/{zone_id}/dns_records/{record_id}"), None)
            .await?;
        Ok(true)
    }

    async fn set_record_status(&self, _zone_id: &str, _record_id: &str, _enabled: bool) -> Result<bool> {
        Err(GatewayError::unsupported("setRecordStatus"))
    }

    async fn get_lines(&self, _zone_id: Option<&str>) -> Result<Vec<DnsLine>> {
        Ok(vec![DnsLine::default_line()])
    }

    async fn get_min_ttl(&self, _zone_id: Option<&str>) -> u32 {
        60
    }
}

impl CloudflareProvider {
    /// Cloudflare wraps list responses with a separate `result_info` block;
    /// this decodes both in one retried round trip.
    async fn call_with_info<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<(Vec<T>, CfResultInfo)> {
        self.base
            .with_retry(|| async {
                let req = self.request(Method::GET, path);
                let raw = transport::execute("cloudflare", req).await?;
                if raw.status >= 400 {
                    return Err(self.map_error(raw.status, &raw.body));
                }
                let envelope: CfListEnvelope<T> = transport::parse_json("cloudflare", &raw)?;
                if !envelope.success {
                    return Err(self.base.new_error(ErrorKind::VendorError, None, "cloudflare list call failed", Some(raw.status)));
                }
                Ok((envelope.result, envelope.result_info.unwrap_or_default()))
            })
            .await
    }
}

#[derive(Debug, Deserialize)]
struct CfEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<CfError>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct CfListEnvelope<T> {
    success: bool,
    result: Vec<T>,
    result_info: Option<CfResultInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct CfResultInfo {
    #[serde(default)]
    total_count: u32,
}

#[derive(Debug, Deserialize)]
struct CfError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct CfTokenStatus {
    status: String,
}

#[derive(Debug, Deserialize)]
struct CfZone {
    id: String,
    name: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct CfRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
    ttl: u32,
    #[serde(default)]
    priority: Option<u16>,
    #[serde(default)]
    proxied: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_status_mapping() {
        let z = CfZone {
            id: "1".into(),
            name: "Example.com.".into(),
            status: "pending".into(),
        };
        let zone = CloudflareProvider::zone_to_canonical(z);
        assert_eq!(zone.status, ZoneStatus::Pending);
        assert_eq!(zone.name, "example.com");
    }

    #[test]
    fn mx_record_carries_priority() {
        let rec = CfRecord {
            id: "r1".into(),
            name: "example.com".into(),
            record_type: "MX".into(),
            content: "mail.example.com".into(),
            ttl: 600,
            priority: Some(10),
            proxied: None,
        };
        let canonical = CloudflareProvider::record_to_canonical(rec, "z1", "example.com");
        assert_eq!(canonical.priority, Some(10));
        assert_eq!(canonical.value, "mail.example.com");
    }

    #[test]
    fn missing_token_raises_missing_credentials() {
        let ctx = ServiceContext::new(ProviderKind::Cloudflare, Default::default());
        let err = CloudflareProvider::new(&ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredentials);
    }
}
