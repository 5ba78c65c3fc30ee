//! Spaceship adapter: `Authorization: Bearer` + `X-API-Key`/`X-API-Secret`
//! header auth (§4.2) against `spaceship.dev/api/v1`. Spaceship has no
//! concept of a numeric record ID, so the canonical ID is composite
//! (`type|name|address|mx`, §4.5 rule 10). Zone creation is not exposed
//! by the upstream API (§9) — `add_zone` is left at the trait default,
//! which returns `Unsupported`.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

use crate::base::BaseProvider;
use crate::error::{ErrorKind, GatewayError, Result};
use crate::provider::{Page, Provider};
use crate::transport;
use crate::types::{
    AuthField, AuthFieldKind, Capabilities, DnsLine, DnsRecord, PagingMode, ProviderKind,
    RecordParams, RecordQuery, RecordStatus, RemarkMode, ServiceContext, Zone, ZoneStatus,
};

const ENDPOINT: &str = "https://spaceship.dev/api/v1";

fn record_id(record_type: &str, name: &str, address: &str, mx: Option<u16>) -> String {
    format!("{record_type}|{name}|{address}|{}", mx.map(|m| m.to_string()).unwrap_or_default())
}

fn parse_record_id(id: &str) -> Result<(String, String, String, Option<u16>)> {
    let mut parts = id.splitn(4, '|');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(t), Some(n), Some(a), Some(m)) => {
            let mx = if m.is_empty() { None } else { m.parse().ok() };
            Ok((t.to_string(), n.to_string(), a.to_string(), mx))
        }
        _ => Err(GatewayError::new(ErrorKind::InvalidValue, format!("malformed spaceship record id: {id}"))),
    }
}

pub fn capabilities() -> Capabilities {
    Capabilities {
        supports_weight: false,
        supports_line: false,
        supports_status: false,
        supports_remark: false,
        supports_url_forward: false,
        supports_logs: false,
        requires_domain_id: false,
        remark_mode: RemarkMode::Unsupported,
        paging: PagingMode::Server,
        record_types: vec!["A", "AAAA", "CNAME", "MX", "TXT", "NS"].into_iter().map(String::from).collect(),
        auth_fields: vec![
            AuthField::new("apiKey", "API Key", AuthFieldKind::Text),
            AuthField::new("apiSecret", "API Secret", AuthFieldKind::Password),
        ],
        domain_cache_ttl: 300,
        record_cache_ttl: 60,
        retryable_errors: vec!["rate_limited".to_string()],
        max_retries: 2,
    }
}

#[derive(Debug)]
pub struct SpaceshipProvider {
    base: BaseProvider,
    api_key: String,
    api_secret: String,
}

impl SpaceshipProvider {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        Ok(Self {
            base: BaseProvider::new("spaceship", capabilities()),
            api_key: super::require_secret(ctx, "apiKey")?,
            api_secret: super::require_secret(ctx, "apiSecret")?,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        self.base
            .with_retry(|| async {
                let mut req = transport::request(method.clone(), &format!("{ENDPOINT}{path}"))
                    .header("X-API-Key", &self.api_key)
                    .header("X-API-Secret", &self.api_secret);
                if let Some(b) = body {
                    req = req.json(b);
                }
                let raw = transport::execute("spaceship", req).await?;
                if raw.status >= 400 {
                    return Err(self.map_error(&raw.body, raw.status));
                }
                transport::parse_json("spaceship", &raw)
            })
            .await
    }

    fn map_error(&self, body: &str, status: u16) -> GatewayError {
        if let Ok(err) = serde_json::from_str::<SpaceshipErrorBody>(body) {
            let kind = match err.code.as_str() {
                "unauthorized" | "invalid_api_key" => ErrorKind::AuthFailed,
                "domain_not_found" => ErrorKind::ZoneNotFound,
                "record_not_found" => ErrorKind::RecordNotFound,
                "rate_limited" => ErrorKind::RateLimited,
                _ => ErrorKind::VendorError,
            };
            return self.base.new_error(kind, Some(&err.code), err.message, Some(status));
        }
        transport::http_status_error("spaceship", status, body)
    }
}

#[async_trait]
impl Provider for SpaceshipProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Spaceship
    }

    fn capabilities(&self) -> &Capabilities {
        &self.base.capabilities
    }

    async fn check_auth(&self) -> bool {
        self.call::<SpaceshipDomainList>(Method::GET, "/domains?take=1&skip=0", None).await.is_ok()
    }

    async fn get_zones(&self, page: u32, page_size: u32, keyword: Option<&str>) -> Result<Page<Zone>> {
        let skip = (page.max(1) - 1) * page_size;
        let mut path = format!("/domains?take={page_size}&skip={skip}");
        if let Some(k) = keyword {
            path.push_str(&format!("&search={}", urlencoding::encode(k)));
        }
        let data: SpaceshipDomainList = self.call(Method::GET, &path, None).await?;
        let items = data
            .items
            .into_iter()
            .map(|d| Zone {
                id: d.name.clone(),
                name: BaseProvider::normalize_name(&d.name),
                status: if d.status.eq_ignore_ascii_case("active") { ZoneStatus::Active } else { ZoneStatus::Paused },
                record_count: None,
                updated_at: None,
                meta: Default::default(),
            })
            .collect();
        Ok(Page::new(items, page, page_size, data.total))
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        let data: SpaceshipDomain = self.call(Method::GET, &format!("/domains/{zone_id}"), None).await?;
        Ok(Zone {
            id: data.name.clone(),
            name: BaseProvider::normalize_name(&data.name),
            status: if data.status.eq_ignore_ascii_case("active") { ZoneStatus::Active } else { ZoneStatus::Paused },
            record_count: None,
            updated_at: None,
            meta: Default::default(),
        })
    }

    async fn get_records(&self, zone_id: &str, query: &RecordQuery) -> Result<Page<DnsRecord>> {
        let page = query.page();
        let page_size = query.page_size(100);
        let skip = (page.max(1) - 1) * page_size;
        let mut path = format!("/dns/records/{zone_id}?take={page_size}&skip={skip}");
        if let Some(k) = &query.keyword {
            path.push_str(&format!("&search={}", urlencoding::encode(k)));
        }
        let data: SpaceshipRecordList = self.call(Method::GET, &path, None).await?;
        let items = data.items.into_iter().map(|r| record_to_canonical(r, zone_id)).collect();
        Ok(Page::new(items, page, page_size, data.total))
    }

    async fn get_record(&self, zone_id: &str, record_id_str: &str) -> Result<DnsRecord> {
        let (record_type, name, address, mx) = parse_record_id(record_id_str)?;
        let all = self.get_records(zone_id, &RecordQuery::default()).await?.items;
        all.into_iter()
            .find(|r| r.record_type == record_type && r.name == name && r.value == address && r.priority == mx)
            .ok_or_else(|| self.base.new_error(ErrorKind::RecordNotFound, None, "record not found", None))
    }

    async fn create_record(&self, zone_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let host = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let body = serde_json::json!({
            "force": true,
            "items": [{
                "type": params.record_type,
                "name": host,
                "address": params.value,
                "ttl": params.ttl,
                "mxPriority": params.priority,
            }],
        });
        let _: serde_json::Value = self.call(Method::PUT, &format!("/dns/records/{zone_id}"), Some(&body)).await?;
        self.get_record(zone_id, &record_id(&params.record_type, &BaseProvider::normalize_name(&params.name), &params.value, params.priority))
            .await
    }

    async fn update_record(&self, zone_id: &str, record_id_str: &str, params: &RecordParams) -> Result<DnsRecord> {
        let (old_type, old_name, old_address, old_mx) = parse_record_id(record_id_str)?;
        let body = serde_json::json!({
            "items": [{
                "type": old_type,
                "name": old_name,
                "address": old_address,
                "mxPriority": old_mx,
            }],
        });
        let _: serde_json::Value = self.call(Method::DELETE, &format!("/dns/records/{zone_id}"), Some(&body)).await?;
        self.create_record(zone_id, params).await
    }

    async fn delete_record(&self, zone_id: &str, record_id_str: &str) -> Result<bool> {
        let (record_type, name, address, mx) = parse_record_id(record_id_str)?;
        let body = serde_json::json!({
            "items": [{ "type": record_type, "name": name, "address": address, "mxPriority": mx }],
        });
        let _: serde_json::Value = self.call(Method::DELETE, &format!("/dns/records/{zone_id}"), Some(&body)).await?;
        Ok(true)
    }

    async fn set_record_status(&self, _zone_id: &str, _record_id: &str, _enabled: bool) -> Result<bool> {
        Err(self.base.new_error(ErrorKind::Unsupported, None, "spaceship has no record enable/disable operation", None))
    }

    async fn get_lines(&self, _zone_id: Option<&str>) -> Result<Vec<DnsLine>> {
        Ok(vec![])
    }

    async fn get_min_ttl(&self, _zone_id: Option<&str>) -> u32 {
        60
    }
}

fn record_to_canonical(r: SpaceshipRecord, zone_id: &str) -> DnsRecord {
    let name = BaseProvider::relative_to_full_name(&r.name, zone_id);
    DnsRecord {
        id: record_id(&r.record_type, &name, &r.address, r.mx_priority),
        zone_id: zone_id.to_string(),
        zone_name: zone_id.to_string(),
        name,
        record_type: r.record_type,
        value: r.address,
        ttl: r.ttl,
        line: None,
        weight: None,
        priority: r.mx_priority,
        status: Some(RecordStatus::Enabled),
        remark: None,
        proxied: None,
        updated_at: None,
        meta: Default::default(),
    }
}

#[derive(Debug, Deserialize)]
struct SpaceshipErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct SpaceshipDomainList {
    #[serde(default)]
    items: Vec<SpaceshipDomain>,
    #[serde(default)]
    total: u32,
}

#[derive(Debug, Deserialize)]
struct SpaceshipDomain {
    name: String,
    #[serde(default = "default_active")]
    status: String,
}

fn default_active() -> String {
    "active".to_string()
}

#[derive(Debug, Deserialize)]
struct SpaceshipRecordList {
    #[serde(default)]
    items: Vec<SpaceshipRecord>,
    #[serde(default)]
    total: u32,
}

#[derive(Debug, Deserialize)]
struct SpaceshipRecord {
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    address: String,
    ttl: u32,
    #[serde(rename = "mxPriority", default)]
    mx_priority: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_round_trips() {
        let id = record_id("MX", "example.com", "mail.example.com", Some(10));
        let (record_type, name, address, mx) = parse_record_id(&id).unwrap();
        assert_eq!(record_type, "MX");
        assert_eq!(name, "example.com");
        assert_eq!(address, "mail.example.com");
        assert_eq!(mx, Some(10));
    }

    #[test]
    fn record_id_round_trips_without_mx() {
        let id = record_id("A", "www.example.com", "1.2.3.4", None);
        let (_, _, _, mx) = parse_record_id(&id).unwrap();
        assert_eq!(mx, None);
    }

    #[test]
    fn missing_secrets_raise_missing_credentials() {
        let ctx = ServiceContext::new(ProviderKind::Spaceship, Default::default());
        let err = SpaceshipProvider::new(&ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredentials);
    }
}
