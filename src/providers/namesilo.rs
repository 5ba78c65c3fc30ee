//! NameSilo adapter: `key=` query-parameter auth (§4.2), JSON responses
//! (`type=json`) from `www.namesilo.com/api`. The vendor API has no
//! native pagination, so listings are fetched whole and paged client-side.

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

const ENDPOINT: &str = "https://www.namesilo.com/api";

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
        paging: PagingMode::Client,
        record_types: vec!["A", "AAAA", "CNAME", "MX", "TXT"].into_iter().map(String::from).collect(),
        auth_fields: vec![AuthField::new("apiKey", "API Key", AuthFieldKind::Password)],
        domain_cache_ttl: 300,
        record_cache_ttl: 60,
        retryable_errors: vec![],
        max_retries: 1,
    }
}

#[derive(Debug)]
pub struct NamesiloProvider {
    base: BaseProvider,
    api_key: String,
}

impl NamesiloProvider {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        Ok(Self {
            base: BaseProvider::new("namesilo", capabilities()),
            api_key: super::require_secret(ctx, "apiKey")?,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, operation: &str, params: &[(&str, &str)]) -> Result<T> {
        self.base
            .with_retry(|| async {
                let mut req = transport::request(Method::GET, &format!("{ENDPOINT}/{operation}"))
                    .query(&[("version", "1"), ("type", "json"), ("key", &self.api_key)]);
                req = req.query(params);
                let raw = transport::execute("namesilo", req).await?;
                let envelope: NamesiloEnvelope = transport::parse_json("namesilo", &raw)?;
                let reply = envelope.reply;
                if reply.code != 300 {
                    return Err(self.classify(reply.code, reply.detail.as_deref().unwrap_or("namesilo error")));
                }
                serde_json::from_value(reply.rest).map_err(|e| {
                    self.base.new_error(ErrorKind::InvalidResponse, None, format!("failed to parse namesilo response: {e}"), None)
                })
            })
            .await
    }

    fn classify(&self, code: u32, message: &str) -> GatewayError {
        let kind = match code {
            110 | 262 => ErrorKind::AuthFailed,
            280 => ErrorKind::ZoneNotFound,
            461 => ErrorKind::RecordNotFound,
            _ => ErrorKind::VendorError,
        };
        self.base.new_error(kind, Some(code.to_string().as_str()), message, None)
    }

    async fn list_all_records(&self, zone_name: &str) -> Result<Vec<DnsRecord>> {
        let data: NamesiloRecordListFlat =
            self.call("dnsListRecords", &[("domain", zone_name)]).await?;
        Ok(data.resource_record.into_iter().map(|r| record_to_canonical(r, zone_name)).collect())
    }
}

#[async_trait]
impl Provider for NamesiloProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Namesilo
    }

    fn capabilities(&self) -> &Capabilities {
        &self.base.capabilities
    }

    async fn check_auth(&self) -> bool {
        self.call::<NamesiloAccountBalance>("getAccountBalance", &[]).await.is_ok()
    }

    async fn get_zones(&self, page: u32, page_size: u32, keyword: Option<&str>) -> Result<Page<Zone>> {
        let data: NamesiloDomainListFlat = self.call("listDomains", &[]).await?;
        let mut zones: Vec<Zone> = data
            .domains
            .into_iter()
            .map(|d| Zone {
                id: d.domain.clone(),
                name: BaseProvider::normalize_name(&d.domain),
                status: if d.status.eq_ignore_ascii_case("active") { ZoneStatus::Active } else { ZoneStatus::Paused },
                record_count: None,
                updated_at: None,
                meta: Default::default(),
            })
            .collect();
        if let Some(k) = keyword {
            let k = k.to_ascii_lowercase();
            zones.retain(|z| z.name.to_ascii_lowercase().contains(&k));
        }
        let total = zones.len() as u32;
        Ok(Page::new(BaseProvider::paginate_client(&zones, page, page_size), page, page_size, total))
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        self.get_zones(1, 1000, None)
            .await?
            .items
            .into_iter()
            .find(|z| z.id == zone_id || z.name == zone_id)
            .ok_or_else(|| self.base.new_error(ErrorKind::ZoneNotFound, None, "zone not found", None))
    }

    async fn get_records(&self, zone_id: &str, query: &RecordQuery) -> Result<Page<DnsRecord>> {
        let all = self.list_all_records(zone_id).await?;
        let page = query.page();
        let page_size = query.page_size(500);
        let filtered = BaseProvider::filter_records_client(&all, query);
        let total = filtered.len() as u32;
        Ok(Page::new(BaseProvider::paginate_client(&filtered, page, page_size), page, page_size, total))
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        self.list_all_records(zone_id)
            .await?
            .into_iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| self.base.new_error(ErrorKind::RecordNotFound, None, "record not found", None))
    }

    async fn create_record(&self, zone_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let host = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let mut query = vec![
            ("domain".to_string(), zone_id.to_string()),
            ("rrtype".to_string(), params.record_type.clone()),
            ("rrhost".to_string(), host),
            ("rrvalue".to_string(), params.value.clone()),
            ("rrttl".to_string(), params.ttl.to_string()),
        ];
        if let Some(p) = params.priority {
            query.push(("rrdistance".to_string(), p.to_string()));
        }
        let refs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let data: NamesiloAddRecordFlat = self.call("dnsAddRecord", &refs).await?;
        self.get_record(zone_id, &data.record_id).await
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let host = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let mut query = vec![
            ("domain".to_string(), zone_id.to_string()),
            ("rrid".to_string(), record_id.to_string()),
            ("rrhost".to_string(), host),
            ("rrvalue".to_string(), params.value.clone()),
            ("rrttl".to_string(), params.ttl.to_string()),
        ];
        if let Some(p) = params.priority {
            query.push(("rrdistance".to_string(), p.to_string()));
        }
        let refs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let _: NamesiloUpdateRecordFlat = self.call("dnsUpdateRecord", &refs).await?;
        self.get_record(zone_id, record_id).await
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<bool> {
        let _: serde_json::Value = self
            .call("dnsDeleteRecord", &[("domain", zone_id), ("rrid", record_id)])
            .await?;
        Ok(true)
    }

    async fn set_record_status(&self, _zone_id: &str, _record_id: &str, _enabled: bool) -> Result<bool> {
        Err(self.base.new_error(ErrorKind::Unsupported, None, "namesilo has no record enable/disable operation", None))
    }

    async fn get_lines(&self, _zone_id: Option<&str>) -> Result<Vec<DnsLine>> {
        Ok(vec![])
    }

    async fn get_min_ttl(&self, _zone_id: Option<&str>) -> u32 {
        3600
    }
}

fn record_to_canonical(r: NamesiloRecord, zone_name: &str) -> DnsRecord {
    DnsRecord {
        id: r.record_id,
        zone_id: zone_name.to_string(),
        zone_name: zone_name.to_string(),
        name: BaseProvider::normalize_name(&r.host),
        record_type: r.record_type,
        value: r.value,
        ttl: r.ttl.parse().unwrap_or(3600),
        line: None,
        weight: None,
        priority: r.distance.and_then(|d| d.parse().ok()),
        status: Some(RecordStatus::Enabled),
        remark: None,
        proxied: None,
        updated_at: None,
        meta: Default::default(),
    }
}

#[derive(Debug, Deserialize)]
struct NamesiloEnvelope {
    reply: NamesiloReply,
}

#[derive(Debug, Deserialize)]
struct NamesiloReply {
    code: u32,
    #[serde(default)]
    detail: Option<String>,
    #[serde(flatten)]
    rest: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct NamesiloAccountBalance {
    #[serde(default)]
    balance: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamesiloDomainListFlat {
    #[serde(default)]
    domains: Vec<NamesiloDomainEntry>,
}

#[derive(Debug, Deserialize)]
struct NamesiloDomainEntry {
    domain: String,
    #[serde(default = "default_active")]
    status: String,
}

fn default_active() -> String {
    "Active".to_string()
}

#[derive(Debug, Deserialize)]
struct NamesiloRecordListFlat {
    #[serde(default, rename = "resource_record")]
    resource_record: Vec<NamesiloRecord>,
}

#[derive(Debug, Deserialize)]
struct NamesiloRecord {
    record_id: String,
    #[serde(rename = "type")]
    record_type: String,
    host: String,
    value: String,
    ttl: String,
    #[serde(default)]
    distance: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamesiloAddRecordFlat {
    record_id: String,
}

#[derive(Debug, Deserialize)]
struct NamesiloUpdateRecordFlat {
    #[serde(default)]
    record_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_secrets_raise_missing_credentials() {
        let ctx = ServiceContext::new(ProviderKind::Namesilo, Default::default());
        let err = NamesiloProvider::new(&ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredentials);
    }

    #[test]
    fn record_host_is_translated_relative_to_zone() {
        let r = NamesiloRecord {
            record_id: "1".to_string(),
            record_type: "A".to_string(),
            host: "www.example.com".to_string(),
            value: "1.2.3.4".to_string(),
            ttl: "3600".to_string(),
            distance: None,
        };
        let canonical = record_to_canonical(r, "example.com");
        assert_eq!(canonical.name, "www.example.com");
    }
}
