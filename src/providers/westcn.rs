//! West.cn adapter: MD5 token auth (§4.2), form-encoded body, GBK
//! response decoding, `api.west.cn`. Client-side paging — the vendor's
//! list endpoints don't report a reliable total, so every page is
//! assembled locally from the full record set.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;

use crate::base::BaseProvider;
use crate::error::{ErrorKind, GatewayError, Result};
use crate::provider::{Page, Provider};
use crate::signing::md5_token;
use crate::transport;
use crate::types::{
    AuthField, AuthFieldKind, Capabilities, DnsLine, DnsRecord, PagingMode, ProviderKind,
    RecordParams, RecordQuery, RecordStatus, RemarkMode, ServiceContext, Zone, ZoneStatus,
};

const ENDPOINT: &str = "https://api.west.cn/api/v2";

pub fn capabilities() -> Capabilities {
    Capabilities {
        supports_weight: false,
        supports_line: true,
        supports_status: true,
        supports_remark: false,
        supports_url_forward: false,
        supports_logs: false,
        requires_domain_id: false,
        remark_mode: RemarkMode::Unsupported,
        paging: PagingMode::Client,
        record_types: vec!["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV"]
            .into_iter()
            .map(String::from)
            .collect(),
        auth_fields: vec![
            AuthField::new("username", "Username", AuthFieldKind::Text),
            AuthField::new("apiPassword", "API Password", AuthFieldKind::Password),
        ],
        domain_cache_ttl: 300,
        record_cache_ttl: 60,
        retryable_errors: vec![],
        max_retries: 1,
    }
}

fn line_to_vendor(code: &str) -> String {
    match code {
        "default" => "DEF".to_string(),
        "telecom" => "LTEL".to_string(),
        "unicom" => "LCNC".to_string(),
        "mobile" => "LMOB".to_string(),
        "edu" => "LEDU".to_string(),
        "oversea" => "ABROAD".to_string(),
        other => other.to_string(),
    }
}

fn line_from_vendor(code: &str) -> String {
    match code {
        "DEF" => "default".to_string(),
        "LTEL" => "telecom".to_string(),
        "LCNC" => "unicom".to_string(),
        "LMOB" => "mobile".to_string(),
        "LEDU" => "edu".to_string(),
        "ABROAD" => "oversea".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug)]
pub struct WestcnProvider {
    base: BaseProvider,
    username: String,
    api_password: String,
}

impl WestcnProvider {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        Ok(Self {
            base: BaseProvider::new("westcn", capabilities()),
            username: super::require_secret(ctx, "username")?,
            api_password: super::require_secret(ctx, "apiPassword")?,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, act: &str, form: Vec<(String, String)>) -> Result<T> {
        self.base
            .with_retry(|| async {
                let mut form = form.clone();
                let (time, token) = md5_token::sign(&self.username, &self.api_password, Utc::now());
                form.push(("act".to_string(), act.to_string()));
                form.push(("username".to_string(), self.username.clone()));
                form.push(("time".to_string(), time));
                form.push(("token".to_string(), token));
                let req = transport::request(Method::POST, ENDPOINT).form(&form);
                let raw = transport::execute_gbk("westcn", req).await?;
                let envelope: WestcnRawEnvelope = transport::parse_json("westcn", &raw)?;
                if envelope.result != 200 {
                    return Err(self.classify(envelope.result, &envelope.msg));
                }
                serde_json::from_value(envelope.rest).map_err(|e| {
                    self.base.new_error(ErrorKind::InvalidResponse, None, format!("failed to parse westcn response: {e}"), None)
                })
            })
            .await
    }

    fn classify(&self, code: i32, message: &str) -> GatewayError {
        let kind = match code {
            -1 | 1001 => ErrorKind::AuthFailed,
            2001 => ErrorKind::ZoneNotFound,
            2002 => ErrorKind::RecordNotFound,
            _ => ErrorKind::VendorError,
        };
        self.base.new_error(kind, Some(&code.to_string()), message, None)
    }
}

#[async_trait]
impl Provider for WestcnProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Westcn
    }

    fn capabilities(&self) -> &Capabilities {
        &self.base.capabilities
    }

    async fn check_auth(&self) -> bool {
        self.call::<WestcnDomainListData>("domain.domainlist", vec![("pageno".to_string(), "1".to_string())])
            .await
            .is_ok()
    }

    async fn get_zones(&self, page: u32, page_size: u32, keyword: Option<&str>) -> Result<Page<Zone>> {
        let data: WestcnDomainListData = self
            .call("domain.domainlist", vec![("pageno".to_string(), "1".to_string()), ("pagesize".to_string(), "200".to_string())])
            .await?;
        let mut zones: Vec<Zone> = data
            .domains
            .into_iter()
            .map(|d| Zone {
                id: d.domain.clone(),
                name: BaseProvider::normalize_name(&d.domain),
                status: if d.status == "1" { ZoneStatus::Active } else { ZoneStatus::Paused },
                record_count: None,
                updated_at: None,
                meta: Default::default(),
            })
            .collect();
        if let Some(kw) = keyword {
            let kw = kw.to_lowercase();
            zones.retain(|z| z.name.contains(&kw));
        }
        let total = zones.len() as u32;
        let items = BaseProvider::paginate_client(&zones, page, page_size);
        Ok(Page::new(items, page, page_size, total))
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        let page = self.get_zones(1, 200, Some(zone_id)).await?;
        page.items
            .into_iter()
            .find(|z| z.name == BaseProvider::normalize_name(zone_id) || z.id == zone_id)
            .ok_or_else(|| GatewayError::zone_not_found(zone_id))
    }

    async fn get_records(&self, zone_id: &str, query: &RecordQuery) -> Result<Page<DnsRecord>> {
        let data: WestcnRecordListData = self
            .call("domain.dnsrecord", vec![("domain".to_string(), zone_id.to_string()), ("pageno".to_string(), "1".to_string()), ("pagesize".to_string(), "500".to_string())])
            .await?;
        let all: Vec<DnsRecord> = data.records.into_iter().map(|r| record_to_canonical(r, zone_id)).collect();
        let filtered = BaseProvider::filter_records_client(&all, query);
        let total = filtered.len() as u32;
        let page = query.page();
        let page_size = query.page_size(200);
        let items = BaseProvider::paginate_client(&filtered, page, page_size);
        Ok(Page::new(items, page, page_size, total))
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        let page = self.get_records(zone_id, &RecordQuery::default()).await?;
        page.items
            .into_iter()
            .find(|r| r.id == record_id)
            .ok_or_else(|| GatewayError::record_not_found(record_id))
    }

    async fn create_record(&self, zone_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let host = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let data: WestcnRecordIdData = self
            .call(
                "domain.dnsadd",
                vec![
                    ("domain".to_string(), zone_id.to_string()),
                    ("host".to_string(), host),
                    ("type".to_string(), params.record_type.clone()),
                    ("value".to_string(), params.value.clone()),
                    ("ttl".to_string(), params.ttl.to_string()),
                    ("level".to_string(), line_to_vendor(params.line.as_deref().unwrap_or("default"))),
                    ("priority".to_string(), params.priority.unwrap_or(10).to_string()),
                ],
            )
            .await?;
        self.get_record(zone_id, &data.id.to_string()).await
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let host = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let _: WestcnEmptyData = self
            .call(
                "domain.dnsmod",
                vec![
                    ("domain".to_string(), zone_id.to_string()),
                    ("recordid".to_string(), record_id.to_string()),
                    ("host".to_string(), host),
                    ("type".to_string(), params.record_type.clone()),
                    ("value".to_string(), params.value.clone()),
                    ("ttl".to_string(), params.ttl.to_string()),
                    ("level".to_string(), line_to_vendor(params.line.as_deref().unwrap_or("default"))),
                    ("priority".to_string(), params.priority.unwrap_or(10).to_string()),
                ],
            )
            .await?;
        self.get_record(zone_id, record_id).await
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<bool> {
        let _: WestcnEmptyData = self
            .call("domain.dnsdel", vec![("domain".to_string(), zone_id.to_string()), ("recordid".to_string(), record_id.to_string())])
            .await?;
        Ok(true)
    }

    async fn set_record_status(&self, zone_id: &str, record_id: &str, enabled: bool) -> Result<bool> {
        let pause = if enabled { "0" } else { "1" };
        let _: WestcnEmptyData = self
            .call(
                "domain.dnspause",
                vec![("domain".to_string(), zone_id.to_string()), ("recordid".to_string(), record_id.to_string()), ("pause".to_string(), pause.to_string())],
            )
            .await?;
        Ok(true)
    }

    async fn get_lines(&self, _zone_id: Option<&str>) -> Result<Vec<DnsLine>> {
        Ok(["default", "telecom", "unicom", "mobile", "edu", "oversea"]
            .into_iter()
            .map(|c| DnsLine {
                code: c.to_string(),
                name: c.to_string(),
                parent_code: None,
            })
            .collect())
    }

    async fn get_min_ttl(&self, _zone_id: Option<&str>) -> u32 {
        600
    }
}

fn record_to_canonical(r: WestcnRecord, zone_id: &str) -> DnsRecord {
    DnsRecord {
        id: r.id.to_string(),
        zone_id: zone_id.to_string(),
        zone_name: zone_id.to_string(),
        name: BaseProvider::relative_to_full_name(&r.host, zone_id),
        record_type: r.record_type,
        value: r.value,
        ttl: r.ttl,
        line: Some(line_from_vendor(&r.level)),
        weight: None,
        priority: r.priority,
        status: Some(if r.pause == "1" { RecordStatus::Disabled } else { RecordStatus::Enabled }),
        remark: None,
        proxied: None,
        updated_at: None,
        meta: Default::default(),
    }
}

#[derive(Debug, Deserialize)]
struct WestcnRawEnvelope {
    result: i32,
    #[serde(default)]
    msg: String,
    #[serde(flatten)]
    rest: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WestcnEmptyData {}

#[derive(Debug, Deserialize)]
struct WestcnDomainListData {
    #[serde(default)]
    domains: Vec<WestcnDomain>,
}

#[derive(Debug, Deserialize)]
struct WestcnDomain {
    domain: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct WestcnRecordListData {
    #[serde(default)]
    records: Vec<WestcnRecord>,
}

#[derive(Debug, Deserialize)]
struct WestcnRecordIdData {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct WestcnRecord {
    id: u64,
    host: String,
    #[serde(rename = "type")]
    record_type: String,
    value: String,
    ttl: u32,
    #[serde(default = "default_level")]
    level: String,
    #[serde(default)]
    priority: Option<u16>,
    #[serde(default)]
    pause: String,
}

fn default_level() -> String {
    "DEF".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_mapping_round_trips() {
        for code in ["default", "telecom", "unicom", "mobile", "edu", "oversea"] {
            assert_eq!(line_from_vendor(&line_to_vendor(code)), code);
        }
    }

    #[test]
    fn record_to_canonical_resolves_apex() {
        let r = WestcnRecord {
            id: 9,
            host: "@".into(),
            record_type: "A".into(),
            value: "1.2.3.4".into(),
            ttl: 600,
            level: "LTEL".into(),
            priority: None,
            pause: "0".into(),
        };
        let canonical = record_to_canonical(r, "example.com");
        assert_eq!(canonical.name, "example.com");
        assert_eq!(canonical.line, Some("telecom".to_string()));
        assert_eq!(canonical.status, Some(RecordStatus::Enabled));
    }

    #[test]
    fn missing_secrets_raise_missing_credentials() {
        let ctx = ServiceContext::new(ProviderKind::Westcn, Default::default());
        let err = WestcnProvider::new(&ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredentials);
    }
}
