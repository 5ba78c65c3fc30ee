//! DNSLA adapter: HTTP Basic auth (§4.2) over a JSON API, `api.dns.la`.
//! Record types are numeric IDs upstream; the `dominant`/`domaint` field
//! (spelled inconsistently by the vendor) both mean "explicit redirect",
//! so both spellings are read as one flag (§9).

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;

use crate::base::BaseProvider;
use crate::error::{ErrorKind, GatewayError, Result};
use crate::provider::{Page, Provider};
use crate::signing::basic;
use crate::transport;
use crate::types::{
    AuthField, AuthFieldKind, Capabilities, DnsLine, DnsRecord, PagingMode, ProviderKind,
    RecordParams, RecordQuery, RecordStatus, RemarkMode, ServiceContext, Zone, ZoneStatus,
};

const ENDPOINT: &str = "https://api.dns.la";

pub fn capabilities() -> Capabilities {
    Capabilities {
        supports_weight: true,
        supports_line: true,
        supports_status: true,
        supports_remark: true,
        supports_url_forward: true,
        supports_logs: false,
        requires_domain_id: true,
        remark_mode: RemarkMode::Inline,
        paging: PagingMode::Server,
        record_types: vec!["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV", "URL"]
            .into_iter()
            .map(String::from)
            .collect(),
        auth_fields: vec![
            AuthField::new("apiId", "API ID", AuthFieldKind::Text),
            AuthField::new("apiSecret", "API Secret", AuthFieldKind::Password),
        ],
        domain_cache_ttl: 300,
        record_cache_ttl: 60,
        retryable_errors: vec!["500".to_string()],
        max_retries: 2,
    }
}

fn type_to_vendor(t: &str) -> u32 {
    match t {
        "A" => 1,
        "CNAME" => 2,
        "MX" => 3,
        "TXT" => 4,
        "NS" => 5,
        "AAAA" => 6,
        "SRV" => 7,
        "URL" => 8,
        _ => 1,
    }
}

fn type_from_vendor(t: u32) -> String {
    match t {
        1 => "A".to_string(),
        2 => "CNAME".to_string(),
        3 => "MX".to_string(),
        4 => "TXT".to_string(),
        5 => "NS".to_string(),
        6 => "AAAA".to_string(),
        7 => "SRV".to_string(),
        8 => "URL".to_string(),
        other => other.to_string(),
    }
}

/// Reads either spelling of the explicit-redirect flag (§9).
fn is_explicit_redirect(rest: &serde_json::Value) -> bool {
    rest.get("dominant")
        .or_else(|| rest.get("domaint"))
        .and_then(|v| v.as_bool().or_else(|| v.as_i64().map(|n| n != 0)))
        .unwrap_or(false)
}

#[derive(Debug)]
pub struct DnslaProvider {
    base: BaseProvider,
    api_id: String,
    api_secret: String,
}

impl DnslaProvider {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        Ok(Self {
            base: BaseProvider::new("dnsla", capabilities()),
            api_id: super::require_secret(ctx, "apiId")?,
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
                    .header("Authorization", basic::header_value(&self.api_id, &self.api_secret));
                if let Some(b) = body {
                    req = req.json(b);
                }
                let raw = transport::execute("dnsla", req).await?;
                let envelope: DnslaRawEnvelope = transport::parse_json("dnsla", &raw)?;
                if envelope.code != 200 {
                    return Err(self.classify(envelope.code, &envelope.msg));
                }
                serde_json::from_value(envelope.rest).map_err(|e| {
                    self.base.new_error(
                        ErrorKind::InvalidResponse,
                        None,
                        format!("failed to parse dnsla response: {e}"),
                        None,
                    )
                })
            })
            .await
    }

    fn classify(&self, code: i32, message: &str) -> GatewayError {
        let kind = match code {
            401 | 403 => ErrorKind::AuthFailed,
            4041 => ErrorKind::ZoneNotFound,
            4042 => ErrorKind::RecordNotFound,
            429 => ErrorKind::RateLimited,
            _ => ErrorKind::VendorError,
        };
        self.base.new_error(kind, Some(code.to_string().as_str()), message, None)
    }
}

#[async_trait]
impl Provider for DnslaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Dnsla
    }

    fn capabilities(&self) -> &Capabilities {
        &self.base.capabilities
    }

    async fn check_auth(&self) -> bool {
        self.call::<DnslaDomainListData>(Method::GET, "/api/domainList?pageIndex=1&pageSize=1", None)
            .await
            .is_ok()
    }

    async fn get_zones(&self, page: u32, page_size: u32, keyword: Option<&str>) -> Result<Page<Zone>> {
        let mut path = format!("/api/domainList?pageIndex={page}&pageSize={page_size}");
        if let Some(k) = keyword {
            path.push_str(&format!("&keyword={}", urlencoding::encode(k)));
        }
        let data: DnslaDomainListData = self.call(Method::GET, &path, None).await?;
        let items = data
            .list
            .into_iter()
            .map(|d| Zone {
                id: d.id,
                name: BaseProvider::normalize_name(&d.domain),
                status: if d.state == 1 { ZoneStatus::Active } else { ZoneStatus::Paused },
                record_count: None,
                updated_at: None,
                meta: Default::default(),
            })
            .collect();
        Ok(Page::new(items, page, page_size, data.total))
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        let data: DnslaDomain = self.call(Method::GET, &format!("/api/domain/{zone_id}"), None).await?;
        Ok(Zone {
            id: data.id,
            name: BaseProvider::normalize_name(&data.domain),
            status: if data.state == 1 { ZoneStatus::Active } else { ZoneStatus::Paused },
            record_count: None,
            updated_at: None,
            meta: Default::default(),
        })
    }

    async fn get_records(&self, zone_id: &str, query: &RecordQuery) -> Result<Page<DnsRecord>> {
        let page = query.page();
        let page_size = query.page_size(500);
        let mut path = format!("/api/domainRecords/{zone_id}?pageIndex={page}&pageSize={page_size}");
        if let Some(k) = &query.keyword {
            path.push_str(&format!("&keyword={}", urlencoding::encode(k)));
        }
        let data: DnslaRecordListData = self.call(Method::GET, &path, None).await?;
        let items = data.list.into_iter().map(|r| record_to_canonical(r, zone_id)).collect();
        Ok(Page::new(items, page, page_size, data.total))
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        let data: DnslaRecord = self
            .call(Method::GET, &format!("/api/domainRecord/{zone_id}/{record_id}"), None)
            .await?;
        Ok(record_to_canonical(data, zone_id))
    }

    async fn create_record(&self, zone_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let host = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let body = serde_json::json!({
            "host": host,
            "type": type_to_vendor(&params.record_type),
            "data": params.value,
            "ttl": params.ttl,
            "lineId": params.line,
            "priority": params.priority,
            "weight": params.weight,
            "remark": params.remark,
        });
        let data: DnslaRecordIdData = self
            .call(Method::POST, &format!("/api/domainRecord/{zone_id}"), Some(&body))
            .await?;
        self.get_record(zone_id, &data.id).await
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let host = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let body = serde_json::json!({
            "host": host,
            "type": type_to_vendor(&params.record_type),
            "data": params.value,
            "ttl": params.ttl,
            "lineId": params.line,
            "priority": params.priority,
            "weight": params.weight,
            "remark": params.remark,
        });
        let _: DnslaRecord = self
            .call(Method::PUT, &format!("/api/domainRecord/{zone_id}/{record_id}"), Some(&body))
            .await?;
        self.get_record(zone_id, record_id).await
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<bool> {
        let _: serde_json::Value = self
            .call(Method::DELETE, &format!("/api/domainRecord/{zone_id}/{record_id}"), None)
            .await?;
        Ok(true)
    }

    async fn set_record_status(&self, zone_id: &str, record_id: &str, enabled: bool) -> Result<bool> {
        let body = serde_json::json!({ "state": if enabled { 1 } else { 0 } });
        let _: serde_json::Value = self
            .call(Method::PUT, &format!("/api/domainRecord/{zone_id}/{record_id}/state"), Some(&body))
            .await?;
        Ok(true)
    }

    async fn get_lines(&self, zone_id: Option<&str>) -> Result<Vec<DnsLine>> {
        let zone_id = zone_id.ok_or_else(|| self.base.new_error(ErrorKind::InvalidValue, None, "dnsla requires a zone id to list lines", None))?;
        let data: DnslaLineListData = self.call(Method::GET, &format!("/api/domainLines/{zone_id}"), None).await?;
        Ok(data
            .list
            .into_iter()
            .map(|l| DnsLine {
                code: l.id,
                name: l.name,
                parent_code: None,
            })
            .collect())
    }

    async fn get_min_ttl(&self, _zone_id: Option<&str>) -> u32 {
        600
    }
}

fn record_to_canonical(r: DnslaRecord, zone_id: &str) -> DnsRecord {
    let explicit = is_explicit_redirect(&r.rest);
    let record_type = if r.record_type == 8 {
        if explicit { "REDIRECT_URL".to_string() } else { "FORWARD_URL".to_string() }
    } else {
        type_from_vendor(r.record_type)
    };
    DnsRecord {
        id: r.id,
        zone_id: zone_id.to_string(),
        zone_name: zone_id.to_string(),
        name: BaseProvider::relative_to_full_name(&r.host, zone_id),
        record_type,
        value: r.data,
        ttl: r.ttl,
        line: r.line_id,
        weight: r.weight,
        priority: r.priority,
        status: Some(if r.state == 1 { RecordStatus::Enabled } else { RecordStatus::Disabled }),
        remark: r.remark,
        proxied: None,
        updated_at: None,
        meta: Default::default(),
    }
}

#[derive(Debug, Deserialize)]
struct DnslaRawEnvelope {
    code: i32,
    #[serde(default)]
    msg: String,
    #[serde(flatten)]
    rest: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct DnslaDomainListData {
    #[serde(default)]
    list: Vec<DnslaDomain>,
    #[serde(default)]
    total: u32,
}

#[derive(Debug, Deserialize)]
struct DnslaDomain {
    id: String,
    domain: String,
    #[serde(default)]
    state: i32,
}

#[derive(Debug, Deserialize)]
struct DnslaRecordListData {
    #[serde(default)]
    list: Vec<DnslaRecord>,
    #[serde(default)]
    total: u32,
}

#[derive(Debug, Deserialize)]
struct DnslaRecordIdData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DnslaRecord {
    id: String,
    host: String,
    #[serde(rename = "type")]
    record_type: u32,
    data: String,
    ttl: u32,
    #[serde(rename = "lineId", default)]
    line_id: Option<String>,
    #[serde(default)]
    weight: Option<u32>,
    #[serde(default)]
    priority: Option<u16>,
    #[serde(default = "default_state")]
    state: i32,
    #[serde(default)]
    remark: Option<String>,
    #[serde(flatten)]
    rest: serde_json::Value,
}

fn default_state() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
struct DnslaLineListData {
    #[serde(default)]
    list: Vec<DnslaLine>,
}

#[derive(Debug, Deserialize)]
struct DnslaLine {
    id: String,
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mapping_round_trips() {
        for t in ["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV"] {
            assert_eq!(type_from_vendor(type_to_vendor(t)), t);
        }
    }

    #[test]
    fn dominant_and_domaint_both_read_as_explicit_redirect() {
        let a = serde_json::json!({ "dominant": true });
        let b = serde_json::json!({ "domaint": 1 });
        let c = serde_json::json!({});
        assert!(is_explicit_redirect(&a));
        assert!(is_explicit_redirect(&b));
        assert!(!is_explicit_redirect(&c));
    }

    #[test]
    fn missing_secrets_raise_missing_credentials() {
        let ctx = ServiceContext::new(ProviderKind::Dnsla, Default::default());
        let err = DnslaProvider::new(&ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredentials);
    }
}
