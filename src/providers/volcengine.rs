//! Volcengine DNS adapter: TC3-HMAC-SHA256 over a GET query string
//! (§4.2), `open.volcengineapi.com`, service `dns`, region `cn-north-1`,
//! API version `2018-08-01`. `getMinTTL` derives from the zone's
//! `TradeCode` rather than a fixed constant.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;

use crate::base::BaseProvider;
use crate::error::{ErrorKind, GatewayError, Result};
use crate::provider::{Page, Provider};
use crate::signing::tc3_hmac_sha256::{self, Tc3Scope};
use crate::transport;
use crate::types::{
    AuthField, AuthFieldKind, Capabilities, DnsLine, DnsRecord, Meta, PagingMode, ProviderKind,
    RecordParams, RecordQuery, RecordStatus, RemarkMode, ServiceContext, Zone, ZoneStatus,
};

const HOST: &str = "open.volcengineapi.com";
const ENDPOINT: &str = "https://open.volcengineapi.com";
const VERSION: &str = "2018-08-01";
const REGION: &str = "cn-north-1";

pub fn capabilities() -> Capabilities {
    Capabilities {
        supports_weight: true,
        supports_line: true,
        supports_status: true,
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
        auth_fields: vec![
            AuthField::new("accessKeyId", "Access Key ID", AuthFieldKind::Text),
            AuthField::new("secretAccessKey", "Secret Access Key", AuthFieldKind::Password),
        ],
        domain_cache_ttl: 300,
        record_cache_ttl: 60,
        retryable_errors: vec!["InternalError".to_string(), "RequestLimitExceeded".to_string()],
        max_retries: 2,
    }
}

fn line_to_vendor(code: &str) -> String {
    match code {
        "default" => "default".to_string(),
        other => other.to_string(),
    }
}

fn line_from_vendor(vendor: &str) -> String {
    match vendor {
        "default" => "default".to_string(),
        other => other.to_string(),
    }
}

fn min_ttl_for_trade_code(trade_code: &str) -> u32 {
    match trade_code {
        "free_inner" => 600,
        "professional_inner" => 300,
        "enterprise_inner" => 60,
        "ultimate_inner" => 1,
        _ => 600,
    }
}

#[derive(Debug)]
pub struct VolcengineProvider {
    base: BaseProvider,
    access_key_id: String,
    secret_access_key: String,
}

impl VolcengineProvider {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        Ok(Self {
            base: BaseProvider::new("volcengine", capabilities()),
            access_key_id: super::require_secret(ctx, "accessKeyId")?,
            secret_access_key: super::require_secret(ctx, "secretAccessKey")?,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, action: &str, params: Vec<(String, String)>) -> Result<T> {
        self.base
            .with_retry(|| async {
                let mut params = params.clone();
                let now = Utc::now();
                params.push(("Action".to_string(), action.to_string()));
                params.push(("Version".to_string(), VERSION.to_string()));
                params.sort_by(|a, b| a.0.cmp(&b.0));
                let canonical_query = params
                    .iter()
                    .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&");
                let date = now.format("%Y%m%dT%H%M%SZ").to_string();
                let canonical_headers = format!("host:{HOST}\nx-date:{date}\n");
                let scope = Tc3Scope {
                    service: "dns",
                    region: Some(REGION),
                };
                let auth = tc3_hmac_sha256::sign(
                    &self.access_key_id,
                    &self.secret_access_key,
                    &scope,
                    HOST,
                    "/",
                    &canonical_query,
                    &canonical_headers,
                    "host;x-date",
                    "",
                    now,
                );
                let url = format!("{ENDPOINT}/?{canonical_query}");
                let req = transport::request(Method::GET, &url)
                    .header("Host", HOST)
                    .header("X-Date", date)
                    .header("Authorization", auth);
                let raw = transport::execute("volcengine", req).await?;
                let envelope: VolcRawEnvelope = transport::parse_json("volcengine", &raw)?;
                if let Some(err) = envelope.response_metadata.error {
                    return Err(self.classify(&err.code, &err.message));
                }
                serde_json::from_value(envelope.result.unwrap_or(serde_json::Value::Null)).map_err(|e| {
                    self.base.new_error(ErrorKind::InvalidResponse, None, format!("failed to parse volcengine response: {e}"), None)
                })
            })
            .await
    }

    fn classify(&self, code: &str, message: &str) -> GatewayError {
        let kind = match code {
            "AccessDenied" | "InvalidAccessKeyId.NotFound" | "SignatureDoesNotMatch" => ErrorKind::AuthFailed,
            "Zone.NotExist" => ErrorKind::ZoneNotFound,
            "Record.NotExist" => ErrorKind::RecordNotFound,
            "RequestLimitExceeded" => ErrorKind::RateLimited,
            _ => ErrorKind::VendorError,
        };
        self.base.new_error(kind, Some(code), message, None)
    }
}

#[async_trait]
impl Provider for VolcengineProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Volcengine
    }

    fn capabilities(&self) -> &Capabilities {
        &self.base.capabilities
    }

    async fn check_auth(&self) -> bool {
        self.call::<VolcZoneList>("ListZones", vec![("PageSize".to_string(), "1".to_string())]).await.is_ok()
    }

    async fn get_zones(&self, page: u32, page_size: u32, keyword: Option<&str>) -> Result<Page<Zone>> {
        let mut params = vec![("PageNumber".to_string(), page.to_string()), ("PageSize".to_string(), page_size.to_string())];
        if let Some(kw) = keyword {
            params.push(("Key".to_string(), kw.to_string()));
        }
        let data: VolcZoneList = self.call("ListZones", params).await?;
        let items = data
            .zones
            .into_iter()
            .map(|z| {
                let mut meta: Meta = Default::default();
                meta.insert("tradeCode".to_string(), z.trade_code.clone());
                Zone {
                    id: z.zid.to_string(),
                    name: BaseProvider::normalize_name(&z.zone_name),
                    status: if z.status == "ok" { ZoneStatus::Active } else { ZoneStatus::Paused },
                    record_count: z.record_count,
                    updated_at: None,
                    meta,
                }
            })
            .collect();
        Ok(Page::new(items, page, page_size, data.total))
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        let data: VolcZone = self.call("DescribeZone", vec![("ZID".to_string(), zone_id.to_string())]).await?;
        let mut meta: Meta = Default::default();
        meta.insert("tradeCode".to_string(), data.trade_code.clone());
        Ok(Zone {
            id: data.zid.to_string(),
            name: BaseProvider::normalize_name(&data.zone_name),
            status: if data.status == "ok" { ZoneStatus::Active } else { ZoneStatus::Paused },
            record_count: data.record_count,
            updated_at: None,
            meta,
        })
    }

    async fn get_records(&self, zone_id: &str, query: &RecordQuery) -> Result<Page<DnsRecord>> {
        let page = query.page();
        let page_size = query.page_size(100);
        let mut params = vec![
            ("ZID".to_string(), zone_id.to_string()),
            ("PageNumber".to_string(), page.to_string()),
            ("PageSize".to_string(), page_size.to_string()),
        ];
        if let Some(kw) = &query.keyword {
            params.push(("Host".to_string(), kw.clone()));
        }
        let data: VolcRecordList = self.call("ListRecords", params).await?;
        let items = data.records.into_iter().map(|r| record_to_canonical(r, zone_id)).collect();
        Ok(Page::new(items, page, page_size, data.total))
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        let data: VolcRecord = self.call("DescribeRecord", vec![("RecordID".to_string(), record_id.to_string())]).await?;
        Ok(record_to_canonical(data, zone_id))
    }

    async fn create_record(&self, zone_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let host = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let data: VolcRecordIdData = self
            .call(
                "CreateRecord",
                vec![
                    ("ZID".to_string(), zone_id.to_string()),
                    ("Host".to_string(), host),
                    ("Type".to_string(), params.record_type.clone()),
                    ("Value".to_string(), params.value.clone()),
                    ("TTL".to_string(), params.ttl.to_string()),
                    ("Line".to_string(), line_to_vendor(params.line.as_deref().unwrap_or("default"))),
                    ("Weight".to_string(), params.weight.unwrap_or(1).to_string()),
                    ("MX".to_string(), params.priority.unwrap_or(10).to_string()),
                ],
            )
            .await?;
        self.get_record(zone_id, &data.record_id.to_string()).await
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let host = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let _: VolcEmptyData = self
            .call(
                "UpdateRecord",
                vec![
                    ("RecordID".to_string(), record_id.to_string()),
                    ("Host".to_string(), host),
                    ("Type".to_string(), params.record_type.clone()),
                    ("Value".to_string(), params.value.clone()),
                    ("TTL".to_string(), params.ttl.to_string()),
                    ("Line".to_string(), line_to_vendor(params.line.as_deref().unwrap_or("default"))),
                    ("Weight".to_string(), params.weight.unwrap_or(1).to_string()),
                    ("MX".to_string(), params.priority.unwrap_or(10).to_string()),
                ],
            )
            .await?;
        self.get_record(zone_id, record_id).await
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<bool> {
        let _: VolcEmptyData = self.call("DeleteRecord", vec![("RecordID".to_string(), record_id.to_string())]).await?;
        let _ = zone_id;
        Ok(true)
    }

    async fn set_record_status(&self, zone_id: &str, record_id: &str, enabled: bool) -> Result<bool> {
        let enable = if enabled { "1" } else { "0" };
        let _: VolcEmptyData = self
            .call("UpdateRecordStatus", vec![("RecordID".to_string(), record_id.to_string()), ("Enable".to_string(), enable.to_string())])
            .await?;
        let _ = zone_id;
        Ok(true)
    }

    async fn get_lines(&self, zone_id: Option<&str>) -> Result<Vec<DnsLine>> {
        let mut params = vec![];
        if let Some(z) = zone_id {
            params.push(("ZID".to_string(), z.to_string()));
        }
        let data: VolcLineList = self.call("ListLines", params).await?;
        Ok(data
            .lines
            .into_iter()
            .map(|l| DnsLine {
                code: line_from_vendor(&l),
                name: l,
                parent_code: None,
            })
            .collect())
    }

    async fn get_min_ttl(&self, zone_id: Option<&str>) -> u32 {
        let Some(zone_id) = zone_id else { return 600 };
        match self.get_zone(zone_id).await {
            Ok(zone) => zone
                .meta
                .get("tradeCode")
                .map(|t| min_ttl_for_trade_code(t))
                .unwrap_or(600),
            Err(_) => 600,
        }
    }
}

fn record_to_canonical(r: VolcRecord, zone_id: &str) -> DnsRecord {
    DnsRecord {
        id: r.record_id.to_string(),
        zone_id: zone_id.to_string(),
        zone_name: zone_id.to_string(),
        name: BaseProvider::relative_to_full_name(&r.host, zone_id),
        record_type: r.record_type,
        value: r.value,
        ttl: r.ttl,
        line: Some(line_from_vendor(&r.line)),
        weight: Some(r.weight),
        priority: r.mx,
        status: Some(if r.enable == 1 { RecordStatus::Enabled } else { RecordStatus::Disabled }),
        remark: None,
        proxied: None,
        updated_at: None,
        meta: Default::default(),
    }
}

#[derive(Debug, Deserialize)]
struct VolcRawEnvelope {
    #[serde(rename = "ResponseMetadata")]
    response_metadata: VolcResponseMetadata,
    #[serde(rename = "Result")]
    result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct VolcResponseMetadata {
    #[serde(rename = "Error")]
    error: Option<VolcError>,
}

#[derive(Debug, Deserialize)]
struct VolcError {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct VolcEmptyData {}

#[derive(Debug, Deserialize)]
struct VolcZoneList {
    #[serde(rename = "Zones", default)]
    zones: Vec<VolcZone>,
    #[serde(rename = "Total", default)]
    total: u32,
}

#[derive(Debug, Deserialize)]
struct VolcZone {
    #[serde(rename = "ZID")]
    zid: u64,
    #[serde(rename = "ZoneName")]
    zone_name: String,
    #[serde(default)]
    status: String,
    #[serde(rename = "RecordCount", default)]
    record_count: Option<u32>,
    #[serde(rename = "TradeCode", default = "default_trade_code")]
    trade_code: String,
}

fn default_trade_code() -> String {
    "free_inner".to_string()
}

#[derive(Debug, Deserialize)]
struct VolcRecordList {
    #[serde(rename = "Records", default)]
    records: Vec<VolcRecord>,
    #[serde(rename = "Total", default)]
    total: u32,
}

#[derive(Debug, Deserialize)]
struct VolcRecordIdData {
    #[serde(rename = "RecordID")]
    record_id: u64,
}

#[derive(Debug, Deserialize)]
struct VolcRecord {
    #[serde(rename = "RecordID")]
    record_id: u64,
    #[serde(rename = "Host")]
    host: String,
    #[serde(rename = "Type")]
    record_type: String,
    #[serde(rename = "Value")]
    value: String,
    #[serde(rename = "TTL")]
    ttl: u32,
    #[serde(rename = "Line", default = "default_line")]
    line: String,
    #[serde(rename = "Weight", default = "default_weight")]
    weight: u32,
    #[serde(rename = "MX", default)]
    mx: Option<u16>,
    #[serde(rename = "Enable", default = "default_enable")]
    enable: u8,
}

fn default_line() -> String {
    "default".to_string()
}

fn default_weight() -> u32 {
    1
}

fn default_enable() -> u8 {
    1
}

#[derive(Debug, Deserialize)]
struct VolcLineList {
    #[serde(rename = "Lines", default)]
    lines: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_code_min_ttl_mapping() {
        assert_eq!(min_ttl_for_trade_code("free_inner"), 600);
        assert_eq!(min_ttl_for_trade_code("professional_inner"), 300);
        assert_eq!(min_ttl_for_trade_code("enterprise_inner"), 60);
        assert_eq!(min_ttl_for_trade_code("ultimate_inner"), 1);
    }

    #[test]
    fn record_to_canonical_resolves_apex_and_status() {
        let r = VolcRecord {
            record_id: 1,
            host: "@".into(),
            record_type: "A".into(),
            value: "1.2.3.4".into(),
            ttl: 600,
            line: "default".into(),
            weight: 1,
            mx: None,
            enable: 0,
        };
        let canonical = record_to_canonical(r, "example.com");
        assert_eq!(canonical.name, "example.com");
        assert_eq!(canonical.status, Some(RecordStatus::Disabled));
    }

    #[test]
    fn missing_secrets_raise_missing_credentials() {
        let ctx = ServiceContext::new(ProviderKind::Volcengine, Default::default());
        let err = VolcengineProvider::new(&ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredentials);
    }
}
