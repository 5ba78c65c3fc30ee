//! Baidu Cloud DNS adapter: BCE v1 signing (§4.2), `dns.baidubce.com`.
//! Priority is packed into the wire value for MX records like several
//! other vendors in this family.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;

use crate::base::BaseProvider;
use crate::error::{ErrorKind, GatewayError, Result};
use crate::provider::{Page, Provider};
use crate::signing::bce_v1;
use crate::transport;
use crate::types::{
    AuthField, AuthFieldKind, Capabilities, DnsLine, DnsRecord, PagingMode, ProviderKind,
    RecordParams, RecordQuery, RecordStatus, RemarkMode, ServiceContext, Zone, ZoneStatus,
};

const HOST: &str = "dns.baidubce.com";
const ENDPOINT: &str = "https://dns.baidubce.com";

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
        paging: PagingMode::Server,
        record_types: vec!["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV"]
            .into_iter()
            .map(String::from)
            .collect(),
        auth_fields: vec![
            AuthField::new("accessKeyId", "Access Key ID", AuthFieldKind::Text),
            AuthField::new("secretAccessKey", "Secret Access Key", AuthFieldKind::Password),
        ],
        domain_cache_ttl: 300,
        record_cache_ttl: 60,
        retryable_errors: vec!["InternalError".to_string()],
        max_retries: 2,
    }
}

fn line_to_vendor(code: &str) -> String {
    match code {
        "default" => "default".to_string(),
        "telecom" => "中国电信".to_string(),
        "unicom" => "中国联通".to_string(),
        "mobile" => "中国移动".to_string(),
        "oversea" => "境外".to_string(),
        other => other.to_string(),
    }
}

fn line_from_vendor(vendor: &str) -> String {
    match vendor {
        "default" => "default".to_string(),
        "中国电信" => "telecom".to_string(),
        "中国联通" => "unicom".to_string(),
        "中国移动" => "mobile".to_string(),
        "境外" => "oversea".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug)]
pub struct BaiduProvider {
    base: BaseProvider,
    access_key_id: String,
    secret_access_key: String,
}

impl BaiduProvider {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        Ok(Self {
            base: BaseProvider::new("baidu", capabilities()),
            access_key_id: super::require_secret(ctx, "accessKeyId")?,
            secret_access_key: super::require_secret(ctx, "secretAccessKey")?,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, method: Method, path: &str, query: &[(String, String)], body: Option<&serde_json::Value>) -> Result<T> {
        self.base
            .with_retry(|| async {
                let now = Utc::now();
                let headers = vec![("host".to_string(), HOST.to_string())];
                let auth = bce_v1::sign(&self.access_key_id, &self.secret_access_key, method.as_str(), path, query, &headers, now, 1800);
                let qs = query
                    .iter()
                    .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&");
                let url = if qs.is_empty() {
                    format!("{ENDPOINT}{path}")
                } else {
                    format!("{ENDPOINT}{path}?{qs}")
                };
                let mut req = transport::request(method.clone(), &url).header("Host", HOST).header("Authorization", auth);
                if let Some(b) = body {
                    req = req.json(b);
                }
                let raw = transport::execute("baidu", req).await?;
                if raw.status >= 400 {
                    return Err(self.map_error(&raw.body, raw.status));
                }
                transport::parse_json("baidu", &raw)
            })
            .await
    }

    fn map_error(&self, body: &str, status: u16) -> GatewayError {
        if let Ok(err) = serde_json::from_str::<BaiduError>(body) {
            let kind = match err.code.as_str() {
                "AccessDenied" | "SignatureDoesNotMatch" | "InvalidAccessKeyId" => ErrorKind::AuthFailed,
                "NoSuchZone" => ErrorKind::ZoneNotFound,
                "NoSuchRecord" => ErrorKind::RecordNotFound,
                _ => ErrorKind::VendorError,
            };
            return self.base.new_error(kind, Some(&err.code), &err.message, Some(status));
        }
        transport::http_status_error("baidu", status, body)
    }
}

#[async_trait]
impl Provider for BaiduProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Baidu
    }

    fn capabilities(&self) -> &Capabilities {
        &self.base.capabilities
    }

    async fn check_auth(&self) -> bool {
        self.call::<BaiduZoneList>(Method::GET, "/v1/zone", &[("pageSize".to_string(), "1".to_string())], None)
            .await
            .is_ok()
    }

    async fn get_zones(&self, page: u32, page_size: u32, keyword: Option<&str>) -> Result<Page<Zone>> {
        let mut query = vec![("pageNo".to_string(), page.to_string()), ("pageSize".to_string(), page_size.to_string())];
        if let Some(kw) = keyword {
            query.push(("keyword".to_string(), kw.to_string()));
        }
        let data: BaiduZoneList = self.call(Method::GET, "/v1/zone", &query, None).await?;
        let items = data
            .zones
            .into_iter()
            .map(|z| Zone {
                id: z.zone_id.to_string(),
                name: BaseProvider::normalize_name(&z.zone_name),
                status: if z.status == "ACTIVE" { ZoneStatus::Active } else { ZoneStatus::Paused },
                record_count: None,
                updated_at: None,
                meta: Default::default(),
            })
            .collect();
        Ok(Page::new(items, page, page_size, data.total_count))
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        let data: BaiduZoneDetail = self.call(Method::GET, &format!("/v1/zone/{zone_id}"), &[], None).await?;
        Ok(Zone {
            id: data.zone_id.to_string(),
            name: BaseProvider::normalize_name(&data.zone_name),
            status: if data.status == "ACTIVE" { ZoneStatus::Active } else { ZoneStatus::Paused },
            record_count: None,
            updated_at: None,
            meta: Default::default(),
        })
    }

    async fn get_records(&self, zone_id: &str, query: &RecordQuery) -> Result<Page<DnsRecord>> {
        let page = query.page();
        let page_size = query.page_size(100);
        let mut qs = vec![("pageNo".to_string(), page.to_string()), ("pageSize".to_string(), page_size.to_string())];
        if let Some(kw) = &query.keyword {
            qs.push(("keyword".to_string(), kw.clone()));
        }
        let data: BaiduRecordList = self.call(Method::GET, &format!("/v1/zone/{zone_id}/record"), &qs, None).await?;
        let items = data.records.into_iter().map(|r| record_to_canonical(r, zone_id)).collect();
        Ok(Page::new(items, page, page_size, data.total_count))
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        let data: BaiduRecord = self.call(Method::GET, &format!("/v1/zone/{zone_id}/record/{record_id}"), &[], None).await?;
        Ok(record_to_canonical(data, zone_id))
    }

    async fn create_record(&self, zone_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let rr = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let value = record_value_to_wire(&params.record_type, &params.value, params.priority);
        let body = serde_json::json!({
            "rr": rr,
            "type": params.record_type,
            "value": value,
            "ttl": params.ttl,
            "line": line_to_vendor(params.line.as_deref().unwrap_or("default")),
        });
        let data: BaiduRecord = self.call(Method::POST, &format!("/v1/zone/{zone_id}/record"), &[], Some(&body)).await?;
        self.get_record(zone_id, &data.record_id.to_string()).await
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let rr = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let value = record_value_to_wire(&params.record_type, &params.value, params.priority);
        let body = serde_json::json!({
            "rr": rr,
            "type": params.record_type,
            "value": value,
            "ttl": params.ttl,
            "line": line_to_vendor(params.line.as_deref().unwrap_or("default")),
        });
        let _: BaiduRecord = self.call(Method::PUT, &format!("/v1/zone/{zone_id}/record/{record_id}"), &[], Some(&body)).await?;
        self.get_record(zone_id, record_id).await
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<bool> {
        let _: serde_json::Value = self.call(Method::DELETE, &format!("/v1/zone/{zone_id}/record/{record_id}"), &[], None).await?;
        Ok(true)
    }

    async fn set_record_status(&self, zone_id: &str, record_id: &str, enabled: bool) -> Result<bool> {
        let status = if enabled { "ENABLE" } else { "DISABLE" };
        let body = serde_json::json!({ "status": status });
        let _: serde_json::Value = self
            .call(Method::PUT, &format!("/v1/zone/{zone_id}/record/{record_id}/status"), &[], Some(&body))
            .await?;
        Ok(true)
    }

    async fn get_lines(&self, _zone_id: Option<&str>) -> Result<Vec<DnsLine>> {
        Ok(["default", "telecom", "unicom", "mobile", "oversea"]
            .into_iter()
            .map(|c| DnsLine {
                code: c.to_string(),
                name: line_to_vendor(c),
                parent_code: None,
            })
            .collect())
    }

    async fn get_min_ttl(&self, _zone_id: Option<&str>) -> u32 {
        600
    }
}

fn record_value_to_wire(record_type: &str, value: &str, priority: Option<u16>) -> String {
    if record_type.eq_ignore_ascii_case("MX") {
        format!("{} {value}", priority.unwrap_or(10))
    } else {
        value.to_string()
    }
}

fn record_to_canonical(r: BaiduRecord, zone_id: &str) -> DnsRecord {
    let (value, priority) = if r.record_type.eq_ignore_ascii_case("MX") {
        let mut parts = r.value.splitn(2, ' ');
        let priority = parts.next().and_then(|p| p.parse().ok());
        (parts.next().unwrap_or(&r.value).to_string(), priority)
    } else {
        (r.value, None)
    };
    DnsRecord {
        id: r.record_id.to_string(),
        zone_id: zone_id.to_string(),
        zone_name: zone_id.to_string(),
        name: BaseProvider::relative_to_full_name(&r.rr, zone_id),
        record_type: r.record_type,
        value,
        ttl: r.ttl,
        line: Some(line_from_vendor(&r.line)),
        weight: None,
        priority,
        status: Some(if r.status == "ENABLE" { RecordStatus::Enabled } else { RecordStatus::Disabled }),
        remark: None,
        proxied: None,
        updated_at: None,
        meta: Default::default(),
    }
}

#[derive(Debug, Deserialize)]
struct BaiduError {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct BaiduZoneList {
    #[serde(default)]
    zones: Vec<BaiduZoneDetail>,
    #[serde(rename = "totalCount", default)]
    total_count: u32,
}

#[derive(Debug, Deserialize)]
struct BaiduZoneDetail {
    #[serde(rename = "zoneId")]
    zone_id: u64,
    #[serde(rename = "zoneName")]
    zone_name: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct BaiduRecordList {
    #[serde(default)]
    records: Vec<BaiduRecord>,
    #[serde(rename = "totalCount", default)]
    total_count: u32,
}

#[derive(Debug, Deserialize)]
struct BaiduRecord {
    #[serde(rename = "recordId")]
    record_id: u64,
    rr: String,
    #[serde(rename = "type")]
    record_type: String,
    value: String,
    ttl: u32,
    #[serde(default = "default_line")]
    line: String,
    #[serde(default)]
    status: String,
}

fn default_line() -> String {
    "default".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_mapping_round_trips() {
        for code in ["default", "telecom", "unicom", "mobile", "oversea"] {
            assert_eq!(line_from_vendor(&line_to_vendor(code)), code);
        }
    }

    #[test]
    fn mx_priority_round_trips_through_wire_value() {
        let wire = record_value_to_wire("MX", "mail.example.com", Some(20));
        assert_eq!(wire, "20 mail.example.com");
        let record = BaiduRecord {
            record_id: 1,
            rr: "@".into(),
            record_type: "MX".into(),
            value: wire,
            ttl: 600,
            line: "default".into(),
            status: "ENABLE".into(),
        };
        let canonical = record_to_canonical(record, "example.com");
        assert_eq!(canonical.value, "mail.example.com");
        assert_eq!(canonical.priority, Some(20));
    }

    #[test]
    fn missing_secrets_raise_missing_credentials() {
        let ctx = ServiceContext::new(ProviderKind::Baidu, Default::default());
        let err = BaiduProvider::new(&ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredentials);
    }
}
