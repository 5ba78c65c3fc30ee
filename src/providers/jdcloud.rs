//! JDCloud DNS adapter: TC3-HMAC-SHA256 signing (§4.2) over a JSON POST
//! body, `domainservice.jdcloud-api.com`, region `cn-north-1`. Numeric
//! line codes; `pageSize` is capped at 99, the lowest ceiling in the
//! vendor set.

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
    AuthField, AuthFieldKind, Capabilities, DnsLine, DnsRecord, PagingMode, ProviderKind,
    RecordParams, RecordQuery, RecordStatus, RemarkMode, ServiceContext, Zone, ZoneStatus,
};

const HOST: &str = "domainservice.jdcloud-api.com";
const ENDPOINT: &str = "https://domainservice.jdcloud-api.com";
const REGION: &str = "cn-north-1";
const MAX_PAGE_SIZE: u32 = 99;

pub fn capabilities() -> Capabilities {
    Capabilities {
        supports_weight: false,
        supports_line: true,
        supports_status: true,
        supports_remark: false,
        supports_url_forward: true,
        supports_logs: false,
        requires_domain_id: true,
        remark_mode: RemarkMode::Unsupported,
        paging: PagingMode::Server,
        record_types: vec!["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV", "EXPLICIT_URL", "IMPLICIT_URL"]
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

fn type_to_vendor(t: &str) -> String {
    match t {
        "REDIRECT_URL" => "EXPLICIT_URL".to_string(),
        "FORWARD_URL" => "IMPLICIT_URL".to_string(),
        other => other.to_string(),
    }
}

fn type_from_vendor(t: &str) -> String {
    match t {
        "EXPLICIT_URL" => "REDIRECT_URL".to_string(),
        "IMPLICIT_URL" => "FORWARD_URL".to_string(),
        other => other.to_string(),
    }
}

fn line_to_vendor(code: &str) -> String {
    match code {
        "default" => "0".to_string(),
        "telecom" => "1".to_string(),
        "unicom" => "2".to_string(),
        "mobile" => "3".to_string(),
        "oversea" => "4".to_string(),
        other => other.to_string(),
    }
}

fn line_from_vendor(vendor: &str) -> String {
    match vendor {
        "0" => "default".to_string(),
        "1" => "telecom".to_string(),
        "2" => "unicom".to_string(),
        "3" => "mobile".to_string(),
        "4" => "oversea".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug)]
pub struct JdcloudProvider {
    base: BaseProvider,
    access_key_id: String,
    secret_access_key: String,
}

impl JdcloudProvider {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        Ok(Self {
            base: BaseProvider::new("jdcloud", capabilities()),
            access_key_id: super::require_secret(ctx, "accessKeyId")?,
            secret_access_key: super::require_secret(ctx, "secretAccessKey")?,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, path: &str, body: &serde_json::Value) -> Result<T> {
        self.base
            .with_retry(|| async {
                let now = Utc::now();
                let payload = body.to_string();
                let date = now.format("%Y%m%dT%H%M%SZ").to_string();
                let canonical_headers = format!("content-type:application/json\nhost:{HOST}\nx-date:{date}\n");
                let scope = Tc3Scope {
                    service: "domainservice",
                    region: Some(REGION),
                };
                let auth = tc3_hmac_sha256::sign(
                    &self.access_key_id,
                    &self.secret_access_key,
                    &scope,
                    HOST,
                    path,
                    "",
                    &canonical_headers,
                    "content-type;host;x-date",
                    &payload,
                    now,
                );
                let req = transport::request(Method::POST, &format!("{ENDPOINT}{path}"))
                    .header("Host", HOST)
                    .header("Content-Type", "application/json")
                    .header("X-Date", date)
                    .header("Authorization", auth)
                    .body(payload);
                let raw = transport::execute("jdcloud", req).await?;
                if raw.status >= 400 {
                    return Err(self.map_error(&raw.body, raw.status));
                }
                transport::parse_json("jdcloud", &raw)
            })
            .await
    }

    fn map_error(&self, body: &str, status: u16) -> GatewayError {
        if let Ok(err) = serde_json::from_str::<JdcloudErrorEnvelope>(body) {
            let e = err.error;
            let kind = match e.code {
                401 | 403 => ErrorKind::AuthFailed,
                404 => ErrorKind::ZoneNotFound,
                _ => ErrorKind::VendorError,
            };
            return self.base.new_error(kind, Some(e.code.to_string().as_str()), &e.message, Some(status));
        }
        transport::http_status_error("jdcloud", status, body)
    }
}

#[async_trait]
impl Provider for JdcloudProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Jdcloud
    }

    fn capabilities(&self) -> &Capabilities {
        &self.base.capabilities
    }

    async fn check_auth(&self) -> bool {
        self.call::<JdcloudZoneListData>("/domains", &serde_json::json!({ "pageSize": 1 })).await.is_ok()
    }

    async fn get_zones(&self, page: u32, page_size: u32, keyword: Option<&str>) -> Result<Page<Zone>> {
        let page_size = page_size.min(MAX_PAGE_SIZE);
        let body = serde_json::json!({ "pageNumber": page, "pageSize": page_size, "keyword": keyword });
        let data: JdcloudZoneListData = self.call("/domains", &body).await?;
        let items = data
            .domains
            .into_iter()
            .map(|d| Zone {
                id: d.domain_id.to_string(),
                name: BaseProvider::normalize_name(&d.domain_name),
                status: if d.status == "Active" { ZoneStatus::Active } else { ZoneStatus::Paused },
                record_count: None,
                updated_at: None,
                meta: Default::default(),
            })
            .collect();
        Ok(Page::new(items, page, page_size, data.total_count))
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        let data: JdcloudZone = self.call(&format!("/domains/{zone_id}"), &serde_json::json!({})).await?;
        Ok(Zone {
            id: data.domain_id.to_string(),
            name: BaseProvider::normalize_name(&data.domain_name),
            status: if data.status == "Active" { ZoneStatus::Active } else { ZoneStatus::Paused },
            record_count: None,
            updated_at: None,
            meta: Default::default(),
        })
    }

    async fn get_records(&self, zone_id: &str, query: &RecordQuery) -> Result<Page<DnsRecord>> {
        let page = query.page();
        let page_size = query.page_size(MAX_PAGE_SIZE);
        let body = serde_json::json!({
            "pageNumber": page,
            "pageSize": page_size,
            "keyword": query.keyword,
        });
        let data: JdcloudRecordListData = self.call(&format!("/domains/{zone_id}/resourceRecord"), &body).await?;
        let items = data.resource_records.into_iter().map(|r| record_to_canonical(r, zone_id)).collect();
        Ok(Page::new(items, page, page_size, data.total_count))
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        let data: JdcloudRecord = self
            .call(&format!("/domains/{zone_id}/resourceRecord/{record_id}"), &serde_json::json!({}))
            .await?;
        Ok(record_to_canonical(data, zone_id))
    }

    async fn create_record(&self, zone_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let host = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let body = serde_json::json!({
            "hostRecord": host,
            "hostValue": params.value,
            "viewValue": line_to_vendor(params.line.as_deref().unwrap_or("default")),
            "ttl": params.ttl,
            "hostRecordType": type_to_vendor(&params.record_type),
            "mxPriority": params.priority,
        });
        let data: JdcloudRecordIdData = self.call(&format!("/domains/{zone_id}/resourceRecord"), &body).await?;
        self.get_record(zone_id, &data.resource_record_id.to_string()).await
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let host = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let body = serde_json::json!({
            "hostRecord": host,
            "hostValue": params.value,
            "viewValue": line_to_vendor(params.line.as_deref().unwrap_or("default")),
            "ttl": params.ttl,
            "hostRecordType": type_to_vendor(&params.record_type),
            "mxPriority": params.priority,
        });
        let _: JdcloudRecord = self.call(&format!("/domains/{zone_id}/resourceRecord/{record_id}"), &body).await?;
        self.get_record(zone_id, record_id).await
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<bool> {
        let _: serde_json::Value = self
            .call(&format!("/domains/{zone_id}/resourceRecord/{record_id}/delete"), &serde_json::json!({}))
            .await?;
        Ok(true)
    }

    async fn set_record_status(&self, zone_id: &str, record_id: &str, enabled: bool) -> Result<bool> {
        let status = if enabled { "Enable" } else { "Disable" };
        let _: serde_json::Value = self
            .call(&format!("/domains/{zone_id}/resourceRecord/{record_id}/status"), &serde_json::json!({ "status": status }))
            .await?;
        Ok(true)
    }

    async fn get_lines(&self, _zone_id: Option<&str>) -> Result<Vec<DnsLine>> {
        Ok(["0", "1", "2", "3", "4"]
            .into_iter()
            .map(|c| DnsLine {
                code: line_from_vendor(c),
                name: c.to_string(),
                parent_code: None,
            })
            .collect())
    }

    async fn get_min_ttl(&self, _zone_id: Option<&str>) -> u32 {
        600
    }
}

fn record_to_canonical(r: JdcloudRecord, zone_id: &str) -> DnsRecord {
    DnsRecord {
        id: r.resource_record_id.to_string(),
        zone_id: zone_id.to_string(),
        zone_name: zone_id.to_string(),
        name: BaseProvider::relative_to_full_name(&r.host_record, zone_id),
        record_type: type_from_vendor(&r.host_record_type),
        value: r.host_value,
        ttl: r.ttl,
        line: Some(line_from_vendor(&r.view_value)),
        weight: None,
        priority: r.mx_priority,
        status: Some(if r.status == "Enable" { RecordStatus::Enabled } else { RecordStatus::Disabled }),
        remark: None,
        proxied: None,
        updated_at: None,
        meta: Default::default(),
    }
}

#[derive(Debug, Deserialize)]
struct JdcloudErrorEnvelope {
    error: JdcloudError,
}

#[derive(Debug, Deserialize)]
struct JdcloudError {
    code: u32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JdcloudZoneListData {
    #[serde(default)]
    domains: Vec<JdcloudZone>,
    #[serde(rename = "totalCount", default)]
    total_count: u32,
}

#[derive(Debug, Deserialize)]
struct JdcloudZone {
    #[serde(rename = "domainId")]
    domain_id: u64,
    #[serde(rename = "domainName")]
    domain_name: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct JdcloudRecordListData {
    #[serde(rename = "resourceRecords", default)]
    resource_records: Vec<JdcloudRecord>,
    #[serde(rename = "totalCount", default)]
    total_count: u32,
}

#[derive(Debug, Deserialize)]
struct JdcloudRecordIdData {
    #[serde(rename = "resourceRecordId")]
    resource_record_id: u64,
}

#[derive(Debug, Deserialize)]
struct JdcloudRecord {
    #[serde(rename = "resourceRecordId")]
    resource_record_id: u64,
    #[serde(rename = "hostRecord")]
    host_record: String,
    #[serde(rename = "hostRecordType")]
    host_record_type: String,
    #[serde(rename = "hostValue")]
    host_value: String,
    ttl: u32,
    #[serde(rename = "viewValue", default = "default_view")]
    view_value: String,
    #[serde(rename = "mxPriority", default)]
    mx_priority: Option<u16>,
    #[serde(default = "default_status")]
    status: String,
}

fn default_view() -> String {
    "0".to_string()
}

fn default_status() -> String {
    "Enable".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mapping_round_trips() {
        for t in ["REDIRECT_URL", "FORWARD_URL", "A", "TXT"] {
            assert_eq!(type_from_vendor(&type_to_vendor(t)), t);
        }
    }

    #[test]
    fn line_mapping_round_trips() {
        for code in ["default", "telecom", "unicom", "mobile", "oversea"] {
            assert_eq!(line_from_vendor(&line_to_vendor(code)), code);
        }
    }

    #[test]
    fn page_size_is_capped_at_99() {
        assert_eq!(MAX_PAGE_SIZE, 99);
    }

    #[test]
    fn missing_secrets_raise_missing_credentials() {
        let ctx = ServiceContext::new(ProviderKind::Jdcloud, Default::default());
        let err = JdcloudProvider::new(&ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredentials);
    }
}
