//! DNSPod (Tencent Cloud) adapter: TC3-HMAC-SHA256 signed JSON-RPC-style
//! calls to the Tencent Cloud API gateway. The legacy Token adapter lives
//! in [`super::dnspod_legacy`] — the constructor in [`super::register_builtins`]
//! maps them to distinct `ProviderKind`s per the "dynamic capability
//! switching" design note rather than branching inside one adapter.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use crate::base::BaseProvider;
use crate::error::{ErrorKind, GatewayError, Result};
use crate::provider::{Page, Provider};
use crate::signing::tc3_hmac_sha256::{self, Tc3Scope};
use crate::transport;
use crate::types::{
    AuthField, AuthFieldKind, Capabilities, DnsLine, DnsRecord, PagingMode, ProviderKind,
    RecordParams, RecordQuery, RemarkMode, RecordStatus, ServiceContext, Zone, ZoneStatus,
};

const HOST: &str = "dnspod.tencentcloudapi.com";
const ENDPOINT: &str = "https://dnspod.tencentcloudapi.com";
const SERVICE: &str = "dnspod";
const API_VERSION: &str = "2021-03-23";

pub fn capabilities() -> Capabilities {
    Capabilities {
        supports_weight: true,
        supports_line: true,
        supports_status: true,
        supports_remark: true,
        supports_url_forward: true,
        supports_logs: false,
        requires_domain_id: false,
        remark_mode: RemarkMode::Inline,
        paging: PagingMode::Server,
        record_types: vec!["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV", "CAA", "REDIRECT_URL", "FORWARD_URL"]
            .into_iter()
            .map(String::from)
            .collect(),
        auth_fields: vec![
            AuthField::new("secretId", "SecretId", AuthFieldKind::Text),
            AuthField::new("secretKey", "SecretKey", AuthFieldKind::Password),
        ],
        domain_cache_ttl: 300,
        record_cache_ttl: 60,
        retryable_errors: vec!["RequestLimitExceeded".to_string(), "InternalError".to_string()],
        max_retries: 2,
    }
}

fn line_from_vendor(name: &str) -> String {
    match name {
        "默认" | "default" => "default",
        "电信" => "telecom",
        "联通" => "unicom",
        "移动" => "mobile",
        "教育网" => "edu",
        "境外" => "oversea",
        "搜索引擎" => "search",
        other => other,
    }
    .to_string()
}

fn line_to_vendor(code: &str) -> String {
    match code {
        "default" => "默认",
        "telecom" => "电信",
        "unicom" => "联通",
        "mobile" => "移动",
        "edu" => "教育网",
        "oversea" => "境外",
        "search" => "搜索引擎",
        other => other,
    }
    .to_string()
}

#[derive(Debug)]
pub struct DnspodTc3Provider {
    base: BaseProvider,
    secret_id: String,
    secret_key: String,
}

impl DnspodTc3Provider {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        Ok(Self {
            base: BaseProvider::new("dnspod", capabilities()),
            secret_id: super::require_secret(ctx, "secretId")?,
            secret_key: super::require_secret(ctx, "secretKey")?,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, action: &str, payload: serde_json::Value) -> Result<T> {
        self.base
            .with_retry(|| async {
                let now = Utc::now();
                let payload_str = payload.to_string();
                let date = now.format("%Y-%m-%d").to_string();
                let timestamp = now.timestamp();
                let content_type = "application/json";
                let canonical_headers = format!(
                    "content-type:{content_type}\nhost:{HOST}\nx-tc-action:{}\n",
                    action.to_lowercase()
                );
                let signed_headers = "content-type;host;x-tc-action";
                let authorization = tc3_hmac_sha256::sign(
                    &self.secret_id,
                    &self.secret_key,
                    &Tc3Scope { service: SERVICE, region: None },
                    HOST,
                    "/",
                    "",
                    &canonical_headers,
                    signed_headers,
                    &payload_str,
                    now,
                );
                let req = transport::request(Method::POST, ENDPOINT)
                    .header("Content-Type", content_type)
                    .header("Host", HOST)
                    .header("X-TC-Action", action)
                    .header("X-TC-Version", API_VERSION)
                    .header("X-TC-Timestamp", timestamp.to_string())
                    .header("X-TC-Region", "")
                    .header("Authorization", authorization)
                    .header("X-TC-Date", date)
                    .body(payload_str.clone());
                let raw = transport::execute("dnspod", req).await?;
                let envelope: Tc3RawEnvelope = transport::parse_json("dnspod", &raw)?;
                if let Some(err_val) = envelope.response.get("Error") {
                    let err: Tc3Error = serde_json::from_value(err_val.clone())
                        .unwrap_or(Tc3Error { code: "Unknown".to_string(), message: raw.body.clone() });
                    return Err(self.classify(raw.status, &err));
                }
                serde_json::from_value(envelope.response).map_err(|e| {
                    self.base.new_error(ErrorKind::InvalidResponse, None, format!("failed to parse dnspod response: {e}"), None)
                })
            })
            .await
    }

    fn classify(&self, status: u16, err: &Tc3Error) -> GatewayError {
        let kind = match err.code.as_str() {
            "AuthFailure.SecretIdNotFound" | "AuthFailure.SignatureFailure" => ErrorKind::AuthFailed,
            "ResourceNotFound.NoDataOfRecord" => ErrorKind::RecordNotFound,
            "ResourceNotFound.NoDataOfDomain" => ErrorKind::ZoneNotFound,
            "LimitExceeded" | "RequestLimitExceeded" => ErrorKind::RateLimited,
            _ => ErrorKind::VendorError,
        };
        self.base.new_error(kind, Some(&err.code), err.message.clone(), Some(status))
    }

    fn record_to_canonical(rec: Tc3Record, zone_id: &str, zone_name: &str) -> DnsRecord {
        DnsRecord {
            id: rec.record_id.to_string(),
            zone_id: zone_id.to_string(),
            zone_name: zone_name.to_string(),
            name: BaseProvider::relative_to_full_name(&rec.name, zone_name),
            record_type: rec.record_type,
            value: rec.value,
            ttl: rec.ttl,
            line: Some(line_from_vendor(&rec.line)),
            weight: rec.weight,
            priority: rec.mx,
            status: match rec.status.as_str() {
                "ENABLE" => Some(RecordStatus::Enabled),
                "DISABLE" => Some(RecordStatus::Disabled),
                _ => None,
            },
            remark: rec.remark.filter(|r| !r.is_empty()),
            proxied: None,
            updated_at: None,
            meta: Default::default(),
        }
    }
}

#[async_trait]
impl Provider for DnspodTc3Provider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DnspodTc3
    }

    fn capabilities(&self) -> &Capabilities {
        &self.base.capabilities
    }

    async fn check_auth(&self) -> bool {
        self.call::<Tc3DomainListData>("DescribeDomainList", json!({"Limit": 1})).await.is_ok()
    }

    async fn get_zones(&self, page: u32, page_size: u32, keyword: Option<&str>) -> Result<Page<Zone>> {
        let page_size = page_size.min(100);
        let mut body = json!({
            "Offset": (page.saturating_sub(1)) * page_size,
            "Limit": page_size,
        });
        if let Some(kw) = keyword {
            body["Keyword"] = json!(kw);
        }
        let data: Tc3DomainListData = self.call("DescribeDomainList", body).await?;
        let items = data
            .domain_list
            .into_iter()
            .map(|d| Zone {
                id: d.domain.clone(),
                name: BaseProvider::normalize_name(&d.domain),
                status: if d.status == "ENABLE" { ZoneStatus::Active } else { ZoneStatus::Paused },
                record_count: Some(d.record_count),
                updated_at: None,
                meta: Default::default(),
            })
            .collect();
        Ok(Page::new(items, page, page_size, data.domain_count_info.domain_total))
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        let data: Tc3DomainData = self.call("DescribeDomain", json!({"Domain": zone_id})).await?;
        Ok(Zone {
            id: data.domain_info.domain.clone(),
            name: BaseProvider::normalize_name(&data.domain_info.domain),
            status: ZoneStatus::Active,
            record_count: None,
            updated_at: None,
            meta: Default::default(),
        })
    }

    async fn get_records(&self, zone_id: &str, query: &RecordQuery) -> Result<Page<DnsRecord>> {
        let page = query.page();
        let page_size = query.page_size(100);
        let mut body = json!({
            "Domain": zone_id,
            "Offset": (page.saturating_sub(1)) * page_size,
            "Limit": page_size,
        });
        if let Some(kw) = &query.keyword {
            body["Keyword"] = json!(kw);
        }
        if let Some(t) = &query.record_type {
            body["RecordType"] = json!(t);
        }
        let data: Tc3RecordListData = self.call("DescribeRecordList", body).await?;
        let items = data
            .record_list
            .into_iter()
            .map(|r| Self::record_to_canonical(r, zone_id, zone_id))
            .collect();
        Ok(Page::new(items, page, page_size, data.record_count_info.total_count))
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        let id: u64 = record_id.parse().map_err(|_| GatewayError::record_not_found(record_id))?;
        let data: Tc3RecordData = self.call("DescribeRecord", json!({"Domain": zone_id, "RecordId": id})).await?;
        Ok(Self::record_to_canonical(data.record_info, zone_id, zone_id))
    }

    async fn create_record(&self, zone_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let sub_domain = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let mut body = json!({
            "Domain": zone_id,
            "SubDomain": sub_domain,
            "RecordType": params.record_type,
            "RecordLine": line_to_vendor(params.line.as_deref().unwrap_or("default")),
            "Value": params.value,
            "TTL": params.ttl,
        });
        if params.record_type.eq_ignore_ascii_case("MX") {
            body["MX"] = json!(params.priority.unwrap_or(10));
        }
        if let Some(weight) = params.weight {
            body["Weight"] = json!(weight);
        }
        if let Some(remark) = &params.remark {
            body["Remark"] = json!(remark);
        }
        let data: Tc3CreateRecordData = self.call("CreateRecord", body).await?;
        self.get_record(zone_id, &data.record_id.to_string()).await
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let id: u64 = record_id.parse().map_err(|_| GatewayError::record_not_found(record_id))?;
        let sub_domain = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let mut body = json!({
            "Domain": zone_id,
            "RecordId": id,
            "SubDomain": sub_domain,
            "RecordType": params.record_type,
            "RecordLine": line_to_vendor(params.line.as_deref().unwrap_or("default")),
            "Value": params.value,
            "TTL": params.ttl,
        });
        if params.record_type.eq_ignore_ascii_case("MX") {
            body["MX"] = json!(params.priority.unwrap_or(10));
        }
        if let Some(weight) = params.weight {
            body["Weight"] = json!(weight);
        }
        if let Some(remark) = &params.remark {
            body["Remark"] = json!(remark);
        }
        let _: Tc3Empty = self.call("ModifyRecord", body).await?;
        self.get_record(zone_id, record_id).await
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<bool> {
        let id: u64 = record_id.parse().map_err(|_| GatewayError::record_not_found(record_id))?;
        let _: Tc3Empty = self.call("DeleteRecord", json!({"Domain": zone_id, "RecordId": id})).await?;
        Ok(true)
    }

    async fn set_record_status(&self, zone_id: &str, record_id: &str, enabled: bool) -> Result<bool> {
        let id: u64 = record_id.parse().map_err(|_| GatewayError::record_not_found(record_id))?;
        let status = if enabled { "ENABLE" } else { "DISABLE" };
        let _: Tc3Empty = self.call("ModifyRecordStatus", json!({"Domain": zone_id, "RecordId": id, "Status": status})).await?;
        Ok(true)
    }

    async fn get_lines(&self, zone_id: Option<&str>) -> Result<Vec<DnsLine>> {
        let domain = zone_id.unwrap_or_default();
        let data: Tc3LineListData = self.call("DescribeRecordLineList", json!({"Domain": domain, "DomainGrade": "DP_FREE"})).await?;
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
        self.get_zone(zone_id)
            .await
            .map(|_| 600)
            .unwrap_or(600)
    }
}

#[derive(Debug, Deserialize)]
struct Tc3RawEnvelope {
    #[serde(rename = "Response")]
    response: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Tc3Error {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Tc3Empty {}

#[derive(Debug, Deserialize)]
struct Tc3DomainListData {
    #[serde(rename = "DomainList", default)]
    domain_list: Vec<Tc3Domain>,
    #[serde(rename = "DomainCountInfo")]
    domain_count_info: Tc3DomainCount,
}

#[derive(Debug, Deserialize)]
struct Tc3DomainCount {
    #[serde(rename = "DomainTotal", default)]
    domain_total: u32,
}

#[derive(Debug, Deserialize)]
struct Tc3Domain {
    #[serde(rename = "Name")]
    domain: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "RecordCount", default)]
    record_count: u32,
}

#[derive(Debug, Deserialize)]
struct Tc3DomainData {
    #[serde(rename = "DomainInfo")]
    domain_info: Tc3DomainInfo,
}

#[derive(Debug, Deserialize)]
struct Tc3DomainInfo {
    #[serde(rename = "Domain")]
    domain: String,
}

#[derive(Debug, Deserialize)]
struct Tc3RecordListData {
    #[serde(rename = "RecordList", default)]
    record_list: Vec<Tc3Record>,
    #[serde(rename = "RecordCountInfo")]
    record_count_info: Tc3RecordCount,
}

#[derive(Debug, Deserialize)]
struct Tc3RecordCount {
    #[serde(rename = "TotalCount", default)]
    total_count: u32,
}

#[derive(Debug, Deserialize)]
struct Tc3RecordData {
    #[serde(rename = "RecordInfo")]
    record_info: Tc3Record,
}

#[derive(Debug, Deserialize)]
struct Tc3Record {
    #[serde(rename = "RecordId")]
    record_id: u64,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Type")]
    record_type: String,
    #[serde(rename = "Value")]
    value: String,
    #[serde(rename = "TTL")]
    ttl: u32,
    #[serde(rename = "Line", default = "default_line")]
    line: String,
    #[serde(rename = "Weight", default)]
    weight: Option<u32>,
    #[serde(rename = "MX", default)]
    mx: Option<u16>,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Remark", default)]
    remark: Option<String>,
}

fn default_line() -> String {
    "默认".to_string()
}

#[derive(Debug, Deserialize)]
struct Tc3CreateRecordData {
    #[serde(rename = "RecordId")]
    record_id: u64,
}

#[derive(Debug, Deserialize)]
struct Tc3LineListData {
    #[serde(rename = "Lines", default)]
    lines: Vec<String>,
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
        let rec = Tc3Record {
            record_id: 7,
            name: "@".into(),
            record_type: "MX".into(),
            value: "mail.example.com".into(),
            ttl: 600,
            line: "默认".into(),
            weight: None,
            mx: Some(10),
            status: "ENABLE".into(),
            remark: None,
        };
        let canonical = DnspodTc3Provider::record_to_canonical(rec, "example.com", "example.com");
        assert_eq!(canonical.name, "example.com");
        assert_eq!(canonical.priority, Some(10));
        assert_eq!(canonical.line.as_deref(), Some("default"));
    }

    #[test]
    fn missing_secrets_raise_missing_credentials() {
        let ctx = ServiceContext::new(ProviderKind::DnspodTc3, Default::default());
        let err = DnspodTc3Provider::new(&ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredentials);
    }
}
