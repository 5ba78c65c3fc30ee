//! Aliyun DNS adapter: classic query-string HMAC-SHA1 signing (§4.2), zones
//! addressed directly by domain name (no `requiresDomainId`), server paging.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use uuid::Uuid;

use crate::base::BaseProvider;
use crate::error::{ErrorKind, GatewayError, Result};
use crate::provider::{Page, Provider};
use crate::signing::aliyun_hmac_sha1;
use crate::transport;
use crate::types::{
    AuthField, AuthFieldKind, Capabilities, DnsLine, DnsRecord, PagingMode, ProviderKind,
    RecordParams, RecordQuery, RemarkMode, RecordStatus, ServiceContext, Zone, ZoneStatus,
};

const ENDPOINT: &str = "https://alidns.aliyuncs.com/";
const API_VERSION: &str = "2015-01-09";

pub fn capabilities() -> Capabilities {
    Capabilities {
        supports_weight: false,
        supports_line: true,
        supports_status: true,
        supports_remark: true,
        supports_url_forward: false,
        supports_logs: false,
        requires_domain_id: false,
        remark_mode: RemarkMode::Separate,
        paging: PagingMode::Server,
        record_types: vec!["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV", "CAA"]
            .into_iter()
            .map(String::from)
            .collect(),
        auth_fields: vec![
            AuthField::new("accessKeyId", "AccessKey ID", AuthFieldKind::Text),
            AuthField::new("accessKeySecret", "AccessKey Secret", AuthFieldKind::Password),
        ],
        domain_cache_ttl: 300,
        record_cache_ttl: 60,
        retryable_errors: vec!["Throttling".to_string(), "ServiceUnavailable".to_string()],
        max_retries: 2,
    }
}

/// Canonical `line` ↔ Aliyun `Line` value. Unknown codes pass through.
fn line_to_vendor(code: &str) -> String {
    match code {
        "default" => "default",
        "telecom" => "telecom",
        "unicom" => "unicom",
        "mobile" => "mobile",
        "edu" => "edu",
        "oversea" => "oversea",
        other => other,
    }
    .to_string()
}

fn line_from_vendor(code: &str) -> String {
    line_to_vendor(code)
}

#[derive(Debug)]
pub struct AliyunProvider {
    base: BaseProvider,
    access_key_id: String,
    access_key_secret: String,
}

impl AliyunProvider {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        Ok(Self {
            base: BaseProvider::new("aliyun", capabilities()),
            access_key_id: super::require_secret(ctx, "accessKeyId")?,
            access_key_secret: super::require_secret(ctx, "accessKeySecret")?,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, action: &str, params: Vec<(String, String)>) -> Result<T> {
        self.base
            .with_retry(|| async {
                let mut all_params = params.clone();
                all_params.push(("Action".to_string(), action.to_string()));
                all_params.push(("Version".to_string(), API_VERSION.to_string()));
                let nonce = Uuid::new_v4().to_string();
                let signed = aliyun_hmac_sha1::sign(&self.access_key_id, &self.access_key_secret, all_params, Utc::now(), &nonce);
                let req = transport::request(Method::GET, ENDPOINT).query(&signed);
                let raw = transport::execute("aliyun", req).await?;
                if raw.status >= 400 {
                    let err: AliyunError = serde_json::from_str(&raw.body).unwrap_or(AliyunError {
                        code: "Unknown".to_string(),
                        message: raw.body.clone(),
                    });
                    return Err(self.classify(raw.status, &err));
                }
                transport::parse_json("aliyun", &raw)
            })
            .await
    }

    fn classify(&self, status: u16, err: &AliyunError) -> GatewayError {
        let kind = match err.code.as_str() {
            "InvalidAccessKeyId.NotFound" | "SignatureDoesNotMatch" | "IncompleteSignature" => ErrorKind::AuthFailed,
            "DomainRecordNotBelongToUser" | "InvalidRR.NotExists" => ErrorKind::RecordNotFound,
            "DomainNotExists" | "DomainForbidden" => ErrorKind::ZoneNotFound,
            _ => ErrorKind::VendorError,
        };
        self.base.new_error(kind, Some(&err.code), err.message.clone(), Some(status))
    }

    fn record_to_canonical(rec: AliyunRecord, zone_id: &str, zone_name: &str) -> DnsRecord {
        DnsRecord {
            id: rec.record_id,
            zone_id: zone_id.to_string(),
            zone_name: zone_name.to_string(),
            name: BaseProvider::relative_to_full_name(&rec.rr, zone_name),
            record_type: rec.record_type,
            value: rec.value,
            ttl: rec.ttl,
            line: Some(line_from_vendor(&rec.line)),
            weight: None,
            priority: rec.priority,
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
impl Provider for AliyunProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Aliyun
    }

    fn capabilities(&self) -> &Capabilities {
        &self.base.capabilities
    }

    async fn check_auth(&self) -> bool {
        self.call::<AliyunDomainsResponse>("DescribeDomains", vec![("PageSize".to_string(), "1".to_string())])
            .await
            .is_ok()
    }

    async fn get_zones(&self, page: u32, page_size: u32, keyword: Option<&str>) -> Result<Page<Zone>> {
        let page_size = page_size.min(100);
        let mut params = vec![("PageNumber".to_string(), page.to_string()), ("PageSize".to_string(), page_size.to_string())];
        if let Some(kw) = keyword {
            params.push(("KeyWord".to_string(), kw.to_string()));
        }
        let resp: AliyunDomainsResponse = self.call("DescribeDomains", params).await?;
        let items = resp
            .domains
            .domain
            .into_iter()
            .map(|d| Zone {
                id: d.domain_name.clone(),
                name: BaseProvider::normalize_name(&d.domain_name),
                status: ZoneStatus::Active,
                record_count: Some(d.record_count),
                updated_at: None,
                meta: Default::default(),
            })
            .collect();
        Ok(Page::new(items, page, page_size, resp.total_count))
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        let resp: AliyunDomainInfo = self
            .call("DescribeDomainInfo", vec![("DomainName".to_string(), zone_id.to_string())])
            .await?;
        Ok(Zone {
            id: resp.domain_name.clone(),
            name: BaseProvider::normalize_name(&resp.domain_name),
            status: ZoneStatus::Active,
            record_count: None,
            updated_at: None,
            meta: Default::default(),
        })
    }

    async fn get_records(&self, zone_id: &str, query: &RecordQuery) -> Result<Page<DnsRecord>> {
        let page = query.page();
        let page_size = query.page_size(100);
        let mut params = vec![
            ("DomainName".to_string(), zone_id.to_string()),
            ("PageNumber".to_string(), page.to_string()),
            ("PageSize".to_string(), page_size.to_string()),
        ];
        if let Some(kw) = &query.keyword {
            params.push(("KeyWord".to_string(), kw.clone()));
        }
        if let Some(t) = &query.record_type {
            params.push(("TypeKeyWord".to_string(), t.clone()));
        }
        if let Some(line) = &query.line {
            params.push(("LineKeyWord".to_string(), line_to_vendor(line)));
        }
        let resp: AliyunRecordsResponse = self.call("DescribeDomainRecords", params).await?;
        let items = resp
            .domain_records
            .record
            .into_iter()
            .map(|r| Self::record_to_canonical(r, zone_id, zone_id))
            .collect();
        Ok(Page::new(items, page, page_size, resp.total_count))
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        let rec: AliyunRecord = self
            .call("DescribeDomainRecordInfo", vec![("RecordId".to_string(), record_id.to_string())])
            .await?;
        Ok(Self::record_to_canonical(rec, zone_id, zone_id))
    }

    async fn create_record(&self, zone_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let rr = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let mut args = vec![
            ("DomainName".to_string(), zone_id.to_string()),
            ("RR".to_string(), rr),
            ("Type".to_string(), params.record_type.clone()),
            ("Value".to_string(), params.value.clone()),
            ("TTL".to_string(), params.ttl.to_string()),
        ];
        if let Some(line) = &params.line {
            args.push(("Line".to_string(), line_to_vendor(line)));
        }
        if let Some(priority) = params.priority {
            args.push(("Priority".to_string(), priority.to_string()));
        }
        let resp: AliyunAddRecordResponse = self.call("AddDomainRecord", args).await?;
        if let Some(remark) = &params.remark {
            let _: serde_json::Value = self
                .call(
                    "UpdateDomainRecordRemark",
                    vec![("RecordId".to_string(), resp.record_id.clone()), ("Remark".to_string(), remark.clone())],
                )
                .await?;
        }
        self.get_record(zone_id, &resp.record_id).await
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let rr = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let mut args = vec![
            ("RecordId".to_string(), record_id.to_string()),
            ("RR".to_string(), rr),
            ("Type".to_string(), params.record_type.clone()),
            ("Value".to_string(), params.value.clone()),
            ("TTL".to_string(), params.ttl.to_string()),
        ];
        if let Some(line) = &params.line {
            args.push(("Line".to_string(), line_to_vendor(line)));
        }
        if let Some(priority) = params.priority {
            args.push(("Priority".to_string(), priority.to_string()));
        }
        let _: serde_json::Value = self.call("UpdateDomainRecord", args).await?;
        if let Some(remark) = &params.remark {
            let _: serde_json::Value = self
                .call(
                    "UpdateDomainRecordRemark",
                    vec![("RecordId".to_string(), record_id.to_string()), ("Remark".to_string(), remark.clone())],
                )
                .await?;
        }
        self.get_record(zone_id, record_id).await
    }

    async fn delete_record(&self, _zone_id: &str, record_id: &str) -> Result<bool> {
        let _: serde_json::Value = self.call("DeleteDomainRecord", vec![("RecordId".to_string(), record_id.to_string())]).await?;
        Ok(true)
    }

    async fn set_record_status(&self, _zone_id: &str, record_id: &str, enabled: bool) -> Result<bool> {
        let status = if enabled { "Enable" } else { "Disable" };
        let _: serde_json::Value = self
            .call(
                "SetDomainRecordStatus",
                vec![("RecordId".to_string(), record_id.to_string()), ("Status".to_string(), status.to_string())],
            )
            .await?;
        Ok(true)
    }

    async fn get_lines(&self, zone_id: Option<&str>) -> Result<Vec<DnsLine>> {
        let domain = zone_id.unwrap_or("").to_string();
        let resp: AliyunLinesResponse = self.call("DescribeSupportLines", vec![("DomainName".to_string(), domain)]).await?;
        Ok(resp
            .lines
            .line
            .into_iter()
            .map(|l| DnsLine {
                code: line_from_vendor(&l.line_code),
                name: l.line_name,
                parent_code: None,
            })
            .collect())
    }

    async fn get_min_ttl(&self, _zone_id: Option<&str>) -> u32 {
        600
    }
}

#[derive(Debug, Deserialize)]
struct AliyunError {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct AliyunDomainsResponse {
    #[serde(rename = "TotalCount")]
    total_count: u32,
    #[serde(rename = "Domains")]
    domains: AliyunDomainList,
}

#[derive(Debug, Deserialize)]
struct AliyunDomainList {
    #[serde(rename = "Domain")]
    domain: Vec<AliyunDomain>,
}

#[derive(Debug, Deserialize)]
struct AliyunDomain {
    #[serde(rename = "DomainName")]
    domain_name: String,
    #[serde(rename = "RecordCount")]
    record_count: u32,
}

#[derive(Debug, Deserialize)]
struct AliyunDomainInfo {
    #[serde(rename = "DomainName")]
    domain_name: String,
}

#[derive(Debug, Deserialize)]
struct AliyunRecordsResponse {
    #[serde(rename = "TotalCount")]
    total_count: u32,
    #[serde(rename = "DomainRecords")]
    domain_records: AliyunRecordList,
}

#[derive(Debug, Deserialize)]
struct AliyunRecordList {
    #[serde(rename = "Record")]
    record: Vec<AliyunRecord>,
}

#[derive(Debug, Deserialize)]
struct AliyunRecord {
    #[serde(rename = "RecordId")]
    record_id: String,
    #[serde(rename = "RR")]
    rr: String,
    #[serde(rename = "Type")]
    record_type: String,
    #[serde(rename = "Value")]
    value: String,
    #[serde(rename = "TTL")]
    ttl: u32,
    #[serde(rename = "Line", default = "default_line_code")]
    line: String,
    #[serde(rename = "Priority", default)]
    priority: Option<u16>,
    #[serde(rename = "Status", default)]
    status: String,
    #[serde(rename = "Remark", default)]
    remark: Option<String>,
}

fn default_line_code() -> String {
    "default".to_string()
}

#[derive(Debug, Deserialize)]
struct AliyunAddRecordResponse {
    #[serde(rename = "RecordId")]
    record_id: String,
}

#[derive(Debug, Deserialize)]
struct AliyunLinesResponse {
    #[serde(rename = "Lines")]
    lines: AliyunLineList,
}

#[derive(Debug, Deserialize)]
struct AliyunLineList {
    #[serde(rename = "Line")]
    line: Vec<AliyunLine>,
}

#[derive(Debug, Deserialize)]
struct AliyunLine {
    #[serde(rename = "LineCode")]
    line_code: String,
    #[serde(rename = "LineName")]
    line_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_mapping_round_trips_known_codes() {
        for code in ["default", "telecom", "unicom", "mobile", "edu", "oversea"] {
            assert_eq!(line_from_vendor(&line_to_vendor(code)), code);
        }
    }

    #[test]
    fn unknown_line_code_passes_through() {
        assert_eq!(line_to_vendor("search"), "search");
    }

    #[test]
    fn record_to_canonical_maps_enable_status() {
        let rec = AliyunRecord {
            record_id: "1".into(),
            rr: "www".into(),
            record_type: "A".into(),
            value: "1.2.3.4".into(),
            ttl: 600,
            line: "telecom".into(),
            priority: None,
            status: "ENABLE".into(),
            remark: Some("prod".into()),
        };
        let canonical = AliyunProvider::record_to_canonical(rec, "example.com", "example.com");
        assert_eq!(canonical.name, "www.example.com");
        assert_eq!(canonical.status, Some(RecordStatus::Enabled));
        assert_eq!(canonical.line.as_deref(), Some("telecom"));
    }

    #[test]
    fn missing_secrets_raise_missing_credentials() {
        let ctx = ServiceContext::new(ProviderKind::Aliyun, Default::default());
        let err = AliyunProvider::new(&ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredentials);
    }
}
