//! DNSPod legacy Token API adapter: MD5 token auth (§4.2), form-encoded
//! body, `dnsapi.cn`. Selected by [`super::register_builtins`] when a
//! context carries `username`/`apiPassword` rather than TC3
//! `secretId`/`secretKey`.

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
    RecordParams, RecordQuery, RemarkMode, RecordStatus, ServiceContext, Zone, ZoneStatus,
};

const ENDPOINT: &str = "https://dnsapi.cn";

pub fn capabilities() -> Capabilities {
    Capabilities {
        supports_weight: false,
        supports_line: true,
        supports_status: true,
        supports_remark: true,
        supports_url_forward: true,
        supports_logs: false,
        requires_domain_id: false,
        remark_mode: RemarkMode::Separate,
        paging: PagingMode::Server,
        record_types: vec!["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV", "CAA", "显性URL", "隐性URL"]
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

fn type_to_vendor(t: &str) -> String {
    match t {
        "REDIRECT_URL" => "显性URL".to_string(),
        "FORWARD_URL" => "隐性URL".to_string(),
        other => other.to_string(),
    }
}

fn type_from_vendor(t: &str) -> String {
    match t {
        "显性URL" => "REDIRECT_URL".to_string(),
        "隐性URL" => "FORWARD_URL".to_string(),
        other => other.to_string(),
    }
}

fn line_from_vendor(name: &str) -> String {
    match name {
        "默认" => "default",
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

#[derive(Debug)]
pub struct DnspodLegacyProvider {
    base: BaseProvider,
    username: String,
    api_password: String,
}

impl DnspodLegacyProvider {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        Ok(Self {
            base: BaseProvider::new("dnspod_legacy", capabilities()),
            username: super::require_secret(ctx, "username")?,
            api_password: super::require_secret(ctx, "apiPassword")?,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, path: &str, form: Vec<(String, String)>) -> Result<T> {
        self.base
            .with_retry(|| async {
                let mut form = form.clone();
                let (time, token) = md5_token::sign(&self.username, &self.api_password, Utc::now());
                form.push(("user_id".to_string(), self.username.clone()));
                form.push(("time".to_string(), time));
                form.push(("token".to_string(), token));
                form.push(("format".to_string(), "json".to_string()));
                form.push(("lang".to_string(), "en".to_string()));
                let req = transport::request(Method::POST, &format!("{ENDPOINT}{path}")).form(&form);
                let raw = transport::execute("dnspod_legacy", req).await?;
                let envelope: DnspodLegacyRawEnvelope = transport::parse_json("dnspod_legacy", &raw)?;
                if envelope.status.code != "1" {
                    return Err(self.classify(&envelope.status.code, &envelope.status.message));
                }
                serde_json::from_value(envelope.rest).map_err(|e| {
                    self.base.new_error(ErrorKind::InvalidResponse, None, format!("failed to parse dnspod_legacy response: {e}"), None)
                })
            })
            .await
    }

    fn classify(&self, code: &str, message: &str) -> GatewayError {
        let kind = match code {
            "-1" | "-6" => ErrorKind::AuthFailed,
            "6" => ErrorKind::RecordNotFound,
            "7" => ErrorKind::ZoneNotFound,
            _ => ErrorKind::VendorError,
        };
        self.base.new_error(kind, Some(code), message, None)
    }
}

#[async_trait]
impl Provider for DnspodLegacyProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DnspodLegacy
    }

    fn capabilities(&self) -> &Capabilities {
        &self.base.capabilities
    }

    async fn check_auth(&self) -> bool {
        self.call::<LegacyUserInfo>("/User.Detail", vec![]).await.is_ok()
    }

    async fn get_zones(&self, page: u32, page_size: u32, keyword: Option<&str>) -> Result<Page<Zone>> {
        let mut form = vec![("offset".to_string(), ((page.saturating_sub(1)) * page_size).to_string()), ("length".to_string(), page_size.to_string())];
        if let Some(kw) = keyword {
            form.push(("keyword".to_string(), kw.to_string()));
        }
        let data: LegacyDomainListData = self.call("/Domain.List", form).await?;
        let items = data
            .domains
            .into_iter()
            .map(|d| Zone {
                id: d.name.clone(),
                name: BaseProvider::normalize_name(&d.name),
                status: if d.status == "enable" { ZoneStatus::Active } else { ZoneStatus::Paused },
                record_count: d.records.parse().ok(),
                updated_at: None,
                meta: Default::default(),
            })
            .collect();
        Ok(Page::new(items, page, page_size, data.info.domain_total))
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        let data: LegacyDomainInfoData = self.call("/Domain.Info", vec![("domain".to_string(), zone_id.to_string())]).await?;
        Ok(Zone {
            id: data.domain.name.clone(),
            name: BaseProvider::normalize_name(&data.domain.name),
            status: ZoneStatus::Active,
            record_count: None,
            updated_at: None,
            meta: Default::default(),
        })
    }

    async fn get_records(&self, zone_id: &str, query: &RecordQuery) -> Result<Page<DnsRecord>> {
        let page = query.page();
        let page_size = query.page_size(100);
        let mut form = vec![
            ("domain".to_string(), zone_id.to_string()),
            ("offset".to_string(), ((page.saturating_sub(1)) * page_size).to_string()),
            ("length".to_string(), page_size.to_string()),
        ];
        if let Some(kw) = &query.keyword {
            form.push(("keyword".to_string(), kw.clone()));
        }
        let data: LegacyRecordListData = self.call("/Record.List", form).await?;
        let total = data.info.record_total.parse().unwrap_or(data.records.len() as u32);
        let items = data
            .records
            .into_iter()
            .map(|r| record_to_canonical(r, zone_id, zone_id))
            .collect();
        Ok(Page::new(items, page, page_size, total))
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        let data: LegacyRecordInfoData = self
            .call("/Record.Info", vec![("domain".to_string(), zone_id.to_string()), ("record_id".to_string(), record_id.to_string())])
            .await?;
        Ok(record_to_canonical(data.record, zone_id, zone_id))
    }

    async fn create_record(&self, zone_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let sub_domain = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let mut form = vec![
            ("domain".to_string(), zone_id.to_string()),
            ("sub_domain".to_string(), sub_domain),
            ("record_type".to_string(), type_to_vendor(&params.record_type)),
            ("record_line".to_string(), params.line.clone().unwrap_or_else(|| "默认".to_string())),
            ("value".to_string(), params.value.clone()),
            ("ttl".to_string(), params.ttl.to_string()),
        ];
        if params.record_type.eq_ignore_ascii_case("MX") {
            form.push(("mx".to_string(), params.priority.unwrap_or(10).to_string()));
        }
        let data: LegacyCreateRecordData = self.call("/Record.Create", form).await?;
        if let Some(remark) = &params.remark {
            let _: LegacyEmptyData = self
                .call(
                    "/Record.Remark",
                    vec![("domain".to_string(), zone_id.to_string()), ("record_id".to_string(), data.record.id.clone()), ("remark".to_string(), remark.clone())],
                )
                .await?;
        }
        self.get_record(zone_id, &data.record.id).await
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let sub_domain = BaseProvider::full_name_to_relative(&params.name, zone_id);
        let mut form = vec![
            ("domain".to_string(), zone_id.to_string()),
            ("record_id".to_string(), record_id.to_string()),
            ("sub_domain".to_string(), sub_domain),
            ("record_type".to_string(), type_to_vendor(&params.record_type)),
            ("record_line".to_string(), params.line.clone().unwrap_or_else(|| "默认".to_string())),
            ("value".to_string(), params.value.clone()),
            ("ttl".to_string(), params.ttl.to_string()),
        ];
        if params.record_type.eq_ignore_ascii_case("MX") {
            form.push(("mx".to_string(), params.priority.unwrap_or(10).to_string()));
        }
        let _: LegacyEmptyData = self.call("/Record.Modify", form).await?;
        if let Some(remark) = &params.remark {
            let _: LegacyEmptyData = self
                .call(
                    "/Record.Remark",
                    vec![("domain".to_string(), zone_id.to_string()), ("record_id".to_string(), record_id.to_string()), ("remark".to_string(), remark.clone())],
                )
                .await?;
        }
        self.get_record(zone_id, record_id).await
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<bool> {
        let _: LegacyEmptyData = self
            .call("/Record.Remove", vec![("domain".to_string(), zone_id.to_string()), ("record_id".to_string(), record_id.to_string())])
            .await?;
        Ok(true)
    }

    async fn set_record_status(&self, zone_id: &str, record_id: &str, enabled: bool) -> Result<bool> {
        let status = if enabled { "enable" } else { "disable" };
        let _: LegacyEmptyData = self
            .call(
                "/Record.Status",
                vec![("domain".to_string(), zone_id.to_string()), ("record_id".to_string(), record_id.to_string()), ("status".to_string(), status.to_string())],
            )
            .await?;
        Ok(true)
    }

    async fn get_lines(&self, zone_id: Option<&str>) -> Result<Vec<DnsLine>> {
        let domain = zone_id.unwrap_or_default().to_string();
        let data: LegacyLineListData = self.call("/Record.Line", vec![("domain".to_string(), domain)]).await?;
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

    async fn get_min_ttl(&self, _zone_id: Option<&str>) -> u32 {
        600
    }
}

fn record_to_canonical(r: LegacyRecord, zone_id: &str, zone_name: &str) -> DnsRecord {
    DnsRecord {
        id: r.id,
        zone_id: zone_id.to_string(),
        zone_name: zone_name.to_string(),
        name: BaseProvider::relative_to_full_name(&r.name, zone_name),
        record_type: type_from_vendor(&r.record_type),
        value: r.value,
        ttl: r.ttl.parse().unwrap_or(600),
        line: Some(r.line),
        weight: None,
        priority: r.mx.and_then(|m| m.parse().ok()),
        status: match r.status.as_str() {
            "enable" => Some(RecordStatus::Enabled),
            "disable" => Some(RecordStatus::Disabled),
            _ => None,
        },
        remark: r.remark.filter(|x| !x.is_empty()),
        proxied: None,
        updated_at: None,
        meta: Default::default(),
    }
}

#[derive(Debug, Deserialize)]
struct DnspodLegacyRawEnvelope {
    status: LegacyStatus,
    #[serde(flatten)]
    rest: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct LegacyStatus {
    code: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct LegacyUserInfo {}

#[derive(Debug, Deserialize)]
struct LegacyEmptyData {}

#[derive(Debug, Deserialize)]
struct LegacyDomainListData {
    domains: Vec<LegacyDomain>,
    info: LegacyDomainListInfo,
}

#[derive(Debug, Deserialize)]
struct LegacyDomainListInfo {
    domain_total: u32,
}

#[derive(Debug, Deserialize)]
struct LegacyDomain {
    name: String,
    status: String,
    records: String,
}

#[derive(Debug, Deserialize)]
struct LegacyDomainInfoData {
    domain: LegacyDomainDetail,
}

#[derive(Debug, Deserialize)]
struct LegacyDomainDetail {
    name: String,
}

#[derive(Debug, Deserialize)]
struct LegacyRecordListData {
    records: Vec<LegacyRecord>,
    info: LegacyRecordListInfo,
}

#[derive(Debug, Deserialize)]
struct LegacyRecordListInfo {
    record_total: String,
}

#[derive(Debug, Deserialize)]
struct LegacyRecordInfoData {
    record: LegacyRecord,
}

#[derive(Debug, Deserialize)]
struct LegacyRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    value: String,
    ttl: String,
    line: String,
    #[serde(default)]
    mx: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    remark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyCreateRecordData {
    record: LegacyCreatedRecordId,
}

#[derive(Debug, Deserialize)]
struct LegacyCreatedRecordId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct LegacyLineListData {
    lines: Vec<String>,
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
    fn record_to_canonical_parses_numeric_strings() {
        let r = LegacyRecord {
            id: "5".into(),
            name: "www".into(),
            record_type: "A".into(),
            value: "1.2.3.4".into(),
            ttl: "600".into(),
            line: "默认".into(),
            mx: None,
            status: "enable".into(),
            remark: None,
        };
        let canonical = record_to_canonical(r, "example.com", "example.com");
        assert_eq!(canonical.ttl, 600);
        assert_eq!(canonical.name, "www.example.com");
        assert_eq!(canonical.status, Some(RecordStatus::Enabled));
    }

    #[test]
    fn missing_username_raises_missing_credentials() {
        let ctx = ServiceContext::new(ProviderKind::DnspodLegacy, Default::default());
        let err = DnspodLegacyProvider::new(&ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredentials);
    }
}
