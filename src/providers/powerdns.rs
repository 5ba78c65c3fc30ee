//! PowerDNS adapter: `X-API-Key` header auth (§4.2) against the
//! PowerDNS Authoritative HTTP API. May run over plain HTTP since
//! operators typically host it on a private network (§6). PowerDNS
//! groups same-name-same-type records into one RRSet, so canonical
//! record IDs are composite (`name|type|index`, §4.5 rule 10) and
//! writes are read-modify-write against the RRSet's `records` array.

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

fn record_id(name: &str, record_type: &str, index: usize) -> String {
    format!("{name}|{record_type}|{index}")
}

fn parse_record_id(id: &str) -> Result<(String, String, usize)> {
    let mut parts = id.splitn(3, '|');
    let name = parts.next();
    let record_type = parts.next();
    let index = parts.next();
    match (name, record_type, index) {
        (Some(n), Some(t), Some(i)) => {
            let idx: usize = i.parse().map_err(|_| {
                GatewayError::new(ErrorKind::InvalidValue, format!("malformed powerdns record id: {id}"))
            })?;
            Ok((n.to_string(), t.to_string(), idx))
        }
        _ => Err(GatewayError::new(ErrorKind::InvalidValue, format!("malformed powerdns record id: {id}"))),
    }
}

pub fn capabilities() -> Capabilities {
    Capabilities {
        supports_weight: false,
        supports_line: false,
        supports_status: true,
        supports_remark: true,
        supports_url_forward: false,
        supports_logs: false,
        requires_domain_id: false,
        remark_mode: RemarkMode::Separate,
        paging: PagingMode::Client,
        record_types: vec!["A", "AAAA", "CNAME", "MX", "TXT", "NS", "SRV", "CAA"]
            .into_iter()
            .map(String::from)
            .collect(),
        auth_fields: vec![
            AuthField::new("apiKey", "API Key", AuthFieldKind::Password),
            AuthField::new("serverUrl", "Server URL", AuthFieldKind::Url),
        ],
        domain_cache_ttl: 60,
        record_cache_ttl: 30,
        retryable_errors: vec![],
        max_retries: 1,
    }
}

#[derive(Debug)]
pub struct PowerdnsProvider {
    base: BaseProvider,
    api_key: String,
    server_url: String,
}

impl PowerdnsProvider {
    pub fn new(ctx: &ServiceContext) -> Result<Self> {
        let server_url = super::require_secret(ctx, "serverUrl")?
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            base: BaseProvider::new("powerdns", capabilities()),
            api_key: super::require_secret(ctx, "apiKey")?,
            server_url,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        transport::request(method, &format!("{}{path}", self.server_url)).header("X-API-Key", &self.api_key)
    }

    async fn get_zone_detail(&self, zone_id: &str) -> Result<PdnsZone> {
        self.base
            .with_retry(|| async {
                let req = self.request(Method::GET, &format!("/api/v1/servers/localhost/zones/{zone_id}"));
                let raw = transport::execute("powerdns", req).await?;
                if raw.status >= 400 {
                    return Err(self.map_error(&raw.body, raw.status));
                }
                transport::parse_json("powerdns", &raw)
            })
            .await
    }

    async fn patch_rrsets(&self, zone_id: &str, rrsets: Vec<serde_json::Value>) -> Result<()> {
        self.base
            .with_retry(|| async {
                let body = serde_json::json!({ "rrsets": rrsets });
                let req = self
                    .request(Method::PATCH, &format!("/api/v1/servers/localhost/zones/{zone_id}"))
                    .json(&body);
                let raw = transport::execute("powerdns", req).await?;
                if raw.status >= 400 {
                    return Err(self.map_error(&raw.body, raw.status));
                }
                Ok(())
            })
            .await
    }

    fn map_error(&self, body: &str, status: u16) -> GatewayError {
        if let Ok(err) = serde_json::from_str::<PdnsErrorBody>(body) {
            let kind = match status {
                401 | 403 => ErrorKind::AuthFailed,
                404 => ErrorKind::ZoneNotFound,
                422 => ErrorKind::InvalidValue,
                _ => ErrorKind::VendorError,
            };
            return self.base.new_error(kind, None, err.error, Some(status));
        }
        transport::http_status_error("powerdns", status, body)
    }

    fn current_rrset(&self, zone: &PdnsZone, name: &str, record_type: &str) -> Option<PdnsRrset> {
        zone.rrsets
            .iter()
            .find(|r| r.name.trim_end_matches('.') == name.trim_end_matches('.') && r.record_type == record_type)
            .cloned()
    }
}

#[async_trait]
impl Provider for PowerdnsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Powerdns
    }

    fn capabilities(&self) -> &Capabilities {
        &self.base.capabilities
    }

    async fn check_auth(&self) -> bool {
        let req = self.request(Method::GET, "/api/v1/servers/localhost/zones");
        matches!(transport::execute("powerdns", req).await, Ok(raw) if raw.status < 400)
    }

    async fn get_zones(&self, page: u32, page_size: u32, keyword: Option<&str>) -> Result<Page<Zone>> {
        let req = self.request(Method::GET, "/api/v1/servers/localhost/zones");
        let raw = transport::execute("powerdns", req).await?;
        if raw.status >= 400 {
            return Err(self.map_error(&raw.body, raw.status));
        }
        let list: Vec<PdnsZoneSummary> = transport::parse_json("powerdns", &raw)?;
        let mut zones: Vec<Zone> = list
            .into_iter()
            .map(|z| Zone {
                id: z.id.clone(),
                name: BaseProvider::normalize_name(&z.name),
                status: ZoneStatus::Active,
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
        let zone = self.get_zone_detail(zone_id).await?;
        Ok(Zone {
            id: zone.id.clone(),
            name: BaseProvider::normalize_name(&zone.name),
            status: ZoneStatus::Active,
            record_count: Some(zone.rrsets.iter().map(|r| r.records.len() as u32).sum()),
            updated_at: None,
            meta: Default::default(),
        })
    }

    async fn get_records(&self, zone_id: &str, query: &RecordQuery) -> Result<Page<DnsRecord>> {
        let zone = self.get_zone_detail(zone_id).await?;
        let all = rrsets_to_canonical(&zone, zone_id);
        let page = query.page();
        let page_size = query.page_size(500);
        let filtered = BaseProvider::filter_records_client(&all, query);
        let total = filtered.len() as u32;
        Ok(Page::new(BaseProvider::paginate_client(&filtered, page, page_size), page, page_size, total))
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        let (name, record_type, index) = parse_record_id(record_id)?;
        let zone = self.get_zone_detail(zone_id).await?;
        let rrset = self
            .current_rrset(&zone, &name, &record_type)
            .ok_or_else(|| self.base.new_error(ErrorKind::RecordNotFound, None, "rrset not found", None))?;
        rrset_member_to_canonical(&rrset, index, zone_id)
            .ok_or_else(|| self.base.new_error(ErrorKind::RecordNotFound, None, "record index not found", None))
    }

    async fn create_record(&self, zone_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        let full_name = format!("{}.", BaseProvider::normalize_name(&params.name));
        let zone = self.get_zone_detail(zone_id).await?;
        let mut contents: Vec<serde_json::Value> = self
            .current_rrset(&zone, &full_name, &params.record_type)
            .map(|r| r.records.into_iter().map(|m| serde_json::json!({"content": m.content, "disabled": m.disabled})).collect())
            .unwrap_or_default();
        contents.push(serde_json::json!({
            "content": wire_value(&params.record_type, &params.value, params.priority),
            "disabled": false,
        }));
        let new_index = contents.len() - 1;
        let rrset = serde_json::json!({
            "name": full_name,
            "type": params.record_type,
            "ttl": params.ttl,
            "changetype": "REPLACE",
            "records": contents,
        });
        self.patch_rrsets(zone_id, vec![rrset]).await?;
        self.get_record(zone_id, &record_id(&full_name, &params.record_type, new_index)).await
    }

    async fn update_record(&self, zone_id: &str, record_id_str: &str, params: &RecordParams) -> Result<DnsRecord> {
        let (old_name, old_type, old_index) = parse_record_id(record_id_str)?;
        let zone = self.get_zone_detail(zone_id).await?;
        if let Some(mut rrset) = self.current_rrset(&zone, &old_name, &old_type) {
            if old_index < rrset.records.len() {
                rrset.records.remove(old_index);
            }
            if rrset.records.is_empty() {
                self.patch_rrsets(
                    zone_id,
                    vec![serde_json::json!({ "name": old_name, "type": old_type, "changetype": "DELETE" })],
                )
                .await?;
            } else {
                let remaining: Vec<serde_json::Value> = rrset
                    .records
                    .iter()
                    .map(|m| serde_json::json!({"content": m.content, "disabled": m.disabled}))
                    .collect();
                self.patch_rrsets(
                    zone_id,
                    vec![serde_json::json!({
                        "name": old_name, "type": old_type, "ttl": rrset.ttl,
                        "changetype": "REPLACE", "records": remaining,
                    })],
                )
                .await?;
            }
        }
        self.create_record(zone_id, params).await
    }

    async fn delete_record(&self, zone_id: &str, record_id_str: &str) -> Result<bool> {
        let (name, record_type, index) = parse_record_id(record_id_str)?;
        let zone = self.get_zone_detail(zone_id).await?;
        let Some(mut rrset) = self.current_rrset(&zone, &name, &record_type) else {
            return Ok(false);
        };
        if index >= rrset.records.len() {
            return Ok(false);
        }
        rrset.records.remove(index);
        if rrset.records.is_empty() {
            self.patch_rrsets(zone_id, vec![serde_json::json!({ "name": name, "type": record_type, "changetype": "DELETE" })])
                .await?;
        } else {
            let remaining: Vec<serde_json::Value> = rrset
                .records
                .iter()
                .map(|m| serde_json::json!({"content": m.content, "disabled": m.disabled}))
                .collect();
            self.patch_rrsets(
                zone_id,
                vec![serde_json::json!({
                    "name": name, "type": record_type, "ttl": rrset.ttl,
                    "changetype": "REPLACE", "records": remaining,
                })],
            )
            .await?;
        }
        Ok(true)
    }

    async fn set_record_status(&self, zone_id: &str, record_id_str: &str, enabled: bool) -> Result<bool> {
        let (name, record_type, index) = parse_record_id(record_id_str)?;
        let zone = self.get_zone_detail(zone_id).await?;
        let Some(mut rrset) = self.current_rrset(&zone, &name, &record_type) else {
            return Ok(false);
        };
        if index >= rrset.records.len() {
            return Ok(false);
        }
        rrset.records[index].disabled = !enabled;
        let updated: Vec<serde_json::Value> = rrset
            .records
            .iter()
            .map(|m| serde_json::json!({"content": m.content, "disabled": m.disabled}))
            .collect();
        self.patch_rrsets(
            zone_id,
            vec![serde_json::json!({
                "name": name, "type": record_type, "ttl": rrset.ttl,
                "changetype": "REPLACE", "records": updated,
            })],
        )
        .await?;
        Ok(true)
    }

    async fn get_lines(&self, _zone_id: Option<&str>) -> Result<Vec<DnsLine>> {
        Ok(vec![])
    }

    async fn get_min_ttl(&self, _zone_id: Option<&str>) -> u32 {
        0
    }
}

fn wire_value(record_type: &str, value: &str, priority: Option<u16>) -> String {
    match record_type {
        "TXT" => BaseProvider::quote(value),
        "MX" => format!("{} {}.", priority.unwrap_or(10), value.trim_end_matches('.')),
        "CNAME" | "NS" => format!("{}.", value.trim_end_matches('.')),
        _ => value.to_string(),
    }
}

fn unwire_value(record_type: &str, content: &str) -> (String, Option<u16>) {
    match record_type {
        "TXT" => (BaseProvider::unquote(content), None),
        "MX" => {
            let mut parts = content.splitn(2, ' ');
            let priority = parts.next().and_then(|p| p.parse().ok());
            let host = parts.next().unwrap_or("").trim_end_matches('.').to_string();
            (host, priority)
        }
        "CNAME" | "NS" => (content.trim_end_matches('.').to_string(), None),
        _ => (content.to_string(), None),
    }
}

fn rrsets_to_canonical(zone: &PdnsZone, zone_id: &str) -> Vec<DnsRecord> {
    let mut out = Vec::new();
    for rrset in &zone.rrsets {
        for idx in 0..rrset.records.len() {
            if let Some(record) = rrset_member_to_canonical(rrset, idx, zone_id) {
                out.push(record);
            }
        }
    }
    out
}

fn rrset_member_to_canonical(rrset: &PdnsRrset, index: usize, zone_id: &str) -> Option<DnsRecord> {
    let member = rrset.records.get(index)?;
    let (value, priority) = unwire_value(&rrset.record_type, &member.content);
    Some(DnsRecord {
        id: record_id(&rrset.name, &rrset.record_type, index),
        zone_id: zone_id.to_string(),
        zone_name: zone_id.to_string(),
        name: BaseProvider::normalize_name(&rrset.name),
        record_type: rrset.record_type.clone(),
        value,
        ttl: rrset.ttl,
        line: None,
        weight: None,
        priority,
        status: Some(if member.disabled { RecordStatus::Disabled } else { RecordStatus::Enabled }),
        remark: rrset.comments.first().map(|c| c.content.clone()),
        proxied: None,
        updated_at: None,
        meta: Default::default(),
    })
}

#[derive(Debug, Deserialize)]
struct PdnsErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct PdnsZoneSummary {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct PdnsZone {
    id: String,
    name: String,
    #[serde(default)]
    rrsets: Vec<PdnsRrset>,
}

#[derive(Debug, Deserialize, Clone)]
struct PdnsRrset {
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    ttl: u32,
    #[serde(default)]
    records: Vec<PdnsRecordMember>,
    #[serde(default)]
    comments: Vec<PdnsComment>,
}

#[derive(Debug, Deserialize, Clone)]
struct PdnsRecordMember {
    content: String,
    #[serde(default)]
    disabled: bool,
}

#[derive(Debug, Deserialize, Clone)]
struct PdnsComment {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_round_trips() {
        let id = record_id("www.example.com.", "A", 0);
        let (name, record_type, index) = parse_record_id(&id).unwrap();
        assert_eq!(name, "www.example.com.");
        assert_eq!(record_type, "A");
        assert_eq!(index, 0);
    }

    #[test]
    fn txt_value_round_trips_through_wire_quoting() {
        let wire = wire_value("TXT", "hello world", None);
        let (value, _) = unwire_value("TXT", &wire);
        assert_eq!(value, "hello world");
    }

    #[test]
    fn mx_priority_round_trips_through_wire_value() {
        let wire = wire_value("MX", "mail.example.com", Some(10));
        let (value, priority) = unwire_value("MX", &wire);
        assert_eq!(value, "mail.example.com");
        assert_eq!(priority, Some(10));
    }

    #[test]
    fn record_id_changes_when_name_changes() {
        let old_id = record_id("www.example.com.", "A", 0);
        let new_id = record_id("api.example.com.", "A", 0);
        assert_ne!(old_id, new_id, "a renamed record must get a new composite id");
        let (name, record_type, index) = parse_record_id(&new_id).unwrap();
        assert_eq!((name.as_str(), record_type.as_str(), index), ("api.example.com.", "A", 0));
    }

    #[test]
    fn missing_secrets_raise_missing_credentials() {
        let ctx = ServiceContext::new(ProviderKind::Powerdns, Default::default());
        let err = PowerdnsProvider::new(&ctx).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredentials);
    }
}
