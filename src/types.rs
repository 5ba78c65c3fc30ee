//! Canonical, provider-independent data model (C1).
//!
//! Pure data: equality is value-based, no behaviour beyond (de)serialization.
//! Invariants such as "no trailing dot" or "TXT values unquoted" are enforced
//! by the normalization helpers in [`crate::base`], not by these types —
//! adapters must route construction through those helpers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Opaque per-entity metadata bag. Stringly-typed by design: it is the
/// escape hatch for vendor-specific fields (Huoshan `TradeCode`, JDCloud
/// `packId`, DNSPod domain grade) and must never grow a typed shape.
pub type Meta = BTreeMap<String, String>;

/// The closed set of upstream DNS vendors this gateway normalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Cloudflare,
    Aliyun,
    DnspodTc3,
    DnspodLegacy,
    Huawei,
    Baidu,
    Westcn,
    Volcengine,
    Jdcloud,
    Dnsla,
    Namesilo,
    Powerdns,
    Spaceship,
}

impl ProviderKind {
    pub const ALL: &'static [ProviderKind] = &[
        ProviderKind::Cloudflare,
        ProviderKind::Aliyun,
        ProviderKind::DnspodTc3,
        ProviderKind::DnspodLegacy,
        ProviderKind::Huawei,
        ProviderKind::Baidu,
        ProviderKind::Westcn,
        ProviderKind::Volcengine,
        ProviderKind::Jdcloud,
        ProviderKind::Dnsla,
        ProviderKind::Namesilo,
        ProviderKind::Powerdns,
        ProviderKind::Spaceship,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cloudflare => "cloudflare",
            Self::Aliyun => "aliyun",
            Self::DnspodTc3 => "dnspod_tc3",
            Self::DnspodLegacy => "dnspod_legacy",
            Self::Huawei => "huawei",
            Self::Baidu => "baidu",
            Self::Westcn => "westcn",
            Self::Volcengine => "volcengine",
            Self::Jdcloud => "jdcloud",
            Self::Dnsla => "dnsla",
            Self::Namesilo => "namesilo",
            Self::Powerdns => "powerdns",
            Self::Spaceship => "spaceship",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an adapter reports paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagingMode {
    Server,
    Client,
}

/// How an adapter writes a record's free-text remark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemarkMode {
    Unsupported,
    Inline,
    Separate,
}

/// The kind of input a credential field expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFieldKind {
    Text,
    Password,
    Url,
}

/// One entry in a provider's required-credentials form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthField {
    pub name: String,
    pub label: String,
    pub kind: AuthFieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

impl AuthField {
    pub fn new(name: &str, label: &str, kind: AuthFieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            required: true,
            placeholder: None,
            help_text: None,
        }
    }
}

/// Static, immutable capability descriptor: one per `ProviderKind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub supports_weight: bool,
    pub supports_line: bool,
    pub supports_status: bool,
    pub supports_remark: bool,
    pub supports_url_forward: bool,
    pub supports_logs: bool,
    pub requires_domain_id: bool,
    pub remark_mode: RemarkMode,
    pub paging: PagingMode,
    pub record_types: Vec<String>,
    pub auth_fields: Vec<AuthField>,
    pub domain_cache_ttl: u64,
    pub record_cache_ttl: u64,
    pub retryable_errors: Vec<String>,
    pub max_retries: u32,
}

impl Capabilities {
    pub fn is_retryable_vendor_code(&self, code: &str) -> bool {
        self.retryable_errors.iter().any(|c| c == code)
    }
}

/// Record enable/disable status, as reported by vendors that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    #[serde(rename = "0")]
    Disabled,
    #[serde(rename = "1")]
    Enabled,
}

impl RecordStatus {
    pub fn as_char(&self) -> char {
        match self {
            Self::Disabled => '0',
            Self::Enabled => '1',
        }
    }
}

/// Zone status as reported by the vendor, normalized to a small closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneStatus {
    Active,
    Paused,
    Pending,
    Error,
    Unknown,
}

/// An authoritative DNS zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub status: ZoneStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", with = "crate::utils::datetime", default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Meta::is_empty", default)]
    pub meta: Meta,
}

/// A canonical DNS record, normalized across all vendor wire shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    pub zone_id: String,
    pub zone_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", with = "crate::utils::datetime", default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Meta::is_empty", default)]
    pub meta: Meta,
}

/// A provider-specific line (resolution-audience selector).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsLine {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_code: Option<String>,
}

impl DnsLine {
    pub const DEFAULT_CODE: &'static str = "default";

    pub fn default_line() -> Self {
        Self {
            code: Self::DEFAULT_CODE.to_string(),
            name: "Default".to_string(),
            parent_code: None,
        }
    }
}

/// Filter/paging parameters for `getRecords`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "type")]
    pub record_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
}

impl RecordQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self, ceiling: u32) -> u32 {
        self.page_size.unwrap_or(ceiling).clamp(1, ceiling)
    }

    /// A stable 10-hex-character fingerprint of the normalized query,
    /// used as a cache sub-key (C8). Two queries that are semantically
    /// identical after normalization hash identically.
    pub fn fingerprint(&self) -> String {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.page.hash(&mut hasher);
        self.page_size.hash(&mut hasher);
        self.keyword.as_deref().unwrap_or("").to_lowercase().hash(&mut hasher);
        self.sub_domain.as_deref().unwrap_or("").to_lowercase().hash(&mut hasher);
        self.record_type.as_deref().unwrap_or("").to_uppercase().hash(&mut hasher);
        self.value.as_deref().unwrap_or("").to_lowercase().hash(&mut hasher);
        self.line.as_deref().unwrap_or("").to_lowercase().hash(&mut hasher);
        self.status.map(|s| s.as_char()).hash(&mut hasher);
        format!("{:010x}", hasher.finish() & 0xFF_FFFF_FFFF)
    }
}

/// Parameters for creating or updating a record; shared by both operations
/// since every field besides identity is mutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordParams {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
}

/// The credentials and tenancy context an upper layer supplies per call.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    pub kind: ProviderKind,
    pub secrets: BTreeMap<String, String>,
    pub account_id: Option<String>,
    pub credential_key: Option<String>,
}

impl ServiceContext {
    pub fn new(kind: ProviderKind, secrets: BTreeMap<String, String>) -> Self {
        Self {
            kind,
            secrets,
            account_id: None,
            credential_key: None,
        }
    }

    pub fn with_credential_key(mut self, key: impl Into<String>) -> Self {
        self.credential_key = Some(key.into());
        self
    }

    pub fn with_account_id(mut self, id: impl Into<String>) -> Self {
        self.account_id = Some(id.into());
        self
    }

    /// The deterministic key used to bind this context to an adapter
    /// instance and to a cache namespace.
    pub fn namespace_key(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.kind.hash(&mut hasher);
        if let Some(key) = &self.credential_key {
            key.hash(&mut hasher);
        } else {
            for (k, v) in &self.secrets {
                k.hash(&mut hasher);
                v.hash(&mut hasher);
            }
            self.account_id.hash(&mut hasher);
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_order_independent_of_construction() {
        let q1 = RecordQuery {
            keyword: Some("Www".to_string()),
            record_type: Some("a".to_string()),
            ..Default::default()
        };
        let q2 = RecordQuery {
            keyword: Some("www".to_string()),
            record_type: Some("A".to_string()),
            ..Default::default()
        };
        assert_eq!(q1.fingerprint(), q2.fingerprint());
        assert_eq!(q1.fingerprint().len(), 10);
    }

    #[test]
    fn fingerprint_differs_on_distinct_queries() {
        let q1 = RecordQuery {
            keyword: Some("www".to_string()),
            ..Default::default()
        };
        let q2 = RecordQuery {
            keyword: Some("api".to_string()),
            ..Default::default()
        };
        assert_ne!(q1.fingerprint(), q2.fingerprint());
    }

    #[test]
    fn namespace_key_depends_on_credential_key_not_secrets_when_present() {
        let mut secrets_a = BTreeMap::new();
        secrets_a.insert("k".to_string(), "a".to_string());
        let mut secrets_b = BTreeMap::new();
        secrets_b.insert("k".to_string(), "b".to_string());

        let ctx_a = ServiceContext::new(ProviderKind::Aliyun, secrets_a)
            .with_credential_key("shared");
        let ctx_b = ServiceContext::new(ProviderKind::Aliyun, secrets_b)
            .with_credential_key("shared");
        assert_eq!(ctx_a.namespace_key(), ctx_b.namespace_key());
    }

    #[test]
    fn namespace_key_differs_across_kinds() {
        let ctx_a = ServiceContext::new(ProviderKind::Aliyun, BTreeMap::new())
            .with_credential_key("same");
        let ctx_b = ServiceContext::new(ProviderKind::Cloudflare, BTreeMap::new())
            .with_credential_key("same");
        assert_ne!(ctx_a.namespace_key(), ctx_b.namespace_key());
    }

    #[test]
    fn record_query_page_size_clamped_to_ceiling() {
        let q = RecordQuery {
            page_size: Some(500),
            ..Default::default()
        };
        assert_eq!(q.page_size(100), 100);
    }
}
