//! `#[cfg(test)]`-only test doubles. Not part of the public API.
//!
//! No adapter talks to the network through an injectable seam — each one
//! builds its request and calls [`crate::transport`] directly, same as
//! the upstream vendor SDKs do. A transport-level fake would mean
//! threading a trait through all thirteen adapters for no behavioral
//! gain, since none of them do more with a response than parse it. What
//! actually needs offline coverage is the facade/cache/resolver layer
//! sitting in front of the adapters, and that layer already depends only
//! on the `Provider` trait — so `FakeProvider` fakes at that seam
//! instead, recording call counts and holding records in memory.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{GatewayError, Result};
use crate::provider::{Page, Provider};
use crate::types::{
    AuthField, AuthFieldKind, Capabilities, DnsLine, DnsRecord, PagingMode, ProviderKind,
    RecordParams, RecordQuery, RemarkMode, Zone, ZoneStatus,
};

pub fn fake_capabilities(requires_domain_id: bool) -> Capabilities {
    Capabilities {
        supports_weight: false,
        supports_line: false,
        supports_status: true,
        supports_remark: false,
        supports_url_forward: false,
        supports_logs: false,
        requires_domain_id,
        remark_mode: RemarkMode::Unsupported,
        paging: PagingMode::Server,
        record_types: vec!["A".to_string(), "TXT".to_string()],
        auth_fields: vec![AuthField::new("token", "Token", AuthFieldKind::Password)],
        domain_cache_ttl: 300,
        record_cache_ttl: 60,
        retryable_errors: vec![],
        max_retries: 0,
    }
}

/// An in-memory stand-in for a vendor adapter. Implements [`Provider`]
/// directly so it can be registered with a [`crate::registry::Registry`]
/// (or injected into a [`crate::facade::DnsFacade`] via its test-only
/// `register_for_test` hook) and driven through the same cache/resolver
/// code path real adapters go through — without a network call.
pub struct FakeProvider {
    kind: ProviderKind,
    caps: Capabilities,
    zones: Mutex<Vec<Zone>>,
    records: Mutex<Vec<DnsRecord>>,
    next_record_id: AtomicU32,
    pub list_calls: AtomicU32,
    pub create_calls: AtomicU32,
    pub update_calls: AtomicU32,
    pub delete_calls: AtomicU32,
}

impl FakeProvider {
    pub fn new(kind: ProviderKind, caps: Capabilities, zones: Vec<Zone>) -> Self {
        Self {
            kind,
            caps,
            zones: Mutex::new(zones),
            records: Mutex::new(Vec::new()),
            next_record_id: AtomicU32::new(1),
            list_calls: AtomicU32::new(0),
            create_calls: AtomicU32::new(0),
            update_calls: AtomicU32::new(0),
            delete_calls: AtomicU32::new(0),
        }
    }

    fn zone_name(&self, zone_id: &str) -> String {
        self.zones
            .lock()
            .expect("fake zones lock poisoned")
            .iter()
            .find(|z| z.id == zone_id)
            .map(|z| z.name.clone())
            .unwrap_or_else(|| zone_id.to_string())
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    async fn check_auth(&self) -> bool {
        true
    }

    async fn get_zones(&self, page: u32, page_size: u32, _keyword: Option<&str>) -> Result<Page<Zone>> {
        let zones = self.zones.lock().expect("fake zones lock poisoned").clone();
        Ok(Page::new(zones.clone(), page, page_size, zones.len() as u32))
    }

    async fn get_zone(&self, zone_id: &str) -> Result<Zone> {
        self.zones
            .lock()
            .expect("fake zones lock poisoned")
            .iter()
            .find(|z| z.id == zone_id)
            .cloned()
            .ok_or_else(|| GatewayError::zone_not_found(zone_id))
    }

    async fn get_records(&self, zone_id: &str, _query: &RecordQuery) -> Result<Page<DnsRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let records: Vec<DnsRecord> = self
            .records
            .lock()
            .expect("fake records lock poisoned")
            .iter()
            .filter(|r| r.zone_id == zone_id)
            .cloned()
            .collect();
        let total = records.len() as u32;
        Ok(Page::new(records, 1, 100, total))
    }

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord> {
        self.records
            .lock()
            .expect("fake records lock poisoned")
            .iter()
            .find(|r| r.zone_id == zone_id && r.id == record_id)
            .cloned()
            .ok_or_else(|| GatewayError::record_not_found(record_id))
    }

    async fn create_record(&self, zone_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let id = self.next_record_id.fetch_add(1, Ordering::SeqCst).to_string();
        let record = DnsRecord {
            id,
            zone_id: zone_id.to_string(),
            zone_name: self.zone_name(zone_id),
            name: params.name.clone(),
            record_type: params.record_type.clone(),
            value: params.value.clone(),
            ttl: params.ttl,
            line: params.line.clone(),
            weight: params.weight,
            priority: params.priority,
            status: None,
            remark: params.remark.clone(),
            proxied: params.proxied,
            updated_at: None,
            meta: Default::default(),
        };
        self.records.lock().expect("fake records lock poisoned").push(record.clone());
        Ok(record)
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, params: &RecordParams) -> Result<DnsRecord> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().expect("fake records lock poisoned");
        let record = records
            .iter_mut()
            .find(|r| r.zone_id == zone_id && r.id == record_id)
            .ok_or_else(|| GatewayError::record_not_found(record_id))?;
        record.name = params.name.clone();
        record.record_type = params.record_type.clone();
        record.value = params.value.clone();
        record.ttl = params.ttl;
        record.line = params.line.clone();
        record.weight = params.weight;
        record.priority = params.priority;
        record.remark = params.remark.clone();
        record.proxied = params.proxied;
        Ok(record.clone())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<bool> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().expect("fake records lock poisoned");
        let before = records.len();
        records.retain(|r| !(r.zone_id == zone_id && r.id == record_id));
        Ok(records.len() < before)
    }

    async fn set_record_status(&self, zone_id: &str, record_id: &str, _enabled: bool) -> Result<bool> {
        let records = self.records.lock().expect("fake records lock poisoned");
        Ok(records.iter().any(|r| r.zone_id == zone_id && r.id == record_id))
    }

    async fn get_lines(&self, _zone_id: Option<&str>) -> Result<Vec<DnsLine>> {
        Ok(vec![DnsLine::default_line()])
    }

    async fn get_min_ttl(&self, _zone_id: Option<&str>) -> u32 {
        600
    }
}

pub fn fake_zone(id: &str, name: &str) -> Zone {
    Zone {
        id: id.to_string(),
        name: name.to_string(),
        status: ZoneStatus::Active,
        record_count: None,
        updated_at: None,
        meta: Default::default(),
    }
}
