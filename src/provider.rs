//! The capability set every vendor adapter implements (§4.5).

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Capabilities, DnsLine, DnsRecord, ProviderKind, RecordParams, RecordQuery, Zone};

/// A page of results plus the vendor-reported (or client-computed) total.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32, page_size: u32, total: u32) -> Self {
        Self {
            items,
            page,
            page_size,
            total,
        }
    }
}

/// One vendor's implementation of the canonical DNS operations. Adapters
/// hold a [`crate::base::BaseProvider`] by value rather than inheriting
/// from it — polymorphism here is trait dispatch, not a class hierarchy.
#[async_trait]
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn capabilities(&self) -> &Capabilities;

    /// Never raises; returns `false` on any error (§4.9).
    async fn check_auth(&self) -> bool;

    async fn get_zones(&self, page: u32, page_size: u32, keyword: Option<&str>) -> Result<Page<Zone>>;

    async fn get_zone(&self, zone_id_or_name: &str) -> Result<Zone>;

    async fn get_records(&self, zone_id: &str, query: &RecordQuery) -> Result<Page<DnsRecord>>;

    async fn get_record(&self, zone_id: &str, record_id: &str) -> Result<DnsRecord>;

    async fn create_record(&self, zone_id: &str, params: &RecordParams) -> Result<DnsRecord>;

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        params: &RecordParams,
    ) -> Result<DnsRecord>;

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<bool>;

    async fn set_record_status(&self, zone_id: &str, record_id: &str, enabled: bool) -> Result<bool>;

    async fn get_lines(&self, zone_id: Option<&str>) -> Result<Vec<DnsLine>>;

    /// Never raises; returns the adapter's default TTL on any error (§4.9).
    async fn get_min_ttl(&self, zone_id: Option<&str>) -> u32;

    /// Optional: vendors without a zone-creation API return `Unsupported`.
    async fn add_zone(&self, name: &str) -> Result<Zone> {
        let _ = name;
        Err(crate::error::GatewayError::unsupported("addZone"))
    }
}
