//! Zone Resolver (C7): translates a submitted zone-name into a vendor's
//! opaque zone-ID for adapters that `requiresDomainId`, with a per-adapter
//! bidirectional cache.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{GatewayError, Result};
use crate::provider::Provider;

const MAX_PAGES: u32 = 200;
const SCAN_PAGE_SIZE: u32 = 100;

#[derive(Default)]
struct BidirectionalCache {
    id_to_name: HashMap<String, String>,
    name_to_id: HashMap<String, String>,
}

impl BidirectionalCache {
    fn insert(&mut self, id: &str, name: &str) {
        self.id_to_name.insert(id.to_string(), name.to_string());
        self.name_to_id.insert(name.to_lowercase(), id.to_string());
    }
}

/// Resolves zone-name -> vendor zone-ID, one instance per adapter.
pub struct Resolver {
    cache: Mutex<BidirectionalCache>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(BidirectionalCache::default()),
        }
    }

    /// Purely-digit inputs, or adapters that don't `requiresDomainId`,
    /// pass through unchanged. Already-resolved opaque IDs (e.g.
    /// Cloudflare/Huawei's non-numeric zone IDs) also pass through, so
    /// `resolve(resolve(x))` is idempotent instead of re-scanning.
    pub async fn resolve(&self, provider: &dyn Provider, input: &str) -> Result<String> {
        if !provider.capabilities().requires_domain_id || input.chars().all(|c| c.is_ascii_digit()) {
            return Ok(input.to_string());
        }

        {
            let cache = self.cache.lock().expect("resolver lock poisoned");
            if cache.id_to_name.contains_key(input) {
                return Ok(input.to_string());
            }
            if let Some(id) = cache.name_to_id.get(&input.to_lowercase()) {
                return Ok(id.clone());
            }
        }

        let target = input.to_lowercase();
        let mut page = 1;
        while page <= MAX_PAGES {
            let result = provider.get_zones(page, SCAN_PAGE_SIZE, None).await?;
            if result.items.is_empty() {
                break;
            }
            for zone in &result.items {
                if zone.name.to_lowercase() == target {
                    self.cache.lock().expect("resolver lock poisoned").insert(&zone.id, &zone.name);
                    return Ok(zone.id.clone());
                }
            }
            if (page * SCAN_PAGE_SIZE) as usize >= result.total as usize {
                break;
            }
            page += 1;
        }

        Err(GatewayError::zone_not_found(input))
    }

    pub fn name_for_id(&self, id: &str) -> Option<String> {
        self.cache.lock().expect("resolver lock poisoned").id_to_name.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::provider::Page;
    use crate::types::{
        AuthFieldKind, Capabilities, DnsLine, DnsRecord, PagingMode, ProviderKind, RecordParams,
        RecordQuery, RemarkMode, Zone, ZoneStatus,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn caps(requires_domain_id: bool) -> Capabilities {
        Capabilities {
            supports_weight: false,
            supports_line: false,
            supports_status: false,
            supports_remark: false,
            supports_url_forward: false,
            supports_logs: false,
            requires_domain_id,
            remark_mode: RemarkMode::Unsupported,
            paging: PagingMode::Server,
            record_types: vec![],
            auth_fields: vec![crate::types::AuthField::new("k", "K", AuthFieldKind::Text)],
            domain_cache_ttl: 300,
            record_cache_ttl: 60,
            retryable_errors: vec![],
            max_retries: 0,
        }
    }

    struct FakeProvider {
        caps: Capabilities,
        zones: Vec<Zone>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Aliyun
        }
        fn capabilities(&self) -> &Capabilities {
            &self.caps
        }
        async fn check_auth(&self) -> bool {
            true
        }
        async fn get_zones(&self, _page: u32, _page_size: u32, _keyword: Option<&str>) -> Result<Page<Zone>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Page::new(self.zones.clone(), 1, 100, self.zones.len() as u32))
        }
        async fn get_zone(&self, _id: &str) -> Result<Zone> {
            unimplemented!()
        }
        async fn get_records(&self, _zone_id: &str, _query: &RecordQuery) -> Result<Page<DnsRecord>> {
            unimplemented!()
        }
        async fn get_record(&self, _zone_id: &str, _record_id: &str) -> Result<DnsRecord> {
            unimplemented!()
        }
        async fn create_record(&self, _zone_id: &str, _params: &RecordParams) -> Result<DnsRecord> {
            unimplemented!()
        }
        async fn update_record(&self, _zone_id: &str, _record_id: &str, _params: &RecordParams) -> Result<DnsRecord> {
            unimplemented!()
        }
        async fn delete_record(&self, _zone_id: &str, _record_id: &str) -> Result<bool> {
            unimplemented!()
        }
        async fn set_record_status(&self, _zone_id: &str, _record_id: &str, _enabled: bool) -> Result<bool> {
            unimplemented!()
        }
        async fn get_lines(&self, _zone_id: Option<&str>) -> Result<Vec<DnsLine>> {
            unimplemented!()
        }
        async fn get_min_ttl(&self, _zone_id: Option<&str>) -> u32 {
            600
        }
    }

    fn zone(id: &str, name: &str) -> Zone {
        Zone {
            id: id.to_string(),
            name: name.to_string(),
            status: ZoneStatus::Active,
            record_count: None,
            updated_at: None,
            meta: Default::default(),
        }
    }

    #[tokio::test]
    async fn digit_input_passes_through() {
        let resolver = Resolver::new();
        let provider = FakeProvider {
            caps: caps(true),
            zones: vec![],
            calls: AtomicU32::new(0),
        };
        let result = resolver.resolve(&provider, "12345").await.unwrap();
        assert_eq!(result, "12345");
    }

    #[tokio::test]
    async fn non_digit_requires_domain_id_false_passes_through() {
        let resolver = Resolver::new();
        let provider = FakeProvider {
            caps: caps(false),
            zones: vec![],
            calls: AtomicU32::new(0),
        };
        let result = resolver.resolve(&provider, "example.com").await.unwrap();
        assert_eq!(result, "example.com");
    }

    #[tokio::test]
    async fn resolves_and_caches() {
        let resolver = Resolver::new();
        let provider = FakeProvider {
            caps: caps(true),
            zones: vec![zone("999", "example.com")],
            calls: AtomicU32::new(0),
        };
        let id1 = resolver.resolve(&provider, "example.com").await.unwrap();
        assert_eq!(id1, "999");
        let id2 = resolver.resolve(&provider, "EXAMPLE.COM").await.unwrap();
        assert_eq!(id2, "999");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1, "second lookup must hit cache");
    }

    #[tokio::test]
    async fn resolve_is_idempotent_on_already_resolved_id() {
        let resolver = Resolver::new();
        let provider = FakeProvider {
            caps: caps(true),
            zones: vec![zone("zone-abc", "example.com")],
            calls: AtomicU32::new(0),
        };
        let id = resolver.resolve(&provider, "example.com").await.unwrap();
        assert_eq!(id, "zone-abc");
        let id_again = resolver.resolve(&provider, &id).await.unwrap();
        assert_eq!(id_again, "zone-abc");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1, "re-resolving an id must not rescan");
    }

    #[tokio::test]
    async fn not_found_raises_zone_not_found() {
        let resolver = Resolver::new();
        let provider = FakeProvider {
            caps: caps(true),
            zones: vec![zone("1", "other.com")],
            calls: AtomicU32::new(0),
        };
        let err = resolver.resolve(&provider, "example.com").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ZoneNotFound);
    }
}
