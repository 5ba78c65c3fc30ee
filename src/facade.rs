//! DNS Facade (C9): the single entry point upper layers call. Resolves or
//! constructs an adapter, resolves zone-IDs, consults/updates the cache,
//! and normalizes every error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OnceCell};

use crate::cache::{Cache, CacheKey, InvalidateScope};
use crate::error::{ErrorKind, GatewayError, Result};
use crate::provider::{Page, Provider};
use crate::registry::Registry;
use crate::resolver::Resolver;
use crate::types::{Capabilities, DnsLine, DnsRecord, ProviderKind, RecordParams, RecordQuery, ServiceContext, Zone};

/// Tunables for the facade; all have defaults matching the upstream
/// adapters' own builder defaults.
#[derive(Debug, Clone)]
pub struct FacadeConfig {
    /// Overrides `Capabilities.max_retries` for every adapter the facade
    /// constructs, when set. `None` keeps each adapter's own default.
    pub default_max_retries: Option<u32>,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            default_max_retries: None,
        }
    }
}

struct AdapterEntry {
    provider: Arc<dyn Provider>,
    resolver: Arc<Resolver>,
}

type AdapterSlot = Arc<OnceCell<Result<Arc<AdapterEntry>>>>;

pub struct DnsFacade {
    registry: Registry,
    adapters: Mutex<HashMap<u64, AdapterSlot>>,
    zones_cache: Cache<Vec<Zone>>,
    zone_cache: Cache<Zone>,
    records_cache: Cache<Vec<DnsRecord>>,
    lines_cache: Cache<Vec<DnsLine>>,
    min_ttl_cache: Cache<u32>,
    #[allow(dead_code)]
    config: FacadeConfig,
}

impl DnsFacade {
    pub fn new(config: FacadeConfig) -> Self {
        Self {
            registry: Registry::new(),
            adapters: Mutex::new(HashMap::new()),
            zones_cache: Cache::new(),
            zone_cache: Cache::new(),
            records_cache: Cache::new(),
            lines_cache: Cache::new(),
            min_ttl_cache: Cache::new(),
            config,
        }
    }

    pub fn capabilities(&self, kind: ProviderKind) -> Option<Capabilities> {
        self.registry.capabilities(kind)
    }

    pub fn all_capabilities(&self) -> Vec<(ProviderKind, Capabilities)> {
        self.registry.all_capabilities()
    }

    async fn adapter_for(&self, ctx: &ServiceContext) -> Result<Arc<AdapterEntry>> {
        let key = ctx.namespace_key();
        let slot = {
            let mut adapters = self.adapters.lock().await;
            adapters.entry(key).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };
        slot.get_or_init(|| async {
            let provider = self.registry.construct(ctx)?;
            Ok(Arc::new(AdapterEntry {
                provider,
                resolver: Arc::new(Resolver::new()),
            }))
        })
        .await
        .clone()
    }

    pub async fn check_auth(&self, ctx: &ServiceContext) -> bool {
        match self.adapter_for(ctx).await {
            Ok(entry) => entry.provider.check_auth().await,
            Err(_) => false,
        }
    }

    pub async fn get_zones(
        &self,
        ctx: &ServiceContext,
        page: u32,
        page_size: u32,
        keyword: Option<&str>,
    ) -> Result<Page<Zone>> {
        let entry = self.adapter_for(ctx).await?;
        let caps = entry.provider.capabilities().clone();
        let namespace = ctx.namespace_key();
        let fingerprint = format!("{page}:{page_size}:{}", keyword.unwrap_or(""));
        let key = CacheKey::zones(namespace, &fingerprint);
        let provider = entry.provider.clone();
        let keyword_owned = keyword.map(str::to_string);
        let items = self
            .zones_cache
            .get_or_fetch(key, Duration::from_secs(caps.domain_cache_ttl), move || async move {
                Ok(provider
                    .get_zones(page, page_size, keyword_owned.as_deref())
                    .await?
                    .items)
            })
            .await?;
        let total = items.len() as u32;
        Ok(Page::new(items, page, page_size, total))
    }

    pub async fn get_zone(&self, ctx: &ServiceContext, zone_id_or_name: &str) -> Result<Zone> {
        let entry = self.adapter_for(ctx).await?;
        let zone_id = entry.resolver.resolve(entry.provider.as_ref(), zone_id_or_name).await?;
        let caps = entry.provider.capabilities().clone();
        let namespace = ctx.namespace_key();
        let key = CacheKey::zone(namespace, &zone_id);
        let provider = entry.provider.clone();
        let zone_id_owned = zone_id.clone();
        self.zone_cache
            .get_or_fetch(key, Duration::from_secs(caps.domain_cache_ttl), move || async move {
                provider.get_zone(&zone_id_owned).await
            })
            .await
    }

    pub async fn get_records(
        &self,
        ctx: &ServiceContext,
        zone_id_or_name: &str,
        query: &RecordQuery,
    ) -> Result<Page<DnsRecord>> {
        let entry = self.adapter_for(ctx).await?;
        let zone_id = entry.resolver.resolve(entry.provider.as_ref(), zone_id_or_name).await?;
        let caps = entry.provider.capabilities().clone();
        let namespace = ctx.namespace_key();
        let key = CacheKey::records(namespace, &zone_id, &query.fingerprint());
        let provider = entry.provider.clone();
        let zone_id_owned = zone_id.clone();
        let query_owned = query.clone();
        let page = query.page();
        let page_size = query.page_size(100);
        let items = self
            .records_cache
            .get_or_fetch(key, Duration::from_secs(caps.record_cache_ttl), move || async move {
                Ok(provider.get_records(&zone_id_owned, &query_owned).await?.items)
            })
            .await?;
        let total = items.len() as u32;
        Ok(Page::new(items, page, page_size, total))
    }

    pub async fn get_record(&self, ctx: &ServiceContext, zone_id_or_name: &str, record_id: &str) -> Result<DnsRecord> {
        let entry = self.adapter_for(ctx).await?;
        let zone_id = entry.resolver.resolve(entry.provider.as_ref(), zone_id_or_name).await?;
        entry.provider.get_record(&zone_id, record_id).await
    }

    pub async fn create_record(
        &self,
        ctx: &ServiceContext,
        zone_id_or_name: &str,
        params: &RecordParams,
    ) -> Result<DnsRecord> {
        let entry = self.adapter_for(ctx).await?;
        let zone_id = entry.resolver.resolve(entry.provider.as_ref(), zone_id_or_name).await?;
        let record = entry.provider.create_record(&zone_id, params).await?;
        self.invalidate_namespace(ctx.namespace_key(), InvalidateScope::Records, Some(&zone_id)).await;
        Ok(record)
    }

    pub async fn update_record(
        &self,
        ctx: &ServiceContext,
        zone_id_or_name: &str,
        record_id: &str,
        params: &RecordParams,
    ) -> Result<DnsRecord> {
        let entry = self.adapter_for(ctx).await?;
        let zone_id = entry.resolver.resolve(entry.provider.as_ref(), zone_id_or_name).await?;
        let record = entry.provider.update_record(&zone_id, record_id, params).await?;
        self.invalidate_namespace(ctx.namespace_key(), InvalidateScope::Records, Some(&zone_id)).await;
        Ok(record)
    }

    pub async fn delete_record(&self, ctx: &ServiceContext, zone_id_or_name: &str, record_id: &str) -> Result<bool> {
        let entry = self.adapter_for(ctx).await?;
        let zone_id = entry.resolver.resolve(entry.provider.as_ref(), zone_id_or_name).await?;
        let ok = entry.provider.delete_record(&zone_id, record_id).await?;
        self.invalidate_namespace(ctx.namespace_key(), InvalidateScope::Records, Some(&zone_id)).await;
        Ok(ok)
    }

    pub async fn set_record_status(
        &self,
        ctx: &ServiceContext,
        zone_id_or_name: &str,
        record_id: &str,
        enabled: bool,
    ) -> Result<bool> {
        let entry = self.adapter_for(ctx).await?;
        if !entry.provider.capabilities().supports_status {
            return Err(GatewayError::unsupported("setRecordStatus"));
        }
        let zone_id = entry.resolver.resolve(entry.provider.as_ref(), zone_id_or_name).await?;
        let ok = entry.provider.set_record_status(&zone_id, record_id, enabled).await?;
        self.invalidate_namespace(ctx.namespace_key(), InvalidateScope::Records, Some(&zone_id)).await;
        Ok(ok)
    }

    pub async fn get_lines(&self, ctx: &ServiceContext, zone_id_or_name: Option<&str>) -> Result<Vec<DnsLine>> {
        let entry = self.adapter_for(ctx).await?;
        let zone_id = match zone_id_or_name {
            Some(z) => Some(entry.resolver.resolve(entry.provider.as_ref(), z).await?),
            None => None,
        };
        let caps = entry.provider.capabilities().clone();
        let namespace = ctx.namespace_key();
        let key = CacheKey::lines(namespace, zone_id.as_deref());
        let provider = entry.provider.clone();
        let zone_id_owned = zone_id.clone();
        self.lines_cache
            .get_or_fetch(key, Duration::from_secs(caps.domain_cache_ttl), move || async move {
                provider.get_lines(zone_id_owned.as_deref()).await
            })
            .await
    }

    pub async fn get_min_ttl(&self, ctx: &ServiceContext, zone_id_or_name: Option<&str>) -> u32 {
        let entry = match self.adapter_for(ctx).await {
            Ok(e) => e,
            Err(_) => return 600,
        };
        let zone_id = match zone_id_or_name {
            Some(z) => entry.resolver.resolve(entry.provider.as_ref(), z).await.ok(),
            None => None,
        };
        let namespace = ctx.namespace_key();
        let key = CacheKey::min_ttl(namespace, zone_id.as_deref());
        let provider = entry.provider.clone();
        let zone_id_owned = zone_id.clone();
        self.min_ttl_cache
            .get_or_fetch(key, Duration::from_secs(60), move || async move {
                Ok(provider.get_min_ttl(zone_id_owned.as_deref()).await)
            })
            .await
            .unwrap_or(600)
    }

    pub async fn add_zone(&self, ctx: &ServiceContext, name: &str) -> Result<Zone> {
        let entry = self.adapter_for(ctx).await?;
        let zone = entry.provider.add_zone(name).await?;
        self.invalidate_namespace(ctx.namespace_key(), InvalidateScope::Zones, None).await;
        Ok(zone)
    }

    /// `zone_id`, when given, restricts invalidation to that zone's slice
    /// of the namespace; `None` clears every zone's entries for `scope`.
    async fn invalidate_namespace(&self, namespace: u64, scope: InvalidateScope, zone_id: Option<&str>) {
        self.records_cache.invalidate(namespace, scope, zone_id).await;
        if scope == InvalidateScope::Zones || scope == InvalidateScope::All {
            self.zones_cache.invalidate(namespace, scope, zone_id).await;
            self.zone_cache.invalidate(namespace, scope, zone_id).await;
        }
        if scope == InvalidateScope::All {
            self.lines_cache.invalidate(namespace, scope, zone_id).await;
            self.min_ttl_cache.invalidate(namespace, scope, zone_id).await;
        }
    }

    pub async fn clear_cache(&self, ctx: &ServiceContext, scope: InvalidateScope, zone_id: Option<&str>) {
        self.invalidate_namespace(ctx.namespace_key(), scope, zone_id).await;
    }

    pub async fn clear_all_cache(&self) {
        self.zones_cache.clear_all().await;
        self.zone_cache.clear_all().await;
        self.records_cache.clear_all().await;
        self.lines_cache.clear_all().await;
        self.min_ttl_cache.clear_all().await;
    }

    /// Registers (or overrides) the constructor for `kind`, so tests can
    /// drive the facade/cache/resolver stack against a [`crate::testing::FakeProvider`]
    /// instead of a real adapter. Not part of the public API.
    #[cfg(test)]
    pub(crate) fn register_for_test<F>(&self, kind: ProviderKind, ctor: F)
    where
        F: Fn(&ServiceContext) -> Result<Arc<dyn Provider>> + Send + Sync + 'static,
    {
        self.registry.register(kind, ctor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn ctx() -> ServiceContext {
        let mut secrets = BTreeMap::new();
        secrets.insert("accessKeyId".to_string(), "AK".to_string());
        secrets.insert("accessKeySecret".to_string(), "SK".to_string());
        ServiceContext::new(ProviderKind::Aliyun, secrets).with_credential_key("tenant-1")
    }

    #[tokio::test]
    async fn check_auth_never_panics_on_network_failure() {
        let facade = DnsFacade::new(FacadeConfig::default());
        // No network available in unit tests; check_auth must swallow errors.
        let ok = facade.check_auth(&ctx()).await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn set_record_status_rejects_when_unsupported_without_upstream_call() {
        let facade = DnsFacade::new(FacadeConfig::default());
        let mut secrets = BTreeMap::new();
        secrets.insert("apiToken".to_string(), "t".to_string());
        let ctx = ServiceContext::new(ProviderKind::Cloudflare, secrets).with_credential_key("t1");
        let result = facade.set_record_status(&ctx, "example.com", "rec-1", true).await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind, ErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn get_min_ttl_never_panics_and_returns_default() {
        let facade = DnsFacade::new(FacadeConfig::default());
        let ttl = facade.get_min_ttl(&ctx(), None).await;
        assert_eq!(ttl, 600);
    }

    fn fake_ctx() -> ServiceContext {
        let mut secrets = BTreeMap::new();
        secrets.insert("token".to_string(), "t".to_string());
        ServiceContext::new(ProviderKind::Namesilo, secrets).with_credential_key("fake-tenant")
    }

    fn install_fake(facade: &DnsFacade) -> Arc<crate::testing::FakeProvider> {
        let fake = Arc::new(crate::testing::FakeProvider::new(
            ProviderKind::Namesilo,
            crate::testing::fake_capabilities(false),
            vec![crate::testing::fake_zone("z1", "example.com")],
        ));
        let fake_for_ctor = fake.clone();
        facade.register_for_test(ProviderKind::Namesilo, move |_ctx| Ok(fake_for_ctor.clone() as Arc<dyn Provider>));
        fake
    }

    fn params(name: &str, value: &str) -> RecordParams {
        RecordParams {
            name: name.to_string(),
            record_type: "A".to_string(),
            value: value.to_string(),
            ttl: 600,
            ..Default::default()
        }
    }

    /// Property 1: a record's name survives a create→get round trip unchanged.
    #[tokio::test]
    async fn property_name_round_trips_through_create_and_get() {
        let facade = DnsFacade::new(FacadeConfig::default());
        install_fake(&facade);
        let ctx = fake_ctx();
        let created = facade.create_record(&ctx, "z1", &params("www", "1.2.3.4")).await.unwrap();
        let fetched = facade.get_record(&ctx, "z1", &created.id).await.unwrap();
        assert_eq!(fetched.name, "www");
    }

    /// Property 2: the ID a record is created with is the same ID it is
    /// found under in a subsequent listing.
    #[tokio::test]
    async fn property_record_id_is_stable_across_listing() {
        let facade = DnsFacade::new(FacadeConfig::default());
        install_fake(&facade);
        let ctx = fake_ctx();
        let created = facade.create_record(&ctx, "z1", &params("www", "1.2.3.4")).await.unwrap();
        let page = facade.get_records(&ctx, "z1", &RecordQuery::default()).await.unwrap();
        let found = page.items.iter().find(|r| r.id == created.id);
        assert!(found.is_some(), "created record id must reappear unchanged in a listing");
    }

    /// Property 3: a write invalidates the records cache, so the next read
    /// goes back upstream instead of serving a stale hit.
    #[tokio::test]
    async fn property_write_invalidates_records_cache() {
        let facade = DnsFacade::new(FacadeConfig::default());
        let fake = install_fake(&facade);
        let ctx = fake_ctx();

        facade.get_records(&ctx, "z1", &RecordQuery::default()).await.unwrap();
        assert_eq!(fake.list_calls.load(std::sync::atomic::Ordering::SeqCst), 1);

        facade.create_record(&ctx, "z1", &params("www", "1.2.3.4")).await.unwrap();

        facade.get_records(&ctx, "z1", &RecordQuery::default()).await.unwrap();
        assert_eq!(
            fake.list_calls.load(std::sync::atomic::Ordering::SeqCst),
            2,
            "post-write read must re-fetch upstream, not serve the pre-write cache entry"
        );
    }

    /// S5: exactly one upstream list call per cache-cold read and exactly
    /// one create call per create_record — no duplicate or missing calls.
    #[tokio::test]
    async fn scenario_cache_invalidation_call_counts_are_exact() {
        let facade = DnsFacade::new(FacadeConfig::default());
        let fake = install_fake(&facade);
        let ctx = fake_ctx();

        facade.get_records(&ctx, "z1", &RecordQuery::default()).await.unwrap();
        facade.get_records(&ctx, "z1", &RecordQuery::default()).await.unwrap();
        facade.create_record(&ctx, "z1", &params("www", "1.2.3.4")).await.unwrap();
        facade.get_records(&ctx, "z1", &RecordQuery::default()).await.unwrap();

        assert_eq!(fake.list_calls.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(fake.create_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
