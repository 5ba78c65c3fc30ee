//! Namespaced Cache (C8): a two-tier (global / per-zone) cache of zones,
//! records, lines, and min-TTL results, with scoped invalidation and
//! single-flight coalescing of concurrent reads of the same key.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OnceCell};

use crate::error::Result;

/// The invalidation scope a write operation declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidateScope {
    Zones,
    Records,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum KeyKind {
    Zones,
    Zone,
    Records,
    Lines,
    MinTtl,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: u64,
    kind: KeyKind,
    /// zone-scoped keys (records, per-zone lines) carry the resolved zone
    /// id; global keys (zone list, min-ttl) leave this empty.
    zone_id: String,
    /// records additionally key on the query fingerprint (§4.8).
    fingerprint: String,
}

impl CacheKey {
    pub fn zones(namespace: u64, fingerprint: &str) -> Self {
        Self {
            namespace,
            kind: KeyKind::Zones,
            zone_id: String::new(),
            fingerprint: fingerprint.to_string(),
        }
    }

    pub fn zone(namespace: u64, zone_id: &str) -> Self {
        Self {
            namespace,
            kind: KeyKind::Zone,
            zone_id: zone_id.to_string(),
            fingerprint: String::new(),
        }
    }

    pub fn records(namespace: u64, zone_id: &str, fingerprint: &str) -> Self {
        Self {
            namespace,
            kind: KeyKind::Records,
            zone_id: zone_id.to_string(),
            fingerprint: fingerprint.to_string(),
        }
    }

    pub fn lines(namespace: u64, zone_id: Option<&str>) -> Self {
        Self {
            namespace,
            kind: KeyKind::Lines,
            zone_id: zone_id.unwrap_or_default().to_string(),
            fingerprint: String::new(),
        }
    }

    pub fn min_ttl(namespace: u64, zone_id: Option<&str>) -> Self {
        Self {
            namespace,
            kind: KeyKind::MinTtl,
            zone_id: zone_id.unwrap_or_default().to_string(),
            fingerprint: String::new(),
        }
    }
}

type Slot<V> = Arc<OnceCell<Result<V>>>;

struct Entry<V> {
    slot: Slot<V>,
    expires_at: Instant,
}

/// A single-flighted, TTL-expiring, scope-invalidatable cache for one
/// value type `V`. The facade owns one `Cache<Zone>`, one
/// `Cache<DnsRecord list>`, etc. — kept generic rather than hand-written
/// per type, since the coalescing/invalidation machinery is identical.
pub struct Cache<V: Clone + Send + Sync + 'static> {
    entries: Mutex<HashMap<CacheKey, Entry<V>>>,
    /// reverse index: namespace -> live keys, for O(k) scoped flush.
    by_namespace: Mutex<HashMap<u64, HashSet<CacheKey>>>,
}

impl<V: Clone + Send + Sync + 'static> Default for Cache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync + 'static> Cache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            by_namespace: Mutex::new(HashMap::new()),
        }
    }

    /// Fetches `key`, computing it via `fetch` on miss or expiry. Two
    /// concurrent callers for the same key share one in-flight `fetch`
    /// call: the second caller awaits the first's `OnceCell`.
    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, ttl: Duration, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V>>,
    {
        let slot = {
            let mut entries = self.entries.lock().await;
            match entries.get(&key) {
                Some(entry) if entry.expires_at > Instant::now() => entry.slot.clone(),
                _ => {
                    let slot: Slot<V> = Arc::new(OnceCell::new());
                    entries.insert(
                        key.clone(),
                        Entry {
                            slot: slot.clone(),
                            expires_at: Instant::now() + ttl,
                        },
                    );
                    self.by_namespace
                        .lock()
                        .await
                        .entry(key.namespace)
                        .or_default()
                        .insert(key.clone());
                    slot
                }
            }
        };

        slot.get_or_init(fetch).await.clone()
    }

    /// Invalidates cache entries for `namespace` according to `scope`.
    /// `records` invalidation clears zone-scoped record keys; it also
    /// clears lines/min-ttl only when `scope == All`. When `zone_id` is
    /// given, only that zone's slice is dropped — entries for other
    /// zones in the same namespace are left alone, so a write to one
    /// zone doesn't evict every other zone's cached records.
    pub async fn invalidate(&self, namespace: u64, scope: InvalidateScope, zone_id: Option<&str>) {
        let keys: Vec<CacheKey> = {
            let by_ns = self.by_namespace.lock().await;
            by_ns.get(&namespace).cloned().unwrap_or_default().into_iter().collect()
        };

        let mut entries = self.entries.lock().await;
        let mut removed = Vec::new();
        for key in keys {
            let kind_matches = match scope {
                InvalidateScope::All => true,
                InvalidateScope::Zones => matches!(key.kind, KeyKind::Zones | KeyKind::Zone),
                InvalidateScope::Records => matches!(key.kind, KeyKind::Records),
            };
            let zone_matches = zone_id.is_none_or(|zid| key.zone_id == zid);
            if kind_matches && zone_matches {
                entries.remove(&key);
                removed.push(key);
            }
        }
        drop(entries);

        let mut by_ns = self.by_namespace.lock().await;
        if let Some(set) = by_ns.get_mut(&namespace) {
            for key in removed {
                set.remove(&key);
            }
        }
    }

    pub async fn clear_all(&self) {
        self.entries.lock().await.clear();
        self.by_namespace.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn concurrent_reads_single_flight() {
        let cache: Cache<u32> = Cache::new();
        let calls = Arc::new(AtomicU32::new(0));
        let key = CacheKey::zones(1, "");

        let c1 = calls.clone();
        let fut1 = cache.get_or_fetch(key.clone(), Duration::from_secs(60), move || {
            let c1 = c1.clone();
            async move {
                c1.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok(7)
            }
        });

        let c2 = calls.clone();
        let fut2 = cache.get_or_fetch(key.clone(), Duration::from_secs(60), move || {
            let c2 = c2.clone();
            async move {
                c2.fetch_add(1, Ordering::SeqCst);
                Ok(99)
            }
        });

        let (r1, r2) = tokio::join!(fut1, fut2);
        assert_eq!(r1.unwrap(), 7);
        assert_eq!(r2.unwrap(), 7, "second reader must observe the first's result, not its own fetch");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_records_forces_refetch() {
        let cache: Cache<u32> = Cache::new();
        let calls = AtomicU32::new(0);
        let key = CacheKey::records(1, "zone-1", "fp");

        let first = cache
            .get_or_fetch(key.clone(), Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await
            .unwrap();
        assert_eq!(first, 1);

        cache.invalidate(1, InvalidateScope::Records, None).await;

        let second = cache
            .get_or_fetch(key, Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .await
            .unwrap();
        assert_eq!(second, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn other_namespace_unaffected_by_invalidation() {
        let cache: Cache<u32> = Cache::new();
        let key_ns1 = CacheKey::zones(1, "");
        let key_ns2 = CacheKey::zones(2, "");

        cache.get_or_fetch(key_ns1.clone(), Duration::from_secs(60), || async { Ok(1) }).await.unwrap();
        cache.get_or_fetch(key_ns2.clone(), Duration::from_secs(60), || async { Ok(2) }).await.unwrap();

        cache.invalidate(1, InvalidateScope::All, None).await;

        let calls = AtomicU32::new(0);
        let v2 = cache
            .get_or_fetch(key_ns2, Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .await
            .unwrap();
        assert_eq!(v2, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 0, "namespace 2 must still be cached");
    }

    #[tokio::test]
    async fn invalidate_with_zone_id_leaves_other_zones_cached() {
        let cache: Cache<u32> = Cache::new();
        let key_a = CacheKey::records(1, "zone-a", "fp");
        let key_b = CacheKey::records(1, "zone-b", "fp");

        cache.get_or_fetch(key_a.clone(), Duration::from_secs(60), || async { Ok(1) }).await.unwrap();
        cache.get_or_fetch(key_b.clone(), Duration::from_secs(60), || async { Ok(2) }).await.unwrap();

        cache.invalidate(1, InvalidateScope::Records, Some("zone-a")).await;

        let calls_a = AtomicU32::new(0);
        let v_a = cache
            .get_or_fetch(key_a, Duration::from_secs(60), || async {
                calls_a.fetch_add(1, Ordering::SeqCst);
                Ok(99)
            })
            .await
            .unwrap();
        assert_eq!(v_a, 99, "zone-a must have been evicted and refetched");

        let calls_b = AtomicU32::new(0);
        let v_b = cache
            .get_or_fetch(key_b, Duration::from_secs(60), || async {
                calls_b.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .await
            .unwrap();
        assert_eq!(v_b, 2);
        assert_eq!(calls_b.load(Ordering::SeqCst), 0, "zone-b must still be cached");
    }
}
