//! TTL cache for equipment id <-> device code resolution.
//!
//! Both directions are cached independently. Entries are only invalidated
//! by expiry, so a re-coded device can resolve to its old mapping for up to
//! one TTL. Misses are not cached.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use shipwatch_core::equipment::{EquipmentLookup, LookupError};
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Default entry lifetime: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

pub struct EquipmentIdCache {
    lookup: Arc<dyn EquipmentLookup>,
    ttl: Duration,
    /// external device code -> internal id
    by_code: RwLock<HashMap<String, CacheEntry>>,
    /// internal id -> external device code
    by_id: RwLock<HashMap<String, CacheEntry>>,
}

impl EquipmentIdCache {
    pub fn new(lookup: Arc<dyn EquipmentLookup>, ttl: Duration) -> Self {
        Self {
            lookup,
            ttl,
            by_code: RwLock::new(HashMap::new()),
            by_id: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve an external device code to the internal equipment id.
    pub async fn internal_id(&self, device_code: &str) -> Result<Option<String>, LookupError> {
        if let Some(hit) = Self::cached(&self.by_code, device_code).await {
            return Ok(Some(hit));
        }
        let resolved = self.lookup.lookup_internal_id(device_code).await?;
        if let Some(id) = &resolved {
            self.remember(device_code, id).await;
        }
        Ok(resolved)
    }

    /// Resolve an internal equipment id to its external device code.
    pub async fn external_code(&self, equipment_id: &str) -> Result<Option<String>, LookupError> {
        if let Some(hit) = Self::cached(&self.by_id, equipment_id).await {
            return Ok(Some(hit));
        }
        let resolved = self.lookup.lookup_external_code(equipment_id).await?;
        if let Some(code) = &resolved {
            self.remember(code, equipment_id).await;
        }
        Ok(resolved)
    }

    /// Normalise an identifier that may be either form to the internal id.
    ///
    /// Tries the device-code mapping first and falls back to treating the
    /// input as an internal id. Lookup failures degrade to the raw input.
    pub async fn normalize(&self, id_or_code: &str) -> String {
        match self.internal_id(id_or_code).await {
            Ok(Some(id)) => id,
            Ok(None) => id_or_code.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, id = %id_or_code, "Equipment lookup failed, using raw id");
                id_or_code.to_string()
            }
        }
    }

    /// Number of live (unexpired) entries across both directions.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let count = |map: &HashMap<String, CacheEntry>| {
            map.values().filter(|e| e.expires_at > now).count()
        };
        count(&*self.by_code.read().await) + count(&*self.by_id.read().await)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn cached(map: &RwLock<HashMap<String, CacheEntry>>, key: &str) -> Option<String> {
        let guard = map.read().await;
        guard
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    /// Store a mapping in both directions and sweep expired entries.
    async fn remember(&self, device_code: &str, equipment_id: &str) {
        let now = Instant::now();
        let expires_at = now + self.ttl;

        let mut by_code = self.by_code.write().await;
        by_code.retain(|_, e| e.expires_at > now);
        by_code.insert(
            device_code.to_string(),
            CacheEntry {
                value: equipment_id.to_string(),
                expires_at,
            },
        );
        drop(by_code);

        let mut by_id = self.by_id.write().await;
        by_id.retain(|_, e| e.expires_at > now);
        by_id.insert(
            equipment_id.to_string(),
            CacheEntry {
                value: device_code.to_string(),
                expires_at,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;

    /// Single device "E1" <-> "DEV-001", counting backend calls.
    #[derive(Default)]
    struct CountingLookup {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl EquipmentLookup for CountingLookup {
        async fn lookup_internal_id(&self, code: &str) -> Result<Option<String>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LookupError::Unavailable("down".into()));
            }
            Ok((code == "DEV-001").then(|| "E1".to_string()))
        }

        async fn lookup_external_code(&self, id: &str) -> Result<Option<String>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LookupError::Unavailable("down".into()));
            }
            Ok((id == "E1").then(|| "DEV-001".to_string()))
        }

        async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>, LookupError> {
            Ok(ids.iter().filter(|id| *id == "E1").cloned().collect())
        }
    }

    fn cache(lookup: Arc<CountingLookup>) -> EquipmentIdCache {
        EquipmentIdCache::new(lookup, Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn hit_avoids_backend_and_fills_reverse_direction() {
        let lookup = Arc::new(CountingLookup::default());
        let cache = cache(lookup.clone());

        assert_eq!(cache.internal_id("DEV-001").await.unwrap().as_deref(), Some("E1"));
        assert_eq!(cache.internal_id("DEV-001").await.unwrap().as_deref(), Some("E1"));
        assert_eq!(cache.external_code("E1").await.unwrap().as_deref(), Some("DEV-001"));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let lookup = Arc::new(CountingLookup::default());
        let cache = cache(lookup.clone());

        cache.internal_id("DEV-001").await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.is_empty().await);

        cache.internal_id("DEV-001").await.unwrap();
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn misses_are_not_cached() {
        let lookup = Arc::new(CountingLookup::default());
        let cache = cache(lookup.clone());

        assert!(cache.internal_id("DEV-404").await.unwrap().is_none());
        assert!(cache.internal_id("DEV-404").await.unwrap().is_none());
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn normalize_accepts_either_form() {
        let lookup = Arc::new(CountingLookup::default());
        let cache = cache(lookup);

        assert_eq!(cache.normalize("DEV-001").await, "E1");
        assert_eq!(cache.normalize("E1").await, "E1");
    }

    #[tokio::test(start_paused = true)]
    async fn backend_failure_surfaces_but_normalize_degrades() {
        let lookup = Arc::new(CountingLookup {
            fail: true,
            ..Default::default()
        });
        let cache = cache(lookup);

        assert_matches!(
            cache.internal_id("DEV-001").await,
            Err(LookupError::Unavailable(_))
        );
        assert_eq!(cache.normalize("DEV-001").await, "DEV-001");
    }
}
