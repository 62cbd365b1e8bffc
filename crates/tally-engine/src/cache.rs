//! # Read-Side Cache
//!
//! Explicit cache abstraction for derived-read results (reorder
//! suggestions, forecasts), injected into the calculators.
//!
//! ## Cache Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  • Keyed per tenant; never a source of truth                           │
//! │  • ANY successful mutation invalidates ALL entries for that tenant    │
//! │    (coarse-grained on purpose: correctness over hit ratio)            │
//! │  • Values are JSON so one store serves every calculator               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;
use tracing::debug;

/// Cache contract the read-side calculators are written against.
///
/// Implementations must be cheap to call from async code; the default
/// in-process store only takes a short-lived lock.
pub trait ReadCache: Send + Sync {
    /// Looks up a cached value for a tenant-scoped key.
    fn get(&self, tenant_id: &str, key: &str) -> Option<Value>;

    /// Stores a value under a tenant-scoped key.
    fn put(&self, tenant_id: &str, key: &str, value: Value);

    /// Drops every entry belonging to the tenant.
    fn invalidate_tenant(&self, tenant_id: &str);
}

/// Process-local cache backed by a HashMap.
///
/// Size-unbounded by design: entries are few (one per calculator per
/// tenant) and eagerly invalidated on every write.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<(String, String), Value>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        MemoryCache::default()
    }
}

impl ReadCache for MemoryCache {
    fn get(&self, tenant_id: &str, key: &str) -> Option<Value> {
        // A poisoned lock degrades to a cache miss; the cache is never
        // a source of truth.
        let entries = self.entries.read().ok()?;
        entries
            .get(&(tenant_id.to_string(), key.to_string()))
            .cloned()
    }

    fn put(&self, tenant_id: &str, key: &str, value: Value) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert((tenant_id.to_string(), key.to_string()), value);
        }
    }

    fn invalidate_tenant(&self, tenant_id: &str) {
        if let Ok(mut entries) = self.entries.write() {
            let before = entries.len();
            entries.retain(|(tenant, _), _| tenant != tenant_id);
            debug!(
                tenant_id = %tenant_id,
                dropped = before - entries.len(),
                "Invalidated tenant cache"
            );
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_put_round_trip() {
        let cache = MemoryCache::new();
        assert!(cache.get("t1", "reorder").is_none());

        cache.put("t1", "reorder", json!([1, 2, 3]));
        assert_eq!(cache.get("t1", "reorder"), Some(json!([1, 2, 3])));
    }

    #[test]
    fn test_invalidation_is_tenant_scoped() {
        let cache = MemoryCache::new();
        cache.put("t1", "reorder", json!("a"));
        cache.put("t1", "forecast", json!("b"));
        cache.put("t2", "reorder", json!("c"));

        cache.invalidate_tenant("t1");

        assert!(cache.get("t1", "reorder").is_none());
        assert!(cache.get("t1", "forecast").is_none());
        assert_eq!(cache.get("t2", "reorder"), Some(json!("c")));
    }
}
