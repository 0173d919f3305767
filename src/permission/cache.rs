//! Validation verdict cache with a per-entry freshness window.
//!
//! Entries are keyed by (grantor, delegate, asset). The salt is not part of
//! the key: a re-issued permission for the same triple is served the previous
//! verdict until the entry goes stale. That trades precision for fewer
//! signature checks and chain probes.

use crate::permission::types::{parse_address, SpendPermission, ValidationResult};
use moka::future::Cache;
use std::time::Duration;

/// Default freshness window for successful verdicts, in seconds.
pub const DEFAULT_FRESHNESS_SECONDS: u64 = 60;

/// Default freshness window for cacheable negative verdicts, in seconds.
pub const DEFAULT_NEGATIVE_FRESHNESS_SECONDS: u64 = 15;

/// Default capacity of the in-memory cache.
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Canonicalized (grantor, delegate, asset) triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub grantor: String,
    pub delegate: String,
    pub asset: String,
}

impl CacheKey {
    pub fn for_permission(permission: &SpendPermission) -> Self {
        Self {
            grantor: canonical(&permission.account),
            delegate: canonical(&permission.spender),
            asset: canonical(&permission.token),
        }
    }
}

/// Lower-case hex for well-formed addresses, trimmed lower-case text otherwise.
fn canonical(value: &str) -> String {
    match parse_address(value) {
        Some(address) => format!("{:#x}", address),
        None => value.trim().to_lowercase(),
    }
}

/// A cached verdict.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: ValidationResult,

    /// Unix second the verdict was computed.
    pub computed_at: u64,

    /// Seconds the verdict stays fresh.
    pub ttl: u64,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: u64) -> bool {
        now.saturating_sub(self.computed_at) <= self.ttl
    }
}

/// In-process verdict cache.
///
/// Freshness is checked lazily against the caller's clock. The underlying
/// store also evicts physically once entries outlive the longest window, so
/// memory stays bounded without a sweeper task.
pub struct ValidationCache {
    cache: Cache<CacheKey, CacheEntry>,
}

impl ValidationCache {
    /// Create a cache holding at most `max_entries` verdicts, none older than
    /// `max_ttl_seconds`.
    pub fn new(max_entries: u64, max_ttl_seconds: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(Duration::from_secs(max_ttl_seconds.max(1)))
            .build();

        Self { cache }
    }

    /// Fetch a fresh entry. Stale entries are dropped and reported as a miss.
    pub async fn get(&self, key: &CacheKey, now: u64) -> Option<CacheEntry> {
        let entry = self.cache.get(key).await?;
        if !entry.is_fresh(now) {
            self.cache.invalidate(key).await;
            return None;
        }
        Some(entry)
    }

    /// Store a verdict, replacing any previous one for the key.
    pub async fn put(&self, key: CacheKey, result: ValidationResult, now: u64, ttl: u64) {
        let entry = CacheEntry {
            result,
            computed_at: now,
            ttl,
        };
        self.cache.insert(key, entry).await;
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        self.cache.invalidate(key).await;
    }

    /// Approximate number of stored entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for ValidationCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_FRESHNESS_SECONDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::error::ValidationErrorCode;
    use crate::permission::types::NATIVE_TOKEN;
    use alloy::primitives::{Address, Bytes, U256};

    fn permission() -> SpendPermission {
        SpendPermission {
            account: format!("0x{}", "AA".repeat(20)),
            spender: format!("0x{}", "bb".repeat(20)),
            token: NATIVE_TOKEN.to_string(),
            allowance: U256::from(10_000u64),
            period: 86_400,
            start: None,
            end: None,
            salt: U256::from(1u64),
            extra_data: Bytes::new(),
            signature: None,
        }
    }

    #[test]
    fn test_key_is_canonical() {
        let mut lower = permission();
        lower.account = lower.account.to_lowercase();
        assert_eq!(
            CacheKey::for_permission(&permission()),
            CacheKey::for_permission(&lower)
        );
        assert_eq!(
            CacheKey::for_permission(&permission()).grantor,
            format!("{:#x}", Address::repeat_byte(0xAA))
        );
    }

    #[test]
    fn test_key_ignores_salt() {
        let mut other = permission();
        other.salt = U256::from(99u64);
        assert_eq!(
            CacheKey::for_permission(&permission()),
            CacheKey::for_permission(&other)
        );
    }

    #[test]
    fn test_key_distinguishes_asset() {
        let mut other = permission();
        other.token = Address::repeat_byte(0x11).to_string();
        assert_ne!(
            CacheKey::for_permission(&permission()),
            CacheKey::for_permission(&other)
        );
    }

    #[test]
    fn test_malformed_fields_still_key() {
        let mut p = permission();
        p.account = "  Not-An-Address ".to_string();
        assert_eq!(CacheKey::for_permission(&p).grantor, "not-an-address");
    }

    #[tokio::test]
    async fn test_freshness_window() {
        let cache = ValidationCache::new(100, 3_600);
        let key = CacheKey::for_permission(&permission());
        let result = ValidationResult::valid(U256::from(10_000u64), None);

        cache.put(key.clone(), result.clone(), 1_000, 60).await;

        assert_eq!(cache.get(&key, 1_000).await.unwrap().result, result);
        assert!(cache.get(&key, 1_060).await.is_some());
        assert!(cache.get(&key, 1_061).await.is_none());
        // Stale entry was dropped.
        assert!(cache.get(&key, 1_000).await.is_none());
    }

    #[tokio::test]
    async fn test_put_supersedes() {
        let cache = ValidationCache::default();
        let key = CacheKey::for_permission(&permission());

        cache
            .put(key.clone(), ValidationResult::valid(U256::from(1u64), None), 10, 60)
            .await;
        cache
            .put(
                key.clone(),
                ValidationResult::invalid(ValidationErrorCode::Expired),
                20,
                15,
            )
            .await;

        let entry = cache.get(&key, 20).await.unwrap();
        assert_eq!(entry.computed_at, 20);
        assert_eq!(entry.ttl, 15);
        assert!(!entry.result.is_valid);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = ValidationCache::default();
        let key = CacheKey::for_permission(&permission());
        cache
            .put(key.clone(), ValidationResult::valid(U256::from(1u64), None), 10, 60)
            .await;
        cache.invalidate(&key).await;
        assert!(cache.get(&key, 10).await.is_none());
    }
}
