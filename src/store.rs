//! In-memory result caching.
//!
//! Moka provides the eviction backstop (TTL + capacity); the 30-minute
//! freshness rule is enforced explicitly on read so both search kinds age
//! out the same way.

use crate::models::PersonRecord;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::time::Duration;

/// Cached data older than this is treated as stale and re-aggregated.
pub const FRESHNESS_MINUTES: i64 = 30;

const CACHE_CAPACITY: u64 = 10_000;
const CACHE_TTL: Duration = Duration::from_secs(3600);

/// True when `updated_at` is within the freshness window relative to `now`.
pub fn is_fresh(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(updated_at) < chrono::Duration::minutes(FRESHNESS_MINUTES)
}

/// Company search results with the timestamp of the aggregation run that
/// produced them. The list is aged as a unit.
#[derive(Debug, Clone)]
pub struct CachedCompanyList {
    pub persons: Vec<PersonRecord>,
    pub updated_at: DateTime<Utc>,
}

/// Keyed caches for the two search kinds. Cheap to clone; clones share the
/// underlying storage.
#[derive(Clone)]
pub struct SearchCache {
    email_cache: Cache<String, PersonRecord>,
    company_cache: Cache<String, CachedCompanyList>,
}

impl Default for SearchCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchCache {
    pub fn new() -> Self {
        Self {
            email_cache: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
            company_cache: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// Normalizes an email into its cache key: trimmed, lowercased.
    pub fn email_key(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Normalizes a company name into its cache key: trimmed, lowercased.
    pub fn company_key(company_name: &str) -> String {
        company_name.trim().to_lowercase()
    }

    pub async fn get_person(&self, key: &str) -> Option<PersonRecord> {
        self.email_cache.get(key).await
    }

    pub async fn put_person(&self, key: String, record: PersonRecord) {
        self.email_cache.insert(key, record).await;
    }

    pub async fn get_company(&self, key: &str) -> Option<CachedCompanyList> {
        self.company_cache.get(key).await
    }

    pub async fn put_company(&self, key: String, persons: Vec<PersonRecord>) {
        self.company_cache
            .insert(
                key,
                CachedCompanyList {
                    persons,
                    updated_at: Utc::now(),
                },
            )
            .await;
    }
}
