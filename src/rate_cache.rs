// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqlitePool;

use crate::db::{kv_get, kv_remove, kv_set};
use crate::models::{CachedRatePayload, ConversionCacheEntry, ExchangeRate};

/// Fixed key the last fetched rate lives under.
pub const RATE_CACHE_KEY: &str = "kurzora.currency.rate_cache";

/// Single-entry cache of the last fetched rate.
#[derive(Clone)]
pub struct RateCache {
    pool: SqlitePool,
    ttl: Duration,
}

impl RateCache {
    pub fn new(pool: SqlitePool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn read(&self, currency: &str) -> Result<Option<ExchangeRate>> {
        self.read_at(currency, Utc::now()).await
    }

    /// The cached rate if it is for `currency` and younger than the TTL at `now`.
    pub async fn read_at(&self, currency: &str, now: DateTime<Utc>) -> Result<Option<ExchangeRate>> {
        let entry = match self.entry().await? {
            Some(entry) => entry,
            None => return Ok(None),
        };

        if entry.is_usable_for(currency, now) {
            Ok(Some(entry.rate))
        } else {
            log::debug!(
                "Cached {} rate not usable for {} (expires {})",
                entry.rate.currency_code,
                currency,
                entry.expires_at
            );
            Ok(None)
        }
    }

    /// The cached rate for `currency` regardless of age.
    pub async fn peek(&self, currency: &str) -> Result<Option<ExchangeRate>> {
        Ok(self
            .entry()
            .await?
            .map(|entry| entry.rate)
            .filter(|rate| rate.currency_code.eq_ignore_ascii_case(currency)))
    }

    pub async fn write(&self, rate: &ExchangeRate) -> Result<()> {
        let payload = serde_json::to_string(&CachedRatePayload::from(rate))?;
        kv_set(&self.pool, RATE_CACHE_KEY, &payload)
            .await
            .context("Failed to write rate cache")
    }

    pub async fn clear(&self) -> Result<()> {
        kv_remove(&self.pool, RATE_CACHE_KEY)
            .await
            .context("Failed to clear rate cache")
    }

    async fn entry(&self) -> Result<Option<ConversionCacheEntry>> {
        let raw = match kv_get(&self.pool, RATE_CACHE_KEY).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        // A corrupt entry counts as a miss
        let entry = serde_json::from_str::<CachedRatePayload>(&raw)
            .map_err(|e| e.to_string())
            .and_then(|payload| ExchangeRate::try_from(payload).map_err(|e| e.to_string()))
            .and_then(|rate| {
                let fetched_at = rate.fetched_at;
                ConversionCacheEntry::new(rate, self.ttl)
                    .ok_or_else(|| format!("expiry out of range for entry fetched {}", fetched_at))
            });

        match entry {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                log::warn!("Ignoring unreadable rate cache entry: {}", e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use approx::assert_relative_eq;

    async fn cache() -> Result<RateCache> {
        Ok(RateCache::new(create_test_pool().await?, Duration::hours(1)))
    }

    #[tokio::test]
    async fn test_read_write_clear() -> Result<()> {
        let cache = cache().await?;
        assert!(cache.read("EUR").await?.is_none());

        let rate = ExchangeRate::new("EUR", 0.92, Utc::now())?;
        cache.write(&rate).await?;

        let cached = cache.read("EUR").await?.expect("fresh entry");
        assert_eq!(cached.currency_code, "EUR");
        assert_relative_eq!(cached.rate, 0.92);

        cache.clear().await?;
        assert!(cache.read("EUR").await?.is_none());
        assert!(cache.peek("EUR").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_currency_mismatch_is_a_miss() -> Result<()> {
        let cache = cache().await?;
        cache.write(&ExchangeRate::new("EUR", 0.92, Utc::now())?).await?;

        assert!(cache.read("GBP").await?.is_none());
        assert!(cache.peek("GBP").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_entry_expires_at_ttl() -> Result<()> {
        let cache = cache().await?;
        let t0 = DateTime::<Utc>::from_timestamp_millis(1_740_000_000_000).unwrap();
        cache.write(&ExchangeRate::new("EUR", 0.92, t0)?).await?;

        assert!(cache.read_at("EUR", t0).await?.is_some());
        assert!(cache
            .read_at("EUR", t0 + Duration::hours(1) - Duration::milliseconds(1))
            .await?
            .is_some());
        assert!(cache.read_at("EUR", t0 + Duration::hours(1)).await?.is_none());
        assert!(cache.read_at("EUR", t0 + Duration::days(2)).await?.is_none());

        // Still visible as a last-good fallback
        assert!(cache.peek("EUR").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_write_overwrites() -> Result<()> {
        let cache = cache().await?;
        cache.write(&ExchangeRate::new("EUR", 0.92, Utc::now())?).await?;
        cache.write(&ExchangeRate::new("GBP", 0.79, Utc::now())?).await?;

        assert!(cache.read("EUR").await?.is_none());
        assert_relative_eq!(cache.read("GBP").await?.unwrap().rate, 0.79);
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() -> Result<()> {
        let pool = create_test_pool().await?;
        kv_set(&pool, RATE_CACHE_KEY, "{not json").await?;
        let cache = RateCache::new(pool.clone(), Duration::hours(1));
        assert!(cache.read("EUR").await?.is_none());

        kv_set(&pool, RATE_CACHE_KEY, r#"{"rate":-3.0,"timestamp":0,"currency":"EUR"}"#).await?;
        assert!(cache.peek("EUR").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_entry_near_end_of_time_is_a_miss() -> Result<()> {
        let pool = create_test_pool().await?;
        // Valid timestamp, but adding the TTL overflows
        kv_set(
            &pool,
            RATE_CACHE_KEY,
            r#"{"rate":0.9,"timestamp":8210266876799999,"currency":"EUR"}"#,
        )
        .await?;

        let cache = RateCache::new(pool, Duration::hours(1));
        assert!(cache.read("EUR").await?.is_none());
        assert!(cache.peek("EUR").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_long_ttl_does_not_overflow() -> Result<()> {
        let cache = RateCache::new(create_test_pool().await?, Duration::days(365));
        cache.write(&ExchangeRate::new("EUR", 0.92, Utc::now())?).await?;
        assert!(cache.read("EUR").await?.is_some());
        Ok(())
    }
}
