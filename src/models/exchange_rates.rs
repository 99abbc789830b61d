// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::FetchError;

/// Units of `currency_code` per 1 USD.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRate {
    pub currency_code: String,
    pub rate: f64,
    pub fetched_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn new(
        currency_code: impl Into<String>,
        rate: f64,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, FetchError> {
        let currency_code = currency_code.into();
        if !rate.is_finite() || rate <= 0.0 {
            return Err(FetchError::InvalidRate {
                code: currency_code,
                rate,
            });
        }
        Ok(Self {
            currency_code,
            rate,
            fetched_at,
        })
    }

    /// Rate 1 for the base currency itself.
    pub fn neutral(currency_code: impl Into<String>) -> Self {
        Self {
            currency_code: currency_code.into(),
            rate: 1.0,
            fetched_at: Utc::now(),
        }
    }
}

/// A cached rate together with the instant it stops being usable.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionCacheEntry {
    pub rate: ExchangeRate,
    pub expires_at: DateTime<Utc>,
}

impl ConversionCacheEntry {
    /// `None` when `fetched_at + ttl` is past the representable range.
    pub fn new(rate: ExchangeRate, ttl: Duration) -> Option<Self> {
        let expires_at = rate.fetched_at.checked_add_signed(ttl)?;
        Some(Self { rate, expires_at })
    }

    pub fn is_usable_for(&self, currency: &str, now: DateTime<Utc>) -> bool {
        self.rate.currency_code.eq_ignore_ascii_case(currency) && now < self.expires_at
    }
}

/// JSON stored under the cache key: `{"rate", "timestamp" (epoch ms), "currency"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRatePayload {
    pub rate: f64,
    pub timestamp: i64,
    pub currency: String,
}

impl From<&ExchangeRate> for CachedRatePayload {
    fn from(rate: &ExchangeRate) -> Self {
        Self {
            rate: rate.rate,
            timestamp: rate.fetched_at.timestamp_millis(),
            currency: rate.currency_code.clone(),
        }
    }
}

impl TryFrom<CachedRatePayload> for ExchangeRate {
    type Error = FetchError;

    fn try_from(payload: CachedRatePayload) -> Result<Self, Self::Error> {
        let fetched_at = DateTime::<Utc>::from_timestamp_millis(payload.timestamp).ok_or_else(
            || FetchError::Decode(format!("timestamp out of range: {}", payload.timestamp)),
        )?;
        ExchangeRate::new(payload.currency, payload.rate, fetched_at)
    }
}

/// Body of `GET /latest?from=USD&to=CODE`.
#[derive(Debug, Deserialize)]
pub struct LatestRatesResponse {
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub rates: HashMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rate_must_be_positive() {
        let now = Utc::now();
        assert!(ExchangeRate::new("EUR", 0.92, now).is_ok());
        assert!(matches!(
            ExchangeRate::new("EUR", 0.0, now),
            Err(FetchError::InvalidRate { .. })
        ));
        assert!(ExchangeRate::new("EUR", -1.0, now).is_err());
        assert!(ExchangeRate::new("EUR", f64::NAN, now).is_err());
    }

    #[test]
    fn test_cache_entry_expiry_boundary() {
        let t0 = Utc::now();
        let entry = ConversionCacheEntry::new(
            ExchangeRate::new("EUR", 0.92, t0).unwrap(),
            Duration::hours(1),
        )
        .unwrap();

        assert!(entry.is_usable_for("EUR", t0));
        assert!(entry.is_usable_for("EUR", t0 + Duration::minutes(59)));
        assert!(!entry.is_usable_for("EUR", t0 + Duration::hours(1)));
        assert!(!entry.is_usable_for("GBP", t0));
    }

    #[test]
    fn test_cache_entry_expiry_out_of_range() {
        let fetched_at = DateTime::<Utc>::MAX_UTC - Duration::minutes(1);
        let rate = ExchangeRate::new("EUR", 0.9, fetched_at).unwrap();

        assert!(ConversionCacheEntry::new(rate.clone(), Duration::hours(1)).is_none());
        assert!(ConversionCacheEntry::new(rate, Duration::seconds(30)).is_some());
    }

    #[test]
    fn test_payload_keeps_millisecond_timestamp() {
        let fetched_at = DateTime::<Utc>::from_timestamp_millis(1_735_689_600_123).unwrap();
        let rate = ExchangeRate::new("JPY", 151.25, fetched_at).unwrap();

        let json = serde_json::to_string(&CachedRatePayload::from(&rate)).unwrap();
        assert!(json.contains("\"timestamp\":1735689600123"));

        let payload: CachedRatePayload = serde_json::from_str(&json).unwrap();
        let restored = ExchangeRate::try_from(payload).unwrap();
        assert_eq!(restored.fetched_at, fetched_at);
        assert_relative_eq!(restored.rate, 151.25);
    }

    #[test]
    fn test_latest_response_tolerates_extra_fields() {
        let body = r#"{"amount":1.0,"base":"USD","date":"2025-03-01","rates":{"EUR":0.92}}"#;
        let parsed: LatestRatesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.base.as_deref(), Some("USD"));
        assert_relative_eq!(parsed.rates["EUR"], 0.92);
    }
}
