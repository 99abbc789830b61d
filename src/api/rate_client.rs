// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;

use crate::config::Config;
use crate::error::FetchError;
use crate::models::currencies::{find_currency, BASE_CURRENCY};
use crate::models::{ExchangeRate, LatestRatesResponse};

/// Source of USD -> target rates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateFetcher: Send + Sync {
    async fn fetch_rate(&self, target: &str) -> Result<ExchangeRate, FetchError>;
}

#[derive(Clone)]
pub struct RateApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RateApiClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.rate_api_url.clone(),
            config.rate_api_key.clone(),
            config.request_timeout(),
        )
    }

    fn latest_request(&self, target: &str) -> RequestBuilder {
        let request = self
            .client
            .get(format!("{}/latest", self.base_url))
            .query(&[("from", BASE_CURRENCY), ("to", target)]);
        match &self.api_key {
            Some(key) => request.query(&[("apikey", key)]),
            None => request,
        }
    }
}

#[async_trait]
impl RateFetcher for RateApiClient {
    async fn fetch_rate(&self, target: &str) -> Result<ExchangeRate, FetchError> {
        let info = find_currency(target)
            .ok_or_else(|| FetchError::UnsupportedCurrency(target.to_string()))?;
        if info.code == BASE_CURRENCY {
            return Ok(ExchangeRate::neutral(BASE_CURRENCY));
        }

        log::debug!("Fetching {}/{} rate", BASE_CURRENCY, info.code);
        let response = self.latest_request(info.code).send().await?;

        let status = response.status();
        let text = response.text().await?;

        let rate = parse_latest_rate(info.code, status, &text)?;
        log::info!("Fetched {}/{} = {}", BASE_CURRENCY, info.code, rate);
        ExchangeRate::new(info.code, rate, Utc::now())
    }
}

/// Pull `rates[code]` out of a provider response.
pub fn parse_latest_rate(code: &str, status: StatusCode, body: &str) -> Result<f64, FetchError> {
    if !status.is_success() {
        return Err(FetchError::BadResponse {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }

    let parsed: LatestRatesResponse = serde_json::from_str(body)?;
    let rate = parsed
        .rates
        .get(code)
        .copied()
        .ok_or_else(|| FetchError::MissingRate(code.to_string()))?;

    if !rate.is_finite() || rate <= 0.0 {
        return Err(FetchError::InvalidRate {
            code: code.to_string(),
            rate,
        });
    }
    Ok(rate)
}
