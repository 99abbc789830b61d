// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Converts base-currency amounts into the selected display currency.
//!
//! The service keeps one active rate. `convert` and `format` are synchronous
//! and never fail; `refresh` resolves a rate through the cache and fetcher and
//! degrades to the last good rate, then to the neutral rate, on failure.

use crate::api::RateFetcher;
use crate::error::FetchError;
use crate::models::currencies::{find_currency, format_amount, BASE_CURRENCY};
use crate::models::ExchangeRate;
use crate::rate_cache::RateCache;

pub const NEUTRAL_RATE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ConversionState {
    /// Showing base-currency amounts unconverted.
    Neutral,
    /// A refresh is in flight.
    Loading,
    Resolved(ExchangeRate),
    /// Last refresh failed; `fallback` is the last good rate for the currency, if any.
    Errored {
        fallback: Option<ExchangeRate>,
        message: String,
    },
}

/// Identifies one refresh request. Only the latest ticket may update the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTicket {
    pub generation: u64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The base currency needs no rate.
    Neutral,
    CacheHit(f64),
    Fetched(f64),
    /// Fetch failed; `rate` is what `convert` now applies.
    Failed { message: String, rate: f64 },
    /// The ticket was superseded by a later refresh and its result dropped.
    Superseded,
}

pub struct ConversionService<F> {
    fetcher: F,
    cache: RateCache,
    currency: String,
    state: ConversionState,
    last_good: Option<ExchangeRate>,
    generation: u64,
}

impl<F: RateFetcher> ConversionService<F> {
    /// Starts on the base currency in the `Neutral` state.
    pub fn new(fetcher: F, cache: RateCache) -> Self {
        Self {
            fetcher,
            cache,
            currency: BASE_CURRENCY.to_string(),
            state: ConversionState::Neutral,
            last_good: None,
            generation: 0,
        }
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Error from the last refresh, for optional display.
    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            ConversionState::Errored { message, .. } => Some(message),
            _ => None,
        }
    }

    /// The rate `convert` currently applies.
    pub fn active_rate(&self) -> Option<&ExchangeRate> {
        match &self.state {
            ConversionState::Neutral => None,
            ConversionState::Resolved(rate) => Some(rate),
            ConversionState::Errored { fallback, .. } => fallback.as_ref(),
            ConversionState::Loading => self.last_good.as_ref(),
        }
    }

    /// Currency the converted amounts are actually in: the base currency
    /// whenever the neutral rate is in effect.
    pub fn display_currency(&self) -> &str {
        self.active_rate()
            .map(|rate| rate.currency_code.as_str())
            .unwrap_or(BASE_CURRENCY)
    }

    pub fn convert(&self, amount_usd: f64) -> f64 {
        amount_usd * self.active_rate().map_or(NEUTRAL_RATE, |rate| rate.rate)
    }

    pub fn format(&self, amount: f64) -> String {
        format_amount(amount, self.display_currency())
    }

    /// Switch the target currency. Rates for a different currency are dropped
    /// and any in-flight ticket is invalidated; call `refresh` afterwards.
    pub fn set_currency(&mut self, currency: &str) {
        let currency = currency.trim().to_ascii_uppercase();
        if currency == self.currency {
            return;
        }

        log::info!("Display currency {} -> {}", self.currency, currency);
        self.currency = currency;
        self.generation += 1;
        if self
            .last_good
            .as_ref()
            .is_some_and(|rate| rate.currency_code != self.currency)
        {
            self.last_good = None;
        }
        self.state = if self.currency == BASE_CURRENCY {
            ConversionState::Neutral
        } else {
            ConversionState::Loading
        };
    }

    /// Resolve a rate for the current currency: cache first, then the fetcher.
    pub async fn refresh(&mut self) -> RefreshOutcome {
        if self.currency == BASE_CURRENCY {
            self.generation += 1;
            self.last_good = None;
            self.state = ConversionState::Neutral;
            return RefreshOutcome::Neutral;
        }

        match self.cache.read(&self.currency).await {
            Ok(Some(rate)) => {
                log::debug!("Using cached {} rate {}", rate.currency_code, rate.rate);
                self.generation += 1;
                let value = rate.rate;
                self.resolve(rate);
                return RefreshOutcome::CacheHit(value);
            }
            Ok(None) => {}
            Err(e) => log::warn!("Rate cache read failed, fetching instead: {:#}", e),
        }

        let ticket = self.begin_refresh();
        let result = self.fetcher.fetch_rate(&ticket.currency).await;
        self.finish_refresh(&ticket, result).await
    }

    /// Start a refresh for the current currency and move to `Loading`.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.generation += 1;
        self.state = ConversionState::Loading;
        RefreshTicket {
            generation: self.generation,
            currency: self.currency.clone(),
        }
    }

    /// Apply the result of a fetch started with `begin_refresh`. Results for
    /// a superseded ticket are discarded without touching state or cache.
    pub async fn finish_refresh(
        &mut self,
        ticket: &RefreshTicket,
        result: Result<ExchangeRate, FetchError>,
    ) -> RefreshOutcome {
        if ticket.generation != self.generation || ticket.currency != self.currency {
            log::debug!(
                "Dropping stale {} rate (generation {} < {})",
                ticket.currency,
                ticket.generation,
                self.generation
            );
            return RefreshOutcome::Superseded;
        }

        match result {
            Ok(rate) => {
                if let Err(e) = self.cache.write(&rate).await {
                    log::warn!("Could not cache {} rate: {:#}", rate.currency_code, e);
                }
                let value = rate.rate;
                self.resolve(rate);
                RefreshOutcome::Fetched(value)
            }
            Err(err) => self.fail(err).await,
        }
    }

    fn resolve(&mut self, rate: ExchangeRate) {
        self.last_good = Some(rate.clone());
        self.state = ConversionState::Resolved(rate);
    }

    async fn fail(&mut self, err: FetchError) -> RefreshOutcome {
        let message = user_message(&self.currency, &err);
        log::warn!("{}", message);

        let fallback = match self.last_good.clone() {
            Some(rate) => Some(rate),
            None => self.cache.peek(&self.currency).await.unwrap_or_else(|e| {
                log::warn!("Rate cache read failed: {:#}", e);
                None
            }),
        };

        let rate = fallback.as_ref().map_or(NEUTRAL_RATE, |rate| rate.rate);
        self.last_good = fallback.clone();
        self.state = ConversionState::Errored {
            fallback,
            message: message.clone(),
        };
        RefreshOutcome::Failed { message, rate }
    }
}

/// The single user-facing string every fetch failure is normalized into.
fn user_message(currency: &str, err: &FetchError) -> String {
    let name = find_currency(currency).map_or(currency, |info| info.name);
    format!("Could not load exchange rate for {}: {}", name, err)
}
