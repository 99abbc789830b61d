// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;

use crate::api::RateFetcher;
use crate::conversion::{ConversionService, RefreshOutcome};
use crate::preferences::PreferenceStore;

/// Currency state handed to whatever renders amounts. Selection goes through
/// `select_currency` so the preference, cache and active rate stay in step.
pub struct CurrencyContext<F> {
    preferences: PreferenceStore,
    service: ConversionService<F>,
}

impl<F: RateFetcher> CurrencyContext<F> {
    /// Restore the saved currency and resolve its rate.
    pub async fn load(
        preferences: PreferenceStore,
        mut service: ConversionService<F>,
    ) -> (Self, RefreshOutcome) {
        service.set_currency(preferences.get());
        let outcome = service.refresh().await;
        (
            Self {
                preferences,
                service,
            },
            outcome,
        )
    }

    pub fn service(&self) -> &ConversionService<F> {
        &self.service
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    pub fn convert(&self, amount_usd: f64) -> f64 {
        self.service.convert(amount_usd)
    }

    pub fn format(&self, amount: f64) -> String {
        self.service.format(amount)
    }

    /// Convert and render a base-currency amount.
    pub fn display(&self, amount_usd: f64) -> String {
        self.format(self.convert(amount_usd))
    }

    /// Persist `code`, drop the cached rate and resolve a fresh one.
    pub async fn select_currency(&mut self, code: &str) -> Result<RefreshOutcome> {
        self.preferences.set(code)?;
        self.service.cache().clear().await?;
        self.service.set_currency(self.preferences.get());
        Ok(self.service.refresh().await)
    }
}
