// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::BASE_CURRENCY;

const APP_NAME: &str = "kurzora-fx";
const PREFERENCES_NAME: &str = "preferences";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyPreference {
    pub currency_code: String,
}

impl Default for CurrencyPreference {
    fn default() -> Self {
        Self {
            currency_code: BASE_CURRENCY.to_string(),
        }
    }
}

/// The user's selected currency, kept across sessions.
pub struct PreferenceStore {
    path: PathBuf,
    current: CurrencyPreference,
}

impl PreferenceStore {
    /// Open the store at `path`; a missing file starts from the base currency.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut current: CurrencyPreference = confy::load_path(&path)
            .with_context(|| format!("Failed to load preferences from {}", path.display()))?;

        if current.currency_code.trim().is_empty() {
            current = CurrencyPreference::default();
        }

        Ok(Self { path, current })
    }

    /// Open the per-user preference file.
    pub fn open_default() -> Result<Self> {
        let path = confy::get_configuration_file_path(APP_NAME, PREFERENCES_NAME)
            .context("Could not locate the preferences directory")?;
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> &str {
        &self.current.currency_code
    }

    /// Persist a new selection. Only empty codes are rejected.
    pub fn set(&mut self, currency_code: &str) -> Result<()> {
        let code = currency_code.trim();
        if code.is_empty() {
            anyhow::bail!("currency code must not be empty");
        }

        let preference = CurrencyPreference {
            currency_code: code.to_ascii_uppercase(),
        };
        confy::store_path(&self.path, &preference)
            .with_context(|| format!("Failed to save preferences to {}", self.path.display()))?;
        self.current = preference;
        Ok(())
    }
}
