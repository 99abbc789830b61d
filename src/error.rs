// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use thiserror::Error;

/// Why a rate could not be obtained from the provider.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate provider returned {status}: {body}")]
    BadResponse { status: u16, body: String },

    #[error("No rate for {0} in provider response")]
    MissingRate(String),

    #[error("Invalid rate {rate} for {code}")]
    InvalidRate { code: String, rate: f64 },

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    #[error("Could not decode provider response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}
