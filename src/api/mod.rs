// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

pub mod rate_client;

pub use rate_client::{parse_latest_rate, RateApiClient, RateFetcher};

#[cfg(test)]
pub use rate_client::MockRateFetcher;
