// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

pub mod api;
pub mod config;
pub mod context;
pub mod conversion;
pub mod db;
pub mod error;
pub mod models;
pub mod preferences;
pub mod rate_cache;

pub use context::CurrencyContext;
pub use conversion::{ConversionService, ConversionState, RefreshOutcome, RefreshTicket};
pub use error::FetchError;
