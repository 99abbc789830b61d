// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

// Re-export model modules
pub mod currencies;
mod exchange_rates;

pub use currencies::{format_amount, CurrencyInfo, BASE_CURRENCY, SUPPORTED_CURRENCIES};
pub use exchange_rates::*;
