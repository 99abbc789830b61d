// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

/// Currency all internal amounts are stored in.
pub const BASE_CURRENCY: &str = "USD";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    /// Whether amounts get thousands grouping, or just `symbol + fixed(2)`.
    pub locale_format: bool,
}

const fn currency(
    code: &'static str,
    name: &'static str,
    symbol: &'static str,
    locale_format: bool,
) -> CurrencyInfo {
    CurrencyInfo {
        code,
        name,
        symbol,
        locale_format,
    }
}

pub const SUPPORTED_CURRENCIES: &[CurrencyInfo] = &[
    currency("USD", "US Dollar", "$", true),
    currency("EUR", "Euro", "€", true),
    currency("GBP", "British Pound", "£", true),
    currency("JPY", "Japanese Yen", "¥", true),
    currency("CHF", "Swiss Franc", "CHF ", true),
    currency("CAD", "Canadian Dollar", "CA$", true),
    currency("AUD", "Australian Dollar", "A$", true),
    currency("CNY", "Chinese Yuan", "CN¥", true),
    currency("INR", "Indian Rupee", "₹", true),
    currency("SEK", "Swedish Krona", "kr ", true),
    currency("SAR", "Saudi Riyal", "SAR ", false),
    currency("AED", "UAE Dirham", "AED ", false),
];

/// Look up a currency by code, ignoring case.
pub fn find_currency(code: &str) -> Option<&'static CurrencyInfo> {
    SUPPORTED_CURRENCIES
        .iter()
        .find(|c| c.code.eq_ignore_ascii_case(code.trim()))
}

pub fn base_currency() -> &'static CurrencyInfo {
    &SUPPORTED_CURRENCIES[0]
}

/// Render `amount` in `code`. Unknown codes use the base currency symbol.
pub fn format_amount(amount: f64, code: &str) -> String {
    let info = find_currency(code).unwrap_or_else(base_currency);
    if info.locale_format && amount.is_finite() {
        let sign = if amount < 0.0 { "-" } else { "" };
        format!("{}{}{}", sign, info.symbol, group_thousands(amount.abs()))
    } else {
        format!("{}{:.2}", info.symbol, amount)
    }
}

/// `1234567.891` -> `1,234,567.89`
fn group_thousands(amount: f64) -> String {
    let fixed = format!("{:.2}", amount);
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*digit);
    }

    format!("{}.{}", grouped, frac_part)
}
