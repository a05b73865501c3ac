//! Display helpers for metric values.
//!
//! Formatting never feeds back into calculation: every function here takes an
//! `f64` by value and only produces a `String`.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PERCENT_DECIMALS: usize = 1;
pub const DEFAULT_NUMBER_DECIMALS: usize = 0;
pub const CURRENCY_DECIMALS: usize = 2;

/// Separators and currency symbol for one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberLocale {
    pub thousands_separator: char,
    pub decimal_separator: char,
    pub currency_symbol: String,
}

impl NumberLocale {
    /// Brazilian Real: `R$ 1.234,56`.
    pub fn pt_br() -> Self {
        Self {
            thousands_separator: '.',
            decimal_separator: ',',
            currency_symbol: "R$".to_string(),
        }
    }

    /// US Dollar: `$ 1,234.56`.
    pub fn en_us() -> Self {
        Self {
            thousands_separator: ',',
            decimal_separator: '.',
            currency_symbol: "$".to_string(),
        }
    }
}

impl Default for NumberLocale {
    fn default() -> Self {
        Self::pt_br()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formatter {
    locale: NumberLocale,
}

impl Formatter {
    pub fn new(locale: NumberLocale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> &NumberLocale {
        &self.locale
    }

    /// Currency with two decimals; the minus sign goes before the symbol.
    pub fn currency(&self, value: f64) -> String {
        if !value.is_finite() {
            return value.to_string();
        }
        let (negative, body) = self.grouped(value, CURRENCY_DECIMALS);
        format!(
            "{}{} {}",
            if negative { "-" } else { "" },
            self.locale.currency_symbol,
            body
        )
    }

    /// `value × 100` with `decimals` places and a `%` suffix.
    ///
    /// Percentages keep a `.` decimal point regardless of locale, matching how the
    /// analyst reports rates ("3.5%").
    pub fn percentage(&self, value: f64, decimals: usize) -> String {
        format!("{:.*}%", decimals, value * 100.0)
    }

    /// Plain number grouped by thousands.
    pub fn number(&self, value: f64, decimals: usize) -> String {
        if !value.is_finite() {
            return value.to_string();
        }
        let (negative, body) = self.grouped(value, decimals);
        if negative {
            format!("-{}", body)
        } else {
            body
        }
    }

    /// Rounds `value` to `decimals` places and applies locale separators to its
    /// magnitude. The sign is reported separately and is false when the rounded
    /// value is zero.
    fn grouped(&self, value: f64, decimals: usize) -> (bool, String) {
        let fixed = format!("{:.*}", decimals, value.abs());
        let (integer, fraction) = match fixed.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (fixed.as_str(), None),
        };

        let mut out = String::with_capacity(fixed.len() + integer.len() / 3);
        for (i, digit) in integer.chars().enumerate() {
            if i > 0 && (integer.len() - i) % 3 == 0 {
                out.push(self.locale.thousands_separator);
            }
            out.push(digit);
        }
        if let Some(fraction) = fraction {
            out.push(self.locale.decimal_separator);
            out.push_str(fraction);
        }

        let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
        (value < 0.0 && !is_zero, out)
    }
}

/// `R$ 1.234,56`
pub fn format_currency(value: f64) -> String {
    Formatter::default().currency(value)
}

/// `0.035` -> `3.5%`
pub fn format_percentage(value: f64, decimals: usize) -> String {
    Formatter::default().percentage(value, decimals)
}

/// `1234567.0` -> `1.234.567`
pub fn format_number(value: f64, decimals: usize) -> String {
    Formatter::default().number(value, decimals)
}
