//! Locale-independent display formatting for watchlist rows.

use crate::{
    change::{ChangeCalculator, PercentChange, PriceDirection},
    exchange::ExchangeGroup,
    record::QuoteRecord,
    tick::{SYMBOL_DELIMITER, symbol_prefix},
};
use serde::{Deserialize, Serialize};

/// Rendered in place of an unknown (zero or absent) price.
pub const PRICE_SENTINEL: &str = "-";

#[derive(Debug, Clone, Copy, Default)]
pub struct PriceFormatter;

impl PriceFormatter {
    /// Number of decimal places used for `price`, or `None` for integer rounding.
    ///
    /// `symbol` only matters for FOREX, where JPY pairs quote with fewer decimals.
    pub fn decimals(price: f64, group: ExchangeGroup, symbol: &str) -> Option<usize> {
        let magnitude = price.abs();

        match group {
            ExchangeGroup::Mcx | ExchangeGroup::Nse | ExchangeGroup::Opt => None,
            ExchangeGroup::Forex if is_jpy_pair(symbol) => Some(3),
            ExchangeGroup::Forex => Some(5),
            ExchangeGroup::Crypto | ExchangeGroup::Commodity if magnitude >= 1000.0 => Some(2),
            ExchangeGroup::Crypto | ExchangeGroup::Commodity if magnitude >= 1.0 => Some(5),
            ExchangeGroup::Crypto if magnitude >= 0.0001 => Some(6),
            ExchangeGroup::Crypto => Some(8),
            ExchangeGroup::Commodity => Some(6),
        }
    }

    pub fn format_price(price: f64, group: ExchangeGroup, symbol: &str) -> String {
        if price == 0.0 || !price.is_finite() {
            return PRICE_SENTINEL.to_string();
        }

        match Self::decimals(price, group, symbol) {
            Some(decimals) => format!("{price:.decimals$}"),
            None => {
                // Avoid rendering "-0" for tiny negative values
                let rounded = price.round();
                let rounded = if rounded == 0.0 { 0.0 } else { rounded };
                format!("{rounded:.0}")
            }
        }
    }

    pub fn format_optional(price: Option<f64>, group: ExchangeGroup, symbol: &str) -> String {
        price.map_or_else(
            || PRICE_SENTINEL.to_string(),
            |price| Self::format_price(price, group, symbol),
        )
    }

    /// Symbol shown in the table, eg/ `"GOLD_31DEC"` -> `"GOLD"`.
    pub fn symbol_display(name: &str) -> &str {
        symbol_prefix(name)
    }

    /// Expiry suffix of a dated contract, eg/ `"GOLD_31DEC"` -> `"31 DEC"`.
    ///
    /// Only `<day><MON>` suffixes are recognised; anything else yields `None`.
    pub fn expiry_label(name: &str) -> Option<String> {
        let (_, suffix) = name.split_once(SYMBOL_DELIMITER)?;
        let suffix = suffix.split(SYMBOL_DELIMITER).next()?;

        let split = suffix.find(|c: char| !c.is_ascii_digit())?;
        let (day, month) = suffix.split_at(split);

        let valid = (1..=2).contains(&day.len())
            && month.len() == 3
            && month.chars().all(|c| c.is_ascii_alphabetic());

        valid.then(|| format!("{day} {}", month.to_ascii_uppercase()))
    }
}

fn is_jpy_pair(symbol: &str) -> bool {
    symbol_prefix(symbol.trim())
        .to_ascii_uppercase()
        .ends_with("JPY")
}

/// Display-ready view of one [`QuoteRecord`].
///
/// FX-class rows show the foreign-currency quote.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QuoteRow {
    pub token: String,
    pub symbol: String,
    pub expiry: Option<String>,
    pub exchange: String,
    pub bid: String,
    pub ask: String,
    pub last: String,
    pub change: String,
    pub percent: PercentChange,
    pub bid_direction: PriceDirection,
    pub ask_direction: PriceDirection,
    pub last_direction: PriceDirection,
}

impl QuoteRow {
    pub fn from_record(record: &QuoteRecord, rate: f64) -> Self {
        let group = record.exchange_group;
        let name = record.display_name.as_str();

        let (bid, ask, last, prev_last) = if group.is_fx() {
            (
                record.bid_foreign,
                record.ask_foreign,
                record.last_foreign,
                record.prev_last_foreign,
            )
        } else {
            (record.bid, record.ask, record.last, record.prev_last)
        };

        let expiry = if group.is_fx() {
            None
        } else {
            PriceFormatter::expiry_label(name)
        };

        let change = ChangeCalculator::display_change(record);
        let change = if group.is_fx() {
            format_fx_change(change)
        } else {
            format!("{change:.2}")
        };

        Self {
            token: record.token.to_string(),
            symbol: PriceFormatter::symbol_display(name).to_string(),
            expiry,
            exchange: group.exchange_name().to_string(),
            bid: PriceFormatter::format_price(bid, group, name),
            ask: PriceFormatter::format_price(ask, group, name),
            last: PriceFormatter::format_price(last, group, name),
            change,
            percent: ChangeCalculator::record_percent_change(record, rate),
            bid_direction: PriceDirection::between(record.bid, record.prev_bid),
            ask_direction: PriceDirection::between(record.ask, record.prev_ask),
            last_direction: PriceDirection::between(last, prev_last),
        }
    }
}

fn format_fx_change(change: f64) -> String {
    if change.abs() >= 1.0 || change == 0.0 {
        format!("{change:.2}")
    } else {
        format!("{change:.5}")
    }
}
