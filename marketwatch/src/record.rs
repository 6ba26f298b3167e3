//! Per-instrument quote state held by a tab.

use crate::{
    de::{de_f64_lenient, de_f64_or_zero, de_token},
    error::MarketWatchError,
    exchange::ExchangeGroup,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Canonical quote state for one instrument in one tab.
///
/// Prices are non-negative and `0.0` means "unknown", not a zero price. The
/// `*_foreign` fields are only populated for foreign-quoted (FX-class) groups.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    pub token: SmolStr,
    pub display_name: String,
    pub exchange_group: ExchangeGroup,
    pub lot_size: u32,

    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub bid_foreign: f64,
    pub ask_foreign: f64,
    pub last_foreign: f64,

    /// Values immediately before the most recent mutation, for delta colouring.
    pub prev_bid: f64,
    pub prev_ask: f64,
    pub prev_last: f64,
    pub prev_last_foreign: f64,

    pub open: f64,
    pub close: f64,
    pub close_foreign: f64,
    pub high: f64,
    pub low: f64,

    pub change_abs: f64,
    pub change_abs_foreign: f64,
    pub open_interest: f64,
    pub volume: f64,

    pub last_update_at: DateTime<Utc>,
}

/// Numeric [`QuoteRecord`] fields a tick may update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum QuoteField {
    Bid,
    Ask,
    Last,
    BidForeign,
    AskForeign,
    LastForeign,
    Open,
    High,
    Low,
    Close,
    CloseForeign,
    ChangeAbs,
    ChangeAbsForeign,
    OpenInterest,
    Volume,
}

impl QuoteRecord {
    /// Construct a record with every quote field unknown.
    pub fn new(
        token: impl Into<SmolStr>,
        display_name: impl Into<String>,
        exchange_group: ExchangeGroup,
        lot_size: u32,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            display_name: display_name.into(),
            exchange_group,
            lot_size: lot_size.max(1),
            bid: 0.0,
            ask: 0.0,
            last: 0.0,
            bid_foreign: 0.0,
            ask_foreign: 0.0,
            last_foreign: 0.0,
            prev_bid: 0.0,
            prev_ask: 0.0,
            prev_last: 0.0,
            prev_last_foreign: 0.0,
            open: 0.0,
            close: 0.0,
            close_foreign: 0.0,
            high: 0.0,
            low: 0.0,
            change_abs: 0.0,
            change_abs_foreign: 0.0,
            open_interest: 0.0,
            volume: 0.0,
            last_update_at: time,
        }
    }

    /// Build a record from a persisted watchlist row.
    ///
    /// `tab` is used when the row carries no (or an unknown) exchange type. For
    /// FX-class groups a missing foreign close is derived from `close / rate`.
    pub fn from_seed(
        seed: QuoteSeed,
        tab: ExchangeGroup,
        rate: f64,
        time: DateTime<Utc>,
    ) -> Result<Self, MarketWatchError> {
        let token = seed
            .token
            .ok_or_else(|| MarketWatchError::Seed("missing SymbolToken".to_string()))?;

        let exchange_group = seed
            .exchange_type
            .as_deref()
            .and_then(|kind| kind.parse::<ExchangeGroup>().ok())
            .unwrap_or(tab);

        let display_name = seed.display_name.unwrap_or_else(|| token.to_string());
        let lot_size = seed
            .lot_size
            .filter(|lot| *lot >= 1.0 && *lot <= u32::MAX as f64)
            .map(|lot| lot as u32)
            .unwrap_or(1);

        let mut record = Self::new(token, display_name, exchange_group, lot_size, time);
        record.bid = seed.sell;
        record.ask = seed.buy;
        record.last = seed.ltp;
        record.prev_bid = seed.sell;
        record.prev_ask = seed.buy;
        record.prev_last = seed.ltp;
        record.open = seed.open;
        record.close = seed.close;
        record.high = seed.high;
        record.low = seed.low;
        record.change_abs = seed.chg;
        record.open_interest = seed.oi;
        record.volume = seed.volume;

        if exchange_group.is_fx() {
            record.last_foreign = seed.ltp_foreign;
            record.prev_last_foreign = seed.ltp_foreign;
            record.change_abs_foreign = seed.chg_foreign;
            record.close_foreign = if seed.close_foreign == 0.0 && record.close > 0.0 && rate > 0.0
            {
                record.close / rate
            } else {
                seed.close_foreign
            };
        }

        Ok(record)
    }

    pub fn get(&self, field: QuoteField) -> f64 {
        match field {
            QuoteField::Bid => self.bid,
            QuoteField::Ask => self.ask,
            QuoteField::Last => self.last,
            QuoteField::BidForeign => self.bid_foreign,
            QuoteField::AskForeign => self.ask_foreign,
            QuoteField::LastForeign => self.last_foreign,
            QuoteField::Open => self.open,
            QuoteField::High => self.high,
            QuoteField::Low => self.low,
            QuoteField::Close => self.close,
            QuoteField::CloseForeign => self.close_foreign,
            QuoteField::ChangeAbs => self.change_abs,
            QuoteField::ChangeAbsForeign => self.change_abs_foreign,
            QuoteField::OpenInterest => self.open_interest,
            QuoteField::Volume => self.volume,
        }
    }

    pub fn field_mut(&mut self, field: QuoteField) -> &mut f64 {
        match field {
            QuoteField::Bid => &mut self.bid,
            QuoteField::Ask => &mut self.ask,
            QuoteField::Last => &mut self.last,
            QuoteField::BidForeign => &mut self.bid_foreign,
            QuoteField::AskForeign => &mut self.ask_foreign,
            QuoteField::LastForeign => &mut self.last_foreign,
            QuoteField::Open => &mut self.open,
            QuoteField::High => &mut self.high,
            QuoteField::Low => &mut self.low,
            QuoteField::Close => &mut self.close,
            QuoteField::CloseForeign => &mut self.close_foreign,
            QuoteField::ChangeAbs => &mut self.change_abs,
            QuoteField::ChangeAbsForeign => &mut self.change_abs_foreign,
            QuoteField::OpenInterest => &mut self.open_interest,
            QuoteField::Volume => &mut self.volume,
        }
    }

    /// Copy the current quote into the `prev_*` fields ahead of a mutation.
    pub fn snapshot_prev(&mut self) {
        self.prev_bid = self.bid;
        self.prev_ask = self.ask;
        self.prev_last = self.last;
        self.prev_last_foreign = self.last_foreign;
    }
}

/// ### Raw Payload Examples
/// Watchlist row returned by the selected-tokens endpoint. Note `buy` is the
/// ask and `sell` the bid.
///```json
/// {
///     "SymbolToken": 256265,
///     "SymbolName": "GOLD_31DEC",
///     "ExchangeType": "MCX",
///     "Lotsize": 100,
///     "buy": "71020",
///     "sell": "71010",
///     "ltp": "71015",
///     "chg": "-25",
///     "high": "71200",
///     "low": "70900",
///     "opn": "71040",
///     "cls": "71040",
///     "ol": "1250",
///     "vol": "83000"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct QuoteSeed {
    #[serde(rename = "SymbolToken", default, deserialize_with = "de_token")]
    pub token: Option<SmolStr>,

    #[serde(rename = "SymbolName", default)]
    pub display_name: Option<String>,

    #[serde(rename = "ExchangeType", default)]
    pub exchange_type: Option<String>,

    #[serde(rename = "Lotsize", default, deserialize_with = "de_f64_lenient")]
    pub lot_size: Option<f64>,

    #[serde(default, deserialize_with = "de_f64_or_zero")]
    pub buy: f64,

    #[serde(default, deserialize_with = "de_f64_or_zero")]
    pub sell: f64,

    #[serde(default, deserialize_with = "de_f64_or_zero")]
    pub ltp: f64,

    #[serde(rename = "ltpUSD", default, deserialize_with = "de_f64_or_zero")]
    pub ltp_foreign: f64,

    #[serde(default, deserialize_with = "de_f64_or_zero")]
    pub chg: f64,

    #[serde(rename = "chgUSD", default, deserialize_with = "de_f64_or_zero")]
    pub chg_foreign: f64,

    #[serde(default, deserialize_with = "de_f64_or_zero")]
    pub high: f64,

    #[serde(default, deserialize_with = "de_f64_or_zero")]
    pub low: f64,

    #[serde(rename = "opn", alias = "open", default, deserialize_with = "de_f64_or_zero")]
    pub open: f64,

    #[serde(rename = "cls", alias = "close", default, deserialize_with = "de_f64_or_zero")]
    pub close: f64,

    #[serde(rename = "closeUSD", default, deserialize_with = "de_f64_or_zero")]
    pub close_foreign: f64,

    #[serde(rename = "ol", default, deserialize_with = "de_f64_or_zero")]
    pub oi: f64,

    #[serde(rename = "vol", default, deserialize_with = "de_f64_or_zero")]
    pub volume: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    #[test]
    fn test_quote_seed_deserialise() {
        let input = r#"
            {
                "SymbolToken": 256265,
                "SymbolName": "GOLD_31DEC",
                "ExchangeType": "MCX",
                "Lotsize": "100",
                "buy": "71020",
                "sell": "71010",
                "ltp": "71015",
                "chg": "-25",
                "opn": "71040",
                "cls": "71040",
                "ol": "1250",
                "vol": 83000
            }
        "#;

        let seed = serde_json::from_str::<QuoteSeed>(input).unwrap();
        assert_eq!(seed.token.as_deref(), Some("256265"));
        assert_eq!(seed.lot_size, Some(100.0));
        assert_eq!(seed.buy, 71020.0);
        assert_eq!(seed.sell, 71010.0);
        assert_eq!(seed.close, 71040.0);
        assert_eq!(seed.oi, 1250.0);
        assert_eq!(seed.volume, 83000.0);
        assert_eq!(seed.high, 0.0);
    }

    #[test]
    fn test_from_seed_local_group() {
        let seed = QuoteSeed {
            token: Some(SmolStr::new("256265")),
            display_name: Some("GOLD_31DEC".to_string()),
            buy: 71020.0,
            sell: 71010.0,
            ltp: 71015.0,
            close: 71040.0,
            ..Default::default()
        };

        let record = QuoteRecord::from_seed(seed, ExchangeGroup::Mcx, 88.0, time()).unwrap();
        assert_eq!(record.exchange_group, ExchangeGroup::Mcx);
        assert_eq!(record.bid, 71010.0);
        assert_eq!(record.ask, 71020.0);
        assert_eq!(record.prev_last, 71015.0);
        assert_eq!(record.close_foreign, 0.0);
        assert_eq!(record.lot_size, 1);
        assert_eq!(record.last_update_at, time());
    }

    #[test]
    fn test_from_seed_fx_group_derives_close_foreign() {
        struct TestCase {
            input: QuoteSeed,
            expected_close_foreign: f64,
        }

        let base = QuoteSeed {
            token: Some(SmolStr::new("BTC")),
            exchange_type: Some("CRYPTO".to_string()),
            close: 8800.0,
            ..Default::default()
        };

        let tests = vec![
            TestCase {
                // TC0: close foreign derived from close / rate
                input: base.clone(),
                expected_close_foreign: 100.0,
            },
            TestCase {
                // TC1: explicit close foreign kept
                input: QuoteSeed {
                    close_foreign: 99.0,
                    ..base.clone()
                },
                expected_close_foreign: 99.0,
            },
            TestCase {
                // TC2: no close, nothing to derive
                input: QuoteSeed {
                    close: 0.0,
                    ..base
                },
                expected_close_foreign: 0.0,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let record =
                QuoteRecord::from_seed(test.input, ExchangeGroup::Mcx, 88.0, time()).unwrap();
            assert_eq!(record.exchange_group, ExchangeGroup::Crypto, "TC{} failed", index);
            assert_eq!(
                record.close_foreign, test.expected_close_foreign,
                "TC{} failed",
                index
            );
        }
    }

    #[test]
    fn test_from_seed_missing_token() {
        let actual = QuoteRecord::from_seed(QuoteSeed::default(), ExchangeGroup::Nse, 88.0, time());
        assert!(matches!(actual, Err(MarketWatchError::Seed(_))));
    }

    #[test]
    fn test_snapshot_prev() {
        let mut record = QuoteRecord::new("1", "X", ExchangeGroup::Forex, 1, time());
        record.bid = 1.0;
        record.ask = 2.0;
        record.last = 1.5;
        record.last_foreign = 0.5;
        record.snapshot_prev();
        assert_eq!(
            (
                record.prev_bid,
                record.prev_ask,
                record.prev_last,
                record.prev_last_foreign
            ),
            (1.0, 2.0, 1.5, 0.5)
        );
    }
}
