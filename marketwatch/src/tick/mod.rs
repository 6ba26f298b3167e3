//! Raw tick messages and their normalisation into [`NormalizedUpdate`]s.
//!
//! Two wire shapes are recognised:
//! - [`DirectTick`]: local-currency exchange ticks (MCX/NSE/OPT).
//! - [`OrderBookTick`]: foreign-currency best bid/ask plus depth (CRYPTO/FOREX/COMMODITY).
//!
//! Anything else is dropped and counted in [`TickCounters`].

use crate::{
    currency::CurrencyConverter,
    error::TickError,
    exchange::TickStream,
    record::QuoteField,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tracing::debug;

/// Local-currency exchange tick types and normaliser.
pub mod direct;

/// Foreign-currency order book tick types and normaliser.
pub mod order_book;

pub use direct::DirectTick;
pub use order_book::{BookLevel, DepthSummary, OrderBookTick};

/// Delimiter separating a symbol's leading component from its suffix (eg/ expiry).
pub const SYMBOL_DELIMITER: char = '_';

/// Leading component of a symbol name, eg/ `"BTCUSD_PERP"` -> `"BTCUSD"`.
pub fn symbol_prefix(name: &str) -> &str {
    name.split(SYMBOL_DELIMITER).next().unwrap_or(name)
}

/// How a tick identifies its instrument within a tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Identity {
    /// Normalised instrument token, compared exactly.
    Token(SmolStr),
    /// Symbol prefix before the first [`SYMBOL_DELIMITER`], compared case-sensitively.
    NamePrefix(SmolStr),
}

impl Identity {
    pub fn from_symbol_name(name: &str) -> Self {
        Self::NamePrefix(SmolStr::new(symbol_prefix(name)))
    }
}

/// Protocol-independent quote update produced from one raw tick.
///
/// `None` means the source protocol does not carry the field.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NormalizedUpdate {
    pub identity: Identity,
    pub stream: TickStream,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub bid_foreign: Option<f64>,
    pub ask_foreign: Option<f64>,
    pub last_foreign: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub open_interest: Option<f64>,
    pub change_abs: Option<f64>,
}

impl NormalizedUpdate {
    /// Empty update for `identity`, carrying no fields.
    pub fn new(identity: Identity, stream: TickStream) -> Self {
        Self {
            identity,
            stream,
            bid: None,
            ask: None,
            last: None,
            bid_foreign: None,
            ask_foreign: None,
            last_foreign: None,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
            open_interest: None,
            change_abs: None,
        }
    }

    pub fn get(&self, field: QuoteField) -> Option<f64> {
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
            QuoteField::Volume => self.volume,
            QuoteField::OpenInterest => self.open_interest,
            QuoteField::ChangeAbs => self.change_abs,
            QuoteField::ChangeAbsForeign | QuoteField::CloseForeign => None,
        }
    }
}

/// Raw tick message as received from either feed.
#[derive(Debug, Clone, PartialEq)]
pub enum TickMessage {
    Direct(DirectTick),
    OrderBook(OrderBookTick),
    /// Heartbeats, acks and anything else that is not a tick.
    Ignore,
}

impl TickMessage {
    pub fn stream(&self) -> Option<TickStream> {
        match self {
            TickMessage::Direct(_) => Some(TickStream::Direct),
            TickMessage::OrderBook(_) => Some(TickStream::OrderBook),
            TickMessage::Ignore => None,
        }
    }
}

const ORDER_BOOK_KEYS: [&str; 6] = [
    "Symbol",
    "BestBid",
    "BestAsk",
    "symbolName",
    "bestBid",
    "bestAsk",
];

const DIRECT_KEYS: [&str; 4] = ["instrument_token", "instrumentToken", "last_price", "last"];

impl<'de> Deserialize<'de> for TickMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;

        // Order book feed wraps ticks in an envelope: { "type": "tick", "data": {...} }
        if let Some(kind) = value.get("type") {
            return match (kind.as_str(), value.get("data")) {
                (Some("tick"), Some(data)) if data.is_object() => {
                    OrderBookTick::deserialize(data)
                        .map(TickMessage::OrderBook)
                        .map_err(serde::de::Error::custom)
                }
                _ => Ok(TickMessage::Ignore),
            };
        }

        let Some(object) = value.as_object() else {
            return Ok(TickMessage::Ignore);
        };

        if ORDER_BOOK_KEYS.iter().any(|key| object.contains_key(*key)) {
            OrderBookTick::deserialize(&value)
                .map(TickMessage::OrderBook)
                .map_err(serde::de::Error::custom)
        } else if DIRECT_KEYS.iter().any(|key| object.contains_key(*key)) {
            DirectTick::deserialize(&value)
                .map(TickMessage::Direct)
                .map_err(serde::de::Error::custom)
        } else {
            Ok(TickMessage::Ignore)
        }
    }
}

/// Observability counters shared by the normaliser and tab workers.
#[derive(Debug, Default)]
pub struct TickCounters {
    normalised: AtomicU64,
    dropped: AtomicU64,
    mutated: AtomicU64,
    suppressed: AtomicU64,
}

/// Point in time copy of [`TickCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TickCountersSnapshot {
    pub normalised: u64,
    pub dropped: u64,
    pub mutated: u64,
    pub suppressed: u64,
}

impl TickCounters {
    pub fn record_normalised(&self) {
        self.normalised.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one reconciliation.
    pub fn record_applied(&self, changed: bool) {
        if changed {
            self.mutated.fetch_add(1, Ordering::Relaxed);
        } else {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TickCountersSnapshot {
        TickCountersSnapshot {
            normalised: self.normalised.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            mutated: self.mutated.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
        }
    }
}

/// Maps raw ticks into [`NormalizedUpdate`]s, converting foreign prices with
/// the rate current at normalisation time.
#[derive(Debug, Clone)]
pub struct TickNormalizer {
    converter: Arc<CurrencyConverter>,
    counters: Arc<TickCounters>,
}

impl TickNormalizer {
    pub fn new(converter: Arc<CurrencyConverter>, counters: Arc<TickCounters>) -> Self {
        Self {
            converter,
            counters,
        }
    }

    pub fn counters(&self) -> &Arc<TickCounters> {
        &self.counters
    }

    /// Parse and normalise a raw JSON text frame.
    pub fn normalise_str(&self, raw: &str) -> Result<NormalizedUpdate, TickError> {
        match serde_json::from_str::<TickMessage>(raw) {
            Ok(message) => self.normalise(message),
            Err(error) => self.drop_tick(TickError::from(error)),
        }
    }

    pub fn normalise(&self, message: TickMessage) -> Result<NormalizedUpdate, TickError> {
        let result = match message {
            TickMessage::Direct(tick) => tick.normalise(),
            TickMessage::OrderBook(tick) => tick.normalise(self.converter.rate()),
            TickMessage::Ignore => Err(TickError::Unrecognised),
        };

        match result {
            Ok(update) => {
                self.counters.record_normalised();
                Ok(update)
            }
            Err(error) => self.drop_tick(error),
        }
    }

    fn drop_tick(&self, error: TickError) -> Result<NormalizedUpdate, TickError> {
        self.counters.record_dropped();
        debug!(%error, dropped = self.counters.dropped(), "dropping tick");
        Err(error)
    }
}
