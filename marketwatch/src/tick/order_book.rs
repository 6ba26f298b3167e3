use super::{Identity, NormalizedUpdate};
use crate::{de::de_f64_or_zero, error::TickError, exchange::TickStream};
use serde::{Deserialize, Serialize};

/// ### Raw Payload Examples
/// Foreign-currency order book tick, delivered inside a `{"type": "tick", "data": ...}`
/// envelope:
///```json
/// {
///     "Symbol": "BTCUSD",
///     "BestBid": { "Price": 50000.0, "Volume": 1.2 },
///     "BestAsk": { "Price": 50010.0, "Volume": 0.8 },
///     "Bids": [{ "Price": 50000.0, "Volume": 1.2 }, { "Price": 49990.0, "Volume": 3.0 }],
///     "Asks": [{ "Price": 50010.0, "Volume": 0.8 }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderBookTick {
    #[serde(alias = "symbolName", alias = "SymbolName", default)]
    pub symbol: Option<String>,

    #[serde(alias = "bestBid", default)]
    pub best_bid: Option<BookLevel>,

    #[serde(alias = "bestAsk", default)]
    pub best_ask: Option<BookLevel>,

    #[serde(alias = "bids", default)]
    pub bids: Option<Vec<BookLevel>>,

    #[serde(alias = "asks", default)]
    pub asks: Option<Vec<BookLevel>>,
}

/// One price level. Missing values read as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BookLevel {
    #[serde(alias = "price", default, deserialize_with = "de_f64_or_zero")]
    pub price: f64,

    #[serde(alias = "volume", default, deserialize_with = "de_f64_or_zero")]
    pub volume: f64,
}

/// Extremes and size derived from a single depth snapshot, in the foreign currency.
///
/// `high`/`low` describe only the levels visible in this tick, not the session range.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct DepthSummary {
    /// Highest ask level, or the best ask without depth.
    pub high: f64,
    /// Lowest bid level, or the best bid without depth.
    pub low: f64,
    /// Visible bid plus ask volume.
    pub volume: f64,
}

impl DepthSummary {
    pub fn from_tick(tick: &OrderBookTick) -> Self {
        let bids = tick.bids.as_deref().unwrap_or_default();
        let asks = tick.asks.as_deref().unwrap_or_default();

        let high = if asks.is_empty() {
            best_price(tick.best_ask)
        } else {
            asks.iter().map(|level| level.price).fold(f64::MIN, f64::max)
        };

        let low = if bids.is_empty() {
            best_price(tick.best_bid)
        } else {
            bids.iter().map(|level| level.price).fold(f64::MAX, f64::min)
        };

        let volume = bids.iter().chain(asks).map(|level| level.volume).sum();

        Self { high, low, volume }
    }
}

fn best_price(level: Option<BookLevel>) -> f64 {
    level.map(|level| level.price).unwrap_or(0.0)
}

/// Midpoint of both sides when both are known, otherwise whichever side is known.
pub fn mid_price(bid: f64, ask: f64) -> f64 {
    match (bid != 0.0, ask != 0.0) {
        (true, true) => (bid + ask) / 2.0,
        (true, false) => bid,
        (false, true) => ask,
        (false, false) => 0.0,
    }
}

impl OrderBookTick {
    /// Normalise into a [`NormalizedUpdate`] carrying both foreign and local
    /// values, converting with `rate`.
    pub fn normalise(self, rate: f64) -> Result<NormalizedUpdate, TickError> {
        let symbol = self
            .symbol
            .as_deref()
            .map(str::trim)
            .filter(|symbol| !symbol.is_empty())
            .ok_or(TickError::MissingSymbolName)?;

        let bid_foreign = best_price(self.best_bid);
        let ask_foreign = best_price(self.best_ask);
        let last_foreign = mid_price(bid_foreign, ask_foreign);
        let depth = DepthSummary::from_tick(&self);

        Ok(NormalizedUpdate {
            bid: Some(bid_foreign * rate),
            ask: Some(ask_foreign * rate),
            last: Some(last_foreign * rate),
            bid_foreign: Some(bid_foreign),
            ask_foreign: Some(ask_foreign),
            last_foreign: Some(last_foreign),
            high: Some(depth.high * rate),
            low: Some(depth.low * rate),
            volume: Some(depth.volume),
            ..NormalizedUpdate::new(Identity::from_symbol_name(symbol), TickStream::OrderBook)
        })
    }
}
