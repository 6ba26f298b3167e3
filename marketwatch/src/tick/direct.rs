use super::{Identity, NormalizedUpdate};
use crate::{
    de::{de_f64_lenient, de_token},
    error::TickError,
    exchange::TickStream,
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// ### Raw Payload Examples
/// Local-currency exchange tick (numbers may arrive as strings):
///```json
/// {
///     "instrument_token": 256265,
///     "bid": "0",
///     "ask": "24510.5",
///     "last_price": "24508",
///     "change": "-12.5",
///     "high_": "24600",
///     "low_": "24420",
///     "open_": "24500",
///     "close_": "24520.5",
///     "oi": 1830,
///     "volume": 912000
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct DirectTick {
    #[serde(alias = "instrumentToken", default, deserialize_with = "de_token")]
    pub instrument_token: Option<SmolStr>,

    #[serde(default, deserialize_with = "de_f64_lenient")]
    pub bid: Option<f64>,

    #[serde(default, deserialize_with = "de_f64_lenient")]
    pub ask: Option<f64>,

    #[serde(alias = "last_price", default, deserialize_with = "de_f64_lenient")]
    pub last: Option<f64>,

    #[serde(default, deserialize_with = "de_f64_lenient")]
    pub change: Option<f64>,

    #[serde(alias = "high_", default, deserialize_with = "de_f64_lenient")]
    pub high: Option<f64>,

    #[serde(alias = "low_", default, deserialize_with = "de_f64_lenient")]
    pub low: Option<f64>,

    #[serde(alias = "open_", default, deserialize_with = "de_f64_lenient")]
    pub open: Option<f64>,

    #[serde(alias = "close_", default, deserialize_with = "de_f64_lenient")]
    pub close: Option<f64>,

    #[serde(default, deserialize_with = "de_f64_lenient")]
    pub oi: Option<f64>,

    #[serde(default, deserialize_with = "de_f64_lenient")]
    pub volume: Option<f64>,
}

impl DirectTick {
    /// Normalise into a local-currency [`NormalizedUpdate`].
    ///
    /// An absent or zero bid/ask is replaced by the last price. Fields the tick
    /// omits stay `None` so the record keeps its current values.
    pub fn normalise(self) -> Result<NormalizedUpdate, TickError> {
        let token = self
            .instrument_token
            .ok_or(TickError::MissingInstrumentToken)?;

        Ok(NormalizedUpdate {
            bid: or_last(self.bid, self.last),
            ask: or_last(self.ask, self.last),
            last: self.last,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            open_interest: self.oi,
            change_abs: self.change,
            ..NormalizedUpdate::new(Identity::Token(token), TickStream::Direct)
        })
    }
}

fn or_last(side: Option<f64>, last: Option<f64>) -> Option<f64> {
    match side {
        Some(price) if price != 0.0 => Some(price),
        _ => last,
    }
}
