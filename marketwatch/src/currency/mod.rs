//! USD to local-currency conversion for foreign-quoted instruments.
//!
//! [`CurrencyConverter`] holds the latest known rate. Readers always get a
//! complete [`RateSnapshot`]; a refresh task swaps in new values without ever
//! blocking tick processing.

use crate::error::RateError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Periodic rate refresh task and rate providers.
pub mod refresh;

/// Rate used until the first successful refresh.
pub const DEFAULT_USD_RATE: f64 = 88.65;

/// Local currency the rate is quoted in.
pub const DEFAULT_LOCAL_CURRENCY: &str = "INR";

/// Where the current rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum RateSource {
    Fallback,
    Provider,
}

/// Self-consistent view of the current rate.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RateSnapshot {
    pub rate: f64,
    pub source: RateSource,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct CurrencyConverter {
    latest: RwLock<RateSnapshot>,
}

impl CurrencyConverter {
    /// Construct a converter seeded with `fallback`, or [`DEFAULT_USD_RATE`] if
    /// `fallback` is not a usable rate.
    pub fn new(fallback: f64) -> Self {
        let rate = if is_valid_rate(fallback) {
            fallback
        } else {
            DEFAULT_USD_RATE
        };

        Self {
            latest: RwLock::new(RateSnapshot {
                rate,
                source: RateSource::Fallback,
                updated_at: None,
            }),
        }
    }

    pub fn rate(&self) -> f64 {
        self.latest.read().rate
    }

    pub fn snapshot(&self) -> RateSnapshot {
        *self.latest.read()
    }

    /// Replace the current rate. Invalid rates are rejected and the previous
    /// value is kept.
    pub fn update(&self, rate: f64, time: DateTime<Utc>) -> Result<(), RateError> {
        if !is_valid_rate(rate) {
            return Err(RateError::InvalidRate(rate.to_string()));
        }

        *self.latest.write() = RateSnapshot {
            rate,
            source: RateSource::Provider,
            updated_at: Some(time),
        };
        Ok(())
    }

    pub fn to_local(&self, foreign: f64) -> f64 {
        foreign * self.rate()
    }
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        Self::new(DEFAULT_USD_RATE)
    }
}

fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// Exchange rate API payload, eg/ `{ "base": "USD", "rates": { "INR": 88.1 } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct RateResponse {
    #[serde(default)]
    pub rates: HashMap<String, Value>,
}

impl RateResponse {
    pub fn rate_for(&self, currency: &str) -> Result<f64, RateError> {
        let rate = self
            .rates
            .get(currency)
            .ok_or(RateError::MissingRate)
            .map(crate::de::f64_from_value)?
            .ok_or(RateError::MissingRate)?;

        if is_valid_rate(rate) {
            Ok(rate)
        } else {
            Err(RateError::InvalidRate(rate.to_string()))
        }
    }
}
