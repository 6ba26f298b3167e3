use crate::exchange::{ExchangeGroup, TickStream};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors generated in `marketwatch`.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum MarketWatchError {
    #[error("tab not found: {0}")]
    TabNotFound(ExchangeGroup),

    #[error("tab worker closed: {0}")]
    TabClosed(ExchangeGroup),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid snapshot seed: {0}")]
    Seed(String),

    #[error("TickError: {0}")]
    Tick(#[from] TickError),

    #[error("RateError: {0}")]
    Rate(#[from] RateError),
}

/// Reason a raw tick message was dropped before reaching reconciliation.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum TickError {
    #[error("direct tick missing instrument token")]
    MissingInstrumentToken,

    #[error("order book tick missing symbol name")]
    MissingSymbolName,

    #[error("unrecognised tick message shape")]
    Unrecognised,

    #[error("failed to deserialise tick: {0}")]
    Deserialise(String),

    #[error("{stream} tick routed to {tab} tab")]
    WrongStream {
        tab: ExchangeGroup,
        stream: TickStream,
    },
}

impl TickError {
    /// Determine if the tick itself was malformed, as opposed to misrouted.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_malformed(&self) -> bool {
        match self {
            TickError::WrongStream { .. } => false,
            _ => true,
        }
    }
}

impl From<serde_json::Error> for TickError {
    fn from(value: serde_json::Error) -> Self {
        Self::Deserialise(value.to_string())
    }
}

/// Errors produced while refreshing the USD to local-currency rate.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Error)]
pub enum RateError {
    #[error("rate request failed: {0}")]
    Request(String),

    #[error("rate request returned error status: {0}")]
    Status(String),

    #[error("failed to parse rate response: {0}")]
    Parse(String),

    #[error("rate response missing local currency rate")]
    MissingRate,

    #[error("rate must be finite and positive, got: {0}")]
    InvalidRate(String),
}

impl From<reqwest::Error> for RateError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_status() {
            Self::Status(value.to_string())
        } else if value.is_decode() {
            Self::Parse(value.to_string())
        } else {
            Self::Request(value.to_string())
        }
    }
}
