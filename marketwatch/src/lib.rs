//! # MarketWatch
//! Real-time quote state for a multi-asset watchlist.
//!
//! Raw ticks from two upstream protocols are normalised into a single
//! [`NormalizedUpdate`](tick::NormalizedUpdate) shape and reconciled into
//! per-tab [`QuoteStore`](store::QuoteStore)s under no-op suppression and
//! sticky-field rules:
//! - Direct ticks (MCX, NSE, OPT) carry local-currency bid/ask/last.
//! - Order book ticks (CRYPTO, FOREX, COMMODITY) carry foreign-currency depth and
//!   are converted with the latest USD rate at normalisation time.
//!
//! Each tab is owned by a single worker task (see [`worker`]), so reconciliation
//! and selection changes for one tab never race.
//!
//! ## Example
//! ```rust
//! use marketwatch::{
//!     currency::CurrencyConverter,
//!     engine::EngineState,
//!     exchange::ExchangeGroup,
//!     record::QuoteRecord,
//!     tick::{TickCounters, TickNormalizer},
//! };
//! use chrono::Utc;
//! use std::sync::Arc;
//!
//! let converter = Arc::new(CurrencyConverter::new(88.0));
//! let normalizer = TickNormalizer::new(Arc::clone(&converter), Arc::new(TickCounters::default()));
//!
//! let mut state = EngineState::new(converter);
//! state.open_tab(ExchangeGroup::Crypto);
//! state
//!     .add_record(
//!         ExchangeGroup::Crypto,
//!         QuoteRecord::new("BTC", "BTC", ExchangeGroup::Crypto, 1, Utc::now()),
//!     )
//!     .unwrap();
//!
//! let raw = r#"{"type": "tick", "data": {"Symbol": "BTC", "BestBid": {"Price": 50000}, "BestAsk": {"Price": 50010}}}"#;
//! let update = normalizer.normalise_str(raw).unwrap();
//!
//! assert!(state.apply(ExchangeGroup::Crypto, &update).unwrap());
//! assert_eq!(state.records(ExchangeGroup::Crypto)[0].last_foreign, 50005.0);
//! ```

/// Close based percentage and tick to tick change calculations.
pub mod change;

/// Environment configuration and snapshot seed files.
pub mod config;

/// USD to local-currency conversion and its periodic refresh.
pub mod currency;

/// Reconciliation of normalised updates into per-tab stores.
pub mod engine;

/// All errors generated in `marketwatch`.
pub mod error;

/// Exchange groups, tick streams and watchlist tabs.
pub mod exchange;

/// WebSocket tick feeds with reconnection.
pub mod feed;

/// Price formatting and display rows.
pub mod format;

/// Per-stream field merge policies.
pub mod merge;

/// [`QuoteRecord`](record::QuoteRecord) and snapshot seed rows.
pub mod record;

/// Per-tab instrument selection.
pub mod selection;

/// Insertion ordered per-tab record store.
pub mod store;

/// Raw tick messages and normalisation.
pub mod tick;

/// Single-writer tab workers and the feed router.
pub mod worker;

/// Lenient numeric and token deserialisers shared by the wire types.
mod de;

pub use engine::{EngineState, ReconciliationEngine};
pub use error::MarketWatchError;
pub use exchange::{ExchangeGroup, TickStream};
pub use record::QuoteRecord;
pub use tick::{Identity, NormalizedUpdate};
pub use worker::{TabHandle, TabRouter, spawn_tab_worker};
