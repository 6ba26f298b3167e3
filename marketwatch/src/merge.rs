//! Field merge policies applied when a [`NormalizedUpdate`](crate::tick::NormalizedUpdate)
//! mutates a [`QuoteRecord`](crate::record::QuoteRecord).
//!
//! Each tick stream has its own table. Supporting a new field is a table edit.

use crate::{exchange::TickStream, record::QuoteField};
use serde::{Deserialize, Serialize};

/// How a candidate value from an update is merged into a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum MergePolicy {
    /// Take any value the update carries.
    OverwriteAlways,
    /// Take the update's value only when it is non-zero (sticky field).
    OverwriteIfNonZero,
    /// Only fill a field that is still unset; once populated it is never replaced.
    NeverPostInitial,
}

impl MergePolicy {
    /// Merge `candidate` into `current`. `None` always leaves `current` intact.
    pub fn merge(self, current: &mut f64, candidate: Option<f64>) {
        let Some(value) = candidate.filter(|value| value.is_finite()) else {
            return;
        };

        match self {
            MergePolicy::OverwriteAlways => *current = value,
            MergePolicy::OverwriteIfNonZero if value != 0.0 => *current = value,
            MergePolicy::NeverPostInitial if *current == 0.0 && value != 0.0 => *current = value,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRule {
    pub field: QuoteField,
    pub policy: MergePolicy,
}

const fn rule(field: QuoteField, policy: MergePolicy) -> MergeRule {
    MergeRule { field, policy }
}

/// Direct ticks report session open/close themselves; zeros mean "not sent".
pub const DIRECT_MERGE_POLICY: &[MergeRule] = &[
    rule(QuoteField::Bid, MergePolicy::OverwriteAlways),
    rule(QuoteField::Ask, MergePolicy::OverwriteAlways),
    rule(QuoteField::Last, MergePolicy::OverwriteAlways),
    rule(QuoteField::ChangeAbs, MergePolicy::OverwriteAlways),
    rule(QuoteField::High, MergePolicy::OverwriteAlways),
    rule(QuoteField::Low, MergePolicy::OverwriteAlways),
    rule(QuoteField::OpenInterest, MergePolicy::OverwriteAlways),
    rule(QuoteField::Volume, MergePolicy::OverwriteAlways),
    rule(QuoteField::Open, MergePolicy::OverwriteIfNonZero),
    rule(QuoteField::Close, MergePolicy::OverwriteIfNonZero),
];

/// Order book ticks carry no session reference prices: open/close come from the
/// snapshot seed and the foreign close is filled once from `close / rate`.
pub const ORDER_BOOK_MERGE_POLICY: &[MergeRule] = &[
    rule(QuoteField::Bid, MergePolicy::OverwriteAlways),
    rule(QuoteField::Ask, MergePolicy::OverwriteAlways),
    rule(QuoteField::Last, MergePolicy::OverwriteAlways),
    rule(QuoteField::BidForeign, MergePolicy::OverwriteAlways),
    rule(QuoteField::AskForeign, MergePolicy::OverwriteAlways),
    rule(QuoteField::LastForeign, MergePolicy::OverwriteAlways),
    rule(QuoteField::ChangeAbs, MergePolicy::OverwriteAlways),
    rule(QuoteField::ChangeAbsForeign, MergePolicy::OverwriteAlways),
    rule(QuoteField::High, MergePolicy::OverwriteAlways),
    rule(QuoteField::Low, MergePolicy::OverwriteAlways),
    rule(QuoteField::OpenInterest, MergePolicy::OverwriteAlways),
    rule(QuoteField::Volume, MergePolicy::OverwriteAlways),
    rule(QuoteField::Open, MergePolicy::NeverPostInitial),
    rule(QuoteField::Close, MergePolicy::NeverPostInitial),
    rule(QuoteField::CloseForeign, MergePolicy::NeverPostInitial),
];

pub fn merge_policy(stream: TickStream) -> &'static [MergeRule] {
    match stream {
        TickStream::Direct => DIRECT_MERGE_POLICY,
        TickStream::OrderBook => ORDER_BOOK_MERGE_POLICY,
    }
}

/// Fields compared for no-op suppression, when the update carries them.
pub const OBSERVED_FIELDS: [QuoteField; 6] = [
    QuoteField::Bid,
    QuoteField::Ask,
    QuoteField::Last,
    QuoteField::BidForeign,
    QuoteField::AskForeign,
    QuoteField::LastForeign,
];
