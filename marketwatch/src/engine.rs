//! Reconciliation of [`NormalizedUpdate`]s into per-tab [`QuoteStore`]s.

use crate::{
    change::ChangeCalculator,
    currency::CurrencyConverter,
    de::normalise_token,
    error::{MarketWatchError, TickError},
    exchange::{ExchangeGroup, TickStream},
    merge::{OBSERVED_FIELDS, merge_policy},
    record::{QuoteField, QuoteRecord, QuoteSeed},
    selection::WatchlistSelection,
    store::QuoteStore,
    tick::NormalizedUpdate,
};
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use smol_str::SmolStr;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Merge `update` into the record it addresses, returning `true` if the
    /// record was mutated.
    ///
    /// An update whose observed quote fields all equal the record's current
    /// values leaves the record untouched, including its `prev_*` fields and
    /// `last_update_at`. Re-applying the same update is therefore a no-op.
    pub fn apply(
        store: &mut QuoteStore,
        update: &NormalizedUpdate,
        rate: f64,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(record) = store.resolve_mut(&update.identity) else {
            return false;
        };

        if Self::is_noop(record, update) {
            return false;
        }

        let mut next = record.clone();
        next.snapshot_prev();

        for rule in merge_policy(update.stream) {
            let candidate = Self::candidate(rule.field, update, record, &next, rate);
            rule.policy.merge(next.field_mut(rule.field), candidate);
        }

        next.last_update_at = now;
        *record = next;
        true
    }

    fn is_noop(record: &QuoteRecord, update: &NormalizedUpdate) -> bool {
        OBSERVED_FIELDS.iter().all(|field| {
            update
                .get(*field)
                .filter(|value| value.is_finite())
                .is_none_or(|value| value == record.get(*field))
        })
    }

    /// Candidate value for `field`.
    ///
    /// `current` is the record before this update, `next` the partially merged
    /// record (fields earlier in the policy table are already merged).
    fn candidate(
        field: QuoteField,
        update: &NormalizedUpdate,
        current: &QuoteRecord,
        next: &QuoteRecord,
        rate: f64,
    ) -> Option<f64> {
        match (update.stream, field) {
            // Order book ticks carry no change, derive it tick to tick
            (TickStream::OrderBook, QuoteField::ChangeAbs) => update
                .last
                .map(|last| ChangeCalculator::absolute_change(last, current.last)),
            (TickStream::OrderBook, QuoteField::ChangeAbsForeign) => update
                .last_foreign
                .map(|last| ChangeCalculator::absolute_change(last, current.last_foreign)),
            (_, QuoteField::CloseForeign) => {
                (next.close > 0.0 && rate > 0.0).then(|| next.close / rate)
            }
            _ => update.get(field),
        }
    }
}

/// Explicitly owned reconciliation state: the per-tab stores, the selection
/// and the conversion rate.
#[derive(Debug, Clone)]
pub struct EngineState {
    stores: FnvHashMap<ExchangeGroup, QuoteStore>,
    selection: WatchlistSelection,
    converter: Arc<CurrencyConverter>,
}

impl EngineState {
    pub fn new(converter: Arc<CurrencyConverter>) -> Self {
        Self {
            stores: FnvHashMap::default(),
            selection: WatchlistSelection::default(),
            converter,
        }
    }

    /// Open an empty `tab`. Opening an already open tab keeps its records.
    pub fn open_tab(&mut self, tab: ExchangeGroup) {
        self.stores.entry(tab).or_default();
    }

    /// Tear down `tab`, dropping its records and selection.
    pub fn close_tab(&mut self, tab: ExchangeGroup) -> bool {
        self.selection.clear_tab(tab);
        self.stores.remove(&tab).is_some()
    }

    pub fn is_open(&self, tab: ExchangeGroup) -> bool {
        self.stores.contains_key(&tab)
    }

    pub fn tabs(&self) -> impl Iterator<Item = ExchangeGroup> + '_ {
        self.stores.keys().copied()
    }

    /// Select an instrument, seeding its record from a snapshot row.
    ///
    /// Returns `false` if the instrument was already selected, in which case the
    /// existing record is kept.
    pub fn add(
        &mut self,
        tab: ExchangeGroup,
        seed: QuoteSeed,
        now: DateTime<Utc>,
    ) -> Result<bool, MarketWatchError> {
        let record = QuoteRecord::from_seed(seed, tab, self.converter.rate(), now)?;
        self.add_record(tab, record)
    }

    /// Select an already built record. Its token is canonicalised first.
    pub fn add_record(
        &mut self,
        tab: ExchangeGroup,
        mut record: QuoteRecord,
    ) -> Result<bool, MarketWatchError> {
        record.token =
            normalise_token(&record.token).ok_or(TickError::MissingInstrumentToken)?;

        let store = self
            .stores
            .get_mut(&tab)
            .ok_or(MarketWatchError::TabNotFound(tab))?;

        if !self.selection.add(tab, record.token.clone()) {
            return Ok(false);
        }

        debug!(%tab, token = %record.token, "instrument selected");
        store.insert(record);
        Ok(true)
    }

    /// Deselect an instrument and delete its record.
    pub fn remove(&mut self, tab: ExchangeGroup, token: &str) -> bool {
        let Some(token) = normalise_token(token) else {
            return false;
        };

        let selected = self.selection.remove(tab, &token);
        let removed = self
            .stores
            .get_mut(&tab)
            .and_then(|store| store.remove(&token))
            .is_some();

        if selected || removed {
            debug!(%tab, %token, "instrument deselected");
        }

        selected || removed
    }

    pub fn contains(&self, tab: ExchangeGroup, token: &str) -> bool {
        normalise_token(token).is_some_and(|token| self.selection.contains(tab, &token))
    }

    pub fn selected(&self, tab: ExchangeGroup) -> Vec<SmolStr> {
        self.selection.tokens(tab).cloned().collect()
    }

    pub fn apply(
        &mut self,
        tab: ExchangeGroup,
        update: &NormalizedUpdate,
    ) -> Result<bool, MarketWatchError> {
        self.apply_at(tab, update, Utc::now())
    }

    /// [`Self::apply`] with an explicit mutation time.
    pub fn apply_at(
        &mut self,
        tab: ExchangeGroup,
        update: &NormalizedUpdate,
        now: DateTime<Utc>,
    ) -> Result<bool, MarketWatchError> {
        if tab.stream() != update.stream {
            return Err(TickError::WrongStream {
                tab,
                stream: update.stream,
            }
            .into());
        }

        let store = self
            .stores
            .get_mut(&tab)
            .ok_or(MarketWatchError::TabNotFound(tab))?;

        Ok(ReconciliationEngine::apply(
            store,
            update,
            self.converter.rate(),
            now,
        ))
    }

    pub fn store(&self, tab: ExchangeGroup) -> Option<&QuoteStore> {
        self.stores.get(&tab)
    }

    /// Current records of `tab` in insertion order, empty if the tab is closed.
    pub fn records(&self, tab: ExchangeGroup) -> Arc<[QuoteRecord]> {
        self.stores
            .get(&tab)
            .map(QuoteStore::snapshot)
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub fn converter(&self) -> &Arc<CurrencyConverter> {
        &self.converter
    }
}
