use crate::{
    record::QuoteRecord,
    tick::{Identity, symbol_prefix},
};
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::sync::Arc;

/// One tab's [`QuoteRecord`]s keyed by token, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteStore {
    records: IndexMap<SmolStr, QuoteRecord>,
}

impl QuoteStore {
    /// Insert `record`, replacing any record with the same token in place.
    ///
    /// Returns the replaced record.
    pub fn insert(&mut self, record: QuoteRecord) -> Option<QuoteRecord> {
        self.records.insert(record.token.clone(), record)
    }

    pub fn remove(&mut self, token: &str) -> Option<QuoteRecord> {
        self.records.shift_remove(token)
    }

    pub fn get(&self, token: &str) -> Option<&QuoteRecord> {
        self.records.get(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.records.contains_key(token)
    }

    /// Find the record an update is addressed to.
    ///
    /// Name prefixes match the first record in insertion order whose display
    /// name has that prefix.
    pub fn resolve_mut(&mut self, identity: &Identity) -> Option<&mut QuoteRecord> {
        match identity {
            Identity::Token(token) => self.records.get_mut(token.as_str()),
            Identity::NamePrefix(prefix) => self
                .records
                .values_mut()
                .find(|record| symbol_prefix(&record.display_name) == prefix.as_str()),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &QuoteRecord> {
        self.records.values()
    }

    /// Owned copy of the current records, in insertion order.
    pub fn snapshot(&self) -> Arc<[QuoteRecord]> {
        self.records.values().cloned().collect()
    }

    /// Records whose display name contains `query`, ignoring case.
    pub fn filter<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a QuoteRecord> + 'a {
        let query = query.trim().to_lowercase();
        self.records
            .values()
            .filter(move |record| record.display_name.to_lowercase().contains(&query))
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
