use crate::exchange::ExchangeGroup;
use fnv::FnvHashMap;
use indexmap::IndexSet;
use smol_str::SmolStr;

/// Instruments the user has selected, per tab, in selection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchlistSelection {
    tabs: FnvHashMap<ExchangeGroup, IndexSet<SmolStr>>,
}

impl WatchlistSelection {
    /// Returns `false` if `token` was already selected.
    pub fn add(&mut self, tab: ExchangeGroup, token: impl Into<SmolStr>) -> bool {
        self.tabs.entry(tab).or_default().insert(token.into())
    }

    /// Returns `false` if `token` was not selected.
    pub fn remove(&mut self, tab: ExchangeGroup, token: &str) -> bool {
        self.tabs
            .get_mut(&tab)
            .is_some_and(|tokens| tokens.shift_remove(token))
    }

    pub fn contains(&self, tab: ExchangeGroup, token: &str) -> bool {
        self.tabs
            .get(&tab)
            .is_some_and(|tokens| tokens.contains(token))
    }

    pub fn tokens(&self, tab: ExchangeGroup) -> impl Iterator<Item = &SmolStr> {
        self.tabs.get(&tab).into_iter().flatten()
    }

    pub fn len(&self, tab: ExchangeGroup) -> usize {
        self.tabs.get(&tab).map_or(0, IndexSet::len)
    }

    /// Forget every selection for `tab`.
    pub fn clear_tab(&mut self, tab: ExchangeGroup) {
        self.tabs.remove(&tab);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watchlist_selection() {
        let mut selection = WatchlistSelection::default();

        assert!(selection.add(ExchangeGroup::Mcx, "256265"));
        assert!(selection.add(ExchangeGroup::Mcx, "1001"));
        assert!(!selection.add(ExchangeGroup::Mcx, "256265"));
        assert!(selection.add(ExchangeGroup::Crypto, "BTC"));

        assert!(selection.contains(ExchangeGroup::Mcx, "256265"));
        assert!(!selection.contains(ExchangeGroup::Nse, "256265"));
        assert_eq!(selection.len(ExchangeGroup::Mcx), 2);

        let tokens = selection
            .tokens(ExchangeGroup::Mcx)
            .map(SmolStr::as_str)
            .collect::<Vec<_>>();
        assert_eq!(tokens, vec!["256265", "1001"]);

        assert!(selection.remove(ExchangeGroup::Mcx, "256265"));
        assert!(!selection.remove(ExchangeGroup::Mcx, "256265"));
        assert!(!selection.remove(ExchangeGroup::Forex, "EURUSD"));

        selection.clear_tab(ExchangeGroup::Crypto);
        assert_eq!(selection.len(ExchangeGroup::Crypto), 0);
        assert_eq!(selection.tokens(ExchangeGroup::Crypto).count(), 0);
    }
}
