//! Exchange groups and the watchlist tabs built from them.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::MarketWatchError;

/// Exchange group an instrument belongs to. Each group is also one watchlist tab.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExchangeGroup {
    #[display("MCX")]
    Mcx,
    #[display("NSE")]
    Nse,
    #[display("OPT")]
    Opt,
    #[display("CRYPTO")]
    Crypto,
    #[display("FOREX")]
    Forex,
    #[display("COMMODITY")]
    Commodity,
}

/// Wire protocol feeding a tab. A tab is fed by exactly one of these.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum TickStream {
    /// Local-currency ticks carrying ready bid/ask/last (MCX, NSE, OPT).
    #[display("direct")]
    Direct,
    /// Foreign-currency best bid/ask plus depth ticks (CRYPTO, FOREX, COMMODITY).
    #[display("order book")]
    OrderBook,
}

impl ExchangeGroup {
    /// All groups in canonical tab order.
    pub const ALL: [ExchangeGroup; 6] = [
        ExchangeGroup::Mcx,
        ExchangeGroup::Nse,
        ExchangeGroup::Opt,
        ExchangeGroup::Crypto,
        ExchangeGroup::Forex,
        ExchangeGroup::Commodity,
    ];

    /// Groups quoted in a foreign currency and converted to local on ingest.
    pub fn is_fx(&self) -> bool {
        matches!(
            self,
            ExchangeGroup::Crypto | ExchangeGroup::Forex | ExchangeGroup::Commodity
        )
    }

    pub fn stream(&self) -> TickStream {
        if self.is_fx() {
            TickStream::OrderBook
        } else {
            TickStream::Direct
        }
    }

    /// Tab heading.
    pub fn label(&self) -> &'static str {
        match self {
            ExchangeGroup::Mcx => "MCX Futures",
            ExchangeGroup::Nse => "NSE Futures",
            ExchangeGroup::Opt => "OPTION",
            ExchangeGroup::Crypto => "Crypto",
            ExchangeGroup::Forex => "Forex",
            ExchangeGroup::Commodity => "Commodity",
        }
    }

    /// Key used by the watchlist persistence endpoints for this group.
    pub fn selection_key(&self) -> &'static str {
        match self {
            ExchangeGroup::Mcx => "mcx",
            ExchangeGroup::Nse => "nse",
            ExchangeGroup::Opt => "cds",
            ExchangeGroup::Crypto => "crypto",
            ExchangeGroup::Forex => "forex",
            ExchangeGroup::Commodity => "commodity",
        }
    }

    /// Exchange name shown next to a symbol. Options trade on NSE.
    pub fn exchange_name(&self) -> &'static str {
        match self {
            ExchangeGroup::Opt => "NSE",
            other => other.as_str(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeGroup::Mcx => "MCX",
            ExchangeGroup::Nse => "NSE",
            ExchangeGroup::Opt => "OPT",
            ExchangeGroup::Crypto => "CRYPTO",
            ExchangeGroup::Forex => "FOREX",
            ExchangeGroup::Commodity => "COMMODITY",
        }
    }
}

impl FromStr for ExchangeGroup {
    type Err = MarketWatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ExchangeGroup::ALL
            .into_iter()
            .find(|group| group.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| MarketWatchError::Config(format!("unknown exchange group: {s}")))
    }
}

/// A watchlist tab as presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TabDescriptor {
    pub group: ExchangeGroup,
    pub label: &'static str,
}

/// Build the enabled tabs in canonical order, ignoring duplicates.
pub fn available_tabs<I>(enabled: I) -> Vec<TabDescriptor>
where
    I: IntoIterator<Item = ExchangeGroup>,
{
    let mut enabled = enabled.into_iter().collect::<Vec<_>>();
    enabled.sort();
    enabled.dedup();
    enabled
        .into_iter()
        .map(|group| TabDescriptor {
            group,
            label: group.label(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_group_from_str() {
        struct TestCase {
            input: &'static str,
            expected: Option<ExchangeGroup>,
        }

        let tests = vec![
            TestCase {
                // TC0: upper case wire name
                input: "MCX",
                expected: Some(ExchangeGroup::Mcx),
            },
            TestCase {
                // TC1: lower case with whitespace
                input: " crypto ",
                expected: Some(ExchangeGroup::Crypto),
            },
            TestCase {
                // TC2: persistence key is not a wire name
                input: "cds",
                expected: None,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.parse::<ExchangeGroup>().ok();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_exchange_group_stream() {
        assert_eq!(ExchangeGroup::Opt.stream(), TickStream::Direct);
        assert_eq!(ExchangeGroup::Forex.stream(), TickStream::OrderBook);
        assert_eq!(ExchangeGroup::Opt.exchange_name(), "NSE");
        assert_eq!(ExchangeGroup::Opt.selection_key(), "cds");
    }

    #[test]
    fn test_exchange_group_serde() {
        let group: ExchangeGroup = serde_json::from_str(r#""COMMODITY""#).unwrap();
        assert_eq!(group, ExchangeGroup::Commodity);
        assert_eq!(serde_json::to_string(&ExchangeGroup::Nse).unwrap(), r#""NSE""#);
    }

    #[test]
    fn test_available_tabs_canonical_order() {
        let tabs = available_tabs([
            ExchangeGroup::Forex,
            ExchangeGroup::Mcx,
            ExchangeGroup::Forex,
        ]);
        let groups = tabs.iter().map(|tab| tab.group).collect::<Vec<_>>();
        assert_eq!(groups, vec![ExchangeGroup::Mcx, ExchangeGroup::Forex]);
        assert_eq!(tabs[0].label, "MCX Futures");
    }
}
