use crate::record::QuoteRecord;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Percentage change from the session close, rounded to 2 decimal places.
///
/// When the close is unknown the value is `0.0` and `undefined` is set, so
/// callers never display a made-up percentage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize, Display)]
#[display("{value:.2}")]
pub struct PercentChange {
    pub value: f64,
    pub undefined: bool,
}

impl PercentChange {
    pub const UNDEFINED: Self = Self {
        value: 0.0,
        undefined: true,
    };

    pub fn is_defined(&self) -> bool {
        !self.undefined
    }
}

/// Direction of the latest price move, used for delta colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize, Display)]
pub enum PriceDirection {
    #[display("up")]
    Up,
    #[display("down")]
    Down,
    #[default]
    #[display("flat")]
    Flat,
}

impl PriceDirection {
    /// An unknown (zero) price on either side is [`PriceDirection::Flat`].
    pub fn between(current: f64, previous: f64) -> Self {
        if current == 0.0 || previous == 0.0 {
            return Self::Flat;
        }

        match current.partial_cmp(&previous) {
            Some(std::cmp::Ordering::Greater) => Self::Up,
            Some(std::cmp::Ordering::Less) => Self::Down,
            _ => Self::Flat,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeCalculator;

impl ChangeCalculator {
    pub fn percent_change(last: f64, close: f64) -> PercentChange {
        if !(last.is_finite() && close.is_finite()) || close <= 0.0 || last <= 0.0 {
            return PercentChange::UNDEFINED;
        }

        let value = round_2dp((last - close) / close * 100.0);
        if !value.is_finite() {
            return PercentChange::UNDEFINED;
        }

        PercentChange {
            value,
            undefined: false,
        }
    }

    /// Tick to tick delta, `0.0` while the previous price is unknown.
    pub fn absolute_change(last: f64, prev_last: f64) -> f64 {
        if prev_last > 0.0 && last.is_finite() {
            last - prev_last
        } else {
            0.0
        }
    }

    /// Close based percentage for a record.
    ///
    /// FX-class records are measured in their foreign currency, taking the close
    /// from `close / rate` when the foreign close is not yet known.
    pub fn record_percent_change(record: &QuoteRecord, rate: f64) -> PercentChange {
        if !record.exchange_group.is_fx() {
            return Self::percent_change(record.last, record.close);
        }

        let close_foreign = if record.close_foreign > 0.0 {
            record.close_foreign
        } else if rate > 0.0 {
            record.close / rate
        } else {
            0.0
        };

        Self::percent_change(record.last_foreign, close_foreign)
    }

    /// Reported change when the feed supplies one, otherwise the tick to tick delta.
    pub fn display_change(record: &QuoteRecord) -> f64 {
        let (change, last, prev_last) = if record.exchange_group.is_fx() {
            (
                record.change_abs_foreign,
                record.last_foreign,
                record.prev_last_foreign,
            )
        } else {
            (record.change_abs, record.last, record.prev_last)
        };

        if change != 0.0 && change.is_finite() {
            change
        } else {
            Self::absolute_change(last, prev_last)
        }
    }
}

fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ExchangeGroup;
    use chrono::DateTime;

    fn record(group: ExchangeGroup) -> QuoteRecord {
        QuoteRecord::new(
            "1",
            "X",
            group,
            1,
            DateTime::from_timestamp_millis(0).unwrap(),
        )
    }

    #[test]
    fn test_percent_change() {
        struct TestCase {
            last: f64,
            close: f64,
            expected: PercentChange,
        }

        let defined = |value| PercentChange {
            value,
            undefined: false,
        };

        let tests = vec![
            TestCase {
                // TC0: simple rise
                last: 110.0,
                close: 100.0,
                expected: defined(10.0),
            },
            TestCase {
                // TC1: fall rounded to 2dp
                last: 99.333,
                close: 100.0,
                expected: defined(-0.67),
            },
            TestCase {
                // TC2: unknown close
                last: 110.0,
                close: 0.0,
                expected: PercentChange::UNDEFINED,
            },
            TestCase {
                // TC3: unknown last
                last: 0.0,
                close: 100.0,
                expected: PercentChange::UNDEFINED,
            },
            TestCase {
                // TC4: non-finite input
                last: f64::INFINITY,
                close: 100.0,
                expected: PercentChange::UNDEFINED,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = ChangeCalculator::percent_change(test.last, test.close);
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_percent_change_display() {
        assert_eq!(ChangeCalculator::percent_change(110.0, 100.0).to_string(), "10.00");
        assert_eq!(PercentChange::UNDEFINED.to_string(), "0.00");
    }

    #[test]
    fn test_percent_change_ignores_change_abs_without_close() {
        let mut record = record(ExchangeGroup::Mcx);
        record.last = 110.0;
        record.change_abs = 25.0;

        let actual = ChangeCalculator::record_percent_change(&record, 88.0);
        assert_eq!(actual, PercentChange::UNDEFINED);
    }

    #[test]
    fn test_record_percent_change_fx_uses_foreign_close() {
        struct TestCase {
            close: f64,
            close_foreign: f64,
            expected: f64,
        }

        let tests = vec![
            TestCase {
                // TC0: foreign close known
                close: 0.0,
                close_foreign: 100.0,
                expected: 5.0,
            },
            TestCase {
                // TC1: foreign close derived from close / rate
                close: 8800.0,
                close_foreign: 0.0,
                expected: 5.0,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let mut record = record(ExchangeGroup::Crypto);
            record.last_foreign = 105.0;
            record.last = 105.0 * 88.0;
            record.close = test.close;
            record.close_foreign = test.close_foreign;

            let actual = ChangeCalculator::record_percent_change(&record, 88.0);
            assert_eq!(actual.value, test.expected, "TC{} failed", index);
            assert!(actual.is_defined(), "TC{} failed", index);
        }
    }

    #[test]
    fn test_absolute_change() {
        assert_eq!(ChangeCalculator::absolute_change(105.0, 100.0), 5.0);
        assert_eq!(ChangeCalculator::absolute_change(95.0, 100.0), -5.0);
        assert_eq!(ChangeCalculator::absolute_change(105.0, 0.0), 0.0);
    }

    #[test]
    fn test_display_change() {
        let mut local = record(ExchangeGroup::Nse);
        local.last = 105.0;
        local.prev_last = 100.0;
        assert_eq!(ChangeCalculator::display_change(&local), 5.0);

        local.change_abs = -12.5;
        assert_eq!(ChangeCalculator::display_change(&local), -12.5);

        let mut fx = record(ExchangeGroup::Forex);
        fx.last_foreign = 1.25;
        fx.prev_last_foreign = 1.5;
        fx.change_abs = 3.0;
        assert_eq!(ChangeCalculator::display_change(&fx), -0.25);
    }

    #[test]
    fn test_price_direction_between() {
        assert_eq!(PriceDirection::between(101.0, 100.0), PriceDirection::Up);
        assert_eq!(PriceDirection::between(99.0, 100.0), PriceDirection::Down);
        assert_eq!(PriceDirection::between(100.0, 100.0), PriceDirection::Flat);
        assert_eq!(PriceDirection::between(100.0, 0.0), PriceDirection::Flat);
    }
}
