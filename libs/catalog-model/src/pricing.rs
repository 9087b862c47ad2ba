//! Price triples
//!
//! Prices are exact decimals stored with two fractional digits. `70`, `70.0`
//! and `70.00` are the same price once normalized.

use errors::Violation;
use rust_decimal::Decimal;
use serde::Serialize;

/// Fractional digits kept for every price
pub const PRICE_SCALE: u32 = 2;

/// Buy range and resale target for one product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pricing {
    pub buy_min: Decimal,
    pub buy_max: Decimal,
    pub sell_target: Decimal,
}

impl Pricing {
    /// Build a triple, normalizing every value to two decimal places
    pub fn new(buy_min: Decimal, buy_max: Decimal, sell_target: Decimal) -> Self {
        Self {
            buy_min: normalize(buy_min),
            buy_max: normalize(buy_max),
            sell_target: normalize(sell_target),
        }
    }

    /// Ordering rules: `buy_min <= buy_max < sell_target`
    pub fn ordering_violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        if self.buy_min > self.buy_max {
            violations.push(Violation::MinAboveMax {
                buy_min: format_price(self.buy_min),
                buy_max: format_price(self.buy_max),
            });
        }
        if self.buy_max >= self.sell_target {
            violations.push(Violation::MaxNotBelowTarget {
                buy_max: format_price(self.buy_max),
                sell_target: format_price(self.sell_target),
            });
        }
        violations
    }
}

fn normalize(value: Decimal) -> Decimal {
    let mut value = value.round_dp(PRICE_SCALE);
    value.rescale(PRICE_SCALE);
    value
}

/// Whether the value carries significant digits beyond two decimal places
pub fn has_excess_precision(value: Decimal) -> bool {
    value.normalize().scale() > PRICE_SCALE
}

/// Canonical text form, always with two fractional digits
pub fn format_price(value: Decimal) -> String {
    normalize(value).to_string()
}
