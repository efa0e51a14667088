//! Profit targets set by the user.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Monthly profit goal and the weekly/daily targets derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Targets {
    pub monthly_target: Decimal,
    pub weekly_target: Decimal,
    pub daily_target: Decimal,
    #[serde(default)]
    pub auto_adjust: bool,
}

impl Targets {
    /// Targets derived from a monthly goal: weekly = monthly / 4, daily = monthly / 30.
    pub fn monthly(monthly_target: Decimal) -> Self {
        Self {
            monthly_target,
            weekly_target: monthly_target / dec!(4),
            daily_target: monthly_target / dec!(30),
            auto_adjust: false,
        }
    }

    /// Realised profit as a fraction of the monthly target.
    ///
    /// A zero or negative target yields zero progress instead of dividing.
    /// `None` when the ratio overflows.
    pub fn progress(&self, monthly_performance: Decimal) -> Option<Decimal> {
        ratio(monthly_performance, self.monthly_target)
    }

    /// Weekly profit as a fraction of the weekly target.
    pub fn weekly_progress(&self, weekly_performance: Decimal) -> Option<Decimal> {
        ratio(weekly_performance, self.weekly_target)
    }
}

fn ratio(performance: Decimal, target: Decimal) -> Option<Decimal> {
    if target <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }
    performance.checked_div(target)
}
