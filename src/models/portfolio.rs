//! Portfolio snapshot supplied by the exchange-side provider.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Holding of a single asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetHolding {
    /// Units held
    pub balance: Decimal,

    /// Value of the holding in ZAR
    pub zar_value: Decimal,
}

impl AssetHolding {
    pub fn new(balance: Decimal, zar_value: Decimal) -> Self {
        Self { balance, zar_value }
    }
}

/// Snapshot of holdings and realised performance.
///
/// `total_value_zar` is expected to equal the asset values plus cash; the
/// provider enforces that, not this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStatus {
    pub total_value_zar: Decimal,

    /// Asset symbol -> holding
    #[serde(default)]
    pub assets: BTreeMap<String, AssetHolding>,

    /// Profit this month in ZAR
    #[serde(default)]
    pub monthly_performance: Decimal,

    /// Profit this week in ZAR
    #[serde(default)]
    pub weekly_performance: Decimal,

    /// Fraction of capital currently at risk (0.0 to 1.0)
    #[serde(default)]
    pub risk_exposure: f64,
}

impl PortfolioStatus {
    pub fn new(total_value_zar: Decimal) -> Self {
        Self {
            total_value_zar,
            assets: BTreeMap::new(),
            monthly_performance: Decimal::ZERO,
            weekly_performance: Decimal::ZERO,
            risk_exposure: 0.0,
        }
    }

    pub fn with_asset(mut self, symbol: &str, balance: Decimal, zar_value: Decimal) -> Self {
        self.assets
            .insert(symbol.to_uppercase(), AssetHolding::new(balance, zar_value));
        self
    }

    pub fn with_performance(mut self, monthly: Decimal, weekly: Decimal) -> Self {
        self.monthly_performance = monthly;
        self.weekly_performance = weekly;
        self
    }

    pub fn with_risk_exposure(mut self, exposure: f64) -> Self {
        self.risk_exposure = exposure;
        self
    }

    /// Look up a holding ignoring symbol case.
    pub fn holding(&self, asset: &str) -> Option<&AssetHolding> {
        self.assets.get(asset).or_else(|| {
            self.assets
                .iter()
                .find(|(symbol, _)| symbol.eq_ignore_ascii_case(asset))
                .map(|(_, holding)| holding)
        })
    }

    /// Units held of `asset`, zero if absent.
    pub fn balance_of(&self, asset: &str) -> Decimal {
        self.holding(asset).map_or(Decimal::ZERO, |h| h.balance)
    }

    /// Share of the portfolio held in `asset` (0 for an empty portfolio).
    ///
    /// `None` when the ratio overflows.
    pub fn allocation_of(&self, asset: &str) -> Option<Decimal> {
        if self.total_value_zar <= Decimal::ZERO {
            return Some(Decimal::ZERO);
        }
        match self.holding(asset) {
            Some(h) => h.zar_value.checked_div(self.total_value_zar),
            None => Some(Decimal::ZERO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_allocation() {
        let portfolio = PortfolioStatus::new(dec!(100000))
            .with_asset("BTC", dec!(0.02), dec!(25000))
            .with_asset("xrp", dec!(1500), dec!(15000));

        assert_eq!(portfolio.allocation_of("BTC"), Some(dec!(0.25)));
        assert_eq!(portfolio.allocation_of("XRP"), Some(dec!(0.15)));
        assert_eq!(portfolio.allocation_of("ETH"), Some(Decimal::ZERO));
        assert_eq!(portfolio.balance_of("Xrp"), dec!(1500));
    }

    #[test]
    fn test_empty_portfolio_allocation() {
        let portfolio = PortfolioStatus::new(Decimal::ZERO).with_asset("BTC", dec!(1), dec!(0));
        assert_eq!(portfolio.allocation_of("BTC"), Some(Decimal::ZERO));
    }

    #[test]
    fn test_allocation_overflow() {
        let portfolio = PortfolioStatus::new(dec!(0.0000000000000000000001))
            .with_asset("BTC", dec!(1), dec!(1000000000000));
        assert_eq!(portfolio.allocation_of("BTC"), None);
    }
}
