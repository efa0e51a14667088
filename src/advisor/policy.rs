//! Risk policy: the thresholds and limits the rules and combiner use.
//!
//! Rule score deltas are fixed in `rules.rs`.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;
use crate::models::normalize_pair;

/// Fixed risk policy for trade evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    // === Position Limits ===
    /// Maximum share of the portfolio a single trade may put at risk
    pub max_risk_per_trade: Decimal,

    /// Maximum share of the portfolio held in one asset
    pub max_asset_allocation: Decimal,

    /// Fraction of `max_asset_allocation` at which new buys are penalised
    pub allocation_warning_ratio: Decimal,

    /// Portfolio risk exposure above which trades are penalised
    pub high_exposure: f64,

    /// Portfolio risk exposure below which trades get a small bonus
    pub low_exposure: f64,

    // === Asset Rules ===
    /// Asset whose reserve the rules refuse to deplete
    pub protected_asset: String,

    /// Units of the protected asset to keep
    pub reserve_amount: Decimal,

    /// Pairs that get a stability bonus
    pub major_pairs: Vec<String>,

    // === Scoring ===
    /// Starting score of the signal-quality rule
    pub signal_quality_base: Decimal,

    /// Mean score at or above which a trade is approved
    pub approve_threshold: Decimal,

    /// Mean score at or above which the risk label is medium
    pub medium_risk_threshold: Decimal,

    /// Mean score below which a trade is rejected
    pub reject_threshold: Decimal,

    /// Cap on approval confidence
    pub max_approve_confidence: Decimal,

    /// Floor on rejection confidence
    pub min_reject_confidence: Decimal,

    /// Confidence attached to a hold
    pub hold_confidence: Decimal,

    /// Multiplier on approval confidence when sizing (result capped at 1)
    pub sizing_boost: Decimal,

    /// Approvals below this confidence get a reduce-size caveat
    pub full_size_confidence: Decimal,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            // Position limits
            max_risk_per_trade: dec!(0.04),      // 4% per trade
            max_asset_allocation: dec!(0.20),    // 20% per asset
            allocation_warning_ratio: dec!(0.8), // warn at 80% of the cap
            high_exposure: 0.15,
            low_exposure: 0.05,

            // Asset rules
            protected_asset: "XRP".to_string(),
            reserve_amount: dec!(1000),
            major_pairs: vec!["BTC/ZAR".to_string(), "ETH/ZAR".to_string()],

            // Scoring
            signal_quality_base: dec!(0.0),
            approve_threshold: dec!(0.7),
            medium_risk_threshold: dec!(0.5),
            reject_threshold: dec!(0.3),
            max_approve_confidence: dec!(0.9),
            min_reject_confidence: dec!(0.1),
            hold_confidence: dec!(0.5),
            sizing_boost: dec!(1.2),
            full_size_confidence: dec!(0.7),
        }
    }
}

impl RiskPolicy {
    /// Load a policy from a JSON file; missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy file {}", path.display()))?;
        let policy: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid policy JSON in {}", path.display()))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Check that thresholds are ordered and fractions are within range.
    pub fn validate(&self) -> Result<(), EvaluationError> {
        let fraction = |name: &str, value: Decimal| {
            if value < Decimal::ZERO || value > Decimal::ONE {
                Err(EvaluationError::InvalidPolicy {
                    reason: format!("{} must be within [0, 1], got {}", name, value),
                })
            } else {
                Ok(())
            }
        };

        fraction("max_risk_per_trade", self.max_risk_per_trade)?;
        fraction("max_asset_allocation", self.max_asset_allocation)?;
        fraction("allocation_warning_ratio", self.allocation_warning_ratio)?;
        fraction("max_approve_confidence", self.max_approve_confidence)?;
        fraction("min_reject_confidence", self.min_reject_confidence)?;
        fraction("hold_confidence", self.hold_confidence)?;
        fraction("full_size_confidence", self.full_size_confidence)?;

        if self.sizing_boost < Decimal::ZERO {
            return Err(EvaluationError::InvalidPolicy {
                reason: format!("sizing_boost cannot be negative, got {}", self.sizing_boost),
            });
        }

        if self.signal_quality_base < -Decimal::ONE || self.signal_quality_base > Decimal::ONE {
            return Err(EvaluationError::InvalidPolicy {
                reason: format!(
                    "signal_quality_base must be within [-1, 1], got {}",
                    self.signal_quality_base
                ),
            });
        }

        if !(self.reject_threshold <= self.medium_risk_threshold
            && self.medium_risk_threshold <= self.approve_threshold)
        {
            return Err(EvaluationError::InvalidPolicy {
                reason: format!(
                    "thresholds must satisfy reject {} <= medium {} <= approve {}",
                    self.reject_threshold, self.medium_risk_threshold, self.approve_threshold
                ),
            });
        }

        if self.low_exposure > self.high_exposure {
            return Err(EvaluationError::InvalidPolicy {
                reason: format!(
                    "low_exposure {} exceeds high_exposure {}",
                    self.low_exposure, self.high_exposure
                ),
            });
        }

        if self.reserve_amount < Decimal::ZERO {
            return Err(EvaluationError::InvalidPolicy {
                reason: "reserve_amount cannot be negative".to_string(),
            });
        }

        Ok(())
    }

    /// Largest trade value allowed for a portfolio of `total_value`.
    pub fn max_trade_value(&self, total_value: Decimal) -> Decimal {
        total_value * self.max_risk_per_trade
    }

    /// Allocation at which buying more of one asset is penalised.
    pub fn allocation_warning_level(&self) -> Decimal {
        self.max_asset_allocation * self.allocation_warning_ratio
    }

    pub fn is_protected(&self, asset: &str) -> bool {
        self.protected_asset.eq_ignore_ascii_case(asset)
    }

    pub fn is_major_pair(&self, pair: &str) -> bool {
        let pair = normalize_pair(pair);
        self.major_pairs.iter().any(|p| normalize_pair(p) == pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        let policy = RiskPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.max_trade_value(dec!(100000)), dec!(4000));
        assert_eq!(policy.allocation_warning_level(), dec!(0.16));
    }

    #[test]
    fn test_invalid_thresholds() {
        let policy = RiskPolicy {
            approve_threshold: dec!(0.2),
            ..Default::default()
        };
        assert!(matches!(
            policy.validate(),
            Err(EvaluationError::InvalidPolicy { .. })
        ));
    }

    #[test]
    fn test_invalid_confidence_fields() {
        let cases = [
            RiskPolicy {
                hold_confidence: dec!(5),
                ..Default::default()
            },
            RiskPolicy {
                max_approve_confidence: dec!(2),
                ..Default::default()
            },
            RiskPolicy {
                min_reject_confidence: dec!(-1),
                ..Default::default()
            },
            RiskPolicy {
                full_size_confidence: dec!(1.5),
                ..Default::default()
            },
            RiskPolicy {
                sizing_boost: dec!(-3),
                ..Default::default()
            },
            RiskPolicy {
                signal_quality_base: dec!(100),
                ..Default::default()
            },
        ];

        for policy in cases {
            assert!(
                matches!(policy.validate(), Err(EvaluationError::InvalidPolicy { .. })),
                "{:?}",
                policy
            );
        }
    }

    #[test]
    fn test_pair_matching() {
        let policy = RiskPolicy::default();
        assert!(policy.is_major_pair("btc-zar"));
        assert!(policy.is_major_pair("ETH/ZAR"));
        assert!(!policy.is_major_pair("XRP/ZAR"));
        assert!(policy.is_protected("xrp"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let policy: RiskPolicy =
            serde_json::from_str(r#"{"protected_asset": "SOL", "reserve_amount": "50"}"#).unwrap();
        assert_eq!(policy.protected_asset, "SOL");
        assert_eq!(policy.reserve_amount, dec!(50));
        assert_eq!(policy.max_risk_per_trade, dec!(0.04));
    }
}
