//! Scoring rules: four independent judgements of one trade signal.
//!
//! Each rule starts from a base score and applies additive deltas, recording
//! a reason for every delta. Rules never see each other's output; conflicts
//! are settled by the combiner.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::error::EvaluationError;
use crate::models::{PortfolioStatus, RuleKind, RuleScore, SignalStrength, TradeSignal, Targets};

use super::RiskPolicy;

/// Evaluates the scoring rules against a fixed policy.
pub struct RuleEvaluator<'a> {
    policy: &'a RiskPolicy,
}

impl<'a> RuleEvaluator<'a> {
    pub fn new(policy: &'a RiskPolicy) -> Self {
        Self { policy }
    }

    /// Run all rules in order: performance, signal quality, risk, asset specific.
    ///
    /// Fails if any rule's arithmetic overflows.
    pub fn evaluate_all(
        &self,
        signal: &TradeSignal,
        portfolio: &PortfolioStatus,
        targets: &Targets,
    ) -> Result<Vec<RuleScore>, EvaluationError> {
        let scores = vec![
            self.performance(signal, portfolio, targets)?,
            self.signal_quality(signal),
            self.risk_management(signal, portfolio)?,
            self.asset_specific(signal, portfolio)?,
        ];

        for s in &scores {
            debug!(
                pair = %signal.pair,
                rule = s.rule.as_str(),
                score = %s.score,
                "Rule scored"
            );
        }

        Ok(scores)
    }

    // ==================== Performance ====================

    /// Favour profit-taking once the monthly target is met and buying while
    /// far behind it.
    pub fn performance(
        &self,
        signal: &TradeSignal,
        portfolio: &PortfolioStatus,
        targets: &Targets,
    ) -> Result<RuleScore, EvaluationError> {
        let mut score = RuleScore::new(RuleKind::Performance, dec!(0.5));
        let progress = targets
            .progress(portfolio.monthly_performance)
            .and_then(|p| p.checked_mul(dec!(100)).map(|pct| (p, pct.round_dp(1))));
        let (progress, progress_pct) = progress.ok_or(EvaluationError::Overflow {
            what: "monthly target progress",
        })?;

        if progress >= Decimal::ONE {
            if signal.is_sell() {
                score.adjust(
                    dec!(0.3),
                    format!("Monthly target reached ({}%), favouring profit-taking", progress_pct),
                );
            } else {
                score.adjust(
                    dec!(-0.1),
                    format!("Monthly target reached ({}%), new buys discouraged", progress_pct),
                );
            }
        } else if progress < dec!(0.5) {
            if signal.is_buy() && signal.confidence > 0.7 {
                score.adjust(
                    dec!(0.4),
                    format!(
                        "Behind monthly target ({}%) with confident buy signal",
                        progress_pct
                    ),
                );
            }
            if signal.is_sell() {
                score.adjust(
                    dec!(-0.2),
                    format!("Behind monthly target ({}%), selling discouraged", progress_pct),
                );
            }
        }

        if score.reasoning.is_empty() {
            score.note(format!("Monthly target progress {}%", progress_pct));
        }

        Ok(score)
    }

    // ==================== Signal Quality ====================

    /// Score confidence bands and signal strength.
    pub fn signal_quality(&self, signal: &TradeSignal) -> RuleScore {
        let mut score = RuleScore::new(RuleKind::SignalQuality, self.policy.signal_quality_base);
        let confidence = signal.confidence;

        if confidence >= 0.8 {
            score.adjust(dec!(0.4), format!("High confidence signal ({:.2})", confidence));
        } else if confidence >= 0.7 {
            score.adjust(dec!(0.3), format!("Good confidence signal ({:.2})", confidence));
        } else if confidence >= 0.6 {
            score.adjust(dec!(0.1), format!("Moderate confidence signal ({:.2})", confidence));
        } else {
            score.adjust(dec!(-0.2), format!("Low confidence signal ({:.2})", confidence));
        }

        match signal.signal_strength {
            SignalStrength::Strong => score.adjust(dec!(0.2), "Strong signal strength"),
            SignalStrength::Medium => score.adjust(dec!(0.1), "Medium signal strength"),
            SignalStrength::Weak => score.adjust(dec!(-0.1), "Weak signal strength"),
        }

        score
    }

    // ==================== Risk Management ====================

    /// Penalise high portfolio exposure, oversized trades and buying into an
    /// asset close to its allocation cap.
    pub fn risk_management(
        &self,
        signal: &TradeSignal,
        portfolio: &PortfolioStatus,
    ) -> Result<RuleScore, EvaluationError> {
        let mut score = RuleScore::new(RuleKind::RiskManagement, dec!(0.5));
        let exposure = portfolio.risk_exposure;

        if exposure > self.policy.high_exposure {
            score.adjust(
                dec!(-0.3),
                format!("High portfolio risk exposure ({:.1}%)", exposure * 100.0),
            );
        } else if exposure < self.policy.low_exposure {
            score.adjust(
                dec!(0.1),
                format!("Low portfolio risk exposure ({:.1}%)", exposure * 100.0),
            );
        }

        let trade_value = signal
            .notional()
            .ok_or(EvaluationError::Overflow { what: "trade value" })?;
        let max_trade_value = self.policy.max_trade_value(portfolio.total_value_zar);
        if trade_value > max_trade_value {
            score.adjust(
                dec!(-0.4),
                format!(
                    "Trade value R{} exceeds {}% risk limit (R{})",
                    trade_value.round_dp(2),
                    (self.policy.max_risk_per_trade * dec!(100)).normalize(),
                    max_trade_value.round_dp(2)
                ),
            );
        }

        if signal.is_buy() {
            let asset = signal.base_asset();
            let allocation_pct = portfolio
                .allocation_of(&asset)
                .and_then(|a| a.checked_mul(dec!(100)).map(|pct| (a, pct)));
            let (allocation, allocation_pct) =
                allocation_pct.ok_or(EvaluationError::Overflow { what: "asset allocation" })?;
            if allocation > self.policy.allocation_warning_level() {
                score.adjust(
                    dec!(-0.2),
                    format!(
                        "{} allocation {}% near {}% position cap",
                        asset,
                        allocation_pct.round_dp(1),
                        (self.policy.max_asset_allocation * dec!(100)).normalize()
                    ),
                );
            }
        }

        if score.reasoning.is_empty() {
            score.note("Risk within limits");
        }

        Ok(score)
    }

    // ==================== Asset Specific ====================

    /// Protect the reserve asset and reward stable major pairs.
    pub fn asset_specific(
        &self,
        signal: &TradeSignal,
        portfolio: &PortfolioStatus,
    ) -> Result<RuleScore, EvaluationError> {
        let mut score = RuleScore::new(RuleKind::AssetSpecific, dec!(0.5));
        let asset = signal.base_asset();

        if self.policy.is_protected(&asset) {
            let reserve = self.policy.reserve_amount;
            if signal.is_sell() {
                let balance = portfolio.balance_of(&asset);
                let remaining = balance.checked_sub(signal.amount).ok_or(
                    EvaluationError::Overflow {
                        what: "remaining reserve balance",
                    },
                )?;
                if balance <= reserve || remaining < reserve {
                    score.adjust(
                        dec!(-0.8),
                        format!(
                            "Sell would breach {} reserve: balance {}, remaining {}, reserve {}",
                            asset, balance, remaining, reserve
                        ),
                    );
                } else {
                    score.adjust(
                        dec!(0.1),
                        format!(
                            "{} balance {} stays above {} reserve after sell",
                            asset, balance, reserve
                        ),
                    );
                }
            } else {
                score.adjust(dec!(0.1), format!("Buying adds to {} reserve", asset));
            }
        }

        if self.policy.is_major_pair(&signal.pair) {
            score.adjust(dec!(0.1), format!("{} is a major pair", signal.normalized_pair()));
        }

        if score.reasoning.is_empty() {
            score.note(format!("No asset-specific rules for {}", asset));
        }

        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeAction;

    fn signal(pair: &str, action: TradeAction, confidence: f64, strength: SignalStrength) -> TradeSignal {
        TradeSignal::new(pair, action, confidence, strength, dec!(0.001), dec!(1000000))
    }

    fn portfolio() -> PortfolioStatus {
        PortfolioStatus::new(dec!(100000))
            .with_asset("BTC", dec!(0.01), dec!(10000))
            .with_asset("XRP", dec!(3000), dec!(30000))
            .with_performance(dec!(2400), dec!(600))
            .with_risk_exposure(0.10)
    }

    #[test]
    fn test_performance_behind_target_buy() {
        let policy = RiskPolicy::default();
        let rules = RuleEvaluator::new(&policy);
        let s = signal("BTC/ZAR", TradeAction::Buy, 0.85, SignalStrength::Strong);

        let score = rules
            .performance(&s, &portfolio(), &Targets::monthly(dec!(8000)))
            .unwrap();
        assert_eq!(score.score, dec!(0.9));
    }

    #[test]
    fn test_performance_behind_target_low_confidence_buy() {
        let policy = RiskPolicy::default();
        let rules = RuleEvaluator::new(&policy);
        let s = signal("BTC/ZAR", TradeAction::Buy, 0.7, SignalStrength::Strong);

        let score = rules
            .performance(&s, &portfolio(), &Targets::monthly(dec!(8000)))
            .unwrap();
        assert_eq!(score.score, dec!(0.5));
        assert_eq!(score.reasoning.len(), 1);
    }

    #[test]
    fn test_performance_target_met() {
        let policy = RiskPolicy::default();
        let rules = RuleEvaluator::new(&policy);
        let p = portfolio().with_performance(dec!(9000), dec!(2000));
        let targets = Targets::monthly(dec!(8000));

        let sell = signal("BTC/ZAR", TradeAction::Sell, 0.6, SignalStrength::Medium);
        assert_eq!(rules.performance(&sell, &p, &targets).unwrap().score, dec!(0.8));

        let buy = signal("BTC/ZAR", TradeAction::Buy, 0.9, SignalStrength::Strong);
        assert_eq!(rules.performance(&buy, &p, &targets).unwrap().score, dec!(0.4));
    }

    #[test]
    fn test_performance_behind_target_sell() {
        let policy = RiskPolicy::default();
        let rules = RuleEvaluator::new(&policy);
        let s = signal("BTC/ZAR", TradeAction::Sell, 0.9, SignalStrength::Strong);

        let score = rules
            .performance(&s, &portfolio(), &Targets::monthly(dec!(8000)))
            .unwrap();
        assert_eq!(score.score, dec!(0.3));
    }

    #[test]
    fn test_performance_zero_target() {
        let policy = RiskPolicy::default();
        let rules = RuleEvaluator::new(&policy);
        let s = signal("BTC/ZAR", TradeAction::Buy, 0.9, SignalStrength::Strong);

        // Zero target counts as zero progress
        let score = rules
            .performance(&s, &portfolio(), &Targets::monthly(Decimal::ZERO))
            .unwrap();
        assert_eq!(score.score, dec!(0.9));
    }

    #[test]
    fn test_signal_quality_bands() {
        let policy = RiskPolicy::default();
        let rules = RuleEvaluator::new(&policy);
        let cases = [
            (0.85, SignalStrength::Strong, dec!(0.6)),
            (0.8, SignalStrength::Medium, dec!(0.5)),
            (0.75, SignalStrength::Weak, dec!(0.2)),
            (0.65, SignalStrength::Medium, dec!(0.2)),
            (0.5, SignalStrength::Strong, dec!(0.0)),
            (0.0, SignalStrength::Weak, dec!(-0.3)),
        ];

        for (confidence, strength, expected) in cases {
            let s = signal("BTC/ZAR", TradeAction::Buy, confidence, strength);
            assert_eq!(rules.signal_quality(&s).score, expected, "confidence {}", confidence);
        }
    }

    #[test]
    fn test_zero_confidence_band_delta() {
        let policy = RiskPolicy::default();
        let rules = RuleEvaluator::new(&policy);

        // Zero confidence lands in the lowest band (-0.2); strength is scored on top
        for (strength, strength_delta) in [
            (SignalStrength::Weak, dec!(-0.1)),
            (SignalStrength::Medium, dec!(0.1)),
            (SignalStrength::Strong, dec!(0.2)),
        ] {
            let s = signal("BTC/ZAR", TradeAction::Sell, 0.0, strength);
            let score = rules.signal_quality(&s);
            assert_eq!(score.score - strength_delta, dec!(-0.2));
            assert!(score.reasoning[0].contains("Low confidence"));
        }
    }

    #[test]
    fn test_risk_exposure_bands() {
        let policy = RiskPolicy::default();
        let rules = RuleEvaluator::new(&policy);
        let s = signal("ETH/ZAR", TradeAction::Sell, 0.8, SignalStrength::Strong);

        assert_eq!(rules.risk_management(&s, &portfolio()).unwrap().score, dec!(0.5));
        assert_eq!(
            rules
                .risk_management(&s, &portfolio().with_risk_exposure(0.2))
                .unwrap()
                .score,
            dec!(0.2)
        );
        assert_eq!(
            rules
                .risk_management(&s, &portfolio().with_risk_exposure(0.01))
                .unwrap()
                .score,
            dec!(0.6)
        );
    }

    #[test]
    fn test_risk_trade_value_limit() {
        let policy = RiskPolicy::default();
        let rules = RuleEvaluator::new(&policy);

        // 0.005 BTC at R1,000,000 = R5,000 > 4% of R100,000
        let mut s = signal("ETH/ZAR", TradeAction::Sell, 0.8, SignalStrength::Strong);
        s.amount = dec!(0.005);
        let score = rules.risk_management(&s, &portfolio()).unwrap();
        assert_eq!(score.score, dec!(0.1));
        assert!(score.reasoning.iter().any(|r| r.contains("risk limit")));

        // Exactly at the limit is allowed
        s.amount = dec!(0.004);
        assert_eq!(rules.risk_management(&s, &portfolio()).unwrap().score, dec!(0.5));
    }

    #[test]
    fn test_risk_allocation_cap_on_buy() {
        let policy = RiskPolicy::default();
        let rules = RuleEvaluator::new(&policy);
        // XRP is 30% of the portfolio, above 80% of the 20% cap
        let mut buy = signal("XRP/ZAR", TradeAction::Buy, 0.8, SignalStrength::Strong);
        buy.amount = dec!(1);
        buy.price = dec!(10);
        assert_eq!(rules.risk_management(&buy, &portfolio()).unwrap().score, dec!(0.3));

        // Selling the same asset is not penalised
        let mut sell = buy.clone();
        sell.action = TradeAction::Sell;
        assert_eq!(rules.risk_management(&sell, &portfolio()).unwrap().score, dec!(0.5));

        // BTC at 10% is under the 16% warning level
        let btc = signal("BTC/ZAR", TradeAction::Buy, 0.8, SignalStrength::Strong);
        assert_eq!(rules.risk_management(&btc, &portfolio()).unwrap().score, dec!(0.5));
    }

    #[test]
    fn test_asset_reserve_protection() {
        let policy = RiskPolicy::default();
        let rules = RuleEvaluator::new(&policy);
        let low = PortfolioStatus::new(dec!(100000)).with_asset("XRP", dec!(800), dec!(8000));

        let mut sell = signal("XRP/ZAR", TradeAction::Sell, 0.9, SignalStrength::Strong);
        sell.amount = dec!(2000);
        sell.price = dec!(10);
        let score = rules.asset_specific(&sell, &low).unwrap();
        assert_eq!(score.score, dec!(-0.3));

        // Balance exactly at the reserve, selling nothing, is still blocked
        let at_reserve = PortfolioStatus::new(dec!(100000)).with_asset("XRP", dec!(1000), dec!(10000));
        sell.amount = Decimal::ZERO;
        assert_eq!(rules.asset_specific(&sell, &at_reserve).unwrap().score, dec!(-0.3));

        // Sell that would dip below the reserve
        sell.amount = dec!(2500);
        assert_eq!(rules.asset_specific(&sell, &portfolio()).unwrap().score, dec!(-0.3));

        // Comfortable sell
        sell.amount = dec!(500);
        assert_eq!(rules.asset_specific(&sell, &portfolio()).unwrap().score, dec!(0.6));
    }

    #[test]
    fn test_asset_buy_and_major_bonus() {
        let policy = RiskPolicy::default();
        let rules = RuleEvaluator::new(&policy);

        let buy = signal("XRP/ZAR", TradeAction::Buy, 0.9, SignalStrength::Strong);
        assert_eq!(rules.asset_specific(&buy, &portfolio()).unwrap().score, dec!(0.6));

        let btc = signal("BTC/ZAR", TradeAction::Sell, 0.9, SignalStrength::Strong);
        assert_eq!(rules.asset_specific(&btc, &portfolio()).unwrap().score, dec!(0.6));

        let other = signal("SOL/ZAR", TradeAction::Buy, 0.9, SignalStrength::Strong);
        let score = rules.asset_specific(&other, &portfolio()).unwrap();
        assert_eq!(score.score, dec!(0.5));
        assert_eq!(score.reasoning.len(), 1);
    }

    #[test]
    fn test_evaluate_all_order() {
        let policy = RiskPolicy::default();
        let rules = RuleEvaluator::new(&policy);
        let s = signal("BTC/ZAR", TradeAction::Buy, 0.85, SignalStrength::Strong);

        let kinds: Vec<_> = rules
            .evaluate_all(&s, &portfolio(), &Targets::monthly(dec!(8000)))
            .unwrap()
            .into_iter()
            .map(|r| r.rule)
            .collect();
        assert_eq!(
            kinds,
            vec![
                RuleKind::Performance,
                RuleKind::SignalQuality,
                RuleKind::RiskManagement,
                RuleKind::AssetSpecific
            ]
        );
    }

    #[test]
    fn test_overflowing_figures_are_errors() {
        let policy = RiskPolicy::default();
        let rules = RuleEvaluator::new(&policy);

        let mut huge = signal("BTC/ZAR", TradeAction::Buy, 0.8, SignalStrength::Strong);
        huge.amount = dec!(1000000000000000);
        huge.price = dec!(1000000000000000);
        assert_eq!(
            rules.risk_management(&huge, &portfolio()),
            Err(EvaluationError::Overflow { what: "trade value" })
        );

        let s = signal("BTC/ZAR", TradeAction::Buy, 0.8, SignalStrength::Strong);
        let rich = portfolio().with_performance(dec!(1000000000000), Decimal::ZERO);
        assert!(matches!(
            rules.performance(&s, &rich, &Targets::monthly(dec!(0.0000000000000000000001))),
            Err(EvaluationError::Overflow { .. })
        ));

        // Progress just under the Decimal limit overflows once scaled to a percentage
        let near_max = portfolio().with_performance(Decimal::MAX, Decimal::ZERO);
        assert!(rules
            .performance(&s, &near_max, &Targets::monthly(dec!(2)))
            .is_err());
    }
}
