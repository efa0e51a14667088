//! Decision combiner: folds rule scores into one verdict.

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{
    Decision, DecisionResult, PortfolioStatus, RiskAssessment, RuleScore, TradeSignal,
};

use super::RiskPolicy;

/// Turns rule scores into a [`DecisionResult`].
pub struct DecisionCombiner<'a> {
    policy: &'a RiskPolicy,
}

impl<'a> DecisionCombiner<'a> {
    pub fn new(policy: &'a RiskPolicy) -> Self {
        Self { policy }
    }

    /// Combine rule scores for `signal` into a verdict.
    pub fn combine(
        &self,
        signal: &TradeSignal,
        portfolio: &PortfolioStatus,
        scores: Vec<RuleScore>,
    ) -> DecisionResult {
        let mean = Self::mean_score(&scores);
        let (decision, confidence) = self.classify(mean);
        let risk_assessment = self.risk_assessment(mean);

        let (recommended_amount, conditions) = if decision == Decision::Approve {
            (
                self.recommended_amount(signal, portfolio, confidence),
                self.conditions(signal, confidence),
            )
        } else {
            (None, Vec::new())
        };

        let reasoning = scores
            .iter()
            .flat_map(|s| s.reasoning.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("; ");

        debug!(
            pair = %signal.pair,
            mean = %mean,
            decision = decision.as_str(),
            "Scores combined"
        );

        DecisionResult {
            decision,
            confidence,
            reasoning,
            recommended_amount,
            risk_assessment,
            conditions,
            mean_score: mean,
            rule_scores: scores,
        }
    }

    /// Unweighted mean of the rule scores (zero when there are none).
    pub fn mean_score(scores: &[RuleScore]) -> Decimal {
        if scores.is_empty() {
            return Decimal::ZERO;
        }
        let total: Decimal = scores.iter().map(|s| s.score).sum();
        total / Decimal::from(scores.len())
    }

    /// Map a mean score to a decision and its confidence.
    pub fn classify(&self, mean: Decimal) -> (Decision, Decimal) {
        let p = self.policy;
        if mean >= p.approve_threshold {
            (Decision::Approve, mean.min(p.max_approve_confidence))
        } else if mean >= p.reject_threshold {
            (Decision::Hold, p.hold_confidence)
        } else {
            let confidence = (Decimal::ONE - mean)
                .max(p.min_reject_confidence)
                .min(Decimal::ONE);
            (Decision::Reject, confidence)
        }
    }

    /// Four-tier risk label on the same scale as the decision thresholds.
    pub fn risk_assessment(&self, mean: Decimal) -> RiskAssessment {
        let p = self.policy;
        if mean >= p.approve_threshold {
            RiskAssessment::Low
        } else if mean >= p.medium_risk_threshold {
            RiskAssessment::Medium
        } else if mean >= p.reject_threshold {
            RiskAssessment::High
        } else {
            RiskAssessment::VeryHigh
        }
    }

    /// Position size for an approval, in base-asset units.
    ///
    /// Sized in ZAR as `total * max_risk * min(1, confidence * boost)` and
    /// converted with the signal's price.
    pub fn recommended_amount(
        &self,
        signal: &TradeSignal,
        portfolio: &PortfolioStatus,
        confidence: Decimal,
    ) -> Option<Decimal> {
        if signal.price <= Decimal::ZERO {
            return None;
        }
        let scale = confidence
            .checked_mul(self.policy.sizing_boost)?
            .min(Decimal::ONE);
        self.policy
            .max_trade_value(portfolio.total_value_zar)
            .checked_mul(scale)?
            .checked_div(signal.price)
            .map(|units| units.round_dp(8))
    }

    /// Caveats attached to an approval.
    pub fn conditions(&self, signal: &TradeSignal, confidence: Decimal) -> Vec<String> {
        let mut conditions = vec![
            format!(
                "Enforce {}% stop-loss",
                (self.policy.max_risk_per_trade * Decimal::from(100)).normalize()
            ),
            "Monitor position size limits".to_string(),
        ];

        let asset = signal.base_asset();
        if self.policy.is_protected(&asset) {
            conditions.push(format!(
                "Keep at least {} {} in reserve",
                self.policy.reserve_amount.normalize(),
                asset
            ));
        }

        if confidence < self.policy.full_size_confidence {
            conditions.push("Reduce size: confidence below full-size level".to_string());
        }

        conditions
    }
}
