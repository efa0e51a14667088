//! Verdict returned by the decision engine.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Final verdict on a proposed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
    Hold,
    ReducePosition,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
            Decision::Hold => "hold",
            Decision::ReducePosition => "reduce_position",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Four-tier risk label derived from the aggregate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskAssessment {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskAssessment {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskAssessment::Low => "low",
            RiskAssessment::Medium => "medium",
            RiskAssessment::High => "high",
            RiskAssessment::VeryHigh => "very_high",
        }
    }
}

impl fmt::Display for RiskAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which scoring rule produced a [`RuleScore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Performance,
    SignalQuality,
    RiskManagement,
    AssetSpecific,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Performance => "performance",
            RuleKind::SignalQuality => "signal_quality",
            RuleKind::RiskManagement => "risk_management",
            RuleKind::AssetSpecific => "asset_specific",
        }
    }
}

/// Score and ordered reasoning produced by one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleScore {
    pub rule: RuleKind,
    pub score: Decimal,
    pub reasoning: Vec<String>,
}

impl RuleScore {
    pub fn new(rule: RuleKind, base: Decimal) -> Self {
        Self {
            rule,
            score: base,
            reasoning: Vec::new(),
        }
    }

    /// Apply a score delta and record why.
    pub fn adjust(&mut self, delta: Decimal, reason: impl Into<String>) {
        self.score += delta;
        self.reasoning.push(reason.into());
    }

    /// Record a reason without changing the score.
    pub fn note(&mut self, reason: impl Into<String>) {
        self.reasoning.push(reason.into());
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    pub decision: Decision,

    /// Confidence in the verdict (0.0 to 1.0)
    pub confidence: Decimal,

    /// Semicolon-joined trace of the contributing rules
    pub reasoning: String,

    /// Suggested quantity in base-asset units, only set on approval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_amount: Option<Decimal>,

    pub risk_assessment: RiskAssessment,

    /// Caveats attached to an approval
    #[serde(default)]
    pub conditions: Vec<String>,

    /// Mean of the rule scores
    pub mean_score: Decimal,

    /// Individual rule scores in evaluation order
    #[serde(default)]
    pub rule_scores: Vec<RuleScore>,
}

impl DecisionResult {
    /// Conservative reject used when evaluation could not complete.
    pub fn fail_closed(reason: impl fmt::Display) -> Self {
        Self {
            decision: Decision::Reject,
            confidence: Decimal::ZERO,
            reasoning: format!("Evaluation failed: {}", reason),
            recommended_amount: None,
            risk_assessment: RiskAssessment::VeryHigh,
            conditions: Vec::new(),
            mean_score: Decimal::ZERO,
            rule_scores: Vec::new(),
        }
    }

    /// Score of a single rule, if it ran.
    pub fn rule_score(&self, rule: RuleKind) -> Option<Decimal> {
        self.rule_scores
            .iter()
            .find(|s| s.rule == rule)
            .map(|s| s.score)
    }
}

impl fmt::Display for DecisionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Trade Decision ===")?;
        writeln!(f, "Decision:         {}", self.decision.as_str().to_uppercase())?;
        writeln!(f, "Confidence:       {:.2}", self.confidence)?;
        writeln!(f, "Mean Score:       {:.3}", self.mean_score)?;
        writeln!(f, "Risk Assessment:  {}", self.risk_assessment)?;
        if let Some(amount) = self.recommended_amount {
            writeln!(f, "Recommended Size: {}", amount)?;
        }

        if !self.rule_scores.is_empty() {
            writeln!(f, "\n--- Rule Scores ---")?;
            for score in &self.rule_scores {
                writeln!(f, "  {:<16} {:>6.2}", score.rule.as_str(), score.score)?;
            }
        }

        if !self.conditions.is_empty() {
            writeln!(f, "\n--- Conditions ---")?;
            for condition in &self.conditions {
                writeln!(f, "  - {}", condition)?;
            }
        }

        write!(f, "\nReasoning: {}", self.reasoning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rule_score_adjust() {
        let mut score = RuleScore::new(RuleKind::Performance, dec!(0.5));
        score.adjust(dec!(0.4), "Behind target");
        score.adjust(dec!(-0.1), "Small penalty");
        score.note("Informational");

        assert_eq!(score.score, dec!(0.8));
        assert_eq!(score.reasoning.len(), 3);
    }

    #[test]
    fn test_fail_closed() {
        let result = DecisionResult::fail_closed("price missing");
        assert_eq!(result.decision, Decision::Reject);
        assert_eq!(result.confidence, Decimal::ZERO);
        assert!(result.reasoning.contains("price missing"));
        assert!(result.recommended_amount.is_none());
        assert!(result.conditions.is_empty());
    }

    #[test]
    fn test_serialization_labels() {
        let json = serde_json::to_string(&Decision::ReducePosition).unwrap();
        assert_eq!(json, "\"reduce_position\"");
        let json = serde_json::to_string(&RiskAssessment::VeryHigh).unwrap();
        assert_eq!(json, "\"very_high\"");
    }
}
