//! Decision engine: validates inputs, runs the rules and combines the scores.
//!
//! The engine is pure: it owns only its policy, performs no I/O and keeps no
//! state between calls, so identical inputs always give identical verdicts.

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::EvaluationError;
use crate::models::{DecisionResult, PortfolioStatus, TradeSignal, Targets};

use super::{DecisionCombiner, RiskPolicy, RuleEvaluator};

/// Trade decision engine.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    policy: RiskPolicy,
}

impl DecisionEngine {
    /// Create an engine with the given policy.
    pub fn new(policy: RiskPolicy) -> Self {
        Self { policy }
    }

    /// Create with the default policy.
    pub fn default_engine() -> Self {
        Self::new(RiskPolicy::default())
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    /// Evaluate a signal, failing closed.
    ///
    /// Any input problem becomes a reject with zero confidence and the error
    /// in `reasoning`; this never panics or returns an error.
    pub fn evaluate(
        &self,
        signal: &TradeSignal,
        portfolio: &PortfolioStatus,
        targets: &Targets,
    ) -> DecisionResult {
        match self.try_evaluate(signal, portfolio, targets) {
            Ok(result) => result,
            Err(e) => {
                warn!(pair = %signal.pair, error = %e, "Evaluation failed, rejecting trade");
                DecisionResult::fail_closed(e)
            }
        }
    }

    /// Evaluate a signal, surfacing invalid input as an error.
    pub fn try_evaluate(
        &self,
        signal: &TradeSignal,
        portfolio: &PortfolioStatus,
        targets: &Targets,
    ) -> Result<DecisionResult, EvaluationError> {
        self.policy.validate()?;
        validate_signal(signal)?;
        validate_portfolio(portfolio)?;
        validate_targets(targets)?;

        let scores = RuleEvaluator::new(&self.policy).evaluate_all(signal, portfolio, targets)?;
        let result = DecisionCombiner::new(&self.policy).combine(signal, portfolio, scores);

        info!(
            pair = %signal.pair,
            action = signal.action.as_str(),
            decision = result.decision.as_str(),
            confidence = %result.confidence,
            mean = %result.mean_score,
            "Trade evaluated"
        );

        Ok(result)
    }

    /// Evaluate several signals against the same snapshot.
    pub fn evaluate_batch(
        &self,
        signals: &[TradeSignal],
        portfolio: &PortfolioStatus,
        targets: &Targets,
    ) -> Vec<DecisionResult> {
        signals
            .iter()
            .map(|signal| self.evaluate(signal, portfolio, targets))
            .collect()
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::default_engine()
    }
}

fn validate_signal(signal: &TradeSignal) -> Result<(), EvaluationError> {
    if signal.pair.trim().is_empty() {
        return Err(EvaluationError::InvalidSignal {
            field: "pair",
            reason: "pair is empty".to_string(),
        });
    }

    if !signal.confidence.is_finite() || !(0.0..=1.0).contains(&signal.confidence) {
        return Err(EvaluationError::InvalidSignal {
            field: "confidence",
            reason: format!("{} is outside [0, 1]", signal.confidence),
        });
    }

    if signal.amount < Decimal::ZERO {
        return Err(EvaluationError::InvalidSignal {
            field: "amount",
            reason: format!("{} is negative", signal.amount),
        });
    }

    if matches!(signal.predicted_return, Some(r) if !r.is_finite()) {
        return Err(EvaluationError::InvalidSignal {
            field: "predicted_return",
            reason: "not a finite number".to_string(),
        });
    }

    if signal.price <= Decimal::ZERO {
        return Err(EvaluationError::MissingPrice {
            pair: signal.pair.clone(),
        });
    }

    Ok(())
}

fn validate_portfolio(portfolio: &PortfolioStatus) -> Result<(), EvaluationError> {
    if portfolio.total_value_zar < Decimal::ZERO {
        return Err(EvaluationError::InvalidPortfolio {
            reason: format!("total value {} is negative", portfolio.total_value_zar),
        });
    }

    let exposure = portfolio.risk_exposure;
    if !exposure.is_finite() || !(0.0..=1.0).contains(&exposure) {
        return Err(EvaluationError::InvalidPortfolio {
            reason: format!("risk exposure {} is outside [0, 1]", exposure),
        });
    }

    if let Some((symbol, _)) = portfolio
        .assets
        .iter()
        .find(|(_, h)| h.balance < Decimal::ZERO || h.zar_value < Decimal::ZERO)
    {
        return Err(EvaluationError::InvalidPortfolio {
            reason: format!("negative holding for {}", symbol),
        });
    }

    Ok(())
}

fn validate_targets(targets: &Targets) -> Result<(), EvaluationError> {
    if targets.monthly_target < Decimal::ZERO {
        return Err(EvaluationError::InvalidTargets {
            reason: format!("monthly target {} is negative", targets.monthly_target),
        });
    }
    Ok(())
}
