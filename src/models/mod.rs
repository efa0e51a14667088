//! Value objects exchanged with the decision engine: signals, portfolio
//! snapshots, targets and verdicts.

mod decision;
mod portfolio;
mod signal;
mod targets;

pub use decision::{Decision, DecisionResult, RiskAssessment, RuleKind, RuleScore};
pub use portfolio::{AssetHolding, PortfolioStatus};
pub use signal::{normalize_pair, Direction, SignalStrength, TradeAction, TradeSignal};
pub use targets::Targets;
