//! Trade advisor for Luno spot pairs.
//!
//! Turns a trade signal, a portfolio snapshot and profit targets into an
//! approve / reject / hold verdict with a confidence, a risk grade and a
//! suggested size. Evaluation fails closed: bad input becomes a reject.

pub mod advisor;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod signals;

pub use advisor::{DecisionEngine, RiskPolicy};
pub use error::{EvaluationError, SignalError};
pub use models::{DecisionResult, PortfolioStatus, Targets, TradeSignal};
