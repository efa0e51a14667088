use thiserror::Error;

/// Reasons an evaluation cannot produce a scored verdict.
///
/// The engine turns every variant into a fail-closed reject; callers that
/// need to tell bad input apart from a scored reject use
/// `DecisionEngine::try_evaluate`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("invalid signal field `{field}`: {reason}")]
    InvalidSignal { field: &'static str, reason: String },

    #[error("no usable price for {pair}")]
    MissingPrice { pair: String },

    #[error("invalid portfolio snapshot: {reason}")]
    InvalidPortfolio { reason: String },

    #[error("invalid targets: {reason}")]
    InvalidTargets { reason: String },

    #[error("invalid risk policy: {reason}")]
    InvalidPolicy { reason: String },

    #[error("arithmetic overflow computing {what}")]
    Overflow { what: &'static str },
}

/// Failures raised by signal sources.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("not enough price history for {pair}: have {have}, need {need}")]
    InsufficientData {
        pair: String,
        have: usize,
        need: usize,
    },

    #[error("unknown pair: {0}")]
    UnknownPair(String),

    #[error("model `{model}` failed: {reason}")]
    Model { model: String, reason: String },

    #[error("ensemble has no models")]
    EmptyEnsemble,
}
