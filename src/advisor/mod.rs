//! Trade advice: risk policy, scoring rules, decision combiner and engine.

mod combiner;
mod engine;
mod policy;
mod rules;

pub use combiner::DecisionCombiner;
pub use engine::DecisionEngine;
pub use policy::RiskPolicy;
pub use rules::RuleEvaluator;
