//! Signal sources: anything that can turn a pair into a directional
//! prediction with a confidence.
//!
//! The decision engine only consumes the [`Prediction`] fields, so sources
//! are interchangeable: a technical-indicator vote or a model ensemble.

mod ensemble;
mod indicators;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::SignalError;
use crate::models::{normalize_pair, Direction, SignalStrength, TradeAction, TradeSignal};

pub use ensemble::{EnsembleSource, FeatureSet, LinearModel, Predictor};
pub use indicators::{momentum, rsi, sma, IndicatorSource};

/// A source of directional predictions for a trading pair.
pub trait SignalSource {
    fn predict(&self, pair: &str) -> Result<Prediction, SignalError>;

    /// Name used in logs.
    fn name(&self) -> &str;
}

/// Output of a signal source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub pair: String,

    /// Predicted return over the source's horizon (fraction, e.g. 0.02 = +2%)
    pub prediction: f64,

    /// Confidence (0.0 to 1.0)
    pub confidence: f64,

    pub signal_strength: SignalStrength,

    pub direction: Direction,
}

impl Prediction {
    /// Trade action implied by the direction; neutral predictions imply none.
    pub fn action(&self) -> Option<TradeAction> {
        match self.direction {
            Direction::Bullish => Some(TradeAction::Buy),
            Direction::Bearish => Some(TradeAction::Sell),
            Direction::Neutral => None,
        }
    }

    /// Build a trade signal for `amount` units at `price`.
    ///
    /// Returns `None` for neutral predictions.
    pub fn into_signal(self, amount: Decimal, price: Decimal) -> Option<TradeSignal> {
        let action = self.action()?;
        Some(
            TradeSignal::new(
                self.pair,
                action,
                self.confidence,
                self.signal_strength,
                amount,
                price,
            )
            .with_direction(self.direction)
            .with_predicted_return(self.prediction),
        )
    }
}

/// Closing prices per pair, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceHistory {
    closes: BTreeMap<String, Vec<f64>>,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{"BTC/ZAR": [..], ...}` from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read price history {}", path.display()))?;
        let history: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid price history JSON in {}", path.display()))?;
        Ok(history.normalized())
    }

    pub fn with_closes(mut self, pair: &str, closes: Vec<f64>) -> Self {
        self.closes.insert(normalize_pair(pair), closes);
        self
    }

    fn normalized(self) -> Self {
        Self {
            closes: self
                .closes
                .into_iter()
                .map(|(pair, closes)| (normalize_pair(&pair), closes))
                .collect(),
        }
    }

    pub fn closes(&self, pair: &str) -> Option<&[f64]> {
        self.closes.get(&normalize_pair(pair)).map(Vec::as_slice)
    }

    /// Closes for `pair`, requiring at least `need` points.
    pub fn require(&self, pair: &str, need: usize) -> Result<&[f64], SignalError> {
        let closes = self
            .closes(pair)
            .ok_or_else(|| SignalError::UnknownPair(pair.to_string()))?;
        if closes.len() < need {
            return Err(SignalError::InsufficientData {
                pair: pair.to_string(),
                have: closes.len(),
                need,
            });
        }
        Ok(closes)
    }

    /// Most recent close as a decimal price.
    pub fn last_price(&self, pair: &str) -> Option<Decimal> {
        self.closes(pair)
            .and_then(|c| c.last())
            .and_then(|p| Decimal::try_from(*p).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_prediction_into_signal() {
        let prediction = Prediction {
            pair: "BTC/ZAR".to_string(),
            prediction: 0.015,
            confidence: 0.8,
            signal_strength: SignalStrength::Strong,
            direction: Direction::Bearish,
        };

        let signal = prediction.into_signal(dec!(0.01), dec!(1000000)).unwrap();
        assert_eq!(signal.action, TradeAction::Sell);
        assert_eq!(signal.direction, Direction::Bearish);
        assert_eq!(signal.predicted_return, Some(0.015));
    }

    #[test]
    fn test_neutral_prediction_has_no_signal() {
        let prediction = Prediction {
            pair: "BTC/ZAR".to_string(),
            prediction: 0.0,
            confidence: 0.4,
            signal_strength: SignalStrength::Weak,
            direction: Direction::Neutral,
        };
        assert!(prediction.into_signal(dec!(1), dec!(1)).is_none());
    }

    #[test]
    fn test_price_history_lookup() {
        let history: PriceHistory =
            serde_json::from_str(r#"{"btc-zar": [1.0, 2.0, 3.5]}"#).unwrap();
        let history = history.normalized();

        assert_eq!(history.closes("BTC/ZAR").map(<[f64]>::len), Some(3));
        assert_eq!(history.last_price("btc/zar"), Some(dec!(3.5)));
        assert_eq!(
            history.require("BTC/ZAR", 5),
            Err(SignalError::InsufficientData {
                pair: "BTC/ZAR".to_string(),
                have: 3,
                need: 5
            })
        );
        assert!(matches!(
            history.require("ETH/ZAR", 1),
            Err(SignalError::UnknownPair(_))
        ));
    }
}
