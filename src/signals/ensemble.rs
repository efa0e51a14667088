//! Model ensemble signal source.
//!
//! Each model maps a feature vector built from recent closes to a predicted
//! return. The ensemble averages the predictions; confidence grows with how
//! strongly and how unanimously the models agree.

use statrs::statistics::Statistics;
use tracing::{debug, warn};

use crate::error::SignalError;
use crate::models::{Direction, SignalStrength};

use super::indicators::{momentum, rsi, sma};
use super::{Prediction, PriceHistory, SignalSource};

/// Closes needed to build a [`FeatureSet`].
pub const FEATURE_WINDOW: usize = 27;

/// Features derived from recent closes.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    /// Return of the last bar
    pub last_return: f64,
    /// Mean bar return over the window
    pub mean_return: f64,
    /// Standard deviation of bar returns over the window
    pub volatility: f64,
    /// RSI(14) rescaled to [-1, 1]
    pub rsi: f64,
    /// SMA(12) / SMA(26) - 1
    pub sma_ratio: f64,
    /// 10-bar momentum
    pub momentum: f64,
}

impl FeatureSet {
    pub const LEN: usize = 6;

    pub fn from_closes(pair: &str, closes: &[f64]) -> Result<Self, SignalError> {
        let insufficient = || SignalError::InsufficientData {
            pair: pair.to_string(),
            have: closes.len(),
            need: FEATURE_WINDOW,
        };
        if closes.len() < FEATURE_WINDOW {
            return Err(insufficient());
        }

        let window = &closes[closes.len() - FEATURE_WINDOW..];
        let returns: Vec<f64> = window
            .windows(2)
            .filter(|w| w[0] != 0.0)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect();
        if returns.len() < 2 {
            return Err(insufficient());
        }

        let fast = sma(closes, 12).ok_or_else(insufficient)?;
        let slow = sma(closes, 26).ok_or_else(insufficient)?;
        let rsi_value = rsi(closes, 14).ok_or_else(insufficient)?;

        Ok(Self {
            last_return: returns[returns.len() - 1],
            mean_return: returns.iter().mean(),
            volatility: returns.iter().std_dev(),
            rsi: (rsi_value - 50.0) / 50.0,
            sma_ratio: if slow != 0.0 { fast / slow - 1.0 } else { 0.0 },
            momentum: momentum(closes, 10).unwrap_or(0.0),
        })
    }

    pub fn as_vec(&self) -> Vec<f64> {
        vec![
            self.last_return,
            self.mean_return,
            self.volatility,
            self.rsi,
            self.sma_ratio,
            self.momentum,
        ]
    }
}

/// A model predicting the next-period return from features.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &FeatureSet) -> Result<f64, SignalError>;

    fn name(&self) -> &str;
}

/// Linear model: `intercept + weights · features`.
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    intercept: f64,
    weights: Vec<f64>,
}

impl LinearModel {
    pub fn new(name: impl Into<String>, intercept: f64, weights: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            intercept,
            weights,
        }
    }

    /// Follows trend and momentum.
    pub fn trend() -> Self {
        Self::new("trend", 0.0, vec![0.1, 0.5, 0.0, 0.0, 0.6, 0.3])
    }

    /// Fades stretched RSI readings.
    pub fn mean_reversion() -> Self {
        Self::new("mean_reversion", 0.0, vec![-0.2, 0.0, 0.0, -0.02, 0.0, -0.1])
    }

    /// Scales down conviction in volatile markets.
    pub fn volatility_adjusted() -> Self {
        Self::new("volatility_adjusted", 0.0, vec![0.0, 0.8, -0.3, 0.01, 0.4, 0.2])
    }
}

impl Predictor for LinearModel {
    fn predict(&self, features: &FeatureSet) -> Result<f64, SignalError> {
        let values = features.as_vec();
        if self.weights.len() != values.len() {
            return Err(SignalError::Model {
                model: self.name.clone(),
                reason: format!(
                    "expected {} weights, got {}",
                    values.len(),
                    self.weights.len()
                ),
            });
        }
        let output = self.intercept
            + self
                .weights
                .iter()
                .zip(&values)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        if !output.is_finite() {
            return Err(SignalError::Model {
                model: self.name.clone(),
                reason: "non-finite output".to_string(),
            });
        }
        Ok(output)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Averages a set of models into one prediction.
pub struct EnsembleSource {
    history: PriceHistory,
    models: Vec<Box<dyn Predictor>>,
    /// Predicted returns inside this band are neutral
    neutral_band: f64,
    /// Predicted return treated as full conviction
    full_conviction_return: f64,
}

impl EnsembleSource {
    pub fn new(history: PriceHistory, models: Vec<Box<dyn Predictor>>) -> Self {
        Self {
            history,
            models,
            neutral_band: 0.002,
            full_conviction_return: 0.02,
        }
    }

    /// Ensemble of the bundled linear models.
    pub fn with_default_models(history: PriceHistory) -> Self {
        Self::new(
            history,
            vec![
                Box::new(LinearModel::trend()),
                Box::new(LinearModel::mean_reversion()),
                Box::new(LinearModel::volatility_adjusted()),
            ],
        )
    }

    /// Combine individual model outputs into a prediction.
    pub fn combine(&self, pair: &str, outputs: &[f64]) -> Result<Prediction, SignalError> {
        if outputs.is_empty() {
            return Err(SignalError::EmptyEnsemble);
        }

        let mean = outputs.iter().mean();

        let direction = if mean > self.neutral_band {
            Direction::Bullish
        } else if mean < -self.neutral_band {
            Direction::Bearish
        } else {
            Direction::Neutral
        };

        // Share of models on the ensemble's side of zero
        let agreeing = outputs
            .iter()
            .filter(|o| o.signum() == mean.signum() && **o != 0.0)
            .count();
        let agreement = agreeing as f64 / outputs.len() as f64;
        let conviction = (mean.abs() / self.full_conviction_return).min(1.0);

        let confidence = if direction == Direction::Neutral {
            (0.5 * conviction).min(0.4)
        } else {
            (0.5 * agreement + 0.5 * conviction).clamp(0.0, 1.0)
        };

        Ok(Prediction {
            pair: pair.to_string(),
            prediction: mean,
            confidence,
            signal_strength: SignalStrength::from_confidence(confidence),
            direction,
        })
    }
}

impl SignalSource for EnsembleSource {
    fn predict(&self, pair: &str) -> Result<Prediction, SignalError> {
        if self.models.is_empty() {
            return Err(SignalError::EmptyEnsemble);
        }

        let closes = self.history.require(pair, FEATURE_WINDOW)?;
        let features = FeatureSet::from_closes(pair, closes)?;

        let mut outputs = Vec::with_capacity(self.models.len());
        for model in &self.models {
            match model.predict(&features) {
                Ok(output) => outputs.push(output),
                Err(e) => warn!(model = model.name(), error = %e, "Model prediction failed"),
            }
        }

        if outputs.is_empty() {
            return Err(SignalError::Model {
                model: "ensemble".to_string(),
                reason: "every model failed".to_string(),
            });
        }

        let prediction = self.combine(pair, &outputs)?;
        debug!(
            pair = pair,
            models = outputs.len(),
            prediction = prediction.prediction,
            confidence = prediction.confidence,
            "Ensemble prediction"
        );
        Ok(prediction)
    }

    fn name(&self) -> &str {
        "ensemble"
    }
}
