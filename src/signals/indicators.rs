//! Technical-indicator signal source: SMA crossover, RSI and momentum vote.

use statrs::statistics::Statistics;
use tracing::debug;

use crate::error::SignalError;
use crate::models::{Direction, SignalStrength};

use super::{Prediction, PriceHistory, SignalSource};

/// Simple moving average of the last `period` closes.
pub fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    Some(closes[closes.len() - period..].iter().mean())
}

/// Relative strength index over the last `period` price changes (0-100).
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() <= period {
        return None;
    }

    let window = &closes[closes.len() - period - 1..];
    let (gains, losses) = window
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), change| {
            if change >= 0.0 {
                (g + change, l)
            } else {
                (g, l - change)
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Fractional change over the last `period` closes.
pub fn momentum(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() <= period {
        return None;
    }
    let last = closes[closes.len() - 1];
    let past = closes[closes.len() - 1 - period];
    if past == 0.0 {
        return None;
    }
    Some((last - past) / past)
}

/// Votes three indicators into one prediction.
pub struct IndicatorSource {
    history: PriceHistory,
    fast_period: usize,
    slow_period: usize,
    rsi_period: usize,
    momentum_period: usize,
    /// RSI below this is oversold (bullish vote)
    oversold: f64,
    /// RSI above this is overbought (bearish vote)
    overbought: f64,
    /// Minimum absolute momentum to vote
    momentum_threshold: f64,
}

impl IndicatorSource {
    pub fn new(history: PriceHistory) -> Self {
        Self {
            history,
            fast_period: 12,
            slow_period: 26,
            rsi_period: 14,
            momentum_period: 10,
            oversold: 30.0,
            overbought: 70.0,
            momentum_threshold: 0.01,
        }
    }

    /// Closes needed before every indicator is defined.
    pub fn min_history(&self) -> usize {
        self.slow_period
            .max(self.rsi_period + 1)
            .max(self.momentum_period + 1)
    }

    fn evaluate(&self, pair: &str, closes: &[f64]) -> Option<Prediction> {
        let fast = sma(closes, self.fast_period)?;
        let slow = sma(closes, self.slow_period)?;
        let rsi_value = rsi(closes, self.rsi_period)?;
        let mom = momentum(closes, self.momentum_period)?;

        let trend_vote = if fast > slow {
            1
        } else if fast < slow {
            -1
        } else {
            0
        };
        let rsi_vote = if rsi_value < self.oversold {
            1
        } else if rsi_value > self.overbought {
            -1
        } else {
            0
        };
        let momentum_vote = if mom > self.momentum_threshold {
            1
        } else if mom < -self.momentum_threshold {
            -1
        } else {
            0
        };

        let score: i32 = trend_vote + rsi_vote + momentum_vote;

        let direction = match score {
            s if s > 0 => Direction::Bullish,
            s if s < 0 => Direction::Bearish,
            _ => Direction::Neutral,
        };

        // Wider SMA spread adds up to 0.05
        let spread_bonus = if slow > 0.0 {
            ((fast - slow).abs() / slow).min(0.05)
        } else {
            0.0
        };
        let confidence = if score == 0 {
            0.4
        } else {
            (0.5 + 0.15 * (score.abs() - 1) as f64 + spread_bonus).min(1.0)
        };

        debug!(
            pair = pair,
            fast = fast,
            slow = slow,
            rsi = rsi_value,
            momentum = mom,
            score = score,
            "Indicator vote"
        );

        Some(Prediction {
            pair: pair.to_string(),
            prediction: mom,
            confidence,
            signal_strength: SignalStrength::from_confidence(confidence),
            direction,
        })
    }
}

impl SignalSource for IndicatorSource {
    fn predict(&self, pair: &str) -> Result<Prediction, SignalError> {
        let need = self.min_history();
        let closes = self.history.require(pair, need)?;
        self.evaluate(pair, closes)
            .ok_or_else(|| SignalError::InsufficientData {
                pair: pair.to_string(),
                have: closes.len(),
                need,
            })
    }

    fn name(&self) -> &str {
        "indicators"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn test_sma() {
        let closes = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(sma(&closes, 2), Some(3.5));
        assert_eq!(sma(&closes, 5), None);
    }

    #[test]
    fn test_rsi_extremes() {
        assert_eq!(rsi(&rising(20), 14), Some(100.0));
        let falling: Vec<f64> = rising(20).into_iter().rev().collect();
        assert!(rsi(&falling, 14).unwrap() < 1.0);
        assert_eq!(rsi(&[5.0; 20], 14), Some(50.0));
        assert_eq!(rsi(&rising(10), 14), None);
    }

    #[test]
    fn test_momentum() {
        let closes = [100.0, 105.0, 110.0];
        assert!((momentum(&closes, 2).unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(momentum(&[0.0, 1.0], 1), None);
    }

    #[test]
    fn test_uptrend_is_bullish() {
        // Steady rise: trend and momentum vote up, RSI overbought votes down
        let history = PriceHistory::new().with_closes("BTC/ZAR", rising(40));
        let source = IndicatorSource::new(history);

        let prediction = source.predict("BTC/ZAR").unwrap();
        assert_eq!(prediction.direction, Direction::Bullish);
        assert!(prediction.prediction > 0.0);
        assert!(prediction.confidence >= 0.5 && prediction.confidence < 0.56);
    }

    #[test]
    fn test_dip_after_rise_is_bearish() {
        // Rise then a sharp drop: trend and momentum turn down, RSI is oversold
        let mut closes = rising(30);
        closes.extend((0..12).map(|i| 128.0 - 3.0 * i as f64));
        let history = PriceHistory::new().with_closes("ETH/ZAR", closes);
        let source = IndicatorSource::new(history);

        let prediction = source.predict("ETH/ZAR").unwrap();
        assert!(prediction.prediction < 0.0);
        assert_ne!(prediction.direction, Direction::Bullish);
    }

    #[test]
    fn test_flat_market_is_neutral() {
        let history = PriceHistory::new().with_closes("XRP/ZAR", vec![10.0; 40]);
        let source = IndicatorSource::new(history);

        let prediction = source.predict("XRP/ZAR").unwrap();
        assert_eq!(prediction.direction, Direction::Neutral);
        assert_eq!(prediction.signal_strength, SignalStrength::Weak);
    }

    #[test]
    fn test_short_history() {
        let history = PriceHistory::new().with_closes("BTC/ZAR", rising(10));
        let source = IndicatorSource::new(history);

        assert_eq!(
            source.predict("BTC/ZAR"),
            Err(SignalError::InsufficientData {
                pair: "BTC/ZAR".to_string(),
                have: 10,
                need: 26
            })
        );
    }
}
