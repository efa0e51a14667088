//! Trade signal model: the proposed action handed to the decision engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quote currencies recognised when a pair has no separator (e.g. `XBTZAR`).
const KNOWN_QUOTES: [&str; 5] = ["ZAR", "USDC", "USDT", "EUR", "GBP"];

/// Direction of a proposed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
        }
    }
}

/// How decisively the signal source believes in its own prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStrength {
    Weak,
    Medium,
    Strong,
}

impl SignalStrength {
    /// Map a numeric confidence onto a strength bucket.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.75 {
            Self::Strong
        } else if confidence >= 0.55 {
            Self::Medium
        } else {
            Self::Weak
        }
    }
}

/// Market direction predicted by the signal source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

/// A proposed trade, built fresh for each evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Exchange symbol, e.g. "BTC/ZAR"
    pub pair: String,

    /// Buy or sell
    pub action: TradeAction,

    /// Source confidence (0.0 to 1.0)
    pub confidence: f64,

    pub signal_strength: SignalStrength,

    #[serde(default = "default_direction")]
    pub direction: Direction,

    /// Requested quantity in units of the base asset
    pub amount: Decimal,

    /// Price of one base-asset unit in the portfolio currency
    pub price: Decimal,

    #[serde(default)]
    pub predicted_return: Option<f64>,
}

fn default_direction() -> Direction {
    Direction::Neutral
}

impl TradeSignal {
    pub fn new(
        pair: impl Into<String>,
        action: TradeAction,
        confidence: f64,
        signal_strength: SignalStrength,
        amount: Decimal,
        price: Decimal,
    ) -> Self {
        let direction = match action {
            TradeAction::Buy => Direction::Bullish,
            TradeAction::Sell => Direction::Bearish,
        };
        Self {
            pair: pair.into(),
            action,
            confidence,
            signal_strength,
            direction,
            amount,
            price,
            predicted_return: None,
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_predicted_return(mut self, predicted_return: f64) -> Self {
        self.predicted_return = Some(predicted_return);
        self
    }

    /// Base asset symbol of the pair, upper-cased.
    ///
    /// Accepts `BTC/ZAR`, `BTC-ZAR`, `btc_zar` and separator-less forms like
    /// `XBTZAR` when the quote currency is recognised.
    pub fn base_asset(&self) -> String {
        let pair = self.pair.trim().to_uppercase();
        if let Some((base, _)) = pair.split_once(['/', '-', '_']) {
            return base.to_string();
        }
        KNOWN_QUOTES
            .iter()
            .find_map(|quote| {
                pair.strip_suffix(quote)
                    .filter(|base| !base.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or(pair)
    }

    /// Pair in canonical `BASE/QUOTE` upper-case form where possible.
    pub fn normalized_pair(&self) -> String {
        normalize_pair(&self.pair)
    }

    /// Trade value in the portfolio currency, `None` on overflow.
    pub fn notional(&self) -> Option<Decimal> {
        self.amount.checked_mul(self.price)
    }

    pub fn is_buy(&self) -> bool {
        self.action == TradeAction::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.action == TradeAction::Sell
    }
}

/// Upper-case a pair and rewrite `-`/`_` separators to `/`.
pub fn normalize_pair(pair: &str) -> String {
    pair.trim().to_uppercase().replace(['-', '_'], "/")
}
