use common::{Direction, Trend};

/// Confidence tier boundary: at or above this, the high-conviction wording
/// is used.
pub const HIGH_CONFIDENCE: u8 = 80;

const HIGH_CALL: [&str; 3] = [
    "RSI deep in oversold territory, sharp rebound expected",
    "Double-bottom pattern completed, strong reversal to the upside",
    "Momentum divergence with rising volume confirms the recovery",
];

const HIGH_PUT: [&str; 3] = [
    "RSI shows heavy overbought pressure, correction imminent",
    "Support level broken on strong volume, steep downtrend ahead",
    "Bearish divergence between price and momentum, sharp fall expected",
];

const NORMAL_CALL: [&str; 3] = [
    "Moving averages point to a developing uptrend",
    "Oversold momentum suggests a modest bounce",
    "Volume picking up in favor of buyers",
];

const NORMAL_PUT: [&str; 3] = [
    "Moving averages rolling over, downtrend forming",
    "Overbought momentum suggests a pullback",
    "Sellers gaining volume at resistance",
];

/// Canned explanation for a signal, keyed by direction and trend and
/// worded by confidence tier. Deterministic — no sampling.
pub fn rationale_for(direction: Direction, trend: Trend, confidence: u8) -> &'static str {
    let variant = match trend {
        Trend::Bullish => 0,
        Trend::Bearish => 1,
        Trend::Sideways => 2,
    };
    let table = match (direction, confidence >= HIGH_CONFIDENCE) {
        (Direction::Call, true) => &HIGH_CALL,
        (Direction::Put, true) => &HIGH_PUT,
        (Direction::Call, false) => &NORMAL_CALL,
        (Direction::Put, false) => &NORMAL_PUT,
    };
    table[variant]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_tier_wording_differs_from_normal() {
        for direction in [Direction::Call, Direction::Put] {
            for trend in [Trend::Bullish, Trend::Bearish, Trend::Sideways] {
                let high = rationale_for(direction, trend, 95);
                let normal = rationale_for(direction, trend, 65);
                assert_ne!(high, normal);
            }
        }
    }

    #[test]
    fn tier_boundary_is_inclusive() {
        let at = rationale_for(Direction::Call, Trend::Bullish, HIGH_CONFIDENCE);
        let below = rationale_for(Direction::Call, Trend::Bullish, HIGH_CONFIDENCE - 1);
        assert_ne!(at, below);
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let a = rationale_for(Direction::Put, Trend::Bearish, 85);
        let b = rationale_for(Direction::Put, Trend::Bearish, 85);
        assert_eq!(a, b);
    }
}
