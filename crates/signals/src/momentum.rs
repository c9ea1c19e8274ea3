use common::{Direction, Trend};

use crate::analyzer::{Assessment, MarketAnalyzer};

/// Momentum analyzer over Wilder-smoothed RSI.
///
/// Oversold momentum reads as an imminent rebound (CALL), overbought as an
/// imminent correction (PUT). Confidence scales with how far the index sits
/// from its neutral midpoint; the trend classification comes from net drift
/// over the window. Returns `None` until `period + 1` prices are available
/// or while momentum is neutral.
#[derive(Debug, Clone)]
pub struct MomentumAnalyzer {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
    /// Net drift (fraction of window-open price) separating a trend from
    /// sideways chop.
    pub trend_threshold: f64,
}

impl MomentumAnalyzer {
    pub fn new(period: usize, overbought: f64, oversold: f64) -> Self {
        assert!(period >= 2, "momentum period must be >= 2");
        assert!(oversold < overbought);
        Self {
            period,
            overbought,
            oversold,
            trend_threshold: 0.001,
        }
    }

    /// Wilder-smoothed relative strength index over `history`.
    /// `None` with fewer than `period + 1` values.
    fn rsi(&self, closes: &[f64]) -> Option<f64> {
        if closes.len() < self.period + 1 {
            return None;
        }

        let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
        let initial = &changes[..self.period];

        let mut avg_gain =
            initial.iter().filter(|&&c| c > 0.0).sum::<f64>() / self.period as f64;
        let mut avg_loss = initial
            .iter()
            .filter(|&&c| c < 0.0)
            .map(|c| c.abs())
            .sum::<f64>()
            / self.period as f64;

        for &change in &changes[self.period..] {
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);
            avg_gain = (avg_gain * (self.period - 1) as f64 + gain) / self.period as f64;
            avg_loss = (avg_loss * (self.period - 1) as f64 + loss) / self.period as f64;
        }

        if avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = avg_gain / avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }

    fn classify_trend(&self, closes: &[f64]) -> Trend {
        let window = &closes[closes.len().saturating_sub(self.period + 1)..];
        let (first, last) = match (window.first(), window.last()) {
            (Some(&f), Some(&l)) if f > 0.0 => (f, l),
            _ => return Trend::Sideways,
        };
        let drift = (last - first) / first;
        if drift > self.trend_threshold {
            Trend::Bullish
        } else if drift < -self.trend_threshold {
            Trend::Bearish
        } else {
            Trend::Sideways
        }
    }
}

impl Default for MomentumAnalyzer {
    fn default() -> Self {
        Self::new(14, 65.0, 35.0)
    }
}

impl MarketAnalyzer for MomentumAnalyzer {
    fn name(&self) -> &str {
        "momentum"
    }

    fn assess(&self, history: &[f64]) -> Option<Assessment> {
        let rsi = self.rsi(history)?;

        let direction = if rsi <= self.oversold {
            Direction::Call
        } else if rsi >= self.overbought {
            Direction::Put
        } else {
            return None; // neutral momentum, no edge
        };

        // Displacement from the midpoint, mapped onto 50–100.
        let confidence = (50.0 + (rsi - 50.0).abs()).round().min(100.0) as u8;

        Some(Assessment {
            direction,
            confidence,
            trend: self.classify_trend(history),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_history_yields_none() {
        let analyzer = MomentumAnalyzer::new(14, 65.0, 35.0);
        let prices = vec![100.0; 14];
        assert!(analyzer.assess(&prices).is_none());
    }

    #[test]
    fn steady_climb_reads_overbought_put() {
        let analyzer = MomentumAnalyzer::new(14, 65.0, 35.0);
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let a = analyzer.assess(&prices).expect("assessment");
        assert_eq!(a.direction, Direction::Put);
        assert_eq!(a.trend, Trend::Bullish);
        assert_eq!(a.confidence, 100);
    }

    #[test]
    fn steady_slide_reads_oversold_call() {
        let analyzer = MomentumAnalyzer::new(14, 65.0, 35.0);
        let prices: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let a = analyzer.assess(&prices).expect("assessment");
        assert_eq!(a.direction, Direction::Call);
        assert_eq!(a.trend, Trend::Bearish);
    }

    #[test]
    fn neutral_momentum_yields_none() {
        let analyzer = MomentumAnalyzer::new(4, 65.0, 35.0);
        // Alternating gains and losses of equal size keep RSI near 50.
        let prices = vec![100.0, 101.0, 100.0, 101.0, 100.0, 101.0, 100.0, 101.0];
        assert!(analyzer.assess(&prices).is_none());
    }

    #[test]
    fn confidence_is_always_in_range() {
        let analyzer = MomentumAnalyzer::new(5, 65.0, 35.0);
        for scale in 1..30 {
            let prices: Vec<f64> = (0..12).map(|i| 100.0 + (i * scale) as f64 * 0.1).collect();
            if let Some(a) = analyzer.assess(&prices) {
                assert!(a.confidence <= 100);
            }
        }
    }

    #[test]
    fn flat_window_classifies_sideways() {
        let analyzer = MomentumAnalyzer::new(3, 65.0, 35.0);
        // Tiny dip then full recovery: net drift ~0, but RSI extreme enough.
        let prices = vec![100.0, 100.00005, 100.0001, 100.00015, 100.0002, 100.00002];
        let trend = analyzer.classify_trend(&prices);
        assert_eq!(trend, Trend::Sideways);
    }
}
