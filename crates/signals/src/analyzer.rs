use common::{Direction, Trend};

/// The analyzer's verdict on one symbol's recent price history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub direction: Direction,
    /// 0–100. Derived from indicator displacement, not a win probability.
    pub confidence: u8,
    pub trend: Trend,
}

/// Market analysis collaborator feeding the signal generator.
///
/// Confidence, direction, and trend must derive from the supplied price
/// history — implementations must not sample a random source.
pub trait MarketAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    /// Assess the history (oldest price first). Returns `None` when the
    /// data is insufficient or no directional edge is present.
    fn assess(&self, history: &[f64]) -> Option<Assessment>;
}
