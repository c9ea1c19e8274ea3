use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, info, warn};

use common::{EngineState, MarketTick, Signal};

use crate::analyzer::MarketAnalyzer;
use crate::rationale;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// How often `produce_all` runs in the loop.
    pub interval: Duration,
    /// Expiry stamped onto every produced signal.
    pub expiry: Duration,
    /// Rolling history length kept per symbol.
    pub max_history: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            expiry: Duration::from_secs(300),
            max_history: 200,
        }
    }
}

/// Produces trading signals from observed market ticks.
///
/// A lazy, infinite, non-restartable source: every produced signal gets a
/// fresh UUID, so a restarted generator never repeats identifiers. All
/// signal content comes from the analyzer over real observed prices —
/// there is no internal randomness.
pub struct SignalGenerator {
    analyzer: Box<dyn MarketAnalyzer>,
    cfg: GeneratorConfig,
    /// Per-symbol rolling window of observed prices, oldest first.
    history: HashMap<String, VecDeque<f64>>,
}

impl SignalGenerator {
    pub fn new(analyzer: Box<dyn MarketAnalyzer>, cfg: GeneratorConfig) -> Self {
        info!(analyzer = analyzer.name(), "SignalGenerator initialized");
        Self {
            analyzer,
            cfg,
            history: HashMap::new(),
        }
    }

    /// Fold one tick into the rolling history.
    pub fn observe(&mut self, tick: &MarketTick) {
        let history = self.history.entry(tick.symbol.clone()).or_default();
        history.push_back(tick.price);
        if history.len() > self.cfg.max_history {
            history.pop_front();
        }
    }

    /// Evaluate one symbol. `None` while the analyzer sees no edge.
    pub fn produce(&mut self, symbol: &str) -> Option<Signal> {
        let history = self.history.get_mut(symbol)?;
        let prices = history.make_contiguous();
        let assessment = self.analyzer.assess(prices)?;
        let entry_price = *prices.last()?;

        let rationale = rationale::rationale_for(
            assessment.direction,
            assessment.trend,
            assessment.confidence,
        );

        Some(Signal::new(
            symbol,
            assessment.direction,
            assessment.confidence,
            self.cfg.expiry,
            entry_price,
            rationale,
            assessment.trend,
        ))
    }

    /// Evaluate every observed symbol once.
    pub fn produce_all(&mut self) -> Vec<Signal> {
        let symbols: Vec<String> = self.history.keys().cloned().collect();
        symbols
            .into_iter()
            .filter_map(|s| self.produce(&s))
            .collect()
    }

    /// Run the generation loop: fold ticks continuously, produce on the
    /// configured interval while the engine is running. Call from
    /// `tokio::spawn`; tests drive `observe`/`produce` directly instead.
    pub async fn run(
        mut self,
        mut tick_rx: broadcast::Receiver<MarketTick>,
        signal_tx: mpsc::Sender<Signal>,
        engine_state: Arc<RwLock<EngineState>>,
    ) {
        info!(interval = ?self.cfg.interval, "SignalGenerator running");
        let mut interval = tokio::time::interval(self.cfg.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                tick = tick_rx.recv() => {
                    match tick {
                        Ok(t) => self.observe(&t),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(dropped = n, "SignalGenerator tick channel lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("Tick broadcast closed — SignalGenerator exiting");
                            return;
                        }
                    }
                }

                _ = interval.tick() => {
                    let state = *engine_state.read().await;
                    if state != EngineState::Running {
                        continue; // suppress production while stopped
                    }
                    for signal in self.produce_all() {
                        debug!(
                            signal = %signal.id,
                            symbol = %signal.symbol,
                            direction = %signal.direction,
                            confidence = signal.confidence,
                            trend = %signal.trend,
                            "Signal produced"
                        );
                        if signal_tx.send(signal).await.is_err() {
                            warn!("Signal channel closed — SignalGenerator exiting");
                            return;
                        }
                    }
                }
            }
        }
    }
}
