use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use common::{Signal, TradeEvent, TradeRequest};
use registry::{Admission, BotRegistry};

use crate::{rules, sizing};

/// The gatekeeper between signal generation and the trade executor.
///
/// Every signal fans out across all registered bots; each bot's
/// authorization runs atomically against its counters via
/// `BotRegistry::admit`. Approved signals become `TradeRequest`s on the
/// order channel; denials are observability events only.
pub struct SignalRouter {
    registry: Arc<BotRegistry>,
    signal_rx: mpsc::Receiver<Signal>,
    order_tx: mpsc::Sender<TradeRequest>,
    event_tx: mpsc::Sender<TradeEvent>,
}

impl SignalRouter {
    pub fn new(
        registry: Arc<BotRegistry>,
        signal_rx: mpsc::Receiver<Signal>,
        order_tx: mpsc::Sender<TradeRequest>,
        event_tx: mpsc::Sender<TradeEvent>,
    ) -> Self {
        Self {
            registry,
            signal_rx,
            order_tx,
            event_tx,
        }
    }

    /// Run the routing loop. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!("SignalRouter running");
        while let Some(signal) = self.signal_rx.recv().await {
            self.route(signal).await;
        }
        warn!("SignalRouter: signal channel closed");
    }

    async fn route(&self, signal: Signal) {
        for bot_id in self.registry.bot_ids().await {
            let admission = self
                .registry
                .admit(&bot_id, |bot, counters| {
                    rules::authorize(&signal, bot, counters, Utc::now())
                })
                .await;

            match admission {
                Ok(Admission::Approved { bot, counters }) => {
                    let stake = sizing::stake_for(&bot, &counters);
                    info!(
                        bot = %bot.id,
                        signal = %signal.id,
                        symbol = %signal.symbol,
                        direction = %signal.direction,
                        stake,
                        "Signal authorized"
                    );
                    if self
                        .order_tx
                        .send(TradeRequest {
                            signal: signal.clone(),
                            bot,
                            stake,
                        })
                        .await
                        .is_err()
                    {
                        warn!("Order channel closed — stopping signal routing");
                        return;
                    }
                }
                Ok(Admission::Denied(reason)) => {
                    debug!(bot = %bot_id, signal = %signal.id, reason = %reason, "Signal denied");
                    let _ = self
                        .event_tx
                        .send(TradeEvent::SignalDenied {
                            bot_id: bot_id.clone(),
                            signal_id: signal.id.clone(),
                            reason,
                        })
                        .await;
                }
                Err(e) => {
                    warn!(bot = %bot_id, error = %e, "Admission failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use common::{BotConfig, DenialReason, Direction, RiskLimits, Strategy, TradingHours, Trend};
    use std::time::Duration;

    fn make_bot(max_daily_trades: u32, min_confidence: u8) -> BotConfig {
        BotConfig {
            id: "b1".into(),
            name: "Test".into(),
            active: true,
            strategy: Strategy::Custom,
            base_stake: 10.0,
            max_loss: 80.0,
            take_profit: 50.0,
            min_confidence,
            max_daily_trades,
            trading_hours: TradingHours::new(
                NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            ),
            symbols: vec!["EUR/USD".into()],
            risk: RiskLimits::default(),
        }
    }

    fn make_signal(confidence: u8) -> Signal {
        Signal::new(
            "EUR/USD",
            Direction::Call,
            confidence,
            Duration::from_secs(300),
            1.0845,
            "test",
            Trend::Bullish,
        )
    }

    #[tokio::test]
    async fn two_qualifying_signals_through_cap_of_one_yield_one_request() {
        let registry = Arc::new(BotRegistry::new(vec![make_bot(1, 80)]));
        let (signal_tx, signal_rx) = mpsc::channel(8);
        let (order_tx, mut order_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);

        tokio::spawn(SignalRouter::new(registry, signal_rx, order_tx, event_tx).run());

        signal_tx.send(make_signal(90)).await.unwrap();
        signal_tx.send(make_signal(95)).await.unwrap();

        let request = tokio::time::timeout(Duration::from_secs(1), order_rx.recv())
            .await
            .expect("timeout")
            .expect("no request");
        assert_eq!(request.bot.id, "b1");

        let event = tokio::time::timeout(Duration::from_secs(1), event_rx.recv())
            .await
            .expect("timeout")
            .expect("no event");
        assert!(matches!(
            event,
            TradeEvent::SignalDenied {
                reason: DenialReason::DailyTradeCapReached,
                ..
            }
        ));

        // No second request may arrive.
        let extra = tokio::time::timeout(Duration::from_millis(100), order_rx.recv()).await;
        assert!(extra.is_err(), "second signal must not produce a request");
    }

    #[tokio::test]
    async fn low_confidence_signal_is_denied() {
        let registry = Arc::new(BotRegistry::new(vec![make_bot(5, 80)]));
        let (signal_tx, signal_rx) = mpsc::channel(8);
        let (order_tx, mut order_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::channel(8);

        tokio::spawn(SignalRouter::new(registry, signal_rx, order_tx, event_tx).run());

        signal_tx.send(make_signal(75)).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), event_rx.recv())
            .await
            .expect("timeout")
            .expect("no event");
        assert!(matches!(
            event,
            TradeEvent::SignalDenied {
                reason: DenialReason::ConfidenceBelowMinimum,
                ..
            }
        ));
        assert!(
            tokio::time::timeout(Duration::from_millis(100), order_rx.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn stake_uses_strategy_sizing() {
        let mut bot = make_bot(5, 50);
        bot.strategy = Strategy::Martingale;
        let registry = Arc::new(BotRegistry::new(vec![bot]));

        // Two prior losses: martingale should quadruple the base stake.
        registry
            .record_outcome("b1", common::TradeOutcome::Loss, -10.0)
            .await
            .unwrap();
        registry
            .record_outcome("b1", common::TradeOutcome::Loss, -10.0)
            .await
            .unwrap();

        let (signal_tx, signal_rx) = mpsc::channel(8);
        let (order_tx, mut order_rx) = mpsc::channel(8);
        let (event_tx, _event_rx) = mpsc::channel(8);

        tokio::spawn(SignalRouter::new(registry, signal_rx, order_tx, event_tx).run());
        signal_tx.send(make_signal(90)).await.unwrap();

        let request = tokio::time::timeout(Duration::from_secs(1), order_rx.recv())
            .await
            .expect("timeout")
            .expect("no request");
        assert_eq!(request.stake, 40.0);
    }
}
