use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use common::{EngineCommand, EngineState, TradeEvent};
use registry::BotRegistry;

use crate::log::ExecutionLog;

/// Cloneable handle passed to the presentation layer.
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    state: Arc<RwLock<EngineState>>,
}

impl EngineHandle {
    pub async fn send(&self, cmd: EngineCommand) {
        let _ = self.command_tx.send(cmd).await;
    }

    pub async fn state(&self) -> EngineState {
        *self.state.read().await
    }
}

/// Session lifecycle: processes operator commands and owns the shared
/// engine state read by the signal generator.
///
/// Deactivating a bot cancels its in-flight executions through the log's
/// check-and-set, so each one either settles normally or ends Cancelled —
/// never both.
pub struct Engine {
    state: Arc<RwLock<EngineState>>,
    command_rx: mpsc::Receiver<EngineCommand>,
    #[allow(dead_code)] // kept to prevent channel close
    command_tx: mpsc::Sender<EngineCommand>,
    registry: Arc<BotRegistry>,
    log: Arc<ExecutionLog>,
    event_tx: mpsc::Sender<TradeEvent>,
}

impl Engine {
    pub fn new(
        registry: Arc<BotRegistry>,
        log: Arc<ExecutionLog>,
        event_tx: mpsc::Sender<TradeEvent>,
    ) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let state = Arc::new(RwLock::new(EngineState::Stopped));

        let handle = EngineHandle {
            command_tx: command_tx.clone(),
            state: state.clone(),
        };

        let engine = Engine {
            state,
            command_rx,
            command_tx,
            registry,
            log,
            event_tx,
        };

        (engine, handle)
    }

    /// Shared state read by the generator loop to suppress production.
    pub fn state_handle(&self) -> Arc<RwLock<EngineState>> {
        self.state.clone()
    }

    /// Run the engine. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!("Engine initialized in Stopped state. Waiting for StartAutoTrading.");

        loop {
            match self.command_rx.recv().await {
                Some(EngineCommand::StartAutoTrading) => {
                    let current = *self.state.read().await;
                    if current == EngineState::Running {
                        info!("Auto-trading already running");
                        continue;
                    }
                    info!("Auto-trading started");
                    *self.state.write().await = EngineState::Running;
                }

                Some(EngineCommand::StopAutoTrading) => {
                    info!("Auto-trading stopped — in-flight executions settle normally");
                    *self.state.write().await = EngineState::Stopped;
                }

                Some(EngineCommand::ToggleBot { bot_id, active }) => {
                    match self.registry.toggle(&bot_id, active).await {
                        Ok(_) if !active => self.cancel_in_flight(&bot_id).await,
                        Ok(_) => {}
                        Err(e) => warn!(bot = %bot_id, error = %e, "Toggle failed"),
                    }
                }

                Some(EngineCommand::ResetDailyCounters) => {
                    self.registry.reset_daily_counters().await;
                    let _ = self.event_tx.send(TradeEvent::DailyCountersReset).await;
                }

                None => {
                    warn!("Engine command channel closed — shutting down");
                    break;
                }
            }
        }
    }

    async fn cancel_in_flight(&self, bot_id: &str) {
        for execution in self.log.cancel_open_for_bot(bot_id).await {
            let _ = self
                .event_tx
                .send(TradeEvent::TradeCancelled {
                    execution_id: execution.id,
                    bot_id: bot_id.to_string(),
                })
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use common::{
        BotConfig, Direction, Execution, ExecutionStatus, RiskLimits, Signal, Strategy,
        TradingHours, Trend,
    };
    use std::time::Duration;

    fn make_bot(id: &str) -> BotConfig {
        BotConfig {
            id: id.into(),
            name: format!("Bot {id}"),
            active: true,
            strategy: Strategy::Custom,
            base_stake: 10.0,
            max_loss: 80.0,
            take_profit: 50.0,
            min_confidence: 70,
            max_daily_trades: 10,
            trading_hours: TradingHours::new(
                NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            ),
            symbols: vec!["EUR/USD".into()],
            risk: RiskLimits::default(),
        }
    }

    async fn make_engine() -> (EngineHandle, Arc<RwLock<EngineState>>, Arc<BotRegistry>, Arc<ExecutionLog>, mpsc::Receiver<TradeEvent>)
    {
        let registry = Arc::new(BotRegistry::new(vec![make_bot("b1")]));
        let log = Arc::new(ExecutionLog::new(crate::log::test_pool().await));
        let (event_tx, event_rx) = mpsc::channel(16);

        let (engine, handle) = Engine::new(registry.clone(), log.clone(), event_tx);
        let state = engine.state_handle();
        tokio::spawn(engine.run());

        (handle, state, registry, log, event_rx)
    }

    #[tokio::test]
    async fn start_and_stop_flip_the_state() {
        let (handle, _state, _registry, _log, _events) = make_engine().await;

        assert_eq!(handle.state().await, EngineState::Stopped);
        handle.send(EngineCommand::StartAutoTrading).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.state().await, EngineState::Running);

        handle.send(EngineCommand::StopAutoTrading).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handle.state().await, EngineState::Stopped);
    }

    #[tokio::test]
    async fn deactivating_a_bot_cancels_its_open_executions() {
        let (handle, _state, registry, log, mut events) = make_engine().await;

        let signal = Signal::new(
            "EUR/USD",
            Direction::Call,
            85,
            Duration::from_secs(300),
            1.0845,
            "test",
            Trend::Bullish,
        );
        let exec = Execution::open("b1", &signal, 10.0);
        log.insert(&exec).await.unwrap();

        handle
            .send(EngineCommand::ToggleBot {
                bot_id: "b1".into(),
                active: false,
            })
            .await;

        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("timeout")
            .expect("no event");
        assert!(matches!(event, TradeEvent::TradeCancelled { .. }));
        assert_eq!(
            log.get(&exec.id).await.unwrap().status,
            ExecutionStatus::Cancelled
        );
        assert!(!registry.get("b1").await.unwrap().active);
    }

    #[tokio::test]
    async fn reset_command_clears_daily_counters() {
        let (handle, _state, registry, _log, mut events) = make_engine().await;

        registry
            .admit("b1", |_, _| Ok(()))
            .await
            .unwrap();
        assert_eq!(registry.counters("b1").await.unwrap().trades_today, 1);

        handle.send(EngineCommand::ResetDailyCounters).await;
        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("timeout")
            .expect("no event");
        assert!(matches!(event, TradeEvent::DailyCountersReset));
        assert_eq!(registry.counters("b1").await.unwrap().trades_today, 0);
    }
}
