use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use common::{BrokerClient, Execution, TradeEvent, TradeRequest};
use registry::BotRegistry;

use crate::ledger::AccountLedger;
use crate::log::ExecutionLog;

/// Receives approved trade requests from the signal router and submits
/// them to the broker.
///
/// This is the ONLY component that calls `BrokerClient::place_order`. Per
/// request it appends a Pending execution, advances it on the broker ack,
/// and spawns a settlement waiter. A failed placement becomes a terminal
/// Failed execution and is never retried here: blind retry of a financial
/// order is unsafe, so retry policy stays with the operator.
pub struct TradeExecutor {
    order_rx: mpsc::Receiver<TradeRequest>,
    event_tx: mpsc::Sender<TradeEvent>,
    broker: Arc<dyn BrokerClient>,
    log: Arc<ExecutionLog>,
    ledger: Arc<AccountLedger>,
    registry: Arc<BotRegistry>,
}

impl TradeExecutor {
    pub fn new(
        order_rx: mpsc::Receiver<TradeRequest>,
        event_tx: mpsc::Sender<TradeEvent>,
        broker: Arc<dyn BrokerClient>,
        log: Arc<ExecutionLog>,
        ledger: Arc<AccountLedger>,
        registry: Arc<BotRegistry>,
    ) -> Self {
        Self {
            order_rx,
            event_tx,
            broker,
            log,
            ledger,
            registry,
        }
    }

    /// Run the executor loop. Call from `tokio::spawn`.
    pub async fn run(mut self) {
        info!("TradeExecutor running");
        while let Some(request) = self.order_rx.recv().await {
            self.execute(request).await;
        }
        warn!("TradeExecutor: order channel closed");
    }

    async fn execute(&self, request: TradeRequest) {
        let execution = Execution::open(&request.bot.id, &request.signal, request.stake);
        let execution_id = execution.id.clone();

        info!(
            execution = %execution_id,
            bot = %request.bot.id,
            symbol = %request.signal.symbol,
            direction = %request.signal.direction,
            stake = request.stake,
            "Submitting order"
        );

        if let Err(e) = self.log.insert(&execution).await {
            error!(execution = %execution_id, error = %e, "Failed to append execution");
            return;
        }

        match self
            .broker
            .place_order(&request.signal.symbol, request.signal.direction, request.stake)
            .await
        {
            Ok(ack) => {
                if let Err(e) = self.log.mark_executed(&execution_id, ack.entry_price).await {
                    // Cancelled between insert and ack; the broker order is
                    // live but the settlement waiter will find a terminal
                    // status and no-op.
                    warn!(execution = %execution_id, error = %e, "Ack after terminal status");
                }
                let _ = self
                    .event_tx
                    .send(TradeEvent::OrderPlaced {
                        execution_id: execution_id.clone(),
                        bot_id: request.bot.id.clone(),
                        symbol: request.signal.symbol.clone(),
                        direction: request.signal.direction,
                        stake: request.stake,
                    })
                    .await;

                tokio::spawn(await_settlement(
                    self.broker.clone(),
                    self.log.clone(),
                    self.ledger.clone(),
                    self.registry.clone(),
                    self.event_tx.clone(),
                    execution_id,
                    request.bot.id.clone(),
                    ack.order_id,
                ));
            }
            Err(e) => {
                error!(execution = %execution_id, error = %e, "Order placement failed");
                if let Err(log_err) = self.log.fail(&execution_id).await {
                    error!(execution = %execution_id, error = %log_err, "Failed to mark execution failed");
                }
                let _ = self
                    .event_tx
                    .send(TradeEvent::OrderFailed {
                        execution_id,
                        bot_id: request.bot.id.clone(),
                        error: e.to_string(),
                    })
                    .await;
            }
        }
    }
}

/// Wait for the broker's settlement of one order and apply it.
///
/// `ExecutionLog::settle` is the atomic check-and-set: only the caller that
/// observes the transition credits the ledger and updates the bot's
/// counters, so the balance moves exactly once per settled execution.
#[allow(clippy::too_many_arguments)]
async fn await_settlement(
    broker: Arc<dyn BrokerClient>,
    log: Arc<ExecutionLog>,
    ledger: Arc<AccountLedger>,
    registry: Arc<BotRegistry>,
    event_tx: mpsc::Sender<TradeEvent>,
    execution_id: String,
    bot_id: String,
    order_id: String,
) {
    match broker.await_settlement(&order_id).await {
        Ok(settlement) => {
            match log
                .settle(&execution_id, settlement.outcome, settlement.profit)
                .await
            {
                Ok(Some(execution)) => {
                    let balance = ledger.credit(settlement.profit).await;
                    if let Err(e) = registry
                        .record_outcome(&bot_id, settlement.outcome, settlement.profit)
                        .await
                    {
                        warn!(bot = %bot_id, error = %e, "Failed to record outcome");
                    }
                    info!(
                        execution = %execution.id,
                        bot = %bot_id,
                        outcome = %settlement.outcome,
                        profit = settlement.profit,
                        balance,
                        "Trade settled"
                    );
                    let _ = event_tx
                        .send(TradeEvent::TradeSettled {
                            execution_id: execution.id,
                            bot_id,
                            outcome: settlement.outcome,
                            profit: settlement.profit,
                            balance,
                        })
                        .await;
                }
                Ok(None) => {
                    debug!(execution = %execution_id, "Late or duplicate settlement ignored");
                }
                Err(e) => {
                    error!(execution = %execution_id, error = %e, "Settlement bookkeeping failed");
                }
            }
        }
        Err(e) => {
            // No invented outcome: the execution stays Executed and the
            // error is surfaced.
            error!(execution = %execution_id, error = %e, "Settlement wait failed");
            let _ = event_tx
                .send(TradeEvent::SettlementError {
                    execution_id,
                    error: e.to_string(),
                })
                .await;
        }
    }
}
