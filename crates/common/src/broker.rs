use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{Account, Direction, MarketTick, Result, TradeOutcome};

/// Credentials presented to the broker on connect.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub app_id: String,
    pub api_token: String,
}

/// Broker acknowledgement of a placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    /// Price the contract actually opened at.
    pub entry_price: f64,
}

/// Settlement notification for one order: the market outcome at expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub order_id: String,
    pub outcome: TradeOutcome,
    pub exit_price: f64,
    /// Realized profit: positive payout on a win, negative stake on a loss.
    pub profit: f64,
}

/// Abstraction over the broker connection.
///
/// `PaperBroker` in `crates/paper` implements this for simulation. A live
/// client would implement the same surface against a real broker API.
///
/// Only the trade executor in `crates/engine` should hold a reference to a
/// `dyn BrokerClient` for order flow. All orders must pass the execution
/// gate before reaching the executor.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Establish the session. Returns the account snapshot on success and
    /// `Error::Connection` on failure. No automatic reconnect is attempted;
    /// the caller decides.
    async fn connect(&self, credentials: &Credentials) -> Result<Account>;

    /// Tear the session down.
    async fn disconnect(&self);

    /// Subscribe to the live market-data stream.
    fn subscribe_ticks(&self) -> broadcast::Receiver<MarketTick>;

    /// Submit one binary-option order. Bounded-latency external call.
    async fn place_order(&self, symbol: &str, direction: Direction, stake: f64)
        -> Result<OrderAck>;

    /// Wait for the settlement of a previously placed order. Resolves when
    /// the contract expires; outcome and exit price come from the market,
    /// never from the caller.
    async fn await_settlement(&self, order_id: &str) -> Result<Settlement>;
}
