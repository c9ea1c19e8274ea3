use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info};

use common::{
    Account, BrokerClient, Credentials, Direction, Error, MarketTick, OrderAck, Result,
    Settlement, TradeOutcome,
};

/// Simulated broker configuration.
#[derive(Debug, Clone)]
pub struct PaperConfig {
    pub initial_balance: f64,
    /// Payout fraction of the stake on a winning contract (e.g. 0.8).
    pub payout_rate: f64,
    /// Contract duration applied to every placed order.
    pub contract_duration: Duration,
    /// Cadence of the synthetic tick stream.
    pub tick_interval: Duration,
    /// Per-tick relative step bound of the random walk.
    pub volatility: f64,
    /// Symbols streamed, with their starting prices.
    pub symbols: Vec<(String, f64)>,
    /// Fixed seed for a reproducible walk; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            initial_balance: 10_000.0,
            payout_rate: 0.8,
            contract_duration: Duration::from_secs(300),
            tick_interval: Duration::from_secs(1),
            volatility: 0.0005,
            symbols: vec![
                ("EUR/USD".into(), 1.0845),
                ("GBP/USD".into(), 1.2634),
                ("USD/JPY".into(), 149.85),
                ("AUD/USD".into(), 0.6652),
                ("USD/CHF".into(), 0.8841),
            ],
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
struct OpenContract {
    symbol: String,
    direction: Direction,
    stake: f64,
    entry_price: f64,
    deadline: tokio::time::Instant,
}

/// Simulated broker for paper trading.
///
/// Streams a random-walk tick sequence per symbol, fills orders at the
/// latest tick, and settles each contract at its expiry by comparing the
/// exit price to the entry price. The outcome is decided by the simulated
/// market, not by a per-trade coin flip. No real orders are ever sent.
pub struct PaperBroker {
    cfg: PaperConfig,
    tick_tx: broadcast::Sender<MarketTick>,
    prices: RwLock<HashMap<String, f64>>,
    contracts: RwLock<HashMap<String, OpenContract>>,
    rng: Mutex<StdRng>,
    connected: AtomicBool,
}

impl PaperBroker {
    pub fn new(cfg: PaperConfig) -> Arc<Self> {
        let (tick_tx, _) = broadcast::channel(1024);
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let prices = cfg
            .symbols
            .iter()
            .cloned()
            .collect::<HashMap<String, f64>>();
        info!(
            balance = cfg.initial_balance,
            payout = cfg.payout_rate,
            symbols = cfg.symbols.len(),
            "PaperBroker initialized"
        );
        Arc::new(Self {
            cfg,
            tick_tx,
            prices: RwLock::new(prices),
            contracts: RwLock::new(HashMap::new()),
            rng: Mutex::new(rng),
            connected: AtomicBool::new(false),
        })
    }

    /// Drive the synthetic market. Call from `tokio::spawn`.
    pub async fn run_market(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.cfg.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            self.step_walk().await;
        }
    }

    /// Advance every symbol one random-walk step and broadcast the ticks.
    pub async fn step_walk(&self) {
        let mut prices = self.prices.write().await;
        let mut rng = self.rng.lock().await;
        for (symbol, price) in prices.iter_mut() {
            let step: f64 = rng.gen_range(-self.cfg.volatility..=self.cfg.volatility);
            *price *= 1.0 + step;
            let _ = self.tick_tx.send(MarketTick {
                symbol: symbol.clone(),
                price: *price,
                timestamp: Utc::now(),
            });
        }
    }

    /// Pin a symbol's price. Used by tests to script market outcomes.
    pub async fn set_price(&self, symbol: &str, price: f64) {
        self.prices.write().await.insert(symbol.to_string(), price);
        let _ = self.tick_tx.send(MarketTick {
            symbol: symbol.to_string(),
            price,
            timestamp: Utc::now(),
        });
    }

    async fn latest_price(&self, symbol: &str) -> Result<f64> {
        self.prices
            .read()
            .await
            .get(symbol)
            .copied()
            .ok_or_else(|| Error::Broker(format!("no market for symbol '{symbol}'")))
    }
}

#[async_trait]
impl BrokerClient for PaperBroker {
    async fn connect(&self, credentials: &Credentials) -> Result<Account> {
        if credentials.api_token.trim().is_empty() {
            return Err(Error::Connection("empty API token".into()));
        }
        self.connected.store(true, Ordering::SeqCst);
        info!(app_id = %credentials.app_id, "Paper session connected");
        Ok(Account {
            account_id: "VRTC12345".into(),
            balance: self.cfg.initial_balance,
            currency: "USD".into(),
            connected: true,
        })
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        info!("Paper session disconnected");
    }

    fn subscribe_ticks(&self) -> broadcast::Receiver<MarketTick> {
        self.tick_tx.subscribe()
    }

    async fn place_order(
        &self,
        symbol: &str,
        direction: Direction,
        stake: f64,
    ) -> Result<OrderAck> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(Error::Connection("paper session not connected".into()));
        }
        if stake <= 0.0 {
            return Err(Error::OrderRejected(format!("non-positive stake {stake}")));
        }
        let entry_price = self.latest_price(symbol).await?;

        let order_id = uuid::Uuid::new_v4().to_string();
        self.contracts.write().await.insert(
            order_id.clone(),
            OpenContract {
                symbol: symbol.to_string(),
                direction,
                stake,
                entry_price,
                deadline: tokio::time::Instant::now() + self.cfg.contract_duration,
            },
        );
        debug!(order = %order_id, %symbol, %direction, stake, entry_price, "Paper contract opened");

        Ok(OrderAck {
            order_id,
            entry_price,
        })
    }

    async fn await_settlement(&self, order_id: &str) -> Result<Settlement> {
        let contract = self
            .contracts
            .read()
            .await
            .get(order_id)
            .cloned()
            .ok_or_else(|| Error::Broker(format!("unknown order '{order_id}'")))?;

        tokio::time::sleep_until(contract.deadline).await;

        let exit_price = self.latest_price(&contract.symbol).await?;
        // Ties go to the house.
        let won = match contract.direction {
            Direction::Call => exit_price > contract.entry_price,
            Direction::Put => exit_price < contract.entry_price,
        };
        let (outcome, profit) = if won {
            (TradeOutcome::Win, contract.stake * self.cfg.payout_rate)
        } else {
            (TradeOutcome::Loss, -contract.stake)
        };

        self.contracts.write().await.remove(order_id);
        debug!(
            order = %order_id,
            %outcome,
            entry = contract.entry_price,
            exit = exit_price,
            profit,
            "Paper contract settled"
        );

        Ok(Settlement {
            order_id: order_id.to_string(),
            outcome,
            exit_price,
            profit,
        })
    }
}
