use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{BrokerClient, Config, Credentials, EngineCommand, TradeEvent};
use engine::{AccountLedger, Engine, ExecutionLog, TradeExecutor};
use gate::SignalRouter;
use paper::{PaperBroker, PaperConfig};
use registry::{BotRegistry, BotsFileConfig};
use signals::{GeneratorConfig, MomentumAnalyzer, SignalGenerator};

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!("OptiBot starting");

    // ── Database ──────────────────────────────────────────────────────────────
    let db = SqlitePool::connect(&cfg.database_url)
        .await
        .unwrap_or_else(|e| panic!("Failed to connect to database: {e}"));
    sqlx::migrate!("../../migrations")
        .run(&db)
        .await
        .unwrap_or_else(|e| panic!("Database migration failed: {e}"));
    info!("Database ready");

    // ── Bot registry ──────────────────────────────────────────────────────────
    let bots_file = BotsFileConfig::load(&cfg.bots_config_path);
    let registry = Arc::new(BotRegistry::from_config(&bots_file));

    // ── Broker (paper simulation) ─────────────────────────────────────────────
    let broker = PaperBroker::new(PaperConfig {
        initial_balance: cfg.paper_initial_balance,
        payout_rate: cfg.paper_payout_rate,
        contract_duration: Duration::from_secs(cfg.signal_expiry_secs),
        ..PaperConfig::default()
    });

    let credentials = Credentials {
        app_id: cfg.broker_app_id.clone(),
        api_token: cfg.broker_api_token.clone(),
    };
    let account = broker
        .connect(&credentials)
        .await
        .unwrap_or_else(|e| panic!("Broker connection failed: {e}"));
    info!(account = %account.account_id, balance = account.balance, "Broker connected");

    // ── Shared state ──────────────────────────────────────────────────────────
    let ledger = Arc::new(AccountLedger::new(account));
    let log = Arc::new(ExecutionLog::new(db.clone()));

    // ── Channels ──────────────────────────────────────────────────────────────
    let (signal_tx, signal_rx) = mpsc::channel::<common::Signal>(128);
    let (order_tx, order_rx) = mpsc::channel::<common::TradeRequest>(128);
    let (event_tx, mut event_rx) = mpsc::channel::<TradeEvent>(64);

    // ── Engine ────────────────────────────────────────────────────────────────
    let (engine, engine_handle) = Engine::new(registry.clone(), log.clone(), event_tx.clone());
    let engine_state = engine.state_handle();

    // ── Signal generator ──────────────────────────────────────────────────────
    let generator = SignalGenerator::new(
        Box::new(MomentumAnalyzer::default()),
        GeneratorConfig {
            interval: Duration::from_secs(cfg.signal_interval_secs),
            expiry: Duration::from_secs(cfg.signal_expiry_secs),
            ..GeneratorConfig::default()
        },
    );
    let tick_rx = broker.subscribe_ticks();

    // ── Gate / router ─────────────────────────────────────────────────────────
    let router = SignalRouter::new(registry.clone(), signal_rx, order_tx, event_tx.clone());

    // ── Trade executor ────────────────────────────────────────────────────────
    let broker_client: Arc<dyn BrokerClient> = broker.clone();
    let executor = TradeExecutor::new(
        order_rx,
        event_tx.clone(),
        broker_client,
        log.clone(),
        ledger.clone(),
        registry.clone(),
    );

    // ── Trade event observer ──────────────────────────────────────────────────
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                TradeEvent::SignalDenied {
                    bot_id,
                    signal_id,
                    reason,
                } => debug!(bot = %bot_id, signal = %signal_id, %reason, "Signal denied"),
                TradeEvent::OrderPlaced {
                    execution_id,
                    bot_id,
                    symbol,
                    direction,
                    stake,
                } => info!(execution = %execution_id, bot = %bot_id, %symbol, %direction, stake, "Order placed"),
                TradeEvent::OrderFailed {
                    execution_id,
                    bot_id,
                    error,
                } => error!(execution = %execution_id, bot = %bot_id, %error, "Order failed"),
                TradeEvent::TradeSettled {
                    execution_id,
                    bot_id,
                    outcome,
                    profit,
                    balance,
                } => info!(execution = %execution_id, bot = %bot_id, %outcome, profit, balance, "Trade settled"),
                TradeEvent::TradeCancelled {
                    execution_id,
                    bot_id,
                } => warn!(execution = %execution_id, bot = %bot_id, "Trade cancelled"),
                TradeEvent::SettlementError {
                    execution_id,
                    error,
                } => error!(execution = %execution_id, %error, "Settlement error"),
                TradeEvent::DailyCountersReset => info!("Daily counters reset"),
            }
        }
    });

    // ── Spawn all tasks ───────────────────────────────────────────────────────
    tokio::spawn(broker.clone().run_market());
    tokio::spawn(engine.run());
    tokio::spawn(generator.run(tick_rx, signal_tx, engine_state));
    tokio::spawn(router.run());
    tokio::spawn(executor.run());
    tokio::spawn(registry::bots::run_daily_reset(registry.clone()));

    engine_handle.send(EngineCommand::StartAutoTrading).await;
    info!("All subsystems started. Waiting for shutdown signal.");

    tokio::signal::ctrl_c()
        .await
        .unwrap_or_else(|e| panic!("Failed to listen for shutdown signal: {e}"));
    info!("Shutdown signal received. Exiting.");
    broker.disconnect().await;
    ledger.set_connected(false).await;
    let account = ledger.snapshot().await;
    info!(balance = account.balance, currency = %account.currency, "Session closed");
}
