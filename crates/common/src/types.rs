use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Contract direction of a binary option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum Direction {
    Call,
    Put,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Call => write!(f, "CALL"),
            Direction::Put => write!(f, "PUT"),
        }
    }
}

/// Market trend classification attached to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Bullish,
    Bearish,
    Sideways,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Bullish => write!(f, "BULLISH"),
            Trend::Bearish => write!(f, "BEARISH"),
            Trend::Sideways => write!(f, "SIDEWAYS"),
        }
    }
}

/// A generated recommendation to buy a CALL/PUT contract on a symbol.
/// Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub symbol: String,
    pub direction: Direction,
    /// Analyzer confidence, 0–100.
    pub confidence: u8,
    pub issued_at: DateTime<Utc>,
    /// How long after execution the contract runs before settlement.
    pub expiry: Duration,
    /// Reference price at signal time.
    pub entry_price: f64,
    /// Canned human-readable explanation of the signal.
    pub rationale: String,
    pub trend: Trend,
}

impl Signal {
    pub fn new(
        symbol: impl Into<String>,
        direction: Direction,
        confidence: u8,
        expiry: Duration,
        entry_price: f64,
        rationale: impl Into<String>,
        trend: Trend,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            direction,
            confidence: confidence.min(100),
            issued_at: Utc::now(),
            expiry,
            entry_price,
            rationale: rationale.into(),
            trend,
        }
    }
}

/// Stake-sizing strategy tag carried by a bot configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    Martingale,
    AntiMartingale,
    Fibonacci,
    Custom,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Martingale => write!(f, "MARTINGALE"),
            Strategy::AntiMartingale => write!(f, "ANTI_MARTINGALE"),
            Strategy::Fibonacci => write!(f, "FIBONACCI"),
            Strategy::Custom => write!(f, "CUSTOM"),
        }
    }
}

/// Daily trading window in UTC. `open == close` means always open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl TradingHours {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    /// Whether `t` falls inside the window. Windows may wrap midnight
    /// (e.g. 22:00–06:00).
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.open == self.close {
            return true;
        }
        if self.open < self.close {
            self.open <= t && t < self.close
        } else {
            t >= self.open || t < self.close
        }
    }
}

/// Per-bot risk parameters, loaded from the bots config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Portfolio drawdown fraction that should halt the bot (e.g. 0.10 = 10%).
    pub max_drawdown_pct: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    /// Losing streak length at which the bot stops taking signals.
    pub max_consecutive_losses: u32,
    /// Realized daily loss (in account currency) at which the bot stops.
    pub daily_loss_limit: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_drawdown_pct: 0.10,
            stop_loss_pct: 0.02,
            take_profit_pct: 0.04,
            max_consecutive_losses: 3,
            daily_loss_limit: 100.0,
        }
    }
}

/// Configuration of one automated bot. Owned by the Bot Registry;
/// mutated only through registry operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub id: String,
    pub name: String,
    /// Master switch: an inactive bot never receives executions.
    pub active: bool,
    pub strategy: Strategy,
    /// Stake in account currency before strategy sizing.
    pub base_stake: f64,
    /// Hard cap on the stake of any single trade.
    pub max_loss: f64,
    pub take_profit: f64,
    /// Minimum signal confidence (0–100) the bot will act on.
    pub min_confidence: u8,
    pub max_daily_trades: u32,
    pub trading_hours: TradingHours,
    /// Symbols this bot is allowed to trade.
    pub symbols: Vec<String>,
    #[serde(default)]
    pub risk: RiskLimits,
}

/// Lifecycle state of one order. Transitions are monotonic:
/// Pending → Executed → Won|Lost, Pending → Failed,
/// or Pending|Executed → Cancelled. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum ExecutionStatus {
    Pending,
    Executed,
    Won,
    Lost,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Won
                | ExecutionStatus::Lost
                | ExecutionStatus::Failed
                | ExecutionStatus::Cancelled
        )
    }

    pub fn can_transition_to(self, next: ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        matches!(
            (self, next),
            (Pending, Executed)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Executed, Won)
                | (Executed, Lost)
                | (Executed, Cancelled)
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "PENDING"),
            ExecutionStatus::Executed => write!(f, "EXECUTED"),
            ExecutionStatus::Won => write!(f, "WON"),
            ExecutionStatus::Lost => write!(f, "LOST"),
            ExecutionStatus::Failed => write!(f, "FAILED"),
            ExecutionStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// One order lifecycle instance tied to one signal and one bot.
/// Forms an append-only trade log: created once, mutated only by the
/// executed/settlement steps, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: String,
    pub bot_id: String,
    pub signal_id: String,
    pub symbol: String,
    pub direction: Direction,
    pub stake: f64,
    pub entry_price: f64,
    pub executed_at: DateTime<Utc>,
    pub status: ExecutionStatus,
    /// Set exactly once, on settlement.
    pub profit: Option<f64>,
}

impl Execution {
    pub fn open(bot_id: impl Into<String>, signal: &Signal, stake: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            bot_id: bot_id.into(),
            signal_id: signal.id.clone(),
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            stake,
            entry_price: signal.entry_price,
            executed_at: Utc::now(),
            status: ExecutionStatus::Pending,
            profit: None,
        }
    }

    /// Apply a status transition, rejecting anything non-monotonic.
    pub fn transition(&mut self, next: ExecutionStatus) -> crate::Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(crate::Error::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Settlement outcome of an executed contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeOutcome {
    Win,
    Loss,
}

impl std::fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeOutcome::Win => write!(f, "WIN"),
            TradeOutcome::Loss => write!(f, "LOSS"),
        }
    }
}

/// Broker account. Singleton per session; balance mutated only by
/// settlement, under the account ledger's single-writer lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub balance: f64,
    pub currency: String,
    pub connected: bool,
}

/// One price update from the broker market-data stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketTick {
    pub symbol: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// An approved signal paired with the bot acting on it, headed for the
/// trade executor.
#[derive(Debug, Clone)]
pub struct TradeRequest {
    pub signal: Signal,
    pub bot: BotConfig,
    pub stake: f64,
}

/// Current state of the auto-trading session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Stopped,
    Running,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Stopped => write!(f, "stopped"),
            EngineState::Running => write!(f, "running"),
        }
    }
}

/// Commands sent to the engine via the command channel.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    StartAutoTrading,
    StopAutoTrading,
    ToggleBot { bot_id: String, active: bool },
    ResetDailyCounters,
}

/// Reason the execution gate denied a signal for a bot. A denial is an
/// expected outcome, not an error; it is surfaced for observability only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialReason {
    BotInactive,
    SymbolNotWhitelisted,
    ConfidenceBelowMinimum,
    OutsideTradingHours,
    DailyTradeCapReached,
    SidewaysMarket,
    ConsecutiveLossLimit,
    DailyLossLimit,
}

impl std::fmt::Display for DenialReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenialReason::BotInactive => write!(f, "bot inactive"),
            DenialReason::SymbolNotWhitelisted => write!(f, "symbol not whitelisted"),
            DenialReason::ConfidenceBelowMinimum => write!(f, "confidence below minimum"),
            DenialReason::OutsideTradingHours => write!(f, "outside trading hours"),
            DenialReason::DailyTradeCapReached => write!(f, "daily trade cap reached"),
            DenialReason::SidewaysMarket => write!(f, "sideways market"),
            DenialReason::ConsecutiveLossLimit => write!(f, "consecutive loss limit reached"),
            DenialReason::DailyLossLimit => write!(f, "daily loss limit reached"),
        }
    }
}

/// Events emitted by the gate and executor for observability.
#[derive(Debug, Clone)]
pub enum TradeEvent {
    SignalDenied {
        bot_id: String,
        signal_id: String,
        reason: DenialReason,
    },
    OrderPlaced {
        execution_id: String,
        bot_id: String,
        symbol: String,
        direction: Direction,
        stake: f64,
    },
    OrderFailed {
        execution_id: String,
        bot_id: String,
        error: String,
    },
    TradeSettled {
        execution_id: String,
        bot_id: String,
        outcome: TradeOutcome,
        profit: f64,
        balance: f64,
    },
    TradeCancelled {
        execution_id: String,
        bot_id: String,
    },
    SettlementError {
        execution_id: String,
        error: String,
    },
    DailyCountersReset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample_signal() -> Signal {
        Signal::new(
            "EUR/USD",
            Direction::Call,
            82,
            Duration::from_secs(300),
            1.0845,
            "test",
            Trend::Bullish,
        )
    }

    #[test]
    fn confidence_is_clamped_to_100() {
        let s = Signal::new(
            "EUR/USD",
            Direction::Put,
            255,
            Duration::from_secs(60),
            1.0,
            "test",
            Trend::Bearish,
        );
        assert_eq!(s.confidence, 100);
    }

    #[test]
    fn fresh_executions_start_pending() {
        let exec = Execution::open("bot-1", &sample_signal(), 10.0);
        assert_eq!(exec.status, ExecutionStatus::Pending);
        assert!(exec.profit.is_none());
    }

    #[test]
    fn valid_transition_paths_are_accepted() {
        let signal = sample_signal();

        let mut exec = Execution::open("bot-1", &signal, 10.0);
        exec.transition(ExecutionStatus::Executed).unwrap();
        exec.transition(ExecutionStatus::Won).unwrap();

        let mut exec = Execution::open("bot-1", &signal, 10.0);
        exec.transition(ExecutionStatus::Failed).unwrap();

        let mut exec = Execution::open("bot-1", &signal, 10.0);
        exec.transition(ExecutionStatus::Executed).unwrap();
        exec.transition(ExecutionStatus::Cancelled).unwrap();
    }

    #[test]
    fn terminal_states_never_change() {
        let mut exec = Execution::open("bot-1", &sample_signal(), 10.0);
        exec.transition(ExecutionStatus::Executed).unwrap();
        exec.transition(ExecutionStatus::Won).unwrap();

        for next in [
            ExecutionStatus::Pending,
            ExecutionStatus::Executed,
            ExecutionStatus::Lost,
            ExecutionStatus::Failed,
            ExecutionStatus::Cancelled,
        ] {
            assert!(exec.transition(next).is_err(), "Won → {next} must fail");
            assert_eq!(exec.status, ExecutionStatus::Won);
        }
    }

    #[test]
    fn settled_skipping_executed_is_rejected() {
        let mut exec = Execution::open("bot-1", &sample_signal(), 10.0);
        assert!(exec.transition(ExecutionStatus::Won).is_err());
        assert!(exec.transition(ExecutionStatus::Lost).is_err());
    }

    #[test]
    fn trading_hours_plain_window() {
        let hours = TradingHours::new(
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        );
        assert!(hours.contains(NaiveTime::from_hms_opt(8, 0, 0).unwrap()));
        assert!(hours.contains(NaiveTime::from_hms_opt(12, 30, 0).unwrap()));
        assert!(!hours.contains(NaiveTime::from_hms_opt(17, 0, 0).unwrap()));
        assert!(!hours.contains(NaiveTime::from_hms_opt(3, 0, 0).unwrap()));
    }

    #[test]
    fn trading_hours_wraps_midnight() {
        let hours = TradingHours::new(
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        );
        assert!(hours.contains(NaiveTime::from_hms_opt(23, 15, 0).unwrap()));
        assert!(hours.contains(NaiveTime::from_hms_opt(2, 0, 0).unwrap()));
        assert!(!hours.contains(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
    }

    #[test]
    fn trading_hours_equal_bounds_means_always_open() {
        let t = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        let hours = TradingHours::new(t, t);
        assert!(hours.contains(NaiveTime::from_hms_opt(13, 37, 0).unwrap()));
    }
}
