use chrono::{DateTime, Utc};

use common::{BotConfig, DenialReason, Signal, Trend};
use registry::BotCounters;

/// Decide whether `bot` may act on `signal` at `now`.
///
/// Pure function of its inputs; no side effects. The daily-cap check only
/// holds its promise when this runs under the registry's admission lock
/// (`BotRegistry::admit`), which pairs it atomically with the counter
/// increment.
pub fn authorize(
    signal: &Signal,
    bot: &BotConfig,
    counters: &BotCounters,
    now: DateTime<Utc>,
) -> Result<(), DenialReason> {
    if !bot.active {
        return Err(DenialReason::BotInactive);
    }
    if !bot.symbols.iter().any(|s| s == &signal.symbol) {
        return Err(DenialReason::SymbolNotWhitelisted);
    }
    if signal.confidence < bot.min_confidence {
        return Err(DenialReason::ConfidenceBelowMinimum);
    }
    if !bot.trading_hours.contains(now.time()) {
        return Err(DenialReason::OutsideTradingHours);
    }
    if counters.trades_today >= bot.max_daily_trades {
        return Err(DenialReason::DailyTradeCapReached);
    }
    // A flat market is never tradeable for a directional contract.
    if signal.trend == Trend::Sideways {
        return Err(DenialReason::SidewaysMarket);
    }
    if counters.consecutive_losses >= bot.risk.max_consecutive_losses {
        return Err(DenialReason::ConsecutiveLossLimit);
    }
    if counters.pnl_today <= -bot.risk.daily_loss_limit {
        return Err(DenialReason::DailyLossLimit);
    }
    Ok(())
}
