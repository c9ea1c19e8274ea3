use common::{BotConfig, Strategy};
use registry::BotCounters;

/// Stake for the next trade, derived from the bot's strategy tag and its
/// current streaks. Always capped at `max_loss` and never below zero.
pub fn stake_for(bot: &BotConfig, counters: &BotCounters) -> f64 {
    let raw = match bot.strategy {
        // Double the base stake for every loss in the current streak.
        Strategy::Martingale => {
            bot.base_stake * 2f64.powi(counters.consecutive_losses.min(16) as i32)
        }
        // Press winners: double per win in the current streak.
        Strategy::AntiMartingale => {
            bot.base_stake * 2f64.powi(counters.consecutive_wins.min(16) as i32)
        }
        // Walk the Fibonacci sequence by losing-streak length.
        Strategy::Fibonacci => bot.base_stake * fibonacci(counters.consecutive_losses) as f64,
        Strategy::Custom => bot.base_stake,
    };
    raw.clamp(0.0, bot.max_loss)
}

/// fib(0) = 1, fib(1) = 1, fib(2) = 2, ...
fn fibonacci(n: u32) -> u64 {
    let (mut a, mut b) = (1u64, 1u64);
    for _ in 0..n.min(32) {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    a
}
