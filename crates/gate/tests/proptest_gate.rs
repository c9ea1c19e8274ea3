use chrono::{NaiveTime, TimeZone, Utc};
use proptest::prelude::*;
use std::time::Duration;

use common::{
    BotConfig, DenialReason, Direction, RiskLimits, Signal, Strategy, TradingHours, Trend,
};
use gate::{authorize, stake_for};
use registry::BotCounters;

fn any_trend() -> impl proptest::strategy::Strategy<Value = Trend> {
    prop_oneof![
        Just(Trend::Bullish),
        Just(Trend::Bearish),
        Just(Trend::Sideways),
    ]
}

fn any_strategy() -> impl proptest::strategy::Strategy<Value = Strategy> {
    prop_oneof![
        Just(Strategy::Martingale),
        Just(Strategy::AntiMartingale),
        Just(Strategy::Fibonacci),
        Just(Strategy::Custom),
    ]
}

fn make_bot(min_confidence: u8, max_daily_trades: u32, strategy: Strategy) -> BotConfig {
    BotConfig {
        id: "b1".into(),
        name: "Prop".into(),
        active: true,
        strategy,
        base_stake: 10.0,
        max_loss: 500.0,
        take_profit: 50.0,
        min_confidence,
        max_daily_trades,
        trading_hours: TradingHours::new(
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        ),
        symbols: vec!["EUR/USD".into()],
        risk: RiskLimits {
            max_consecutive_losses: u32::MAX,
            daily_loss_limit: f64::INFINITY,
            ..RiskLimits::default()
        },
    }
}

fn make_signal(confidence: u8, trend: Trend, entry_price: f64) -> Signal {
    Signal::new(
        "EUR/USD",
        Direction::Call,
        confidence,
        Duration::from_secs(300),
        entry_price,
        "prop",
        trend,
    )
}

proptest! {
    /// A sideways trend is never tradeable, whatever the other fields say.
    #[test]
    fn sideways_is_never_authorized(
        confidence in 0u8..=100,
        min_confidence in 0u8..=100,
        trades_today in 0u32..1000,
        max_daily_trades in 1u32..1000,
    ) {
        let bot = make_bot(min_confidence, max_daily_trades, Strategy::Custom);
        let counters = BotCounters { trades_today, ..BotCounters::default() };
        let signal = make_signal(confidence, Trend::Sideways, 1.0);
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();

        prop_assert_ne!(authorize(&signal, &bot, &counters, now), Ok(()));
    }

    /// Once the daily count has hit the cap, nothing gets through.
    #[test]
    fn full_daily_cap_is_never_authorized(
        confidence in 0u8..=100,
        max_daily_trades in 0u32..1000,
        over in 0u32..10,
        trend in any_trend(),
    ) {
        let bot = make_bot(0, max_daily_trades, Strategy::Custom);
        let counters = BotCounters {
            trades_today: max_daily_trades + over,
            ..BotCounters::default()
        };
        let signal = make_signal(confidence, trend, 1.0);
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();

        prop_assert_ne!(authorize(&signal, &bot, &counters, now), Ok(()));
    }

    /// Authorization implies every individual rule held.
    #[test]
    fn approval_implies_all_rules_hold(
        confidence in 0u8..=100,
        min_confidence in 0u8..=100,
        trades_today in 0u32..100,
        max_daily_trades in 1u32..100,
        trend in any_trend(),
    ) {
        let bot = make_bot(min_confidence, max_daily_trades, Strategy::Custom);
        let counters = BotCounters { trades_today, ..BotCounters::default() };
        let signal = make_signal(confidence, trend, 1.0);
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();

        if authorize(&signal, &bot, &counters, now) == Ok(()) {
            prop_assert!(signal.confidence >= bot.min_confidence);
            prop_assert!(counters.trades_today < bot.max_daily_trades);
            prop_assert_ne!(signal.trend, Trend::Sideways);
        }
    }

    /// Rule evaluation and stake sizing must never panic and always
    /// produce a finite stake within the per-trade cap.
    #[test]
    fn sizing_never_panics_and_respects_cap(
        consecutive_losses in 0u32..10_000,
        consecutive_wins in 0u32..10_000,
        strategy in any_strategy(),
    ) {
        let bot = make_bot(0, 100, strategy);
        let counters = BotCounters {
            consecutive_losses,
            consecutive_wins,
            ..BotCounters::default()
        };
        let stake = stake_for(&bot, &counters);
        prop_assert!(stake.is_finite());
        prop_assert!(stake >= 0.0);
        prop_assert!(stake <= bot.max_loss);
    }
}
