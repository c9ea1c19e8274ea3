use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use common::{BotConfig, DenialReason, Error, Result, TradeOutcome};

use crate::config::BotsFileConfig;

/// Runtime performance counters for one bot. Mutated only while holding
/// the registry's write lock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotCounters {
    pub trades_today: u32,
    pub wins: u32,
    pub losses: u32,
    pub consecutive_losses: u32,
    pub consecutive_wins: u32,
    pub pnl_today: f64,
}

#[derive(Debug, Clone)]
struct BotEntry {
    config: BotConfig,
    counters: BotCounters,
}

/// Result of an admission attempt. Carries a post-increment counters
/// snapshot so callers can size stakes without re-locking.
#[derive(Debug, Clone)]
pub enum Admission {
    Approved {
        bot: BotConfig,
        counters: BotCounters,
    },
    Denied(DenialReason),
}

/// Owns all bot configurations and their runtime counters.
///
/// The gate check and the daily-count increment run under one write lock
/// (`admit`), so concurrent signals for the same bot can never push
/// `trades_today` past `max_daily_trades`. Explicitly owned instance with
/// session lifetime; nothing here is global.
pub struct BotRegistry {
    bots: RwLock<HashMap<String, BotEntry>>,
}

impl BotRegistry {
    pub fn new(configs: Vec<BotConfig>) -> Self {
        let bots = configs
            .into_iter()
            .map(|config| {
                info!(bot = %config.id, name = %config.name, strategy = %config.strategy, "Registered bot");
                (
                    config.id.clone(),
                    BotEntry {
                        config,
                        counters: BotCounters::default(),
                    },
                )
            })
            .collect();
        Self {
            bots: RwLock::new(bots),
        }
    }

    pub fn from_config(file_cfg: &BotsFileConfig) -> Self {
        Self::new(file_cfg.bots.clone())
    }

    pub async fn list(&self) -> Vec<BotConfig> {
        self.bots
            .read()
            .await
            .values()
            .map(|e| e.config.clone())
            .collect()
    }

    pub async fn bot_ids(&self) -> Vec<String> {
        self.bots.read().await.keys().cloned().collect()
    }

    pub async fn get(&self, bot_id: &str) -> Option<BotConfig> {
        self.bots.read().await.get(bot_id).map(|e| e.config.clone())
    }

    pub async fn counters(&self, bot_id: &str) -> Option<BotCounters> {
        self.bots
            .read()
            .await
            .get(bot_id)
            .map(|e| e.counters.clone())
    }

    /// Flip a bot's active flag. Returns the previous value.
    pub async fn toggle(&self, bot_id: &str, active: bool) -> Result<bool> {
        let mut bots = self.bots.write().await;
        let entry = bots
            .get_mut(bot_id)
            .ok_or_else(|| Error::UnknownBot(bot_id.to_string()))?;
        let previous = entry.config.active;
        entry.config.active = active;
        info!(bot = %bot_id, active, "Bot toggled");
        Ok(previous)
    }

    /// Atomically evaluate `check` against the bot's config and counters
    /// and, on approval, consume one daily-cap slot. This is the only path
    /// that increments `trades_today`.
    pub async fn admit<F>(&self, bot_id: &str, check: F) -> Result<Admission>
    where
        F: FnOnce(&BotConfig, &BotCounters) -> std::result::Result<(), DenialReason>,
    {
        let mut bots = self.bots.write().await;
        let entry = bots
            .get_mut(bot_id)
            .ok_or_else(|| Error::UnknownBot(bot_id.to_string()))?;

        match check(&entry.config, &entry.counters) {
            Ok(()) => {
                entry.counters.trades_today += 1;
                Ok(Admission::Approved {
                    bot: entry.config.clone(),
                    counters: entry.counters.clone(),
                })
            }
            Err(reason) => Ok(Admission::Denied(reason)),
        }
    }

    /// Record a settled trade's outcome against the bot's counters.
    pub async fn record_outcome(
        &self,
        bot_id: &str,
        outcome: TradeOutcome,
        profit: f64,
    ) -> Result<()> {
        let mut bots = self.bots.write().await;
        let entry = bots
            .get_mut(bot_id)
            .ok_or_else(|| Error::UnknownBot(bot_id.to_string()))?;

        match outcome {
            TradeOutcome::Win => {
                entry.counters.wins += 1;
                entry.counters.consecutive_wins += 1;
                entry.counters.consecutive_losses = 0;
            }
            TradeOutcome::Loss => {
                entry.counters.losses += 1;
                entry.counters.consecutive_losses += 1;
                entry.counters.consecutive_wins = 0;
            }
        }
        entry.counters.pnl_today += profit;
        Ok(())
    }

    /// Zero every bot's daily counters. Invoked once per UTC trading-day
    /// boundary; streak counters survive the boundary.
    pub async fn reset_daily_counters(&self) {
        let mut bots = self.bots.write().await;
        for entry in bots.values_mut() {
            entry.counters.trades_today = 0;
            entry.counters.pnl_today = 0.0;
        }
        info!("Daily bot counters reset");
    }
}

/// Sleep until each UTC midnight and reset the daily counters.
/// Call from `tokio::spawn`.
pub async fn run_daily_reset(registry: Arc<BotRegistry>) {
    loop {
        let now = Utc::now();
        let next_midnight = (now + chrono::Duration::days(1))
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|d| d.and_utc())
            .unwrap_or(now + chrono::Duration::days(1));
        let until = (next_midnight - now)
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(60));

        tokio::time::sleep(until).await;
        registry.reset_daily_counters().await;
    }
}
