use serde::{Deserialize, Serialize};

use common::BotConfig;

/// Top-level bots config file (TOML).
///
/// Example `config/bots.toml`:
/// ```toml
/// [[bot]]
/// id = "scalper-eur"
/// name = "EUR Scalper"
/// active = true
/// strategy = "MARTINGALE"
/// base_stake = 10.0
/// max_loss = 80.0
/// take_profit = 50.0
/// min_confidence = 75
/// max_daily_trades = 20
/// symbols = ["EUR/USD", "GBP/USD"]
///
/// [bot.trading_hours]
/// open = "08:00:00"
/// close = "17:00:00"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotsFileConfig {
    #[serde(rename = "bot")]
    pub bots: Vec<BotConfig>,
}

impl BotsFileConfig {
    /// Load from a TOML file. Exits process on error.
    pub fn load(path: &str) -> Self {
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("Failed to read bots config at '{path}': {e}"));
        toml::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse bots config at '{path}': {e}"))
    }
}
