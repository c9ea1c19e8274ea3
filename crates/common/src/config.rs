/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    // Broker credentials
    pub broker_app_id: String,
    pub broker_api_token: String,

    // Database
    pub database_url: String,

    // Bots config file path
    pub bots_config_path: String,

    // Signal generation
    pub signal_interval_secs: u64,
    pub signal_expiry_secs: u64,

    // Paper broker simulation
    pub paper_initial_balance: f64,
    pub paper_payout_rate: f64,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        Config {
            broker_app_id: required_env("BROKER_APP_ID"),
            broker_api_token: required_env("BROKER_API_TOKEN"),
            database_url: required_env("DATABASE_URL"),
            bots_config_path: optional_env("BOTS_CONFIG_PATH")
                .unwrap_or_else(|| "config/bots.toml".to_string()),
            signal_interval_secs: optional_env("SIGNAL_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            signal_expiry_secs: optional_env("SIGNAL_EXPIRY_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            paper_initial_balance: optional_env("PAPER_INITIAL_BALANCE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000.0),
            paper_payout_rate: optional_env("PAPER_PAYOUT_RATE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.8),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
