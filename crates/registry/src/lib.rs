pub mod bots;
pub mod config;

pub use bots::{Admission, BotCounters, BotRegistry};
pub use config::BotsFileConfig;
