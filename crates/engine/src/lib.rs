pub mod executor;
pub mod ledger;
pub mod lifecycle;
pub mod log;

pub use executor::TradeExecutor;
pub use ledger::AccountLedger;
pub use lifecycle::{Engine, EngineHandle};
pub use log::ExecutionLog;
