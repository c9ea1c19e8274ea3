pub mod analyzer;
pub mod generator;
pub mod momentum;
pub mod rationale;

pub use analyzer::{Assessment, MarketAnalyzer};
pub use generator::{GeneratorConfig, SignalGenerator};
pub use momentum::MomentumAnalyzer;
