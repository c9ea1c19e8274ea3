pub mod router;
pub mod rules;
pub mod sizing;

pub use router::SignalRouter;
pub use rules::authorize;
pub use sizing::stake_for;
