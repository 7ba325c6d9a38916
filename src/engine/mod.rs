// 8.0: synthetic asset engine. coordinates sponsor positions, liquidations, fee charging
// and emergency shutdown over one collateral pool.
// deterministic: time comes from the injected clock, prices from the injected oracle.

mod config;
mod core;
mod liquidations;
mod positions;
mod results;
mod shutdown;

pub use config::EngineConfig;
pub use core::Engine;
pub use results::{EngineError, LiquidationOutcome, RewardsData};
