// synth-core: collateralized synthetic asset engine.
// sponsors lock collateral to mint synthetic tokens, liquidators close undercollateralized
// positions, an emergency shutdown settles everyone at a single oracle price.
// all collateral math is 18-decimal fixed point with explicit rounding directions.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Address, Timestamp, LiquidationId, Authorization
//   2.x  fixed_point.rs: U256-backed 18-decimal arithmetic, floor and ceiling variants
//   3.x  fee_payer.rs: cumulative fee multiplier, raw/adjusted collateral conversion
//   4.x  position.rs: sponsor positions and global aggregates
//   5.x  liquidation.rs: liquidation records, dispute outcome, reward split
//   6.x  shutdown.rs: emergency shutdown state and settlement claims
//   7.x  config.rs: contract parameters, validation, env presets
//   8.x  engine/: positions, liquidations, shutdown, fees, rollback
//   9.x  oracle.rs: price requests (mocked)
//   9.1  token.rs: collateral and synthetic ledgers (mocked)
//   9.2  clock.rs: injected time source
//   11.x events.rs: state transition events for audit

// core modules
pub mod engine;
pub mod events;
pub mod fee_payer;
pub mod fixed_point;
pub mod liquidation;
pub mod position;
pub mod shutdown;
pub mod types;

// integration modules
pub mod clock;
pub mod config;
pub mod oracle;
pub mod token;

// re exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ContractConfig, ContractParams, Environment};
pub use engine::*;
pub use events::*;
pub use fee_payer::{compute_regular_fee, FeePayer};
pub use fixed_point::{FixedPoint, MathError};
pub use liquidation::*;
pub use oracle::{MockOracle, Oracle, OracleError};
pub use position::*;
pub use shutdown::{settlement_claim, EmergencyShutdown, SponsorClaim};
pub use token::{TokenError, TokenLedger};
pub use types::*;
