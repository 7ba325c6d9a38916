//! Engine wiring options.

use crate::types::Address;
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Address the engine holds collateral and synthetic tokens under.
    pub contract_address: Address,
    /// Receiver of regular fees and final fees.
    pub store_address: Address,
    /// Receiver of `trim_excess` sweeps.
    pub excess_token_beneficiary: Address,
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            contract_address: Address(0xC0),
            store_address: Address(0x5E),
            excess_token_beneficiary: Address(0xBE),
            max_events: 100_000,
        }
    }
}
