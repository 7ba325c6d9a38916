// 1.0: primitives shared by every component. addresses, timestamps, ids, capabilities.
// each is a newtype so the compiler catches type mixups between sponsors, ids and times.

use serde::{Deserialize, Serialize};
use std::fmt;

// 1.1: an actor or contract. sponsors, liquidators, disputers, the engine itself, the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

// 1.2: index into a sponsor's liquidation list. starts at 0, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LiquidationId(pub u64);

impl LiquidationId {
    pub fn index(&self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

// 1.3: second resolution timestamp. always supplied by a Clock, never sampled inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    pub fn secs_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn to_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let secs = i64::try_from(self.0).ok()?;
        chrono::DateTime::from_timestamp(secs, 0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "{}s", self.0),
        }
    }
}

// 1.4: the oracle identifier a contract is priced against, e.g. "EUR/USD".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceIdentifier(pub String);

impl PriceIdentifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PriceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// 1.5: the two tokens a contract holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Collateral,
    Synthetic,
}

// 1.6: capability object. the engine holds one for minting/burning the synthetic,
// callers pass one in for administrative actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Authorization {
    pub can_mint: bool,
    pub can_burn: bool,
    pub can_manage: bool,
}

impl Authorization {
    pub fn full() -> Self {
        Self {
            can_mint: true,
            can_burn: true,
            can_manage: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn manager() -> Self {
        Self {
            can_manage: true,
            ..Self::default()
        }
    }
}
