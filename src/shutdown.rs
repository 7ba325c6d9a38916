// 6.0: emergency shutdown state. set once, never cleared.
// 6.1 settlement_claim is what one caller is owed; the engine caps it by what is left.

use crate::fixed_point::{FixedPoint, MathError};
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyShutdown {
    timestamp: Option<Timestamp>,
    price: Option<FixedPoint>,
}

impl EmergencyShutdown {
    pub fn is_shutdown(&self) -> bool {
        self.timestamp.is_some()
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    pub fn price(&self) -> Option<FixedPoint> {
        self.price
    }

    /// Returns false if already shut down.
    pub fn trigger(&mut self, now: Timestamp) -> bool {
        if self.timestamp.is_some() {
            return false;
        }
        self.timestamp = Some(now);
        true
    }

    /// Keeps the first price ever pinned and returns it.
    pub fn pin_price(&mut self, price: FixedPoint) -> FixedPoint {
        *self.price.get_or_insert(price)
    }
}

/// A sponsor's collateral and debt at settlement time.
#[derive(Debug, Clone, Copy)]
pub struct SponsorClaim {
    pub collateral: FixedPoint,
    pub tokens_outstanding: FixedPoint,
}

// 6.1: token holders are owned tokens * price. a sponsor additionally gets back whatever
// collateral exceeds their own debt value. never negative.
pub fn settlement_claim(
    tokens_to_redeem: FixedPoint,
    price: FixedPoint,
    sponsor: Option<SponsorClaim>,
) -> Result<FixedPoint, MathError> {
    let redeemable = tokens_to_redeem.mul(price)?;
    let Some(sponsor) = sponsor else {
        return Ok(redeemable);
    };
    let debt_value = sponsor.tokens_outstanding.mul(price)?;
    redeemable.add(sponsor.collateral.saturating_sub(debt_value))
}
