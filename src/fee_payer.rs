//! Collateral accounting under a shrinking fee multiplier.
//!
//! Every raw collateral balance in the engine (each position, the global total and the
//! liquidation pot) is stored *before* fees. Its real value is `floor(raw * multiplier)`.
//! Charging a fee only touches the multiplier, so no per-position bookkeeping is needed.
//!
//! Rounding directions:
//! - adjusted value of a raw balance: floor
//! - raw units credited for a deposit: floor
//! - raw units debited for a removal: ceiling
//! - fee percentage taken off the multiplier: ceiling

use crate::fixed_point::{FixedPoint, MathError};
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePayer {
    cumulative_fee_multiplier: FixedPoint,
    last_payment_time: Timestamp,
}

impl FeePayer {
    pub fn new(now: Timestamp) -> Self {
        Self {
            cumulative_fee_multiplier: FixedPoint::ONE,
            last_payment_time: now,
        }
    }

    pub fn cumulative_fee_multiplier(&self) -> FixedPoint {
        self.cumulative_fee_multiplier
    }

    pub fn last_payment_time(&self) -> Timestamp {
        self.last_payment_time
    }

    pub fn adjusted(&self, raw: FixedPoint) -> Result<FixedPoint, MathError> {
        raw.mul(self.cumulative_fee_multiplier)
    }

    pub fn raw_for_deposit(&self, amount: FixedPoint) -> Result<FixedPoint, MathError> {
        amount.div(self.cumulative_fee_multiplier)
    }

    pub fn raw_for_removal(&self, amount: FixedPoint) -> Result<FixedPoint, MathError> {
        amount.div_ceil(self.cumulative_fee_multiplier)
    }

    /// Credits `amount` to a raw balance. Returns the change in its adjusted value,
    /// which may be below `amount` by rounding.
    pub fn add_collateral(&self, raw: &mut FixedPoint, amount: FixedPoint) -> Result<FixedPoint, MathError> {
        let initial = self.adjusted(*raw)?;
        let updated = raw.add(self.raw_for_deposit(amount)?)?;
        let added = self.adjusted(updated)?.sub(initial)?;
        *raw = updated;
        Ok(added)
    }

    /// Debits `amount` from a raw balance. Returns the change in its adjusted value,
    /// which is what the caller should actually pay out.
    pub fn remove_collateral(&self, raw: &mut FixedPoint, amount: FixedPoint) -> Result<FixedPoint, MathError> {
        let initial = self.adjusted(*raw)?;
        let updated = raw.sub(self.raw_for_removal(amount)?)?;
        let removed = initial.sub(self.adjusted(updated)?)?;
        *raw = updated;
        Ok(removed)
    }

    /// Shrinks the multiplier so `fee` comes out of `pfc`. Over-charges by at most one unit of
    /// least precision, never under-charges.
    pub fn apply_fee(&mut self, fee: FixedPoint, pfc: FixedPoint) -> Result<(), MathError> {
        if fee.is_zero() {
            return Ok(());
        }
        let fee_fraction = fee.div_ceil(pfc)?;
        let remaining = FixedPoint::ONE.saturating_sub(fee_fraction);
        self.cumulative_fee_multiplier = self.cumulative_fee_multiplier.mul(remaining)?;
        Ok(())
    }

    pub fn mark_paid(&mut self, now: Timestamp) {
        self.last_payment_time = now;
    }
}

/// Regular fee owed on `pfc` for `elapsed_secs` at `rate_per_second`, capped at all of `pfc`.
pub fn compute_regular_fee(
    pfc: FixedPoint,
    rate_per_second: FixedPoint,
    elapsed_secs: u64,
) -> Result<FixedPoint, MathError> {
    let owed = pfc.mul_unscaled(elapsed_secs)?.mul(rate_per_second)?;
    Ok(owed.min(pfc))
}
