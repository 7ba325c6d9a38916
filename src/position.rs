// 4.0: sponsor positions and the global aggregates over them.
// all collateral here is raw (pre-fee). convert through FeePayer before showing it to anyone.
// 4.1 has the increment/decrement/delete paths that keep the aggregates in step.

use crate::fee_payer::FeePayer;
use crate::fixed_point::{FixedPoint, MathError};
use crate::types::{Address, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub raw_collateral: FixedPoint,
    pub tokens_outstanding: FixedPoint,
    pub withdrawal_request_amount: FixedPoint,
    pub withdrawal_request_pass_timestamp: Option<Timestamp>,
}

impl Position {
    pub fn has_pending_withdrawal(&self) -> bool {
        self.withdrawal_request_pass_timestamp.is_some()
    }

    pub fn reset_withdrawal_request(&mut self) {
        self.withdrawal_request_amount = FixedPoint::ZERO;
        self.withdrawal_request_pass_timestamp = None;
    }

    pub fn collateral(&self, fees: &FeePayer) -> Result<FixedPoint, MathError> {
        fees.adjusted(self.raw_collateral)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalPositionData {
    pub raw_total_position_collateral: FixedPoint,
    pub total_tokens_outstanding: FixedPoint,
}

/// Collateral per token. The ratio of zero tokens is zero, so an empty pool never blocks anyone.
pub fn collateralization_ratio(collateral: FixedPoint, tokens: FixedPoint) -> Result<FixedPoint, MathError> {
    if tokens.is_zero() {
        return Ok(FixedPoint::ZERO);
    }
    collateral.div(tokens)
}

#[derive(Debug, Clone, Default)]
pub struct PositionStore {
    positions: HashMap<Address, Position>,
    global: GlobalPositionData,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sponsor: &Address) -> Option<&Position> {
        self.positions.get(sponsor)
    }

    pub fn get_mut(&mut self, sponsor: &Address) -> Option<&mut Position> {
        self.positions.get_mut(sponsor)
    }

    pub fn global(&self) -> &GlobalPositionData {
        &self.global
    }

    pub fn total_position_collateral(&self, fees: &FeePayer) -> Result<FixedPoint, MathError> {
        fees.adjusted(self.global.raw_total_position_collateral)
    }

    pub fn global_collateralization_ratio(&self, fees: &FeePayer) -> Result<FixedPoint, MathError> {
        collateralization_ratio(
            self.total_position_collateral(fees)?,
            self.global.total_tokens_outstanding,
        )
    }

    // 4.1: collateral moves. the position and the global total get the same raw delta,
    // the returned amount is the global adjusted change.
    pub fn increment_collateral(
        &mut self,
        fees: &FeePayer,
        sponsor: Address,
        amount: FixedPoint,
    ) -> Result<FixedPoint, MathError> {
        let position = self.positions.entry(sponsor).or_default();
        fees.add_collateral(&mut position.raw_collateral, amount)?;
        fees.add_collateral(&mut self.global.raw_total_position_collateral, amount)
    }

    pub fn decrement_collateral(
        &mut self,
        fees: &FeePayer,
        sponsor: Address,
        amount: FixedPoint,
    ) -> Result<FixedPoint, MathError> {
        let position = self.positions.entry(sponsor).or_default();
        fees.remove_collateral(&mut position.raw_collateral, amount)?;
        fees.remove_collateral(&mut self.global.raw_total_position_collateral, amount)
    }

    pub fn increment_tokens(&mut self, sponsor: Address, tokens: FixedPoint) -> Result<(), MathError> {
        let position = self.positions.entry(sponsor).or_default();
        position.tokens_outstanding = position.tokens_outstanding.add(tokens)?;
        self.global.total_tokens_outstanding = self.global.total_tokens_outstanding.add(tokens)?;
        Ok(())
    }

    pub fn decrement_tokens(&mut self, sponsor: Address, tokens: FixedPoint) -> Result<FixedPoint, MathError> {
        let position = self.positions.entry(sponsor).or_default();
        position.tokens_outstanding = position.tokens_outstanding.sub(tokens)?;
        self.global.total_tokens_outstanding = self.global.total_tokens_outstanding.sub(tokens)?;
        Ok(position.tokens_outstanding)
    }

    /// Removes the position and its share of both aggregates. Returns the adjusted collateral freed.
    pub fn delete(&mut self, fees: &FeePayer, sponsor: &Address) -> Result<FixedPoint, MathError> {
        let Some(position) = self.positions.get(sponsor) else {
            return Ok(FixedPoint::ZERO);
        };
        let starting = self.total_position_collateral(fees)?;
        let raw_total = self.global.raw_total_position_collateral.sub(position.raw_collateral)?;
        let tokens_total = self.global.total_tokens_outstanding.sub(position.tokens_outstanding)?;

        self.global.raw_total_position_collateral = raw_total;
        self.global.total_tokens_outstanding = tokens_total;
        self.positions.remove(sponsor);

        Ok(starting.sub(self.total_position_collateral(fees)?)?)
    }

    /// Drops the record without touching the aggregates. Only used by shutdown settlement,
    /// where the global total is drawn down by payouts instead.
    pub fn forget(&mut self, sponsor: &Address) -> Option<Position> {
        self.positions.remove(sponsor)
    }

    /// Draws the global raw total down by `amount` (adjusted). Shutdown settlement only.
    pub fn remove_global_collateral(&mut self, fees: &FeePayer, amount: FixedPoint) -> Result<FixedPoint, MathError> {
        fees.remove_collateral(&mut self.global.raw_total_position_collateral, amount)
    }

    pub fn remove_global_tokens(&mut self, tokens: FixedPoint) -> Result<(), MathError> {
        self.global.total_tokens_outstanding = self.global.total_tokens_outstanding.sub(tokens)?;
        Ok(())
    }

    /// True when both aggregates equal the sum over positions.
    pub fn verify_aggregates(&self) -> bool {
        let mut raw_sum = FixedPoint::ZERO;
        let mut token_sum = FixedPoint::ZERO;
        for position in self.positions.values() {
            let (Ok(raw), Ok(tokens)) = (
                raw_sum.add(position.raw_collateral),
                token_sum.add(position.tokens_outstanding),
            ) else {
                return false;
            };
            raw_sum = raw;
            token_sum = tokens;
        }
        raw_sum == self.global.raw_total_position_collateral
            && token_sum == self.global.total_tokens_outstanding
    }
}
