//! Liquidation records and the dispute/reward math.
//!
//! A liquidation locks a slice of a sponsor's collateral and debt. It is written once by
//! `create_liquidation`, possibly disputed, and read once by `withdraw_liquidation`, which
//! resets the slot to `Uninitialized`. Ids are slot indices and are never reused.

use crate::config::ContractParams;
use crate::fixed_point::{FixedPoint, MathError};
use crate::types::{Address, LiquidationId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum LiquidationStatus {
    #[default]
    Uninitialized,
    PreDispute,
    PendingDispute,
    DisputeSucceeded,
    DisputeFailed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Liquidation {
    pub sponsor: Address,
    pub liquidator: Address,
    pub state: LiquidationStatus,
    pub liquidation_time: Timestamp,
    pub tokens_outstanding: FixedPoint,
    pub locked_collateral: FixedPoint,
    pub liquidated_collateral: FixedPoint,
    /// Raw value of one collateral unit at creation. `raw_unit_collateral * multiplier` later
    /// gives the share of the original value that survived subsequent fees.
    pub raw_unit_collateral: FixedPoint,
    pub disputer: Option<Address>,
    pub settlement_price: Option<FixedPoint>,
    pub final_fee: FixedPoint,
}

impl Liquidation {
    pub fn is_live(&self) -> bool {
        self.state != LiquidationStatus::Uninitialized
    }

    pub fn expiry(&self, liveness_secs: u64) -> Timestamp {
        self.liquidation_time.plus_secs(liveness_secs)
    }

    pub fn is_disputable(&self, now: Timestamp, liveness_secs: u64) -> bool {
        self.state == LiquidationStatus::PreDispute && now < self.expiry(liveness_secs)
    }

    pub fn is_withdrawable(&self, now: Timestamp, liveness_secs: u64) -> bool {
        self.state > LiquidationStatus::PreDispute
            || (self.state == LiquidationStatus::PreDispute && self.expiry(liveness_secs) <= now)
    }

    /// Bond a disputer has to post, in current collateral units.
    pub fn dispute_bond(&self, bond_pct: FixedPoint, fee_attenuation: FixedPoint) -> Result<FixedPoint, MathError> {
        self.locked_collateral.mul(bond_pct)?.mul(fee_attenuation)
    }
}

/// The liquidation was wrong when the collateral it took covered the debt at the oracle price.
pub fn dispute_succeeded(
    liquidated_collateral: FixedPoint,
    tokens: FixedPoint,
    settlement_price: FixedPoint,
    collateral_requirement: FixedPoint,
) -> Result<bool, MathError> {
    let token_redemption_value = tokens.mul(settlement_price)?;
    let required = token_redemption_value.mul(collateral_requirement)?;
    Ok(liquidated_collateral >= required)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationPayouts {
    pub liquidator: FixedPoint,
    pub sponsor: FixedPoint,
    pub disputer: FixedPoint,
}

impl LiquidationPayouts {
    pub fn total(&self) -> Result<FixedPoint, MathError> {
        self.liquidator.add(self.sponsor)?.add(self.disputer)
    }

    /// Splits `released` in payment order: liquidator, sponsor, disputer. Nobody gets more
    /// than they are owed, so a rounding shortfall lands on whoever is paid last.
    pub fn allot(&self, released: FixedPoint) -> Self {
        let liquidator = self.liquidator.min(released);
        let rest = released.saturating_sub(liquidator);
        let sponsor = self.sponsor.min(rest);
        let disputer = self.disputer.min(rest.saturating_sub(sponsor));
        Self {
            liquidator,
            sponsor,
            disputer,
        }
    }
}

/// Amounts owed to each party of a resolved (or expired) liquidation, scaled by the fees
/// charged since it was created.
pub fn compute_payouts(
    liquidation: &Liquidation,
    params: &ContractParams,
    fee_attenuation: FixedPoint,
) -> Result<LiquidationPayouts, MathError> {
    let collateral = liquidation.locked_collateral.mul(fee_attenuation)?;
    let final_fee = liquidation.final_fee.mul(fee_attenuation)?;

    match liquidation.state {
        LiquidationStatus::PreDispute => Ok(LiquidationPayouts {
            liquidator: collateral.add(final_fee)?,
            ..LiquidationPayouts::default()
        }),
        LiquidationStatus::DisputeSucceeded | LiquidationStatus::DisputeFailed => {
            let price = liquidation.settlement_price.unwrap_or(FixedPoint::ZERO);
            let trv = liquidation
                .tokens_outstanding
                .mul(price)?
                .mul(fee_attenuation)?;
            let disputer_reward = params.disputer_dispute_reward_pct.mul(trv)?;
            let sponsor_reward = params.sponsor_dispute_reward_pct.mul(trv)?;
            let bond = collateral.mul(params.dispute_bond_pct)?;

            if liquidation.state == LiquidationStatus::DisputeSucceeded {
                Ok(LiquidationPayouts {
                    disputer: disputer_reward.add(bond)?.add(final_fee)?,
                    sponsor: sponsor_reward.add(collateral.sub(trv)?)?,
                    liquidator: trv.sub(sponsor_reward)?.sub(disputer_reward)?,
                })
            } else {
                Ok(LiquidationPayouts {
                    liquidator: collateral.add(bond)?.add(final_fee)?,
                    ..LiquidationPayouts::default()
                })
            }
        }
        // pending disputes are settled before payouts are computed
        LiquidationStatus::PendingDispute | LiquidationStatus::Uninitialized => {
            Ok(LiquidationPayouts::default())
        }
    }
}

/// Liquidator's terms. The call fails unless the position's collateral per token (net of
/// any pending withdrawal) lies inside `[min_collateral_per_token, max_collateral_per_token]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationRequest {
    pub sponsor: Address,
    pub min_collateral_per_token: FixedPoint,
    pub max_collateral_per_token: FixedPoint,
    pub max_tokens_to_liquidate: FixedPoint,
    pub deadline: Timestamp,
}

impl LiquidationRequest {
    /// Accept any price and take up to `max_tokens`.
    pub fn any_price(sponsor: Address, max_tokens: FixedPoint, deadline: Timestamp) -> Self {
        Self {
            sponsor,
            min_collateral_per_token: FixedPoint::ZERO,
            max_collateral_per_token: FixedPoint::from_raw_u128(u128::MAX),
            max_tokens_to_liquidate: max_tokens,
            deadline,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LiquidationStore {
    liquidations: HashMap<Address, Vec<Liquidation>>,
    raw_liquidation_collateral: FixedPoint,
}

impl LiquidationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, liquidation: Liquidation) -> LiquidationId {
        let list = self.liquidations.entry(liquidation.sponsor).or_default();
        let id = LiquidationId(list.len() as u64);
        list.push(liquidation);
        id
    }

    /// Live record only. Deleted slots read as missing.
    pub fn get(&self, sponsor: &Address, id: LiquidationId) -> Option<&Liquidation> {
        self.liquidations
            .get(sponsor)?
            .get(id.index()?)
            .filter(|l| l.is_live())
    }

    pub fn get_mut(&mut self, sponsor: &Address, id: LiquidationId) -> Option<&mut Liquidation> {
        self.liquidations
            .get_mut(sponsor)?
            .get_mut(id.index()?)
            .filter(|l| l.is_live())
    }

    pub fn clear(&mut self, sponsor: &Address, id: LiquidationId) {
        if let Some(slot) = self
            .liquidations
            .get_mut(sponsor)
            .and_then(|list| id.index().and_then(|i| list.get_mut(i)))
        {
            *slot = Liquidation::default();
        }
    }

    pub fn for_sponsor(&self, sponsor: &Address) -> &[Liquidation] {
        self.liquidations.get(sponsor).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn raw_liquidation_collateral(&self) -> FixedPoint {
        self.raw_liquidation_collateral
    }

    pub fn raw_liquidation_collateral_mut(&mut self) -> &mut FixedPoint {
        &mut self.raw_liquidation_collateral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContractConfig;

    fn units(n: u64) -> FixedPoint {
        FixedPoint::from_unscaled(n)
    }

    fn full_liquidation(state: LiquidationStatus, price: Option<FixedPoint>) -> Liquidation {
        Liquidation {
            sponsor: Address(1),
            liquidator: Address(2),
            state,
            liquidation_time: Timestamp(1_000),
            tokens_outstanding: units(100),
            locked_collateral: units(150),
            liquidated_collateral: units(150),
            raw_unit_collateral: FixedPoint::ONE,
            disputer: Some(Address(3)),
            settlement_price: price,
            final_fee: units(1),
        }
    }

    #[test]
    fn dispute_outcome_uses_collateral_requirement() {
        let cr = "1.2".parse().unwrap();
        // 150 >= 100 * 1.0 * 1.2
        assert!(dispute_succeeded(units(150), units(100), units(1), cr).unwrap());
        // 150 < 100 * 1.3 * 1.2
        assert!(!dispute_succeeded(units(150), units(100), "1.3".parse().unwrap(), cr).unwrap());
        // requested withdrawal swallowed all liquidated collateral
        assert!(!dispute_succeeded(FixedPoint::ZERO, units(100), units(1), cr).unwrap());
    }

    #[test]
    fn succeeded_dispute_splits_rewards() {
        let params = ContractConfig::testing().to_params().unwrap();
        let liq = full_liquidation(LiquidationStatus::DisputeSucceeded, Some(units(1)));
        let payouts = compute_payouts(&liq, &params, FixedPoint::ONE).unwrap();

        assert_eq!(payouts.disputer, units(21));
        assert_eq!(payouts.liquidator, units(90));
        assert_eq!(payouts.sponsor, units(55));
    }

    #[test]
    fn failed_dispute_pays_liquidator_bond() {
        let params = ContractConfig::testing().to_params().unwrap();
        let liq = full_liquidation(LiquidationStatus::DisputeFailed, Some("1.3".parse().unwrap()));
        let payouts = compute_payouts(&liq, &params, FixedPoint::ONE).unwrap();

        assert_eq!(payouts.liquidator, units(166));
        assert_eq!(payouts.sponsor, FixedPoint::ZERO);
        assert_eq!(payouts.disputer, FixedPoint::ZERO);
    }

    #[test]
    fn undisputed_pays_collateral_and_final_fee() {
        let params = ContractConfig::testing().to_params().unwrap();
        let liq = full_liquidation(LiquidationStatus::PreDispute, None);
        let payouts = compute_payouts(&liq, &params, FixedPoint::ONE).unwrap();
        assert_eq!(payouts.liquidator, units(151));
    }

    #[test]
    fn allot_shorts_the_last_payee() {
        let owed = LiquidationPayouts {
            liquidator: units(90),
            sponsor: units(55),
            disputer: units(21),
        };
        assert_eq!(owed.total().unwrap(), units(166));
        assert_eq!(owed.allot(units(166)), owed);

        let short = owed.allot(units(150));
        assert_eq!(short.liquidator, units(90));
        assert_eq!(short.sponsor, units(55));
        assert_eq!(short.disputer, units(5));

        // a rounding surplus is not handed out
        assert_eq!(owed.allot(units(170)), owed);
        assert_eq!(owed.allot(units(40)).sponsor, FixedPoint::ZERO);
    }

    #[test]
    fn dispute_bond_follows_fee_attenuation() {
        let liq = full_liquidation(LiquidationStatus::PreDispute, None);
        let bond_pct = "0.1".parse().unwrap();
        assert_eq!(liq.dispute_bond(bond_pct, FixedPoint::ONE).unwrap(), units(15));
        assert_eq!(
            liq.dispute_bond(bond_pct, "0.99".parse().unwrap()).unwrap(),
            "14.85".parse::<FixedPoint>().unwrap()
        );
    }

    #[test]
    fn liveness_windows() {
        let liq = full_liquidation(LiquidationStatus::PreDispute, None);
        assert!(liq.is_disputable(Timestamp(1_000), 100));
        assert!(!liq.is_disputable(Timestamp(1_100), 100));
        assert!(!liq.is_withdrawable(Timestamp(1_099), 100));
        assert!(liq.is_withdrawable(Timestamp(1_100), 100));

        let pending = full_liquidation(LiquidationStatus::PendingDispute, None);
        assert!(pending.is_withdrawable(Timestamp(1_000), 100));
        assert!(!pending.is_disputable(Timestamp(1_000), 100));
    }

    #[test]
    fn store_ids_are_per_sponsor_and_cleared_slots_read_missing() {
        let mut store = LiquidationStore::new();
        let first = store.push(full_liquidation(LiquidationStatus::PreDispute, None));
        let second = store.push(full_liquidation(LiquidationStatus::PreDispute, None));
        assert_eq!(first, LiquidationId(0));
        assert_eq!(second, LiquidationId(1));
        assert!(store.for_sponsor(&Address(9)).is_empty());

        store.clear(&Address(1), first);
        assert!(store.get(&Address(1), first).is_none());
        assert!(store.get(&Address(1), second).is_some());
        assert_eq!(store.for_sponsor(&Address(1)).len(), 2);
        assert_eq!(store.for_sponsor(&Address(1))[0].state, LiquidationStatus::Uninitialized);
    }
}
