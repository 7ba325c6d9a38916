//! Liquidation creation, dispute and withdrawal.

use super::core::Engine;
use super::results::{EngineError, LiquidationOutcome, RewardsData};
use crate::clock::Clock;
use crate::events::{
    DisputeSettledEvent, EndedSponsorPositionEvent, EventPayload, LiquidationCreatedEvent,
    LiquidationDisputedEvent, LiquidationWithdrawnEvent,
};
use crate::fixed_point::FixedPoint;
use crate::liquidation::{compute_payouts, dispute_succeeded, Liquidation, LiquidationRequest, LiquidationStatus};
use crate::oracle::Oracle;
use crate::types::{Address, LiquidationId};
use tracing::{debug, info};

impl<O: Oracle + Clone, C: Clock> Engine<O, C> {
    /// Take over up to `max_tokens_to_liquidate` of a sponsor's debt and the matching slice of
    /// collateral. The liquidator burns the tokens and bonds the final fee.
    pub fn create_liquidation(
        &mut self,
        liquidator: Address,
        request: LiquidationRequest,
    ) -> Result<LiquidationOutcome, EngineError> {
        self.atomically("create_liquidation", |engine| {
            engine.require_not_shutdown()?;
            let sponsor = request.sponsor;
            let position = engine.collateralized_position(sponsor)?;
            engine.charge_regular_fees()?;
            let now = engine.current_time;

            if now > request.deadline {
                return Err(EngineError::Validation("Mined after deadline"));
            }
            let tokens_liquidated = request.max_tokens_to_liquidate.min(position.tokens_outstanding);
            if tokens_liquidated.is_zero() {
                return Err(EngineError::Validation("Liquidating 0 tokens"));
            }

            let fees = engine.state.fees.clone();
            let start_collateral = position.collateral(&fees)?;
            let start_tokens = position.tokens_outstanding;
            let net_of_withdrawal = start_collateral.saturating_sub(position.withdrawal_request_amount);

            // price window: min * tokens <= net collateral <= max * tokens
            if request.max_collateral_per_token.mul(start_tokens)? < net_of_withdrawal {
                return Err(EngineError::Validation("CR is more than max liq. price"));
            }
            if request.min_collateral_per_token.mul(start_tokens)? > net_of_withdrawal {
                return Err(EngineError::Validation("CR is less than min liq. price"));
            }

            let final_fee = engine.params.final_fee;
            let ratio = tokens_liquidated.div(start_tokens)?;
            let locked_collateral = start_collateral.mul(ratio)?;
            let liquidated_collateral = net_of_withdrawal.mul(ratio)?;
            let withdrawal_to_remove = position.withdrawal_request_amount.mul(ratio)?;

            if tokens_liquidated == start_tokens {
                engine.state.positions.delete(&fees, &sponsor)?;
                engine.emit_event(EventPayload::EndedSponsorPosition(EndedSponsorPositionEvent { sponsor }));
            } else {
                engine
                    .state
                    .positions
                    .decrement_collateral(&fees, sponsor, locked_collateral)?;
                let remaining = engine.state.positions.decrement_tokens(sponsor, tokens_liquidated)?;
                if remaining < engine.params.min_sponsor_tokens {
                    return Err(EngineError::Validation("Below minimum sponsor position"));
                }
                let min_sponsor_tokens = engine.params.min_sponsor_tokens;
                let rearmed_pass = now.plus_secs(engine.params.withdrawal_liveness_secs);
                if let Some(position) = engine.state.positions.get_mut(&sponsor) {
                    position.withdrawal_request_amount = position.withdrawal_request_amount.sub(withdrawal_to_remove)?;
                    // a slice below the minimum size does not restart the withdrawal clock
                    if position.has_pending_withdrawal() && tokens_liquidated >= min_sponsor_tokens {
                        position.withdrawal_request_pass_timestamp = Some(rearmed_pass);
                    }
                }
            }

            fees.add_collateral(
                engine.state.liquidations.raw_liquidation_collateral_mut(),
                locked_collateral.add(final_fee)?,
            )?;

            let liquidation_id = engine.state.liquidations.push(Liquidation {
                sponsor,
                liquidator,
                state: LiquidationStatus::PreDispute,
                liquidation_time: now,
                tokens_outstanding: tokens_liquidated,
                locked_collateral,
                liquidated_collateral,
                raw_unit_collateral: fees.raw_for_deposit(FixedPoint::ONE)?,
                disputer: None,
                settlement_price: None,
                final_fee,
            });

            info!(
                %sponsor,
                %liquidator,
                id = liquidation_id.0,
                tokens = %tokens_liquidated,
                locked = %locked_collateral,
                "liquidation created"
            );
            engine.emit_event(EventPayload::LiquidationCreated(LiquidationCreatedEvent {
                sponsor,
                liquidator,
                liquidation_id,
                tokens_outstanding: tokens_liquidated,
                locked_collateral,
                liquidated_collateral,
                liquidation_time: now,
            }));

            engine.burn_synthetic_from(liquidator, tokens_liquidated)?;
            engine.pull_collateral(liquidator, final_fee)?;

            Ok(LiquidationOutcome {
                liquidation_id,
                tokens_liquidated,
                final_fee_bond: final_fee,
            })
        })
    }

    /// Contest a liquidation before its liveness expires. Posts the bond, pays the final fee
    /// and asks the oracle for the price at liquidation time. Returns the total the disputer paid.
    pub fn dispute(&mut self, disputer: Address, sponsor: Address, id: LiquidationId) -> Result<FixedPoint, EngineError> {
        self.atomically("dispute", |engine| {
            let liquidation = engine.live_liquidation(sponsor, id)?;
            if !liquidation.is_disputable(engine.current_time, engine.params.liquidation_liveness_secs) {
                return Err(EngineError::InvalidState("Liquidation not disputable"));
            }
            engine.charge_regular_fees()?;

            let fees = engine.state.fees.clone();
            let fee_attenuation = fees.adjusted(liquidation.raw_unit_collateral)?;
            let bond = liquidation.dispute_bond(engine.params.dispute_bond_pct, fee_attenuation)?;
            fees.add_collateral(engine.state.liquidations.raw_liquidation_collateral_mut(), bond)?;

            if let Some(record) = engine.state.liquidations.get_mut(&sponsor, id) {
                record.state = LiquidationStatus::PendingDispute;
                record.disputer = Some(disputer);
            }
            let identifier = engine.params.price_identifier.clone();
            engine.oracle.request_price(&identifier, liquidation.liquidation_time);

            info!(%sponsor, %disputer, id = id.0, %bond, "liquidation disputed");
            engine.emit_event(EventPayload::LiquidationDisputed(LiquidationDisputedEvent {
                sponsor,
                liquidator: liquidation.liquidator,
                disputer,
                liquidation_id: id,
                dispute_bond_amount: bond,
            }));

            let store = engine.config.store_address;
            engine.state.collateral.transfer(disputer, store, liquidation.final_fee)?;
            engine.pull_collateral(disputer, bond)?;
            Ok(bond.add(liquidation.final_fee)?)
        })
    }

    /// Pay out an expired or resolved liquidation and delete it. Anyone may call this.
    pub fn withdraw_liquidation(
        &mut self,
        caller: Address,
        sponsor: Address,
        id: LiquidationId,
    ) -> Result<RewardsData, EngineError> {
        self.atomically("withdraw_liquidation", |engine| {
            let liquidation = engine.live_liquidation(sponsor, id)?;
            if !liquidation.is_withdrawable(engine.current_time, engine.params.liquidation_liveness_secs) {
                return Err(EngineError::InvalidState("Liquidation not withdrawable"));
            }
            engine.charge_regular_fees()?;

            let liquidation = if liquidation.state == LiquidationStatus::PendingDispute {
                engine.settle_dispute(caller, sponsor, id, liquidation)?
            } else {
                liquidation
            };

            let fees = engine.state.fees.clone();
            let fee_attenuation = fees.adjusted(liquidation.raw_unit_collateral)?;
            let payouts = compute_payouts(&liquidation, &engine.params, fee_attenuation)?;

            // one rounded-up debit for the whole payout, capped at what the pot still holds
            let pot = engine.state.liquidations.raw_liquidation_collateral_mut();
            let owed = payouts.total()?.min(fees.adjusted(*pot)?);
            let released = fees.remove_collateral(pot, owed)?;
            let paid = payouts.allot(released);
            if paid != payouts {
                debug!(%sponsor, id = id.0, %owed, %released, "liquidation payout trimmed to pot");
            }
            let rewards = RewardsData {
                status: liquidation.state,
                paid_to_liquidator: paid.liquidator,
                paid_to_sponsor: paid.sponsor,
                paid_to_disputer: paid.disputer,
            };

            engine.pay_collateral(liquidation.liquidator, rewards.paid_to_liquidator)?;
            engine.pay_collateral(liquidation.sponsor, rewards.paid_to_sponsor)?;
            if let Some(disputer) = liquidation.disputer {
                engine.pay_collateral(disputer, rewards.paid_to_disputer)?;
            }

            engine.emit_event(EventPayload::LiquidationWithdrawn(LiquidationWithdrawnEvent {
                caller,
                paid_to_liquidator: rewards.paid_to_liquidator,
                paid_to_disputer: rewards.paid_to_disputer,
                paid_to_sponsor: rewards.paid_to_sponsor,
                liquidation_status: liquidation.state,
                settlement_price: liquidation.settlement_price,
            }));
            engine.state.liquidations.clear(&sponsor, id);
            Ok(rewards)
        })
    }

    fn live_liquidation(&self, sponsor: Address, id: LiquidationId) -> Result<Liquidation, EngineError> {
        self.state
            .liquidations
            .get(&sponsor, id)
            .cloned()
            .ok_or(EngineError::InvalidState("Invalid liquidation ID"))
    }

    // resolves a pending dispute from the oracle. fails with "Unresolved oracle price" until it can.
    fn settle_dispute(
        &mut self,
        caller: Address,
        sponsor: Address,
        id: LiquidationId,
        mut liquidation: Liquidation,
    ) -> Result<Liquidation, EngineError> {
        let price = self
            .oracle
            .get_price(&self.params.price_identifier, liquidation.liquidation_time)?;
        let succeeded = dispute_succeeded(
            liquidation.liquidated_collateral,
            liquidation.tokens_outstanding,
            price,
            self.params.collateral_requirement,
        )?;

        liquidation.settlement_price = Some(price);
        liquidation.state = if succeeded {
            LiquidationStatus::DisputeSucceeded
        } else {
            LiquidationStatus::DisputeFailed
        };
        if let Some(record) = self.state.liquidations.get_mut(&sponsor, id) {
            *record = liquidation.clone();
        }

        info!(%sponsor, id = id.0, %price, succeeded, "dispute settled");
        self.emit_event(EventPayload::DisputeSettled(DisputeSettledEvent {
            caller,
            sponsor,
            liquidator: liquidation.liquidator,
            disputer: liquidation.disputer.unwrap_or_default(),
            liquidation_id: id,
            dispute_succeeded: succeeded,
        }));
        Ok(liquidation)
    }
}
