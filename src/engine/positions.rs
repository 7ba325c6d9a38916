//! Sponsor position operations: create, deposit, withdraw (instant and two-phase), redeem, repay.

use super::core::Engine;
use super::results::EngineError;
use crate::clock::Clock;
use crate::events::{
    DepositEvent, EndedSponsorPositionEvent, EventPayload, NewSponsorEvent, PositionCreatedEvent,
    RedeemEvent, RepayEvent, RequestWithdrawalCanceledEvent, RequestWithdrawalEvent,
    RequestWithdrawalExecutedEvent, WithdrawalEvent,
};
use crate::fixed_point::FixedPoint;
use crate::oracle::Oracle;
use crate::types::Address;

impl<O: Oracle + Clone, C: Clock> Engine<O, C> {
    /// Lock `collateral_amount` and mint `num_tokens` to the sponsor, opening a position if needed.
    /// Passes the GCR check if either the resulting position or this call alone is at least
    /// as collateralized as the pool.
    pub fn create(
        &mut self,
        sponsor: Address,
        collateral_amount: FixedPoint,
        num_tokens: FixedPoint,
    ) -> Result<(), EngineError> {
        self.atomically("create", |engine| {
            engine.require_not_shutdown()?;
            engine.charge_regular_fees()?;

            let existing = engine.state.positions.get(&sponsor).cloned().unwrap_or_default();
            let resulting_collateral = existing.collateral(&engine.state.fees)?.add(collateral_amount)?;
            let resulting_tokens = existing.tokens_outstanding.add(num_tokens)?;
            if !(engine.meets_global_ratio(resulting_collateral, resulting_tokens)?
                || engine.meets_global_ratio(collateral_amount, num_tokens)?)
            {
                return Err(EngineError::InsufficientCollateralization("Insufficient collateral"));
            }

            Self::require_no_pending_withdrawal(&existing)?;

            if existing.tokens_outstanding.is_zero() {
                if num_tokens.is_zero() || num_tokens < engine.params.min_sponsor_tokens {
                    return Err(EngineError::Validation("Below minimum sponsor position"));
                }
                engine.emit_event(EventPayload::NewSponsor(NewSponsorEvent { sponsor }));
            }

            let fees = engine.state.fees.clone();
            engine.state.positions.increment_collateral(&fees, sponsor, collateral_amount)?;
            engine.state.positions.increment_tokens(sponsor, num_tokens)?;

            engine.emit_event(EventPayload::PositionCreated(PositionCreatedEvent {
                sponsor,
                collateral_amount,
                num_tokens,
            }));

            engine.pull_collateral(sponsor, collateral_amount)?;
            engine.mint_synthetic(sponsor, num_tokens)
        })
    }

    pub fn deposit(&mut self, sponsor: Address, collateral_amount: FixedPoint) -> Result<(), EngineError> {
        self.deposit_to(sponsor, sponsor, collateral_amount)
    }

    /// Anyone can top up anyone's position. Collateral comes from `funder`.
    pub fn deposit_to(
        &mut self,
        funder: Address,
        sponsor: Address,
        collateral_amount: FixedPoint,
    ) -> Result<(), EngineError> {
        self.atomically("deposit", |engine| {
            engine.require_not_shutdown()?;
            let position = engine.collateralized_position(sponsor)?;
            Self::require_no_pending_withdrawal(&position)?;
            engine.charge_regular_fees()?;
            if collateral_amount.is_zero() {
                return Err(EngineError::Validation("Invalid collateral amount"));
            }

            let fees = engine.state.fees.clone();
            engine.state.positions.increment_collateral(&fees, sponsor, collateral_amount)?;
            engine.emit_event(EventPayload::Deposit(DepositEvent {
                sponsor,
                collateral_amount,
            }));
            engine.pull_collateral(funder, collateral_amount)
        })
    }

    /// Instant withdrawal. The position must stay at or above the GCR measured before the
    /// withdrawal. Returns the collateral actually paid.
    pub fn withdraw(&mut self, sponsor: Address, collateral_amount: FixedPoint) -> Result<FixedPoint, EngineError> {
        self.atomically("withdraw", |engine| {
            engine.require_not_shutdown()?;
            let position = engine.collateralized_position(sponsor)?;
            Self::require_no_pending_withdrawal(&position)?;
            engine.charge_regular_fees()?;
            if collateral_amount.is_zero() || collateral_amount > position.collateral(&engine.state.fees)? {
                return Err(EngineError::Validation("Invalid collateral amount"));
            }

            // position first, global after the check: the check sees the pre-withdrawal GCR
            let fees = engine.state.fees.clone();
            let mut remaining_raw = position.raw_collateral;
            fees.remove_collateral(&mut remaining_raw, collateral_amount)?;
            let remaining = fees.adjusted(remaining_raw)?;
            if !engine.meets_global_ratio(remaining, position.tokens_outstanding)? {
                return Err(EngineError::InsufficientCollateralization(
                    "CR is not sufficiently high after the withdraw - try less amount",
                ));
            }
            let amount_withdrawn = engine
                .state
                .positions
                .decrement_collateral(&fees, sponsor, collateral_amount)?;

            engine.emit_event(EventPayload::Withdrawal(WithdrawalEvent {
                sponsor,
                collateral_amount: amount_withdrawn,
            }));
            engine.pay_collateral(sponsor, amount_withdrawn)?;
            Ok(amount_withdrawn)
        })
    }

    /// First phase of a slow withdrawal. No GCR check; the liveness window lets liquidators
    /// react if the withdrawal would leave the position undercollateralized.
    pub fn request_withdrawal(&mut self, sponsor: Address, collateral_amount: FixedPoint) -> Result<(), EngineError> {
        self.atomically("request_withdrawal", |engine| {
            engine.require_not_shutdown()?;
            let position = engine.collateralized_position(sponsor)?;
            Self::require_no_pending_withdrawal(&position)?;
            let collateral = position.collateral(&engine.state.fees)?;
            if collateral_amount.is_zero() || collateral_amount > collateral {
                return Err(EngineError::Validation("Invalid collateral amount"));
            }

            let pass_time = engine.current_time.plus_secs(engine.params.withdrawal_liveness_secs);
            if let Some(position) = engine.state.positions.get_mut(&sponsor) {
                position.withdrawal_request_pass_timestamp = Some(pass_time);
                position.withdrawal_request_amount = collateral_amount;
            }
            engine.emit_event(EventPayload::RequestWithdrawal(RequestWithdrawalEvent {
                sponsor,
                collateral_amount,
            }));
            Ok(())
        })
    }

    /// Second phase. Pays out the request, capped at whatever collateral fees have left.
    pub fn withdraw_passed_request(&mut self, sponsor: Address) -> Result<FixedPoint, EngineError> {
        self.atomically("withdraw_passed_request", |engine| {
            engine.require_not_shutdown()?;
            let position = engine.collateralized_position(sponsor)?;
            engine.charge_regular_fees()?;

            let passed = position
                .withdrawal_request_pass_timestamp
                .is_some_and(|pass| pass <= engine.current_time);
            if !passed {
                return Err(EngineError::InvalidState("Invalid withdraw request"));
            }

            let fees = engine.state.fees.clone();
            let collateral = position.collateral(&fees)?;
            let amount_to_withdraw = position.withdrawal_request_amount.min(collateral);
            let amount_withdrawn = engine
                .state
                .positions
                .decrement_collateral(&fees, sponsor, amount_to_withdraw)?;
            if let Some(position) = engine.state.positions.get_mut(&sponsor) {
                position.reset_withdrawal_request();
            }

            engine.emit_event(EventPayload::RequestWithdrawalExecuted(RequestWithdrawalExecutedEvent {
                sponsor,
                collateral_amount: amount_withdrawn,
            }));
            engine.pay_collateral(sponsor, amount_withdrawn)?;
            Ok(amount_withdrawn)
        })
    }

    pub fn cancel_withdrawal(&mut self, sponsor: Address) -> Result<(), EngineError> {
        self.atomically("cancel_withdrawal", |engine| {
            engine.require_not_shutdown()?;
            let position = engine.collateralized_position(sponsor)?;
            if !position.has_pending_withdrawal() {
                return Err(EngineError::InvalidState("No pending withdrawal"));
            }
            if let Some(position) = engine.state.positions.get_mut(&sponsor) {
                position.reset_withdrawal_request();
            }
            engine.emit_event(EventPayload::RequestWithdrawalCanceled(RequestWithdrawalCanceledEvent {
                sponsor,
                collateral_amount: position.withdrawal_request_amount,
            }));
            Ok(())
        })
    }

    /// Burn `num_tokens` and get back the same fraction of the position's collateral.
    /// Redeeming everything closes the position.
    pub fn redeem(&mut self, sponsor: Address, num_tokens: FixedPoint) -> Result<FixedPoint, EngineError> {
        self.atomically("redeem", |engine| {
            engine.require_not_shutdown()?;
            let position = engine.collateralized_position(sponsor)?;
            Self::require_no_pending_withdrawal(&position)?;
            engine.charge_regular_fees()?;
            if num_tokens.is_zero() || num_tokens > position.tokens_outstanding {
                return Err(EngineError::Validation("Invalid token amount"));
            }

            let fees = engine.state.fees.clone();
            let fraction_redeemed = num_tokens.div(position.tokens_outstanding)?;
            let collateral_redeemed = fraction_redeemed.mul(position.collateral(&fees)?)?;

            let amount_withdrawn = if num_tokens == position.tokens_outstanding {
                let freed = engine.state.positions.delete(&fees, &sponsor)?;
                engine.emit_event(EventPayload::EndedSponsorPosition(EndedSponsorPositionEvent { sponsor }));
                freed
            } else {
                let withdrawn = engine
                    .state
                    .positions
                    .decrement_collateral(&fees, sponsor, collateral_redeemed)?;
                let new_token_count = engine.state.positions.decrement_tokens(sponsor, num_tokens)?;
                if new_token_count < engine.params.min_sponsor_tokens {
                    return Err(EngineError::Validation("Below minimum sponsor position"));
                }
                withdrawn
            };

            engine.emit_event(EventPayload::Redeem(RedeemEvent {
                sponsor,
                collateral_amount: amount_withdrawn,
                token_amount: num_tokens,
            }));
            engine.pay_collateral(sponsor, amount_withdrawn)?;
            engine.burn_synthetic_from(sponsor, num_tokens)?;
            Ok(amount_withdrawn)
        })
    }

    /// Burn tokens to reduce debt without touching collateral. The last tokens of a position
    /// can only go through `redeem`, which also releases the collateral.
    pub fn repay(&mut self, sponsor: Address, num_tokens: FixedPoint) -> Result<(), EngineError> {
        self.atomically("repay", |engine| {
            engine.require_not_shutdown()?;
            let position = engine.collateralized_position(sponsor)?;
            Self::require_no_pending_withdrawal(&position)?;
            engine.charge_regular_fees()?;
            if num_tokens.is_zero() || num_tokens >= position.tokens_outstanding {
                return Err(EngineError::Validation("Invalid token amount"));
            }

            let new_token_count = engine.state.positions.decrement_tokens(sponsor, num_tokens)?;
            if new_token_count < engine.params.min_sponsor_tokens {
                return Err(EngineError::Validation("Below minimum sponsor position"));
            }

            engine.emit_event(EventPayload::Repay(RepayEvent {
                sponsor,
                num_tokens_repaid: num_tokens,
                new_token_count,
            }));
            engine.burn_synthetic_from(sponsor, num_tokens)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::ContractConfig;
    use crate::engine::EngineConfig;
    use crate::oracle::MockOracle;
    use crate::types::Timestamp;

    const SPONSOR: Address = Address(1);
    const OTHER: Address = Address(2);

    fn units(n: u64) -> FixedPoint {
        FixedPoint::from_unscaled(n)
    }

    fn fp(s: &str) -> FixedPoint {
        s.parse().unwrap()
    }

    fn setup_engine() -> (Engine<MockOracle, ManualClock>, ManualClock) {
        let clock = ManualClock::new(Timestamp(1_000));
        let mut engine = Engine::new(
            EngineConfig::default(),
            ContractConfig::default(),
            MockOracle::new(),
            clock.clone(),
        )
        .unwrap();
        for actor in [SPONSOR, OTHER] {
            engine.collateral_token_mut().mint(actor, units(1_000_000)).unwrap();
        }
        (engine, clock)
    }

    #[test]
    fn create_opens_position_and_mints() {
        let (mut engine, _) = setup_engine();
        engine.create(SPONSOR, units(150), units(100)).unwrap();

        let position = engine.position(SPONSOR).unwrap();
        assert_eq!(position.tokens_outstanding, units(100));
        assert_eq!(engine.collateral_of(SPONSOR).unwrap(), units(150));
        assert_eq!(engine.synthetic_token().balance_of(SPONSOR), units(100));
        assert_eq!(engine.collateral_token().balance_of(engine.contract_address()), units(150));

        let names: Vec<_> = engine.events().iter().map(|e| e.payload.name()).collect();
        assert_eq!(names, vec!["NewSponsor", "PositionCreated"]);
    }

    #[test]
    fn create_below_minimum_rejected() {
        let (mut engine, _) = setup_engine();
        let err = engine.create(SPONSOR, units(1), fp("0.5")).unwrap_err();
        assert_eq!(err.reason(), "Below minimum sponsor position");
        assert!(engine.position(SPONSOR).is_none());
        assert!(engine.events().is_empty());
    }

    #[test]
    fn global_collateralization_ratio_checks() {
        let (mut engine, _) = setup_engine();
        engine.create(SPONSOR, units(150), units(100)).unwrap();

        // single sponsor: any withdrawal lowers the GCR
        let err = engine.withdraw(SPONSOR, units(1)).unwrap_err();
        assert_eq!(err.reason(), "CR is not sufficiently high after the withdraw - try less amount");

        for who in [SPONSOR, OTHER] {
            let err = engine.create(who, units(150), units(101)).unwrap_err();
            assert_eq!(err.reason(), "Insufficient collateral");
        }

        engine.create(SPONSOR, units(15), units(10)).unwrap();
        engine.create(OTHER, units(25), units(10)).unwrap();

        // 25 / 16 is below the 190 / 126 GCR, 25 / 15 is above
        assert!(engine.create(OTHER, FixedPoint::ZERO, units(6)).is_err());
        engine.create(OTHER, FixedPoint::ZERO, units(5)).unwrap();

        assert!(engine.withdraw(SPONSOR, units(1)).is_err());

        // the call's own ratio carries it even though the position stays below the GCR
        assert!(engine.create(SPONSOR, fp("0.151"), fp("0.1")).is_err());
        engine.create(SPONSOR, fp("0.152"), fp("0.1")).unwrap();

        assert!(engine.withdraw(OTHER, units(3)).is_err());
        assert_eq!(engine.withdraw(OTHER, units(2)).unwrap(), units(2));
        assert!(engine.positions_consistent());
    }

    #[test]
    fn withdrawing_more_than_held_is_invalid_amount() {
        let (mut engine, _) = setup_engine();
        engine.create(SPONSOR, units(150), units(100)).unwrap();
        engine.create(OTHER, units(1_000), units(10)).unwrap();

        let err = engine.withdraw(SPONSOR, units(151)).unwrap_err();
        assert!(matches!(err, EngineError::Validation("Invalid collateral amount")));
        assert_eq!(engine.collateral_of(SPONSOR).unwrap(), units(150));
    }

    #[test]
    fn non_sponsor_can_deposit_to() {
        let (mut engine, _) = setup_engine();
        engine.create(SPONSOR, units(150), units(100)).unwrap();
        engine.deposit_to(OTHER, SPONSOR, units(50)).unwrap();

        assert_eq!(engine.collateral_of(SPONSOR).unwrap(), units(200));
        assert_eq!(engine.collateral_token().balance_of(OTHER), units(999_950));
    }

    #[test]
    fn deposit_requires_position_and_amount() {
        let (mut engine, _) = setup_engine();
        assert_eq!(
            engine.deposit(SPONSOR, units(1)).unwrap_err().reason(),
            "Position has no collateral"
        );
        engine.create(SPONSOR, units(150), units(100)).unwrap();
        assert_eq!(
            engine.deposit(SPONSOR, FixedPoint::ZERO).unwrap_err().reason(),
            "Invalid collateral amount"
        );
    }

    #[test]
    fn withdrawal_request_lifecycle() {
        let (mut engine, clock) = setup_engine();
        engine.create(OTHER, units(1), units(1_000)).unwrap();
        engine.create(SPONSOR, units(150), units(100)).unwrap();

        assert_eq!(
            engine.request_withdrawal(SPONSOR, units(151)).unwrap_err().reason(),
            "Invalid collateral amount"
        );
        engine.request_withdrawal(SPONSOR, units(100)).unwrap();

        // everything else is blocked while pending
        assert_eq!(engine.deposit(SPONSOR, units(1)).unwrap_err().reason(), "Pending withdrawal");
        assert_eq!(engine.withdraw(SPONSOR, units(1)).unwrap_err().reason(), "Pending withdrawal");
        assert_eq!(engine.create(SPONSOR, units(10), units(1)).unwrap_err().reason(), "Pending withdrawal");
        assert_eq!(engine.redeem(SPONSOR, units(1)).unwrap_err().reason(), "Pending withdrawal");
        assert_eq!(engine.request_withdrawal(SPONSOR, units(1)).unwrap_err().reason(), "Pending withdrawal");

        clock.advance(3_599);
        assert_eq!(
            engine.withdraw_passed_request(SPONSOR).unwrap_err().reason(),
            "Invalid withdraw request"
        );

        engine.cancel_withdrawal(SPONSOR).unwrap();
        assert_eq!(engine.cancel_withdrawal(SPONSOR).unwrap_err().reason(), "No pending withdrawal");

        engine.request_withdrawal(SPONSOR, units(100)).unwrap();
        clock.advance(3_600);
        assert_eq!(engine.withdraw_passed_request(SPONSOR).unwrap(), units(100));
        assert_eq!(engine.collateral_of(SPONSOR).unwrap(), units(50));
        assert!(!engine.position(SPONSOR).unwrap().has_pending_withdrawal());
    }

    #[test]
    fn redeem_partial_and_full() {
        let (mut engine, _) = setup_engine();
        engine.create(SPONSOR, units(150), units(100)).unwrap();

        assert_eq!(engine.redeem(SPONSOR, units(101)).unwrap_err().reason(), "Invalid token amount");
        assert_eq!(
            engine.redeem(SPONSOR, fp("99.5")).unwrap_err().reason(),
            "Below minimum sponsor position"
        );

        assert_eq!(engine.redeem(SPONSOR, units(50)).unwrap(), units(75));
        assert_eq!(engine.redeem(SPONSOR, units(50)).unwrap(), units(75));
        assert!(engine.position(SPONSOR).is_none());
        assert_eq!(engine.total_tokens_outstanding(), FixedPoint::ZERO);
        assert_eq!(engine.synthetic_token().total_supply(), FixedPoint::ZERO);
    }

    #[test]
    fn repay_reduces_debt_only() {
        let (mut engine, _) = setup_engine();
        engine.create(SPONSOR, units(150), units(100)).unwrap();

        engine.repay(SPONSOR, units(40)).unwrap();
        let position = engine.position(SPONSOR).unwrap();
        assert_eq!(position.tokens_outstanding, units(60));
        assert_eq!(engine.collateral_of(SPONSOR).unwrap(), units(150));
        assert_eq!(engine.synthetic_token().balance_of(SPONSOR), units(60));

        assert_eq!(engine.repay(SPONSOR, units(60)).unwrap_err().reason(), "Invalid token amount");
        assert_eq!(
            engine.repay(SPONSOR, fp("59.5")).unwrap_err().reason(),
            "Below minimum sponsor position"
        );
    }

    #[test]
    fn failed_token_pull_rolls_back_everything() {
        let (mut engine, _) = setup_engine();
        engine.create(SPONSOR, units(150), units(100)).unwrap();
        // sponsor gives away the tokens it would need to burn
        engine.synthetic_token_mut().transfer(SPONSOR, OTHER, units(100)).unwrap();

        let err = engine.redeem(SPONSOR, units(50)).unwrap_err();
        assert_eq!(err.reason(), "ERC20: transfer amount exceeds balance");
        assert_eq!(engine.collateral_of(SPONSOR).unwrap(), units(150));
        assert_eq!(engine.position(SPONSOR).unwrap().tokens_outstanding, units(100));
        assert_eq!(engine.events().len(), 2);
    }

    #[test]
    fn minting_requires_capability() {
        let (mut engine, _) = setup_engine();
        engine.set_authorization(crate::types::Authorization::none());
        let err = engine.create(SPONSOR, units(150), units(100)).unwrap_err();
        assert_eq!(err.reason(), "Sender must be the minter");
        assert!(engine.position(SPONSOR).is_none());
    }
}
