// 8.0 engine/core.rs: main engine. holds positions, liquidations, the fee payer, shutdown
// state and both token ledgers. every public mutation runs through `atomically`.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::clock::Clock;
use crate::config::{ContractConfig, ContractParams};
use crate::events::{Event, EventId, EventPayload, RegularFeesPaidEvent};
use crate::fee_payer::{compute_regular_fee, FeePayer};
use crate::fixed_point::FixedPoint;
use crate::liquidation::{Liquidation, LiquidationStore};
use crate::oracle::Oracle;
use crate::position::{collateralization_ratio, Position, PositionStore};
use crate::shutdown::EmergencyShutdown;
use crate::token::TokenLedger;
use crate::types::{Address, Authorization, LiquidationId, Timestamp, TokenKind};
use tracing::{debug, info};

/** 8.1: everything an operation can change. cloned before each operation, restored on failure */
#[derive(Debug, Clone)]
pub(super) struct EngineState {
    pub(super) fees: FeePayer,
    pub(super) positions: PositionStore,
    pub(super) liquidations: LiquidationStore,
    pub(super) shutdown: EmergencyShutdown,
    pub(super) collateral: TokenLedger,
    pub(super) synthetic: TokenLedger,
}

/** 8.2: main engine struct. O answers price requests, C supplies `now` */
#[derive(Debug)]
pub struct Engine<O, C> {
    pub(super) config: EngineConfig,
    pub(super) params: ContractParams,
    pub(super) authorization: Authorization,
    pub(super) state: EngineState,
    pub(super) oracle: O,
    pub(super) clock: C,
    pub(super) events: Vec<Event>,
    pub(super) pending_events: Vec<EventPayload>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl<O: Oracle + Clone, C: Clock> Engine<O, C> {
    pub fn new(
        config: EngineConfig,
        contract: ContractConfig,
        oracle: O,
        clock: C,
    ) -> Result<Self, EngineError> {
        let params = contract.to_params()?;
        let now = clock.now();
        info!(identifier = %params.price_identifier, "engine created");
        Ok(Self {
            config,
            params,
            authorization: Authorization::full(),
            state: EngineState {
                fees: FeePayer::new(now),
                positions: PositionStore::new(),
                liquidations: LiquidationStore::new(),
                shutdown: EmergencyShutdown::default(),
                collateral: TokenLedger::new("COLLATERAL"),
                synthetic: TokenLedger::new("SYNTH"),
            },
            oracle,
            clock,
            events: Vec::new(),
            pending_events: Vec::new(),
            next_event_id: 1,
            current_time: now,
        })
    }

    pub fn time(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn params(&self) -> &ContractParams {
        &self.params
    }

    pub fn contract_address(&self) -> Address {
        self.config.contract_address
    }

    pub fn authorization(&self) -> Authorization {
        self.authorization
    }

    // capabilities the engine holds over the synthetic token
    pub fn set_authorization(&mut self, authorization: Authorization) {
        self.authorization = authorization;
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn collateral_token(&self) -> &TokenLedger {
        &self.state.collateral
    }

    /// Handle on the external collateral token, e.g. to fund actors.
    pub fn collateral_token_mut(&mut self) -> &mut TokenLedger {
        &mut self.state.collateral
    }

    pub fn synthetic_token(&self) -> &TokenLedger {
        &self.state.synthetic
    }

    /// Handle on the external synthetic token, e.g. for holders moving tokens between themselves.
    pub fn synthetic_token_mut(&mut self) -> &mut TokenLedger {
        &mut self.state.synthetic
    }

    pub fn position(&self, sponsor: Address) -> Option<&Position> {
        self.state.positions.get(&sponsor)
    }

    /// Fee-adjusted collateral of a sponsor, zero if they have no position.
    pub fn collateral_of(&self, sponsor: Address) -> Result<FixedPoint, EngineError> {
        match self.state.positions.get(&sponsor) {
            Some(position) => Ok(position.collateral(&self.state.fees)?),
            None => Ok(FixedPoint::ZERO),
        }
    }

    pub fn total_position_collateral(&self) -> Result<FixedPoint, EngineError> {
        Ok(self.state.positions.total_position_collateral(&self.state.fees)?)
    }

    pub fn total_tokens_outstanding(&self) -> FixedPoint {
        self.state.positions.global().total_tokens_outstanding
    }

    pub fn raw_total_position_collateral(&self) -> FixedPoint {
        self.state.positions.global().raw_total_position_collateral
    }

    pub fn global_collateralization_ratio(&self) -> Result<FixedPoint, EngineError> {
        Ok(self.state.positions.global_collateralization_ratio(&self.state.fees)?)
    }

    pub fn cumulative_fee_multiplier(&self) -> FixedPoint {
        self.state.fees.cumulative_fee_multiplier()
    }

    pub fn last_fee_payment_time(&self) -> Timestamp {
        self.state.fees.last_payment_time()
    }

    /// Collateral the contract owes to positions and open liquidations.
    pub fn pfc(&self) -> Result<FixedPoint, EngineError> {
        let positions = self.total_position_collateral()?;
        let liquidations = self
            .state
            .fees
            .adjusted(self.state.liquidations.raw_liquidation_collateral())?;
        Ok(positions.add(liquidations)?)
    }

    pub fn liquidation(&self, sponsor: Address, id: LiquidationId) -> Option<&Liquidation> {
        self.state.liquidations.get(&sponsor, id)
    }

    /// Every slot for a sponsor, withdrawn ones included (as `Uninitialized`).
    pub fn liquidations(&self, sponsor: Address) -> &[Liquidation] {
        self.state.liquidations.for_sponsor(&sponsor)
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.shutdown.is_shutdown()
    }

    pub fn shutdown_timestamp(&self) -> Option<Timestamp> {
        self.state.shutdown.timestamp()
    }

    pub fn shutdown_price(&self) -> Option<FixedPoint> {
        self.state.shutdown.price()
    }

    /// Aggregates match the sum over positions. Holds while the contract is live.
    pub fn positions_consistent(&self) -> bool {
        self.state.positions.verify_aggregates()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Charges regular fees up to now. Also runs at the start of every other operation.
    pub fn pay_regular_fees(&mut self) -> Result<FixedPoint, EngineError> {
        self.atomically("pay_regular_fees", |engine| engine.charge_regular_fees())
    }

    /// Sweeps whatever the contract holds beyond its liabilities to the beneficiary.
    /// For collateral that is the rounding dust left by fee charges.
    pub fn trim_excess(&mut self, token: TokenKind) -> Result<FixedPoint, EngineError> {
        self.atomically("trim_excess", |engine| {
            let contract = engine.config.contract_address;
            let beneficiary = engine.config.excess_token_beneficiary;
            let amount = match token {
                TokenKind::Collateral => {
                    let balance = engine.state.collateral.balance_of(contract);
                    balance.sub(engine.pfc()?)?
                }
                TokenKind::Synthetic => engine.state.synthetic.balance_of(contract),
            };
            let ledger = match token {
                TokenKind::Collateral => &mut engine.state.collateral,
                TokenKind::Synthetic => &mut engine.state.synthetic,
            };
            ledger.transfer(contract, beneficiary, amount)?;
            debug!(token = ledger.symbol(), %amount, "excess trimmed");
            Ok(amount)
        })
    }

    // 8.3: transaction wrapper. snapshot, run, commit events or restore everything.
    pub(super) fn atomically<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        self.current_time = self.clock.now();
        self.pending_events.clear();
        let state = self.state.clone();
        let oracle = self.oracle.clone();

        match f(self) {
            Ok(value) => {
                self.commit_events();
                Ok(value)
            }
            Err(err) => {
                self.state = state;
                self.oracle = oracle;
                self.pending_events.clear();
                debug!(operation, error = %err, "operation rolled back");
                Err(err)
            }
        }
    }

    pub(super) fn charge_regular_fees(&mut self) -> Result<FixedPoint, EngineError> {
        let now = self.current_time;
        let pfc = self.pfc()?;
        if pfc.is_zero() {
            self.state.fees.mark_paid(now);
            return Ok(FixedPoint::ZERO);
        }
        let last = self.state.fees.last_payment_time();
        if now <= last {
            return Ok(FixedPoint::ZERO);
        }

        let fee = compute_regular_fee(pfc, self.params.fee_per_second_per_pfc, now.secs_since(last))?;
        self.state.fees.mark_paid(now);
        if fee.is_zero() {
            return Ok(FixedPoint::ZERO);
        }

        self.state.fees.apply_fee(fee, pfc)?;
        let (contract, store) = (self.config.contract_address, self.config.store_address);
        self.state.collateral.transfer(contract, store, fee)?;
        self.emit_event(EventPayload::RegularFeesPaid(RegularFeesPaidEvent {
            regular_fee: fee,
            cumulative_fee_multiplier: self.state.fees.cumulative_fee_multiplier(),
        }));
        Ok(fee)
    }

    pub(super) fn require_not_shutdown(&self) -> Result<(), EngineError> {
        if self.state.shutdown.is_shutdown() {
            return Err(EngineError::InvalidState("Contract emergency shutdown"));
        }
        Ok(())
    }

    /// Position with collateral, as every operation on an existing position requires.
    pub(super) fn collateralized_position(&self, sponsor: Address) -> Result<Position, EngineError> {
        self.state
            .positions
            .get(&sponsor)
            .filter(|p| !p.raw_collateral.is_zero())
            .cloned()
            .ok_or(EngineError::Validation("Position has no collateral"))
    }

    pub(super) fn require_no_pending_withdrawal(position: &Position) -> Result<(), EngineError> {
        if position.has_pending_withdrawal() {
            return Err(EngineError::InvalidState("Pending withdrawal"));
        }
        Ok(())
    }

    /// True when `collateral / tokens` is at least the current global ratio.
    pub(super) fn meets_global_ratio(&self, collateral: FixedPoint, tokens: FixedPoint) -> Result<bool, EngineError> {
        let global = self.global_collateralization_ratio()?;
        let ratio = collateralization_ratio(collateral, tokens)?;
        Ok(global <= ratio)
    }

    pub(super) fn pull_collateral(&mut self, from: Address, amount: FixedPoint) -> Result<(), EngineError> {
        let contract = self.config.contract_address;
        Ok(self.state.collateral.transfer(from, contract, amount)?)
    }

    pub(super) fn pay_collateral(&mut self, to: Address, amount: FixedPoint) -> Result<(), EngineError> {
        let contract = self.config.contract_address;
        Ok(self.state.collateral.transfer(contract, to, amount)?)
    }

    pub(super) fn mint_synthetic(&mut self, to: Address, amount: FixedPoint) -> Result<(), EngineError> {
        if !self.authorization.can_mint {
            return Err(EngineError::Unauthorized("Sender must be the minter"));
        }
        Ok(self.state.synthetic.mint(to, amount)?)
    }

    /// Pulls synthetic tokens from `owner` into the contract and burns them.
    pub(super) fn burn_synthetic_from(&mut self, owner: Address, amount: FixedPoint) -> Result<(), EngineError> {
        if !self.authorization.can_burn {
            return Err(EngineError::Unauthorized("Sender must be the burner"));
        }
        let contract = self.config.contract_address;
        self.state.synthetic.transfer(owner, contract, amount)?;
        Ok(self.state.synthetic.burn(contract, amount)?)
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        self.pending_events.push(payload);
    }

    fn commit_events(&mut self) {
        for payload in std::mem::take(&mut self.pending_events) {
            let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
            self.next_event_id += 1;
            debug!(id = event.id.0, name = event.payload.name(), "event");
            self.events.push(event);
        }

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
