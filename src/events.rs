// 11.0: every state change produces an event carrying the amounts it computed, enough for
// off-chain reconciliation. events from a failed operation are never committed.
// the EventPayload enum lists all event types.

use crate::fixed_point::FixedPoint;
use crate::liquidation::LiquidationStatus;
use crate::types::{Address, LiquidationId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    // Position events
    NewSponsor(NewSponsorEvent),
    PositionCreated(PositionCreatedEvent),
    Deposit(DepositEvent),
    Withdrawal(WithdrawalEvent),
    RequestWithdrawal(RequestWithdrawalEvent),
    RequestWithdrawalCanceled(RequestWithdrawalCanceledEvent),
    RequestWithdrawalExecuted(RequestWithdrawalExecutedEvent),
    Redeem(RedeemEvent),
    Repay(RepayEvent),
    EndedSponsorPosition(EndedSponsorPositionEvent),

    // Fee events
    RegularFeesPaid(RegularFeesPaidEvent),

    // Liquidation events
    LiquidationCreated(LiquidationCreatedEvent),
    LiquidationDisputed(LiquidationDisputedEvent),
    DisputeSettled(DisputeSettledEvent),
    LiquidationWithdrawn(LiquidationWithdrawnEvent),

    // Shutdown events
    EmergencyShutdown(EmergencyShutdownEvent),
    SettleEmergencyShutdown(SettleEmergencyShutdownEvent),
}

impl EventPayload {
    pub fn name(&self) -> &'static str {
        match self {
            EventPayload::NewSponsor(_) => "NewSponsor",
            EventPayload::PositionCreated(_) => "PositionCreated",
            EventPayload::Deposit(_) => "Deposit",
            EventPayload::Withdrawal(_) => "Withdrawal",
            EventPayload::RequestWithdrawal(_) => "RequestWithdrawal",
            EventPayload::RequestWithdrawalCanceled(_) => "RequestWithdrawalCanceled",
            EventPayload::RequestWithdrawalExecuted(_) => "RequestWithdrawalExecuted",
            EventPayload::Redeem(_) => "Redeem",
            EventPayload::Repay(_) => "Repay",
            EventPayload::EndedSponsorPosition(_) => "EndedSponsorPosition",
            EventPayload::RegularFeesPaid(_) => "RegularFeesPaid",
            EventPayload::LiquidationCreated(_) => "LiquidationCreated",
            EventPayload::LiquidationDisputed(_) => "LiquidationDisputed",
            EventPayload::DisputeSettled(_) => "DisputeSettled",
            EventPayload::LiquidationWithdrawn(_) => "LiquidationWithdrawn",
            EventPayload::EmergencyShutdown(_) => "EmergencyShutdown",
            EventPayload::SettleEmergencyShutdown(_) => "SettleEmergencyShutdown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSponsorEvent {
    pub sponsor: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCreatedEvent {
    pub sponsor: Address,
    pub collateral_amount: FixedPoint,
    pub num_tokens: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositEvent {
    pub sponsor: Address,
    pub collateral_amount: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalEvent {
    pub sponsor: Address,
    pub collateral_amount: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestWithdrawalEvent {
    pub sponsor: Address,
    pub collateral_amount: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestWithdrawalCanceledEvent {
    pub sponsor: Address,
    pub collateral_amount: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestWithdrawalExecutedEvent {
    pub sponsor: Address,
    pub collateral_amount: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemEvent {
    pub sponsor: Address,
    pub collateral_amount: FixedPoint,
    pub token_amount: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepayEvent {
    pub sponsor: Address,
    pub num_tokens_repaid: FixedPoint,
    pub new_token_count: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndedSponsorPositionEvent {
    pub sponsor: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularFeesPaidEvent {
    pub regular_fee: FixedPoint,
    pub cumulative_fee_multiplier: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationCreatedEvent {
    pub sponsor: Address,
    pub liquidator: Address,
    pub liquidation_id: LiquidationId,
    pub tokens_outstanding: FixedPoint,
    pub locked_collateral: FixedPoint,
    pub liquidated_collateral: FixedPoint,
    pub liquidation_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationDisputedEvent {
    pub sponsor: Address,
    pub liquidator: Address,
    pub disputer: Address,
    pub liquidation_id: LiquidationId,
    pub dispute_bond_amount: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeSettledEvent {
    pub caller: Address,
    pub sponsor: Address,
    pub liquidator: Address,
    pub disputer: Address,
    pub liquidation_id: LiquidationId,
    pub dispute_succeeded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationWithdrawnEvent {
    pub caller: Address,
    pub paid_to_liquidator: FixedPoint,
    pub paid_to_disputer: FixedPoint,
    pub paid_to_sponsor: FixedPoint,
    pub liquidation_status: LiquidationStatus,
    pub settlement_price: Option<FixedPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyShutdownEvent {
    pub caller: Address,
    pub shutdown_timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleEmergencyShutdownEvent {
    pub caller: Address,
    pub collateral_returned: FixedPoint,
    pub tokens_burned: FixedPoint,
}
