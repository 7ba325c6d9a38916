// 8.6: emergency shutdown. freezes the position manager and settles every holder at one
// oracle price, first come first served.

use super::core::Engine;
use super::results::EngineError;
use crate::clock::Clock;
use crate::events::{EmergencyShutdownEvent, EndedSponsorPositionEvent, EventPayload, SettleEmergencyShutdownEvent};
use crate::fixed_point::FixedPoint;
use crate::oracle::Oracle;
use crate::shutdown::{settlement_claim, SponsorClaim};
use crate::types::{Address, Authorization};
use tracing::{info, warn};

impl<O: Oracle + Clone, C: Clock> Engine<O, C> {
    /// Irreversibly stop the position manager and request the settlement price for now.
    pub fn emergency_shutdown(&mut self, caller: Address, authorization: &Authorization) -> Result<(), EngineError> {
        self.atomically("emergency_shutdown", |engine| {
            if !authorization.can_manage {
                return Err(EngineError::Unauthorized("Caller is not the manager"));
            }
            engine.require_not_shutdown()?;
            engine.charge_regular_fees()?;

            let now = engine.current_time;
            engine.state.shutdown.trigger(now);
            let identifier = engine.params.price_identifier.clone();
            engine.oracle.request_price(&identifier, now);

            info!(%caller, timestamp = %now, "emergency shutdown");
            engine.emit_event(EventPayload::EmergencyShutdown(EmergencyShutdownEvent {
                caller,
                shutdown_timestamp: now,
            }));
            Ok(())
        })
    }

    /// Redeem the caller's whole synthetic balance, and close their position if they have one,
    /// at the shutdown price. Paid out of whatever collateral is left. Returns the amount paid.
    pub fn settle_emergency_shutdown(&mut self, caller: Address) -> Result<FixedPoint, EngineError> {
        self.atomically("settle_emergency_shutdown", |engine| {
            let Some(shutdown_time) = engine.state.shutdown.timestamp() else {
                return Err(EngineError::InvalidState("Contract not emergency shutdown"));
            };
            engine.charge_regular_fees()?;

            let price = match engine.state.shutdown.price() {
                Some(price) => price,
                None => {
                    let resolved = engine.oracle.get_price(&engine.params.price_identifier, shutdown_time)?;
                    engine.state.shutdown.pin_price(resolved)
                }
            };

            let fees = engine.state.fees.clone();
            let tokens_to_redeem = engine.state.synthetic.balance_of(caller);
            let sponsor_claim = match engine.state.positions.get(&caller) {
                Some(position) => {
                    let collateral = position.collateral(&fees)?;
                    (!collateral.is_zero()).then_some(SponsorClaim {
                        collateral,
                        tokens_outstanding: position.tokens_outstanding,
                    })
                }
                None => None,
            };
            if sponsor_claim.is_some() {
                engine.state.positions.forget(&caller);
                engine.emit_event(EventPayload::EndedSponsorPosition(EndedSponsorPositionEvent { sponsor: caller }));
            }

            let claim = settlement_claim(tokens_to_redeem, price, sponsor_claim)?;
            let available = engine.state.positions.total_position_collateral(&fees)?;
            let payout = claim.min(available);
            if payout < claim {
                warn!(%caller, %claim, %payout, "settlement short of claim");
            }
            let collateral_returned = engine.state.positions.remove_global_collateral(&fees, payout)?;
            let tokens_tracked = tokens_to_redeem.min(engine.total_tokens_outstanding());
            engine.state.positions.remove_global_tokens(tokens_tracked)?;

            engine.emit_event(EventPayload::SettleEmergencyShutdown(SettleEmergencyShutdownEvent {
                caller,
                collateral_returned,
                tokens_burned: tokens_to_redeem,
            }));
            engine.pay_collateral(caller, collateral_returned)?;
            engine.burn_synthetic_from(caller, tokens_to_redeem)?;
            Ok(collateral_returned)
        })
    }
}
