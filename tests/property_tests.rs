//! Property-based tests for the fixed point and fee accounting math.
//!
//! These tests verify rounding directions hold under random inputs.

use proptest::prelude::*;
use synth_core::*;

// Strategies for generating test data
fn amount_strategy() -> impl Strategy<Value = FixedPoint> {
    (1u128..1_000_000_000_000_000_000_000_000_000u128).prop_map(FixedPoint::from_raw_u128) // 1 wei to 1e12 units
}

fn ratio_strategy() -> impl Strategy<Value = FixedPoint> {
    (1u128..=1_000_000_000_000_000_000u128).prop_map(FixedPoint::from_raw_u128) // (0, 1]
}

fn one_wei() -> FixedPoint {
    FixedPoint::from_raw_u128(1)
}

proptest! {
    /// Rounding up never differs from truncation by more than one unit
    #[test]
    fn mul_ceil_within_one_wei(a in amount_strategy(), b in amount_strategy()) {
        let floor = a.mul(b).unwrap();
        let ceil = a.mul_ceil(b).unwrap();
        prop_assert!(floor <= ceil);
        prop_assert!(ceil <= floor.add(one_wei()).unwrap());
    }

    #[test]
    fn div_ceil_within_one_wei(a in amount_strategy(), b in amount_strategy()) {
        let floor = a.div(b).unwrap();
        let ceil = a.div_ceil(b).unwrap();
        prop_assert!(floor <= ceil);
        prop_assert!(ceil <= floor.add(one_wei()).unwrap());
    }

    /// Multiplying back a truncated quotient never exceeds the dividend
    #[test]
    fn div_then_mul_never_grows(a in amount_strategy(), b in amount_strategy()) {
        let quotient = a.div(b).unwrap();
        prop_assert!(quotient.mul(b).unwrap() <= a);
    }

    #[test]
    fn add_sub_inverse(a in amount_strategy(), b in amount_strategy()) {
        prop_assert_eq!(a.add(b).unwrap().sub(b).unwrap(), a);
    }

    /// Decimal strings parse back to the same value
    #[test]
    fn display_parses_back(a in amount_strategy()) {
        let parsed: FixedPoint = a.to_string().parse().unwrap();
        prop_assert_eq!(parsed, a);
    }

    /// A deposit never credits more than was paid in, a removal never debits less than was paid out
    #[test]
    fn collateral_rounding_favors_the_pool(
        multiplier in ratio_strategy(),
        balance in amount_strategy(),
        amount in amount_strategy(),
    ) {
        let mut fees = FeePayer::new(Timestamp(0));
        fees.apply_fee(FixedPoint::ONE.sub(multiplier).unwrap(), FixedPoint::ONE).unwrap();

        let mut raw = fees.raw_for_deposit(balance).unwrap();
        let added = fees.add_collateral(&mut raw, amount).unwrap();
        prop_assert!(added <= amount);

        let available = fees.adjusted(raw).unwrap();
        prop_assume!(amount <= available);
        let mut after = raw;
        if let Ok(removed) = fees.remove_collateral(&mut after, amount) {
            prop_assert!(removed >= amount);
        }
    }

    /// Charging a fee shrinks the fee-adjusted pool by at least the fee
    #[test]
    fn fee_never_undercharged(pfc in amount_strategy(), fraction in ratio_strategy()) {
        let fee = pfc.mul(fraction).unwrap();
        let mut fees = FeePayer::new(Timestamp(0));
        fees.apply_fee(fee, pfc).unwrap();

        prop_assert!(fees.cumulative_fee_multiplier() <= FixedPoint::ONE);
        prop_assert!(fees.adjusted(pfc).unwrap().add(fee).unwrap() <= pfc);
    }

    #[test]
    fn regular_fee_capped_at_pfc(
        pfc in amount_strategy(),
        rate in ratio_strategy(),
        elapsed in 0u64..1_000_000u64,
    ) {
        let fee = compute_regular_fee(pfc, rate, elapsed).unwrap();
        prop_assert!(fee <= pfc);
    }

    /// Shutdown claims never pay a sponsor for debt they did not cover
    #[test]
    fn settlement_claim_bounded(
        tokens in amount_strategy(),
        collateral in amount_strategy(),
        debt in amount_strategy(),
        price in ratio_strategy(),
    ) {
        let redeemable = tokens.mul(price).unwrap();
        let claim = settlement_claim(
            tokens,
            price,
            Some(SponsorClaim { collateral, tokens_outstanding: debt }),
        )
        .unwrap();
        prop_assert!(claim >= redeemable);
        prop_assert!(claim <= redeemable.add(collateral).unwrap());
    }
}
