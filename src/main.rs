//! Synthetic Asset Engine Simulation.
//!
//! Walks the engine through a sponsor lifecycle, fee dust, liquidations with and without
//! a dispute, and an undercollateralized emergency shutdown.

use rust_decimal_macros::dec;
use synth_core::*;
use tracing_subscriber::EnvFilter;

const SPONSOR: Address = Address(0x1);
const OTHER: Address = Address(0x2);
const LIQUIDATOR: Address = Address(0x3);
const DISPUTER: Address = Address(0x4);
const HOLDER: Address = Address(0x5);
const ADMIN: Address = Address(0xA);

type SimEngine = Engine<MockOracle, ManualClock>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Synthetic Asset Engine Simulation");
    println!("Single Collateral Pool, Fixed Point Accounting, Full Lifecycle\n");

    let scenarios: [(&str, fn() -> Result<(), EngineError>); 5] = [
        ("sponsor lifecycle", scenario_1_sponsor_lifecycle),
        ("fee precision loss", scenario_2_fee_precision_loss),
        ("undisputed liquidation", scenario_3_undisputed_liquidation),
        ("successful dispute", scenario_4_successful_dispute),
        ("undercollateralized shutdown", scenario_5_undercollateralized_shutdown),
    ];

    for (name, scenario) in scenarios {
        if let Err(err) = scenario() {
            eprintln!("  {name} failed: {err}");
            std::process::exit(1);
        }
    }

    println!("\nAll simulations completed successfully.");
}

fn units(n: u64) -> FixedPoint {
    FixedPoint::from_unscaled(n)
}

fn new_engine(contract: ContractConfig) -> Result<(SimEngine, ManualClock), EngineError> {
    let clock = ManualClock::new(Timestamp::from_secs(1_700_000_000));
    let mut engine = Engine::new(EngineConfig::default(), contract, MockOracle::new(), clock.clone())?;
    for actor in [SPONSOR, OTHER, LIQUIDATOR, DISPUTER, HOLDER] {
        engine.collateral_token_mut().mint(actor, units(10_000))?;
    }
    Ok((engine, clock))
}

/// Create, top up, withdraw, partially redeem, re-mint, close.
fn scenario_1_sponsor_lifecycle() -> Result<(), EngineError> {
    println!("Scenario 1: Sponsor Lifecycle\n");
    let (mut engine, _) = new_engine(ContractConfig::default())?;

    engine.create(OTHER, units(1), units(1_000))?;
    engine.create(SPONSOR, units(150), units(100))?;
    println!("  Sponsor locks 150 collateral, mints 100 tokens");

    engine.deposit(SPONSOR, units(50))?;
    let withdrawn = engine.withdraw(SPONSOR, units(20))?;
    println!("  Deposit 50, withdraw {withdrawn}: collateral {}", engine.collateral_of(SPONSOR)?);

    let redeemed = engine.redeem(SPONSOR, units(50))?;
    println!("  Redeem 50 tokens for {redeemed} collateral");

    engine.create(SPONSOR, units(110), units(10))?;
    let tokens = engine.position(SPONSOR).map(|p| p.tokens_outstanding).unwrap_or_default();
    let closed = engine.redeem(SPONSOR, tokens)?;
    println!("  Mint 10 more, then redeem all {tokens} for {closed}");
    println!("  Position open: {}\n", engine.position(SPONSOR).is_some());
    Ok(())
}

/// A 4% fee on 30 wei leaves one wei the positions can no longer claim.
fn scenario_2_fee_precision_loss() -> Result<(), EngineError> {
    println!("Scenario 2: Fee Precision Loss\n");
    let (mut engine, clock) = new_engine(
        ContractConfig::default()
            .with_min_sponsor_tokens(dec!(0))
            .with_fee_per_second(dec!(0.04)),
    )?;

    engine.create(SPONSOR, FixedPoint::from_raw_u128(30), FixedPoint::from_raw_u128(20))?;
    clock.advance(1);
    let fee = engine.pay_regular_fees()?;

    println!("  Fee charged: {} wei", fee.raw());
    println!("  Multiplier: {}", engine.cumulative_fee_multiplier());
    println!("  Position collateral: {} wei", engine.total_position_collateral()?.raw());
    println!(
        "  Contract balance: {} wei",
        engine.collateral_token().balance_of(engine.contract_address()).raw()
    );

    let dust = engine.trim_excess(TokenKind::Collateral)?;
    println!("  Trimmed {} wei of rounding dust\n", dust.raw());
    Ok(())
}

/// Liquidator takes a whole position and nobody disputes.
fn scenario_3_undisputed_liquidation() -> Result<(), EngineError> {
    println!("Scenario 3: Undisputed Liquidation\n");
    let (mut engine, clock) = new_engine(ContractConfig::testing())?;

    engine.create(SPONSOR, units(150), units(100))?;
    engine.synthetic_token_mut().transfer(SPONSOR, LIQUIDATOR, units(100))?;

    let deadline = engine.time().plus_secs(300);
    let outcome = engine.create_liquidation(LIQUIDATOR, LiquidationRequest::any_price(SPONSOR, units(100), deadline))?;
    println!(
        "  Liquidation {} takes {} tokens, final fee bond {}",
        outcome.liquidation_id.0, outcome.tokens_liquidated, outcome.final_fee_bond
    );

    clock.advance(engine.params().liquidation_liveness_secs);
    let rewards = engine.withdraw_liquidation(LIQUIDATOR, SPONSOR, outcome.liquidation_id)?;
    println!("  After liveness the liquidator collects {}\n", rewards.paid_to_liquidator);
    Ok(())
}

/// The oracle says the position was fine, so the disputer wins.
fn scenario_4_successful_dispute() -> Result<(), EngineError> {
    println!("Scenario 4: Successful Dispute\n");
    let (mut engine, clock) = new_engine(ContractConfig::testing())?;

    engine.create(SPONSOR, units(150), units(100))?;
    engine.synthetic_token_mut().transfer(SPONSOR, LIQUIDATOR, units(100))?;

    let liquidation_time = engine.time();
    let deadline = liquidation_time.plus_secs(300);
    let outcome = engine.create_liquidation(LIQUIDATOR, LiquidationRequest::any_price(SPONSOR, units(100), deadline))?;
    let paid = engine.dispute(DISPUTER, SPONSOR, outcome.liquidation_id)?;
    println!("  Disputer posts bond and final fee: {paid}");

    clock.advance(60);
    let identifier = engine.params().price_identifier.clone();
    engine.oracle_mut().push_price(&identifier, liquidation_time, units(1));

    let rewards = engine.withdraw_liquidation(DISPUTER, SPONSOR, outcome.liquidation_id)?;
    println!("  Outcome: {:?}", rewards.status);
    println!("  Disputer: {}", rewards.paid_to_disputer);
    println!("  Liquidator: {}", rewards.paid_to_liquidator);
    println!("  Sponsor: {}\n", rewards.paid_to_sponsor);
    Ok(())
}

/// Claims exceed the collateral left, so late settlers absorb the shortfall.
fn scenario_5_undercollateralized_shutdown() -> Result<(), EngineError> {
    println!("Scenario 5: Undercollateralized Shutdown\n");
    let (mut engine, _) = new_engine(ContractConfig::default())?;

    engine.create(SPONSOR, units(50), units(100))?;
    engine.create(OTHER, units(150), units(100))?;
    engine.synthetic_token_mut().transfer(OTHER, HOLDER, units(75))?;
    engine.synthetic_token_mut().transfer(SPONSOR, HOLDER, units(75))?;

    let shutdown_time = engine.time();
    engine.emergency_shutdown(ADMIN, &Authorization::manager())?;
    let identifier = engine.params().price_identifier.clone();
    engine.oracle_mut().push_price(&identifier, shutdown_time, units(1));
    println!("  Shutdown at {shutdown_time}, settlement price 1");

    for (name, who) in [("holder", HOLDER), ("other", OTHER), ("sponsor", SPONSOR)] {
        let paid = engine.settle_emergency_shutdown(who)?;
        println!("  {name} settles for {paid}");
    }
    println!("  Collateral left: {}\n", engine.total_position_collateral()?);
    Ok(())
}
