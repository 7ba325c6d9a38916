// 7.0 config.rs: every financial parameter of a contract in one place.
// 7.1 ContractConfig is the human facing form (Decimal, serde). ContractParams is the
// validated fixed point form the engine runs on.

use crate::fixed_point::{FixedPoint, MathError};
use crate::types::PriceIdentifier;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractConfig {
    // Oracle identifier the synthetic tracks (e.g. "EUR/USD")
    pub price_identifier: String,
    // Smallest debt a position may carry while open
    pub min_sponsor_tokens: Decimal,
    // Delay before a slow withdrawal request can be executed
    pub withdrawal_liveness_secs: u64,
    // Window in which a liquidation can be disputed
    pub liquidation_liveness_secs: u64,
    // Collateral per unit of debt value a position must hold (1.2 = 120%)
    pub collateral_requirement: Decimal,
    // Disputer's stake as a fraction of locked collateral
    pub dispute_bond_pct: Decimal,
    // Share of TRV paid to the sponsor when a dispute succeeds
    pub sponsor_dispute_reward_pct: Decimal,
    // Share of TRV paid to the disputer when a dispute succeeds
    pub disputer_dispute_reward_pct: Decimal,
    // Regular fee charged on pfc per second
    pub fee_per_second_per_pfc: Decimal,
    // Flat fee owed to the store by liquidators and disputers
    pub final_fee: Decimal,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            price_identifier: "EUR/USD".to_string(),
            min_sponsor_tokens: dec!(1),
            withdrawal_liveness_secs: 3_600,    // 1 hour
            liquidation_liveness_secs: 10_800,  // 3 hours
            collateral_requirement: dec!(1.2),  // 120%
            dispute_bond_pct: dec!(0.1),        // 10%
            sponsor_dispute_reward_pct: dec!(0.05),
            disputer_dispute_reward_pct: dec!(0.05),
            fee_per_second_per_pfc: Decimal::ZERO,
            final_fee: Decimal::ZERO,
        }
    }
}

impl ContractConfig {
    // Matches the parameters the liquidation suites were written against: 1 unit final fee.
    pub fn testing() -> Self {
        Self {
            final_fee: dec!(1),
            ..Self::default()
        }
    }

    pub fn with_min_sponsor_tokens(mut self, min: Decimal) -> Self {
        self.min_sponsor_tokens = min;
        self
    }

    pub fn with_fee_per_second(mut self, rate: Decimal) -> Self {
        self.fee_per_second_per_pfc = rate;
        self
    }

    pub fn with_final_fee(mut self, fee: Decimal) -> Self {
        self.final_fee = fee;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let amounts = [
            self.min_sponsor_tokens,
            self.collateral_requirement,
            self.dispute_bond_pct,
            self.sponsor_dispute_reward_pct,
            self.disputer_dispute_reward_pct,
            self.fee_per_second_per_pfc,
            self.final_fee,
        ];
        if amounts.iter().any(|v| v.is_sign_negative() && !v.is_zero()) {
            return Err(ConfigError::NegativeParameter);
        }

        // rewards come out of TRV, both together must leave something for the liquidator
        if self.sponsor_dispute_reward_pct + self.disputer_dispute_reward_pct >= Decimal::ONE {
            return Err(ConfigError::RewardsTooHigh);
        }

        if self.collateral_requirement <= Decimal::ONE {
            return Err(ConfigError::CollateralRequirementTooLow);
        }

        if self.fee_per_second_per_pfc >= Decimal::ONE {
            return Err(ConfigError::FeeTooHigh);
        }

        if self.price_identifier.is_empty() {
            return Err(ConfigError::MissingIdentifier);
        }

        Ok(())
    }

    pub fn to_params(&self) -> Result<ContractParams, ConfigError> {
        self.validate()?;
        let fp = |value: Decimal| FixedPoint::from_decimal(value).map_err(ConfigError::Math);
        Ok(ContractParams {
            price_identifier: PriceIdentifier::new(self.price_identifier.clone()),
            min_sponsor_tokens: fp(self.min_sponsor_tokens)?,
            withdrawal_liveness_secs: self.withdrawal_liveness_secs,
            liquidation_liveness_secs: self.liquidation_liveness_secs,
            collateral_requirement: fp(self.collateral_requirement)?,
            dispute_bond_pct: fp(self.dispute_bond_pct)?,
            sponsor_dispute_reward_pct: fp(self.sponsor_dispute_reward_pct)?,
            disputer_dispute_reward_pct: fp(self.disputer_dispute_reward_pct)?,
            fee_per_second_per_pfc: fp(self.fee_per_second_per_pfc)?,
            final_fee: fp(self.final_fee)?,
        })
    }
}

/// Validated parameters in engine units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractParams {
    pub price_identifier: PriceIdentifier,
    pub min_sponsor_tokens: FixedPoint,
    pub withdrawal_liveness_secs: u64,
    pub liquidation_liveness_secs: u64,
    pub collateral_requirement: FixedPoint,
    pub dispute_bond_pct: FixedPoint,
    pub sponsor_dispute_reward_pct: FixedPoint,
    pub disputer_dispute_reward_pct: FixedPoint,
    pub fee_per_second_per_pfc: FixedPoint,
    pub final_fee: FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Rewards are more than 100%")]
    RewardsTooHigh,
    #[error("CR is more than 100%")]
    CollateralRequirementTooLow,
    #[error("Fee is more than 100%")]
    FeeTooHigh,
    #[error("Negative parameter")]
    NegativeParameter,
    #[error("Missing price identifier")]
    MissingIdentifier,
    #[error("Parameter out of range: {0}")]
    Math(MathError),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn config(&self) -> ContractConfig {
        match self {
            Environment::Development => ContractConfig::testing(),
            Environment::Production => ContractConfig {
                min_sponsor_tokens: dec!(100),
                withdrawal_liveness_secs: 7_200,
                liquidation_liveness_secs: 7_200,
                collateral_requirement: dec!(1.25),
                final_fee: dec!(5),
                ..ContractConfig::default()
            },
        }
    }
}
