// 8.0.2: result types and errors for engine operations.

use crate::config::ConfigError;
use crate::fixed_point::{FixedPoint, MathError};
use crate::liquidation::LiquidationStatus;
use crate::oracle::OracleError;
use crate::token::TokenError;
use crate::types::LiquidationId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationOutcome {
    pub liquidation_id: LiquidationId,
    pub tokens_liquidated: FixedPoint,
    pub final_fee_bond: FixedPoint,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardsData {
    pub paid_to_liquidator: FixedPoint,
    pub paid_to_sponsor: FixedPoint,
    pub paid_to_disputer: FixedPoint,
    pub status: LiquidationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    // bad amount, below minimum, wrong liquidation price window
    #[error("{0}")]
    Validation(&'static str),

    // GCR and post-withdrawal ratio checks
    #[error("{0}")]
    InsufficientCollateralization(&'static str),

    // unknown id, wrong liquidation state, shutdown mode, missing request, unresolved price
    #[error("{0}")]
    InvalidState(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Token(#[from] TokenError),

    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(#[from] MathError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// The bare reason string, as callers match on it.
    pub fn reason(&self) -> String {
        match self {
            EngineError::Validation(reason)
            | EngineError::InsufficientCollateralization(reason)
            | EngineError::InvalidState(reason)
            | EngineError::Unauthorized(reason) => (*reason).to_string(),
            other => other.to_string(),
        }
    }
}

impl From<OracleError> for EngineError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Unresolved => EngineError::InvalidState("Unresolved oracle price"),
        }
    }
}
