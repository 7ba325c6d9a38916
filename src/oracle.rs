// Oracle Integration
//
// The engine never decides prices itself. Disputes and emergency shutdown ask an external
// oracle for the price of the contract's identifier at a specific timestamp, then poll it
// on later calls. Resolution can take arbitrarily long; the engine just keeps failing with
// "Unresolved oracle price" until it arrives.

use crate::fixed_point::FixedPoint;
use crate::types::{PriceIdentifier, Timestamp};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("Unresolved oracle price")]
    Unresolved,
}

/// Trait for price oracles. Implement this to plug in a real resolution mechanism.
pub trait Oracle {
    /// Ask for a price to be resolved. Requests are idempotent.
    fn request_price(&mut self, identifier: &PriceIdentifier, time: Timestamp);

    /// Whether a price for this request has been resolved.
    fn has_price(&self, identifier: &PriceIdentifier, time: Timestamp) -> bool;

    /// The resolved price, or `Unresolved`.
    fn get_price(&self, identifier: &PriceIdentifier, time: Timestamp) -> Result<FixedPoint, OracleError>;
}

/// Mock oracle for testing. Prices are pushed by hand and can be overwritten, which lets
/// tests check that the engine keeps the first price it observed.
#[derive(Debug, Clone, Default)]
pub struct MockOracle {
    prices: HashMap<(PriceIdentifier, Timestamp), FixedPoint>,
    requests: Vec<(PriceIdentifier, Timestamp)>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_price(&mut self, identifier: &PriceIdentifier, time: Timestamp, price: FixedPoint) {
        self.prices.insert((identifier.clone(), time), price);
    }

    pub fn is_requested(&self, identifier: &PriceIdentifier, time: Timestamp) -> bool {
        self.requests
            .iter()
            .any(|(id, t)| id == identifier && *t == time)
    }

    pub fn pending_requests(&self) -> Vec<(PriceIdentifier, Timestamp)> {
        self.requests
            .iter()
            .filter(|(id, t)| !self.prices.contains_key(&(id.clone(), *t)))
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }
}

impl Oracle for MockOracle {
    fn request_price(&mut self, identifier: &PriceIdentifier, time: Timestamp) {
        if !self.is_requested(identifier, time) {
            self.requests.push((identifier.clone(), time));
        }
    }

    fn has_price(&self, identifier: &PriceIdentifier, time: Timestamp) -> bool {
        self.prices.contains_key(&(identifier.clone(), time))
    }

    fn get_price(&self, identifier: &PriceIdentifier, time: Timestamp) -> Result<FixedPoint, OracleError> {
        self.prices
            .get(&(identifier.clone(), time))
            .copied()
            .ok_or(OracleError::Unresolved)
    }
}
