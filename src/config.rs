//! Tunables of the elimination algorithms

use crate::util::{InfluenceError, Result};

/// Relative tolerance under which two values are considered equal when looking for the optimal
/// alternatives of a decision, and under which a utility is considered zero.
pub const MAX_ROUND_ERROR_ALLOWED: f64 = 1e-8;


/// Configuration of variable elimination over an influence diagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EliminationConfig {

    /// Relative tie threshold for maximization. Must be finite and non-negative.
    pub max_round_error: f64,

    /// Record the chosen alternatives of every eliminated decision in the resulting utilities.
    /// Annotations already present on the inputs are propagated either way.
    pub record_strategy: bool

}

impl Default for EliminationConfig {
    fn default() -> Self {
        EliminationConfig {
            max_round_error: MAX_ROUND_ERROR_ALLOWED,
            record_strategy: false
        }
    }
}

impl EliminationConfig {

    /// A default configuration that records strategies
    pub fn recording() -> Self {
        EliminationConfig { record_strategy: true, ..EliminationConfig::default() }
    }

    /// Check that the configuration is usable
    ///
    /// # Errors
    /// * `InfluenceError::InvalidConfig` if `max_round_error` is negative or not finite
    pub fn validate(self) -> Result<Self> {
        if ! self.max_round_error.is_finite() || self.max_round_error < 0.0 {
            return Err(InfluenceError::InvalidConfig(
                String::from("max_round_error must be finite and >= 0")
            ));
        }
        Ok(self)
    }

}


#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn default_is_valid() {
        let config = EliminationConfig::default();
        assert_eq!(MAX_ROUND_ERROR_ALLOWED, config.max_round_error);
        assert!(! config.record_strategy);
        assert_eq!(Ok(config), config.validate());

        assert!(EliminationConfig::recording().record_strategy);
    }

    #[test]
    fn rejects_bad_tolerance() {
        for &bad in [-1e-3, std::f64::NAN, std::f64::INFINITY].iter() {
            let config = EliminationConfig { max_round_error: bad, ..EliminationConfig::default() };
            match config.validate() {
                Err(InfluenceError::InvalidConfig(_)) => (),
                r => panic!("unexpected {:?}", r)
            };
        }
    }

}
