//! Defines the `Error` type for the influence library

use std::result;

use thiserror::Error;

pub type Result<T> = result::Result<T, InfluenceError>;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum InfluenceError {

    /// The number of values provided for a `Factor` does not match the product of the state
    /// counts of its scope
    #[error("Expected {expected} values for the scope, but {actual} were provided")]
    InvalidLength { expected: usize, actual: usize },

    /// Represents an error where a certain constraint on a scope was not satisfied
    #[error("Provided scope did not satisfy constraints: {0}")]
    InvalidScope(String),

    /// Represents a variable that was present multiple times in a situation where it should only
    /// have been present once
    #[error("A variable was encountered twice")]
    DuplicateVariable,

    /// An operand this engine cannot combine, e.g. a `Variable` with a continuous domain
    #[error("Unsupported operand type: {0}")]
    UnsupportedOperand(String),

    /// Attempted to normalize a table whose values sum to zero. This usually means the evidence
    /// is impossible under the model.
    #[error("Cannot normalize a null vector")]
    NullVector,

    /// Represents an incomplete assignment where a complete assignment was required.
    #[error("Missing assignments to the required Variables")]
    IncompleteAssignment,

    /// Represents the situation when we expected a CPD but did not receive one
    #[error("Requires a Conditional Probability Distribution")]
    NotACPD,

    /// Represents an attempt to initialize a variable with an incompatible Initialization
    #[error("An invalid initialization was provided")]
    InvalidInitialization,

    /// A `Variable` was referenced that is not part of the model
    #[error("The variable is not part of the model")]
    MissingVariable,

    /// An `EliminationConfig` failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

}
