//! Exact reasoning over Bayesian networks and influence diagrams.
//!
//! Probabilities and utilities are both represented as `Factor`s, dense tables over discrete
//! `Variable`s. Inference answers conditional queries by variable elimination; decisions are
//! eliminated by maximization, yielding the optimal policy of each decision and the maximum
//! expected utility.

extern crate bidir_map;
extern crate indexmap;
#[macro_use]
extern crate itertools;
#[macro_use]
extern crate ndarray;
extern crate ndarray_rand;
extern crate rand;

pub mod config;
pub mod factor;
pub mod inference;
pub mod init;
pub mod model;
pub mod util;
pub mod variable;

pub use config::EliminationConfig;
pub use factor::{Criterion, Factor, Role};
pub use model::{Network, NetworkBuilder, NodeKind};
pub use util::{InfluenceError, Result};
pub use variable::{Assignment, Variable};
