//! Module containing initialization routines for the parameters of a model.

use crate::factor::ops;
use crate::factor::{Factor, Role};
use crate::util::{InfluenceError, Result};
use crate::variable::Variable;

use ndarray::prelude as nd;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Defines possible ways to initialize a `Variable`s CPD.
pub enum Initialization<'a> {
    /// A uniform distribution over all possibilities
    Uniform,

    /// Randomly initialize the weights of the CPD.
    Random,

    /// Randomly initialize the weights of the CPD from a seeded generator, so that the same seed
    /// always builds the same table.
    Seeded(u64),

    /// Initialize the CPD as a Binomial distribution with parameter ```p```.
    /// Note that this `Initialization` is valid only to a `Variable` with no parents.
    Binomial(f64),

    /// Initialize the CPD as a Multinomial distribution with parameters ```p_0, p_1...```.
    /// Note that this `Initialization` is valid only to a `Variable` with no parents.
    Multinomial(&'a [f64]),

    /// User defined CPD
    Table(Factor)
}


/// Draw `size` weights in `[1, 100)`
fn random_weights(size: usize, seed: Option<u64>) -> Vec<f64> {
    let range = Uniform::new(1.0, 100.0);
    let weights: nd::Array1<f64> = match seed {
        Some(s) => nd::Array::random_using(size, range, &mut StdRng::seed_from_u64(s)),
        None => nd::Array::random(size, range)
    };
    weights.to_vec()
}


impl<'a> Initialization<'a> {

    /// Construct a CPD, initialized based on ```self```
    ///
    /// # Args
    /// * `var`: the `Variable` the distribution is over
    /// * `parents`: the `Variable`s it is conditioned on
    ///
    /// # Returns
    /// a conditional probability `Factor` with scope ```[var, parents...]```
    ///
    /// # Errors
    /// * `InfluenceError::InvalidInitialization` if a Binomial or Multinomial does not fit `var`
    ///   or `var` has parents
    /// * `InfluenceError::InvalidScope` if a user defined table is not over `var` and `parents`
    /// * `InfluenceError::NotACPD` if a user defined table is not a distribution over `var`
    pub fn build_cpd(self, var: &Variable, parents: Vec<Variable>) -> Result<Factor> {
        let mut scope = vec![var.clone()];
        scope.extend(parents.iter().cloned());

        ///////////////////////////////////////////////////////////////////////////////
        // Trivial cases

        // if this is a user defined factor, it just needs to be laid out and verified
        if let Initialization::Table(f) = self {
            let f = ops::reorder(&f, &scope)?;
            return Factor::cpd(var.clone(), parents, f.values().to_vec());
        }

        ///////////////////////////////////////////////////////////////////////////////
        // Check for errors
        match self {

            // A binomial/multinomial on a non-unit scope
            Initialization::Binomial(_) | Initialization::Multinomial(_) if ! parents.is_empty() => {
                return Err(InfluenceError::InvalidInitialization);
            },

            // A binomial distribution on a non-binary variable
            Initialization::Binomial(_) if var.cardinality() != 2 => {
                return Err(InfluenceError::InvalidInitialization);
            },

            // A multinomial distribution with an incorrect number of parameters
            Initialization::Multinomial(ps) if ps.len() != var.cardinality() => {
                return Err(InfluenceError::InvalidInitialization);
            },

            _ => ()
        }

        ///////////////////////////////////////////////////////////////////////////////
        // now, build CPD
        let size = crate::factor::table_size(&scope)?;
        let card = var.cardinality();

        let values = match self {
            Initialization::Uniform => {
                // normalizing constant is just the number of states
                vec![1. / (card as f64); size]
            },
            Initialization::Random => random_weights(size, None),
            Initialization::Seeded(seed) => random_weights(size, Some(seed)),
            Initialization::Binomial(p) => vec![p, 1.0 - p],
            Initialization::Multinomial(ps) => ps.to_vec(),
            Initialization::Table(_) => return Err(InfluenceError::InvalidInitialization)
        };

        let f = Factor::with_values(scope, Role::ConditionalProbability, values)?.normalize_conditional()?;
        Factor::cpd(var.clone(), parents, f.values().to_vec())
    }

    /// Construct a potential over `scope`, initialized based on ```self```. Generated tables are
    /// normalized to sum to one.
    ///
    /// # Errors
    /// * `InfluenceError::InvalidScope` if `scope` is empty, or a user defined table is not over
    ///   `scope`
    /// * `InfluenceError::InvalidInitialization` if a Binomial or Multinomial does not fit `scope`
    pub fn build_factor(self, scope: Vec<Variable>, role: Role) -> Result<Factor> {
        if scope.is_empty() {
            return Err(InfluenceError::InvalidScope(String::from("Empty scope")));
        }

        if let Initialization::Table(f) = self {
            return Ok(ops::reorder(&f, &scope)?.with_role(role));
        }

        match self {
            Initialization::Binomial(_) | Initialization::Multinomial(_) if scope.len() != 1 => {
                return Err(InfluenceError::InvalidInitialization);
            },
            Initialization::Binomial(_) if scope[0].cardinality() != 2 => {
                return Err(InfluenceError::InvalidInitialization);
            },
            Initialization::Multinomial(ps) if ps.len() != scope[0].cardinality() => {
                return Err(InfluenceError::InvalidInitialization);
            },
            _ => ()
        }

        let size = crate::factor::table_size(&scope)?;
        let values = match self {
            Initialization::Uniform => vec![1. / (size as f64); size],
            Initialization::Random => random_weights(size, None),
            Initialization::Seeded(seed) => random_weights(size, Some(seed)),
            Initialization::Binomial(p) => vec![p, 1.0 - p],
            Initialization::Multinomial(ps) => ps.to_vec(),
            Initialization::Table(_) => return Err(InfluenceError::InvalidInitialization)
        };

        let f = Factor::with_values(scope, role, values)?.normalize()?;
        Ok(f.with_role(role))
    }
}
