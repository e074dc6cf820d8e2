//! Defines a `ConditionalInferenceEngine` that uses exact inference by variable elimination to
//! answer conditional inference queries, and evaluates influence diagrams by the same means.
//!
//! Implementation of Koller & Friedman Algorithm 9.1 - Sum-Product-VE, with utilities carried
//! alongside the probabilities and decisions eliminated by maximization.

use super::combinators::{max_out_variable, sum_out_variable, Eliminated};
use super::heuristic::{EliminationHeuristic, MinimalCliqueSize};
use super::ConditionalInferenceEngine;
use crate::config::EliminationConfig;
use crate::factor::ops;
use crate::factor::{Criterion, Factor, Strategy};
use crate::model::{Network, NodeKind};
use crate::util::{InfluenceError, Result};
use crate::variable::{Assignment, Variable};

use indexmap::{IndexMap, IndexSet};

use std::collections::HashSet;


/// The result of evaluating an influence diagram
#[derive(Clone, Debug)]
pub struct Evaluation {

    /// The maximum expected utility given the evidence, for each criterion
    pub expected_utility: IndexMap<Option<Criterion>, f64>,

    /// The probability of the evidence under the optimal policies
    pub probability_of_evidence: f64,

    /// The optimal policy of each decision, in elimination order
    pub policies: IndexMap<Variable, Factor>,

    /// The optimal strategy, when strategies were recorded
    pub strategy: Option<Strategy>

}

impl Evaluation {

    /// The expected utility added up over every criterion
    pub fn total_utility(&self) -> f64 {
        self.expected_utility.values().sum()
    }

}


pub struct VariableEliminationEngine {

    /// the `Network` (a 'bag of factors'), conditioned on the provided evidence, to use for the
    /// inference task
    network: Network,

    /// the observed states the `network` was conditioned on
    evidence: Assignment,

    config: EliminationConfig

}


impl VariableEliminationEngine {

    /// # Errors
    /// * `InfluenceError::InvalidScope` if an observed state is out of range
    pub fn new(network: &Network, evidence: &Assignment) -> Result<Self> {
        VariableEliminationEngine::with_config(network, evidence, EliminationConfig::default())
    }

    /// # Errors
    /// * `InfluenceError::InvalidConfig` if `config` does not validate
    /// * `InfluenceError::InvalidScope` if an observed state is out of range
    pub fn with_config(network: &Network, evidence: &Assignment, config: EliminationConfig) -> Result<Self> {
        Ok(VariableEliminationEngine {
            network: network.condition(evidence)?,
            evidence: evidence.clone(),
            config: config.validate()?
        })
    }

    /// The conditioned `Network`
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Evaluate the influence diagram, eliminating the variables tier by tier.
    ///
    /// Within a tier, the order is chosen by the `MinimalCliqueSize` heuristic. Chance variables
    /// are summed out and decisions maxed out; the variables of the `Network` left out of
    /// `tiers` are eliminated in a final tier. A decision must be eliminated before any
    /// variable observed when it is made, which is what the tiers express. Observed variables
    /// may be listed and are skipped.
    ///
    /// # Errors
    /// * `InfluenceError::MissingVariable` if a tier names a `Variable` foreign to the `Network`
    /// * the errors of the combinators
    pub fn evaluate(&self, tiers: &[Vec<Variable>]) -> Result<Evaluation> {
        let mut factors: Vec<Factor> = self.network.factors().to_vec();

        let mut ordered: Vec<Vec<Variable>> = Vec::with_capacity(tiers.len() + 1);
        let mut seen: IndexSet<Variable> = IndexSet::new();
        for tier in tiers.iter() {
            if tier.iter().any(|v| ! self.network.contains(v) && ! self.evidence.contains(v)) {
                return Err(InfluenceError::MissingVariable);
            }

            // observed variables are already reduced out of every potential
            ordered.push(tier.iter()
                             .filter(|v| ! self.evidence.contains(v))
                             .filter(|v| seen.insert((*v).clone()))
                             .cloned()
                             .collect());
        }

        let rest: Vec<Variable> = ops::union_scope(factors.iter())
            .into_iter()
            .chain(self.network.variables().into_iter())
            .filter(|v| ! seen.contains(v))
            .collect::<IndexSet<Variable>>()
            .into_iter()
            .collect();
        ordered.push(rest);

        tracing::debug!(tiers = ordered.len(), factors = factors.len(), "evaluating influence diagram");

        let mut heuristic = MinimalCliqueSize::new(factors.iter(), ordered);
        let mut policies = IndexMap::new();

        while let Some(var) = heuristic.next_variable() {
            let (touching, rest): (Vec<Factor>, Vec<Factor>) = factors.into_iter()
                                                                      .partition(|f| f.contains(&var));
            factors = rest;

            let operands: Vec<&Factor> = touching.iter().collect();
            let out = match self.network.kind(&var) {
                Some(NodeKind::Decision) => {
                    let (probabilities, utilities): (Vec<&Factor>, Vec<&Factor>) = operands.into_iter()
                        .partition(|f| f.role().is_probability());

                    let probability = if probabilities.is_empty() {
                        None
                    } else {
                        Some(ops::multiply(probabilities))
                    };
                    let criterion = utilities.iter().filter_map(|u| u.criterion()).next().cloned();

                    max_out_variable(&var, probability.as_ref(), &utilities, criterion, &self.config)?
                },
                _ => sum_out_variable(&var, &operands, &self.config)?
            };

            let Eliminated { probability, utilities, policy } = out;
            if let Some(policy) = policy {
                policies.insert(var.clone(), policy);
            }
            factors.extend(probability.into_iter());
            factors.extend(utilities.into_iter());

            heuristic.variable_eliminated(&var);
        }

        // only constants remain
        let mut expected_utility = IndexMap::new();
        let mut probability_of_evidence = 1.0;
        let mut strategy: Option<Strategy> = None;

        for f in factors.iter() {
            let value = f.values().iter().sum::<f64>();
            if f.role().is_utility() {
                *expected_utility.entry(f.criterion().cloned()).or_insert(0.0) += value;
                if let Some(s) = f.strategies() {
                    let s = s.iter().fold(Strategy::empty(), |acc, s| acc.concat(s));
                    strategy = Some(match strategy {
                        Some(prev) => prev.concat(&s),
                        None => s
                    });
                }
            } else {
                probability_of_evidence *= value;
            }
        }

        tracing::debug!(
            probability_of_evidence,
            decisions = policies.len(),
            "evaluated influence diagram"
        );

        Ok(Evaluation { expected_utility, probability_of_evidence, policies, strategy })
    }

}


impl ConditionalInferenceEngine for VariableEliminationEngine {

    fn infer(&mut self, variables: &HashSet<Variable>) -> Result<Factor> {
        // check input arguments
        if variables.iter().any(|v| ! self.network.contains(v)) {
            // a variable requested is not found in the (reduced) network
            return Err(InfluenceError::MissingVariable);
        }

        let mut phis: Vec<Factor> = self.network.probability_factors().cloned().collect();

        // we are computing P(variables | e), so do not eliminate the variables
        let eliminate: Vec<Variable> = ops::union_scope(phis.iter())
            .into_iter()
            .filter(|v| ! variables.contains(v))
            .collect();

        let mut heuristic = MinimalCliqueSize::new(phis.iter(), vec![eliminate]);

        while let Some(var) = heuristic.next_variable() {
            let (touching, rest): (Vec<Factor>, Vec<Factor>) = phis.into_iter()
                                                                   .partition(|f| f.contains(&var));

            let operands: Vec<&Factor> = touching.iter().collect();
            let tau = sum_out_variable(&var, &operands, &self.config)?;

            phis = rest;
            phis.extend(tau.into_factors());

            heuristic.variable_eliminated(&var);
        }

        // multiply together remaining phis
        let phi_star = ops::multiply(phis.iter());

        // now we have an unnormalized distribution. We need the partition function to return a
        // conditional probability.
        tracing::debug!(query = variables.len(), scope = phi_star.scope().len(), "inferred posterior");
        phi_star.normalize()
    }

}
