//! The two elimination steps of variable elimination over an influence diagram.
//!
//! Probability potentials and utility potentials are kept apart: eliminating a chance variable
//! marginalizes the probabilities and replaces each utility by its conditional expectation,
//! while eliminating a decision maximizes the expected utility and yields the optimal policy.

use crate::config::EliminationConfig;
use crate::factor::ops;
use crate::factor::{Criterion, Factor, Role};
use crate::util::{InfluenceError, Result};
use crate::variable::Variable;

use indexmap::IndexMap;


/// The potentials that replace the inputs of an elimination step
#[derive(Clone, Debug, Default)]
pub struct Eliminated {

    /// The remaining probability potential. `None` stands for the constant `1`.
    pub probability: Option<Factor>,

    /// The remaining utility potentials, at most one per criterion
    pub utilities: Vec<Factor>,

    /// The optimal policy of an eliminated decision
    pub policy: Option<Factor>

}

impl Eliminated {

    /// Every output potential, the policy excluded
    pub fn into_factors(self) -> Vec<Factor> {
        self.probability.into_iter().chain(self.utilities.into_iter()).collect()
    }

}


/// Eliminate the chance variable `variable` from `factors`.
///
/// The probability potentials are multiplied and summed over `variable`. Each utility potential
/// is replaced by its expectation over `variable` given the rest of the scope; expectations that
/// share a criterion are added together, and one that carries no interventions and is zero
/// everywhere is dropped.
///
/// # Errors
/// * `InfluenceError::UnsupportedOperand` if `variable` is not discrete
pub fn sum_out_variable(variable: &Variable, factors: &[&Factor], config: &EliminationConfig) -> Result<Eliminated> {
    ops::check_discrete(&[variable.clone()])?;

    let (probabilities, utilities): (Vec<&Factor>, Vec<&Factor>) = factors.iter()
                                                                          .cloned()
                                                                          .partition(|f| f.role().is_probability());

    let keep: Vec<Variable> = ops::union_scope(probabilities.iter().cloned())
        .into_iter()
        .filter(|v| v != variable)
        .collect();
    let marginal = ops::multiply_and_marginalize(probabilities.iter().cloned(), &keep, &[variable.clone()])?;

    let mut out = Eliminated::default();

    if ! utilities.is_empty() {
        let joint = ops::multiply(probabilities.iter().cloned());
        let conditional = ops::divide(&joint, &marginal);

        let mut by_criterion: IndexMap<Option<Criterion>, Vec<Factor>> = IndexMap::new();
        for u in utilities.iter() {
            let eu = ops::expectation(&conditional, u, variable)?;
            by_criterion.entry(eu.criterion().cloned()).or_insert_with(Vec::new).push(eu);
        }

        for (_, group) in by_criterion.into_iter() {
            let total = ops::sum(group.iter());
            if total.has_interventions() || ! total.is_zero(config.max_round_error) {
                out.utilities.push(total);
            }
        }
    }

    // the trivial marginal of a normalized distribution carries no information
    let trivial = marginal.scalar().map_or(false, |p| ops::is_tied(1.0, p, config.max_round_error));
    if ! trivial {
        out.probability = Some(marginal.with_role(Role::JointProbability));
    }

    tracing::debug!(
        variable = %variable,
        probabilities = probabilities.len(),
        utilities = utilities.len(),
        outputs = out.utilities.len() + out.probability.iter().count(),
        "summed out variable"
    );

    Ok(out)
}


/// Eliminate the decision `decision`, choosing its states to maximize expected utility.
///
/// The utilities are added together and weighted by `probability` (the constant `1` if absent)
/// before maximizing over `decision`. Every state whose value is within the relative
/// `config.max_round_error` of the maximum is optimal, and the policy spreads uniformly over
/// them. The annotation of each result cell merges the annotations of its optimal states.
///
/// The resulting utility is the expected utility of following the policy. It is replaced by the
/// constant zero tagged with `criterion` when it carries no interventions and is zero
/// everywhere.
///
/// # Errors
/// * `InfluenceError::UnsupportedOperand` if `decision` is not discrete
/// * `InfluenceError::InvalidScope` if `decision` has no states
pub fn max_out_variable(
    decision: &Variable,
    probability: Option<&Factor>,
    utilities: &[&Factor],
    criterion: Option<Criterion>,
    config: &EliminationConfig
) -> Result<Eliminated> {
    ops::check_discrete(&[decision.clone()])?;
    if decision.cardinality() == 0 {
        return Err(InfluenceError::InvalidScope(format!("{} has no states", decision)));
    }

    let utility = ops::sum(utilities.iter().cloned()).with_role(Role::Utility);
    let identity = Factor::identity();
    let weight = probability.unwrap_or(&identity);

    let operands = [&utility, weight];
    let keep: Vec<Variable> = ops::union_scope(operands.iter().cloned())
        .into_iter()
        .filter(|v| v != decision)
        .collect();

    let max = ops::max_product(&operands, &keep, decision, config.max_round_error, config.record_strategy);
    let policy = max.policy();
    let maxed = max.value_factor();

    let (probability, expected) = match probability {
        Some(p) => {
            let keep_p: Vec<Variable> = ops::union_scope(vec![p, &policy])
                .into_iter()
                .filter(|v| v != decision)
                .collect();
            let optimal = ops::multiply_and_marginalize(vec![p, &policy], &keep_p, &[decision.clone()])?;
            let expected = ops::divide(&maxed, &optimal);
            (Some(optimal), expected)
        },
        None => (None, maxed)
    };

    let utility = if ! expected.has_interventions() && expected.is_zero(config.max_round_error) {
        Factor::constant(0.0, Role::Utility).with_criterion(criterion)
    } else {
        let tag = expected.criterion().cloned().or(criterion);
        expected.with_criterion(tag)
    };

    tracing::debug!(
        decision = %decision,
        utilities = utilities.len(),
        weighted = probability.is_some(),
        "maxed out decision"
    );

    Ok(Eliminated {
        probability,
        utilities: vec![utility],
        policy: Some(policy)
    })
}
