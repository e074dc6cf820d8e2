//! Per-cell side channels carried alongside a `Factor`'s values.
//!
//! A `Strategy` records which decision alternatives produced a utility value, so that the
//! optimal strategy can be read back once every variable has been eliminated. An
//! `UncertainValue` describes the second-order distribution of a parameter for sensitivity
//! analysis; it only travels with the cell it describes.

use crate::variable::Variable;

/// Whether an `Intervention` branches on a choice or on an observed outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterventionKind {
    Decision,
    Observation
}


/// One arm of an `Intervention`: the states of the variable sharing the same follow-up.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    states: Vec<usize>,
    then: Strategy
}

impl Branch {

    /// The state indices covered by this branch, in ascending order
    pub fn states(&self) -> &[usize] {
        &self.states
    }

    /// What follows once one of `states` is chosen or observed
    pub fn then(&self) -> &Strategy {
        &self.then
    }

}


/// A node of a strategy tree.
///
/// For a decision, the branches are the optimal alternatives (more than one state means the
/// alternatives are tied). For an observation, the branches partition the outcomes by the
/// plan that follows them.
#[derive(Clone, Debug, PartialEq)]
pub struct Intervention {
    variable: Variable,
    kind: InterventionKind,
    branches: Vec<Branch>
}

impl Intervention {

    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    pub fn kind(&self) -> InterventionKind {
        self.kind
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// All states of the variable mentioned by any branch
    pub fn states(&self) -> Vec<usize> {
        let mut states: Vec<usize> = self.branches.iter().flat_map(|b| b.states.iter().cloned()).collect();
        states.sort();
        states
    }

}


/// A sequence of `Intervention`s. Utilities that are added together concatenate their
/// strategies; the empty strategy means no decision contributed to the value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Strategy {
    interventions: Vec<Intervention>
}

impl Strategy {

    /// The empty `Strategy`
    pub fn empty() -> Strategy {
        Strategy { interventions: Vec::new() }
    }

    /// A `Strategy` consisting of a single `Intervention`
    pub fn single(intervention: Intervention) -> Strategy {
        Strategy { interventions: vec![intervention] }
    }

    pub fn is_empty(&self) -> bool {
        self.interventions.is_empty()
    }

    pub fn interventions(&self) -> &[Intervention] {
        &self.interventions
    }

    /// Concatenate two strategies. Neither side is dropped.
    pub fn concat(&self, other: &Strategy) -> Strategy {
        let mut interventions = self.interventions.clone();
        interventions.extend(other.interventions.iter().cloned());
        Strategy { interventions }
    }

    /// Merge the strategies that follow each of `options` (pairs of state index and strategy)
    /// for `variable`.
    ///
    /// States with equal follow-up strategies share one branch. An observation whose outcomes
    /// all lead to the same plan does not change the plan and collapses to that plan; a decision
    /// always yields an `Intervention`, since the choice itself is part of the strategy.
    pub fn merge(variable: &Variable, kind: InterventionKind, options: &[(usize, &Strategy)]) -> Strategy {
        let mut branches: Vec<Branch> = Vec::new();

        for &(state, strategy) in options.iter() {
            match branches.iter_mut().find(|b| b.then == *strategy) {
                Some(branch) => branch.states.push(state),
                None => branches.push(Branch { states: vec![state], then: strategy.clone() })
            }
        }

        for branch in branches.iter_mut() {
            branch.states.sort();
        }

        if kind == InterventionKind::Observation && branches.len() <= 1 {
            return branches.pop().map(|b| b.then).unwrap_or_default();
        }

        Strategy::single(Intervention { variable: variable.clone(), kind, branches })
    }

    /// The decision variables mentioned anywhere in the tree, in order of first appearance
    pub fn decisions(&self) -> Vec<Variable> {
        let mut out: Vec<Variable> = Vec::new();
        self.collect_decisions(&mut out);
        out
    }

    fn collect_decisions(&self, out: &mut Vec<Variable>) {
        for intervention in self.interventions.iter() {
            if intervention.kind == InterventionKind::Decision && ! out.contains(&intervention.variable) {
                out.push(intervention.variable.clone());
            }
            for branch in intervention.branches.iter() {
                branch.then.collect_decisions(out);
            }
        }
    }

}


/// Distributional metadata attached to a single cell of a table.
#[derive(Clone, Debug, PartialEq)]
pub struct UncertainValue {

    /// Name of the second-order distribution, e.g. `"Beta"` or `"Dirichlet"`
    pub distribution: String,

    /// The parameters of the distribution
    pub parameters: Vec<f64>,

    /// Optional label shared by cells that are sampled jointly
    pub name: Option<String>

}

impl UncertainValue {

    pub fn new(distribution: &str, parameters: Vec<f64>) -> UncertainValue {
        UncertainValue {
            distribution: String::from(distribution),
            parameters,
            name: None
        }
    }

}
