//! Defines a `Network`, an influence diagram (or a plain Bayesian network when it holds no
//! decisions or utilities) represented as a bag of `Factor`s.
//!
//! # Representation
//! The graph is not stored explicitly. The conditional probability table of each chance
//! variable has scope ```X U Pa(X)```, which implicitly defines the edges ```P -> X```. Decisions
//! carry no table; their informational predecessors are expressed by the elimination order the
//! caller chooses. Utilities are `Factor`s with the `Utility` role.

use crate::factor::{Criterion, Factor, Role};
use crate::init::Initialization;
use crate::util::{InfluenceError, Result};
use crate::variable::{Assignment, Variable};

use bidir_map::BidirMap;
use indexmap::IndexMap;


/// The kind of a `Variable` in a `Network`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {

    /// A random variable with a conditional probability table
    Chance,

    /// A variable whose state is chosen by the decision maker
    Decision

}


pub struct Network {

    /// The `Variable`s of the `Network`, in the order they were declared
    kinds: IndexMap<Variable, NodeKind>,

    /// The user-defined names of each `Variable`. This is a two way lookup ```(`Variable`->Name)```
    /// and ```(Name->`Variable`)```
    names: BidirMap<Variable, String>,

    /// Probability and utility potentials
    factors: Vec<Factor>

}

impl Network {

    /// Lookup a `Variable` in the `Network` based on the name
    pub fn lookup_variable(&self, name: &str) -> Option<&Variable> {
        self.names.get_by_second(&String::from(name))
    }

    /// Lookup a `Variable`'s name in the `Network`.
    pub fn lookup_name(&self, var: &Variable) -> Option<&String> {
        self.names.get_by_first(var)
    }

    /// Get all `Variable`s in the `Network`, in declaration order
    pub fn variables(&self) -> Vec<Variable> {
        self.kinds.keys().cloned().collect()
    }

    pub fn num_variables(&self) -> usize {
        self.kinds.len()
    }

    pub fn contains(&self, var: &Variable) -> bool {
        self.kinds.contains_key(var)
    }

    /// The kind of `var`, if it belongs to the `Network`
    pub fn kind(&self, var: &Variable) -> Option<NodeKind> {
        self.kinds.get(var).cloned()
    }

    /// The decision `Variable`s, in declaration order
    pub fn decisions(&self) -> Vec<Variable> {
        self.kinds.iter()
                  .filter(|(_, k)| **k == NodeKind::Decision)
                  .map(|(v, _)| v.clone())
                  .collect()
    }

    /// Every potential of the `Network`
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn probability_factors(&self) -> impl Iterator<Item = &Factor> {
        self.factors.iter().filter(|f| f.role().is_probability())
    }

    pub fn utility_factors(&self) -> impl Iterator<Item = &Factor> {
        self.factors.iter().filter(|f| f.role().is_utility())
    }

    /// Condition the `Network` given the evidence.
    ///
    /// # Args
    /// * `evidence`: a partial `Assignment` of the `Variable`s in this `Network`.
    ///
    /// # Returns:
    /// a new `Network` over ```self.variables() - evidence.keys()``` whose potentials are reduced
    /// to the observed states
    ///
    /// # Errors
    /// * `InfluenceError::InvalidScope` if an observed state is out of range for its `Variable`
    pub fn condition(&self, evidence: &Assignment) -> Result<Network> {
        if let Some((v, _)) = evidence.iter().find(|(v, s)| self.kinds.contains_key(*v) && **s >= v.cardinality()) {
            return Err(InfluenceError::InvalidScope(format!("State out of range for {}", v)));
        }

        let factors = self.factors.iter().map(|f| f.reduce(evidence)).collect::<Result<Vec<Factor>>>()?;

        let kinds = self.kinds.iter()
                              .filter(|(v, _)| ! evidence.contains(v))
                              .map(|(v, &k)| (v.clone(), k))
                              .collect();

        let names = self.names.iter()
                              .filter(|(v, _)| ! evidence.contains(v))
                              .map(|(v, n)| (v.clone(), n.clone()))
                              .collect();

        Ok(Network { kinds, names, factors })
    }

    /// Determine the probability of a full `Assignment` to the chance `Variable`s, given the
    /// decisions it assigns.
    ///
    /// # Errors
    /// * `InfluenceError::IncompleteAssignment` if a `Variable` of a probability potential is
    ///   unassigned
    pub fn probability(&self, assignment: &Assignment) -> Result<f64> {
        self.probability_factors()
            .map(|f| f.value(assignment))
            .fold(Ok(1.0), |acc, val| acc.and_then(|p| val.map(|v| p * v)))
    }

    /// The utility of a full `Assignment` for each criterion
    ///
    /// # Errors
    /// * `InfluenceError::IncompleteAssignment` if a `Variable` of a utility is unassigned
    pub fn utility(&self, assignment: &Assignment) -> Result<IndexMap<Option<Criterion>, f64>> {
        let mut totals = IndexMap::new();
        for f in self.utility_factors() {
            *totals.entry(f.criterion().cloned()).or_insert(0.0) += f.value(assignment)?;
        }
        Ok(totals)
    }

}


/// An implementation of the [builder pattern] for creating a `Network`.
///
/// [builder pattern]: https://en.wikipedia.org/wiki/Builder_pattern
pub struct NetworkBuilder {

    kinds: IndexMap<Variable, NodeKind>,

    /// The name <-> variable mapping
    names: BidirMap<Variable, String>,

    factors: Vec<Factor>,

    /// The error state of the builder, if any
    err: Option<InfluenceError>

}

impl Default for NetworkBuilder {
    fn default() -> Self {
        NetworkBuilder::new()
    }
}

impl NetworkBuilder {

    /// Construct a new `NetworkBuilder`
    pub fn new() -> NetworkBuilder {
        NetworkBuilder {
            kinds: IndexMap::new(),
            names: BidirMap::new(),
            factors: Vec::new(),
            err: None
        }
    }

    /// Add a chance `Variable` with the given parents. The parents must already be declared.
    pub fn with_chance(mut self, var: &Variable, parents: Vec<Variable>, init: Initialization) -> Self {
        if self.err.is_some() {
            return self;
        }

        if parents.iter().any(|p| ! self.kinds.contains_key(p)) {
            self.err = Some(InfluenceError::MissingVariable);
            return self;
        }

        match init.build_cpd(var, parents) {
            Ok(cpd) => {
                self.declare(var, NodeKind::Chance);
                self.factors.push(cpd);
            },
            Err(e) => self.err = Some(e)
        };

        self
    }

    /// Add a decision `Variable`
    pub fn with_decision(mut self, var: &Variable) -> Self {
        if self.err.is_some() {
            return self;
        }

        if ! var.is_discrete() {
            self.err = Some(InfluenceError::UnsupportedOperand(format!("{} has a continuous domain", var)));
            return self;
        }

        self.declare(var, NodeKind::Decision);
        self
    }

    /// Add a utility over already declared `Variable`s
    pub fn with_utility(mut self, scope: Vec<Variable>, values: Vec<f64>, criterion: Option<&str>) -> Self {
        if self.err.is_some() {
            return self;
        }

        match Factor::with_values(scope, Role::Utility, values) {
            Ok(f) => self.factors.push(f.with_criterion(criterion.map(Criterion::new))),
            Err(e) => self.err = Some(e)
        };

        self
    }

    /// Add an arbitrary potential over already declared `Variable`s, e.g. a policy or a factor
    /// computed elsewhere
    pub fn with_factor(mut self, factor: Factor) -> Self {
        if self.err.is_none() {
            self.factors.push(factor);
        }
        self
    }

    /// Declare the name for a `Variable` in this `Network`.
    ///
    /// This is optional; `Variable`s without a declared name are named after their own name, or
    /// a default one.
    pub fn with_named_variable(mut self, var: &Variable, name: &str) -> Self {
        if self.err.is_some() {
            return self;
        }

        if self.names.contains_second_key(&String::from(name)) {
            self.err = Some(InfluenceError::DuplicateVariable);
        } else {
            self.names.insert(var.clone(), String::from(name));
        }

        self
    }

    fn declare(&mut self, var: &Variable, kind: NodeKind) {
        if self.kinds.contains_key(var) {
            self.err = Some(InfluenceError::DuplicateVariable);
        } else {
            self.kinds.insert(var.clone(), kind);
        }
    }

    /// Build the `Network`, ensuring consistency of the `Factor`s and `Variable`s
    ///
    /// # Errors
    /// * the first error encountered while building
    /// * `InfluenceError::MissingVariable` if a potential or a name refers to an undeclared
    ///   `Variable`
    /// * `InfluenceError::DuplicateVariable` if two `Variable`s end up with the same name
    pub fn build(mut self) -> Result<Network> {
        if let Some(e) = self.err {
            return Err(e);
        }

        for f in self.factors.iter() {
            if f.scope().iter().any(|v| ! self.kinds.contains_key(v)) {
                return Err(InfluenceError::MissingVariable);
            }
        }

        if self.names.first_col().any(|v| ! self.kinds.contains_key(v)) {
            return Err(InfluenceError::MissingVariable);
        }

        // for any unnamed variable, give it a name
        for v in self.kinds.keys() {
            if ! self.names.contains_first_key(v) {
                let name = v.to_string();
                if self.names.contains_second_key(&name) {
                    return Err(InfluenceError::DuplicateVariable);
                }
                self.names.insert(v.clone(), name);
            }
        }

        Ok(Network {
            kinds: self.kinds,
            names: self.names,
            factors: self.factors
        })
    }

}
