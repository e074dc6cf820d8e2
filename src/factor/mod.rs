//! Definition of the factor module
//!
//! A `Factor` is a dense table of values indexed by the configurations of an ordered scope of
//! discrete `Variable`s. The first `Variable` of the scope varies fastest: the value for the
//! configuration `(x_0, ..., x_n)` is stored at `sum_i x_i * offset_i`, where `offset_0 = 1` and
//! `offset_i = offset_{i-1} * |x_{i-1}|`.
//!
//! All algebra over `Factor`s lives in the `ops` module and always returns new `Factor`s; the
//! operands are never modified.

pub mod annotation;
pub(crate) mod iter;
pub mod ops;

pub use self::annotation::{Branch, Intervention, InterventionKind, Strategy, UncertainValue};

use crate::util::{InfluenceError, Result};
use crate::variable::{Assignment, Variable};

use itertools::Itertools;
use ndarray::prelude as nd;
use ndarray::Dimension;

use std::fmt;
use std::sync::Arc;

/// Alias f64 ndarray::Array as Table
pub type Table = nd::ArrayD<f64>;

/// Tolerance used to verify that a table describes a conditional probability distribution
const CPD_TOLERANCE: f64 = 0.001;


/// What the values of a `Factor` measure. Determines how `Factor`s combine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {

    /// A conditional probability distribution, `P(X | Pa(X))`
    ConditionalProbability,

    /// A joint probability (or an unnormalized potential over several variables)
    JointProbability,

    /// An additive utility. Utilities combine by addition and may be negative.
    Utility

}

impl Role {

    pub fn is_probability(self) -> bool {
        self != Role::Utility
    }

    pub fn is_utility(self) -> bool {
        self == Role::Utility
    }

}

impl Default for Role {
    fn default() -> Role {
        Role::ConditionalProbability
    }
}


/// An opaque tag naming the decision criterion (e.g. cost or effectiveness) a utility measures.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Criterion(Arc<str>);

impl Criterion {

    pub fn new(name: &str) -> Criterion {
        Criterion(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}


/// A table over a scope of discrete `Variable`s, with optional per-cell annotations.
#[derive(Clone, Debug, PartialEq)]
pub struct Factor {

    /// The scope of the `Factor`. The order defines the layout of `values`.
    scope: Vec<Variable>,

    /// The values of the table, first scope variable fastest
    values: Vec<f64>,

    role: Role,

    criterion: Option<Criterion>,

    /// Which interventions produced each value. Parallel to `values` when present.
    strategies: Option<Vec<Strategy>>,

    /// Second-order uncertainty of each value. Parallel to `values` when present.
    uncertain: Option<Vec<Option<UncertainValue>>>

}


/// Verify a scope is usable for a `Factor` and compute the size of its table
pub(crate) fn table_size(scope: &[Variable]) -> Result<usize> {
    if let Some(v) = scope.iter().find(|v| ! v.is_discrete()) {
        return Err(InfluenceError::UnsupportedOperand(format!("{} has a continuous domain", v)));
    }

    if scope.iter().unique().count() != scope.len() {
        return Err(InfluenceError::DuplicateVariable);
    }

    Ok(scope.iter().map(|v| v.cardinality()).product())
}


impl Factor {

    /// Create a new zero-filled `Factor`
    ///
    /// # Errors
    /// * `InfluenceError::UnsupportedOperand` if a `Variable` in scope is not discrete
    /// * `InfluenceError::DuplicateVariable` if a `Variable` appears in scope twice
    pub fn new(scope: Vec<Variable>, role: Role) -> Result<Factor> {
        let size = table_size(&scope)?;
        Ok(Factor::assemble(scope, vec![0.0; size], role))
    }

    /// Create a new `Factor` with the given values
    ///
    /// # Errors
    /// * `InfluenceError::InvalidLength` if `values` does not have one entry per configuration
    /// * the errors of `Factor::new`
    pub fn with_values(scope: Vec<Variable>, role: Role, values: Vec<f64>) -> Result<Factor> {
        let size = table_size(&scope)?;
        if size != values.len() {
            return Err(InfluenceError::InvalidLength { expected: size, actual: values.len() });
        }

        Ok(Factor::assemble(scope, values, role))
    }

    /// Create a `Factor` from a row-major `Table` whose axes follow `scope`
    ///
    /// # Errors
    /// * `InfluenceError::InvalidScope` if the shape of the table does not match the scope
    pub fn from_table(scope: Vec<Variable>, role: Role, table: Table) -> Result<Factor> {
        table_size(&scope)?;

        if scope.len() != table.ndim() {
            return Err(InfluenceError::InvalidScope(
                String::from("Cardinality of scope must match number of table dimensions")
            ));
        }

        for (v, t) in scope.iter().map(|v| v.cardinality()).zip(table.shape().iter()) {
            if v != *t {
                return Err(InfluenceError::InvalidScope(String::from("Dimensions do not match")));
            }
        }

        // iterating the transposed view visits the first axis fastest
        let values = table.t().iter().cloned().collect();
        Ok(Factor::assemble(scope, values, role))
    }

    /// Create a conditional probability distribution `P(var | parents)`. The scope is
    /// `[var, parents...]`, so each consecutive block of `|var|` values must sum to one.
    ///
    /// # Errors
    /// * `InfluenceError::NotACPD` if a block does not sum to one or a value is negative
    pub fn cpd(var: Variable, parents: Vec<Variable>, values: Vec<f64>) -> Result<Factor> {
        let mut scope = vec![var];
        scope.extend(parents);

        let factor = Factor::with_values(scope, Role::ConditionalProbability, values)?;
        let card = factor.scope[0].cardinality();

        if factor.values.iter().any(|&v| v < 0.0) {
            return Err(InfluenceError::NotACPD);
        }

        if card > 0 && factor.values.chunks(card).any(|block| (block.iter().sum::<f64>() - 1.0).abs() > CPD_TOLERANCE) {
            return Err(InfluenceError::NotACPD);
        }

        Ok(factor)
    }

    /// A `Factor` with empty scope and a single value
    pub fn constant(value: f64, role: Role) -> Factor {
        Factor::assemble(Vec::new(), vec![value], role)
    }

    /// The multiplicative identity: the constant probability `1`
    pub fn identity() -> Factor {
        Factor::constant(1.0, Role::ConditionalProbability)
    }

    pub(crate) fn assemble(scope: Vec<Variable>, values: Vec<f64>, role: Role) -> Factor {
        Factor {
            scope,
            values,
            role,
            criterion: None,
            strategies: None,
            uncertain: None
        }
    }

    /// Tag the `Factor` with a decision criterion
    pub fn with_criterion(mut self, criterion: Option<Criterion>) -> Factor {
        self.criterion = criterion;
        self
    }

    /// Change the role of the `Factor`
    pub fn with_role(mut self, role: Role) -> Factor {
        self.role = role;
        self
    }

    /// Attach a strategy annotation to every cell
    ///
    /// # Errors
    /// * `InfluenceError::InvalidLength` unless there is exactly one `Strategy` per value
    pub fn with_strategies(mut self, strategies: Vec<Strategy>) -> Result<Factor> {
        if strategies.len() != self.values.len() {
            return Err(InfluenceError::InvalidLength { expected: self.values.len(), actual: strategies.len() });
        }
        self.strategies = Some(strategies);
        Ok(self)
    }

    /// Attach uncertainty annotations to every cell
    ///
    /// # Errors
    /// * `InfluenceError::InvalidLength` unless there is exactly one entry per value
    pub fn with_uncertain_values(mut self, uncertain: Vec<Option<UncertainValue>>) -> Result<Factor> {
        if uncertain.len() != self.values.len() {
            return Err(InfluenceError::InvalidLength { expected: self.values.len(), actual: uncertain.len() });
        }
        self.uncertain = Some(uncertain);
        Ok(self)
    }

    /// Retrieve the scope of the `Factor`.
    pub fn scope(&self) -> &[Variable] {
        &self.scope
    }

    /// The flat table of values, first scope variable fastest
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn criterion(&self) -> Option<&Criterion> {
        self.criterion.as_ref()
    }

    pub fn strategies(&self) -> Option<&[Strategy]> {
        self.strategies.as_ref().map(|s| s.as_slice())
    }

    pub fn uncertain_values(&self) -> Option<&[Option<UncertainValue>]> {
        self.uncertain.as_ref().map(|u| u.as_slice())
    }

    /// The number of cells in the table
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the `Factor` has an empty scope
    pub fn is_constant(&self) -> bool {
        self.scope.is_empty()
    }

    /// The value of a constant `Factor`
    pub fn scalar(&self) -> Option<f64> {
        if self.is_constant() {
            Some(self.values[0])
        } else {
            None
        }
    }

    /// Check if any cell carries a non-empty strategy
    pub fn has_interventions(&self) -> bool {
        self.strategies.as_ref().map_or(false, |s| s.iter().any(|s| ! s.is_empty()))
    }

    /// Check if every value is within `tolerance` of zero
    pub fn is_zero(&self, tolerance: f64) -> bool {
        self.values.iter().all(|v| v.abs() <= tolerance)
    }

    pub fn contains(&self, var: &Variable) -> bool {
        self.scope.contains(var)
    }

    /// The state counts of the scope, in scope order
    pub fn dimensions(&self) -> Vec<usize> {
        self.scope.iter().map(|v| v.cardinality()).collect()
    }

    /// The stride of each scope position in `values`
    pub fn offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.scope.len());
        let mut stride = 1;
        for v in self.scope.iter() {
            offsets.push(stride);
            stride *= v.cardinality();
        }
        offsets
    }

    /// The stride of `var` in this `Factor`'s table, or zero if `var` is not in scope
    pub fn offset_of(&self, var: &Variable) -> usize {
        let mut stride = 1;
        for v in self.scope.iter() {
            if v == var {
                return stride;
            }
            stride *= v.cardinality();
        }
        0
    }

    /// Map a full configuration of the scope (one state index per scope variable, in scope
    /// order) to its index in `values`
    pub fn position(&self, configuration: &[usize]) -> usize {
        debug_assert_eq!(configuration.len(), self.scope.len());
        configuration.iter().zip(self.offsets().iter()).map(|(c, o)| c * o).sum()
    }

    /// For each `Variable` of `target`, the change of index into this `Factor`'s `values` when
    /// that variable's coordinate is incremented by one and every earlier coordinate of `target`
    /// wraps back to zero. Variables not in this `Factor`'s scope move nothing themselves.
    ///
    /// Walking the configurations of `target` in order (first variable fastest), adding the
    /// entry of the digit that was incremented keeps an index into this `Factor` in step without
    /// ever materializing the configuration.
    pub fn accumulated_offsets(&self, target: &[Variable]) -> Vec<isize> {
        let strides: Vec<usize> = target.iter().map(|v| self.offset_of(v)).collect();
        let dims: Vec<usize> = target.iter().map(|v| v.cardinality()).collect();
        iter::accumulate(&strides, &dims)
    }

    /// Retrieve the value for a complete assignment over the scope of this `Factor`
    ///
    /// # Args
    /// * `assignment`: a full assignment to the scope of a `Factor`. The assignment's scope may be
    ///   a superset of the `Factor`s scope.
    ///
    /// # Errors
    /// * `InfluenceError::IncompleteAssignment`, if assignment is not a complete assignment to the
    ///   scope of the `Factor`
    pub fn value(&self, assignment: &Assignment) -> Result<f64> {
        Ok(self.values[self.index_of(assignment)?])
    }

    /// The strategy annotation for a complete assignment, if the `Factor` carries annotations
    pub fn strategy(&self, assignment: &Assignment) -> Result<Option<&Strategy>> {
        let idx = self.index_of(assignment)?;
        Ok(self.strategies.as_ref().map(|s| &s[idx]))
    }

    fn index_of(&self, assignment: &Assignment) -> Result<usize> {
        let mut idx = 0;
        for (v, o) in self.scope.iter().zip(self.offsets().into_iter()) {
            match assignment.get(v) {
                Some(&state) if state < v.cardinality() => idx += state * o,
                Some(_) => {
                    return Err(InfluenceError::InvalidScope(format!("State out of range for {}", v)));
                },
                None => return Err(InfluenceError::IncompleteAssignment)
            }
        }
        Ok(idx)
    }

    /// Copy the values into a `Table` with one axis per scope variable
    pub fn table(&self) -> Table {
        let mut table = Table::zeros(nd::IxDyn(&self.dimensions()));
        for (idx, v) in table.indexed_iter_mut() {
            *v = self.values[self.position(idx.slice())];
        }
        table
    }

    /// Reduce the `Factor` to the given partial assignment. Assigned variables are removed from
    /// the scope; variables not in scope are ignored.
    ///
    /// # Errors
    /// * `InfluenceError::InvalidScope` if an assigned state is out of range for its `Variable`
    pub fn reduce(&self, assignment: &Assignment) -> Result<Factor> {
        let offsets = self.offsets();
        let mut base = 0;
        let mut scope = Vec::new();
        let mut strides = Vec::new();

        for (v, &o) in self.scope.iter().zip(offsets.iter()) {
            match assignment.get(v) {
                Some(&state) if state < v.cardinality() => base += state * o,
                Some(_) => {
                    return Err(InfluenceError::InvalidScope(format!("State out of range for {}", v)));
                },
                None => {
                    scope.push(v.clone());
                    strides.push(o);
                }
            }
        }

        if scope.len() == self.scope.len() {
            return Ok(self.clone());
        }

        let dims: Vec<usize> = scope.iter().map(|v| v.cardinality()).collect();
        let mut walk = iter::AlignedIter::from_strides(dims, vec![strides]);
        walk.seed(0, base);

        let size = walk.len();
        let mut indices = Vec::with_capacity(size);
        for _ in 0..size {
            indices.push(walk.position(0));
            walk.advance();
        }

        Ok(self.gather(scope, &indices))
    }

    /// Build a `Factor` over `scope` whose cell `i` is cell `indices[i]` of this `Factor`,
    /// carrying every annotation along with its value
    pub(crate) fn gather(&self, scope: Vec<Variable>, indices: &[usize]) -> Factor {
        Factor {
            scope,
            values: indices.iter().map(|&i| self.values[i]).collect(),
            role: self.role,
            criterion: self.criterion.clone(),
            strategies: self.strategies.as_ref().map(|s| indices.iter().map(|&i| s[i].clone()).collect()),
            uncertain: self.uncertain.as_ref().map(|u| indices.iter().map(|&i| u[i].clone()).collect())
        }
    }

    /// Normalize the table so that all values sum to one. The result is a joint probability.
    ///
    /// # Errors
    /// * `InfluenceError::NullVector` if the values sum to zero
    pub fn normalize(&self) -> Result<Factor> {
        let total: f64 = self.values.iter().sum();
        if total == 0.0 {
            return Err(InfluenceError::NullVector);
        }

        let mut out = self.clone();
        out.values.iter_mut().for_each(|v| *v /= total);
        out.role = Role::JointProbability;
        Ok(out)
    }

    /// Normalize each distribution over the first scope variable, turning the table into a
    /// conditional probability distribution of that variable given the rest of the scope.
    ///
    /// # Errors
    /// * `InfluenceError::NullVector` if any of the distributions sums to zero, or the first
    ///   variable has no states
    pub fn normalize_conditional(&self) -> Result<Factor> {
        if self.is_constant() {
            return self.normalize().map(|f| f.with_role(Role::ConditionalProbability));
        }

        let card = self.scope[0].cardinality();
        if card == 0 {
            return Err(InfluenceError::NullVector);
        }

        let mut out = self.clone();
        for block in out.values.chunks_mut(card) {
            let total: f64 = block.iter().sum();
            if total == 0.0 {
                return Err(InfluenceError::NullVector);
            }
            block.iter_mut().for_each(|v| *v /= total);
        }
        out.role = Role::ConditionalProbability;
        Ok(out)
    }

    /// Product of this `Factor` and another
    pub fn product(&self, other: &Factor) -> Factor {
        ops::multiply(vec![self, other])
    }

    /// `Factor` division: `self / other`, where `x / 0 = 0`
    pub fn divide(&self, other: &Factor) -> Factor {
        ops::divide(self, other)
    }

    /// Marginalize the `Factor` over the given `Variable`. If `var` is not in scope, the
    /// `Factor` is already marginalized over it and is returned unchanged.
    pub fn marginalize(&self, var: &Variable) -> Factor {
        if ! self.contains(var) {
            return self.clone();
        }

        let keep: Vec<Variable> = self.scope.iter().filter(|&v| v != var).cloned().collect();
        ops::sum_product(&[self], &keep, &[var.clone()])
    }

}
