//! The operations defined over `Factor`s.
//!
//! Every operation walks the configurations of its result scope once (see `iter`), so combining
//! factors over heterogeneous scopes never builds the cross product of their configurations.
//! Operands are borrowed and never modified.

use super::iter::AlignedIter;
use super::{table_size, Criterion, Factor, InterventionKind, Role, Strategy};
use crate::util::{InfluenceError, Result};
use crate::variable::Variable;

use indexmap::IndexSet;
use itertools::Itertools;


///////////////////////////////////////////////////////////////////////////////////////////////////
// Auxiliary operations

/// The union of the scopes of `factors`, each `Variable` at the position of its first occurrence
pub fn union_scope<'a, I>(factors: I) -> Vec<Variable>
    where I: IntoIterator<Item = &'a Factor>
{
    let union: IndexSet<Variable> = factors.into_iter()
                                           .flat_map(|f| f.scope().iter().cloned())
                                           .collect();
    union.into_iter().collect()
}

/// The `Factor`s that are not constants
pub fn proper_factors<'a, I>(factors: I) -> Vec<&'a Factor>
    where I: IntoIterator<Item = &'a Factor>
{
    factors.into_iter().filter(|f| ! f.is_constant()).collect()
}

/// Check that every `Variable` can index a table
///
/// # Errors
/// * `InfluenceError::UnsupportedOperand` if a `Variable` is not discrete
pub fn check_discrete(variables: &[Variable]) -> Result<()> {
    match variables.iter().find(|v| ! v.is_discrete()) {
        Some(v) => Err(InfluenceError::UnsupportedOperand(format!("{} has a continuous domain", v))),
        None => Ok(())
    }
}

/// The role of a combination of `factors`: a utility if any operand is one, a joint
/// probability if any operand is one, otherwise a conditional probability.
pub fn combined_role(factors: &[&Factor]) -> Role {
    if factors.iter().any(|f| f.role() == Role::Utility) {
        Role::Utility
    } else if factors.iter().any(|f| f.role() == Role::JointProbability) {
        Role::JointProbability
    } else {
        Role::ConditionalProbability
    }
}

fn first_criterion(factors: &[&Factor]) -> Option<Criterion> {
    factors.iter().filter_map(|f| f.criterion()).next().cloned()
}

/// Check if `value` is within the relative `tolerance` of `reference`
pub fn is_tied(reference: f64, value: f64, tolerance: f64) -> bool {
    reference == value || (reference - value).abs() <= tolerance * reference.abs()
}

/// The indices of the operands that carry strategy annotations
fn annotated(operands: &[&Factor]) -> Vec<usize> {
    (0..operands.len()).filter(|&k| operands[k].strategies.is_some()).collect()
}

/// Concatenation of the annotations of the annotated operands at the current configuration
fn strategy_at(operands: &[&Factor], annotated: &[usize], walk: &AlignedIter) -> Strategy {
    let mut out = Strategy::empty();
    for &k in annotated.iter() {
        if let Some(ref strategies) = operands[k].strategies {
            let s = &strategies[walk.position(k)];
            if out.is_empty() {
                out = s.clone();
            } else if ! s.is_empty() {
                out = out.concat(s);
            }
        }
    }
    out
}

/// Check that `keep` and `eliminate` partition the variables of `operands`
fn check_partition(operands: &[&Factor], keep: &[Variable], eliminate: &[Variable]) -> Result<()> {
    table_size(keep)?;
    table_size(eliminate)?;

    if let Some(v) = keep.iter().find(|v| eliminate.contains(v)) {
        return Err(InfluenceError::InvalidScope(format!("{} is both kept and eliminated", v)));
    }

    for f in operands.iter() {
        if let Some(v) = f.scope().iter().find(|v| ! keep.contains(v) && ! eliminate.contains(v)) {
            return Err(InfluenceError::InvalidScope(format!("{} is neither kept nor eliminated", v)));
        }
    }

    Ok(())
}


///////////////////////////////////////////////////////////////////////////////////////////////////
// Combination

/// Combine `operands` cell by cell over the union of their scopes
fn combine(operands: &[&Factor], initial: f64, op: fn(f64, f64) -> f64) -> Factor {
    let scope = union_scope(operands.iter().cloned());
    let mut walk = AlignedIter::new(&scope, operands);
    let size = walk.len();

    let annotated = annotated(operands);
    let mut values = Vec::with_capacity(size);
    let mut strategies = if annotated.is_empty() { None } else { Some(Vec::with_capacity(size)) };

    for _ in 0..size {
        let mut acc = initial;
        for (k, f) in operands.iter().enumerate() {
            acc = op(acc, f.values[walk.position(k)]);
        }
        values.push(acc);

        if let Some(ref mut out) = strategies {
            out.push(strategy_at(operands, &annotated, &walk));
        }

        walk.advance();
    }

    let mut out = Factor::assemble(scope, values, Role::default());
    out.strategies = strategies;
    out
}

/// Split off the constants of `factors` that carry no annotations, folding their values with
/// `op` starting from `initial`
fn fold_constants<'a>(factors: &[&'a Factor], initial: f64, op: fn(f64, f64) -> f64) -> (f64, Vec<&'a Factor>) {
    let mut constant = initial;
    let mut operands = Vec::with_capacity(factors.len());
    for &f in factors.iter() {
        if f.is_constant() && f.strategies.is_none() {
            constant = op(constant, f.values[0]);
        } else {
            operands.push(f);
        }
    }
    (constant, operands)
}

/// `Factor` product over possibly disjoint scopes.
///
/// The result scope is the union of the operand scopes in order of first occurrence. Its role is
/// `Utility` if any operand is a utility, `JointProbability` if any operand is a joint
/// probability, and `ConditionalProbability` otherwise; it takes the first criterion found. An
/// empty product is the constant `1`.
pub fn multiply<'a, I>(factors: I) -> Factor
    where I: IntoIterator<Item = &'a Factor>
{
    let all: Vec<&Factor> = factors.into_iter().collect();
    let role = combined_role(&all);
    let criterion = first_criterion(&all);

    let (constant, operands) = fold_constants(&all, 1.0, |a, b| a * b);

    let out = match operands.len() {
        0 => Factor::constant(constant, role),
        1 => {
            let mut out = operands[0].clone();
            if constant != 1.0 {
                out.values.iter_mut().for_each(|v| *v *= constant);
                out.uncertain = None;
            }
            out
        },
        _ => combine(&operands, constant, |a, b| a * b)
    };

    out.with_role(role).with_criterion(criterion)
}

/// `Factor` sum over possibly disjoint scopes. Strategy annotations of the operands are
/// concatenated, since every intervention that contributed to a cell must be kept.
///
/// An empty sum is the constant utility `0`; a single `Factor` is returned unchanged.
pub fn sum<'a, I>(factors: I) -> Factor
    where I: IntoIterator<Item = &'a Factor>
{
    let all: Vec<&Factor> = factors.into_iter().collect();
    match all.len() {
        0 => return Factor::constant(0.0, Role::Utility),
        1 => return all[0].clone(),
        _ => ()
    };

    let role = combined_role(&all);
    let criterion = first_criterion(&all);

    let (constant, operands) = fold_constants(&all, 0.0, |a, b| a + b);

    let out = match operands.len() {
        0 => Factor::constant(constant, role),
        1 => {
            let mut out = operands[0].clone();
            if constant != 0.0 {
                out.values.iter_mut().for_each(|v| *v += constant);
                out.uncertain = None;
            }
            out
        },
        _ => combine(&operands, constant, |a, b| a + b)
    };

    out.with_role(role).with_criterion(criterion)
}

/// `Factor` division over the union of both scopes. Division by zero yields zero: a
/// zero-probability conditioning event contributes nothing.
///
/// The quotient of a utility is a utility; any other quotient is a conditional probability. The
/// numerator's criterion and annotations are kept.
pub fn divide(numerator: &Factor, denominator: &Factor) -> Factor {
    let operands = [numerator, denominator];
    let scope = union_scope(operands.iter().cloned());
    let mut walk = AlignedIter::new(&scope, &operands);
    let size = walk.len();

    let mut values = Vec::with_capacity(size);
    let mut strategies = numerator.strategies.as_ref().map(|_| Vec::with_capacity(size));

    for _ in 0..size {
        let n = numerator.values[walk.position(0)];
        let d = denominator.values[walk.position(1)];
        values.push(if d == 0.0 { 0.0 } else { n / d });

        if let (Some(out), Some(src)) = (strategies.as_mut(), numerator.strategies.as_ref()) {
            out.push(src[walk.position(0)].clone());
        }

        walk.advance();
    }

    let role = if numerator.role().is_utility() { Role::Utility } else { Role::ConditionalProbability };
    let mut out = Factor::assemble(scope, values, role).with_criterion(numerator.criterion.clone());
    out.strategies = strategies;
    out
}


///////////////////////////////////////////////////////////////////////////////////////////////////
// Marginalization

/// `sum_{eliminate} prod_{operands}` over the scope `keep`, with no checks on the partition
pub(crate) fn sum_product(operands: &[&Factor], keep: &[Variable], eliminate: &[Variable]) -> Factor {
    let role = combined_role(operands);
    let criterion = first_criterion(operands);

    // the eliminated variables vary fastest, so each result cell is a contiguous run
    let scope: Vec<Variable> = eliminate.iter().chain(keep.iter()).cloned().collect();
    let inner: usize = eliminate.iter().map(|v| v.cardinality()).product();
    let outer: usize = keep.iter().map(|v| v.cardinality()).product();

    let mut walk = AlignedIter::new(&scope, operands);
    let annotated = annotated(operands);
    let mut values = vec![0.0; outer];
    let mut distinct: Option<Vec<Vec<Strategy>>> = if annotated.is_empty() { None } else { Some(vec![Vec::new(); outer]) };

    for cell in 0..walk.len() {
        let mut p = 1.0;
        for (k, f) in operands.iter().enumerate() {
            p *= f.values[walk.position(k)];
        }

        let o = cell / inner;
        values[o] += p;

        if let Some(ref mut distinct) = distinct {
            let s = strategy_at(operands, &annotated, &walk);
            if ! s.is_empty() && ! distinct[o].contains(&s) {
                distinct[o].push(s);
            }
        }

        walk.advance();
    }

    let mut out = Factor::assemble(keep.to_vec(), values, role).with_criterion(criterion);
    out.strategies = distinct.map(|d| {
        d.into_iter()
         .map(|ss| ss.iter().fold(Strategy::empty(), |acc, s| acc.concat(s)))
         .collect()
    });
    out
}

/// Multiply `factors` and sum out `eliminate`, producing a `Factor` over `keep`.
///
/// `keep` and `eliminate` must partition the variables of the operands. A variable of
/// `eliminate` that no operand depends on scales the result by its state count.
///
/// # Errors
/// * `InfluenceError::InvalidScope` if `keep` and `eliminate` overlap or miss an operand variable
/// * `InfluenceError::UnsupportedOperand` if a variable is not discrete
pub fn multiply_and_marginalize<'a, I>(factors: I, keep: &[Variable], eliminate: &[Variable]) -> Result<Factor>
    where I: IntoIterator<Item = &'a Factor>
{
    let operands: Vec<&Factor> = factors.into_iter().collect();
    check_partition(&operands, keep, eliminate)?;
    Ok(sum_product(&operands, keep, eliminate))
}

/// Sum `factor` over every variable of its scope not in `keep`
///
/// # Errors
/// * the errors of `multiply_and_marginalize`
pub fn marginalize(factor: &Factor, keep: &[Variable]) -> Result<Factor> {
    let eliminate: Vec<Variable> = factor.scope().iter().filter(|v| ! keep.contains(v)).cloned().collect();
    multiply_and_marginalize(vec![factor], keep, &eliminate)
}


///////////////////////////////////////////////////////////////////////////////////////////////////
// Maximization

/// The result of maximizing a product over one variable
pub(crate) struct Maximized {
    pub(crate) variable: Variable,
    pub(crate) keep: Vec<Variable>,
    pub(crate) role: Role,
    pub(crate) criterion: Option<Criterion>,

    /// The maximum for each configuration of `keep`
    pub(crate) values: Vec<f64>,

    /// The states of `variable` within tolerance of the maximum, for each configuration of `keep`
    pub(crate) ties: Vec<Vec<usize>>,

    /// The consensus of the annotations of the tied states, for each configuration of `keep`
    pub(crate) strategies: Option<Vec<Strategy>>
}

impl Maximized {

    /// The maximum over `variable`, with scope `keep`
    pub(crate) fn value_factor(&self) -> Factor {
        let mut out = Factor::assemble(self.keep.clone(), self.values.clone(), self.role)
            .with_criterion(self.criterion.clone());
        out.strategies = self.strategies.clone();
        out
    }

    /// The uniform policy over the optimal states, with scope `[variable, keep...]`
    pub(crate) fn policy(&self) -> Factor {
        let card = self.variable.cardinality();
        let mut values = vec![0.0; card * self.ties.len()];

        for (o, tied) in self.ties.iter().enumerate() {
            let p = 1.0 / tied.len() as f64;
            for &i in tied.iter() {
                values[o * card + i] = p;
            }
        }

        let mut scope = vec![self.variable.clone()];
        scope.extend(self.keep.iter().cloned());
        Factor::assemble(scope, values, Role::ConditionalProbability)
    }

}

/// `max_{variable} prod_{operands}` over the scope `keep`, tracking every maximizer.
///
/// Annotations are merged across the tied states when an operand carries annotations, or when
/// `record` asks for every result cell to name the decision.
pub(crate) fn max_product(
    operands: &[&Factor],
    keep: &[Variable],
    variable: &Variable,
    tolerance: f64,
    record: bool
) -> Maximized {
    let scope: Vec<Variable> = Some(variable).into_iter().chain(keep.iter()).cloned().collect();
    let card = variable.cardinality();
    let outer: usize = keep.iter().map(|v| v.cardinality()).product();

    let annotated = annotated(operands);
    let track = record || ! annotated.is_empty();

    let mut walk = AlignedIter::new(&scope, operands);
    let mut block = vec![0.0; card];
    let mut block_strategies = vec![Strategy::empty(); if track { card } else { 0 }];

    let mut values = Vec::with_capacity(outer);
    let mut ties = Vec::with_capacity(outer);
    let mut strategies = if track { Some(Vec::with_capacity(outer)) } else { None };

    for _ in 0..outer {
        for i in 0..card {
            let mut p = 1.0;
            for (k, f) in operands.iter().enumerate() {
                p *= f.values[walk.position(k)];
            }
            block[i] = p;

            if track {
                block_strategies[i] = strategy_at(operands, &annotated, &walk);
            }

            walk.advance();
        }

        let max = block.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let tied: Vec<usize> = (0..card).filter(|&i| is_tied(max, block[i], tolerance)).collect();

        if let Some(ref mut out) = strategies {
            let options: Vec<(usize, &Strategy)> = tied.iter().map(|&i| (i, &block_strategies[i])).collect();
            out.push(Strategy::merge(variable, InterventionKind::Decision, &options));
        }

        values.push(max);
        ties.push(tied);
    }

    Maximized {
        variable: variable.clone(),
        keep: keep.to_vec(),
        role: combined_role(operands),
        criterion: first_criterion(operands),
        values,
        ties,
        strategies
    }
}

fn check_maximize(operands: &[&Factor], keep: &[Variable], variable: &Variable) -> Result<()> {
    check_partition(operands, keep, &[variable.clone()])?;
    if variable.cardinality() == 0 {
        return Err(InfluenceError::InvalidScope(format!("{} has no states", variable)));
    }
    Ok(())
}

/// Multiply `factors` and maximize over `variable`.
///
/// Returns the maximum for each configuration of `keep`, and the policy: a conditional
/// probability over `[variable, keep...]` assigning `1 / |ties|` to every state whose value is
/// within the relative `tolerance` of the maximum, and zero to the rest.
///
/// # Errors
/// * `InfluenceError::InvalidScope` if `keep` and `variable` do not partition the operand scopes
/// * `InfluenceError::UnsupportedOperand` if a variable is not discrete
pub fn multiply_and_maximize<'a, I>(
    factors: I,
    keep: &[Variable],
    variable: &Variable,
    tolerance: f64
) -> Result<(Factor, Factor)>
    where I: IntoIterator<Item = &'a Factor>
{
    let operands: Vec<&Factor> = factors.into_iter().collect();
    check_maximize(&operands, keep, variable)?;

    let max = max_product(&operands, keep, variable, tolerance, false);
    Ok((max.value_factor(), max.policy()))
}

/// Maximize `factor` over `variable`, keeping the rest of its scope. See
/// `multiply_and_maximize`.
pub fn maximize(factor: &Factor, variable: &Variable, tolerance: f64) -> Result<(Factor, Factor)> {
    let keep: Vec<Variable> = factor.scope().iter().filter(|&v| v != variable).cloned().collect();
    multiply_and_maximize(vec![factor], &keep, variable, tolerance)
}

/// Multiply `factors` and maximize over `variable`, returning the maximum and, for each
/// configuration of `keep`, the indices of the optimal states of `variable`
///
/// # Errors
/// * the errors of `multiply_and_maximize`
pub fn maximize_choices<'a, I>(
    factors: I,
    keep: &[Variable],
    variable: &Variable,
    tolerance: f64
) -> Result<(Factor, Vec<Vec<usize>>)>
    where I: IntoIterator<Item = &'a Factor>
{
    let operands: Vec<&Factor> = factors.into_iter().collect();
    check_maximize(&operands, keep, variable)?;

    let max = max_product(&operands, keep, variable, tolerance, false);
    let value = max.value_factor();
    Ok((value, max.ties))
}


///////////////////////////////////////////////////////////////////////////////////////////////////
// Expectation

/// The expectation of `utility` over `variable` under `weights`: `sum_x weights(x, ..) * utility(x, ..)`.
///
/// A weight of exactly zero contributes nothing, whatever the utility cell holds (infinite
/// placeholders of impossible outcomes included). Annotations of the utility are merged as an
/// observation of `variable` across the states with non-zero weight. The result is a utility
/// over the union of both scopes without `variable`, tagged with the utility's criterion.
///
/// # Errors
/// * `InfluenceError::UnsupportedOperand` if `variable` is not discrete
pub fn expectation(weights: &Factor, utility: &Factor, variable: &Variable) -> Result<Factor> {
    check_discrete(&[variable.clone()])?;

    let operands = [weights, utility];
    let keep: Vec<Variable> = union_scope(operands.iter().cloned()).into_iter()
                                                                    .filter(|v| v != variable)
                                                                    .collect();
    let scope: Vec<Variable> = Some(variable).into_iter().chain(keep.iter()).cloned().collect();
    let card = variable.cardinality();
    let outer: usize = keep.iter().map(|v| v.cardinality()).product();

    let mut walk = AlignedIter::new(&scope, &operands);
    let mut values = Vec::with_capacity(outer);
    let mut strategies = utility.strategies.as_ref().map(|_| Vec::with_capacity(outer));

    for _ in 0..outer {
        let mut acc = 0.0;
        let mut options: Vec<(usize, &Strategy)> = Vec::new();

        for i in 0..card {
            let w = weights.values[walk.position(0)];
            if w != 0.0 {
                acc += w * utility.values[walk.position(1)];
                if let Some(ref src) = utility.strategies {
                    options.push((i, &src[walk.position(1)]));
                }
            }
            walk.advance();
        }

        values.push(acc);
        if let Some(ref mut out) = strategies {
            out.push(Strategy::merge(variable, InterventionKind::Observation, &options));
        }
    }

    let mut out = Factor::assemble(keep, values, Role::Utility).with_criterion(utility.criterion.clone());
    out.strategies = strategies;
    Ok(out)
}


///////////////////////////////////////////////////////////////////////////////////////////////////
// Reordering

/// Copy `factor` into the layout of `scope`, a permutation of its own scope. Annotations move
/// with their values.
///
/// # Errors
/// * `InfluenceError::InvalidScope` if `scope` is not a permutation of the `Factor`'s scope
pub fn reorder(factor: &Factor, scope: &[Variable]) -> Result<Factor> {
    if scope.len() != factor.scope().len()
        || scope.iter().unique().count() != scope.len()
        || scope.iter().any(|v| ! factor.contains(v))
    {
        return Err(InfluenceError::InvalidScope(String::from("Not a permutation of the scope")));
    }

    let mut walk = AlignedIter::new(scope, &[factor]);
    let indices: Vec<usize> = (0..walk.len()).map(|_| {
        let p = walk.position(0);
        walk.advance();
        p
    }).collect();

    Ok(factor.gather(scope.to_vec(), &indices))
}

/// Replace `old` in the scope of `factor` with `new`, a `Variable` with the same state labels
/// in a different order, moving every cell to the index of its relabelled state.
///
/// # Errors
/// * `InfluenceError::InvalidScope` if `old` is not in scope or the states of `new` are not a
///   permutation of the states of `old`
/// * `InfluenceError::DuplicateVariable` if `new` is already in scope
pub fn reorder_states(factor: &Factor, old: &Variable, new: &Variable) -> Result<Factor> {
    if ! factor.contains(old) {
        return Err(InfluenceError::InvalidScope(format!("{} is not in scope", old)));
    }

    if new != old && factor.contains(new) {
        return Err(InfluenceError::DuplicateVariable);
    }

    let card = old.cardinality();
    let mut source = Vec::with_capacity(card);
    for label in new.states().iter() {
        match old.state_index(label) {
            Some(i) => source.push(i),
            None => return Err(InfluenceError::InvalidScope(format!("{} is not a state of {}", label, old)))
        }
    }

    if source.len() != card || source.iter().unique().count() != card {
        return Err(InfluenceError::InvalidScope(format!("The states of {} are not a permutation of {}", new, old)));
    }

    // state i of the new variable lives at the index of its old state
    let offset = factor.offset_of(old);
    let displacement: Vec<isize> = source.iter()
                                         .enumerate()
                                         .map(|(i, &s)| (s as isize - i as isize) * offset as isize)
                                         .collect();

    let indices: Vec<usize> = (0..factor.len()).map(|j| {
        let state = (j / offset) % card;
        (j as isize + displacement[state]) as usize
    }).collect();

    let scope = factor.scope().iter().map(|v| if v == old { new.clone() } else { v.clone() }).collect();
    Ok(factor.gather(scope, &indices))
}
