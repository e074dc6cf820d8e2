//! Definition of the variable module
//!
//! A `Variable` is a dimension of a `Factor`: a random variable or a decision with an ordered,
//! finite set of states. `Variable`s are compared by identity; two `Variable`s constructed
//! separately are always distinct, even if they share a name.

use crate::util::{InfluenceError, Result};

use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Source of unique identities for `Variable`s
static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

fn next_id() -> usize {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}


/// The range of values over which a `Variable` is defined.
#[derive(Clone, Debug)]
pub enum Domain {

    /// An ordered set of named states
    Discrete(Arc<[String]>),

    /// A real valued variable. `Factor`s cannot be built over these.
    Continuous

}


/// A handle to a random or decision variable. Cloning a `Variable` is cheap and yields the same
/// identity.
#[derive(Clone, Debug)]
pub struct Variable {
    id: usize,
    name: Option<Arc<str>>,
    domain: Domain
}

impl PartialEq for Variable {
    fn eq(&self, other: &Variable) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.name {
            Some(ref name) => write!(f, "{}", name),
            None => write!(f, "X{}", self.id)
        }
    }
}

impl Variable {

    fn build(name: Option<&str>, domain: Domain) -> Variable {
        Variable {
            id: next_id(),
            name: name.map(Arc::from),
            domain
        }
    }

    /// Construct an anonymous binary `Variable` with states `0` and `1`
    pub fn binary() -> Variable {
        Variable::discrete(2)
    }

    /// Construct an anonymous discrete `Variable` with `count` states labelled `0..count`
    pub fn discrete(count: usize) -> Variable {
        let states: Vec<String> = (0..count).map(|i| i.to_string()).collect();
        Variable::build(None, Domain::Discrete(Arc::from(states)))
    }

    /// Construct a named discrete `Variable` with `count` states labelled `0..count`
    pub fn named(name: &str, count: usize) -> Variable {
        let states: Vec<String> = (0..count).map(|i| i.to_string()).collect();
        Variable::build(Some(name), Domain::Discrete(Arc::from(states)))
    }

    /// Construct a named `Variable` over an enumerated set of states
    pub fn enumerated(name: &str, states: &[&str]) -> Variable {
        let states: Vec<String> = states.iter().map(|s| String::from(*s)).collect();
        Variable::build(Some(name), Domain::Discrete(Arc::from(states)))
    }

    /// Construct a named continuous `Variable`
    pub fn continuous(name: &str) -> Variable {
        Variable::build(Some(name), Domain::Continuous)
    }

    /// Construct a new `Variable` with the same name whose states are those of `self`, permuted
    /// so that state `i` of the result is state `order[i]` of `self`.
    ///
    /// # Errors
    /// * `InfluenceError::UnsupportedOperand` if `self` is continuous
    /// * `InfluenceError::InvalidScope` if `order` is not a permutation of the states
    pub fn permuted(&self, order: &[usize]) -> Result<Variable> {
        let states = match self.domain {
            Domain::Discrete(ref states) => states,
            Domain::Continuous => {
                return Err(InfluenceError::UnsupportedOperand(
                    format!("{} has a continuous domain", self)
                ));
            }
        };

        let mut seen = vec![false; states.len()];
        for &i in order.iter() {
            if i >= states.len() || seen[i] {
                return Err(InfluenceError::InvalidScope(
                    format!("{:?} is not a permutation of the states of {}", order, self)
                ));
            }
            seen[i] = true;
        }

        if order.len() != states.len() {
            return Err(InfluenceError::InvalidScope(
                format!("{:?} is not a permutation of the states of {}", order, self)
            ));
        }

        let permuted: Vec<String> = order.iter().map(|&i| states[i].clone()).collect();
        let name = self.name.as_ref().map(|n| &**n);
        Ok(Variable::build(name, Domain::Discrete(Arc::from(permuted))))
    }

    /// The unique identity of the `Variable`
    pub fn id(&self) -> usize {
        self.id
    }

    /// The user supplied name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(|n| &**n)
    }

    /// The domain of the `Variable`
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Check if this `Variable` is discrete
    pub fn is_discrete(&self) -> bool {
        match self.domain {
            Domain::Discrete(_) => true,
            Domain::Continuous => false
        }
    }

    /// The number of states. Continuous `Variable`s have no states.
    pub fn cardinality(&self) -> usize {
        match self.domain {
            Domain::Discrete(ref states) => states.len(),
            Domain::Continuous => 0
        }
    }

    /// The ordered state labels. Continuous `Variable`s have no states.
    pub fn states(&self) -> &[String] {
        match self.domain {
            Domain::Discrete(ref states) => states,
            Domain::Continuous => &[]
        }
    }

    /// Find the index of the state with the given label
    pub fn state_index(&self, label: &str) -> Option<usize> {
        self.states().iter().position(|s| s == label)
    }

}


/// A (possibly partial) assignment of states to `Variable`s.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Assignment {
    values: HashMap<Variable, usize>
}

impl Assignment {

    /// Construct an empty `Assignment`
    pub fn new() -> Assignment {
        Assignment { values: HashMap::new() }
    }

    /// Assign the state with index `value` to `var`
    pub fn set(&mut self, var: &Variable, value: usize) {
        self.values.insert(var.clone(), value);
    }

    /// Get the state index assigned to `var`, if any
    pub fn get(&self, var: &Variable) -> Option<&usize> {
        self.values.get(var)
    }

    /// Remove the assignment to `var`
    pub fn unset(&mut self, var: &Variable) -> Option<usize> {
        self.values.remove(var)
    }

    pub fn contains(&self, var: &Variable) -> bool {
        self.values.contains_key(var)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the assigned `Variable`s
    pub fn keys(&self) -> hash_map::Keys<Variable, usize> {
        self.values.keys()
    }

    pub fn iter(&self) -> hash_map::Iter<Variable, usize> {
        self.values.iter()
    }

}

impl FromIterator<(Variable, usize)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (Variable, usize)>>(iter: I) -> Self {
        Assignment { values: iter.into_iter().collect() }
    }
}


/// Iterator over every complete `Assignment` to a scope. The first `Variable` of the scope varies
/// fastest, matching the layout of a `Factor`'s values.
pub struct Assignments {
    scope: Vec<Variable>,
    coordinate: Vec<usize>,
    done: bool
}

impl Iterator for Assignments {
    type Item = Assignment;

    fn next(&mut self) -> Option<Assignment> {
        if self.done {
            return None;
        }

        let assn = self.scope.iter().cloned().zip(self.coordinate.iter().cloned()).collect();

        // mixed radix increment, carrying into the slower digits
        self.done = true;
        for (digit, var) in self.coordinate.iter_mut().zip(self.scope.iter()) {
            *digit += 1;
            if *digit < var.cardinality() {
                self.done = false;
                break;
            }
            *digit = 0;
        }

        Some(assn)
    }
}

/// Enumerate all complete assignments to `scope`. An empty scope has exactly one (empty)
/// assignment.
pub fn all_assignments(scope: &[Variable]) -> Assignments {
    Assignments {
        scope: scope.to_vec(),
        coordinate: vec![0; scope.len()],
        done: scope.iter().any(|v| v.cardinality() == 0)
    }
}


// Unit Tests for the Variable struct.
#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn identity() {
        let a = Variable::named("A", 2);
        let b = Variable::named("A", 2);

        assert_eq!(a, a.clone());
        assert!(a != b);
        assert_eq!("A", a.to_string());
    }

    #[test]
    fn discrete() {
        let var = Variable::discrete(10);
        assert!(var.is_discrete());
        assert_eq!(10, var.cardinality());
        assert_eq!(Some(3), var.state_index("3"));
        assert_eq!(None, var.state_index("10"));
    }

    #[test]
    fn enumerated() {
        let var = Variable::enumerated("Foo", &["Probabilistic", "Graphical", "Models"]);
        assert_eq!(Some("Foo"), var.name());
        assert_eq!(3, var.cardinality());
        assert_eq!(Some(1), var.state_index("Graphical"));
    }

    #[test]
    fn continuous() {
        let var = Variable::continuous("Foo");
        assert!(! var.is_discrete());
        assert_eq!(0, var.cardinality());
        assert!(var.permuted(&[]).is_err());
    }

    #[test]
    fn permuted() {
        let var = Variable::enumerated("T", &["low", "mid", "high"]);
        let p = var.permuted(&[2, 0, 1]).unwrap();

        assert!(p != var);
        assert_eq!(Some("T"), p.name());
        assert_eq!(&["high", "low", "mid"], p.states());

        assert!(var.permuted(&[0, 0, 1]).is_err());
        assert!(var.permuted(&[0, 1]).is_err());
        assert!(var.permuted(&[0, 1, 3]).is_err());
    }

    #[test]
    fn assignments_first_fastest() {
        let a = Variable::binary();
        let b = Variable::discrete(3);

        let all: Vec<(usize, usize)> = all_assignments(&[a.clone(), b.clone()])
            .map(|assn| (*assn.get(&a).unwrap(), *assn.get(&b).unwrap()))
            .collect();

        assert_eq!(vec![(0, 0), (1, 0), (0, 1), (1, 1), (0, 2), (1, 2)], all);
    }

    #[test]
    fn assignments_empty_scope() {
        let all: Vec<Assignment> = all_assignments(&[]).collect();
        assert_eq!(1, all.len());
        assert!(all[0].is_empty());
    }

}
