//! Elimination-order heuristics.
//!
//! A heuristic proposes the next variable to eliminate and is told when a variable has been
//! eliminated, so it can keep its working interaction graph in step with the factors the caller
//! holds. Each inference run owns its own heuristic.

use crate::factor::Factor;
use crate::variable::Variable;

use indexmap::{IndexMap, IndexSet};


/// Proposes an elimination order one variable at a time
pub trait EliminationHeuristic {

    /// The variable to eliminate next, or `None` once every candidate has been eliminated
    fn next_variable(&self) -> Option<Variable>;

    /// Notify the heuristic that `variable` has been eliminated
    fn variable_eliminated(&mut self, variable: &Variable);

}


/// Whether a heuristic has variables left to propose
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeuristicState {
    Active,
    Exhausted
}


/// The undirected interaction graph of a set of `Factor`s: two variables are neighbors when they
/// share a scope.
#[derive(Clone, Debug, Default)]
pub struct EliminationGraph {
    neighbors: IndexMap<Variable, IndexSet<Variable>>
}

impl EliminationGraph {

    /// Build the interaction graph of `factors`
    pub fn new<'a, I>(factors: I) -> EliminationGraph
        where I: IntoIterator<Item = &'a Factor>
    {
        let mut graph = EliminationGraph::default();
        for f in factors {
            let scope = f.scope();
            for (i, v) in scope.iter().enumerate() {
                graph.add_variable(v);
                for w in scope[(i + 1)..].iter() {
                    graph.connect(v, w);
                }
            }
        }
        graph
    }

    /// Add an isolated variable. Does nothing if it is already present.
    pub fn add_variable(&mut self, variable: &Variable) {
        self.neighbors.entry(variable.clone()).or_insert_with(IndexSet::new);
    }

    /// Add an edge between two variables, adding them if necessary
    pub fn connect(&mut self, a: &Variable, b: &Variable) {
        if a == b {
            return;
        }
        self.neighbors.entry(a.clone()).or_insert_with(IndexSet::new).insert(b.clone());
        self.neighbors.entry(b.clone()).or_insert_with(IndexSet::new).insert(a.clone());
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.neighbors.contains_key(variable)
    }

    pub fn neighbors(&self, variable: &Variable) -> Option<&IndexSet<Variable>> {
        self.neighbors.get(variable)
    }

    pub fn are_neighbors(&self, a: &Variable, b: &Variable) -> bool {
        self.neighbors.get(a).map_or(false, |n| n.contains(b))
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.neighbors.keys()
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// The clique formed by eliminating `variable`: the variable and its neighbors
    pub fn clique(&self, variable: &Variable) -> Vec<Variable> {
        let mut clique = vec![variable.clone()];
        if let Some(n) = self.neighbors.get(variable) {
            clique.extend(n.iter().cloned());
        }
        clique
    }

    /// Connect every pair of neighbors of `variable`, then remove it. Returns the former
    /// neighbors.
    pub fn eliminate(&mut self, variable: &Variable) -> Vec<Variable> {
        let former: Vec<Variable> = match self.neighbors.shift_remove(variable) {
            Some(n) => n.into_iter().collect(),
            None => return Vec::new()
        };

        for (i, a) in former.iter().enumerate() {
            if let Some(n) = self.neighbors.get_mut(a) {
                n.shift_remove(variable);
            }
            for b in former[(i + 1)..].iter() {
                self.connect(a, b);
            }
        }

        former
    }

}


/// Chooses the variable whose elimination creates the smallest clique table.
///
/// The candidates are restricted to the first non-empty priority tier. Among them, the winner
/// minimizes the product of the state counts of its clique; ties go to the smallest footprint
/// (the total size of the tables over scopes touching the clique), then to the earliest
/// candidate in its tier.
pub struct MinimalCliqueSize {
    graph: EliminationGraph,
    tiers: Vec<IndexSet<Variable>>,

    /// The scopes of the factors the caller holds, kept in step with eliminations
    scopes: Vec<Vec<Variable>>
}

impl MinimalCliqueSize {

    /// Build the heuristic over `factors`. Only variables listed in `tiers` are ever proposed;
    /// an empty `tiers` makes every variable of `factors` a candidate, in a single tier.
    pub fn new<'a, I>(factors: I, tiers: Vec<Vec<Variable>>) -> MinimalCliqueSize
        where I: IntoIterator<Item = &'a Factor>
    {
        let factors: Vec<&Factor> = factors.into_iter().collect();
        let mut graph = EliminationGraph::new(factors.iter().cloned());

        let tiers: Vec<IndexSet<Variable>> = if tiers.is_empty() {
            vec![graph.variables().cloned().collect()]
        } else {
            tiers.into_iter().map(|t| t.into_iter().collect()).collect()
        };

        for v in tiers.iter().flat_map(|t| t.iter()) {
            graph.add_variable(v);
        }

        MinimalCliqueSize {
            graph,
            tiers,
            scopes: factors.iter().map(|f| f.scope().to_vec()).filter(|s| ! s.is_empty()).collect()
        }
    }

    pub fn state(&self) -> HeuristicState {
        if self.tiers.iter().all(|t| t.is_empty()) {
            HeuristicState::Exhausted
        } else {
            HeuristicState::Active
        }
    }

    /// The working interaction graph
    pub fn graph(&self) -> &EliminationGraph {
        &self.graph
    }

    /// The remaining candidates of the first non-empty tier
    pub fn candidates(&self) -> Option<&IndexSet<Variable>> {
        self.tiers.iter().find(|t| ! t.is_empty())
    }

    /// The size of the table created by eliminating `variable`
    pub fn clique_size(&self, variable: &Variable) -> usize {
        self.graph.clique(variable)
                  .iter()
                  .fold(1usize, |acc, v| acc.saturating_mul(v.cardinality()))
    }

    /// The total size of the tables whose scopes touch the clique of `variable`
    pub fn footprint(&self, variable: &Variable) -> usize {
        let clique = self.graph.clique(variable);
        self.scopes.iter()
                   .filter(|s| s.iter().any(|v| clique.contains(v)))
                   .map(|s| s.iter().fold(1usize, |acc, v| acc.saturating_mul(v.cardinality())))
                   .fold(0usize, |acc, size| acc.saturating_add(size))
    }

}

impl EliminationHeuristic for MinimalCliqueSize {

    fn next_variable(&self) -> Option<Variable> {
        let candidates = self.candidates()?;

        let mut best: Option<(&Variable, usize, usize)> = None;
        for v in candidates.iter() {
            let size = self.clique_size(v);
            let footprint = self.footprint(v);
            tracing::trace!(variable = %v, size, footprint, "elimination candidate");

            best = match best {
                Some((_, s, f)) if (size, footprint) < (s, f) => Some((v, size, footprint)),
                None => Some((v, size, footprint)),
                keep => keep
            };
        }

        best.map(|(v, size, footprint)| {
            tracing::debug!(variable = %v, size, footprint, "selected variable to eliminate");
            v.clone()
        })
    }

    fn variable_eliminated(&mut self, variable: &Variable) {
        let clique = self.graph.eliminate(variable);

        for tier in self.tiers.iter_mut() {
            tier.shift_remove(variable);
        }

        // the factors over `variable` are replaced by one factor over its former neighbors
        let before = self.scopes.len();
        self.scopes.retain(|s| ! s.contains(variable));
        if before != self.scopes.len() && ! clique.is_empty() {
            self.scopes.push(clique);
        }
    }

}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::factor::Role;

    fn potential(scope: &[&Variable]) -> Factor {
        Factor::new(scope.iter().map(|&v| v.clone()).collect(), Role::JointProbability).unwrap()
    }

    #[test]
    fn interaction_graph() {
        let a = Variable::binary();
        let b = Variable::binary();
        let c = Variable::binary();
        let d = Variable::binary();

        let factors = vec![ potential(&[&a, &b]), potential(&[&b, &c, &d]) ];
        let graph = EliminationGraph::new(&factors);

        assert_eq!(4, graph.len());
        assert!(graph.are_neighbors(&a, &b));
        assert!(graph.are_neighbors(&c, &d));
        assert!(graph.are_neighbors(&d, &b));
        assert!(! graph.are_neighbors(&a, &c));
        assert_eq!(vec![b.clone(), a.clone()], graph.clique(&b)[..2].to_vec());
    }

    #[test]
    fn fill_in() {
        let a = Variable::binary();
        let b = Variable::binary();
        let c = Variable::binary();
        let d = Variable::binary();

        // a star centered on a
        let factors = vec![ potential(&[&a, &b]), potential(&[&a, &c]), potential(&[&a, &d]) ];
        let mut graph = EliminationGraph::new(&factors);
        assert!(! graph.are_neighbors(&b, &c));

        let former = graph.eliminate(&a);
        assert_eq!(3, former.len());
        assert!(! graph.contains(&a));

        for (x, y) in iproduct!(former.iter(), former.iter()) {
            if x != y {
                assert!(graph.are_neighbors(x, y));
            }
        }
        assert!(graph.neighbors(&b).unwrap().iter().all(|v| v != &a));
    }

    #[test]
    fn prefers_small_cliques() {
        // a chain a - b - c where b has many states
        let a = Variable::binary();
        let b = Variable::discrete(10);
        let c = Variable::binary();

        let factors = vec![ potential(&[&a, &b]), potential(&[&b, &c]) ];
        let mut heuristic = MinimalCliqueSize::new(&factors, vec![]);

        assert_eq!(HeuristicState::Active, heuristic.state());
        assert_eq!(20, heuristic.clique_size(&a));
        assert_eq!(40, heuristic.clique_size(&b));

        let first = heuristic.next_variable().unwrap();
        assert!(first == a || first == c);
        heuristic.variable_eliminated(&first);

        // the remaining endpoint still yields a clique of 20, b now yields 20 as well
        let second = heuristic.next_variable().unwrap();
        assert!(second != first);
        heuristic.variable_eliminated(&second);

        let third = heuristic.next_variable().unwrap();
        heuristic.variable_eliminated(&third);

        assert_eq!(None, heuristic.next_variable());
        assert_eq!(HeuristicState::Exhausted, heuristic.state());
    }

    #[test]
    fn footprint_breaks_ties() {
        let a = Variable::binary();
        let b = Variable::binary();
        let c = Variable::binary();
        let d = Variable::discrete(5);

        // a and c both have cliques of size 4, but c touches the large table over d
        let factors = vec![ potential(&[&a, &b]), potential(&[&c, &b]), potential(&[&b, &d]) ];
        let heuristic = MinimalCliqueSize::new(&factors, vec![vec![c.clone(), a.clone()]]);

        assert_eq!(heuristic.clique_size(&a), heuristic.clique_size(&c));
        assert_eq!(4 + 4 + 10, heuristic.footprint(&a));

        let e = Variable::discrete(5);
        let factors = vec![ potential(&[&a, &b]), potential(&[&c, &e]), potential(&[&e, &d]) ];
        let heuristic = MinimalCliqueSize::new(&factors, vec![vec![c.clone(), a.clone()]]);

        // c: clique {c, e} = 10; a: clique {a, b} = 4
        assert_eq!(Some(a.clone()), heuristic.next_variable());

        let f = Variable::binary();
        let factors = vec![ potential(&[&a, &b]), potential(&[&c, &f]), potential(&[&f, &d]) ];
        let heuristic = MinimalCliqueSize::new(&factors, vec![vec![c.clone(), a.clone()]]);

        // equal cliques, but the neighbor of c also sits in a table of 10
        assert_eq!(heuristic.clique_size(&a), heuristic.clique_size(&c));
        assert!(heuristic.footprint(&a) < heuristic.footprint(&c));
        assert_eq!(Some(a), heuristic.next_variable());
    }

    #[test]
    fn respects_tiers() {
        let a = Variable::binary();
        let b = Variable::discrete(10);
        let c = Variable::binary();

        let factors = vec![ potential(&[&a, &b]), potential(&[&b, &c]) ];
        let mut heuristic = MinimalCliqueSize::new(&factors, vec![vec![b.clone()], vec![a.clone()]]);

        // b is worse than a, but it is alone in the first tier
        assert_eq!(Some(b.clone()), heuristic.next_variable());
        heuristic.variable_eliminated(&b);

        // fill-in connected a and c
        assert!(heuristic.graph().are_neighbors(&a, &c));

        assert_eq!(Some(a.clone()), heuristic.next_variable());
        heuristic.variable_eliminated(&a);

        // c was never a candidate
        assert_eq!(None, heuristic.next_variable());
        assert_eq!(HeuristicState::Exhausted, heuristic.state());
        assert!(heuristic.graph().contains(&c));
    }

    #[test]
    fn tracks_scopes() {
        let a = Variable::binary();
        let b = Variable::binary();
        let c = Variable::binary();

        let factors = vec![ potential(&[&a, &b]), potential(&[&b, &c]) ];
        let mut heuristic = MinimalCliqueSize::new(&factors, vec![]);
        assert_eq!(4 + 4, heuristic.footprint(&b));

        heuristic.variable_eliminated(&a);

        // the table over [a, b] became one over [b]
        assert_eq!(2 + 4, heuristic.footprint(&b));
    }

}
