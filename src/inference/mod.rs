//! Defines the interface to inference engines

use crate::factor::Factor;
use crate::util::Result;
use crate::variable::Variable;

use std::collections::HashSet;

pub mod combinators;
pub mod heuristic;
mod variable_elimination;

pub use self::combinators::{max_out_variable, sum_out_variable, Eliminated};
pub use self::heuristic::{EliminationGraph, EliminationHeuristic, HeuristicState, MinimalCliqueSize};
pub use self::variable_elimination::{Evaluation, VariableEliminationEngine};


/// A `ConditionalInferenceEngine` is capable of answering Conditional Probability Queries of the form:
///     ```P(Y | E = e)```
///
/// `ConditionalInferenceEngine`s are stateful and must take the evidence `e` as an argument to whatever
/// construction mechanism they employ.
pub trait ConditionalInferenceEngine {

    /// Infer the joint distribution ```P(variables | evidence)```
    fn infer(&mut self, variables: &HashSet<Variable>) -> Result<Factor>;

}


#[cfg(test)]
/// Example derived from Koller & Friedman's student example. Example 6d of [1] provides the
/// result of exact inference of P(I | D=0, L=1, S=0) on a modified version of the K&F Student
/// example. We use that result here to test our implementation.
///
/// [1] https://www.uni-oldenburg.de/en/lcs/probabilistic-programming/webchurch-and-openbugs/
mod tests {
    use super::*;
    use crate::factor::Role;
    use crate::init::Initialization;
    use crate::model::{Network, NetworkBuilder};
    use crate::variable::Assignment;

    /// Utility function to build the student inference example
    fn build_student_example() -> (Variable, Network, Assignment) {
        let d = Variable::binary();
        let i = Variable::binary();
        let g = Variable::binary();
        let s = Variable::binary();
        let l = Variable::binary();

        // the tables are laid out with their first axis fastest, i.e. [g, i, d]
        let cpd_g = Factor::with_values(
            vec![g.clone(), i.clone(), d.clone()],
            Role::ConditionalProbability,
            vec![0.3, 0.7, 0.9, 0.1, 0.05, 0.95, 0.5, 0.5]
        ).unwrap();

        let cpd_s = Factor::with_values(vec![s.clone(), i.clone()], Role::ConditionalProbability,
                                        vec![0.95, 0.05, 0.2, 0.8]).unwrap();
        let cpd_l = Factor::with_values(vec![l.clone(), g.clone()], Role::ConditionalProbability,
                                        vec![0.9, 0.1, 0.4, 0.6]).unwrap();

        let model = NetworkBuilder::new()
            .with_chance(&d, vec![], Initialization::Binomial(0.6))
            .with_chance(&i, vec![], Initialization::Binomial(0.7))
            .with_chance(&g, vec![i.clone(), d.clone()], Initialization::Table(cpd_g))
            .with_chance(&s, vec![i.clone()], Initialization::Table(cpd_s))
            .with_chance(&l, vec![g.clone()], Initialization::Table(cpd_l))
            .build()
            .unwrap();

        let mut evidence = Assignment::new();
        evidence.set(&d, 0);
        evidence.set(&l, 1);
        evidence.set(&s, 0);

        (i, model, evidence)
    }

    /// Utility method to test the actual inference task
    fn test_inference(i: &Variable, engine: &mut dyn ConditionalInferenceEngine, precision: f64) {
        let f = engine.infer(&vec![i.clone()].into_iter().collect());

        assert!(! f.is_err());

        let f = f.unwrap();
        assert_eq!(&[i.clone()], f.scope());
        let mut assn = Assignment::new();
        assn.set(i, 1);

        let expected = 0.02919708;
        assert!((f.value(&assn).unwrap() - expected).abs() < precision);
    }

    #[test]
    /// Test variable elimination
    fn variable_elimination() {
        let (i, model, evidence) = build_student_example();

        let mut engine = VariableEliminationEngine::new(&model, &evidence).unwrap();

        // the result should be the same on subsequent iterations
        for _ in 0..10 {
            test_inference(&i, &mut engine, 0.00000001);
        }
    }

}
