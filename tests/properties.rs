//! Property tests for the factor algebra and the elimination heuristic

use influence::factor::ops;
use influence::inference::{EliminationGraph, EliminationHeuristic, MinimalCliqueSize};
use influence::init::Initialization;
use influence::{Factor, Role, Variable};
use proptest::prelude::*;

use std::collections::HashSet;

fn assert_close(a: &Factor, b: &Factor) -> Result<(), TestCaseError> {
    let b = ops::reorder(b, a.scope()).map_err(|e| TestCaseError::fail(e.to_string()))?;
    for (x, y) in a.values().iter().zip(b.values().iter()) {
        prop_assert!((x - y).abs() <= 1e-9 * x.abs().max(1.0), "{} != {}", x, y);
    }
    Ok(())
}

/// Scopes over a pool of six variables, without duplicates
fn scopes() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(0usize..6, 1..4), 1..6)
        .prop_map(|scopes| {
            scopes.into_iter()
                  .map(|s| {
                      let mut seen = HashSet::new();
                      s.into_iter().filter(|i| seen.insert(*i)).collect()
                  })
                  .collect()
        })
}

fn pool() -> Vec<Variable> {
    (0..6).map(|i| Variable::discrete(2 + i % 3)).collect()
}

fn build(pool: &[Variable], scopes: &[Vec<usize>]) -> Vec<Factor> {
    scopes.iter()
          .map(|s| Factor::new(s.iter().map(|&i| pool[i].clone()).collect(), Role::ConditionalProbability).unwrap())
          .collect()
}

proptest! {
    #[test]
    fn multiply_is_commutative_and_associative(
        a in prop::collection::vec(0.1f64..10.0, 6),
        b in prop::collection::vec(0.1f64..10.0, 6),
        c in prop::collection::vec(0.1f64..10.0, 4)
    ) {
        let x = Variable::binary();
        let y = Variable::discrete(3);
        let z = Variable::binary();

        let fa = Factor::with_values(vec![x.clone(), y.clone()], Role::ConditionalProbability, a).unwrap();
        let fb = Factor::with_values(vec![y.clone(), z.clone()], Role::ConditionalProbability, b).unwrap();
        let fc = Factor::with_values(vec![z.clone(), x.clone()], Role::ConditionalProbability, c).unwrap();

        let abc = ops::multiply(vec![&fa, &fb, &fc]);
        let cba = ops::multiply(vec![&fc, &fb, &fa]);
        let bca = ops::multiply(vec![&fb, &fc, &fa]);
        assert_close(&abc, &cba)?;
        assert_close(&abc, &bca)?;

        let left = ops::multiply(vec![&ops::multiply(vec![&fa, &fb]), &fc]);
        let right = ops::multiply(vec![&fa, &ops::multiply(vec![&fb, &fc])]);
        assert_close(&left, &right)?;
    }

    #[test]
    fn marginal_consistency(seed in any::<u64>()) {
        let x = Variable::discrete(4);
        let y = Variable::discrete(3);

        let cpd = Initialization::Seeded(seed).build_cpd(&x, vec![y.clone()]).unwrap();
        let prior = Initialization::Uniform.build_cpd(&y, vec![]).unwrap();

        let joint = ops::multiply(vec![&cpd, &prior]);
        let total = ops::marginalize(&joint, &[]).unwrap();
        prop_assert!(total.is_constant());
        prop_assert!((total.values()[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn divide_inverts_multiply(
        a in prop::collection::vec(-10.0f64..10.0, 12),
        b in prop::collection::vec(0.1f64..10.0, 3)
    ) {
        let x = Variable::binary();
        let y = Variable::discrete(3);
        let z = Variable::binary();

        let fa = Factor::with_values(vec![x.clone(), y.clone(), z.clone()], Role::Utility, a).unwrap();
        let fb = Factor::with_values(vec![y.clone()], Role::ConditionalProbability, b).unwrap();

        let back = ops::divide(&ops::multiply(vec![&fa, &fb]), &fb);
        assert_close(&fa, &back)?;
    }

    #[test]
    fn reorder_round_trip(values in prop::collection::vec(-100.0f64..100.0, 24), perm in Just(vec![2usize, 0, 1]).prop_shuffle()) {
        let scope = vec![Variable::binary(), Variable::discrete(3), Variable::discrete(4)];
        let f = Factor::with_values(scope.clone(), Role::JointProbability, values).unwrap();

        let permuted: Vec<Variable> = perm.iter().map(|&i| scope[i].clone()).collect();
        let shuffled = ops::reorder(&f, &permuted).unwrap();
        prop_assert_eq!(&permuted[..], shuffled.scope());
        prop_assert_eq!(f, ops::reorder(&shuffled, &scope).unwrap());
    }

    #[test]
    fn fill_in_is_complete(scopes in scopes(), pick in 0usize..6) {
        let pool = pool();
        let factors = build(&pool, &scopes);
        let mut graph = EliminationGraph::new(factors.iter());

        let v = &pool[pick];
        prop_assume!(graph.contains(v));

        let former = graph.eliminate(v);
        prop_assert!(! graph.contains(v));
        for a in former.iter() {
            for b in former.iter().filter(|b| *b != a) {
                prop_assert!(graph.are_neighbors(a, b));
            }
        }
    }

    #[test]
    fn heuristic_respects_tiers(scopes in scopes(), split in 1usize..6) {
        let pool = pool();
        let factors = build(&pool, &scopes);

        let first: Vec<Variable> = pool[..split].to_vec();
        let second: Vec<Variable> = pool[split..].to_vec();
        let mut heuristic = MinimalCliqueSize::new(factors.iter(), vec![first.clone(), second]);

        let mut order = Vec::new();
        while let Some(v) = heuristic.next_variable() {
            heuristic.variable_eliminated(&v);
            order.push(v);
        }

        prop_assert_eq!(pool.len(), order.len());
        for v in order[..split].iter() {
            prop_assert!(first.contains(v));
        }
    }
}
