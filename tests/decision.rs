//! Evaluation of small influence diagrams, end to end

use influence::factor::{InterventionKind, Strategy};
use influence::init::Initialization;
use influence::inference::{ConditionalInferenceEngine, VariableEliminationEngine};
use influence::{Assignment, Criterion, EliminationConfig, Factor, Network, NetworkBuilder, Role, Variable};

/// The umbrella problem: the forecast is observed before deciding whether to take the umbrella.
struct Umbrella {
    weather: Variable,
    forecast: Variable,
    umbrella: Variable,
    network: Network
}

fn umbrella() -> Umbrella {
    let weather = Variable::enumerated("weather", &["sunny", "rain"]);
    let forecast = Variable::enumerated("forecast", &["sunny", "rainy"]);
    let umbrella = Variable::enumerated("umbrella", &["take", "leave"]);

    let network = NetworkBuilder::new()
        .with_chance(&weather, vec![], Initialization::Binomial(0.7))
        .with_chance(&forecast, vec![weather.clone()], Initialization::Table(
            Factor::with_values(vec![forecast.clone(), weather.clone()], Role::ConditionalProbability,
                                vec![0.8, 0.2, 0.1, 0.9]).unwrap()
        ))
        .with_decision(&umbrella)
        .with_utility(vec![umbrella.clone(), weather.clone()], vec![20., 100., 70., 0.], Some("satisfaction"))
        .build()
        .unwrap();

    Umbrella { weather, forecast, umbrella, network }
}

impl Umbrella {
    fn tiers(&self) -> Vec<Vec<Variable>> {
        vec![vec![self.weather.clone()], vec![self.umbrella.clone()], vec![self.forecast.clone()]]
    }
}

fn assert_close(expected: f64, actual: f64) {
    assert!((expected - actual).abs() < 1e-9, "expected {}, got {}", expected, actual);
}

#[test]
fn maximum_expected_utility() {
    let problem = umbrella();
    let engine = VariableEliminationEngine::new(&problem.network, &Assignment::new()).unwrap();
    let evaluation = engine.evaluate(&problem.tiers()).unwrap();

    assert_close(77.7, evaluation.total_utility());
    assert_close(77.7, evaluation.expected_utility[&Some(Criterion::new("satisfaction"))]);
    assert_close(1.0, evaluation.probability_of_evidence);
    assert!(evaluation.strategy.is_none());

    // leave it on a sunny forecast, take it on a rainy one
    let policy = &evaluation.policies[&problem.umbrella];
    assert_eq!(&[problem.umbrella.clone(), problem.forecast.clone()], policy.scope());
    assert_eq!(&[0., 1., 1., 0.], policy.values());
}

#[test]
fn evaluate_given_evidence() {
    let problem = umbrella();

    let mut evidence = Assignment::new();
    evidence.set(&problem.forecast, 1);

    let engine = VariableEliminationEngine::new(&problem.network, &evidence).unwrap();
    let evaluation = engine.evaluate(&problem.tiers()).unwrap();

    assert_close(0.41, evaluation.probability_of_evidence);
    assert_close(21.7 / 0.41, evaluation.total_utility());
    assert_eq!(&[1., 0.], evaluation.policies[&problem.umbrella].values());
}

#[test]
fn untiered_variables_are_eliminated_last() {
    let problem = umbrella();
    let engine = VariableEliminationEngine::new(&problem.network, &Assignment::new()).unwrap();

    // the forecast is left out, and only eliminated once the decision is made
    let tiers = vec![vec![problem.weather.clone()], vec![problem.umbrella.clone()]];
    let evaluation = engine.evaluate(&tiers).unwrap();
    assert_close(77.7, evaluation.total_utility());
}

#[test]
fn recorded_strategy() {
    let problem = umbrella();
    let engine = VariableEliminationEngine::with_config(
        &problem.network, &Assignment::new(), EliminationConfig::recording()
    ).unwrap();
    let evaluation = engine.evaluate(&problem.tiers()).unwrap();

    let strategy = evaluation.strategy.unwrap();
    assert_eq!(vec![problem.umbrella.clone()], strategy.decisions());

    // observe the forecast, then decide
    let observe = &strategy.interventions()[0];
    assert_eq!(&problem.forecast, observe.variable());
    assert_eq!(InterventionKind::Observation, observe.kind());
    assert_eq!(2, observe.branches().len());

    let decide = |s: &Strategy| s.interventions()[0].states();
    assert_eq!(&[0], observe.branches()[0].states());
    assert_eq!(vec![1], decide(observe.branches()[0].then()));
    assert_eq!(&[1], observe.branches()[1].states());
    assert_eq!(vec![0], decide(observe.branches()[1].then()));
}

#[test]
fn criteria_are_kept_apart() {
    let weather = Variable::binary();
    let network = NetworkBuilder::new()
        .with_chance(&weather, vec![], Initialization::Binomial(0.7))
        .with_utility(vec![weather.clone()], vec![10., 0.], Some("money"))
        .with_utility(vec![weather.clone()], vec![0., -5.], Some("comfort"))
        .build()
        .unwrap();

    let engine = VariableEliminationEngine::new(&network, &Assignment::new()).unwrap();
    let evaluation = engine.evaluate(&[]).unwrap();

    assert_eq!(2, evaluation.expected_utility.len());
    assert_close(7.0, evaluation.expected_utility[&Some(Criterion::new("money"))]);
    assert_close(-1.5, evaluation.expected_utility[&Some(Criterion::new("comfort"))]);
    assert_close(5.5, evaluation.total_utility());
}

#[test]
fn impossible_outcomes_do_not_leak() {
    let weather = Variable::binary();
    let network = NetworkBuilder::new()
        .with_chance(&weather, vec![], Initialization::Binomial(1.0))
        .with_utility(vec![weather.clone()], vec![3., f64::NEG_INFINITY], None)
        .build()
        .unwrap();

    let engine = VariableEliminationEngine::new(&network, &Assignment::new()).unwrap();
    let evaluation = engine.evaluate(&[vec![weather.clone()]]).unwrap();
    assert_eq!(3., evaluation.total_utility());
}

#[test]
fn null_utilities_are_dropped() {
    let weather = Variable::binary();
    let network = NetworkBuilder::new()
        .with_chance(&weather, vec![], Initialization::Binomial(0.4))
        .with_utility(vec![weather.clone()], vec![0., 0.], Some("nothing"))
        .build()
        .unwrap();

    let engine = VariableEliminationEngine::new(&network, &Assignment::new()).unwrap();
    let evaluation = engine.evaluate(&[]).unwrap();
    assert!(evaluation.expected_utility.is_empty());
    assert_eq!(0., evaluation.total_utility());
}

#[test]
fn posterior_of_the_weather() {
    let problem = umbrella();

    let mut evidence = Assignment::new();
    evidence.set(&problem.forecast, 0);

    let mut engine = VariableEliminationEngine::new(&problem.network, &evidence).unwrap();
    let posterior = engine.infer(&vec![problem.weather.clone()].into_iter().collect()).unwrap();

    assert_close(0.56 / 0.59, posterior.values()[0]);
    assert_close(0.03 / 0.59, posterior.values()[1]);
}

#[test]
fn out_of_range_evidence_is_rejected() {
    let problem = umbrella();

    let mut evidence = Assignment::new();
    evidence.set(&problem.forecast, 5);

    assert!(VariableEliminationEngine::new(&problem.network, &evidence).is_err());
    assert!(VariableEliminationEngine::with_config(&problem.network, &evidence, EliminationConfig::recording()).is_err());

    // the decision has no potential of its own to reduce
    let mut evidence = Assignment::new();
    evidence.set(&problem.umbrella, 2);
    assert!(VariableEliminationEngine::new(&problem.network, &evidence).is_err());
}
