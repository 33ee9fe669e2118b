//! End-to-end checks of the sample-size calculators through the public API.

use u_audit::power::{Alternative, SolverConfig, SolverStatus};
use u_audit::sampling::{
    acceptance_sample_size, attribute_sample_size, attribute_sample_size_amount,
    attribute_sample_sizes, discovery_sample_size, monetary_unit_sample_size, AmountConfig,
    AttributeConfig, MonetaryUnitConfig,
};
use u_audit::stratified::stratified_allocation;
use u_audit::AuditError;

#[test]
fn discovery_reference_and_ordering() {
    assert_eq!(discovery_sample_size(0.95, 0.05).unwrap(), 59);

    let by_confidence: Vec<u64> = [0.70, 0.90, 0.95, 0.99]
        .iter()
        .map(|&c| discovery_sample_size(c, 0.05).unwrap())
        .collect();
    assert!(by_confidence.windows(2).all(|w| w[0] < w[1]), "{by_confidence:?}");

    let by_rate: Vec<u64> = [0.10, 0.05, 0.01]
        .iter()
        .map(|&r| discovery_sample_size(0.95, r).unwrap())
        .collect();
    assert!(by_rate.windows(2).all(|w| w[0] < w[1]), "{by_rate:?}");
}

#[test]
fn discovery_rejects_unit_interval_edges() {
    for edge in [0.0, 1.0] {
        assert!(matches!(
            discovery_sample_size(0.95, edge),
            Err(AuditError::InvalidArgument { name: "intolerable_rate", .. })
        ));
        assert!(matches!(
            discovery_sample_size(edge, 0.05),
            Err(AuditError::InvalidArgument { name: "confidence", .. })
        ));
    }
}

#[test]
fn acceptance_is_the_amount_calculation() {
    for (balance, mean, delta, sigma) in [
        (100_000.0, 50.0, 0.05, 30.0),
        (2_500_000.0, 1_200.0, 0.05, 900.0),
        (40_000.0, 20.0, 0.25, 10.0),
    ] {
        let config = AmountConfig::new(balance, mean)
            .with_delta_rate(delta)
            .with_sigma(sigma);
        assert_eq!(
            acceptance_sample_size(&config).unwrap(),
            attribute_sample_size_amount(&config).unwrap()
        );
    }
}

#[test]
fn declared_defaults_equal_unset_defaults() {
    let unset = attribute_sample_size_amount(&AmountConfig::new(100_000.0, 50.0)).unwrap();
    let explicit = attribute_sample_size_amount(
        &AmountConfig::new(100_000.0, 50.0)
            .with_delta_rate(0.05)
            .with_sigma(30.0)
            .with_significance_level(0.05)
            .with_power(0.8)
            .with_alternative(Alternative::Greater)
            .with_solver(SolverConfig::default()),
    )
    .unwrap();
    assert_eq!(unset, explicit);

    let mus_unset = monetary_unit_sample_size(&MonetaryUnitConfig::new(1e6, 5e4)).unwrap();
    let mus_explicit = monetary_unit_sample_size(
        &MonetaryUnitConfig::new(1e6, 5e4)
            .with_confidence(0.95)
            .with_expected_error_rate(0.0),
    )
    .unwrap();
    assert_eq!(mus_unset, 60);
    assert_eq!(mus_unset, mus_explicit);
}

#[test]
fn stricter_tests_need_larger_samples() {
    let base = attribute_sample_size(&AttributeConfig::new(1000).with_delta_rate(0.1)).unwrap();
    let more_power =
        attribute_sample_size(&AttributeConfig::new(1000).with_delta_rate(0.1).with_power(0.95))
            .unwrap();
    let two_sided = attribute_sample_size(
        &AttributeConfig::new(1000)
            .with_delta_rate(0.1)
            .with_alternative(Alternative::TwoSided),
    )
    .unwrap();
    assert!(more_power.occurrence > base.occurrence);
    assert!(two_sided.occurrence > base.occurrence);
}

#[test]
fn exhausted_search_is_visible_in_results() {
    let solver = SolverConfig { min_n: 10, max_n: 60 };
    let plan = attribute_sample_sizes(
        &AttributeConfig::new(1000).with_solver(solver),
        &AmountConfig::new(10_000.0, 50.0).with_delta_rate(0.5),
    )
    .unwrap();
    // effect 1/6 needs roughly 225 observations, beyond the bound
    assert!(!plan.converged);
    assert_eq!(plan.occurrence, 60);
    assert!(plan.amount.is_some());

    let solution = attribute_sample_size_amount(
        &AmountConfig::new(10_000.0, 50.0)
            .with_alternative(Alternative::Less)
            .with_solver(solver),
    )
    .unwrap();
    assert_eq!(solution.status, SolverStatus::Exhausted);
}

#[test]
fn configs_round_trip_through_json() {
    let config = AttributeConfig::new(2500)
        .with_sigma_rate(600.0)
        .with_alternative(Alternative::TwoSided);
    let json = serde_json::to_string(&config).unwrap();
    let back: AttributeConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
    assert_eq!(
        attribute_sample_size(&back).unwrap(),
        attribute_sample_size(&config).unwrap()
    );

    let partial: AmountConfig = serde_json::from_str(
        r#"{"total_amount": 100000, "mean_transaction": 50, "alternative": "two-sided"}"#,
    )
    .unwrap();
    assert_eq!(partial.sigma, 30.0);
    assert_eq!(partial.alternative, Alternative::TwoSided);
    assert_eq!(partial.solver, SolverConfig::default());
}

#[test]
fn monetary_unit_plan_split_over_strata() {
    // Size a MUS sample, then allocate it over two strata.
    let amounts: Vec<f64> = (1..=400).map(|i| (i % 37) as f64 * 125.0 + 10.0).collect();
    let population_value: f64 = amounts.iter().sum();
    let n = monetary_unit_sample_size(&MonetaryUnitConfig::new(
        population_value,
        population_value / 20.0,
    ))
    .unwrap();
    assert_eq!(n, 60);

    let allocation = stratified_allocation(&[250.0, 150.0], &[400.0, 2500.0], n).unwrap();
    assert_eq!(allocation.iter().sum::<u64>(), n);
    // weights 250·20 = 5000 and 150·50 = 7500
    assert_eq!(allocation, vec![24, 36]);
}
