use rand::rngs::StdRng;
use rand::SeedableRng;
use rebalancer::analytics;
use rebalancer::config::{AppConfig, BanditParams, ModelsConfig};
use rebalancer::domain::ConstraintDefaults;
use rebalancer::{AllocationModel, Constraints, Optimizer, Protocol, Signals, TOTAL_BPS};
use rust_decimal_macros::dec;

fn scenarios() -> Vec<Signals> {
    vec![
        Signals::new(0.0)
            .with_apr(Protocol::Staking, 0.10)
            .with_apr(Protocol::Lending, 0.05),
        Signals::new(85.0)
            .with_apr(Protocol::Staking, 0.20)
            .with_apr(Protocol::Lending, 0.22)
            .with_apr(Protocol::LiquidityProvision, 0.25)
            .with_apr(Protocol::PerpsHedge, 0.11)
            .with_volatility(Protocol::LiquidityProvision, 0.1),
        Signals::new(15.0)
            .with_apr(Protocol::Staking, 0.30)
            .with_apr(Protocol::Lending, 0.01)
            .with_apr(Protocol::LiquidityProvision, 0.02),
        Signals::new(10.0)
            .with_apr(Protocol::Staking, 0.08)
            .with_apr(Protocol::Lending, 0.08)
            .with_apr(Protocol::PerpsHedge, 0.0),
    ]
}

/// Every model yields an exact 10000 bps plan within the per-leg cap.
#[test]
fn every_model_respects_hard_constraints() {
    let optimizer = Optimizer::default();
    let mut rng = StdRng::seed_from_u64(7);

    for (i, signals) in scenarios().iter().enumerate() {
        for model in AllocationModel::ALL {
            let plan = optimizer
                .optimize_with_rng(signals, model, None, &mut rng)
                .unwrap();
            assert_eq!(plan.total_bps, TOTAL_BPS, "scenario {i} / {model}");
            assert!(
                plan.max_leg_bps() <= 7000,
                "scenario {i} / {model}: leg above cap: {plan:?}"
            );
            assert!(plan.legs.len() >= 2, "scenario {i} / {model}: {plan:?}");
            assert!(plan.legs.iter().all(|l| l.target_bps > 0));
        }
    }
}

/// Request overrides tighten the cap and raise the leg count.
#[test]
fn overrides_apply_per_request() {
    let optimizer = Optimizer::default();
    let constraints = Constraints {
        max_single_allocation: Some(4000),
        min_diversification: Some(3),
        risk_tolerance: None,
    };

    for signals in scenarios().iter().skip(1).take(2) {
        let plan = optimizer
            .optimize(signals, AllocationModel::Markowitz, Some(&constraints))
            .unwrap();
        assert_eq!(plan.total_bps, TOTAL_BPS);
        assert!(plan.max_leg_bps() <= 4000, "{plan:?}");
        assert!(plan.legs.len() >= 3, "{plan:?}");
    }
}

/// Protocols without positive APR never receive weight.
#[test]
fn zero_apr_protocol_stays_out() {
    let plan = Optimizer::default()
        .optimize(&scenarios()[3], AllocationModel::Markowitz, None)
        .unwrap();
    assert_eq!(plan.bps_of(Protocol::PerpsHedge), 0);
    assert_eq!(plan.bps_of(Protocol::Staking), 5000);
    assert_eq!(plan.bps_of(Protocol::Lending), 5000);
}

/// The bandit never explores when its rate is zero, so repeated runs agree.
#[test]
fn configured_exploration_rate_is_used() {
    let cfg = AppConfig {
        models: ModelsConfig {
            bandit: BanditParams {
                exploration_rate: 0.0,
            },
            ..ModelsConfig::default()
        },
        ..AppConfig::default()
    };
    let optimizer = Optimizer::from_config(&cfg);
    let signals = &scenarios()[0];

    let first = optimizer
        .optimize(signals, AllocationModel::Bandit, None)
        .unwrap();
    for _ in 0..10 {
        let again = optimizer
            .optimize(signals, AllocationModel::Bandit, None)
            .unwrap();
        assert_eq!(again.legs, first.legs);
    }
    assert_eq!(first.bps_of(Protocol::Staking), 7000);
}

/// What-if reports carry the plan, projections and a full comparison.
#[test]
fn what_if_report_is_complete() {
    let optimizer = Optimizer::new(ConstraintDefaults::default(), ModelsConfig::default());
    let report = analytics::what_if(
        &optimizer,
        &scenarios()[0],
        AllocationModel::Markowitz,
        None,
        dec!(250000),
    )
    .unwrap();

    assert_eq!(report.portfolio_value, dec!(250000));
    assert_eq!(report.comparison.models.len(), 3);
    assert!(report.projections.projected_value > dec!(250000));
    assert_eq!(report.time_horizon, "30d");
}
