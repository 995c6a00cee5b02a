use std::collections::BTreeMap;
use std::sync::Arc;

use rebalancer::config::OrchestratorConfig;
use rebalancer::orchestrator::OutcomeDetail;
use rebalancer::vault::VaultClient;
use rebalancer::{
    AllocationModel, FailurePoint, Optimizer, Orchestrator, PaperVault, Protocol,
    RebalanceRequest, RebalanceStatus, RebalancerError, Signals,
};

fn signals() -> Signals {
    Signals::new(0.0)
        .with_apr(Protocol::Staking, 0.12)
        .with_apr(Protocol::Lending, 0.08)
}

fn request(vault_id: u64) -> RebalanceRequest {
    RebalanceRequest::new(vault_id, signals()).with_model(AllocationModel::Markowitz)
}

fn setup(vault: PaperVault) -> (Arc<PaperVault>, Orchestrator) {
    let vault = Arc::new(vault);
    let orchestrator = Orchestrator::new(
        vault.clone(),
        Arc::new(Optimizer::default()),
        OrchestratorConfig::default(),
    );
    (vault, orchestrator)
}

/// A failing vault in a batch must not affect the other vaults.
#[tokio::test]
async fn batch_failure_is_isolated() {
    let (vault, orchestrator) = setup(PaperVault::default());
    vault.fail_on(2, FailurePoint::Snapshot);

    let report = orchestrator
        .batch(vec![request(1), request(2), request(3)])
        .await;

    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.successful, 2, "two vaults should succeed");
    assert_eq!(report.summary.failed, 1, "only vault 2 should fail");

    for entry in &report.results {
        if entry.vault_id == 2 {
            assert!(!entry.success);
            let msg = entry.error.as_deref().unwrap_or_default();
            assert!(msg.contains("injected"), "unexpected error: {msg}");
        } else {
            let outcome = entry.result.as_ref().expect("successful entry has an outcome");
            assert_eq!(outcome.status, RebalanceStatus::Executed);
        }
    }
}

/// Executing a plan moves the vault; running the same request again is a no-op.
#[tokio::test]
async fn second_rebalance_is_skipped() {
    let (vault, orchestrator) = setup(PaperVault::default());

    let first = orchestrator.rebalance(&request(10)).await.unwrap();
    assert_eq!(first.status, RebalanceStatus::Executed);

    let snapshot = vault.snapshot(10).await.unwrap();
    assert_eq!(snapshot.bps_of(Protocol::Staking), 6000);
    assert_eq!(snapshot.bps_of(Protocol::PerpsHedge), 0);

    let second = orchestrator.rebalance(&request(10)).await.unwrap();
    assert_eq!(second.status, RebalanceStatus::Skipped);
    assert_eq!(second.max_drift_bps, Some(0));
}

/// Drift exactly at the threshold is not material.
#[tokio::test]
async fn drift_at_threshold_is_skipped() {
    let current = BTreeMap::from([(Protocol::Staking, 5500), (Protocol::Lending, 4500)]);
    let (_vault, orchestrator) = setup(PaperVault::default().with_vault(20, current));

    let outcome = orchestrator.rebalance(&request(20)).await.unwrap();
    assert_eq!(outcome.max_drift_bps, Some(500));
    assert_eq!(outcome.status, RebalanceStatus::Skipped);
}

/// Protocols the vault holds but the plan drops do not count toward drift.
#[tokio::test]
async fn unplanned_holdings_are_ignored() {
    let current = BTreeMap::from([
        (Protocol::Staking, 4800),
        (Protocol::Lending, 4600),
        (Protocol::LiquidityProvision, 600),
    ]);
    let (_vault, orchestrator) = setup(PaperVault::default().with_vault(21, current));
    let signals = Signals::new(0.0)
        .with_apr(Protocol::Staking, 0.10)
        .with_apr(Protocol::Lending, 0.10);
    let req = RebalanceRequest::new(21, signals).with_model(AllocationModel::Markowitz);

    let outcome = orchestrator.rebalance(&req).await.unwrap();
    assert_eq!(
        outcome.status,
        RebalanceStatus::Skipped,
        "per-leg drift is 400, below the threshold"
    );
    assert_eq!(outcome.max_drift_bps, Some(400));
}

/// Single mode surfaces collaborator errors; settled mode reports them.
#[tokio::test]
async fn execution_failure_modes() {
    let (vault, orchestrator) = setup(PaperVault::default());
    vault.fail_on(30, FailurePoint::Execute);

    let err = orchestrator.rebalance(&request(30)).await.unwrap_err();
    assert!(
        matches!(err, RebalancerError::Execution { vault_id: 30, .. }),
        "expected execution error, got: {err:?}"
    );

    let outcome = orchestrator.rebalance_settled(&request(30)).await.unwrap();
    assert_eq!(outcome.status, RebalanceStatus::Failed);
    assert!(outcome.plan.is_some(), "plan was computed before execution failed");
    assert!(matches!(outcome.detail, OutcomeDetail::Failed { .. }));

    vault.clear_failure(30);
    let outcome = orchestrator.rebalance_settled(&request(30)).await.unwrap();
    assert_eq!(outcome.status, RebalanceStatus::Executed);
}

/// A dry run leaves the vault allocation untouched.
#[tokio::test]
async fn dry_run_leaves_vault_untouched() {
    let (vault, orchestrator) = setup(PaperVault::default());

    let report = orchestrator.dry_run(&request(40)).unwrap();
    assert!(report.dry_run);
    assert_eq!(report.plan.total_bps, 10_000);

    let snapshot = vault.snapshot(40).await.unwrap();
    assert_eq!(snapshot.bps_of(Protocol::Staking), 4000, "seed allocation expected");
    assert_eq!(snapshot.bps_of(Protocol::PerpsHedge), 1000);
}

/// Requests arrive as camelCase JSON with optional model and constraints.
#[tokio::test]
async fn request_from_json() {
    let raw = r#"{
        "vaultId": 50,
        "signals": {
            "prices": {"ETH": 3200.5},
            "apr": {"Staking": 0.10, "Lending": 0.05, "LP": 0.20},
            "risk": 10
        },
        "model": "markowitz",
        "constraints": {"maxSingleAllocation": 5000, "minDiversification": 3}
    }"#;
    let req: RebalanceRequest = serde_json::from_str(raw).unwrap();
    let (_vault, orchestrator) = setup(PaperVault::default());

    let report = orchestrator.dry_run(&req).unwrap();
    assert_eq!(report.model, AllocationModel::Markowitz);
    assert_eq!(report.constraints.max_single_allocation_bps, 5000);
    assert!(report.plan.legs.len() >= 3);
    assert!(report.plan.max_leg_bps() <= 5000);
    assert_eq!(report.plan.total_bps, 10_000);
}

/// Invalid signals are rejected before the vault is read.
#[tokio::test]
async fn invalid_signals_rejected() {
    let (_vault, orchestrator) = setup(PaperVault::default());
    let mut req = request(60);
    req.signals.risk = f64::NAN;

    let err = orchestrator.rebalance_settled(&req).await.unwrap_err();
    assert!(matches!(err, RebalancerError::Validation(_)));
}
