//! `stop_all`, `verify_all` and `start_and_verify` end to end, with the
//! process table, kernel and container runtime faked.

mod common;

use common::{
    stack_config, FakeControlPlane, FakeHost, FakeProcess, FakeRuntime, FlakyProbe, StaticProbe,
};
use stack_reconcile::config::{Config, ControlPlaneConfig, Tier};
use stack_reconcile::orphan::{Classification, SignalKind};
use stack_reconcile::report::LineStatus;
use stack_reconcile::{Error, HealthTarget, Orchestrator};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const CACHE_PORT: u16 = 46379;
const API_PORT: u16 = 48091;
const DASHBOARD_PORT: u16 = 43000;

fn build(config: Config, host: &Arc<FakeHost>, runtime: &Arc<FakeRuntime>) -> Orchestrator {
    Orchestrator::builder()
        .config(config)
        .runtime(runtime.clone())
        .inspector(host.clone())
        .signaller(host.clone())
        .build()
        .expect("orchestrator should build")
}

// =============================================================================
// stop_all
// =============================================================================

#[tokio::test]
async fn test_stop_reclaims_ports_from_orphans() {
    let host = Arc::new(FakeHost::new());
    host.spawn(FakeProcess::host(5001, "java -jar stack-api.jar", &[API_PORT]).stubborn());
    host.spawn(FakeProcess::host(5002, "stack-api-worker --queue default", &[]));
    let runtime = Arc::new(FakeRuntime::new());
    let orchestrator = build(stack_config(), &host, &runtime);

    let report = orchestrator.stop_all().await.unwrap();

    let mut calls = runtime.calls();
    calls.sort();
    assert_eq!(
        calls,
        vec!["rm stack-cache", "rm stack-db", "stop stack-cache", "stop stack-db"]
    );
    assert!(report.external.iter().all(|a| a.succeeded()));
    assert_eq!(
        host.signals_to(5001),
        vec![SignalKind::Terminate, SignalKind::Kill]
    );
    assert_eq!(host.signals_to(5002), vec![SignalKind::Terminate]);
    assert_eq!(report.termination.killed.len(), 2);
    assert!(report.is_success());
    assert_eq!(report.exit_code(), 0);
    assert!(!report.already_clean());

    assert_eq!(report.ports.len(), 3);
    assert!(report
        .lines()
        .iter()
        .all(|line| line.status == LineStatus::Pass));
    assert_eq!(report.summary(), "Result: 3 passed, 0 failed");
}

#[tokio::test]
async fn test_stop_twice_is_already_clean() {
    let host = Arc::new(FakeHost::new());
    host.spawn(FakeProcess::host(5101, "java -jar stack-api.jar", &[API_PORT]));
    let runtime = Arc::new(FakeRuntime::new());
    let orchestrator = build(stack_config(), &host, &runtime);

    let first = orchestrator.stop_all().await.unwrap();
    assert_eq!(first.termination.killed.len(), 1);
    let signals_after_first = host.signals().len();

    let second = orchestrator.stop_all().await.unwrap();
    assert!(second.already_clean());
    assert!(second.termination.killed.is_empty());
    assert!(second.candidates.is_empty());
    assert_eq!(second.exit_code(), 0);
    assert_eq!(host.signals().len(), signals_after_first);
}

#[tokio::test]
async fn test_runtime_failure_does_not_abort_stop() {
    let host = Arc::new(FakeHost::new());
    host.spawn(FakeProcess::host(5201, "java -jar stack-api.jar", &[API_PORT]));
    let runtime = Arc::new(FakeRuntime::new().failing("stack-db"));
    let orchestrator = build(stack_config(), &host, &runtime);

    let report = orchestrator.stop_all().await.unwrap();

    let failed: Vec<&str> = report
        .external
        .iter()
        .filter(|a| !a.succeeded())
        .map(|a| a.action.as_str())
        .collect();
    assert_eq!(failed, vec!["stop stack-db", "remove stack-db"]);
    assert!(report.termination.killed.contains(&5201));
    assert_eq!(report.exit_code(), 0, "ports decide the exit code");
}

#[tokio::test]
async fn test_missing_container_is_skipped() {
    let host = Arc::new(FakeHost::new());
    let runtime = Arc::new(FakeRuntime::new().absent("stack-db"));
    let orchestrator = build(stack_config(), &host, &runtime);

    let report = orchestrator.stop_all().await.unwrap();

    let mut calls = runtime.calls();
    calls.sort();
    assert_eq!(calls, vec!["rm stack-cache", "stop stack-cache"]);
    assert!(report.already_clean());
}

#[tokio::test]
async fn test_container_and_unknown_owners_are_left_alone() {
    let host = Arc::new(FakeHost::new());
    host.spawn(FakeProcess::in_container(
        5301,
        "/usr/bin/docker-proxy -host-port 46379",
        &[CACHE_PORT],
    ));
    host.spawn(FakeProcess::host(5302, "python3 -m http.server 43000", &[DASHBOARD_PORT]));
    let runtime = Arc::new(FakeRuntime::new());
    let orchestrator = build(stack_config(), &host, &runtime);

    let report = orchestrator.stop_all().await.unwrap();

    assert!(host.signals().is_empty(), "nothing here is an orphan");
    assert!(host.alive(5301));
    assert!(host.alive(5302));
    assert_eq!(report.exit_code(), 1);

    let unknown: Vec<u32> = report.unknown().map(|c| c.process.pid).collect();
    assert_eq!(unknown, vec![5302]);

    let lines: Vec<String> = report.lines().iter().map(ToString::to_string).collect();
    assert!(lines[0].starts_with("WARN pid 5302 ("));
    assert!(lines
        .iter()
        .any(|l| l.starts_with("FAIL [INFRA] cache (port 46379 held by pid 5301")));
    assert!(lines
        .iter()
        .any(|l| l == "PASS [REQUIRED] api (port 48091 free)"));
    assert_eq!(report.summary(), "Result: 1 passed, 2 failed");
}

#[tokio::test]
async fn test_survivor_and_hidden_owner_fail_the_stop() {
    let host = Arc::new(FakeHost::new());
    host.spawn(FakeProcess::host(5401, "stack-api --port 48091", &[API_PORT]).unkillable());
    host.hold_hidden(CACHE_PORT);
    let runtime = Arc::new(FakeRuntime::new());
    let orchestrator = build(stack_config(), &host, &runtime);

    let report = orchestrator.stop_all().await.unwrap();

    assert!(report.termination.still_alive.contains(&5401));
    assert!(!report.is_success());

    let lines: Vec<String> = report.lines().iter().map(ToString::to_string).collect();
    assert!(lines.iter().any(|l| l.starts_with("WARN pid 5401 (")));
    assert!(lines.iter().any(|l| l
        == "FAIL [INFRA] cache (port 46379 in use, owner not visible to this user)"));
}

#[tokio::test]
async fn test_control_plane_scaled_down_before_reclamation() {
    let mut config = stack_config();
    config.control_plane = Some(ControlPlaneConfig {
        binary: "kubectl".to_string(),
        context: None,
        namespace: Some("dev".to_string()),
        workloads: BTreeMap::from([("api".to_string(), 2), ("worker".to_string(), 1)]),
        selector: Some("app=stack".to_string()),
        timeout: Duration::from_secs(5).into(),
    });
    let host = Arc::new(FakeHost::new());
    let runtime = Arc::new(FakeRuntime::new());
    let control_plane = Arc::new(FakeControlPlane::default());
    let orchestrator = Orchestrator::builder()
        .config(config)
        .runtime(runtime.clone())
        .control_plane(control_plane.clone())
        .inspector(host.clone())
        .signaller(host.clone())
        .health_targets(vec![HealthTarget::new(
            "api",
            Tier::Required,
            Arc::new(StaticProbe::up("127.0.0.1:48091")),
        )])
        .build()
        .unwrap();

    let report = orchestrator.stop_all().await.unwrap();
    assert!(report.already_clean());
    assert_eq!(
        control_plane.calls(),
        vec!["scale api=0", "scale worker=0", "delete app=stack"]
    );

    let started = orchestrator.start_and_verify(false).await.unwrap();
    assert_eq!(started.exit_code(), 0);
    assert_eq!(
        &control_plane.calls()[3..],
        &["scale api=2".to_string(), "scale worker=1".to_string()]
    );
}

#[tokio::test]
async fn test_plan_stop_sends_no_signals() {
    let host = Arc::new(FakeHost::new());
    host.spawn(FakeProcess::host(5501, "java -jar stack-api.jar", &[API_PORT]));
    host.spawn(FakeProcess::host(5502, "nginx", &[DASHBOARD_PORT]));
    let runtime = Arc::new(FakeRuntime::new());
    let orchestrator = build(stack_config(), &host, &runtime);

    let candidates = orchestrator.plan_stop().await;

    assert!(host.signals().is_empty());
    assert!(runtime.calls().is_empty());
    let classes: Vec<(u32, Classification)> = candidates
        .iter()
        .map(|c| (c.process.pid, c.classification))
        .collect();
    assert_eq!(
        classes,
        vec![(5501, Classification::Orphan), (5502, Classification::Unknown)]
    );

    let ports = orchestrator.port_status().await;
    let busy: Vec<u16> = ports
        .iter()
        .filter(|p| !p.free)
        .map(|p| p.service.port)
        .collect();
    assert_eq!(busy, vec![API_PORT, DASHBOARD_PORT]);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancel_before_stop_touches_nothing() {
    let host = Arc::new(FakeHost::new());
    host.spawn(FakeProcess::host(5601, "java -jar stack-api.jar", &[API_PORT]));
    let runtime = Arc::new(FakeRuntime::new());
    let orchestrator = build(stack_config(), &host, &runtime);

    orchestrator.cancel_operations();
    let result = orchestrator.stop_all().await;

    assert!(matches!(result, Err(Error::Cancelled(_))));
    assert!(runtime.calls().is_empty());
    assert!(host.signals().is_empty());
}

#[tokio::test]
async fn test_cancel_during_termination_then_rerun() {
    let mut config = stack_config();
    config.termination.grace = Duration::from_secs(5).into();
    let host = Arc::new(FakeHost::new());
    host.spawn(FakeProcess::host(5701, "java -jar stack-api.jar", &[API_PORT]).stubborn());
    let runtime = Arc::new(FakeRuntime::new());
    let orchestrator = build(config, &host, &runtime);

    let token = orchestrator.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    match orchestrator.stop_all().await {
        Err(Error::Cancelled(phase)) => assert_eq!(phase, "termination"),
        other => panic!("expected cancellation, got {:?}", other),
    }
    assert_eq!(host.signals_to(5701), vec![SignalKind::Terminate]);
    assert!(host.alive(5701));

    // A fresh run picks up where the cancelled one stopped
    let rerun = build(stack_config(), &host, &runtime);
    let report = rerun.stop_all().await.unwrap();
    assert!(report.termination.killed.contains(&5701));
    assert!(report.is_success());
}

// =============================================================================
// verify_all / start_and_verify
// =============================================================================

#[tokio::test]
async fn test_verify_all_uses_configured_tiers() {
    let host = Arc::new(FakeHost::new());
    let runtime = Arc::new(FakeRuntime::new());
    let orchestrator = Orchestrator::builder()
        .config(stack_config())
        .runtime(runtime)
        .inspector(host.clone())
        .signaller(host)
        .health_targets(vec![
            HealthTarget::new("cache", Tier::Infra, Arc::new(StaticProbe::up("cache"))),
            HealthTarget::new("api", Tier::Required, Arc::new(StaticProbe::up("api"))),
            HealthTarget::new(
                "dashboard",
                Tier::Optional,
                Arc::new(StaticProbe::down("dashboard")),
            ),
        ])
        .build()
        .unwrap();

    let report = orchestrator.verify_all(false).await;
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.exit_code(), 0);

    let report = orchestrator.verify_all(true).await;
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.skip_count, 1);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_start_retries_until_ready() {
    let mut config = stack_config();
    config.start.interval = Duration::from_millis(20).into();
    let host = Arc::new(FakeHost::new());
    let runtime = Arc::new(FakeRuntime::new());
    let api = Arc::new(FlakyProbe::new("127.0.0.1:48091", 2));
    let orchestrator = Orchestrator::builder()
        .config(config)
        .runtime(runtime.clone())
        .inspector(host.clone())
        .signaller(host)
        .health_targets(vec![HealthTarget::new("api", Tier::Required, api.clone())])
        .start_wait(Duration::from_secs(5))
        .build()
        .unwrap();

    let report = orchestrator.start_and_verify(false).await.unwrap();

    assert_eq!(runtime.calls(), vec!["start stack-cache", "start stack-db"]);
    assert_eq!(report.attempts, 3);
    assert_eq!(api.calls(), 3);
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_start_gives_up_at_deadline() {
    let mut config = stack_config();
    config.start.interval = Duration::from_millis(20).into();
    let host = Arc::new(FakeHost::new());
    let runtime = Arc::new(FakeRuntime::new().failing("stack-db"));
    let orchestrator = Orchestrator::builder()
        .config(config)
        .runtime(runtime)
        .inspector(host.clone())
        .signaller(host)
        .health_targets(vec![HealthTarget::new(
            "db",
            Tier::Infra,
            Arc::new(StaticProbe::down("127.0.0.1:45432")),
        )])
        .start_wait(Duration::from_millis(150))
        .build()
        .unwrap();

    let report = orchestrator.start_and_verify(false).await.unwrap();

    assert!(report.attempts >= 2);
    assert_eq!(report.exit_code(), 1);
    assert!(report.external.iter().any(|a| !a.succeeded()));
}
