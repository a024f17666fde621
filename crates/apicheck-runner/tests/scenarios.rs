//! End-to-end runs of the scenario catalog against an in-process stub.

mod helpers;

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use apicheck_core::{Config, FailureKind, Fixtures, ScenarioOutcome, Verdict, VerdictStatus};
use apicheck_runner::{RunnerError, ScenarioRunner};

use helpers::{DirectoryStub, StubOptions, refused_base_url};

fn fixtures() -> Fixtures {
    Fixtures::from_values(BTreeMap::from([("id".to_string(), 10.into())]))
}

fn config(base_url: &str) -> Config {
    Config {
        base_url: base_url.to_string(),
        seed: Some(7),
        ..Config::default()
    }
}

async fn run(config: &Config, filter: Option<&str>) -> Vec<ScenarioOutcome> {
    ScenarioRunner::new(config, &fixtures())
        .unwrap()
        .with_filter(filter)
        .unwrap()
        .run()
        .await
}

fn only(outcomes: &[ScenarioOutcome]) -> &ScenarioOutcome {
    assert_eq!(outcomes.len(), 1, "expected exactly one scenario");
    &outcomes[0]
}

fn failure_kind(outcome: &ScenarioOutcome) -> FailureKind {
    outcome
        .failure
        .as_ref()
        .map(|f| f.kind)
        .unwrap_or_else(|| panic!("{} passed unexpectedly", outcome.name))
}

// ═══════════════════════════════════════════
// Conforming server
// ═══════════════════════════════════════════

#[tokio::test]
async fn catalog_passes_against_conforming_server() {
    let stub = DirectoryStub::spawn(StubOptions::default()).await;
    let outcomes = run(&config(stub.base_url()), None).await;

    let failed: Vec<_> = outcomes
        .iter()
        .filter(|o| !o.passed())
        .map(|o| format!("{}: {:?}", o.name, o.failure))
        .collect();
    assert!(failed.is_empty(), "failures: {failed:#?}");

    let verdict = Verdict::from_outcomes(&outcomes);
    assert_eq!(verdict.status, VerdictStatus::Pass);
    assert_eq!(verdict.exit_code, 0);
}

#[tokio::test]
async fn outcomes_follow_catalog_order() {
    let stub = DirectoryStub::spawn(StubOptions::default()).await;
    let outcomes = run(&config(stub.base_url()), None).await;
    let names: Vec<_> = outcomes.iter().map(|o| o.name.as_str()).collect();
    let catalog: Vec<_> = apicheck_runner::catalog().iter().map(|s| s.name).collect();
    assert_eq!(names, catalog);
}

#[tokio::test]
async fn sampled_user_is_refetched() {
    let stub = DirectoryStub::spawn(StubOptions::default()).await;
    let outcome = run(&config(stub.base_url()), Some("named Gogol")).await;
    let outcome = only(&outcome);
    assert!(outcome.passed(), "{:?}", outcome.failure);
    assert_eq!(outcome.calls, 2);
}

#[tokio::test]
async fn plain_http_requests_reach_both_endpoints() {
    let stub = DirectoryStub::spawn(StubOptions::default()).await;
    let outcomes = run(&config(stub.base_url()), Some("plain http")).await;

    let endpoints: Vec<_> = outcomes.iter().map(|o| o.endpoint.as_str()).collect();
    assert_eq!(endpoints, ["/api/test/user/{id}", "/api/test/users"]);
    assert!(outcomes.iter().all(|o| o.passed()), "{outcomes:#?}");
    assert_eq!(stub.hits(), 2);
}

#[test]
fn illegal_configured_header_stops_the_run() {
    let config = Config {
        headers: HashMap::from([("X-Trace".to_string(), "a\nb".to_string())]),
        ..config("http://127.0.0.1:9")
    };
    let err = ScenarioRunner::new(&config, &fixtures()).err().unwrap();
    assert!(matches!(err, RunnerError::Executor(_)), "{err}");
}

// ═══════════════════════════════════════════
// Broken servers
// ═══════════════════════════════════════════

#[tokio::test]
async fn overlapping_genders_break_disjointness() {
    let stub = DirectoryStub::spawn(StubOptions {
        overlap_genders: true,
        ..StubOptions::default()
    })
    .await;
    let outcomes = run(&config(stub.base_url()), Some("partition")).await;
    let outcome = only(&outcomes);

    assert_eq!(failure_kind(outcome), FailureKind::InvariantViolation);
    let message = &outcome.failure.as_ref().unwrap().message;
    assert!(message.contains("disjointness(male, female)"), "{message}");
    assert!(message.contains("10"), "{message}");
}

#[tokio::test]
async fn empty_filtered_list_is_setup_failure() {
    let stub = DirectoryStub::spawn(StubOptions {
        empty_filters: true,
        ..StubOptions::default()
    })
    .await;
    let outcomes = run(&config(stub.base_url()), Some("Novosibirsk")).await;
    assert_eq!(failure_kind(only(&outcomes)), FailureKind::SetupFailure);

    let verdict = Verdict::from_outcomes(&outcomes);
    assert_eq!(verdict.exit_code, 1);
}

#[tokio::test]
async fn slow_server_exceeds_scenario_budget() {
    let stub = DirectoryStub::spawn(StubOptions {
        delay: Duration::from_millis(500),
        ..StubOptions::default()
    })
    .await;
    let config = Config {
        scenario_timeout_ms: Some(50),
        ..config(stub.base_url())
    };
    let outcomes = run(&config, Some("unknown id")).await;
    let outcome = only(&outcomes);

    assert_eq!(failure_kind(outcome), FailureKind::Timeout);
    assert!(outcome.duration_ms < 500);
    assert_eq!(Verdict::from_outcomes(&outcomes).exit_code, 2);
}

#[tokio::test]
async fn slow_response_violates_sla() {
    let stub = DirectoryStub::spawn(StubOptions {
        delay: Duration::from_millis(150),
        ..StubOptions::default()
    })
    .await;
    let config = Config {
        response_time_limit_ms: 100,
        scenario_timeout_ms: Some(5_000),
        ..config(stub.base_url())
    };
    let outcomes = run(&config, Some("unknown id")).await;
    let outcome = only(&outcomes);

    assert_eq!(failure_kind(outcome), FailureKind::ContractViolation);
    let message = &outcome.failure.as_ref().unwrap().message;
    assert!(message.starts_with("GET /api/test/user/9: duration"), "{message}");
}

#[tokio::test]
async fn refused_connection_is_transport_failure() {
    let config = Config {
        transport_retries: 2,
        ..config(&refused_base_url().await)
    };
    let outcomes = run(&config, Some("whitespace")).await;
    let outcome = only(&outcomes);

    assert_eq!(failure_kind(outcome), FailureKind::Transport);
    assert_eq!(Verdict::from_outcomes(&outcomes).exit_code, 3);
}

#[tokio::test]
async fn failures_stay_scenario_local() {
    let stub = DirectoryStub::spawn(StubOptions {
        overlap_genders: true,
        ..StubOptions::default()
    })
    .await;
    let outcomes = run(&config(stub.base_url()), None).await;

    let failed: Vec<_> = outcomes.iter().filter(|o| !o.passed()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].name, "gender lists partition the directory");
}
