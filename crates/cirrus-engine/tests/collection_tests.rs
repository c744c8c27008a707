// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for collection runs, refresh triggers and the read facade.
//!
//! Each test builds an isolated TestHarness with temp SQLite and scripted
//! collectors. Tests are independent and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use cirrus_core::{
    AccountDirectory, CirrusError, CollectionScope, CredentialProvider, FailureKind,
    FreshnessFilter, FreshnessRecord, InventoryFilter, InventoryQuery, ServiceKind, Triple,
    GLOBAL_REGION,
};
use cirrus_engine::{
    ExportFormat, InventoryApi, Orchestrator, OrchestratorSettings, RUN_TIMEOUT_MESSAGE,
    RefreshAcceptance, RefreshTrigger, RunOptions, SkipReason, SweepSettings,
};
use cirrus_test_utils::{TestHarness, resource};

const EC2: ServiceKind = ServiceKind::ComputeInstance;

fn settings(harness: &TestHarness, max_concurrency: usize) -> OrchestratorSettings {
    OrchestratorSettings {
        regions: harness.regions().to_vec(),
        max_concurrency,
        retention: chrono::Duration::days(30),
        local_account_id: None,
    }
}

fn orchestrator_with(harness: &TestHarness, settings: OrchestratorSettings) -> Orchestrator {
    Orchestrator::new(
        Arc::clone(harness.directory()) as Arc<dyn AccountDirectory>,
        Arc::clone(harness.credentials()) as Arc<dyn CredentialProvider>,
        harness.registry(),
        harness.store(),
        harness.ledger(),
        settings,
    )
}

fn orchestrator(harness: &TestHarness) -> Orchestrator {
    orchestrator_with(harness, settings(harness, 4))
}

fn trigger(harness: &TestHarness) -> Arc<RefreshTrigger> {
    Arc::new(RefreshTrigger::new(
        orchestrator(harness),
        SweepSettings {
            ceiling: Duration::from_secs(60),
            skip_fresh_within: None,
        },
    ))
}

async fn ids_for(harness: &TestHarness, triple: &Triple) -> Vec<String> {
    let mut ids: Vec<String> = harness
        .store()
        .scan(&InventoryFilter::triple(triple))
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.resource_id)
        .collect();
    ids.sort();
    ids
}

async fn freshness_of(harness: &TestHarness, triple: &Triple) -> Option<FreshnessRecord> {
    harness
        .ledger()
        .freshness(&FreshnessFilter::triple(triple))
        .await
        .unwrap()
        .into_iter()
        .next()
}

fn ec2_scope() -> CollectionScope {
    CollectionScope::full().with_services([EC2])
}

// ---- Test 1: Failures stay inside their triple ----

#[tokio::test]
async fn test_denied_account_does_not_affect_others() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha"), ("B", "beta")])
        .with_services(&[EC2])
        .build()
        .await
        .unwrap();
    harness
        .collector(EC2)
        .set_resources("A", "us-east-1", &["i-1", "i-2", "i-3"]);
    harness.credentials().deny("B");

    let report = orchestrator(&harness)
        .run(&ec2_scope(), RunOptions::on_demand())
        .await;

    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    let b = Triple::new(EC2, "B", "us-east-1");
    assert_eq!(
        report.failure_for(&b).map(|f| f.kind),
        Some(FailureKind::AssumeRoleDenied)
    );

    let a = Triple::new(EC2, "A", "us-east-1");
    assert_eq!(ids_for(&harness, &a).await, ["i-1", "i-2", "i-3"]);
    assert!(ids_for(&harness, &b).await.is_empty());

    let a_fresh = freshness_of(&harness, &a).await.unwrap();
    assert!(a_fresh.last_success_at.is_some());
    assert_eq!(a_fresh.resource_count, 3);
    let b_fresh = freshness_of(&harness, &b).await.unwrap();
    assert!(b_fresh.last_success_at.is_none());
    assert!(b_fresh.last_error.unwrap().contains("assume role denied"));
}

// ---- Test 2: Reconciliation removes vanished resources ----

#[tokio::test]
async fn test_vanished_resource_is_removed_on_next_success() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha")])
        .with_services(&[EC2])
        .build()
        .await
        .unwrap();
    let orchestrator = orchestrator(&harness);
    let a = Triple::new(EC2, "A", "us-east-1");

    harness
        .collector(EC2)
        .set_resources("A", "us-east-1", &["i-123", "i-456"]);
    orchestrator.run(&ec2_scope(), RunOptions::on_demand()).await;
    assert_eq!(ids_for(&harness, &a).await, ["i-123", "i-456"]);

    harness.collector(EC2).set_resources("A", "us-east-1", &["i-456"]);
    let report = orchestrator.run(&ec2_scope(), RunOptions::on_demand()).await;
    assert_eq!(report.resources_written, 1);
    assert_eq!(report.resources_removed, 1);
    assert_eq!(ids_for(&harness, &a).await, ["i-456"]);
}

#[tokio::test]
async fn test_empty_listing_clears_triple() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha")])
        .with_services(&[EC2])
        .build()
        .await
        .unwrap();
    let orchestrator = orchestrator(&harness);
    let a = Triple::new(EC2, "A", "us-east-1");

    harness.collector(EC2).set_resources("A", "us-east-1", &["i-1"]);
    orchestrator.run(&ec2_scope(), RunOptions::on_demand()).await;
    harness.collector(EC2).set_resources("A", "us-east-1", &[]);
    let report = orchestrator.run(&ec2_scope(), RunOptions::on_demand()).await;

    assert!(report.is_clean());
    assert!(ids_for(&harness, &a).await.is_empty());
    assert_eq!(freshness_of(&harness, &a).await.unwrap().resource_count, 0);
}

// ---- Test 3: Failed listings keep the previous snapshot ----

#[tokio::test]
async fn test_pagination_failure_keeps_previous_records() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha")])
        .with_services(&[EC2])
        .build()
        .await
        .unwrap();
    let orchestrator = orchestrator(&harness);
    let a = Triple::new(EC2, "A", "us-east-1");

    let ids: Vec<String> = (0..40).map(|i| format!("i-{i:03}")).collect();
    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    harness.collector(EC2).set_resources("A", "us-east-1", &refs);
    orchestrator.run(&ec2_scope(), RunOptions::on_demand()).await;
    let first_success = freshness_of(&harness, &a).await.unwrap().last_success_at;
    assert!(first_success.is_some());

    harness.collector(EC2).set_failure("A", "us-east-1", || {
        CirrusError::CollectorPagination {
            service: EC2,
            region: "us-east-1".into(),
            pages_fetched: 2,
            message: "InternalError".into(),
        }
    });
    let report = orchestrator.run(&ec2_scope(), RunOptions::on_demand()).await;

    assert_eq!(report.failed, 1);
    assert_eq!(
        report.failure_for(&a).map(|f| f.kind),
        Some(FailureKind::CollectorPagination)
    );
    assert_eq!(ids_for(&harness, &a).await.len(), 40);
    let fresh = freshness_of(&harness, &a).await.unwrap();
    assert_eq!(fresh.last_success_at, first_success);
    assert_eq!(fresh.resource_count, 40);
    assert!(fresh.last_error.unwrap().contains("after 2 page(s)"));
}

#[tokio::test]
async fn test_success_after_failure_clears_last_error() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha")])
        .with_services(&[EC2])
        .build()
        .await
        .unwrap();
    let orchestrator = orchestrator(&harness);
    let a = Triple::new(EC2, "A", "us-east-1");

    harness.collector(EC2).set_failure("A", "us-east-1", || {
        CirrusError::ThrottleExceeded {
            attempts: 5,
            message: "Rate exceeded".into(),
        }
    });
    orchestrator.run(&ec2_scope(), RunOptions::on_demand()).await;
    assert!(freshness_of(&harness, &a).await.unwrap().last_error.is_some());

    harness.collector(EC2).set_resources("A", "us-east-1", &["i-1"]);
    orchestrator.run(&ec2_scope(), RunOptions::on_demand()).await;
    let fresh = freshness_of(&harness, &a).await.unwrap();
    assert!(fresh.last_error.is_none());
    assert_eq!(fresh.resource_count, 1);
}

// ---- Test 4: Idempotence ----

#[tokio::test]
async fn test_repeated_runs_converge() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha")])
        .with_regions(&["us-east-1", "eu-west-1"])
        .with_services(&[EC2])
        .build()
        .await
        .unwrap();
    let orchestrator = orchestrator(&harness);
    harness.collector(EC2).set_resources("A", "us-east-1", &["i-1", "i-2"]);
    harness.collector(EC2).set_resources("A", "eu-west-1", &["i-9"]);

    let first = orchestrator.run(&ec2_scope(), RunOptions::on_demand()).await;
    let second = orchestrator.run(&ec2_scope(), RunOptions::on_demand()).await;

    assert_eq!(first.resources_written, 3);
    assert_eq!(second.resources_written, 3);
    assert_eq!(second.resources_removed, 0);
    let all = harness
        .store()
        .scan(&InventoryFilter::service(EC2))
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
}

// ---- Test 5: Scope expansion ----

#[tokio::test]
async fn test_global_service_collected_once_per_account() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha"), ("B", "beta")])
        .with_regions(&["us-east-1", "eu-west-1", "ap-south-1"])
        .with_services(&[ServiceKind::IamRole])
        .build()
        .await
        .unwrap();
    harness
        .collector(ServiceKind::IamRole)
        .set_resources("A", GLOBAL_REGION, &["role-a"]);

    let report = orchestrator(&harness)
        .run(&CollectionScope::full(), RunOptions::on_demand())
        .await;

    assert_eq!(report.attempted, 2);
    let mut calls = harness.collector(ServiceKind::IamRole).calls();
    calls.sort();
    assert_eq!(
        calls,
        [
            ("A".to_string(), GLOBAL_REGION.to_string()),
            ("B".to_string(), GLOBAL_REGION.to_string())
        ]
    );
    let a = Triple::new(ServiceKind::IamRole, "A", GLOBAL_REGION);
    assert_eq!(ids_for(&harness, &a).await, ["role-a"]);
}

#[tokio::test]
async fn test_unknown_requested_account_is_ignored() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha")])
        .with_services(&[EC2])
        .build()
        .await
        .unwrap();
    let scope = CollectionScope::on_demand(Some(EC2), Some(vec!["A".into(), "Z".into()]));

    let triples = orchestrator(&harness).plan(&scope).await.unwrap();
    assert_eq!(triples, [Triple::new(EC2, "A", "us-east-1")]);
}

#[tokio::test]
async fn test_local_account_skips_role_assumption() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha"), ("B", "beta")])
        .with_services(&[EC2])
        .build()
        .await
        .unwrap();
    let mut settings = settings(&harness, 4);
    settings.local_account_id = Some("A".into());

    orchestrator_with(&harness, settings)
        .run(&ec2_scope(), RunOptions::on_demand())
        .await;

    let mut calls = harness.credentials().calls();
    calls.sort();
    assert_eq!(calls, [("A".to_string(), true), ("B".to_string(), false)]);
}

// ---- Test 6: Directory failures abort the run ----

#[tokio::test]
async fn test_directory_unavailable_aborts_without_collecting() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha")])
        .with_services(&[EC2])
        .build()
        .await
        .unwrap();
    harness.collector(EC2).set_resources("A", "us-east-1", &["i-1"]);
    orchestrator(&harness)
        .run(&ec2_scope(), RunOptions::on_demand())
        .await;

    harness.directory().set_unavailable("organization not reachable");
    let report = orchestrator(&harness)
        .run(&ec2_scope(), RunOptions::on_demand())
        .await;

    assert_eq!(
        report.aborted.as_ref().map(|a| a.kind),
        Some(FailureKind::DirectoryUnavailable)
    );
    assert_eq!(report.attempted, 0);
    assert_eq!(harness.collector(EC2).call_count(), 1);
    let a = Triple::new(EC2, "A", "us-east-1");
    assert_eq!(ids_for(&harness, &a).await, ["i-1"]);
}

// ---- Test 7: Worker pool bound ----

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_never_exceeds_bound() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha"), ("B", "beta"), ("C", "gamma")])
        .with_regions(&["us-east-1", "us-west-2"])
        .with_services(&[EC2])
        .build()
        .await
        .unwrap();
    harness.collector(EC2).set_delay(Duration::from_millis(40));

    let report = orchestrator_with(&harness, settings(&harness, 2))
        .run(&ec2_scope(), RunOptions::on_demand())
        .await;

    assert_eq!(report.succeeded, 6);
    assert_eq!(harness.collector(EC2).max_concurrent(), 2);
}

// ---- Test 8: Wall-clock ceiling ----

#[tokio::test]
async fn test_timeout_cancels_queued_and_detaches_running() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha")])
        .with_regions(&["us-east-1", "us-west-2", "eu-west-1"])
        .with_services(&[EC2])
        .build()
        .await
        .unwrap();
    let collector = harness.collector(EC2);
    collector.set_resources("A", "us-east-1", &["i-1"]);
    collector.set_resources("A", "us-west-2", &["i-2"]);
    collector.set_resources("A", "eu-west-1", &["i-3"]);
    collector.pause();

    let report = orchestrator_with(&harness, settings(&harness, 1))
        .run(
            &ec2_scope(),
            RunOptions::scheduled(Duration::from_millis(200), None),
        )
        .await;

    assert_eq!(report.failed, 3);
    assert_eq!(report.timed_out().count(), 3);
    let calls = collector.calls();
    assert_eq!(calls.len(), 1);
    let running = Triple::new(EC2, "A", calls[0].1.clone());

    let detached = report.failure_for(&running).unwrap();
    assert!(detached.message.contains("detached"));
    for failure in report.failures.iter().filter(|f| f.triple != running) {
        let fresh = freshness_of(&harness, &failure.triple).await.unwrap();
        assert_eq!(fresh.last_error.as_deref(), Some(RUN_TIMEOUT_MESSAGE));
        assert!(ids_for(&harness, &failure.triple).await.is_empty());
    }

    // The detached triple still finishes and records its own outcome.
    collector.resume();
    let mut finished = false;
    for _ in 0..100 {
        if let Some(fresh) = freshness_of(&harness, &running).await
            && fresh.last_success_at.is_some()
        {
            finished = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(finished);
    assert_eq!(ids_for(&harness, &running).await.len(), 1);
    assert_eq!(collector.call_count(), 1);
}

// ---- Test 9: Freshness-based skipping ----

#[tokio::test]
async fn test_sweep_skips_recently_collected_triples() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha")])
        .with_services(&[EC2])
        .build()
        .await
        .unwrap();
    let orchestrator = orchestrator(&harness);
    orchestrator.run(&ec2_scope(), RunOptions::on_demand()).await;

    let report = orchestrator
        .run(
            &ec2_scope(),
            RunOptions::scheduled(Duration::from_secs(60), Some(chrono::Duration::minutes(30))),
        )
        .await;

    assert_eq!(report.attempted, 0);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, SkipReason::Fresh);
    assert_eq!(harness.collector(EC2).call_count(), 1);
}

// ---- Test 10: On-demand refresh ----

#[tokio::test]
async fn test_overlapping_refresh_is_rejected_and_runs_once() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha"), ("B", "beta")])
        .with_services(&[EC2, ServiceKind::Network])
        .build()
        .await
        .unwrap();
    let trigger = trigger(&harness);
    harness.collector(EC2).pause();

    let first = trigger.on_demand(Some(EC2), None).await.unwrap();
    let RefreshAcceptance::Accepted(token) = first else {
        panic!("first refresh should be accepted");
    };
    assert_eq!(token.triples, 2);

    let second = trigger
        .on_demand(Some(EC2), Some(vec!["B".into()]))
        .await
        .unwrap();
    assert_eq!(second, RefreshAcceptance::AlreadyInProgress { overlapping: 1 });
    assert!(matches!(
        second.into_result(),
        Err(CirrusError::ScopeAlreadyInProgress { overlapping: 1 })
    ));

    // A disjoint scope is still accepted.
    let other = trigger
        .on_demand(Some(ServiceKind::Network), None)
        .await
        .unwrap();
    let other = other.into_result().unwrap();

    harness.collector(EC2).resume();
    let report = trigger.wait(&token).await.unwrap();
    assert_eq!(report.succeeded, 2);
    assert_eq!(harness.collector(EC2).call_count(), 2);
    assert!(trigger.wait(&other).await.unwrap().is_clean());
    assert!(trigger.orchestrator().inflight().is_empty());
}

#[tokio::test]
async fn test_scheduled_sweep_skips_triples_held_by_refresh() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha")])
        .with_services(&[EC2, ServiceKind::Network])
        .build()
        .await
        .unwrap();
    let trigger = trigger(&harness);
    harness.collector(EC2).pause();
    let token = trigger
        .on_demand(Some(EC2), None)
        .await
        .unwrap()
        .into_result()
        .unwrap();
    harness.collector(EC2).wait_for_calls(1).await;

    let report = trigger.on_schedule().await;
    assert_eq!(report.attempted, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, SkipReason::InProgress);
    assert_eq!(report.skipped[0].triple, Triple::new(EC2, "A", "us-east-1"));

    harness.collector(EC2).resume();
    let refreshed = trigger.wait(&token).await.unwrap();
    assert!(refreshed.is_clean());
    assert_eq!(harness.collector(EC2).call_count(), 1);
    assert!(trigger.orchestrator().inflight().is_empty());
}

#[tokio::test]
async fn test_refresh_fails_when_directory_unavailable() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.directory().set_unavailable("access denied");
    let err = trigger(&harness).on_demand(None, None).await.unwrap_err();
    assert!(matches!(err, CirrusError::DirectoryUnavailable { .. }));
}

// ---- Test 11: Read facade ----

fn api(harness: &TestHarness, account_ttl: Duration) -> InventoryApi {
    InventoryApi::new(
        harness.store(),
        harness.ledger(),
        Arc::clone(harness.directory()) as Arc<dyn AccountDirectory>,
        trigger(harness),
        account_ttl,
    )
}

#[tokio::test]
async fn test_account_list_is_cached_for_ttl() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha")])
        .build()
        .await
        .unwrap();
    let api = api(&harness, Duration::from_secs(300));

    assert_eq!(api.list_accounts().await.unwrap().len(), 1);
    harness
        .directory()
        .set_accounts(vec![cirrus_core::AccountInfo::new("B", "beta")]);
    let cached = api.list_accounts().await.unwrap();
    assert_eq!(cached[0].account_id, "A");
    assert_eq!(harness.directory().call_count(), 1);
}

#[tokio::test]
async fn test_account_list_failure_is_not_cached() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha")])
        .build()
        .await
        .unwrap();
    let api = api(&harness, Duration::ZERO);

    harness.directory().set_unavailable("throttled");
    assert!(api.list_accounts().await.is_err());
    harness
        .directory()
        .set_accounts(vec![cirrus_core::AccountInfo::new("A", "alpha")]);
    assert_eq!(api.list_accounts().await.unwrap().len(), 1);
    assert_eq!(harness.directory().call_count(), 2);
}

#[tokio::test]
async fn test_reads_survive_failed_collection() {
    let harness = TestHarness::builder()
        .with_accounts(&[("A", "alpha")])
        .with_services(&[EC2])
        .build()
        .await
        .unwrap();
    let api = api(&harness, Duration::from_secs(300));
    let collector = harness.collector(EC2);
    collector.set_script("A", "us-east-1", || {
        Ok(vec![
            resource("i-1", "running"),
            resource("i-2", "stopped"),
            resource("i-3", "running"),
        ])
    });
    api.trigger().on_schedule().await;

    collector.set_failure("A", "us-east-1", || CirrusError::Aws {
        code: Some("InternalFailure".into()),
        message: "boom".into(),
    });
    let report = api.trigger().on_schedule().await;
    assert_eq!(report.failed, 1);

    let page = api
        .get_inventory(&InventoryQuery::new(
            InventoryFilter::service(EC2),
            Some(1),
            Some(2),
        ))
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_pages, 2);

    let summary = api.summary(&InventoryFilter::service(EC2)).await.unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.running, 2);
    assert_eq!(summary.stopped, 1);

    let freshness = api.get_freshness(&FreshnessFilter::default()).await.unwrap();
    assert_eq!(freshness.len(), 1);
    assert!(freshness[0].last_success_at.is_some());
    assert!(freshness[0].last_error.as_deref().unwrap().contains("InternalFailure"));

    let csv = api
        .export(&InventoryFilter::service(EC2), ExportFormat::Csv)
        .await
        .unwrap();
    assert_eq!(csv.lines().next(), Some("accountId,region,resourceId,state"));
    assert_eq!(csv.lines().count(), 4);
}
