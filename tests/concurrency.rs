// ABOUTME: Integration tests for per-pod serialization, fan-out bounds, deadlines, and prune.
// ABOUTME: Uses latency injection on the in-memory runtime to force overlap.

mod support;

use std::time::Duration;

use podvisor::pod::{MemberError, OutcomeKind, Payload, PodCommand, PodState};
use podvisor::runtime::{ContainerAction, ContainerState};
use support::{fast_options, harness, harness_with};
use tokio_util::sync::CancellationToken;

use ContainerState::{Exited, Running};

#[tokio::test]
async fn concurrent_start_and_stop_never_interleave() {
    let h = harness();
    h.pod("web", &[("a", Exited), ("b", Exited), ("c", Exited)]).await;
    for m in ["a", "b", "c"] {
        h.runtime
            .delay(&h.container("web", m), Duration::from_millis(20));
    }

    let start = {
        let service = h.service.clone();
        tokio::spawn(async move { service.apply("web", PodCommand::Start).await })
    };
    let stop = {
        let service = h.service.clone();
        tokio::spawn(async move {
            service
                .apply("web", PodCommand::Stop { timeout: Some(0) })
                .await
        })
    };

    let start = start.await.unwrap().unwrap();
    let stop = stop.await.unwrap().unwrap();
    assert_ne!(start.kind(), OutcomeKind::PartialFailure);
    assert_ne!(stop.kind(), OutcomeKind::PartialFailure);

    // One operation's calls all precede the other's.
    let actions: Vec<_> = h.runtime.calls().into_iter().map(|(a, _)| a).collect();
    let switches = actions.windows(2).filter(|w| w[0] != w[1]).count();
    assert!(switches <= 1, "calls interleaved: {actions:?}");

    let state = h.service.registry().resolve("web").unwrap().state();
    assert!(matches!(state, PodState::Running | PodState::Stopped));
}

#[tokio::test]
async fn different_pods_run_concurrently() {
    let h = harness();
    h.pod("one", &[("a", Exited)]).await;
    h.pod("two", &[("a", Exited)]).await;
    h.runtime
        .delay(&h.container("one", "a"), Duration::from_millis(50));
    h.runtime
        .delay(&h.container("two", "a"), Duration::from_millis(50));

    let (a, b) = tokio::join!(
        h.service.apply("one", PodCommand::Start),
        h.service.apply("two", PodCommand::Start)
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(h.runtime.max_in_flight(), 2);
}

#[tokio::test]
async fn member_fan_out_is_bounded() {
    let h = harness_with(fast_options(Duration::from_secs(5), 2));
    let members: Vec<(String, ContainerState)> =
        (0..6).map(|i| (format!("m{i}"), Exited)).collect();
    let members: Vec<(&str, ContainerState)> =
        members.iter().map(|(id, s)| (id.as_str(), *s)).collect();
    h.pod("wide", &members).await;
    for (id, _) in &members {
        h.runtime
            .delay(&h.container("wide", id), Duration::from_millis(15));
    }

    let outcome = h.service.apply("wide", PodCommand::Start).await.unwrap();

    assert_eq!(outcome.kind(), OutcomeKind::Success);
    assert_eq!(h.runtime.max_in_flight(), 2);
}

#[tokio::test]
async fn slow_member_times_out_as_member_failure() {
    let h = harness_with(fast_options(Duration::from_millis(30), 4));
    h.pod("web", &[("a", Exited), ("b", Exited)]).await;
    h.runtime
        .delay(&h.container("web", "b"), Duration::from_millis(500));

    let outcome = h.service.apply("web", PodCommand::Start).await.unwrap();

    let report = outcome.report().expect("partial failure");
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures.head.error,
        MemberError::TimedOut(_)
    ));
    assert_eq!(report.state, PodState::Degraded);
}

#[tokio::test]
async fn stop_deadline_includes_grace_period() {
    let h = harness_with(fast_options(Duration::from_millis(30), 4));
    h.pod("web", &[("a", Running)]).await;
    h.runtime
        .delay(&h.container("web", "a"), Duration::from_millis(100));

    let outcome = h
        .service
        .apply("web", PodCommand::Stop { timeout: Some(2) })
        .await
        .unwrap();

    assert_eq!(outcome.kind(), OutcomeKind::Success);
}

#[tokio::test]
async fn cancellation_skips_undispatched_members() {
    let h = harness_with(fast_options(Duration::from_secs(5), 1));
    h.pod("web", &[("a", Exited), ("b", Exited), ("c", Exited)]).await;
    for m in ["a", "b", "c"] {
        h.runtime
            .delay(&h.container("web", m), Duration::from_millis(60));
    }

    let cancel = CancellationToken::new();
    let trigger = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        })
    };

    let outcome = h
        .service
        .apply_with("web", PodCommand::Start, &cancel)
        .await
        .unwrap();
    trigger.await.unwrap();

    let report = outcome.report().expect("partial failure");
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.failures.len(), 2);
    assert!(
        report
            .failures
            .iter()
            .all(|f| matches!(f.error, MemberError::Cancelled))
    );
    // The member already started stays started.
    assert_eq!(
        h.runtime.state_of(&report.succeeded[0]),
        Some(ContainerState::Running)
    );
}

mod prune {
    use super::*;

    #[tokio::test]
    async fn removes_only_pods_without_active_members() {
        let h = harness();
        let stopped_a = h.pod("batch-a", &[("x", Exited)]).await;
        let stopped_b = h.pod("batch-b", &[("x", Exited), ("y", Exited)]).await;
        h.pod("web", &[("x", Running)]).await;

        let outcome = h.service.prune().await;

        let Some(Payload::Pruned(report)) = outcome.payload() else {
            panic!("expected prune report");
        };
        assert_eq!(report.removed, [stopped_a, stopped_b]);
        assert!(report.failures.is_empty());
        assert_eq!(h.service.registry().len(), 1);
        assert!(h.service.registry().resolve("web").is_ok());
        assert_eq!(h.runtime.state_of(&h.container("batch-b", "y")), None);
    }

    #[tokio::test]
    async fn pod_started_behind_the_registry_is_reported_not_removed() {
        let h = harness();
        h.pod("batch", &[("x", Exited)]).await;
        // Started outside podvisor; the cached state still says stopped.
        h.runtime
            .set_state(&h.container("batch", "x"), ContainerState::Running);

        let outcome = h.service.prune().await;

        let Some(Payload::Pruned(report)) = outcome.payload() else {
            panic!("expected prune report");
        };
        assert!(report.removed.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, OutcomeKind::Conflict);
        assert!(h.service.registry().resolve("batch").is_ok());
    }

    #[tokio::test]
    async fn failed_member_removal_is_reported() {
        let h = harness();
        h.pod("batch", &[("x", Exited)]).await;
        h.runtime
            .fail_on(&h.container("batch", "x"), ContainerAction::Remove, "busy");

        let outcome = h.service.prune().await;

        let Some(Payload::Pruned(report)) = outcome.payload() else {
            panic!("expected prune report");
        };
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, OutcomeKind::Fatal);
    }
}
