// ABOUTME: Integration tests for single-pod lifecycle commands.
// ABOUTME: Covers no-ops, conflicts, partial failures, multi-phase plans, and ordering.

mod support;

use podvisor::pod::{
    MemberError, MemberSpec, MemberState, OutcomeKind, Payload, PodCommand, PodError, PodSpec,
    PodState,
};
use podvisor::runtime::{ContainerAction, ContainerState};
use podvisor::types::{PodName, Signal};
use support::harness;

use ContainerState::{Exited, Paused, Running};

fn member_states(h: &support::Harness, pod: &str) -> Vec<MemberState> {
    h.service
        .registry()
        .resolve(pod)
        .unwrap()
        .members()
        .iter()
        .map(|m| m.state)
        .collect()
}

mod short_circuits {
    use super::*;

    #[tokio::test]
    async fn start_on_running_pod_is_noop() {
        let h = harness();
        h.pod("web", &[("a", Running), ("b", Running)]).await;

        let outcome = h.service.apply("web", PodCommand::Start).await.unwrap();

        assert_eq!(outcome.kind(), OutcomeKind::NotModified);
        assert!(h.runtime.calls().is_empty());
        assert_eq!(member_states(&h, "web"), [MemberState::Running; 2]);
    }

    #[tokio::test]
    async fn stop_on_stopped_pod_is_noop() {
        let h = harness();
        h.pod("web", &[("a", Exited)]).await;

        let outcome = h
            .service
            .apply("web", PodCommand::Stop { timeout: None })
            .await
            .unwrap();
        assert_eq!(outcome.kind(), OutcomeKind::NotModified);
    }

    #[tokio::test]
    async fn remove_running_pod_without_force_conflicts() {
        let h = harness();
        h.pod("web", &[("a", Running), ("b", Exited)]).await;

        let err = h
            .service
            .apply(
                "web",
                PodCommand::Remove {
                    force: false,
                    timeout: None,
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), OutcomeKind::Conflict);
        assert!(h.service.registry().resolve("web").is_ok());
        assert!(h.runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn kill_on_stopped_pod_conflicts() {
        let h = harness();
        h.pod("web", &[("a", Exited)]).await;

        let err = h
            .service
            .apply("web", PodCommand::Kill { signal: None })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), OutcomeKind::Conflict);
    }

    #[tokio::test]
    async fn bad_parameters_are_rejected_before_lookup() {
        let h = harness();

        let err = h
            .service
            .apply("missing", PodCommand::Stop { timeout: Some(-5) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), OutcomeKind::BadParameter);

        let err = h
            .service
            .apply("missing", PodCommand::Stop { timeout: None })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), OutcomeKind::NotFound);
    }
}

mod transitions {
    use super::*;

    #[tokio::test]
    async fn pause_twice_is_success_then_noop() {
        let h = harness();
        h.pod("web", &[("a", Running), ("b", Running)]).await;

        let first = h.service.apply("web", PodCommand::Pause).await.unwrap();
        assert_eq!(first.kind(), OutcomeKind::Success);
        let after_first = member_states(&h, "web");

        let second = h.service.apply("web", PodCommand::Pause).await.unwrap();
        assert_eq!(second.kind(), OutcomeKind::NotModified);
        assert_eq!(member_states(&h, "web"), after_first);
        assert_eq!(after_first, [MemberState::Paused; 2]);
    }

    #[tokio::test]
    async fn unpause_resumes_paused_members() {
        let h = harness();
        h.pod("web", &[("a", Paused), ("b", Paused)]).await;

        h.service.apply("web", PodCommand::Unpause).await.unwrap();

        assert_eq!(
            h.service.registry().resolve("web").unwrap().state(),
            PodState::Running
        );
    }

    #[tokio::test]
    async fn start_brings_mixed_pod_to_running() {
        let h = harness();
        h.pod("web", &[("a", Running), ("b", Exited), ("c", Paused)]).await;

        let outcome = h.service.apply("web", PodCommand::Start).await.unwrap();

        assert_eq!(outcome.kind(), OutcomeKind::Success);
        assert_eq!(member_states(&h, "web"), [MemberState::Running; 3]);
        assert!(
            !h.runtime
                .calls()
                .iter()
                .any(|(_, id)| id == &h.container("web", "a"))
        );
    }

    #[tokio::test]
    async fn kill_sends_configured_default_signal() {
        let h = harness();
        h.pod("web", &[("a", Running)]).await;

        h.service
            .apply("web", PodCommand::Kill { signal: None })
            .await
            .unwrap();

        assert_eq!(
            h.runtime.last_signal(&h.container("web", "a")),
            Some(Signal::KILL)
        );
        assert_eq!(member_states(&h, "web"), [MemberState::Stopped]);
    }

    #[tokio::test]
    async fn kill_with_explicit_signal() {
        let h = harness();
        h.pod("web", &[("a", Running)]).await;

        h.service
            .apply(
                "web",
                PodCommand::Kill {
                    signal: Some("SIGTERM".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            h.runtime.last_signal(&h.container("web", "a")),
            Some(Signal::TERM)
        );
    }

    #[tokio::test]
    async fn restart_stops_then_starts() {
        let h = harness();
        h.pod("web", &[("a", Running), ("b", Exited)]).await;

        let outcome = h
            .service
            .apply("web", PodCommand::Restart { timeout: Some(0) })
            .await
            .unwrap();

        assert_eq!(outcome.kind(), OutcomeKind::Success);
        let actions: Vec<_> = h.runtime.calls().into_iter().map(|(a, _)| a).collect();
        assert_eq!(
            actions,
            [
                ContainerAction::Stop,
                ContainerAction::Start,
                ContainerAction::Start
            ]
        );
        assert_eq!(member_states(&h, "web"), [MemberState::Running; 2]);
    }

    #[tokio::test]
    async fn forced_remove_stops_then_removes() {
        let h = harness();
        h.pod("web", &[("a", Running), ("b", Exited)]).await;

        let outcome = h
            .service
            .apply(
                "web",
                PodCommand::Remove {
                    force: true,
                    timeout: Some(1),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.kind(), OutcomeKind::Success);
        let calls = h.runtime.calls();
        assert_eq!(calls[0], (ContainerAction::Stop, h.container("web", "a")));
        assert_eq!(
            calls.iter().filter(|(a, _)| *a == ContainerAction::Remove).count(),
            2
        );
        assert!(h.service.registry().resolve("web").is_err());
        assert_eq!(h.runtime.state_of(&h.container("web", "a")), None);
        assert_eq!(h.service.registry().turnstile_count(), 0);
    }

    #[tokio::test]
    async fn remove_of_stopped_pod_needs_no_force() {
        let h = harness();
        h.pod("web", &[("a", Exited)]).await;

        h.service
            .apply(
                "web",
                PodCommand::Remove {
                    force: false,
                    timeout: None,
                },
            )
            .await
            .unwrap();

        assert!(h.service.registry().is_empty());
    }

    #[tokio::test]
    async fn remove_of_empty_pod_succeeds() {
        let h = harness();
        h.create(PodSpec::new(PodName::new("empty").unwrap())).await;

        let outcome = h
            .service
            .apply(
                "empty",
                PodCommand::Remove {
                    force: false,
                    timeout: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.kind(), OutcomeKind::Success);
        assert!(h.service.registry().is_empty());
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn unsaved_state_still_reports_member_results() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("pods.json");
        let h = support::harness_at(&state_file);
        h.pod("web", &[("a", Running), ("b", Running)]).await;
        h.runtime
            .fail_on(&h.container("web", "a"), ContainerAction::Stop, "device busy");
        // The temp file path is taken by a directory, so saving fails.
        std::fs::create_dir(dir.path().join("pods.tmp")).unwrap();

        let err = h
            .service
            .apply("web", PodCommand::Stop { timeout: Some(1) })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), OutcomeKind::Fatal);
        let PodError::Unsaved {
            succeeded,
            failures,
            ..
        } = &err
        else {
            panic!("expected unsaved error, got {err:?}");
        };
        assert_eq!(*succeeded, vec![h.container("web", "b")]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].container, h.container("web", "a"));
        assert_eq!(
            h.runtime.state_of(&h.container("web", "b")),
            Some(ContainerState::Exited)
        );
    }

    #[tokio::test]
    async fn one_failed_stop_of_three_is_partial_failure() {
        let h = harness();
        h.pod("web", &[("a", Running), ("b", Running), ("c", Running)]).await;
        h.runtime
            .fail_on(&h.container("web", "b"), ContainerAction::Stop, "device busy");

        let outcome = h
            .service
            .apply("web", PodCommand::Stop { timeout: Some(1) })
            .await
            .unwrap();

        assert_eq!(outcome.kind(), OutcomeKind::PartialFailure);
        let report = outcome.report().unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures.head.container, h.container("web", "b"));
        assert_eq!(report.failures.head.action, ContainerAction::Stop);
        assert_eq!(report.state, PodState::Degraded);
        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(
            h.service.registry().resolve("web").unwrap().state(),
            PodState::Degraded
        );
    }

    #[tokio::test]
    async fn every_member_failing_is_fatal() {
        let h = harness();
        h.pod("web", &[("a", Exited), ("b", Exited)]).await;
        for m in ["a", "b"] {
            h.runtime
                .fail_on(&h.container("web", m), ContainerAction::Start, "no image");
        }

        let err = h.service.apply("web", PodCommand::Start).await.unwrap_err();

        assert_eq!(err.kind(), OutcomeKind::Fatal);
        assert_eq!(err.failures().len(), 2);
    }

    #[tokio::test]
    async fn restart_with_failed_stop_is_fatal_but_restarts_the_rest() {
        let h = harness();
        h.pod("web", &[("a", Running), ("b", Running)]).await;
        h.runtime
            .fail_on(&h.container("web", "b"), ContainerAction::Stop, "stuck");

        let err = h
            .service
            .apply("web", PodCommand::Restart { timeout: Some(0) })
            .await
            .unwrap_err();

        let PodError::Fatal {
            state,
            succeeded,
            failures,
            ..
        } = err
        else {
            panic!("expected fatal error");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(succeeded, [h.container("web", "a")]);
        assert_eq!(state, PodState::Running);
        assert!(
            h.runtime
                .calls()
                .contains(&(ContainerAction::Start, h.container("web", "a")))
        );
        assert!(
            !h.runtime
                .calls()
                .contains(&(ContainerAction::Start, h.container("web", "b")))
        );
    }

    #[tokio::test]
    async fn forced_remove_keeps_members_that_failed_to_stop() {
        let h = harness();
        h.pod("web", &[("a", Running), ("b", Running)]).await;
        h.runtime
            .fail_on(&h.container("web", "b"), ContainerAction::Stop, "stuck");

        let outcome = h
            .service
            .apply(
                "web",
                PodCommand::Remove {
                    force: true,
                    timeout: Some(0),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.kind(), OutcomeKind::PartialFailure);
        let pod = h.service.registry().resolve("web").unwrap();
        let remaining: Vec<_> = pod.members().iter().map(|m| m.id.clone()).collect();
        assert_eq!(remaining, [h.container("web", "b")]);
        assert_eq!(pod.state(), PodState::Running);
    }

    #[tokio::test]
    async fn start_failure_reports_runtime_error() {
        let h = harness();
        h.pod("web", &[("a", Exited), ("b", Exited)]).await;
        h.runtime
            .fail_on(&h.container("web", "a"), ContainerAction::Start, "port taken");

        let outcome = h.service.apply("web", PodCommand::Start).await.unwrap();

        let failure = &outcome.report().unwrap().failures.head;
        assert!(matches!(failure.error, MemberError::Runtime(_)));
        assert!(failure.to_string().contains("port taken"));
    }
}

mod ordering {
    use super::*;

    async fn chain(h: &support::Harness) {
        for id in ["web", "api", "db"] {
            h.runtime.add_container(id, Exited);
        }
        h.create(
            PodSpec::new(PodName::new("stack").unwrap())
                .member(MemberSpec::new("web").depends_on("api"))
                .member(MemberSpec::new("api").depends_on("db"))
                .member(MemberSpec::new("db")),
        )
        .await;
    }

    fn order(h: &support::Harness, action: ContainerAction) -> Vec<String> {
        h.runtime
            .calls()
            .into_iter()
            .filter(|(a, _)| *a == action)
            .map(|(_, id)| id.to_string())
            .collect()
    }

    #[tokio::test]
    async fn start_runs_dependencies_first() {
        let h = harness();
        chain(&h).await;

        h.service.apply("stack", PodCommand::Start).await.unwrap();
        assert_eq!(order(&h, ContainerAction::Start), ["db", "api", "web"]);
    }

    #[tokio::test]
    async fn stop_runs_dependents_first() {
        let h = harness();
        chain(&h).await;
        h.service.apply("stack", PodCommand::Start).await.unwrap();

        h.service
            .apply("stack", PodCommand::Stop { timeout: Some(0) })
            .await
            .unwrap();
        assert_eq!(order(&h, ContainerAction::Stop), ["web", "api", "db"]);
    }

    #[tokio::test]
    async fn partial_remove_drops_edges_onto_removed_members() {
        let h = harness();
        for id in ["app-db", "app-web", "app-cache"] {
            h.runtime.add_container(id, Exited);
        }
        h.create(
            PodSpec::new(PodName::new("app").unwrap())
                .member(MemberSpec::new("app-db"))
                .member(MemberSpec::new("app-web").depends_on("app-db")),
        )
        .await;
        h.runtime
            .fail_on(&h.container("app", "web"), ContainerAction::Remove, "busy");

        let outcome = h
            .service
            .apply(
                "app",
                PodCommand::Remove {
                    force: false,
                    timeout: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.kind(), OutcomeKind::PartialFailure);

        let pod = h.service.registry().resolve("app").unwrap();
        assert_eq!(pod.members().len(), 1);
        assert_eq!(pod.members()[0].id, h.container("app", "web"));
        assert!(pod.members()[0].depends_on.is_empty());

        h.service
            .attach("app", MemberSpec::new("app-cache"))
            .await
            .unwrap();
        assert_eq!(h.service.registry().resolve("app").unwrap().members().len(), 2);
    }

    #[tokio::test]
    async fn cyclic_dependencies_are_rejected_at_create() {
        let h = harness();
        let err = h
            .service
            .create(
                PodSpec::new(PodName::new("loop").unwrap())
                    .member(MemberSpec::new("a").depends_on("b"))
                    .member(MemberSpec::new("b").depends_on("a")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), OutcomeKind::BadParameter);
    }
}

mod queries {
    use super::*;
    use podvisor::pod::PodFilter;

    #[tokio::test]
    async fn create_reads_member_states() {
        let h = harness();
        h.pod("web", &[("a", Running), ("b", Running)]).await;

        let outcome = h.service.inspect("web").unwrap();
        let Some(Payload::Snapshot(snapshot)) = outcome.payload() else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.state, PodState::Running);
        assert_eq!(snapshot.members.len(), 2);
    }

    #[tokio::test]
    async fn exists_and_inspect_resolve_prefixes() {
        let h = harness();
        let id = h.pod("frontend", &[("a", Running)]).await;

        assert!(h.service.exists("front").is_ok());
        assert!(h.service.exists(&id.as_str()[..8]).is_ok());
        assert_eq!(
            h.service.exists("backend").unwrap_err().kind(),
            OutcomeKind::NotFound
        );
    }

    #[tokio::test]
    async fn list_applies_filter() {
        let h = harness();
        h.pod("web", &[("a", Running)]).await;
        h.pod("batch", &[("a", Exited)]).await;

        let outcome = h.service.list(&PodFilter::new().state(PodState::Stopped));
        let Some(Payload::Pods(pods)) = outcome.payload() else {
            panic!("expected pods");
        };
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].name.as_str(), "batch");
    }

    #[tokio::test]
    async fn attach_adds_member_with_current_state() {
        let h = harness();
        h.pod("web", &[("a", Running)]).await;
        h.runtime.add_container("sidecar", Running);

        h.service
            .attach("web", MemberSpec::new("sidecar"))
            .await
            .unwrap();

        let pod = h.service.registry().resolve("web").unwrap();
        assert_eq!(pod.members().len(), 2);
        assert_eq!(pod.state(), PodState::Running);
    }

    #[tokio::test]
    async fn container_cannot_join_two_pods() {
        let h = harness();
        h.pod("web", &[("a", Running)]).await;

        let err = h
            .service
            .create(
                PodSpec::new(PodName::new("other").unwrap()).member(MemberSpec::new("web-a")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), OutcomeKind::Conflict);
    }
}
