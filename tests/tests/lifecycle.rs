
use std::time::Duration;

use common::{harness, harness_with, url, wait_until};
use devreload_kernel::{ArtifactDescriptor, OrchestratorState, ReloadEvent};
use devreload_runtime::{LibraryContext, OrchestratorError, ReloadOrchestrator, TickOutcome};
use devreload_testing::{Call, CallLog, ManifestFixture, StubHost, assert_called};
use std::sync::Arc;
use std::sync::atomic::Ordering;

#[test]
fn test_preload_keeps_manifest_order() {
    let mut fixture = ManifestFixture::new().unwrap();
    fixture
        .write(&[
            fixture.line(None, "libcore.so"),
            fixture.line(Some("scripts"), "scripts"),
            fixture.line(Some("bundle"), "libwidgets.so"),
            fixture.line(Some("resources"), "i18n"),
        ])
        .unwrap();
    let mut h = harness(fixture.config());

    h.orchestrator.preload().unwrap();

    let active = h.orchestrator.current_artifacts().unwrap();
    assert_eq!(
        active.as_slice(),
        &[
            fixture.archive("libcore.so"),
            ArtifactDescriptor::auxiliary_directory(fixture.artifact("scripts")),
            fixture.archive("libwidgets.so"),
            ArtifactDescriptor::resource_fragment(fixture.artifact("i18n")),
        ]
    );
    // Directories wait for the host framework
    assert_eq!(
        h.log.take(),
        vec![
            Call::Reset,
            Call::LoadArchives(vec![
                url(fixture.artifact("libcore.so")),
                url(fixture.artifact("libwidgets.so")),
            ]),
        ]
    );
    assert_eq!(h.orchestrator.state(), OrchestratorState::Preloaded);
}

#[test]
fn test_absent_manifest() {
    let fixture = ManifestFixture::new().unwrap();
    let mut h = harness(fixture.config());

    h.orchestrator.preload().unwrap();
    assert!(h.orchestrator.current_artifacts().is_none());
    assert!(h.log.is_empty(), "loading context must stay untouched");

    h.orchestrator.start().unwrap();
    assert_eq!(h.log.take(), vec![Call::HostStart, Call::Flush]);
    assert_called!(h.log, Call::Deploy(_), 0);

    // Ticks stay quiet until the manifest shows up
    for _ in 0..3 {
        assert_eq!(h.orchestrator.poll().unwrap(), TickOutcome::Unchanged);
    }
    assert!(h.log.is_empty());
}

#[test]
fn test_empty_manifest_is_treated_as_absent() {
    let mut fixture = ManifestFixture::new().unwrap();
    fixture.write(&["# nothing checked out yet", ""]).unwrap();
    let mut h = harness(fixture.config());

    h.orchestrator.preload().unwrap();
    assert!(h.orchestrator.current_artifacts().is_none());
    assert!(h.log.is_empty());
}

#[test]
fn test_malformed_manifest_at_preload_is_ignored() {
    let mut fixture = ManifestFixture::new().unwrap();
    fixture
        .write(&[fixture.line(Some("widgets"), "libwidgets.so")])
        .unwrap();
    let mut h = harness(fixture.config());

    h.orchestrator.start().unwrap();
    assert!(h.orchestrator.current_artifacts().is_none());
    assert_eq!(h.log.take(), vec![Call::HostStart, Call::Flush]);
}

#[test]
fn test_start_with_one_archive() {
    let mut fixture = ManifestFixture::new().unwrap();
    fixture.write(&[fixture.line(None, "liba.so")]).unwrap();
    let mut h = harness(fixture.config());

    h.orchestrator.start().unwrap();

    let a = fixture.archive("liba.so");
    assert_eq!(
        h.log.take(),
        vec![
            Call::Reset,
            Call::LoadArchives(vec![url(fixture.artifact("liba.so"))]),
            Call::HostStart,
            Call::Deploy(vec![a.clone()]),
            Call::Flush,
        ]
    );
    assert_eq!(
        h.orchestrator.current_artifacts().unwrap().as_slice(),
        &[a]
    );
    assert_eq!(h.orchestrator.state(), OrchestratorState::Running);
}

#[test]
fn test_start_installs_retained_directories_after_host_start() {
    let mut fixture = ManifestFixture::new().unwrap();
    fixture
        .write(&[
            fixture.line(None, "liba.so"),
            fixture.line(Some("seam"), "scripts"),
            fixture.line(Some("resources"), "i18n"),
        ])
        .unwrap();
    let mut h = harness(fixture.config());

    h.orchestrator.start().unwrap();

    let calls = h.log.take();
    assert_eq!(
        &calls[2..],
        &[
            Call::HostStart,
            Call::InstallAuxiliary(vec![fixture.artifact("scripts")]),
            Call::InstallFragments(vec![fixture.artifact("i18n")]),
            Call::Deploy(vec![
                fixture.archive("liba.so"),
                ArtifactDescriptor::auxiliary_directory(fixture.artifact("scripts")),
                ArtifactDescriptor::resource_fragment(fixture.artifact("i18n")),
            ]),
            Call::Flush,
        ]
    );
}

#[test]
fn test_host_starts_when_preloaded_archives_fail_to_load() {
    let mut fixture = ManifestFixture::new().unwrap();
    fixture.write(&[fixture.line(None, "liba.so")]).unwrap();
    let mut h = harness(fixture.config());
    h.archive_failure.store(true, Ordering::SeqCst);

    h.orchestrator.start().unwrap();

    let a = fixture.archive("liba.so");
    assert_eq!(
        h.log.take(),
        vec![
            Call::Reset,
            Call::LoadArchives(vec![url(fixture.artifact("liba.so"))]),
            Call::HostStart,
            Call::Deploy(vec![a.clone()]),
            Call::Flush,
        ]
    );
    assert_eq!(h.orchestrator.current_artifacts().unwrap().as_slice(), &[a]);
    assert_eq!(h.orchestrator.state(), OrchestratorState::Running);
}

#[test]
fn test_unbuilt_library_does_not_block_start() {
    let mut fixture = ManifestFixture::new().unwrap();
    fixture.write(&[fixture.line(None, "libnotbuilt.so")]).unwrap();
    let log = CallLog::new();
    let mut orchestrator = ReloadOrchestrator::new(
        fixture.config(),
        Arc::new(StubHost::new(log.clone())),
        Box::new(LibraryContext::new()),
    );

    orchestrator.start().unwrap();

    assert_eq!(
        log.calls(),
        vec![
            Call::HostStart,
            Call::Deploy(vec![fixture.archive("libnotbuilt.so")]),
            Call::Flush,
        ]
    );
    assert_eq!(orchestrator.state(), OrchestratorState::Running);
}

#[test]
fn test_bind_failure_stops_the_host() {
    let fixture = ManifestFixture::new().unwrap();
    let mut h = harness_with(fixture.config(), |host| host.failing_bind());

    let err = h.orchestrator.start().unwrap_err();
    assert!(matches!(err.current_context(), OrchestratorError::Bind));
    assert_eq!(h.log.take(), vec![Call::HostStart, Call::HostStop]);
    assert_eq!(h.orchestrator.state(), OrchestratorState::Preloaded);
}

#[test]
fn test_host_start_failure_propagates() {
    let fixture = ManifestFixture::new().unwrap();
    let mut h = harness_with(fixture.config(), |host| host.failing_start());

    let err = h.orchestrator.start().unwrap_err();
    assert!(matches!(err.current_context(), OrchestratorError::HostStart));
    assert_called!(h.log, Call::Flush, 0);
}

#[test]
fn test_scheduler_disabled() {
    let fixture = ManifestFixture::new().unwrap();
    let mut h = harness(fixture.config());

    h.orchestrator.start().unwrap();
    assert!(!h.orchestrator.is_polling());

    h.orchestrator.stop().unwrap();
    assert_eq!(h.log.calls().last(), Some(&Call::HostStop));
    assert_eq!(h.orchestrator.state(), OrchestratorState::Stopped);
}

#[test]
fn test_scheduler_reloads_in_background() {
    let mut fixture = ManifestFixture::new().unwrap();
    let mut h = harness(fixture.config().with_reload_timer(true));

    h.orchestrator.start().unwrap();
    assert!(h.orchestrator.is_polling());

    fixture.write(&[fixture.line(None, "liba.so")]).unwrap();
    let deployed = wait_until(Duration::from_secs(10), || {
        h.log.last_deployed() == Some(vec![fixture.archive("liba.so")])
    });
    assert!(deployed, "poll scheduler never picked up the manifest");

    h.orchestrator.stop().unwrap();
    assert!(!h.orchestrator.is_polling());
    assert_eq!(h.log.calls().last(), Some(&Call::HostStop));
}

#[test]
fn test_lifecycle_misuse_is_rejected() {
    let fixture = ManifestFixture::new().unwrap();
    let mut h = harness(fixture.config());

    assert!(matches!(
        h.orchestrator.stop().unwrap_err().current_context(),
        OrchestratorError::InvalidState { .. }
    ));
    h.orchestrator.start().unwrap();
    assert!(h.orchestrator.start().is_err());
}

#[test]
fn test_component_index_is_written() {
    let fixture = ManifestFixture::new().unwrap();
    let mut h = harness_with(fixture.config(), |host| {
        host.with_registry_dump("component a\ncomponent b\n")
    });

    h.orchestrator.start().unwrap();

    let index = fixture
        .home()
        .parent()
        .unwrap()
        .join("sdk")
        .join("components.index");
    assert_eq!(
        std::fs::read_to_string(index).unwrap(),
        "component a\ncomponent b\n"
    );
}

#[test]
fn test_component_index_failure_is_swallowed() {
    let fixture = ManifestFixture::new().unwrap();
    // Parent of the index path is a regular file
    let blocker = fixture.home().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    let config = fixture
        .config()
        .with_component_index(blocker.join("components.index"));
    let mut h = harness_with(config, |host| host.with_registry_dump("component a\n"));

    h.orchestrator.start().unwrap();
    assert_eq!(h.orchestrator.state(), OrchestratorState::Running);
    assert_called!(h.log, Call::Flush, 1);
}

#[test]
fn test_events_follow_the_lifecycle() {
    let mut fixture = ManifestFixture::new().unwrap();
    let mut h = harness(fixture.config());
    let events = h.orchestrator.subscribe();

    h.orchestrator.start().unwrap();
    fixture.write(&[fixture.line(None, "liba.so")]).unwrap();
    assert!(matches!(
        h.orchestrator.poll().unwrap(),
        TickOutcome::Reloaded(_)
    ));
    h.orchestrator.stop().unwrap();

    let events: Vec<ReloadEvent> = events.try_iter().collect();
    assert_eq!(events.len(), 5);
    assert_eq!(
        events[0],
        ReloadEvent::Preloaded {
            manifest: fixture.path(),
            artifacts: 0
        }
    );
    assert_eq!(events[1], ReloadEvent::Started { artifacts: 0 });
    assert_eq!(
        events[2],
        ReloadEvent::ReloadStarted {
            generation: 1,
            artifacts: 1
        }
    );
    assert!(matches!(
        events[3],
        ReloadEvent::ReloadCompleted {
            generation: 1,
            artifacts: 1,
            ..
        }
    ));
    assert_eq!(events[4], ReloadEvent::Stopped);
}
