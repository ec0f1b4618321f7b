// Integration tests for the scan session controller
//
// These tests drive a controller through its public handle with a manual
// recognition source and scripted permission providers.

mod common;

use anyhow::Result;
use barcode_reader::{
    DebouncePolicy, DecodeEvent, FailureReason, IgnoreReason, IntentOutcome, PermissionStatus,
    ScanController, ScanError, SessionConfig, SessionState, StaticPermissions, Symbology,
    UnavailableSource,
};
use common::{manual_controller, settle, GatedPermissions, PreloadedSource};
use futures::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;

fn applied(state: SessionState) -> IntentOutcome {
    IntentOutcome::Applied { state }
}

#[tokio::test]
async fn test_authorized_start_reaches_running() -> Result<()> {
    let permissions = Arc::new(StaticPermissions::authorized());
    let (controller, _injector) = manual_controller(permissions.clone(), SessionConfig::default());

    let outcome = controller.request_start().await?;
    assert_eq!(outcome, applied(SessionState::Running));
    assert_eq!(controller.state(), SessionState::Running);
    assert_eq!(permissions.request_count(), 0, "No prompt when already authorized");

    let again = controller.request_start().await?;
    assert_eq!(
        again,
        IntentOutcome::Ignored {
            state: SessionState::Running,
            reason: IgnoreReason::AlreadyActive,
        }
    );

    Ok(())
}

#[tokio::test]
async fn test_repeated_stop_equals_single_stop() -> Result<()> {
    let (controller, _injector) = manual_controller(
        Arc::new(StaticPermissions::authorized()),
        SessionConfig::default(),
    );

    // Nothing to stop yet
    let idle = controller.stop().await?;
    assert!(!idle.is_applied());
    assert_eq!(controller.state(), SessionState::Idle);

    controller.request_start().await?;
    assert_eq!(controller.stop().await?, applied(SessionState::Stopped));
    let after_one = controller.snapshot();

    for _ in 0..3 {
        let outcome = controller.stop().await?;
        assert_eq!(
            outcome,
            IntentOutcome::Ignored {
                state: SessionState::Stopped,
                reason: IgnoreReason::NotActive,
            }
        );
    }

    assert_eq!(controller.snapshot(), after_one);
    Ok(())
}

#[tokio::test]
async fn test_first_decode_event_wins() -> Result<()> {
    let (controller, injector) = manual_controller(
        Arc::new(StaticPermissions::authorized()),
        SessionConfig::default(),
    );

    controller.request_start().await?;

    assert!(injector.inject(DecodeEvent::new("ABC", Symbology::Qr)).await);
    // May or may not reach the source before it is stopped
    injector.inject(DecodeEvent::new("DEF", Symbology::Qr)).await;

    let snapshot = settle(&controller, |s| s.state == SessionState::Stopped).await?;
    assert_eq!(snapshot.last_text(), Some("ABC"));

    // Give any straggler time to be processed
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(controller.snapshot().last_text(), Some("ABC"));

    let stats = controller.stats().await?;
    assert_eq!(stats.events_accepted, 1);
    Ok(())
}

#[tokio::test]
async fn test_second_queued_event_is_discarded() -> Result<()> {
    let source = PreloadedSource::new(vec![
        DecodeEvent::new("ABC", Symbology::Qr),
        DecodeEvent::new("DEF", Symbology::Qr),
    ]);
    let controller = ScanController::spawn(
        SessionConfig::default(),
        Arc::new(StaticPermissions::authorized()),
        Box::new(source),
    );

    controller.request_start().await?;
    let snapshot = settle(&controller, |s| s.state == SessionState::Stopped).await?;
    assert_eq!(snapshot.last_text(), Some("ABC"));

    // Both events reached the controller; only the first was kept
    let stats = controller.stats().await?;
    assert_eq!(stats.events_accepted, 1);
    assert_eq!(stats.events_discarded, 1);
    assert_eq!(controller.snapshot().last_text(), Some("ABC"));
    Ok(())
}

#[tokio::test]
async fn test_decode_while_stopped_keeps_result() -> Result<()> {
    let (controller, injector) = manual_controller(
        Arc::new(StaticPermissions::authorized()),
        SessionConfig::default(),
    );

    controller.request_start().await?;
    injector.inject(DecodeEvent::new("ABC", Symbology::Qr)).await;
    settle(&controller, |s| s.state == SessionState::Stopped).await?;

    let delivered = injector.inject(DecodeEvent::new("XYZ", Symbology::Qr)).await;
    assert!(!delivered, "Source must not accept events once stopped");

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(controller.state(), SessionState::Stopped);
    assert_eq!(controller.snapshot().last_text(), Some("ABC"));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_starts_issue_one_permission_request() -> Result<()> {
    let permissions = GatedPermissions::new(PermissionStatus::Authorized);
    let (controller, _injector) = manual_controller(permissions.clone(), SessionConfig::default());

    let (first, second, _) = tokio::join!(
        controller.request_start(),
        controller.request_start(),
        async {
            settle(&controller, |s| s.state == SessionState::AwaitingPermission)
                .await
                .ok();
            permissions.release();
        }
    );

    assert_eq!(*first?.state(), SessionState::Running);
    assert_eq!(*second?.state(), SessionState::Running);
    assert_eq!(permissions.requests(), 1);
    assert_eq!(controller.stats().await?.permission_requests, 1);
    Ok(())
}

#[tokio::test]
async fn test_reset_after_denial_then_authorized_start() -> Result<()> {
    let permissions = Arc::new(StaticPermissions::denied());
    let (controller, _injector) = manual_controller(permissions.clone(), SessionConfig::default());

    let outcome = controller.request_start().await?;
    assert_eq!(
        outcome,
        applied(SessionState::Failed(FailureReason::PermissionDenied))
    );

    // Failed is only left through reset or a new start
    assert!(!controller.stop().await?.is_applied());

    assert_eq!(controller.reset().await?, applied(SessionState::Idle));

    permissions.set_status(PermissionStatus::Authorized);
    assert_eq!(
        controller.request_start().await?,
        applied(SessionState::Running)
    );
    Ok(())
}

#[tokio::test]
async fn test_prompt_denied_leaves_no_result() -> Result<()> {
    let permissions = Arc::new(StaticPermissions::prompting(PermissionStatus::Denied));
    let (controller, _injector) = manual_controller(permissions.clone(), SessionConfig::default());

    let outcome = controller.request_start().await?;
    assert_eq!(
        *outcome.state(),
        SessionState::Failed(FailureReason::PermissionDenied)
    );
    assert!(controller.last_result().is_none());
    assert_eq!(permissions.request_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_permission_answer_after_reset_is_discarded() -> Result<()> {
    let permissions = GatedPermissions::new(PermissionStatus::Authorized);
    let (controller, injector) = manual_controller(permissions.clone(), SessionConfig::default());

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.request_start().await }
    });
    settle(&controller, |s| s.state == SessionState::AwaitingPermission).await?;

    assert_eq!(controller.reset().await?, applied(SessionState::Idle));

    let superseded = pending.await??;
    assert_eq!(
        superseded,
        IntentOutcome::Ignored {
            state: SessionState::Idle,
            reason: IgnoreReason::Superseded,
        }
    );

    permissions.release();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(controller.state(), SessionState::Idle);
    assert!(!injector.inject(DecodeEvent::new("ABC", Symbology::Qr)).await);
    assert_eq!(controller.stats().await?.runs_started, 0);
    Ok(())
}

#[tokio::test]
async fn test_restart_adopts_in_flight_permission_request() -> Result<()> {
    let permissions = GatedPermissions::new(PermissionStatus::Authorized);
    let (controller, _injector) = manual_controller(permissions.clone(), SessionConfig::default());

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.request_start().await }
    });
    settle(&controller, |s| s.state == SessionState::AwaitingPermission).await?;

    assert_eq!(controller.stop().await?, applied(SessionState::Stopped));
    assert!(!first.await??.is_applied());

    let second = tokio::spawn({
        let controller = controller.clone();
        async move { controller.request_start().await }
    });
    settle(&controller, |s| s.state == SessionState::AwaitingPermission).await?;

    permissions.release();
    assert_eq!(second.await??, applied(SessionState::Running));
    assert_eq!(permissions.requests(), 1);
    Ok(())
}

#[tokio::test]
async fn test_permission_timeout_fails_session() -> Result<()> {
    let permissions = GatedPermissions::new(PermissionStatus::Authorized);
    let config = SessionConfig {
        permission_timeout: Some(Duration::from_millis(30)),
        ..SessionConfig::default()
    };
    let (controller, _injector) = manual_controller(permissions, config);

    let outcome = controller.request_start().await?;
    assert_eq!(
        outcome,
        applied(SessionState::Failed(FailureReason::PermissionTimedOut))
    );
    Ok(())
}

#[tokio::test]
async fn test_unavailable_device_fails_start() -> Result<()> {
    let controller = ScanController::spawn(
        SessionConfig::default(),
        Arc::new(StaticPermissions::authorized()),
        Box::new(UnavailableSource::default()),
    );

    let outcome = controller.request_start().await?;
    assert_eq!(
        outcome,
        applied(SessionState::Failed(FailureReason::DeviceUnavailable))
    );
    assert_eq!(controller.stats().await?.runs_started, 0);
    Ok(())
}

#[tokio::test]
async fn test_continuous_mode_tracks_latest_distinct_code() -> Result<()> {
    let config = SessionConfig {
        debounce: DebouncePolicy::Continuous,
        ..SessionConfig::default()
    };
    let (controller, injector) = manual_controller(Arc::new(StaticPermissions::authorized()), config);

    controller.request_start().await?;
    for text in ["ABC", "ABC", "DEF"] {
        assert!(injector.inject(DecodeEvent::new(text, Symbology::Qr)).await);
    }

    let snapshot = settle(&controller, |s| s.last_text() == Some("DEF")).await?;
    assert_eq!(snapshot.state, SessionState::Running);

    let stats = controller.stats().await?;
    assert_eq!(stats.events_accepted, 2);
    assert_eq!(stats.events_discarded, 1);
    Ok(())
}

#[tokio::test]
async fn test_disabled_symbology_is_ignored() -> Result<()> {
    let config = SessionConfig {
        symbologies: vec![Symbology::Ean13],
        ..SessionConfig::default()
    };
    let (controller, injector) = manual_controller(Arc::new(StaticPermissions::authorized()), config);

    controller.request_start().await?;
    injector
        .inject(DecodeEvent::new("https://example.com", Symbology::Qr))
        .await;
    injector.inject(DecodeEvent::new("", Symbology::Ean13)).await;
    injector
        .inject(DecodeEvent::new("4006381333931", Symbology::Ean13))
        .await;

    let snapshot = settle(&controller, |s| s.state == SessionState::Stopped).await?;
    assert_eq!(snapshot.last_text(), Some("4006381333931"));
    assert_eq!(controller.stats().await?.events_discarded, 2);
    Ok(())
}

#[tokio::test]
async fn test_pause_and_resume_keep_result() -> Result<()> {
    let permissions = Arc::new(StaticPermissions::authorized());
    let config = SessionConfig {
        debounce: DebouncePolicy::Continuous,
        ..SessionConfig::default()
    };
    let (controller, injector) = manual_controller(permissions.clone(), config);

    controller.request_start().await?;
    injector.inject(DecodeEvent::new("ABC", Symbology::Qr)).await;
    settle(&controller, |s| s.last_text() == Some("ABC")).await?;

    assert_eq!(controller.pause().await?, applied(SessionState::Paused));
    assert!(!injector.inject(DecodeEvent::new("DEF", Symbology::Qr)).await);
    assert_eq!(controller.snapshot().last_text(), Some("ABC"));

    assert_eq!(controller.resume().await?, applied(SessionState::Running));
    assert_eq!(controller.snapshot().last_text(), Some("ABC"));

    let stats = controller.stats().await?;
    assert_eq!(stats.runs_started, 2);
    assert_eq!(permissions.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_toggle_alternates_running_and_stopped() -> Result<()> {
    let (controller, _injector) = manual_controller(
        Arc::new(StaticPermissions::authorized()),
        SessionConfig::default(),
    );

    assert_eq!(*controller.toggle().await?.state(), SessionState::Running);
    assert_eq!(*controller.toggle().await?.state(), SessionState::Stopped);
    assert_eq!(*controller.toggle().await?.state(), SessionState::Running);
    Ok(())
}

#[tokio::test]
async fn test_new_start_clears_previous_result() -> Result<()> {
    let (controller, injector) = manual_controller(
        Arc::new(StaticPermissions::authorized()),
        SessionConfig::default(),
    );

    controller.request_start().await?;
    injector.inject(DecodeEvent::new("ABC", Symbology::Qr)).await;
    settle(&controller, |s| s.state == SessionState::Stopped).await?;

    controller.request_start().await?;
    assert_eq!(controller.state(), SessionState::Running);
    assert!(controller.last_result().is_none());
    Ok(())
}

#[tokio::test]
async fn test_updates_stream_starts_with_current_snapshot() -> Result<()> {
    let (controller, _injector) = manual_controller(
        Arc::new(StaticPermissions::authorized()),
        SessionConfig::default(),
    );

    let mut updates = Box::pin(controller.updates());
    let first = updates.next().await.expect("initial snapshot");
    assert_eq!(first.state, SessionState::Idle);

    controller.request_start().await?;

    let running = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(snapshot) = updates.next().await {
            if snapshot.state == SessionState::Running {
                return Some(snapshot);
            }
        }
        None
    })
    .await?;
    assert!(running.is_some());
    Ok(())
}

#[tokio::test]
async fn test_shutdown_closes_controller() -> Result<()> {
    let (controller, injector) = manual_controller(
        Arc::new(StaticPermissions::authorized()),
        SessionConfig::default(),
    );

    controller.request_start().await?;
    controller.shutdown().await?;

    assert!(!injector.inject(DecodeEvent::new("ABC", Symbology::Qr)).await);
    assert_eq!(
        controller.request_start().await,
        Err(ScanError::ControllerClosed)
    );

    // Second shutdown is a no-op
    controller.shutdown().await?;
    Ok(())
}
