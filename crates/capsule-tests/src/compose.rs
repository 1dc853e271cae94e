//! Integration tests for capsule video composition.
//!
//! Runs the full render path (capsule-render frames, capsule-media driver)
//! against an in-memory engine.

use crate::support::*;
use capsule_core::capsule::{HEIGHT, TOTAL_FRAMES, WIDTH};
use capsule_core::{CapsuleError, RasterImage};
use capsule_render::{badge_pulse, zoom_for};
use std::collections::HashSet;
use std::sync::{Arc, Weak};

async fn session_with_selection(loader: capsule_media::EngineLoader) -> Arc<capsule_app::Session> {
    let session = session(loader);
    session
        .enhance(
            vec![
                solid_png("first.png", 24, 32, [200, 120, 80, 255]),
                solid_png("second.png", 32, 24, [80, 120, 200, 255]),
            ],
            plain_settings(),
        )
        .await
        .unwrap();
    session.select(0).unwrap();
    session
}

// ── Frame schedule ─────────────────────────────────────────────

#[test]
fn every_frame_has_a_distinct_animation_state() {
    let states: HashSet<(u32, u32)> = (0..TOTAL_FRAMES)
        .map(|i| (badge_pulse(i).to_bits(), zoom_for(i).to_bits()))
        .collect();
    assert_eq!(states.len(), TOTAL_FRAMES as usize);
}

// ── Full render ────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn full_render_encodes_every_frame_in_order() {
    let engine = Arc::new(FakeEngine::default());
    let session = session_with_selection(shared_loader(Arc::clone(&engine))).await;

    let artifact = session.compose_selected().await.unwrap();
    assert_eq!(artifact.bytes(), FAKE_MP4);
    assert_eq!(artifact.source.name, "first.png");

    let state = session.video_state();
    assert_eq!(state.name(), "ready");
    assert!(Arc::ptr_eq(state.artifact().unwrap(), &artifact));

    let runs = engine.runs();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.request.expected_frames, TOTAL_FRAMES);
    assert_eq!(run.frame_names.len(), TOTAL_FRAMES as usize);
    assert_eq!(run.frame_names[0], "frame_0000.png");
    assert_eq!(run.frame_names[239], "frame_0239.png");
    assert!(run.request.args.iter().any(|a| a == "libx264"));

    let first = RasterImage::decode(&run.first_frame, "frame_0000.png").unwrap();
    let last = RasterImage::decode(&run.last_frame, "frame_0239.png").unwrap();
    assert_eq!(first.dimensions(), (WIDTH, HEIGHT));
    assert_eq!(last.dimensions(), (WIDTH, HEIGHT));
    assert_ne!(run.first_frame, run.last_frame);

    // Staged frames and the output are gone once the encode returns.
    assert!(engine.stored_files().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn selecting_again_releases_the_video() {
    let engine = Arc::new(FakeEngine::default());
    let session = session_with_selection(shared_loader(engine)).await;

    let artifact = session.compose_selected().await.unwrap();
    let weak: Weak<_> = Arc::downgrade(&artifact);
    drop(artifact);
    assert!(weak.upgrade().is_some());

    session.select(1).unwrap();
    assert_eq!(session.video_state().name(), "idle");
    assert!(session.video_state().artifact().is_none());
    assert!(weak.upgrade().is_none());
}

// ── Failures and concurrency ───────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn missing_engine_fails_then_resets() {
    let session = session_with_selection(missing_loader()).await;

    let err = session.compose_selected().await;
    assert!(matches!(err, Err(CapsuleError::EncoderUnavailable(_))));
    match session.video_state() {
        capsule_app::VideoRenderState::Failed { message } => {
            assert!(message.contains("not found"));
        }
        other => panic!("expected failed, got {}", other.name()),
    }
    assert!(!session.composer().encoder().is_loaded());

    // Failed leaves only through reset.
    assert!(matches!(
        session.compose_selected().await,
        Err(CapsuleError::InvalidStateTransition(_))
    ));
    session.reset_video();
    assert_eq!(session.video_state().name(), "idle");
    assert!(session.video_state().artifact().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn second_compose_rejected_while_in_flight() {
    let engine = Arc::new(FakeEngine::default());
    let (loader, release) = gated_loader(Arc::clone(&engine));
    let session = session_with_selection(loader).await;

    let mut rx = session.subscribe_video();
    let running = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.compose_selected().await })
    };
    rx.wait_for(|s| s.is_busy()).await.unwrap();

    assert!(matches!(
        session.compose_selected().await,
        Err(CapsuleError::InvalidStateTransition(_))
    ));

    // Reset while the first render is still waiting on the engine.
    session.reset_video();
    release.send(()).unwrap();
    assert!(running.await.unwrap().is_err());

    assert_eq!(session.video_state().name(), "idle");
    assert!(engine.runs().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn encode_error_fails_and_releases_staging() {
    let engine = Arc::new(FakeEngine::failing("ffmpeg exited with status 1"));
    let session = session_with_selection(shared_loader(Arc::clone(&engine))).await;

    let err = session.compose_selected().await;
    assert!(matches!(err, Err(CapsuleError::Encode(_))));
    match session.video_state() {
        capsule_app::VideoRenderState::Failed { message } => {
            assert!(message.contains("exited with status 1"), "{message}");
        }
        other => panic!("expected failed, got {}", other.name()),
    }

    // Every frame was staged before the engine failed, and none survive.
    let runs = engine.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].frame_names.len(), TOTAL_FRAMES as usize);
    assert!(engine.stored_files().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn reset_while_rendering_releases_staging() {
    let (engine, release) = FakeEngine::gated();
    let engine = Arc::new(engine);
    let session = session_with_selection(shared_loader(Arc::clone(&engine))).await;

    let mut rx = session.subscribe_video();
    let running = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.compose_selected().await })
    };
    rx.wait_for(|s| s.name() == "rendering").await.unwrap();

    session.reset_video();
    assert_eq!(session.video_state().name(), "idle");

    release.send(()).unwrap();
    assert!(running.await.unwrap().is_err());

    assert_eq!(session.video_state().name(), "idle");
    assert!(session.video_state().artifact().is_none());
    assert!(engine.stored_files().is_empty());
}
