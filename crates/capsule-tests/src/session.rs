//! Integration tests for batches feeding the session.
//!
//! Exercises capsule-ai batches through capsule-app's session, without
//! rendering video.

use crate::support::*;
use capsule_core::{CapsuleError, UpscaleFactor};
use std::sync::{Arc, Weak};

// ── Batches ────────────────────────────────────────────────────

#[tokio::test]
async fn batch_keeps_input_order() {
    let session = session(missing_loader());
    let inputs = vec![
        solid_png("c.png", 4, 3, [200, 10, 10, 255]),
        solid_png("a.png", 6, 2, [10, 200, 10, 255]),
        solid_png("b.png", 2, 8, [10, 10, 200, 255]),
    ];
    let batch = session.enhance(inputs, plain_settings()).await.unwrap();

    let names: Vec<_> = batch.items().iter().map(|i| i.source.name.as_str()).collect();
    assert_eq!(names, ["c.png", "a.png", "b.png"]);
    let sizes: Vec<_> = batch.items().iter().map(|i| (i.width, i.height)).collect();
    assert_eq!(sizes, [(4, 3), (6, 2), (2, 8)]);
}

#[tokio::test]
async fn upscale_applies_to_every_item() {
    let session = session(missing_loader());
    let settings = capsule_core::EnhancementSettings::new(UpscaleFactor::X4, 0.15, 1.06, 1.12, 0.12)
        .unwrap();
    let inputs = vec![
        solid_png("a.png", 5, 3, [120, 90, 60, 255]),
        solid_png("b.png", 2, 2, [60, 90, 120, 255]),
    ];
    let batch = session.enhance(inputs, settings).await.unwrap();
    assert_eq!((batch.items()[0].width, batch.items()[0].height), (20, 12));
    assert_eq!((batch.items()[1].width, batch.items()[1].height), (8, 8));
    assert!(batch.items().iter().all(|i| i.settings == settings));
}

#[tokio::test]
async fn failing_detector_degrades_to_generic_caption() {
    let session = session_with(missing_loader(), Arc::new(BrokenDetector));
    let batch = session
        .enhance(vec![solid_png("look.png", 8, 8, [180, 40, 40, 255])], plain_settings())
        .await
        .unwrap();

    let item = &batch.items()[0];
    assert!(item.labels.is_empty());
    assert!(!item.narrative.trim().is_empty());
    assert!(!item.narrative_lines().is_empty());
}

#[tokio::test]
async fn failed_image_keeps_previous_batch_and_selection() {
    let session = session(missing_loader());
    let first = session
        .enhance(
            vec![
                solid_png("a.png", 4, 4, [1, 2, 3, 255]),
                solid_png("b.png", 4, 4, [3, 2, 1, 255]),
            ],
            plain_settings(),
        )
        .await
        .unwrap();
    let picked = session.select(1).unwrap();

    let err = session
        .enhance(
            vec![solid_png("c.png", 4, 4, [9, 9, 9, 255]), broken_source("bad.png")],
            plain_settings(),
        )
        .await;
    assert!(err.is_err());

    assert!(Arc::ptr_eq(&session.batch(), &first));
    let still = session.selected().unwrap();
    assert!(Arc::ptr_eq(&still, &picked));
}

#[tokio::test]
async fn new_batch_clears_selection() {
    let session = session(missing_loader());
    session
        .enhance(vec![solid_png("a.png", 4, 4, [1, 2, 3, 255])], plain_settings())
        .await
        .unwrap();
    session.select(0).unwrap();
    session
        .enhance(vec![solid_png("b.png", 4, 4, [1, 2, 3, 255])], plain_settings())
        .await
        .unwrap();
    assert!(session.selected().is_none());
}

// ── Selection ──────────────────────────────────────────────────

#[tokio::test]
async fn select_out_of_range_is_not_found() {
    let session = session(missing_loader());
    assert!(matches!(session.select(0), Err(CapsuleError::NotFound(_))));
    session
        .enhance(vec![solid_png("a.png", 4, 4, [1, 2, 3, 255])], plain_settings())
        .await
        .unwrap();
    assert!(matches!(session.select(1), Err(CapsuleError::NotFound(_))));
    assert!(session.select(0).is_ok());
}

#[tokio::test]
async fn compose_without_selection_is_rejected() {
    let session = session(missing_loader());
    assert!(matches!(
        session.compose_selected().await,
        Err(CapsuleError::InvalidStateTransition(_))
    ));
    assert_eq!(session.video_state().name(), "idle");
}

#[tokio::test]
async fn reset_releases_batch() {
    let session = session(missing_loader());
    let batch = session
        .enhance(vec![solid_png("a.png", 16, 16, [1, 2, 3, 255])], plain_settings())
        .await
        .unwrap();
    let item: Weak<_> = Arc::downgrade(&batch.items()[0]);
    drop(batch);
    session.select(0).unwrap();

    session.reset();
    assert!(item.upgrade().is_none());
    assert!(session.batch().is_empty());
    assert!(session.selected().is_none());
}

#[tokio::test]
async fn export_uses_download_names() {
    let session = session(missing_loader());
    let batch = session
        .enhance(
            vec![
                solid_png("x.png", 3, 3, [1, 2, 3, 255]),
                solid_png("y.png", 3, 3, [4, 5, 6, 255]),
            ],
            plain_settings(),
        )
        .await
        .unwrap();
    let names: Vec<_> = batch.export_pngs().unwrap().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["ugc-image-enhanced-1.png", "ugc-image-enhanced-2.png"]);
}
