//! End-to-end lifecycle runs against a real temporary store.

use image::{ImageFormat, Rgb, RgbImage};
use std::cell::Cell;
use std::io::Cursor;
use tempfile::tempdir;
use triage_core::{
    ArtifactState, ArtifactStore, Classifier, ImageTensor, Label, Model, ModelError, Outcome,
    Pipeline, TriageError,
};

struct Fixed([f32; 2]);

impl Model for Fixed {
    fn infer(&self, _input: &ImageTensor) -> Result<[f32; 2], ModelError> {
        Ok(self.0)
    }
}

/// Fails the first `n` calls, then behaves like `Fixed`.
struct Flaky {
    failures_left: Cell<u32>,
    probs: [f32; 2],
}

impl Model for Flaky {
    fn infer(&self, _input: &ImageTensor) -> Result<[f32; 2], ModelError> {
        let left = self.failures_left.get();
        if left > 0 {
            self.failures_left.set(left - 1);
            return Err(ModelError::new("transient backend failure"));
        }
        Ok(self.probs)
    }
}

fn screenshot_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(12, 10, Rgb([12, 200, 64]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn pipeline<M>(dir: &std::path::Path, model: M) -> Pipeline<M> {
    let store = ArtifactStore::open(dir).unwrap();
    Pipeline::new(store, Classifier::new(model, 8), 1024 * 1024)
}

#[test]
fn full_lifecycle_produces_one_terminal_artifact() {
    let dir = tempdir().unwrap();
    let p = pipeline(dir.path(), Fixed([0.3, 0.7]));

    let bytes = screenshot_bytes();
    let id = p.ingest(&bytes, "png").unwrap();
    let classified = p.classify(&id).unwrap();
    assert_eq!(classified, format!("O-0.7-{id}"));

    let terminal = p.confirm(&classified, Outcome::Confirmed).unwrap();
    assert_eq!(terminal, format!("O-0.7-{id}-C"));

    // Exactly one file, named for the terminal state, carrying the
    // ingested id and the untouched original bytes.
    assert_eq!(p.store().entry_count().unwrap(), 1);
    let states = p.store().list().unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].id(), &id);
    assert!(states[0].is_terminal());
    assert_eq!(p.store().read(&terminal).unwrap(), bytes);
}

#[test]
fn confirm_is_idempotent_for_the_same_outcome() {
    let dir = tempdir().unwrap();
    let p = pipeline(dir.path(), Fixed([0.8, 0.2]));
    let id = p.ingest(&screenshot_bytes(), "jpg").unwrap();
    let classified = p.classify(&id).unwrap();

    let first = p.confirm(&classified, Outcome::Rejected).unwrap();
    // Resubmitting the terminal name echoes it back.
    let second = p.confirm(&first, Outcome::Rejected).unwrap();
    assert_eq!(first, second);
    // Resubmitting the stale classified name with the same outcome is also
    // benign: the target already equals the would-be result.
    let third = p.confirm(&classified, Outcome::Rejected).unwrap();
    assert_eq!(first, third);
    assert_eq!(p.store().entry_count().unwrap(), 1);
}

#[test]
fn first_outcome_wins_on_conflicting_reconfirmation() {
    let dir = tempdir().unwrap();
    let p = pipeline(dir.path(), Fixed([0.9, 0.1]));
    let id = p.ingest(&screenshot_bytes(), "png").unwrap();
    let classified = p.classify(&id).unwrap();

    let terminal = p.confirm(&classified, Outcome::Confirmed).unwrap();
    // Re-confirming the terminal name with the opposite judgment keeps the
    // recorded outcome and echoes the existing name.
    let echoed = p.confirm(&terminal, Outcome::Rejected).unwrap();
    assert_eq!(echoed, terminal);
    assert!(terminal.ends_with("-C"));

    // A stale classified name with a conflicting outcome is a hard error:
    // the would-be target differs from what was committed.
    let err = p.confirm(&classified, Outcome::Rejected).unwrap_err();
    assert!(matches!(err, TriageError::Store(_)));
    assert_eq!(p.store().entry_count().unwrap(), 1);
}

#[test]
fn classifier_failure_leaves_artifact_pending_and_is_retryable() {
    let dir = tempdir().unwrap();
    let p = pipeline(
        dir.path(),
        Flaky {
            failures_left: Cell::new(1),
            probs: [0.7, 0.3],
        },
    );
    let id = p.ingest(&screenshot_bytes(), "png").unwrap();

    let err = p.classify(&id).unwrap_err();
    assert!(err.is_retryable());
    // Still pending on disk.
    assert!(matches!(
        p.store().list().unwrap().as_slice(),
        [ArtifactState::Pending { .. }]
    ));

    // Retry succeeds and applies the strict-inequality tie-break.
    let name = p.classify(&id).unwrap();
    let state = ArtifactState::decode(&name).unwrap();
    assert!(
        matches!(state, ArtifactState::Classified { label: Label::Pixel, score, .. } if score == 0.7)
    );
}

#[test]
fn rejected_upload_leaves_store_untouched() {
    let dir = tempdir().unwrap();
    let p = pipeline(dir.path(), Fixed([0.5, 0.5]));
    let before = p.store().entry_count().unwrap();
    assert!(p.ingest(b"-- not an image --", "png").is_err());
    assert!(p.ingest(&screenshot_bytes(), "bmp").is_err());
    assert_eq!(p.store().entry_count().unwrap(), before);
}
