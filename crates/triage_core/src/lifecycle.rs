//! State machine driver: ingest -> classify -> confirm.
//!
//! The pipeline is the only component that calls [`ArtifactStore::transition`].
//! Transitions are strictly forward (Pending -> Classified -> Terminal), a
//! name is decoded exactly once at this boundary, and every guard violation
//! surfaces as a typed error rather than a silent default.

use crate::classifier::{Classifier, ClassifierError, Model};
use crate::codec::{ArtifactState, Label, Outcome};
use crate::id::ArtifactId;
use crate::store::{ArtifactStore, StoreError};
use image::ImageFormat;
use thiserror::Error;

/// Upload extensions accepted at the ingest boundary.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("file extension `{0}` is not allowed (jpg, jpeg or png)")]
    Extension(String),
    #[error("payload does not look like a supported raster image")]
    NotAnImage,
    #[error("payload of {got} bytes exceeds the {limit} byte upload cap")]
    TooLarge { got: u64, limit: u64 },
}

#[derive(Debug, Error)]
pub enum TriageError {
    /// Upload rejected before any artifact was created.
    #[error("upload rejected: {0}")]
    Validation(#[from] ValidationError),
    /// The store could not persist a new Pending artifact; safe to retry.
    #[error("cannot persist new artifact")]
    Ingest(#[source] StoreError),
    /// Model or preprocessing failure; the artifact stays Pending and the
    /// classification may be retried.
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    /// Double-classification guard: the id has no Pending artifact.
    #[error("artifact `{0}` is not pending")]
    NotPending(String),
    /// The name does not decode as a confirmable artifact.
    #[error("`{0}` does not name a confirmable artifact")]
    InvalidTransition(String),
    /// Filesystem-level inconsistency.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TriageError {
    /// True for failures where retrying the same call is safe and may
    /// succeed; false for invalid requests and store inconsistencies.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TriageError::Ingest(_) | TriageError::Classifier(_))
    }
}

/// Lifecycle controller over one store and one injected model.
pub struct Pipeline<M> {
    store: ArtifactStore,
    classifier: Classifier<M>,
    max_upload_bytes: u64,
}

impl<M> Pipeline<M> {
    pub fn new(store: ArtifactStore, classifier: Classifier<M>, max_upload_bytes: u64) -> Self {
        Self {
            store,
            classifier,
            max_upload_bytes,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Validates and persists an upload as a new Pending artifact.
    pub fn ingest(&self, bytes: &[u8], ext_hint: &str) -> Result<ArtifactId, TriageError> {
        validate_upload(bytes, ext_hint, self.max_upload_bytes)?;
        let id = ArtifactId::generate();
        self.store.put_new(&id, bytes).map_err(TriageError::Ingest)?;
        tracing::info!("ingested artifact `{id}` ({} bytes)", bytes.len());
        Ok(id)
    }

    /// Confirms or rejects a classified artifact, returning the terminal name.
    ///
    /// Already-terminal names are echoed unchanged, whatever outcome the
    /// caller asks for: the first recorded outcome wins, and resubmitting a
    /// confirmation that already succeeded is not an error. A Pending or
    /// undecodable name is an illegal transition.
    pub fn confirm(&self, name: &str, outcome: Outcome) -> Result<String, TriageError> {
        let state = ArtifactState::decode(name)
            .map_err(|_| TriageError::InvalidTransition(name.to_string()))?;
        match state {
            ArtifactState::Terminal { .. } => {
                if self.store.exists(name) {
                    Ok(name.to_string())
                } else {
                    Err(StoreError::NotFound(name.to_string()).into())
                }
            }
            ArtifactState::Classified { id, label, score } => {
                let terminal = ArtifactState::Terminal {
                    id,
                    label,
                    score,
                    outcome,
                };
                let new_name = terminal.encode();
                // Target-existence check first: if an identical confirmation
                // already committed and the source is gone, echo it instead
                // of failing. Any other collision is a hard error.
                if self.store.exists(&new_name) && !self.store.exists(name) {
                    return Ok(new_name);
                }
                self.store.transition(name, &new_name)?;
                tracing::info!("confirmed `{name}` as {:?}", outcome);
                Ok(new_name)
            }
            ArtifactState::Pending { .. } => {
                Err(TriageError::InvalidTransition(name.to_string()))
            }
        }
    }
}

impl<M: Model> Pipeline<M> {
    /// Scores a Pending artifact and commits its Classified name.
    pub fn classify(&self, id: &ArtifactId) -> Result<String, TriageError> {
        let pending = ArtifactState::Pending { id: id.clone() };
        let name = pending.encode();
        let bytes = match self.store.read(&name) {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound(_)) => {
                return Err(TriageError::NotPending(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let probs = self.classifier.classify(&bytes)?;
        let (label, score) = Label::from_probs(probs);
        let classified = ArtifactState::Classified {
            id: id.clone(),
            label,
            score,
        };
        let new_name = classified.encode();
        self.store.transition(&name, &new_name)?;
        tracing::info!("classified `{id}` as {}-{score}", label.tag());
        Ok(new_name)
    }
}

fn validate_upload(bytes: &[u8], ext_hint: &str, limit: u64) -> Result<(), ValidationError> {
    let ext = ext_hint.to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ValidationError::Extension(ext_hint.to_string()));
    }
    if bytes.len() as u64 > limit {
        return Err(ValidationError::TooLarge {
            got: bytes.len() as u64,
            limit,
        });
    }
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png | ImageFormat::Jpeg) => Ok(()),
        _ => Err(ValidationError::NotAnImage),
    }
}
