//! Screenshot triage core: an image classification lifecycle tracker backed
//! by nothing but a directory of files.
//!
//! An uploaded screenshot becomes a Pending artifact, a two-class model
//! scores it (pixel art vs. other), and a human confirms or rejects the
//! prediction. The filename of each artifact encodes its full state; atomic
//! rename is the only state-transition primitive. See [`codec`] for the
//! name grammar and [`lifecycle`] for the state machine.

pub mod classifier;
pub mod codec;
pub mod config;
pub mod id;
pub mod lifecycle;
pub mod report;
pub mod store;

pub use classifier::{Classifier, ClassifierError, ImageTensor, Model, ModelError};
pub use codec::{ArtifactState, Label, NameError, Outcome};
pub use config::{Config, ConfigError};
pub use id::{ArtifactId, IdError};
pub use lifecycle::{Pipeline, TriageError, ValidationError};
pub use report::{ReportError, export_csv};
pub use store::{ArtifactStore, StoreError};

#[cfg(feature = "ort")]
pub use classifier::OnnxModel;
