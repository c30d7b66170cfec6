use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Length of generated tokens: 43 alphanumeric characters carry ~256 bits
/// of entropy, enough to treat ids as globally unique at this scale.
pub const ID_LEN: usize = 43;

/// Opaque unique token naming one artifact, assigned at ingest and stable
/// across every state transition.
///
/// The alphabet is `[A-Za-z0-9_]`. `-` is deliberately excluded: it is the
/// field separator in encoded artifact names, and an id containing it would
/// make the name grammar ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("artifact id is empty")]
    Empty,
    #[error("artifact id contains illegal character `{0}`")]
    IllegalChar(char),
}

impl ArtifactId {
    /// Draws a fresh token from the OS CSPRNG.
    pub fn generate() -> Self {
        let token: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(ID_LEN)
            .map(char::from)
            .collect();
        Self(token)
    }

    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }
        if let Some(c) = s.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
            return Err(IdError::IllegalChar(c));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
