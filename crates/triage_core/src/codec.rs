//! Pure mapping between artifact state and its filename representation.
//!
//! Every artifact lives in one flat directory and its name *is* its state
//! record. The grammar:
//!
//! - Pending:    `{id}`
//! - Classified: `{label}-{score}-{id}`
//! - Terminal:   `{label}-{score}-{id}-{outcome}`
//!
//! where `label` is `P` (pixel art) or `O` (other), `score` is the winning
//! probability rendered with Rust's round-tripping float formatter, and
//! `outcome` is `C` (confirmed) or `I` (incorrect). Decoding is total: a
//! name outside the grammar is an error, never a silent default. This module
//! does no file I/O.

use crate::id::{ArtifactId, IdError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One of the two fixed classes the model distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    /// Pixel-art screenshot.
    Pixel,
    /// Anything else.
    Other,
}

impl Label {
    pub fn tag(self) -> &'static str {
        match self {
            Label::Pixel => "P",
            Label::Other => "O",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "P" => Some(Label::Pixel),
            "O" => Some(Label::Other),
            _ => None,
        }
    }

    /// Picks the winning class from a two-class probability vector.
    ///
    /// Strict inequality: `p0 > p1` wins for Pixel, everything else
    /// (including an exact tie) goes to Other. The returned score is the
    /// winning probability.
    pub fn from_probs(probs: [f32; 2]) -> (Self, f32) {
        if probs[0] > probs[1] {
            (Label::Pixel, probs[0])
        } else {
            (Label::Other, probs[1])
        }
    }
}

/// The human judgment recorded at confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The prediction was confirmed correct.
    Confirmed,
    /// The prediction was rejected as incorrect.
    Rejected,
}

impl Outcome {
    pub fn tag(self) -> &'static str {
        match self {
            Outcome::Confirmed => "C",
            Outcome::Rejected => "I",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "C" => Some(Outcome::Confirmed),
            "I" => Some(Outcome::Rejected),
            _ => None,
        }
    }
}

/// Full processing state of one artifact, as recorded in its filename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArtifactState {
    /// Ingested, not yet classified.
    Pending { id: ArtifactId },
    /// Classified, awaiting human confirmation.
    Classified {
        id: ArtifactId,
        label: Label,
        score: f32,
    },
    /// Confirmed or rejected; accepts no further transitions.
    Terminal {
        id: ArtifactId,
        label: Label,
        score: f32,
        outcome: Outcome,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NameError {
    #[error(transparent)]
    Id(#[from] IdError),
    #[error("unknown label tag `{0}`")]
    UnknownLabel(String),
    #[error("unparseable score `{0}`")]
    BadScore(String),
    #[error("score {0} outside [0,1]")]
    ScoreOutOfRange(f32),
    #[error("`{0}` does not match the artifact name grammar")]
    Grammar(String),
}

impl ArtifactState {
    pub fn id(&self) -> &ArtifactId {
        match self {
            ArtifactState::Pending { id }
            | ArtifactState::Classified { id, .. }
            | ArtifactState::Terminal { id, .. } => id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ArtifactState::Terminal { .. })
    }

    /// Renders the filename for this state.
    ///
    /// `f32`'s `Display` emits the shortest decimal string that parses back
    /// to the same value, so `encode` followed by `decode` is the identity.
    pub fn encode(&self) -> String {
        match self {
            ArtifactState::Pending { id } => id.to_string(),
            ArtifactState::Classified { id, label, score } => {
                let score = normalize_score(*score);
                format!("{}-{score}-{id}", label.tag())
            }
            ArtifactState::Terminal {
                id,
                label,
                score,
                outcome,
            } => {
                let score = normalize_score(*score);
                format!("{}-{score}-{id}-{}", label.tag(), outcome.tag())
            }
        }
    }

    /// Parses a filename back into a state by structural inspection.
    pub fn decode(name: &str) -> Result<Self, NameError> {
        if name.is_empty() {
            return Err(NameError::Grammar(name.to_string()));
        }
        if !name.contains('-') {
            let id = ArtifactId::parse(name)?;
            return Ok(ArtifactState::Pending { id });
        }
        // An outcome suffix marks a terminal name; anything else with a dash
        // must be a classified name.
        if let Some((body, tag)) = name.rsplit_once('-')
            && let Some(outcome) = Outcome::from_tag(tag)
        {
            let (label, score, id) = parse_classified(body, name)?;
            return Ok(ArtifactState::Terminal {
                id,
                label,
                score,
                outcome,
            });
        }
        let (label, score, id) = parse_classified(name, name)?;
        Ok(ArtifactState::Classified { id, label, score })
    }
}

impl fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Folds `-0.0` into `0.0` before rendering: a signed zero would print as
/// `-0` and the extra dash breaks the name grammar.
fn normalize_score(score: f32) -> f32 {
    score + 0.0
}

fn parse_classified(body: &str, full: &str) -> Result<(Label, f32, ArtifactId), NameError> {
    let mut parts = body.splitn(3, '-');
    let (Some(tag), Some(score_str), Some(id_str)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(NameError::Grammar(full.to_string()));
    };
    let label =
        Label::from_tag(tag).ok_or_else(|| NameError::UnknownLabel(tag.to_string()))?;
    let score: f32 = score_str
        .parse()
        .map_err(|_| NameError::BadScore(score_str.to_string()))?;
    if !score.is_finite() || !(0.0..=1.0).contains(&score) {
        return Err(NameError::ScoreOutOfRange(score));
    }
    let id = ArtifactId::parse(id_str)?;
    Ok((label, score, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn id(s: &str) -> ArtifactId {
        ArtifactId::parse(s).unwrap()
    }

    #[rstest]
    #[case(ArtifactState::Pending { id: id("abc123") }, "abc123")]
    #[case(
        ArtifactState::Classified { id: id("abc123"), label: Label::Pixel, score: 0.7 },
        "P-0.7-abc123"
    )]
    #[case(
        ArtifactState::Classified { id: id("abc123"), label: Label::Other, score: 0.5 },
        "O-0.5-abc123"
    )]
    #[case(
        ArtifactState::Terminal {
            id: id("abc123"),
            label: Label::Pixel,
            score: 0.91,
            outcome: Outcome::Confirmed,
        },
        "P-0.91-abc123-C"
    )]
    #[case(
        ArtifactState::Terminal {
            id: id("abc123"),
            label: Label::Other,
            score: 1.0,
            outcome: Outcome::Rejected,
        },
        "O-1-abc123-I"
    )]
    #[case(
        ArtifactState::Classified { id: id("abc123"), label: Label::Other, score: -0.0 },
        "O-0-abc123"
    )]
    #[case(
        ArtifactState::Terminal {
            id: id("abc123"),
            label: Label::Other,
            score: -0.0,
            outcome: Outcome::Confirmed,
        },
        "O-0-abc123-C"
    )]
    fn encode_matches_grammar(#[case] state: ArtifactState, #[case] expected: &str) {
        assert_eq!(state.encode(), expected);
    }

    #[rstest]
    #[case(Label::Pixel, 0.0, None)]
    #[case(Label::Other, -0.0, None)] // signed zero must not grow an extra dash
    #[case(Label::Pixel, 0.7, None)]
    #[case(Label::Other, 0.33333334, None)]
    #[case(Label::Other, 1.0, Some(Outcome::Confirmed))]
    #[case(Label::Pixel, 0.5000001, Some(Outcome::Rejected))]
    fn round_trip_recovers_fields(
        #[case] label: Label,
        #[case] score: f32,
        #[case] outcome: Option<Outcome>,
    ) {
        let state = match outcome {
            None => ArtifactState::Classified {
                id: id("tok_1"),
                label,
                score,
            },
            Some(outcome) => ArtifactState::Terminal {
                id: id("tok_1"),
                label,
                score,
                outcome,
            },
        };
        assert_eq!(ArtifactState::decode(&state.encode()), Ok(state));
    }

    #[test]
    fn pending_round_trip() {
        let state = ArtifactState::Pending {
            id: ArtifactId::generate(),
        };
        assert_eq!(ArtifactState::decode(&state.encode()), Ok(state));
    }

    #[test]
    fn decode_classifies_by_structure() {
        assert!(matches!(
            ArtifactState::decode("abc123").unwrap(),
            ArtifactState::Pending { .. }
        ));
        assert!(matches!(
            ArtifactState::decode("P-0.7-abc123").unwrap(),
            ArtifactState::Classified { .. }
        ));
        assert!(matches!(
            ArtifactState::decode("P-0.7-abc123-I").unwrap(),
            ArtifactState::Terminal { .. }
        ));
    }

    #[rstest]
    #[case("")]
    #[case("X-0.5-abc")] // unknown label tag
    #[case("P-zero-abc")] // unparseable score
    #[case("P-1.5-abc")] // score out of range
    #[case("P--0.5-abc")] // negative score
    #[case("P-0.5-ab-cd")] // dash inside the id segment
    #[case("P-0.5-")] // empty id
    #[case("P-0.5")] // missing id segment
    #[case("abc.png")] // foreign file
    fn decode_rejects_names_outside_grammar(#[case] name: &str) {
        assert!(ArtifactState::decode(name).is_err());
    }

    #[rstest]
    #[case([0.7, 0.3], Label::Pixel, 0.7)]
    #[case([0.3, 0.7], Label::Other, 0.7)]
    #[case([0.5, 0.5], Label::Other, 0.5)] // exact tie goes to Other
    #[case([1.0, 0.0], Label::Pixel, 1.0)]
    fn tie_break_is_strict_inequality(
        #[case] probs: [f32; 2],
        #[case] label: Label,
        #[case] score: f32,
    ) {
        assert_eq!(Label::from_probs(probs), (label, score));
    }
}
