use crate::codec::{ArtifactState, Outcome};
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Export the provided artifact states to CSV with headers:
/// name,state,label,score,outcome
pub fn export_csv(states: &[ArtifactState], path: impl AsRef<Path>) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["name", "state", "label", "score", "outcome"])?;

    for state in states {
        let name = state.encode();
        let (kind, label, score, outcome) = match state {
            ArtifactState::Pending { .. } => ("pending", None, None, None),
            ArtifactState::Classified { label, score, .. } => {
                ("classified", Some(*label), Some(*score), None)
            }
            ArtifactState::Terminal {
                label,
                score,
                outcome,
                ..
            } => ("terminal", Some(*label), Some(*score), Some(*outcome)),
        };

        let label_field = label.map(|l| l.tag()).unwrap_or_default();
        let score_field = score.map(|s| format!("{s}")).unwrap_or_default();
        let outcome_field = outcome
            .map(|o| match o {
                Outcome::Confirmed => "confirmed",
                Outcome::Rejected => "rejected",
            })
            .unwrap_or_default();

        wtr.write_record([
            name.as_str(),
            kind,
            label_field,
            score_field.as_str(),
            outcome_field,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
