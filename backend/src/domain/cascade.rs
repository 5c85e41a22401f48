//! Aggregate references and per-entry cascade reports.
//!
//! Deletion and deactivation fan out over several documents in independent
//! stores. A [`CascadeReport`] records what happened to each dependent so the
//! caller can see exactly which documents still need repair.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The three document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    /// Course collection.
    Course,
    /// Participant collection.
    Participant,
    /// Company collection.
    Company,
}

impl AggregateKind {
    /// Lower-case label used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Course => "course",
            Self::Participant => "participant",
            Self::Company => "company",
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind and id of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRef {
    /// Collection.
    pub kind: AggregateKind,
    /// Document id.
    pub id: Uuid,
}

impl AggregateRef {
    /// Build a reference.
    #[must_use]
    pub const fn new(kind: AggregateKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for AggregateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// What happened to one dependent document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CascadeOutcome {
    /// The dependent was written.
    Updated,
    /// Nothing to do: the dependent was missing or already consistent.
    Unchanged,
    /// The write failed and the dependent still references the parent.
    Failed {
        /// Store failure description.
        reason: String,
    },
}

/// One line of a [`CascadeReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CascadeEntry {
    /// Dependent document.
    pub target: AggregateRef,
    /// Result for that document.
    #[serde(flatten)]
    pub outcome: CascadeOutcome,
}

/// Per-dependent outcome of a cascading operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    entries: Vec<CascadeEntry>,
}

impl CascadeReport {
    /// Record a successful write.
    pub fn updated(&mut self, target: AggregateRef) {
        self.push(target, CascadeOutcome::Updated);
    }

    /// Record a dependent that needed no write.
    pub fn unchanged(&mut self, target: AggregateRef) {
        self.push(target, CascadeOutcome::Unchanged);
    }

    /// Record a failed write.
    pub fn failed(&mut self, target: AggregateRef, reason: impl Into<String>) {
        self.push(
            target,
            CascadeOutcome::Failed {
                reason: reason.into(),
            },
        );
    }

    fn push(&mut self, target: AggregateRef, outcome: CascadeOutcome) {
        self.entries.push(CascadeEntry { target, outcome });
    }

    /// All recorded entries in processing order.
    pub fn entries(&self) -> &[CascadeEntry] {
        &self.entries
    }

    /// Entries whose write failed.
    pub fn failures(&self) -> impl Iterator<Item = &CascadeEntry> {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, CascadeOutcome::Failed { .. }))
    }

    /// Number of entries whose write succeeded.
    pub fn updated_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.outcome == CascadeOutcome::Updated)
            .count()
    }

    /// Whether every dependent is consistent.
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn report_tracks_failures() {
        let mut report = CascadeReport::default();
        report.updated(AggregateRef::new(AggregateKind::Participant, Uuid::nil()));
        assert!(report.is_complete());

        report.failed(AggregateRef::new(AggregateKind::Course, Uuid::nil()), "timeout");
        assert!(!report.is_complete());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.updated_count(), 1);
    }

    #[rstest]
    fn entries_serialise_flat() {
        let mut report = CascadeReport::default();
        report.failed(AggregateRef::new(AggregateKind::Company, Uuid::nil()), "down");
        let value = serde_json::to_value(&report).expect("serialise report");
        assert_eq!(
            value,
            json!({
                "entries": [{
                    "target": { "kind": "company", "id": "00000000-0000-0000-0000-000000000000" },
                    "outcome": "failed",
                    "reason": "down"
                }]
            })
        );
    }
}
