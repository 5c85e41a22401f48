//! Enrollment records held on both sides of the course/participant link.
//!
//! The participant keeps the authoritative record ([`Enrollment`]), including
//! score and notes. The course keeps a lighter mirror ([`RosterEntry`]) used
//! for capacity accounting. An entry is *live* unless it is withdrawn.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CourseId, ParticipantId};

/// Coarse enrollment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Currently taking the course.
    Enrolled,
    /// Finished the course.
    Completed,
    /// Left the course; does not count against capacity.
    Withdrawn,
}

impl EnrollmentStatus {
    /// Whether the entry counts as a live enrollment.
    #[must_use]
    pub const fn is_live(self) -> bool {
        !matches!(self, Self::Withdrawn)
    }

    /// Wire name used in JSON and query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enrolled => "enrolled",
            Self::Completed => "completed",
            Self::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when an enrollment status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown enrollment status {0:?}")]
pub struct UnknownEnrollmentStatus(pub String);

impl FromStr for EnrollmentStatus {
    type Err = UnknownEnrollmentStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "enrolled" => Ok(Self::Enrolled),
            "completed" => Ok(Self::Completed),
            "withdrawn" => Ok(Self::Withdrawn),
            other => Err(UnknownEnrollmentStatus(other.to_owned())),
        }
    }
}

/// Course score between 0 and 100 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "f64", into = "f64")]
#[schema(value_type = f64)]
pub struct Score(f64);

/// Raised when a score falls outside `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("score must be between 0 and 100, got {0}")]
pub struct ScoreOutOfRange(pub f64);

impl Score {
    /// Validate a raw score.
    pub fn new(value: f64) -> Result<Self, ScoreOutOfRange> {
        if value.is_finite() && (0.0..=100.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ScoreOutOfRange(value))
        }
    }

    /// The numeric score.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Score {
    type Error = ScoreOutOfRange;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for f64 {
    fn from(value: Score) -> Self {
        value.0
    }
}

/// Participant-side enrollment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    /// Course the participant is enrolled in.
    pub course_id: CourseId,
    /// When the enrollment (or re-enrollment) happened.
    pub enrolled_at: DateTime<Utc>,
    /// Current status.
    pub status: EnrollmentStatus,
    /// Final score, when graded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    /// Free-form instructor notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Enrollment {
    /// A fresh live enrollment.
    #[must_use]
    pub const fn new(course_id: CourseId, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            course_id,
            enrolled_at,
            status: EnrollmentStatus::Enrolled,
            score: None,
            notes: None,
        }
    }

    /// Whether the record counts as live.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.status.is_live()
    }
}

/// Course-side roster entry mirroring a participant's enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    /// Enrolled participant.
    pub participant_id: ParticipantId,
    /// When the participant took the seat.
    pub enrolled_at: DateTime<Utc>,
    /// Mirrored coarse status.
    pub status: EnrollmentStatus,
}

impl RosterEntry {
    /// Whether the entry occupies a seat.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.status.is_live()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(EnrollmentStatus::Enrolled, true)]
    #[case(EnrollmentStatus::Completed, true)]
    #[case(EnrollmentStatus::Withdrawn, false)]
    fn liveness_follows_status(#[case] status: EnrollmentStatus, #[case] live: bool) {
        assert_eq!(status.is_live(), live);
    }

    #[rstest]
    fn status_parses_wire_names() {
        assert_eq!("completed".parse::<EnrollmentStatus>(), Ok(EnrollmentStatus::Completed));
        assert!("inscrito".parse::<EnrollmentStatus>().is_err());
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(100.0, true)]
    #[case(87.5, true)]
    #[case(-1.0, false)]
    #[case(100.5, false)]
    #[case(f64::NAN, false)]
    fn score_bounds(#[case] raw: f64, #[case] accepted: bool) {
        assert_eq!(Score::new(raw).is_ok(), accepted);
    }

    #[rstest]
    fn score_deserialisation_is_validated() {
        assert!(serde_json::from_str::<Score>("101").is_err());
        let score: Score = serde_json::from_str("95").expect("valid score");
        assert!((score.value() - 95.0).abs() < f64::EPSILON);
    }
}
