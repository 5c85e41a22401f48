//! Course aggregate: descriptive details plus the enrollment roster.
//!
//! The roster is the course-side mirror of participant enrollments. Live
//! entries (anything but withdrawn) count against `cupoMaximo`. Cross-aggregate
//! rules such as "both sides agree" live in the enrollment coordinator; the
//! aggregate only guards its own shape.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AggregateKind, AggregateRef, CourseId, EnrollmentStatus, ParticipantId, RosterEntry};

/// Kind of training offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CourseKind {
    /// Regular course.
    Curso,
    /// Certificate programme.
    Certificado,
    /// Quality badge programme.
    Distintivo,
    /// Assessment session.
    Evaluacion,
    /// Diploma programme.
    Diplomado,
    /// Seminar.
    Seminario,
}

/// Raised when a course kind string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown course kind {0:?}")]
pub struct UnknownCourseKind(pub String);

impl FromStr for CourseKind {
    type Err = UnknownCourseKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "curso" => Ok(Self::Curso),
            "certificado" => Ok(Self::Certificado),
            "distintivo" => Ok(Self::Distintivo),
            "evaluacion" | "evaluación" => Ok(Self::Evaluacion),
            "diplomado" => Ok(Self::Diplomado),
            "seminario" => Ok(Self::Seminario),
            _ => Err(UnknownCourseKind(s.to_owned())),
        }
    }
}

/// Validation failures for course details.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CourseValidationError {
    /// A required text field was blank.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Offending field.
        field: &'static str,
    },
    /// The course ends before it starts.
    #[error("course must end after it starts")]
    InvalidSchedule,
    /// The course has no duration.
    #[error("duration must be at least one hour")]
    InvalidDuration,
    /// The capacity bounds are inverted or zero.
    #[error("capacity must satisfy 1 <= cupoMinimo <= cupoMaximo, got {minimum}..{maximum}")]
    InvalidCapacity {
        /// Requested minimum.
        minimum: u32,
        /// Requested maximum.
        maximum: u32,
    },
    /// A cost was negative or not a number.
    #[error("{field} must be a non-negative amount")]
    InvalidCost {
        /// Offending field.
        field: &'static str,
    },
    /// The new maximum would leave live enrollments without a seat.
    #[error("cupoMaximo {maximum} is below the {live} live enrollments")]
    CapacityBelowRoster {
        /// Requested maximum.
        maximum: u32,
        /// Current live roster size.
        live: usize,
    },
}

/// Descriptive, admin-editable part of a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetails {
    /// Display name.
    pub name: String,
    /// Offering kind.
    pub kind: CourseKind,
    /// First session.
    pub starts_at: DateTime<Utc>,
    /// Last session.
    pub ends_at: DateTime<Utc>,
    /// Free-form timetable, e.g. "Lun-Vie 9:00-13:00".
    #[serde(default)]
    pub schedule: Option<String>,
    /// Total contact hours.
    pub duration_hours: u32,
    /// Delivery mode, e.g. presencial or en línea.
    #[serde(default)]
    pub modality: Option<String>,
    /// Instructor name.
    pub instructor: String,
    /// Learning objective.
    pub objective: String,
    /// Minimum enrollments for the course to run.
    #[serde(rename = "cupoMinimo")]
    pub minimum_capacity: u32,
    /// Seat limit enforced on enroll.
    #[serde(rename = "cupoMaximo")]
    pub maximum_capacity: u32,
    /// Syllabus outline.
    pub syllabus: String,
    /// Price for affiliated participants.
    pub cost: f64,
    /// Price for the general public.
    pub general_cost: f64,
}

impl CourseDetails {
    /// Check field-level rules.
    pub fn validate(&self) -> Result<(), CourseValidationError> {
        for (field, value) in [
            ("name", &self.name),
            ("instructor", &self.instructor),
            ("objective", &self.objective),
            ("syllabus", &self.syllabus),
        ] {
            if value.trim().is_empty() {
                return Err(CourseValidationError::EmptyField { field });
            }
        }
        if self.ends_at <= self.starts_at {
            return Err(CourseValidationError::InvalidSchedule);
        }
        if self.duration_hours == 0 {
            return Err(CourseValidationError::InvalidDuration);
        }
        if self.minimum_capacity == 0 || self.minimum_capacity > self.maximum_capacity {
            return Err(CourseValidationError::InvalidCapacity {
                minimum: self.minimum_capacity,
                maximum: self.maximum_capacity,
            });
        }
        for (field, amount) in [("cost", self.cost), ("generalCost", self.general_cost)] {
            if !amount.is_finite() || amount < 0.0 {
                return Err(CourseValidationError::InvalidCost { field });
            }
        }
        Ok(())
    }
}

/// Course aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    id: CourseId,
    details: CourseDetails,
    #[serde(default)]
    roster: Vec<RosterEntry>,
    revision: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Course {
    /// Create a new, unsaved course at revision 1.
    pub fn create(
        id: CourseId,
        details: CourseDetails,
        now: DateTime<Utc>,
    ) -> Result<Self, CourseValidationError> {
        details.validate()?;
        Ok(Self {
            id,
            details,
            roster: Vec::new(),
            revision: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Identifier.
    pub const fn id(&self) -> CourseId {
        self.id
    }

    /// Reference used in error reports.
    pub fn reference(&self) -> AggregateRef {
        AggregateRef::new(AggregateKind::Course, *self.id.as_uuid())
    }

    /// Descriptive details.
    pub const fn details(&self) -> &CourseDetails {
        &self.details
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.details.name
    }

    /// Full roster including withdrawn entries.
    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    /// Stored revision.
    pub const fn revision(&self) -> u32 {
        self.revision
    }

    /// Creation timestamp.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification timestamp.
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Number of entries occupying a seat.
    pub fn live_count(&self) -> usize {
        self.roster.iter().filter(|entry| entry.is_live()).count()
    }

    /// Seats still available.
    pub fn seats_left(&self) -> usize {
        usize::try_from(self.details.maximum_capacity)
            .unwrap_or(usize::MAX)
            .saturating_sub(self.live_count())
    }

    /// Whether one more participant fits.
    pub fn has_seat(&self) -> bool {
        self.seats_left() > 0
    }

    /// Roster entry for `participant_id`, live or not.
    pub fn roster_entry(&self, participant_id: &ParticipantId) -> Option<&RosterEntry> {
        self.roster
            .iter()
            .find(|entry| entry.participant_id == *participant_id)
    }

    /// Whether `participant_id` holds a live seat.
    pub fn has_live_entry(&self, participant_id: &ParticipantId) -> bool {
        self.roster_entry(participant_id)
            .is_some_and(RosterEntry::is_live)
    }

    /// Seat `participant_id`. A withdrawn entry is reactivated in place so the
    /// roster never holds two entries for one participant.
    pub fn admit(&mut self, participant_id: ParticipantId, enrolled_at: DateTime<Utc>) {
        match self
            .roster
            .iter_mut()
            .find(|entry| entry.participant_id == participant_id)
        {
            Some(entry) => {
                entry.status = EnrollmentStatus::Enrolled;
                entry.enrolled_at = enrolled_at;
            }
            None => self.roster.push(RosterEntry {
                participant_id,
                enrolled_at,
                status: EnrollmentStatus::Enrolled,
            }),
        }
    }

    /// Set the mirrored status. Returns `false` when there is no entry or the
    /// status is unchanged.
    pub fn set_roster_status(
        &mut self,
        participant_id: &ParticipantId,
        status: EnrollmentStatus,
    ) -> bool {
        match self
            .roster
            .iter_mut()
            .find(|entry| entry.participant_id == *participant_id)
        {
            Some(entry) if entry.status != status => {
                entry.status = status;
                true
            }
            _ => false,
        }
    }

    /// Drop the roster entry for `participant_id` entirely.
    pub fn remove_from_roster(&mut self, participant_id: &ParticipantId) -> bool {
        let before = self.roster.len();
        self.roster
            .retain(|entry| entry.participant_id != *participant_id);
        self.roster.len() != before
    }

    /// Replace the descriptive details, keeping the roster within capacity.
    pub fn revise(&mut self, details: CourseDetails) -> Result<(), CourseValidationError> {
        details.validate()?;
        let live = self.live_count();
        if usize::try_from(details.maximum_capacity).unwrap_or(usize::MAX) < live {
            return Err(CourseValidationError::CapacityBelowRoster {
                maximum: details.maximum_capacity,
                live,
            });
        }
        self.details = details;
        Ok(())
    }

    /// Stamp a modification and return the revision the store must still hold.
    pub fn advance(&mut self, now: DateTime<Utc>) -> u32 {
        let expected = self.revision;
        self.revision = self.revision.saturating_add(1);
        self.updated_at = now;
        expected
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.details.name, self.id)
    }
}
