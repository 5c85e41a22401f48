//! Strongly typed aggregate identifiers.
//!
//! Each aggregate gets its own UUID newtype so a participant id can never be
//! handed to a course lookup by accident.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Raised when a textual identifier is not a UUID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} id must be a valid UUID, got {value:?}")]
pub struct IdValidationError {
    kind: &'static str,
    value: String,
}

impl IdValidationError {
    /// Label of the identifier kind that failed to parse.
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        #[schema(value_type = String, format = Uuid)]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a new random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Borrow the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse a textual UUID, trimming surrounding whitespace.
            pub fn parse(raw: &str) -> Result<Self, IdValidationError> {
                Uuid::parse_str(raw.trim())
                    .map(Self)
                    .map_err(|_| IdValidationError {
                        kind: $label,
                        value: raw.to_owned(),
                    })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = IdValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

define_id!(
    /// Identifier of a [`Course`](super::Course).
    CourseId,
    "course"
);
define_id!(
    /// Identifier of a [`Participant`](super::Participant).
    ParticipantId,
    "participant"
);
define_id!(
    /// Identifier of a [`Company`](super::Company).
    CompanyId,
    "company"
);
define_id!(
    /// Identifier of an authenticated administrator.
    AdminId,
    "admin"
);
