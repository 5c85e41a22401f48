//! Company aggregate: business profile plus the affiliate list.
//!
//! The affiliate list mirrors the participants whose company link points here.
//! It never holds the same participant twice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{
    AggregateKind, AggregateRef, CompanyId, EmailAddress, Municipality, ParticipantId, TaxId,
};

/// Operating state of a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    /// Operating normally.
    Active,
    /// No longer operating.
    Inactive,
    /// Temporarily barred from enrolling new staff.
    Suspended,
}

/// State of one affiliate entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AffiliateStatus {
    /// Participant is active.
    Active,
    /// Participant was deactivated but stays on the books.
    Inactive,
}

/// One entry in the company's affiliate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Affiliate {
    /// Affiliated participant.
    pub participant_id: ParticipantId,
    /// When the affiliation was recorded.
    pub affiliated_at: DateTime<Utc>,
    /// Entry state.
    pub status: AffiliateStatus,
}

/// Validation failures for company data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompanyValidationError {
    /// A required text field was blank.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Offending field.
        field: &'static str,
    },
}

/// Trimmed, non-empty company name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "Restaurante El Fogón")]
pub struct CompanyName(String);

impl CompanyName {
    /// Validate a company name.
    pub fn new(raw: impl Into<String>) -> Result<Self, CompanyValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CompanyValidationError::EmptyField { field: "name" });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for CompanyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CompanyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CompanyName> for String {
    fn from(value: CompanyName) -> Self {
        value.0
    }
}

impl TryFrom<String> for CompanyName {
    type Error = CompanyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Company contact person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyContact {
    /// Contact name.
    #[serde(default)]
    pub name: Option<String>,
    /// Contact job title.
    #[serde(default)]
    pub position: Option<String>,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Contact email.
    #[serde(default)]
    pub email: Option<EmailAddress>,
}

/// Admin-editable company data other than the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    /// Business type, e.g. restaurante or hotel.
    pub business_type: String,
    /// Unique federal tax id.
    pub tax_id: TaxId,
    /// Main phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Main email.
    #[serde(default)]
    pub email: Option<EmailAddress>,
    /// Street address.
    pub address: String,
    /// Municipality within the state.
    pub municipality: Municipality,
    /// Contact person.
    #[serde(default)]
    pub contact: CompanyContact,
}

impl CompanyProfile {
    /// Check field-level rules.
    pub fn validate(&self) -> Result<(), CompanyValidationError> {
        if self.business_type.trim().is_empty() {
            return Err(CompanyValidationError::EmptyField {
                field: "businessType",
            });
        }
        if self.address.trim().is_empty() {
            return Err(CompanyValidationError::EmptyField { field: "address" });
        }
        Ok(())
    }
}

/// Company aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    id: CompanyId,
    name: CompanyName,
    profile: CompanyProfile,
    #[serde(default)]
    affiliates: Vec<Affiliate>,
    status: CompanyStatus,
    revision: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Company {
    /// Register a new, unsaved, active company at revision 1.
    pub fn register(
        id: CompanyId,
        name: CompanyName,
        profile: CompanyProfile,
        now: DateTime<Utc>,
    ) -> Result<Self, CompanyValidationError> {
        profile.validate()?;
        Ok(Self {
            id,
            name,
            profile,
            affiliates: Vec::new(),
            status: CompanyStatus::Active,
            revision: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Identifier.
    pub const fn id(&self) -> CompanyId {
        self.id
    }

    /// Reference used in error reports.
    pub fn reference(&self) -> AggregateRef {
        AggregateRef::new(AggregateKind::Company, *self.id.as_uuid())
    }

    /// Current name.
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    /// Profile data.
    pub const fn profile(&self) -> &CompanyProfile {
        &self.profile
    }

    /// Federal tax id.
    pub const fn tax_id(&self) -> &TaxId {
        &self.profile.tax_id
    }

    /// Operating state.
    pub const fn status(&self) -> CompanyStatus {
        self.status
    }

    /// Affiliate entries.
    pub fn affiliates(&self) -> &[Affiliate] {
        &self.affiliates
    }

    /// Whether any participant is still listed.
    pub fn has_affiliates(&self) -> bool {
        !self.affiliates.is_empty()
    }

    /// Stored revision.
    pub const fn revision(&self) -> u32 {
        self.revision
    }

    /// Creation timestamp.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last write timestamp.
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Entry for `participant_id`.
    pub fn affiliate(&self, participant_id: &ParticipantId) -> Option<&Affiliate> {
        self.affiliates
            .iter()
            .find(|affiliate| affiliate.participant_id == *participant_id)
    }

    /// Add `participant_id` unless already listed. Returns `false` when the
    /// entry already existed.
    pub fn add_affiliate(
        &mut self,
        participant_id: ParticipantId,
        affiliated_at: DateTime<Utc>,
        status: AffiliateStatus,
    ) -> bool {
        if self.affiliate(&participant_id).is_some() {
            return false;
        }
        self.affiliates.push(Affiliate {
            participant_id,
            affiliated_at,
            status,
        });
        true
    }

    /// Drop the entry for `participant_id`.
    pub fn remove_affiliate(&mut self, participant_id: &ParticipantId) -> bool {
        let before = self.affiliates.len();
        self.affiliates
            .retain(|affiliate| affiliate.participant_id != *participant_id);
        self.affiliates.len() != before
    }

    /// Change an entry's status. Returns `false` when absent or unchanged.
    pub fn set_affiliate_status(
        &mut self,
        participant_id: &ParticipantId,
        status: AffiliateStatus,
    ) -> bool {
        match self
            .affiliates
            .iter_mut()
            .find(|affiliate| affiliate.participant_id == *participant_id)
        {
            Some(affiliate) if affiliate.status != status => {
                affiliate.status = status;
                true
            }
            _ => false,
        }
    }

    /// Change the name. Returns `false` when unchanged.
    pub fn rename(&mut self, name: CompanyName) -> bool {
        if self.name == name {
            return false;
        }
        self.name = name;
        true
    }

    /// Replace profile and operating state.
    pub fn revise(
        &mut self,
        profile: CompanyProfile,
        status: CompanyStatus,
    ) -> Result<(), CompanyValidationError> {
        profile.validate()?;
        self.profile = profile;
        self.status = status;
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
