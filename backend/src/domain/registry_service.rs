//! Registry service: single-document CRUD for courses, participants,
//! companies and certificates.
//!
//! Company links are never edited here. Affiliation on creation and company
//! renames are delegated to the [`AffiliationCommand`] so the mirrored
//! fields stay in step.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::info;

use crate::domain::ports::{
    AffiliationCommand, CertificateUpload, CompanyRepository, CompanyUpdate, CompanyUpdated,
    CourseRepository, NewCompany, NewParticipant, ParticipantRepository, RegistryCommand,
    RegistryQuery,
};
use crate::domain::{
    Certificate, CertificateStatus, Company, CompanyId, Course, CourseDetails, CourseId,
    EmailAddress, Participant, ParticipantId, ParticipantProfile, ParticipantStatus, TaxId,
    TrainingError, TrainingStores, retry_stale,
};

use super::enrollment_coordinator::DEFAULT_RETRY_LIMIT;

/// Implements [`RegistryCommand`] and [`RegistryQuery`].
pub struct RegistryService<C: ?Sized, P: ?Sized, K: ?Sized> {
    stores: TrainingStores<C, P, K>,
    clock: Arc<dyn Clock>,
    affiliation: Arc<dyn AffiliationCommand>,
    retry_limit: u32,
}

impl<C: ?Sized, P: ?Sized, K: ?Sized> RegistryService<C, P, K> {
    /// Create a service.
    pub fn new(
        stores: TrainingStores<C, P, K>,
        clock: Arc<dyn Clock>,
        affiliation: Arc<dyn AffiliationCommand>,
    ) -> Self {
        Self {
            stores,
            clock,
            affiliation,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }

    /// Override the optimistic retry limit.
    #[must_use]
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }
}

/// A duplicate-key rejection from the participant store means the email.
fn email_clash(email: &EmailAddress) -> impl Fn(TrainingError) -> TrainingError + '_ {
    move |err| match err {
        TrainingError::Conflict { .. } => TrainingError::EmailTaken {
            email: email.as_ref().to_owned(),
        },
        other => other,
    }
}

/// A duplicate-key rejection from the company store means the tax id.
fn tax_id_clash(tax_id: &TaxId) -> impl Fn(TrainingError) -> TrainingError + '_ {
    move |err| match err {
        TrainingError::Conflict { .. } => TrainingError::TaxIdTaken {
            tax_id: tax_id.as_ref().to_owned(),
        },
        other => other,
    }
}

impl<C, P, K> RegistryService<C, P, K>
where
    C: CourseRepository + ?Sized,
    P: ParticipantRepository + ?Sized,
    K: CompanyRepository + ?Sized,
{
    async fn ensure_email_free(
        &self,
        email: &EmailAddress,
        owner: Option<ParticipantId>,
    ) -> Result<(), TrainingError> {
        match self.stores.find_participant_by_email(email).await? {
            Some(existing) if Some(existing.id()) != owner => Err(TrainingError::EmailTaken {
                email: email.as_ref().to_owned(),
            }),
            _ => Ok(()),
        }
    }

    async fn ensure_tax_id_free(
        &self,
        tax_id: &TaxId,
        owner: Option<CompanyId>,
    ) -> Result<(), TrainingError> {
        match self.stores.find_company_by_tax_id(tax_id).await? {
            Some(existing) if Some(existing.id()) != owner => Err(TrainingError::TaxIdTaken {
                tax_id: tax_id.as_ref().to_owned(),
            }),
            _ => Ok(()),
        }
    }

    /// A participant saved by an earlier create whose affiliation with
    /// `company_id` never completed: same e-mail, same profile and no link to
    /// another company.
    async fn unfinished_create(
        &self,
        profile: &ParticipantProfile,
        company_id: CompanyId,
    ) -> Result<Option<Participant>, TrainingError> {
        let existing = self.stores.find_participant_by_email(&profile.email).await?;
        Ok(existing.filter(|participant| {
            participant.profile() == profile
                && participant
                    .company()
                    .is_none_or(|link| link.company_id == company_id)
        }))
    }

    /// Reload, apply `change` and compare-and-set save a participant.
    async fn change_participant<T, F>(
        &self,
        participant_id: ParticipantId,
        operation: &'static str,
        change: F,
    ) -> Result<(Participant, T), TrainingError>
    where
        F: Fn(&mut Participant) -> Result<T, TrainingError> + Sync,
        T: Send,
    {
        let change = &change;
        retry_stale(self.retry_limit, operation, move || async move {
            let mut participant = self.stores.load_participant(&participant_id).await?;
            let value = change(&mut participant)?;
            let expected = participant.advance(self.clock.utc());
            self.stores
                .save_participant(&participant, Some(expected))
                .await
                .map_err(email_clash(&participant.profile().email))?;
            Ok((participant, value))
        })
        .await
    }
}

#[async_trait]
impl<C, P, K> RegistryCommand for RegistryService<C, P, K>
where
    C: CourseRepository + ?Sized,
    P: ParticipantRepository + ?Sized,
    K: CompanyRepository + ?Sized,
{
    async fn create_course(&self, details: CourseDetails) -> Result<Course, TrainingError> {
        let course = Course::create(CourseId::random(), details, self.clock.utc())?;
        self.stores.save_course(&course, None).await?;
        info!(course_id = %course.id(), name = course.name(), "course created");
        Ok(course)
    }

    async fn update_course(
        &self,
        course_id: CourseId,
        details: CourseDetails,
    ) -> Result<Course, TrainingError> {
        let details = &details;
        retry_stale(self.retry_limit, "update_course", move || async move {
            let mut course = self.stores.load_course(&course_id).await?;
            course.revise(details.clone())?;
            let expected = course.advance(self.clock.utc());
            self.stores.save_course(&course, Some(expected)).await?;
            Ok(course)
        })
        .await
    }

    async fn create_participant(&self, new: NewParticipant) -> Result<Participant, TrainingError> {
        let NewParticipant {
            profile,
            company_id,
        } = new;
        if let Some(company_id) = company_id {
            self.stores.load_company(&company_id).await?;
            if let Some(existing) = self.unfinished_create(&profile, company_id).await? {
                let participant_id = existing.id();
                info!(%participant_id, %company_id, "resuming participant creation");
                self.affiliation.affiliate(company_id, participant_id).await?;
                return self.stores.load_participant(&participant_id).await;
            }
        }
        self.ensure_email_free(&profile.email, None).await?;

        let participant = Participant::create(ParticipantId::random(), profile, self.clock.utc())?;
        self.stores
            .save_participant(&participant, None)
            .await
            .map_err(email_clash(&participant.profile().email))?;
        let participant_id = participant.id();
        info!(%participant_id, "participant created");

        match company_id {
            Some(company_id) => {
                self.affiliation.affiliate(company_id, participant_id).await?;
                self.stores.load_participant(&participant_id).await
            }
            None => Ok(participant),
        }
    }

    async fn update_participant(
        &self,
        participant_id: ParticipantId,
        profile: ParticipantProfile,
    ) -> Result<Participant, TrainingError> {
        self.ensure_email_free(&profile.email, Some(participant_id))
            .await?;
        let profile = &profile;
        let (participant, ()) = self
            .change_participant(participant_id, "update_participant", |participant| {
                participant.revise(profile.clone()).map_err(TrainingError::from)
            })
            .await?;
        Ok(participant)
    }

    async fn attach_certificate(
        &self,
        participant_id: ParticipantId,
        upload: CertificateUpload,
    ) -> Result<Certificate, TrainingError> {
        if upload.public_id.trim().is_empty() {
            return Err(TrainingError::validation("publicId must not be empty"));
        }
        let certificate = Certificate {
            public_id: upload.public_id,
            url: upload.url,
            file_name: upload.file_name,
            category: upload.category,
            uploaded_at: upload.uploaded_at.unwrap_or_else(|| self.clock.utc()),
            status: CertificateStatus::Active,
        };
        let attached = &certificate;
        self.change_participant(participant_id, "attach_certificate", |participant| {
            participant.attach_certificate(attached.clone());
            Ok(())
        })
        .await?;
        info!(%participant_id, public_id = %certificate.public_id, "certificate attached");
        Ok(certificate)
    }

    async fn revoke_certificate(
        &self,
        participant_id: ParticipantId,
        public_id: String,
    ) -> Result<Certificate, TrainingError> {
        let wanted = public_id.as_str();
        let (_, certificate) = self
            .change_participant(participant_id, "revoke_certificate", |participant| {
                participant
                    .revoke_certificate(wanted)
                    .cloned()
                    .ok_or_else(|| TrainingError::CertificateNotFound {
                        participant_id,
                        public_id: wanted.to_owned(),
                    })
            })
            .await?;
        info!(%participant_id, %public_id, "certificate revoked");
        Ok(certificate)
    }

    async fn register_company(&self, new: NewCompany) -> Result<Company, TrainingError> {
        let NewCompany { name, profile } = new;
        self.ensure_tax_id_free(&profile.tax_id, None).await?;
        let company = Company::register(CompanyId::random(), name, profile, self.clock.utc())?;
        self.stores
            .save_company(&company, None)
            .await
            .map_err(tax_id_clash(company.tax_id()))?;
        info!(company_id = %company.id(), name = company.name(), "company registered");
        Ok(company)
    }

    async fn update_company(
        &self,
        company_id: CompanyId,
        update: CompanyUpdate,
    ) -> Result<CompanyUpdated, TrainingError> {
        let CompanyUpdate {
            name,
            profile,
            status,
        } = update;
        self.ensure_tax_id_free(&profile.tax_id, Some(company_id))
            .await?;

        let profile = &profile;
        retry_stale(self.retry_limit, "update_company", move || async move {
            let mut company = self.stores.load_company(&company_id).await?;
            company.revise(profile.clone(), status)?;
            let expected = company.advance(self.clock.utc());
            self.stores
                .save_company(&company, Some(expected))
                .await
                .map_err(tax_id_clash(&profile.tax_id))?;
            Ok(())
        })
        .await?;

        // Refresh unconditionally: an earlier attempt may have left stale names.
        let rename = self.affiliation.rename_company(company_id, name).await?;
        let company = self.stores.load_company(&company_id).await?;
        Ok(CompanyUpdated {
            company,
            participants_updated: rename.participants_updated,
            stale_links: rename.stale_links,
        })
    }
}

#[async_trait]
impl<C, P, K> RegistryQuery for RegistryService<C, P, K>
where
    C: CourseRepository + ?Sized,
    P: ParticipantRepository + ?Sized,
    K: CompanyRepository + ?Sized,
{
    async fn get_course(&self, course_id: CourseId) -> Result<Course, TrainingError> {
        self.stores.load_course(&course_id).await
    }

    async fn list_courses(&self) -> Result<Vec<Course>, TrainingError> {
        self.stores.list_courses().await
    }

    async fn get_participant(
        &self,
        participant_id: ParticipantId,
    ) -> Result<Participant, TrainingError> {
        self.stores.load_participant(&participant_id).await
    }

    async fn list_participants(
        &self,
        status: Option<ParticipantStatus>,
    ) -> Result<Vec<Participant>, TrainingError> {
        let mut participants = self.stores.list_participants().await?;
        if let Some(status) = status {
            participants.retain(|participant| participant.status() == status);
        }
        Ok(participants)
    }

    async fn participant_history(&self) -> Result<Vec<Participant>, TrainingError> {
        let mut inactive = self
            .list_participants(Some(ParticipantStatus::Inactive))
            .await?;
        inactive.sort_by(|a, b| b.deactivated_at().cmp(&a.deactivated_at()));
        Ok(inactive)
    }

    async fn get_company(&self, company_id: CompanyId) -> Result<Company, TrainingError> {
        self.stores.load_company(&company_id).await
    }

    async fn list_companies(&self) -> Result<Vec<Company>, TrainingError> {
        self.stores.list_companies().await
    }
}

#[cfg(test)]
#[path = "registry_service_tests.rs"]
mod tests;
