//! Affiliation manager: keeps participant company links and company affiliate
//! lists in step.
//!
//! Affiliate and detach write the participant first and mirror onto the
//! company. The participant's `company_id` is authoritative; a rename only
//! refreshes the denormalised name, so a failed fan-out leaves stale names
//! rather than broken links.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use crate::domain::mirrors::{Mirror, MirrorContext};
use crate::domain::ports::{
    AffiliationCommand, AffiliationOutcome, CompanyRepository, CourseRepository,
    ParticipantRepository, RenameOutcome,
};
use crate::domain::{
    AffiliateStatus, AggregateKind, CompanyId, CompanyLink, CompanyName, ParticipantId,
    TrainingError, TrainingStores, retry_stale,
};

use super::enrollment_coordinator::DEFAULT_RETRY_LIMIT;

/// Implements [`AffiliationCommand`] over the participant and company stores.
pub struct AffiliationManager<C: ?Sized, P: ?Sized, K: ?Sized> {
    stores: TrainingStores<C, P, K>,
    clock: Arc<dyn Clock>,
    retry_limit: u32,
}

impl<C: ?Sized, P: ?Sized, K: ?Sized> AffiliationManager<C, P, K> {
    /// Create a manager.
    pub fn new(stores: TrainingStores<C, P, K>, clock: Arc<dyn Clock>) -> Self {
        Self {
            stores,
            clock,
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }

    /// Override the optimistic retry limit.
    #[must_use]
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    fn mirrors(&self) -> MirrorContext<'_, C, P, K> {
        MirrorContext {
            stores: &self.stores,
            now: self.clock.utc(),
            retry_limit: self.retry_limit,
        }
    }
}

impl<C, P, K> AffiliationManager<C, P, K>
where
    C: CourseRepository + ?Sized,
    P: ParticipantRepository + ?Sized,
    K: CompanyRepository + ?Sized,
{
    async fn affiliate_once(
        &self,
        company_id: CompanyId,
        participant_id: ParticipantId,
    ) -> Result<AffiliationOutcome, TrainingError> {
        let mut company = self.stores.load_company(&company_id).await?;
        let mut participant = self.stores.load_participant(&participant_id).await?;
        if let Some(link) = participant.company().filter(|link| link.company_id != company_id) {
            return Err(TrainingError::AlreadyAffiliatedElsewhere {
                participant_id,
                company_id: link.company_id,
                company_name: link.company_name.clone(),
            });
        }

        let now = self.clock.utc();
        let status = if participant.is_active() {
            AffiliateStatus::Active
        } else {
            AffiliateStatus::Inactive
        };
        let outcome = |changed, repaired| AffiliationOutcome {
            company_id,
            participant_id,
            changed,
            repaired,
        };

        match (
            participant.company().is_some(),
            company.affiliate(&participant_id).is_some(),
        ) {
            (true, true) => Ok(outcome(false, None)),
            (true, false) => {
                company.add_affiliate(participant_id, now, status);
                let expected = company.advance(now);
                self.stores.save_company(&company, Some(expected)).await?;
                info!(%company_id, %participant_id, "repaired company side of affiliation");
                Ok(outcome(true, Some(AggregateKind::Company)))
            }
            (false, true) => {
                participant.link_company(CompanyLink {
                    company_id,
                    company_name: company.name().to_owned(),
                });
                let expected = participant.advance(now);
                self.stores
                    .save_participant(&participant, Some(expected))
                    .await?;
                info!(%company_id, %participant_id, "repaired participant side of affiliation");
                Ok(outcome(true, Some(AggregateKind::Participant)))
            }
            (false, false) => {
                participant.link_company(CompanyLink {
                    company_id,
                    company_name: company.name().to_owned(),
                });
                let expected = participant.advance(now);
                self.stores
                    .save_participant(&participant, Some(expected))
                    .await?;

                let ahead = participant.reference();
                self.mirrors()
                    .update_company(company_id, |stored| {
                        stored.add_affiliate(participant_id, now, status)
                    })
                    .await
                    .and_then(|mirror| match mirror {
                        Mirror::Missing => Err(TrainingError::company_not_found(company_id)),
                        Mirror::Unchanged | Mirror::Updated => Ok(()),
                    })
                    .map_err(|err| TrainingError::diverged(ahead, company.reference(), &err))?;
                info!(%company_id, %participant_id, "participant affiliated");
                Ok(outcome(true, None))
            }
        }
    }

    async fn detach_once(
        &self,
        company_id: CompanyId,
        participant_id: ParticipantId,
    ) -> Result<AffiliationOutcome, TrainingError> {
        let mut company = self.stores.load_company(&company_id).await?;
        let mut participant = self.stores.load_participant(&participant_id).await?;
        let now = self.clock.utc();
        let outcome = |repaired| AffiliationOutcome {
            company_id,
            participant_id,
            changed: true,
            repaired,
        };

        let linked = participant
            .company()
            .is_some_and(|link| link.company_id == company_id);
        match (linked, company.affiliate(&participant_id).is_some()) {
            (false, false) => Err(TrainingError::NotAffiliated {
                participant_id,
                company_id,
            }),
            (true, true) => {
                participant.unlink_company();
                let expected = participant.advance(now);
                self.stores
                    .save_participant(&participant, Some(expected))
                    .await?;

                let ahead = participant.reference();
                self.mirrors()
                    .update_company(company_id, |stored| stored.remove_affiliate(&participant_id))
                    .await
                    .map_err(|err| TrainingError::diverged(ahead, company.reference(), &err))?;
                info!(%company_id, %participant_id, "participant detached");
                Ok(outcome(None))
            }
            (true, false) => {
                participant.unlink_company();
                let expected = participant.advance(now);
                self.stores
                    .save_participant(&participant, Some(expected))
                    .await?;
                info!(%company_id, %participant_id, "cleared one-sided company link");
                Ok(outcome(Some(AggregateKind::Participant)))
            }
            (false, true) => {
                company.remove_affiliate(&participant_id);
                let expected = company.advance(now);
                self.stores.save_company(&company, Some(expected)).await?;
                info!(%company_id, %participant_id, "removed stale affiliate entry");
                Ok(outcome(Some(AggregateKind::Company)))
            }
        }
    }

    async fn rename_once(&self, company_id: CompanyId, name: &CompanyName) -> Result<(), TrainingError> {
        let mut company = self.stores.load_company(&company_id).await?;
        if company.rename(name.clone()) {
            let expected = company.advance(self.clock.utc());
            self.stores.save_company(&company, Some(expected)).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<C, P, K> AffiliationCommand for AffiliationManager<C, P, K>
where
    C: CourseRepository + ?Sized,
    P: ParticipantRepository + ?Sized,
    K: CompanyRepository + ?Sized,
{
    async fn affiliate(
        &self,
        company_id: CompanyId,
        participant_id: ParticipantId,
    ) -> Result<AffiliationOutcome, TrainingError> {
        retry_stale(self.retry_limit, "affiliate", move || {
            self.affiliate_once(company_id, participant_id)
        })
        .await
    }

    async fn detach(
        &self,
        company_id: CompanyId,
        participant_id: ParticipantId,
    ) -> Result<AffiliationOutcome, TrainingError> {
        retry_stale(self.retry_limit, "detach", move || {
            self.detach_once(company_id, participant_id)
        })
        .await
    }

    async fn rename_company(
        &self,
        company_id: CompanyId,
        name: CompanyName,
    ) -> Result<RenameOutcome, TrainingError> {
        let wanted = &name;
        retry_stale(self.retry_limit, "rename_company", move || {
            self.rename_once(company_id, wanted)
        })
        .await?;

        let (participants_updated, stale_links) = match self
            .stores
            .rename_company_links(&company_id, name.as_ref())
            .await
        {
            Ok(count) => (count, false),
            Err(err) => {
                warn!(
                    %company_id,
                    error = %err,
                    "company renamed but participant names were not refreshed; rename again to repair"
                );
                (0, true)
            }
        };
        info!(%company_id, participants_updated, stale_links, "company renamed");
        Ok(RenameOutcome {
            company_id,
            name: name.as_ref().to_owned(),
            participants_updated,
            stale_links,
        })
    }

    async fn delete_company(&self, company_id: CompanyId) -> Result<(), TrainingError> {
        let company = self.stores.load_company(&company_id).await?;
        let mut referencing: HashSet<ParticipantId> = company
            .affiliates()
            .iter()
            .map(|affiliate| affiliate.participant_id)
            .collect();
        referencing.extend(
            self.stores
                .participants_of_company(&company_id)
                .await?
                .iter()
                .map(|participant| participant.id()),
        );
        if !referencing.is_empty() {
            return Err(TrainingError::HasAffiliates {
                company_id,
                count: referencing.len(),
            });
        }
        self.stores.delete_company(&company_id).await?;
        info!(%company_id, "company deleted");
        Ok(())
    }
}

#[cfg(test)]
#[path = "affiliation_manager_tests.rs"]
mod tests;
