//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`). Only
//! compiled for tests or with the `test-support` feature.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use uuid::Uuid;

use crate::domain::ports::{
    CompanyRepository, CourseRepository, ParticipantRepository, StoreError,
};
use crate::domain::{
    Company, CompanyContact, CompanyId, CompanyName, CompanyProfile, Course, CourseDetails,
    CourseId, CourseKind, Curp, EmailAddress, Municipality, Participant, ParticipantId,
    ParticipantProfile, TaxId, TrainingStores,
};
use crate::outbound::memory::{
    InMemoryCompanyRepository, InMemoryCourseRepository, InMemoryParticipantRepository,
};

/// Fixed start of every test timeline.
pub fn fixture_timestamp() -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2026, 1, 12, 9, 0, 0).single() {
        Some(at) => at,
        None => panic!("fixture timestamp is valid"),
    }
}

/// Clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward.
    pub fn advance_minutes(&self, minutes: i64) {
        *self.lock_clock() += TimeDelta::minutes(minutes);
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Valid course details with `maximum` seats.
pub fn course_details(name: &str, maximum: u32) -> CourseDetails {
    let starts_at = fixture_timestamp() + TimeDelta::days(7);
    CourseDetails {
        name: name.to_owned(),
        kind: CourseKind::Curso,
        starts_at,
        ends_at: starts_at + TimeDelta::days(4),
        schedule: Some("Lun-Vie 9:00-13:00".to_owned()),
        duration_hours: 20,
        modality: Some("presencial".to_owned()),
        instructor: "Laura Méndez".to_owned(),
        objective: "Aplicar buenas prácticas de higiene".to_owned(),
        minimum_capacity: 1,
        maximum_capacity: maximum,
        syllabus: "Contaminación; limpieza; almacenamiento".to_owned(),
        cost: 500.0,
        general_cost: 800.0,
    }
}

/// Valid participant profile for `email`.
pub fn participant_profile(name: &str, email: &str) -> ParticipantProfile {
    ParticipantProfile {
        name: name.to_owned(),
        position: "Cocinera".to_owned(),
        age: 34,
        email: EmailAddress::new(email).unwrap_or_else(|err| panic!("fixture email: {err}")),
        phone: "6181234567".to_owned(),
        curp: Curp::new("LOAA900101MDGPNN09").unwrap_or_else(|err| panic!("fixture curp: {err}")),
    }
}

/// Valid company profile for `tax_id`.
pub fn company_profile(tax_id: &str) -> CompanyProfile {
    CompanyProfile {
        business_type: "restaurante".to_owned(),
        tax_id: TaxId::new(tax_id).unwrap_or_else(|err| panic!("fixture tax id: {err}")),
        phone: Some("6188112233".to_owned()),
        email: None,
        address: "Av. 20 de Noviembre 100".to_owned(),
        municipality: Municipality::new("Durango")
            .unwrap_or_else(|err| panic!("fixture municipality: {err}")),
        contact: CompanyContact::default(),
    }
}

/// Valid company name.
pub fn company_name(name: &str) -> CompanyName {
    CompanyName::new(name).unwrap_or_else(|err| panic!("fixture company name: {err}"))
}

/// Unsaved course.
pub fn new_course(name: &str, maximum: u32) -> Course {
    Course::create(CourseId::random(), course_details(name, maximum), fixture_timestamp())
        .unwrap_or_else(|err| panic!("fixture course: {err}"))
}

/// Unsaved participant.
pub fn new_participant(name: &str, email: &str) -> Participant {
    Participant::create(
        ParticipantId::random(),
        participant_profile(name, email),
        fixture_timestamp(),
    )
    .unwrap_or_else(|err| panic!("fixture participant: {err}"))
}

/// Unsaved company.
pub fn new_company(name: &str, tax_id: &str) -> Company {
    Company::register(
        CompanyId::random(),
        company_name(name),
        company_profile(tax_id),
        fixture_timestamp(),
    )
    .unwrap_or_else(|err| panic!("fixture company: {err}"))
}

/// Failures to inject into a [`Faulty`] store.
#[derive(Default)]
pub struct FaultPlan {
    failing_saves: Mutex<HashSet<Uuid>>,
    fail_all_saves: AtomicBool,
    fail_renames: AtomicBool,
    save_delay: Mutex<Option<Duration>>,
}

impl FaultPlan {
    /// Plan with no faults.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make saves of document `id` fail with a connection error.
    pub fn fail_save_of(&self, id: Uuid) {
        self.lock_ids().insert(id);
    }

    /// Stop failing saves of document `id`.
    pub fn heal_save_of(&self, id: Uuid) {
        self.lock_ids().remove(&id);
    }

    /// Toggle failure of every save.
    pub fn fail_all_saves(&self, enabled: bool) {
        self.fail_all_saves.store(enabled, Ordering::SeqCst);
    }

    /// Toggle failure of bulk company renames.
    pub fn fail_renames(&self, enabled: bool) {
        self.fail_renames.store(enabled, Ordering::SeqCst);
    }

    /// Delay every save, e.g. to trip the store timeout.
    pub fn delay_saves(&self, delay: Option<Duration>) {
        *self.lock_delay() = delay;
    }

    fn lock_ids(&self) -> MutexGuard<'_, HashSet<Uuid>> {
        match self.failing_saves.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("fault plan mutex"),
        }
    }

    fn lock_delay(&self) -> MutexGuard<'_, Option<Duration>> {
        match self.save_delay.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("fault plan mutex"),
        }
    }

    async fn before_save(&self, id: Uuid) -> Result<(), StoreError> {
        let delay = *self.lock_delay();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_all_saves.load(Ordering::SeqCst) || self.lock_ids().contains(&id) {
            return Err(StoreError::connection(format!("injected save failure for {id}")));
        }
        Ok(())
    }
}

/// Store wrapper that fails according to a shared [`FaultPlan`].
pub struct Faulty<R> {
    inner: R,
    plan: Arc<FaultPlan>,
}

impl<R> Faulty<R> {
    /// Wrap `inner`.
    pub fn new(inner: R, plan: Arc<FaultPlan>) -> Self {
        Self { inner, plan }
    }
}

#[async_trait]
impl<R: CourseRepository> CourseRepository for Faulty<R> {
    async fn find_by_id(&self, id: &CourseId) -> Result<Option<Course>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn list(&self) -> Result<Vec<Course>, StoreError> {
        self.inner.list().await
    }

    async fn save(&self, course: &Course, expected_revision: Option<u32>) -> Result<(), StoreError> {
        self.plan.before_save(*course.id().as_uuid()).await?;
        self.inner.save(course, expected_revision).await
    }

    async fn delete(&self, id: &CourseId) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }
}

#[async_trait]
impl<R: ParticipantRepository> ParticipantRepository for Faulty<R> {
    async fn find_by_id(&self, id: &ParticipantId) -> Result<Option<Participant>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Participant>, StoreError> {
        self.inner.find_by_email(email).await
    }

    async fn list(&self) -> Result<Vec<Participant>, StoreError> {
        self.inner.list().await
    }

    async fn list_by_company(&self, company_id: &CompanyId) -> Result<Vec<Participant>, StoreError> {
        self.inner.list_by_company(company_id).await
    }

    async fn list_enrolled_in(&self, course_id: &CourseId) -> Result<Vec<Participant>, StoreError> {
        self.inner.list_enrolled_in(course_id).await
    }

    async fn save(
        &self,
        participant: &Participant,
        expected_revision: Option<u32>,
    ) -> Result<(), StoreError> {
        self.plan.before_save(*participant.id().as_uuid()).await?;
        self.inner.save(participant, expected_revision).await
    }

    async fn rename_company(&self, company_id: &CompanyId, name: &str) -> Result<usize, StoreError> {
        if self.plan.fail_renames.load(Ordering::SeqCst) {
            return Err(StoreError::connection("injected rename failure"));
        }
        self.inner.rename_company(company_id, name).await
    }

    async fn delete(&self, id: &ParticipantId) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }
}

#[async_trait]
impl<R: CompanyRepository> CompanyRepository for Faulty<R> {
    async fn find_by_id(&self, id: &CompanyId) -> Result<Option<Company>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_tax_id(&self, tax_id: &TaxId) -> Result<Option<Company>, StoreError> {
        self.inner.find_by_tax_id(tax_id).await
    }

    async fn list(&self) -> Result<Vec<Company>, StoreError> {
        self.inner.list().await
    }

    async fn save(&self, company: &Company, expected_revision: Option<u32>) -> Result<(), StoreError> {
        self.plan.before_save(*company.id().as_uuid()).await?;
        self.inner.save(company, expected_revision).await
    }

    async fn delete(&self, id: &CompanyId) -> Result<bool, StoreError> {
        self.inner.delete(id).await
    }
}

/// Stores type used by in-memory test harnesses.
pub type FaultyStores = TrainingStores<
    Faulty<InMemoryCourseRepository>,
    Faulty<InMemoryParticipantRepository>,
    Faulty<InMemoryCompanyRepository>,
>;

/// Fresh in-memory stores sharing one fault plan.
pub fn faulty_stores(clock: Arc<dyn Clock>) -> (FaultyStores, Arc<FaultPlan>) {
    let plan = FaultPlan::new();
    let stores = TrainingStores::new(
        Arc::new(Faulty::new(InMemoryCourseRepository::new(), Arc::clone(&plan))),
        Arc::new(Faulty::new(
            InMemoryParticipantRepository::with_clock(clock),
            Arc::clone(&plan),
        )),
        Arc::new(Faulty::new(InMemoryCompanyRepository::new(), Arc::clone(&plan))),
    );
    (stores, plan)
}
