//! Read-model builder: company and course views assembled from the three
//! stores.
//!
//! Nothing here writes. A company's affiliates are the participants whose
//! link points at it plus any id still listed on the company; ids that no
//! longer resolve are skipped and deleted courses resolve to `null`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;
use futures_util::future::try_join_all;

use crate::domain::ports::{
    AffiliateView, CompanyOverview, CompanyRepository, CompanyStatistics, CompanySummary,
    CourseGroup, CourseParticipant, CourseRepository, CourseRoster, CourseStatistics,
    CourseStatisticsLine, CourseSummary, EnrollmentView, OverviewStatistics,
    ParticipantRepository, ParticipantsByCourse, RosterLine, TrainingReadModel,
};
use crate::domain::{
    Company, CompanyId, Course, CourseId, Enrollment, EnrollmentStatus, Participant,
    ParticipantId, Score, TrainingError, TrainingStores,
};

/// Implements [`TrainingReadModel`].
pub struct ReadModelBuilder<C: ?Sized, P: ?Sized, K: ?Sized> {
    stores: TrainingStores<C, P, K>,
}

impl<C: ?Sized, P: ?Sized, K: ?Sized> ReadModelBuilder<C, P, K> {
    /// Create a builder.
    pub const fn new(stores: TrainingStores<C, P, K>) -> Self {
        Self { stores }
    }
}

type CourseIndex = BTreeMap<CourseId, Course>;

impl<C, P, K> ReadModelBuilder<C, P, K>
where
    C: CourseRepository + ?Sized,
    P: ParticipantRepository + ?Sized,
    K: CompanyRepository + ?Sized,
{
    async fn affiliates_of(&self, company: &Company) -> Result<Vec<Participant>, TrainingError> {
        let mut participants = self.stores.participants_of_company(&company.id()).await?;
        let known: HashSet<ParticipantId> = participants.iter().map(Participant::id).collect();
        let listed: Vec<ParticipantId> = company
            .affiliates()
            .iter()
            .map(|affiliate| affiliate.participant_id)
            .filter(|id| !known.contains(id))
            .collect();
        let extra = try_join_all(listed.iter().map(|id| self.stores.find_participant(id))).await?;
        participants.extend(extra.into_iter().flatten());
        Ok(participants)
    }

    async fn resolve_courses(&self, participants: &[Participant]) -> Result<CourseIndex, TrainingError> {
        let ids: BTreeSet<CourseId> = participants
            .iter()
            .flat_map(Participant::enrollments)
            .map(|enrollment| enrollment.course_id)
            .collect();
        let found = try_join_all(ids.iter().map(|id| self.stores.find_course(id))).await?;
        Ok(found
            .into_iter()
            .flatten()
            .map(|course| (course.id(), course))
            .collect())
    }

    async fn company_with_affiliates(
        &self,
        company_id: CompanyId,
    ) -> Result<(Company, Vec<Participant>), TrainingError> {
        let company = self.stores.load_company(&company_id).await?;
        let participants = self.affiliates_of(&company).await?;
        Ok((company, participants))
    }
}

/// Enrollment counts by status over a set of participants.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    enrolled: usize,
    completed: usize,
    withdrawn: usize,
}

impl Tally {
    fn add(&mut self, status: EnrollmentStatus) {
        match status {
            EnrollmentStatus::Enrolled => self.enrolled += 1,
            EnrollmentStatus::Completed => self.completed += 1,
            EnrollmentStatus::Withdrawn => self.withdrawn += 1,
        }
    }

    fn total(self) -> usize {
        self.enrolled + self.completed + self.withdrawn
    }

    fn over<'a>(enrollments: impl IntoIterator<Item = &'a Enrollment>) -> Self {
        let mut tally = Self::default();
        for enrollment in enrollments {
            tally.add(enrollment.status);
        }
        tally
    }
}

fn as_f64(count: usize) -> f64 {
    u32::try_from(count).map_or(f64::from(u32::MAX), f64::from)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// completed / enrolled x 100; zero when nothing is in progress.
fn completion_rate(tally: Tally) -> f64 {
    if tally.enrolled == 0 {
        return 0.0;
    }
    round2(as_f64(tally.completed) / as_f64(tally.enrolled) * 100.0)
}

fn average_score(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    Some(round2(scores.iter().sum::<f64>() / as_f64(scores.len())))
}

fn active_count(participants: &[Participant]) -> usize {
    participants.iter().filter(|p| p.is_active()).count()
}

/// Distinct courses with at least one enrollment in progress.
fn courses_in_progress(participants: &[Participant]) -> usize {
    participants
        .iter()
        .flat_map(Participant::enrollments)
        .filter(|enrollment| enrollment.status == EnrollmentStatus::Enrolled)
        .map(|enrollment| enrollment.course_id)
        .collect::<BTreeSet<_>>()
        .len()
}

fn enrollment_view(enrollment: &Enrollment, courses: &CourseIndex) -> EnrollmentView {
    EnrollmentView {
        course_id: enrollment.course_id,
        course: courses.get(&enrollment.course_id).map(CourseSummary::from),
        status: enrollment.status,
        enrolled_at: enrollment.enrolled_at,
        score: enrollment.score.map(Score::value),
        notes: enrollment.notes.clone(),
    }
}

fn affiliate_view(participant: &Participant, courses: &CourseIndex) -> AffiliateView {
    let profile = participant.profile();
    AffiliateView {
        participant_id: participant.id(),
        name: profile.name.clone(),
        email: profile.email.as_ref().to_owned(),
        position: profile.position.clone(),
        status: participant.status(),
        enrollments: participant
            .enrollments()
            .iter()
            .map(|enrollment| enrollment_view(enrollment, courses))
            .collect(),
    }
}

/// Orders resolved names first, alphabetically, then unresolved ids.
fn by_course_name(
    (left_name, left_id): (&Option<String>, CourseId),
    (right_name, right_id): (&Option<String>, CourseId),
) -> Ordering {
    (left_name.is_none(), left_name, left_id).cmp(&(right_name.is_none(), right_name, right_id))
}

fn statistics_lines(participants: &[Participant], courses: &CourseIndex) -> Vec<CourseStatisticsLine> {
    let mut grouped: BTreeMap<CourseId, (Tally, Vec<f64>)> = BTreeMap::new();
    for enrollment in participants.iter().flat_map(Participant::enrollments) {
        let (tally, scores) = grouped.entry(enrollment.course_id).or_default();
        tally.add(enrollment.status);
        if let Some(score) = enrollment.score {
            scores.push(score.value());
        }
    }
    let mut lines: Vec<CourseStatisticsLine> = grouped
        .into_iter()
        .map(|(course_id, (tally, scores))| CourseStatisticsLine {
            course_id,
            course_name: courses.get(&course_id).map(|course| course.name().to_owned()),
            total: tally.total(),
            enrolled: tally.enrolled,
            completed: tally.completed,
            withdrawn: tally.withdrawn,
            average_score: average_score(&scores),
        })
        .collect();
    lines.sort_by(|a, b| {
        by_course_name((&a.course_name, a.course_id), (&b.course_name, b.course_id))
    });
    lines
}

fn course_groups(participants: &[Participant], courses: &CourseIndex) -> Vec<CourseGroup> {
    let mut grouped: BTreeMap<CourseId, Vec<CourseParticipant>> = BTreeMap::new();
    for participant in participants {
        for enrollment in participant.enrollments() {
            grouped
                .entry(enrollment.course_id)
                .or_default()
                .push(CourseParticipant {
                    participant_id: participant.id(),
                    name: participant.profile().name.clone(),
                    email: participant.profile().email.as_ref().to_owned(),
                    status: enrollment.status,
                    enrolled_at: enrollment.enrolled_at,
                    score: enrollment.score.map(Score::value),
                });
        }
    }
    let mut groups: Vec<CourseGroup> = grouped
        .into_iter()
        .map(|(course_id, participants)| CourseGroup {
            course_id,
            course: courses.get(&course_id).map(CourseSummary::from),
            participants,
        })
        .collect();
    groups.sort_by(|a, b| {
        let left = a.course.as_ref().map(|course| course.name.clone());
        let right = b.course.as_ref().map(|course| course.name.clone());
        by_course_name((&left, a.course_id), (&right, b.course_id))
    });
    groups
}

#[async_trait]
impl<C, P, K> TrainingReadModel for ReadModelBuilder<C, P, K>
where
    C: CourseRepository + ?Sized,
    P: ParticipantRepository + ?Sized,
    K: CompanyRepository + ?Sized,
{
    async fn company_overview(&self, company_id: CompanyId) -> Result<CompanyOverview, TrainingError> {
        let (company, participants) = self.company_with_affiliates(company_id).await?;
        let courses = self.resolve_courses(&participants).await?;
        let completed = Tally::over(participants.iter().flat_map(Participant::enrollments)).completed;
        let statistics = OverviewStatistics {
            total_participants: participants.len(),
            active_participants: active_count(&participants),
            live_courses: courses_in_progress(&participants),
            completed_enrollments: completed,
        };
        Ok(CompanyOverview {
            participants: participants
                .iter()
                .map(|participant| affiliate_view(participant, &courses))
                .collect(),
            company,
            statistics,
        })
    }

    async fn company_statistics(
        &self,
        company_id: CompanyId,
    ) -> Result<CompanyStatistics, TrainingError> {
        let (company, participants) = self.company_with_affiliates(company_id).await?;
        let enrollments = || participants.iter().flat_map(Participant::enrollments);
        let tally = Tally::over(enrollments());
        let distinct_courses = enrollments()
            .map(|enrollment| enrollment.course_id)
            .collect::<BTreeSet<_>>()
            .len();
        Ok(CompanyStatistics {
            company_id,
            company_name: company.name().to_owned(),
            total_participants: participants.len(),
            active_participants: active_count(&participants),
            total_enrollments: tally.total(),
            enrolled: tally.enrolled,
            completed: tally.completed,
            withdrawn: tally.withdrawn,
            distinct_courses,
            completion_rate: completion_rate(tally),
        })
    }

    async fn course_statistics(&self, company_id: CompanyId) -> Result<CourseStatistics, TrainingError> {
        let (_, participants) = self.company_with_affiliates(company_id).await?;
        let courses = self.resolve_courses(&participants).await?;
        Ok(CourseStatistics {
            company_id,
            courses: statistics_lines(&participants, &courses),
        })
    }

    async fn participants_by_course(
        &self,
        company_id: CompanyId,
    ) -> Result<ParticipantsByCourse, TrainingError> {
        let (_, participants) = self.company_with_affiliates(company_id).await?;
        let courses = self.resolve_courses(&participants).await?;
        Ok(ParticipantsByCourse {
            company_id,
            courses: course_groups(&participants, &courses),
        })
    }

    async fn companies_summary(&self) -> Result<Vec<CompanySummary>, TrainingError> {
        let companies = self.stores.list_companies().await?;
        let affiliates = try_join_all(companies.iter().map(|company| self.affiliates_of(company))).await?;
        Ok(companies
            .iter()
            .zip(affiliates)
            .map(|(company, participants)| CompanySummary {
                company_id: company.id(),
                name: company.name().to_owned(),
                tax_id: company.tax_id().as_ref().to_owned(),
                municipality: company.profile().municipality.as_ref().to_owned(),
                status: company.status(),
                total_participants: participants.len(),
                active_participants: active_count(&participants),
                live_courses: courses_in_progress(&participants),
            })
            .collect())
    }

    async fn course_roster(&self, course_id: CourseId) -> Result<CourseRoster, TrainingError> {
        let course = self.stores.load_course(&course_id).await?;
        let found = try_join_all(
            course
                .roster()
                .iter()
                .map(|entry| self.stores.find_participant(&entry.participant_id)),
        )
        .await?;
        let entries = course
            .roster()
            .iter()
            .zip(found)
            .map(|(entry, participant)| RosterLine {
                participant_id: entry.participant_id,
                name: participant.as_ref().map(|p| p.profile().name.clone()),
                company_name: participant
                    .as_ref()
                    .and_then(Participant::company)
                    .map(|link| link.company_name.clone()),
                status: entry.status,
                enrolled_at: entry.enrolled_at,
            })
            .collect();
        Ok(CourseRoster {
            course: CourseSummary::from(&course),
            cupo_maximo: course.details().maximum_capacity,
            live_count: course.live_count(),
            seats_left: course.seats_left(),
            entries,
        })
    }
}

#[cfg(test)]
#[path = "read_model_builder_tests.rs"]
mod tests;
