//! Conversion between aggregates and their stored JSONB documents.
//!
//! The whole aggregate is serialised into `document`; the scalar columns are
//! derived from it on every write so lookups never need to parse JSON.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::ports::StoreError;
use crate::domain::{Company, Course, Participant};

use super::models::{CompanyRecord, CourseRecord, ParticipantRecord};

/// Cast domain revision (u32) to database revision (i32).
#[expect(
    clippy::cast_possible_wrap,
    reason = "revision values are always small positive integers"
)]
pub(crate) const fn cast_revision_for_db(revision: u32) -> i32 {
    revision as i32
}

/// Cast database revision (i32) to domain revision (u32).
#[expect(
    clippy::cast_sign_loss,
    reason = "revision is always positive in database"
)]
pub(crate) const fn cast_revision(revision: i32) -> u32 {
    revision as u32
}

fn encode<T: Serialize>(kind: &str, aggregate: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(aggregate)
        .map_err(|err| StoreError::query(format!("{kind} could not be serialised: {err}")))
}

/// Decode a stored document into its aggregate.
pub(crate) fn decode<T: DeserializeOwned>(
    kind: &str,
    document: serde_json::Value,
) -> Result<T, StoreError> {
    serde_json::from_value(document)
        .map_err(|err| StoreError::corrupt(format!("{kind} document: {err}")))
}

/// Decode every row, failing on the first unreadable document.
pub(crate) fn decode_all<T: DeserializeOwned>(
    kind: &str,
    documents: impl IntoIterator<Item = serde_json::Value>,
) -> Result<Vec<T>, StoreError> {
    documents
        .into_iter()
        .map(|document| decode(kind, document))
        .collect()
}

impl TryFrom<&Course> for CourseRecord {
    type Error = StoreError;

    fn try_from(course: &Course) -> Result<Self, Self::Error> {
        Ok(Self {
            id: *course.id().as_uuid(),
            document: encode("course", course)?,
            revision: cast_revision_for_db(course.revision()),
            created_at: course.created_at(),
            updated_at: course.updated_at(),
        })
    }
}

impl TryFrom<&Participant> for ParticipantRecord {
    type Error = StoreError;

    fn try_from(participant: &Participant) -> Result<Self, Self::Error> {
        Ok(Self {
            id: *participant.id().as_uuid(),
            company_id: participant
                .company()
                .map(|link| *link.company_id.as_uuid()),
            email: participant.profile().email.as_ref().to_owned(),
            document: encode("participant", participant)?,
            revision: cast_revision_for_db(participant.revision()),
            created_at: participant.created_at(),
            updated_at: participant.updated_at(),
        })
    }
}

impl TryFrom<&Company> for CompanyRecord {
    type Error = StoreError;

    fn try_from(company: &Company) -> Result<Self, Self::Error> {
        Ok(Self {
            id: *company.id().as_uuid(),
            tax_id: company.tax_id().as_ref().to_owned(),
            document: encode("company", company)?,
            revision: cast_revision_for_db(company.revision()),
            created_at: company.created_at(),
            updated_at: company.updated_at(),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::domain::CompanyLink;
    use crate::test_support::{new_company, new_course, new_participant};

    #[rstest]
    fn participant_record_projects_link_and_email() {
        let company = new_company("Fonda Doña Lupe", "ABC010101AB1");
        let mut participant = new_participant("Ana López", "ana@example.com");
        participant.link_company(CompanyLink {
            company_id: company.id(),
            company_name: company.name().to_owned(),
        });

        let record = ParticipantRecord::try_from(&participant).expect("record");
        assert_eq!(record.company_id, Some(*company.id().as_uuid()));
        assert_eq!(record.email, "ana@example.com");
        assert_eq!(record.revision, 1);
        assert_eq!(
            record.document.pointer("/company/companyName"),
            Some(&json!("Fonda Doña Lupe"))
        );

        let decoded: Participant = decode("participant", record.document).expect("decode");
        assert_eq!(decoded, participant);
    }

    #[rstest]
    fn company_record_projects_tax_id() {
        let company = new_company("Fonda Doña Lupe", "ABC010101AB1");

        let record = CompanyRecord::try_from(&company).expect("record");
        assert_eq!(record.tax_id, "ABC010101AB1");
        assert_eq!(record.created_at, company.created_at());
    }

    #[rstest]
    fn enrollment_filter_matches_the_stored_shape() {
        let course = new_course("Higiene", 5);
        let mut participant = new_participant("Ana López", "ana@example.com");
        participant.enroll(course.id(), course.created_at());

        let record = ParticipantRecord::try_from(&participant).expect("record");
        assert_eq!(
            record.document.pointer("/enrollments/0/courseId"),
            Some(&json!(course.id().to_string()))
        );
    }

    #[rstest]
    fn unreadable_document_is_corrupt() {
        let error = decode::<Course>("course", json!({"name": 3})).expect_err("corrupt");

        assert!(matches!(error, StoreError::Corrupt { .. }));
        assert!(error.to_string().contains("course document"));
    }

    #[rstest]
    #[case(1, 1)]
    #[case(42, 42)]
    fn revisions_cast_both_ways(#[case] domain: u32, #[case] stored: i32) {
        assert_eq!(cast_revision_for_db(domain), stored);
        assert_eq!(cast_revision(stored), domain);
    }
}
