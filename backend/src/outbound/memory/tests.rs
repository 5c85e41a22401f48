//! Compare-and-set behaviour of the in-memory stores.

use std::sync::Arc;

use rstest::rstest;

use super::*;
use crate::test_support::{
    MutableClock, company_name, fixture_timestamp, new_company, new_course, new_participant,
};

#[rstest]
#[tokio::test]
async fn insert_then_find_round_trips() {
    let repo = InMemoryCourseRepository::new();
    let course = new_course("Higiene", 3);
    repo.save(&course, None).await.expect("insert");

    let found = repo.find_by_id(&course.id()).await.expect("find");
    assert_eq!(found, Some(course));
}

#[rstest]
#[tokio::test]
async fn second_insert_is_a_duplicate() {
    let repo = InMemoryCourseRepository::new();
    let course = new_course("Higiene", 3);
    repo.save(&course, None).await.expect("insert");

    let error = repo.save(&course, None).await.expect_err("duplicate");
    assert!(matches!(error, StoreError::Duplicate { .. }));
}

#[rstest]
#[tokio::test]
async fn stale_update_reports_both_revisions() {
    let repo = InMemoryCourseRepository::new();
    let mut course = new_course("Higiene", 3);
    repo.save(&course, None).await.expect("insert");

    let mut stale = course.clone();
    let expected = course.advance(fixture_timestamp());
    repo.save(&course, Some(expected)).await.expect("first update");

    let expected = stale.advance(fixture_timestamp());
    let error = repo.save(&stale, Some(expected)).await.expect_err("stale");
    assert_eq!(error, StoreError::revision_mismatch(1_u32, 2_u32));
}

#[rstest]
#[tokio::test]
async fn update_of_missing_document_fails() {
    let repo = InMemoryCourseRepository::new();
    let course = new_course("Higiene", 3);

    let error = repo.save(&course, Some(1)).await.expect_err("missing");
    assert!(matches!(error, StoreError::Query { .. }));
}

#[rstest]
#[tokio::test]
async fn emails_are_unique() {
    let repo = InMemoryParticipantRepository::new();
    repo.save(&new_participant("Ana", "ana@example.com"), None)
        .await
        .expect("first");

    let error = repo
        .save(&new_participant("Otra Ana", "ana@example.com"), None)
        .await
        .expect_err("duplicate email");
    assert!(matches!(error, StoreError::Duplicate { .. }));
}

#[rstest]
#[tokio::test]
async fn tax_ids_are_unique() {
    let repo = InMemoryCompanyRepository::new();
    repo.save(&new_company("Uno", "ABC010101AB1"), None)
        .await
        .expect("first");

    let error = repo
        .save(&new_company("Dos", "ABC010101AB1"), None)
        .await
        .expect_err("duplicate tax id");
    assert!(matches!(error, StoreError::Duplicate { .. }));
}

#[rstest]
#[tokio::test]
async fn rename_refreshes_only_linked_participants() {
    let clock = Arc::new(MutableClock::new(fixture_timestamp()));
    let repo = InMemoryParticipantRepository::with_clock(clock);
    let company = new_company("Viejo", "ABC010101AB1");

    let mut linked = new_participant("Ana", "ana@example.com");
    linked.link_company(crate::domain::CompanyLink {
        company_id: company.id(),
        company_name: "Viejo".to_owned(),
    });
    let loose = new_participant("Luis", "luis@example.com");
    repo.save(&linked, None).await.expect("linked");
    repo.save(&loose, None).await.expect("loose");

    let changed = repo
        .rename_company(&company.id(), company_name("Nuevo").as_ref())
        .await
        .expect("rename");
    assert_eq!(changed, 1);

    let stored = repo
        .find_by_id(&linked.id())
        .await
        .expect("find")
        .expect("present");
    assert_eq!(
        stored.company().map(|link| link.company_name.as_str()),
        Some("Nuevo")
    );
    assert_eq!(stored.revision(), 2);

    let listed = repo.list_by_company(&company.id()).await.expect("list");
    assert_eq!(listed.len(), 1);
}

#[rstest]
#[tokio::test]
async fn delete_reports_presence() {
    let repo = InMemoryCompanyRepository::new();
    let company = new_company("Uno", "ABC010101AB1");
    repo.save(&company, None).await.expect("insert");

    assert!(repo.delete(&company.id()).await.expect("delete"));
    assert!(!repo.delete(&company.id()).await.expect("second delete"));
}
