use std::collections::BTreeSet;
use std::sync::Barrier;

use super::common::*;
use crate::valuation::domain::ComparableId;
use crate::valuation::engine::AggregationMethod;
use crate::valuation::error::ValuationError;
use crate::valuation::factors::AdjustmentFactorKind;
use crate::valuation::repository::{AppraisalId, RepositoryError};
use crate::valuation::service::{AppraisalServiceError, CreateAppraisal, ValuationRequest};

fn create_request() -> CreateAppraisal {
    CreateAppraisal {
        subject: subject(),
        discount: Some(0.0),
        method: None,
    }
}

#[test]
fn create_assigns_identifier_and_defaults() {
    let service = memory_service();
    let record = service.create(create_request()).expect("created");

    assert!(record.appraisal_id.0.starts_with("apr-"));
    assert_eq!(record.session.discount(), 0.0);
    assert_eq!(record.session.method(), AggregationMethod::Mean);
    assert!(record.session.comparables().is_empty());

    let fetched = service.get(&record.appraisal_id).expect("stored");
    assert_eq!(fetched.appraisal_id, record.appraisal_id);
}

#[test]
fn create_rejects_invalid_subject() {
    let service = memory_service();
    let mut request = create_request();
    request.subject.areas.covered = -4.0;

    match service.create(request) {
        Err(AppraisalServiceError::Valuation(ValuationError::InvalidInput { field, .. })) => {
            assert_eq!(field, "subject.areas.covered");
        }
        other => panic!("expected invalid input, got {other:?}"),
    }
}

#[test]
fn comparable_mutations_are_persisted() {
    let service = memory_service();
    let record = service.create(create_request()).expect("created");
    let id = record.appraisal_id;

    let (premium, _) = service
        .add_comparable(&id, premium_listing())
        .expect("premium added");
    let (dated, updated) = service
        .add_comparable(&id, dated_listing())
        .expect("dated added");
    assert_eq!((premium, dated), (ComparableId(1), ComparableId(2)));
    assert_close(updated.session.reference_price().expect("reference"), 1105.0);

    service
        .set_factor(&id, dated, AdjustmentFactorKind::Age, -5.0)
        .expect("factor set");
    service
        .set_method(&id, AggregationMethod::Median)
        .expect("method set");

    let stored = service.get(&id).expect("stored");
    assert_eq!(stored.session.method(), AggregationMethod::Median);
    assert_close(stored.session.reference_price().expect("reference"), 1135.0);

    let after_removal = service.remove_comparable(&id, premium).expect("removed");
    assert_close(
        after_removal.session.reference_price().expect("reference"),
        1140.0,
    );
}

#[test]
fn rejected_mutation_leaves_stored_session_unchanged() {
    let service = memory_service();
    let id = service.create(create_request()).expect("created").appraisal_id;
    let (comparable, _) = service
        .add_comparable(&id, plain_listing(100_000.0, 100.0))
        .expect("added");

    let err = service
        .set_factor(&id, comparable, AdjustmentFactorKind::Amenities, 7.0)
        .expect_err("beyond weight");
    assert!(matches!(
        err,
        AppraisalServiceError::Valuation(ValuationError::OutOfRange { .. })
    ));

    let stored = service.get(&id).expect("stored");
    assert!(stored.session.comparables()[0].factors().is_empty());

    assert!(service.set_discount(&id, 101.0).is_err());
    assert_eq!(service.get(&id).expect("stored").session.discount(), 0.0);
}

#[test]
fn advance_enforces_comparable_quorum() {
    let service = memory_service();
    let id = service.create(create_request()).expect("created").appraisal_id;

    for price in [95_000.0, 101_000.0, 104_000.0] {
        service
            .add_comparable(&id, plain_listing(price, 90.0))
            .expect("added");
    }
    assert!(matches!(
        service.advance(&id),
        Err(AppraisalServiceError::Valuation(
            ValuationError::InsufficientData { actual: 3, .. }
        ))
    ));

    service
        .add_comparable(&id, plain_listing(99_000.0, 90.0))
        .expect("added");
    let record = service.advance(&id).expect("quorum met");
    assert!(record.session.has_quorum());
}

#[test]
fn unknown_appraisal_is_not_found() {
    let service = memory_service();
    let missing = AppraisalId("apr-999999".to_string());

    assert!(matches!(
        service.get(&missing),
        Err(AppraisalServiceError::Repository(RepositoryError::NotFound))
    ));
    assert!(matches!(
        service.set_discount(&missing, 5.0),
        Err(AppraisalServiceError::Repository(RepositoryError::NotFound))
    ));
}

#[test]
fn valuate_runs_the_full_pipeline_without_storage() {
    let repository = MemoryRepository::default();
    let records = repository.records.clone();
    let service = service_with(repository);

    let report = service
        .valuate(ValuationRequest {
            subject: subject(),
            comparables: vec![premium_listing(), dated_listing()],
            discount: Some(0.0),
            method: Some(AggregationMethod::Median),
        })
        .expect("valuation succeeds");

    assert_close(report.reference_price.expect("reference"), 1105.0);
    assert_close(report.total_value().expect("total"), 131_826.5);
    assert!(records.lock().expect("repository mutex poisoned").is_empty());
}

#[test]
fn valuate_without_comparables_is_insufficient() {
    let service = memory_service();
    let err = service
        .valuate(ValuationRequest {
            subject: subject(),
            comparables: Vec::new(),
            discount: None,
            method: None,
        })
        .expect_err("no comparables");

    assert!(matches!(
        err,
        AppraisalServiceError::Valuation(ValuationError::InsufficientData { actual: 0, .. })
    ));
}

#[test]
fn repository_failures_surface_as_repository_errors() {
    let service = service_with(UnavailableRepository);
    assert!(matches!(
        service.create(create_request()),
        Err(AppraisalServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
}

#[test]
fn concurrent_additions_are_all_kept_with_distinct_ids() {
    const WRITERS: usize = 8;

    let service = memory_service();
    let id = service.create(create_request()).expect("created").appraisal_id;
    let start = Barrier::new(WRITERS);

    let returned: Vec<ComparableId> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..WRITERS)
            .map(|index| {
                let service = &service;
                let id = &id;
                let start = &start;
                scope.spawn(move || {
                    start.wait();
                    service
                        .add_comparable(id, plain_listing(90_000.0 + index as f64 * 1_000.0, 80.0))
                        .expect("comparable added")
                        .0
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("writer thread"))
            .collect()
    });

    let distinct: BTreeSet<ComparableId> = returned.iter().copied().collect();
    assert_eq!(distinct.len(), WRITERS);
    assert_eq!(
        distinct,
        (1..=WRITERS as u32).map(ComparableId).collect::<BTreeSet<_>>()
    );

    let stored = service.get(&id).expect("stored");
    assert_eq!(stored.session.comparables().len(), WRITERS);
    let stored_ids: BTreeSet<ComparableId> = stored
        .session
        .comparables()
        .iter()
        .map(|comparable| comparable.id)
        .collect();
    assert_eq!(stored_ids, distinct);
}

#[test]
fn modification_of_unknown_appraisal_is_not_found() {
    let service = memory_service();
    let missing = AppraisalId("apr-888888".to_string());

    assert!(matches!(
        service.add_comparable(&missing, plain_listing(90_000.0, 80.0)),
        Err(AppraisalServiceError::Repository(RepositoryError::NotFound))
    ));
}
