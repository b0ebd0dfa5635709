use std::sync::Arc;

use super::common::*;
use crate::access::{AccessError, Actor, Role};
use crate::config::NotificationConfig;
use crate::workflows::catalog::{CatalogServiceError, CycleId, NewStudent};
use crate::workflows::enrollment::{
    CancelInput, EnrollmentQuery, EnrollmentService, EnrollmentServiceError, EnrollmentStatus,
    ReviewDecision, ReviewInput, TransitionError,
};
use crate::workflows::notifications::{NotificationKind, NotificationService};
use crate::workflows::storage::{InMemoryEnrollmentStore, RepositoryError};

#[test]
fn submit_stores_pending_request_with_subject_defaults() {
    let fixture = fixture();
    let campus = &fixture.campus;

    let mut input = request_for(&campus.calculus);
    input.student_notes = Some("  Need this before Physics  ".to_string());
    let request = fixture.service.submit(&campus.ana, input).expect("submit");

    assert_eq!(request.status, EnrollmentStatus::Pending);
    assert_eq!(request.student_id, campus.ana_record.id);
    assert_eq!(request.institution_id, campus.institution.id);
    assert_eq!(request.career_id, campus.calculus.career_id);
    assert_eq!(request.cycle_id, campus.calculus.cycle_id);
    assert_eq!(request.student_notes.as_deref(), Some("Need this before Physics"));
    assert!(request.reviewed_at.is_none());
    assert!(request.reviewed_by.is_none());
    assert!(fixture.sent_notifications().is_empty());
}

#[test]
fn submit_requires_student_role() {
    let fixture = fixture();
    let error = fixture
        .service
        .submit(&fixture.campus.admin, request_for(&fixture.campus.calculus))
        .expect_err("admins do not enroll");

    assert!(matches!(
        error,
        EnrollmentServiceError::Access(AccessError::Forbidden(_))
    ));
}

#[test]
fn submit_requires_student_record() {
    let fixture = fixture();
    let stranger = Actor::new(
        "no-record",
        Role::Student,
        &fixture.campus.institution.id,
    );

    let error = fixture
        .service
        .submit(&stranger, request_for(&fixture.campus.calculus))
        .expect_err("unknown student");

    assert!(matches!(
        error,
        EnrollmentServiceError::Catalog(CatalogServiceError::Access(AccessError::Forbidden(_)))
    ));
}

#[test]
fn submit_validates_term_and_subject_placement() {
    let fixture = fixture();
    let campus = &fixture.campus;

    let mut bad_semester = request_for(&campus.calculus);
    bad_semester.semester = 3;
    assert!(matches!(
        fixture.service.submit(&campus.ana, bad_semester),
        Err(EnrollmentServiceError::Validation(_))
    ));

    let mut wrong_cycle = request_for(&campus.calculus);
    wrong_cycle.cycle_id = Some(CycleId("cyc-999999".to_string()));
    assert!(matches!(
        fixture.service.submit(&campus.ana, wrong_cycle),
        Err(EnrollmentServiceError::Validation(_))
    ));

    assert!(matches!(
        fixture
            .service
            .submit(&campus.ana, request_for(&campus.accounting)),
        Err(EnrollmentServiceError::Validation(_))
    ));
}

#[test]
fn duplicate_active_request_conflicts() {
    let fixture = fixture();
    fixture.submit_calculus();

    let error = fixture
        .service
        .submit(&fixture.campus.ana, request_for(&fixture.campus.calculus))
        .expect_err("duplicate");

    assert!(matches!(
        error,
        EnrollmentServiceError::Repository(RepositoryError::Conflict(_))
    ));

    let mut next_term = request_for(&fixture.campus.calculus);
    next_term.semester = 2;
    fixture
        .service
        .submit(&fixture.campus.ana, next_term)
        .expect("another term is a separate slot");
}

#[test]
fn approval_records_enrollment_and_notifies_once() {
    let fixture = fixture();
    let campus = &fixture.campus;
    let request = fixture.submit_calculus();

    let approved = fixture
        .service
        .approve(&campus.admin, &request.id, Some("Welcome aboard".to_string()))
        .expect("approve");

    assert_eq!(approved.status, EnrollmentStatus::Approved);
    assert_eq!(approved.reviewed_by, Some(campus.admin.user_id.clone()));
    assert!(approved.reviewed_at.is_some());
    assert_eq!(approved.admin_notes.as_deref(), Some("Welcome aboard"));

    let enrolled = fixture
        .service
        .enrolled_subjects(&campus.ana, &campus.ana_record.id)
        .expect("enrolled subjects");
    assert_eq!(enrolled.len(), 1);
    assert_eq!(enrolled[0].subject_id, campus.calculus.id);
    assert_eq!(enrolled[0].enrollment_request_id, request.id);

    let sent = fixture.sent_notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::EnrollmentApproved);
    assert_eq!(sent[0].user_id, campus.ana.user_id);
    assert_eq!(sent[0].enrollment_request_id, Some(request.id));
    assert_eq!(sent[0].title, "Enrollment request approved");
    assert!(sent[0].message.contains("MAT101 Calculus I"));
    assert!(sent[0].message.contains("2025-1"));
    assert!(sent[0].message.ends_with("Notes: Welcome aboard"));
    assert!(!sent[0].is_read);
}

#[test]
fn rejection_notifies_without_enrolling() {
    let fixture = fixture();
    let campus = &fixture.campus;
    let request = fixture.submit_calculus();

    let rejected = fixture
        .service
        .review(
            &campus.admin,
            &request.id,
            ReviewDecision::Reject,
            ReviewInput {
                admin_notes: Some("Prerequisite missing".to_string()),
            },
        )
        .expect("reject");

    assert_eq!(rejected.status, EnrollmentStatus::Rejected);
    assert!(fixture
        .service
        .enrolled_subjects(&campus.admin, &campus.ana_record.id)
        .expect("enrolled subjects")
        .is_empty());

    let sent = fixture.sent_notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::EnrollmentRejected);
    assert!(sent[0].message.contains("was rejected"));
    assert!(sent[0].message.contains("Prerequisite missing"));
}

#[test]
fn student_cancels_pending_request() {
    let fixture = fixture();
    let campus = &fixture.campus;
    let request = fixture.submit_calculus();

    let cancelled = fixture
        .service
        .cancel(
            &campus.ana,
            &request.id,
            CancelInput {
                student_notes: Some("Schedule clash".to_string()),
            },
        )
        .expect("cancel");

    assert_eq!(cancelled.status, EnrollmentStatus::Cancelled);
    assert_eq!(cancelled.student_notes.as_deref(), Some("Schedule clash"));
    assert_eq!(cancelled.reviewed_by, Some(campus.ana.user_id.clone()));

    let sent = fixture.sent_notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::EnrollmentCancelled);
    assert_eq!(sent[0].user_id, campus.ana.user_id);
}

#[test]
fn cancel_without_notes_keeps_submission_notes() {
    let fixture = fixture();
    let campus = &fixture.campus;
    let mut input = request_for(&campus.programming);
    input.student_notes = Some("First choice".to_string());
    let request = fixture.service.submit(&campus.ana, input).expect("submit");

    let cancelled = fixture
        .service
        .cancel(&campus.ana, &request.id, CancelInput::default())
        .expect("cancel");

    assert_eq!(cancelled.student_notes.as_deref(), Some("First choice"));
}

#[test]
fn decided_requests_cannot_be_cancelled_or_reviewed_again() {
    let fixture = fixture();
    let campus = &fixture.campus;
    let request = fixture.submit_calculus();
    fixture
        .service
        .approve(&campus.admin, &request.id, None)
        .expect("approve");

    let cancel = fixture
        .service
        .cancel(&campus.ana, &request.id, CancelInput::default())
        .expect_err("approved is final");
    assert!(matches!(
        cancel,
        EnrollmentServiceError::Transition(TransitionError {
            from: EnrollmentStatus::Approved,
            to: EnrollmentStatus::Cancelled,
        })
    ));

    let review = fixture
        .service
        .reject(&campus.admin, &request.id, None)
        .expect_err("approved is final");
    assert!(matches!(review, EnrollmentServiceError::Transition(_)));

    let stored = fixture
        .service
        .get(&campus.admin, &request.id)
        .expect("request");
    assert_eq!(stored.status, EnrollmentStatus::Approved);
    assert_eq!(fixture.sent_notifications().len(), 1);
}

#[test]
fn cancelled_request_cannot_be_approved() {
    let fixture = fixture();
    let campus = &fixture.campus;
    let request = fixture.submit_calculus();
    fixture
        .service
        .cancel(&campus.ana, &request.id, CancelInput::default())
        .expect("cancel");

    let error = fixture
        .service
        .approve(&campus.admin, &request.id, None)
        .expect_err("cancelled is final");
    assert!(matches!(error, EnrollmentServiceError::Transition(_)));
    assert!(fixture
        .service
        .enrolled_subjects(&campus.admin, &campus.ana_record.id)
        .expect("enrolled")
        .is_empty());
}

#[test]
fn concurrent_reviews_produce_one_decision_and_one_notification() {
    let fixture = fixture();
    let campus = &fixture.campus;
    let request = fixture.submit_calculus();

    let outcomes: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = [ReviewDecision::Approve, ReviewDecision::Reject]
            .into_iter()
            .cycle()
            .take(8)
            .map(|decision| {
                let service = Arc::clone(&fixture.service);
                let admin = campus.admin.clone();
                let id = request.id.clone();
                scope.spawn(move || service.review(&admin, &id, decision, ReviewInput::default()))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("review thread"))
            .collect()
    });

    let winners: Vec<_> = outcomes.iter().filter_map(|outcome| outcome.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(outcomes.iter().all(|outcome| match outcome {
        Ok(_) => true,
        Err(error) => matches!(error, EnrollmentServiceError::Transition(_)),
    }));

    let sent = fixture.sent_notifications();
    assert_eq!(sent.len(), 1);
    let stored = fixture
        .service
        .get(&campus.admin, &request.id)
        .expect("request");
    assert_eq!(stored.status, winners[0].status);
}

#[test]
fn students_only_reach_their_own_requests() {
    let fixture = fixture();
    let campus = &fixture.campus;
    let request = fixture.submit_calculus();

    let error = fixture
        .service
        .cancel(&campus.luis, &request.id, CancelInput::default())
        .expect_err("not Luis's request");
    assert!(matches!(
        error,
        EnrollmentServiceError::Repository(RepositoryError::NotFound)
    ));
    assert!(fixture.service.get(&campus.luis, &request.id).is_err());

    let error = fixture
        .service
        .enrolled_subjects(&campus.luis, &campus.ana_record.id)
        .expect_err("other student's enrollments");
    assert!(matches!(
        error,
        EnrollmentServiceError::Access(AccessError::Forbidden(_))
    ));
}

#[test]
fn other_institutions_see_nothing() {
    let fixture = fixture();
    let request = fixture.submit_calculus();
    let rival = seed_campus(&fixture.catalog, "coastal-college");

    let error = fixture
        .service
        .get(&rival.admin, &request.id)
        .expect_err("cross tenant");
    assert!(matches!(
        error,
        EnrollmentServiceError::Repository(RepositoryError::NotFound)
    ));

    let error = fixture
        .service
        .approve(&rival.admin, &request.id, None)
        .expect_err("cross tenant");
    assert!(matches!(
        error,
        EnrollmentServiceError::Repository(RepositoryError::NotFound)
    ));

    assert!(fixture
        .service
        .list(&rival.admin, EnrollmentQuery::default())
        .expect("list")
        .is_empty());

    let error = fixture
        .service
        .submit(&rival.ana, request_for(&fixture.campus.calculus))
        .expect_err("foreign subject");
    assert!(matches!(
        error,
        EnrollmentServiceError::Catalog(CatalogServiceError::NotFound(_))
    ));
    assert!(fixture.sent_notifications().is_empty());
}

#[test]
fn shared_login_across_institutions_keeps_inboxes_apart() {
    let fixture = fixture();
    let campus = &fixture.campus;
    let rival = seed_campus(&fixture.catalog, "coastal-college");
    fixture
        .catalog
        .create_student(
            &rival.admin,
            NewStudent {
                user_id: campus.ana.user_id.clone(),
                career_id: rival.calculus.career_id.clone(),
                student_code: "s-900".to_string(),
                full_name: "Ana Quispe".to_string(),
                email: "ana.quispe@coastal.edu".to_string(),
            },
        )
        .expect("same login enrolled elsewhere");
    let ana_elsewhere = Actor::new(&campus.ana.user_id.0, Role::Student, &rival.institution.id);

    let request = fixture.submit_calculus();
    fixture
        .service
        .approve(&campus.admin, &request.id, Some("secret note".to_string()))
        .expect("approve");

    let inboxes = &fixture.notification_service;
    assert!(inboxes
        .list(&ana_elsewhere, false, None)
        .expect("list")
        .is_empty());
    assert_eq!(inboxes.mark_all_read(&ana_elsewhere).expect("mark all"), 0);

    let home = inboxes.list(&campus.ana, false, None).expect("list");
    assert_eq!(home.len(), 1);
    assert_eq!(home[0].institution_id, campus.institution.id);
    assert!(!home[0].is_read);
}

#[test]
fn listing_is_scoped_by_role_and_filters() {
    let fixture = fixture();
    let campus = &fixture.campus;
    let first = fixture.submit_calculus();
    fixture
        .service
        .submit(&campus.luis, request_for(&campus.calculus))
        .expect("luis submits");
    fixture
        .service
        .approve(&campus.admin, &first.id, None)
        .expect("approve");

    let all = fixture
        .service
        .list(&campus.admin, EnrollmentQuery::default())
        .expect("admin list");
    assert_eq!(all.len(), 2);

    let pending = fixture
        .service
        .list(
            &campus.admin,
            EnrollmentQuery {
                status: Some(EnrollmentStatus::Pending),
                ..EnrollmentQuery::default()
            },
        )
        .expect("pending list");
    assert_eq!(pending.len(), 1);
    assert_ne!(pending[0].id, first.id);

    let by_student = fixture
        .service
        .list(
            &campus.admin,
            EnrollmentQuery {
                student_id: Some(campus.ana_record.id.clone()),
                ..EnrollmentQuery::default()
            },
        )
        .expect("per student");
    assert_eq!(by_student.len(), 1);

    let own = fixture
        .service
        .list(
            &campus.ana,
            EnrollmentQuery {
                student_id: None,
                ..EnrollmentQuery::default()
            },
        )
        .expect("student list");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].id, first.id);
}

#[test]
fn professors_cannot_touch_enrollment_requests() {
    let fixture = fixture();
    let request = fixture.submit_calculus();
    let professor = Actor::new(
        "prof-rosa",
        Role::Professor,
        &fixture.campus.institution.id,
    );

    for outcome in [
        fixture.service.get(&professor, &request.id).map(|_| ()),
        fixture
            .service
            .list(&professor, EnrollmentQuery::default())
            .map(|_| ()),
        fixture
            .service
            .approve(&professor, &request.id, None)
            .map(|_| ()),
    ] {
        assert!(matches!(
            outcome,
            Err(EnrollmentServiceError::Access(AccessError::Forbidden(_)))
        ));
    }
}

#[test]
fn rejected_slot_can_be_requested_again() {
    let fixture = fixture();
    let campus = &fixture.campus;
    let request = fixture.submit_calculus();
    fixture
        .service
        .reject(&campus.admin, &request.id, None)
        .expect("reject");

    let retry = fixture.submit_calculus();
    assert_ne!(retry.id, request.id);
    assert_eq!(retry.status, EnrollmentStatus::Pending);
}

#[test]
fn approved_subject_blocks_new_request_for_same_term() {
    let fixture = fixture();
    let campus = &fixture.campus;
    let request = fixture.submit_calculus();
    fixture
        .service
        .approve(&campus.admin, &request.id, None)
        .expect("approve");

    let error = fixture
        .service
        .submit(&campus.ana, request_for(&campus.calculus))
        .expect_err("already enrolled");
    assert!(matches!(
        error,
        EnrollmentServiceError::AlreadyEnrolled { ref subject, .. } if subject == "MAT101"
    ));
}

#[test]
fn failed_notification_surfaces_after_status_change() {
    let fixture = fixture();
    let inbox = Arc::new(NotificationService::new(
        Arc::new(BrokenInbox),
        &NotificationConfig::default(),
    ));
    let service = EnrollmentService::new(
        Arc::clone(&fixture.store),
        Arc::clone(&fixture.catalog),
        inbox,
    );
    let request = service
        .submit(&fixture.campus.ana, request_for(&fixture.campus.calculus))
        .expect("submit");

    let error = service
        .approve(&fixture.campus.admin, &request.id, None)
        .expect_err("inbox offline");
    assert!(matches!(error, EnrollmentServiceError::Notification(_)));

    let stored = service
        .get(&fixture.campus.admin, &request.id)
        .expect("request");
    assert_eq!(stored.status, EnrollmentStatus::Approved);
}

#[test]
fn store_outage_is_reported() {
    let fixture = fixture_with(Arc::new(UnavailableStore));
    let error = fixture
        .service
        .submit(&fixture.campus.ana, request_for(&fixture.campus.calculus))
        .expect_err("offline");
    assert!(matches!(
        error,
        EnrollmentServiceError::Repository(RepositoryError::Unavailable(_))
    ));
}

#[tokio::test]
async fn live_subscribers_receive_decisions() {
    let fixture = fixture();
    let campus = &fixture.campus;
    let mut ana_feed = fixture.notification_service.subscribe(&campus.ana);
    let request = fixture.submit_calculus();

    fixture
        .service
        .approve(&campus.admin, &request.id, None)
        .expect("approve");

    let delivered = ana_feed.next().await.expect("notification");
    assert_eq!(delivered.kind, NotificationKind::EnrollmentApproved);
    assert_eq!(delivered.enrollment_request_id, Some(request.id));
}

#[test]
fn in_memory_store_rejects_stale_status_update() {
    use crate::workflows::enrollment::EnrollmentRepository;

    let store = InMemoryEnrollmentStore::default();
    let fixture = fixture();
    let request = fixture.submit_calculus();
    store.insert(request.clone()).expect("insert");

    let approved = crate::workflows::enrollment::EnrollmentRequest {
        status: EnrollmentStatus::Approved,
        ..request.clone()
    };
    store
        .update_status(approved, EnrollmentStatus::Pending)
        .expect("first update");

    let rejected = crate::workflows::enrollment::EnrollmentRequest {
        status: EnrollmentStatus::Rejected,
        ..request
    };
    assert!(matches!(
        store.update_status(rejected, EnrollmentStatus::Pending),
        Err(RepositoryError::Conflict(_))
    ));
}
