use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use serde_json::Value;

use crate::access::{Actor, InstitutionId, Role, INSTITUTION_HEADER, ROLE_HEADER, USER_HEADER};
use crate::config::NotificationConfig;
use crate::workflows::catalog::{
    CatalogService, Institution, NewCareer, NewCycle, NewProfessor, NewStudent, NewSubject,
    Student, StudentId, Subject, UserId,
};
use crate::workflows::enrollment::{
    EnrolledSubject, EnrollmentFilter, EnrollmentRepository, EnrollmentRequest,
    EnrollmentRequestId, EnrollmentService, EnrollmentStatus, NewEnrollmentRequest,
};
use crate::workflows::notifications::{
    Notification, NotificationId, NotificationRepository, NotificationService,
};
use crate::workflows::storage::{
    InMemoryCatalog, InMemoryEnrollmentStore, InMemoryNotificationStore, RepositoryError,
};

pub(super) type MemoryService<R = InMemoryEnrollmentStore> =
    EnrollmentService<R, InMemoryCatalog, InMemoryNotificationStore>;

/// One institution with a single career, two subjects in its first cycle,
/// two students, and a subject from a second career.
pub(super) struct Campus {
    pub(super) institution: Institution,
    pub(super) admin: Actor,
    pub(super) ana: Actor,
    pub(super) ana_record: Student,
    pub(super) luis: Actor,
    pub(super) calculus: Subject,
    pub(super) programming: Subject,
    pub(super) accounting: Subject,
}

pub(super) struct Fixture<R = InMemoryEnrollmentStore> {
    pub(super) service: Arc<MemoryService<R>>,
    pub(super) store: Arc<R>,
    pub(super) catalog: Arc<CatalogService<InMemoryCatalog>>,
    pub(super) notifications: Arc<InMemoryNotificationStore>,
    pub(super) notification_service: Arc<NotificationService<InMemoryNotificationStore>>,
    pub(super) campus: Campus,
}

pub(super) fn fixture() -> Fixture {
    fixture_with(Arc::new(InMemoryEnrollmentStore::default()))
}

pub(super) fn fixture_with<R>(store: Arc<R>) -> Fixture<R>
where
    R: EnrollmentRepository + 'static,
{
    let catalog = Arc::new(CatalogService::new(Arc::new(InMemoryCatalog::default())));
    let campus = seed_campus(&catalog, "andean-institute");
    let notifications = Arc::new(InMemoryNotificationStore::default());
    let notification_service = Arc::new(NotificationService::new(
        notifications.clone(),
        &NotificationConfig::default(),
    ));
    let service = Arc::new(EnrollmentService::new(
        store.clone(),
        catalog.clone(),
        notification_service.clone(),
    ));

    Fixture {
        service,
        store,
        catalog,
        notifications,
        notification_service,
        campus,
    }
}

pub(super) fn seed_campus(catalog: &CatalogService<InMemoryCatalog>, slug: &str) -> Campus {
    let institution = catalog
        .register_institution("Andean Institute of Technology", slug)
        .expect("institution");
    let admin = Actor::new(&format!("{slug}-admin"), Role::Admin, &institution.id);

    let systems = catalog
        .create_career(
            &admin,
            NewCareer {
                code: "sis".to_string(),
                name: "Systems Engineering".to_string(),
            },
        )
        .expect("career");
    let first_cycle = catalog
        .create_cycle(
            &admin,
            NewCycle {
                career_id: systems.id.clone(),
                number: 1,
                name: "First cycle".to_string(),
            },
        )
        .expect("cycle");
    let professor = catalog
        .create_professor(
            &admin,
            NewProfessor {
                full_name: "Rosa Mamani".to_string(),
                email: "rosa.mamani@andean.edu".to_string(),
            },
        )
        .expect("professor");
    let calculus = catalog
        .create_subject(
            &admin,
            NewSubject {
                career_id: systems.id.clone(),
                cycle_id: first_cycle.id.clone(),
                code: "mat101".to_string(),
                name: "Calculus I".to_string(),
                credits: 4,
                professor_id: Some(professor.id),
            },
        )
        .expect("calculus");
    let programming = catalog
        .create_subject(
            &admin,
            NewSubject {
                career_id: systems.id.clone(),
                cycle_id: first_cycle.id.clone(),
                code: "prg101".to_string(),
                name: "Programming I".to_string(),
                credits: 5,
                professor_id: None,
            },
        )
        .expect("programming");

    let business = catalog
        .create_career(
            &admin,
            NewCareer {
                code: "adm".to_string(),
                name: "Business Administration".to_string(),
            },
        )
        .expect("career");
    let business_cycle = catalog
        .create_cycle(
            &admin,
            NewCycle {
                career_id: business.id.clone(),
                number: 1,
                name: "First cycle".to_string(),
            },
        )
        .expect("cycle");
    let accounting = catalog
        .create_subject(
            &admin,
            NewSubject {
                career_id: business.id.clone(),
                cycle_id: business_cycle.id,
                code: "cnt101".to_string(),
                name: "Accounting I".to_string(),
                credits: 3,
                professor_id: None,
            },
        )
        .expect("accounting");

    let ana_user = format!("{slug}-ana");
    let ana_record = catalog
        .create_student(
            &admin,
            NewStudent {
                user_id: UserId(ana_user.clone()),
                career_id: systems.id.clone(),
                student_code: "s-001".to_string(),
                full_name: "Ana Quispe".to_string(),
                email: "ana.quispe@andean.edu".to_string(),
            },
        )
        .expect("student");
    let luis_user = format!("{slug}-luis");
    catalog
        .create_student(
            &admin,
            NewStudent {
                user_id: UserId(luis_user.clone()),
                career_id: systems.id,
                student_code: "s-002".to_string(),
                full_name: "Luis Condori".to_string(),
                email: "luis.condori@andean.edu".to_string(),
            },
        )
        .expect("student");

    Campus {
        ana: Actor::new(&ana_user, Role::Student, &institution.id),
        luis: Actor::new(&luis_user, Role::Student, &institution.id),
        institution,
        admin,
        ana_record,
        calculus,
        programming,
        accounting,
    }
}

pub(super) fn request_for(subject: &Subject) -> NewEnrollmentRequest {
    NewEnrollmentRequest {
        subject_id: subject.id.clone(),
        career_id: None,
        cycle_id: None,
        academic_year: 2025,
        semester: 1,
        student_notes: None,
    }
}

impl<R> Fixture<R>
where
    R: EnrollmentRepository + 'static,
{
    pub(super) fn submit_calculus(&self) -> EnrollmentRequest {
        self.service
            .submit(&self.campus.ana, request_for(&self.campus.calculus))
            .expect("submit")
    }

    pub(super) fn sent_notifications(&self) -> Vec<Notification> {
        self.notifications.all().expect("notifications")
    }
}

pub(super) fn api_request(
    method: Method,
    uri: &str,
    actor: Option<&Actor>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header(USER_HEADER, actor.user_id.0.as_str())
            .header(ROLE_HEADER, actor.role.label())
            .header(INSTITUTION_HEADER, actor.institution_id.0.as_str());
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(axum::http::header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value).expect("serialize body"))
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Store that refuses every call.
pub(super) struct UnavailableStore;

impl EnrollmentRepository for UnavailableStore {
    fn insert(&self, _request: EnrollmentRequest) -> Result<EnrollmentRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(
        &self,
        _id: &EnrollmentRequestId,
    ) -> Result<Option<EnrollmentRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_status(
        &self,
        _request: EnrollmentRequest,
        _expected: EnrollmentStatus,
    ) -> Result<EnrollmentRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _filter: &EnrollmentFilter) -> Result<Vec<EnrollmentRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn record_enrollment(&self, _enrollment: EnrolledSubject) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn enrolled_subjects(
        &self,
        _student_id: &StudentId,
    ) -> Result<Vec<EnrolledSubject>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Notification store whose inserts always fail.
pub(super) struct BrokenInbox;

impl NotificationRepository for BrokenInbox {
    fn insert(&self, _notification: Notification) -> Result<Notification, RepositoryError> {
        Err(RepositoryError::Unavailable("inbox offline".to_string()))
    }

    fn fetch(&self, _id: &NotificationId) -> Result<Option<Notification>, RepositoryError> {
        Ok(None)
    }

    fn list_for_user(
        &self,
        _institution_id: &InstitutionId,
        _user_id: &UserId,
        _unread_only: bool,
        _limit: Option<usize>,
    ) -> Result<Vec<Notification>, RepositoryError> {
        Ok(Vec::new())
    }

    fn mark_read(&self, _id: &NotificationId) -> Result<Notification, RepositoryError> {
        Err(RepositoryError::NotFound)
    }

    fn mark_all_read(
        &self,
        _institution_id: &InstitutionId,
        _user_id: &UserId,
    ) -> Result<usize, RepositoryError> {
        Ok(0)
    }
}
