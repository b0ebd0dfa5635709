use campus_admin::access::{Actor, Role};
use campus_admin::config::NotificationConfig;
use campus_admin::error::AppError;
use campus_admin::workflows::catalog::{
    CatalogService, Institution, NewCareer, NewCycle, NewProfessor, NewSubject, Student, Subject,
};
use campus_admin::workflows::enrollment::EnrollmentService;
use campus_admin::workflows::notifications::NotificationService;
use campus_admin::workflows::storage::{
    InMemoryCatalog, InMemoryEnrollmentStore, InMemoryNotificationStore,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type Catalog = CatalogService<InMemoryCatalog>;
pub(crate) type Notifications = NotificationService<InMemoryNotificationStore>;
pub(crate) type Enrollment =
    EnrollmentService<InMemoryEnrollmentStore, InMemoryCatalog, InMemoryNotificationStore>;

/// The three services wired over the in-memory stores.
#[derive(Clone)]
pub(crate) struct Services {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) notifications: Arc<Notifications>,
    pub(crate) enrollment: Arc<Enrollment>,
}

impl Services {
    pub(crate) fn in_memory(config: &NotificationConfig) -> Self {
        let catalog = Arc::new(CatalogService::new(Arc::new(InMemoryCatalog::default())));
        let notifications = Arc::new(NotificationService::new(
            Arc::new(InMemoryNotificationStore::default()),
            config,
        ));
        let enrollment = Arc::new(EnrollmentService::new(
            Arc::new(InMemoryEnrollmentStore::default()),
            catalog.clone(),
            notifications.clone(),
        ));
        Self {
            catalog,
            notifications,
            enrollment,
        }
    }
}

/// An institution to register at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InstitutionSeed {
    pub(crate) slug: String,
    pub(crate) name: String,
}

/// Register empty tenants so admins can build their catalog over HTTP.
pub(crate) fn register_institutions(
    catalog: &Catalog,
    seeds: &[InstitutionSeed],
) -> Result<Vec<Institution>, AppError> {
    seeds
        .iter()
        .map(|seed| {
            catalog
                .register_institution(&seed.name, &seed.slug)
                .map_err(AppError::from)
        })
        .collect()
}

pub(crate) const DEMO_SLUG: &str = "riverside-institute";

const DEMO_ROSTER: &str = "\
Student Code,Full Name,Email,Career Code,User Id
RI-0001,Camila Torres,camila.torres@riverside.edu,SIS,student-camila
RI-0002,Diego Salazar,diego.salazar@riverside.edu,SIS,student-diego
";

/// Everything the demo tenant exposes to callers.
pub(crate) struct DemoCampus {
    pub(crate) institution: Institution,
    pub(crate) admin: Actor,
    pub(crate) students: [(Actor, Student); 2],
    pub(crate) subjects: [Subject; 3],
}

/// Register one institution with a career, a cycle, three subjects, and the
/// students listed in the bundled roster.
pub(crate) fn seed_demo_campus(catalog: &Catalog) -> Result<DemoCampus, AppError> {
    let institution = catalog.register_institution("Riverside Institute", DEMO_SLUG)?;
    let admin = Actor::new("registrar-riverside", Role::Admin, &institution.id);

    let career = catalog.create_career(
        &admin,
        NewCareer {
            code: "SIS".to_string(),
            name: "Systems Engineering".to_string(),
        },
    )?;
    let cycle = catalog.create_cycle(
        &admin,
        NewCycle {
            career_id: career.id.clone(),
            number: 1,
            name: "First cycle".to_string(),
        },
    )?;
    let professor = catalog.create_professor(
        &admin,
        NewProfessor {
            full_name: "Elena Paredes".to_string(),
            email: "elena.paredes@riverside.edu".to_string(),
        },
    )?;

    let subject = |code: &str, name: &str, credits: u8| {
        catalog.create_subject(
            &admin,
            NewSubject {
                career_id: career.id.clone(),
                cycle_id: cycle.id.clone(),
                code: code.to_string(),
                name: name.to_string(),
                credits,
                professor_id: Some(professor.id.clone()),
            },
        )
    };
    let subjects = [
        subject("MAT101", "Calculus I", 4)?,
        subject("PRG101", "Introduction to Programming", 5)?,
        subject("COM101", "Academic Writing", 3)?,
    ];

    catalog.import_students(&admin, DEMO_ROSTER.as_bytes())?;
    let linked = |user_id: &str| -> Result<(Actor, Student), AppError> {
        let actor = Actor::new(user_id, Role::Student, &institution.id);
        let student = catalog.student_for_actor(&actor)?;
        Ok((actor, student))
    };
    let students = [linked("student-camila")?, linked("student-diego")?];

    Ok(DemoCampus {
        institution,
        admin,
        students,
        subjects,
    })
}
