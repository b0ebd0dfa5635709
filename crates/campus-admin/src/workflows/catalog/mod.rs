//! Tenant reference data: the institution and the careers, cycles,
//! professors, subjects, and students that enrollment requests point at.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;


pub use domain::{
    Career, CareerId, Cycle, CycleId, Institution, InstitutionId, NewCareer, NewCycle,
    NewProfessor, NewStudent, NewSubject, Professor, ProfessorId, Student, StudentId, Subject,
    SubjectId, UserId,
};
pub use repository::CatalogRepository;
pub use router::catalog_router;
pub use service::{CatalogService, CatalogServiceError};
