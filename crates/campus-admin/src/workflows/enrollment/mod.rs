//! Enrollment request lifecycle: students file requests for a subject and
//! term, administrators approve or reject them, students may withdraw them
//! while pending, and every decision notifies the student.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AcademicTerm, CancelInput, EnrolledSubject, EnrollmentFilter, EnrollmentQuery,
    EnrollmentRequest, EnrollmentRequestId, EnrollmentStatus, NewEnrollmentRequest,
    ReviewDecision, ReviewInput, TransitionError,
};
pub use repository::EnrollmentRepository;
pub use router::{enrollment_router, ReviewPayload};
pub use service::{EnrollmentService, EnrollmentServiceError};
