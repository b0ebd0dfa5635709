use super::domain::{
    EnrolledSubject, EnrollmentFilter, EnrollmentRequest, EnrollmentRequestId, EnrollmentStatus,
};
use crate::workflows::catalog::StudentId;
use crate::workflows::storage::RepositoryError;

/// Storage abstraction for enrollment requests and the enrollments they produce.
///
/// Implementations carry the guarantees a relational schema would: a unique
/// index over active requests per (student, subject, term) and a conditional
/// status update.
pub trait EnrollmentRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when another active request
    /// already occupies the same (student, subject, term) slot.
    fn insert(&self, request: EnrollmentRequest) -> Result<EnrollmentRequest, RepositoryError>;
    fn fetch(&self, id: &EnrollmentRequestId)
        -> Result<Option<EnrollmentRequest>, RepositoryError>;
    /// Replace the stored row only if its status still equals `expected`.
    ///
    /// A row that moved on returns [`RepositoryError::Conflict`].
    fn update_status(
        &self,
        request: EnrollmentRequest,
        expected: EnrollmentStatus,
    ) -> Result<EnrollmentRequest, RepositoryError>;
    /// Newest `request_date` first.
    fn list(&self, filter: &EnrollmentFilter) -> Result<Vec<EnrollmentRequest>, RepositoryError>;

    fn record_enrollment(&self, enrollment: EnrolledSubject) -> Result<(), RepositoryError>;
    fn enrolled_subjects(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<EnrolledSubject>, RepositoryError>;
}
