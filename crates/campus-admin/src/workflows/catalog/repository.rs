use super::domain::{
    Career, CareerId, Cycle, CycleId, Institution, InstitutionId, Professor, ProfessorId, Student,
    StudentId, Subject, SubjectId, UserId,
};
use crate::workflows::storage::RepositoryError;

/// Storage abstraction for tenant reference data.
///
/// Inserts enforce the uniqueness rules a relational schema would carry as
/// unique indexes and report violations as [`RepositoryError::Conflict`].
/// Listing methods return rows of a single institution ordered by code;
/// cycles sort by career then number and professors by name.
pub trait CatalogRepository: Send + Sync {
    fn insert_institution(&self, institution: Institution)
        -> Result<Institution, RepositoryError>;
    fn institution(&self, id: &InstitutionId) -> Result<Option<Institution>, RepositoryError>;

    fn insert_career(&self, career: Career) -> Result<Career, RepositoryError>;
    fn career(&self, id: &CareerId) -> Result<Option<Career>, RepositoryError>;
    fn careers(&self, institution: &InstitutionId) -> Result<Vec<Career>, RepositoryError>;

    fn insert_cycle(&self, cycle: Cycle) -> Result<Cycle, RepositoryError>;
    fn cycle(&self, id: &CycleId) -> Result<Option<Cycle>, RepositoryError>;
    fn cycles(&self, institution: &InstitutionId) -> Result<Vec<Cycle>, RepositoryError>;

    fn insert_professor(&self, professor: Professor) -> Result<Professor, RepositoryError>;
    fn professor(&self, id: &ProfessorId) -> Result<Option<Professor>, RepositoryError>;
    fn professors(&self, institution: &InstitutionId) -> Result<Vec<Professor>, RepositoryError>;

    fn insert_subject(&self, subject: Subject) -> Result<Subject, RepositoryError>;
    fn subject(&self, id: &SubjectId) -> Result<Option<Subject>, RepositoryError>;
    fn subjects(&self, institution: &InstitutionId) -> Result<Vec<Subject>, RepositoryError>;

    fn insert_student(&self, student: Student) -> Result<Student, RepositoryError>;
    fn student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError>;
    fn students(&self, institution: &InstitutionId) -> Result<Vec<Student>, RepositoryError>;
    fn student_by_user(
        &self,
        institution: &InstitutionId,
        user_id: &UserId,
    ) -> Result<Option<Student>, RepositoryError>;
}
