//! Mutex-guarded in-memory stores.
//!
//! Uniqueness and conditional updates are checked under the table lock, the
//! same guarantees a relational store provides with unique indexes and
//! `UPDATE ... WHERE status = ...`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::RepositoryError;
use crate::access::{InstitutionId, UserId};
use crate::workflows::catalog::{
    CatalogRepository, Career, CareerId, Cycle, CycleId, Institution, Professor, ProfessorId,
    Student, StudentId, Subject, SubjectId,
};
use crate::workflows::enrollment::{
    EnrolledSubject, EnrollmentFilter, EnrollmentRepository, EnrollmentRequest,
    EnrollmentRequestId, EnrollmentStatus,
};
use crate::workflows::notifications::{Notification, NotificationId, NotificationRepository};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
}

#[derive(Default)]
struct CatalogTables {
    institutions: BTreeMap<InstitutionId, Institution>,
    careers: BTreeMap<CareerId, Career>,
    cycles: BTreeMap<CycleId, Cycle>,
    professors: BTreeMap<ProfessorId, Professor>,
    subjects: BTreeMap<SubjectId, Subject>,
    students: BTreeMap<StudentId, Student>,
}

#[derive(Default, Clone)]
pub struct InMemoryCatalog {
    tables: Arc<Mutex<CatalogTables>>,
}

fn in_tenant<'a, T: Clone + 'a>(
    rows: impl Iterator<Item = &'a T>,
    institution: &InstitutionId,
    tenant: impl Fn(&T) -> &InstitutionId,
) -> Vec<T> {
    rows.filter(|row| tenant(*row) == institution)
        .cloned()
        .collect()
}

impl CatalogRepository for InMemoryCatalog {
    fn insert_institution(
        &self,
        institution: Institution,
    ) -> Result<Institution, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        if tables
            .institutions
            .values()
            .any(|existing| existing.slug == institution.slug)
        {
            return Err(RepositoryError::Conflict(format!(
                "institution slug {}",
                institution.slug
            )));
        }
        tables
            .institutions
            .insert(institution.id.clone(), institution.clone());
        Ok(institution)
    }

    fn institution(&self, id: &InstitutionId) -> Result<Option<Institution>, RepositoryError> {
        Ok(lock(&self.tables)?.institutions.get(id).cloned())
    }

    fn insert_career(&self, career: Career) -> Result<Career, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        if tables.careers.values().any(|existing| {
            existing.institution_id == career.institution_id && existing.code == career.code
        }) {
            return Err(RepositoryError::Conflict(format!("career code {}", career.code)));
        }
        tables.careers.insert(career.id.clone(), career.clone());
        Ok(career)
    }

    fn career(&self, id: &CareerId) -> Result<Option<Career>, RepositoryError> {
        Ok(lock(&self.tables)?.careers.get(id).cloned())
    }

    fn careers(&self, institution: &InstitutionId) -> Result<Vec<Career>, RepositoryError> {
        let tables = lock(&self.tables)?;
        let mut rows = in_tenant(tables.careers.values(), institution, |row| {
            &row.institution_id
        });
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(rows)
    }

    fn insert_cycle(&self, cycle: Cycle) -> Result<Cycle, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        if tables.cycles.values().any(|existing| {
            existing.career_id == cycle.career_id && existing.number == cycle.number
        }) {
            return Err(RepositoryError::Conflict(format!(
                "cycle {} of career {}",
                cycle.number, cycle.career_id
            )));
        }
        tables.cycles.insert(cycle.id.clone(), cycle.clone());
        Ok(cycle)
    }

    fn cycle(&self, id: &CycleId) -> Result<Option<Cycle>, RepositoryError> {
        Ok(lock(&self.tables)?.cycles.get(id).cloned())
    }

    fn cycles(&self, institution: &InstitutionId) -> Result<Vec<Cycle>, RepositoryError> {
        let tables = lock(&self.tables)?;
        let mut rows = in_tenant(tables.cycles.values(), institution, |row| {
            &row.institution_id
        });
        rows.sort_by(|a, b| (&a.career_id, a.number).cmp(&(&b.career_id, b.number)));
        Ok(rows)
    }

    fn insert_professor(&self, professor: Professor) -> Result<Professor, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        if tables.professors.values().any(|existing| {
            existing.institution_id == professor.institution_id && existing.email == professor.email
        }) {
            return Err(RepositoryError::Conflict(format!(
                "professor email {}",
                professor.email
            )));
        }
        tables
            .professors
            .insert(professor.id.clone(), professor.clone());
        Ok(professor)
    }

    fn professor(&self, id: &ProfessorId) -> Result<Option<Professor>, RepositoryError> {
        Ok(lock(&self.tables)?.professors.get(id).cloned())
    }

    fn professors(&self, institution: &InstitutionId) -> Result<Vec<Professor>, RepositoryError> {
        let tables = lock(&self.tables)?;
        let mut rows = in_tenant(tables.professors.values(), institution, |row| {
            &row.institution_id
        });
        rows.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(rows)
    }

    fn insert_subject(&self, subject: Subject) -> Result<Subject, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        if tables.subjects.values().any(|existing| {
            existing.institution_id == subject.institution_id && existing.code == subject.code
        }) {
            return Err(RepositoryError::Conflict(format!(
                "subject code {}",
                subject.code
            )));
        }
        tables.subjects.insert(subject.id.clone(), subject.clone());
        Ok(subject)
    }

    fn subject(&self, id: &SubjectId) -> Result<Option<Subject>, RepositoryError> {
        Ok(lock(&self.tables)?.subjects.get(id).cloned())
    }

    fn subjects(&self, institution: &InstitutionId) -> Result<Vec<Subject>, RepositoryError> {
        let tables = lock(&self.tables)?;
        let mut rows = in_tenant(tables.subjects.values(), institution, |row| {
            &row.institution_id
        });
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(rows)
    }

    fn insert_student(&self, student: Student) -> Result<Student, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        let duplicate = tables.students.values().find(|existing| {
            existing.institution_id == student.institution_id
                && (existing.user_id == student.user_id
                    || existing.student_code == student.student_code)
        });
        if let Some(existing) = duplicate {
            let field = if existing.user_id == student.user_id {
                format!("student user {}", student.user_id)
            } else {
                format!("student code {}", student.student_code)
            };
            return Err(RepositoryError::Conflict(field));
        }
        tables.students.insert(student.id.clone(), student.clone());
        Ok(student)
    }

    fn student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        Ok(lock(&self.tables)?.students.get(id).cloned())
    }

    fn students(&self, institution: &InstitutionId) -> Result<Vec<Student>, RepositoryError> {
        let tables = lock(&self.tables)?;
        let mut rows = in_tenant(tables.students.values(), institution, |row| {
            &row.institution_id
        });
        rows.sort_by(|a, b| a.student_code.cmp(&b.student_code));
        Ok(rows)
    }

    fn student_by_user(
        &self,
        institution: &InstitutionId,
        user_id: &UserId,
    ) -> Result<Option<Student>, RepositoryError> {
        Ok(lock(&self.tables)?
            .students
            .values()
            .find(|student| &student.institution_id == institution && &student.user_id == user_id)
            .cloned())
    }
}

#[derive(Default)]
struct EnrollmentTables {
    requests: HashMap<EnrollmentRequestId, EnrollmentRequest>,
    enrolled: Vec<EnrolledSubject>,
}

#[derive(Default, Clone)]
pub struct InMemoryEnrollmentStore {
    tables: Arc<Mutex<EnrollmentTables>>,
}

impl EnrollmentRepository for InMemoryEnrollmentStore {
    fn insert(&self, request: EnrollmentRequest) -> Result<EnrollmentRequest, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        if tables.requests.contains_key(&request.id) {
            return Err(RepositoryError::Conflict(format!(
                "enrollment request {}",
                request.id
            )));
        }
        if let Some(active) = tables
            .requests
            .values()
            .find(|existing| existing.status.is_active() && existing.same_slot(&request))
        {
            return Err(RepositoryError::Conflict(format!(
                "{} request {} already covers this subject and term",
                active.status, active.id
            )));
        }
        tables.requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn fetch(
        &self,
        id: &EnrollmentRequestId,
    ) -> Result<Option<EnrollmentRequest>, RepositoryError> {
        Ok(lock(&self.tables)?.requests.get(id).cloned())
    }

    fn update_status(
        &self,
        request: EnrollmentRequest,
        expected: EnrollmentStatus,
    ) -> Result<EnrollmentRequest, RepositoryError> {
        let mut tables = lock(&self.tables)?;
        let stored = tables
            .requests
            .get_mut(&request.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Err(RepositoryError::Conflict(format!(
                "enrollment request {} is {}, expected {}",
                request.id, stored.status, expected
            )));
        }
        *stored = request.clone();
        Ok(request)
    }

    fn list(&self, filter: &EnrollmentFilter) -> Result<Vec<EnrollmentRequest>, RepositoryError> {
        let tables = lock(&self.tables)?;
        let mut rows: Vec<EnrollmentRequest> = tables
            .requests
            .values()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.request_date
                .cmp(&a.request_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    fn record_enrollment(&self, enrollment: EnrolledSubject) -> Result<(), RepositoryError> {
        let mut tables = lock(&self.tables)?;
        let duplicate = tables.enrolled.iter().any(|existing| {
            existing.student_id == enrollment.student_id
                && existing.subject_id == enrollment.subject_id
                && existing.academic_year == enrollment.academic_year
                && existing.semester == enrollment.semester
        });
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "student {} already enrolled in {}",
                enrollment.student_id, enrollment.subject_id
            )));
        }
        tables.enrolled.push(enrollment);
        Ok(())
    }

    fn enrolled_subjects(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<EnrolledSubject>, RepositoryError> {
        Ok(lock(&self.tables)?
            .enrolled
            .iter()
            .filter(|row| &row.student_id == student_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryNotificationStore {
    rows: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryNotificationStore {
    /// Every stored row, oldest first.
    pub fn all(&self) -> Result<Vec<Notification>, RepositoryError> {
        Ok(lock(&self.rows)?.clone())
    }
}

impl NotificationRepository for InMemoryNotificationStore {
    fn insert(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        let mut rows = lock(&self.rows)?;
        if rows.iter().any(|existing| existing.id == notification.id) {
            return Err(RepositoryError::Conflict(format!(
                "notification {}",
                notification.id
            )));
        }
        rows.push(notification.clone());
        Ok(notification)
    }

    fn fetch(&self, id: &NotificationId) -> Result<Option<Notification>, RepositoryError> {
        Ok(lock(&self.rows)?.iter().find(|row| &row.id == id).cloned())
    }

    fn list_for_user(
        &self,
        institution_id: &InstitutionId,
        user_id: &UserId,
        unread_only: bool,
        limit: Option<usize>,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = lock(&self.rows)?;
        let matching = rows
            .iter()
            .rev()
            .filter(|row| {
                row.is_addressed_to(institution_id, user_id) && (!unread_only || !row.is_read)
            })
            .cloned();
        Ok(match limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    fn mark_read(&self, id: &NotificationId) -> Result<Notification, RepositoryError> {
        let mut rows = lock(&self.rows)?;
        let row = rows
            .iter_mut()
            .find(|row| &row.id == id)
            .ok_or(RepositoryError::NotFound)?;
        row.is_read = true;
        Ok(row.clone())
    }

    fn mark_all_read(
        &self,
        institution_id: &InstitutionId,
        user_id: &UserId,
    ) -> Result<usize, RepositoryError> {
        let mut rows = lock(&self.rows)?;
        let mut changed = 0;
        for row in rows
            .iter_mut()
            .filter(|row| row.is_addressed_to(institution_id, user_id) && !row.is_read)
        {
            row.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }
}
