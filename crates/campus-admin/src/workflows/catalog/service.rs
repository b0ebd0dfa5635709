use std::io::Read;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{
    Career, CareerId, Cycle, CycleId, Institution, InstitutionId, NewCareer, NewCycle,
    NewProfessor, NewStudent, NewSubject, Professor, ProfessorId, Student, StudentId, Subject,
    SubjectId, UserId, MAX_CYCLE_NUMBER, MAX_SUBJECT_CREDITS,
};
use super::repository::CatalogRepository;
use crate::access::{AccessError, Actor};
use crate::workflows::next_sequence_id;
use crate::workflows::roster::{parse_roster, RosterImportError};
use crate::workflows::storage::RepositoryError;

static INSTITUTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static CAREER_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static CYCLE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static PROFESSOR_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static SUBJECT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static STUDENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Tenant-scoped management of careers, cycles, professors, subjects, and students.
pub struct CatalogService<C> {
    repository: Arc<C>,
}

impl<C> CatalogService<C>
where
    C: CatalogRepository + 'static,
{
    pub fn new(repository: Arc<C>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<C> {
        &self.repository
    }

    /// Bootstrap a tenant. Not exposed over HTTP; seeding and the CLI call it.
    pub fn register_institution(
        &self,
        name: &str,
        slug: &str,
    ) -> Result<Institution, CatalogServiceError> {
        let name = required("name", name)?;
        let slug = required("slug", slug)?.to_ascii_lowercase();
        if !slug
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
        {
            return Err(CatalogServiceError::Validation(format!(
                "slug '{slug}' may only contain letters, digits, and '-'"
            )));
        }

        let institution = Institution {
            id: InstitutionId(next_sequence_id("inst", &INSTITUTION_SEQUENCE)),
            name,
            slug,
            created_at: Utc::now(),
        };
        let stored = self.repository.insert_institution(institution)?;
        info!(institution = %stored.id, slug = %stored.slug, "institution registered");
        Ok(stored)
    }

    pub fn institution(&self, actor: &Actor) -> Result<Institution, CatalogServiceError> {
        self.repository
            .institution(&actor.institution_id)?
            .ok_or(CatalogServiceError::Repository(RepositoryError::NotFound))
    }

    pub fn create_career(
        &self,
        actor: &Actor,
        input: NewCareer,
    ) -> Result<Career, CatalogServiceError> {
        actor.require_admin()?;
        self.institution(actor)?;

        let career = Career {
            id: CareerId(next_sequence_id("car", &CAREER_SEQUENCE)),
            institution_id: actor.institution_id.clone(),
            code: required("code", &input.code)?.to_ascii_uppercase(),
            name: required("name", &input.name)?,
        };
        Ok(self.repository.insert_career(career)?)
    }

    pub fn create_cycle(&self, actor: &Actor, input: NewCycle) -> Result<Cycle, CatalogServiceError> {
        actor.require_admin()?;
        let career = self.career(actor, &input.career_id).map_err(as_reference)?;
        if input.number == 0 || input.number > MAX_CYCLE_NUMBER {
            return Err(CatalogServiceError::Validation(format!(
                "cycle number must be between 1 and {MAX_CYCLE_NUMBER}"
            )));
        }

        let cycle = Cycle {
            id: CycleId(next_sequence_id("cyc", &CYCLE_SEQUENCE)),
            institution_id: actor.institution_id.clone(),
            career_id: career.id,
            number: input.number,
            name: required("name", &input.name)?,
        };
        Ok(self.repository.insert_cycle(cycle)?)
    }

    pub fn create_professor(
        &self,
        actor: &Actor,
        input: NewProfessor,
    ) -> Result<Professor, CatalogServiceError> {
        actor.require_admin()?;
        self.institution(actor)?;

        let professor = Professor {
            id: ProfessorId(next_sequence_id("prof", &PROFESSOR_SEQUENCE)),
            institution_id: actor.institution_id.clone(),
            full_name: required("full_name", &input.full_name)?,
            email: email(&input.email)?,
        };
        Ok(self.repository.insert_professor(professor)?)
    }

    pub fn create_subject(
        &self,
        actor: &Actor,
        input: NewSubject,
    ) -> Result<Subject, CatalogServiceError> {
        actor.require_admin()?;
        let career = self.career(actor, &input.career_id).map_err(as_reference)?;
        let cycle = self.cycle(actor, &input.cycle_id).map_err(as_reference)?;
        if cycle.career_id != career.id {
            return Err(CatalogServiceError::Validation(format!(
                "cycle {} does not belong to career {}",
                cycle.id, career.id
            )));
        }
        if input.credits == 0 || input.credits > MAX_SUBJECT_CREDITS {
            return Err(CatalogServiceError::Validation(format!(
                "credits must be between 1 and {MAX_SUBJECT_CREDITS}"
            )));
        }
        let professor_id = match input.professor_id {
            Some(id) => Some(self.professor(actor, &id).map_err(as_reference)?.id),
            None => None,
        };

        let subject = Subject {
            id: SubjectId(next_sequence_id("sub", &SUBJECT_SEQUENCE)),
            institution_id: actor.institution_id.clone(),
            career_id: career.id,
            cycle_id: cycle.id,
            code: required("code", &input.code)?.to_ascii_uppercase(),
            name: required("name", &input.name)?,
            credits: input.credits,
            professor_id,
        };
        Ok(self.repository.insert_subject(subject)?)
    }

    pub fn create_student(
        &self,
        actor: &Actor,
        input: NewStudent,
    ) -> Result<Student, CatalogServiceError> {
        actor.require_admin()?;
        let career = self.career(actor, &input.career_id).map_err(as_reference)?;
        let user_id = required("user_id", &input.user_id.0)?;

        let student = Student {
            id: StudentId(next_sequence_id("stu", &STUDENT_SEQUENCE)),
            institution_id: actor.institution_id.clone(),
            user_id: UserId(user_id),
            career_id: career.id,
            student_code: required("student_code", &input.student_code)?.to_ascii_uppercase(),
            full_name: required("full_name", &input.full_name)?,
            email: email(&input.email)?,
        };
        let stored = self.repository.insert_student(student)?;
        info!(student = %stored.id, institution = %stored.institution_id, "student created");
        Ok(stored)
    }

    /// Create every student listed in a CSV roster.
    ///
    /// Stops at the first failing row; rows before it stay created.
    pub fn import_students<R: Read>(
        &self,
        actor: &Actor,
        roster: R,
    ) -> Result<Vec<Student>, CatalogServiceError> {
        actor.require_admin()?;
        let entries = parse_roster(roster)?;
        let careers = self.repository.careers(&actor.institution_id)?;

        let mut created = Vec::with_capacity(entries.len());
        for entry in entries {
            let line = entry.line;
            let career = careers
                .iter()
                .find(|career| career.code == entry.career_code)
                .ok_or_else(|| CatalogServiceError::ImportRow {
                    line,
                    source: Box::new(CatalogServiceError::UnknownReference(format!(
                        "career code {}",
                        entry.career_code
                    ))),
                })?;

            let student = self
                .create_student(
                    actor,
                    NewStudent {
                        user_id: UserId(entry.user_id),
                        career_id: career.id.clone(),
                        student_code: entry.student_code,
                        full_name: entry.full_name,
                        email: entry.email,
                    },
                )
                .map_err(|source| CatalogServiceError::ImportRow {
                    line,
                    source: Box::new(source),
                })?;
            created.push(student);
        }

        info!(
            institution = %actor.institution_id,
            imported = created.len(),
            "student roster imported"
        );
        Ok(created)
    }

    pub fn careers(&self, actor: &Actor) -> Result<Vec<Career>, CatalogServiceError> {
        Ok(self.repository.careers(&actor.institution_id)?)
    }

    pub fn cycles(&self, actor: &Actor) -> Result<Vec<Cycle>, CatalogServiceError> {
        Ok(self.repository.cycles(&actor.institution_id)?)
    }

    pub fn professors(&self, actor: &Actor) -> Result<Vec<Professor>, CatalogServiceError> {
        Ok(self.repository.professors(&actor.institution_id)?)
    }

    pub fn subjects(&self, actor: &Actor) -> Result<Vec<Subject>, CatalogServiceError> {
        Ok(self.repository.subjects(&actor.institution_id)?)
    }

    pub fn students(&self, actor: &Actor) -> Result<Vec<Student>, CatalogServiceError> {
        actor.require_admin()?;
        Ok(self.repository.students(&actor.institution_id)?)
    }

    pub fn career(&self, actor: &Actor, id: &CareerId) -> Result<Career, CatalogServiceError> {
        scoped(actor, self.repository.career(id)?, |career| &career.institution_id)
            .ok_or_else(|| CatalogServiceError::NotFound(format!("career {id}")))
    }

    pub fn cycle(&self, actor: &Actor, id: &CycleId) -> Result<Cycle, CatalogServiceError> {
        scoped(actor, self.repository.cycle(id)?, |cycle| &cycle.institution_id)
            .ok_or_else(|| CatalogServiceError::NotFound(format!("cycle {id}")))
    }

    pub fn professor(
        &self,
        actor: &Actor,
        id: &ProfessorId,
    ) -> Result<Professor, CatalogServiceError> {
        scoped(actor, self.repository.professor(id)?, |professor| {
            &professor.institution_id
        })
        .ok_or_else(|| CatalogServiceError::NotFound(format!("professor {id}")))
    }

    pub fn subject(&self, actor: &Actor, id: &SubjectId) -> Result<Subject, CatalogServiceError> {
        scoped(actor, self.repository.subject(id)?, |subject| &subject.institution_id)
            .ok_or_else(|| CatalogServiceError::NotFound(format!("subject {id}")))
    }

    pub fn student(&self, actor: &Actor, id: &StudentId) -> Result<Student, CatalogServiceError> {
        scoped(actor, self.repository.student(id)?, |student| &student.institution_id)
            .ok_or_else(|| CatalogServiceError::NotFound(format!("student {id}")))
    }

    /// The student record linked to the caller's login, if any.
    pub fn student_for_actor(&self, actor: &Actor) -> Result<Student, CatalogServiceError> {
        self.repository
            .student_by_user(&actor.institution_id, &actor.user_id)?
            .ok_or_else(|| {
                CatalogServiceError::Access(AccessError::Forbidden(format!(
                    "user {} has no student record",
                    actor.user_id
                )))
            })
    }
}

/// A row named inside a create payload is a bad reference, not a missing target.
fn as_reference(error: CatalogServiceError) -> CatalogServiceError {
    match error {
        CatalogServiceError::NotFound(what) => CatalogServiceError::UnknownReference(what),
        other => other,
    }
}

fn scoped<T>(actor: &Actor, row: Option<T>, tenant: impl Fn(&T) -> &InstitutionId) -> Option<T> {
    row.filter(|row| tenant(row) == &actor.institution_id)
}

fn required(field: &str, value: &str) -> Result<String, CatalogServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(CatalogServiceError::Validation(format!("{field} must not be empty")))
    } else {
        Ok(trimmed.to_string())
    }
}

fn email(value: &str) -> Result<String, CatalogServiceError> {
    let email = required("email", value)?.to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(CatalogServiceError::Validation(format!(
            "'{email}' is not a valid email address"
        ))),
    }
}

/// Error raised by the catalog service.
#[derive(Debug, thiserror::Error)]
pub enum CatalogServiceError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("invalid catalog entry: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("unknown {0}")]
    UnknownReference(String),
    #[error(transparent)]
    Roster(#[from] RosterImportError),
    #[error("roster line {line}: {source}")]
    ImportRow {
        line: usize,
        source: Box<CatalogServiceError>,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
