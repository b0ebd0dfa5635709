use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    AcademicTerm, CancelInput, EnrolledSubject, EnrollmentFilter, EnrollmentQuery,
    EnrollmentRequest, EnrollmentRequestId, EnrollmentStatus, NewEnrollmentRequest,
    ReviewDecision, ReviewInput, TransitionError,
};
use super::repository::EnrollmentRepository;
use crate::access::{AccessError, Actor, Role};
use crate::workflows::catalog::{
    CatalogRepository, CatalogService, CatalogServiceError, Student, StudentId, Subject,
};
use crate::workflows::next_sequence_id;
use crate::workflows::notifications::{
    NewNotification, NotificationKind, NotificationRepository, NotificationService,
    NotificationServiceError,
};
use crate::workflows::storage::RepositoryError;

static ENROLLMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Service composing the request store, the catalog, and the notification emitter.
///
/// A decision is a fixed sequence of writes: the conditional status update,
/// the enrolled-subject row (approvals only), then the notification. A failing
/// write is returned as-is and earlier writes are kept.
pub struct EnrollmentService<R, C, N> {
    repository: Arc<R>,
    catalog: Arc<CatalogService<C>>,
    notifications: Arc<NotificationService<N>>,
}

impl<R, C, N> EnrollmentService<R, C, N>
where
    R: EnrollmentRepository + 'static,
    C: CatalogRepository + 'static,
    N: NotificationRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        catalog: Arc<CatalogService<C>>,
        notifications: Arc<NotificationService<N>>,
    ) -> Self {
        Self {
            repository,
            catalog,
            notifications,
        }
    }

    /// File a new request on behalf of the calling student.
    pub fn submit(
        &self,
        actor: &Actor,
        input: NewEnrollmentRequest,
    ) -> Result<EnrollmentRequest, EnrollmentServiceError> {
        actor.require_role(Role::Student)?;
        let student = self.catalog.student_for_actor(actor)?;
        let term = AcademicTerm::new(input.academic_year, input.semester)
            .map_err(EnrollmentServiceError::Validation)?;
        let subject = self.catalog.subject(actor, &input.subject_id)?;

        if let Some(career_id) = &input.career_id {
            if career_id != &subject.career_id {
                return Err(EnrollmentServiceError::Validation(format!(
                    "subject {} is not part of career {career_id}",
                    subject.id
                )));
            }
        }
        if let Some(cycle_id) = &input.cycle_id {
            if cycle_id != &subject.cycle_id {
                return Err(EnrollmentServiceError::Validation(format!(
                    "subject {} is not offered in cycle {cycle_id}",
                    subject.id
                )));
            }
        }
        if subject.career_id != student.career_id {
            return Err(EnrollmentServiceError::Validation(format!(
                "subject {} belongs to another career than student {}",
                subject.id, student.id
            )));
        }

        let already_enrolled = self
            .repository
            .enrolled_subjects(&student.id)?
            .iter()
            .any(|row| {
                row.subject_id == subject.id
                    && row.academic_year == term.academic_year
                    && row.semester == term.semester
            });
        if already_enrolled {
            return Err(EnrollmentServiceError::AlreadyEnrolled {
                subject: subject.code,
                term,
            });
        }

        let request = EnrollmentRequest {
            id: EnrollmentRequestId(next_sequence_id("enr", &ENROLLMENT_SEQUENCE)),
            institution_id: actor.institution_id.clone(),
            student_id: student.id,
            subject_id: subject.id,
            career_id: subject.career_id,
            cycle_id: subject.cycle_id,
            academic_year: term.academic_year,
            semester: term.semester,
            status: EnrollmentStatus::Pending,
            request_date: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            admin_notes: None,
            student_notes: clean_notes(input.student_notes),
        };

        let stored = self.repository.insert(request)?;
        info!(
            request = %stored.id,
            student = %stored.student_id,
            subject = %stored.subject_id,
            term = %stored.term(),
            "enrollment request submitted"
        );
        Ok(stored)
    }

    /// Approve or reject a pending request of the caller's institution.
    pub fn review(
        &self,
        actor: &Actor,
        id: &EnrollmentRequestId,
        decision: ReviewDecision,
        input: ReviewInput,
    ) -> Result<EnrollmentRequest, EnrollmentServiceError> {
        actor.require_admin()?;
        let current = self.visible(actor, id)?;
        let status = current.status.transition(decision.target_status())?;
        let student = self.catalog.student(actor, &current.student_id)?;
        let subject = self.catalog.subject(actor, &current.subject_id)?;

        let updated = EnrollmentRequest {
            status,
            reviewed_at: Some(Utc::now()),
            reviewed_by: Some(actor.user_id.clone()),
            admin_notes: clean_notes(input.admin_notes),
            ..current
        };
        let stored = self.commit_transition(updated)?;

        if stored.status == EnrollmentStatus::Approved {
            self.repository.record_enrollment(EnrolledSubject {
                student_id: stored.student_id.clone(),
                subject_id: stored.subject_id.clone(),
                academic_year: stored.academic_year,
                semester: stored.semester,
                enrolled_at: stored.reviewed_at.unwrap_or_else(Utc::now),
                enrollment_request_id: stored.id.clone(),
            })?;
        }

        self.notifications
            .emit(decision_notification(&stored, &student, &subject))?;
        info!(
            request = %stored.id,
            status = stored.status.label(),
            reviewer = %actor.user_id,
            "enrollment request reviewed"
        );
        Ok(stored)
    }

    pub fn approve(
        &self,
        actor: &Actor,
        id: &EnrollmentRequestId,
        admin_notes: Option<String>,
    ) -> Result<EnrollmentRequest, EnrollmentServiceError> {
        self.review(actor, id, ReviewDecision::Approve, ReviewInput { admin_notes })
    }

    pub fn reject(
        &self,
        actor: &Actor,
        id: &EnrollmentRequestId,
        admin_notes: Option<String>,
    ) -> Result<EnrollmentRequest, EnrollmentServiceError> {
        self.review(actor, id, ReviewDecision::Reject, ReviewInput { admin_notes })
    }

    /// Withdraw one of the caller's own requests while it is still pending.
    pub fn cancel(
        &self,
        actor: &Actor,
        id: &EnrollmentRequestId,
        input: CancelInput,
    ) -> Result<EnrollmentRequest, EnrollmentServiceError> {
        actor.require_role(Role::Student)?;
        let current = self.visible(actor, id)?;
        let status = current.status.transition(EnrollmentStatus::Cancelled)?;
        let student = self.catalog.student(actor, &current.student_id)?;
        let subject = self.catalog.subject(actor, &current.subject_id)?;

        let student_notes = clean_notes(input.student_notes).or(current.student_notes.clone());
        let updated = EnrollmentRequest {
            status,
            reviewed_at: Some(Utc::now()),
            reviewed_by: Some(actor.user_id.clone()),
            student_notes,
            ..current
        };
        let stored = self.commit_transition(updated)?;

        self.notifications
            .emit(decision_notification(&stored, &student, &subject))?;
        info!(request = %stored.id, student = %stored.student_id, "enrollment request cancelled");
        Ok(stored)
    }

    pub fn get(
        &self,
        actor: &Actor,
        id: &EnrollmentRequestId,
    ) -> Result<EnrollmentRequest, EnrollmentServiceError> {
        self.visible(actor, id)
    }

    /// Admins query their institution; students always get only their own rows.
    pub fn list(
        &self,
        actor: &Actor,
        query: EnrollmentQuery,
    ) -> Result<Vec<EnrollmentRequest>, EnrollmentServiceError> {
        let student_id = match actor.role {
            Role::Admin => query.student_id,
            Role::Student => Some(self.catalog.student_for_actor(actor)?.id),
            Role::Professor => return Err(professor_denied().into()),
        };

        let filter = EnrollmentFilter {
            student_id,
            subject_id: query.subject_id,
            status: query.status,
            academic_year: query.academic_year,
            semester: query.semester,
            ..EnrollmentFilter::for_institution(actor.institution_id.clone())
        };
        Ok(self.repository.list(&filter)?)
    }

    pub fn enrolled_subjects(
        &self,
        actor: &Actor,
        student_id: &StudentId,
    ) -> Result<Vec<EnrolledSubject>, EnrollmentServiceError> {
        let student = match actor.role {
            Role::Admin => self.catalog.student(actor, student_id)?,
            Role::Student => {
                let own = self.catalog.student_for_actor(actor)?;
                if &own.id != student_id {
                    return Err(AccessError::Forbidden(
                        "students may only read their own enrollments".to_string(),
                    )
                    .into());
                }
                own
            }
            Role::Professor => return Err(professor_denied().into()),
        };
        Ok(self.repository.enrolled_subjects(&student.id)?)
    }

    /// Fetch a request the caller may see; everything else reads as not found.
    fn visible(
        &self,
        actor: &Actor,
        id: &EnrollmentRequestId,
    ) -> Result<EnrollmentRequest, EnrollmentServiceError> {
        let request = self
            .repository
            .fetch(id)?
            .filter(|request| request.institution_id == actor.institution_id)
            .ok_or(RepositoryError::NotFound)?;

        match actor.role {
            Role::Admin => Ok(request),
            Role::Student => {
                let own = self.catalog.student_for_actor(actor)?;
                if request.student_id == own.id {
                    Ok(request)
                } else {
                    Err(RepositoryError::NotFound.into())
                }
            }
            Role::Professor => Err(professor_denied().into()),
        }
    }

    /// Conditional update from `pending`; a lost race surfaces as the
    /// transition the winner made impossible.
    fn commit_transition(
        &self,
        updated: EnrollmentRequest,
    ) -> Result<EnrollmentRequest, EnrollmentServiceError> {
        let id = updated.id.clone();
        let target = updated.status;
        match self
            .repository
            .update_status(updated, EnrollmentStatus::Pending)
        {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::Conflict(_)) => {
                let from = self
                    .repository
                    .fetch(&id)?
                    .map(|current| current.status)
                    .ok_or(RepositoryError::NotFound)?;
                warn!(request = %id, %from, to = %target, "concurrent status change lost");
                Err(TransitionError { from, to: target }.into())
            }
            Err(other) => Err(other.into()),
        }
    }
}

fn professor_denied() -> AccessError {
    AccessError::Forbidden("professors cannot access enrollment requests".to_string())
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn decision_notification(
    request: &EnrollmentRequest,
    student: &Student,
    subject: &Subject,
) -> NewNotification {
    let (kind, title, verb) = match request.status {
        EnrollmentStatus::Approved => (
            NotificationKind::EnrollmentApproved,
            "Enrollment request approved",
            "approved",
        ),
        EnrollmentStatus::Rejected => (
            NotificationKind::EnrollmentRejected,
            "Enrollment request rejected",
            "rejected",
        ),
        EnrollmentStatus::Cancelled | EnrollmentStatus::Pending => (
            NotificationKind::EnrollmentCancelled,
            "Enrollment request cancelled",
            "cancelled",
        ),
    };

    let mut message = format!(
        "Your request to enroll in {} {} for term {} was {verb}.",
        subject.code,
        subject.name,
        request.term()
    );
    if request.status != EnrollmentStatus::Cancelled {
        if let Some(notes) = &request.admin_notes {
            message.push_str(" Notes: ");
            message.push_str(notes);
        }
    }

    NewNotification {
        institution_id: request.institution_id.clone(),
        user_id: student.user_id.clone(),
        kind,
        title: title.to_string(),
        message,
        enrollment_request_id: Some(request.id.clone()),
    }
}

/// Error raised by the enrollment service.
#[derive(Debug, thiserror::Error)]
pub enum EnrollmentServiceError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("invalid enrollment request: {0}")]
    Validation(String),
    #[error("already enrolled in {subject} for term {term}")]
    AlreadyEnrolled { subject: String, term: AcademicTerm },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Catalog(#[from] CatalogServiceError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationServiceError),
}
