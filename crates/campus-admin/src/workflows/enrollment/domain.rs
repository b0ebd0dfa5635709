use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{InstitutionId, UserId};
use crate::workflows::catalog::{CareerId, CycleId, StudentId, SubjectId};

pub const MIN_ACADEMIC_YEAR: i32 = 2000;
pub const MAX_ACADEMIC_YEAR: i32 = 2100;

/// Identifier wrapper for enrollment requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnrollmentRequestId(pub String);

impl fmt::Display for EnrollmentRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of an enrollment request.
///
/// `Pending` is the only non-terminal state; every other state is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl EnrollmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Approved => "approved",
            EnrollmentStatus::Rejected => "rejected",
            EnrollmentStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, EnrollmentStatus::Pending)
    }

    /// Counts toward the one-live-request-per-term rule.
    pub const fn is_active(self) -> bool {
        matches!(self, EnrollmentStatus::Pending | EnrollmentStatus::Approved)
    }

    pub const fn can_transition_to(self, next: EnrollmentStatus) -> bool {
        matches!(self, EnrollmentStatus::Pending) && next.is_terminal()
    }

    pub fn transition(self, next: EnrollmentStatus) -> Result<EnrollmentStatus, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError { from: self, to: next })
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move an enrollment request from {from} to {to}")]
pub struct TransitionError {
    pub from: EnrollmentStatus,
    pub to: EnrollmentStatus,
}

/// Administrator verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub const fn target_status(self) -> EnrollmentStatus {
        match self {
            ReviewDecision::Approve => EnrollmentStatus::Approved,
            ReviewDecision::Reject => EnrollmentStatus::Rejected,
        }
    }
}

/// Academic year plus semester (1 or 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AcademicTerm {
    pub academic_year: i32,
    pub semester: u8,
}

impl AcademicTerm {
    pub fn new(academic_year: i32, semester: u8) -> Result<Self, String> {
        if !(MIN_ACADEMIC_YEAR..=MAX_ACADEMIC_YEAR).contains(&academic_year) {
            return Err(format!(
                "academic_year must be between {MIN_ACADEMIC_YEAR} and {MAX_ACADEMIC_YEAR}"
            ));
        }
        if !(1..=2).contains(&semester) {
            return Err("semester must be 1 or 2".to_string());
        }
        Ok(Self {
            academic_year,
            semester,
        })
    }
}

impl fmt::Display for AcademicTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.academic_year, self.semester)
    }
}

/// A student's ask to join a subject for one academic term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub id: EnrollmentRequestId,
    pub institution_id: InstitutionId,
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub career_id: CareerId,
    pub cycle_id: CycleId,
    pub academic_year: i32,
    pub semester: u8,
    pub status: EnrollmentStatus,
    pub request_date: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<UserId>,
    pub admin_notes: Option<String>,
    pub student_notes: Option<String>,
}

impl EnrollmentRequest {
    pub fn term(&self) -> AcademicTerm {
        AcademicTerm {
            academic_year: self.academic_year,
            semester: self.semester,
        }
    }

    /// Whether `other` targets the same (student, subject, term) slot.
    pub fn same_slot(&self, other: &EnrollmentRequest) -> bool {
        self.student_id == other.student_id
            && self.subject_id == other.subject_id
            && self.term() == other.term()
    }
}

/// Payload a student submits. Career and cycle default to the subject's own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEnrollmentRequest {
    pub subject_id: SubjectId,
    #[serde(default)]
    pub career_id: Option<CareerId>,
    #[serde(default)]
    pub cycle_id: Option<CycleId>,
    pub academic_year: i32,
    pub semester: u8,
    #[serde(default)]
    pub student_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewInput {
    #[serde(default)]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelInput {
    #[serde(default)]
    pub student_notes: Option<String>,
}

/// Row written when a request is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolledSubject {
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub academic_year: i32,
    pub semester: u8,
    pub enrolled_at: DateTime<Utc>,
    pub enrollment_request_id: EnrollmentRequestId,
}

/// Repository-level filter. `institution_id` is always applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentFilter {
    pub institution_id: InstitutionId,
    pub student_id: Option<StudentId>,
    pub subject_id: Option<SubjectId>,
    pub status: Option<EnrollmentStatus>,
    pub academic_year: Option<i32>,
    pub semester: Option<u8>,
}

impl EnrollmentFilter {
    pub fn for_institution(institution_id: InstitutionId) -> Self {
        Self {
            institution_id,
            student_id: None,
            subject_id: None,
            status: None,
            academic_year: None,
            semester: None,
        }
    }

    pub fn matches(&self, request: &EnrollmentRequest) -> bool {
        request.institution_id == self.institution_id
            && self
                .student_id
                .as_ref()
                .map_or(true, |id| &request.student_id == id)
            && self
                .subject_id
                .as_ref()
                .map_or(true, |id| &request.subject_id == id)
            && self.status.map_or(true, |status| request.status == status)
            && self
                .academic_year
                .map_or(true, |year| request.academic_year == year)
            && self
                .semester
                .map_or(true, |semester| request.semester == semester)
    }
}

/// Caller-facing list query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentQuery {
    #[serde(default)]
    pub status: Option<EnrollmentStatus>,
    #[serde(default)]
    pub academic_year: Option<i32>,
    #[serde(default)]
    pub semester: Option<u8>,
    #[serde(default)]
    pub subject_id: Option<SubjectId>,
    #[serde(default)]
    pub student_id: Option<StudentId>,
}
