use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::access::{InstitutionId, UserId};

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

catalog_id!(CareerId);
catalog_id!(CycleId);
catalog_id!(ProfessorId);
catalog_id!(SubjectId);
catalog_id!(
    /// Catalog identifier of a student, distinct from the student's login [`UserId`].
    StudentId
);

pub const MAX_CYCLE_NUMBER: u8 = 20;
pub const MAX_SUBJECT_CREDITS: u8 = 30;

/// Tenant organization owning careers, cycles, subjects, and users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub id: InstitutionId,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// Degree program offered by an institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Career {
    pub id: CareerId,
    pub institution_id: InstitutionId,
    pub code: String,
    pub name: String,
}

/// Numbered stage of a career's curriculum (first cycle, second cycle, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,
    pub institution_id: InstitutionId,
    pub career_id: CareerId,
    pub number: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professor {
    pub id: ProfessorId,
    pub institution_id: InstitutionId,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub institution_id: InstitutionId,
    pub career_id: CareerId,
    pub cycle_id: CycleId,
    pub code: String,
    pub name: String,
    pub credits: u8,
    pub professor_id: Option<ProfessorId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub institution_id: InstitutionId,
    pub user_id: UserId,
    pub career_id: CareerId,
    pub student_code: String,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCareer {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCycle {
    pub career_id: CareerId,
    pub number: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfessor {
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubject {
    pub career_id: CareerId,
    pub cycle_id: CycleId,
    pub code: String,
    pub name: String,
    pub credits: u8,
    #[serde(default)]
    pub professor_id: Option<ProfessorId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub user_id: UserId,
    pub career_id: CareerId,
    pub student_code: String,
    pub full_name: String,
    pub email: String,
}
