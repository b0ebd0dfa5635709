//! Caller identity as forwarded by the upstream identity proxy.
//!
//! Authentication itself happens outside this service; every request arrives
//! with the authenticated user, their role, and the institution (tenant) the
//! session is bound to.

use std::fmt;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

pub const USER_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-user-role";
pub const INSTITUTION_HEADER: &str = "x-institution-id";

/// Identity-provider user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstitutionId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for InstitutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Professor,
    Student,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Professor => "professor",
            Role::Student => "student",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "professor" => Some(Role::Professor),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    pub institution_id: InstitutionId,
}

impl Actor {
    pub fn new(user_id: &str, role: Role, institution_id: &InstitutionId) -> Self {
        Self {
            user_id: UserId(user_id.to_string()),
            role,
            institution_id: institution_id.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_role(&self, role: Role) -> Result<(), AccessError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AccessError::Forbidden(format!(
                "{} role required, caller is {}",
                role.label(),
                self.role.label()
            )))
        }
    }

    pub fn require_admin(&self) -> Result<(), AccessError> {
        self.require_role(Role::Admin)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("missing or empty {0} header")]
    MissingHeader(&'static str),
    #[error("unknown role '{0}'")]
    UnknownRole(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl AccessError {
    /// Whether the caller failed to authenticate, as opposed to lacking permission.
    pub fn is_unauthenticated(&self) -> bool {
        !matches!(self, AccessError::Forbidden(_))
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AccessError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AccessError::MissingHeader(name))
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, AccessError> {
    let user_id = header_value(headers, USER_HEADER)?;
    let raw_role = header_value(headers, ROLE_HEADER)?;
    let role = Role::parse(raw_role).ok_or_else(|| AccessError::UnknownRole(raw_role.to_string()))?;
    let institution_id = header_value(headers, INSTITUTION_HEADER)?;

    Ok(Actor {
        user_id: UserId(user_id.to_string()),
        role,
        institution_id: InstitutionId(institution_id.to_string()),
    })
}
