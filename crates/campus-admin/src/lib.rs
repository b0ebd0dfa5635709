//! Campus administration core: tenant catalog, enrollment approvals, and the
//! notification feed students watch for decisions.

pub mod access;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
