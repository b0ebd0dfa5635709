pub mod catalog;
pub mod enrollment;
mod http;
pub mod notifications;
pub mod roster;
pub mod storage;

use std::sync::atomic::{AtomicU64, Ordering};

/// Formats a process-unique identifier such as `enr-000042`.
pub(crate) fn next_sequence_id(prefix: &str, sequence: &AtomicU64) -> String {
    let id = sequence.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}
