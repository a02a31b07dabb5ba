use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::identity::AdminId;
use crate::domain::request::{RequestId, RequestStatus};

/// Immutable audit record of one status change. Created only by the
/// lifecycle engine; `old_status` is null only for the creation entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub request_id: RequestId,
    pub old_status: Option<RequestStatus>,
    pub new_status: RequestStatus,
    pub changed_by: Option<AdminId>,
    pub remarks: Option<String>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChainViolation {
    #[error("history is empty")]
    Empty,
    #[error("first entry must be the creation entry (old status null)")]
    CreationNotFirst,
    #[error("more than one creation entry at index {index}")]
    DuplicateCreationEntry { index: usize },
    #[error("entry {index} does not continue from the previous status")]
    BrokenLink { index: usize },
}

/// Verify chronological chain integrity of one request's history, in
/// replay (oldest-first) order: exactly one creation entry, first, and
/// every later entry's old status equal to its predecessor's new status.
pub fn verify_chain(entries: &[StatusHistoryEntry]) -> Result<(), ChainViolation> {
    let first = entries.first().ok_or(ChainViolation::Empty)?;
    if first.old_status.is_some() {
        return Err(ChainViolation::CreationNotFirst);
    }

    let mut previous = first.new_status;
    for (index, entry) in entries.iter().enumerate().skip(1) {
        match entry.old_status {
            None => return Err(ChainViolation::DuplicateCreationEntry { index }),
            Some(old) if old != previous => return Err(ChainViolation::BrokenLink { index }),
            Some(_) => previous = entry.new_status,
        }
    }

    Ok(())
}
