use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::identity::{AdminId, UserId};
use crate::domain::service::ServiceId;

/// System-generated, monotonically increasing request identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Request,
    Complaint,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "Request",
            Self::Complaint => "Complaint",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Request" => Some(Self::Request),
            "Complaint" => Some(Self::Complaint),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::Pending,
        RequestStatus::InProgress,
        RequestStatus::Completed,
        RequestStatus::Rejected,
        RequestStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "InProgress",
            Self::Completed => "Completed",
            Self::Rejected => "Rejected",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(Self::Pending),
            "InProgress" => Some(Self::InProgress),
            "Completed" => Some(Self::Completed),
            "Rejected" => Some(Self::Rejected),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// A citizen-submitted service request or complaint tracked through the
/// status lifecycle. Admins may move any status to any other status; the
/// permissive graph is deliberate. Users may only cancel while `Pending`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: RequestId,
    pub user_id: UserId,
    pub service_id: ServiceId,
    pub kind: RequestKind,
    pub description: Option<String>,
    pub status: RequestStatus,
    pub assigned_to: Option<AdminId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    pub fn user_can_cancel(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Re-applying the current status is rejected rather than silently
    /// accepted, so the history never records a self-loop.
    pub fn is_noop_transition(&self, next: RequestStatus) -> bool {
        self.status == next
    }
}
