use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::identity::UserId;
use crate::domain::request::RequestId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    Pending,
    Verified,
    Rejected,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Verified => "Verified",
            Self::Rejected => "Rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(Self::Pending),
            "Verified" => Some(Self::Verified),
            "Rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Bookkeeping row for an uploaded document; the file itself lives in
/// external storage and only the path is tracked here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub user_id: UserId,
    pub request_id: Option<RequestId>,
    pub document_type: String,
    pub document_number: Option<String>,
    pub file_path: String,
    pub verified_status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
}
