use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::identity::UserId;
use crate::domain::request::RequestId;
use crate::domain::service::ServiceId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Success => "Success",
            Self::Failed => "Failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(Self::Pending),
            "Success" => Some(Self::Success),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One payment attempt from the ledger. The transaction reference is
/// caller-supplied and unique per user; `request_id` is set at most once,
/// by the lifecycle engine, under a store-level uniqueness constraint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub service_id: ServiceId,
    pub transaction_ref: String,
    pub amount: Decimal,
    pub method: Option<String>,
    pub status: PaymentStatus,
    pub request_id: Option<RequestId>,
    pub paid_at: Option<DateTime<Utc>>,
}
