//! Read models for the query/reporting layer: listing filters, request
//! summaries, department grouping, and aggregate statistics.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::department::DepartmentId;
use crate::domain::payment::{PaymentId, PaymentStatus};
use crate::domain::request::{RequestId, RequestKind, RequestStatus};
use crate::domain::service::{ServiceId, ServiceType};
use crate::domain::identity::UserId;

/// Structured listing filter; each predicate composes independently.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub kind: Option<RequestKind>,
    pub department: Option<DepartmentId>,
    /// When set, the listing is user-scoped and sorted by creation time
    /// only; the admin view sorts by department name first.
    pub user: Option<UserId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSummary {
    pub request_id: RequestId,
    pub kind: RequestKind,
    pub description: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
    pub user_name: String,
    pub service_id: ServiceId,
    pub service_name: String,
    pub dept_id: DepartmentId,
    pub dept_name: String,
    pub assigned_to_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentGroup {
    pub dept_id: DepartmentId,
    pub dept_name: String,
    pub requests: Vec<RequestSummary>,
}

/// Partition summaries by department, preserving each group's internal
/// ordering. Group order is the order in which each department was first
/// encountered in the input.
pub fn group_by_department(summaries: Vec<RequestSummary>) -> Vec<DepartmentGroup> {
    let mut groups: Vec<DepartmentGroup> = Vec::new();

    for summary in summaries {
        match groups.iter_mut().find(|group| group.dept_id == summary.dept_id) {
            Some(group) => group.requests.push(summary),
            None => groups.push(DepartmentGroup {
                dept_id: summary.dept_id.clone(),
                dept_name: summary.dept_name.clone(),
                requests: vec![summary],
            }),
        }
    }

    groups
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentStats {
    pub dept_id: DepartmentId,
    pub dept_name: String,
    pub total_services: i64,
    pub total_requests: i64,
    pub pending_requests: i64,
    pub completed_requests: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub service_id: ServiceId,
    pub service_name: String,
    pub service_type: ServiceType,
    pub fee: Decimal,
    pub total_requests: i64,
    pub pending_requests: i64,
    pub completed_requests: i64,
    pub total_payments: i64,
    /// Sum over successful payments only.
    pub total_revenue: Decimal,
}

/// A user-facing receipt row: one payment joined with its service,
/// department, and (when linked) request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment_id: PaymentId,
    pub amount: Decimal,
    pub transaction_ref: String,
    pub payment_method: Option<String>,
    pub payment_status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub service_name: String,
    pub service_type: ServiceType,
    pub dept_name: String,
    pub request_id: Option<RequestId>,
    pub request_status: Option<RequestStatus>,
}
